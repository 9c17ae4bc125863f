//! End-to-end NAR scenarios over real filesystem trees.

use std::fs::{self, Permissions};
use std::io::Cursor;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

use path_hasher::nar;
use path_hasher::nixhash::{HashAlgo, Hasher};
use path_hasher::Error;
use pretty_assertions::assert_eq;

/// Frame a sequence of strings the way the serializer puts them on the
/// wire: little-endian length, bytes, zero padding to 8-byte alignment.
fn framed(strings: &[&[u8]]) -> Vec<u8> {
    strings
        .iter()
        .flat_map(|s| {
            let mut chunk = (s.len() as u64).to_le_bytes().to_vec();
            chunk.extend_from_slice(s);
            chunk.resize(chunk.len() + (8 - s.len() % 8) % 8, 0);
            chunk
        })
        .collect()
}

fn dump(path: &Path) -> Vec<u8> {
    let mut buf = Vec::new();
    nar::dump_path(&mut buf, path).unwrap();
    buf
}

/// Digest `bytes` with this crate's hasher, for comparing against the
/// streaming operations.
fn sri_of(bytes: &[u8], algo: HashAlgo) -> String {
    let mut hasher = Hasher::new(algo);
    hasher.update(bytes);
    hasher.finalize().to_sri_string()
}

#[test]
fn single_file() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("test.md");
    fs::write(&file, b"# interoperability\n").unwrap();

    let expected = framed(&[
        b"nix-archive-1",
        b"(",
        b"type",
        b"regular",
        b"contents",
        b"# interoperability\n",
        b")",
    ]);

    assert_eq!(dump(&file), expected);

    // the hash operations must agree with hashing the dumped stream
    assert_eq!(nar::hash(&file).unwrap(), sri_of(&expected, HashAlgo::Sha256));
    for algo in [HashAlgo::Sha1, HashAlgo::Sha256, HashAlgo::Sha512] {
        assert_eq!(
            nar::compute_hashes(&file, algo).unwrap().to_sri_string(),
            sri_of(&expected, algo)
        );
    }
}

/// A file whose length is a multiple of 8 gets no padding after its body.
#[test]
fn file_length_multiple_of_eight() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("blob");
    fs::write(&file, b"01234567").unwrap();

    let expected = framed(&[
        b"nix-archive-1",
        b"(",
        b"type",
        b"regular",
        b"contents",
        b"01234567",
        b")",
    ]);

    assert_eq!(dump(&file), expected);
}

/// Symlinks serialize their literal target; a dangling target is fine.
#[test]
fn dangling_symlink() {
    let dir = tempfile::tempdir().unwrap();
    let link = dir.path().join("link");
    std::os::unix::fs::symlink("../x", &link).unwrap();

    let expected = framed(&[
        b"nix-archive-1",
        b"(",
        b"type",
        b"symlink",
        b"target",
        b"../x",
        b")",
    ]);

    assert_eq!(dump(&link), expected);
}

/// Directory entries are emitted sorted by raw name bytes: "a" before "ab".
#[test]
fn directory_entry_order() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("root");
    fs::create_dir(&root).unwrap();
    // create in the "wrong" order on purpose
    fs::write(root.join("ab"), b"2").unwrap();
    fs::write(root.join("a"), b"1").unwrap();

    let expected = framed(&[
        b"nix-archive-1",
        b"(",
        b"type",
        b"directory",
        b"entry",
        b"(",
        b"name",
        b"a",
        b"node",
        b"(",
        b"type",
        b"regular",
        b"contents",
        b"1",
        b")",
        b")",
        b"entry",
        b"(",
        b"name",
        b"ab",
        b"node",
        b"(",
        b"type",
        b"regular",
        b"contents",
        b"2",
        b")",
        b")",
        b")",
    ]);

    assert_eq!(dump(&root), expected);
}

#[test]
fn executable_bit() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("root");
    fs::create_dir(&root).unwrap();
    let tool = root.join("tool");
    fs::write(&tool, b"#!/bin/sh\n").unwrap();
    fs::set_permissions(&tool, Permissions::from_mode(0o755)).unwrap();

    let expected = framed(&[
        b"nix-archive-1",
        b"(",
        b"type",
        b"directory",
        b"entry",
        b"(",
        b"name",
        b"tool",
        b"node",
        b"(",
        b"type",
        b"regular",
        b"executable",
        b"",
        b"contents",
        b"#!/bin/sh\n",
        b")",
        b")",
        b")",
    ]);

    assert_eq!(dump(&root), expected);
}

#[test]
fn unknown_algo_is_invalid_argument() {
    let err = "md5".parse::<path_hasher::nixhash::HashAlgo>().unwrap_err();
    assert!(matches!(Error::from(err), Error::InvalidArgument(_)));
}

#[test]
fn missing_root_is_path_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let absent = dir.path().join("nope");

    assert!(matches!(
        nar::hash(&absent),
        Err(Error::PathNotFound(p)) if p == absent
    ));
}

#[test]
fn socket_is_unsupported() {
    let dir = tempfile::tempdir().unwrap();
    let sock = dir.path().join("sock");
    let _listener = std::os::unix::net::UnixListener::bind(&sock).unwrap();

    assert!(matches!(
        nar::hash(&sock),
        Err(Error::UnsupportedFileType(..))
    ));
}

/// Build the three-level tree used by the round-trip tests: an executable,
/// a plain file, a symlink and an empty subdirectory.
fn build_tree(root: &Path) {
    fs::create_dir(root).unwrap();

    fs::create_dir(root.join("bin")).unwrap();
    let tool = root.join("bin").join("tool");
    fs::write(&tool, b"#!/bin/sh\nexit 0\n").unwrap();
    fs::set_permissions(&tool, Permissions::from_mode(0o755)).unwrap();

    fs::create_dir(root.join("doc")).unwrap();
    fs::create_dir(root.join("doc").join("empty")).unwrap();
    fs::write(root.join("doc").join("readme.md"), b"read me\n").unwrap();

    std::os::unix::fs::symlink("bin/tool", root.join("link")).unwrap();
}

#[test]
fn write_then_restore_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("root");
    build_tree(&root);

    let archive = dir.path().join("root.nar");
    nar::write(&root, Some(&archive)).unwrap();

    // the archive on disk is exactly the serialization
    assert_eq!(fs::read(&archive).unwrap(), dump(&root));

    let restored = dir.path().join("restored");
    nar::restore_path(&archive, &restored).unwrap();

    // the rehydrated tree hashes identically to the original
    assert_eq!(dump(&restored), dump(&root));
    assert_eq!(nar::hash(&restored).unwrap(), nar::hash(&root).unwrap());

    // the executable bit survived
    let mode = fs::symlink_metadata(restored.join("bin").join("tool"))
        .unwrap()
        .permissions()
        .mode();
    assert_ne!(mode & 0o100, 0);

    // and the plain file stayed plain
    let mode = fs::symlink_metadata(restored.join("doc").join("readme.md"))
        .unwrap()
        .permissions()
        .mode();
    assert_eq!(mode & 0o111, 0);

    // repeat extraction over the existing tree succeeds (symlinks are
    // replaced, directories reused)
    nar::restore_path(&archive, &restored).unwrap();
    assert_eq!(dump(&restored), dump(&root));
}

#[test]
fn restore_into_fresh_subdirectory() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("root");
    build_tree(&root);

    let mut buf = Cursor::new(dump(&root));
    let dest = dir.path().join("deeply").join("nested").join("dest");
    nar::restore(&mut buf, &dest).unwrap();

    assert_eq!(dump(&dest), dump(&root));
}

#[test]
fn restore_rejects_bad_magic() {
    let dir = tempfile::tempdir().unwrap();
    let bad = framed(&[b"nix-archive-2", b"(", b"type", b"regular"]);

    assert!(matches!(
        nar::restore(&mut Cursor::new(bad), &dir.path().join("out")),
        Err(Error::Format(_))
    ));
}

#[test]
fn restore_rejects_unknown_type() {
    let dir = tempfile::tempdir().unwrap();
    let bad = framed(&[b"nix-archive-1", b"(", b"type", b"hardlink", b")"]);

    assert!(matches!(
        nar::restore(&mut Cursor::new(bad), &dir.path().join("out")),
        Err(Error::Format(_))
    ));
}

#[test]
fn restore_rejects_truncated_stream() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("root");
    build_tree(&root);

    let mut bytes = dump(&root);
    bytes.truncate(bytes.len() / 2);

    assert!(matches!(
        nar::restore(&mut Cursor::new(bytes), &dir.path().join("out")),
        Err(Error::Format(_))
    ));
}

#[test]
fn restore_rejects_misordered_entries() {
    let dir = tempfile::tempdir().unwrap();

    let bad = framed(&[
        b"nix-archive-1",
        b"(",
        b"type",
        b"directory",
        b"entry",
        b"(",
        b"name",
        b"b",
        b"node",
        b"(",
        b"type",
        b"regular",
        b"contents",
        b"",
        b")",
        b")",
        b"entry",
        b"(",
        b"name",
        b"a",
        b"node",
        b"(",
        b"type",
        b"regular",
        b"contents",
        b"",
        b")",
        b")",
        b")",
    ]);

    assert!(matches!(
        nar::restore(&mut Cursor::new(bad), &dir.path().join("out")),
        Err(Error::Format(_))
    ));
}

#[test]
fn restore_rejects_traversal_names() {
    let dir = tempfile::tempdir().unwrap();

    for name in [&b".."[..], &b"."[..], &b"a/b"[..]] {
        let bad = framed(&[
            b"nix-archive-1",
            b"(",
            b"type",
            b"directory",
            b"entry",
            b"(",
            b"name",
            name,
            b"node",
            b"(",
            b"type",
            b"regular",
            b"contents",
            b"",
            b")",
            b")",
            b")",
        ]);

        assert!(matches!(
            nar::restore(&mut Cursor::new(bad), &dir.path().join("out")),
            Err(Error::Format(_))
        ));
    }
}

/// "contents" in place of an entry keyword inside a directory is a syntax
/// error, not a file.
#[test]
fn restore_rejects_contents_outside_regular() {
    let dir = tempfile::tempdir().unwrap();

    let bad = framed(&[
        b"nix-archive-1",
        b"(",
        b"type",
        b"directory",
        b"contents",
        b"",
        b")",
    ]);

    assert!(matches!(
        nar::restore(&mut Cursor::new(bad), &dir.path().join("out")),
        Err(Error::Format(_))
    ));
}

/// A file body large enough to span many read chunks survives the trip.
#[test]
fn large_file_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("big");

    // 64 KiB + 5 to exercise both full chunks and a padded tail
    let body: Vec<u8> = (0..65541u32).map(|i| (i % 251) as u8).collect();
    fs::write(&root, &body).unwrap();

    let bytes = dump(&root);
    let restored = dir.path().join("restored");
    nar::restore(&mut Cursor::new(bytes), &restored).unwrap();

    assert_eq!(fs::read(&restored).unwrap(), body);
}
