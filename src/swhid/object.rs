//! Git-compatible object hashing of filesystem trees.
//!
//! Files and symlink targets hash as git blobs, directories as git trees;
//! the resulting object ids are byte-identical to `git hash-object`.

use std::borrow::Cow;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use sha1::{Digest, Sha1};

use crate::errors::{Error, Result};
use crate::fs;
use crate::swhid::ObjectType;

// Git tree entry modes, without leading zeroes.
const MODE_DIR: &[u8] = b"40000";
const MODE_REG: &[u8] = b"100644";
const MODE_EXE: &[u8] = b"100755";
const MODE_SYM: &[u8] = b"120000";

/// Hash the object at `path`, classifying it as content or directory.
///
/// Symlinks hash their literal target bytes; they are never followed.
pub(super) fn hash_path(path: &Path) -> Result<(ObjectType, [u8; 20])> {
    let metadata = fs::root_metadata(path)?;
    let file_type = metadata.file_type();

    if file_type.is_symlink() {
        let target = fs::read_link_bytes(path)?;
        Ok((ObjectType::Content, hash_object(b"blob", &target)))
    } else if file_type.is_file() {
        Ok((ObjectType::Content, file_oid(path)?))
    } else if file_type.is_dir() {
        Ok((ObjectType::Directory, tree_oid(path)?))
    } else {
        Err(Error::UnsupportedFileType(path.to_path_buf(), file_type))
    }
}

/// Object id of `<kind> <decimal body length>NUL<body>` for a body already
/// in memory.
pub(super) fn hash_object(kind: &[u8], body: &[u8]) -> [u8; 20] {
    let mut hasher = Sha1::new();
    hasher.update(kind);
    hasher.update(b" ");
    hasher.update(body.len().to_string().as_bytes());
    hasher.update(b"\0");
    hasher.update(body);
    hasher.finalize().into()
}

/// Blob object id of a file on disk, streamed through the hasher.
///
/// The blob header carries the size of the already-opened handle; a file
/// changing size underneath the read fails instead of producing a wrong id.
fn file_oid(path: &Path) -> Result<[u8; 20]> {
    let file = File::open(path)?;
    let size = file.metadata()?.len();

    let mut hasher = Sha1::new();
    hasher.update(b"blob ");
    hasher.update(size.to_string().as_bytes());
    hasher.update(b"\0");

    let mut reader = BufReader::new(file);
    let mut need = size;
    while need != 0 {
        let data = reader.fill_buf()?;

        if data.is_empty() {
            return Err(io::Error::from(io::ErrorKind::UnexpectedEof).into());
        }

        let n = need.min(data.len() as u64) as usize;
        hasher.update(&data[..n]);

        need -= n as u64;
        reader.consume(n);
    }

    if reader.fill_buf().map(|b| !b.is_empty())? {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "file contained more data than its stated size",
        )
        .into());
    }

    Ok(hasher.finalize().into())
}

struct TreeEntry {
    mode: &'static [u8],
    name: Vec<u8>,
    oid: [u8; 20],
}

impl TreeEntry {
    /// Git sorts tree entries as if directory names had a trailing slash,
    /// which is not the same as sorting by bare name when a file and a
    /// directory share a prefix.
    fn sort_key(&self) -> Cow<'_, [u8]> {
        if self.mode == MODE_DIR {
            let mut key = self.name.clone();
            key.push(b'/');
            Cow::Owned(key)
        } else {
            Cow::Borrowed(&self.name)
        }
    }
}

/// Tree object id of a directory, hashing children depth-first.
fn tree_oid(path: &Path) -> Result<[u8; 20]> {
    let mut entries = Vec::new();

    for entry in fs::sorted_entries(path)? {
        let file_type = entry.file_type;

        let (mode, oid) = if file_type.is_symlink() {
            let target = fs::read_link_bytes(&entry.path)?;
            (MODE_SYM, hash_object(b"blob", &target))
        } else if file_type.is_file() {
            let metadata = std::fs::symlink_metadata(&entry.path)?;
            let mode = if fs::is_executable(&metadata) {
                MODE_EXE
            } else {
                MODE_REG
            };
            (mode, file_oid(&entry.path)?)
        } else if file_type.is_dir() {
            (MODE_DIR, tree_oid(&entry.path)?)
        } else {
            return Err(Error::UnsupportedFileType(entry.path, file_type));
        };

        entries.push(TreeEntry {
            mode,
            name: entry.name,
            oid,
        });
    }

    entries.sort_unstable_by(|a, b| a.sort_key().cmp(&b.sort_key()));

    Ok(hash_object(b"tree", &tree_body(&entries)))
}

/// Concatenation of `<mode> <name>NUL<raw oid>` for each entry, in order.
fn tree_body(entries: &[TreeEntry]) -> Vec<u8> {
    let mut body = Vec::new();
    for entry in entries {
        body.extend_from_slice(entry.mode);
        body.push(b' ');
        body.extend_from_slice(&entry.name);
        body.push(0);
        body.extend_from_slice(&entry.oid);
    }
    body
}
