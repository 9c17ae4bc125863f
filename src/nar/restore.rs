//! Extracting a NAR stream onto the filesystem.
//!
//! The decoder is a recursive descent over the grammar in [super::wire],
//! materializing every node at its destination path as soon as it has been
//! parsed. It pulls fixed-size chunks and never holds more than one chunk
//! of file contents in memory.

use std::ffi::OsString;
use std::fs::{self, File, Permissions};
use std::io::{self, Read, Write};
use std::os::unix::ffi::OsStringExt;
use std::os::unix::fs::{DirBuilderExt, PermissionsExt};
use std::path::Path;

use bstr::ByteSlice;
use tracing::instrument;

use crate::errors::{Error, Result};
use crate::nar::reader::{expect_bytes, read_bytes, read_u64};
use crate::nar::wire;

/// Read chunk size for file bodies.
const CHUNK_SIZE: usize = 8192;

/// Extract the NAR archive stored at `archive` into `dest`.
///
/// Succeeds only if the stream is syntactically valid and every filesystem
/// mutation succeeds. On failure the partially materialized tree is left in
/// place; cleaning it up is the caller's responsibility.
#[instrument(err)]
pub fn restore_path(archive: &Path, dest: &Path) -> Result<()> {
    let file = File::open(archive).map_err(|e| {
        if e.kind() == io::ErrorKind::NotFound {
            Error::PathNotFound(archive.to_path_buf())
        } else {
            Error::Io(e)
        }
    })?;

    let mut reader = io::BufReader::with_capacity(CHUNK_SIZE, file);
    restore(&mut reader, dest)
}

/// Extract a NAR byte stream into `dest`.
///
/// Parent directories of `dest` are created on demand, mode 0755 before
/// umask.
pub fn restore<R: Read>(reader: &mut R, dest: &Path) -> Result<()> {
    if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
        let mut builder = fs::DirBuilder::new();
        builder.recursive(true).mode(0o755);
        builder.create(parent)?;
    }

    expect_bytes(reader, wire::MAGIC).map_err(format_or_io)?;
    restore_node(reader, dest)
}

/// Archive-side read failures are syntax errors (including short reads);
/// anything else stays an I/O error.
fn format_or_io(e: io::Error) -> Error {
    match e.kind() {
        io::ErrorKind::InvalidData | io::ErrorKind::UnexpectedEof => Error::Format(e.to_string()),
        _ => Error::Io(e),
    }
}

fn restore_node<R: Read>(reader: &mut R, path: &Path) -> Result<()> {
    expect_bytes(reader, wire::OPEN).map_err(format_or_io)?;
    expect_bytes(reader, wire::TYPE).map_err(format_or_io)?;

    let typ = read_bytes(reader, 16).map_err(format_or_io)?;
    if typ == wire::REGULAR {
        restore_regular(reader, path)
    } else if typ == wire::SYMLINK {
        restore_symlink(reader, path)
    } else if typ == wire::DIRECTORY {
        restore_directory(reader, path)
    } else {
        Err(Error::Format(format!(
            "unknown node type: {:?}",
            typ.as_bstr()
        )))
    }
}

fn restore_regular<R: Read>(reader: &mut R, path: &Path) -> Result<()> {
    let mut tag = read_bytes(reader, 16).map_err(format_or_io)?;

    let executable = tag == wire::EXECUTABLE;
    if executable {
        expect_bytes(reader, b"").map_err(format_or_io)?;
        tag = read_bytes(reader, 16).map_err(format_or_io)?;
    }

    if tag != wire::CONTENTS {
        return Err(Error::Format(format!(
            "expected \"contents\", got {:?}",
            tag.as_bstr()
        )));
    }

    let size = read_u64(reader).map_err(format_or_io)?;
    let mut file = File::create(path)?;

    let mut buf = [0; CHUNK_SIZE];
    let mut remaining = size;
    while remaining > 0 {
        let n = remaining.min(CHUNK_SIZE as u64) as usize;
        reader.read_exact(&mut buf[..n]).map_err(format_or_io)?;
        file.write_all(&buf[..n])?;
        remaining -= n as u64;
    }

    // consume and verify the padding to the next 8-byte boundary
    let pad = wire::pad_len(size);
    if pad > 0 {
        let mut pad_buf = [0; 7];
        reader.read_exact(&mut pad_buf[..pad]).map_err(format_or_io)?;
        if pad_buf[..pad].iter().any(|&b| b != 0) {
            return Err(Error::Format("nonzero padding".to_string()));
        }
    }

    expect_bytes(reader, wire::CLOSE).map_err(format_or_io)?;

    if executable {
        file.set_permissions(Permissions::from_mode(0o755))?;
    }

    Ok(())
}

fn restore_symlink<R: Read>(reader: &mut R, path: &Path) -> Result<()> {
    expect_bytes(reader, wire::TARGET).map_err(format_or_io)?;
    let target = read_bytes(reader, wire::MAX_TARGET_LEN).map_err(format_or_io)?;

    if target.is_empty() || target.contains(&0) {
        return Err(Error::Format(format!(
            "invalid symlink target: {:?}",
            target.as_bstr()
        )));
    }

    expect_bytes(reader, wire::CLOSE).map_err(format_or_io)?;

    // Allow repeat extraction over an existing tree: whatever already sits
    // at the destination is replaced.
    match fs::symlink_metadata(path) {
        Ok(_) => fs::remove_file(path)?,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(e.into()),
    }

    std::os::unix::fs::symlink(OsString::from_vec(target), path)?;
    Ok(())
}

fn restore_directory<R: Read>(reader: &mut R, path: &Path) -> Result<()> {
    // The directory exists before any of its children do.
    let mut builder = fs::DirBuilder::new();
    builder.mode(0o755);
    match builder.create(path) {
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists && path.is_dir() => {}
        other => other?,
    }

    // Previous entry name, to enforce strict monotonicity.
    let mut prev_name: Option<Vec<u8>> = None;

    loop {
        let tag = read_bytes(reader, 16).map_err(format_or_io)?;
        if tag == wire::CLOSE {
            return Ok(());
        } else if tag != wire::ENTRY {
            return Err(Error::Format(format!(
                "expected \"entry\" or \")\", got {:?}",
                tag.as_bstr()
            )));
        }

        expect_bytes(reader, wire::OPEN).map_err(format_or_io)?;
        expect_bytes(reader, wire::NAME).map_err(format_or_io)?;
        let name = read_bytes(reader, wire::MAX_NAME_LEN).map_err(format_or_io)?;

        if name.is_empty()
            || name.contains(&0)
            || name.contains(&b'/')
            || name == b"."
            || name == b".."
        {
            return Err(Error::Format(format!(
                "invalid entry name: {:?}",
                name.as_bstr()
            )));
        }

        if let Some(prev_name) = &prev_name {
            if *prev_name >= name {
                return Err(Error::Format(format!(
                    "misordered entry names: {:?} >= {:?}",
                    prev_name.as_bstr(),
                    name.as_bstr()
                )));
            }
        }

        expect_bytes(reader, wire::NODE).map_err(format_or_io)?;

        let child_path = path.join(OsString::from_vec(name.clone()));
        restore_node(reader, &child_path)?;

        expect_bytes(reader, wire::CLOSE).map_err(format_or_io)?;

        prev_name = Some(name);
    }
}
