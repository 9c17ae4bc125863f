//! Access to the real filesystem underneath the serializers.
//!
//! Both serializations need the same few probes: classify a path without
//! following symlinks, list a directory in a defined order, decide the
//! executable bit, and capture symlink targets verbatim.

use std::fs::{self, FileType, Metadata};
use std::io;
use std::path::{Path, PathBuf};

use crate::errors::{Error, Result};

/// Stat the root of a serialization, without following symlinks.
///
/// An absent root is reported as [Error::PathNotFound]. A dangling symlink
/// is present as far as `symlink_metadata` is concerned, which is exactly
/// the semantics we want: its target is captured as an opaque byte string.
pub(crate) fn root_metadata(path: &Path) -> Result<Metadata> {
    fs::symlink_metadata(path).map_err(|e| {
        if e.kind() == io::ErrorKind::NotFound {
            Error::PathNotFound(path.to_path_buf())
        } else {
            e.into()
        }
    })
}

/// A directory entry, carrying the raw name bytes both serializers sort by.
pub(crate) struct DirEntry {
    pub name: Vec<u8>,
    pub path: PathBuf,
    pub file_type: FileType,
}

/// List a directory, sorted by raw byte value of the entry names.
///
/// OS enumeration order is not stable enough to hash; the sort here is the
/// single place that makes both serializations deterministic.
pub(crate) fn sorted_entries(path: &Path) -> io::Result<Vec<DirEntry>> {
    let mut entries = Vec::new();

    for entry in fs::read_dir(path)? {
        let entry = entry?;
        entries.push(DirEntry {
            name: entry.file_name().into_encoded_bytes(),
            path: entry.path(),
            file_type: entry.file_type()?,
        });
    }

    entries.sort_unstable_by(|a, b| a.name.cmp(&b.name));
    Ok(entries)
}

/// Whether a regular file counts as executable for serialization purposes.
///
/// Only the owner execute bit is considered, matching nix's `dump()`
/// behaviour. Platforms without POSIX permission bits never produce
/// executable nodes, so cross-platform outputs agree only for inputs
/// without executable files.
pub(crate) fn is_executable(metadata: &Metadata) -> bool {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        metadata.permissions().mode() & 0o100 != 0
    }
    #[cfg(not(unix))]
    {
        let _ = metadata;
        false
    }
}

/// Read a symlink target as raw bytes, without resolving it.
pub(crate) fn read_link_bytes(path: &Path) -> io::Result<Vec<u8>> {
    Ok(fs::read_link(path)?.into_os_string().into_encoded_bytes())
}
