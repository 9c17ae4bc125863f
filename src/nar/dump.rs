//! Serializing a filesystem subtree into the NAR format.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use tracing::instrument;

use crate::errors::{Error, Result};
use crate::fs;
use crate::nar::writer::{self, Node};

/// Write the canonical NAR serialization of `path` to `writer`.
///
/// This is the streaming form of every NAR operation in this crate: output
/// is produced chunk by chunk into the sink, and the full archive is never
/// held in memory. Symlinks are not followed, their targets are captured
/// as literal byte strings.
#[instrument(skip(writer), err)]
pub fn dump_path<W: Write>(writer: &mut W, path: &Path) -> Result<()> {
    let metadata = fs::root_metadata(path)?;
    let node = writer::open(writer)?;
    dump_node(node, path, &metadata)
}

fn dump_node<W: Write>(node: Node<'_, W>, path: &Path, metadata: &std::fs::Metadata) -> Result<()> {
    let file_type = metadata.file_type();

    if file_type.is_symlink() {
        let target = fs::read_link_bytes(path)?;
        node.symlink(&target)?;
    } else if file_type.is_file() {
        // The size is taken from the already-opened handle, not from an
        // earlier stat, so a concurrent truncate or append can't slip
        // between stat and read; it surfaces as an I/O error instead.
        let mut file = File::open(path)?;
        let size = file.metadata()?.len();

        node.file(fs::is_executable(metadata), size, &mut file)?;
    } else if file_type.is_dir() {
        let mut dir = node.directory()?;

        for entry in fs::sorted_entries(path)? {
            let child_metadata = std::fs::symlink_metadata(&entry.path)?;
            dir.entry(&entry.name, |child| {
                dump_node(child, &entry.path, &child_metadata)
            })?;
        }

        dir.close()?;
    } else {
        return Err(Error::UnsupportedFileType(path.to_path_buf(), file_type));
    }

    Ok(())
}
