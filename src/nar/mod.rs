//! NAR (Nix ARchive) serialization, hashing, archiving and extraction.
//!
//! NAR is a deterministic, platform-independent serialization of a
//! filesystem subtree. Its sha256 is the canonical "hash of a path" in the
//! Nix ecosystem; the serialization doubles as an archive format.
//!
//! The operations here are thin compositions of the streaming pieces:
//! [dump::dump_path] produces the byte stream, [crate::nixhash::Hasher]
//! consumes it for hashing, [restore] materializes it back onto disk.

use std::io::{self, BufWriter, Write};
use std::path::Path;

use tracing::instrument;

use crate::errors::{Error, Result};
use crate::nixhash::{HashAlgo, Hasher, NixHash};

pub mod dump;
mod reader;
pub mod restore;
pub mod wire;
pub mod writer;

pub use dump::dump_path;
pub use restore::{restore, restore_path};

/// Compute the NAR hash of `path` as an SRI string, equivalent to
/// `nix hash path`.
#[instrument(err)]
pub fn hash(path: &Path) -> Result<String> {
    Ok(compute_hashes(path, HashAlgo::Sha256)?.to_sri_string())
}

/// Serialize `path` and feed the stream through a hasher for `algo`.
///
/// The returned [NixHash] renders to lowercase hex, SRI or nixbase32 as
/// needed; see its methods.
#[instrument(err)]
pub fn compute_hashes(path: &Path, algo: HashAlgo) -> Result<NixHash> {
    let mut hasher = Hasher::new(algo);
    dump_path(&mut hasher, path)?;
    Ok(hasher.finalize())
}

/// Write the NAR serialization of `path` to the file at `dest`, or to
/// standard output when `dest` is `None`.
///
/// The archive is streamed into a temporary file in the destination's
/// directory and renamed into place once complete, so `dest` either holds a
/// full archive or is untouched; a failed or cancelled write leaves nothing
/// behind.
#[instrument(err)]
pub fn write(path: &Path, dest: Option<&Path>) -> Result<()> {
    match dest {
        None => {
            let stdout = io::stdout();
            let mut out = BufWriter::new(stdout.lock());
            dump_path(&mut out, path)?;
            out.flush()?;
        }
        Some(dest) => {
            let dir = match dest.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent,
                _ => Path::new("."),
            };

            let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
            {
                let mut out = BufWriter::new(tmp.as_file_mut());
                dump_path(&mut out, path)?;
                out.flush()?;
            }

            // dropped on the error path, taking the temp file with it
            tmp.persist(dest).map_err(|e| Error::Io(e.error))?;
        }
    }

    Ok(())
}
