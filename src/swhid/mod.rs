//! Software Heritage persistent identifiers (SWHIDs) for filesystem objects.
//!
//! A SWHID names a software artifact by the hash of its content:
//! `swh:1:cnt:…` for file contents (including symlink targets) and
//! `swh:1:dir:…` for directories, with the object id computed exactly like
//! git computes blob and tree ids. Higher-level object types (revision,
//! release, snapshot) are out of scope here.

use std::fmt;
use std::io::{self, Write};
use std::path::Path;

use data_encoding::HEXLOWER;
use tracing::instrument;

use crate::errors::Result;

mod object;

/// Kinds of SWHID core objects produced from the filesystem.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ObjectType {
    /// File contents or a symlink target (a git blob).
    Content,
    /// A directory (a git tree).
    Directory,
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObjectType::Content => write!(f, "cnt"),
            ObjectType::Directory => write!(f, "dir"),
        }
    }
}

/// A `swh:1:…` identifier, with optional qualifiers.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Swhid {
    object_type: ObjectType,
    object_id: [u8; 20],
    qualifiers: Vec<(String, String)>,
}

impl Swhid {
    pub fn new(object_type: ObjectType, object_id: [u8; 20]) -> Self {
        Self {
            object_type,
            object_id,
            qualifiers: Vec::new(),
        }
    }

    pub fn object_type(&self) -> ObjectType {
        self.object_type
    }

    /// The raw 20-byte object id.
    pub fn object_id(&self) -> &[u8; 20] {
        &self.object_id
    }

    /// Append a qualifier. Qualifiers render after the core identifier in
    /// insertion order, values percent-encoded.
    pub fn with_qualifier(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.qualifiers.push((key.into(), value.into()));
        self
    }

    /// Write the identifier in its chunked wire form: `swh:1:`, the context,
    /// `:`, the hex object id, then any qualifiers.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_all(b"swh:1:")?;
        write!(writer, "{}", self.object_type)?;
        writer.write_all(b":")?;
        writer.write_all(HEXLOWER.encode(&self.object_id).as_bytes())?;

        for (key, value) in &self.qualifiers {
            write!(writer, ";{}={}", key, PercentEncoded(value))?;
        }

        Ok(())
    }
}

impl fmt::Display for Swhid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "swh:1:{}:{}",
            self.object_type,
            HEXLOWER.encode(&self.object_id)
        )?;

        for (key, value) in &self.qualifiers {
            write!(f, ";{}={}", key, PercentEncoded(value))?;
        }

        Ok(())
    }
}

/// Percent-encoding of a qualifier value: every byte outside the
/// unreserved set `[A-Za-z0-9-._~]` becomes `%XX`.
struct PercentEncoded<'a>(&'a str);

impl fmt::Display for PercentEncoded<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in self.0.bytes() {
            match b {
                b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                    write!(f, "{}", b as char)?
                }
                _ => write!(f, "%{:02X}", b)?,
            }
        }
        Ok(())
    }
}

/// Compute the SWHID of a filesystem path.
///
/// Regular files and symlinks yield `cnt` identifiers, directories `dir`
/// identifiers. Attach qualifiers afterwards via [Swhid::with_qualifier].
#[instrument(err)]
pub fn hash(path: &Path) -> Result<Swhid> {
    let (object_type, object_id) = object::hash_path(path)?;
    Ok(Swhid::new(object_type, object_id))
}
