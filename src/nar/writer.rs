//! Writer for the NAR wire format.
//!
//! Serialization is driven top-down: a [Node] stands for the yet-unwritten
//! node at the current position in the stream, and committing it to one of
//! the three kinds emits that node's framing. Directory entries hand a
//! fresh [Node] to a closure, so the shape of the archive mirrors the call
//! structure of whatever drives the writer.
//!
//! ```rust
//! use std::io::Cursor;
//!
//! let mut sink = Vec::new();
//!
//! let node = path_hasher::nar::writer::open(&mut sink)?;
//! let mut dir = node.directory()?;
//! dir.entry(b"hello.txt", |child| {
//!     child.file(false, 6, &mut Cursor::new(b"hello\n"))
//! })?;
//! dir.close()?;
//! # Ok::<(), path_hasher::Error>(())
//! ```

use std::io::{self, ErrorKind, Read, Write};

use bstr::ByteSlice;

use crate::errors::{Error, Result};
use crate::nar::wire;

/// Copy buffer size for file bodies.
const CHUNK_SIZE: usize = 8192;

/// Begin a NAR stream, yielding the root [Node].
pub fn open<W: Write>(writer: &mut W) -> Result<Node<'_, W>> {
    put(writer, wire::MAGIC)?;
    Ok(Node { writer })
}

/// Emit one framed string.
fn put<W: Write>(writer: &mut W, s: &[u8]) -> Result<()> {
    writer.write_all(&(s.len() as u64).to_le_bytes())?;
    writer.write_all(s)?;
    writer.write_all(&[0u8; 7][..wire::pad_len(s.len() as u64)])?;
    Ok(())
}

/// A position in the stream where a single node is expected.
///
/// Each of the three methods writes the whole node and consumes the
/// position; a dropped [Node] leaves the archive truncated.
pub struct Node<'a, W: Write> {
    writer: &'a mut W,
}

impl<'a, W: Write> Node<'a, W> {
    fn begin(&mut self, kind: &[u8]) -> Result<()> {
        put(self.writer, wire::OPEN)?;
        put(self.writer, wire::TYPE)?;
        put(self.writer, kind)
    }

    /// Write this node as a symlink with the given target bytes.
    pub fn symlink(mut self, target: &[u8]) -> Result<()> {
        if target.is_empty() || target.len() > wire::MAX_TARGET_LEN || target.contains(&0) {
            return Err(Error::Format(format!(
                "invalid symlink target: {:?}",
                target.as_bstr()
            )));
        }

        self.begin(wire::SYMLINK)?;
        put(self.writer, wire::TARGET)?;
        put(self.writer, target)?;
        put(self.writer, wire::CLOSE)
    }

    /// Write this node as a regular file of exactly `size` bytes, pulled
    /// from `contents` one chunk at a time.
    ///
    /// `size` becomes the frame length before any of the body is read, so
    /// it must come from an authoritative source such as the open handle's
    /// metadata. A reader yielding fewer or more bytes than that aborts
    /// serialization instead of emitting a corrupt frame, which is what
    /// catches a file changing size mid-read.
    pub fn file<R: Read>(mut self, executable: bool, size: u64, contents: &mut R) -> Result<()> {
        self.begin(wire::REGULAR)?;
        if executable {
            put(self.writer, wire::EXECUTABLE)?;
            put(self.writer, b"")?;
        }
        put(self.writer, wire::CONTENTS)?;

        self.writer.write_all(&size.to_le_bytes())?;

        let mut buf = [0; CHUNK_SIZE];
        let mut left = size;
        while left > 0 {
            let want = left.min(CHUNK_SIZE as u64) as usize;
            match contents.read(&mut buf[..want]) {
                Ok(0) => {
                    return Err(Error::Io(io::Error::new(
                        ErrorKind::UnexpectedEof,
                        "file ended before its stated size",
                    )))
                }
                Ok(n) => {
                    self.writer.write_all(&buf[..n])?;
                    left -= n as u64;
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => return Err(e.into()),
            }
        }

        let mut probe = [0];
        if contents.read(&mut probe)? != 0 {
            return Err(Error::Io(io::Error::new(
                ErrorKind::InvalidInput,
                "file grew past its stated size",
            )));
        }

        self.writer.write_all(&[0u8; 7][..wire::pad_len(size)])?;
        put(self.writer, wire::CLOSE)
    }

    /// Write this node as a directory; fill it through the returned
    /// [Directory] and finish it with [Directory::close].
    pub fn directory(mut self) -> Result<Directory<'a, W>> {
        self.begin(wire::DIRECTORY)?;
        Ok(Directory {
            writer: self.writer,
            last_name: Vec::new(),
        })
    }
}

/// An open directory node accepting entries in ascending name order.
pub struct Directory<'a, W: Write> {
    writer: &'a mut W,
    /// Name of the most recent entry; empty before the first one.
    last_name: Vec<u8>,
}

impl<W: Write> Directory<'_, W> {
    /// Add the entry `name`, handing `fill` a [Node] for its contents.
    ///
    /// Names come from the OS listing, but they are validated here anyway:
    /// an archive carrying a bad or misordered name would be rejected by
    /// every decoder, so it is never worth emitting.
    pub fn entry<F>(&mut self, name: &[u8], fill: F) -> Result<()>
    where
        F: FnOnce(Node<'_, W>) -> Result<()>,
    {
        self.check_name(name)?;

        put(self.writer, wire::ENTRY)?;
        put(self.writer, wire::OPEN)?;
        put(self.writer, wire::NAME)?;
        put(self.writer, name)?;
        put(self.writer, wire::NODE)?;

        fill(Node {
            writer: &mut *self.writer,
        })?;

        put(self.writer, wire::CLOSE)?;

        self.last_name.clear();
        self.last_name.extend_from_slice(name);
        Ok(())
    }

    fn check_name(&self, name: &[u8]) -> Result<()> {
        if name.is_empty()
            || name.len() > wire::MAX_NAME_LEN
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

        if !self.last_name.is_empty() && self.last_name.as_slice() >= name {
            return Err(Error::Format(format!(
                "misordered entry names: {:?} then {:?}",
                self.last_name.as_bstr(),
                name.as_bstr()
            )));
        }

        Ok(())
    }

    /// Terminate the directory node.
    pub fn close(self) -> Result<()> {
        put(self.writer, wire::CLOSE)
    }
}
