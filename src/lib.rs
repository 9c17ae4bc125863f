//! Persistent, content-addressed identifiers for filesystem objects.
//!
//! A filesystem subtree (regular files, directories, symlinks) is serialized
//! into a canonical byte stream and hashed. Two identifier schemes are
//! implemented:
//!
//! * [nar] — the Nix ARchive format. Its SHA-256 is the canonical
//!   "hash of a path" in the Nix ecosystem, and the serialization doubles as
//!   an archive format that can be written to and extracted from disk.
//! * [swhid] — Software Heritage persistent identifiers, using git-compatible
//!   object hashing (SHA-1 blobs and trees).
//!
//! Both serializations are produced streamingly; no full-archive buffer ever
//! exists, and symlinks are never followed.

pub mod errors;
pub mod nar;
pub mod nixbase32;
pub mod nixhash;
pub mod swhid;

mod fs;

pub use errors::Error;
