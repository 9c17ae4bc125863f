//! Strongly-typed digests and the streaming hashers producing them.
//!
//! The serializers in this crate never buffer their output; they sink it
//! into a [Hasher] through [std::io::Write], and the caller turns the
//! resulting [NixHash] into whichever rendering it needs (lowercase hex,
//! SRI, nixbase32).

use std::io;

use data_encoding::{BASE64, HEXLOWER};
use sha1::{Digest, Sha1};
use sha2::{Sha256, Sha512};

use crate::nixbase32;

mod algos;

pub use algos::{HashAlgo, SUPPORTED_ALGOS};

/// A digest over a canonical serialization.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum NixHash {
    Sha1([u8; 20]),
    Sha256([u8; 32]),
    Sha512(Box<[u8; 64]>),
}

impl NixHash {
    /// returns the algo as [HashAlgo].
    pub fn algo(&self) -> HashAlgo {
        match self {
            NixHash::Sha1(_) => HashAlgo::Sha1,
            NixHash::Sha256(_) => HashAlgo::Sha256,
            NixHash::Sha512(_) => HashAlgo::Sha512,
        }
    }

    /// returns the digest as variable-length byte slice.
    pub fn digest_as_bytes(&self) -> &[u8] {
        match self {
            NixHash::Sha1(digest) => digest,
            NixHash::Sha256(digest) => digest,
            NixHash::Sha512(digest) => digest.as_ref(),
        }
    }

    /// Returns the digest as a lowercase hex string, without any algorithm
    /// prefix.
    pub fn to_plain_hex_string(&self) -> String {
        HEXLOWER.encode(self.digest_as_bytes())
    }

    /// Formats the digest as an SRI string, which is the algo, followed by
    /// a dash, then the standard base64 encoding (with `=` padding).
    /// This is what `nix hash path` prints by default.
    pub fn to_sri_string(&self) -> String {
        format!("{}-{}", self.algo(), BASE64.encode(self.digest_as_bytes()))
    }

    /// Returns the nixbase32-encoded digest, without any algorithm prefix.
    pub fn to_nixbase32_string(&self) -> String {
        nixbase32::encode(self.digest_as_bytes())
    }

    /// Formats the digest in the Nix default hash format, which is the algo,
    /// followed by a colon, then the lowercase hex encoded digest.
    pub fn to_nix_hex_string(&self) -> String {
        format!("{}:{}", self.algo(), self.to_plain_hex_string())
    }
}

/// Constructs a new [NixHash] by specifying [HashAlgo] and digest.
/// It can fail if the passed digest length doesn't match what's expected for
/// the passed algo.
pub fn from_algo_and_digest(algo: HashAlgo, digest: &[u8]) -> Result<NixHash, Error> {
    if digest.len() != algo.digest_length() {
        return Err(Error::InvalidEncodedDigestLength(digest.len(), algo));
    }

    Ok(match algo {
        HashAlgo::Sha1 => NixHash::Sha1(digest.try_into().unwrap()),
        HashAlgo::Sha256 => NixHash::Sha256(digest.try_into().unwrap()),
        HashAlgo::Sha512 => NixHash::Sha512(Box::new(digest.try_into().unwrap())),
    })
}

/// Errors related to hash algorithm selection and digest construction.
#[derive(Debug, Eq, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("invalid hash algo: {0}")]
    InvalidAlgo(String),
    #[error("invalid encoded digest length '{0}' for algo {1}")]
    InvalidEncodedDigestLength(usize, HashAlgo),
}

/// A streaming hasher for a [HashAlgo], fed through [io::Write] so a
/// serializer can sink its byte stream straight into it.
pub enum Hasher {
    Sha1(Sha1),
    Sha256(Sha256),
    Sha512(Box<Sha512>),
}

impl Hasher {
    pub fn new(algo: HashAlgo) -> Self {
        match algo {
            HashAlgo::Sha1 => Hasher::Sha1(Sha1::new()),
            HashAlgo::Sha256 => Hasher::Sha256(Sha256::new()),
            HashAlgo::Sha512 => Hasher::Sha512(Box::new(Sha512::new())),
        }
    }

    pub fn update(&mut self, data: &[u8]) {
        match self {
            Hasher::Sha1(h) => h.update(data),
            Hasher::Sha256(h) => h.update(data),
            Hasher::Sha512(h) => h.update(data),
        }
    }

    pub fn finalize(self) -> NixHash {
        match self {
            Hasher::Sha1(h) => NixHash::Sha1(h.finalize().into()),
            Hasher::Sha256(h) => NixHash::Sha256(h.finalize().into()),
            Hasher::Sha512(h) => NixHash::Sha512(Box::new(h.finalize().into())),
        }
    }
}

impl io::Write for Hasher {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.update(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
