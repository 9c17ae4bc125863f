use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::nixhash::Error;

/// Hash algorithms a canonical serialization can be digested with.
///
/// The serde form is the canonical lowercase name, the same string that
/// appears in SRI and `algo:digest` renderings.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgo {
    Sha1,
    Sha256,
    Sha512,
}

/// Every supported algorithm, default first.
pub const SUPPORTED_ALGOS: [HashAlgo; 3] = [HashAlgo::Sha256, HashAlgo::Sha512, HashAlgo::Sha1];

impl HashAlgo {
    /// Canonical lowercase name.
    pub fn name(&self) -> &'static str {
        match self {
            HashAlgo::Sha1 => "sha1",
            HashAlgo::Sha256 => "sha256",
            HashAlgo::Sha512 => "sha512",
        }
    }

    /// Number of bytes in a digest of this algorithm.
    pub fn digest_length(&self) -> usize {
        match self {
            HashAlgo::Sha1 => 20,
            HashAlgo::Sha256 => 32,
            HashAlgo::Sha512 => 64,
        }
    }
}

impl fmt::Display for HashAlgo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for HashAlgo {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        SUPPORTED_ALGOS
            .into_iter()
            .find(|algo| algo.name() == s)
            .ok_or_else(|| Error::InvalidAlgo(s.to_string()))
    }
}
