//! chain hash type - 32-byte BLAKE2b digest identifying an entry or a summary.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use subtle::ConstantTimeEq;

use crate::{Error, encoding};

/// length of a chain hash in bytes (BLAKE2b-256).
pub const CHAIN_HASH_LEN: usize = 32;

/// 32-byte hash used for `currhash`, `prevhash` and `summaryhash`.
///
/// serializes as base64url. equality checks against values received from a
/// peer should go through [`ChainHash::ct_eq`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ChainHash([u8; CHAIN_HASH_LEN]);

impl ChainHash {
    /// returns the hash as a byte slice.
    pub fn as_bytes(&self) -> &[u8; CHAIN_HASH_LEN] {
        &self.0
    }

    /// parse a base64url-encoded hash.
    pub fn from_base64(encoded: &str) -> Result<Self, Error> {
        let bytes = encoding::decode(encoded)?;
        Self::try_from(bytes.as_slice())
    }

    /// encode as padded base64url.
    pub fn to_base64(&self) -> String {
        encoding::encode(self.0)
    }

    /// constant-time comparison.
    pub fn ct_eq(&self, other: &ChainHash) -> bool {
        self.0.ct_eq(&other.0).into()
    }
}

impl From<[u8; CHAIN_HASH_LEN]> for ChainHash {
    fn from(bytes: [u8; CHAIN_HASH_LEN]) -> Self {
        Self(bytes)
    }
}

impl TryFrom<&[u8]> for ChainHash {
    type Error = Error;

    fn try_from(slice: &[u8]) -> Result<Self, Self::Error> {
        let bytes: [u8; CHAIN_HASH_LEN] =
            slice.try_into().map_err(|_| Error::InvalidHashLength {
                expected: CHAIN_HASH_LEN,
                actual: slice.len(),
            })?;
        Ok(Self(bytes))
    }
}

impl FromStr for ChainHash {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_base64(s)
    }
}

impl fmt::Display for ChainHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_base64())
    }
}

impl fmt::Debug for ChainHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ChainHash({})", self.to_base64())
    }
}

impl Serialize for ChainHash {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_base64())
    }
}

impl<'de> Deserialize<'de> for ChainHash {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::from_base64(&s).map_err(de::Error::custom)
    }
}
