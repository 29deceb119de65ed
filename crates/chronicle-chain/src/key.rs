//! ed25519 key types for signing entries and http bodies.

use std::fmt;

use ed25519_consensus::{Signature, VerificationKey};
use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::{Error, encoding};

/// length of an ed25519 public key in bytes.
pub const PUBLIC_KEY_LEN: usize = 32;

/// length of an ed25519 private key seed in bytes.
pub const SEED_LEN: usize = 32;

/// length of an ed25519 signature in bytes.
pub const SIGNATURE_LEN: usize = 64;

/// decode a base64url detached signature.
pub fn decode_signature(encoded: &str) -> Result<[u8; SIGNATURE_LEN], Error> {
    let bytes = encoding::decode(encoded).map_err(|_| Error::InvalidSignature)?;
    bytes.as_slice().try_into().map_err(|_| Error::InvalidSignature)
}

/// ed25519 public key. serializes as base64url.
#[derive(Clone, PartialEq, Eq)]
pub struct PublicKey(VerificationKey);

impl PublicKey {
    /// returns the raw bytes of the public key.
    pub fn as_bytes(&self) -> &[u8; PUBLIC_KEY_LEN] {
        // VerificationKey::as_ref returns &[u8], but it is always 32 bytes
        self.0
            .as_ref()
            .try_into()
            .expect("ed25519 pubkey is always 32 bytes")
    }

    /// parse a base64url-encoded public key.
    pub fn from_base64(encoded: &str) -> Result<Self, Error> {
        let bytes = encoding::decode(encoded)?;
        Self::try_from(bytes.as_slice())
    }

    /// encode as padded base64url.
    pub fn to_base64(&self) -> String {
        encoding::encode(self.as_bytes())
    }

    /// verify a detached signature over a message.
    pub fn verify(&self, signature: &[u8], message: &[u8]) -> Result<(), Error> {
        let sig = Signature::try_from(signature).map_err(|_| Error::InvalidSignature)?;
        self.0
            .verify(&sig, message)
            .map_err(|_| Error::InvalidSignature)
    }

    /// verify a base64url-encoded detached signature over a message.
    pub fn verify_base64(&self, signature: &str, message: &[u8]) -> Result<(), Error> {
        let sig = encoding::decode(signature).map_err(|_| Error::InvalidSignature)?;
        self.verify(&sig, message)
    }
}

impl TryFrom<&[u8]> for PublicKey {
    type Error = Error;

    fn try_from(slice: &[u8]) -> Result<Self, Self::Error> {
        let bytes: [u8; PUBLIC_KEY_LEN] =
            slice.try_into().map_err(|_| Error::InvalidKeyLength {
                expected: PUBLIC_KEY_LEN,
                actual: slice.len(),
            })?;
        let key = VerificationKey::try_from(bytes).map_err(|_| Error::InvalidPublicKey)?;
        Ok(Self(key))
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_base64())
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", self.to_base64())
    }
}

impl Serialize for PublicKey {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_base64())
    }
}

impl<'de> Deserialize<'de> for PublicKey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::from_base64(&s).map_err(de::Error::custom)
    }
}

/// ed25519 signing key. zeroized on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SigningKey {
    #[zeroize(skip)] // SigningKey handles its own zeroization
    key: ed25519_consensus::SigningKey,
}

impl SigningKey {
    /// generate a new random signing key.
    pub fn generate() -> Self {
        let seed: [u8; SEED_LEN] = rand::random();
        Self::from_seed(seed)
    }

    /// create from a 32-byte seed.
    pub fn from_seed(seed: [u8; SEED_LEN]) -> Self {
        Self {
            key: ed25519_consensus::SigningKey::from(seed),
        }
    }

    /// get the seed bytes.
    ///
    /// warning: this is sensitive key material.
    pub fn to_seed(&self) -> [u8; SEED_LEN] {
        self.key.to_bytes()
    }

    /// parse a key file body.
    ///
    /// accepts base64url of either the 32-byte seed or the 64-byte
    /// `seed || public key` form written by [`SigningKey::to_base64`]. the
    /// public half of the long form must match the seed.
    pub fn from_base64(encoded: &str) -> Result<Self, Error> {
        let mut bytes = encoding::decode(encoded)?;
        let result = match bytes.len() {
            SEED_LEN | 64 => {
                let mut seed = [0u8; SEED_LEN];
                seed.copy_from_slice(&bytes[..SEED_LEN]);
                let key = Self::from_seed(seed);
                seed.zeroize();
                if bytes.len() == 64 && key.public_key().as_bytes()[..] != bytes[SEED_LEN..] {
                    Err(Error::InvalidPublicKey)
                } else {
                    Ok(key)
                }
            }
            actual => Err(Error::InvalidKeyLength {
                expected: 64,
                actual,
            }),
        };
        bytes.zeroize();
        result
    }

    /// encode as base64url of `seed || public key`.
    ///
    /// warning: this is sensitive key material.
    pub fn to_base64(&self) -> String {
        let mut bytes = Vec::with_capacity(64);
        bytes.extend_from_slice(&self.to_seed());
        bytes.extend_from_slice(self.public_key().as_bytes());
        let encoded = encoding::encode(&bytes);
        bytes.zeroize();
        encoded
    }

    /// get the corresponding public key.
    pub fn public_key(&self) -> PublicKey {
        PublicKey(self.key.verification_key())
    }

    /// sign a message, returning the 64-byte signature.
    pub fn sign(&self, message: &[u8]) -> [u8; SIGNATURE_LEN] {
        self.key.sign(message).to_bytes()
    }

    /// sign a message, returning a base64url signature.
    pub fn sign_base64(&self, message: &[u8]) -> String {
        encoding::encode(self.sign(message))
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKey")
            .field("public_key", &self.public_key())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_key_base64_roundtrip() {
        let original = SigningKey::generate().public_key();
        let restored = PublicKey::from_base64(&original.to_base64()).unwrap();
        assert_eq!(original, restored);
    }

    #[test]
    fn public_key_try_from_invalid_length() {
        let short = [0u8; 16];
        assert!(matches!(
            PublicKey::try_from(&short[..]),
            Err(Error::InvalidKeyLength { .. })
        ));
    }

    #[test]
    fn sign_and_verify() {
        let key = SigningKey::generate();
        let public = key.public_key();
        let signature = key.sign(b"test message");
        assert!(public.verify(&signature, b"test message").is_ok());
        assert!(public.verify(&signature, b"other message").is_err());
    }

    #[test]
    fn verify_base64_rejects_garbage() {
        let public = SigningKey::generate().public_key();
        assert!(matches!(
            public.verify_base64("not base64 !!", b"msg"),
            Err(Error::InvalidSignature)
        ));
    }

    #[test]
    fn decode_signature_checks_length() {
        let key = SigningKey::generate();
        let encoded = key.sign_base64(b"msg");
        assert_eq!(decode_signature(&encoded).unwrap(), key.sign(b"msg"));
        assert!(decode_signature(&encoding::encode([0u8; 10])).is_err());
    }

    #[test]
    fn verify_wrong_key_fails() {
        let signer = SigningKey::generate();
        let other = SigningKey::generate().public_key();
        let signature = signer.sign(b"msg");
        assert!(other.verify(&signature, b"msg").is_err());
    }

    #[test]
    fn signing_key_file_roundtrip() {
        let key = SigningKey::generate();
        let restored = SigningKey::from_base64(&key.to_base64()).unwrap();
        assert_eq!(key.public_key(), restored.public_key());
        assert_eq!(key.to_seed(), restored.to_seed());
    }

    #[test]
    fn signing_key_accepts_bare_seed() {
        let key = SigningKey::from_seed([9; SEED_LEN]);
        let restored = SigningKey::from_base64(&encoding::encode([9u8; SEED_LEN])).unwrap();
        assert_eq!(key.public_key(), restored.public_key());
    }

    #[test]
    fn signing_key_rejects_mismatched_public_half() {
        let mut bytes = [9u8; 64].to_vec();
        bytes[40] ^= 1;
        assert!(SigningKey::from_base64(&encoding::encode(&bytes)).is_err());
    }

    #[test]
    fn public_key_serde_is_base64() {
        let key = SigningKey::generate().public_key();
        let json = serde_json::to_string(&key).unwrap();
        let parsed: PublicKey = serde_json::from_str(&json).unwrap();
        assert_eq!(key, parsed);
    }
}
