//! base64url helpers shared by storage and the wire format.
//!
//! everything chronicle emits (hashes, keys, signatures, summary state) is
//! url-safe base64 with padding. decoding accepts input with or without
//! padding, since peers are not required to pad.

use base64::Engine;
use base64::alphabet::URL_SAFE;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};

use crate::Error;

const ENGINE: GeneralPurpose = GeneralPurpose::new(
    &URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(true)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// encode bytes as padded base64url.
pub fn encode(bytes: impl AsRef<[u8]>) -> String {
    ENGINE.encode(bytes)
}

/// decode base64url, padded or not.
pub fn decode(encoded: &str) -> Result<Vec<u8>, Error> {
    Ok(ENGINE.decode(encoded.trim())?)
}
