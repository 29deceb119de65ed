//! signed http bodies.
//!
//! every chronicle response carries a detached ed25519 signature over the raw
//! body bytes in the `Body-Signature-Ed25519` header (base64url). requests
//! from registered clients do the same and name the client in
//! `Chronicle-Client-Key-ID`.

use crate::{Error, PublicKey, SigningKey};

/// header carrying the base64url ed25519 signature of the body.
pub const BODY_SIGNATURE_HEADER: &str = "body-signature-ed25519";

/// header naming the registered client that signed a request.
pub const CLIENT_ID_HEADER: &str = "chronicle-client-key-id";

/// sign a body, returning the header value.
pub fn sign_body(key: &SigningKey, body: &[u8]) -> String {
    key.sign_base64(body)
}

/// verify a body against the header value, if one was sent.
pub fn verify_body(key: &PublicKey, body: &[u8], header: Option<&str>) -> Result<(), Error> {
    let signature = header.ok_or(Error::InvalidSignature)?;
    key.verify_base64(signature, body)
}
