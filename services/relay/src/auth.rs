//! Canonical-string signer/verifier for the signed control plane.
//!
//! Canonical message (joined by `\n`): `op, path, payloadHashHex, iat, nonce`.
//! Signatures are HMAC-SHA256 over that string, encoded base64url without
//! padding. Comparison is constant-time; nonce replay tracking lives in the
//! event actor, not here, since it is per-event state.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use relay_protocol::EMPTY_BODY_SHA256_HEX;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::config::CLOCK_SKEW_TOLERANCE;
use crate::error::RelayError;

type HmacSha256 = Hmac<Sha256>;

pub struct CanonicalRequest<'a> {
    pub op: &'a str,
    pub path: &'a str,
    pub payload_hash_hex: &'a str,
    pub iat: i64,
    pub nonce: &'a str,
}

impl CanonicalRequest<'_> {
    pub fn canonical_string(&self) -> String {
        format!(
            "{}\n{}\n{}\n{}\n{}",
            self.op, self.path, self.payload_hash_hex, self.iat, self.nonce
        )
    }
}

/// Lowercase hex SHA-256 of `bytes`.
pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Raw HMAC-SHA256 bytes over `message` under `secret`.
pub fn sign(secret: &[u8], message: &str) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC accepts any key length");
    mac.update(message.as_bytes());
    mac.finalize().into_bytes().to_vec()
}

pub fn encode_signature(raw: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(raw)
}

fn decode_signature(sig: &str) -> Option<Vec<u8>> {
    URL_SAFE_NO_PAD.decode(sig).ok()
}

/// Verify `sig` (base64url) against the canonical string built from `req`,
/// given the caller-supplied `now`. Does not consult the nonce store.
pub fn verify(secret: &[u8], req: &CanonicalRequest<'_>, sig: &str, now: i64) -> Result<(), RelayError> {
    let drift = (now - req.iat).abs();
    if drift > CLOCK_SKEW_TOLERANCE.as_secs() as i64 {
        return Err(RelayError::ClockSkew { server_time: now });
    }

    let provided = decode_signature(sig).ok_or(RelayError::BadSignature)?;
    let expected = sign(secret, &req.canonical_string());

    let equal: bool = expected.ct_eq(&provided).into();
    if !equal {
        return Err(RelayError::BadSignature);
    }

    Ok(())
}

/// `ws-auth` frames carry no request body, so their payload hash must equal
/// the fixed empty-body digest.
pub fn is_empty_body_hash(payload_hash_hex: &str) -> bool {
    payload_hash_hex == EMPTY_BODY_SHA256_HEX
}
