//! Delivery signature verification for both webhook senders.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use hmac::{Hmac, Mac};
use sha1::Sha1;
use sha2::Sha256;
use thiserror::Error;

const GITHUB_SIGNATURE_PREFIX: &str = "sha256=";

/// Reasons a delivery signature is rejected.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SignatureError {
    /// The signature header is absent.
    #[error("signature header is missing")]
    Missing,

    /// The signature header cannot be decoded.
    #[error("signature header is malformed: {0}")]
    Malformed(String),

    /// The signature does not match the body.
    #[error("signature does not match payload")]
    Mismatch,
}

/// Verifies an `X-Hub-Signature-256` header of the form `sha256=<hex>`.
///
/// # Errors
///
/// Returns [`SignatureError`] unless the header carries the HMAC-SHA256 of
/// `body` keyed with `secret`.
pub fn verify_github_signature(
    secret: &[u8],
    body: &[u8],
    header: Option<&str>,
) -> Result<(), SignatureError> {
    let raw = header.ok_or(SignatureError::Missing)?;
    let digest_hex = raw
        .trim()
        .strip_prefix(GITHUB_SIGNATURE_PREFIX)
        .ok_or_else(|| SignatureError::Malformed("expected sha256=<hex>".to_owned()))?;
    let expected = decode_hex(digest_hex)?;

    let mut mac = Hmac::<Sha256>::new_from_slice(secret)
        .map_err(|err| SignatureError::Malformed(err.to_string()))?;
    mac.update(body);
    mac.verify_slice(&expected)
        .map_err(|_| SignatureError::Mismatch)
}

/// Verifies an `X-Trello-Webhook` header.
///
/// The task board signs the body followed by the registered callback URL
/// with HMAC-SHA1 and base64-encodes the digest.
///
/// # Errors
///
/// Returns [`SignatureError`] unless the header matches.
pub fn verify_trello_signature(
    secret: &[u8],
    body: &[u8],
    callback_url: &str,
    header: Option<&str>,
) -> Result<(), SignatureError> {
    let raw = header.ok_or(SignatureError::Missing)?;
    let expected = STANDARD
        .decode(raw.trim())
        .map_err(|err| SignatureError::Malformed(err.to_string()))?;

    let mut mac = Hmac::<Sha1>::new_from_slice(secret)
        .map_err(|err| SignatureError::Malformed(err.to_string()))?;
    mac.update(body);
    mac.update(callback_url.as_bytes());
    mac.verify_slice(&expected)
        .map_err(|_| SignatureError::Mismatch)
}

fn decode_hex(raw: &str) -> Result<Vec<u8>, SignatureError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || !trimmed.len().is_multiple_of(2) || !trimmed.is_ascii() {
        return Err(SignatureError::Malformed(
            "digest must be an even number of hex characters".to_owned(),
        ));
    }
    trimmed
        .as_bytes()
        .chunks(2)
        .map(|pair| {
            let text = std::str::from_utf8(pair)
                .map_err(|err| SignatureError::Malformed(err.to_string()))?;
            u8::from_str_radix(text, 16)
                .map_err(|_| SignatureError::Malformed(format!("invalid hex byte '{text}'")))
        })
        .collect()
}
