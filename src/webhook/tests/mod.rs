//! Unit tests for the webhook surface.


use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use hmac::{Hmac, Mac};
use sha1::Sha1;
use sha2::Sha256;

pub(super) const GITHUB_SECRET: &str = "gh-webhook-secret";
pub(super) const TRELLO_SECRET: &str = "trello-app-secret";
pub(super) const CALLBACK_URL: &str = "https://signoff.example.com/trello/integration";

pub(super) fn github_signature(secret: &str, body: &[u8]) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).expect("hmac key");
    mac.update(body);
    let digest = mac.finalize().into_bytes();
    let hex: String = digest.iter().map(|byte| format!("{byte:02x}")).collect();
    format!("sha256={hex}")
}

pub(super) fn trello_signature(secret: &str, body: &[u8], callback_url: &str) -> String {
    let mut mac = Hmac::<Sha1>::new_from_slice(secret.as_bytes()).expect("hmac key");
    mac.update(body);
    mac.update(callback_url.as_bytes());
    STANDARD.encode(mac.finalize().into_bytes())
}
