//! Slack request signature verification.
//!
//! Slack signs every Events API request with the app's signing secret:
//! `X-Slack-Signature: v0=<hex(HMAC-SHA256(secret, "v0:{timestamp}:{body}"))>`,
//! with the timestamp in `X-Slack-Request-Timestamp`. Requests older than the
//! tolerance window are rejected to block replays.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

const VERSION: &str = "v0";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureError {
    #[error("Missing signature header: {0}")]
    MissingHeader(&'static str),

    #[error("Invalid request timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("Request timestamp outside the {tolerance_secs}s window")]
    Stale { tolerance_secs: u64 },

    #[error("Malformed signature")]
    Malformed,

    #[error("Signature mismatch")]
    Mismatch,
}

/// Verifies `X-Slack-Signature` headers against the signing secret.
#[derive(Clone)]
pub struct SignatureVerifier {
    secret: String,
    tolerance_secs: u64,
}

impl std::fmt::Debug for SignatureVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignatureVerifier")
            .field("secret", &"[REDACTED]")
            .field("tolerance_secs", &self.tolerance_secs)
            .finish()
    }
}

impl SignatureVerifier {
    pub fn new(secret: impl Into<String>, tolerance_secs: u64) -> Self {
        Self {
            secret: secret.into(),
            tolerance_secs,
        }
    }

    /// Verify a request against the current wall clock.
    pub fn verify(
        &self,
        timestamp: Option<&str>,
        signature: Option<&str>,
        body: &[u8],
    ) -> Result<(), SignatureError> {
        self.verify_at(timestamp, signature, body, chrono::Utc::now().timestamp())
    }

    /// Verify a request as of `now` (unix seconds).
    pub fn verify_at(
        &self,
        timestamp: Option<&str>,
        signature: Option<&str>,
        body: &[u8],
        now: i64,
    ) -> Result<(), SignatureError> {
        let timestamp = timestamp.ok_or(SignatureError::MissingHeader("X-Slack-Request-Timestamp"))?;
        let signature = signature.ok_or(SignatureError::MissingHeader("X-Slack-Signature"))?;

        let sent_at: i64 = timestamp
            .trim()
            .parse()
            .map_err(|_| SignatureError::InvalidTimestamp(timestamp.to_string()))?;
        if now.abs_diff(sent_at) > self.tolerance_secs {
            return Err(SignatureError::Stale {
                tolerance_secs: self.tolerance_secs,
            });
        }

        let digest_hex = signature
            .strip_prefix("v0=")
            .ok_or(SignatureError::Malformed)?;
        let provided = hex::decode(digest_hex).map_err(|_| SignatureError::Malformed)?;

        // Constant-time comparison via `verify_slice`
        self.mac(timestamp, body)
            .verify_slice(&provided)
            .map_err(|_| SignatureError::Mismatch)
    }

    /// Compute the `X-Slack-Signature` value for a request.
    pub fn sign(&self, timestamp: &str, body: &[u8]) -> String {
        let digest = self.mac(timestamp, body).finalize().into_bytes();
        format!("{VERSION}={}", hex::encode(digest))
    }

    fn mac(&self, timestamp: &str, body: &[u8]) -> HmacSha256 {
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .expect("HMAC accepts any key length");
        mac.update(VERSION.as_bytes());
        mac.update(b":");
        mac.update(timestamp.as_bytes());
        mac.update(b":");
        mac.update(body);
        mac
    }
}
