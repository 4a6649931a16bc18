//! Expiring signed download URLs
//!
//! A URL carries `expires` (unix seconds) and `signature`, the hex
//! HMAC-SHA256 of `"<key>\n<expires>\n"` under the server secret.

use chrono::{DateTime, Duration, TimeZone, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Default lifetime of a signed URL in seconds (7 days).
pub const DEFAULT_URL_TTL_SECS: u64 = 7 * 24 * 60 * 60;

/// URLs expiring sooner than this many seconds are re-signed on read.
const REFRESH_WINDOW_SECS: i64 = 60 * 60;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedUrl {
    pub url: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SignatureError {
    #[error("signed URL has expired")]
    Expired,

    #[error("signature does not match")]
    Invalid,

    #[error("URL expiry is out of range")]
    OutOfRange,
}

/// Mints and checks signed object URLs
#[derive(Clone)]
pub struct UrlSigner {
    keyed: HmacSha256,
    base_url: String,
    ttl: Duration,
}

impl std::fmt::Debug for UrlSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UrlSigner")
            .field("secret", &"[redacted]")
            .field("base_url", &self.base_url)
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl UrlSigner {
    pub fn new(
        secret: &[u8],
        base_url: &str,
        ttl: Duration,
    ) -> Result<Self, hmac::digest::InvalidLength> {
        Ok(Self {
            keyed: HmacSha256::new_from_slice(secret)?,
            base_url: base_url.trim_end_matches('/').to_string(),
            ttl,
        })
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Sign `key` with an expiry of `now + ttl`.
    pub fn sign(&self, key: &str, now: DateTime<Utc>) -> Result<SignedUrl, SignatureError> {
        let expires_at = now
            .checked_add_signed(self.ttl)
            .ok_or(SignatureError::OutOfRange)?;
        let expires = expires_at.timestamp();
        let signature = hex::encode(self.mac(key, expires).finalize().into_bytes());

        Ok(SignedUrl {
            url: format!(
                "{}/objects/{}?expires={}&signature={}",
                self.base_url, key, expires, signature
            ),
            // Round-trip through the encoded form so the stored expiry matches the URL
            expires_at: Utc.timestamp_opt(expires, 0).single().unwrap_or(expires_at),
        })
    }

    /// Check a presented signature for `key`.
    pub fn verify(
        &self,
        key: &str,
        expires: i64,
        signature: &str,
        now: DateTime<Utc>,
    ) -> Result<(), SignatureError> {
        let presented = hex::decode(signature).map_err(|_| SignatureError::Invalid)?;
        self.mac(key, expires)
            .verify_slice(&presented)
            .map_err(|_| SignatureError::Invalid)?;

        if expires < now.timestamp() {
            return Err(SignatureError::Expired);
        }
        Ok(())
    }

    fn mac(&self, key: &str, expires: i64) -> HmacSha256 {
        let mut mac = self.keyed.clone();
        mac.update(format!("{key}\n{expires}\n").as_bytes());
        mac
    }
}

/// Whether a URL expiring at `expiry` should be re-signed now.
pub fn needs_refresh(expiry: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now.checked_add_signed(Duration::seconds(REFRESH_WINDOW_SECS))
        .map_or(true, |limit| expiry < limit)
}
