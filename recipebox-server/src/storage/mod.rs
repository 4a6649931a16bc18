//! Object storage for uploaded files
//!
//! Bytes go to an [`ObjectStore`]; the database only keeps the object key
//! and a signed download URL minted by [`UrlSigner`].

pub mod local;
pub mod signing;

use async_trait::async_trait;
use uuid::Uuid;

pub use local::LocalObjectStore;
pub use signing::{needs_refresh, SignatureError, SignedUrl, UrlSigner, DEFAULT_URL_TTL_SECS};

const MAX_FILENAME_LEN: usize = 128;

/// Storage errors
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("object not found: {0}")]
    NotFound(String),

    #[error("invalid object key: {0}")]
    InvalidKey(String),
}

/// Byte store keyed by flat object names (testable)
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put(&self, key: &str, bytes: &[u8]) -> Result<(), StorageError>;

    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError>;

    async fn delete(&self, key: &str) -> Result<(), StorageError>;
}

/// Object key for an upload: `<uuid>-<sanitized file name>`.
pub fn object_key(filename: &str) -> String {
    format!("{}-{}", Uuid::new_v4(), sanitize_filename(filename))
}

/// Reduce a client-supplied file name to `[A-Za-z0-9._-]`.
///
/// Directory components are dropped, other characters become `_`, leading
/// dots are stripped, and the result is capped at 128 characters.
pub fn sanitize_filename(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);

    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();

    let cleaned = cleaned.trim_start_matches('.');
    let cleaned: String = cleaned.chars().take(MAX_FILENAME_LEN).collect();

    if cleaned.is_empty() {
        "file".to_string()
    } else {
        cleaned
    }
}

/// Keys must be flat, non-empty, and drawn from the sanitized alphabet.
pub(crate) fn validate_key(key: &str) -> Result<(), StorageError> {
    let valid = !key.is_empty()
        && !key.starts_with('.')
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));

    if valid {
        Ok(())
    } else {
        Err(StorageError::InvalidKey(key.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_strips_paths_and_odd_chars() {
        assert_eq!(sanitize_filename("pie crust.jpg"), "pie_crust.jpg");
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("C:\\photos\\tarte.png"), "tarte.png");
        assert_eq!(sanitize_filename(".hidden"), "hidden");
        assert_eq!(sanitize_filename("crème brûlée.png"), "cr_me_br_l_e.png");
    }

    #[test]
    fn sanitize_never_returns_empty() {
        assert_eq!(sanitize_filename(""), "file");
        assert_eq!(sanitize_filename("..."), "file");
        assert_eq!(sanitize_filename("dir/"), "file");
    }

    #[test]
    fn sanitize_caps_length() {
        let long = "a".repeat(500);
        assert_eq!(sanitize_filename(&long).len(), MAX_FILENAME_LEN);
    }

    #[test]
    fn object_keys_are_unique_and_valid() {
        let a = object_key("cake.png");
        let b = object_key("cake.png");
        assert_ne!(a, b);
        assert!(a.ends_with("-cake.png"));
        assert!(validate_key(&a).is_ok());
    }

    #[test]
    fn rejects_traversal_keys() {
        for key in ["", "../x", "a/b", ".env", "a b"] {
            assert!(validate_key(key).is_err(), "{key}");
        }
    }
}
