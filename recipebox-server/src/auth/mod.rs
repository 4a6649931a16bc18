//! Credentials and sessions
//!
//! - [`password`]: salted PBKDF2-HMAC-SHA256 hashes
//! - [`token`]: random URL-safe strings for salts and session tokens
//! - [`pruner`]: background removal of expired sessions

pub mod password;
pub mod pruner;
pub mod token;

pub use password::{PasswordHasher, DEFAULT_HASH_ITERATIONS};
pub use pruner::{PruneSessions, SessionPruner, DEFAULT_PRUNE_INTERVAL};
pub use token::{generate_token, SALT_LEN, SESSION_TOKEN_LEN};
