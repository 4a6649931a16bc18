//! Password hashing
//!
//! Hashes are stored as `pbkdf2-sha256$<iterations>$<hex>`. Verification
//! reads the iteration count from the stored hash, so raising the
//! configured count only affects new hashes.

use sha2::Sha256;
use subtle::ConstantTimeEq;

/// Default PBKDF2 iteration count.
pub const DEFAULT_HASH_ITERATIONS: u32 = 100_000;

const SCHEME: &str = "pbkdf2-sha256";
const KEY_LEN: usize = 32;
const PLACEHOLDER_SALT: &str = "recipebox-no-such-user";

/// Salted password hasher
#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    iterations: u32,
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new(DEFAULT_HASH_ITERATIONS)
    }
}

impl PasswordHasher {
    pub fn new(iterations: u32) -> Self {
        Self {
            iterations: iterations.max(1),
        }
    }

    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    /// Hash `password` with `salt`.
    pub fn hash(&self, password: &str, salt: &str) -> String {
        let key = derive(password, salt, self.iterations);
        format!("{}${}${}", SCHEME, self.iterations, hex::encode(key))
    }

    /// Check `password` against a stored hash. Malformed hashes never match.
    pub fn verify(&self, password: &str, salt: &str, stored: &str) -> bool {
        let Some((iterations, expected)) = parse_stored(stored) else {
            tracing::warn!("stored password hash has an unknown format");
            return false;
        };

        let key = derive(password, salt, iterations);
        key.as_slice().ct_eq(expected.as_slice()).into()
    }

    /// Spend the same derivation work as [`verify`](Self::verify) for a
    /// login whose account does not exist. The placeholder key is all
    /// zeros, which no derivation produces in practice.
    pub fn verify_missing(&self, password: &str) -> bool {
        let placeholder = format!("{}${}${}", SCHEME, self.iterations, hex::encode([0u8; KEY_LEN]));
        self.verify(password, PLACEHOLDER_SALT, &placeholder)
    }
}

fn parse_stored(stored: &str) -> Option<(u32, Vec<u8>)> {
    let mut parts = stored.splitn(3, '$');
    if parts.next()? != SCHEME {
        return None;
    }
    let iterations: u32 = parts.next()?.parse().ok().filter(|n| *n > 0)?;
    let key = hex::decode(parts.next()?).ok()?;
    (key.len() == KEY_LEN).then_some((iterations, key))
}

fn derive(password: &str, salt: &str, iterations: u32) -> [u8; KEY_LEN] {
    let mut out = [0u8; KEY_LEN];
    pbkdf2::pbkdf2_hmac::<Sha256>(password.as_bytes(), salt.as_bytes(), iterations, &mut out);
    out
}
