//! Random tokens over a 64-symbol URL-safe alphabet

use rand::Rng;

const CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789-_";

/// Length of per-user password salts.
pub const SALT_LEN: usize = 32;

/// Length of session tokens.
pub const SESSION_TOKEN_LEN: usize = 32;

/// Generate a random token of `len` characters from `[a-zA-Z0-9-_]`.
pub fn generate_token(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| CHARSET[rng.gen_range(0..CHARSET.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn charset_has_64_symbols() {
        assert_eq!(CHARSET.len(), 64);
    }

    #[test]
    fn tokens_have_length_and_alphabet() {
        let token = generate_token(SESSION_TOKEN_LEN);
        assert_eq!(token.len(), SESSION_TOKEN_LEN);
        assert!(token
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_'));
    }

    #[test]
    fn tokens_differ() {
        assert_ne!(generate_token(32), generate_token(32));
    }

    #[test]
    fn zero_length() {
        assert!(generate_token(0).is_empty());
    }
}
