//! Account credentials validation

use once_cell::sync::Lazy;
use regex::Regex;

use super::ValidationError;

const MIN_USERNAME_LEN: usize = 3;
const MAX_USERNAME_LEN: usize = 32;
const MAX_PASSWORD_LEN: usize = 128;

/// Letters, digits, dot, dash, underscore
static USERNAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_.-]+$").expect("invalid username regex"));

/// Validated username
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Username(String);

impl Username {
    /// Create a username.
    ///
    /// # Rules
    /// - 3 to 32 characters after trimming
    /// - ASCII letters, digits, `.`, `-`, `_`
    ///
    /// # Example
    /// ```
    /// use recipebox_server::models::Username;
    ///
    /// assert!(Username::new("julia.child").is_ok());
    /// assert!(Username::new("no spaces").is_err());
    /// ```
    pub fn new(s: &str) -> Result<Self, ValidationError> {
        let trimmed = s.trim();

        if trimmed.is_empty() {
            return Err(ValidationError::Empty { field: "username" });
        }
        if trimmed.len() < MIN_USERNAME_LEN {
            return Err(ValidationError::TooShort {
                field: "username",
                min: MIN_USERNAME_LEN,
            });
        }
        if trimmed.len() > MAX_USERNAME_LEN {
            return Err(ValidationError::TooLong {
                field: "username",
                max: MAX_USERNAME_LEN,
            });
        }
        if !USERNAME_RE.is_match(trimmed) {
            return Err(ValidationError::InvalidFormat {
                field: "username",
                reason: "may only contain letters, digits, '.', '-' and '_'",
            });
        }

        Ok(Self(trimmed.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for Username {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Plaintext password accepted at registration or login.
///
/// Never logged: `Debug` is redacted.
#[derive(Clone, PartialEq, Eq)]
pub struct Password(String);

impl Password {
    pub fn new(s: &str) -> Result<Self, ValidationError> {
        if s.is_empty() {
            return Err(ValidationError::Empty { field: "password" });
        }
        if s.len() > MAX_PASSWORD_LEN {
            return Err(ValidationError::TooLong {
                field: "password",
                max: MAX_PASSWORD_LEN,
            });
        }
        Ok(Self(s.to_owned()))
    }

    /// Registration form: password plus its confirmation.
    pub fn with_confirmation(password: &str, confirm: &str) -> Result<Self, ValidationError> {
        let password = Self::new(password)?;
        if password.0 != confirm {
            return Err(ValidationError::Mismatch {
                field: "password",
                other: "passwordConfirm",
            });
        }
        Ok(password)
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Password {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Password(***)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_usernames() {
        assert!(Username::new("abc").is_ok());
        assert!(Username::new("Julia_Child-1.0").is_ok());
        assert_eq!(Username::new("  bob  ").unwrap().as_str(), "bob");
    }

    #[test]
    fn rejects_bad_usernames() {
        assert!(matches!(
            Username::new("").unwrap_err(),
            ValidationError::Empty { .. }
        ));
        assert!(matches!(
            Username::new("ab").unwrap_err(),
            ValidationError::TooShort { min: 3, .. }
        ));
        assert!(matches!(
            Username::new(&"a".repeat(33)).unwrap_err(),
            ValidationError::TooLong { max: 32, .. }
        ));
        assert!(matches!(
            Username::new("bob smith").unwrap_err(),
            ValidationError::InvalidFormat { .. }
        ));
    }

    #[test]
    fn password_confirmation() {
        assert!(Password::with_confirmation("secret", "secret").is_ok());
        assert!(matches!(
            Password::with_confirmation("secret", "secreT").unwrap_err(),
            ValidationError::Mismatch { .. }
        ));
        assert!(matches!(
            Password::with_confirmation("", "").unwrap_err(),
            ValidationError::Empty { .. }
        ));
    }

    #[test]
    fn password_debug_is_redacted() {
        let p = Password::new("hunter2").unwrap();
        assert_eq!(format!("{:?}", p), "Password(***)");
    }
}
