//! Validation error types

use std::fmt;

/// Validation error for domain models
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Field is empty when it shouldn't be
    Empty { field: &'static str },

    /// Field is shorter than the minimum length
    TooShort { field: &'static str, min: usize },

    /// Field exceeds maximum length
    TooLong { field: &'static str, max: usize },

    /// String doesn't match required format
    InvalidFormat { field: &'static str, reason: &'static str },

    /// Two fields that must agree do not
    Mismatch { field: &'static str, other: &'static str },

    /// A partial update carried no changes
    NoChanges { fields: &'static str },

    /// The same item was referenced where two distinct items are required
    SameItem { field: &'static str },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty { field } => write!(f, "{} is required", field),
            Self::TooShort { field, min } => {
                write!(f, "{} must be at least {} characters", field, min)
            }
            Self::TooLong { field, max } => {
                write!(f, "{} exceeds maximum length of {} characters", field, max)
            }
            Self::InvalidFormat { field, reason } => {
                write!(f, "{}: {}", field, reason)
            }
            Self::Mismatch { field, other } => {
                write!(f, "{} does not match {}", field, other)
            }
            Self::NoChanges { fields } => {
                write!(f, "at least one of {} is required", fields)
            }
            Self::SameItem { field } => {
                write!(f, "{} must reference two different items", field)
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// Reject a value longer than `max` characters.
pub(crate) fn check_len(field: &'static str, s: &str, max: usize) -> Result<(), ValidationError> {
    if s.chars().count() > max {
        return Err(ValidationError::TooLong { field, max });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = ValidationError::TooLong {
            field: "name",
            max: 256,
        };
        assert_eq!(
            err.to_string(),
            "name exceeds maximum length of 256 characters"
        );
    }

    #[test]
    fn no_changes_display() {
        let err = ValidationError::NoChanges {
            fields: "name or description",
        };
        assert_eq!(
            err.to_string(),
            "at least one of name or description is required"
        );
    }

    #[test]
    fn check_len_counts_chars_not_bytes() {
        // 4 chars, 8 bytes
        assert!(check_len("unit", "éééé", 4).is_ok());
        assert!(check_len("unit", "ééééé", 4).is_err());
    }
}
