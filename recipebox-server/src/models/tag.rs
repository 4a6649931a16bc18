//! Tag label validation

use super::validation::check_len;
use super::ValidationError;

const MAX_TAG_LEN: usize = 64;

/// Validated tag label (trimmed, non-empty)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TagLabel(String);

impl TagLabel {
    pub fn new(s: &str) -> Result<Self, ValidationError> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::Empty { field: "tag" });
        }
        check_len("tag", trimmed, MAX_TAG_LEN)?;
        Ok(Self(trimmed.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_and_bounds() {
        assert_eq!(TagLabel::new(" vegan ").unwrap().as_str(), "vegan");
        assert!(TagLabel::new("").is_err());
        assert!(TagLabel::new(&"t".repeat(64)).is_ok());
        assert!(matches!(
            TagLabel::new(&"t".repeat(65)).unwrap_err(),
            ValidationError::TooLong { max: 64, .. }
        ));
    }
}
