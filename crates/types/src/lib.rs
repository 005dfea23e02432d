//! Validated text primitives shared by the cohort crates.
//!
//! Workspace names and filter fields arrive from free-form user input. These types keep the
//! trimming and blank-handling rules in one place so the core never has to re-check them.

/// Errors that can occur when creating validated text types.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TextError {
    /// The input text was empty or contained only whitespace
    #[error("Text cannot be empty")]
    Empty,
}

/// A string type that guarantees non-empty content.
///
/// This type wraps a `String` and ensures it contains at least one non-whitespace character.
/// The input is automatically trimmed of leading and trailing whitespace during construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NonEmptyText(String);

impl NonEmptyText {
    /// Trims `input`, returning `TextError::Empty` if nothing is left.
    pub fn new(input: impl AsRef<str>) -> Result<Self, TextError> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(TextError::Empty);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Creates a `NonEmptyText`, substituting `fallback` when `input` is blank.
    ///
    /// `fallback` itself must be non-blank.
    pub fn new_or(input: impl AsRef<str>, fallback: &str) -> Result<Self, TextError> {
        Self::new(input).or_else(|_| Self::new(fallback))
    }

    /// Returns the inner string as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

}

/// Returns the trimmed input, or `None` when it is empty or whitespace.
pub fn non_blank(input: impl AsRef<str>) -> Option<String> {
    let trimmed = input.as_ref().trim();
    (!trimmed.is_empty()).then(|| trimmed.to_owned())
}

impl std::fmt::Display for NonEmptyText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for NonEmptyText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl serde::Serialize for NonEmptyText {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for NonEmptyText {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        NonEmptyText::new(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_trims_input() {
        let text = NonEmptyText::new("  Diabetes Q1  ").expect("should accept padded text");
        assert_eq!(text.as_str(), "Diabetes Q1");
    }

    #[test]
    fn test_new_rejects_whitespace_only() {
        assert_eq!(NonEmptyText::new("   \t"), Err(TextError::Empty));
        assert_eq!(NonEmptyText::new(""), Err(TextError::Empty));
    }

    #[test]
    fn test_new_or_uses_fallback_for_blank_input() {
        let text = NonEmptyText::new_or(" ", "Untitled Workspace").expect("fallback is valid");
        assert_eq!(text.as_str(), "Untitled Workspace");

        let text = NonEmptyText::new_or("Asthma cohort", "Untitled Workspace")
            .expect("input is valid");
        assert_eq!(text.as_str(), "Asthma cohort");
    }

    #[test]
    fn test_non_blank() {
        assert_eq!(non_blank(" 18-65 "), Some("18-65".to_string()));
        assert_eq!(non_blank("   "), None);
        assert_eq!(non_blank(""), None);
    }

    #[test]
    fn test_deserialize_rejects_blank_string() {
        let err = serde_json::from_str::<NonEmptyText>("\"  \"");
        assert!(err.is_err(), "blank text must not deserialize");

        let ok: NonEmptyText = serde_json::from_str("\"COPD\"").expect("should deserialize");
        assert_eq!(ok.to_string(), "COPD");
    }
}
