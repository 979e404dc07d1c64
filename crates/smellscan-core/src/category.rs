use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

/// Identifier selecting which artifact triple a run scores against,
/// e.g. `god-class` or `long-method`.
///
/// The identifier doubles as a directory name under the artifact root, so
/// only lowercase ASCII letters, digits, `-` and `_` are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SmellCategory(String);

impl SmellCategory {
    pub fn new(id: impl Into<String>) -> Result<Self, PipelineError> {
        let id = id.into();
        let valid = !id.is_empty()
            && id
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_');
        if valid {
            Ok(Self(id))
        } else {
            Err(PipelineError::InvalidCategory(id))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SmellCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for SmellCategory {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for SmellCategory {
    type Error = PipelineError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<SmellCategory> for String {
    fn from(value: SmellCategory) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_slug_identifiers() {
        assert_eq!(SmellCategory::new("god-class").unwrap().as_str(), "god-class");
        assert!("long_method2".parse::<SmellCategory>().is_ok());
    }

    #[test]
    fn rejects_path_like_identifiers() {
        for bad in ["", "../etc", "God-Class", "a/b", "a b"] {
            let err = SmellCategory::new(bad).unwrap_err();
            assert!(matches!(err, PipelineError::InvalidCategory(_)), "{bad}");
        }
    }

    #[test]
    fn deserializes_through_validation() {
        let ok: SmellCategory = serde_json::from_str("\"data-class\"").unwrap();
        assert_eq!(ok.to_string(), "data-class");
        assert!(serde_json::from_str::<SmellCategory>("\"..\"").is_err());
    }
}
