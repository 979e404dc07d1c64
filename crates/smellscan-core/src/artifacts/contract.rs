use serde::{Deserialize, Serialize};

/// Ordered list of feature columns the classifier was trained on.
///
/// Serialized as a bare JSON array of column names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureContract(Vec<String>);

impl FeatureContract {
    /// Builds a contract, rejecting empty and duplicate feature lists.
    pub fn new(features: Vec<String>) -> Result<Self, String> {
        if features.is_empty() {
            return Err("feature list is empty".to_string());
        }
        for (i, f) in features.iter().enumerate() {
            if features[..i].contains(f) {
                return Err(format!("duplicate feature `{f}`"));
            }
        }
        Ok(Self(features))
    }

    pub fn features(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Parses and validates a contract from its JSON form.
    pub fn from_json(json: &str) -> Result<Self, String> {
        let features: Vec<String> =
            serde_json::from_str(json).map_err(|e| format!("invalid feature list: {e}"))?;
        Self::new(features)
    }
}
