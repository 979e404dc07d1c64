//! Artifact Store: fitted transform, feature contract and classifier per
//! smell category.

pub mod contract;
pub mod model;
pub mod store;
pub mod transform;

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

pub use contract::FeatureContract;
pub use model::{Classifier, ClassifierModel, Label};
pub use store::ArtifactStore;
pub use transform::PreprocessingTransform;

use crate::category::SmellCategory;

/// The three files making up a category's artifact set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    PreprocessingPipeline,
    SelectedFeatures,
    FinalModel,
}

impl ArtifactKind {
    pub fn file_name(self) -> &'static str {
        match self {
            Self::PreprocessingPipeline => "preprocessing_pipeline.json",
            Self::SelectedFeatures => "selected_features.json",
            Self::FinalModel => "final_model.json",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::PreprocessingPipeline => "preprocessing_pipeline",
            Self::SelectedFeatures => "selected_features",
            Self::FinalModel => "final_model",
        };
        f.write_str(name)
    }
}

/// Content fingerprint of one artifact file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactDigest {
    pub artifact: ArtifactKind,
    pub algorithm: String,
    pub value: String,
}

/// Immutable artifact triple for one category.
pub struct ArtifactSet {
    pub category: SmellCategory,
    pub transform: PreprocessingTransform,
    pub contract: FeatureContract,
    pub model: Arc<dyn Classifier>,
    /// Empty for sets built in memory rather than read from disk.
    pub digests: Vec<ArtifactDigest>,
}

impl ArtifactSet {
    /// Assembles a set from in-memory parts, validating the transform
    /// against the contract.
    pub fn new(
        category: SmellCategory,
        transform: PreprocessingTransform,
        contract: FeatureContract,
        model: Arc<dyn Classifier>,
    ) -> Result<Self, String> {
        transform.validate(&contract)?;
        Ok(Self {
            category,
            transform,
            contract,
            model,
            digests: Vec::new(),
        })
    }
}

impl fmt::Debug for ArtifactSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArtifactSet")
            .field("category", &self.category)
            .field("transform", &self.transform)
            .field("contract", &self.contract)
            .field("model", &self.model.kind())
            .field("digests", &self.digests)
            .finish()
    }
}
