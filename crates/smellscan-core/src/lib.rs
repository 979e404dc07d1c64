pub mod artifacts;
pub mod category;
pub mod config;
pub mod error;
pub mod extractor;
pub mod metrics;
pub mod pipeline;
pub mod report;

use std::path::Path;

use crate::category::SmellCategory;
use crate::config::PipelineConfig;
use crate::extractor::CkExtractor;
use crate::pipeline::Pipeline;
use crate::report::model::{Report, ToolInfo};

pub const TOOL_NAME: &str = "smellscan";

/// JSON schema version of the `report` output format.
/// Bump only when the envelope changes semantically.
pub const SCHEMA_VERSION: &str = "0.1.0";

/// Runs CK over `project` once and scores the result for every category.
pub fn scan(
    config: PipelineConfig,
    project: &Path,
    categories: &[SmellCategory],
    tool: ToolInfo,
) -> Report {
    let extractor = CkExtractor::from_config(&config);
    let pipeline = Pipeline::new(config, extractor);
    let outcomes = pipeline.detect_many(project, categories);
    Report::new(tool, project.display().to_string(), outcomes)
}
