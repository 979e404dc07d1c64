use serde::{Deserialize, Serialize};

use crate::SCHEMA_VERSION;
use crate::artifacts::ArtifactDigest;
use crate::category::SmellCategory;
use crate::error::{ErrorKind, PipelineError};
use crate::pipeline::CategoryOutcome;

/// One class classified as smelly.
///
/// Serializes to exactly `{"file": .., "class": ..}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmellFinding {
    pub file: String,
    pub class: String,
}

/// Tool metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInfo {
    pub name: String,
    pub version: String,
}

/// Full run report. Unlike the bare finding list, it tells a failed run
/// apart from a run that found nothing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub schema_version: String,
    pub tool: ToolInfo,
    pub project: String,
    pub categories: Vec<CategoryReport>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Ok,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub kind: ErrorKind,
    pub detail: String,
}

impl From<&PipelineError> for ErrorInfo {
    fn from(err: &PipelineError) -> Self {
        Self {
            kind: err.kind(),
            detail: err.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryReport {
    pub category: SmellCategory,
    pub status: RunStatus,
    pub findings: Vec<SmellFinding>,
    pub error: Option<ErrorInfo>,
    pub artifacts: Vec<ArtifactDigest>,
}

impl From<CategoryOutcome> for CategoryReport {
    fn from(outcome: CategoryOutcome) -> Self {
        let (status, findings, error) = match outcome.result {
            Ok(findings) => (RunStatus::Ok, findings, None),
            Err(e) => (RunStatus::Failed, Vec::new(), Some(ErrorInfo::from(&e))),
        };
        Self {
            category: outcome.category,
            status,
            findings,
            error,
            artifacts: outcome.artifacts,
        }
    }
}

impl Report {
    pub fn new(tool: ToolInfo, project: impl Into<String>, outcomes: Vec<CategoryOutcome>) -> Self {
        Self {
            schema_version: SCHEMA_VERSION.to_string(),
            tool,
            project: project.into(),
            categories: outcomes.into_iter().map(CategoryReport::from).collect(),
        }
    }

    /// Findings of every category, in category order. Failed categories
    /// contribute nothing.
    pub fn findings(&self) -> Vec<SmellFinding> {
        self.categories
            .iter()
            .flat_map(|c| c.findings.iter().cloned())
            .collect()
    }

    pub fn has_failures(&self) -> bool {
        self.categories.iter().any(|c| c.status == RunStatus::Failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tool() -> ToolInfo {
        ToolInfo {
            name: "smellscan".into(),
            version: "0.1.0".into(),
        }
    }

    fn finding(file: &str, class: &str) -> SmellFinding {
        SmellFinding {
            file: file.into(),
            class: class.into(),
        }
    }

    fn outcome(id: &str, result: Result<Vec<SmellFinding>, PipelineError>) -> CategoryOutcome {
        CategoryOutcome {
            category: SmellCategory::new(id).unwrap(),
            result,
            artifacts: vec![],
        }
    }

    #[test]
    fn finding_serializes_to_file_and_class_only() {
        let json = serde_json::to_value(finding("A.java", "Foo")).unwrap();
        assert_eq!(json, serde_json::json!({"file": "A.java", "class": "Foo"}));
    }

    #[test]
    fn report_distinguishes_failure_from_no_findings() {
        let report = Report::new(
            tool(),
            "/src",
            vec![
                outcome("god-class", Ok(vec![])),
                outcome(
                    "long-method",
                    Err(PipelineError::MissingFeatures {
                        missing: vec!["wmc".into()],
                    }),
                ),
            ],
        );

        assert_eq!(report.categories[0].status, RunStatus::Ok);
        assert!(report.categories[0].error.is_none());
        assert_eq!(report.categories[1].status, RunStatus::Failed);
        assert_eq!(
            report.categories[1].error.as_ref().unwrap().kind,
            ErrorKind::MissingFeatures
        );
        assert!(report.has_failures());
        assert!(report.findings().is_empty());
    }

    #[test]
    fn findings_are_concatenated_in_category_order() {
        let report = Report::new(
            tool(),
            "/src",
            vec![
                outcome("god-class", Ok(vec![finding("A.java", "A")])),
                outcome("data-class", Ok(vec![finding("B.java", "B")])),
            ],
        );
        assert_eq!(
            report.findings(),
            vec![finding("A.java", "A"), finding("B.java", "B")]
        );
        assert!(!report.has_failures());
    }

    #[test]
    fn status_serializes_snake_case() {
        assert_eq!(serde_json::to_string(&RunStatus::Failed).unwrap(), "\"failed\"");
    }
}
