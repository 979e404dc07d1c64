use crate::TOOL_NAME;
use crate::report::model::{Report, RunStatus};

pub fn render_text(report: &Report) -> String {
    let mut out = String::new();
    out.push_str(&format!("{} {}\n", TOOL_NAME, report.tool.version));
    out.push_str(&format!("Project: {}\n", report.project));
    for c in &report.categories {
        match (&c.status, &c.error) {
            (RunStatus::Failed, Some(err)) => {
                out.push_str(&format!("{}: failed [{}] {}\n", c.category, err.kind, err.detail));
            }
            _ => {
                out.push_str(&format!("{}: {} finding(s)\n", c.category, c.findings.len()));
                for f in &c.findings {
                    out.push_str(&format!("  - {} ({})\n", f.class, f.file));
                }
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::SmellCategory;
    use crate::error::PipelineError;
    use crate::pipeline::CategoryOutcome;
    use crate::report::model::{SmellFinding, ToolInfo};

    #[test]
    fn renders_findings_and_failures() {
        let report = Report::new(
            ToolInfo {
                name: "smellscan".into(),
                version: "0.1.0".into(),
            },
            "/src/shop",
            vec![
                CategoryOutcome {
                    category: SmellCategory::new("god-class").unwrap(),
                    result: Ok(vec![SmellFinding {
                        file: "/src/shop/OrderProcessor.java".into(),
                        class: "OrderProcessor".into(),
                    }]),
                    artifacts: vec![],
                },
                CategoryOutcome {
                    category: SmellCategory::new("long-method").unwrap(),
                    result: Err(PipelineError::ExtractionTimeout { timeout_secs: 3 }),
                    artifacts: vec![],
                },
            ],
        );

        let text = render_text(&report);
        assert!(text.contains("god-class: 1 finding(s)"));
        assert!(text.contains("  - OrderProcessor (/src/shop/OrderProcessor.java)"));
        assert!(text.contains("long-method: failed [extraction_timeout]"));
    }
}
