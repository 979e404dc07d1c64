use crate::error::{PipelineError, Result};
use crate::metrics::MetricsTable;
use crate::pipeline::infer::Prediction;
use crate::report::model::SmellFinding;

/// Strips the package qualifier from a class identity: `a.b.Foo` becomes
/// `Foo`. Unqualified names are returned unchanged.
pub fn simplify(class: &str) -> &str {
    class.rsplit_once('.').map_or(class, |(_, last)| last)
}

/// Maps positive predictions back to `(file, simple class name)` pairs,
/// in row order. Rows are looked up by id, never by position.
pub fn project(table: &MetricsTable, predictions: &[Prediction]) -> Result<Vec<SmellFinding>> {
    predictions
        .iter()
        .filter(|p| p.label.is_smelly())
        .map(|p| {
            let row = table.row(p.row).ok_or_else(|| {
                PipelineError::inference(format!("prediction for unknown row {}", p.row))
            })?;
            Ok(SmellFinding {
                file: table.file_of(row),
                class: simplify(&table.class_of(row)).to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::Label;
    use crate::metrics::RowId;
    use crate::metrics::table::tests::table;

    fn pred(row: usize, smelly: bool) -> Prediction {
        Prediction {
            row: RowId(row),
            label: Label::from(smelly),
        }
    }

    #[test]
    fn simplify_keeps_last_segment() {
        assert_eq!(simplify("x.y.Foo"), "Foo");
        assert_eq!(simplify("Bar"), "Bar");
        assert_eq!(simplify("com.shop.Outer$Inner"), "Outer$Inner");
    }

    #[test]
    fn emits_only_positive_rows() {
        let t = table(
            &["file", "class"],
            &[&["A.java", "x.y.Foo"], &["B.java", "Bar"]],
        );
        let findings = project(&t, &[pred(0, true), pred(1, false)]).unwrap();
        assert_eq!(
            findings,
            vec![SmellFinding {
                file: "A.java".into(),
                class: "Foo".into(),
            }]
        );
    }

    #[test]
    fn findings_keep_row_order() {
        let t = table(
            &["file", "class"],
            &[&["A.java", "p.A"], &["B.java", "p.B"], &["C.java", "p.C"]],
        );
        let findings = project(&t, &[pred(0, true), pred(1, true), pred(2, true)]).unwrap();
        let classes: Vec<_> = findings.iter().map(|f| f.class.as_str()).collect();
        assert_eq!(classes, vec!["A", "B", "C"]);
    }

    #[test]
    fn unknown_row_id_is_inference_error() {
        let t = table(&["file", "class"], &[&["A.java", "A"]]);
        let err = project(&t, &[pred(5, true)]).unwrap_err();
        assert!(matches!(err, PipelineError::InferenceError { .. }));
    }
}
