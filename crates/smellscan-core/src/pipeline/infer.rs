use crate::artifacts::{Classifier, FeatureContract, Label};
use crate::error::{PipelineError, Result};
use crate::metrics::{MetricsTable, RowId, Value};

/// One classifier output, tied to the row it was computed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Prediction {
    pub row: RowId,
    pub label: Label,
}

/// Builds one feature vector per row: exactly the contract's columns, in
/// contract order.
///
/// Text or non-finite values are contract violations between training and
/// inference and are reported with row and column context.
pub fn feature_matrix(table: &MetricsTable, contract: &FeatureContract) -> Result<Vec<Vec<f64>>> {
    let indices = contract
        .features()
        .iter()
        .map(|name| {
            table.column_index(name).ok_or_else(|| {
                PipelineError::inference(format!("feature `{name}` is not in the table"))
            })
        })
        .collect::<Result<Vec<_>>>()?;

    table
        .rows()
        .iter()
        .map(|row| {
            indices
                .iter()
                .map(|&i| match &row.values[i] {
                    Value::Number(v) if v.is_finite() => Ok(*v),
                    other => Err(PipelineError::inference(format!(
                        "row {} ({}), feature `{}`: expected a finite number, found {other:?}",
                        row.id,
                        table.class_of(row),
                        table.columns()[i]
                    ))),
                })
                .collect()
        })
        .collect()
}

/// Scores every row of `table` with `model`.
///
/// The result has one prediction per row, in row order, each carrying the
/// id of the row it was derived from.
pub fn predict(
    table: &MetricsTable,
    contract: &FeatureContract,
    model: &dyn Classifier,
) -> Result<Vec<Prediction>> {
    let matrix = feature_matrix(table, contract)?;
    let labels = model.predict(&matrix).map_err(|e| {
        PipelineError::inference(format!("{} model rejected input: {e}", model.kind()))
    })?;

    if labels.len() != table.len() {
        return Err(PipelineError::inference(format!(
            "{} model returned {} labels for {} rows",
            model.kind(),
            labels.len(),
            table.len()
        )));
    }

    Ok(table
        .rows()
        .iter()
        .zip(labels)
        .map(|(row, label)| Prediction { row: row.id, label })
        .collect())
}
