use crate::artifacts::transform::{ColumnPreset, ColumnSelection, PreprocessingTransform};
use crate::error::{PipelineError, Result};
use crate::metrics::{MetricsRow, MetricsTable, Value};
use crate::pipeline::align::AlignedTable;

/// Resolves the transform's declared columns to table indices.
///
/// Every resolved column must be numeric and must not be an identity
/// column; the transform is undefined on anything else.
fn resolve_columns(aligned: &AlignedTable<'_>, transform: &PreprocessingTransform) -> Result<Vec<usize>> {
    let table = aligned.table();
    let indices = match &transform.columns {
        ColumnSelection::Preset(ColumnPreset::Numeric) => return Ok(table.numeric_columns()),
        ColumnSelection::Preset(ColumnPreset::Features) => aligned.contract().features(),
        ColumnSelection::Named(names) => names.as_slice(),
    }
    .iter()
    .map(|name| {
        table.column_index(name).ok_or_else(|| {
            PipelineError::inference(format!("transform column `{name}` is not in the table"))
        })
    })
    .collect::<Result<Vec<_>>>()?;

    for &idx in &indices {
        let name = &table.columns()[idx];
        if table.is_identity_column(idx) {
            return Err(PipelineError::inference(format!(
                "transform declares identity column `{name}`"
            )));
        }
        if let Some(row) = table
            .rows()
            .iter()
            .find(|r| !matches!(r.values[idx], Value::Number(_)))
        {
            return Err(PipelineError::inference(format!(
                "column `{name}` is not numeric: row {} ({}) holds {:?}",
                row.id,
                table.class_of(row),
                row.values[idx]
            )));
        }
    }
    Ok(indices)
}

/// Applies the fitted transform to its declared numeric columns.
///
/// Returns a new table with the same columns, row count, row order and
/// row ids. Columns outside the transform, identity columns included,
/// are copied through unchanged. The input table is not modified.
pub fn preprocess(aligned: &AlignedTable<'_>, transform: &PreprocessingTransform) -> Result<MetricsTable> {
    let table = aligned.table();
    // Column types of a header-only table are unknown.
    if table.is_empty() {
        return Ok(table.clone());
    }
    let indices = resolve_columns(aligned, transform)?;

    if let Some(width) = transform.width().map_err(PipelineError::inference)? {
        if width != indices.len() {
            return Err(PipelineError::inference(format!(
                "transform was fitted on {width} columns, {} resolved in the table",
                indices.len()
            )));
        }
    }

    let rows = table
        .rows()
        .iter()
        .map(|row| {
            let input: Vec<f64> = indices
                .iter()
                .map(|&i| row.values[i].as_number().unwrap_or(f64::NAN))
                .collect();
            let output = transform.apply(&input).map_err(|e| {
                PipelineError::inference(format!("row {} ({}): {e}", row.id, table.class_of(row)))
            })?;

            let mut values = row.values.clone();
            for (&i, v) in indices.iter().zip(output) {
                values[i] = Value::Number(v);
            }
            Ok(MetricsRow { id: row.id, values })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(table.with_rows(rows))
}
