use serde::Serialize;

/// Name of the class identity column in the extractor output.
pub const CLASS_COLUMN: &str = "class";
/// Name of the source file column in the extractor output.
pub const FILE_COLUMN: &str = "file";

/// Stable token attached to a row at ingestion.
///
/// Stages never reorder rows, so ids are strictly increasing within a
/// table. Predictions are joined back to rows by this id rather than by
/// array position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct RowId(pub usize);

impl std::fmt::Display for RowId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A single cell of the metrics table.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Numeric measurement. Missing cells are stored as `NaN`.
    Number(f64),
    Text(String),
}

impl Value {
    /// Types a raw CSV cell: anything `f64` accepts is numeric, an empty
    /// cell is a missing number, everything else is text.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Value::Number(f64::NAN);
        }
        match trimmed.parse::<f64>() {
            Ok(n) => Value::Number(n),
            Err(_) => Value::Text(raw.to_string()),
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Text(_) => None,
        }
    }

    /// Identity columns are rendered back as text even when the extractor
    /// wrote something numeric-looking.
    pub fn to_text(&self) -> String {
        match self {
            Value::Text(s) => s.clone(),
            Value::Number(n) => n.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MetricsRow {
    pub id: RowId,
    pub values: Vec<Value>,
}

/// Rectangular per-class metrics table.
///
/// Column set is fixed for all rows. The `class` and `file` identity
/// columns are guaranteed present; construction fails otherwise.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsTable {
    columns: Vec<String>,
    rows: Vec<MetricsRow>,
    class_idx: usize,
    file_idx: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableError {
    MissingIdentityColumn(&'static str),
    DuplicateColumn(String),
    Ragged { row: usize, expected: usize, found: usize },
}

impl std::fmt::Display for TableError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingIdentityColumn(c) => write!(f, "missing required column `{c}`"),
            Self::DuplicateColumn(c) => write!(f, "duplicate column `{c}`"),
            Self::Ragged {
                row,
                expected,
                found,
            } => write!(f, "row {row} has {found} fields, expected {expected}"),
        }
    }
}

impl MetricsTable {
    /// Builds a table from a header and rows of typed cells. Row ids are
    /// assigned in input order.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Result<Self, TableError> {
        for (i, c) in columns.iter().enumerate() {
            if columns[..i].contains(c) {
                return Err(TableError::DuplicateColumn(c.clone()));
            }
        }

        let class_idx = columns
            .iter()
            .position(|c| c == CLASS_COLUMN)
            .ok_or(TableError::MissingIdentityColumn(CLASS_COLUMN))?;
        let file_idx = columns
            .iter()
            .position(|c| c == FILE_COLUMN)
            .ok_or(TableError::MissingIdentityColumn(FILE_COLUMN))?;

        let width = columns.len();
        let rows = rows
            .into_iter()
            .enumerate()
            .map(|(i, values)| {
                if values.len() != width {
                    return Err(TableError::Ragged {
                        row: i,
                        expected: width,
                        found: values.len(),
                    });
                }
                Ok(MetricsRow { id: RowId(i), values })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            columns,
            rows,
            class_idx,
            file_idx,
        })
    }

    /// Same shape as `self`, with different rows. Used by stages that
    /// derive a new table without touching the caller's copy.
    pub(crate) fn with_rows(&self, rows: Vec<MetricsRow>) -> Self {
        Self {
            columns: self.columns.clone(),
            rows,
            class_idx: self.class_idx,
            file_idx: self.file_idx,
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    pub fn rows(&self) -> &[MetricsRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row(&self, id: RowId) -> Option<&MetricsRow> {
        self.rows
            .binary_search_by_key(&id, |r| r.id)
            .ok()
            .map(|i| &self.rows[i])
    }

    pub fn is_identity_column(&self, idx: usize) -> bool {
        idx == self.class_idx || idx == self.file_idx
    }

    /// A column is numeric when every cell in it is numeric. Columns of an
    /// empty table count as numeric.
    pub fn is_numeric_column(&self, idx: usize) -> bool {
        self.rows
            .iter()
            .all(|r| matches!(r.values.get(idx), Some(Value::Number(_))))
    }

    /// Indices of numeric, non-identity columns, in table order.
    pub fn numeric_columns(&self) -> Vec<usize> {
        (0..self.columns.len())
            .filter(|&i| !self.is_identity_column(i) && self.is_numeric_column(i))
            .collect()
    }

    pub fn class_of(&self, row: &MetricsRow) -> String {
        row.values[self.class_idx].to_text()
    }

    pub fn file_of(&self, row: &MetricsRow) -> String {
        row.values[self.file_idx].to_text()
    }
}
