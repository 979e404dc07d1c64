use crate::artifacts::FeatureContract;
use crate::error::{PipelineError, Result};
use crate::metrics::MetricsTable;

/// A table whose columns were checked against a feature contract.
///
/// Only [`align`] and [`align_with`] construct it, so downstream stages
/// cannot run on an unchecked table.
#[derive(Debug, Clone, Copy)]
pub struct AlignedTable<'a> {
    table: &'a MetricsTable,
    contract: &'a FeatureContract,
}

impl<'a> AlignedTable<'a> {
    pub fn table(&self) -> &'a MetricsTable {
        self.table
    }

    pub fn contract(&self) -> &'a FeatureContract {
        self.contract
    }
}

/// Checks that every contract feature is a column of `table`.
pub fn align<'a>(
    table: &'a MetricsTable,
    contract: &'a FeatureContract,
) -> Result<AlignedTable<'a>> {
    align_with(table, contract, &[])
}

/// Like [`align`], also requiring `extra` columns (e.g. the columns a
/// transform was fitted on). Missing names are reported contract-first,
/// each once.
pub fn align_with<'a>(
    table: &'a MetricsTable,
    contract: &'a FeatureContract,
    extra: &[String],
) -> Result<AlignedTable<'a>> {
    let mut missing: Vec<String> = Vec::new();
    for name in contract.features().iter().chain(extra) {
        if !table.has_column(name) && !missing.contains(name) {
            missing.push(name.clone());
        }
    }

    if missing.is_empty() {
        Ok(AlignedTable { table, contract })
    } else {
        Err(PipelineError::MissingFeatures { missing })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::table::tests::table;

    fn contract(names: &[&str]) -> FeatureContract {
        FeatureContract::new(names.iter().map(|s| s.to_string()).collect()).unwrap()
    }

    #[test]
    fn superset_table_aligns_unchanged() {
        let t = table(&["file", "class", "wmc", "cbo", "loc"], &[&["A.java", "A", "1", "2", "3"]]);
        let c = contract(&["cbo", "wmc"]);
        let aligned = align(&t, &c).expect("aligned");
        assert_eq!(aligned.table(), &t);
    }

    #[test]
    fn reports_every_missing_feature_in_contract_order() {
        let t = table(&["file", "class", "wmc"], &[]);
        let c = contract(&["rfc", "wmc", "lcom"]);
        match align(&t, &c).unwrap_err() {
            PipelineError::MissingFeatures { missing } => assert_eq!(missing, vec!["rfc", "lcom"]),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn extra_columns_are_required_once() {
        let t = table(&["file", "class", "wmc"], &[]);
        let c = contract(&["rfc"]);
        let extra = vec!["rfc".to_string(), "noc".to_string()];
        match align_with(&t, &c, &extra).unwrap_err() {
            PipelineError::MissingFeatures { missing } => assert_eq!(missing, vec!["rfc", "noc"]),
            other => panic!("unexpected {other:?}"),
        }
    }
}
