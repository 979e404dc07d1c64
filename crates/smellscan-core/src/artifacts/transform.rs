//! Fitted preprocessing transform.
//!
//! The transform is a sequence of column-wise steps whose parameters were
//! fitted at training time. Which columns it applies to is declared by the
//! artifact itself through [`ColumnSelection`].

use serde::{Deserialize, Serialize};

use crate::artifacts::contract::FeatureContract;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreprocessingTransform {
    #[serde(default)]
    pub columns: ColumnSelection,
    pub steps: Vec<TransformStep>,
}

/// Columns the transform was fitted on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColumnSelection {
    Preset(ColumnPreset),
    /// Explicit column names, in fitted order.
    Named(Vec<String>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnPreset {
    /// The feature contract's columns, in contract order.
    Features,
    /// Every numeric, non-identity column of the table, in table order.
    Numeric,
}

impl Default for ColumnSelection {
    fn default() -> Self {
        ColumnSelection::Preset(ColumnPreset::Features)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TransformStep {
    /// Replace `NaN` with the fitted per-column statistic.
    SimpleImputer { statistics: Vec<f64> },
    /// `(x - mean) / scale`
    StandardScaler { mean: Vec<f64>, scale: Vec<f64> },
    /// `x * scale + min`
    MinMaxScaler { min: Vec<f64>, scale: Vec<f64> },
    /// `(x - center) / scale`
    RobustScaler { center: Vec<f64>, scale: Vec<f64> },
    /// `ln(1 + x)`
    Log1p,
}

impl TransformStep {
    fn name(&self) -> &'static str {
        match self {
            Self::SimpleImputer { .. } => "simple_imputer",
            Self::StandardScaler { .. } => "standard_scaler",
            Self::MinMaxScaler { .. } => "min_max_scaler",
            Self::RobustScaler { .. } => "robust_scaler",
            Self::Log1p => "log1p",
        }
    }

    /// Number of columns the step was fitted on, `None` for parameterless
    /// steps. Errors when the step's own parameter vectors disagree.
    fn width(&self) -> Result<Option<usize>, String> {
        let (a, b) = match self {
            Self::SimpleImputer { statistics } => (statistics.len(), statistics.len()),
            Self::StandardScaler { mean, scale } => (mean.len(), scale.len()),
            Self::MinMaxScaler { min, scale } => (min.len(), scale.len()),
            Self::RobustScaler { center, scale } => (center.len(), scale.len()),
            Self::Log1p => return Ok(None),
        };
        if a != b {
            return Err(format!(
                "{} has mismatched parameter lengths ({a} vs {b})",
                self.name()
            ));
        }
        Ok(Some(a))
    }

    fn apply(&self, values: &mut [f64]) {
        match self {
            Self::SimpleImputer { statistics } => {
                for (v, s) in values.iter_mut().zip(statistics) {
                    if v.is_nan() {
                        *v = *s;
                    }
                }
            }
            Self::StandardScaler { mean, scale } => {
                for ((v, m), s) in values.iter_mut().zip(mean).zip(scale) {
                    *v = (*v - m) / nonzero(*s);
                }
            }
            Self::MinMaxScaler { min, scale } => {
                for ((v, m), s) in values.iter_mut().zip(min).zip(scale) {
                    *v = *v * s + m;
                }
            }
            Self::RobustScaler { center, scale } => {
                for ((v, c), s) in values.iter_mut().zip(center).zip(scale) {
                    *v = (*v - c) / nonzero(*s);
                }
            }
            Self::Log1p => {
                for v in values.iter_mut() {
                    *v = v.ln_1p();
                }
            }
        }
    }
}

// Constant columns are fitted with a zero scale; they pass through unscaled.
fn nonzero(scale: f64) -> f64 {
    if scale == 0.0 { 1.0 } else { scale }
}

impl PreprocessingTransform {
    pub fn from_json(json: &str) -> Result<Self, String> {
        serde_json::from_str(json).map_err(|e| format!("invalid preprocessing transform: {e}"))
    }

    /// Columns that must be present in a table for this transform, beyond
    /// what the selection resolves at apply time.
    pub fn required_columns<'a>(&'a self, contract: &'a FeatureContract) -> &'a [String] {
        match &self.columns {
            ColumnSelection::Preset(ColumnPreset::Features) => contract.features(),
            ColumnSelection::Preset(ColumnPreset::Numeric) => &[],
            ColumnSelection::Named(names) => names,
        }
    }

    /// Fitted width shared by all parameterized steps.
    pub fn width(&self) -> Result<Option<usize>, String> {
        let mut width = None;
        for step in &self.steps {
            if let Some(w) = step.width()? {
                match width {
                    None => width = Some(w),
                    Some(prev) if prev != w => {
                        return Err(format!(
                            "{} was fitted on {w} columns, earlier steps on {prev}",
                            step.name()
                        ));
                    }
                    Some(_) => {}
                }
            }
        }
        Ok(width)
    }

    /// Checks the transform against the feature contract it ships with.
    pub fn validate(&self, contract: &FeatureContract) -> Result<(), String> {
        let width = self.width()?;
        if let ColumnSelection::Named(names) = &self.columns {
            for (i, n) in names.iter().enumerate() {
                if names[..i].contains(n) {
                    return Err(format!("duplicate transform column `{n}`"));
                }
            }
        }
        // Numeric selection resolves against the table, so its width is
        // only known at apply time.
        let declared = match &self.columns {
            ColumnSelection::Preset(ColumnPreset::Numeric) => None,
            _ => Some(self.required_columns(contract).len()),
        };
        match (width, declared) {
            (Some(w), Some(d)) if w != d => Err(format!(
                "transform fitted on {w} columns but declares {d}"
            )),
            _ => Ok(()),
        }
    }

    /// Applies every step to one row's fitted-column values.
    ///
    /// Returns a new vector; the input is left untouched.
    pub fn apply(&self, values: &[f64]) -> Result<Vec<f64>, String> {
        if let Some(w) = self.width()? {
            if w != values.len() {
                return Err(format!(
                    "transform expects {w} values, got {}",
                    values.len()
                ));
            }
        }
        let mut out = values.to_vec();
        for step in &self.steps {
            step.apply(&mut out);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contract(names: &[&str]) -> FeatureContract {
        FeatureContract::new(names.iter().map(|s| s.to_string()).collect()).unwrap()
    }

    #[test]
    fn parses_steps_and_defaults_to_feature_columns() {
        let t = PreprocessingTransform::from_json(
            r#"{"steps": [
                {"kind": "simple_imputer", "statistics": [0.0, 1.0]},
                {"kind": "standard_scaler", "mean": [2.0, 4.0], "scale": [2.0, 0.0]}
            ]}"#,
        )
        .unwrap();
        assert_eq!(t.columns, ColumnSelection::Preset(ColumnPreset::Features));
        assert_eq!(t.width().unwrap(), Some(2));
    }

    #[test]
    fn parses_numeric_and_named_selections() {
        let numeric: PreprocessingTransform =
            PreprocessingTransform::from_json(r#"{"columns": "numeric", "steps": []}"#).unwrap();
        assert_eq!(numeric.columns, ColumnSelection::Preset(ColumnPreset::Numeric));

        let named = PreprocessingTransform::from_json(
            r#"{"columns": ["wmc", "loc"], "steps": [{"kind": "log1p"}]}"#,
        )
        .unwrap();
        assert_eq!(
            named.columns,
            ColumnSelection::Named(vec!["wmc".into(), "loc".into()])
        );
    }

    #[test]
    fn imputes_then_scales() {
        let t = PreprocessingTransform {
            columns: ColumnSelection::default(),
            steps: vec![
                TransformStep::SimpleImputer {
                    statistics: vec![4.0, 1.0],
                },
                TransformStep::StandardScaler {
                    mean: vec![2.0, 1.0],
                    scale: vec![2.0, 0.0],
                },
            ],
        };
        let out = t.apply(&[f64::NAN, 3.0]).unwrap();
        assert_eq!(out, vec![1.0, 2.0]);
    }

    #[test]
    fn min_max_and_log1p() {
        let t = PreprocessingTransform {
            columns: ColumnSelection::default(),
            steps: vec![
                TransformStep::Log1p,
                TransformStep::MinMaxScaler {
                    min: vec![-1.0],
                    scale: vec![2.0],
                },
            ],
        };
        let out = t.apply(&[std::f64::consts::E - 1.0]).unwrap();
        assert!((out[0] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn apply_is_deterministic_and_non_mutating() {
        let t = PreprocessingTransform {
            columns: ColumnSelection::default(),
            steps: vec![TransformStep::RobustScaler {
                center: vec![1.0, 2.0],
                scale: vec![0.5, 4.0],
            }],
        };
        let input = vec![2.0, 10.0];
        let a = t.apply(&input).unwrap();
        let b = t.apply(&input).unwrap();
        assert_eq!(a, b);
        assert_eq!(input, vec![2.0, 10.0]);
    }

    #[test]
    fn shape_mismatch_is_an_error() {
        let t = PreprocessingTransform {
            columns: ColumnSelection::default(),
            steps: vec![TransformStep::SimpleImputer {
                statistics: vec![0.0, 0.0],
            }],
        };
        assert!(t.apply(&[1.0]).unwrap_err().contains("expects 2"));
    }

    #[test]
    fn validate_checks_widths_against_contract() {
        let t = PreprocessingTransform {
            columns: ColumnSelection::default(),
            steps: vec![TransformStep::StandardScaler {
                mean: vec![0.0; 3],
                scale: vec![1.0; 3],
            }],
        };
        assert!(t.validate(&contract(&["a", "b", "c"])).is_ok());
        assert!(t.validate(&contract(&["a", "b"])).is_err());

        let inconsistent = PreprocessingTransform {
            columns: ColumnSelection::Preset(ColumnPreset::Numeric),
            steps: vec![
                TransformStep::SimpleImputer {
                    statistics: vec![0.0; 2],
                },
                TransformStep::StandardScaler {
                    mean: vec![0.0; 3],
                    scale: vec![1.0; 3],
                },
            ],
        };
        assert!(inconsistent.validate(&contract(&["a"])).is_err());
    }

    #[test]
    fn required_columns_follow_selection() {
        let c = contract(&["wmc", "cbo"]);
        let features = PreprocessingTransform {
            columns: ColumnSelection::default(),
            steps: vec![],
        };
        assert_eq!(features.required_columns(&c), c.features());

        let numeric = PreprocessingTransform {
            columns: ColumnSelection::Preset(ColumnPreset::Numeric),
            steps: vec![],
        };
        assert!(numeric.required_columns(&c).is_empty());
    }
}
