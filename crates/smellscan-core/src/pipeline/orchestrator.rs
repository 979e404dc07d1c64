//! Sequencing of the pipeline stages for a project and a set of smell
//! categories.
//!
//! Each (project, category) run walks
//! `Start -> MetricsReady -> Aligned -> Preprocessed -> Scored -> Projected`
//! and drops to `Failed` on the first error. Failures are returned as
//! values in [`CategoryOutcome`]; a panic inside any stage is caught here
//! and reported as an `InferenceError`.

use std::any::Any;
use std::fmt;
use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::artifacts::{ArtifactDigest, ArtifactSet, ArtifactStore};
use crate::category::SmellCategory;
use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};
use crate::extractor::{MetricsExtractor, ScratchDir};
use crate::metrics::{MetricsTable, ingest};
use crate::pipeline::align::align_with;
use crate::pipeline::infer::predict;
use crate::pipeline::preprocess::preprocess;
use crate::pipeline::project::project;
use crate::report::model::SmellFinding;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Start,
    MetricsReady,
    Aligned,
    Preprocessed,
    Scored,
    Projected,
    Failed,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Start => "start",
            Self::MetricsReady => "metrics_ready",
            Self::Aligned => "aligned",
            Self::Preprocessed => "preprocessed",
            Self::Scored => "scored",
            Self::Projected => "projected",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Result of one category run.
#[derive(Debug)]
pub struct CategoryOutcome {
    pub category: SmellCategory,
    pub result: Result<Vec<SmellFinding>>,
    /// Digests of the artifacts the run used, empty if none were loaded.
    pub artifacts: Vec<ArtifactDigest>,
}

/// State of one run, logged on every transition.
struct Run<'a> {
    category: &'a SmellCategory,
    state: RunState,
}

impl<'a> Run<'a> {
    fn start(category: &'a SmellCategory) -> Self {
        debug!(category = %category, state = %RunState::Start, "run started");
        Self {
            category,
            state: RunState::Start,
        }
    }

    fn advance(&mut self, next: RunState) {
        debug!(category = %self.category, from = %self.state, to = %next, "run state transition");
        self.state = next;
    }

    /// Advances to `next` if the stage succeeded.
    fn check<T>(&mut self, next: RunState, stage: Result<T>) -> Result<T> {
        let value = stage?;
        self.advance(next);
        Ok(value)
    }

    fn finish(mut self, result: Result<Vec<SmellFinding>>) -> Result<Vec<SmellFinding>> {
        match &result {
            Ok(findings) => {
                info!(category = %self.category, findings = findings.len(), "run complete");
            }
            Err(e) => {
                let at = self.state;
                match e {
                    PipelineError::MissingFeatures { missing } => warn!(
                        category = %self.category, state = %at, missing = ?missing,
                        "required features missing from metrics table"
                    ),
                    PipelineError::InferenceError { detail } => error!(
                        category = %self.category, state = %at, detail = %detail,
                        "artifacts do not match inference data"
                    ),
                    other => warn!(
                        category = %self.category, state = %at, kind = %other.kind(), error = %other,
                        "run failed"
                    ),
                }
                self.advance(RunState::Failed);
            }
        }
        result
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Runs `f`, converting a panic into an `InferenceError`.
fn guarded<T>(stage: &str, f: impl FnOnce() -> Result<T>) -> Result<T> {
    panic::catch_unwind(AssertUnwindSafe(f)).unwrap_or_else(|payload| {
        Err(PipelineError::inference(format!(
            "{stage} panicked: {}",
            panic_message(payload.as_ref())
        )))
    })
}

/// Aligns, preprocesses, scores and projects an ingested table against
/// one category's artifacts.
///
/// Alignment runs first: when the table lacks a required column neither
/// the transform nor the model is touched.
pub fn score_table(table: &MetricsTable, set: &ArtifactSet) -> Result<Vec<SmellFinding>> {
    let mut run = Run::start(&set.category);
    run.advance(RunState::MetricsReady);

    let result = guarded("scoring", || {
        let required = set.transform.required_columns(&set.contract);
        let aligned = run.check(
            RunState::Aligned,
            align_with(table, &set.contract, required),
        )?;
        let prepared = run.check(RunState::Preprocessed, preprocess(&aligned, &set.transform))?;
        let predictions = run.check(
            RunState::Scored,
            predict(&prepared, &set.contract, set.model.as_ref()),
        )?;
        run.check(RunState::Projected, project(table, &predictions))
    });
    run.finish(result)
}

fn failed_run(category: &SmellCategory, err: PipelineError) -> CategoryOutcome {
    CategoryOutcome {
        category: category.clone(),
        result: Run::start(category).finish(Err(err)),
        artifacts: Vec::new(),
    }
}

fn run_loaded(
    category: &SmellCategory,
    set: &ArtifactSet,
    table: Result<&MetricsTable>,
) -> CategoryOutcome {
    let result = match table {
        Ok(table) => score_table(table, set),
        Err(e) => Run::start(category).finish(Err(e)),
    };
    CategoryOutcome {
        category: category.clone(),
        result,
        artifacts: set.digests.clone(),
    }
}

fn resolve(path: &Path) -> PathBuf {
    fs::canonicalize(path)
        .or_else(|_| std::path::absolute(path))
        .unwrap_or_else(|_| path.to_path_buf())
}

/// The scratch directory is wiped before extraction, so it must not be
/// the source tree or one of its ancestors.
fn ensure_disjoint(scratch: &Path, source: &Path) -> Result<()> {
    let scratch_abs = resolve(scratch);
    if resolve(source).starts_with(&scratch_abs) {
        return Err(PipelineError::ExtractionFailure {
            detail: format!(
                "scratch directory {} contains the source tree {}; refusing to wipe it",
                scratch_abs.display(),
                source.display()
            ),
            stderr: None,
        });
    }
    Ok(())
}

/// Smell detection pipeline bound to one configuration and extractor.
///
/// The artifact cache lives as long as the pipeline, so repeated runs for
/// the same category load its artifacts once.
pub struct Pipeline<E> {
    config: PipelineConfig,
    store: ArtifactStore,
    extractor: E,
}

impl<E: MetricsExtractor> Pipeline<E> {
    pub fn new(config: PipelineConfig, extractor: E) -> Self {
        let store = ArtifactStore::new(config.artifact_dir());
        Self {
            config,
            store,
            extractor,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    /// Extracts metrics for `source` and scores them for `category`.
    pub fn detect(&self, source: &Path, category: &SmellCategory) -> CategoryOutcome {
        self.detect_many(source, std::slice::from_ref(category))
            .pop()
            .unwrap_or_else(|| failed_run(category, PipelineError::inference("no outcome produced")))
    }

    /// Extracts metrics once and scores them for every category, each
    /// independently. Returns one outcome per category, in input order.
    ///
    /// Artifacts are loaded first; if no category has usable artifacts the
    /// extractor is not run.
    pub fn detect_many(&self, source: &Path, categories: &[SmellCategory]) -> Vec<CategoryOutcome> {
        let sets: Vec<(&SmellCategory, Result<Arc<ArtifactSet>>)> = categories
            .iter()
            .map(|c| (c, guarded("artifact loading", || self.store.load(c))))
            .collect();

        let mut table: Option<Result<MetricsTable>> = None;
        sets.into_iter()
            .map(|(category, set)| match set {
                Ok(set) => {
                    let table =
                        table.get_or_insert_with(|| guarded("extraction", || self.extract(source)));
                    run_loaded(category, &set, table.as_ref().map_err(Clone::clone))
                }
                Err(e) => failed_run(category, e),
            })
            .collect()
    }

    /// Scores an already-ingested table for `category`.
    pub fn score(&self, table: &MetricsTable, category: &SmellCategory) -> CategoryOutcome {
        match guarded("artifact loading", || self.store.load(category)) {
            Ok(set) => run_loaded(category, &set, Ok(table)),
            Err(e) => failed_run(category, e),
        }
    }

    /// Runs the extractor in a fresh scratch directory and ingests its
    /// output. The directory is gone when this returns, on every path.
    fn extract(&self, source: &Path) -> Result<MetricsTable> {
        let scratch_path = self.config.scratch_dir();
        ensure_disjoint(&scratch_path, source)?;
        let scratch =
            ScratchDir::create(&scratch_path).map_err(|e| PipelineError::ExtractionFailure {
                detail: format!(
                    "cannot prepare scratch directory {}: {e}",
                    scratch_path.display()
                ),
                stderr: None,
            })?;

        info!(
            extractor = self.extractor.name(),
            source = %source.display(),
            "extracting metrics"
        );
        let metrics = self.extractor.extract(source, scratch.path())?;
        ingest(&metrics)
    }
}
