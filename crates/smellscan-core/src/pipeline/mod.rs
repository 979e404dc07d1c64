//! The inference stages and their orchestration.

pub mod align;
pub mod infer;
pub mod orchestrator;
pub mod preprocess;
pub mod project;

pub use orchestrator::{CategoryOutcome, Pipeline, RunState, score_table};
