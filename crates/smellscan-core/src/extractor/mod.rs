//! Boundary to the external metrics extractor.

pub mod ck;
pub mod process;
pub mod scratch;

use std::path::{Path, PathBuf};

use crate::error::Result;

pub use ck::CkExtractor;
pub use scratch::ScratchDir;

/// Produces a per-class metrics CSV for a source tree.
pub trait MetricsExtractor {
    fn name(&self) -> &str;

    /// Extracts metrics for `source` into `workdir` and returns the path
    /// of the class metrics file. `workdir` exists and is empty on entry.
    fn extract(&self, source: &Path, workdir: &Path) -> Result<PathBuf>;
}

impl<T: MetricsExtractor + ?Sized> MetricsExtractor for &T {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn extract(&self, source: &Path, workdir: &Path) -> Result<PathBuf> {
        (**self).extract(source, workdir)
    }
}
