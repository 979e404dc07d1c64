use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};
use crate::extractor::MetricsExtractor;
use crate::extractor::process::run_with_timeout;
use crate::metrics::CLASS_METRICS_FILE;

/// The CK metrics tool, run as `java -jar <jar> <source> false 0 false`.
///
/// The trailing arguments turn off dependency jar resolution, leave the
/// file batch size to CK and skip variable/field metrics. CK writes its
/// CSVs into the working directory.
#[derive(Debug, Clone)]
pub struct CkExtractor {
    java: PathBuf,
    jar: PathBuf,
    timeout: Option<Duration>,
}

impl CkExtractor {
    pub fn new(java: impl Into<PathBuf>, jar: impl Into<PathBuf>, timeout: Option<Duration>) -> Self {
        Self {
            java: java.into(),
            jar: jar.into(),
            timeout,
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(
            config.extractor.java.clone(),
            config.jar_path(),
            config.extractor.timeout(),
        )
    }

    /// Argument vector passed to the java launcher.
    pub fn args(&self, source: &Path) -> Vec<OsString> {
        vec![
            "-jar".into(),
            self.jar.clone().into_os_string(),
            source.as_os_str().to_owned(),
            "false".into(),
            "0".into(),
            "false".into(),
        ]
    }
}

impl MetricsExtractor for CkExtractor {
    fn name(&self) -> &str {
        "ck"
    }

    fn extract(&self, source: &Path, workdir: &Path) -> Result<PathBuf> {
        if !self.jar.is_file() {
            return Err(PipelineError::ExtractionFailure {
                detail: format!("CK jar not found at {}", self.jar.display()),
                stderr: None,
            });
        }
        // CK resolves the source path from its own working directory.
        let source = std::path::absolute(source).map_err(|e| PipelineError::ExtractionFailure {
            detail: format!("invalid source path {}: {e}", source.display()),
            stderr: None,
        })?;

        info!(source = %source.display(), "running CK to extract metrics");
        let mut command = Command::new(&self.java);
        command.args(self.args(&source)).current_dir(workdir);

        let tool = format!("ck (java launcher {})", self.java.display());
        let output = run_with_timeout(command, &tool, self.timeout).inspect_err(|e| {
            if let PipelineError::ExtractionFailure {
                stderr: Some(stderr),
                ..
            } = e
            {
                warn!(stderr = %stderr.trim(), "CK stderr");
            }
        })?;
        if !output.stdout.is_empty() {
            debug!(stdout = %output.stdout.trim(), "CK stdout");
        }

        Ok(workdir.join(CLASS_METRICS_FILE))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn builds_ck_argument_vector() {
        let ck = CkExtractor::new("java", "/opt/ck.jar", None);
        let args = ck.args(Path::new("/src/project"));
        assert_eq!(
            args,
            vec!["-jar", "/opt/ck.jar", "/src/project", "false", "0", "false"]
                .into_iter()
                .map(OsString::from)
                .collect::<Vec<_>>()
        );
    }

    #[test]
    fn from_config_resolves_jar_against_tool_root() {
        let mut cfg = PipelineConfig::default();
        cfg.tool_root = PathBuf::from("/opt/smellscan");
        cfg.extractor.timeout_secs = 0;
        let ck = CkExtractor::from_config(&cfg);
        assert_eq!(ck.jar, PathBuf::from("/opt/smellscan/ck-0.7.1.jar"));
        assert_eq!(ck.timeout, None);
    }

    #[test]
    fn missing_jar_is_extraction_failure() {
        let work = TempDir::new().unwrap();
        let ck = CkExtractor::new("java", work.path().join("missing.jar"), None);
        let err = ck.extract(Path::new("."), work.path()).unwrap_err();
        assert!(matches!(err, PipelineError::ExtractionFailure { .. }));
    }
}
