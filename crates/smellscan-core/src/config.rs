//! Pipeline configuration.
//!
//! All locations the pipeline touches are carried here explicitly rather
//! than derived from the working directory. Relative paths resolve against
//! `tool_root`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// CK release the default jar name refers to.
pub const DEFAULT_CK_JAR: &str = "ck-0.7.1.jar";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Installation root that relative paths below resolve against.
    pub tool_root: PathBuf,

    /// Working directory for the extractor. Created fresh for every run
    /// and removed afterwards.
    pub scratch_dir: PathBuf,

    /// Root of the per-category artifact directories.
    pub artifact_dir: PathBuf,

    pub extractor: ExtractorConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            tool_root: PathBuf::from("."),
            scratch_dir: std::env::temp_dir()
                .join(format!("smellscan-ck-output-{}", std::process::id())),
            artifact_dir: PathBuf::from("output"),
            extractor: ExtractorConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExtractorConfig {
    /// Java launcher. Looked up on `PATH` unless it contains a separator.
    pub java: PathBuf,

    /// CK jar, relative to `tool_root` unless absolute.
    pub jar: PathBuf,

    /// Upper bound on the extractor's runtime. `0` disables the bound.
    pub timeout_secs: u64,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            java: PathBuf::from("java"),
            jar: PathBuf::from(DEFAULT_CK_JAR),
            timeout_secs: 300,
        }
    }
}

impl ExtractorConfig {
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}

impl PipelineConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).context("parsing pipeline config")
    }

    /// Reads a TOML config file. Missing keys keep their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config: {}", path.display()))?;
        Self::from_toml_str(&text).with_context(|| format!("in {}", path.display()))
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.tool_root.join(path)
        }
    }

    pub fn artifact_dir(&self) -> PathBuf {
        self.resolve(&self.artifact_dir)
    }

    pub fn scratch_dir(&self) -> PathBuf {
        self.resolve(&self.scratch_dir)
    }

    pub fn jar_path(&self) -> PathBuf {
        self.resolve(&self.extractor.jar)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_is_all_defaults() {
        let cfg = PipelineConfig::from_toml_str("").unwrap();
        assert_eq!(cfg.artifact_dir, PathBuf::from("output"));
        assert_eq!(cfg.extractor.jar, PathBuf::from(DEFAULT_CK_JAR));
        assert_eq!(cfg.extractor.timeout(), Some(Duration::from_secs(300)));
    }

    #[test]
    fn relative_paths_resolve_against_tool_root() {
        let cfg = PipelineConfig::from_toml_str(
            r#"
            tool_root = "/opt/smellscan"
            scratch_dir = "/tmp/ck"

            [extractor]
            jar = "lib/ck.jar"
            timeout_secs = 0
            "#,
        )
        .unwrap();

        assert_eq!(cfg.artifact_dir(), PathBuf::from("/opt/smellscan/output"));
        assert_eq!(cfg.jar_path(), PathBuf::from("/opt/smellscan/lib/ck.jar"));
        assert_eq!(cfg.scratch_dir(), PathBuf::from("/tmp/ck"));
        assert_eq!(cfg.extractor.timeout(), None);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(PipelineConfig::from_toml_str("artifacts = \"x\"").is_err());
    }

    #[test]
    fn missing_config_file_is_an_error() {
        let err = PipelineConfig::load(Path::new("no/such/smellscan.toml")).unwrap_err();
        assert!(err.to_string().contains("failed to read config"));
    }
}
