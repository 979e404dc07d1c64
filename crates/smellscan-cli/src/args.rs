use std::path::PathBuf;

use anyhow::Result;
use clap::{ArgAction, Parser, ValueEnum};

use smellscan_core::category::SmellCategory;
use smellscan_core::config::PipelineConfig;

#[derive(Debug, Parser)]
#[command(
    name = "smellscan",
    version,
    about = "Detect code smells in a Java project from CK metrics and trained models"
)]
pub struct Args {
    /// Root of the Java source tree to analyse
    pub project: PathBuf,

    /// Smell category to detect. Repeat for several.
    #[arg(long = "category", short = 'c', default_value = "god-class")]
    pub categories: Vec<SmellCategory>,

    /// Output format
    #[arg(long, default_value = "json")]
    pub format: OutputFormat,

    /// Write output to a file instead of stdout
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// TOML configuration file
    #[arg(long, env = "SMELLSCAN_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory relative artifact and extractor paths resolve against
    #[arg(long, env = "SMELLSCAN_TOOL_ROOT")]
    pub tool_root: Option<PathBuf>,

    /// Root of the per-category artifact directories
    #[arg(long, env = "SMELLSCAN_ARTIFACT_DIR")]
    pub artifact_dir: Option<PathBuf>,

    /// Extractor working directory, recreated for every run
    #[arg(long, env = "SMELLSCAN_SCRATCH_DIR")]
    pub scratch_dir: Option<PathBuf>,

    /// Path to the CK jar
    #[arg(long, env = "SMELLSCAN_CK_JAR")]
    pub ck_jar: Option<PathBuf>,

    /// Java launcher
    #[arg(long, env = "SMELLSCAN_JAVA")]
    pub java: Option<PathBuf>,

    /// Extractor runtime bound in seconds, 0 for none
    #[arg(long, env = "SMELLSCAN_TIMEOUT_SECS")]
    pub timeout_secs: Option<u64>,

    /// Exit 1 when any category failed
    #[arg(long)]
    pub strict: bool,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Bare `[{file, class}]` finding list
    Json,
    /// JSON envelope with per-category status and errors
    Report,
    Text,
}

impl Args {
    /// Config file (or defaults) with command-line overrides applied.
    pub fn pipeline_config(&self) -> Result<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::load(path)?,
            None => PipelineConfig::default(),
        };

        if let Some(root) = &self.tool_root {
            config.tool_root = root.clone();
        }
        if let Some(dir) = &self.artifact_dir {
            config.artifact_dir = dir.clone();
        }
        if let Some(dir) = &self.scratch_dir {
            config.scratch_dir = dir.clone();
        }
        if let Some(jar) = &self.ck_jar {
            config.extractor.jar = jar.clone();
        }
        if let Some(java) = &self.java {
            config.extractor.java = java.clone();
        }
        if let Some(secs) = self.timeout_secs {
            config.extractor.timeout_secs = secs;
        }
        Ok(config)
    }
}
