use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use smellscan_core::report::{model::ToolInfo, render};
use smellscan_core::{TOOL_NAME, scan};

mod args;

use args::OutputFormat;

/// Logs go to stderr so stdout carries only the requested output.
fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        _ => EnvFilter::new("debug"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let args = args::Args::parse();
    init_tracing(args.verbose);

    let config = args.pipeline_config()?;
    debug!(?config, "resolved configuration");
    let tool = ToolInfo {
        name: TOOL_NAME.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    };

    let report = scan(config, &args.project, &args.categories, tool);

    // Failed categories contribute no findings to the bare list.
    let mut output = match args.format {
        OutputFormat::Json => serde_json::to_string(&report.findings())?,
        OutputFormat::Report => serde_json::to_string_pretty(&report)?,
        OutputFormat::Text => render::render_text(&report),
    };
    if !output.ends_with('\n') {
        output.push('\n');
    }

    match &args.out {
        Some(path) => {
            std::fs::write(path, &output)
                .with_context(|| format!("failed to write {}", path.display()))?;
            info!(path = %path.display(), bytes = output.len(), "wrote output");
        }
        None => print!("{output}"),
    }

    if args.strict && report.has_failures() {
        std::process::exit(1);
    }
    Ok(())
}
