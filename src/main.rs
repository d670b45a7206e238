//! xml-retag CLI entry point.
//!
//! Batch XML `name`-attribute transformer.

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use xml_retag::{BatchRunner, TransformConfig};

#[derive(Parser, Debug)]
#[command(name = "xml-retag")]
#[command(author, version, about = "Batch XML name-attribute transformer")]
struct Args {
    /// Configuration file path (YAML or JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output directory (overrides the configured one)
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Output logs as JSON
    #[arg(long)]
    json_logs: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Print example configuration and exit.
    #[arg(long)]
    example_config: bool,

    /// Validate configuration and exit.
    #[arg(long)]
    validate: bool,
}

fn print_example_config() {
    let example = r#"# xml-retag configuration example
version: "1"

settings:
  # First value assigned by each per-tag counter
  start_counter: 1
  # Create the name attribute on rename-rule tags that lack one
  add_missing_name: false

# XML files to process, in order
files:
  - reports/example.xml

# Directory where transformed documents are written (created if needed)
output_dir: output

# Tags whose name attribute is replaced with prefix + counter
rename:
  - tag: crosstab
    prefix: "Tb"
  - tag: text
    prefix: "Txt"

# Tags whose name attribute is removed
delete:
  - table
  - image
"#;
    println!("{}", example);
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    if args.json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer())
            .init();
    }

    // Print example config if requested
    if args.example_config {
        print_example_config();
        return Ok(());
    }

    let Some(config_path) = &args.config else {
        bail!("no configuration file given (use --config, or --example-config for a template)");
    };

    // Load configuration
    let content = std::fs::read_to_string(config_path)
        .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;
    let mut config: TransformConfig = if config_path
        .extension()
        .is_some_and(|e| e == "yaml" || e == "yml")
    {
        serde_yaml::from_str(&content)?
    } else {
        serde_json::from_str(&content)?
    };

    // Override output directory from CLI
    if let Some(dir) = args.output_dir {
        config.output_dir = dir;
    }

    // Compiling the rule table is the validation step
    let runner = BatchRunner::new(config).context("Invalid configuration")?;

    if args.validate {
        info!("Configuration is valid");
        return Ok(());
    }

    let summary = runner
        .run()
        .context("Failed to create the output directory")?;

    if summary.failures() > 0 {
        bail!(
            "{} of {} files failed (see log for details)",
            summary.failures(),
            summary.outcomes.len()
        );
    }

    info!(
        written = summary.files_written(),
        warnings = summary.warning_count(),
        "done"
    );

    Ok(())
}
