//! SkuWatch CLI: serve, score one record, or inspect a model artifact.

mod commands;

use anyhow::Context;
use clap::Parser;
use skuwatch_core::config::LoggingConfig;
use skuwatch_core::{ConfigOverrides, ModelArtifact};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// SkuWatch: flag anomalous product records
#[derive(Parser, Debug)]
#[command(name = "skuwatch", version, about, long_about = None)]
struct Cli {
    /// Configuration file path (defaults to ./skuwatch.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Model artifact path
    #[arg(short, long, global = true)]
    artifact: Option<PathBuf>,

    /// Bind host for `serve`
    #[arg(long, global = true)]
    host: Option<String>,

    /// Bind port for `serve`
    #[arg(short, long, global = true)]
    port: Option<u16>,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand, Debug)]
pub(crate) enum Commands {
    /// Serve the prediction API (default)
    Serve,
    /// Score one JSON record and print the prediction
    Predict {
        /// Input file, or `-` for stdin
        #[arg(short, long, default_value = "-")]
        input: PathBuf,
    },
    /// Show the artifact's stages, classifier and feature columns
    Inspect {
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let overrides = ConfigOverrides {
        artifact_path: cli.artifact.clone(),
        host: cli.host.clone(),
        port: cli.port,
        log_filter: verbosity_filter(cli.verbose, cli.quiet).map(str::to_string),
    };
    let config = skuwatch_core::load_config(cli.config.as_deref(), &overrides)
        .map_err(|e| anyhow::anyhow!("Configuration error: {}", e))?;

    let _guard = init_tracing(&config.logging)?;

    let artifact = ModelArtifact::load(&config.artifact.path).with_context(|| {
        format!(
            "failed to load model artifact from {}",
            config.artifact.path.display()
        )
    })?;
    let artifact = Arc::new(artifact);

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => commands::serve(&config, artifact).await,
        Commands::Predict { input } => commands::predict(artifact, &input),
        Commands::Inspect { json } => commands::inspect(&artifact, json),
    }
}

/// Filter implied by `-v`/`-q`; `None` leaves the configured filter alone.
fn verbosity_filter(verbose: u8, quiet: bool) -> Option<&'static str> {
    match verbose {
        0 if quiet => Some("error"),
        0 => None,
        1 => Some("debug"),
        _ => Some("trace"),
    }
}

/// Human-readable stderr logging, plus daily-rolled JSON files when
/// `logging.json_dir` is set. The returned guard flushes the file writer.
fn init_tracing(
    logging: &LoggingConfig,
) -> anyhow::Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::new(&logging.filter));

    let (json_layer, guard) = match &logging.json_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("failed to create log directory {}", dir.display()))?;
            let file_appender = tracing_appender::rolling::daily(dir, "skuwatch.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            let layer = tracing_subscriber::fmt::layer()
                .json()
                .with_writer(non_blocking)
                .with_filter(EnvFilter::new(&logging.filter));
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_filter() {
        assert_eq!(verbosity_filter(0, false), None);
        assert_eq!(verbosity_filter(0, true), Some("error"));
        assert_eq!(verbosity_filter(1, true), Some("debug"));
        assert_eq!(verbosity_filter(3, false), Some("trace"));
    }

    #[test]
    fn test_cli_defaults_to_serve() {
        let cli = Cli::parse_from(["skuwatch"]);
        assert!(cli.command.is_none());
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_cli_predict_with_global_flags() {
        let cli = Cli::parse_from([
            "skuwatch",
            "predict",
            "--input",
            "record.json",
            "--artifact",
            "model.json",
            "-vv",
        ]);
        assert_eq!(cli.artifact, Some(PathBuf::from("model.json")));
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Some(Commands::Predict { input }) => assert_eq!(input, PathBuf::from("record.json")),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_cli_verifies() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
