//! CLI subcommand handlers.

use anyhow::Context;
use skuwatch_core::{ModelArtifact, Predictor, ProductInput, SkuwatchConfig};
use skuwatch_server::AppState;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

pub async fn serve(config: &SkuwatchConfig, artifact: Arc<ModelArtifact>) -> anyhow::Result<()> {
    let state = AppState::new(Predictor::new(artifact)?);
    skuwatch_server::run(&config.server, state)
        .await
        .context("server error")
}

/// Score one record read from `input` (`-` for stdin) and print it as JSON.
pub fn predict(artifact: Arc<ModelArtifact>, input: &Path) -> anyhow::Result<()> {
    let raw = if input == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read record from stdin")?;
        buf
    } else {
        std::fs::read_to_string(input)
            .with_context(|| format!("failed to read {}", input.display()))?
    };

    let record: ProductInput =
        serde_json::from_str(&raw).context("input is not a valid product record")?;
    let prediction = Predictor::new(artifact)?.predict(&record)?;
    println!("{}", serde_json::to_string_pretty(&prediction)?);
    Ok(())
}

pub fn inspect(artifact: &ModelArtifact, json: bool) -> anyhow::Result<()> {
    let summary = artifact.summary();
    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("Pipeline ({} stages):", summary.stages.len());
    for stage in &summary.stages {
        let status = if stage.fitted { "fitted" } else { "NOT FITTED" };
        println!(
            "  {} ({}): {}, {} learned entries",
            stage.name, stage.kind, status, stage.learned_entries
        );
    }
    println!();
    println!("Classifier: {}", summary.classifier);
    println!(
        "Classes:    {}",
        summary
            .classes
            .iter()
            .map(i64::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    );
    if let Some(trained_at) = summary.trained_at {
        println!("Trained at: {}", trained_at.to_rfc3339());
    }
    println!();
    println!("Feature columns ({}):", summary.feature_columns.len());
    for (i, column) in summary.feature_columns.iter().enumerate() {
        println!("  {:>3}  {}", i, column);
    }
    Ok(())
}
