//! Clean command implementation.

use crate::config::{load_config, NluConfig};
use anyhow::{Context, Result};
use colored::Colorize;
use nlu_providers::Provider;
use nlu_training::CleanupOrchestrator;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

#[derive(clap::Args, Debug)]
pub struct CleanArgs {
    /// NLU service (lex, luis)
    #[arg(short, long)]
    pub service: Option<String>,

    /// TOML settings file layered over discovered configuration
    #[arg(long)]
    pub settings: Option<PathBuf>,

    /// Remove nlu.<service>.toml after cleanup
    #[arg(long)]
    pub delete_settings: bool,
}

/// Execute the clean command.
///
/// Deletes the published alias and the model; targets already gone are skipped.
pub async fn execute(args: CleanArgs, cancel: CancellationToken) -> Result<()> {
    let (service, config) = load_config(args.service.as_deref(), args.settings.as_deref())?;
    let provider = Provider::from_config(service, &config.providers())?;

    println!("{}", format!("Cleaning up {} model...", service).bold().cyan());
    match &provider {
        Provider::Lex(backend) => CleanupOrchestrator::new(Arc::clone(backend), super::progress()).cleanup(&cancel).await,
        Provider::Luis(backend) => CleanupOrchestrator::new(Arc::clone(backend), super::progress()).cleanup(&cancel).await,
    }
    .context("Cleanup failed")?;

    if args.delete_settings {
        let path = NluConfig::saved_settings_path(service);
        if path.exists() {
            std::fs::remove_file(&path).with_context(|| format!("Failed to delete {}", path.display()))?;
            info!(path = %path.display(), "Deleted settings");
        }
    }

    println!("{}", "✓ Cleanup complete".green().bold());
    Ok(())
}
