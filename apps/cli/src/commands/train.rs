//! Train command implementation.

use crate::config::{load_config, NluConfig};
use anyhow::{bail, Context, Result};
use colored::Colorize;
use nlu_abstraction::{EntityType, LabeledUtterance};
use nlu_providers::Provider;
use nlu_training::{read_entity_types, read_utterances, ProvisioningBackend, TrainingOrchestrator, TrainingResult};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(clap::Args, Debug)]
pub struct TrainArgs {
    /// NLU service (lex, luis)
    #[arg(short, long)]
    pub service: Option<String>,

    /// JSON file of labeled utterances
    #[arg(short, long)]
    pub utterances: Option<PathBuf>,

    /// JSON file of entity type definitions
    #[arg(short, long)]
    pub entity_types: Option<PathBuf>,

    /// TOML settings file layered over discovered configuration
    #[arg(long)]
    pub settings: Option<PathBuf>,

    /// Write nlu.<service>.toml so later commands target the trained model
    #[arg(long)]
    pub save_settings: bool,
}

pub async fn execute(args: TrainArgs, cancel: CancellationToken) -> Result<()> {
    if args.utterances.is_none() && args.settings.is_none() {
        bail!("Must specify either --utterances or --settings");
    }

    let (service, config) = load_config(args.service.as_deref(), args.settings.as_deref())?;
    let utterances = match &args.utterances {
        Some(path) => read_utterances(path).with_context(|| format!("Failed to load {}", path.display()))?,
        None => Vec::new(),
    };
    let entity_types = match &args.entity_types {
        Some(path) => read_entity_types(path).with_context(|| format!("Failed to load {}", path.display()))?,
        None => Vec::new(),
    };

    let provider = Provider::from_config(service, &config.providers())?;
    println!("{}", format!("Training {} model...", service).bold().cyan());

    let result = match &provider {
        Provider::Lex(backend) => train(Arc::clone(backend), &utterances, &entity_types, &cancel).await,
        Provider::Luis(backend) => train(Arc::clone(backend), &utterances, &entity_types, &cancel).await,
    };

    // Saved even on failure so `nlu clean` can remove a partially created model.
    if args.save_settings {
        let path = NluConfig::saved_settings_path(service);
        match NluConfig::saved(service, provider.saved_config()).save_to_file(&path) {
            Ok(()) => info!(path = %path.display(), "Saved settings"),
            Err(e) if result.is_err() => warn!(error = %e, "Failed to save settings"),
            Err(e) => return Err(e.into()),
        }
    }

    result.context("Training failed")?;
    println!("{}", "✓ Training complete".green().bold());
    Ok(())
}

async fn train<B: ProvisioningBackend>(
    backend: Arc<B>,
    utterances: &[LabeledUtterance],
    entity_types: &[EntityType],
    cancel: &CancellationToken,
) -> TrainingResult<()> {
    TrainingOrchestrator::new(backend, super::progress()).train(utterances, entity_types, cancel).await
}
