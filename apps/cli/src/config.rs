//! CLI configuration loading and merging.

use nlu_providers::{LexConfig, LuisConfig, ProviderKind, ProvidersConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Default number of predictions in flight during `nlu test`.
pub const DEFAULT_PARALLELISM: usize = 3;

/// CLI configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NluConfig {
    /// Default NLU service (lex, luis)
    pub service: Option<String>,

    pub lex: LexConfig,

    pub luis: LuisConfig,

    /// Options for `nlu test`
    pub test: TestConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TestConfig {
    pub parallelism: Option<usize>,
}

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(String),

    #[error("Failed to read configuration file: {0}")]
    ReadError(String),

    #[error("Failed to parse configuration file: {0}")]
    ParseError(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

impl NluConfig {
    /// Load configuration from a TOML file.
    ///
    /// Relative template paths are resolved against the file's directory.
    pub fn load_from_file(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadError(format!("{}: {}", path.display(), e)))?;
        let mut config: Self =
            toml::from_str(&content).map_err(|e| ConfigError::ParseError(format!("{}: {}", path.display(), e)))?;

        if let Some(dir) = path.parent() {
            resolve_relative(&mut config.lex.import_template, dir);
            resolve_relative(&mut config.luis.app_template, dir);
        }
        Ok(config)
    }

    /// Save configuration to a TOML file.
    pub fn save_to_file(&self, path: &Path) -> ConfigResult<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| ConfigError::ParseError(format!("Failed to serialize: {}", e)))?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| ConfigError::ReadError(format!("Failed to create directory: {}", e)))?;
        }

        std::fs::write(path, content).map_err(|e| ConfigError::ReadError(format!("Failed to write file: {}", e)))
    }

    /// Get default global configuration file path.
    pub fn default_global_path() -> PathBuf {
        dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")).join(".nlu").join("config.toml")
    }

    /// Get default local configuration file path.
    pub fn default_local_path() -> PathBuf {
        PathBuf::from(".nlurc")
    }

    /// Settings written by `nlu train --save-settings`.
    pub fn saved_settings_path(service: ProviderKind) -> PathBuf {
        PathBuf::from(format!("nlu.{service}.toml"))
    }

    /// Discover and load configuration files.
    ///
    /// Later sources override earlier ones:
    /// 1. Global config (~/.nlu/config.toml)
    /// 2. Local config (./.nlurc)
    /// 3. Saved settings for the service (./nlu.<service>.toml)
    /// 4. `explicit`, when given (must exist)
    /// 5. Environment variables
    pub fn discover_and_load(service: Option<ProviderKind>, explicit: Option<&Path>) -> ConfigResult<Self> {
        let mut config = Self::default();

        let mut candidates = vec![Self::default_global_path(), Self::default_local_path()];
        candidates.extend(service.map(Self::saved_settings_path));
        for path in candidates {
            match Self::load_from_file(&path) {
                Ok(found) => {
                    debug!(path = %path.display(), "Loaded configuration");
                    config.merge(&found);
                }
                Err(ConfigError::NotFound(_)) => {}
                Err(e) => return Err(e),
            }
        }

        if let Some(path) = explicit {
            config.merge(&Self::load_from_file(path)?);
        }

        config.apply_env(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    /// Merge another configuration into this one.
    ///
    /// Values from `other` override values in `self` if they are Some.
    pub fn merge(&mut self, other: &Self) {
        overlay(&mut self.service, &other.service);
        overlay(&mut self.test.parallelism, &other.test.parallelism);

        let (lex, from) = (&mut self.lex, &other.lex);
        overlay(&mut lex.bot_name, &from.bot_name);
        overlay(&mut lex.bot_alias, &from.bot_alias);
        overlay(&mut lex.prefix, &from.prefix);
        overlay(&mut lex.region, &from.region);
        overlay(&mut lex.access_key, &from.access_key);
        overlay(&mut lex.secret_key, &from.secret_key);
        overlay(&mut lex.secret_key_base64, &from.secret_key_base64);
        overlay(&mut lex.session_token, &from.session_token);
        overlay(&mut lex.models_endpoint, &from.models_endpoint);
        overlay(&mut lex.runtime_endpoint, &from.runtime_endpoint);
        overlay(&mut lex.import_template, &from.import_template);

        let (luis, from) = (&mut self.luis, &other.luis);
        overlay(&mut luis.app_id, &from.app_id);
        overlay(&mut luis.app_name, &from.app_name);
        overlay(&mut luis.prefix, &from.prefix);
        overlay(&mut luis.version_id, &from.version_id);
        overlay(&mut luis.build_id, &from.build_id);
        overlay(&mut luis.authoring_key, &from.authoring_key);
        overlay(&mut luis.authoring_region, &from.authoring_region);
        overlay(&mut luis.endpoint_key, &from.endpoint_key);
        overlay(&mut luis.endpoint_region, &from.endpoint_region);
        overlay(&mut luis.is_staging, &from.is_staging);
        overlay(&mut luis.authoring_endpoint, &from.authoring_endpoint);
        overlay(&mut luis.prediction_endpoint, &from.prediction_endpoint);
        overlay(&mut luis.app_template, &from.app_template);
    }

    /// Overrides settings from environment variables, skipping empty values.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> ConfigResult<()> {
        let lookup = |name: &str| lookup(name).filter(|value| !value.is_empty());

        let set = |target: &mut Option<String>, name: &str| {
            if let Some(value) = lookup(name) {
                *target = Some(value);
            }
        };

        let lex = &mut self.lex;
        set(&mut lex.access_key, "AWS_ACCESS_KEY_ID");
        set(&mut lex.secret_key, "AWS_SECRET_ACCESS_KEY");
        set(&mut lex.session_token, "AWS_SESSION_TOKEN");
        set(&mut lex.region, "AWS_REGION");
        set(&mut lex.bot_name, "LEX_BOT_NAME");
        set(&mut lex.bot_alias, "LEX_BOT_ALIAS");
        set(&mut lex.prefix, "LEX_PREFIX");

        let luis = &mut self.luis;
        set(&mut luis.authoring_key, "LUIS_AUTHORING_KEY");
        set(&mut luis.authoring_region, "LUIS_AUTHORING_REGION");
        set(&mut luis.endpoint_key, "LUIS_ENDPOINT_KEY");
        set(&mut luis.endpoint_region, "LUIS_ENDPOINT_REGION");
        set(&mut luis.app_id, "LUIS_APP_ID");
        set(&mut luis.app_name, "LUIS_APP_NAME");
        set(&mut luis.version_id, "LUIS_VERSION_ID");
        set(&mut luis.prefix, "LUIS_PREFIX");
        set(&mut luis.build_id, "BUILD_BUILDID");

        if let Some(value) = lookup("LUIS_IS_STAGING") {
            let staging = value
                .trim()
                .parse::<bool>()
                .map_err(|_| ConfigError::InvalidValue(format!("LUIS_IS_STAGING must be true or false, got '{value}'")))?;
            self.luis.is_staging = Some(staging);
        }
        Ok(())
    }

    /// The service named on the command line, else the configured default.
    pub fn resolve_service(&self, requested: Option<&str>) -> anyhow::Result<ProviderKind> {
        match requested.or(self.service.as_deref()) {
            Some(service) => Ok(service.parse()?),
            None => anyhow::bail!("No NLU service selected. Pass --service <lex|luis> or set `service` in .nlurc"),
        }
    }

    pub fn providers(&self) -> ProvidersConfig {
        ProvidersConfig { lex: self.lex.clone(), luis: self.luis.clone() }
    }

    pub fn parallelism(&self) -> usize {
        self.test.parallelism.unwrap_or(DEFAULT_PARALLELISM)
    }

    /// Instance settings to persist after training.
    pub fn saved(service: ProviderKind, providers: ProvidersConfig) -> Self {
        Self {
            service: Some(service.to_string()),
            lex: providers.lex,
            luis: providers.luis,
            test: TestConfig::default(),
        }
    }
}

/// Load and merge CLI configuration for one command.
///
/// The service may come from `--service` or from configuration; saved
/// settings for the resolved service are then layered in.
pub fn load_config(service: Option<&str>, settings: Option<&Path>) -> anyhow::Result<(ProviderKind, NluConfig)> {
    let requested = service.map(str::parse::<ProviderKind>).transpose()?;
    let config = NluConfig::discover_and_load(requested, settings)?;
    let kind = config.resolve_service(service)?;
    if requested == Some(kind) {
        return Ok((kind, config));
    }
    Ok((kind, NluConfig::discover_and_load(Some(kind), settings)?))
}

fn overlay<T: Clone>(target: &mut Option<T>, source: &Option<T>) {
    if let Some(value) = source {
        *target = Some(value.clone());
    }
}

fn resolve_relative(path: &mut Option<PathBuf>, dir: &Path) {
    if let Some(p) = path.as_mut().filter(|p| p.is_relative()) {
        *p = dir.join(&*p);
    }
}
