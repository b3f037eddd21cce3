//! Lex connection settings.

use crate::error::{ProviderError, ProviderResult};
use crate::json::random_name;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::path::PathBuf;

/// Raw Lex options as they appear in configuration files and the environment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LexConfig {
    pub bot_name: Option<String>,
    pub bot_alias: Option<String>,
    /// Prefix used when a bot name has to be generated.
    pub prefix: Option<String>,
    pub region: Option<String>,
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    /// Base64 encoded alternative to `secret_key`.
    pub secret_key_base64: Option<String>,
    pub session_token: Option<String>,
    pub models_endpoint: Option<String>,
    pub runtime_endpoint: Option<String>,
    /// JSON file merged into the generated import document.
    pub import_template: Option<PathBuf>,
}

#[derive(Clone, PartialEq, Eq)]
pub struct AwsCredentials {
    pub access_key: String,
    pub secret_key: String,
    pub session_token: Option<String>,
}

impl AwsCredentials {
    pub fn new(access_key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self { access_key: access_key.into(), secret_key: secret_key.into(), session_token: None }
    }

    #[must_use]
    pub fn with_session_token(mut self, token: impl Into<String>) -> Self {
        self.session_token = Some(token.into());
        self
    }
}

impl fmt::Debug for AwsCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AwsCredentials")
            .field("access_key", &self.access_key)
            .field("secret_key", &"***")
            .field("session_token", &self.session_token.as_ref().map(|_| "***"))
            .finish()
    }
}

/// Resolved settings for one Lex bot.
#[derive(Debug, Clone)]
pub struct LexSettings {
    pub bot_name: String,
    pub bot_alias: String,
    pub region: String,
    pub credentials: AwsCredentials,
    models_endpoint: Option<String>,
    runtime_endpoint: Option<String>,
    pub import_template: Value,
}

impl LexSettings {
    /// Settings for `bot_name`, published under an alias of the same name.
    pub fn new(bot_name: impl Into<String>, region: impl Into<String>, credentials: AwsCredentials) -> Self {
        let bot_name = bot_name.into();
        Self {
            bot_alias: bot_name.clone(),
            bot_name,
            region: region.into(),
            credentials,
            models_endpoint: None,
            runtime_endpoint: None,
            import_template: Value::Null,
        }
    }

    /// Resolves configuration, generating a bot name when none is set.
    pub fn from_config(config: &LexConfig) -> ProviderResult<Self> {
        let region = config.region.clone().ok_or(ProviderError::MissingSetting("lex.region"))?;
        let access_key = config.access_key.clone().ok_or(ProviderError::MissingSetting("lex.access_key"))?;
        let secret_key = match (&config.secret_key, &config.secret_key_base64) {
            (Some(secret), _) => secret.clone(),
            (None, Some(encoded)) => decode_secret(encoded)?,
            (None, None) => return Err(ProviderError::MissingSetting("lex.secret_key")),
        };

        let mut credentials = AwsCredentials::new(access_key, secret_key);
        if let Some(token) = &config.session_token {
            credentials = credentials.with_session_token(token);
        }

        let bot_name = config.bot_name.clone().unwrap_or_else(|| random_name(config.prefix.as_deref()));
        let mut settings = Self::new(bot_name, region, credentials);
        if let Some(alias) = &config.bot_alias {
            settings = settings.with_alias(alias);
        }
        settings.models_endpoint.clone_from(&config.models_endpoint);
        settings.runtime_endpoint.clone_from(&config.runtime_endpoint);
        if let Some(path) = &config.import_template {
            settings.import_template = serde_json::from_str(&std::fs::read_to_string(path)?)?;
        }

        Ok(settings)
    }

    #[must_use]
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.bot_alias = alias.into();
        self
    }

    /// Points both APIs at `endpoint`, e.g. a local mock server.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        let endpoint = endpoint.into();
        self.models_endpoint = Some(endpoint.clone());
        self.runtime_endpoint = Some(endpoint);
        self
    }

    #[must_use]
    pub fn with_import_template(mut self, template: Value) -> Self {
        self.import_template = template;
        self
    }

    pub fn models_endpoint(&self) -> String {
        self.models_endpoint.clone().unwrap_or_else(|| format!("https://models.lex.{}.amazonaws.com", self.region))
    }

    pub fn runtime_endpoint(&self) -> String {
        self.runtime_endpoint.clone().unwrap_or_else(|| format!("https://runtime.lex.{}.amazonaws.com", self.region))
    }

    /// Identity to persist so later commands target the same bot.
    pub fn saved_config(&self) -> LexConfig {
        LexConfig {
            bot_name: Some(self.bot_name.clone()),
            bot_alias: Some(self.bot_alias.clone()),
            region: Some(self.region.clone()),
            ..LexConfig::default()
        }
    }
}

fn decode_secret(encoded: &str) -> ProviderResult<String> {
    let invalid = |reason: String| ProviderError::InvalidSetting { name: "lex.secret_key_base64", reason };
    let bytes = base64::engine::general_purpose::STANDARD.decode(encoded.trim()).map_err(|e| invalid(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| invalid(e.to_string()))
}
