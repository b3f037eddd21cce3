//! LUIS connection settings.

use crate::error::{ProviderError, ProviderResult};
use crate::json::random_name;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;

/// Version id used when none is configured.
pub const DEFAULT_VERSION_ID: &str = "0.1.1";

/// Raw LUIS options as they appear in configuration files and the environment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LuisConfig {
    pub app_id: Option<String>,
    pub app_name: Option<String>,
    /// Prefix used when an app name has to be generated.
    pub prefix: Option<String>,
    pub version_id: Option<String>,
    /// CI build id, appended to the version id as `.<id>`.
    pub build_id: Option<String>,
    pub authoring_key: Option<String>,
    pub authoring_region: Option<String>,
    pub endpoint_key: Option<String>,
    pub endpoint_region: Option<String>,
    pub is_staging: Option<bool>,
    pub authoring_endpoint: Option<String>,
    pub prediction_endpoint: Option<String>,
    /// JSON file merged into the generated app document.
    pub app_template: Option<PathBuf>,
}

/// Resolved settings for one LUIS app version.
#[derive(Clone)]
pub struct LuisSettings {
    pub app_id: Option<String>,
    pub app_name: String,
    pub version_id: String,
    authoring_key: Option<String>,
    authoring_region: Option<String>,
    endpoint_key: String,
    pub endpoint_region: String,
    pub is_staging: bool,
    authoring_endpoint: Option<String>,
    prediction_endpoint: Option<String>,
    pub app_template: Value,
}

impl std::fmt::Debug for LuisSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LuisSettings")
            .field("app_id", &self.app_id)
            .field("app_name", &self.app_name)
            .field("version_id", &self.version_id)
            .field("endpoint_region", &self.endpoint_region)
            .field("is_staging", &self.is_staging)
            .finish_non_exhaustive()
    }
}

impl LuisSettings {
    /// Settings that use one key and region for both authoring and prediction.
    pub fn new(app_name: impl Into<String>, key: impl Into<String>, region: impl Into<String>) -> Self {
        let (key, region) = (key.into(), region.into());
        Self {
            app_id: None,
            app_name: app_name.into(),
            version_id: DEFAULT_VERSION_ID.to_string(),
            authoring_key: Some(key.clone()),
            authoring_region: Some(region.clone()),
            endpoint_key: key,
            endpoint_region: region,
            is_staging: false,
            authoring_endpoint: None,
            prediction_endpoint: None,
            app_template: Value::Null,
        }
    }

    /// Resolves configuration. The endpoint key and region fall back to the
    /// authoring ones; at least one of each pair is required.
    pub fn from_config(config: &LuisConfig) -> ProviderResult<Self> {
        let endpoint_key = config
            .endpoint_key
            .clone()
            .or_else(|| config.authoring_key.clone())
            .ok_or(ProviderError::MissingSetting("luis.authoring_key"))?;
        let endpoint_region = config
            .endpoint_region
            .clone()
            .or_else(|| config.authoring_region.clone())
            .ok_or(ProviderError::MissingSetting("luis.authoring_region"))?;

        let version = config.version_id.clone().unwrap_or_else(|| DEFAULT_VERSION_ID.to_string());
        let version_id = match &config.build_id {
            Some(build) => format!("{version}.{build}"),
            None => version,
        };

        let app_template = match &config.app_template {
            Some(path) => serde_json::from_str(&std::fs::read_to_string(path)?)?,
            None => Value::Null,
        };

        Ok(Self {
            app_id: config.app_id.clone(),
            app_name: config.app_name.clone().unwrap_or_else(|| random_name(config.prefix.as_deref())),
            version_id,
            authoring_key: config.authoring_key.clone(),
            authoring_region: config.authoring_region.clone(),
            endpoint_key,
            endpoint_region,
            is_staging: config.is_staging.unwrap_or(false),
            authoring_endpoint: config.authoring_endpoint.clone(),
            prediction_endpoint: config.prediction_endpoint.clone(),
            app_template,
        })
    }

    #[must_use]
    pub fn with_app_id(mut self, app_id: impl Into<String>) -> Self {
        self.app_id = Some(app_id.into());
        self
    }

    #[must_use]
    pub fn with_version_id(mut self, version_id: impl Into<String>) -> Self {
        self.version_id = version_id.into();
        self
    }

    /// Points authoring and prediction at `endpoint`, e.g. a local mock server.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        let endpoint = endpoint.into();
        self.authoring_endpoint = Some(endpoint.clone());
        self.prediction_endpoint = Some(endpoint);
        self
    }

    #[must_use]
    pub fn with_app_template(mut self, template: Value) -> Self {
        self.app_template = template;
        self
    }

    /// Authoring key and base URL, required for every training operation.
    pub fn authoring(&self) -> ProviderResult<(&str, String)> {
        let key = self.authoring_key.as_deref().ok_or(ProviderError::MissingSetting("luis.authoring_key"))?;
        let endpoint = match (&self.authoring_endpoint, &self.authoring_region) {
            (Some(endpoint), _) => endpoint.clone(),
            (None, Some(region)) => cognitive_endpoint(region),
            (None, None) => return Err(ProviderError::MissingSetting("luis.authoring_region")),
        };
        Ok((key, endpoint))
    }

    pub fn endpoint_key(&self) -> &str {
        &self.endpoint_key
    }

    pub fn prediction_endpoint(&self) -> String {
        self.prediction_endpoint.clone().unwrap_or_else(|| cognitive_endpoint(&self.endpoint_region))
    }

    /// Identity to persist so later commands target the same app version.
    pub fn saved_config(&self) -> LuisConfig {
        LuisConfig {
            app_id: self.app_id.clone(),
            app_name: Some(self.app_name.clone()),
            version_id: Some(self.version_id.clone()),
            ..LuisConfig::default()
        }
    }
}

fn cognitive_endpoint(region: &str) -> String {
    format!("https://{region}.api.cognitive.microsoft.com")
}
