//! Provider selection.

use crate::error::{ProviderError, ProviderResult};
use crate::lex::{LexBackend, LexConfig, LexSettings};
use crate::luis::{LuisBackend, LuisConfig, LuisSettings};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, error};

/// Supported NLU services.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Amazon Lex.
    Lex,
    /// Microsoft LUIS.
    Luis,
}

impl ProviderKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Lex => "lex",
            Self::Luis => "luis",
        }
    }
}

impl FromStr for ProviderKind {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "lex" => Ok(Self::Lex),
            "luis" => Ok(Self::Luis),
            _ => {
                error!(service = %s, "Unrecognized NLU service");
                Err(ProviderError::UnsupportedService(s.to_string()))
            }
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Options for every provider, one section each.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvidersConfig {
    pub lex: LexConfig,
    pub luis: LuisConfig,
}

/// A configured provider backend.
#[derive(Debug, Clone)]
pub enum Provider {
    Lex(Arc<LexBackend>),
    Luis(Arc<LuisBackend>),
}

impl Provider {
    /// Resolves settings for `kind`, generating missing resource names.
    pub fn from_config(kind: ProviderKind, config: &ProvidersConfig) -> ProviderResult<Self> {
        debug!(service = %kind, "Creating provider");
        match kind {
            ProviderKind::Lex => Ok(Self::Lex(Arc::new(LexBackend::new(LexSettings::from_config(&config.lex)?)))),
            ProviderKind::Luis => Ok(Self::Luis(Arc::new(LuisBackend::new(LuisSettings::from_config(&config.luis)?)))),
        }
    }

    pub fn kind(&self) -> ProviderKind {
        match self {
            Self::Lex(_) => ProviderKind::Lex,
            Self::Luis(_) => ProviderKind::Luis,
        }
    }

    /// Resource identity to persist after training, in config form.
    pub fn saved_config(&self) -> ProvidersConfig {
        match self {
            Self::Lex(backend) => ProvidersConfig { lex: backend.settings().saved_config(), ..ProvidersConfig::default() },
            Self::Luis(backend) => {
                ProvidersConfig { luis: backend.resolved_settings().saved_config(), ..ProvidersConfig::default() }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_kind() {
        assert_eq!("lex".parse::<ProviderKind>().unwrap(), ProviderKind::Lex);
        assert_eq!("LUIS".parse::<ProviderKind>().unwrap(), ProviderKind::Luis);
        assert!(matches!("dialogflow".parse::<ProviderKind>(), Err(ProviderError::UnsupportedService(_))));
        assert_eq!(ProviderKind::Luis.to_string(), "luis");
    }

    #[test]
    fn test_luis_saved_config_keeps_identity() {
        let config = ProvidersConfig {
            luis: LuisConfig {
                app_id: Some("app-1".to_string()),
                authoring_key: Some("key".to_string()),
                authoring_region: Some("westus".to_string()),
                ..LuisConfig::default()
            },
            ..ProvidersConfig::default()
        };

        let provider = Provider::from_config(ProviderKind::Luis, &config).unwrap();
        let saved = provider.saved_config();

        assert_eq!(provider.kind(), ProviderKind::Luis);
        assert_eq!(saved.luis.app_id.as_deref(), Some("app-1"));
        assert_eq!(saved.luis.version_id.as_deref(), Some("0.1.1"));
        assert!(saved.luis.authoring_key.is_none());
    }

    #[test]
    fn test_lex_requires_credentials() {
        let err = Provider::from_config(ProviderKind::Lex, &ProvidersConfig::default()).unwrap_err();
        assert!(matches!(err, ProviderError::MissingSetting(_)));
    }
}
