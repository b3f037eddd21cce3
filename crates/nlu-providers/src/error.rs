use thiserror::Error;

pub type ProviderResult<T> = std::result::Result<T, ProviderError>;

/// Errors raised while configuring a provider, before any remote call.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("missing required setting '{0}'")]
    MissingSetting(&'static str),

    #[error("invalid setting '{name}': {reason}")]
    InvalidSetting { name: &'static str, reason: String },

    #[error("unsupported NLU service '{0}' (expected 'lex' or 'luis')")]
    UnsupportedService(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
