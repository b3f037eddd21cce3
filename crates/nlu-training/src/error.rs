use crate::poll::ProvisioningStage;
use nlu_abstraction::RemoteError;
use thiserror::Error;

pub type TrainingResult<T> = std::result::Result<T, TrainingError>;

#[derive(Debug, Error)]
pub enum TrainingError {
    #[error("invalid argument '{parameter}': {reason}")]
    InvalidArgument { parameter: &'static str, reason: String },

    #[error("entity type '{0}' is not defined in the supplied entity types")]
    UnknownEntityType(String),

    #[error("unable to find occurrence {occurrence} of '{match_text}' in utterance '{text}'")]
    EntityNotFound { text: String, match_text: String, occurrence: usize },

    #[error("entity '{match_text}' overlaps another entity in utterance '{text}'")]
    OverlappingEntities { text: String, match_text: String },

    /// Remote error after retries were exhausted, or one the retry policy
    /// does not cover. Surfaced unchanged.
    #[error(transparent)]
    Remote(#[from] RemoteError),

    /// Provider reported a terminal failure. Display is exactly the
    /// provider's reasons joined by newlines.
    #[error("{}", .reasons.join("\n"))]
    ProvisioningFailed { stage: ProvisioningStage, reasons: Vec<String> },

    #[error("expected {stage} to be in progress, instead found '{observed}'")]
    UnexpectedState { stage: ProvisioningStage, observed: String },

    #[error("{stage} did not reach a terminal state after {checks} status checks")]
    PollLimitExceeded { stage: ProvisioningStage, checks: u32 },

    #[error("operation cancelled")]
    Cancelled,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl TrainingError {
    pub fn invalid_argument(parameter: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidArgument { parameter, reason: reason.into() }
    }

    /// Returns the underlying remote error, if any.
    pub fn as_remote(&self) -> Option<&RemoteError> {
        match self {
            Self::Remote(err) => Some(err),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provisioning_failed_joins_reasons() {
        let err = TrainingError::ProvisioningFailed {
            stage: ProvisioningStage::Import,
            reasons: vec!["a".to_string(), "b".to_string()],
        };
        assert_eq!(err.to_string(), "a\nb");

        let err = TrainingError::ProvisioningFailed { stage: ProvisioningStage::Build, reasons: vec![] };
        assert_eq!(err.to_string(), "");
    }

    #[test]
    fn test_unexpected_state_names_observed_value() {
        let err = TrainingError::UnexpectedState {
            stage: ProvisioningStage::Build,
            observed: "DELETING".to_string(),
        };
        assert_eq!(err.to_string(), "expected build to be in progress, instead found 'DELETING'");
    }
}
