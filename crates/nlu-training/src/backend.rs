use crate::error::TrainingResult;
use crate::poll::{ProvisioningStage, StagePolicy, StatusReport};
use crate::retry::RetryPolicy;
use async_trait::async_trait;
use nlu_abstraction::{EntityType, LabeledUtterance, RemoteError};

/// A model definition that has been accepted by the provider.
///
/// Created once the submit call returns and never modified afterwards; status
/// checks read the correlation id from it.
#[derive(Debug, Clone, PartialEq)]
pub struct ProvisioningRequest<D> {
    pub document: D,
    pub correlation_id: Option<String>,
}

impl<D> ProvisioningRequest<D> {
    pub fn submitted(document: D, correlation_id: Option<String>) -> Self {
        Self { document, correlation_id }
    }
}

/// Provider capabilities needed to provision and tear down a model.
///
/// Every remote method performs a single attempt; retries, polling and
/// cancellation are applied by the orchestrators.
#[async_trait]
pub trait ProvisioningBackend: Send + Sync {
    /// Provider-specific import document.
    type Document: Send + Sync;
    /// Current resource configuration, as read back before a build.
    type Configuration: Send + Sync;

    fn service_name(&self) -> &'static str;

    /// Name of the bot or app this backend manages.
    fn resource_name(&self) -> String;

    fn retry_policy(&self) -> RetryPolicy;

    fn stage_policy(&self, stage: ProvisioningStage) -> StagePolicy;

    async fn resource_exists(&self) -> Result<bool, RemoteError>;

    async fn create_resource(&self) -> Result<(), RemoteError>;

    /// Translates training data into the provider's import format.
    fn build_document(&self, utterances: &[LabeledUtterance], entity_types: &[EntityType]) -> TrainingResult<Self::Document>;

    async fn submit_document(&self, document: &Self::Document) -> Result<StatusReport, RemoteError>;

    async fn import_status(&self, request: &ProvisioningRequest<Self::Document>) -> Result<StatusReport, RemoteError>;

    async fn fetch_configuration(&self) -> Result<Self::Configuration, RemoteError>;

    /// Resubmits `current` with the build flags set.
    async fn trigger_build(&self, current: &Self::Configuration) -> Result<StatusReport, RemoteError>;

    async fn build_status(&self) -> Result<StatusReport, RemoteError>;

    fn requires_publish(&self) -> bool {
        true
    }

    async fn is_published(&self) -> Result<bool, RemoteError>;

    async fn publish(&self) -> Result<(), RemoteError>;

    async fn delete_alias(&self) -> Result<(), RemoteError>;

    async fn delete_resource(&self) -> Result<(), RemoteError>;
}

/// Runs predictions against a trained model.
#[async_trait]
pub trait PredictionClient: Send + Sync {
    fn prediction_retry_policy(&self) -> RetryPolicy;

    async fn predict(&self, text: &str, entity_types: &[EntityType]) -> Result<LabeledUtterance, RemoteError>;
}
