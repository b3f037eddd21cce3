use super::client::{LuisClient, ModelTrainingInfo, SERVICE};
use super::payload::{build_app_json, to_labeled_utterance};
use super::settings::LuisSettings;
use async_trait::async_trait;
use nlu_abstraction::{EntityType, LabeledUtterance, RemoteError, RemoteErrorKind};
use nlu_training::{
    PollSchedule, PredictionClient, ProvisioningBackend, ProvisioningRequest, ProvisioningStage, RetryPolicy,
    StagePolicy, StateTable, StatusReport, TrainingResult, DEFAULT_MAX_ATTEMPTS,
};
use serde_json::Value;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tracing::{debug, trace};

/// Fallback wait for throttled authoring calls without `Retry-After`.
pub const AUTHORING_THROTTLE_DELAY: Duration = Duration::from_secs(2);

/// Fallback wait for throttled predictions without `Retry-After`.
pub const QUERY_THROTTLE_DELAY: Duration = Duration::from_millis(100);

/// Fixed wait between training status checks.
pub const TRAIN_STATUS_DELAY: Duration = Duration::from_secs(2);

const IMPORTED: &str = "Imported";
const SUCCESS: &str = "Success";
const UP_TO_DATE: &str = "UpToDate";
const IN_PROGRESS: &str = "InProgress";
const QUEUED: &str = "Queued";
const FAIL: &str = "Fail";

/// The app version a training run targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainingTarget {
    pub app_id: String,
    pub version_id: String,
}

/// LUIS app lifecycle.
///
/// The app id is discovered at runtime when the app is created, so it is held
/// behind a lock.
#[derive(Debug)]
pub struct LuisBackend {
    client: LuisClient,
    app_id: Mutex<Option<String>>,
}

impl LuisBackend {
    pub fn new(settings: LuisSettings) -> Self {
        let app_id = Mutex::new(settings.app_id.clone());
        Self { client: LuisClient::new(settings), app_id }
    }

    pub fn settings(&self) -> &LuisSettings {
        self.client.settings()
    }

    /// Id of the app, once known.
    pub fn app_id(&self) -> Option<String> {
        self.app_id.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Settings including an app id assigned during training.
    pub fn resolved_settings(&self) -> LuisSettings {
        let settings = self.settings().clone();
        match self.app_id() {
            Some(app_id) => settings.with_app_id(app_id),
            None => settings,
        }
    }

    fn require_app_id(&self, kind: RemoteErrorKind) -> Result<String, RemoteError> {
        self.app_id().ok_or_else(|| RemoteError::new(SERVICE, kind, "no LUIS app id is configured"))
    }

    fn version_id(&self) -> &str {
        &self.settings().version_id
    }

    /// Collapses per-model training states into one state for the poller.
    ///
    /// A state LUIS does not document is passed through unchanged so the
    /// poller rejects it. An empty list has nothing left in progress.
    fn training_report(models: &[ModelTrainingInfo]) -> StatusReport {
        let known = [SUCCESS, UP_TO_DATE, IN_PROGRESS, QUEUED, FAIL];
        if let Some(unknown) = models.iter().find(|m| !known.contains(&m.details.status.as_str())) {
            return StatusReport::new(unknown.details.status.clone());
        }

        let status = |s: &str| models.iter().any(|m| m.details.status == s);
        if status(IN_PROGRESS) {
            return StatusReport::new(IN_PROGRESS);
        }
        if status(QUEUED) {
            return StatusReport::new(QUEUED);
        }

        let failures: Vec<String> = models
            .iter()
            .filter(|m| m.details.status == FAIL)
            .map(|m| {
                let reason = m.details.failure_reason.as_deref().unwrap_or("unknown failure");
                format!("model '{}': {reason}", m.model_id)
            })
            .collect();
        if !failures.is_empty() {
            return StatusReport::new(FAIL).with_reasons(failures);
        }
        if !models.is_empty() && models.iter().all(|m| m.details.status == UP_TO_DATE) {
            return StatusReport::new(UP_TO_DATE);
        }
        StatusReport::new(SUCCESS)
    }
}

#[async_trait]
impl ProvisioningBackend for LuisBackend {
    type Document = Value;
    type Configuration = TrainingTarget;

    fn service_name(&self) -> &'static str {
        SERVICE
    }

    fn resource_name(&self) -> String {
        self.app_id().unwrap_or_else(|| self.settings().app_name.clone())
    }

    fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(DEFAULT_MAX_ATTEMPTS)
            .with_delay(RemoteErrorKind::RateLimited, AUTHORING_THROTTLE_DELAY)
            .with_delay(RemoteErrorKind::ServerError, AUTHORING_THROTTLE_DELAY)
            .honoring_retry_after()
    }

    fn stage_policy(&self, stage: ProvisioningStage) -> StagePolicy {
        match stage {
            // Version import is synchronous.
            ProvisioningStage::Import => {
                StagePolicy::new(PollSchedule::Fixed(TRAIN_STATUS_DELAY), StateTable::new().succeeded([IMPORTED]))
            }
            ProvisioningStage::Build => StagePolicy::new(
                PollSchedule::Fixed(TRAIN_STATUS_DELAY),
                StateTable::new()
                    .succeeded([SUCCESS, UP_TO_DATE])
                    .failed([FAIL])
                    .pending([QUEUED])
                    .in_progress([IN_PROGRESS]),
            ),
        }
    }

    async fn resource_exists(&self) -> Result<bool, RemoteError> {
        Ok(self.app_id().is_some())
    }

    async fn create_resource(&self) -> Result<(), RemoteError> {
        let app_name = &self.settings().app_name;
        let app_id = self.client.create_app(app_name).await?;
        trace!(app = %app_name, %app_id, "Created LUIS app");
        *self.app_id.lock().unwrap_or_else(PoisonError::into_inner) = Some(app_id);
        Ok(())
    }

    fn build_document(&self, utterances: &[LabeledUtterance], entity_types: &[EntityType]) -> TrainingResult<Value> {
        let settings = self.settings();
        build_app_json(&settings.app_name, &settings.version_id, utterances, entity_types, &settings.app_template)
    }

    async fn submit_document(&self, document: &Value) -> Result<StatusReport, RemoteError> {
        let app_id = self.require_app_id(RemoteErrorKind::Other)?;
        trace!(%app_id, version = %self.version_id(), "Importing LUIS app version");
        self.client.import_version(&app_id, self.version_id(), document).await?;
        Ok(StatusReport::new(IMPORTED).with_correlation_id(self.version_id()))
    }

    async fn import_status(&self, _request: &ProvisioningRequest<Value>) -> Result<StatusReport, RemoteError> {
        Ok(StatusReport::new(IMPORTED))
    }

    async fn fetch_configuration(&self) -> Result<TrainingTarget, RemoteError> {
        let app_id = self.require_app_id(RemoteErrorKind::Other)?;
        let version = self.client.get_version(&app_id, self.version_id()).await?;
        let version_id = version.get("version").and_then(Value::as_str).unwrap_or(self.version_id()).to_string();
        Ok(TrainingTarget { app_id, version_id })
    }

    async fn trigger_build(&self, current: &TrainingTarget) -> Result<StatusReport, RemoteError> {
        trace!(app_id = %current.app_id, version = %current.version_id, "Training LUIS app version");
        let response = self.client.train(&current.app_id, &current.version_id).await?;
        Ok(StatusReport::new(response.status))
    }

    async fn build_status(&self) -> Result<StatusReport, RemoteError> {
        let app_id = self.require_app_id(RemoteErrorKind::Other)?;
        let models = self.client.training_status(&app_id, self.version_id()).await?;
        Ok(Self::training_report(&models))
    }

    async fn is_published(&self) -> Result<bool, RemoteError> {
        Ok(false)
    }

    async fn publish(&self) -> Result<(), RemoteError> {
        let app_id = self.require_app_id(RemoteErrorKind::Other)?;
        trace!(%app_id, version = %self.version_id(), staging = self.settings().is_staging, "Publishing LUIS app version");
        self.client.publish(&app_id, self.version_id()).await
    }

    async fn delete_alias(&self) -> Result<(), RemoteError> {
        trace!("LUIS apps have no alias to delete");
        Ok(())
    }

    async fn delete_resource(&self) -> Result<(), RemoteError> {
        let app_id = self.require_app_id(RemoteErrorKind::NotFound)?;
        trace!(%app_id, "Deleting LUIS app");
        self.client.delete_app(&app_id).await
    }
}

#[async_trait]
impl PredictionClient for LuisBackend {
    fn prediction_retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(DEFAULT_MAX_ATTEMPTS)
            .with_delay(RemoteErrorKind::RateLimited, QUERY_THROTTLE_DELAY)
            .honoring_retry_after()
    }

    async fn predict(&self, text: &str, entity_types: &[EntityType]) -> Result<LabeledUtterance, RemoteError> {
        let app_id = self.require_app_id(RemoteErrorKind::Other)?;
        let result = self.client.query(&app_id, text).await?;
        debug!(intent = ?result.top_scoring_intent.as_ref().map(|i| &i.intent), "LUIS prediction");
        Ok(to_labeled_utterance(result, entity_types))
    }
}
