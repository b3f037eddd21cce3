use super::client::{LexClient, SERVICE, LATEST};
use super::payload::{build_import_json, zip_import};
use super::settings::LexSettings;
use async_trait::async_trait;
use nlu_abstraction::{Entity, EntityType, LabeledUtterance, RemoteError, RemoteErrorKind};
use nlu_training::{
    PollSchedule, PredictionClient, ProvisioningBackend, ProvisioningRequest, ProvisioningStage, RetryPolicy,
    StagePolicy, StateTable, StatusReport, TrainingResult, BUILD_POLL_BASE, DEFAULT_MAX_ATTEMPTS, IMPORT_POLL_DELAY,
};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, trace};

/// Wait before retrying a request rejected because the bot is being modified.
pub const CONFLICT_DELAY: Duration = Duration::from_secs(10);

/// Wait before retrying a throttled request.
pub const RATE_LIMIT_DELAY: Duration = Duration::from_secs(1);

const READ_ONLY_FIELDS: [&str; 6] = ["name", "status", "failureReason", "lastUpdatedDate", "createdDate", "version"];

/// Import document plus the zipped archive that is actually uploaded.
#[derive(Debug, Clone, PartialEq)]
pub struct LexImport {
    pub json: Value,
    pub archive: Vec<u8>,
}

/// `$LATEST` bot definition as returned by `GetBot`.
#[derive(Debug, Clone, PartialEq)]
pub struct BotConfiguration(Value);

impl BotConfiguration {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn as_json(&self) -> &Value {
        &self.0
    }

    /// A copy ready for `PutBot` that builds a new version.
    ///
    /// Read-only fields are dropped and the first abort and clarification
    /// messages get group number 1, which `PutBot` requires on resubmission.
    #[must_use]
    pub fn with_build_flags(&self) -> Self {
        let mut value = self.0.clone();
        if let Some(object) = value.as_object_mut() {
            for field in READ_ONLY_FIELDS {
                object.remove(field);
            }
            object.insert("processBehavior".to_string(), Value::from("BUILD"));
            object.insert("createVersion".to_string(), Value::Bool(true));
        }
        for pointer in ["/abortStatement/messages/0", "/clarificationPrompt/messages/0"] {
            if let Some(message) = value.pointer_mut(pointer).and_then(Value::as_object_mut) {
                message.insert("groupNumber".to_string(), Value::from(1));
            }
        }
        Self(value)
    }
}

/// Amazon Lex (V1) bot lifecycle.
#[derive(Debug, Clone)]
pub struct LexBackend {
    client: LexClient,
}

impl LexBackend {
    pub fn new(settings: LexSettings) -> Self {
        Self { client: LexClient::new(settings) }
    }

    pub fn settings(&self) -> &LexSettings {
        self.client.settings()
    }

    fn bot_name(&self) -> &str {
        &self.settings().bot_name
    }

    fn bot_status(bot: &Value) -> StatusReport {
        let state = bot.get("status").and_then(Value::as_str).unwrap_or_default();
        let reasons = bot
            .get("failureReason")
            .and_then(Value::as_str)
            .map(|reason| vec![reason.to_string()])
            .unwrap_or_default();
        StatusReport::new(state).with_reasons(reasons)
    }
}

#[async_trait]
impl ProvisioningBackend for LexBackend {
    type Document = LexImport;
    type Configuration = BotConfiguration;

    fn service_name(&self) -> &'static str {
        SERVICE
    }

    fn resource_name(&self) -> String {
        self.bot_name().to_string()
    }

    fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(DEFAULT_MAX_ATTEMPTS)
            .with_delay(RemoteErrorKind::Conflict, CONFLICT_DELAY)
            .with_delay(RemoteErrorKind::RateLimited, RATE_LIMIT_DELAY)
    }

    fn stage_policy(&self, stage: ProvisioningStage) -> StagePolicy {
        match stage {
            ProvisioningStage::Import => StagePolicy::new(
                PollSchedule::Fixed(IMPORT_POLL_DELAY),
                StateTable::new().succeeded(["COMPLETE"]).failed(["FAILED"]).in_progress(["IN_PROGRESS"]),
            ),
            // An import that changed nothing leaves the bot NOT_BUILT.
            ProvisioningStage::Build => StagePolicy::new(
                PollSchedule::Linear { base: BUILD_POLL_BASE },
                StateTable::new()
                    .succeeded(["READY", "READY_BASIC_TESTING", "NOT_BUILT"])
                    .failed(["FAILED"])
                    .in_progress(["BUILDING"]),
            ),
        }
    }

    async fn resource_exists(&self) -> Result<bool, RemoteError> {
        let bots = self.client.get_bots(self.bot_name()).await?;
        Ok(bots.iter().any(|bot| bot.name == self.bot_name()))
    }

    async fn create_resource(&self) -> Result<(), RemoteError> {
        trace!(bot = %self.bot_name(), "Creating bot");
        let body = serde_json::json!({
            "childDirected": false,
            "createVersion": true,
            "locale": "en-US",
            "processBehavior": "BUILD",
            "voiceId": "0",
        });
        self.client.put_bot(self.bot_name(), &body).await?;
        Ok(())
    }

    fn build_document(&self, utterances: &[LabeledUtterance], entity_types: &[EntityType]) -> TrainingResult<LexImport> {
        let json = build_import_json(self.bot_name(), utterances, entity_types, &self.settings().import_template)?;
        let archive = zip_import(&json)?;
        Ok(LexImport { json, archive })
    }

    async fn submit_document(&self, document: &LexImport) -> Result<StatusReport, RemoteError> {
        trace!(bot = %self.bot_name(), bytes = document.archive.len(), "Importing bot");
        let response = self.client.start_import(&document.archive).await?;
        let mut report = StatusReport::new(response.import_status).with_reasons(response.failure_reason);
        if let Some(id) = response.import_id {
            report = report.with_correlation_id(id);
        }
        Ok(report)
    }

    async fn import_status(&self, request: &ProvisioningRequest<LexImport>) -> Result<StatusReport, RemoteError> {
        let Some(import_id) = request.correlation_id.as_deref() else {
            return Err(RemoteError::new(SERVICE, RemoteErrorKind::Other, "import started without an import id"));
        };
        let response = self.client.get_import(import_id).await?;
        Ok(StatusReport::new(response.import_status).with_reasons(response.failure_reason))
    }

    async fn fetch_configuration(&self) -> Result<BotConfiguration, RemoteError> {
        Ok(BotConfiguration::new(self.client.get_bot(self.bot_name(), LATEST).await?))
    }

    async fn trigger_build(&self, current: &BotConfiguration) -> Result<StatusReport, RemoteError> {
        trace!(bot = %self.bot_name(), "Building bot");
        let bot = self.client.put_bot(self.bot_name(), current.with_build_flags().as_json()).await?;
        Ok(Self::bot_status(&bot))
    }

    async fn build_status(&self) -> Result<StatusReport, RemoteError> {
        let bot = self.client.get_bot(self.bot_name(), LATEST).await?;
        Ok(Self::bot_status(&bot))
    }

    async fn is_published(&self) -> Result<bool, RemoteError> {
        let alias = &self.settings().bot_alias;
        let aliases = self.client.get_bot_aliases(self.bot_name(), alias).await?;
        Ok(aliases.iter().any(|a| &a.name == alias))
    }

    async fn publish(&self) -> Result<(), RemoteError> {
        let alias = &self.settings().bot_alias;
        trace!(bot = %self.bot_name(), %alias, "Publishing bot alias");
        self.client.put_bot_alias(self.bot_name(), alias, LATEST).await
    }

    async fn delete_alias(&self) -> Result<(), RemoteError> {
        let alias = &self.settings().bot_alias;
        trace!(bot = %self.bot_name(), %alias, "Deleting bot alias");
        self.client.delete_bot_alias(self.bot_name(), alias).await
    }

    async fn delete_resource(&self) -> Result<(), RemoteError> {
        trace!(bot = %self.bot_name(), "Deleting bot");
        self.client.delete_bot(self.bot_name()).await
    }
}

#[async_trait]
impl PredictionClient for LexBackend {
    fn prediction_retry_policy(&self) -> RetryPolicy {
        self.retry_policy()
    }

    async fn predict(&self, text: &str, _entity_types: &[EntityType]) -> Result<LabeledUtterance, RemoteError> {
        let user_id = uuid::Uuid::new_v4().to_string();
        let response = self.client.post_text(&user_id, text).await?;
        debug!(intent = ?response.intent_name, "Lex prediction");

        let mut entities: Vec<Entity> = response
            .slots
            .unwrap_or_default()
            .into_iter()
            .filter_map(|(slot, value)| value.map(|v| Entity::new(slot, Some(Value::String(v)), None, 0)))
            .collect();
        entities.sort_by(|a, b| a.entity_type.cmp(&b.entity_type));

        Ok(LabeledUtterance::new(text, response.intent_name, entities))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_build_flags_leave_original_untouched() {
        let fetched = BotConfiguration::new(json!({
            "name": "PizzaBot",
            "status": "READY",
            "version": "$LATEST",
            "checksum": "abc",
            "createdDate": 1.0,
            "abortStatement": { "messages": [{ "content": "bye" }, { "content": "later" }] },
            "clarificationPrompt": { "messages": [{ "content": "what?" }], "maxAttempts": 5 },
        }));

        let build = fetched.with_build_flags();

        assert_eq!(
            build.as_json(),
            &json!({
                "checksum": "abc",
                "processBehavior": "BUILD",
                "createVersion": true,
                "abortStatement": { "messages": [{ "content": "bye", "groupNumber": 1 }, { "content": "later" }] },
                "clarificationPrompt": { "messages": [{ "content": "what?", "groupNumber": 1 }], "maxAttempts": 5 },
            })
        );
        assert_eq!(fetched.as_json()["status"], "READY");
    }

    #[test]
    fn test_build_flags_without_prompts() {
        let build = BotConfiguration::new(json!({ "checksum": "abc" })).with_build_flags();
        assert_eq!(build.as_json()["processBehavior"], "BUILD");
        assert!(build.as_json().get("abortStatement").is_none());
    }
}
