//! Scripted in-memory provider used by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use nlu_abstraction::{EntityType, LabeledUtterance, RemoteError, RemoteErrorKind};
use nlu_training::payload::{locate_entities, resolve_entity_type};
use nlu_training::{
    PollSchedule, PredictionClient, ProgressEvent, ProgressSink, ProvisioningBackend, ProvisioningRequest,
    ProvisioningStage, RetryPolicy, StagePolicy, StateTable, StatusReport, TrainingResult,
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

pub fn conflict() -> RemoteError {
    RemoteError::from_status("fake", 409, "resource is being modified")
}

pub fn rate_limited() -> RemoteError {
    RemoteError::from_status("fake", 429, "slow down")
}

pub fn not_found() -> RemoteError {
    RemoteError::from_status("fake", 404, "no such resource")
}

pub fn unauthorized() -> RemoteError {
    RemoteError::new("fake", RemoteErrorKind::Unauthorized, "bad key")
}

pub fn lex_retry_policy() -> RetryPolicy {
    RetryPolicy::default()
        .with_delay(RemoteErrorKind::Conflict, Duration::from_secs(10))
        .with_delay(RemoteErrorKind::RateLimited, Duration::from_secs(1))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeConfiguration {
    pub checksum: String,
    pub build: bool,
}

type Script<T> = Mutex<VecDeque<Result<T, RemoteError>>>;

fn next<T>(script: &Script<T>, fallback: impl FnOnce() -> Result<T, RemoteError>) -> Result<T, RemoteError> {
    script.lock().unwrap().pop_front().unwrap_or_else(fallback)
}

/// Provider whose responses are queued per operation. Empty queues fall back
/// to a happy-path answer.
pub struct ScriptedBackend {
    pub calls: Mutex<Vec<(&'static str, Instant)>>,
    pub exists: Script<bool>,
    pub create: Script<()>,
    pub submit: Script<StatusReport>,
    pub import_status: Script<StatusReport>,
    pub fetch: Script<FakeConfiguration>,
    pub trigger: Script<StatusReport>,
    pub build_status: Script<StatusReport>,
    pub published: Script<bool>,
    pub publish: Script<()>,
    pub delete_alias: Script<()>,
    pub delete_resource: Script<()>,
    pub triggered_with: Mutex<Vec<FakeConfiguration>>,
    pub imported_ids: Mutex<Vec<Option<String>>>,
    pub requires_publish: bool,
}

impl Default for ScriptedBackend {
    fn default() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            exists: Mutex::default(),
            create: Mutex::default(),
            submit: Mutex::default(),
            import_status: Mutex::default(),
            fetch: Mutex::default(),
            trigger: Mutex::default(),
            build_status: Mutex::default(),
            published: Mutex::default(),
            publish: Mutex::default(),
            delete_alias: Mutex::default(),
            delete_resource: Mutex::default(),
            triggered_with: Mutex::new(Vec::new()),
            imported_ids: Mutex::new(Vec::new()),
            requires_publish: true,
        }
    }
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script<T>(queue: &Script<T>, items: Vec<Result<T, RemoteError>>) {
        queue.lock().unwrap().extend(items);
    }

    fn record(&self, name: &'static str) {
        self.calls.lock().unwrap().push((name, Instant::now()));
    }

    pub fn call_names(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().iter().map(|(name, _)| *name).collect()
    }

    pub fn count(&self, name: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|(n, _)| *n == name).count()
    }

    /// Instants at which `name` was called.
    pub fn times(&self, name: &str) -> Vec<Instant> {
        self.calls.lock().unwrap().iter().filter(|(n, _)| *n == name).map(|(_, at)| *at).collect()
    }
}

#[async_trait]
impl ProvisioningBackend for ScriptedBackend {
    type Document = Vec<String>;
    type Configuration = FakeConfiguration;

    fn service_name(&self) -> &'static str {
        "fake"
    }

    fn resource_name(&self) -> String {
        "TestBot".to_string()
    }

    fn retry_policy(&self) -> RetryPolicy {
        lex_retry_policy()
    }

    fn stage_policy(&self, stage: ProvisioningStage) -> StagePolicy {
        match stage {
            ProvisioningStage::Import => StagePolicy::new(
                PollSchedule::Fixed(Duration::from_secs(2)),
                StateTable::new().succeeded(["COMPLETE"]).failed(["FAILED"]).in_progress(["IN_PROGRESS"]),
            ),
            ProvisioningStage::Build => StagePolicy::new(
                PollSchedule::Linear { base: Duration::from_secs(2) },
                StateTable::new()
                    .succeeded(["READY", "NOT_BUILT"])
                    .failed(["FAILED"])
                    .in_progress(["BUILDING"]),
            ),
        }
    }

    async fn resource_exists(&self) -> Result<bool, RemoteError> {
        self.record("resource_exists");
        next(&self.exists, || Ok(true))
    }

    async fn create_resource(&self) -> Result<(), RemoteError> {
        self.record("create_resource");
        next(&self.create, || Ok(()))
    }

    fn build_document(&self, utterances: &[LabeledUtterance], entity_types: &[EntityType]) -> TrainingResult<Vec<String>> {
        for utterance in utterances {
            for entity in &utterance.entities {
                resolve_entity_type(entity_types, &entity.entity_type)?;
            }
            locate_entities(&utterance.text, &utterance.entities)?;
        }
        Ok(utterances.iter().map(|u| u.text.clone()).collect())
    }

    async fn submit_document(&self, _document: &Vec<String>) -> Result<StatusReport, RemoteError> {
        self.record("submit_document");
        next(&self.submit, || Ok(StatusReport::new("IN_PROGRESS").with_correlation_id("import-1")))
    }

    async fn import_status(&self, request: &ProvisioningRequest<Vec<String>>) -> Result<StatusReport, RemoteError> {
        self.record("import_status");
        self.imported_ids.lock().unwrap().push(request.correlation_id.clone());
        next(&self.import_status, || Ok(StatusReport::new("COMPLETE")))
    }

    async fn fetch_configuration(&self) -> Result<FakeConfiguration, RemoteError> {
        self.record("fetch_configuration");
        next(&self.fetch, || Ok(FakeConfiguration { checksum: "abc".to_string(), build: false }))
    }

    async fn trigger_build(&self, current: &FakeConfiguration) -> Result<StatusReport, RemoteError> {
        self.record("trigger_build");
        let updated = FakeConfiguration { build: true, ..current.clone() };
        self.triggered_with.lock().unwrap().push(updated);
        next(&self.trigger, || Ok(StatusReport::new("BUILDING")))
    }

    async fn build_status(&self) -> Result<StatusReport, RemoteError> {
        self.record("build_status");
        next(&self.build_status, || Ok(StatusReport::new("READY")))
    }

    fn requires_publish(&self) -> bool {
        self.requires_publish
    }

    async fn is_published(&self) -> Result<bool, RemoteError> {
        self.record("is_published");
        next(&self.published, || Ok(false))
    }

    async fn publish(&self) -> Result<(), RemoteError> {
        self.record("publish");
        next(&self.publish, || Ok(()))
    }

    async fn delete_alias(&self) -> Result<(), RemoteError> {
        self.record("delete_alias");
        next(&self.delete_alias, || Ok(()))
    }

    async fn delete_resource(&self) -> Result<(), RemoteError> {
        self.record("delete_resource");
        next(&self.delete_resource, || Ok(()))
    }
}

/// Echoes the utterance back with a fixed intent, tracking peak concurrency.
#[derive(Default)]
pub struct EchoPredictor {
    pub in_flight: AtomicUsize,
    pub peak: AtomicUsize,
    pub failures: Script<()>,
}

#[async_trait]
impl PredictionClient for EchoPredictor {
    fn prediction_retry_policy(&self) -> RetryPolicy {
        RetryPolicy::default().with_delay(RemoteErrorKind::RateLimited, Duration::from_millis(100))
    }

    async fn predict(&self, text: &str, _entity_types: &[EntityType]) -> Result<LabeledUtterance, RemoteError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(50)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        next(&self.failures, || Ok(()))?;
        Ok(LabeledUtterance::new(text, Some("Echo".to_string()), vec![]))
    }
}

#[derive(Default)]
pub struct RecordingSink {
    pub events: Mutex<Vec<ProgressEvent>>,
}

impl ProgressSink for RecordingSink {
    fn on_event(&self, event: ProgressEvent) {
        self.events.lock().unwrap().push(event);
    }
}

impl RecordingSink {
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().unwrap().clone()
    }
}
