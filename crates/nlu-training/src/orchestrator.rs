//! End-to-end training workflow.

use crate::backend::{ProvisioningBackend, ProvisioningRequest};
use crate::error::TrainingResult;
use crate::poll::{ProvisioningPoller, ProvisioningStage};
use crate::progress::{ProgressEvent, ProgressSink, WorkflowStep};
use crate::retry::RetryExecutor;
use crate::validate::validate_training_arguments;
use nlu_abstraction::{EntityType, LabeledUtterance};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Drives a provider from raw training data to a published model.
///
/// Steps run strictly in order: ensure the resource exists, import the
/// document and wait for the import, trigger a build from the current
/// configuration and wait for it, then publish when needed. Every remote call
/// goes through the backend's retry policy.
pub struct TrainingOrchestrator<B: ProvisioningBackend> {
    backend: Arc<B>,
    retry: RetryExecutor,
    progress: Arc<dyn ProgressSink>,
}

impl<B: ProvisioningBackend> TrainingOrchestrator<B> {
    pub fn new(backend: Arc<B>, progress: Arc<dyn ProgressSink>) -> Self {
        let retry = RetryExecutor::new(backend.retry_policy(), Arc::clone(&progress));
        Self { backend, retry, progress }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub async fn train(
        &self,
        utterances: &[LabeledUtterance],
        entity_types: &[EntityType],
        cancel: &CancellationToken,
    ) -> TrainingResult<()> {
        validate_training_arguments(utterances, entity_types)?;
        let document = self.backend.build_document(utterances, entity_types)?;
        let resource = self.backend.resource_name();
        debug!(
            service = self.backend.service_name(),
            %resource,
            utterances = utterances.len(),
            entity_types = entity_types.len(),
            "Training"
        );

        self.ensure_resource(&resource, cancel).await?;
        self.import(&resource, document, cancel).await?;
        self.build(&resource, cancel).await?;
        self.publish(&resource, cancel).await
    }

    async fn ensure_resource(&self, resource: &str, cancel: &CancellationToken) -> TrainingResult<()> {
        self.started(resource, WorkflowStep::EnsureResource);
        let exists = self.retry.execute("resource_exists", cancel, || self.backend.resource_exists()).await?;
        if exists {
            self.skipped(resource, WorkflowStep::EnsureResource, "already exists");
            return Ok(());
        }

        self.retry.execute("create_resource", cancel, || self.backend.create_resource()).await?;
        self.finished(resource, WorkflowStep::EnsureResource);
        Ok(())
    }

    async fn import(&self, resource: &str, document: B::Document, cancel: &CancellationToken) -> TrainingResult<()> {
        self.started(resource, WorkflowStep::Import);
        let report = self
            .retry
            .execute("submit_document", cancel, || self.backend.submit_document(&document))
            .await?;
        let request = ProvisioningRequest::submitted(document, report.correlation_id.clone());

        let (backend, retry, request) = (self.backend.as_ref(), &self.retry, &request);
        let policy = backend.stage_policy(ProvisioningStage::Import);
        ProvisioningPoller::new(ProvisioningStage::Import, &policy, self.progress.as_ref(), cancel)
            .wait_until_terminal(&report, move || {
                retry.execute("import_status", cancel, move || backend.import_status(request))
            })
            .await?
            .into_result(ProvisioningStage::Import)?;

        self.finished(resource, WorkflowStep::Import);
        Ok(())
    }

    async fn build(&self, resource: &str, cancel: &CancellationToken) -> TrainingResult<()> {
        self.started(resource, WorkflowStep::Build);
        let current = self
            .retry
            .execute("fetch_configuration", cancel, || self.backend.fetch_configuration())
            .await?;
        let report = self
            .retry
            .execute("trigger_build", cancel, || self.backend.trigger_build(&current))
            .await?;

        let (backend, retry) = (self.backend.as_ref(), &self.retry);
        let policy = backend.stage_policy(ProvisioningStage::Build);
        ProvisioningPoller::new(ProvisioningStage::Build, &policy, self.progress.as_ref(), cancel)
            .wait_until_terminal(&report, move || retry.execute("build_status", cancel, move || backend.build_status()))
            .await?
            .into_result(ProvisioningStage::Build)?;

        self.finished(resource, WorkflowStep::Build);
        Ok(())
    }

    async fn publish(&self, resource: &str, cancel: &CancellationToken) -> TrainingResult<()> {
        if !self.backend.requires_publish() {
            self.skipped(resource, WorkflowStep::Publish, "not required");
            return Ok(());
        }

        self.started(resource, WorkflowStep::Publish);
        let published = self.retry.execute("is_published", cancel, || self.backend.is_published()).await?;
        if published {
            self.skipped(resource, WorkflowStep::Publish, "already published");
            return Ok(());
        }

        self.retry.execute("publish", cancel, || self.backend.publish()).await?;
        self.finished(resource, WorkflowStep::Publish);
        Ok(())
    }

    fn started(&self, resource: &str, step: WorkflowStep) {
        self.progress.on_event(ProgressEvent::StepStarted { resource: resource.to_string(), step });
    }

    fn finished(&self, resource: &str, step: WorkflowStep) {
        self.progress.on_event(ProgressEvent::StepFinished { resource: resource.to_string(), step });
    }

    fn skipped(&self, resource: &str, step: WorkflowStep, reason: &str) {
        self.progress.on_event(ProgressEvent::StepSkipped {
            resource: resource.to_string(),
            step,
            reason: reason.to_string(),
        });
    }
}
