use crate::backend::ProvisioningBackend;
use crate::error::{TrainingError, TrainingResult};
use crate::progress::{ProgressEvent, ProgressSink, WorkflowStep};
use crate::retry::RetryExecutor;
use nlu_abstraction::RemoteError;
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Removes the alias and then the resource a backend manages.
///
/// Targets that are already gone are reported and skipped.
pub struct CleanupOrchestrator<B: ProvisioningBackend> {
    backend: Arc<B>,
    retry: RetryExecutor,
    progress: Arc<dyn ProgressSink>,
}

impl<B: ProvisioningBackend> CleanupOrchestrator<B> {
    pub fn new(backend: Arc<B>, progress: Arc<dyn ProgressSink>) -> Self {
        let retry = RetryExecutor::new(backend.retry_policy(), Arc::clone(&progress));
        Self { backend, retry, progress }
    }

    pub async fn cleanup(&self, cancel: &CancellationToken) -> TrainingResult<()> {
        self.delete(WorkflowStep::DeleteAlias, cancel, || self.backend.delete_alias()).await?;
        self.delete(WorkflowStep::DeleteResource, cancel, || self.backend.delete_resource()).await
    }

    async fn delete<F, Fut>(&self, step: WorkflowStep, cancel: &CancellationToken, op: F) -> TrainingResult<()>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<(), RemoteError>>,
    {
        let resource = self.backend.resource_name();
        self.progress.on_event(ProgressEvent::StepStarted { resource: resource.clone(), step });

        match self.retry.execute(&step.to_string(), cancel, op).await {
            Ok(()) => {
                self.progress.on_event(ProgressEvent::StepFinished { resource, step });
                Ok(())
            }
            Err(TrainingError::Remote(err)) if err.is_not_found() => {
                self.progress.on_event(ProgressEvent::NotFound { resource, step, message: err.message });
                Ok(())
            }
            Err(err) => Err(err),
        }
    }
}
