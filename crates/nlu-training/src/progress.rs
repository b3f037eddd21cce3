use crate::poll::ProvisioningStage;
use nlu_abstraction::RemoteErrorKind;
use std::fmt;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Step of the train or cleanup workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowStep {
    EnsureResource,
    Import,
    Build,
    Publish,
    DeleteAlias,
    DeleteResource,
}

impl fmt::Display for WorkflowStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::EnsureResource => "ensure resource",
            Self::Import => "import",
            Self::Build => "build",
            Self::Publish => "publish",
            Self::DeleteAlias => "delete alias",
            Self::DeleteResource => "delete resource",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    StepStarted { resource: String, step: WorkflowStep },
    StepFinished { resource: String, step: WorkflowStep },
    StepSkipped { resource: String, step: WorkflowStep, reason: String },
    Retrying { operation: String, kind: RemoteErrorKind, attempt: u32, delay: Duration },
    Polling { stage: ProvisioningStage, state: String, check: u32, delay: Duration },
    /// A delete target was already gone.
    NotFound { resource: String, step: WorkflowStep, message: String },
}

/// Receives workflow events. This is the logging seam of the orchestration
/// core; implementations must not block.
pub trait ProgressSink: Send + Sync {
    fn on_event(&self, event: ProgressEvent);
}

#[derive(Debug, Default)]
pub struct NoopProgressSink;

impl ProgressSink for NoopProgressSink {
    fn on_event(&self, _event: ProgressEvent) {}
}

/// Forwards events to `tracing`.
#[derive(Debug, Default)]
pub struct TracingProgressSink;

impl ProgressSink for TracingProgressSink {
    fn on_event(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::StepStarted { resource, step } => info!(%resource, %step, "Starting"),
            ProgressEvent::StepFinished { resource, step } => debug!(%resource, %step, "Finished"),
            ProgressEvent::StepSkipped { resource, step, reason } => {
                info!(%resource, %step, %reason, "Skipped");
            }
            ProgressEvent::Retrying { operation, kind, attempt, delay } => debug!(
                %operation,
                %kind,
                attempt,
                delay_ms = delay.as_millis() as u64,
                "Retrying after transient error"
            ),
            ProgressEvent::Polling { stage, state, check, delay } => debug!(
                %stage,
                %state,
                check,
                delay_ms = delay.as_millis() as u64,
                "Waiting for terminal state"
            ),
            ProgressEvent::NotFound { resource, step, message } => {
                warn!(%resource, %step, %message, "Nothing to delete");
            }
        }
    }
}
