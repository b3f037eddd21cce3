//! NLU Training
//!
//! Provider-agnostic lifecycle primitives for NLU models:
//! - Bounded retries for remote calls (`RetryExecutor`)
//! - Polling asynchronous provisioning to a terminal state (`ProvisioningPoller`)
//! - Train and cleanup workflows over a provider capability trait
//!   (`TrainingOrchestrator`, `CleanupOrchestrator`)
//! - Loading training data and running concurrent predictions

pub mod backend;
pub mod batch;
pub mod cleanup;
pub mod dataset;
pub mod error;
pub mod orchestrator;
pub mod payload;
pub mod poll;
pub mod progress;
pub mod retry;
pub mod validate;

pub use backend::{PredictionClient, ProvisioningBackend, ProvisioningRequest};
pub use batch::run_tests;
pub use cleanup::CleanupOrchestrator;
pub use dataset::{read_entity_types, read_utterances, write_json};
pub use error::{TrainingError, TrainingResult};
pub use orchestrator::TrainingOrchestrator;
pub use poll::{
    PollSchedule, ProvisioningPoller, ProvisioningStage, ProvisioningStatus, StagePolicy, StateTable, StatusReport,
    TerminalOutcome, BUILD_POLL_BASE, IMPORT_POLL_DELAY,
};
pub use progress::{NoopProgressSink, ProgressEvent, ProgressSink, TracingProgressSink, WorkflowStep};
pub use retry::{RetryExecutor, RetryPolicy, DEFAULT_MAX_ATTEMPTS};
pub use validate::validate_training_arguments;
