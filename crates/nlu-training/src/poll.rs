//! Polling asynchronous provisioning operations to a terminal state.
//!
//! Providers accept an import or build request and report progress through a
//! separate, eventually consistent status endpoint. [`ProvisioningPoller`]
//! classifies each raw status through a provider-supplied [`StateTable`] and
//! keeps checking on a [`PollSchedule`] until the operation settles.

use crate::error::{TrainingError, TrainingResult};
use crate::progress::{ProgressEvent, ProgressSink};
use crate::retry::sleep_or_cancel;
use std::fmt;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Fixed delay used between import status checks.
pub const IMPORT_POLL_DELAY: Duration = Duration::from_secs(2);

/// Base of the linear build schedule.
pub const BUILD_POLL_BASE: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisioningStage {
    Import,
    Build,
}

impl fmt::Display for ProvisioningStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Import => f.write_str("import"),
            Self::Build => f.write_str("build"),
        }
    }
}

/// Classified provider state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProvisioningStatus {
    Pending,
    InProgress,
    Complete,
    Failed,
    Unknown(String),
}

impl ProvisioningStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Failed)
    }
}

/// Raw status returned by a submit or status call.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StatusReport {
    pub state: String,
    pub failure_reasons: Vec<String>,
    /// Provider-assigned id of the submitted operation.
    pub correlation_id: Option<String>,
}

impl StatusReport {
    pub fn new(state: impl Into<String>) -> Self {
        Self { state: state.into(), ..Self::default() }
    }

    #[must_use]
    pub fn with_reasons(mut self, reasons: Vec<String>) -> Self {
        self.failure_reasons = reasons;
        self
    }

    #[must_use]
    pub fn with_correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }
}

/// Maps a provider's raw state strings onto [`ProvisioningStatus`].
///
/// Anything not listed classifies as `Unknown`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StateTable {
    succeeded: Vec<String>,
    failed: Vec<String>,
    pending: Vec<String>,
    in_progress: Vec<String>,
}

impl StateTable {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn succeeded<I: IntoIterator<Item = S>, S: Into<String>>(mut self, states: I) -> Self {
        self.succeeded.extend(states.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn failed<I: IntoIterator<Item = S>, S: Into<String>>(mut self, states: I) -> Self {
        self.failed.extend(states.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn pending<I: IntoIterator<Item = S>, S: Into<String>>(mut self, states: I) -> Self {
        self.pending.extend(states.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn in_progress<I: IntoIterator<Item = S>, S: Into<String>>(mut self, states: I) -> Self {
        self.in_progress.extend(states.into_iter().map(Into::into));
        self
    }

    pub fn classify(&self, raw: &str) -> ProvisioningStatus {
        let listed = |states: &[String]| states.iter().any(|s| s == raw);
        if listed(&self.succeeded) {
            ProvisioningStatus::Complete
        } else if listed(&self.failed) {
            ProvisioningStatus::Failed
        } else if listed(&self.in_progress) {
            ProvisioningStatus::InProgress
        } else if listed(&self.pending) {
            ProvisioningStatus::Pending
        } else {
            ProvisioningStatus::Unknown(raw.to_string())
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollSchedule {
    Fixed(Duration),
    /// `base * attempt`, attempt starting at 1.
    Linear { base: Duration },
}

impl PollSchedule {
    /// Delay after the `attempt`-th non-terminal status check.
    pub fn delay(&self, attempt: u32) -> Duration {
        match self {
            Self::Fixed(delay) => *delay,
            Self::Linear { base } => base.saturating_mul(attempt.max(1)),
        }
    }
}

/// How a provider wants one stage polled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagePolicy {
    pub schedule: PollSchedule,
    pub states: StateTable,
    /// Optional ceiling on status checks. `None` polls until terminal.
    pub max_checks: Option<u32>,
}

impl StagePolicy {
    pub fn new(schedule: PollSchedule, states: StateTable) -> Self {
        Self { schedule, states, max_checks: None }
    }

    #[must_use]
    pub fn with_max_checks(mut self, max_checks: u32) -> Self {
        self.max_checks = Some(max_checks);
        self
    }
}

/// Settled result of a provisioning stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminalOutcome {
    Succeeded,
    Failed(Vec<String>),
    /// The provider reported a state outside the stage's table.
    FatalMismatch(String),
}

impl TerminalOutcome {
    /// Converts failure outcomes into the matching [`TrainingError`].
    pub fn into_result(self, stage: ProvisioningStage) -> TrainingResult<()> {
        match self {
            Self::Succeeded => Ok(()),
            Self::Failed(reasons) => Err(TrainingError::ProvisioningFailed { stage, reasons }),
            Self::FatalMismatch(observed) => Err(TrainingError::UnexpectedState { stage, observed }),
        }
    }
}

pub struct ProvisioningPoller<'a> {
    stage: ProvisioningStage,
    policy: &'a StagePolicy,
    progress: &'a dyn ProgressSink,
    cancel: &'a CancellationToken,
}

impl<'a> ProvisioningPoller<'a> {
    pub fn new(
        stage: ProvisioningStage,
        policy: &'a StagePolicy,
        progress: &'a dyn ProgressSink,
        cancel: &'a CancellationToken,
    ) -> Self {
        Self { stage, policy, progress, cancel }
    }

    /// Polls `check` until the stage settles.
    ///
    /// `initial` is the submit response. When it is already terminal no
    /// status check is made. Otherwise `check` is called immediately, then
    /// again after each schedule delay while the state stays non-terminal.
    pub async fn wait_until_terminal<F, Fut>(&self, initial: &StatusReport, mut check: F) -> TrainingResult<TerminalOutcome>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = TrainingResult<StatusReport>>,
    {
        if let Some(outcome) = self.settle(initial) {
            return Ok(outcome);
        }

        let mut checks = 0;
        loop {
            if self.cancel.is_cancelled() {
                return Err(TrainingError::Cancelled);
            }

            let report = check().await?;
            checks += 1;
            if let Some(outcome) = self.settle(&report) {
                return Ok(outcome);
            }

            if self.policy.max_checks.is_some_and(|max| checks >= max) {
                return Err(TrainingError::PollLimitExceeded { stage: self.stage, checks });
            }

            let delay = self.policy.schedule.delay(checks);
            self.progress.on_event(ProgressEvent::Polling {
                stage: self.stage,
                state: report.state.clone(),
                check: checks,
                delay,
            });
            sleep_or_cancel(delay, self.cancel).await?;
        }
    }

    fn settle(&self, report: &StatusReport) -> Option<TerminalOutcome> {
        match self.policy.states.classify(&report.state) {
            ProvisioningStatus::Complete => Some(TerminalOutcome::Succeeded),
            ProvisioningStatus::Failed => Some(TerminalOutcome::Failed(report.failure_reasons.clone())),
            ProvisioningStatus::Unknown(observed) => Some(TerminalOutcome::FatalMismatch(observed)),
            ProvisioningStatus::Pending | ProvisioningStatus::InProgress => None,
        }
    }
}
