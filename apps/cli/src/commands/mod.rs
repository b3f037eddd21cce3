//! Command implementations for the NLU CLI.

pub mod clean;
pub mod train;

use nlu_training::{ProgressSink, TracingProgressSink};
use std::sync::Arc;

pub(crate) fn progress() -> Arc<dyn ProgressSink> {
    Arc::new(TracingProgressSink)
}
