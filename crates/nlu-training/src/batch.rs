//! Concurrent prediction runs against a trained model.

use crate::backend::PredictionClient;
use crate::error::{TrainingError, TrainingResult};
use crate::progress::ProgressSink;
use crate::retry::RetryExecutor;
use futures::future::try_join_all;
use nlu_abstraction::{EntityType, LabeledUtterance};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Predicts every utterance with at most `parallelism` requests in flight.
///
/// Results are returned in input order. The first failed prediction (after
/// retries) aborts the run.
pub async fn run_tests<C>(
    client: &C,
    utterances: &[LabeledUtterance],
    entity_types: &[EntityType],
    parallelism: usize,
    progress: Arc<dyn ProgressSink>,
    cancel: &CancellationToken,
) -> TrainingResult<Vec<LabeledUtterance>>
where
    C: PredictionClient + ?Sized,
{
    if parallelism == 0 {
        return Err(TrainingError::invalid_argument("parallelism", "must be at least 1"));
    }

    debug!(total_items = utterances.len(), parallelism, "Starting prediction batch");

    let semaphore = Semaphore::new(parallelism);
    let retry = RetryExecutor::new(client.prediction_retry_policy(), progress);
    let (semaphore, retry) = (&semaphore, &retry);

    let predictions = utterances.iter().enumerate().map(|(index, utterance)| async move {
        let _permit = semaphore.acquire().await.map_err(|e| TrainingError::Other(e.into()))?;
        let text = utterance.text.as_str();
        let prediction = retry
            .execute("predict", cancel, move || client.predict(text, entity_types))
            .await?;
        debug!(index, intent = ?prediction.intent, "Predicted");
        Ok::<_, TrainingError>(prediction)
    });

    try_join_all(predictions).await
}
