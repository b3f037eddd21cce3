mod common;

use common::{conflict, FakeConfiguration, RecordingSink, ScriptedBackend};
use nlu_abstraction::{Entity, EntityType, LabeledUtterance};
use nlu_training::{
    NoopProgressSink, ProgressEvent, ProvisioningStage, StatusReport, TrainingError, TrainingOrchestrator, WorkflowStep,
    DEFAULT_MAX_ATTEMPTS,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

fn utterances() -> Vec<LabeledUtterance> {
    vec![
        LabeledUtterance::new(
            "order a pizza",
            Some("OrderFood".to_string()),
            vec![Entity::new("Food", None, Some("pizza".to_string()), 0)],
        ),
        LabeledUtterance::new("hello", Some("Greet".to_string()), vec![]),
    ]
}

fn entity_types() -> Vec<EntityType> {
    vec![EntityType::simple("Food")]
}

async fn train(backend: Arc<ScriptedBackend>) -> Result<(), TrainingError> {
    TrainingOrchestrator::new(backend, Arc::new(NoopProgressSink))
        .train(&utterances(), &entity_types(), &CancellationToken::new())
        .await
}

#[tokio::test(start_paused = true)]
async fn test_full_workflow_order() {
    let backend = Arc::new(ScriptedBackend::new());
    ScriptedBackend::script(&backend.exists, vec![Ok(false)]);

    train(backend.clone()).await.unwrap();

    assert_eq!(
        backend.call_names(),
        vec![
            "resource_exists",
            "create_resource",
            "submit_document",
            "import_status",
            "fetch_configuration",
            "trigger_build",
            "build_status",
            "is_published",
            "publish",
        ]
    );
    assert_eq!(*backend.imported_ids.lock().unwrap(), vec![Some("import-1".to_string())]);
}

#[tokio::test(start_paused = true)]
async fn test_existing_resource_not_recreated() {
    let backend = Arc::new(ScriptedBackend::new());

    train(backend.clone()).await.unwrap();

    assert_eq!(backend.count("create_resource"), 0);
}

#[tokio::test(start_paused = true)]
async fn test_already_published_skips_publish() {
    let backend = Arc::new(ScriptedBackend::new());
    ScriptedBackend::script(&backend.published, vec![Ok(true)]);

    train(backend.clone()).await.unwrap();

    assert_eq!(backend.count("is_published"), 1);
    assert_eq!(backend.count("publish"), 0);
}

#[tokio::test(start_paused = true)]
async fn test_publish_not_required() {
    let backend = Arc::new(ScriptedBackend { requires_publish: false, ..ScriptedBackend::default() });

    train(backend.clone()).await.unwrap();

    assert_eq!(backend.count("is_published"), 0);
    assert_eq!(backend.count("publish"), 0);
}

#[tokio::test(start_paused = true)]
async fn test_unknown_entity_type_fails_before_remote_calls() {
    let backend = Arc::new(ScriptedBackend::new());
    let mut data = utterances();
    data[0].entities[0].entity_type = "Drink".to_string();

    let err = TrainingOrchestrator::new(backend.clone(), Arc::new(NoopProgressSink))
        .train(&data, &entity_types(), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, TrainingError::UnknownEntityType(name) if name == "Drink"));
    assert!(backend.call_names().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_missing_match_text_fails_before_remote_calls() {
    let backend = Arc::new(ScriptedBackend::new());
    let mut data = utterances();
    data[0].entities[0].match_text = Some("burger".to_string());

    let err = TrainingOrchestrator::new(backend.clone(), Arc::new(NoopProgressSink))
        .train(&data, &entity_types(), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, TrainingError::EntityNotFound { .. }));
    assert!(backend.call_names().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_import_failure_reports_joined_reasons() {
    let backend = Arc::new(ScriptedBackend::new());
    ScriptedBackend::script(
        &backend.import_status,
        vec![Ok(StatusReport::new("FAILED").with_reasons(vec!["a".to_string(), "b".to_string()]))],
    );

    let err = train(backend.clone()).await.unwrap_err();

    assert!(matches!(err, TrainingError::ProvisioningFailed { .. }));
    assert_eq!(err.to_string(), "a\nb");
    assert_eq!(backend.count("trigger_build"), 0);
}

#[tokio::test(start_paused = true)]
async fn test_import_rejected_on_submit_is_not_polled() {
    let backend = Arc::new(ScriptedBackend::new());
    ScriptedBackend::script(
        &backend.submit,
        vec![Ok(StatusReport::new("FAILED").with_reasons(vec!["bad schema".to_string()]))],
    );

    let err = train(backend.clone()).await.unwrap_err();

    assert!(matches!(err, TrainingError::ProvisioningFailed { stage: ProvisioningStage::Import, .. }));
    assert_eq!(err.to_string(), "bad schema");
    assert_eq!(backend.count("import_status"), 0);
    assert_eq!(backend.count("trigger_build"), 0);
}

#[tokio::test(start_paused = true)]
async fn test_build_triggered_from_fetched_configuration() {
    let backend = Arc::new(ScriptedBackend::new());
    ScriptedBackend::script(
        &backend.fetch,
        vec![Ok(FakeConfiguration { checksum: "v42".to_string(), build: false })],
    );

    train(backend.clone()).await.unwrap();

    assert_eq!(
        *backend.triggered_with.lock().unwrap(),
        vec![FakeConfiguration { checksum: "v42".to_string(), build: true }]
    );
}

#[tokio::test(start_paused = true)]
async fn test_build_polls_linearly_and_accepts_not_built() {
    let backend = Arc::new(ScriptedBackend::new());
    ScriptedBackend::script(
        &backend.build_status,
        vec![Ok(StatusReport::new("BUILDING")), Ok(StatusReport::new("BUILDING")), Ok(StatusReport::new("NOT_BUILT"))],
    );

    train(backend.clone()).await.unwrap();

    let times = backend.times("build_status");
    assert_eq!(times.len(), 3);
    assert!(times[1] - times[0] >= Duration::from_secs(2));
    assert!(times[2] - times[1] >= Duration::from_secs(4));
}

#[tokio::test(start_paused = true)]
async fn test_unexpected_build_state_is_fatal() {
    let backend = Arc::new(ScriptedBackend::new());
    ScriptedBackend::script(&backend.build_status, vec![Ok(StatusReport::new("CLEANING_UP"))]);

    let err = train(backend.clone()).await.unwrap_err();

    assert!(matches!(err, TrainingError::UnexpectedState { observed, .. } if observed == "CLEANING_UP"));
    assert_eq!(backend.count("build_status"), 1);
    assert_eq!(backend.count("publish"), 0);
}

#[tokio::test(start_paused = true)]
async fn test_submit_conflicts_exhaust_retries() {
    let backend = Arc::new(ScriptedBackend::new());
    ScriptedBackend::script(&backend.submit, (0..DEFAULT_MAX_ATTEMPTS).map(|_| Err(conflict())).collect());
    let start = Instant::now();

    let err = train(backend.clone()).await.unwrap_err();

    assert_eq!(err.as_remote(), Some(&conflict()));
    assert_eq!(backend.count("submit_document"), DEFAULT_MAX_ATTEMPTS as usize);
    assert!(start.elapsed() >= Duration::from_secs(40));
}

#[tokio::test(start_paused = true)]
async fn test_progress_events_follow_workflow() {
    let backend = Arc::new(ScriptedBackend::new());
    let sink = Arc::new(RecordingSink::default());

    TrainingOrchestrator::new(backend, sink.clone())
        .train(&utterances(), &entity_types(), &CancellationToken::new())
        .await
        .unwrap();

    let started: Vec<WorkflowStep> = sink
        .events()
        .into_iter()
        .filter_map(|event| match event {
            ProgressEvent::StepStarted { step, .. } => Some(step),
            _ => None,
        })
        .collect();
    assert_eq!(
        started,
        vec![WorkflowStep::EnsureResource, WorkflowStep::Import, WorkflowStep::Build, WorkflowStep::Publish]
    );
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_token_stops_training() {
    let backend = Arc::new(ScriptedBackend::new());
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = TrainingOrchestrator::new(backend.clone(), Arc::new(NoopProgressSink))
        .train(&utterances(), &entity_types(), &cancel)
        .await
        .unwrap_err();

    assert!(matches!(err, TrainingError::Cancelled));
    assert!(backend.call_names().is_empty());
}
