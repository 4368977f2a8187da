//! Producer-driven task lifecycle

use canvas_model::{GenerationKind, Point, ProjectId, WorkspacePersistence};
use canvas_tasks::{
    ArtifactGridConfig, GenerationOutput, GenerationRequest, GenerationTaskManager, TaskStatus,
};
use canvas_test_utils::{GatedProducer, InMemoryPersistence, ScriptedProducer};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

fn manager() -> GenerationTaskManager {
    let persistence: Arc<dyn WorkspacePersistence> = Arc::new(InMemoryPersistence::new());
    GenerationTaskManager::new(ProjectId::new("p1"), persistence, ArtifactGridConfig::default())
}

#[tokio::test]
async fn successful_generation_completes_with_output() {
    let tasks = manager();
    let producer = Arc::new(
        ScriptedProducer::succeeding(
            GenerationOutput::new(json!({"text": "S"}))
                .titled("Summary")
                .persisted_as("a1"),
        )
        .with_backend_id("job-7"),
    );

    let (id, handle) = tasks.launch(
        Arc::clone(&producer),
        GenerationKind::Summary,
        Point::new(10.0, 10.0),
        GenerationRequest::from_sources(["doc-1"]),
    );
    handle.await.unwrap();

    let task = tasks.get(id).unwrap();
    assert_eq!(task.status, TaskStatus::Complete);
    assert_eq!(task.title.as_deref(), Some("Summary"));
    assert_eq!(task.backend_task_id.as_deref(), Some("job-7"));
    assert_eq!(task.output_id.as_ref().map(|o| o.as_str()), Some("a1"));
    assert_eq!(producer.calls(), 1);
}

#[tokio::test]
async fn failed_generation_records_error() {
    let tasks = manager();
    let producer = Arc::new(ScriptedProducer::failing("quota exceeded").without_ack());

    let (id, handle) = tasks.launch(
        producer,
        GenerationKind::Podcast,
        Point::default(),
        GenerationRequest::default(),
    );
    handle.await.unwrap();

    let task = tasks.get(id).unwrap();
    assert_eq!(task.status, TaskStatus::Error);
    assert_eq!(task.error.as_deref(), Some("generation failed: quota exceeded"));
    assert_eq!(task.backend_task_id, None);
}

#[tokio::test]
async fn acknowledged_task_is_generating_until_released() {
    let tasks = manager();
    let producer = Arc::new(GatedProducer::new(Ok(GenerationOutput::new(json!("done")))));

    let (id, handle) = tasks.launch(
        Arc::clone(&producer),
        GenerationKind::MindMap,
        Point::default(),
        GenerationRequest::default(),
    );
    producer.wait_acknowledged().await;
    assert_eq!(tasks.get(id).unwrap().status, TaskStatus::Generating);
    assert!(tasks.has_active());

    producer.release();
    handle.await.unwrap();
    assert_eq!(tasks.get(id).unwrap().status, TaskStatus::Complete);
    assert!(!tasks.has_active());
}

#[tokio::test]
async fn outcome_after_removal_is_dropped() {
    let tasks = manager();
    let producer = Arc::new(GatedProducer::new(Ok(GenerationOutput::new(json!("late")))));

    let (id, handle) = tasks.launch(
        Arc::clone(&producer),
        GenerationKind::Quiz,
        Point::default(),
        GenerationRequest::default(),
    );
    producer.wait_acknowledged().await;
    assert!(tasks.remove(id).is_some());

    producer.release();
    handle.await.unwrap();
    assert!(tasks.get(id).is_none());
    assert!(tasks.is_empty());
}

#[tokio::test(start_paused = true)]
async fn concurrent_generations_resolve_independently() {
    let tasks = manager();
    let slow = Arc::new(
        ScriptedProducer::succeeding(GenerationOutput::new(json!("slow")))
            .with_delay(Duration::from_secs(30)),
    );
    let fast = Arc::new(ScriptedProducer::failing("bad input").with_delay(Duration::from_secs(1)));

    let (slow_id, slow_handle) = tasks.launch(
        slow,
        GenerationKind::Report,
        Point::default(),
        GenerationRequest::default(),
    );
    let (fast_id, fast_handle) = tasks.launch(
        fast,
        GenerationKind::Flashcards,
        Point::new(400.0, 0.0),
        GenerationRequest::default(),
    );

    fast_handle.await.unwrap();
    assert_eq!(tasks.get(fast_id).unwrap().status, TaskStatus::Error);
    assert_eq!(tasks.get(slow_id).unwrap().status, TaskStatus::Generating);
    assert_eq!(
        tasks.get_active_of_type(GenerationKind::Report).map(|t| t.id),
        Some(slow_id)
    );

    slow_handle.await.unwrap();
    assert_eq!(tasks.get(slow_id).unwrap().status, TaskStatus::Complete);
}
