use unitrack::cache::LoadState;
use unitrack::db::{LocalStore, connect_memory};
use unitrack::error::AppError;
use unitrack::models::*;
use unitrack::services::{
    Backend, DeleteTarget, Discipline, SessionHub, SessionTransition, SyncService, SyncStrategy,
};

async fn local_store() -> LocalStore {
    let pool = connect_memory().await.expect("Failed to create database");
    LocalStore::new(pool)
}

async fn started(local: &LocalStore, discipline: Discipline) -> SyncService {
    let strategy = SyncStrategy {
        discipline,
        verify_writes: true,
    };
    let service = SyncService::new(Backend::Local(local.clone()), strategy);
    service
        .initialize(&SessionHub::new())
        .await
        .expect("Failed to initialize");
    service
}

fn essay() -> NewTaskRequest {
    NewTaskRequest {
        title: "Essay".to_string(),
        course: "ENG200".to_string(),
        description: Some("Five pages on Hamlet".to_string()),
        task_type: Some(TaskType::Assignment),
        due_date: "2025-01-10".to_string(),
        priority: Some(Priority::High),
        status: None,
        subtasks: Some(vec![SubTask {
            id: "s1".to_string(),
            title: "Outline".to_string(),
            is_completed: false,
        }]),
    }
}

#[tokio::test]
async fn test_add_then_get_round_trips_all_fields() {
    let local = local_store().await;
    let service = started(&local, Discipline::Optimistic).await;
    assert!(service.is_local());
    assert_eq!(service.cache().load_state().await, LoadState::Loaded);

    let task = service.create_task(essay()).await.expect("Failed to create task");
    assert_eq!(service.tasks().await, vec![task.clone()]);

    let stored: Vec<Task> = local.load("tasks").await.expect("Failed to read tasks");
    assert_eq!(stored, vec![task.clone()]);

    // a restart sees the same data
    let restarted = started(&local, Discipline::PersistFirst).await;
    assert_eq!(restarted.tasks().await, vec![task]);
    assert_eq!(restarted.courses().await.len(), 1);
}

#[tokio::test]
async fn test_delete_excludes_task() {
    let local = local_store().await;
    let service = started(&local, Discipline::PersistFirst).await;
    let keep = service.create_task(essay()).await.expect("Failed to create task");
    let mut other = essay();
    other.title = "Quiz".to_string();
    let gone = service.create_task(other).await.expect("Failed to create task");

    service.request_delete(DeleteTarget::Task(gone.id.clone())).await;
    service.confirm_delete().await.expect("Failed to delete task");

    assert_eq!(service.tasks().await, vec![keep.clone()]);
    let stored: Vec<Task> = local.load("tasks").await.expect("Failed to read tasks");
    assert_eq!(stored, vec![keep]);
}

#[tokio::test]
async fn test_course_delete_drops_its_notes() {
    let local = local_store().await;
    let service = started(&local, Discipline::PersistFirst).await;
    let course = service
        .create_course(NewCourseRequest {
            name: "HIS210".to_string(),
            color: None,
            icon: None,
        })
        .await
        .expect("Failed to create course");
    service
        .create_note(
            &course.id,
            NewNoteRequest {
                title: "Lecture 1".to_string(),
                content: "Rome".to_string(),
            },
        )
        .await
        .expect("Failed to create note");

    service.request_delete(DeleteTarget::Course(course.id.clone())).await;
    service.confirm_delete().await.expect("Failed to delete course");

    let notes: Vec<Note> = local.load("notes").await.expect("Failed to read notes");
    assert!(notes.is_empty());
    assert!(service.notes_for_course(&course.id).await.is_empty());
}

#[tokio::test]
async fn test_corrupt_payload_is_surfaced_and_kept() {
    let local = local_store().await;
    local
        .write_raw("tasks", "{not json")
        .await
        .expect("Failed to write payload");

    let service = SyncService::new(Backend::Local(local.clone()), SyncStrategy::default());
    let result = service.initialize(&SessionHub::new()).await;

    assert!(matches!(result, Err(AppError::CorruptPayload { .. })));
    assert!(matches!(service.cache().load_state().await, LoadState::Failed(_)));

    let create = service.create_task(essay()).await;
    assert!(matches!(create, Err(AppError::CorruptPayload { .. })));
    assert!(service.tasks().await.is_empty());
    assert!(service.courses().await.is_empty());

    let raw = local.read_raw("tasks").await.expect("Failed to read payload");
    assert_eq!(raw.as_deref(), Some("{not json"));
}

#[tokio::test]
async fn test_sign_out_in_local_mode_reloads_local_data() {
    let local = local_store().await;
    let service = started(&local, Discipline::Optimistic).await;
    service.create_task(essay()).await.expect("Failed to create task");

    let transition = service.apply_session(None).await;

    assert_eq!(transition, SessionTransition::Cleared);
    assert_eq!(service.tasks().await.len(), 1);
    assert_eq!(service.cache().load_state().await, LoadState::Loaded);
}

#[tokio::test]
async fn test_failed_course_cascade_keeps_the_course() {
    let local = local_store().await;
    let service = started(&local, Discipline::Optimistic).await;
    let course = service
        .create_course(NewCourseRequest {
            name: "PHY150".to_string(),
            color: None,
            icon: None,
        })
        .await
        .expect("Failed to create course");
    local
        .write_raw("notes", "[broken")
        .await
        .expect("Failed to write payload");

    service.request_delete(DeleteTarget::Course(course.id.clone())).await;
    let result = service.confirm_delete().await;

    assert!(matches!(result, Err(AppError::CorruptPayload { .. })));
    assert_eq!(service.courses().await, vec![course.clone()]);
    let stored: Vec<Course> = local.load("courses").await.expect("Failed to read courses");
    assert_eq!(stored, vec![course]);
}
