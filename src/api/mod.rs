use axum::Json;
use axum::extract::{Path, Query};
use axum::routing::{patch, post, put};
use axum::{Router, extract::State, http::StatusCode, routing::get};
use serde::{Deserialize, Serialize};

use crate::cache::LoadState;
use crate::config;
use crate::error::AppError;
use crate::models::*;
use crate::remote::RemoteConfig;
use crate::services::{DeleteTarget, Notification, SessionTransition, SyncStrategy};
use crate::state::AppState;

#[derive(Deserialize)]
struct NotificationQueryParams {
    #[serde(default)]
    drain: bool,
}

#[derive(Deserialize)]
struct StatusRequest {
    status: TaskStatus,
}

#[derive(Serialize)]
struct SessionResponse {
    transition: SessionTransition,
    load_state: LoadState,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StateResponse {
    load_state: LoadState,
    user_id: Option<String>,
    local_only: bool,
    strategy: SyncStrategy,
    pending_delete: Option<DeleteTarget>,
}

#[derive(Serialize)]
struct DeletionResponse {
    target: Option<DeleteTarget>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/session", post(sign_in).delete(sign_out))
        .route("/state", get(current_state))
        .route("/tasks", get(list_tasks).post(create_task))
        .route("/tasks/{id}", patch(update_task))
        .route("/tasks/{id}/status", patch(set_task_status))
        .route("/tasks/{id}/subtasks/{subtask_id}/toggle", patch(toggle_subtask))
        .route("/courses", get(list_courses).post(create_course))
        .route("/courses/{id}", patch(update_course))
        .route("/courses/{id}/notes", get(list_notes).post(create_note))
        .route("/notes/{id}", patch(update_note))
        .route("/deletions", post(request_delete))
        .route("/deletions/confirm", post(confirm_delete))
        .route("/deletions/cancel", post(cancel_delete))
        .route("/notifications", get(list_notifications))
        .route("/config/remote", put(save_remote_config))
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Result<StatusCode, AppError> {
    sqlx::query("select 1").execute(state.local.pool()).await?;
    Ok(StatusCode::OK)
}

async fn sign_in(
    State(state): State<AppState>,
    Json(session): Json<Session>,
) -> Result<Json<SessionResponse>, AppError> {
    if session.user_id.trim().is_empty() {
        return Err(AppError::BadRequest("user_id is required".to_string()));
    }
    state.sessions.sign_in(session.clone()).await;
    // the listener sees the same event afterwards and ignores it
    let transition = state.sync.apply_session(Some(session)).await;
    Ok(Json(SessionResponse {
        transition,
        load_state: state.sync.cache().load_state().await,
    }))
}

async fn sign_out(State(state): State<AppState>) -> Json<SessionResponse> {
    state.sessions.sign_out().await;
    let transition = state.sync.apply_session(None).await;
    Json(SessionResponse {
        transition,
        load_state: state.sync.cache().load_state().await,
    })
}

async fn current_state(State(state): State<AppState>) -> Json<StateResponse> {
    let sync = &state.sync;
    Json(StateResponse {
        load_state: sync.cache().load_state().await,
        user_id: sync.current_session().await.map(|s| s.user_id),
        local_only: sync.is_local(),
        strategy: sync.strategy(),
        pending_delete: sync.pending_delete().await,
    })
}

async fn list_tasks(State(state): State<AppState>) -> Json<Vec<Task>> {
    Json(state.sync.tasks().await)
}

async fn create_task(
    State(state): State<AppState>,
    Json(req): Json<NewTaskRequest>,
) -> Result<Json<Task>, AppError> {
    let task = state.sync.create_task(req).await?;
    Ok(Json(task))
}

async fn update_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateTaskRequest>,
) -> Result<Json<Task>, AppError> {
    let task = state.sync.update_task(&id, req).await?;
    Ok(Json(task))
}

async fn set_task_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<StatusRequest>,
) -> Result<Json<Task>, AppError> {
    let task = state.sync.set_task_status(&id, req.status).await?;
    Ok(Json(task))
}

async fn toggle_subtask(
    State(state): State<AppState>,
    Path((id, subtask_id)): Path<(String, String)>,
) -> Result<Json<Task>, AppError> {
    let task = state.sync.toggle_subtask(&id, &subtask_id).await?;
    Ok(Json(task))
}

async fn list_courses(State(state): State<AppState>) -> Json<Vec<Course>> {
    Json(state.sync.courses().await)
}

async fn create_course(
    State(state): State<AppState>,
    Json(req): Json<NewCourseRequest>,
) -> Result<Json<Course>, AppError> {
    let course = state.sync.create_course(req).await?;
    Ok(Json(course))
}

async fn update_course(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateCourseRequest>,
) -> Result<Json<Course>, AppError> {
    let course = state.sync.update_course(&id, req).await?;
    Ok(Json(course))
}

async fn list_notes(State(state): State<AppState>, Path(id): Path<String>) -> Json<Vec<Note>> {
    Json(state.sync.notes_for_course(&id).await)
}

async fn create_note(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<NewNoteRequest>,
) -> Result<Json<Note>, AppError> {
    let note = state.sync.create_note(&id, req).await?;
    Ok(Json(note))
}

async fn update_note(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateNoteRequest>,
) -> Result<Json<Note>, AppError> {
    let note = state.sync.update_note(&id, req).await?;
    Ok(Json(note))
}

async fn request_delete(
    State(state): State<AppState>,
    Json(target): Json<DeleteTarget>,
) -> (StatusCode, Json<DeletionResponse>) {
    state.sync.request_delete(target.clone()).await;
    (StatusCode::ACCEPTED, Json(DeletionResponse { target: Some(target) }))
}

async fn confirm_delete(State(state): State<AppState>) -> Result<Json<DeletionResponse>, AppError> {
    let target = state.sync.confirm_delete().await?;
    Ok(Json(DeletionResponse { target }))
}

async fn cancel_delete(State(state): State<AppState>) -> Json<DeletionResponse> {
    let target = state.sync.cancel_delete().await;
    Json(DeletionResponse { target })
}

async fn list_notifications(
    State(state): State<AppState>,
    Query(params): Query<NotificationQueryParams>,
) -> Json<Vec<Notification>> {
    let notifications = if params.drain {
        state.sync.notifier().drain().await
    } else {
        state.sync.notifier().all().await
    };
    Json(notifications)
}

/// Saved for the next start; the running backend is not swapped.
async fn save_remote_config(
    State(state): State<AppState>,
    Json(remote): Json<RemoteConfig>,
) -> Result<StatusCode, AppError> {
    config::save_remote(&state.local, &remote).await?;
    Ok(StatusCode::NO_CONTENT)
}
