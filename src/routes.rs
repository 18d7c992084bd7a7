use axum::Json;
use axum::extract::{Path, State};
use axum::routing::{patch, post};
use axum::{Router, http::StatusCode, routing::get};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::AppError;
use crate::firestore::{documents, quota};
use crate::identity::SignUpError;
use crate::models::*;
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/notes", get(list_notes).post(create_note))
        .route("/notes/{id}", get(get_note).put(update_note).delete(delete_note))
        .route("/notes/{id}/color", patch(recolor_note))
        .route("/tasks", get(list_tasks).post(create_task))
        .route("/tasks/{id}", get(get_task).put(update_task).delete(delete_task))
        .route("/tasks/{id}/complete", patch(complete_task))
        .route("/preferences", get(list_preferences).put(put_preference))
        .route("/quota", get(quota_usage))
        .route("/feedback", post(submit_feedback))
        .route("/reminders/{item_id}/fire", post(fire_reminder))
        .route("/auth/signup", post(sign_up))
        .route("/auth/signin", post(sign_in))
        .route("/auth/signout", post(sign_out))
        .with_state(state)
}

fn current_uid(state: &AppState) -> Result<String, AppError> {
    state
        .identity
        .session()
        .map(|s| s.uid)
        .ok_or(AppError::Unauthorized)
}

fn edited_stamp() -> (String, String) {
    let now = Utc::now();
    (now.format("%d %b %Y").to_string(), now.format("%H:%M").to_string())
}

async fn health(State(state): State<AppState>) -> Result<StatusCode, AppError> {
    sqlx::query("select 1").execute(&state.db).await?;
    Ok(StatusCode::OK)
}

async fn list_notes(State(state): State<AppState>) -> Result<Json<Vec<Note>>, AppError> {
    let uid = current_uid(&state)?;
    let notes = documents::fetch_all_notes(state.store.as_ref(), &uid).await?;
    Ok(Json(notes))
}

async fn create_note(
    State(state): State<AppState>,
    Json(req): Json<NotePayload>,
) -> Result<Json<Note>, AppError> {
    let uid = current_uid(&state)?;
    if !Note::color_in_palette(req.color) {
        return Err(AppError::BadRequest(format!("Unknown color tag {}", req.color)));
    }

    let (date, time) = edited_stamp();
    let note = Note::new(req.color, req.title, req.content, date, time);
    documents::save_note(state.store.as_ref(), &uid, &note).await?;
    Ok(Json(note))
}

async fn get_note(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Note>, AppError> {
    let uid = current_uid(&state)?;
    let note = documents::fetch_note(state.store.as_ref(), &uid, &id).await?;
    Ok(Json(note))
}

/// Full-document overwrite; last writer wins.
async fn update_note(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<NotePayload>,
) -> Result<Json<Note>, AppError> {
    let uid = current_uid(&state)?;
    if !Note::color_in_palette(req.color) {
        return Err(AppError::BadRequest(format!("Unknown color tag {}", req.color)));
    }

    let (date, time) = edited_stamp();
    let note = Note {
        id,
        color: req.color,
        title: req.title,
        content: req.content,
        date,
        time,
    };
    documents::save_note(state.store.as_ref(), &uid, &note).await?;
    Ok(Json(note))
}

#[derive(Deserialize)]
struct RecolorRequest {
    color: i32,
}

async fn recolor_note(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<RecolorRequest>,
) -> Result<StatusCode, AppError> {
    let uid = current_uid(&state)?;
    if !Note::color_in_palette(req.color) {
        return Err(AppError::BadRequest(format!("Unknown color tag {}", req.color)));
    }

    documents::set_note_color(state.store.as_ref(), &uid, &id, req.color).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_note(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let uid = current_uid(&state)?;
    documents::delete_note(state.store.as_ref(), &uid, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_tasks(State(state): State<AppState>) -> Result<Json<Vec<Task>>, AppError> {
    let uid = current_uid(&state)?;
    let tasks = documents::fetch_all_tasks(state.store.as_ref(), &uid).await?;
    Ok(Json(tasks))
}

async fn create_task(
    State(state): State<AppState>,
    Json(req): Json<TaskPayload>,
) -> Result<Json<Task>, AppError> {
    let uid = current_uid(&state)?;
    let task = Task::new(
        req.title,
        req.content,
        req.due_date_human,
        req.due_time_human,
        req.due_epoch,
    );
    documents::save_task(state.store.as_ref(), &uid, &task).await?;

    if req.remind {
        state
            .rescheduler
            .schedule(&task.id, &task.title, &task.content, task.due_epoch)
            .await?;
    }

    Ok(Json(task))
}

async fn get_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Task>, AppError> {
    let uid = current_uid(&state)?;
    let task = documents::fetch_task(state.store.as_ref(), &uid, &id).await?;
    Ok(Json(task))
}

/// Full-document overwrite; the payload is the client's complete view of
/// the task, completion flag included.
async fn update_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<TaskPayload>,
) -> Result<Json<Task>, AppError> {
    let uid = current_uid(&state)?;
    let task = Task {
        id,
        title: req.title,
        content: req.content,
        due_date_human: req.due_date_human,
        due_time_human: req.due_time_human,
        due_epoch: req.due_epoch,
        complete: req.complete,
    };
    documents::save_task(state.store.as_ref(), &uid, &task).await?;

    if req.remind {
        state
            .rescheduler
            .schedule(&task.id, &task.title, &task.content, task.due_epoch)
            .await?;
    }

    Ok(Json(task))
}

#[derive(Deserialize)]
struct CompleteRequest {
    complete: bool,
}

/// Merge write touching only the completion flag.
async fn complete_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<CompleteRequest>,
) -> Result<StatusCode, AppError> {
    let uid = current_uid(&state)?;
    documents::set_task_complete(state.store.as_ref(), &uid, &id, req.complete).await?;

    if req.complete {
        state.rescheduler.on_task_completed(&id).await?;
    }

    Ok(StatusCode::NO_CONTENT)
}

async fn delete_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let uid = current_uid(&state)?;
    documents::delete_task(state.store.as_ref(), &uid, &id).await?;
    state.rescheduler.on_task_deleted(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_preferences(
    State(state): State<AppState>,
) -> Json<std::collections::HashMap<String, PreferenceValue>> {
    Json(state.prefs.snapshot())
}

#[derive(Deserialize)]
struct PutPreferenceRequest {
    key: String,
    value: PreferenceValue,
}

async fn put_preference(
    State(state): State<AppState>,
    Json(req): Json<PutPreferenceRequest>,
) -> StatusCode {
    state.prefs.put(&req.key, req.value);
    StatusCode::NO_CONTENT
}

#[derive(Serialize)]
struct QuotaResponse {
    total_bytes: i64,
}

async fn quota_usage(State(state): State<AppState>) -> Result<Json<QuotaResponse>, AppError> {
    let uid = current_uid(&state)?;
    let total_bytes = quota::aggregate_user_storage_bytes(state.store.as_ref(), &uid).await;
    Ok(Json(QuotaResponse { total_bytes }))
}

async fn submit_feedback(
    State(state): State<AppState>,
    Json(req): Json<NewFeedbackRequest>,
) -> Result<StatusCode, AppError> {
    let uid = current_uid(&state)?;
    let feedback = Feedback {
        title: req.title,
        extra_details: req.extra_details,
        kind: req.kind,
        submitted_at_epoch: Utc::now().timestamp(),
        submitting_user_id: uid,
    };
    documents::submit_feedback(state.store.as_ref(), &feedback).await?;
    Ok(StatusCode::CREATED)
}

async fn fire_reminder(
    State(state): State<AppState>,
    Path(item_id): Path<i64>,
) -> Result<StatusCode, AppError> {
    state.rescheduler.fire(item_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
struct SignUpRequest {
    email: String,
    password: String,
    first_name: String,
    last_name: String,
}

async fn sign_up(
    State(state): State<AppState>,
    Json(req): Json<SignUpRequest>,
) -> Result<StatusCode, AppError> {
    match state
        .identity
        .sign_up(&req.email, &req.password, &req.first_name, &req.last_name, None)
        .await
    {
        Ok(()) => Ok(StatusCode::CREATED),
        Err(SignUpError::Remote) => Err(AppError::Remote(SignUpError::Remote.to_string())),
        Err(e) => Err(AppError::BadRequest(e.to_string())),
    }
}

#[derive(Deserialize)]
struct SignInRequest {
    email: String,
    password: String,
}

async fn sign_in(
    State(state): State<AppState>,
    Json(req): Json<SignInRequest>,
) -> Json<serde_json::Value> {
    let signed_in = state.identity.sign_in(&req.email, &req.password).await;
    Json(json!({ "signed_in": signed_in }))
}

async fn sign_out(State(state): State<AppState>) -> StatusCode {
    state.identity.sign_out();
    state.prefs.set_user(None);
    StatusCode::NO_CONTENT
}
