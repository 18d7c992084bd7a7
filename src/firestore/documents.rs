//! Typed note/task/preference/feedback accessors over the untyped store.
//!
//! Field names are wire-visible and must not change. A remote record
//! missing an expected field fails the whole fetch for the note and task
//! paths; there is no partial or defaulted fallback.

use uuid::Uuid;

use crate::error::AppError;
use crate::models::{Feedback, Note, Task};

use super::{paths, quota, Document, DocumentStore, FieldValue, Fields};

fn require_str(doc: &Document, key: &str) -> Result<String, AppError> {
    doc.get_str(key)
        .map(str::to_string)
        .ok_or_else(|| AppError::Remote(format!("Missing field {} on {}", key, doc.path)))
}

fn note_from_document(doc: &Document) -> Result<Note, AppError> {
    Ok(Note {
        id: require_str(doc, "ID")?,
        color: doc
            .get_i32("color")
            .ok_or_else(|| AppError::Remote(format!("Missing field color on {}", doc.path)))?,
        title: require_str(doc, "title")?,
        content: require_str(doc, "content")?,
        date: require_str(doc, "date")?,
        time: require_str(doc, "time")?,
    })
}

fn note_fields(note: &Note) -> Fields {
    let mut fields = Fields::new();
    fields.insert("ID".to_string(), FieldValue::Str(note.id.clone()));
    fields.insert("color".to_string(), FieldValue::Int(note.color));
    fields.insert("title".to_string(), FieldValue::Str(note.title.clone()));
    fields.insert("content".to_string(), FieldValue::Str(note.content.clone()));
    fields.insert("date".to_string(), FieldValue::Str(note.date.clone()));
    fields.insert("time".to_string(), FieldValue::Str(note.time.clone()));
    fields
}

fn task_from_document(doc: &Document) -> Result<Task, AppError> {
    let due = doc
        .get_f64("dueDateTimeUnix")
        .ok_or_else(|| AppError::Remote(format!("Missing field dueDateTimeUnix on {}", doc.path)))?;

    Ok(Task {
        id: require_str(doc, "ID")?,
        title: require_str(doc, "title")?,
        content: require_str(doc, "content")?,
        due_date_human: require_str(doc, "dueDateHumanReadable")?,
        due_time_human: require_str(doc, "dueTimeHumanReadable")?,
        due_epoch: due as i64,
        complete: doc
            .get_bool("complete")
            .ok_or_else(|| AppError::Remote(format!("Missing field complete on {}", doc.path)))?,
    })
}

fn task_fields(task: &Task) -> Fields {
    let mut fields = Fields::new();
    fields.insert("ID".to_string(), FieldValue::Str(task.id.clone()));
    fields.insert("title".to_string(), FieldValue::Str(task.title.clone()));
    fields.insert("content".to_string(), FieldValue::Str(task.content.clone()));
    fields.insert(
        "dueDateHumanReadable".to_string(),
        FieldValue::Str(task.due_date_human.clone()),
    );
    fields.insert(
        "dueTimeHumanReadable".to_string(),
        FieldValue::Str(task.due_time_human.clone()),
    );
    // Legacy wire type: the due moment travels as a double.
    fields.insert(
        "dueDateTimeUnix".to_string(),
        FieldValue::Double(task.due_epoch as f64),
    );
    fields.insert("complete".to_string(), FieldValue::Bool(task.complete));
    fields
}

pub async fn fetch_all_notes(
    store: &dyn DocumentStore,
    uid: &str,
) -> Result<Vec<Note>, AppError> {
    let docs = store.list(&paths::note_collection(uid)).await?;
    docs.iter().map(note_from_document).collect()
}

pub async fn fetch_note(
    store: &dyn DocumentStore,
    uid: &str,
    note_id: &str,
) -> Result<Note, AppError> {
    let doc = store.get(&paths::note_doc(uid, note_id)).await?;
    note_from_document(&doc)
}

/// Full-document overwrite, then a merge write of the size estimate into
/// the user's quota monitor.
pub async fn save_note(
    store: &dyn DocumentStore,
    uid: &str,
    note: &Note,
) -> Result<(), AppError> {
    let path = paths::note_doc(uid, &note.id);
    let fields = note_fields(note);
    store.set(&path, &fields).await?;

    let size = quota::estimate_document_size_bytes(&path, &fields);
    quota::record_document_size(store, uid, &note.id, size).await
}

pub async fn set_note_color(
    store: &dyn DocumentStore,
    uid: &str,
    note_id: &str,
    color: i32,
) -> Result<(), AppError> {
    let mut fields = Fields::new();
    fields.insert("color".to_string(), FieldValue::Int(color));
    store.merge(&paths::note_doc(uid, note_id), &fields).await
}

pub async fn delete_note(
    store: &dyn DocumentStore,
    uid: &str,
    note_id: &str,
) -> Result<(), AppError> {
    store.delete(&paths::note_doc(uid, note_id)).await
}

pub async fn fetch_all_tasks(
    store: &dyn DocumentStore,
    uid: &str,
) -> Result<Vec<Task>, AppError> {
    let docs = store.list(&paths::task_collection(uid)).await?;
    docs.iter().map(task_from_document).collect()
}

pub async fn fetch_task(
    store: &dyn DocumentStore,
    uid: &str,
    task_id: &str,
) -> Result<Task, AppError> {
    let doc = store.get(&paths::task_doc(uid, task_id)).await?;
    task_from_document(&doc)
}

pub async fn save_task(
    store: &dyn DocumentStore,
    uid: &str,
    task: &Task,
) -> Result<(), AppError> {
    let path = paths::task_doc(uid, &task.id);
    let fields = task_fields(task);
    store.set(&path, &fields).await?;

    let size = quota::estimate_document_size_bytes(&path, &fields);
    quota::record_document_size(store, uid, &task.id, size).await
}

pub async fn set_task_complete(
    store: &dyn DocumentStore,
    uid: &str,
    task_id: &str,
    complete: bool,
) -> Result<(), AppError> {
    let mut fields = Fields::new();
    fields.insert("complete".to_string(), FieldValue::Bool(complete));
    store.merge(&paths::task_doc(uid, task_id), &fields).await
}

pub async fn delete_task(
    store: &dyn DocumentStore,
    uid: &str,
    task_id: &str,
) -> Result<(), AppError> {
    store.delete(&paths::task_doc(uid, task_id)).await
}

/// The whole remote preference document; an absent document reads as empty.
pub async fn fetch_preferences(
    store: &dyn DocumentStore,
    uid: &str,
) -> Result<Fields, AppError> {
    match store.get(&paths::preferences(uid)).await {
        Ok(doc) => Ok(doc.fields),
        Err(AppError::NotFound) => Ok(Fields::new()),
        Err(e) => Err(e),
    }
}

pub async fn push_preference(
    store: &dyn DocumentStore,
    uid: &str,
    key: &str,
    value: FieldValue,
) -> Result<(), AppError> {
    let mut fields = Fields::new();
    fields.insert(key.to_string(), value);
    store.merge(&paths::preferences(uid), &fields).await
}

pub async fn write_user_file(
    store: &dyn DocumentStore,
    uid: &str,
    first_name: &str,
    last_name: &str,
) -> Result<(), AppError> {
    let mut fields = Fields::new();
    fields.insert(
        "FIRST-NAME".to_string(),
        FieldValue::Str(first_name.to_string()),
    );
    fields.insert(
        "LAST-NAME".to_string(),
        FieldValue::Str(last_name.to_string()),
    );
    store.set(&paths::user_file(uid), &fields).await
}

pub async fn read_user_file(
    store: &dyn DocumentStore,
    uid: &str,
) -> Result<(String, String), AppError> {
    let doc = store.get(&paths::user_file(uid)).await?;
    Ok((require_str(&doc, "FIRST-NAME")?, require_str(&doc, "LAST-NAME")?))
}

/// Append-only: every submission lands under a fresh id.
pub async fn submit_feedback(
    store: &dyn DocumentStore,
    feedback: &Feedback,
) -> Result<(), AppError> {
    let mut fields = Fields::new();
    fields.insert("title".to_string(), FieldValue::Str(feedback.title.clone()));
    fields.insert(
        "extraDetails".to_string(),
        FieldValue::Str(feedback.extra_details.clone()),
    );
    fields.insert(
        "feedbackType".to_string(),
        FieldValue::Str(feedback.kind.as_str().to_string()),
    );
    fields.insert(
        "submittedAtEpoch".to_string(),
        FieldValue::Long(feedback.submitted_at_epoch),
    );
    fields.insert(
        "submittingUserId".to_string(),
        FieldValue::Str(feedback.submitting_user_id.clone()),
    );

    let path = paths::feedback_doc(&Uuid::new_v4().to_string());
    store.set(&path, &fields).await
}
