use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    pub content: String,
    pub due_date_human: String,
    pub due_time_human: String,
    /// Due moment as unix seconds. The wire field `dueDateTimeUnix` is a
    /// legacy double; sub-second precision is never meaningful.
    pub due_epoch: i64,
    pub complete: bool,
}

impl Task {
    pub fn new(
        title: String,
        content: String,
        due_date_human: String,
        due_time_human: String,
        due_epoch: i64,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title,
            content,
            due_date_human,
            due_time_human,
            due_epoch,
            complete: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskPayload {
    pub title: String,
    pub content: String,
    pub due_date_human: String,
    pub due_time_human: String,
    pub due_epoch: i64,
    /// Completion flag carried through full-document overwrites. Absent
    /// on create, where a task always starts incomplete.
    #[serde(default)]
    pub complete: bool,
    /// Schedule a local reminder for the due moment.
    #[serde(default)]
    pub remind: bool,
}
