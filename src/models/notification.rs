use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Reminder record persisted locally so a scheduled alarm survives a
/// device restart. Column names match the legacy on-device table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct PendingNotification {
    #[sqlx(rename = "itemID")]
    pub item_id: i64,
    #[sqlx(rename = "notificationTitle")]
    pub title: String,
    #[sqlx(rename = "notificationDescription")]
    pub body: String,
    #[sqlx(rename = "notifyTimeUnix")]
    pub fire_at_epoch: i64,
    #[sqlx(rename = "targetTaskID")]
    pub target_task_id: String,
}
