//! On-device persistence: the preference mirror and the pending
//! notification rows that survive a restart.

use sqlx::{FromRow, SqlitePool};

use crate::models::{PendingNotification, PreferenceValue};

#[derive(Debug, FromRow)]
struct PreferenceRow {
    key: String,
    kind: String,
    value: String,
}

pub async fn load_preferences(
    db: &SqlitePool,
) -> Result<Vec<(String, PreferenceValue)>, sqlx::Error> {
    let rows = sqlx::query_as::<_, PreferenceRow>("SELECT key, kind, value FROM preferences")
        .fetch_all(db)
        .await?;

    Ok(rows
        .into_iter()
        .map(|row| {
            let value = PreferenceValue::decode(&row.kind, &row.value);
            (row.key, value)
        })
        .collect())
}

pub async fn upsert_preference(
    db: &SqlitePool,
    key: &str,
    value: &PreferenceValue,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO preferences (key, kind, value) VALUES (?, ?, ?) \
         ON CONFLICT(key) DO UPDATE SET kind = excluded.kind, value = excluded.value",
    )
    .bind(key)
    .bind(value.kind())
    .bind(value.encode())
    .execute(db)
    .await?;

    Ok(())
}

pub async fn insert_pending_notification(
    db: &SqlitePool,
    title: &str,
    body: &str,
    fire_at_epoch: i64,
    target_task_id: &str,
) -> Result<i64, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO pending_notifications \
         (notificationTitle, notificationDescription, notifyTimeUnix, targetTaskID) \
         VALUES (?, ?, ?, ?)",
    )
    .bind(title)
    .bind(body)
    .bind(fire_at_epoch)
    .bind(target_task_id)
    .execute(db)
    .await?;

    Ok(result.last_insert_rowid())
}

pub async fn fetch_pending_notifications(
    db: &SqlitePool,
) -> Result<Vec<PendingNotification>, sqlx::Error> {
    sqlx::query_as::<_, PendingNotification>(
        "SELECT itemID, notificationTitle, notificationDescription, notifyTimeUnix, targetTaskID \
         FROM pending_notifications ORDER BY itemID",
    )
    .fetch_all(db)
    .await
}

pub async fn fetch_pending_notification(
    db: &SqlitePool,
    item_id: i64,
) -> Result<Option<PendingNotification>, sqlx::Error> {
    sqlx::query_as::<_, PendingNotification>(
        "SELECT itemID, notificationTitle, notificationDescription, notifyTimeUnix, targetTaskID \
         FROM pending_notifications WHERE itemID = ?",
    )
    .bind(item_id)
    .fetch_optional(db)
    .await
}

pub async fn fetch_pending_for_task(
    db: &SqlitePool,
    target_task_id: &str,
) -> Result<Vec<PendingNotification>, sqlx::Error> {
    sqlx::query_as::<_, PendingNotification>(
        "SELECT itemID, notificationTitle, notificationDescription, notifyTimeUnix, targetTaskID \
         FROM pending_notifications WHERE targetTaskID = ? ORDER BY itemID",
    )
    .bind(target_task_id)
    .fetch_all(db)
    .await
}

pub async fn delete_pending_for_task(
    db: &SqlitePool,
    target_task_id: &str,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM pending_notifications WHERE targetTaskID = ?")
        .bind(target_task_id)
        .execute(db)
        .await?;

    Ok(result.rows_affected())
}

pub async fn delete_pending_row(db: &SqlitePool, item_id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM pending_notifications WHERE itemID = ?")
        .bind(item_id)
        .execute(db)
        .await?;

    Ok(result.rows_affected() > 0)
}
