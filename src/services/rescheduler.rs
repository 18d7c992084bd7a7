//! Makes task reminders survive a device restart.
//!
//! Every scheduled reminder is mirrored into a local row; at boot the
//! rows are replayed into fresh alarm registrations. A pending row lives
//! from `schedule` until its alarm fires or its task is completed or
//! deleted, so a long-lived task is not re-notified on every restart.

use std::sync::Arc;

use serde::Serialize;
use sqlx::SqlitePool;
use tracing::info;

use crate::db::repository;
use crate::error::AppError;
use crate::models::PendingNotification;

/// Platform alarm registration, an external collaborator.
pub trait AlarmBackend: Send + Sync {
    fn register(&self, item_id: i64, fire_at_epoch: i64);
    fn cancel(&self, item_id: i64);
}

/// User-visible notification display. The task id is carried through so
/// the view layer can deep-link to the task.
pub trait NotificationSink: Send + Sync {
    fn show(&self, task_id: &str, title: &str, body: &str);
}

pub struct NoopAlarmBackend;

impl AlarmBackend for NoopAlarmBackend {
    fn register(&self, _item_id: i64, _fire_at_epoch: i64) {}
    fn cancel(&self, _item_id: i64) {}
}

pub struct NoopNotificationSink;

impl NotificationSink for NoopNotificationSink {
    fn show(&self, _task_id: &str, _title: &str, _body: &str) {}
}

#[derive(Debug, Serialize)]
pub struct BootStats {
    pub rearmed: usize,
    pub reaped: usize,
}

pub struct NotificationRescheduler {
    db: SqlitePool,
    alarms: Arc<dyn AlarmBackend>,
    sink: Arc<dyn NotificationSink>,
}

impl NotificationRescheduler {
    pub fn new(
        db: SqlitePool,
        alarms: Arc<dyn AlarmBackend>,
        sink: Arc<dyn NotificationSink>,
    ) -> Self {
        Self { db, alarms, sink }
    }

    /// Persist a pending row and register an alarm, unconditionally.
    /// Scheduling the same task twice yields two rows and two alarms.
    pub async fn schedule(
        &self,
        task_id: &str,
        title: &str,
        body: &str,
        fire_at_epoch: i64,
    ) -> Result<i64, AppError> {
        let item_id =
            repository::insert_pending_notification(&self.db, title, body, fire_at_epoch, task_id)
                .await?;
        self.alarms.register(item_id, fire_at_epoch);
        info!("scheduled reminder {} for task {} at {}", item_id, task_id, fire_at_epoch);
        Ok(item_id)
    }

    /// Replay persisted rows into alarm registrations. Rows whose fire
    /// time already passed while the device was off are reaped here.
    pub async fn on_boot(&self, now_epoch: i64) -> Result<BootStats, AppError> {
        let rows = repository::fetch_pending_notifications(&self.db).await?;
        let mut stats = BootStats {
            rearmed: 0,
            reaped: 0,
        };

        for row in rows {
            if row.fire_at_epoch <= now_epoch {
                repository::delete_pending_row(&self.db, row.item_id).await?;
                stats.reaped += 1;
            } else {
                self.alarms.register(row.item_id, row.fire_at_epoch);
                stats.rearmed += 1;
            }
        }

        info!("boot reschedule: {} rearmed, {} reaped", stats.rearmed, stats.reaped);
        Ok(stats)
    }

    /// Called when an alarm fires: show the notification, then retire
    /// every pending row for the same task.
    pub async fn fire(&self, item_id: i64) -> Result<(), AppError> {
        let row = repository::fetch_pending_notification(&self.db, item_id)
            .await?
            .ok_or(AppError::NotFound)?;

        self.sink.show(&row.target_task_id, &row.title, &row.body);
        self.retire_task(&row.target_task_id).await?;
        Ok(())
    }

    /// Task completed: its reminders are no longer wanted.
    pub async fn on_task_completed(&self, task_id: &str) -> Result<u64, AppError> {
        self.retire_task(task_id).await
    }

    /// Task deleted: same retirement; the pending rows are the only
    /// reference from reminders to the (now gone) task.
    pub async fn on_task_deleted(&self, task_id: &str) -> Result<u64, AppError> {
        self.retire_task(task_id).await
    }

    pub async fn pending_for_task(
        &self,
        task_id: &str,
    ) -> Result<Vec<PendingNotification>, AppError> {
        Ok(repository::fetch_pending_for_task(&self.db, task_id).await?)
    }

    async fn retire_task(&self, task_id: &str) -> Result<u64, AppError> {
        let rows = repository::fetch_pending_for_task(&self.db, task_id).await?;
        for row in &rows {
            self.alarms.cancel(row.item_id);
        }
        let deleted = repository::delete_pending_for_task(&self.db, task_id).await?;
        if deleted > 0 {
            info!("retired {} pending reminder(s) for task {}", deleted, task_id);
        }
        Ok(deleted)
    }
}
