use std::sync::Arc;

use sqlx::SqlitePool;

use crate::firestore::DocumentStore;
use crate::identity::IdentityClient;
use crate::services::{NotificationRescheduler, PreferenceStore};

#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub store: Arc<dyn DocumentStore>,
    pub identity: Arc<IdentityClient>,
    pub prefs: Arc<PreferenceStore>,
    pub rescheduler: Arc<NotificationRescheduler>,
}
