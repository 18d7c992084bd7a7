//! Typed local preference store with a remote mirror.
//!
//! Reads are synchronous and never fail; writes land in the in-memory
//! map first, then the SQLite row and the remote merge are pushed in the
//! background. The remote push is fire-and-forget by design: a delivery
//! failure is logged and dropped, with no retry and no queue.

use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::Arc;

use sqlx::SqlitePool;
use tokio::sync::watch;
use tracing::warn;

use crate::db::repository;
use crate::error::AppError;
use crate::firestore::{documents, DocumentStore, FieldValue};
use crate::models::PreferenceValue;

use super::settings::Settings;

pub const IDENTITY_USER_NAME_FIRST: &str = "IDENTITY_USER_NAME_FIRST";
pub const IDENTITY_USER_NAME_LAST: &str = "IDENTITY_USER_NAME_LAST";
pub const IDENTITY_USER_AUTHENTICATOR: &str = "IDENTITY_USER_AUTHENTICATOR";
pub const IDENTITY_USER_KEY: &str = "IDENTITY_USER_KEY";
pub const STATE_DARK_MODE: &str = "STATE_DARK_MODE";
pub const STATE_ENABLE_NOTIFICATIONS: &str = "STATE_ENABLE_NOTIFICATIONS";
pub const STATE_APP_SECURED: &str = "STATE_APP_SECURED";
pub const STATE_FONT_SIZE: &str = "STATE_FONT_SIZE";

pub struct PreferenceStore {
    db: SqlitePool,
    store: Arc<dyn DocumentStore>,
    values: RwLock<HashMap<String, PreferenceValue>>,
    user_id: RwLock<Option<String>>,
    settings_tx: watch::Sender<Settings>,
}

impl PreferenceStore {
    /// Build the store from the persisted rows.
    pub async fn load(db: SqlitePool, store: Arc<dyn DocumentStore>) -> Result<Self, AppError> {
        let rows = repository::load_preferences(&db).await?;
        let values: HashMap<String, PreferenceValue> = rows.into_iter().collect();
        let (settings_tx, _) = watch::channel(settings_from(&values));

        Ok(Self {
            db,
            store,
            values: RwLock::new(values),
            user_id: RwLock::new(None),
            settings_tx,
        })
    }

    /// Remote pushes need a user; set after sign-in, cleared on sign-out.
    pub fn set_user(&self, uid: Option<String>) {
        *self.user_id.write().expect("preference lock poisoned") = uid;
    }

    pub fn get_bool(&self, key: &str, default: bool) -> bool {
        match self.values.read().expect("preference lock poisoned").get(key) {
            Some(PreferenceValue::Bool(v)) => *v,
            _ => default,
        }
    }

    pub fn get_int(&self, key: &str, default: i64) -> i64 {
        match self.values.read().expect("preference lock poisoned").get(key) {
            Some(PreferenceValue::Int(v)) => *v,
            _ => default,
        }
    }

    pub fn get_str(&self, key: &str, default: &str) -> String {
        match self.values.read().expect("preference lock poisoned").get(key) {
            Some(PreferenceValue::Str(v)) => v.clone(),
            _ => default.to_string(),
        }
    }

    pub fn snapshot(&self) -> HashMap<String, PreferenceValue> {
        self.values.read().expect("preference lock poisoned").clone()
    }

    /// The local map is updated before this returns; the SQLite row and
    /// the remote merge follow in the background. A `get` immediately
    /// after `put` observes the new value.
    pub fn put(&self, key: &str, value: PreferenceValue) {
        {
            let mut values = self.values.write().expect("preference lock poisoned");
            values.insert(key.to_string(), value.clone());
            self.settings_tx.send_replace(settings_from(&values));
        }

        let db = self.db.clone();
        let store = self.store.clone();
        let uid = self.user_id.read().expect("preference lock poisoned").clone();
        let key = key.to_string();

        tokio::spawn(async move {
            if let Err(e) = repository::upsert_preference(&db, &key, &value).await {
                warn!("preference row write failed for {}: {}", key, e);
            }

            let Some(uid) = uid else { return };
            let field = field_from(&value);
            if let Err(e) = documents::push_preference(store.as_ref(), &uid, &key, field).await {
                warn!("preference push failed for {}: {}", key, e);
            }
        });
    }

    /// One-directional, last-writer-wins pull of the remote preference
    /// document: every remote key overwrites the local value. Intended to
    /// run at startup; a concurrent `put` can be lost.
    pub async fn sync_from_remote(&self) -> Result<usize, AppError> {
        let uid = self.user_id.read().expect("preference lock poisoned").clone();
        let Some(uid) = uid else {
            return Ok(0);
        };

        let fields = documents::fetch_preferences(self.store.as_ref(), &uid).await?;
        let mut pulled = 0;

        for (key, field) in &fields {
            let Some(value) = preference_from(field) else {
                warn!("skipping remote preference {} with unsupported type", key);
                continue;
            };

            {
                let mut values = self.values.write().expect("preference lock poisoned");
                values.insert(key.clone(), value.clone());
                self.settings_tx.send_replace(settings_from(&values));
            }
            repository::upsert_preference(&self.db, key, &value).await?;
            pulled += 1;
        }

        Ok(pulled)
    }

    pub fn subscribe(&self) -> watch::Receiver<Settings> {
        self.settings_tx.subscribe()
    }
}

fn settings_from(values: &HashMap<String, PreferenceValue>) -> Settings {
    let defaults = Settings::default();
    let get_bool = |key: &str, default: bool| match values.get(key) {
        Some(PreferenceValue::Bool(v)) => *v,
        _ => default,
    };
    let font_size = match values.get(STATE_FONT_SIZE) {
        Some(PreferenceValue::Int(v)) => *v,
        _ => defaults.font_size,
    };

    Settings {
        dark_mode: get_bool(STATE_DARK_MODE, defaults.dark_mode),
        notifications_enabled: get_bool(STATE_ENABLE_NOTIFICATIONS, defaults.notifications_enabled),
        app_secured: get_bool(STATE_APP_SECURED, defaults.app_secured),
        font_size,
    }
}

fn field_from(value: &PreferenceValue) -> FieldValue {
    match value {
        PreferenceValue::Bool(v) => FieldValue::Bool(*v),
        PreferenceValue::Int(v) => FieldValue::Long(*v),
        PreferenceValue::Str(v) => FieldValue::Str(v.clone()),
    }
}

fn preference_from(field: &FieldValue) -> Option<PreferenceValue> {
    match field {
        FieldValue::Bool(v) => Some(PreferenceValue::Bool(*v)),
        FieldValue::Int(v) => Some(PreferenceValue::Int(i64::from(*v))),
        FieldValue::Long(v) => Some(PreferenceValue::Int(*v)),
        FieldValue::Str(v) => Some(PreferenceValue::Str(v.clone())),
        FieldValue::Double(_) => None,
    }
}
