use std::sync::Arc;
use std::time::Duration;

use sqlx::SqlitePool;

use cloudnotes::firestore::{documents, DocumentStore, FieldValue, MemoryStore};
use cloudnotes::models::PreferenceValue;
use cloudnotes::services::preferences::{STATE_DARK_MODE, STATE_FONT_SIZE};
use cloudnotes::services::PreferenceStore;

async fn database() -> SqlitePool {
    let db = SqlitePool::connect("sqlite::memory:")
        .await
        .expect("Failed to create database");

    sqlx::query(
        "CREATE TABLE preferences (key TEXT PRIMARY KEY, kind TEXT NOT NULL, value TEXT NOT NULL)",
    )
    .execute(&db)
    .await
    .expect("Failed to create preferences table");

    db
}

#[tokio::test]
async fn get_after_put_sees_the_new_value_immediately() {
    let store = Arc::new(MemoryStore::new());
    let prefs = PreferenceStore::load(database().await, store).await.unwrap();

    // No await between put and get: the local write is synchronous.
    prefs.put(STATE_DARK_MODE, PreferenceValue::Bool(true));
    assert!(prefs.get_bool(STATE_DARK_MODE, false));
}

#[tokio::test]
async fn get_falls_back_to_the_default() {
    let store = Arc::new(MemoryStore::new());
    let prefs = PreferenceStore::load(database().await, store).await.unwrap();

    assert!(!prefs.get_bool(STATE_DARK_MODE, false));
    assert_eq!(prefs.get_int(STATE_FONT_SIZE, 14), 14);
    assert_eq!(prefs.get_str("IDENTITY_USER_NAME_FIRST", ""), "");
}

#[tokio::test]
async fn put_persists_the_row_in_the_background() {
    let db = database().await;
    let store = Arc::new(MemoryStore::new());
    let prefs = PreferenceStore::load(db.clone(), store).await.unwrap();

    prefs.put(STATE_FONT_SIZE, PreferenceValue::Int(18));
    tokio::time::sleep(Duration::from_millis(100)).await;

    let reloaded = PreferenceStore::load(db, Arc::new(MemoryStore::new()))
        .await
        .unwrap();
    assert_eq!(reloaded.get_int(STATE_FONT_SIZE, 0), 18);
}

#[tokio::test]
async fn put_mirrors_the_key_to_the_remote_document() {
    let store = Arc::new(MemoryStore::new());
    let prefs = PreferenceStore::load(database().await, store.clone())
        .await
        .unwrap();
    prefs.set_user(Some("u1".to_string()));

    prefs.put(STATE_DARK_MODE, PreferenceValue::Bool(true));
    tokio::time::sleep(Duration::from_millis(100)).await;

    let remote = documents::fetch_preferences(store.as_ref(), "u1")
        .await
        .unwrap();
    assert_eq!(remote.get(STATE_DARK_MODE), Some(&FieldValue::Bool(true)));
}

#[tokio::test]
async fn put_without_a_user_skips_the_remote_push() {
    let store = Arc::new(MemoryStore::new());
    let prefs = PreferenceStore::load(database().await, store.clone())
        .await
        .unwrap();

    prefs.put(STATE_DARK_MODE, PreferenceValue::Bool(true));
    tokio::time::sleep(Duration::from_millis(100)).await;

    let remote = documents::fetch_preferences(store.as_ref(), "u1")
        .await
        .unwrap();
    assert!(remote.is_empty());
    // The local value is still there.
    assert!(prefs.get_bool(STATE_DARK_MODE, false));
}

#[tokio::test]
async fn sync_from_remote_overwrites_every_local_key() {
    let store = Arc::new(MemoryStore::new());
    documents::push_preference(store.as_ref(), "u1", STATE_DARK_MODE, FieldValue::Bool(true))
        .await
        .unwrap();
    documents::push_preference(store.as_ref(), "u1", STATE_FONT_SIZE, FieldValue::Long(20))
        .await
        .unwrap();

    let prefs = PreferenceStore::load(database().await, store).await.unwrap();
    prefs.set_user(Some("u1".to_string()));
    // A diverged local value loses to the remote copy.
    prefs.put(STATE_FONT_SIZE, PreferenceValue::Int(11));

    let pulled = prefs.sync_from_remote().await.unwrap();

    assert_eq!(pulled, 2);
    assert!(prefs.get_bool(STATE_DARK_MODE, false));
    assert_eq!(prefs.get_int(STATE_FONT_SIZE, 0), 20);
}

#[tokio::test]
async fn sync_from_remote_without_a_user_is_a_no_op() {
    let store = Arc::new(MemoryStore::new());
    let prefs = PreferenceStore::load(database().await, store).await.unwrap();

    assert_eq!(prefs.sync_from_remote().await.unwrap(), 0);
}

#[tokio::test]
async fn settings_watch_publishes_preference_changes() {
    let store = Arc::new(MemoryStore::new());
    let prefs = PreferenceStore::load(database().await, store).await.unwrap();
    let rx = prefs.subscribe();

    assert!(!rx.borrow().dark_mode);

    prefs.put(STATE_DARK_MODE, PreferenceValue::Bool(true));
    assert!(rx.borrow().dark_mode);

    prefs.put(STATE_FONT_SIZE, PreferenceValue::Int(22));
    assert_eq!(rx.borrow().font_size, 22);
}
