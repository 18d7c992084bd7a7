use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use sqlx::SqlitePool;

use cloudnotes::error::AppError;
use cloudnotes::firestore::{
    documents, paths, Document, DocumentStore, FieldValue, Fields, MemoryStore,
};
use cloudnotes::identity::avatar::{BlobStore, MemoryBlobStore};
use cloudnotes::identity::{AuthBackend, IdentityClient, Session, SignUpError};
use cloudnotes::services::preferences::{
    IDENTITY_USER_KEY, IDENTITY_USER_NAME_FIRST, IDENTITY_USER_NAME_LAST,
};
use cloudnotes::services::PreferenceStore;

struct MockAuth {
    sign_up_calls: AtomicUsize,
    sign_in_calls: AtomicUsize,
    delete_calls: AtomicUsize,
    fail_sign_in: bool,
}

impl MockAuth {
    fn new() -> Self {
        Self {
            sign_up_calls: AtomicUsize::new(0),
            sign_in_calls: AtomicUsize::new(0),
            delete_calls: AtomicUsize::new(0),
            fail_sign_in: false,
        }
    }

    fn failing_sign_in() -> Self {
        Self {
            fail_sign_in: true,
            ..Self::new()
        }
    }

    fn session() -> Session {
        Session {
            uid: "u1".to_string(),
            id_token: "token-1".to_string(),
            email: "a@b.com".to_string(),
        }
    }
}

#[async_trait]
impl AuthBackend for MockAuth {
    async fn sign_up(&self, _email: &str, _password: &str) -> Result<Session, AppError> {
        self.sign_up_calls.fetch_add(1, Ordering::SeqCst);
        Ok(Self::session())
    }

    async fn sign_in(&self, _email: &str, _password: &str) -> Result<Session, AppError> {
        self.sign_in_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_sign_in {
            return Err(AppError::Remote("auth rejected".to_string()));
        }
        Ok(Self::session())
    }

    async fn delete_account(&self, _id_token: &str) -> Result<(), AppError> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// A store whose USERFILE writes fail, to drive the provisioning saga
/// into its compensation path.
struct FailingMetadataStore {
    inner: MemoryStore,
}

#[async_trait]
impl DocumentStore for FailingMetadataStore {
    async fn list(&self, collection_path: &str) -> Result<Vec<Document>, AppError> {
        self.inner.list(collection_path).await
    }

    async fn get(&self, doc_path: &str) -> Result<Document, AppError> {
        self.inner.get(doc_path).await
    }

    async fn set(&self, doc_path: &str, fields: &Fields) -> Result<(), AppError> {
        if doc_path.ends_with("/USERFILE") {
            return Err(AppError::Remote("metadata write rejected".to_string()));
        }
        self.inner.set(doc_path, fields).await
    }

    async fn merge(&self, doc_path: &str, fields: &Fields) -> Result<(), AppError> {
        self.inner.merge(doc_path, fields).await
    }

    async fn delete(&self, doc_path: &str) -> Result<(), AppError> {
        self.inner.delete(doc_path).await
    }
}

async fn preference_store(store: Arc<dyn DocumentStore>) -> Arc<PreferenceStore> {
    let db = SqlitePool::connect("sqlite::memory:")
        .await
        .expect("Failed to create database");

    sqlx::query(
        "CREATE TABLE preferences (key TEXT PRIMARY KEY, kind TEXT NOT NULL, value TEXT NOT NULL)",
    )
    .execute(&db)
    .await
    .expect("Failed to create preferences table");

    Arc::new(
        PreferenceStore::load(db, store)
            .await
            .expect("Failed to load preference store"),
    )
}

struct Harness {
    auth: Arc<MockAuth>,
    store: Arc<dyn DocumentStore>,
    blobs: Arc<MemoryBlobStore>,
    prefs: Arc<PreferenceStore>,
    client: IdentityClient,
    _dir: tempfile::TempDir,
}

async fn harness_with(auth: MockAuth, store: Arc<dyn DocumentStore>) -> Harness {
    let auth = Arc::new(auth);
    let blobs = Arc::new(MemoryBlobStore::new());
    let prefs = preference_store(store.clone()).await;
    let dir = tempfile::tempdir().expect("Failed to create temp dir");

    let client = IdentityClient::new(
        auth.clone(),
        store.clone(),
        blobs.clone(),
        prefs.clone(),
        dir.path().join("avatar.png"),
    );

    Harness {
        auth,
        store,
        blobs,
        prefs,
        client,
        _dir: dir,
    }
}

async fn harness() -> Harness {
    harness_with(MockAuth::new(), Arc::new(MemoryStore::new())).await
}

fn sample_png() -> Vec<u8> {
    use image::{ImageBuffer, ImageFormat, Rgba};
    use std::io::Cursor;

    let buffer = ImageBuffer::<Rgba<u8>, Vec<u8>>::from_fn(64, 64, |_x, _y| {
        Rgba([200, 40, 90, 255])
    });
    let mut cursor = Cursor::new(Vec::new());
    image::DynamicImage::ImageRgba8(buffer)
        .write_to(&mut cursor, ImageFormat::Png)
        .unwrap();
    cursor.into_inner()
}

#[tokio::test]
async fn sign_up_with_three_char_password_reaches_the_backend() {
    let h = harness().await;

    let result = h.client.sign_up("a@b.com", "abc", "Jane", "Doe", None).await;

    assert_eq!(result, Ok(()));
    assert_eq!(h.auth.sign_up_calls.load(Ordering::SeqCst), 1);
    assert!(h.client.exists());
}

#[tokio::test]
async fn sign_up_rejects_two_char_password_before_any_remote_call() {
    let h = harness().await;

    let result = h.client.sign_up("a@b.com", "ab", "Jane", "Doe", None).await;

    assert_eq!(result, Err(SignUpError::PasswordTooShort));
    assert_eq!(h.auth.sign_up_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn sign_up_rejects_malformed_email_before_any_remote_call() {
    let h = harness().await;

    let result = h
        .client
        .sign_up("not-an-email", "abcdef", "Jane", "Doe", None)
        .await;

    assert_eq!(result, Err(SignUpError::InvalidEmail));
    assert_eq!(h.auth.sign_up_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn sign_up_validation_short_circuits_in_order() {
    let h = harness().await;

    // Email is checked before the password.
    assert_eq!(
        h.client.sign_up("bad", "", "Jane", "Doe", None).await,
        Err(SignUpError::InvalidEmail)
    );
    assert_eq!(
        h.client.sign_up("a@b.com", "abc", "", "Doe", None).await,
        Err(SignUpError::MissingFirstName)
    );
    assert_eq!(
        h.client.sign_up("a@b.com", "abc", "Jane", "", None).await,
        Err(SignUpError::MissingLastName)
    );
    assert_eq!(h.auth.sign_up_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn sign_up_writes_profile_metadata() {
    let h = harness().await;

    h.client
        .sign_up("a@b.com", "abc", "Jane", "Doe", None)
        .await
        .expect("sign-up failed");

    let (first, last) = documents::read_user_file(h.store.as_ref(), "u1")
        .await
        .expect("USERFILE missing");
    assert_eq!(first, "Jane");
    assert_eq!(last, "Doe");
}

#[tokio::test]
async fn sign_up_with_avatar_uploads_the_compressed_blob() {
    let h = harness().await;
    let png = sample_png();

    h.client
        .sign_up("a@b.com", "abc", "Jane", "Doe", Some(&png[..]))
        .await
        .expect("sign-up failed");

    let blob = h.blobs.download(&paths::avatar_blob("u1")).await;
    assert!(blob.is_ok());

    let monitor = h.store.get(&paths::quota_monitor("u1")).await.unwrap();
    assert!(monitor.get_i64("USER-AVATAR").unwrap() > 0);
}

#[tokio::test]
async fn failed_metadata_step_compensates_by_deleting_the_identity() {
    let store = Arc::new(FailingMetadataStore {
        inner: MemoryStore::new(),
    });
    let h = harness_with(MockAuth::new(), store).await;

    let result = h.client.sign_up("a@b.com", "abc", "Jane", "Doe", None).await;

    assert_eq!(result, Err(SignUpError::Remote));
    assert_eq!(h.auth.sign_up_calls.load(Ordering::SeqCst), 1);
    assert_eq!(h.auth.delete_calls.load(Ordering::SeqCst), 1);
    assert!(!h.client.exists());
}

#[tokio::test]
async fn sign_in_caches_profile_and_avatar_before_resolving_true() {
    let h = harness().await;
    documents::write_user_file(h.store.as_ref(), "u1", "Jane", "Doe")
        .await
        .unwrap();
    h.blobs
        .upload(&paths::avatar_blob("u1"), sample_png())
        .await
        .unwrap();

    assert!(h.client.sign_in("a@b.com", "hunter2").await);
    assert!(h.client.exists());
    assert_eq!(h.prefs.get_str(IDENTITY_USER_NAME_FIRST, ""), "Jane");
    assert_eq!(h.prefs.get_str(IDENTITY_USER_NAME_LAST, ""), "Doe");
    assert!(h.client.avatar_cache_path().exists());
}

#[tokio::test]
async fn sign_in_mirrors_identity_fields_to_the_remote_preferences() {
    let h = harness().await;
    documents::write_user_file(h.store.as_ref(), "u1", "Jane", "Doe")
        .await
        .unwrap();
    h.blobs
        .upload(&paths::avatar_blob("u1"), sample_png())
        .await
        .unwrap();

    assert!(h.client.sign_in("a@b.com", "hunter2").await);
    // The pushes run in the background.
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;

    let remote = documents::fetch_preferences(h.store.as_ref(), "u1")
        .await
        .unwrap();
    assert_eq!(
        remote.get(IDENTITY_USER_NAME_FIRST),
        Some(&FieldValue::Str("Jane".to_string()))
    );
    assert_eq!(
        remote.get(IDENTITY_USER_KEY),
        Some(&FieldValue::Str("u1".to_string()))
    );
}

#[tokio::test]
async fn sign_in_rejects_malformed_email_locally() {
    let h = harness().await;

    assert!(!h.client.sign_in("nope", "hunter2").await);
    assert_eq!(h.auth.sign_in_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn sign_in_rejects_empty_password_locally() {
    let h = harness().await;

    assert!(!h.client.sign_in("a@b.com", "").await);
    assert_eq!(h.auth.sign_in_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn remote_rejection_resolves_false_and_signs_out() {
    let h = harness_with(MockAuth::failing_sign_in(), Arc::new(MemoryStore::new())).await;

    assert!(!h.client.sign_in("a@b.com", "hunter2").await);
    assert!(!h.client.exists());
}

#[tokio::test]
async fn sign_out_keeps_cached_identity_fields() {
    let h = harness().await;
    documents::write_user_file(h.store.as_ref(), "u1", "Jane", "Doe")
        .await
        .unwrap();
    h.blobs
        .upload(&paths::avatar_blob("u1"), sample_png())
        .await
        .unwrap();
    assert!(h.client.sign_in("a@b.com", "hunter2").await);

    h.client.sign_out();

    assert!(!h.client.exists());
    // Stale until the next sign-in overwrites them.
    assert_eq!(h.prefs.get_str(IDENTITY_USER_NAME_FIRST, ""), "Jane");
}

#[tokio::test]
async fn upload_avatar_writes_cache_then_blob_and_quota() {
    let h = harness().await;
    documents::write_user_file(h.store.as_ref(), "u1", "Jane", "Doe")
        .await
        .unwrap();
    h.blobs
        .upload(&paths::avatar_blob("u1"), sample_png())
        .await
        .unwrap();
    assert!(h.client.sign_in("a@b.com", "hunter2").await);

    assert!(h.client.upload_avatar(&sample_png()).await);
    assert!(h.client.avatar_cache_path().exists());

    let monitor = h.store.get(&paths::quota_monitor("u1")).await.unwrap();
    assert!(monitor.get_i64("USER-AVATAR").unwrap() > 0);
}

#[tokio::test]
async fn upload_avatar_without_session_fails() {
    let h = harness().await;

    assert!(!h.client.upload_avatar(&sample_png()).await);
}
