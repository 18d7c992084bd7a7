use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use sqlx::sqlite::SqlitePoolOptions;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cloudnotes::firestore::{FirebaseConfig, FirestoreHttpClient};
use cloudnotes::identity::avatar::FirebaseStorageClient;
use cloudnotes::identity::{FirebaseAuthClient, IdentityClient};
use cloudnotes::routes::router;
use cloudnotes::services::preferences::IDENTITY_USER_KEY;
use cloudnotes::services::rescheduler::{NoopAlarmBackend, NoopNotificationSink};
use cloudnotes::services::{NotificationRescheduler, PreferenceStore};
use cloudnotes::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "cloudnotes=debug".to_string()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let database_url = std::env::var("DATABASE_URL")
        .unwrap_or_else(|_| "sqlite://cloudnotes.db".to_string());

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    let config = FirebaseConfig::new_from_env()?;
    let store = Arc::new(FirestoreHttpClient::new(config.clone())?);
    let auth = Arc::new(FirebaseAuthClient::new(config.clone())?);
    let blobs = Arc::new(FirebaseStorageClient::new(config)?);

    let data_dir = std::env::var("CLOUDNOTES_DATA_DIR").unwrap_or_else(|_| ".".to_string());
    let avatar_cache = PathBuf::from(data_dir).join("avatar.png");

    let prefs = Arc::new(PreferenceStore::load(pool.clone(), store.clone()).await?);

    // A cached identity from a previous run lets the startup preference
    // pull address the right remote document.
    let cached_uid = prefs.get_str(IDENTITY_USER_KEY, "");
    if !cached_uid.is_empty() {
        prefs.set_user(Some(cached_uid));
        match prefs.sync_from_remote().await {
            Ok(pulled) => info!("preference sync pulled {} key(s)", pulled),
            Err(e) => tracing::warn!("preference sync failed: {}", e),
        }
    }

    let rescheduler = Arc::new(NotificationRescheduler::new(
        pool.clone(),
        Arc::new(NoopAlarmBackend),
        Arc::new(NoopNotificationSink),
    ));
    rescheduler.on_boot(Utc::now().timestamp()).await?;

    let identity = Arc::new(IdentityClient::new(
        auth,
        store.clone(),
        blobs,
        prefs.clone(),
        avatar_cache,
    ));

    let state = AppState {
        db: pool,
        store,
        identity,
        prefs,
        rescheduler,
    };

    let app = router(state);

    let addr = SocketAddr::from(([127, 0, 0, 1], 3000));
    info!("listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
