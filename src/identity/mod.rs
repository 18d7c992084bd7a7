pub mod avatar;
mod provision;

use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tracing::{info, warn};

use crate::error::AppError;
use crate::firestore::{documents, paths, quota, DocumentStore, FirebaseConfig};
use crate::services::preferences::{
    PreferenceStore, IDENTITY_USER_AUTHENTICATOR, IDENTITY_USER_KEY, IDENTITY_USER_NAME_FIRST,
    IDENTITY_USER_NAME_LAST,
};

use avatar::{BlobStore, compress_avatar};

/// Session lifecycle: `SignedOut -> Authenticating -> SignedIn`, with the
/// failure edge from `Authenticating` back to `SignedOut`.
#[derive(Debug, Clone)]
pub enum SessionState {
    SignedOut,
    Authenticating,
    SignedIn(Session),
}

#[derive(Debug, Clone)]
pub struct Session {
    pub uid: String,
    pub id_token: String,
    pub email: String,
}

/// Ordered sign-up validation failures, one distinct message per kind.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignUpError {
    #[error("Enter a valid email address")]
    InvalidEmail,
    #[error("Password must be at least 3 characters")]
    PasswordTooShort,
    #[error("First name cannot be empty")]
    MissingFirstName,
    #[error("Last name cannot be empty")]
    MissingLastName,
    #[error("Account creation failed, try again later")]
    Remote,
}

#[async_trait]
pub trait AuthBackend: Send + Sync {
    async fn sign_up(&self, email: &str, password: &str) -> Result<Session, AppError>;
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AppError>;
    async fn delete_account(&self, id_token: &str) -> Result<(), AppError>;
}

#[derive(Debug, Deserialize)]
struct AuthResponse {
    #[serde(rename = "localId")]
    local_id: String,
    #[serde(rename = "idToken")]
    id_token: String,
    #[serde(default)]
    email: String,
}

/// Identity Toolkit REST client.
pub struct FirebaseAuthClient {
    client: Client,
    config: FirebaseConfig,
}

impl FirebaseAuthClient {
    pub fn new(config: FirebaseConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .build()
            .map_err(|e| AppError::BadRequest(format!("Failed to build http client: {}", e)))?;
        Ok(Self { client, config })
    }

    async fn account_call(&self, action: &str, body: serde_json::Value) -> Result<AuthResponse, AppError> {
        let url = format!(
            "https://identitytoolkit.googleapis.com/v1/accounts:{}?key={}",
            action, self.config.api_key
        );

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|_| AppError::InternalServerError)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Remote(format!("Auth error {}: {}", status, body)));
        }

        response
            .json::<AuthResponse>()
            .await
            .map_err(|e| AppError::Remote(format!("Failed to parse auth response: {}", e)))
    }
}

#[async_trait]
impl AuthBackend for FirebaseAuthClient {
    async fn sign_up(&self, email: &str, password: &str) -> Result<Session, AppError> {
        let body = json!({ "email": email, "password": password, "returnSecureToken": true });
        let resp = self.account_call("signUp", body).await?;
        Ok(Session {
            uid: resp.local_id,
            id_token: resp.id_token,
            email: resp.email,
        })
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AppError> {
        let body = json!({ "email": email, "password": password, "returnSecureToken": true });
        let resp = self.account_call("signInWithPassword", body).await?;
        Ok(Session {
            uid: resp.local_id,
            id_token: resp.id_token,
            email: resp.email,
        })
    }

    async fn delete_account(&self, id_token: &str) -> Result<(), AppError> {
        let url = format!(
            "https://identitytoolkit.googleapis.com/v1/accounts:delete?key={}",
            self.config.api_key
        );

        let response = self
            .client
            .post(&url)
            .json(&json!({ "idToken": id_token }))
            .send()
            .await
            .map_err(|_| AppError::InternalServerError)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Remote(format!("Auth delete error {}: {}", status, body)));
        }

        Ok(())
    }
}

pub fn email_is_valid(email: &str) -> bool {
    let re = Regex::new(r"^[A-Za-z0-9+_.\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}$")
        .expect("Invalid regex");
    re.is_match(email)
}

pub struct IdentityClient {
    auth: Arc<dyn AuthBackend>,
    store: Arc<dyn DocumentStore>,
    blobs: Arc<dyn BlobStore>,
    prefs: Arc<PreferenceStore>,
    avatar_cache: PathBuf,
    state: RwLock<SessionState>,
}

impl IdentityClient {
    pub fn new(
        auth: Arc<dyn AuthBackend>,
        store: Arc<dyn DocumentStore>,
        blobs: Arc<dyn BlobStore>,
        prefs: Arc<PreferenceStore>,
        avatar_cache: PathBuf,
    ) -> Self {
        Self {
            auth,
            store,
            blobs,
            prefs,
            avatar_cache,
            state: RwLock::new(SessionState::SignedOut),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state.read().expect("session lock poisoned").clone()
    }

    fn set_state(&self, next: SessionState) {
        *self.state.write().expect("session lock poisoned") = next;
    }

    /// Pure check of current session presence.
    pub fn exists(&self) -> bool {
        matches!(self.state(), SessionState::SignedIn(_))
    }

    pub fn session(&self) -> Option<Session> {
        match self.state() {
            SessionState::SignedIn(session) => Some(session),
            _ => None,
        }
    }

    /// Local validation first; on remote success the profile metadata and
    /// avatar are cached locally before this resolves true. Every failure
    /// mode resolves false — a transient network error is not
    /// distinguishable from bad credentials here.
    pub async fn sign_in(&self, email: &str, password: &str) -> bool {
        if !email_is_valid(email) || password.is_empty() {
            return false;
        }

        self.set_state(SessionState::Authenticating);

        let session = match self.auth.sign_in(email, password).await {
            Ok(session) => session,
            Err(e) => {
                warn!("sign-in failed: {}", e);
                self.set_state(SessionState::SignedOut);
                return false;
            }
        };

        if !self.cache_profile(&session).await {
            self.set_state(SessionState::SignedOut);
            return false;
        }

        info!("signed in as {}", session.uid);
        self.set_state(SessionState::SignedIn(session));
        true
    }

    /// Ordered validation, short-circuiting at the first violation, then
    /// the provisioning saga (identity, metadata, avatar) with
    /// compensation on partial failure.
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        first_name: &str,
        last_name: &str,
        avatar_bytes: Option<&[u8]>,
    ) -> Result<(), SignUpError> {
        if !email_is_valid(email) {
            return Err(SignUpError::InvalidEmail);
        }
        if password.is_empty() || password.len() < 3 {
            return Err(SignUpError::PasswordTooShort);
        }
        if first_name.is_empty() {
            return Err(SignUpError::MissingFirstName);
        }
        if last_name.is_empty() {
            return Err(SignUpError::MissingLastName);
        }

        self.set_state(SessionState::Authenticating);

        let session = match provision::provision_account(
            self.auth.as_ref(),
            self.store.as_ref(),
            self.blobs.as_ref(),
            email,
            password,
            first_name,
            last_name,
            avatar_bytes,
        )
        .await
        {
            Ok(session) => session,
            Err(e) => {
                warn!("sign-up failed: {}", e);
                self.set_state(SessionState::SignedOut);
                return Err(SignUpError::Remote);
            }
        };

        self.cache_identity(&session, first_name, last_name);
        self.set_state(SessionState::SignedIn(session));
        Ok(())
    }

    /// Clears the session only. Cached identity fields and the avatar
    /// file stay behind until the next sign-in overwrites them.
    pub fn sign_out(&self) {
        self.set_state(SessionState::SignedOut);
        info!("signed out");
    }

    /// Compress, write the local cache file, then upload. True only after
    /// both the local write and the remote upload succeed.
    pub async fn upload_avatar(&self, image_bytes: &[u8]) -> bool {
        let Some(session) = self.session() else {
            return false;
        };

        let compressed = match compress_avatar(image_bytes) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("avatar compression failed: {}", e);
                return false;
            }
        };
        let size = compressed.len() as i64;

        if let Err(e) = std::fs::write(&self.avatar_cache, &compressed) {
            warn!("avatar cache write failed: {}", e);
            return false;
        }

        if let Err(e) = self
            .blobs
            .upload(&paths::avatar_blob(&session.uid), compressed)
            .await
        {
            warn!("avatar upload failed: {}", e);
            return false;
        }

        if let Err(e) =
            quota::record_document_size(self.store.as_ref(), &session.uid, "USER-AVATAR", size)
                .await
        {
            warn!("avatar quota record failed: {}", e);
        }

        true
    }

    /// Fetch the remote avatar into the cache file and record its byte
    /// size in the quota monitor.
    pub async fn download_latest_avatar(&self) -> bool {
        let Some(session) = self.session() else {
            return false;
        };
        self.download_avatar_for(&session.uid).await
    }

    pub fn avatar_cache_path(&self) -> &PathBuf {
        &self.avatar_cache
    }

    async fn download_avatar_for(&self, uid: &str) -> bool {
        let bytes = match self.blobs.download(&paths::avatar_blob(uid)).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("avatar download failed for {}: {}", uid, e);
                return false;
            }
        };
        let size = bytes.len() as i64;

        if let Err(e) = std::fs::write(&self.avatar_cache, &bytes) {
            warn!("avatar cache write failed: {}", e);
            return false;
        }

        if let Err(e) =
            quota::record_document_size(self.store.as_ref(), uid, "USER-AVATAR", size).await
        {
            warn!("avatar quota record failed: {}", e);
        }

        true
    }

    async fn cache_profile(&self, session: &Session) -> bool {
        let (first, last) = match documents::read_user_file(self.store.as_ref(), &session.uid).await
        {
            Ok(names) => names,
            Err(e) => {
                warn!("profile metadata fetch failed for {}: {}", session.uid, e);
                return false;
            }
        };

        if !self.download_avatar_for(&session.uid).await {
            return false;
        }

        self.cache_identity(session, &first, &last);
        true
    }

    fn cache_identity(&self, session: &Session, first: &str, last: &str) {
        // The push target must be known before the puts, or the identity
        // keys never reach the remote preference mirror.
        self.prefs.set_user(Some(session.uid.clone()));
        self.prefs.put(IDENTITY_USER_NAME_FIRST, first.into());
        self.prefs.put(IDENTITY_USER_NAME_LAST, last.into());
        self.prefs.put(IDENTITY_USER_KEY, session.uid.as_str().into());
        self.prefs
            .put(IDENTITY_USER_AUTHENTICATOR, session.id_token.as_str().into());
    }
}
