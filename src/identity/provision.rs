//! Account provisioning saga: create identity, write profile metadata,
//! upload the avatar. A failure after identity creation triggers a
//! best-effort compensation that deletes the fresh identity, so a retry
//! starts from a clean slate instead of a half-provisioned account.

use tracing::{info, warn};

use crate::error::AppError;
use crate::firestore::{documents, paths, quota, DocumentStore};

use super::avatar::{self, BlobStore};
use super::{AuthBackend, Session};

pub(crate) async fn provision_account(
    auth: &dyn AuthBackend,
    store: &dyn DocumentStore,
    blobs: &dyn BlobStore,
    email: &str,
    password: &str,
    first_name: &str,
    last_name: &str,
    avatar_bytes: Option<&[u8]>,
) -> Result<Session, AppError> {
    let session = auth.sign_up(email, password).await?;
    info!("identity created for {}", session.uid);

    if let Err(e) = documents::write_user_file(store, &session.uid, first_name, last_name).await {
        warn!("metadata write failed for {}, compensating: {}", session.uid, e);
        compensate(auth, store, &session, false).await;
        return Err(e);
    }

    if let Some(bytes) = avatar_bytes {
        if let Err(e) = upload_initial_avatar(store, blobs, &session.uid, bytes).await {
            warn!("avatar upload failed for {}, compensating: {}", session.uid, e);
            compensate(auth, store, &session, true).await;
            return Err(e);
        }
    }

    Ok(session)
}

async fn upload_initial_avatar(
    store: &dyn DocumentStore,
    blobs: &dyn BlobStore,
    uid: &str,
    bytes: &[u8],
) -> Result<(), AppError> {
    let compressed = avatar::compress_avatar(bytes)?;
    let size = compressed.len() as i64;
    blobs.upload(&paths::avatar_blob(uid), compressed).await?;
    quota::record_document_size(store, uid, "USER-AVATAR", size).await
}

/// Undo the completed steps in reverse order. Compensation is best
/// effort: a failure here is logged and swallowed, leaving at worst the
/// same partial state the saga was introduced to avoid.
async fn compensate(
    auth: &dyn AuthBackend,
    store: &dyn DocumentStore,
    session: &Session,
    metadata_written: bool,
) {
    if metadata_written {
        if let Err(e) = store.delete(&paths::user_file(&session.uid)).await {
            warn!("compensation: USERFILE delete failed for {}: {}", session.uid, e);
        }
    }
    if let Err(e) = auth.delete_account(&session.id_token).await {
        warn!("compensation: identity delete failed for {}: {}", session.uid, e);
    }
}
