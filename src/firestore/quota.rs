//! Approximate per-user storage accounting.
//!
//! The size formula is an estimate, not the store's real byte accounting,
//! but it must stay stable: its outputs are summed into quota counters
//! already accumulated on the backend.

use tracing::warn;

use crate::error::AppError;

use super::{paths, DocumentStore, FieldValue, Fields};

/// Fixed per-document overhead charged by the estimator, and the value
/// reported when the quota monitor cannot be read.
pub const QUOTA_BASELINE_BYTES: i64 = 32;

const PATH_OVERHEAD_BYTES: i64 = 17;

/// Deterministic, pure size estimate for a document at `path`:
/// `32 + (path + 17) + per key (len + 1) + per value contribution`,
/// where an i32 costs 8, an i64 costs 16, a bool 1, a string `len + 1`,
/// and anything else 0.
pub fn estimate_document_size_bytes(path: &str, fields: &Fields) -> i64 {
    let mut size = QUOTA_BASELINE_BYTES + path.len() as i64 + PATH_OVERHEAD_BYTES;

    for (key, value) in fields {
        size += key.len() as i64 + 1;
        size += match value {
            FieldValue::Int(_) => 8,
            FieldValue::Long(_) => 16,
            FieldValue::Bool(_) => 1,
            FieldValue::Str(s) => s.len() as i64 + 1,
            FieldValue::Double(_) => 0,
        };
    }

    size
}

/// Merge one document's estimate into the user's quota monitor, keyed by
/// document id. The avatar path writes its own `USER-AVATAR` field into
/// the same document.
pub async fn record_document_size(
    store: &dyn DocumentStore,
    uid: &str,
    doc_id: &str,
    size_bytes: i64,
) -> Result<(), AppError> {
    let mut fields = Fields::new();
    fields.insert(doc_id.to_string(), FieldValue::Long(size_bytes));
    store.merge(&paths::quota_monitor(uid), &fields).await
}

/// Sum every numeric field of the quota monitor. Any read failure yields
/// the baseline instead of an error, so callers cannot tell "unknown"
/// from "minimum".
pub async fn aggregate_user_storage_bytes(store: &dyn DocumentStore, uid: &str) -> i64 {
    match store.get(&paths::quota_monitor(uid)).await {
        Ok(doc) => doc
            .fields
            .values()
            .map(|value| match value {
                FieldValue::Int(v) => i64::from(*v),
                FieldValue::Long(v) => *v,
                FieldValue::Double(v) => *v as i64,
                _ => 0,
            })
            .sum(),
        Err(e) => {
            warn!("quota monitor read failed for {}: {}", uid, e);
            QUOTA_BASELINE_BYTES
        }
    }
}
