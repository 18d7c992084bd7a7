//! Canonical remote paths. These are wire-visible and must stay
//! bit-exact so existing user data remains reachable.

pub fn note_collection(uid: &str) -> String {
    format!("userdata/{}/note-data", uid)
}

pub fn note_doc(uid: &str, note_id: &str) -> String {
    format!("userdata/{}/note-data/{}", uid, note_id)
}

pub fn task_collection(uid: &str) -> String {
    format!("userdata/{}/task-data", uid)
}

pub fn task_doc(uid: &str, task_id: &str) -> String {
    format!("userdata/{}/task-data/{}", uid, task_id)
}

pub fn user_file(uid: &str) -> String {
    format!("METADATA/USERS/{}/USERFILE", uid)
}

pub fn quota_monitor(uid: &str) -> String {
    format!("METADATA/USERS/{}/QUOTA-MONITOR", uid)
}

pub fn preferences(uid: &str) -> String {
    format!("METADATA/USERS/{}/PREFERENCES", uid)
}

pub fn feedback_doc(feedback_id: &str) -> String {
    format!("FEEDBACK/{}", feedback_id)
}

/// Blob path for the single per-user avatar PNG.
pub fn avatar_blob(uid: &str) -> String {
    format!("USER-AVATARS/{}", uid)
}
