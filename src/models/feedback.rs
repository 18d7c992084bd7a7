use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING-KEBAB-CASE")]
pub enum FeedbackKind {
    BugReport,
    FeatureRequest,
    General,
    Other,
}

impl FeedbackKind {
    pub fn as_str(self) -> &'static str {
        match self {
            FeedbackKind::BugReport => "BUG-REPORT",
            FeedbackKind::FeatureRequest => "FEATURE-REQUEST",
            FeedbackKind::General => "GENERAL",
            FeedbackKind::Other => "OTHER",
        }
    }
}

/// Write-once feedback record; there is no read path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feedback {
    pub title: String,
    pub extra_details: String,
    pub kind: FeedbackKind,
    pub submitted_at_epoch: i64,
    pub submitting_user_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewFeedbackRequest {
    pub title: String,
    pub extra_details: String,
    pub kind: FeedbackKind,
}
