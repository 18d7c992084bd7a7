pub mod feedback;
pub mod note;
pub mod notification;
pub mod preference;
pub mod task;

pub use feedback::{Feedback, FeedbackKind, NewFeedbackRequest};
pub use note::{Note, NotePayload, PALETTE_SIZE};
pub use notification::PendingNotification;
pub use preference::PreferenceValue;
pub use task::{Task, TaskPayload};
