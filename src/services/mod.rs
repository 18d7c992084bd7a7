pub mod preferences;
pub mod rescheduler;
pub mod settings;

pub use preferences::PreferenceStore;
pub use rescheduler::{AlarmBackend, BootStats, NotificationRescheduler, NotificationSink};
pub use settings::Settings;
