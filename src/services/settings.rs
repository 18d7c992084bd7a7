//! The app-wide settings snapshot. Instead of ambient mutable flags,
//! writers go through the preference store and observers subscribe to a
//! watch channel carrying the latest snapshot.

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Settings {
    pub dark_mode: bool,
    pub notifications_enabled: bool,
    pub app_secured: bool,
    pub font_size: i64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            dark_mode: false,
            notifications_enabled: true,
            app_secured: false,
            font_size: 14,
        }
    }
}
