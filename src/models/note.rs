use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Number of fixed color tags a note can carry (palette ids 0..=15).
pub const PALETTE_SIZE: i32 = 16;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub id: String,
    pub color: i32,
    pub title: String,
    pub content: String,
    /// Human-readable last-edited date, e.g. "23 Aug 2026".
    pub date: String,
    /// Human-readable last-edited time, e.g. "14:05".
    pub time: String,
}

impl Note {
    pub fn new(color: i32, title: String, content: String, date: String, time: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            color,
            title,
            content,
            date,
            time,
        }
    }

    pub fn color_in_palette(color: i32) -> bool {
        (0..PALETTE_SIZE).contains(&color)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotePayload {
    pub color: i32,
    pub title: String,
    pub content: String,
}
