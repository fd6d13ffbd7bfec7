//! In-memory session registry.
//!
//! Maps session ids to their ordered image lists. All reads and writes go
//! through a single lock, so the order in which `append_image` calls
//! complete is the order every later reader observes.

use std::collections::HashMap;

use parking_lot::Mutex;

use super::{ImageRecord, Session};

#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<String, Session>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record to a session, creating the session on first use.
    ///
    /// Never fails and never deduplicates; callers make ids unique.
    pub fn append_image(&self, session_id: &str, record: ImageRecord) {
        let mut sessions = self.sessions.lock();
        sessions
            .entry(session_id.to_string())
            .or_default()
            .images
            .push(record);
    }

    /// Snapshot of a session's images. Unknown sessions yield an empty list.
    pub fn list_images(&self, session_id: &str) -> Vec<ImageRecord> {
        self.sessions
            .lock()
            .get(session_id)
            .map(|session| session.images.clone())
            .unwrap_or_default()
    }

    /// Like `list_images`, but creates the session when it does not exist yet.
    /// Used when a desktop subscribes before the first upload.
    pub fn open_session(&self, session_id: &str) -> Vec<ImageRecord> {
        self.sessions
            .lock()
            .entry(session_id.to_string())
            .or_default()
            .images
            .clone()
    }

    pub fn image_count(&self, session_id: &str) -> usize {
        self.sessions
            .lock()
            .get(session_id)
            .map_or(0, |session| session.images.len())
    }

    pub fn session_count(&self) -> usize {
        self.sessions.lock().len()
    }

    pub fn contains(&self, session_id: &str) -> bool {
        self.sessions.lock().contains_key(session_id)
    }
}
