pub mod registry;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use registry::SessionRegistry;

/// Metadata for one uploaded photo.
///
/// Records are immutable once created and only live inside their session's
/// image list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRecord {
    /// Unique id, the stored file name (`{upload-time}_{sanitized-name}`)
    pub id: String,

    /// Relative access path, e.g. `/uploads/<session>/<file>`
    pub url: String,

    /// Creation time in seconds since the Unix epoch
    pub timestamp: f64,
}

impl ImageRecord {
    pub fn new(id: impl Into<String>, url: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
            timestamp: created_at.timestamp_millis() as f64 / 1000.0,
        }
    }
}

/// One phone-to-desktop pairing and the photos uploaded to it, in upload order.
#[derive(Debug, Clone, Default)]
pub struct Session {
    pub images: Vec<ImageRecord>,
}
