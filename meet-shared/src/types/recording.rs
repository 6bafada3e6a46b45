use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single-track or multitrack recording intake record, keyed by the
/// storage bucket/object coordinates the webhook told us about.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recording {
    pub id: Uuid,
    pub bucket_name: String,
    /// Set for single-track recordings; mutually exclusive with `track_keys`.
    pub object_key: Option<String>,
    /// Set for multitrack recordings; one object key per track.
    pub track_keys: Option<Vec<String>>,
    pub room_id: Option<Uuid>,
    pub transcript_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl Recording {
    pub fn is_multitrack(&self) -> bool {
        self.track_keys.as_ref().is_some_and(|k| !k.is_empty())
    }

    /// Invariant (§3): exactly one of `object_key` / `track_keys` is set.
    pub fn has_valid_key_shape(&self) -> bool {
        self.object_key.is_some() ^ self.is_multitrack()
    }
}
