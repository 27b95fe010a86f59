//! In-memory store backing result-video view URLs.
//!
//! A successful detection hands its payload to [`ViewStore::insert`], which
//! returns the single [`VideoHandle`] for it. The handle is not `Clone`:
//! whoever holds it owns the stored bytes, and the bytes stay resolvable
//! until that handle is passed back to [`ViewStore::release`].

use std::collections::HashMap;

use bytes::Bytes;
use serde::Serialize;
use uuid::Uuid;

use crate::error::CoreError;
use crate::types::Timestamp;

/// Path prefix under which stored videos are served.
pub const VIEW_URL_PREFIX: &str = "/videos";

/// Owning reference to one stored video.
#[derive(Debug, PartialEq, Eq, Serialize)]
pub struct VideoHandle {
    id: Uuid,
}

impl VideoHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Locally resolvable URL for the stored bytes.
    pub fn url(&self) -> String {
        view_url(self.id)
    }
}

/// Build the view URL for a stored video id.
pub fn view_url(id: Uuid) -> String {
    format!("{VIEW_URL_PREFIX}/{id}")
}

/// Bytes and metadata kept for one handle.
#[derive(Debug, Clone)]
pub struct StoredVideo {
    pub bytes: Bytes,
    pub content_type: String,
    pub created_at: Timestamp,
}

#[derive(Debug, Default)]
pub struct ViewStore {
    entries: HashMap<Uuid, StoredVideo>,
}

impl ViewStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take ownership of a payload and return its handle.
    pub fn insert(&mut self, bytes: Bytes, content_type: &str) -> VideoHandle {
        let id = Uuid::new_v4();
        self.entries.insert(
            id,
            StoredVideo {
                bytes,
                content_type: content_type.to_string(),
                created_at: chrono::Utc::now(),
            },
        );
        VideoHandle { id }
    }

    pub fn resolve(&self, id: Uuid) -> Result<&StoredVideo, CoreError> {
        self.entries.get(&id).ok_or(CoreError::NotFound {
            entity: "Video",
            id,
        })
    }

    /// Drop the bytes behind `handle`. Returns `false` if they were already gone.
    pub fn release(&mut self, handle: VideoHandle) -> bool {
        self.entries.remove(&handle.id).is_some()
    }

    /// Number of handles still holding bytes.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
