//! Cached copy of the backend's indexed document list.
//!
//! The backend is the source of truth. The cache is replaced wholesale
//! whenever a listing request succeeds and emptied on clear; between those
//! it may be stale.

use chrono::{DateTime, Utc};

#[derive(Debug, Default, Clone)]
pub struct DocumentListing {
    files: Vec<String>,
    refreshed_at: Option<DateTime<Utc>>,
}

impl DocumentListing {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn files(&self) -> &[String] {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// When the listing last came back from the backend.
    pub fn refreshed_at(&self) -> Option<DateTime<Utc>> {
        self.refreshed_at
    }

    pub fn replace(&mut self, files: Vec<String>) {
        self.files = files;
        self.refreshed_at = Some(Utc::now());
    }

    pub fn clear(&mut self) {
        self.files.clear();
        self.refreshed_at = None;
    }
}
