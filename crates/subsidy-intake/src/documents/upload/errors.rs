use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::documents::slots::SlotId;

/// One user-visible upload failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadErrorEntry {
    pub slot_id: SlotId,
    pub file_name: String,
    pub message: String,
    pub occurred_at: DateTime<Utc>,
}

/// Dismissible list of upload failures, at most one per slot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct UploadErrorList {
    entries: Vec<UploadErrorEntry>,
}

impl UploadErrorList {
    /// A newer failure for the same slot replaces the older one.
    pub fn record(&mut self, entry: UploadErrorEntry) {
        self.entries.retain(|existing| existing.slot_id != entry.slot_id);
        self.entries.push(entry);
    }

    pub fn dismiss(&mut self, slot_id: &SlotId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| &entry.slot_id != slot_id);
        self.entries.len() != before
    }

    pub fn entries(&self) -> &[UploadErrorEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
