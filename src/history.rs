//! Persisted list of past analyses, newest first and capped.

use serde::{Deserialize, Serialize};
use time::{OffsetDateTime, format_description::FormatItem, macros::format_description};
use uuid::Uuid;

use crate::{
    keyframes::{Keyframe, overall_score},
    local_store::{HISTORY_KEY, LocalStore, StoreError},
    logging,
};

/// Entries kept after each insert.
pub const MAX_HISTORY_ENTRIES: usize = 10;

const DATE_FORMAT: &[FormatItem<'static>] = format_description!(
    "[month repr:long] [day padding:none], [year], [hour repr:12]:[minute] [period]"
);

/// One completed analysis as shown in the history view.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: String,
    /// Human readable local time, e.g. `June 20, 2025, 04:30 PM`.
    pub date: String,
    pub overall_score: u8,
    pub keyframes: Vec<Keyframe>,
}

/// History backed by a [`LocalStore`].
#[derive(Clone, Debug)]
pub struct HistoryLog {
    store: LocalStore,
}

impl HistoryLog {
    pub fn new(store: LocalStore) -> Self {
        Self { store }
    }

    /// Add an entry for `keyframes` stamped with the current local time.
    pub fn record(&self, keyframes: Vec<Keyframe>) -> Result<HistoryEntry, StoreError> {
        self.record_at(keyframes, logging::now_local_or_utc())
    }

    pub fn record_at(
        &self,
        keyframes: Vec<Keyframe>,
        when: OffsetDateTime,
    ) -> Result<HistoryEntry, StoreError> {
        let entry = HistoryEntry {
            id: Uuid::new_v4().to_string(),
            date: format_entry_date(when),
            overall_score: overall_score(&keyframes),
            keyframes,
        };
        let mut entries = self.entries();
        entries.insert(0, entry.clone());
        entries.truncate(MAX_HISTORY_ENTRIES);
        self.store.set(HISTORY_KEY, &entries)?;
        tracing::info!(
            "Recorded analysis {} with overall score {}",
            entry.id,
            entry.overall_score
        );
        Ok(entry)
    }

    /// Stored entries, newest first. Unreadable history reads as empty.
    pub fn entries(&self) -> Vec<HistoryEntry> {
        match self.store.get::<Vec<HistoryEntry>>(HISTORY_KEY) {
            Ok(entries) => entries.unwrap_or_default(),
            Err(err) => {
                tracing::warn!("Ignoring unreadable analysis history: {err}");
                Vec::new()
            }
        }
    }

    pub fn find(&self, id: &str) -> Option<HistoryEntry> {
        self.entries().into_iter().find(|entry| entry.id == id)
    }

    pub fn clear(&self) -> Result<(), StoreError> {
        self.store.remove(HISTORY_KEY)
    }
}

/// Format a timestamp the way history entries display it.
pub fn format_entry_date(when: OffsetDateTime) -> String {
    when.format(DATE_FORMAT)
        .unwrap_or_else(|_| when.unix_timestamp().to_string())
}
