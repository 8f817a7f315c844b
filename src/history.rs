//! Generation history: the most recent synthesized clips, newest first.

use crate::constants::HISTORY_CAPACITY;
use crate::decoder::RawAudioPayload;
use crate::voice::VoiceName;
use chrono::{DateTime, Utc};
use rand::Rng;
use std::collections::VecDeque;

/// One remembered generation. `text` is the text as typed, before any
/// voice-specific rewrite.
#[derive(Clone, Debug)]
pub struct HistoryEntry {
    pub id: String,
    pub text: String,
    pub voice: VoiceName,
    pub audio: RawAudioPayload,
    pub created_at: DateTime<Utc>,
}

/// Newest-first list of past generations, capped at a fixed capacity.
#[derive(Debug, Default)]
pub struct History {
    entries: VecDeque<HistoryEntry>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prepends an entry, evicting the oldest entry past the capacity.
    pub fn push(&mut self, entry: HistoryEntry) {
        self.entries.push_front(entry);
        self.entries.truncate(HISTORY_CAPACITY);
    }

    pub fn get(&self, id: &str) -> Option<&HistoryEntry> {
        self.entries.iter().find(|entry| entry.id == id)
    }

    /// Removes and returns the entry with the given id.
    pub fn remove(&mut self, id: &str) -> Option<HistoryEntry> {
        let index = self.entries.iter().position(|entry| entry.id == id)?;
        self.entries.remove(index)
    }

    /// Entries in newest-first order.
    pub fn iter(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Millisecond timestamp plus a random tag, so entries created within the
/// same millisecond still get distinct ids.
pub fn generate_entry_id() -> String {
    let tag: u32 = rand::rng().random();
    format!("{}-{:08x}", Utc::now().timestamp_millis(), tag)
}
