//! Note Store
//!
//! Target of validated note batches. The pipeline only needs "write this batch, tell me
//! how many rows landed"; `MemoryStore` is the in-process implementation.

use super::validator::Note;

use anyhow::Result;
use dashmap::DashMap;
use std::collections::BTreeSet;
use std::future::Future;

pub trait NoteStore: Send + Sync {
    /// Persists `batch` and returns the number of notes written.
    fn execute(&self, batch: Vec<Note>) -> impl Future<Output = Result<usize>> + Send;
}

/// Notes keyed by id; a later batch replaces earlier versions of the same note.
#[derive(Default)]
pub struct MemoryStore {
    notes: DashMap<u64, Note>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    pub fn get(&self, id: u64) -> Option<Note> {
        self.notes.get(&id).map(|entry| entry.value().clone())
    }

    pub fn ids(&self) -> BTreeSet<u64> {
        self.notes.iter().map(|entry| *entry.key()).collect()
    }
}

impl NoteStore for MemoryStore {
    async fn execute(&self, batch: Vec<Note>) -> Result<usize> {
        let written = batch.len();
        for note in batch {
            self.notes.insert(note.id, note);
        }
        tracing::trace!("Stored {} note(s), {} total", written, self.notes.len());
        Ok(written)
    }
}
