//! Per-member digests folded from the note collection.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::warn;

use crate::models::{Note, NotesSummary};
use crate::store::NoteStore;

/// Folds notes into per-member digests. Ids with no notes map to an
/// all-zero digest. Pure, so the rule is testable without a store.
pub fn fold_notes(member_ids: &[String], notes: &[Note]) -> HashMap<String, NotesSummary> {
    let mut map: HashMap<String, NotesSummary> = member_ids
        .iter()
        .map(|id| (id.clone(), NotesSummary::default()))
        .collect();
    let mut earliest: HashMap<&str, NaiveDate> = HashMap::new();

    for note in notes {
        let entry = map.entry(note.member_id.clone()).or_default();
        entry.total_notes += 1;
        if note.flag {
            entry.flagged_notes += 1;
        }
        // The "last" mood badge tracks the EARLIEST-dated note; ties keep
        // the note seen first.
        // TODO: pending a product call on whether this should be the
        // latest mood instead; if so, flip this comparison.
        let earlier = earliest
            .get(note.member_id.as_str())
            .is_none_or(|seen| note.date < *seen);
        if earlier {
            earliest.insert(&note.member_id, note.date);
            entry.last_note_mood = Some(note.mood);
        }
    }
    map
}

/// Team-wide digest map, refreshed with one batched query.
pub struct TeamSummary {
    store: Arc<dyn NoteStore>,
    map: HashMap<String, NotesSummary>,
}

impl TeamSummary {
    pub fn new(store: Arc<dyn NoteStore>) -> Self {
        Self {
            store,
            map: HashMap::new(),
        }
    }

    pub fn get(&self, member_id: &str) -> Option<&NotesSummary> {
        self.map.get(member_id)
    }

    /// An empty id set fetches nothing; a failed fetch keeps whatever
    /// digests we already had.
    pub async fn refresh(&mut self, member_ids: &[String]) {
        if member_ids.is_empty() {
            return;
        }
        match self.store.list_for_members(member_ids).await {
            Ok(notes) => self.map = fold_notes(member_ids, &notes),
            Err(err) => warn!("summary fetch failed: {err}"),
        }
    }
}
