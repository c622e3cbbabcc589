//! In-memory collection state, one controller per entity type.
//!
//! Controllers mutate their local collection only after the remote call
//! confirms; a failed mutation leaves local state exactly as it was. There
//! is no rollback path because nothing is applied speculatively.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::warn;

use crate::models::{Member, MemberDraft, MemberPatch, Note, NoteDraft, NotePatch};
use crate::store::{MemberStore, NoteStore};

/// The whole team. Constructed once in `main` and shared by reference;
/// every consumer sees the same collection.
pub struct MemberRoster {
    store: Arc<dyn MemberStore>,
    collection: Vec<Member>,
    loading: bool,
    error: Option<String>,
}

impl MemberRoster {
    pub fn new(store: Arc<dyn MemberStore>) -> Self {
        Self {
            store,
            collection: Vec::new(),
            loading: false,
            error: None,
        }
    }

    pub fn members(&self) -> &[Member] {
        &self.collection
    }

    pub fn find(&self, id: &str) -> Option<&Member> {
        self.collection.iter().find(|m| m.id == id)
    }

    pub fn loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Replaces the collection wholesale. A failed fetch discards prior
    /// data and leaves a message in the error slot instead of returning it.
    pub async fn refresh(&mut self) {
        self.loading = true;
        self.error = None;
        match self.store.list().await {
            Ok(members) => self.collection = members,
            Err(err) => {
                warn!("member fetch failed: {err}");
                self.collection.clear();
                self.error = Some("Failed to fetch members".to_string());
            }
        }
        self.loading = false;
    }

    pub async fn create(&mut self, draft: MemberDraft) -> Result<Member> {
        let member = self
            .store
            .create(&draft)
            .await
            .context("Failed to create member")?;
        self.collection.push(member.clone());
        Ok(member)
    }

    pub async fn update(&mut self, id: &str, patch: MemberPatch) -> Result<()> {
        self.store
            .update(id, &patch)
            .await
            .context("Failed to update member")?;
        if let Some(member) = self.collection.iter_mut().find(|m| m.id == id) {
            member.apply(&patch);
        }
        Ok(())
    }

    pub async fn delete(&mut self, id: &str) -> Result<()> {
        self.store
            .delete(id)
            .await
            .context("Failed to delete member")?;
        self.collection.retain(|m| m.id != id);
        Ok(())
    }
}

/// One member's notes, newest first. Constructed per member page and
/// discarded when the page closes; switching members starts fresh.
pub struct NoteLog {
    store: Arc<dyn NoteStore>,
    member_id: String,
    collection: Vec<Note>,
    loading: bool,
    error: Option<String>,
}

impl NoteLog {
    pub fn new(store: Arc<dyn NoteStore>, member_id: String) -> Self {
        Self {
            store,
            member_id,
            collection: Vec::new(),
            loading: false,
            error: None,
        }
    }

    pub fn member_id(&self) -> &str {
        &self.member_id
    }

    pub fn notes(&self) -> &[Note] {
        &self.collection
    }

    pub fn find(&self, id: &str) -> Option<&Note> {
        self.collection.iter().find(|n| n.id == id)
    }

    pub fn loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub async fn refresh(&mut self) {
        self.loading = true;
        self.error = None;
        match self.store.list_for_member(&self.member_id).await {
            Ok(notes) => self.collection = notes,
            Err(err) => {
                warn!(member_id = %self.member_id, "note fetch failed: {err}");
                self.collection.clear();
                self.error = Some("Failed to fetch notes".to_string());
            }
        }
        self.loading = false;
    }

    /// New notes go to the front; the collection stays newest-first as long
    /// as new notes carry the latest date, which the form defaults to.
    pub async fn create(&mut self, draft: NoteDraft) -> Result<Note> {
        let note = self
            .store
            .create(&draft)
            .await
            .context("Failed to create note")?;
        self.collection.insert(0, note.clone());
        Ok(note)
    }

    pub async fn update(&mut self, id: &str, patch: NotePatch) -> Result<()> {
        self.store
            .update(id, &patch)
            .await
            .context("Failed to update note")?;
        if let Some(note) = self.collection.iter_mut().find(|n| n.id == id) {
            note.apply(&patch);
        }
        Ok(())
    }

    pub async fn delete(&mut self, id: &str) -> Result<()> {
        self.store
            .delete(id)
            .await
            .context("Failed to delete note")?;
        self.collection.retain(|n| n.id != id);
        Ok(())
    }

    /// Unflag without opening the full edit form.
    pub async fn resolve_flag(&mut self, id: &str) -> Result<()> {
        self.update(id, NotePatch::resolve_flag()).await
    }
}
