//! HTTP adapter for the document backend.
//!
//! Collections live server-side; this module speaks the backend's REST
//! dialect (ordered list, filtered list, get-by-id, insert, partial update,
//! delete) and maps every failure onto one [`StoreError`] variant. No
//! retries. The `MemberStore`/`NoteStore` traits are the seam the state
//! layer is written against, so tests can swap in a double.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::warn;

use crate::errors::{StoreError, StoreResult};
use crate::models::{Member, MemberDraft, MemberPatch, Note, NoteDraft, NotePatch};

/// Backend collection holding TeamMember documents.
pub const MEMBERS_COLLECTION: &str = "users";
/// Backend collection holding OneOnOneNote documents.
pub const NOTES_COLLECTION: &str = "oneOnOneNotes";

#[async_trait]
pub trait MemberStore: Send + Sync {
    /// All members, ordered by name ascending (backend-side ordering).
    async fn list(&self) -> StoreResult<Vec<Member>>;
    /// `Ok(None)` when no such document exists.
    async fn get(&self, id: &str) -> StoreResult<Option<Member>>;
    /// Returns the stored entity with its backend-assigned id.
    async fn create(&self, draft: &MemberDraft) -> StoreResult<Member>;
    async fn update(&self, id: &str, patch: &MemberPatch) -> StoreResult<()>;
    async fn delete(&self, id: &str) -> StoreResult<()>;
}

#[async_trait]
pub trait NoteStore: Send + Sync {
    /// One member's notes, ordered by date descending (backend-side ordering).
    async fn list_for_member(&self, member_id: &str) -> StoreResult<Vec<Note>>;
    /// Every note whose member id is in the set, in one round trip.
    async fn list_for_members(&self, member_ids: &[String]) -> StoreResult<Vec<Note>>;
    async fn get(&self, id: &str) -> StoreResult<Option<Note>>;
    /// Returns the stored entity with its backend-assigned id and createdAt.
    async fn create(&self, draft: &NoteDraft) -> StoreResult<Note>;
    async fn update(&self, id: &str, patch: &NotePatch) -> StoreResult<()>;
    async fn delete(&self, id: &str) -> StoreResult<()>;
}

/// The real client. Cheap to clone; `reqwest::Client` shares its pool.
#[derive(Clone, Debug)]
pub struct ApiStore {
    client: Client,
    base_url: String,
    token: String,
}

impl ApiStore {
    pub fn new(base_url: &str, token: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authed(&self, request: RequestBuilder) -> RequestBuilder {
        request.header("Authorization", format!("Bearer {}", self.token))
    }

    /// Sends the request; transport failures and 401/403 become errors here,
    /// every other status is the caller's to interpret.
    async fn send(
        &self,
        request: RequestBuilder,
        wrap: fn(String) -> StoreError,
    ) -> StoreResult<Response> {
        let response = self
            .authed(request)
            .send()
            .await
            .map_err(|e| wrap(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            let detail = failure_detail(response).await;
            warn!("backend refused credentials: {detail}");
            return Err(StoreError::Permission(detail));
        }
        Ok(response)
    }

    async fn list_docs<T: DeserializeOwned>(
        &self,
        collection: &str,
        query: &[(&str, String)],
    ) -> StoreResult<Vec<T>> {
        let request = self
            .client
            .get(self.url(&format!("/v1/{collection}")))
            .query(query);
        let response = self.send(request, StoreError::Fetch).await?;

        if !response.status().is_success() {
            let detail = failure_detail(response).await;
            warn!(collection, "list failed: {detail}");
            return Err(StoreError::Fetch(detail));
        }
        response
            .json()
            .await
            .map_err(|e| StoreError::Fetch(format!("{collection}: bad response body: {e}")))
    }

    async fn get_doc<T: DeserializeOwned>(
        &self,
        collection: &str,
        id: &str,
    ) -> StoreResult<Option<T>> {
        let request = self.client.get(self.url(&format!("/v1/{collection}/{id}")));
        let response = self.send(request, StoreError::Fetch).await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            let detail = failure_detail(response).await;
            warn!(collection, id, "get failed: {detail}");
            return Err(StoreError::Fetch(detail));
        }
        let doc = response
            .json()
            .await
            .map_err(|e| StoreError::Fetch(format!("{collection}: bad response body: {e}")))?;
        Ok(Some(doc))
    }

    async fn insert_doc<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        collection: &str,
        draft: &B,
    ) -> StoreResult<T> {
        let request = self
            .client
            .post(self.url(&format!("/v1/{collection}")))
            .json(draft);
        let response = self.send(request, StoreError::Create).await?;

        if !response.status().is_success() {
            let detail = failure_detail(response).await;
            warn!(collection, "insert failed: {detail}");
            return Err(StoreError::Create(detail));
        }
        response
            .json()
            .await
            .map_err(|e| StoreError::Create(format!("{collection}: bad response body: {e}")))
    }

    async fn patch_doc<B: Serialize + Sync>(
        &self,
        collection: &str,
        id: &str,
        patch: &B,
    ) -> StoreResult<()> {
        let request = self
            .client
            .patch(self.url(&format!("/v1/{collection}/{id}")))
            .json(patch);
        let response = self.send(request, StoreError::Update).await?;

        if !response.status().is_success() {
            let detail = failure_detail(response).await;
            warn!(collection, id, "patch failed: {detail}");
            return Err(StoreError::Update(detail));
        }
        Ok(())
    }

    async fn remove_doc(&self, collection: &str, id: &str) -> StoreResult<()> {
        let request = self
            .client
            .delete(self.url(&format!("/v1/{collection}/{id}")));
        let response = self.send(request, StoreError::Delete).await?;

        if !response.status().is_success() {
            let detail = failure_detail(response).await;
            warn!(collection, id, "delete failed: {detail}");
            return Err(StoreError::Delete(detail));
        }
        Ok(())
    }
}

async fn failure_detail(response: Response) -> String {
    let status = response.status();
    let text = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    format!("status {status}: {text}")
}

#[async_trait]
impl MemberStore for ApiStore {
    async fn list(&self) -> StoreResult<Vec<Member>> {
        self.list_docs(MEMBERS_COLLECTION, &[("order", "name".to_string())])
            .await
    }

    async fn get(&self, id: &str) -> StoreResult<Option<Member>> {
        self.get_doc(MEMBERS_COLLECTION, id).await
    }

    async fn create(&self, draft: &MemberDraft) -> StoreResult<Member> {
        self.insert_doc(MEMBERS_COLLECTION, draft).await
    }

    async fn update(&self, id: &str, patch: &MemberPatch) -> StoreResult<()> {
        self.patch_doc(MEMBERS_COLLECTION, id, patch).await
    }

    async fn delete(&self, id: &str) -> StoreResult<()> {
        self.remove_doc(MEMBERS_COLLECTION, id).await
    }
}

#[async_trait]
impl NoteStore for ApiStore {
    async fn list_for_member(&self, member_id: &str) -> StoreResult<Vec<Note>> {
        self.list_docs(
            NOTES_COLLECTION,
            &[
                ("userId", member_id.to_string()),
                ("order", "-date".to_string()),
            ],
        )
        .await
    }

    async fn list_for_members(&self, member_ids: &[String]) -> StoreResult<Vec<Note>> {
        self.list_docs(NOTES_COLLECTION, &[("userId", member_ids.join(","))])
            .await
    }

    async fn get(&self, id: &str) -> StoreResult<Option<Note>> {
        self.get_doc(NOTES_COLLECTION, id).await
    }

    async fn create(&self, draft: &NoteDraft) -> StoreResult<Note> {
        self.insert_doc(NOTES_COLLECTION, draft).await
    }

    async fn update(&self, id: &str, patch: &NotePatch) -> StoreResult<()> {
        self.patch_doc(NOTES_COLLECTION, id, patch).await
    }

    async fn delete(&self, id: &str) -> StoreResult<()> {
        self.remove_doc(NOTES_COLLECTION, id).await
    }
}
