//! Integration tests: the real HTTP adapter and controllers driven against
//! an in-process stub of the document backend.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, NaiveDate, Utc};
use serde_json::{Value, json};

use crate::models::{Member, MemberDraft, MemberPatch, Mood, NoteDraft};
use crate::state::{MemberRoster, NoteLog};
use crate::store::{ApiStore, MemberStore, NOTES_COLLECTION, NoteStore};
use crate::summary::TeamSummary;

/// In-process document backend: generic collections of JSON documents with
/// bearer-token auth, ordered/filtered listing, and sequential ids.
struct StubBackend {
    token: String,
    docs: Mutex<HashMap<String, Vec<Value>>>,
    patches: Mutex<Vec<(String, Value)>>,
    note_list_hits: AtomicUsize,
    fail: AtomicBool,
    next_id: AtomicUsize,
}

impl StubBackend {
    fn new(token: &str) -> Self {
        Self {
            token: token.to_string(),
            docs: Mutex::new(HashMap::new()),
            patches: Mutex::new(Vec::new()),
            note_list_hits: AtomicUsize::new(0),
            fail: AtomicBool::new(false),
            // Ids start at 42 rather than 1 so tests cannot confuse
            // them with counts or list positions.
            next_id: AtomicUsize::new(42),
        }
    }

    fn authorized(&self, headers: &HeaderMap) -> bool {
        let expected = format!("Bearer {}", self.token);
        headers.get("authorization").and_then(|v| v.to_str().ok()) == Some(expected.as_str())
    }

    fn gate(&self, headers: &HeaderMap) -> Option<StatusCode> {
        if !self.authorized(headers) {
            return Some(StatusCode::UNAUTHORIZED);
        }
        if self.fail.load(Ordering::SeqCst) {
            return Some(StatusCode::INTERNAL_SERVER_ERROR);
        }
        None
    }
}

async fn list_docs(
    State(backend): State<Arc<StubBackend>>,
    Path(collection): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    if collection == NOTES_COLLECTION {
        backend.note_list_hits.fetch_add(1, Ordering::SeqCst);
    }
    if let Some(status) = backend.gate(&headers) {
        return status.into_response();
    }

    let mut rows: Vec<Value> = backend
        .docs
        .lock()
        .unwrap()
        .get(&collection)
        .cloned()
        .unwrap_or_default();

    if let Some(wanted) = query.get("userId") {
        let set: Vec<&str> = wanted.split(',').collect();
        rows.retain(|doc| doc["userId"].as_str().is_some_and(|u| set.contains(&u)));
    }
    match query.get("order").map(String::as_str) {
        Some("name") => {
            rows.sort_by_key(|doc| doc["name"].as_str().unwrap_or_default().to_string());
        }
        Some("-date") => rows.sort_by(|a, b| b["date"].as_str().cmp(&a["date"].as_str())),
        _ => {}
    }
    Json(rows).into_response()
}

async fn get_doc(
    State(backend): State<Arc<StubBackend>>,
    Path((collection, id)): Path<(String, String)>,
    headers: HeaderMap,
) -> Response {
    if let Some(status) = backend.gate(&headers) {
        return status.into_response();
    }
    let docs = backend.docs.lock().unwrap();
    let found = docs
        .get(&collection)
        .and_then(|rows| rows.iter().find(|doc| doc["id"].as_str() == Some(id.as_str())));
    match found {
        Some(doc) => Json(doc.clone()).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn insert_doc(
    State(backend): State<Arc<StubBackend>>,
    Path(collection): Path<String>,
    headers: HeaderMap,
    Json(mut doc): Json<Value>,
) -> Response {
    if let Some(status) = backend.gate(&headers) {
        return status.into_response();
    }
    let n = backend.next_id.fetch_add(1, Ordering::SeqCst);
    doc["id"] = json!(n.to_string());
    if collection == NOTES_COLLECTION {
        doc["createdAt"] = json!(Utc::now().to_rfc3339());
    }
    backend
        .docs
        .lock()
        .unwrap()
        .entry(collection)
        .or_default()
        .push(doc.clone());
    (StatusCode::CREATED, Json(doc)).into_response()
}

async fn patch_doc(
    State(backend): State<Arc<StubBackend>>,
    Path((collection, id)): Path<(String, String)>,
    headers: HeaderMap,
    Json(patch): Json<Value>,
) -> Response {
    if let Some(status) = backend.gate(&headers) {
        return status.into_response();
    }
    backend
        .patches
        .lock()
        .unwrap()
        .push((id.clone(), patch.clone()));
    if let Some(rows) = backend.docs.lock().unwrap().get_mut(&collection) {
        if let Some(doc) = rows.iter_mut().find(|doc| doc["id"].as_str() == Some(id.as_str())) {
            if let (Some(target), Some(fields)) = (doc.as_object_mut(), patch.as_object()) {
                for (key, value) in fields {
                    target.insert(key.clone(), value.clone());
                }
            }
        }
    }
    StatusCode::NO_CONTENT.into_response()
}

async fn delete_doc(
    State(backend): State<Arc<StubBackend>>,
    Path((collection, id)): Path<(String, String)>,
    headers: HeaderMap,
) -> Response {
    if let Some(status) = backend.gate(&headers) {
        return status.into_response();
    }
    if let Some(rows) = backend.docs.lock().unwrap().get_mut(&collection) {
        rows.retain(|doc| doc["id"].as_str() != Some(id.as_str()));
    }
    StatusCode::NO_CONTENT.into_response()
}

struct Fixture {
    backend: Arc<StubBackend>,
    base_url: String,
}

impl Fixture {
    async fn new() -> Self {
        let backend = Arc::new(StubBackend::new("test-token"));
        let app = Router::new()
            .route("/v1/{collection}", get(list_docs).post(insert_doc))
            .route(
                "/v1/{collection}/{id}",
                get(get_doc).patch(patch_doc).delete(delete_doc),
            )
            .with_state(Arc::clone(&backend));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            backend,
            base_url: format!("http://{addr}"),
        }
    }

    fn store(&self) -> ApiStore {
        self.store_with_token("test-token")
    }

    fn store_with_token(&self, token: &str) -> ApiStore {
        ApiStore::new(&self.base_url, token).unwrap()
    }
}

fn john() -> MemberDraft {
    MemberDraft {
        name: "John Doe".to_string(),
        role: "Developer".to_string(),
        birthday: NaiveDate::from_ymd_opt(1990, 1, 1).unwrap(),
        hiring_date: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
        location: "New York, NY".to_string(),
    }
}

fn note_draft(member_id: &str, date: (i32, u32, u32), mood: Mood, flag: bool) -> NoteDraft {
    NoteDraft {
        member_id: member_id.to_string(),
        date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
        talking_points: "Discussed project progress.".to_string(),
        mood,
        flag,
        flag_description: flag.then(|| "Workload concerns".to_string()),
        action_items: Vec::new(),
    }
}

#[tokio::test]
async fn creating_a_member_round_trips_the_backend_assigned_id() {
    let fixture = Fixture::new().await;
    let mut roster = MemberRoster::new(Arc::new(fixture.store()));
    roster.refresh().await;
    assert!(roster.members().is_empty());

    let created = roster.create(john()).await.unwrap();

    assert_eq!(created.id, "42");
    assert_eq!(
        roster.members(),
        &[Member {
            id: "42".to_string(),
            name: "John Doe".to_string(),
            role: "Developer".to_string(),
            birthday: NaiveDate::from_ymd_opt(1990, 1, 1).unwrap(),
            hiring_date: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
            location: "New York, NY".to_string(),
        }]
    );
}

#[tokio::test]
async fn notes_come_back_newest_first() {
    let fixture = Fixture::new().await;
    let store = fixture.store();
    NoteStore::create(&store, &note_draft("u1", (2024, 1, 10), Mood::Neutral, false))
        .await
        .unwrap();
    NoteStore::create(&store, &note_draft("u1", (2024, 1, 15), Mood::Happy, false))
        .await
        .unwrap();
    NoteStore::create(&store, &note_draft("u2", (2024, 1, 20), Mood::Sad, false))
        .await
        .unwrap();

    let mut log = NoteLog::new(Arc::new(fixture.store()), "u1".to_string());
    log.refresh().await;

    let dates: Vec<NaiveDate> = log.notes().iter().map(|n| n.date).collect();
    assert_eq!(
        dates,
        [
            NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
        ]
    );
}

#[tokio::test]
async fn getting_a_missing_id_is_the_not_found_sentinel() {
    let fixture = Fixture::new().await;
    let store = fixture.store();

    assert_eq!(MemberStore::get(&store, "nope").await.unwrap(), None);
    assert_eq!(NoteStore::get(&store, "nope").await.unwrap(), None);
}

#[tokio::test]
async fn a_rejected_token_surfaces_as_a_permission_error() {
    let fixture = Fixture::new().await;
    let store = fixture.store_with_token("wrong-token");

    let err = MemberStore::list(&store).await.unwrap_err();
    assert!(err.is_permission(), "got {err}");
}

#[tokio::test]
async fn a_backend_outage_sets_the_error_slot_and_clears_the_roster() {
    let fixture = Fixture::new().await;
    let mut roster = MemberRoster::new(Arc::new(fixture.store()));
    roster.create(john()).await.unwrap();
    assert_eq!(roster.members().len(), 1);

    fixture.backend.fail.store(true, Ordering::SeqCst);
    roster.refresh().await;

    assert!(roster.members().is_empty());
    assert_eq!(roster.error(), Some("Failed to fetch members"));
}

#[tokio::test]
async fn update_sends_only_the_set_fields_and_reconciles_locally() {
    let fixture = Fixture::new().await;
    let mut roster = MemberRoster::new(Arc::new(fixture.store()));
    let created = roster.create(john()).await.unwrap();

    let patch = MemberPatch {
        role: Some("Staff Engineer".to_string()),
        ..MemberPatch::default()
    };
    roster.update(&created.id, patch).await.unwrap();

    let patches = fixture.backend.patches.lock().unwrap();
    assert_eq!(patches.len(), 1);
    assert_eq!(patches[0].0, created.id);
    assert_eq!(patches[0].1, json!({"role": "Staff Engineer"}));
    drop(patches);

    assert_eq!(roster.find(&created.id).unwrap().role, "Staff Engineer");
    let fetched = MemberStore::get(&fixture.store(), &created.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(fetched.role, "Staff Engineer");
    assert_eq!(fetched.name, "John Doe");
}

#[tokio::test]
async fn delete_removes_the_document_remotely_and_locally() {
    let fixture = Fixture::new().await;
    let mut roster = MemberRoster::new(Arc::new(fixture.store()));
    let created = roster.create(john()).await.unwrap();

    roster.delete(&created.id).await.unwrap();

    assert!(roster.members().is_empty());
    assert_eq!(
        MemberStore::get(&fixture.store(), &created.id)
            .await
            .unwrap(),
        None
    );
}

#[tokio::test]
async fn resolve_flag_round_trips_the_restricted_patch() {
    let fixture = Fixture::new().await;
    let mut log = NoteLog::new(Arc::new(fixture.store()), "u1".to_string());
    let note = log
        .create(note_draft("u1", (2024, 1, 15), Mood::Frustrated, true))
        .await
        .unwrap();

    let floor: DateTime<Utc> = "2024-01-01T00:00:00Z".parse().unwrap();
    assert!(note.created_at > floor, "createdAt is server-stamped");

    log.resolve_flag(&note.id).await.unwrap();

    let patches = fixture.backend.patches.lock().unwrap();
    assert_eq!(patches.len(), 1);
    assert_eq!(patches[0].1, json!({"flag": false, "flagDescription": ""}));
    drop(patches);

    let fetched = NoteStore::get(&fixture.store(), &note.id)
        .await
        .unwrap()
        .unwrap();
    assert!(!fetched.flag);
    assert_eq!(fetched.flag_description.as_deref(), Some(""));
    assert_eq!(fetched.talking_points, note.talking_points);
}

#[tokio::test]
async fn summary_folds_the_team_in_one_batched_query() {
    let fixture = Fixture::new().await;
    let store = fixture.store();
    NoteStore::create(&store, &note_draft("m1", (2024, 1, 10), Mood::Frustrated, false))
        .await
        .unwrap();
    NoteStore::create(&store, &note_draft("m1", (2024, 1, 15), Mood::Happy, true))
        .await
        .unwrap();
    NoteStore::create(&store, &note_draft("m3", (2024, 1, 20), Mood::Sad, false))
        .await
        .unwrap();

    let mut summary = TeamSummary::new(Arc::new(fixture.store()));
    summary
        .refresh(&["m1".to_string(), "m2".to_string()])
        .await;

    assert_eq!(fixture.backend.note_list_hits.load(Ordering::SeqCst), 1);

    let m1 = summary.get("m1").unwrap();
    assert_eq!(m1.total_notes, 2);
    assert_eq!(m1.flagged_notes, 1);
    assert_eq!(m1.last_note_mood, Some(Mood::Frustrated));

    let m2 = summary.get("m2").unwrap();
    assert_eq!(m2.total_notes, 0);
    assert_eq!(m2.flagged_notes, 0);
    assert_eq!(m2.last_note_mood, None);

    // m3 was outside the requested set
    assert!(summary.get("m3").is_none());
}
