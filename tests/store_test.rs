//! The same behavior checks run against every storage backend
//!
//! The hosted backend talks to a small in-process PostgREST stand-in.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::any,
    Json, Router,
};
use chrono::Utc;
use serde_json::Value;
use tempfile::TempDir;
use tokio::net::TcpListener;

use dynaqr::model::{Folder, QrCode, Role, User};
use dynaqr::store::{EmbeddedStore, FolderRemoval, HostedStore, JsonFileStore, Store};

const API_KEY: &str = "test-service-key";

fn qr(id: &str, folder_id: Option<&str>) -> QrCode {
    QrCode {
        id: id.to_string(),
        name: Some(format!("QR {id}")),
        destination_url: format!("https://example.com/{id}"),
        folder_id: folder_id.map(str::to_string),
        created_at: Utc::now(),
        updated_at: None,
        nfc_link: None,
        user_id: Some(1),
        deleted_at: None,
    }
}

fn folder(id: &str) -> Folder {
    Folder {
        id: id.to_string(),
        name: format!("Folder {id}"),
        parent_id: None,
        user_id: Some(1),
        created_at: Utc::now(),
    }
}

async fn check_records(store: &Store) {
    let first = qr("abc123", None);

    assert!(store.insert(&first).await.unwrap());
    assert!(!store.insert(&first).await.unwrap(), "duplicate insert must be refused");
    assert_eq!(store.get::<QrCode>("abc123").await.unwrap(), Some(first.clone()));
    assert_eq!(store.get::<QrCode>("zzz999").await.unwrap(), None);

    let mut edited = first.clone();
    edited.destination_url = "https://example.com/edited".to_string();
    store.put(&edited).await.unwrap();
    assert_eq!(
        store.get::<QrCode>("abc123").await.unwrap().unwrap().destination_url,
        "https://example.com/edited"
    );

    let user = User {
        id: 4,
        email: "dana@example.com".to_string(),
        password_hash: "hash".to_string(),
        role: Role::User,
        qr_limit: 12,
        created_at: Utc::now(),
    };
    store.put(&user).await.unwrap();
    assert_eq!(store.get::<User>("4").await.unwrap(), Some(user));

    assert_eq!(store.list::<QrCode>().await.unwrap().len(), 1);
    assert!(store.delete::<QrCode>("abc123").await.unwrap());
    assert!(!store.delete::<QrCode>("abc123").await.unwrap());
    assert!(store.list::<QrCode>().await.unwrap().is_empty());
}

async fn check_folder_removal(store: &Store) {
    store.put(&folder("f1")).await.unwrap();
    store.put(&folder("f2")).await.unwrap();
    store.put(&qr("inF1aa", Some("f1"))).await.unwrap();
    store.put(&qr("inF1bb", Some("f1"))).await.unwrap();
    store.put(&qr("inF2aa", Some("f2"))).await.unwrap();
    store.put(&qr("loose1", None)).await.unwrap();

    assert!(!store.remove_folder("nope", FolderRemoval::Cascade).await.unwrap());
    assert_eq!(store.list::<QrCode>().await.unwrap().len(), 4);

    // Unlink keeps the codes
    assert!(store.remove_folder("f1", FolderRemoval::Unlink).await.unwrap());
    assert!(store.get::<Folder>("f1").await.unwrap().is_none());
    for id in ["inF1aa", "inF1bb"] {
        let kept = store.get::<QrCode>(id).await.unwrap().unwrap();
        assert_eq!(kept.folder_id, None, "{id}");
    }

    // Cascade removes only the codes filed in that folder
    assert!(store.remove_folder("f2", FolderRemoval::Cascade).await.unwrap());
    assert!(store.get::<Folder>("f2").await.unwrap().is_none());
    assert!(store.get::<QrCode>("inF2aa").await.unwrap().is_none());
    let mut remaining: Vec<String> = store
        .list::<QrCode>()
        .await
        .unwrap()
        .into_iter()
        .map(|qr| qr.id)
        .collect();
    remaining.sort();
    assert_eq!(remaining, vec!["inF1aa", "inF1bb", "loose1"]);
}

#[tokio::test]
async fn test_embedded_store() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("records.db");
    let store = Store::new(EmbeddedStore::open(path.to_str().unwrap()).unwrap());

    assert_eq!(store.backend_name(), "embedded");
    check_records(&store).await;
    check_folder_removal(&store).await;
}

#[tokio::test]
async fn test_file_store() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("db.json");
    let store = Store::new(JsonFileStore::new(&path));

    assert_eq!(store.backend_name(), "file");
    check_records(&store).await;
    check_folder_removal(&store).await;

    // Survives a reopen
    let reopened = Store::new(JsonFileStore::new(&path));
    assert_eq!(reopened.list::<QrCode>().await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_hosted_store() {
    let base_url = spawn_postgrest().await;
    let store = Store::new(HostedStore::new(&base_url, API_KEY).unwrap());

    assert_eq!(store.backend_name(), "hosted");
    check_records(&store).await;
    check_folder_removal(&store).await;
}

#[tokio::test]
async fn test_hosted_store_surfaces_errors() {
    // Nothing listens here
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let store = Store::new(HostedStore::new(&format!("http://{addr}"), API_KEY).unwrap());
    assert!(store.get::<QrCode>("abc123").await.is_err());
}

#[tokio::test]
async fn test_hosted_store_rejected_key() {
    let base_url = spawn_postgrest().await;
    let store = Store::new(HostedStore::new(&base_url, "wrong-key").unwrap());

    assert!(store.list::<QrCode>().await.is_err());
}

// In-process PostgREST stand-in: tables of snake_case rows keyed by `id`.

type Tables = Arc<Mutex<HashMap<String, BTreeMap<String, Value>>>>;

async fn spawn_postgrest() -> String {
    let tables: Tables = Arc::default();
    let app = Router::new()
        .route("/rest/v1/{table}", any(postgrest))
        .with_state(tables);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{addr}")
}

/// Matches `?column=eq.value` filters
fn matches(row: &Value, filters: &[(String, String)]) -> bool {
    filters.iter().all(|(column, value)| match row.get(column) {
        Some(Value::String(s)) => s == value,
        Some(Value::Number(n)) => n.to_string() == *value,
        _ => false,
    })
}

async fn postgrest(
    State(tables): State<Tables>,
    Path(table): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let authorized = headers.get("apikey").is_some_and(|key| key == API_KEY)
        && headers
            .get("authorization")
            .is_some_and(|auth| auth == format!("Bearer {API_KEY}").as_str());
    if !authorized {
        return (StatusCode::UNAUTHORIZED, "invalid api key").into_response();
    }

    let filters: Vec<(String, String)> = params
        .iter()
        .filter(|(column, _)| column.as_str() != "select")
        .filter_map(|(column, value)| {
            value
                .strip_prefix("eq.")
                .map(|value| (column.clone(), value.to_string()))
        })
        .collect();
    let body: Option<Value> = serde_json::from_slice(&body).ok();
    let prefer = headers
        .get("prefer")
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();

    let mut tables = tables.lock().unwrap();
    let rows = tables.entry(table).or_default();

    match method {
        Method::GET => {
            let found: Vec<Value> = rows
                .values()
                .filter(|row| matches(row, &filters))
                .cloned()
                .collect();
            Json(found).into_response()
        }
        Method::POST => {
            let Some(row) = body else {
                return StatusCode::BAD_REQUEST.into_response();
            };
            let Some(id) = row.get("id").map(|id| match id {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            }) else {
                return StatusCode::BAD_REQUEST.into_response();
            };
            if rows.contains_key(&id) && !prefer.contains("merge-duplicates") {
                return (StatusCode::CONFLICT, "duplicate key").into_response();
            }
            rows.insert(id, row);
            StatusCode::CREATED.into_response()
        }
        Method::PATCH => {
            let Some(Value::Object(changes)) = body else {
                return StatusCode::BAD_REQUEST.into_response();
            };
            for row in rows.values_mut().filter(|row| matches(row, &filters)) {
                if let Some(fields) = row.as_object_mut() {
                    for (column, value) in &changes {
                        fields.insert(column.clone(), value.clone());
                    }
                }
            }
            StatusCode::NO_CONTENT.into_response()
        }
        Method::DELETE => {
            let doomed: Vec<String> = rows
                .iter()
                .filter(|(_, row)| matches(row, &filters))
                .map(|(id, _)| id.clone())
                .collect();
            let removed: Vec<Value> = doomed.iter().filter_map(|id| rows.remove(id)).collect();
            if prefer.contains("return=representation") {
                Json(removed).into_response()
            } else {
                StatusCode::NO_CONTENT.into_response()
            }
        }
        _ => StatusCode::METHOD_NOT_ALLOWED.into_response(),
    }
}
