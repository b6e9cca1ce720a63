//! Record store: one storage interface, three interchangeable backends
//!
//! Backends deal in raw JSON documents keyed by string; [`Store`] wraps
//! whichever backend is configured and does the typed (de)serialization.
//!
//! - [`embedded::EmbeddedStore`] - redb database file (default)
//! - [`file::JsonFileStore`] - a single pretty-printed JSON document
//! - [`hosted::HostedStore`] - PostgREST tables (Supabase) over HTTPS

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::config::StorageBackend;
use crate::model::Record;

pub mod embedded;
pub mod file;
pub mod hosted;

pub use embedded::EmbeddedStore;
pub use file::JsonFileStore;
pub use hosted::HostedStore;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("embedded database error: {0}")]
    Embedded(#[from] redb::Error),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("hosted backend request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("hosted backend returned {status}: {body}")]
    Hosted { status: u16, body: String },

    #[error("corrupt record in {collection}: {reason}")]
    Corrupt {
        collection: &'static str,
        reason: String,
    },
}

/// The named collections every backend provides
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    QrCodes,
    Folders,
    Users,
}

impl Collection {
    pub const ALL: [Collection; 3] = [Collection::QrCodes, Collection::Folders, Collection::Users];

    /// Table name (hosted, embedded) or top-level key (file)
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::QrCodes => "qrcodes",
            Collection::Folders => "folders",
            Collection::Users => "users",
        }
    }
}

/// What happens to the QR codes inside a folder being removed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FolderRemoval {
    /// Keep the QR codes and clear their `folderId`
    Unlink,
    /// Delete the QR codes together with the folder
    Cascade,
}

/// Storage interface implemented by every backend
///
/// Documents are JSON objects using the camelCase record layout.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Short backend name for logs and `/health`
    fn name(&self) -> &'static str;

    async fn get(&self, collection: Collection, key: &str) -> StoreResult<Option<Value>>;

    /// Inserts only if `key` is free; returns `false` when it is already taken
    async fn insert(&self, collection: Collection, key: &str, doc: Value) -> StoreResult<bool>;

    /// Inserts or replaces
    async fn put(&self, collection: Collection, key: &str, doc: Value) -> StoreResult<()>;

    /// Returns `false` when nothing was stored under `key`
    async fn delete(&self, collection: Collection, key: &str) -> StoreResult<bool>;

    async fn list(&self, collection: Collection) -> StoreResult<Vec<Value>>;

    /// Deletes a folder and unlinks or deletes its QR codes
    ///
    /// Returns `false` (and changes nothing) when the folder does not exist.
    async fn remove_folder(&self, folder_id: &str, mode: FolderRemoval) -> StoreResult<bool>;
}

/// Typed handle over the configured backend, cheap to clone
#[derive(Clone)]
pub struct Store {
    backend: Arc<dyn RecordStore>,
}

impl Store {
    pub fn new(backend: impl RecordStore + 'static) -> Self {
        Self {
            backend: Arc::new(backend),
        }
    }

    /// Opens the backend selected in the configuration
    pub fn open(backend: &StorageBackend) -> StoreResult<Self> {
        let store = match backend {
            StorageBackend::Embedded { path } => Self::new(EmbeddedStore::open(path)?),
            StorageBackend::File { path } => Self::new(JsonFileStore::new(path)),
            StorageBackend::Hosted { url, key } => Self::new(HostedStore::new(url, key)?),
        };
        tracing::info!(backend = store.backend_name(), "record store ready");
        Ok(store)
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    pub async fn get<R: Record>(&self, key: &str) -> StoreResult<Option<R>> {
        match self.backend.get(R::COLLECTION, key).await? {
            Some(doc) => decode::<R>(doc).map(Some),
            None => Ok(None),
        }
    }

    pub async fn insert<R: Record>(&self, record: &R) -> StoreResult<bool> {
        let doc = serde_json::to_value(record)?;
        self.backend.insert(R::COLLECTION, &record.key(), doc).await
    }

    pub async fn put<R: Record>(&self, record: &R) -> StoreResult<()> {
        let doc = serde_json::to_value(record)?;
        self.backend.put(R::COLLECTION, &record.key(), doc).await
    }

    pub async fn delete<R: Record>(&self, key: &str) -> StoreResult<bool> {
        self.backend.delete(R::COLLECTION, key).await
    }

    /// Every record of the collection; unreadable rows are logged and skipped
    pub async fn list<R: Record>(&self) -> StoreResult<Vec<R>> {
        let docs = self.backend.list(R::COLLECTION).await?;
        let records = docs
            .into_iter()
            .filter_map(|doc| match decode::<R>(doc) {
                Ok(record) => Some(record),
                Err(err) => {
                    tracing::warn!(error = %err, "skipping unreadable record");
                    None
                }
            })
            .collect();
        Ok(records)
    }

    pub async fn remove_folder(&self, folder_id: &str, mode: FolderRemoval) -> StoreResult<bool> {
        self.backend.remove_folder(folder_id, mode).await
    }
}

fn decode<R: Record>(doc: Value) -> StoreResult<R> {
    serde_json::from_value(doc).map_err(|err| StoreError::Corrupt {
        collection: R::COLLECTION.as_str(),
        reason: err.to_string(),
    })
}

/// Whether a stored QR document is filed under `folder_id`
pub(crate) fn in_folder(doc: &Value, folder_id: &str) -> bool {
    doc.get("folderId").and_then(Value::as_str) == Some(folder_id)
}

/// Clears the folder reference of a stored QR document
pub(crate) fn unlink_folder(doc: &mut Value) {
    if let Some(fields) = doc.as_object_mut() {
        fields.insert("folderId".to_string(), Value::Null);
    }
}
