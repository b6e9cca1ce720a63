//! Flat JSON file backend
//!
//! The whole state is one pretty-printed document:
//!
//! ```json
//! {
//!   "folders": { "<id>": { ... } },
//!   "qrcodes": { "aB3dE8xY": { "id": "aB3dE8xY", "destinationUrl": "...", ... } },
//!   "users": { "1": { ... } }
//! }
//! ```
//!
//! A missing or empty file reads as an empty document. Writers take an async
//! mutex around the read-modify-write cycle and replace the file through a
//! rename, so readers never see a half-written document.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;

use super::{in_folder, unlink_folder, Collection, FolderRemoval, RecordStore, StoreResult};

type Document = BTreeMap<String, BTreeMap<String, Value>>;

pub struct JsonFileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            write_lock: Mutex::new(()),
        }
    }

    async fn load(&self) -> StoreResult<Document> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) if content.trim().is_empty() => Ok(Document::new()),
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(Document::new()),
            Err(err) => Err(err.into()),
        }
    }

    async fn save(&self, mut doc: Document) -> StoreResult<()> {
        for collection in Collection::ALL {
            doc.entry(collection.as_str().to_string()).or_default();
        }
        let content = serde_json::to_string_pretty(&doc)?;

        let mut staging = OsString::from(self.path.as_os_str());
        staging.push(".tmp");
        let staging = PathBuf::from(staging);

        tokio::fs::write(&staging, content).await?;
        tokio::fs::rename(&staging, &self.path).await?;
        Ok(())
    }

    /// Runs one read-modify-write cycle; `apply` reports whether it changed anything
    async fn update<T, F>(&self, apply: F) -> StoreResult<T>
    where
        T: Send,
        F: FnOnce(&mut Document) -> (T, bool) + Send,
    {
        let _guard = self.write_lock.lock().await;
        let mut doc = self.load().await?;
        let (outcome, changed) = apply(&mut doc);
        if changed {
            self.save(doc).await?;
        }
        Ok(outcome)
    }
}

#[async_trait]
impl RecordStore for JsonFileStore {
    fn name(&self) -> &'static str {
        "file"
    }

    async fn get(&self, collection: Collection, key: &str) -> StoreResult<Option<Value>> {
        let mut doc = self.load().await?;
        Ok(doc
            .get_mut(collection.as_str())
            .and_then(|records| records.remove(key)))
    }

    async fn insert(&self, collection: Collection, key: &str, value: Value) -> StoreResult<bool> {
        self.update(|doc| {
            let records = doc.entry(collection.as_str().to_string()).or_default();
            if records.contains_key(key) {
                return (false, false);
            }
            records.insert(key.to_string(), value);
            (true, true)
        })
        .await
    }

    async fn put(&self, collection: Collection, key: &str, value: Value) -> StoreResult<()> {
        self.update(|doc| {
            doc.entry(collection.as_str().to_string())
                .or_default()
                .insert(key.to_string(), value);
            ((), true)
        })
        .await
    }

    async fn delete(&self, collection: Collection, key: &str) -> StoreResult<bool> {
        self.update(|doc| {
            let removed = doc
                .get_mut(collection.as_str())
                .and_then(|records| records.remove(key))
                .is_some();
            (removed, removed)
        })
        .await
    }

    async fn list(&self, collection: Collection) -> StoreResult<Vec<Value>> {
        let mut doc = self.load().await?;
        Ok(doc
            .remove(collection.as_str())
            .map(|records| records.into_values().collect())
            .unwrap_or_default())
    }

    async fn remove_folder(&self, folder_id: &str, mode: FolderRemoval) -> StoreResult<bool> {
        self.update(|doc| {
            let existed = doc
                .get_mut(Collection::Folders.as_str())
                .and_then(|folders| folders.remove(folder_id))
                .is_some();
            if !existed {
                return (false, false);
            }

            if let Some(qrcodes) = doc.get_mut(Collection::QrCodes.as_str()) {
                match mode {
                    FolderRemoval::Cascade => qrcodes.retain(|_, qr| !in_folder(qr, folder_id)),
                    FolderRemoval::Unlink => qrcodes
                        .values_mut()
                        .filter(|qr| in_folder(qr, folder_id))
                        .for_each(unlink_folder),
                }
            }
            (true, true)
        })
        .await
    }
}
