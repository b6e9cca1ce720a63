//! Embedded redb backend
//!
//! Each collection is a redb table mapping the record key to its
//! JSON-serialized document:
//!
//! - Key: `"aB3dE8xY"`
//! - Value: `'{"id":"aB3dE8xY","destinationUrl":"https://example.com",...}'`
//!
//! Folder removal runs in a single write transaction, so a cascade either
//! removes the folder and all of its QR codes or nothing at all.

use std::sync::Arc;

use async_trait::async_trait;
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use serde_json::Value;

use super::{in_folder, unlink_folder, Collection, FolderRemoval, RecordStore, StoreError, StoreResult};

pub const TABLE_QRCODES: TableDefinition<&str, &str> = TableDefinition::new("qrcodes_v1");
pub const TABLE_FOLDERS: TableDefinition<&str, &str> = TableDefinition::new("folders_v1");
pub const TABLE_USERS: TableDefinition<&str, &str> = TableDefinition::new("users_v1");

fn table(collection: Collection) -> TableDefinition<'static, &'static str, &'static str> {
    match collection {
        Collection::QrCodes => TABLE_QRCODES,
        Collection::Folders => TABLE_FOLDERS,
        Collection::Users => TABLE_USERS,
    }
}

// redb reports each phase with its own error type; fold them into one variant.
macro_rules! from_redb {
    ($($ty:ty),*) => {
        $(impl From<$ty> for StoreError {
            fn from(err: $ty) -> Self {
                StoreError::Embedded(err.into())
            }
        })*
    };
}

from_redb!(
    redb::DatabaseError,
    redb::TransactionError,
    redb::TableError,
    redb::StorageError,
    redb::CommitError
);

/// Initializes the embedded database and creates every collection table
///
/// # Example
///
/// ```no_run
/// # use dynaqr::store::embedded::init_db;
/// let db = init_db("data.db").expect("Failed to initialize database");
/// ```
pub fn init_db(db_path: &str) -> Result<Database, redb::Error> {
    let db = Database::create(db_path)?;

    let write_txn = db.begin_write()?;
    {
        for collection in Collection::ALL {
            write_txn.open_table(table(collection))?;
        }
    }
    write_txn.commit()?;

    Ok(db)
}

#[derive(Clone)]
pub struct EmbeddedStore {
    db: Arc<Database>,
}

impl EmbeddedStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub fn open(db_path: &str) -> Result<Self, redb::Error> {
        Ok(Self::new(Arc::new(init_db(db_path)?)))
    }

    fn read_raw(&self, collection: Collection, key: &str) -> StoreResult<Option<String>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(table(collection))?;
        let raw = table.get(key)?.map(|guard| guard.value().to_string());
        Ok(raw)
    }

    fn insert_raw(&self, collection: Collection, key: &str, doc: &str) -> StoreResult<bool> {
        let write_txn = self.db.begin_write()?;
        let inserted = {
            let mut table = write_txn.open_table(table(collection))?;
            if table.get(key)?.is_some() {
                false
            } else {
                table.insert(key, doc)?;
                true
            }
        };

        if inserted {
            write_txn.commit()?;
        } else {
            write_txn.abort()?;
        }
        Ok(inserted)
    }

    fn put_raw(&self, collection: Collection, key: &str, doc: &str) -> StoreResult<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(table(collection))?;
            table.insert(key, doc)?;
        }
        write_txn.commit()?;
        Ok(())
    }

    fn delete_raw(&self, collection: Collection, key: &str) -> StoreResult<bool> {
        let write_txn = self.db.begin_write()?;
        let removed = {
            let mut table = write_txn.open_table(table(collection))?;
            let removed = table.remove(key)?.is_some();
            removed
        };
        write_txn.commit()?;
        Ok(removed)
    }

    fn list_raw(&self, collection: Collection) -> StoreResult<Vec<String>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(table(collection))?;

        let mut docs = Vec::new();
        for entry in table.iter()? {
            let (_, value) = entry?;
            docs.push(value.value().to_string());
        }
        Ok(docs)
    }

    fn remove_folder_txn(&self, folder_id: &str, mode: FolderRemoval) -> StoreResult<bool> {
        let write_txn = self.db.begin_write()?;
        let removed = {
            let mut folders = write_txn.open_table(TABLE_FOLDERS)?;
            let existed = folders.remove(folder_id)?.is_some();

            if existed {
                let mut qrcodes = write_txn.open_table(TABLE_QRCODES)?;

                let mut filed = Vec::new();
                for entry in qrcodes.iter()? {
                    let (key, value) = entry?;
                    let doc: Value = serde_json::from_str(value.value())?;
                    if in_folder(&doc, folder_id) {
                        filed.push((key.value().to_string(), doc));
                    }
                }

                for (key, mut doc) in filed {
                    match mode {
                        FolderRemoval::Cascade => {
                            qrcodes.remove(key.as_str())?;
                        }
                        FolderRemoval::Unlink => {
                            unlink_folder(&mut doc);
                            let raw = serde_json::to_string(&doc)?;
                            qrcodes.insert(key.as_str(), raw.as_str())?;
                        }
                    }
                }
            }
            existed
        };

        if removed {
            write_txn.commit()?;
        } else {
            write_txn.abort()?;
        }
        Ok(removed)
    }
}

#[async_trait]
impl RecordStore for EmbeddedStore {
    fn name(&self) -> &'static str {
        "embedded"
    }

    async fn get(&self, collection: Collection, key: &str) -> StoreResult<Option<Value>> {
        match self.read_raw(collection, key)? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    async fn insert(&self, collection: Collection, key: &str, doc: Value) -> StoreResult<bool> {
        let raw = serde_json::to_string(&doc)?;
        self.insert_raw(collection, key, &raw)
    }

    async fn put(&self, collection: Collection, key: &str, doc: Value) -> StoreResult<()> {
        let raw = serde_json::to_string(&doc)?;
        self.put_raw(collection, key, &raw)
    }

    async fn delete(&self, collection: Collection, key: &str) -> StoreResult<bool> {
        self.delete_raw(collection, key)
    }

    async fn list(&self, collection: Collection) -> StoreResult<Vec<Value>> {
        self.list_raw(collection)?
            .iter()
            .map(|raw| serde_json::from_str(raw).map_err(StoreError::from))
            .collect()
    }

    async fn remove_folder(&self, folder_id: &str, mode: FolderRemoval) -> StoreResult<bool> {
        self.remove_folder_txn(folder_id, mode)
    }
}
