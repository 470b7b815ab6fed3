//! Persistence layer
//!
//! A generic keyed-document interface; the engine treats the remote
//! (Postgres) and local (in-memory) implementations interchangeably. The
//! backend is chosen once at construction in `main`, never probed at call
//! sites.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::broadcast;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Document collections used by the engine.
pub mod collections {
    pub const PROJECTS: &str = "projects";
    pub const BATCHES: &str = "batches";
    /// Singleton configuration documents (pipeline definition, permissions).
    pub const CONFIG: &str = "config";
}

/// Ids of the singleton documents in [`collections::CONFIG`].
pub const PIPELINE_DOC: &str = "pipeline";
pub const PERMISSIONS_DOC: &str = "permissions";

/// Store error type
#[derive(Debug)]
pub enum StoreError {
    Database(sqlx::Error),
    Serialization(serde_json::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Database(err)
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err)
    }
}

/// A change emitted by a store after a committed write.
#[derive(Debug, Clone)]
pub struct ChangeEvent {
    pub collection: String,
    pub id: String,
    pub kind: ChangeKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Put,
    Delete,
}

/// Keyed-document store.
///
/// `merge` patches top-level fields of an existing document; `put_versioned`
/// writes only when the stored document's `version` field equals
/// `expected_version`, giving callers an optimistic claim primitive.
#[async_trait]
pub trait Store: Send + Sync {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, StoreError>;

    async fn put(&self, collection: &str, id: &str, doc: Value) -> Result<(), StoreError>;

    async fn merge(&self, collection: &str, id: &str, fields: Value) -> Result<(), StoreError>;

    /// Returns `false` (without writing) when the version check fails or the
    /// document is gone.
    async fn put_versioned(
        &self,
        collection: &str,
        id: &str,
        doc: Value,
        expected_version: u64,
    ) -> Result<bool, StoreError>;

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError>;

    async fn list(&self, collection: &str) -> Result<Vec<Value>, StoreError>;

    /// In-process change feed over committed writes.
    fn subscribe(&self) -> broadcast::Receiver<ChangeEvent>;
}

/// Load and deserialize one document.
pub async fn load<T: DeserializeOwned>(
    store: &dyn Store,
    collection: &str,
    id: &str,
) -> Result<Option<T>, StoreError> {
    match store.get(collection, id).await? {
        Some(value) => Ok(Some(serde_json::from_value(value)?)),
        None => Ok(None),
    }
}

/// Serialize and persist one document.
pub async fn save<T: Serialize>(
    store: &dyn Store,
    collection: &str,
    id: &str,
    doc: &T,
) -> Result<(), StoreError> {
    store
        .put(collection, id, serde_json::to_value(doc)?)
        .await
}

/// Load and deserialize every document in a collection.
pub async fn load_all<T: DeserializeOwned>(
    store: &dyn Store,
    collection: &str,
) -> Result<Vec<T>, StoreError> {
    let mut out = Vec::new();
    for value in store.list(collection).await? {
        out.push(serde_json::from_value(value)?);
    }
    Ok(out)
}
