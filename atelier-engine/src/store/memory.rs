//! In-memory store
//!
//! The local backend: a map of collections guarded by an RwLock. Used as the
//! standalone (no-database) deployment mode and as the test double for every
//! service test.

use std::collections::HashMap;

use serde_json::Value;
use tokio::sync::{RwLock, broadcast};

use super::{ChangeEvent, ChangeKind, Store, StoreError};

pub struct MemoryStore {
    collections: RwLock<HashMap<String, HashMap<String, Value>>>,
    changes: broadcast::Sender<ChangeEvent>,
}

impl MemoryStore {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(256);
        Self {
            collections: RwLock::new(HashMap::new()),
            changes,
        }
    }

    fn emit(&self, collection: &str, id: &str, kind: ChangeKind) {
        // No receivers is fine; the feed is best-effort.
        let _ = self.changes.send(ChangeEvent {
            collection: collection.to_string(),
            id: id.to_string(),
            kind,
        });
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Store for MemoryStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, StoreError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.get(id))
            .cloned())
    }

    async fn put(&self, collection: &str, id: &str, doc: Value) -> Result<(), StoreError> {
        let mut collections = self.collections.write().await;
        collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), doc);
        drop(collections);
        self.emit(collection, id, ChangeKind::Put);
        Ok(())
    }

    async fn merge(&self, collection: &str, id: &str, fields: Value) -> Result<(), StoreError> {
        let mut collections = self.collections.write().await;
        let docs = collections.entry(collection.to_string()).or_default();
        let entry = docs.entry(id.to_string()).or_insert(Value::Null);
        match (entry.as_object_mut(), fields.as_object()) {
            (Some(existing), Some(patch)) => {
                for (key, value) in patch {
                    existing.insert(key.clone(), value.clone());
                }
            }
            _ => *entry = fields,
        }
        drop(collections);
        self.emit(collection, id, ChangeKind::Put);
        Ok(())
    }

    async fn put_versioned(
        &self,
        collection: &str,
        id: &str,
        doc: Value,
        expected_version: u64,
    ) -> Result<bool, StoreError> {
        let mut collections = self.collections.write().await;
        let Some(docs) = collections.get_mut(collection) else {
            return Ok(false);
        };
        let Some(existing) = docs.get(id) else {
            return Ok(false);
        };
        let current = existing.get("version").and_then(Value::as_u64).unwrap_or(0);
        if current != expected_version {
            return Ok(false);
        }
        docs.insert(id.to_string(), doc);
        drop(collections);
        self.emit(collection, id, ChangeKind::Put);
        Ok(true)
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        let mut collections = self.collections.write().await;
        if let Some(docs) = collections.get_mut(collection) {
            docs.remove(id);
        }
        drop(collections);
        self.emit(collection, id, ChangeKind::Delete);
        Ok(())
    }

    async fn list(&self, collection: &str) -> Result<Vec<Value>, StoreError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .map(|docs| docs.values().cloned().collect())
            .unwrap_or_default())
    }

    fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.changes.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_put_and_get() {
        let store = MemoryStore::new();
        store.put("batches", "b1", json!({"x": 1})).await.unwrap();
        let doc = store.get("batches", "b1").await.unwrap();
        assert_eq!(doc, Some(json!({"x": 1})));
    }

    #[tokio::test]
    async fn test_get_missing_is_none() {
        let store = MemoryStore::new();
        assert!(store.get("batches", "nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_merge_patches_top_level_fields() {
        let store = MemoryStore::new();
        store
            .put("batches", "b1", json!({"a": 1, "b": 2}))
            .await
            .unwrap();
        store
            .merge("batches", "b1", json!({"b": 3, "c": 4}))
            .await
            .unwrap();
        let doc = store.get("batches", "b1").await.unwrap();
        assert_eq!(doc, Some(json!({"a": 1, "b": 3, "c": 4})));
    }

    #[tokio::test]
    async fn test_put_versioned_matches() {
        let store = MemoryStore::new();
        store
            .put("batches", "b1", json!({"version": 2, "flag": false}))
            .await
            .unwrap();
        let written = store
            .put_versioned("batches", "b1", json!({"version": 3, "flag": true}), 2)
            .await
            .unwrap();
        assert!(written);
        let doc = store.get("batches", "b1").await.unwrap().unwrap();
        assert_eq!(doc["version"], 3);
    }

    #[tokio::test]
    async fn test_put_versioned_stale_version_rejected() {
        let store = MemoryStore::new();
        store
            .put("batches", "b1", json!({"version": 5}))
            .await
            .unwrap();
        let written = store
            .put_versioned("batches", "b1", json!({"version": 6}), 4)
            .await
            .unwrap();
        assert!(!written);
        let doc = store.get("batches", "b1").await.unwrap().unwrap();
        assert_eq!(doc["version"], 5);
    }

    #[tokio::test]
    async fn test_put_versioned_missing_doc_rejected() {
        let store = MemoryStore::new();
        let written = store
            .put_versioned("batches", "gone", json!({"version": 1}), 0)
            .await
            .unwrap();
        assert!(!written);
    }

    #[tokio::test]
    async fn test_delete_and_list() {
        let store = MemoryStore::new();
        store.put("projects", "p1", json!({"n": 1})).await.unwrap();
        store.put("projects", "p2", json!({"n": 2})).await.unwrap();
        store.delete("projects", "p1").await.unwrap();
        let docs = store.list("projects").await.unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0]["n"], 2);
    }

    #[tokio::test]
    async fn test_subscribe_sees_writes() {
        let store = MemoryStore::new();
        let mut rx = store.subscribe();
        store.put("batches", "b1", json!({})).await.unwrap();
        let event = rx.recv().await.unwrap();
        assert_eq!(event.collection, "batches");
        assert_eq!(event.id, "b1");
        assert_eq!(event.kind, ChangeKind::Put);
    }
}
