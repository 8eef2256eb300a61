//! In-memory storage implementation for document stores.
//!
//! This module provides a simple but powerful in-memory backend that stores
//! documents as BSON values in HashMaps with async-safe read-write locks.

use async_trait::async_trait;
use bson::{Bson, Uuid};
use mea::rwlock::RwLock;
use std::{cmp::Ordering, collections::HashMap, sync::Arc};

use docshape_core::{
    backend::{StoreBackend, StoreBackendBuilder},
    error::{DocumentStoreError, DocumentStoreResult},
    query::{Query, SortDirection},
};

use crate::evaluator::{Comparable, DocumentEvaluator};

type CollectionMap = HashMap<Uuid, Bson>;
type DatabaseMap = HashMap<String, CollectionMap>;
type StoreMap = HashMap<String, DatabaseMap>;

/// Thread-safe in-memory document storage backend.
///
/// This struct implements the [`StoreBackend`] trait to provide a fully
/// functional document store that operates entirely in memory using
/// async-aware read-write locks. Documents are stored as BSON values indexed
/// by database, collection, and UUID.
///
/// # Thread Safety
///
/// `InMemoryStore` is cloneable and uses an `Arc`-wrapped internal state,
/// allowing it to be safely shared across async tasks. Multiple clones of the
/// same instance share the same underlying data.
///
/// # Performance
///
/// Queries scan all documents in a collection (no indexing). For small to
/// medium datasets (< 100k documents), this is typically acceptable. For
/// larger datasets, consider using a persistent backend like MongoDB.
#[derive(Default, Clone, Debug)]
pub struct InMemoryStore {
    /// The main storage map: database -> collection -> (document_id -> document)
    store: Arc<RwLock<StoreMap>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory document store.
    ///
    /// The returned store is ready for use and contains no collections or documents.
    pub fn new() -> Self {
        Self {
            store: Arc::new(RwLock::new(StoreMap::new())),
        }
    }

    /// Creates a builder for constructing an `InMemoryStore` with custom options.
    ///
    /// Currently, the builder simply creates a default store, but it can be
    /// extended in future versions to support configuration options.
    pub fn builder() -> InMemoryStoreBuilder {
        InMemoryStoreBuilder::default()
    }
}

#[async_trait]
impl StoreBackend for InMemoryStore {
    async fn insert_documents(
        &self,
        documents: Vec<(Uuid, Bson)>,
        database: &str,
        collection: &str,
    ) -> DocumentStoreResult<()> {
        let mut store = self.store.write().await;
        let collection_map = store
            .entry(database.to_string())
            .or_default()
            .entry(collection.to_string())
            .or_default();

        for (id, doc) in documents {
            if collection_map.contains_key(&id) {
                return Err(DocumentStoreError::DocumentAlreadyExists(
                    id.to_string(),
                    collection.to_string(),
                ));
            }

            collection_map.insert(id, doc);
        }

        Ok(())
    }

    async fn update_documents(
        &self,
        documents: Vec<(Uuid, Bson)>,
        database: &str,
        collection: &str,
    ) -> DocumentStoreResult<()> {
        let mut store = self.store.write().await;
        let collection_map = store
            .get_mut(database)
            .and_then(|db| db.get_mut(collection))
            .ok_or_else(|| DocumentStoreError::CollectionNotFound(collection.to_string()))?;

        for (id, doc) in documents {
            if !collection_map.contains_key(&id) {
                return Err(DocumentStoreError::DocumentNotFound(
                    id.to_string(),
                    collection.to_string(),
                ));
            }

            collection_map.insert(id, doc);
        }

        Ok(())
    }

    async fn delete_documents(
        &self,
        ids: Vec<Uuid>,
        database: &str,
        collection: &str,
    ) -> DocumentStoreResult<()> {
        let mut store = self.store.write().await;
        let collection_map = store
            .get_mut(database)
            .and_then(|db| db.get_mut(collection))
            .ok_or_else(|| DocumentStoreError::CollectionNotFound(collection.to_string()))?;

        for id in ids {
            if collection_map.remove(&id).is_none() {
                return Err(DocumentStoreError::DocumentNotFound(
                    id.to_string(),
                    collection.to_string(),
                ));
            }
        }

        Ok(())
    }

    async fn get_documents(
        &self,
        ids: Vec<Uuid>,
        database: &str,
        collection: &str,
    ) -> DocumentStoreResult<Vec<Bson>> {
        let store = self.store.read().await;
        let collection_map = match store
            .get(database)
            .and_then(|db| db.get(collection))
        {
            Some(col) => col,
            None => return Ok(vec![]),
        };

        let mut documents = Vec::with_capacity(ids.len());

        for id in ids {
            if let Some(doc) = collection_map.get(&id) {
                documents.push(doc.clone());
            }
        }

        Ok(documents)
    }

    async fn query_documents(
        &self,
        query: Query,
        database: &str,
        collection: &str,
    ) -> DocumentStoreResult<Vec<(Uuid, Bson)>> {
        let store = self.store.read().await;
        let collection_map = match store
            .get(database)
            .and_then(|db| db.get(collection))
        {
            Some(col) => col,
            None => return Ok(vec![]),
        };

        let mut matches = match &query.filter {
            Some(filter) => DocumentEvaluator::filter_documents(collection_map.iter(), filter)?,
            None => collection_map
                .iter()
                .map(|(id, doc)| (*id, doc.clone()))
                .collect::<Vec<_>>(),
        };

        match &query.sort {
            Some(sort) => {
                matches.sort_by(|(_, a), (_, b)| {
                    let left = a
                        .as_document()
                        .and_then(|doc| doc.get(&sort.field))
                        .map(Comparable::from)
                        .unwrap_or(Comparable::Null);
                    let right = b
                        .as_document()
                        .and_then(|doc| doc.get(&sort.field))
                        .map(Comparable::from)
                        .unwrap_or(Comparable::Null);

                    match sort.direction {
                        SortDirection::Asc => left.partial_cmp(&right).unwrap_or(Ordering::Equal),
                        SortDirection::Desc => right.partial_cmp(&left).unwrap_or(Ordering::Equal),
                    }
                });
            }
            // Hash map order is arbitrary; sort by ID so unsorted queries
            // still page deterministically.
            None => matches.sort_by(|(a, _), (b, _)| a.bytes().cmp(&b.bytes())),
        }

        Ok(matches
            .into_iter()
            .skip(query.offset.unwrap_or(0))
            .take(query.limit.unwrap_or(usize::MAX))
            .collect())
    }

    async fn set_field(
        &self,
        id: Uuid,
        field: &str,
        value: Bson,
        database: &str,
        collection: &str,
    ) -> DocumentStoreResult<()> {
        let mut store = self.store.write().await;
        let collection_map = store
            .get_mut(database)
            .and_then(|db| db.get_mut(collection))
            .ok_or_else(|| DocumentStoreError::CollectionNotFound(collection.to_string()))?;

        let doc = collection_map
            .get_mut(&id)
            .ok_or_else(|| {
                DocumentStoreError::DocumentNotFound(id.to_string(), collection.to_string())
            })?;

        match doc.as_document_mut() {
            Some(doc_map) => {
                doc_map.insert(field.to_string(), value);
                Ok(())
            }
            None => Err(DocumentStoreError::InvalidDocument(format!(
                "document '{}' in collection '{}' is not a BSON document",
                id, collection
            ))),
        }
    }

    async fn unset_fields(
        &self,
        fields: &[String],
        database: &str,
        collection: &str,
    ) -> DocumentStoreResult<()> {
        let mut store = self.store.write().await;

        // A missing collection has no fields to remove; treat it like an
        // empty one so repeated cleanups stay idempotent.
        let collection_map = match store
            .get_mut(database)
            .and_then(|db| db.get_mut(collection))
        {
            Some(col) => col,
            None => return Ok(()),
        };

        for doc in collection_map.values_mut() {
            if let Some(doc_map) = doc.as_document_mut() {
                for field in fields {
                    doc_map.remove(field);
                }
            }
        }

        Ok(())
    }

    async fn create_collection(&self, database: &str, name: &str) -> DocumentStoreResult<()> {
        self.store
            .write()
            .await
            .entry(database.to_string())
            .or_default()
            .entry(name.to_string())
            .or_insert_with(HashMap::new);

        Ok(())
    }

    async fn drop_collection(&self, database: &str, name: &str) -> DocumentStoreResult<()> {
        let mut store = self.store.write().await;

        if store
            .get_mut(database)
            .and_then(|db| db.remove(name))
            .is_none()
        {
            return Err(DocumentStoreError::CollectionNotFound(name.to_string()));
        }

        Ok(())
    }

    async fn list_collections(&self, database: &str) -> DocumentStoreResult<Vec<String>> {
        Ok(self
            .store
            .read()
            .await
            .get(database)
            .map(|db| db.keys().cloned().collect())
            .unwrap_or_default())
    }
}

/// Builder for constructing [`InMemoryStore`] instances.
///
/// Currently a no-op builder, but can be extended in future versions to
/// support configuration options like capacity hints or concurrency settings.
#[derive(Default)]
pub struct InMemoryStoreBuilder;

#[async_trait]
impl StoreBackendBuilder for InMemoryStoreBuilder {
    type Backend = InMemoryStore;

    /// Builds and returns a new [`InMemoryStore`] instance.
    ///
    /// This always succeeds and returns a freshly initialized store.
    async fn build(self) -> DocumentStoreResult<Self::Backend> {
        Ok(InMemoryStore::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;
    use docshape_core::query::Filter;

    fn document(fields: bson::Document) -> (Uuid, Bson) {
        (Uuid::new(), Bson::Document(fields))
    }

    #[tokio::test]
    async fn insert_and_get_roundtrip() {
        let store = InMemoryStore::new();
        let (id, doc) = document(doc! { "name": "ada" });

        store
            .insert_documents(vec![(id, doc.clone())], "app", "users")
            .await
            .unwrap();

        let fetched = store
            .get_documents(vec![id], "app", "users")
            .await
            .unwrap();
        assert_eq!(fetched, vec![doc]);
    }

    #[tokio::test]
    async fn duplicate_insert_is_rejected() {
        let store = InMemoryStore::new();
        let (id, doc) = document(doc! { "name": "ada" });

        store
            .insert_documents(vec![(id, doc.clone())], "app", "users")
            .await
            .unwrap();
        let result = store
            .insert_documents(vec![(id, doc)], "app", "users")
            .await;

        assert!(matches!(
            result,
            Err(DocumentStoreError::DocumentAlreadyExists(_, _))
        ));
    }

    #[tokio::test]
    async fn databases_are_isolated() {
        let store = InMemoryStore::new();
        let (id, doc) = document(doc! { "name": "ada" });

        store
            .insert_documents(vec![(id, doc)], "app", "users")
            .await
            .unwrap();

        let other = store
            .get_documents(vec![id], "staging", "users")
            .await
            .unwrap();
        assert!(other.is_empty());
    }

    #[tokio::test]
    async fn query_missing_field_returns_ids() {
        let store = InMemoryStore::new();
        let (old_id, old) = document(doc! { "name": "ada" });
        let (new_id, new) = document(doc! { "name": "grace", "version": 2 });

        store
            .insert_documents(vec![(old_id, old), (new_id, new)], "app", "users")
            .await
            .unwrap();

        let query = Query::builder()
            .filter(Filter::not_exists("version"))
            .build();
        let matches = store
            .query_documents(query, "app", "users")
            .await
            .unwrap();

        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].0, old_id);
    }

    #[tokio::test]
    async fn set_field_touches_one_document_only() {
        let store = InMemoryStore::new();
        let (first, doc_a) = document(doc! { "name": "ada" });
        let (second, doc_b) = document(doc! { "name": "grace" });

        store
            .insert_documents(vec![(first, doc_a), (second, doc_b)], "app", "users")
            .await
            .unwrap();
        store
            .set_field(first, "version", Bson::Int32(2), "app", "users")
            .await
            .unwrap();

        let fetched = store
            .get_documents(vec![first, second], "app", "users")
            .await
            .unwrap();
        let versions = fetched
            .iter()
            .map(|doc| {
                doc.as_document()
                    .unwrap()
                    .get("version")
                    .cloned()
            })
            .collect::<Vec<_>>();
        assert!(versions.contains(&Some(Bson::Int32(2))));
        assert!(versions.contains(&None));
    }

    #[tokio::test]
    async fn unset_fields_sweeps_the_collection() {
        let store = InMemoryStore::new();
        let (first, doc_a) = document(doc! { "name": "ada", "nickname": "al" });
        let (second, doc_b) = document(doc! { "name": "grace" });

        store
            .insert_documents(vec![(first, doc_a), (second, doc_b)], "app", "users")
            .await
            .unwrap();
        store
            .unset_fields(&["nickname".to_string()], "app", "users")
            .await
            .unwrap();

        let fetched = store
            .get_documents(vec![first, second], "app", "users")
            .await
            .unwrap();
        assert!(fetched.iter().all(|doc| {
            doc.as_document()
                .unwrap()
                .get("nickname")
                .is_none()
        }));

        // Repeating the cleanup, or aiming it at a missing collection, is a no-op.
        store
            .unset_fields(&["nickname".to_string()], "app", "users")
            .await
            .unwrap();
        store
            .unset_fields(&["nickname".to_string()], "app", "ghosts")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn sort_and_limit_apply_after_filtering() {
        let store = InMemoryStore::new();
        let docs = [30, 10, 20]
            .iter()
            .map(|age| document(doc! { "age": *age }))
            .collect::<Vec<_>>();

        store
            .insert_documents(docs, "app", "users")
            .await
            .unwrap();

        let query = Query::builder()
            .sort("age", SortDirection::Desc)
            .limit(2)
            .build();
        let matches = store
            .query_documents(query, "app", "users")
            .await
            .unwrap();

        let ages = matches
            .iter()
            .map(|(_, doc)| {
                doc.as_document()
                    .unwrap()
                    .get("age")
                    .and_then(Bson::as_i32)
                    .unwrap()
            })
            .collect::<Vec<_>>();
        assert_eq!(ages, vec![30, 20]);
    }
}
