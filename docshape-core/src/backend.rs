//! Storage backend abstraction for the document store.
//!
//! This module defines the core traits that abstract over different storage
//! implementations, allowing the document store to work with various backends
//! (in-memory, MongoDB, etc.).
//!
//! # Overview
//!
//! The [`StoreBackend`] trait provides a unified async interface for all storage
//! operations: document insertion, retrieval, deletion, querying, field-level
//! updates, and collection management. Every document operation is addressed by a
//! `(database, collection)` pair; documents themselves are addressed by the
//! store-assigned [`Uuid`] identity they were inserted under.
//!
//! Two operations exist specifically for schema migration:
//!
//! - [`StoreBackend::set_field`] — a point update that writes one field on one
//!   document, leaving every other field and document untouched.
//! - [`StoreBackend::unset_fields`] — a single bulk update that removes a set of
//!   field names from every document in a collection.
//!
//! # Traits
//!
//! - [`StoreBackend`]: the core trait for storage backends
//! - [`DynStoreBackend`]: object-safe mirror for dynamic dispatch
//! - [`StoreBackendBuilder`]: async factory trait for creating backend instances

use async_trait::async_trait;
use bson::{Bson, Uuid};
use std::fmt::Debug;

use crate::{error::DocumentStoreResult, query::Query};

/// Abstract interface for document storage backends.
///
/// Implementers of this trait provide concrete storage strategies for documents.
/// All implementations must be thread-safe and support concurrent access from
/// multiple async tasks; the exact concurrency model is implementation-specific.
///
/// Operations return [`DocumentStoreResult<T>`](crate::error::DocumentStoreResult).
/// Implementers should document which error variants each operation may return.
#[async_trait]
pub trait StoreBackend: Send + Sync + Debug {
    /// Inserts new documents into a collection.
    ///
    /// If a document with the same ID already exists, the backend returns
    /// [`DocumentStoreError::DocumentAlreadyExists`](crate::error::DocumentStoreError).
    /// The collection is created automatically if it doesn't exist.
    async fn insert_documents(
        &self,
        documents: Vec<(Uuid, Bson)>,
        database: &str,
        collection: &str,
    ) -> DocumentStoreResult<()>;

    /// Updates existing documents in a collection, replacing them entirely.
    ///
    /// If a document with the specified ID does not exist, the backend may treat
    /// this as an error; check the specific backend documentation.
    async fn update_documents(
        &self,
        documents: Vec<(Uuid, Bson)>,
        database: &str,
        collection: &str,
    ) -> DocumentStoreResult<()>;

    /// Deletes documents from a collection by their IDs.
    async fn delete_documents(
        &self,
        ids: Vec<Uuid>,
        database: &str,
        collection: &str,
    ) -> DocumentStoreResult<()>;

    /// Retrieves documents from a collection by their IDs.
    ///
    /// Documents are returned in store order; IDs that don't exist are omitted
    /// from the result.
    async fn get_documents(
        &self,
        ids: Vec<Uuid>,
        database: &str,
        collection: &str,
    ) -> DocumentStoreResult<Vec<Bson>>;

    /// Queries documents in a collection using a structured query.
    ///
    /// Returns `(id, document)` pairs so callers can address each match by its
    /// store identity afterwards — the migration engine relies on this to issue
    /// point updates against exactly the documents it inspected.
    async fn query_documents(
        &self,
        query: Query,
        database: &str,
        collection: &str,
    ) -> DocumentStoreResult<Vec<(Uuid, Bson)>>;

    /// Sets a single field on a single document, addressed by its ID.
    ///
    /// This is a point update: no other field of the document and no other
    /// document may be affected. Writing a field that already exists replaces
    /// its value.
    async fn set_field(
        &self,
        id: Uuid,
        field: &str,
        value: Bson,
        database: &str,
        collection: &str,
    ) -> DocumentStoreResult<()>;

    /// Removes the named fields from every document in a collection.
    ///
    /// Issued as one bulk operation regardless of collection size. Removing a
    /// field from a document that doesn't carry it is a no-op, which is what
    /// makes repeated migration passes harmless.
    async fn unset_fields(
        &self,
        fields: &[String],
        database: &str,
        collection: &str,
    ) -> DocumentStoreResult<()>;

    /// Creates a new, empty collection with the specified name.
    async fn create_collection(&self, database: &str, name: &str) -> DocumentStoreResult<()>;

    /// Drops a collection and all its documents.
    ///
    /// This operation is irreversible.
    async fn drop_collection(&self, database: &str, name: &str) -> DocumentStoreResult<()>;

    /// Lists the names of all collections in a database.
    async fn list_collections(&self, database: &str) -> DocumentStoreResult<Vec<String>>;

    /// Cleanly shuts down the backend, releasing all resources.
    ///
    /// The default implementation is a no-op; backends with external connections
    /// should override this.
    async fn shutdown(self) -> DocumentStoreResult<()>
    where
        Self: Sized,
    {
        Ok(())
    }
}

/// Object-safe mirror of [`StoreBackend`] for dynamic dispatch.
///
/// Automatically implemented for every `StoreBackend`; used where the concrete
/// backend type is erased, e.g. by the migration engine which runs over any
/// store through a [`DynDocumentStoreRef`](crate::store::DynDocumentStoreRef).
#[async_trait]
pub trait DynStoreBackend: Send + Sync + Debug {
    async fn insert_documents(
        &self,
        documents: Vec<(Uuid, Bson)>,
        database: &str,
        collection: &str,
    ) -> DocumentStoreResult<()>;
    async fn update_documents(
        &self,
        documents: Vec<(Uuid, Bson)>,
        database: &str,
        collection: &str,
    ) -> DocumentStoreResult<()>;
    async fn delete_documents(
        &self,
        ids: Vec<Uuid>,
        database: &str,
        collection: &str,
    ) -> DocumentStoreResult<()>;
    async fn get_documents(
        &self,
        ids: Vec<Uuid>,
        database: &str,
        collection: &str,
    ) -> DocumentStoreResult<Vec<Bson>>;
    async fn query_documents(
        &self,
        query: Query,
        database: &str,
        collection: &str,
    ) -> DocumentStoreResult<Vec<(Uuid, Bson)>>;
    async fn set_field(
        &self,
        id: Uuid,
        field: &str,
        value: Bson,
        database: &str,
        collection: &str,
    ) -> DocumentStoreResult<()>;
    async fn unset_fields(
        &self,
        fields: &[String],
        database: &str,
        collection: &str,
    ) -> DocumentStoreResult<()>;
    async fn create_collection(&self, database: &str, name: &str) -> DocumentStoreResult<()>;
    async fn drop_collection(&self, database: &str, name: &str) -> DocumentStoreResult<()>;
    async fn list_collections(&self, database: &str) -> DocumentStoreResult<Vec<String>>;
}

#[async_trait]
impl<B: StoreBackend + 'static> DynStoreBackend for B {
    async fn insert_documents(
        &self,
        documents: Vec<(Uuid, Bson)>,
        database: &str,
        collection: &str,
    ) -> DocumentStoreResult<()> {
        self.insert_documents(documents, database, collection)
            .await
    }

    async fn update_documents(
        &self,
        documents: Vec<(Uuid, Bson)>,
        database: &str,
        collection: &str,
    ) -> DocumentStoreResult<()> {
        self.update_documents(documents, database, collection)
            .await
    }

    async fn delete_documents(
        &self,
        ids: Vec<Uuid>,
        database: &str,
        collection: &str,
    ) -> DocumentStoreResult<()> {
        self.delete_documents(ids, database, collection)
            .await
    }

    async fn get_documents(
        &self,
        ids: Vec<Uuid>,
        database: &str,
        collection: &str,
    ) -> DocumentStoreResult<Vec<Bson>> {
        self.get_documents(ids, database, collection)
            .await
    }

    async fn query_documents(
        &self,
        query: Query,
        database: &str,
        collection: &str,
    ) -> DocumentStoreResult<Vec<(Uuid, Bson)>> {
        self.query_documents(query, database, collection)
            .await
    }

    async fn set_field(
        &self,
        id: Uuid,
        field: &str,
        value: Bson,
        database: &str,
        collection: &str,
    ) -> DocumentStoreResult<()> {
        self.set_field(id, field, value, database, collection)
            .await
    }

    async fn unset_fields(
        &self,
        fields: &[String],
        database: &str,
        collection: &str,
    ) -> DocumentStoreResult<()> {
        self.unset_fields(fields, database, collection)
            .await
    }

    async fn create_collection(&self, database: &str, name: &str) -> DocumentStoreResult<()> {
        self.create_collection(database, name).await
    }

    async fn drop_collection(&self, database: &str, name: &str) -> DocumentStoreResult<()> {
        self.drop_collection(database, name).await
    }

    async fn list_collections(&self, database: &str) -> DocumentStoreResult<Vec<String>> {
        self.list_collections(database).await
    }
}

/// Async factory trait for creating backend instances.
#[async_trait]
pub trait StoreBackendBuilder {
    type Backend: StoreBackend;

    async fn build(self) -> DocumentStoreResult<Self::Backend>;
}
