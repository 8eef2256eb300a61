//! Collection handles for document store operations.
//!
//! This module provides the handles used to work with the documents of one
//! `(database, collection)` pair. It offers a typed handle (with full type
//! safety over a [`Document`] implementation) and untyped handles working on
//! raw BSON, including a dynamic-dispatch variant used by the migration engine.
//!
//! # Collection Types
//!
//! - [`Collection`] - Untyped handle with explicit BSON documents
//! - [`TypedCollection`] - Type-safe handle for a specific document type
//! - [`DynCollection`] - Dynamic dispatch version of the untyped handle

use bson::{Bson, Uuid};
use std::marker::PhantomData;

use crate::{
    backend::{DynStoreBackend, StoreBackend},
    document::{Document, DocumentExt},
    error::DocumentStoreResult,
    page::{Page, PaginationParams},
    query::Query,
};

/// An untyped collection handle borrowing a storage backend.
///
/// All documents are represented as BSON values, providing maximum flexibility
/// but without compile-time type safety.
#[derive(Debug)]
pub struct Collection<'a, B: StoreBackend> {
    database: String,
    name: String,
    backend: &'a B,
}

impl<'a, B: StoreBackend> Collection<'a, B> {
    pub(crate) fn new(database: String, name: String, backend: &'a B) -> Self {
        Self { database, name, backend }
    }

    /// Returns the name of the database this collection lives in.
    pub fn database(&self) -> &str {
        &self.database
    }

    /// Returns the name of this collection.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Inserts new documents into the collection.
    pub async fn insert(&self, documents: Vec<(Uuid, Bson)>) -> DocumentStoreResult<()> {
        self.backend
            .insert_documents(documents, &self.database, &self.name)
            .await
    }

    /// Updates existing documents in the collection, replacing them entirely.
    pub async fn update(&self, documents: Vec<(Uuid, Bson)>) -> DocumentStoreResult<()> {
        self.backend
            .update_documents(documents, &self.database, &self.name)
            .await
    }

    /// Deletes documents from the collection by their IDs.
    pub async fn delete<U>(&self, ids: Vec<U>) -> DocumentStoreResult<()>
    where
        U: Into<Uuid> + Send + Sync + 'static,
    {
        self.backend
            .delete_documents(
                ids.into_iter()
                    .map(Into::into)
                    .collect(),
                &self.database,
                &self.name,
            )
            .await
    }

    /// Retrieves documents from the collection by their IDs.
    ///
    /// IDs that don't exist are omitted from the result.
    pub async fn get<U>(&self, ids: Vec<U>) -> DocumentStoreResult<Vec<Bson>>
    where
        U: Into<Uuid> + Send + Sync + 'static,
    {
        self.backend
            .get_documents(
                ids.into_iter()
                    .map(Into::into)
                    .collect(),
                &self.database,
                &self.name,
            )
            .await
    }

    /// Queries documents in the collection, returning `(id, document)` pairs.
    pub async fn query(&self, query: Query) -> DocumentStoreResult<Vec<(Uuid, Bson)>> {
        self.backend
            .query_documents(query, &self.database, &self.name)
            .await
    }

    /// Sets one field on the document with the given ID (point update).
    pub async fn set_field(
        &self,
        id: Uuid,
        field: &str,
        value: impl Into<Bson>,
    ) -> DocumentStoreResult<()> {
        self.backend
            .set_field(id, field, value.into(), &self.database, &self.name)
            .await
    }

    /// Removes the named fields from every document in the collection.
    pub async fn unset_fields(&self, fields: &[String]) -> DocumentStoreResult<()> {
        self.backend
            .unset_fields(fields, &self.database, &self.name)
            .await
    }
}

/// A dynamic (type-erased) collection handle borrowing a backend trait object.
///
/// Functionally identical to [`Collection`] but usable where the backend type
/// is erased — this is the handle the migration engine works through.
#[derive(Debug)]
pub struct DynCollection<'a> {
    database: String,
    name: String,
    backend: &'a dyn DynStoreBackend,
}

impl<'a> DynCollection<'a> {
    pub(crate) fn new(database: String, name: String, backend: &'a dyn DynStoreBackend) -> Self {
        Self { database, name, backend }
    }

    /// Returns the name of the database this collection lives in.
    pub fn database(&self) -> &str {
        &self.database
    }

    /// Returns the name of this collection.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Inserts new documents into the collection.
    pub async fn insert(&self, documents: Vec<(Uuid, Bson)>) -> DocumentStoreResult<()> {
        self.backend
            .insert_documents(documents, &self.database, &self.name)
            .await
    }

    /// Updates existing documents in the collection, replacing them entirely.
    pub async fn update(&self, documents: Vec<(Uuid, Bson)>) -> DocumentStoreResult<()> {
        self.backend
            .update_documents(documents, &self.database, &self.name)
            .await
    }

    /// Deletes documents from the collection by their IDs.
    pub async fn delete<U>(&self, ids: Vec<U>) -> DocumentStoreResult<()>
    where
        U: Into<Uuid> + Send + Sync + 'static,
    {
        self.backend
            .delete_documents(
                ids.into_iter()
                    .map(Into::into)
                    .collect(),
                &self.database,
                &self.name,
            )
            .await
    }

    /// Retrieves documents from the collection by their IDs.
    pub async fn get<U>(&self, ids: Vec<U>) -> DocumentStoreResult<Vec<Bson>>
    where
        U: Into<Uuid> + Send + Sync + 'static,
    {
        self.backend
            .get_documents(
                ids.into_iter()
                    .map(Into::into)
                    .collect(),
                &self.database,
                &self.name,
            )
            .await
    }

    /// Queries documents in the collection, returning `(id, document)` pairs.
    pub async fn query(&self, query: Query) -> DocumentStoreResult<Vec<(Uuid, Bson)>> {
        self.backend
            .query_documents(query, &self.database, &self.name)
            .await
    }

    /// Sets one field on the document with the given ID (point update).
    pub async fn set_field(
        &self,
        id: Uuid,
        field: &str,
        value: impl Into<Bson>,
    ) -> DocumentStoreResult<()> {
        self.backend
            .set_field(id, field, value.into(), &self.database, &self.name)
            .await
    }

    /// Removes the named fields from every document in the collection.
    pub async fn unset_fields(&self, fields: &[String]) -> DocumentStoreResult<()> {
        self.backend
            .unset_fields(fields, &self.database, &self.name)
            .await
    }
}

/// A type-safe collection handle for a specific [`Document`] type.
///
/// Serialization to and from BSON happens at this boundary; the backend below
/// only ever sees raw documents.
#[derive(Debug)]
pub struct TypedCollection<'a, B: StoreBackend, D: Document> {
    database: String,
    name: String,
    backend: &'a B,
    _marker: PhantomData<D>,
}

impl<'a, B: StoreBackend, D: Document> TypedCollection<'a, B, D> {
    pub(crate) fn new(database: String, name: String, backend: &'a B) -> Self {
        Self { database, name, backend, _marker: PhantomData }
    }

    /// Returns the name of the database this collection lives in.
    pub fn database(&self) -> &str {
        &self.database
    }

    /// Returns the name of this collection.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Inserts new documents into the collection.
    pub async fn insert(&self, documents: Vec<D>) -> DocumentStoreResult<()> {
        self.backend
            .insert_documents(
                documents
                    .into_iter()
                    .map(|d| {
                        d.to_bson()
                            .map(move |b| (*d.id(), b))
                    })
                    .collect::<Result<Vec<(Uuid, Bson)>, _>>()?,
                &self.database,
                &self.name,
            )
            .await
    }

    /// Updates existing documents in the collection.
    pub async fn update(&self, documents: Vec<D>) -> DocumentStoreResult<()> {
        self.backend
            .update_documents(
                documents
                    .into_iter()
                    .map(|d| {
                        d.to_bson()
                            .map(move |b| (*d.id(), b))
                    })
                    .collect::<Result<Vec<(Uuid, Bson)>, _>>()?,
                &self.database,
                &self.name,
            )
            .await
    }

    /// Deletes documents from the collection by their IDs.
    pub async fn delete<U>(&self, ids: Vec<U>) -> DocumentStoreResult<()>
    where
        U: Into<Uuid> + Send + Sync + 'static,
    {
        self.backend
            .delete_documents(
                ids.into_iter()
                    .map(Into::into)
                    .collect(),
                &self.database,
                &self.name,
            )
            .await
    }

    /// Retrieves documents from the collection by their IDs.
    ///
    /// IDs that don't exist are omitted from the result.
    pub async fn get<U>(&self, ids: Vec<U>) -> DocumentStoreResult<Vec<D>>
    where
        U: Into<Uuid> + Send + Sync + 'static,
    {
        self.backend
            .get_documents(
                ids.into_iter()
                    .map(Into::into)
                    .collect(),
                &self.database,
                &self.name,
            )
            .await?
            .into_iter()
            .map(D::from_bson)
            .collect::<Result<Vec<D>, _>>()
    }

    /// Queries documents in the collection using a structured query.
    pub async fn query(&self, query: Query) -> DocumentStoreResult<Vec<D>> {
        self.backend
            .query_documents(query, &self.database, &self.name)
            .await?
            .into_iter()
            .map(|(_, doc)| D::from_bson(doc))
            .collect::<Result<Vec<D>, _>>()
    }

    /// Queries documents and returns one page of the results.
    ///
    /// The query's own limit and offset are ignored; pagination is driven by
    /// `params` so the page metadata reflects the full match count.
    pub async fn query_page(
        &self,
        mut query: Query,
        params: PaginationParams,
    ) -> DocumentStoreResult<Page<D>> {
        query.limit = None;
        query.offset = None;

        Ok(params.paginate(self.query(query).await?))
    }
}
