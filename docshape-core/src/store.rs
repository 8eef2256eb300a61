//! Main document store interface for interacting with document backends.
//!
//! This module provides the primary API for working with document stores:
//!
//! - [`DocumentStore`] - Typed store for working with a specific backend implementation
//! - [`DynDocumentStoreRef`] - Reference-based store for type-erased access
//! - [`StoreBuilder`] - Builds a backend, runs registered migration schemas,
//!   and hands out the ready store
//!
//! # Example
//!
//! ```ignore
//! use docshape::store::StoreBuilder;
//! use docshape::schema::MigrationSchema;
//!
//! let (store, report) = StoreBuilder::new(backend_builder)
//!     .migration_schema(
//!         MigrationSchema::for_document::<User>().constant("version", 2),
//!     )
//!     .initialize()
//!     .await?;
//! let users = store.typed_collection::<User>();
//! ```

use crate::{
    backend::{DynStoreBackend, StoreBackend, StoreBackendBuilder},
    collection::{Collection, DynCollection, TypedCollection},
    document::Document,
    error::DocumentStoreResult,
    migrate::{MigrationEngine, MigrationReport},
    schema::MigrationSchema,
};

/// A strongly-typed document store bound to a specific backend implementation.
///
/// This struct provides access to a document store with compile-time knowledge
/// of the backend type. It enables type-safe operations and full backend
/// optimization.
///
/// # Type Parameters
///
/// * `B` - The backend implementation type
#[derive(Debug)]
pub struct DocumentStore<B: StoreBackend> {
    backend: B,
}

impl<B: StoreBackend> DocumentStore<B> {
    /// Creates a new document store with the given backend.
    ///
    /// A store created this way has not run any migration schemas; use
    /// [`StoreBuilder`] to initialize a store with its schemas applied.
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    /// Gets a typed collection for the specified document type.
    ///
    /// The database and collection are determined by the document type's
    /// `database_name()` and `collection_name()` methods.
    pub fn typed_collection<'a, D: Document>(&'a self) -> TypedCollection<'a, B, D> {
        TypedCollection::new(
            D::database_name().to_string(),
            D::collection_name().to_string(),
            &self.backend,
        )
    }

    /// Gets an untyped collection with the given database and name.
    pub fn collection<'a>(&'a self, database: &str, name: &str) -> Collection<'a, B> {
        Collection::new(database.to_string(), name.to_string(), &self.backend)
    }

    /// Creates a new collection with the given name.
    ///
    /// # Errors
    ///
    /// Returns an error if the collection already exists or creation fails.
    pub async fn create_collection(&self, database: &str, name: &str) -> DocumentStoreResult<()> {
        self.backend
            .create_collection(database, name)
            .await
    }

    /// Drops (deletes) a collection with the given name.
    ///
    /// # Errors
    ///
    /// Returns an error if the collection does not exist or deletion fails.
    pub async fn drop_collection(&self, database: &str, name: &str) -> DocumentStoreResult<()> {
        self.backend
            .drop_collection(database, name)
            .await
    }

    /// Lists all collections in a database.
    pub async fn list_collections(&self, database: &str) -> DocumentStoreResult<Vec<String>> {
        self.backend
            .list_collections(database)
            .await
    }

    /// Shuts down the store and releases backend resources.
    ///
    /// This consumes the store and should be called when no longer needed.
    pub async fn shutdown(self) -> DocumentStoreResult<()> {
        self.backend.shutdown().await?;

        Ok(())
    }
}

/// A type-erased reference to a document store.
///
/// This is the handle the migration engine runs over; any store can produce
/// one through [`AsDynDocumentStore`].
#[derive(Debug)]
pub struct DynDocumentStoreRef<'a> {
    backend: &'a dyn DynStoreBackend,
}

impl<'a> DynDocumentStoreRef<'a> {
    /// Creates a reference to a dynamic document store.
    pub fn new(backend: &'a dyn DynStoreBackend) -> Self {
        Self { backend }
    }

    /// Gets an untyped collection with the given database and name.
    pub fn collection(&'a self, database: &str, name: &str) -> DynCollection<'a> {
        DynCollection::new(database.to_string(), name.to_string(), self.backend)
    }

    /// Creates a new collection with the given name.
    pub async fn create_collection(&self, database: &str, name: &str) -> DocumentStoreResult<()> {
        self.backend
            .create_collection(database, name)
            .await
    }

    /// Drops (deletes) a collection with the given name.
    pub async fn drop_collection(&self, database: &str, name: &str) -> DocumentStoreResult<()> {
        self.backend
            .drop_collection(database, name)
            .await
    }

    /// Lists all collections in a database.
    pub async fn list_collections(&self, database: &str) -> DocumentStoreResult<Vec<String>> {
        self.backend
            .list_collections(database)
            .await
    }
}

/// Conversion trait for converting a document store to a dynamic reference.
///
/// This trait allows converting any store type to a [`DynDocumentStoreRef`]
/// for runtime polymorphism.
pub trait AsDynDocumentStore {
    /// Converts this store to a dynamic reference.
    fn as_dyn<'a>(&'a self) -> DynDocumentStoreRef<'a>;
}

impl<B: StoreBackend + 'static> AsDynDocumentStore for DocumentStore<B> {
    fn as_dyn<'a>(&'a self) -> DynDocumentStoreRef<'a> {
        DynDocumentStoreRef::new(&self.backend)
    }
}

impl<B: StoreBackend + 'static> AsDynDocumentStore for &'_ DocumentStore<B> {
    fn as_dyn<'a>(&'a self) -> DynDocumentStoreRef<'a> {
        DynDocumentStoreRef::new(&self.backend)
    }
}

impl<'a> AsDynDocumentStore for DynDocumentStoreRef<'a> {
    fn as_dyn<'b>(&'b self) -> DynDocumentStoreRef<'b> {
        DynDocumentStoreRef::new(self.backend)
    }
}

/// Builds a document store with its migration schemas applied.
///
/// Schemas are registered on the builder before initialization; the builder
/// is consumed by [`initialize`](StoreBuilder::initialize), so registering a
/// schema after the store is live is impossible by construction.
pub struct StoreBuilder<F: StoreBackendBuilder> {
    backend_builder: F,
    schemas: Vec<MigrationSchema>,
}

impl<F: StoreBackendBuilder> StoreBuilder<F> {
    /// Creates a store builder around a backend factory.
    pub fn new(backend_builder: F) -> Self {
        Self {
            backend_builder,
            schemas: Vec::new(),
        }
    }

    /// Registers a migration schema to run during initialization.
    pub fn migration_schema(mut self, schema: MigrationSchema) -> Self {
        self.schemas.push(schema);
        self
    }

    /// Registers several migration schemas to run during initialization.
    pub fn migration_schemas(
        mut self,
        schemas: impl IntoIterator<Item = MigrationSchema>,
    ) -> Self {
        self.schemas.extend(schemas);
        self
    }

    /// Builds the backend, runs every registered schema, and returns the
    /// ready store together with the migration report.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be built. Migration problems do
    /// not fail initialization; they are recorded in the returned
    /// [`MigrationReport`] and retried on the next start.
    pub async fn initialize(
        self,
    ) -> DocumentStoreResult<(DocumentStore<F::Backend>, MigrationReport)>
    where
        F::Backend: 'static,
    {
        let store = DocumentStore::new(self.backend_builder.build().await?);
        let report = MigrationEngine::from_schemas(self.schemas)
            .run(store.as_dyn())
            .await;

        Ok((store, report))
    }
}
