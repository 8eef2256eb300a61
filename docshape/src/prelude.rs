//! Convenient re-exports of commonly used types from docshape.
//!
//! Import this prelude module to quickly access the most frequently used types
//! and traits without needing to import from multiple sub-modules:
//!
//! ```ignore
//! use docshape::prelude::*;
//! ```
//!
//! This provides access to:
//! - Document traits and implementations
//! - Store backends and builders
//! - Query construction and filtering
//! - Collection interfaces
//! - Migration schemas, suppliers, and the backfill engine
//! - Error types

pub use docshape_core::{
    backend::{DynStoreBackend, StoreBackend, StoreBackendBuilder},
    collection::{Collection, DynCollection, TypedCollection},
    document::{Document, DocumentExt},
    error::{DocumentStoreError, DocumentStoreResult},
    migrate::{Migrate, MigrationEngine, MigrationReport},
    page::{Page, PaginationParams},
    query::{Expr, FieldOp, Filter, Query, QueryBuilder, QueryVisitor, Sort, SortDirection},
    schema::{
        CarryForwardSupplier, ConstantSupplier, MigrationSchema, SchemaEntry, ValueSupplier,
    },
    store::{AsDynDocumentStore, DocumentStore, DynDocumentStoreRef, StoreBuilder},
};
