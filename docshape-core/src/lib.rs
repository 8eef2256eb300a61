//! A thin document database abstraction layer with declarative schema backfill migrations.
//!
//! This crate is the core of the docshape project and provides:
//!
//! - **Document traits** ([`document`]) - Core traits for defining and serializing documents
//! - **Store backend abstraction** ([`backend`]) - Traits for implementing different storage backends
//! - **Query and filtering API** ([`query`]) - Type-safe query construction and filtering
//! - **Collections interface** ([`collection`]) - High-level API for interacting with document collections
//! - **Document store** ([`store`]) - Main interface for working with typed or untyped documents
//! - **Migration schemas** ([`schema`]) - Declarative target shapes with per-field value suppliers
//! - **Backfill engine** ([`migrate`]) - Reconciles stored documents with their schemas at startup
//! - **Error handling** ([`error`]) - Comprehensive error types and result types
//! - **Pagination** ([`page`]) - Page and pagination parameter types
//!
//! # Example
//!
//! ```ignore
//! use docshape::{Document, StoreBuilder};
//! use docshape::schema::MigrationSchema;
//! use bson::Uuid;
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Debug, Clone, Serialize, Deserialize)]
//! pub struct User {
//!     pub id: Uuid,
//!     pub display_name: String,
//!     pub version: i32,
//! }
//!
//! impl Document for User {
//!     fn id(&self) -> &Uuid {
//!         &self.id
//!     }
//!
//!     fn database_name() -> &'static str {
//!         "app"
//!     }
//!
//!     fn collection_name() -> &'static str {
//!         "users"
//!     }
//! }
//!
//! let (store, _report) = StoreBuilder::new(backend_builder)
//!     .migration_schema(
//!         MigrationSchema::for_document::<User>()
//!             .carried("display_name", "nickname", "anonymous")
//!             .constant("version", 2),
//!     )
//!     .initialize()
//!     .await?;
//! ```

#[allow(unused_extern_crates)]
extern crate self as docshape_core;

pub mod backend;
pub mod collection;
pub mod document;
pub mod error;
pub mod migrate;
pub mod page;
pub mod query;
pub mod schema;
pub mod store;
