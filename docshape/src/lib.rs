//! Main docshape crate providing a unified interface for document storage
//! with declarative schema backfill migrations.
//!
//! This crate is the primary entry point for users of the docshape framework.
//! It re-exports the core types and functionality from various sub-crates and
//! provides convenient access to different storage backends.
//!
//! # Features
//!
//! - **Type-safe document storage** - Define your data structures with Serde and store them safely
//! - **Multiple backends** - Support for in-memory and MongoDB storage with extensible trait system
//! - **Flexible querying** - Composable query API for filtering and sorting
//! - **Schema backfills** - Declare the target shape of each collection once;
//!   every process start reconciles stored documents with it
//!
//! # Quick Start
//!
//! ```ignore
//! use docshape::{prelude::*, memory::InMemoryStore};
//! use bson::Uuid;
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Debug, Clone, Serialize, Deserialize)]
//! pub struct User {
//!     pub id: Uuid,
//!     pub name: String,
//! }
//!
//! impl Document for User {
//!     fn id(&self) -> &Uuid { &self.id }
//!     fn database_name() -> &'static str { "app" }
//!     fn collection_name() -> &'static str { "users" }
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     // Create an in-memory store backend
//!     let store = DocumentStore::new(InMemoryStore::new());
//!
//!     // Get a typed collection for User documents
//!     let user_collection = store.typed_collection::<User>();
//!
//!     let user = User {
//!         id: Uuid::new(),
//!         name: "Alice".to_string(),
//!     };
//!
//!     // Insert the user document
//!     user_collection.insert(vec![user.clone()]).await.unwrap();
//!
//!     // Query for the user document
//!     let results = user_collection
//!         .query(
//!             Query::builder()
//!                 .filter(Filter::eq("name", "Alice"))
//!                 .build(),
//!         )
//!         .await
//!         .unwrap();
//!
//!     println!("Queried users: {:?}", results);
//!
//!     // Shutdown the store
//!     store.shutdown().await.unwrap();
//! }
//! ```
//!
//! # Schema migrations
//!
//! Instead of a hand-written migration per release, docshape lets each
//! collection declare its target shape once. When a field is introduced, a
//! [`MigrationSchema`](schema::MigrationSchema) entry names it together with a
//! supplier that computes its value for documents written before the field
//! existed. The store builder runs every registered schema before handing the
//! store out, so application code only ever sees documents in the declared
//! shape.
//!
//! ```ignore
//! use docshape::{prelude::*, memory::InMemoryStoreBuilder, schema::MigrationSchema};
//!
//! #[tokio::main]
//! async fn main() {
//!     let (store, report) = StoreBuilder::new(InMemoryStoreBuilder)
//!         .migration_schema(
//!             MigrationSchema::new("app", "users")
//!                 // `nickname` was renamed to `display_name`; carry existing
//!                 // values over and drop the old field afterwards.
//!                 .carried("display_name", "nickname", "anonymous")
//!                 // `version` is brand new; old documents get the constant.
//!                 .constant("version", 2),
//!         )
//!         .initialize()
//!         .await
//!         .unwrap();
//!
//!     assert!(report.is_clean());
//! }
//! ```
//!
//! Re-running the same schemas against an already-migrated store is a no-op;
//! a document that already carries a field is never touched.
//!
//! # Backends
//!
//! - [`memory`] - Fast in-memory storage for development and testing
//! - [`mongodb`] - Persistent MongoDB backend (requires `mongodb` feature)

pub mod prelude;

pub use docshape_core::{
    backend, collection, document, error, migrate, page, query, schema, store,
};

// Re-export BSON types for convenience
pub use bson;

/// In-memory storage backend implementations.
pub mod memory {
    pub use docshape_memory::{InMemoryStore, InMemoryStoreBuilder};
}

/// MongoDB storage backend implementations.
///
/// This module is only available when the `mongodb` feature is enabled.
#[cfg(feature = "mongodb")]
pub mod mongodb {
    pub use docshape_mongodb::{MongoDbStore, MongoDbStoreBuilder};
}
