//! Schema backfill engine for document stores.
//!
//! The engine reconciles the documents of a collection with its declared
//! [`MigrationSchema`]: for every entry it finds the documents still missing
//! the target field, computes a value per document with the entry's
//! [`ValueSupplier`](crate::schema::ValueSupplier), and writes it back as a
//! point update. Once every entry of a schema has been backfilled, the engine
//! removes the schema's deprecated fields from the whole collection in one
//! bulk operation.
//!
//! Every step is idempotent, so the engine is safe to run at each process
//! start: a second pass over an already-migrated collection finds no matching
//! documents and writes nothing.
//!
//! # Failure handling
//!
//! A schema that cannot run at all (blank names, duplicate target fields) is
//! logged and skipped; the remaining schemas still run. A point update that
//! fails is logged and the document is left for the next pass. Deprecated
//! fields are only removed once every backfill of the owning schema succeeded
//! in the current pass, so a failed backfill never loses the last copy of a
//! legacy value.
//!
//! # Example
//!
//! ```ignore
//! use docshape::migrate::Migrate;
//! use docshape::schema::MigrationSchema;
//!
//! let report = store
//!     .apply_schema(
//!         MigrationSchema::new("app", "users")
//!             .carried("display_name", "nickname", "anonymous")
//!             .constant("version", 2),
//!     )
//!     .await;
//! assert!(report.is_clean());
//! ```

use async_trait::async_trait;
use bson::{Bson, Uuid};
use futures::{StreamExt, stream};
use std::collections::{BTreeSet, HashSet};

use crate::{
    collection::DynCollection,
    query::{Filter, Query},
    schema::{MigrationSchema, SchemaEntry},
    store::{AsDynDocumentStore, DynDocumentStoreRef},
};

/// Number of missing-field documents fetched per query round.
const BATCH_SIZE: usize = 256;

/// Number of point updates in flight at once per entry.
const POINT_UPDATE_CONCURRENCY: usize = 8;

/// Summary of one engine pass over a set of schemas.
///
/// Counters accumulate across all schemas of the pass. A clean pass over an
/// already-migrated store reports zero everywhere.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MigrationReport {
    /// Schemas that ran to completion, including ones with nothing to do.
    pub schemas_applied: usize,
    /// Schemas rejected by configuration checks and not run.
    pub schemas_skipped: usize,
    /// Point updates acknowledged by the backend.
    pub fields_backfilled: usize,
    /// Point updates that failed; the documents are left for the next pass.
    pub backfill_failures: usize,
    /// Deprecated field names removed in bulk cleanups.
    pub deprecated_fields_removed: usize,
    /// Cleanups postponed because a backfill of the owning schema failed.
    pub cleanups_deferred: usize,
}

impl MigrationReport {
    /// Whether the pass finished without skips, failures, or deferrals.
    pub fn is_clean(&self) -> bool {
        self.schemas_skipped == 0 && self.backfill_failures == 0 && self.cleanups_deferred == 0
    }
}

/// Runs migration schemas against any document store.
///
/// The engine holds the schemas registered before store initialization and
/// applies each of them independently; one failing schema never blocks the
/// others.
pub struct MigrationEngine {
    schemas: Vec<MigrationSchema>,
}

impl MigrationEngine {
    /// Creates an engine with no schemas registered.
    pub fn new() -> Self {
        Self { schemas: Vec::new() }
    }

    /// Creates an engine from a prepared list of schemas.
    pub fn from_schemas(schemas: Vec<MigrationSchema>) -> Self {
        Self { schemas }
    }

    /// Registers a schema with the engine.
    pub fn schema(mut self, schema: MigrationSchema) -> Self {
        self.schemas.push(schema);
        self
    }

    /// The registered schemas, in registration order.
    pub fn schemas(&self) -> &[MigrationSchema] {
        &self.schemas
    }

    /// Runs every registered schema against the store and reports the outcome.
    pub async fn run<'a>(&self, store: DynDocumentStoreRef<'a>) -> MigrationReport {
        let mut report = MigrationReport::default();

        for schema in &self.schemas {
            if let Some(reason) = schema.config_error() {
                tracing::warn!(
                    database = schema.database(),
                    collection = schema.collection(),
                    %reason,
                    "skipping unrunnable migration schema"
                );
                report.schemas_skipped += 1;
                continue;
            }

            self.apply(schema, &store, &mut report).await;
            report.schemas_applied += 1;
        }

        tracing::info!(
            applied = report.schemas_applied,
            skipped = report.schemas_skipped,
            backfilled = report.fields_backfilled,
            failures = report.backfill_failures,
            "migration pass finished"
        );

        report
    }

    async fn apply<'a>(
        &self,
        schema: &MigrationSchema,
        store: &DynDocumentStoreRef<'a>,
        report: &mut MigrationReport,
    ) {
        let collection = store.collection(schema.database(), schema.collection());

        let mut schema_failures = 0usize;
        for entry in schema.entries() {
            let (backfilled, failed) = self
                .backfill_entry(entry, &collection)
                .await;

            report.fields_backfilled += backfilled;
            report.backfill_failures += failed;
            schema_failures += failed;

            if backfilled > 0 || failed > 0 {
                tracing::info!(
                    database = schema.database(),
                    collection = schema.collection(),
                    field = entry.target_field(),
                    backfilled,
                    failed,
                    "backfilled missing field"
                );
            }
        }

        // Deprecated keys are declared by the schema, not discovered per
        // document: a pass interrupted after backfill still removes them on
        // the next run. Removing an already-absent field is a no-op.
        let deprecated = schema
            .entries()
            .iter()
            .filter_map(|entry| entry.supplier().deprecated_key())
            .map(str::to_string)
            .collect::<BTreeSet<String>>();

        if deprecated.is_empty() {
            return;
        }

        if schema_failures > 0 {
            // Deprecated values may still be the only copy for the documents
            // whose backfill failed; keep them until a clean pass.
            tracing::warn!(
                database = schema.database(),
                collection = schema.collection(),
                failures = schema_failures,
                "deferring deprecated field cleanup until backfill succeeds"
            );
            report.cleanups_deferred += 1;
            return;
        }

        let fields = deprecated
            .into_iter()
            .collect::<Vec<String>>();
        match collection.unset_fields(&fields).await {
            Ok(()) => {
                tracing::info!(
                    database = schema.database(),
                    collection = schema.collection(),
                    fields = ?fields,
                    "removed deprecated fields"
                );
                report.deprecated_fields_removed += fields.len();
            }
            Err(error) => {
                tracing::warn!(
                    database = schema.database(),
                    collection = schema.collection(),
                    %error,
                    "deprecated field cleanup failed"
                );
                report.cleanups_deferred += 1;
            }
        }
    }

    /// Backfills one entry, returning `(backfilled, failed)` counts.
    ///
    /// Documents are fetched in bounded batches; a freshly backfilled document
    /// stops matching the missing-field filter, so re-issuing the same query
    /// naturally walks the collection. Documents whose update failed are
    /// remembered and excluded so a persistent failure cannot loop the pass.
    async fn backfill_entry(
        &self,
        entry: &SchemaEntry,
        collection: &DynCollection<'_>,
    ) -> (usize, usize) {
        let target = entry.target_field();
        let mut backfilled = 0usize;
        let mut failed: HashSet<Uuid> = HashSet::new();

        loop {
            // Failed documents still match the filter, so widen the limit by
            // their count to keep reaching past them.
            let query = Query::builder()
                .filter(Filter::not_exists(target))
                .limit(BATCH_SIZE + failed.len())
                .build();

            let matches = match collection.query(query).await {
                Ok(matches) => matches,
                Err(error) => {
                    tracing::warn!(
                        database = collection.database(),
                        collection = collection.name(),
                        field = target,
                        %error,
                        "missing-field query failed; entry left for the next pass"
                    );
                    return (backfilled, failed.len() + 1);
                }
            };

            let candidates = matches
                .into_iter()
                .filter(|(id, _)| !failed.contains(id))
                .collect::<Vec<(Uuid, Bson)>>();
            if candidates.is_empty() {
                break;
            }

            let results = stream::iter(candidates)
                .map(|(id, document)| {
                    let value = match document {
                        Bson::Document(ref fields) => entry.supplier().supply(fields),
                        // Non-document values carry no fields to read from;
                        // the supplier sees an empty document.
                        _ => entry
                            .supplier()
                            .supply(&bson::Document::new()),
                    };
                    async move { (id, collection.set_field(id, target, value).await) }
                })
                .buffer_unordered(POINT_UPDATE_CONCURRENCY)
                .collect::<Vec<_>>()
                .await;

            let mut progressed = false;
            for (id, result) in results {
                match result {
                    Ok(()) => {
                        backfilled += 1;
                        progressed = true;
                    }
                    Err(error) => {
                        tracing::warn!(
                            database = collection.database(),
                            collection = collection.name(),
                            field = target,
                            document = %id,
                            %error,
                            "point update failed; document left for the next pass"
                        );
                        failed.insert(id);
                    }
                }
            }

            if !progressed {
                break;
            }
        }

        (backfilled, failed.len())
    }
}

impl Default for MigrationEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience trait for running schemas straight from a store handle.
///
/// Automatically implemented for every store type convertible to a
/// [`DynDocumentStoreRef`].
#[async_trait]
pub trait Migrate: Send + Sync {
    /// Applies a single schema and reports the outcome.
    async fn apply_schema(&self, schema: MigrationSchema) -> MigrationReport;

    /// Applies a list of schemas and reports the combined outcome.
    async fn apply_schemas(&self, schemas: Vec<MigrationSchema>) -> MigrationReport;
}

#[async_trait]
impl<T> Migrate for T
where
    T: AsDynDocumentStore + Send + Sync,
{
    async fn apply_schema(&self, schema: MigrationSchema) -> MigrationReport {
        MigrationEngine::from_schemas(vec![schema])
            .run(self.as_dyn())
            .await
    }

    async fn apply_schemas(&self, schemas: Vec<MigrationSchema>) -> MigrationReport {
        MigrationEngine::from_schemas(schemas)
            .run(self.as_dyn())
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ConstantSupplier;

    #[test]
    fn clean_report_has_no_skips_failures_or_deferrals() {
        let clean = MigrationReport {
            schemas_applied: 3,
            fields_backfilled: 12,
            deprecated_fields_removed: 2,
            ..Default::default()
        };
        assert!(clean.is_clean());

        let deferred = MigrationReport { cleanups_deferred: 1, ..Default::default() };
        assert!(!deferred.is_clean());
    }

    #[test]
    fn engine_collects_registered_schemas() {
        let engine = MigrationEngine::new()
            .schema(MigrationSchema::new("app", "users").constant("version", 1i32))
            .schema(MigrationSchema::new("app", "orders").entry(
                "status",
                ConstantSupplier::new("open"),
            ));

        assert_eq!(engine.schemas().len(), 2);
        assert_eq!(engine.schemas()[1].collection(), "orders");
    }
}
