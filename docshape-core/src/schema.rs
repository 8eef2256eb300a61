//! Declarative migration schemas: the expected shape of a collection.
//!
//! A [`MigrationSchema`] names a `(database, collection)` pair and lists, per
//! target field, a [`ValueSupplier`] that computes the value to backfill into
//! documents still missing that field. A supplier may additionally name a
//! deprecated field it supersedes; once backfill completes, the engine removes
//! every deprecated field from the collection in one bulk operation.
//!
//! Schemas are built before the store initializes and are immutable afterwards.
//!
//! # Example
//!
//! ```ignore
//! use docshape::schema::MigrationSchema;
//!
//! // `nickname` was renamed to `display_name`; `version` is brand new.
//! let schema = MigrationSchema::new("app", "users")
//!     .carried("display_name", "nickname", "anonymous")
//!     .constant("version", 2);
//! ```

use bson::Bson;

use crate::{document::Document, error::DocumentStoreError};

/// Computes the value to backfill into a document that lacks a target field.
///
/// `supply` must be a pure function of the document: no side effects, no
/// mutation. The engine relies on this to produce the same value if a
/// migration step is repeated, and it must never fail for a well-formed
/// document — "no value" is expressed as [`Bson::Null`], not an error.
pub trait ValueSupplier: Send + Sync {
    /// Computes the value for the target field from the existing document.
    fn supply(&self, document: &bson::Document) -> Bson;

    /// Names the deprecated field this supplier supersedes, if any.
    ///
    /// When a key is returned, the engine removes that field from the whole
    /// collection after the target field has been backfilled everywhere.
    fn deprecated_key(&self) -> Option<&str> {
        None
    }
}

/// Supplier that ignores the document and always returns a fixed value.
///
/// May optionally name a deprecated key, for fields whose predecessor is
/// dropped without carrying its value forward.
pub struct ConstantSupplier {
    value: Bson,
    deprecated_key: Option<String>,
}

impl ConstantSupplier {
    /// Creates a supplier that always returns `value`.
    pub fn new(value: impl Into<Bson>) -> Self {
        Self { value: value.into(), deprecated_key: None }
    }

    /// Names a deprecated field to remove once the target field is in place.
    pub fn superseding(mut self, deprecated_key: impl Into<String>) -> Self {
        self.deprecated_key = Some(deprecated_key.into());
        self
    }
}

impl ValueSupplier for ConstantSupplier {
    fn supply(&self, _document: &bson::Document) -> Bson {
        self.value.clone()
    }

    fn deprecated_key(&self) -> Option<&str> {
        self.deprecated_key.as_deref()
    }
}

/// Supplier for renamed fields: copies the value out of the deprecated field.
///
/// Returns the document's value under the deprecated key when it is present
/// and non-null, otherwise the configured fallback (which defaults to
/// [`Bson::Null`]).
pub struct CarryForwardSupplier {
    deprecated_key: String,
    fallback: Bson,
}

impl CarryForwardSupplier {
    /// Creates a supplier that carries the value of `deprecated_key` forward,
    /// backfilling null where the old field is absent.
    pub fn new(deprecated_key: impl Into<String>) -> Self {
        Self {
            deprecated_key: deprecated_key.into(),
            fallback: Bson::Null,
        }
    }

    /// Sets the value to use when the deprecated field is absent or null.
    pub fn with_fallback(mut self, fallback: impl Into<Bson>) -> Self {
        self.fallback = fallback.into();
        self
    }
}

impl ValueSupplier for CarryForwardSupplier {
    fn supply(&self, document: &bson::Document) -> Bson {
        match document.get(&self.deprecated_key) {
            Some(value) if !matches!(value, Bson::Null) => value.clone(),
            _ => self.fallback.clone(),
        }
    }

    fn deprecated_key(&self) -> Option<&str> {
        Some(&self.deprecated_key)
    }
}

/// One target field of a schema, paired with the supplier that defaults it.
///
/// Entry identity is the target field name: a schema must not declare two
/// entries for the same target field, and the engine skips schemas that do.
pub struct SchemaEntry {
    target_field: String,
    supplier: Box<dyn ValueSupplier>,
}

impl SchemaEntry {
    /// Creates an entry backfilling `target_field` with values from `supplier`.
    pub fn new(target_field: impl Into<String>, supplier: impl ValueSupplier + 'static) -> Self {
        Self {
            target_field: target_field.into(),
            supplier: Box::new(supplier),
        }
    }

    /// The field this entry backfills.
    pub fn target_field(&self) -> &str {
        &self.target_field
    }

    /// The supplier computing this entry's default values.
    pub fn supplier(&self) -> &dyn ValueSupplier {
        &*self.supplier
    }

    /// Whether this entry supersedes a deprecated field.
    pub fn has_deprecated_field(&self) -> bool {
        self.supplier.deprecated_key().is_some()
    }
}

impl std::fmt::Debug for SchemaEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaEntry")
            .field("target_field", &self.target_field)
            .field("deprecated_key", &self.supplier.deprecated_key())
            .finish()
    }
}

/// The declared target shape of one collection.
///
/// Construct schemas with the fluent API before the store initializes and
/// register them on the
/// [`StoreBuilder`](crate::store::StoreBuilder); the builder is consumed by
/// initialization, so late registration is impossible by construction.
#[derive(Debug)]
pub struct MigrationSchema {
    database: String,
    collection: String,
    entries: Vec<SchemaEntry>,
}

impl MigrationSchema {
    /// Creates an empty schema for the given database and collection.
    pub fn new(database: impl Into<String>, collection: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            collection: collection.into(),
            entries: Vec::new(),
        }
    }

    /// Creates an empty schema bound to a [`Document`] type's database and collection.
    pub fn for_document<D: Document>() -> Self {
        Self::new(D::database_name(), D::collection_name())
    }

    /// Adds an entry with an explicit supplier.
    pub fn entry(
        mut self,
        target_field: impl Into<String>,
        supplier: impl ValueSupplier + 'static,
    ) -> Self {
        self.entries
            .push(SchemaEntry::new(target_field, supplier));
        self
    }

    /// Adds an entry backfilling a brand-new field with a fixed value.
    pub fn constant(self, target_field: impl Into<String>, value: impl Into<Bson>) -> Self {
        self.entry(target_field, ConstantSupplier::new(value))
    }

    /// Adds an entry for a renamed field: the value is carried forward from
    /// `deprecated_key`, falling back to `fallback` where the old field is absent.
    pub fn carried(
        self,
        target_field: impl Into<String>,
        deprecated_key: impl Into<String>,
        fallback: impl Into<Bson>,
    ) -> Self {
        self.entry(
            target_field,
            CarryForwardSupplier::new(deprecated_key).with_fallback(fallback),
        )
    }

    /// The database this schema applies to.
    pub fn database(&self) -> &str {
        &self.database
    }

    /// The collection this schema applies to.
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// The declared entries, in declaration order.
    pub fn entries(&self) -> &[SchemaEntry] {
        &self.entries
    }

    /// Checks that every declared domain field has a corresponding entry.
    ///
    /// This is a configuration-time warning signal only: an incomplete schema
    /// still backfills the fields it does declare.
    pub fn validate(&self, domain_fields: &[&str]) -> bool {
        domain_fields.iter().all(|field| {
            self.entries
                .iter()
                .any(|entry| entry.target_field() == *field)
        })
    }

    /// Returns the first reason this schema cannot run, if any.
    ///
    /// Blank database/collection names and duplicate target fields make the
    /// whole schema unrunnable; the engine logs the reason and skips it.
    pub fn config_error(&self) -> Option<DocumentStoreError> {
        if self.database.trim().is_empty() {
            return Some(DocumentStoreError::Configuration(
                "blank database name".to_string(),
            ));
        }
        if self.collection.trim().is_empty() {
            return Some(DocumentStoreError::Configuration(
                "blank collection name".to_string(),
            ));
        }

        let mut seen = std::collections::HashSet::new();
        for entry in &self.entries {
            if !seen.insert(entry.target_field()) {
                return Some(DocumentStoreError::Configuration(format!(
                    "duplicate entry for target field '{}'",
                    entry.target_field()
                )));
            }
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    #[test]
    fn constant_supplier_ignores_document() {
        let supplier = ConstantSupplier::new(2i32);
        let document = doc! { "name": "a" };

        assert_eq!(supplier.supply(&document), Bson::Int32(2));
        assert_eq!(supplier.deprecated_key(), None);
    }

    #[test]
    fn constant_supplier_can_supersede_a_field() {
        let supplier = ConstantSupplier::new("fresh").superseding("stale");

        assert_eq!(supplier.deprecated_key(), Some("stale"));
    }

    #[test]
    fn carry_forward_prefers_deprecated_value() {
        let supplier = CarryForwardSupplier::new("nickname").with_fallback("anonymous");
        let document = doc! { "nickname": "ada" };

        assert_eq!(supplier.supply(&document), Bson::String("ada".to_string()));
    }

    #[test]
    fn carry_forward_falls_back_when_absent_or_null() {
        let supplier = CarryForwardSupplier::new("nickname").with_fallback("anonymous");

        let missing = doc! { "other": 1 };
        let null = doc! { "nickname": Bson::Null };

        assert_eq!(supplier.supply(&missing), Bson::String("anonymous".to_string()));
        assert_eq!(supplier.supply(&null), Bson::String("anonymous".to_string()));
    }

    #[test]
    fn carry_forward_without_fallback_supplies_null() {
        let supplier = CarryForwardSupplier::new("nickname");

        assert_eq!(supplier.supply(&doc! {}), Bson::Null);
    }

    #[test]
    fn entry_reports_deprecated_field() {
        let renamed = SchemaEntry::new("display_name", CarryForwardSupplier::new("nickname"));
        let fresh = SchemaEntry::new("version", ConstantSupplier::new(1i32));

        assert!(renamed.has_deprecated_field());
        assert!(!fresh.has_deprecated_field());
    }

    #[test]
    fn validate_requires_an_entry_per_domain_field() {
        let schema = MigrationSchema::new("app", "users")
            .constant("version", 1i32)
            .carried("display_name", "nickname", Bson::Null);

        assert!(schema.validate(&["version", "display_name"]));
        assert!(!schema.validate(&["version", "display_name", "email"]));
    }

    #[test]
    fn config_error_flags_blank_names_and_duplicates() {
        assert!(MigrationSchema::new("", "users").config_error().is_some());
        assert!(MigrationSchema::new("app", "  ").config_error().is_some());

        let duplicated = MigrationSchema::new("app", "users")
            .constant("version", 1i32)
            .constant("version", 2i32);
        assert!(duplicated.config_error().is_some());

        let valid = MigrationSchema::new("app", "users").constant("version", 1i32);
        assert!(valid.config_error().is_none());
    }
}
