//! End-to-end tests for the schema backfill engine over the in-memory backend.

use async_trait::async_trait;
use bson::{Bson, Uuid, doc};
use docshape::{memory::InMemoryStore, prelude::*, schema::MigrationSchema};

/// Backend builder handing out a pre-seeded store, so `StoreBuilder` can run
/// schemas against existing documents.
struct Seeded(InMemoryStore);

#[async_trait]
impl StoreBackendBuilder for Seeded {
    type Backend = InMemoryStore;

    async fn build(self) -> DocumentStoreResult<Self::Backend> {
        Ok(self.0)
    }
}

async fn seed(store: &DocumentStore<InMemoryStore>, docs: Vec<bson::Document>) -> Vec<Uuid> {
    let pairs = docs
        .into_iter()
        .map(|doc| (Uuid::new(), Bson::Document(doc)))
        .collect::<Vec<_>>();
    let ids = pairs
        .iter()
        .map(|(id, _)| *id)
        .collect::<Vec<_>>();

    store
        .collection("app", "users")
        .insert(pairs)
        .await
        .unwrap();

    ids
}

async fn fetch(store: &DocumentStore<InMemoryStore>, ids: &[Uuid]) -> Vec<bson::Document> {
    store
        .collection("app", "users")
        .get(ids.to_vec())
        .await
        .unwrap()
        .into_iter()
        .map(|doc| doc.as_document().unwrap().clone())
        .collect()
}

#[tokio::test]
async fn constant_backfill_touches_only_missing_documents() {
    let store = DocumentStore::new(InMemoryStore::new());
    let ids = seed(
        &store,
        vec![
            doc! { "name": "ada" },
            doc! { "name": "grace", "version": 5 },
            doc! { "name": "edsger" },
        ],
    )
    .await;

    let report = store
        .apply_schema(MigrationSchema::new("app", "users").constant("version", 2))
        .await;

    assert!(report.is_clean());
    assert_eq!(report.fields_backfilled, 2);

    let versions = fetch(&store, &ids)
        .await
        .into_iter()
        .map(|doc| doc.get("version").cloned())
        .collect::<Vec<_>>();
    // The pre-existing value survives; the missing ones get the constant.
    assert_eq!(
        versions,
        vec![
            Some(Bson::Int32(2)),
            Some(Bson::Int32(5)),
            Some(Bson::Int32(2)),
        ]
    );
}

#[tokio::test]
async fn carry_forward_renames_and_removes_the_old_field() {
    let store = DocumentStore::new(InMemoryStore::new());
    let ids = seed(
        &store,
        vec![
            doc! { "nickname": "al" },
            doc! { "name": "nameless" },
            doc! { "nickname": Bson::Null },
        ],
    )
    .await;

    let report = store
        .apply_schema(
            MigrationSchema::new("app", "users").carried("display_name", "nickname", "anonymous"),
        )
        .await;

    assert!(report.is_clean());
    assert_eq!(report.fields_backfilled, 3);
    assert_eq!(report.deprecated_fields_removed, 1);

    let docs = fetch(&store, &ids).await;
    assert_eq!(docs[0].get("display_name"), Some(&Bson::String("al".into())));
    // Absent and null old values both fall back.
    assert_eq!(
        docs[1].get("display_name"),
        Some(&Bson::String("anonymous".into()))
    );
    assert_eq!(
        docs[2].get("display_name"),
        Some(&Bson::String("anonymous".into()))
    );
    assert!(docs.iter().all(|doc| doc.get("nickname").is_none()));
}

#[tokio::test]
async fn second_pass_is_a_noop() {
    let store = DocumentStore::new(InMemoryStore::new());
    seed(&store, vec![doc! { "name": "ada" }, doc! { "name": "grace" }]).await;

    let schema = || {
        MigrationSchema::new("app", "users")
            .constant("version", 2)
            .carried("display_name", "nickname", "anonymous")
    };

    let first = store.apply_schema(schema()).await;
    assert_eq!(first.fields_backfilled, 4);

    let second = store.apply_schema(schema()).await;
    assert!(second.is_clean());
    assert_eq!(second.fields_backfilled, 0);
}

#[tokio::test]
async fn backfill_walks_collections_larger_than_one_batch() {
    let store = DocumentStore::new(InMemoryStore::new());
    let docs = (0..600)
        .map(|i| doc! { "name": format!("user-{i}") })
        .collect::<Vec<_>>();
    let ids = seed(&store, docs).await;

    let report = store
        .apply_schema(MigrationSchema::new("app", "users").constant("version", 1))
        .await;

    assert_eq!(report.fields_backfilled, 600);
    assert!(fetch(&store, &ids).await.iter().all(|doc| {
        doc.get("version") == Some(&Bson::Int32(1))
    }));
}

#[tokio::test]
async fn partially_migrated_collections_converge() {
    // Simulates a run that was interrupted after backfilling some documents
    // but before the deprecated field cleanup.
    let store = DocumentStore::new(InMemoryStore::new());
    let ids = seed(
        &store,
        vec![
            doc! { "display_name": "al", "nickname": "al" },
            doc! { "nickname": "grace" },
        ],
    )
    .await;

    let report = store
        .apply_schema(
            MigrationSchema::new("app", "users").carried("display_name", "nickname", "anonymous"),
        )
        .await;

    assert!(report.is_clean());
    assert_eq!(report.fields_backfilled, 1);

    let docs = fetch(&store, &ids).await;
    // The already-backfilled document keeps its value; the cleanup still runs.
    assert_eq!(docs[0].get("display_name"), Some(&Bson::String("al".into())));
    assert_eq!(
        docs[1].get("display_name"),
        Some(&Bson::String("grace".into()))
    );
    assert!(docs.iter().all(|doc| doc.get("nickname").is_none()));
}

#[tokio::test]
async fn failed_backfill_defers_deprecated_field_cleanup() {
    let store = DocumentStore::new(InMemoryStore::new());
    let good = Uuid::new();
    let bad = Uuid::new();

    // A non-document value cannot take a point update, so its backfill fails.
    store
        .collection("app", "users")
        .insert(vec![
            (good, Bson::Document(doc! { "nickname": "al" })),
            (bad, Bson::String("not a document".to_string())),
        ])
        .await
        .unwrap();

    let report = store
        .apply_schema(
            MigrationSchema::new("app", "users").carried("display_name", "nickname", "anonymous"),
        )
        .await;

    assert_eq!(report.backfill_failures, 1);
    assert_eq!(report.cleanups_deferred, 1);
    assert_eq!(report.deprecated_fields_removed, 0);
    assert!(!report.is_clean());

    // The old field may still be the only copy of a value a failed document
    // needs, so it survives the pass; the successful backfill still lands.
    let docs = fetch(&store, &[good]).await;
    assert_eq!(docs[0].get("nickname"), Some(&Bson::String("al".into())));
    assert_eq!(docs[0].get("display_name"), Some(&Bson::String("al".into())));
}

#[tokio::test]
async fn unrunnable_schemas_are_skipped_but_others_run() {
    let store = DocumentStore::new(InMemoryStore::new());
    let ids = seed(&store, vec![doc! { "name": "ada" }]).await;

    let report = store
        .apply_schemas(vec![
            MigrationSchema::new("", "users").constant("version", 1),
            MigrationSchema::new("app", "users")
                .constant("version", 1)
                .constant("version", 2),
            MigrationSchema::new("app", "users").constant("version", 3),
        ])
        .await;

    assert_eq!(report.schemas_skipped, 2);
    assert_eq!(report.schemas_applied, 1);
    assert_eq!(
        fetch(&store, &ids).await[0].get("version"),
        Some(&Bson::Int32(3))
    );
}

#[tokio::test]
async fn schemas_only_touch_their_own_collection() {
    let store = DocumentStore::new(InMemoryStore::new());
    let user_id = Uuid::new();
    let order_id = Uuid::new();

    store
        .collection("app", "users")
        .insert(vec![(user_id, Bson::Document(doc! { "name": "ada" }))])
        .await
        .unwrap();
    store
        .collection("app", "orders")
        .insert(vec![(order_id, Bson::Document(doc! { "total": 10 }))])
        .await
        .unwrap();
    store
        .collection("staging", "users")
        .insert(vec![(user_id, Bson::Document(doc! { "name": "ada" }))])
        .await
        .unwrap();

    store
        .apply_schema(MigrationSchema::new("app", "users").constant("version", 1))
        .await;

    let order = store
        .collection("app", "orders")
        .get(vec![order_id])
        .await
        .unwrap();
    assert!(order[0]
        .as_document()
        .unwrap()
        .get("version")
        .is_none());

    let staging_user = store
        .collection("staging", "users")
        .get(vec![user_id])
        .await
        .unwrap();
    assert!(staging_user[0]
        .as_document()
        .unwrap()
        .get("version")
        .is_none());
}

#[tokio::test]
async fn store_builder_runs_schemas_before_handing_out_the_store() {
    let backend = InMemoryStore::new();
    let seeded = DocumentStore::new(backend.clone());
    let ids = seed(&seeded, vec![doc! { "name": "ada" }]).await;

    let (store, report) = StoreBuilder::new(Seeded(backend))
        .migration_schema(MigrationSchema::new("app", "users").constant("version", 2))
        .initialize()
        .await
        .unwrap();

    assert!(report.is_clean());
    assert_eq!(report.fields_backfilled, 1);
    assert_eq!(
        fetch(&store, &ids).await[0].get("version"),
        Some(&Bson::Int32(2))
    );
}

#[tokio::test]
async fn empty_collection_still_gets_its_cleanup() {
    let store = DocumentStore::new(InMemoryStore::new());

    let report = store
        .apply_schema(
            MigrationSchema::new("app", "users").carried("display_name", "nickname", "anonymous"),
        )
        .await;

    assert!(report.is_clean());
    assert_eq!(report.fields_backfilled, 0);
    assert_eq!(report.deprecated_fields_removed, 1);
}
