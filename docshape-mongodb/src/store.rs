use async_trait::async_trait;
use bson::{Bson, Document, Uuid, doc};
use futures::{StreamExt, TryStreamExt, stream::iter};
use mongodb::{
    Client, Collection as MongoCollection,
    options::{ClientOptions, FindOptions},
};

use docshape_core::{
    backend::{StoreBackend, StoreBackendBuilder},
    error::{DocumentStoreError, DocumentStoreResult},
    query::{Query, QueryVisitor, SortDirection},
};

use crate::{
    query::MongoQueryTranslator,
    sanitizer::{restore_value, sanitize_key, sanitize_value},
};

/// MongoDB-backed storage for document stores.
///
/// One client serves every `(database, collection)` pair; the target database
/// is chosen per call. Documents are stored with their store UUID as the
/// MongoDB `_id`, which makes point updates a single `update_one` on the
/// primary index.
#[derive(Debug)]
pub struct MongoDbStore {
    client: Client,
}

impl MongoDbStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn builder(dsn: &str) -> MongoDbStoreBuilder {
        MongoDbStoreBuilder::new(dsn)
    }

    fn get_collection(&self, database: &str, collection_name: &str) -> MongoCollection<Document> {
        self.client
            .database(database)
            .collection(&sanitize_key(collection_name))
    }

    fn prepare_document(&self, id: &Uuid, document: &Bson) -> DocumentStoreResult<Document> {
        Ok(Document::from_iter(
            sanitize_value(document)
                .as_document()
                .cloned()
                .ok_or_else(|| DocumentStoreError::InvalidDocument("Expected document".into()))?
                .into_iter()
                .chain(vec![("_id".to_string(), id.into())]),
        ))
    }

    fn restore_document(&self, document: &Document) -> DocumentStoreResult<Bson> {
        Ok(restore_value(&Bson::Document(Document::from_iter(
            document
                .clone()
                .into_iter()
                .filter(|(k, _)| !["_id"].contains(&k.as_str())),
        ))))
    }

    fn document_id(document: &Document) -> DocumentStoreResult<Uuid> {
        match document.get("_id") {
            Some(Bson::Binary(binary)) => binary
                .to_uuid()
                .map_err(|e| DocumentStoreError::Backend(e.to_string())),
            _ => Err(DocumentStoreError::InvalidDocument(
                "document without a UUID _id".into(),
            )),
        }
    }

    async fn shutdown(self) -> DocumentStoreResult<()> {
        self.client.shutdown().await;

        Ok(())
    }
}

#[async_trait]
impl StoreBackend for MongoDbStore {
    async fn insert_documents(
        &self,
        documents: Vec<(Uuid, Bson)>,
        database: &str,
        collection: &str,
    ) -> DocumentStoreResult<()> {
        self.get_collection(database, collection)
            .insert_many(
                documents
                    .iter()
                    .map(|(id, doc)| self.prepare_document(id, doc))
                    .collect::<DocumentStoreResult<Vec<Document>>>()?,
            )
            .await
            .map_err(|e| DocumentStoreError::Backend(e.to_string()))?;

        Ok(())
    }

    async fn update_documents(
        &self,
        documents: Vec<(Uuid, Bson)>,
        database: &str,
        collection: &str,
    ) -> DocumentStoreResult<()> {
        iter(documents)
            .then(async |(id, doc)| {
                self.get_collection(database, collection)
                    .replace_one(doc! { "_id": id }, self.prepare_document(&id, &doc)?)
                    .await
                    .map_err(|e| DocumentStoreError::Backend(e.to_string()))
            })
            .try_collect::<Vec<_>>()
            .await?;

        Ok(())
    }

    async fn delete_documents(
        &self,
        ids: Vec<Uuid>,
        database: &str,
        collection: &str,
    ) -> DocumentStoreResult<()> {
        self.get_collection(database, collection)
            .delete_many(doc! { "_id": { "$in": ids } })
            .await
            .map_err(|e| DocumentStoreError::Backend(e.to_string()))?;

        Ok(())
    }

    async fn get_documents(
        &self,
        ids: Vec<Uuid>,
        database: &str,
        collection: &str,
    ) -> DocumentStoreResult<Vec<Bson>> {
        Ok(self
            .get_collection(database, collection)
            .find(doc! { "_id": { "$in": ids } })
            .await
            .map_err(|e| DocumentStoreError::Backend(e.to_string()))?
            .try_collect::<Vec<Document>>()
            .await
            .map_err(|e| DocumentStoreError::Backend(e.to_string()))?
            .into_iter()
            .map(|doc| self.restore_document(&doc))
            .collect::<DocumentStoreResult<Vec<Bson>>>()?)
    }

    async fn query_documents(
        &self,
        query: Query,
        database: &str,
        collection: &str,
    ) -> DocumentStoreResult<Vec<(Uuid, Bson)>> {
        let mut options = FindOptions::default();

        if let Some(limit) = query.limit {
            options.limit = Some(limit as i64);
        }
        if let Some(skip) = query.offset {
            options.skip = Some(skip as u64);
        }
        if let Some(sort) = &query.sort {
            options.sort = Some(doc! {
                sanitize_key(&sort.field): match sort.direction {
                    SortDirection::Asc => 1,
                    SortDirection::Desc => -1,
                }
            })
        }

        self.get_collection(database, collection)
            .find(if let Some(expr) = &query.filter {
                MongoQueryTranslator.visit_expr(expr)?
            } else {
                doc! {}
            })
            .with_options(options)
            .await
            .map_err(|e| DocumentStoreError::Backend(e.to_string()))?
            .try_collect::<Vec<Document>>()
            .await
            .map_err(|e| DocumentStoreError::Backend(e.to_string()))?
            .into_iter()
            .map(|doc| Ok((Self::document_id(&doc)?, self.restore_document(&doc)?)))
            .collect::<DocumentStoreResult<Vec<(Uuid, Bson)>>>()
    }

    async fn set_field(
        &self,
        id: Uuid,
        field: &str,
        value: Bson,
        database: &str,
        collection: &str,
    ) -> DocumentStoreResult<()> {
        let result = self
            .get_collection(database, collection)
            .update_one(
                doc! { "_id": id },
                doc! { "$set": { sanitize_key(field): sanitize_value(&value) } },
            )
            .await
            .map_err(|e| DocumentStoreError::Backend(e.to_string()))?;

        if result.matched_count == 0 {
            return Err(DocumentStoreError::DocumentNotFound(
                id.to_string(),
                collection.to_string(),
            ));
        }

        Ok(())
    }

    async fn unset_fields(
        &self,
        fields: &[String],
        database: &str,
        collection: &str,
    ) -> DocumentStoreResult<()> {
        let unset = fields
            .iter()
            .map(|field| (sanitize_key(field), Bson::String(String::new())))
            .collect::<Document>();

        self.get_collection(database, collection)
            .update_many(doc! {}, doc! { "$unset": unset })
            .await
            .map_err(|e| DocumentStoreError::Backend(e.to_string()))?;

        Ok(())
    }

    async fn create_collection(&self, database: &str, name: &str) -> DocumentStoreResult<()> {
        self.client
            .database(database)
            .create_collection(&sanitize_key(name))
            .await
            .map_err(|e| DocumentStoreError::Backend(e.to_string()))?;

        Ok(())
    }

    async fn drop_collection(&self, database: &str, name: &str) -> DocumentStoreResult<()> {
        self.get_collection(database, name)
            .drop()
            .await
            .map_err(|e| DocumentStoreError::Backend(e.to_string()))?;

        Ok(())
    }

    async fn list_collections(&self, database: &str) -> DocumentStoreResult<Vec<String>> {
        Ok(self
            .client
            .database(database)
            .list_collection_names()
            .await
            .map_err(|e| DocumentStoreError::Backend(e.to_string()))?)
    }

    async fn shutdown(self) -> DocumentStoreResult<()> {
        self.shutdown().await
    }
}

/// Builder connecting a [`MongoDbStore`] from a connection string.
pub struct MongoDbStoreBuilder {
    dsn: String,
}

impl MongoDbStoreBuilder {
    pub fn new(dsn: &str) -> Self {
        Self { dsn: dsn.to_string() }
    }
}

#[async_trait]
impl StoreBackendBuilder for MongoDbStoreBuilder {
    type Backend = MongoDbStore;

    async fn build(self) -> DocumentStoreResult<Self::Backend> {
        let options = ClientOptions::parse(&self.dsn)
            .await
            .map_err(|e| DocumentStoreError::Initialization(e.to_string()))?;

        let client = Client::with_options(options)
            .map_err(|e| DocumentStoreError::Initialization(e.to_string()))?;
        tracing::info!("connected MongoDB document store backend");

        Ok(MongoDbStore::new(client))
    }
}
