// MongoAdapter: the core Adapter trait on the official MongoDB driver.
//
// - collections hold the records of one model
// - `id` is stored as `_id`
// - WHERE clauses become find filters (see `query`)
// - unique index violations (E11000) surface as `PushgateError::Duplicate`

use async_trait::async_trait;
use futures_util::StreamExt;
use mongodb::bson::{Bson, Document};
use mongodb::error::{Error as MongoError, ErrorKind, WriteFailure};
use mongodb::options::{FindOptions, IndexOptions, ReturnDocument};
use mongodb::{Client, Collection, Database, IndexModel};

use pushgate_core::db::adapter::{Adapter, AdapterResult, FindManyQuery, WhereClause};
use pushgate_core::db::schema::Schema;
use pushgate_core::error::PushgateError;
use pushgate_core::utils::id::generate_id;

use crate::query;

const DUPLICATE_KEY: i32 = 11000;

/// MongoDB database adapter.
#[derive(Debug, Clone)]
pub struct MongoAdapter {
    db: Database,
}

impl MongoAdapter {
    /// Create a new adapter from an existing database handle.
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Connect to `uri` and use database `db_name`.
    pub async fn connect(uri: &str, db_name: &str) -> Result<Self, PushgateError> {
        let client = Client::with_uri_str(uri)
            .await
            .map_err(|e| PushgateError::Database(format!("MongoDB connection failed: {e}")))?;
        tracing::info!(database = db_name, "connected to MongoDB");
        Ok(Self {
            db: client.database(db_name),
        })
    }

    /// Get a reference to the underlying database.
    pub fn database(&self) -> &Database {
        &self.db
    }

    fn collection(&self, model: &str) -> Collection<Document> {
        self.db.collection(model)
    }

    /// Apply `update` to the first match and return the document as it is
    /// afterwards.
    async fn update_returning(
        &self,
        model: &str,
        where_clauses: &[WhereClause],
        update: Document,
        op: &str,
    ) -> AdapterResult<Option<serde_json::Value>> {
        let updated = self
            .collection(model)
            .find_one_and_update(query::filter(where_clauses)?, update)
            .return_document(ReturnDocument::After)
            .await
            .map_err(|e| map_err(op, e))?;

        Ok(updated.map(query::doc_to_record))
    }
}

/// Map a driver error, recognising duplicate-key write failures.
fn map_err(op: &str, err: MongoError) -> PushgateError {
    if let ErrorKind::Write(WriteFailure::WriteError(ref we)) = *err.kind {
        if we.code == DUPLICATE_KEY {
            return PushgateError::Duplicate(duplicate_field(&we.message));
        }
    }
    if let ErrorKind::Command(ref ce) = *err.kind {
        if ce.code == DUPLICATE_KEY {
            return PushgateError::Duplicate(duplicate_field(&ce.message));
        }
    }
    PushgateError::Database(format!("MongoDB {op} failed: {err}"))
}

/// Pull the field out of an E11000 message (`... index: email_1 dup key ...`).
fn duplicate_field(message: &str) -> String {
    message
        .split("index: ")
        .nth(1)
        .and_then(|rest| rest.split_whitespace().next())
        .map(|index| index.trim_end_matches("_1").to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

#[async_trait]
impl Adapter for MongoAdapter {
    async fn create(&self, model: &str, data: serde_json::Value) -> AdapterResult<serde_json::Value> {
        let serde_json::Value::Object(mut obj) = data else {
            return Err(PushgateError::Database(format!(
                "{model}: record must be a JSON object"
            )));
        };
        if obj.get("id").map_or(true, |v| v.is_null()) {
            obj.insert("id".to_string(), serde_json::Value::String(generate_id()));
        }
        let record = serde_json::Value::Object(obj);

        self.collection(model)
            .insert_one(query::record_to_doc(&record)?)
            .await
            .map_err(|e| map_err("insert", e))?;

        tracing::debug!(model, "mongodb: created record");
        Ok(record)
    }

    async fn find_one(
        &self,
        model: &str,
        where_clauses: &[WhereClause],
    ) -> AdapterResult<Option<serde_json::Value>> {
        let result = self
            .collection(model)
            .find_one(query::filter(where_clauses)?)
            .await
            .map_err(|e| map_err("find_one", e))?;

        Ok(result.map(query::doc_to_record))
    }

    async fn find_many(
        &self,
        model: &str,
        query_params: FindManyQuery,
    ) -> AdapterResult<Vec<serde_json::Value>> {
        let filter = query::filter(&query_params.where_clauses)?;

        let mut find_opts = FindOptions::default();
        find_opts.limit = query_params.limit;
        find_opts.skip = query_params.offset.map(|o| o.max(0) as u64);
        find_opts.sort = query::sort(&query_params);

        let mut cursor = self
            .collection(model)
            .find(filter)
            .with_options(find_opts)
            .await
            .map_err(|e| map_err("find", e))?;

        let mut results = Vec::new();
        while let Some(doc) = cursor.next().await {
            let doc = doc.map_err(|e| map_err("cursor", e))?;
            results.push(query::doc_to_record(doc));
        }

        Ok(results)
    }

    async fn count(&self, model: &str, where_clauses: &[WhereClause]) -> AdapterResult<i64> {
        let count = self
            .collection(model)
            .count_documents(query::filter(where_clauses)?)
            .await
            .map_err(|e| map_err("count", e))?;

        Ok(count as i64)
    }

    async fn update(
        &self,
        model: &str,
        where_clauses: &[WhereClause],
        data: serde_json::Value,
    ) -> AdapterResult<Option<serde_json::Value>> {
        self.update_returning(model, where_clauses, query::set_update(&data)?, "update")
            .await
    }

    async fn add_to_set(
        &self,
        model: &str,
        where_clauses: &[WhereClause],
        field: &str,
        values: &[serde_json::Value],
        data: serde_json::Value,
    ) -> AdapterResult<Option<serde_json::Value>> {
        let update = query::add_to_set_update(field, values, &data)?;
        self.update_returning(model, where_clauses, update, "add_to_set")
            .await
    }

    async fn pull_all(
        &self,
        model: &str,
        where_clauses: &[WhereClause],
        field: &str,
        values: &[serde_json::Value],
        data: serde_json::Value,
    ) -> AdapterResult<Option<serde_json::Value>> {
        let update = query::pull_all_update(field, values, &data)?;
        self.update_returning(model, where_clauses, update, "pull_all")
            .await
    }

    async fn update_many(
        &self,
        model: &str,
        where_clauses: &[WhereClause],
        data: serde_json::Value,
    ) -> AdapterResult<i64> {
        let result = self
            .collection(model)
            .update_many(query::filter(where_clauses)?, query::set_update(&data)?)
            .await
            .map_err(|e| map_err("update_many", e))?;

        Ok(result.matched_count as i64)
    }

    async fn delete_many(&self, model: &str, where_clauses: &[WhereClause]) -> AdapterResult<i64> {
        let result = self
            .collection(model)
            .delete_many(query::filter(where_clauses)?)
            .await
            .map_err(|e| map_err("delete_many", e))?;

        Ok(result.deleted_count as i64)
    }

    async fn ensure_indexes(&self, schema: &Schema) -> AdapterResult<()> {
        for collection in &schema.collections {
            let coll = self.collection(collection.name);
            for spec in &collection.indexes {
                let mut keys = Document::new();
                for (field, direction) in &spec.keys {
                    keys.insert(*field, Bson::Int32(*direction));
                }
                let index = IndexModel::builder()
                    .keys(keys)
                    .options(IndexOptions::builder().unique(spec.unique).build())
                    .build();
                coll.create_index(index)
                    .await
                    .map_err(|e| map_err("create_index", e))?;
            }
            tracing::debug!(collection = collection.name, "mongodb: indexes ensured");
        }
        Ok(())
    }
}
