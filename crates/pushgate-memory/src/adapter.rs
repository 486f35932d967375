// In-memory adapter: HashMap-based store implementing the core Adapter trait.
//
// Records live in `HashMap<String, Vec<serde_json::Value>>` keyed by
// collection name, behind one `tokio::sync::RwLock`. Unique indexes from
// `ensure_indexes` are enforced on create and update.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use pushgate_core::db::adapter::{
    Adapter, AdapterResult, Connector, FindManyQuery, Operator, SortDirection, WhereClause,
};
use pushgate_core::db::schema::Schema;
use pushgate_core::error::PushgateError;
use pushgate_core::utils::id::generate_id;

/// Type alias for the in-memory store.
type Store = HashMap<String, Vec<serde_json::Value>>;

#[derive(Debug, Default)]
struct State {
    records: Store,
    /// Unique field names per collection.
    unique: HashMap<String, Vec<String>>,
}

/// In-memory database adapter.
///
/// Cloning shares the underlying store.
#[derive(Debug, Clone, Default)]
pub struct MemoryAdapter {
    state: Arc<RwLock<State>>,
}

impl MemoryAdapter {
    /// Create a new empty in-memory adapter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a snapshot of all data (for debugging/testing).
    pub async fn snapshot(&self) -> Store {
        self.state.read().await.records.clone()
    }

    /// Clear all records. Index definitions are kept.
    pub async fn clear(&self) {
        self.state.write().await.records.clear();
    }

    /// Get record count for a specific collection.
    pub async fn model_count(&self, model: &str) -> usize {
        self.state
            .read()
            .await
            .records
            .get(model)
            .map(|v| v.len())
            .unwrap_or(0)
    }

    /// Apply `edit` to the array `field` of the first matching record and
    /// merge `data`, all under one write lock.
    async fn modify_array(
        &self,
        model: &str,
        where_clauses: &[WhereClause],
        field: &str,
        data: serde_json::Value,
        edit: impl FnOnce(&mut Vec<serde_json::Value>),
    ) -> AdapterResult<Option<serde_json::Value>> {
        let mut state = self.state.write().await;
        let Some(recs) = state.records.get_mut(model) else {
            return Ok(None);
        };
        let Some(record) = recs.iter_mut().find(|r| matches_where(r, where_clauses)) else {
            return Ok(None);
        };

        let mut items = match record.get(field) {
            Some(serde_json::Value::Array(items)) => items.clone(),
            Some(serde_json::Value::Null) | None => Vec::new(),
            Some(_) => {
                return Err(PushgateError::Database(format!(
                    "{model}.{field} is not an array"
                )))
            }
        };
        edit(&mut items);
        merge_update(record, &data);
        if let Some(obj) = record.as_object_mut() {
            obj.insert(field.to_string(), serde_json::Value::Array(items));
        }
        Ok(Some(record.clone()))
    }
}

/// Check if a record matches a set of WHERE clauses.
///
/// Runs of clauses joined by `Or` form one group; groups are ANDed. This is
/// the same grouping the MongoDB filter builder produces.
fn matches_where(record: &serde_json::Value, clauses: &[WhereClause]) -> bool {
    let mut result = true;
    let mut group = false;

    for clause in clauses {
        let field_val = record.get(&clause.field).unwrap_or(&serde_json::Value::Null);
        group = group || match_operator(field_val, &clause.value, &clause.operator);

        if !matches!(clause.connector, Some(Connector::Or)) {
            result = result && group;
            group = false;
        }
    }

    // A trailing OR leaves the last group open.
    if clauses
        .last()
        .is_some_and(|c| matches!(c.connector, Some(Connector::Or)))
    {
        result = result && group;
    }

    result
}

/// Match a single operator condition.
fn match_operator(field_val: &serde_json::Value, target: &serde_json::Value, op: &Operator) -> bool {
    match op {
        Operator::Eq => field_val == target,
        Operator::Ne => field_val != target,
        Operator::Lt => compare_json(field_val, target).is_some_and(|c| c.is_lt()),
        Operator::Lte => compare_json(field_val, target).is_some_and(|c| c.is_le()),
        Operator::Gt => compare_json(field_val, target).is_some_and(|c| c.is_gt()),
        Operator::Gte => compare_json(field_val, target).is_some_and(|c| c.is_ge()),
        Operator::In => match target {
            serde_json::Value::Array(arr) => arr.contains(field_val),
            _ => false,
        },
    }
}

/// Compare two JSON values numerically or lexicographically.
fn compare_json(a: &serde_json::Value, b: &serde_json::Value) -> Option<std::cmp::Ordering> {
    match (a, b) {
        (serde_json::Value::Number(an), serde_json::Value::Number(bn)) => {
            an.as_f64()?.partial_cmp(&bn.as_f64()?)
        }
        (serde_json::Value::String(a_s), serde_json::Value::String(b_s)) => Some(a_s.cmp(b_s)),
        (serde_json::Value::Bool(a_b), serde_json::Value::Bool(b_b)) => Some(a_b.cmp(b_b)),
        _ => None,
    }
}

/// Apply sorting to records. Missing fields sort first.
fn sort_records(records: &mut [serde_json::Value], query: &FindManyQuery) {
    if let Some(ref sort) = query.sort_by {
        records.sort_by(|a, b| {
            let cmp = match (a.get(&sort.field), b.get(&sort.field)) {
                (Some(av), Some(bv)) => compare_json(av, bv).unwrap_or(std::cmp::Ordering::Equal),
                (Some(_), None) => std::cmp::Ordering::Greater,
                (None, Some(_)) => std::cmp::Ordering::Less,
                (None, None) => std::cmp::Ordering::Equal,
            };
            match sort.direction {
                SortDirection::Asc => cmp,
                SortDirection::Desc => cmp.reverse(),
            }
        });
    }
}

/// Merge update data into an existing record.
fn merge_update(record: &mut serde_json::Value, data: &serde_json::Value) {
    if let (Some(rec_obj), Some(data_obj)) = (record.as_object_mut(), data.as_object()) {
        for (k, v) in data_obj {
            rec_obj.insert(k.clone(), v.clone());
        }
    }
}

/// Fail if `candidate` collides with any record except the one at `skip`.
fn check_unique(
    fields: &[String],
    records: &[serde_json::Value],
    candidate: &serde_json::Value,
    skip: Option<usize>,
) -> AdapterResult<()> {
    for field in fields {
        let Some(value) = candidate.get(field).filter(|v| !v.is_null()) else {
            continue;
        };
        let clash = records
            .iter()
            .enumerate()
            .any(|(i, r)| Some(i) != skip && r.get(field) == Some(value));
        if clash {
            return Err(PushgateError::Duplicate(field.clone()));
        }
    }
    Ok(())
}

#[async_trait]
impl Adapter for MemoryAdapter {
    async fn create(&self, model: &str, data: serde_json::Value) -> AdapterResult<serde_json::Value> {
        let serde_json::Value::Object(mut obj) = data else {
            return Err(PushgateError::Database(format!(
                "{model}: record must be a JSON object"
            )));
        };

        // Auto-generate ID if not present
        if obj.get("id").map_or(true, |v| v.is_null()) {
            obj.insert("id".to_string(), serde_json::Value::String(generate_id()));
        }
        let record = serde_json::Value::Object(obj);

        let mut state = self.state.write().await;
        let State { records, unique } = &mut *state;
        let collection = records.entry(model.to_string()).or_default();
        check_unique(&[String::from("id")], collection, &record, None)?;
        if let Some(fields) = unique.get(model) {
            check_unique(fields, collection, &record, None)?;
        }
        collection.push(record.clone());

        tracing::debug!(model, "memory: created record");
        Ok(record)
    }

    async fn find_one(
        &self,
        model: &str,
        where_clauses: &[WhereClause],
    ) -> AdapterResult<Option<serde_json::Value>> {
        let state = self.state.read().await;
        Ok(state
            .records
            .get(model)
            .and_then(|recs| recs.iter().find(|r| matches_where(r, where_clauses)))
            .cloned())
    }

    async fn find_many(
        &self,
        model: &str,
        query: FindManyQuery,
    ) -> AdapterResult<Vec<serde_json::Value>> {
        let state = self.state.read().await;
        let mut result: Vec<serde_json::Value> = state
            .records
            .get(model)
            .map(|recs| {
                recs.iter()
                    .filter(|r| matches_where(r, &query.where_clauses))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        sort_records(&mut result, &query);

        // Apply offset
        if let Some(offset) = query.offset {
            let offset = offset.max(0) as usize;
            if offset < result.len() {
                result = result.split_off(offset);
            } else {
                result.clear();
            }
        }

        // Apply limit
        if let Some(limit) = query.limit {
            result.truncate(limit.max(0) as usize);
        }

        Ok(result)
    }

    async fn count(&self, model: &str, where_clauses: &[WhereClause]) -> AdapterResult<i64> {
        let state = self.state.read().await;
        let count = state
            .records
            .get(model)
            .map(|recs| recs.iter().filter(|r| matches_where(r, where_clauses)).count())
            .unwrap_or(0);
        Ok(count as i64)
    }

    async fn update(
        &self,
        model: &str,
        where_clauses: &[WhereClause],
        data: serde_json::Value,
    ) -> AdapterResult<Option<serde_json::Value>> {
        let mut state = self.state.write().await;
        let State { records, unique } = &mut *state;
        let Some(recs) = records.get_mut(model) else {
            return Ok(None);
        };
        let Some(pos) = recs.iter().position(|r| matches_where(r, where_clauses)) else {
            return Ok(None);
        };

        let mut updated = recs[pos].clone();
        merge_update(&mut updated, &data);
        if let Some(fields) = unique.get(model) {
            check_unique(fields, recs, &updated, Some(pos))?;
        }
        recs[pos] = updated.clone();
        Ok(Some(updated))
    }

    async fn add_to_set(
        &self,
        model: &str,
        where_clauses: &[WhereClause],
        field: &str,
        values: &[serde_json::Value],
        data: serde_json::Value,
    ) -> AdapterResult<Option<serde_json::Value>> {
        self.modify_array(model, where_clauses, field, data, |items| {
            for value in values {
                if !items.contains(value) {
                    items.push(value.clone());
                }
            }
        })
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
        self.modify_array(model, where_clauses, field, data, |items| {
            items.retain(|item| !values.contains(item));
        })
        .await
    }

    async fn update_many(
        &self,
        model: &str,
        where_clauses: &[WhereClause],
        data: serde_json::Value,
    ) -> AdapterResult<i64> {
        let mut state = self.state.write().await;
        let mut count = 0i64;

        if let Some(recs) = state.records.get_mut(model) {
            for record in recs.iter_mut() {
                if matches_where(record, where_clauses) {
                    merge_update(record, &data);
                    count += 1;
                }
            }
        }

        Ok(count)
    }

    async fn delete_many(&self, model: &str, where_clauses: &[WhereClause]) -> AdapterResult<i64> {
        let mut state = self.state.write().await;
        match state.records.get_mut(model) {
            Some(recs) => {
                let before = recs.len();
                recs.retain(|r| !matches_where(r, where_clauses));
                Ok((before - recs.len()) as i64)
            }
            None => Ok(0),
        }
    }

    async fn ensure_indexes(&self, schema: &Schema) -> AdapterResult<()> {
        let mut state = self.state.write().await;
        for collection in &schema.collections {
            let fields: Vec<String> = collection
                .indexes
                .iter()
                .filter(|idx| idx.unique && idx.keys.len() == 1)
                .map(|idx| idx.keys[0].0.to_string())
                .collect();
            state.unique.insert(collection.name.to_string(), fields);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pushgate_core::db::adapter::SortBy;

    #[tokio::test]
    async fn test_create_generates_id() {
        let adapter = MemoryAdapter::new();
        let rec = adapter
            .create("users", serde_json::json!({"name": "Alice"}))
            .await
            .unwrap();
        assert!(rec["id"].as_str().is_some_and(|id| id.len() == 21));
        assert_eq!(adapter.model_count("users").await, 1);
    }

    #[tokio::test]
    async fn test_create_rejects_non_object() {
        let adapter = MemoryAdapter::new();
        let err = adapter.create("users", serde_json::json!([1, 2])).await;
        assert!(matches!(err, Err(PushgateError::Database(_))));
    }

    #[tokio::test]
    async fn test_unique_index_enforced() {
        let adapter = MemoryAdapter::new();
        adapter.ensure_indexes(&Schema::default()).await.unwrap();
        adapter
            .create("users", serde_json::json!({"id": "u1", "email": "a@x.io"}))
            .await
            .unwrap();
        adapter
            .create("users", serde_json::json!({"id": "u2", "email": "b@x.io"}))
            .await
            .unwrap();

        let dup = adapter
            .create("users", serde_json::json!({"id": "u3", "email": "a@x.io"}))
            .await;
        assert!(matches!(dup, Err(PushgateError::Duplicate(f)) if f == "email"));

        let dup = adapter
            .update("users", &[WhereClause::eq("id", "u2")], serde_json::json!({"email": "a@x.io"}))
            .await;
        assert!(matches!(dup, Err(PushgateError::Duplicate(_))));

        // Rewriting a record's own value is not a clash.
        let same = adapter
            .update("users", &[WhereClause::eq("id", "u1")], serde_json::json!({"email": "a@x.io"}))
            .await
            .unwrap();
        assert!(same.is_some());
    }

    #[tokio::test]
    async fn test_or_connector() {
        let adapter = MemoryAdapter::new();
        for (id, tier) in [("u1", "free"), ("u2", "premium"), ("u3", "enterprise")] {
            adapter
                .create("users", serde_json::json!({"id": id, "subscriptionType": tier}))
                .await
                .unwrap();
        }
        let query = FindManyQuery::filter(vec![
            WhereClause::eq("subscriptionType", "premium").or(),
            WhereClause::eq("subscriptionType", "enterprise"),
        ]);
        assert_eq!(adapter.find_many("users", query).await.unwrap().len(), 2);

        // (id = u1) AND (premium OR enterprise) matches nothing.
        let query = FindManyQuery::filter(vec![
            WhereClause::eq("id", "u1"),
            WhereClause::eq("subscriptionType", "premium").or(),
            WhereClause::eq("subscriptionType", "enterprise"),
        ]);
        assert!(adapter.find_many("users", query).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_timestamp_range_and_sort() {
        let adapter = MemoryAdapter::new();
        for (id, at) in [
            ("n1", "2024-01-01T00:00:00.000Z"),
            ("n2", "2024-03-01T00:00:00.000Z"),
            ("n3", "2024-02-01T00:00:00.000Z"),
        ] {
            adapter
                .create("notifications", serde_json::json!({"id": id, "createdAt": at}))
                .await
                .unwrap();
        }
        let query = FindManyQuery::filter(vec![WhereClause::gte(
            "createdAt",
            "2024-02-01T00:00:00.000Z",
        )])
        .sorted(SortBy::newest_first());
        let found = adapter.find_many("notifications", query).await.unwrap();
        let ids: Vec<_> = found.iter().map(|r| r["id"].as_str().unwrap()).collect();
        assert_eq!(ids, vec!["n2", "n3"]);
    }

    #[tokio::test]
    async fn test_clear_keeps_indexes() {
        let adapter = MemoryAdapter::new();
        adapter.ensure_indexes(&Schema::default()).await.unwrap();
        adapter
            .create("users", serde_json::json!({"email": "a@x.io"}))
            .await
            .unwrap();
        adapter.clear().await;
        assert!(adapter.snapshot().await.is_empty());
        adapter
            .create("users", serde_json::json!({"email": "a@x.io"}))
            .await
            .unwrap();
        assert!(adapter
            .create("users", serde_json::json!({"email": "a@x.io"}))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_array_set_ops() {
        let adapter = MemoryAdapter::new();
        adapter
            .create("users", serde_json::json!({"id": "u1", "tokens": ["a"]}))
            .await
            .unwrap();
        let by_id = [WhereClause::eq("id", "u1")];

        let rec = adapter
            .add_to_set(
                "users",
                &by_id,
                "tokens",
                &[serde_json::json!("a"), serde_json::json!("b")],
                serde_json::json!({"updatedAt": "t1"}),
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(rec["tokens"], serde_json::json!(["a", "b"]));
        assert_eq!(rec["updatedAt"], "t1");

        let rec = adapter
            .pull_all("users", &by_id, "tokens", &[serde_json::json!("a")], serde_json::json!({}))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(rec["tokens"], serde_json::json!(["b"]));

        // A missing array is treated as empty.
        adapter
            .create("users", serde_json::json!({"id": "u2"}))
            .await
            .unwrap();
        let rec = adapter
            .add_to_set(
                "users",
                &[WhereClause::eq("id", "u2")],
                "tokens",
                &[serde_json::json!("x")],
                serde_json::json!({}),
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(rec["tokens"], serde_json::json!(["x"]));

        let missing = adapter
            .pull_all(
                "users",
                &[WhereClause::eq("id", "nobody")],
                "tokens",
                &[serde_json::json!("x")],
                serde_json::json!({}),
            )
            .await
            .unwrap();
        assert!(missing.is_none());
    }
}
