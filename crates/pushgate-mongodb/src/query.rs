// Translation between adapter records and MongoDB documents.
//
// Records travel as JSON objects keyed by `id`; documents are keyed by `_id`.
// Values cross over through bson's serde support, so nested notification
// `data` maps and token arrays keep their shape.

use mongodb::bson::{self, doc, Bson, Document};

use pushgate_core::db::adapter::{
    AdapterResult, Connector, FindManyQuery, Operator, SortDirection, WhereClause,
};
use pushgate_core::error::PushgateError;

/// Name of `field` inside a stored document.
fn storage_key(field: &str) -> &str {
    if field == "id" {
        "_id"
    } else {
        field
    }
}

fn to_bson(value: &serde_json::Value) -> AdapterResult<Bson> {
    bson::to_bson(value)
        .map_err(|e| PushgateError::Database(format!("cannot encode value as BSON: {e}")))
}

/// Build a find filter.
///
/// Clauses chained with `Or` collapse into one `$or` group and groups are
/// ANDed, matching the in-memory adapter's reading of the same clauses.
pub fn filter(clauses: &[WhereClause]) -> AdapterResult<Document> {
    let mut groups: Vec<Document> = Vec::new();
    let mut pending: Vec<Document> = Vec::new();

    for clause in clauses {
        pending.push(condition(clause)?);
        if !matches!(clause.connector, Some(Connector::Or)) {
            groups.push(close_group(std::mem::take(&mut pending)));
        }
    }
    if !pending.is_empty() {
        groups.push(close_group(pending));
    }

    Ok(match groups.len() {
        0 => Document::new(),
        1 => groups.swap_remove(0),
        _ => doc! { "$and": groups },
    })
}

fn close_group(mut members: Vec<Document>) -> Document {
    if members.len() == 1 {
        members.swap_remove(0)
    } else {
        doc! { "$or": members }
    }
}

fn condition(clause: &WhereClause) -> AdapterResult<Document> {
    let key = storage_key(&clause.field);
    let value = to_bson(&clause.value)?;
    let op = match clause.operator {
        Operator::Eq => return Ok(doc! { key: value }),
        Operator::Ne => "$ne",
        Operator::Lt => "$lt",
        Operator::Lte => "$lte",
        Operator::Gt => "$gt",
        Operator::Gte => "$gte",
        Operator::In => {
            let list = match value {
                Bson::Array(items) => items,
                single => vec![single],
            };
            return Ok(doc! { key: { "$in": list } });
        }
    };
    Ok(doc! { key: { op: value } })
}

/// Encode a full record for insertion.
pub fn record_to_doc(record: &serde_json::Value) -> AdapterResult<Document> {
    let mut out = Document::new();
    for (field, value) in record.as_object().into_iter().flatten() {
        out.insert(storage_key(field), to_bson(value)?);
    }
    Ok(out)
}

/// Decode a stored document back into a record.
pub fn doc_to_record(document: Document) -> serde_json::Value {
    let record = document
        .into_iter()
        .map(|(key, value)| {
            let field = if key == "_id" { "id".to_string() } else { key };
            (field, value.into_relaxed_extjson())
        })
        .collect();
    serde_json::Value::Object(record)
}

/// `$set` body for a patch. The primary key and any field in `skip` are
/// left out.
fn set_fields(patch: &serde_json::Value, skip: Option<&str>) -> AdapterResult<Document> {
    let mut set = Document::new();
    for (field, value) in patch.as_object().into_iter().flatten() {
        if field == "id" || Some(field.as_str()) == skip {
            continue;
        }
        set.insert(field.as_str(), to_bson(value)?);
    }
    Ok(set)
}

/// Update document that overwrites the fields in `patch`.
pub fn set_update(patch: &serde_json::Value) -> AdapterResult<Document> {
    Ok(doc! { "$set": set_fields(patch, None)? })
}

/// Update document that adds `values` to the array `field` when absent.
pub fn add_to_set_update(
    field: &str,
    values: &[serde_json::Value],
    patch: &serde_json::Value,
) -> AdapterResult<Document> {
    let each = values.iter().map(to_bson).collect::<AdapterResult<Vec<_>>>()?;
    array_update(field, patch, "$addToSet", doc! { field: { "$each": each } })
}

/// Update document that strips every occurrence of `values` from `field`.
pub fn pull_all_update(
    field: &str,
    values: &[serde_json::Value],
    patch: &serde_json::Value,
) -> AdapterResult<Document> {
    let pulled = values.iter().map(to_bson).collect::<AdapterResult<Vec<_>>>()?;
    array_update(field, patch, "$pullAll", doc! { field: pulled })
}

fn array_update(
    field: &str,
    patch: &serde_json::Value,
    op: &str,
    body: Document,
) -> AdapterResult<Document> {
    let mut update = doc! { op: body };
    let set = set_fields(patch, Some(field))?;
    if !set.is_empty() {
        update.insert("$set", set);
    }
    Ok(update)
}

/// Sort specification, if the query asks for one.
pub fn sort(query: &FindManyQuery) -> Option<Document> {
    let by = query.sort_by.as_ref()?;
    let direction: i32 = match by.direction {
        SortDirection::Asc => 1,
        SortDirection::Desc => -1,
    };
    let key = storage_key(&by.field);
    Some(doc! { key: direction })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pushgate_core::db::adapter::SortBy;
    use serde_json::json;

    // ═══════════ Filters ═══════════

    #[test]
    fn test_no_clauses_match_everything() {
        assert_eq!(filter(&[]).unwrap(), Document::new());
    }

    #[test]
    fn test_id_lookup_targets_primary_key() {
        let f = filter(&[WhereClause::eq("id", "u1")]).unwrap();
        assert_eq!(f, doc! { "_id": "u1" });
    }

    #[test]
    fn test_broadcast_audience_filter() {
        // Active accounts on either paid tier.
        let f = filter(&[
            WhereClause::eq("isActive", true),
            WhereClause::eq("subscriptionType", "premium").or(),
            WhereClause::eq("subscriptionType", "enterprise"),
        ])
        .unwrap();
        assert_eq!(
            f,
            doc! { "$and": [
                { "isActive": true },
                { "$or": [ { "subscriptionType": "premium" }, { "subscriptionType": "enterprise" } ] },
            ] }
        );
    }

    #[test]
    fn test_expiry_sweep_filter() {
        let f = filter(&[
            WhereClause::eq("status", "active"),
            WhereClause::lte("endDate", "2024-01-08T00:00:00.000Z"),
        ])
        .unwrap();
        assert_eq!(
            f,
            doc! { "$and": [
                { "status": "active" },
                { "endDate": { "$lte": "2024-01-08T00:00:00.000Z" } },
            ] }
        );
    }

    #[test]
    fn test_recipient_list_filter() {
        let f = filter(&[WhereClause::is_in("id", vec![json!("a"), json!("b")])]).unwrap();
        assert_eq!(f, doc! { "_id": { "$in": ["a", "b"] } });
    }

    // ═══════════ Records ═══════════

    #[test]
    fn test_notification_record_keeps_nested_data() {
        let record = json!({
            "id": "n1",
            "recipient": "u1",
            "data": {"orderId": "42", "deepLink": "app://orders/42"},
            "isRead": false,
        });
        let stored = record_to_doc(&record).unwrap();
        assert_eq!(stored.get_str("_id").unwrap(), "n1");
        assert!(!stored.contains_key("id"));
        assert_eq!(
            stored.get_document("data").unwrap().get_str("orderId").unwrap(),
            "42"
        );

        assert_eq!(doc_to_record(stored), record);
    }

    #[test]
    fn test_stored_integers_come_back_as_numbers() {
        let back = doc_to_record(doc! { "_id": "u1", "retries": 3_i32, "total": 9_i64 });
        assert_eq!(back, json!({"id": "u1", "retries": 3, "total": 9}));
    }

    // ═══════════ Updates ═══════════

    #[test]
    fn test_patch_never_rewrites_primary_key() {
        let update = set_update(&json!({"id": "u9", "name": "Bob"})).unwrap();
        assert_eq!(update, doc! { "$set": { "name": "Bob" } });
    }

    #[test]
    fn test_token_registration_update() {
        let update = add_to_set_update(
            "pushTokens",
            &[json!("tok-1")],
            &json!({"pushTokens": ["ignored"], "updatedAt": "t1"}),
        )
        .unwrap();
        assert_eq!(
            update,
            doc! {
                "$addToSet": { "pushTokens": { "$each": ["tok-1"] } },
                "$set": { "updatedAt": "t1" },
            }
        );
    }

    #[test]
    fn test_token_cleanup_update_without_patch() {
        let update = pull_all_update("pushTokens", &[json!("a"), json!("b")], &json!({})).unwrap();
        assert_eq!(update, doc! { "$pullAll": { "pushTokens": ["a", "b"] } });
    }

    #[test]
    fn test_newest_first_sort() {
        let query = FindManyQuery::default().sorted(SortBy::newest_first());
        assert_eq!(sort(&query), Some(doc! { "createdAt": -1 }));
        assert_eq!(sort(&FindManyQuery::default()), None);
    }
}
