// Adapter conformance suite.
//
// Every `Adapter` implementation runs the same checks so the typed stores
// can rely on identical semantics from memory and MongoDB. The suite
// panics on the first failed expectation and logs each step.

use pushgate_core::db::adapter::{Adapter, FindManyQuery, SortBy, SortDirection, WhereClause};
use pushgate_core::db::schema::{Schema, NOTIFICATIONS, USERS};
use pushgate_core::error::PushgateError;
use serde_json::json;

/// Run every conformance check against `adapter`. Clears the `users` and
/// `notifications` collections first.
pub async fn run_adapter_conformance(adapter: &dyn Adapter) {
    adapter
        .ensure_indexes(&Schema::default())
        .await
        .expect("ensure_indexes");
    // Twice: index creation must be idempotent.
    adapter
        .ensure_indexes(&Schema::default())
        .await
        .expect("ensure_indexes (repeat)");

    for model in [USERS, NOTIFICATIONS] {
        adapter.delete_many(model, &[]).await.expect("reset collection");
    }

    create_and_find(adapter).await;
    unique_email(adapter).await;
    filters_and_paging(adapter).await;
    updates(adapter).await;
    array_sets(adapter).await;
    deletes(adapter).await;

    tracing::info!("adapter conformance suite passed");
}

async fn create_and_find(adapter: &dyn Adapter) {
    tracing::debug!("conformance: create_and_find");
    let created = adapter
        .create(USERS, json!({"id": "c-1", "email": "one@example.com", "isActive": true}))
        .await
        .expect("create with id");
    assert_eq!(created["id"], "c-1");

    let generated = adapter
        .create(USERS, json!({"email": "two@example.com", "isActive": false}))
        .await
        .expect("create without id");
    let generated_id = generated["id"].as_str().expect("generated id is a string");
    assert!(!generated_id.is_empty());

    let found = adapter
        .find_one(USERS, &[WhereClause::eq("id", generated_id)])
        .await
        .expect("find_one")
        .expect("record exists");
    assert_eq!(found["email"], "two@example.com");
    assert!(found.get("_id").is_none(), "native keys must not leak");

    let missing = adapter
        .find_one(USERS, &[WhereClause::eq("id", "nope")])
        .await
        .expect("find_one missing");
    assert!(missing.is_none());
}

async fn unique_email(adapter: &dyn Adapter) {
    tracing::debug!("conformance: unique_email");
    let dup = adapter
        .create(USERS, json!({"email": "one@example.com"}))
        .await;
    assert!(
        matches!(dup, Err(PushgateError::Duplicate(_))),
        "duplicate email must be rejected, got {dup:?}"
    );

    let dup = adapter
        .update(
            USERS,
            &[WhereClause::eq("email", "two@example.com")],
            json!({"email": "one@example.com"}),
        )
        .await;
    assert!(matches!(dup, Err(PushgateError::Duplicate(_))));
}

async fn filters_and_paging(adapter: &dyn Adapter) {
    tracing::debug!("conformance: filters_and_paging");
    let rows = [
        ("n-1", "u-1", "2024-01-01T00:00:00.000Z", false),
        ("n-2", "u-1", "2024-01-02T00:00:00.000Z", true),
        ("n-3", "u-1", "2024-01-03T00:00:00.000Z", false),
        ("n-4", "u-2", "2024-01-04T00:00:00.000Z", false),
    ];
    for (id, user, at, read) in rows {
        adapter
            .create(
                NOTIFICATIONS,
                json!({"id": id, "userId": user, "createdAt": at, "isRead": read, "price": 1.5}),
            )
            .await
            .expect("seed notification");
    }

    let owned = vec![WhereClause::eq("userId", "u-1")];
    assert_eq!(adapter.count(NOTIFICATIONS, &owned).await.expect("count"), 3);

    let page = adapter
        .find_many(
            NOTIFICATIONS,
            FindManyQuery::filter(owned.clone())
                .sorted(SortBy::newest_first())
                .page(1, 1),
        )
        .await
        .expect("paged find_many");
    assert_eq!(page.len(), 1);
    assert_eq!(page[0]["id"], "n-2");

    let ascending = adapter
        .find_many(
            NOTIFICATIONS,
            FindManyQuery::default().sorted(SortBy {
                field: "createdAt".into(),
                direction: SortDirection::Asc,
            }),
        )
        .await
        .expect("sorted find_many");
    let ids: Vec<_> = ascending.iter().filter_map(|r| r["id"].as_str()).collect();
    assert_eq!(ids, vec!["n-1", "n-2", "n-3", "n-4"]);

    let unread = vec![
        WhereClause::eq("userId", "u-1"),
        WhereClause::eq("isRead", false),
    ];
    assert_eq!(adapter.count(NOTIFICATIONS, &unread).await.expect("count"), 2);

    let since = vec![WhereClause::gte("createdAt", "2024-01-03T00:00:00.000Z")];
    assert_eq!(adapter.count(NOTIFICATIONS, &since).await.expect("count"), 2);

    let either = vec![WhereClause::is_in("id", vec![json!("n-1"), json!("n-4"), json!("zz")])];
    assert_eq!(adapter.count(NOTIFICATIONS, &either).await.expect("count"), 2);

    let not_u1 = vec![WhereClause::ne("userId", "u-1")];
    assert_eq!(adapter.count(NOTIFICATIONS, &not_u1).await.expect("count"), 1);

    let cheap = vec![WhereClause::lte("price", 2)];
    assert_eq!(adapter.count(NOTIFICATIONS, &cheap).await.expect("count"), 4);
}

async fn updates(adapter: &dyn Adapter) {
    tracing::debug!("conformance: updates");
    let updated = adapter
        .update(
            NOTIFICATIONS,
            &[WhereClause::eq("id", "n-1")],
            json!({"isRead": true, "readAt": "2024-02-01T00:00:00.000Z"}),
        )
        .await
        .expect("update")
        .expect("matched");
    assert_eq!(updated["isRead"], true);
    assert_eq!(updated["userId"], "u-1", "update merges, not replaces");

    let none = adapter
        .update(NOTIFICATIONS, &[WhereClause::eq("id", "missing")], json!({"isRead": true}))
        .await
        .expect("update missing");
    assert!(none.is_none());

    let changed = adapter
        .update_many(
            NOTIFICATIONS,
            &[WhereClause::eq("userId", "u-1"), WhereClause::eq("isRead", false)],
            json!({"isRead": true}),
        )
        .await
        .expect("update_many");
    assert_eq!(changed, 1);

    let still_unread = adapter
        .count(NOTIFICATIONS, &[WhereClause::eq("isRead", false)])
        .await
        .expect("count");
    assert_eq!(still_unread, 1);
}

async fn array_sets(adapter: &dyn Adapter) {
    tracing::debug!("conformance: array_sets");
    let by_id = [WhereClause::eq("id", "c-1")];

    let added = adapter
        .add_to_set(
            USERS,
            &by_id,
            "pushTokens",
            &[json!("t-1"), json!("t-2"), json!("t-1")],
            json!({"updatedAt": "2024-02-01T00:00:00.000Z"}),
        )
        .await
        .expect("add_to_set")
        .expect("matched");
    assert_eq!(added["pushTokens"], json!(["t-1", "t-2"]));
    assert_eq!(added["updatedAt"], "2024-02-01T00:00:00.000Z");
    assert_eq!(added["email"], "one@example.com");

    let again = adapter
        .add_to_set(USERS, &by_id, "pushTokens", &[json!("t-2"), json!("t-3")], json!({}))
        .await
        .expect("add_to_set existing")
        .expect("matched");
    assert_eq!(again["pushTokens"], json!(["t-1", "t-2", "t-3"]));

    let pulled = adapter
        .pull_all(USERS, &by_id, "pushTokens", &[json!("t-1"), json!("t-9")], json!({}))
        .await
        .expect("pull_all")
        .expect("matched");
    assert_eq!(pulled["pushTokens"], json!(["t-2", "t-3"]));

    let missing = adapter
        .pull_all(USERS, &[WhereClause::eq("id", "nope")], "pushTokens", &[json!("t-2")], json!({}))
        .await
        .expect("pull_all missing");
    assert!(missing.is_none());
}

async fn deletes(adapter: &dyn Adapter) {
    tracing::debug!("conformance: deletes");
    let removed = adapter
        .delete_many(NOTIFICATIONS, &[WhereClause::eq("userId", "u-1")])
        .await
        .expect("delete_many");
    assert_eq!(removed, 3);
    assert_eq!(adapter.count(NOTIFICATIONS, &[]).await.expect("count"), 1);

    adapter.delete_many(USERS, &[]).await.expect("clear users");
    adapter.delete_many(NOTIFICATIONS, &[]).await.expect("clear notifications");
}
