// Credential store: accounts, push tokens and tier sync.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;

use pushgate_core::db::adapter::{Adapter, FindManyQuery, SortBy, SortDirection, WhereClause};
use pushgate_core::db::models::{Account, AccountRecord, Tier};
use pushgate_core::db::schema::USERS;
use pushgate_core::error::ErrorCode;
use pushgate_core::utils::id::is_valid_id;
use pushgate_core::utils::time::format_timestamp;
use pushgate_core::utils::validation::Pagination;

use super::{decode, decode_all, encode, Page, StoreError};

const PUSH_TOKENS: &str = "pushTokens";

#[derive(Debug, Clone, Copy)]
enum TokenEdit {
    Add,
    Remove,
}

#[derive(Debug, Clone, Serialize)]
pub struct TierCount {
    pub tier: Tier,
    pub count: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub total_users: u64,
    pub active_users: u64,
    pub subscribed_users: u64,
    pub subscription_stats: Vec<TierCount>,
    pub recent_users: Vec<Account>,
}

#[derive(Debug, Clone)]
pub struct AccountStore {
    adapter: Arc<dyn Adapter>,
}

impl AccountStore {
    pub fn new(adapter: Arc<dyn Adapter>) -> Self {
        Self { adapter }
    }

    /// Insert an account with its password hash. A taken email surfaces as
    /// `StoreError::Duplicate("email")`.
    pub async fn create(&self, record: AccountRecord) -> Result<Account, StoreError> {
        let stored = self.adapter.create(USERS, encode(&record)?).await?;
        decode(stored)
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<Account>, StoreError> {
        if !is_valid_id(id) {
            return Ok(None);
        }
        self.adapter
            .find_one(USERS, &[WhereClause::eq("id", id)])
            .await?
            .map(decode)
            .transpose()
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        self.adapter
            .find_one(USERS, &[WhereClause::eq("email", email)])
            .await?
            .map(decode)
            .transpose()
    }

    /// Account plus password hash, for credential checks.
    pub async fn find_record_by_email(&self, email: &str) -> Result<Option<AccountRecord>, StoreError> {
        self.adapter
            .find_one(USERS, &[WhereClause::eq("email", email)])
            .await?
            .map(decode)
            .transpose()
    }

    /// Persist every public field of `account`. The stored password hash is
    /// left as is.
    pub async fn save(&self, account: &Account) -> Result<Account, StoreError> {
        let mut data = encode(account)?;
        if let Some(obj) = data.as_object_mut() {
            obj.insert("updatedAt".into(), json!(format_timestamp(&Utc::now())));
        }
        self.update_fields(&account.id, data).await
    }

    /// Replace the password hash of an existing account.
    pub async fn set_password(&self, id: &str, password_hash: &str) -> Result<Account, StoreError> {
        self.update_fields(id, json!({ "password": password_hash })).await
    }

    pub async fn touch_login(&self, id: &str, now: DateTime<Utc>) -> Result<Account, StoreError> {
        self.update_fields(id, json!({ "lastLogin": format_timestamp(&now) })).await
    }

    pub async fn set_active(&self, id: &str, is_active: bool) -> Result<Account, StoreError> {
        self.update_fields(
            id,
            json!({ "isActive": is_active, "updatedAt": format_timestamp(&Utc::now()) }),
        )
        .await
    }

    /// Register a token. Registering a token twice keeps one copy.
    pub async fn add_push_token(&self, id: &str, token: &str) -> Result<Account, StoreError> {
        self.edit_tokens(id, &[token.to_string()], TokenEdit::Add).await
    }

    pub async fn remove_push_token(&self, id: &str, token: &str) -> Result<Account, StoreError> {
        self.remove_push_tokens(id, &[token.to_string()]).await
    }

    /// Drop exactly `tokens`. Tokens registered after the caller read the
    /// account stay in place.
    pub async fn remove_push_tokens(&self, id: &str, tokens: &[String]) -> Result<Account, StoreError> {
        self.edit_tokens(id, tokens, TokenEdit::Remove).await
    }

    /// Mirror a subscription change onto the account.
    pub async fn sync_subscription(
        &self,
        id: &str,
        tier: Tier,
        is_subscribed: bool,
        expiry: Option<DateTime<Utc>>,
    ) -> Result<Account, StoreError> {
        self.update_fields(
            id,
            json!({
                "subscriptionType": tier,
                "isSubscribed": is_subscribed,
                "subscriptionExpiry": expiry.as_ref().map(format_timestamp),
                "updatedAt": format_timestamp(&Utc::now()),
            }),
        )
        .await
    }

    /// Every account matching `where_clauses`, oldest first.
    pub async fn find_all(&self, where_clauses: Vec<WhereClause>) -> Result<Vec<Account>, StoreError> {
        let query = FindManyQuery::filter(where_clauses).sorted(SortBy {
            field: "createdAt".into(),
            direction: SortDirection::Asc,
        });
        decode_all(self.adapter.find_many(USERS, query).await?)
    }

    /// Newest-first page of accounts, optionally restricted to one tier.
    pub async fn list(&self, tier: Option<Tier>, page: Pagination) -> Result<Page<Account>, StoreError> {
        let clauses: Vec<WhereClause> = tier
            .map(|t| WhereClause::eq("subscriptionType", t.as_str()))
            .into_iter()
            .collect();
        let total = self.adapter.count(USERS, &clauses).await?;
        let query = FindManyQuery::filter(clauses)
            .sorted(SortBy::newest_first())
            .page(page.offset(), page.limit);
        let items = decode_all(self.adapter.find_many(USERS, query).await?)?;
        Ok(Page {
            items,
            total: total.max(0) as u64,
        })
    }

    pub async fn stats(&self) -> Result<UserStats, StoreError> {
        let count = |clauses: Vec<WhereClause>| {
            let adapter = self.adapter.clone();
            async move { adapter.count(USERS, &clauses).await.map(|n| n.max(0) as u64) }
        };

        let total_users = count(vec![]).await?;
        let active_users = count(vec![WhereClause::eq("isActive", true)]).await?;
        let subscribed_users = count(vec![WhereClause::eq("isSubscribed", true)]).await?;

        let mut subscription_stats = Vec::new();
        for tier in Tier::ALL {
            let n = count(vec![WhereClause::eq("subscriptionType", tier.as_str())]).await?;
            if n > 0 {
                subscription_stats.push(TierCount { tier, count: n });
            }
        }

        let recent = FindManyQuery::default().sorted(SortBy::newest_first()).page(0, 10);
        let recent_users = decode_all(self.adapter.find_many(USERS, recent).await?)?;

        Ok(UserStats {
            total_users,
            active_users,
            subscribed_users,
            subscription_stats,
            recent_users,
        })
    }

    async fn edit_tokens(
        &self,
        id: &str,
        tokens: &[String],
        edit: TokenEdit,
    ) -> Result<Account, StoreError> {
        if !is_valid_id(id) {
            return Err(StoreError::NotFound(ErrorCode::UserNotFound));
        }
        let by_id = [WhereClause::eq("id", id)];
        let values: Vec<serde_json::Value> = tokens.iter().map(|t| json!(t)).collect();
        let stamp = json!({ "updatedAt": format_timestamp(&Utc::now()) });
        let updated = match edit {
            TokenEdit::Add => {
                self.adapter
                    .add_to_set(USERS, &by_id, PUSH_TOKENS, &values, stamp)
                    .await?
            }
            TokenEdit::Remove => {
                self.adapter
                    .pull_all(USERS, &by_id, PUSH_TOKENS, &values, stamp)
                    .await?
            }
        };
        updated
            .map(decode)
            .transpose()?
            .ok_or(StoreError::NotFound(ErrorCode::UserNotFound))
    }

    async fn update_fields(&self, id: &str, data: serde_json::Value) -> Result<Account, StoreError> {
        self.adapter
            .update(USERS, &[WhereClause::eq("id", id)], data)
            .await?
            .map(decode)
            .transpose()?
            .ok_or(StoreError::NotFound(ErrorCode::UserNotFound))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pushgate_memory::MemoryAdapter;

    fn record(name: &str) -> AccountRecord {
        AccountRecord {
            account: Account::new(name, format!("{}@example.com", name.to_lowercase())),
            password: "00:00".into(),
        }
    }

    async fn store() -> AccountStore {
        let adapter = Arc::new(MemoryAdapter::new());
        adapter
            .ensure_indexes(&pushgate_core::db::Schema::default())
            .await
            .unwrap();
        AccountStore::new(adapter)
    }

    #[tokio::test]
    async fn test_password_hash_is_not_decoded_into_account() {
        let store = store().await;
        let created = store.create(record("Alice")).await.unwrap();
        let json = serde_json::to_value(&created).unwrap();
        assert!(json.get("password").is_none());

        let stored = store.find_record_by_email("alice@example.com").await.unwrap().unwrap();
        assert_eq!(stored.password, "00:00");
    }

    #[tokio::test]
    async fn test_duplicate_email_is_reported() {
        let store = store().await;
        store.create(record("Alice")).await.unwrap();
        let err = store.create(record("Alice")).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(ref f) if f == "email"));
    }

    #[tokio::test]
    async fn test_save_keeps_password() {
        let store = store().await;
        let mut account = store.create(record("Alice")).await.unwrap();
        account.name = "Alicia".into();
        store.save(&account).await.unwrap();

        let stored = store.find_record_by_email("alice@example.com").await.unwrap().unwrap();
        assert_eq!(stored.account.name, "Alicia");
        assert_eq!(stored.password, "00:00");
    }

    #[tokio::test]
    async fn test_push_tokens_have_set_semantics() {
        let store = store().await;
        let account = store.create(record("Alice")).await.unwrap();

        store.add_push_token(&account.id, "tok-1").await.unwrap();
        let updated = store.add_push_token(&account.id, "tok-1").await.unwrap();
        assert_eq!(updated.push_tokens, vec!["tok-1".to_string()]);

        let updated = store.remove_push_token(&account.id, "missing").await.unwrap();
        assert_eq!(updated.push_tokens.len(), 1);

        let updated = store.remove_push_token(&account.id, "tok-1").await.unwrap();
        assert!(updated.push_tokens.is_empty());
    }

    #[tokio::test]
    async fn test_removing_tried_tokens_keeps_fresh_registrations() {
        let store = store().await;
        let account = store.create(record("Alice")).await.unwrap();
        store.add_push_token(&account.id, "old-1").await.unwrap();
        store.add_push_token(&account.id, "old-2").await.unwrap();

        // The dispatcher read these two; a new device registers meanwhile.
        let tried = store.find_by_id(&account.id).await.unwrap().unwrap().push_tokens;
        store.add_push_token(&account.id, "new-1").await.unwrap();

        let updated = store.remove_push_tokens(&account.id, &tried).await.unwrap();
        assert_eq!(updated.push_tokens, vec!["new-1".to_string()]);
    }

    #[tokio::test]
    async fn test_concurrent_registrations_are_all_kept() {
        let store = store().await;
        let account = store.create(record("Alice")).await.unwrap();

        let adds = (0..16).map(|i| {
            let store = store.clone();
            let id = account.id.clone();
            tokio::spawn(async move { store.add_push_token(&id, &format!("tok-{i}")).await })
        });
        for handle in adds.collect::<Vec<_>>() {
            handle.await.unwrap().unwrap();
        }

        let stored = store.find_by_id(&account.id).await.unwrap().unwrap();
        assert_eq!(stored.push_tokens.len(), 16);
    }

    #[tokio::test]
    async fn test_token_ops_on_unknown_account() {
        let store = store().await;
        assert!(matches!(
            store.add_push_token("nope", "tok").await,
            Err(StoreError::NotFound(ErrorCode::UserNotFound))
        ));
        assert!(matches!(
            store.remove_push_tokens("nope", &["tok".to_string()]).await,
            Err(StoreError::NotFound(ErrorCode::UserNotFound))
        ));
    }

    #[tokio::test]
    async fn test_unknown_and_malformed_ids() {
        let store = store().await;
        assert!(store.find_by_id("nope").await.unwrap().is_none());
        assert!(store.find_by_id("../etc").await.unwrap().is_none());
        assert!(matches!(
            store.set_active("nope", false).await,
            Err(StoreError::NotFound(ErrorCode::UserNotFound))
        ));
    }

    #[tokio::test]
    async fn test_list_filters_by_tier() {
        let store = store().await;
        store.create(record("Alice")).await.unwrap();
        let bob = store.create(record("Bob")).await.unwrap();
        store
            .sync_subscription(&bob.id, Tier::Premium, true, None)
            .await
            .unwrap();

        let page = store
            .list(Some(Tier::Premium), Pagination { page: 1, limit: 20 })
            .await
            .unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].id, bob.id);

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.total_users, 2);
        assert_eq!(stats.subscribed_users, 1);
        assert_eq!(stats.recent_users.len(), 2);
    }
}
