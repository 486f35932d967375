// Subscription history per account.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Datelike, Duration, TimeZone, Utc};
use serde::Serialize;

use pushgate_core::db::adapter::{Adapter, FindManyQuery, SortBy, WhereClause};
use pushgate_core::db::models::{NewSubscription, Subscription, SubscriptionStatus, Tier};
use pushgate_core::db::schema::SUBSCRIPTIONS;
use pushgate_core::error::ErrorCode;
use pushgate_core::utils::validation::Pagination;

use super::{decode, decode_all, encode, Page, StoreError};

/// Window used for the "expiring soon" statistic.
pub const EXPIRING_WITHIN_DAYS: i64 = 7;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RevenueStat {
    pub tier: Tier,
    pub total_revenue: f64,
    pub count: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionStats {
    pub total_subscriptions: u64,
    pub active_subscriptions: u64,
    pub expiring_subscriptions: u64,
    pub revenue_stats: Vec<RevenueStat>,
    pub monthly_revenue: f64,
}

#[derive(Debug, Clone)]
pub struct SubscriptionStore {
    adapter: Arc<dyn Adapter>,
}

impl SubscriptionStore {
    pub fn new(adapter: Arc<dyn Adapter>) -> Self {
        Self { adapter }
    }

    pub async fn create(&self, input: NewSubscription, now: DateTime<Utc>) -> Result<Subscription, StoreError> {
        let subscription = Subscription::start(input, now);
        let stored = self.adapter.create(SUBSCRIPTIONS, encode(&subscription)?).await?;
        decode(stored)
    }

    /// The account's subscription with status `active`, if any. The end
    /// date is not consulted.
    pub async fn find_active_for_user(&self, user_id: &str) -> Result<Option<Subscription>, StoreError> {
        let query = FindManyQuery::filter(vec![
            WhereClause::eq("userId", user_id),
            WhereClause::eq("status", SubscriptionStatus::Active.as_str()),
        ])
        .sorted(SortBy::newest_first())
        .page(0, 1);
        Ok(decode_all(self.adapter.find_many(SUBSCRIPTIONS, query).await?)?.pop())
    }

    /// Most recently created subscription of the account, any status.
    pub async fn latest_for_user(&self, user_id: &str) -> Result<Option<Subscription>, StoreError> {
        let query = FindManyQuery::filter(vec![WhereClause::eq("userId", user_id)])
            .sorted(SortBy::newest_first())
            .page(0, 1);
        Ok(decode_all(self.adapter.find_many(SUBSCRIPTIONS, query).await?)?.pop())
    }

    pub async fn save(&self, subscription: &Subscription) -> Result<Subscription, StoreError> {
        self.adapter
            .update(
                SUBSCRIPTIONS,
                &[WhereClause::eq("id", subscription.id.as_str())],
                encode(subscription)?,
            )
            .await?
            .map(decode)
            .transpose()?
            .ok_or(StoreError::NotFound(ErrorCode::SubscriptionNotFound))
    }

    pub async fn list(
        &self,
        status: Option<SubscriptionStatus>,
        page: Pagination,
    ) -> Result<Page<Subscription>, StoreError> {
        let clauses: Vec<WhereClause> = status
            .map(|s| WhereClause::eq("status", s.as_str()))
            .into_iter()
            .collect();
        let total = self.adapter.count(SUBSCRIPTIONS, &clauses).await?;
        let query = FindManyQuery::filter(clauses)
            .sorted(SortBy::newest_first())
            .page(page.offset(), page.limit);
        let items = decode_all(self.adapter.find_many(SUBSCRIPTIONS, query).await?)?;
        Ok(Page {
            items,
            total: total.max(0) as u64,
        })
    }

    pub async fn stats(&self, now: DateTime<Utc>) -> Result<SubscriptionStats, StoreError> {
        let total = self.adapter.count(SUBSCRIPTIONS, &[]).await?;
        let active_records: Vec<Subscription> = decode_all(
            self.adapter
                .find_many(
                    SUBSCRIPTIONS,
                    FindManyQuery::filter(vec![WhereClause::eq(
                        "status",
                        SubscriptionStatus::Active.as_str(),
                    )]),
                )
                .await?,
        )?;
        Ok(summarize(total.max(0) as u64, &active_records, now))
    }
}

/// Aggregate statistics from the full set of `active`-status records.
fn summarize(total: u64, active_records: &[Subscription], now: DateTime<Utc>) -> SubscriptionStats {
    let horizon = now + Duration::days(EXPIRING_WITHIN_DAYS);
    let month_start = Utc
        .with_ymd_and_hms(now.year(), now.month(), 1, 0, 0, 0)
        .single()
        .unwrap_or(now);

    let active_subscriptions = active_records.iter().filter(|s| s.is_active(now)).count() as u64;
    let expiring_subscriptions = active_records
        .iter()
        .filter(|s| s.end_date.is_some_and(|end| end >= now && end <= horizon))
        .count() as u64;

    let mut by_tier: BTreeMap<u8, RevenueStat> = BTreeMap::new();
    for sub in active_records {
        let entry = by_tier.entry(sub.tier.ordinal()).or_insert(RevenueStat {
            tier: sub.tier,
            total_revenue: 0.0,
            count: 0,
        });
        entry.total_revenue += sub.price;
        entry.count += 1;
    }

    let monthly_revenue = active_records
        .iter()
        .filter(|s| s.created_at >= month_start)
        .map(|s| s.price)
        .sum();

    SubscriptionStats {
        total_subscriptions: total,
        active_subscriptions,
        expiring_subscriptions,
        revenue_stats: by_tier.into_values().collect(),
        monthly_revenue,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pushgate_memory::MemoryAdapter;

    fn input(user: &str, tier: Tier, price: f64) -> NewSubscription {
        NewSubscription {
            user_id: user.into(),
            tier,
            price,
            currency: None,
            payment_method: None,
            payment_id: None,
        }
    }

    #[tokio::test]
    async fn test_active_lookup_ignores_cancelled() {
        let store = SubscriptionStore::new(Arc::new(MemoryAdapter::new()));
        let now = Utc::now();
        let mut sub = store.create(input("u1", Tier::Premium, 9.99), now).await.unwrap();
        assert!(store.find_active_for_user("u1").await.unwrap().is_some());

        sub.cancel("u1", now);
        store.save(&sub).await.unwrap();
        assert!(store.find_active_for_user("u1").await.unwrap().is_none());

        let latest = store.latest_for_user("u1").await.unwrap().unwrap();
        assert_eq!(latest.status, SubscriptionStatus::Cancelled);
        assert_eq!(latest.cancelled_by.as_deref(), Some("u1"));
    }

    #[test]
    fn test_summarize_revenue_and_expiring() {
        let now = Utc::now();
        let premium = Subscription::start(input("a", Tier::Premium, 10.0), now);
        let mut enterprise = Subscription::start(input("b", Tier::Enterprise, 50.0), now);
        enterprise.end_date = Some(now + Duration::days(3));
        let mut lapsed = Subscription::start(input("c", Tier::Premium, 10.0), now);
        lapsed.end_date = Some(now - Duration::days(1));

        let stats = summarize(5, &[premium, enterprise, lapsed], now);
        assert_eq!(stats.total_subscriptions, 5);
        assert_eq!(stats.active_subscriptions, 2);
        assert_eq!(stats.expiring_subscriptions, 1);
        assert_eq!(stats.revenue_stats.len(), 2);
        assert_eq!(stats.revenue_stats[0].tier, Tier::Premium);
        assert_eq!(stats.revenue_stats[0].count, 2);
        assert!((stats.monthly_revenue - 70.0).abs() < f64::EPSILON);
    }
}
