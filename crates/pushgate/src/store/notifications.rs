// Notification records. Every record belongs to exactly one account.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::json;

use pushgate_core::db::adapter::{Adapter, FindManyQuery, SortBy, WhereClause};
use pushgate_core::db::models::Notification;
use pushgate_core::db::schema::NOTIFICATIONS;
use pushgate_core::error::ErrorCode;
use pushgate_core::utils::id::is_valid_id;
use pushgate_core::utils::time::format_timestamp;
use pushgate_core::utils::validation::Pagination;

use super::{decode, decode_all, encode, Page, StoreError};

#[derive(Debug, Clone)]
pub struct NotificationStore {
    adapter: Arc<dyn Adapter>,
}

impl NotificationStore {
    pub fn new(adapter: Arc<dyn Adapter>) -> Self {
        Self { adapter }
    }

    pub async fn create(&self, notification: &Notification) -> Result<Notification, StoreError> {
        let stored = self.adapter.create(NOTIFICATIONS, encode(notification)?).await?;
        decode(stored)
    }

    /// Newest-first page of the account's notifications.
    pub async fn list_for_user(&self, user_id: &str, page: Pagination) -> Result<Page<Notification>, StoreError> {
        let clauses = vec![WhereClause::eq("userId", user_id)];
        let total = self.adapter.count(NOTIFICATIONS, &clauses).await?;
        let query = FindManyQuery::filter(clauses)
            .sorted(SortBy::newest_first())
            .page(page.offset(), page.limit);
        let items = decode_all(self.adapter.find_many(NOTIFICATIONS, query).await?)?;
        Ok(Page {
            items,
            total: total.max(0) as u64,
        })
    }

    pub async fn unread_count(&self, user_id: &str) -> Result<u64, StoreError> {
        let n = self
            .adapter
            .count(
                NOTIFICATIONS,
                &[WhereClause::eq("userId", user_id), WhereClause::eq("isRead", false)],
            )
            .await?;
        Ok(n.max(0) as u64)
    }

    /// A notification owned by `user_id`. Other accounts' records are
    /// indistinguishable from missing ones.
    pub async fn find_for_user(&self, id: &str, user_id: &str) -> Result<Option<Notification>, StoreError> {
        if !is_valid_id(id) {
            return Ok(None);
        }
        self.adapter
            .find_one(
                NOTIFICATIONS,
                &[WhereClause::eq("id", id), WhereClause::eq("userId", user_id)],
            )
            .await?
            .map(decode)
            .transpose()
    }

    /// Mark one of the account's notifications read. Repeat calls leave
    /// `readAt` at its first value.
    pub async fn mark_read(&self, id: &str, user_id: &str, now: DateTime<Utc>) -> Result<Notification, StoreError> {
        let mut notification = self
            .find_for_user(id, user_id)
            .await?
            .ok_or(StoreError::NotFound(ErrorCode::NotificationNotFound))?;
        if !notification.mark_as_read(now) {
            return Ok(notification);
        }
        self.save(&notification).await
    }

    /// Mark every unread notification of the account read. Returns how many
    /// changed.
    pub async fn mark_all_read(&self, user_id: &str, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let ts = format_timestamp(&now);
        let n = self
            .adapter
            .update_many(
                NOTIFICATIONS,
                &[WhereClause::eq("userId", user_id), WhereClause::eq("isRead", false)],
                json!({ "isRead": true, "readAt": ts, "updatedAt": ts }),
            )
            .await?;
        Ok(n.max(0) as u64)
    }

    pub async fn mark_sent(&self, id: &str, now: DateTime<Utc>) -> Result<Notification, StoreError> {
        let ts = format_timestamp(&now);
        self.adapter
            .update(
                NOTIFICATIONS,
                &[WhereClause::eq("id", id)],
                json!({ "isSent": true, "sentAt": ts, "updatedAt": ts }),
            )
            .await?
            .map(decode)
            .transpose()?
            .ok_or(StoreError::NotFound(ErrorCode::NotificationNotFound))
    }

    pub async fn save(&self, notification: &Notification) -> Result<Notification, StoreError> {
        self.adapter
            .update(
                NOTIFICATIONS,
                &[WhereClause::eq("id", notification.id.as_str())],
                encode(notification)?,
            )
            .await?
            .map(decode)
            .transpose()?
            .ok_or(StoreError::NotFound(ErrorCode::NotificationNotFound))
    }
}
