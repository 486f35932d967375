// Persisted domain models.
//
// Field names serialize in camelCase; timestamps use the fixed-width form
// from `utils::time` so every store can order them as plain strings.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ErrorCode};
use crate::utils::id::generate_id;
use crate::utils::time::{add_months, option_timestamp, timestamp};

// ─── Tier ────────────────────────────────────────────────────────

/// Subscription level controlling endpoint access.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    #[default]
    Free,
    Premium,
    Enterprise,
}

impl Tier {
    pub const ALL: [Tier; 3] = [Tier::Free, Tier::Premium, Tier::Enterprise];

    /// Access level ordinal: free=0, premium=1, enterprise=2.
    pub fn ordinal(self) -> u8 {
        match self {
            Self::Free => 0,
            Self::Premium => 1,
            Self::Enterprise => 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Premium => "premium",
            Self::Enterprise => "enterprise",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "free" => Some(Self::Free),
            "premium" => Some(Self::Premium),
            "enterprise" => Some(Self::Enterprise),
            _ => None,
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Account ─────────────────────────────────────────────────────

/// Derived view of an account's subscription state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountSubscriptionStatus {
    Inactive,
    Expired,
    Active,
}

/// A user account. The password hash lives in [`AccountRecord`] and never
/// appears here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub is_subscribed: bool,
    #[serde(default)]
    pub subscription_type: Tier,
    #[serde(default, with = "option_timestamp")]
    pub subscription_expiry: Option<DateTime<Utc>>,
    #[serde(default)]
    pub push_tokens: Vec<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default, with = "option_timestamp")]
    pub last_login: Option<DateTime<Utc>>,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub updated_at: DateTime<Utc>,
}

fn default_true() -> bool {
    true
}

impl Account {
    /// A fresh, active, free-tier account. `email` is expected normalized.
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: generate_id(),
            name: name.into(),
            email: email.into(),
            is_subscribed: false,
            subscription_type: Tier::Free,
            subscription_expiry: None,
            push_tokens: Vec::new(),
            is_active: true,
            last_login: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn subscription_status(&self, now: DateTime<Utc>) -> AccountSubscriptionStatus {
        if !self.is_subscribed {
            return AccountSubscriptionStatus::Inactive;
        }
        match self.subscription_expiry {
            Some(expiry) if expiry < now => AccountSubscriptionStatus::Expired,
            _ => AccountSubscriptionStatus::Active,
        }
    }

    /// JSON sent to clients: the stored fields plus `subscriptionStatus`.
    pub fn to_public_json(&self) -> serde_json::Value {
        let mut value = serde_json::to_value(self).unwrap_or_default();
        if let Some(obj) = value.as_object_mut() {
            obj.insert(
                "subscriptionStatus".to_string(),
                serde_json::json!(self.subscription_status(Utc::now())),
            );
        }
        value
    }
}

/// Stored form of an account: the public fields plus the password hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountRecord {
    #[serde(flatten)]
    pub account: Account,
    pub password: String,
}

// ─── Subscription ────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    Pending,
    #[default]
    Active,
    Cancelled,
    Expired,
}

impl SubscriptionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Cancelled => "cancelled",
            Self::Expired => "expired",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "active" => Some(Self::Active),
            "cancelled" => Some(Self::Cancelled),
            "expired" => Some(Self::Expired),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub id: String,
    pub user_id: String,
    #[serde(rename = "type")]
    pub tier: Tier,
    pub status: SubscriptionStatus,
    #[serde(with = "timestamp")]
    pub start_date: DateTime<Utc>,
    #[serde(default, with = "option_timestamp")]
    pub end_date: Option<DateTime<Utc>>,
    pub price: f64,
    pub currency: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_id: Option<String>,
    #[serde(default = "default_true")]
    pub auto_renew: bool,
    #[serde(default, with = "option_timestamp")]
    pub cancelled_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancelled_by: Option<String>,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub updated_at: DateTime<Utc>,
}

/// Inputs for a new subscription.
#[derive(Debug, Clone)]
pub struct NewSubscription {
    pub user_id: String,
    pub tier: Tier,
    pub price: f64,
    pub currency: Option<String>,
    pub payment_method: Option<String>,
    pub payment_id: Option<String>,
}

impl Subscription {
    /// An active subscription starting at `now`. Paid tiers run for one
    /// month; free has no end date.
    pub fn start(input: NewSubscription, now: DateTime<Utc>) -> Self {
        let end_date = (input.tier != Tier::Free).then(|| add_months(now, 1));
        let currency = input
            .currency
            .map(|c| c.trim().to_uppercase())
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| "USD".to_string());
        Self {
            id: generate_id(),
            user_id: input.user_id,
            tier: input.tier,
            status: SubscriptionStatus::Active,
            start_date: now,
            end_date,
            price: input.price,
            currency,
            payment_method: input.payment_method,
            payment_id: input.payment_id,
            auto_renew: true,
            cancelled_at: None,
            cancelled_by: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.status == SubscriptionStatus::Active && self.end_date.map_or(true, |end| end > now)
    }

    pub fn cancel(&mut self, by: &str, now: DateTime<Utc>) {
        self.status = SubscriptionStatus::Cancelled;
        self.cancelled_at = Some(now);
        self.cancelled_by = Some(by.to_string());
        self.updated_at = now;
    }

    /// Extend an active subscription by `months` from its current end date
    /// (or from `now` when it has none).
    pub fn renew(&mut self, months: u32, now: DateTime<Utc>) -> Result<(), ApiError> {
        if self.status != SubscriptionStatus::Active {
            return Err(ApiError::bad_request(ErrorCode::SubscriptionNotRenewable));
        }
        let base = self.end_date.unwrap_or(now);
        self.end_date = Some(add_months(base, months));
        self.updated_at = now;
        Ok(())
    }
}

// ─── Notification ────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationType {
    #[default]
    Info,
    Warning,
    Success,
    Error,
}

impl NotificationType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Success => "success",
            Self::Error => "error",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "info" => Some(Self::Info),
            "warning" => Some(Self::Warning),
            "success" => Some(Self::Success),
            "error" => Some(Self::Error),
            _ => None,
        }
    }

    /// Android notification channel for this type.
    pub fn channel(self) -> &'static str {
        match self {
            Self::Error => "updates",
            Self::Warning => "promotions",
            _ => "default",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    pub title: String,
    pub message: String,
    #[serde(rename = "type", default)]
    pub kind: NotificationType,
    /// Owning account; `None` for records not tied to one recipient.
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub is_read: bool,
    #[serde(default, with = "option_timestamp")]
    pub read_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_sent: bool,
    #[serde(default, with = "option_timestamp")]
    pub sent_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub data: serde_json::Map<String, serde_json::Value>,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub updated_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(
        title: impl Into<String>,
        message: impl Into<String>,
        kind: NotificationType,
        user_id: Option<String>,
        data: serde_json::Map<String, serde_json::Value>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: generate_id(),
            title: title.into(),
            message: message.into(),
            kind,
            user_id,
            is_read: false,
            read_at: None,
            is_sent: false,
            sent_at: None,
            data,
            created_at: now,
            updated_at: now,
        }
    }

    /// Mark read. `readAt` is only set the first time; returns whether
    /// anything changed.
    pub fn mark_as_read(&mut self, now: DateTime<Utc>) -> bool {
        if self.is_read {
            return false;
        }
        self.is_read = true;
        self.read_at = Some(now);
        self.updated_at = now;
        true
    }
}

// ─── Platform ────────────────────────────────────────────────────

/// Device platform reported when registering a push token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Ios,
    Android,
    Web,
}

impl Platform {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ios" => Some(Self::Ios),
            "android" => Some(Self::Android),
            "web" => Some(Self::Web),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn test_tier_ordinals() {
        assert!(Tier::Enterprise.ordinal() > Tier::Premium.ordinal());
        assert!(Tier::Premium.ordinal() > Tier::Free.ordinal());
        assert_eq!(Tier::parse("premium"), Some(Tier::Premium));
        assert_eq!(Tier::parse("gold"), None);
    }

    #[test]
    fn test_subscription_status_view() {
        let now = Utc::now();
        let mut acct = Account::new("Alice", "alice@example.com");
        assert_eq!(acct.subscription_status(now), AccountSubscriptionStatus::Inactive);

        acct.is_subscribed = true;
        acct.subscription_expiry = Some(now - Duration::days(1));
        assert_eq!(acct.subscription_status(now), AccountSubscriptionStatus::Expired);

        acct.subscription_expiry = Some(now + Duration::days(1));
        assert_eq!(acct.subscription_status(now), AccountSubscriptionStatus::Active);
    }

    #[test]
    fn test_account_record_keeps_hash_out_of_account_json() {
        let record = AccountRecord {
            account: Account::new("Alice", "alice@example.com"),
            password: "salt:key".into(),
        };
        let stored = serde_json::to_value(&record).unwrap();
        assert_eq!(stored["password"], "salt:key");
        assert_eq!(stored["subscriptionType"], "free");

        let back: AccountRecord = serde_json::from_value(stored).unwrap();
        let public = back.account.to_public_json();
        assert!(public.get("password").is_none());
        assert_eq!(public["subscriptionStatus"], "inactive");
    }

    #[test]
    fn test_paid_subscription_runs_one_month() {
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap();
        let sub = Subscription::start(
            NewSubscription {
                user_id: "u1".into(),
                tier: Tier::Premium,
                price: 9.99,
                currency: Some("eur".into()),
                payment_method: None,
                payment_id: None,
            },
            now,
        );
        assert_eq!(sub.currency, "EUR");
        assert_eq!(sub.end_date, Some(Utc.with_ymd_and_hms(2024, 4, 10, 12, 0, 0).unwrap()));
        assert!(sub.is_active(now));
        assert!(!sub.is_active(now + Duration::days(40)));
    }

    #[test]
    fn test_free_subscription_has_no_end() {
        let now = Utc::now();
        let sub = Subscription::start(
            NewSubscription {
                user_id: "u1".into(),
                tier: Tier::Free,
                price: 0.0,
                currency: None,
                payment_method: None,
                payment_id: None,
            },
            now,
        );
        assert_eq!(sub.currency, "USD");
        assert!(sub.end_date.is_none());
        assert!(sub.is_active(now + Duration::days(3650)));
    }

    #[test]
    fn test_cancel_then_renew_is_rejected() {
        let now = Utc::now();
        let mut sub = Subscription::start(
            NewSubscription {
                user_id: "u1".into(),
                tier: Tier::Enterprise,
                price: 49.0,
                currency: None,
                payment_method: None,
                payment_id: None,
            },
            now,
        );
        let end = sub.end_date.unwrap();
        sub.renew(2, now).unwrap();
        assert_eq!(sub.end_date, Some(add_months(end, 2)));

        sub.cancel("u1", now);
        assert_eq!(sub.status, SubscriptionStatus::Cancelled);
        assert_eq!(sub.cancelled_by.as_deref(), Some("u1"));
        assert!(sub.renew(1, now).is_err());
    }

    #[test]
    fn test_mark_as_read_is_idempotent() {
        let mut n = Notification::new("Hi", "Hello", NotificationType::Info, None, Default::default());
        let first = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert!(n.mark_as_read(first));
        assert!(!n.mark_as_read(first + Duration::hours(1)));
        assert!(n.is_read);
        assert_eq!(n.read_at, Some(first));
    }

    #[test]
    fn test_channel_mapping() {
        assert_eq!(NotificationType::Error.channel(), "updates");
        assert_eq!(NotificationType::Warning.channel(), "promotions");
        assert_eq!(NotificationType::Success.channel(), "default");
    }
}
