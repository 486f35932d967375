pub mod adapter;
pub mod models;
pub mod schema;

pub use adapter::Adapter;
pub use models::{
    Account, AccountRecord, AccountSubscriptionStatus, NewSubscription, Notification,
    NotificationType, Platform, Subscription, SubscriptionStatus, Tier,
};
pub use schema::{CollectionSchema, IndexSpec, Schema};
