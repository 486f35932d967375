// Account fixtures.

use chrono::{Duration, Utc};

use pushgate_core::db::adapter::Adapter;
use pushgate_core::db::models::{Account, AccountRecord, Tier};
use pushgate_core::db::schema::USERS;

/// An active account on `tier`. Paid tiers are subscribed with an expiry
/// 30 days out. The password hash is a placeholder that never verifies.
pub fn account_fixture(name: &str, tier: Tier, tokens: &[&str]) -> AccountRecord {
    let email = format!("{}@example.com", name.to_lowercase().replace(' ', "."));
    let mut account = Account::new(name, email);
    account.subscription_type = tier;
    if tier != Tier::Free {
        account.is_subscribed = true;
        account.subscription_expiry = Some(Utc::now() + Duration::days(30));
    }
    account.push_tokens = tokens.iter().map(|t| t.to_string()).collect();
    AccountRecord {
        account,
        password: "00:00".to_string(),
    }
}

/// Store `record` directly through the adapter and return its account.
pub async fn insert_account(adapter: &dyn Adapter, record: AccountRecord) -> Account {
    let value = serde_json::to_value(&record).expect("account record serializes");
    adapter
        .create(USERS, value)
        .await
        .expect("fixture insert succeeds");
    record.account
}
