// `pushgate create-admin`: provision an enterprise account in the
// configured store, upgrading it in place when the email already exists.

use std::sync::Arc;

use anyhow::{bail, Context};
use clap::Args;
use colored::Colorize;

use pushgate::crypto::hash_password;
use pushgate::routes::auth::MIN_PASSWORD_LENGTH;
use pushgate::AppContext;
use pushgate_core::db::models::{Account, AccountRecord, Tier};
use pushgate_core::env::init_logger;
use pushgate_core::options::PushgateOptions;
use pushgate_core::push::DisabledPushProvider;
use pushgate_core::utils::validation::{is_valid_email, normalize_email};

#[derive(Args)]
pub struct CreateAdminArgs {
    /// Display name
    #[arg(long, default_value = "Admin")]
    name: String,

    /// Login email
    #[arg(long, env = "ADMIN_EMAIL")]
    email: String,

    /// Login password (at least 6 characters)
    #[arg(long, env = "ADMIN_PASSWORD", hide_env_values = true)]
    password: String,
}

pub async fn run(args: CreateAdminArgs) -> anyhow::Result<()> {
    init_logger();

    let email = normalize_email(&args.email);
    if !is_valid_email(&email) {
        bail!("{email:?} is not a valid email address");
    }
    if args.password.chars().count() < MIN_PASSWORD_LENGTH {
        bail!("password must be at least {MIN_PASSWORD_LENGTH} characters");
    }
    let name = args.name.trim();
    if !(2..=50).contains(&name.chars().count()) {
        bail!("name must be between 2 and 50 characters");
    }

    let options = PushgateOptions::from_env().context("loading configuration")?;
    let adapter = super::open_adapter(&options).await?;
    let ctx = AppContext::new(options, adapter, Arc::new(DisabledPushProvider));
    ctx.init().await.context("preparing the store")?;
    let accounts = &ctx.accounts;

    let password = hash_password(&args.password)?;

    let account = match accounts.find_by_email(&email).await? {
        Some(existing) => {
            accounts.set_password(&existing.id, &password).await?;
            accounts.set_active(&existing.id, true).await?;
            let account = accounts
                .sync_subscription(&existing.id, Tier::Enterprise, true, None)
                .await?;
            println!("{} {}", "Upgraded".yellow().bold(), account.email);
            account
        }
        None => {
            let account = accounts.create(admin_record(name, &email, password)).await?;
            println!("{} {}", "Created".green().bold(), account.email);
            account
        }
    };

    println!("  {} {}", "id:".cyan(), account.id);
    println!("  {} {}", "tier:".cyan(), account.subscription_type);
    Ok(())
}

/// A fresh active enterprise account without an expiry.
fn admin_record(name: &str, email: &str, password: String) -> AccountRecord {
    let mut account = Account::new(name, email);
    account.subscription_type = Tier::Enterprise;
    account.is_subscribed = true;
    account.subscription_expiry = None;
    AccountRecord { account, password }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::Utc;
    use pushgate::policy::require_tier;

    #[test]
    fn test_admin_record_passes_enterprise_gate() {
        let record = admin_record("Admin", "admin@example.com", "00:00".into());
        assert!(record.account.is_active);
        assert!(require_tier(&record.account, Tier::Enterprise, Utc::now()).is_ok());
    }
}
