// `pushgate info`: show the configuration `serve` would start with.
// Secrets and database credentials are masked.

use anyhow::Context;
use clap::Args;
use colored::Colorize;
use serde_json::{json, Value};

use pushgate_core::options::PushgateOptions;

#[derive(Args)]
pub struct InfoArgs {
    /// Output as JSON
    #[arg(short, long)]
    json: bool,
}

pub fn run(args: InfoArgs) -> anyhow::Result<()> {
    let options = PushgateOptions::from_env().context("loading configuration")?;
    let report = report(&options);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!();
    println!("{}", "📊 pushgate configuration".bold());
    println!("{}", "═".repeat(55).dimmed());

    println!();
    println!("{}", "🖥️  Runtime:".bold().white());
    println!("  {} {}", "Version:".cyan(), report["version"].as_str().unwrap_or_default());
    println!("  {} {} / {}", "Platform:".cyan(), std::env::consts::OS, std::env::consts::ARCH);
    println!("  {} {}", "Mode:".cyan(), report["config"]["mode"].as_str().unwrap_or_default());
    println!("  {} {}", "Port:".cyan(), options.port);

    println!();
    println!("{}", "🗄️  Database:".bold().white());
    println!("  {} {}", "Store:".cyan(), report["store"].as_str().unwrap_or_default());
    if let Some(uri) = report["config"]["database"]["uri"].as_str() {
        println!("  {} {}", "URI:".cyan(), uri);
    }
    println!("  {} {}", "Name:".cyan(), options.database.name);

    println!();
    println!("{}", "🔐 Access tokens:".bold().white());
    println!("  {} {}", "Secret:".cyan(), "<redacted>".dimmed());
    println!("  {} {}s", "Lifetime:".cyan(), options.jwt.expires_in);

    println!();
    println!("{}", "🌐 HTTP:".bold().white());
    for origin in &options.cors.origins {
        println!("  {} {}", "CORS origin:".cyan(), origin);
    }
    if options.rate_limit.enabled {
        println!(
            "  {} {} requests / {}ms",
            "Rate limit:".cyan(),
            options.rate_limit.max,
            options.rate_limit.window_ms
        );
    } else {
        println!("  {} {}", "Rate limit:".cyan(), "disabled".dimmed());
    }

    println!();
    println!("{}", "🔔 Push:".bold().white());
    let push = report["push"].as_str().unwrap_or_default();
    if report["pushEnabled"] == true {
        println!("  {} {}", "Firebase:".cyan(), push.green());
    } else {
        println!("  {} {}", "Firebase:".cyan(), push.yellow());
    }
    println!("  {} {}", "Dispatch concurrency:".cyan(), options.dispatch.concurrency);

    println!();
    println!("{}", "═".repeat(55).dimmed());
    println!("{}", "💡 Tip: Use --json flag for JSON output".dimmed());
    println!();

    Ok(())
}

fn report(options: &PushgateOptions) -> Value {
    let store = if options.database.uri.is_some() { "mongodb" } else { "memory" };
    let key_file = std::path::Path::new(&options.push.firebase_admin_key_path);
    let push = if options.push.firebase_admin_key.is_some() {
        "inline service-account key".to_string()
    } else if key_file.exists() {
        format!("key file {}", options.push.firebase_admin_key_path)
    } else {
        "not configured (push disabled)".to_string()
    };

    json!({
        "version": env!("CARGO_PKG_VERSION"),
        "store": store,
        "push": push,
        "pushEnabled": options.push.firebase_admin_key.is_some() || key_file.exists(),
        "config": options.redacted(),
    })
}
