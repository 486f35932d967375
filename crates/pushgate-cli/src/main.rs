use clap::{Parser, Subcommand};

mod commands;

/// pushgate: accounts, subscriptions and push notifications over HTTP
#[derive(Parser)]
#[command(name = "pushgate", version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server
    Serve,

    /// Generate a random secret for JWT_SECRET
    Secret,

    /// Create an enterprise account, or upgrade an existing one
    CreateAdmin(commands::create_admin::CreateAdminArgs),

    /// Display the resolved configuration
    Info(commands::info::InfoArgs),
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Serve => commands::serve::run().await,
        Commands::Secret => commands::secret::run(),
        Commands::CreateAdmin(args) => commands::create_admin::run(args).await,
        Commands::Info(args) => commands::info::run(args),
    };

    if let Err(e) = result {
        eprintln!("{} {:#}", colored::Colorize::red("error:"), e);
        std::process::exit(1);
    }
}
