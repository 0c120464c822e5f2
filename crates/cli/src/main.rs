//! Snippetbox CLI - Database migrations and user management.
//!
//! # Usage
//!
//! ```bash
//! # Run application and session-table migrations
//! snippetbox-cli migrate
//!
//! # Create a user
//! snippetbox-cli user create -n "Alice" -e alice@example.com -p 'pa55word!'
//!
//! # Delete a user (their live sessions become anonymous on next request)
//! snippetbox-cli user delete -e alice@example.com
//! ```
//!
//! # Environment Variables
//!
//! - `SNIPPETBOX_DATABASE_URL` (or `DATABASE_URL`) - `PostgreSQL` connection string

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "snippetbox-cli")]
#[command(author, version, about = "Snippetbox CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations, including the session table
    Migrate,
    /// Manage users
    User {
        #[command(subcommand)]
        action: UserAction,
    },
}

#[derive(Subcommand)]
enum UserAction {
    /// Create a new user
    Create {
        /// Display name
        #[arg(short, long)]
        name: String,

        /// Email address
        #[arg(short, long)]
        email: String,

        /// Password (at least 8 characters)
        #[arg(short, long)]
        password: String,
    },
    /// Delete a user by email
    Delete {
        /// Email address
        #[arg(short, long)]
        email: String,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::CliError> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::User { action } => match action {
            UserAction::Create {
                name,
                email,
                password,
            } => {
                commands::user::create(&name, &email, &password).await?;
            }
            UserAction::Delete { email } => commands::user::delete(&email).await?,
        },
    }
    Ok(())
}
