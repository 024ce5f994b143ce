//! Bazaar CLI - database migrations and account management.
//!
//! # Usage
//!
//! ```bash
//! # Create the schema and the session table
//! bazaar-cli migrate
//!
//! # Create an account without going through the web form
//! bazaar-cli user create -u ada -e ada@example.com -r vendor
//!
//! # Set a new password for an existing account
//! bazaar-cli user set-password -u ada
//!
//! # Remove used and expired password reset tokens
//! bazaar-cli tokens purge
//!
//! # Inspect or delete any record
//! bazaar-cli admin list products
//! bazaar-cli admin delete reviews 7
//! ```
//!
//! Every command reads `BAZAAR_DATABASE_URL` (or `DATABASE_URL`), loading a
//! `.env` file first when one exists.

#![cfg_attr(not(test), forbid(unsafe_code))]

use bazaar_storefront::db::Entity;
use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "bazaar-cli")]
#[command(version, about = "Bazaar storefront CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage accounts
    User {
        #[command(subcommand)]
        action: UserAction,
    },
    /// Manage password reset tokens
    Tokens {
        #[command(subcommand)]
        action: TokenAction,
    },
    /// Inspect and delete records
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
}

#[derive(Subcommand)]
enum UserAction {
    /// Create a vendor or buyer account
    Create {
        #[arg(short, long)]
        username: String,

        #[arg(short, long)]
        email: String,

        /// Account role (`vendor` or `buyer`)
        #[arg(short, long, default_value = "buyer")]
        role: String,

        /// Password; prefer the environment variable over the flag
        #[arg(long, env = "BAZAAR_USER_PASSWORD", hide_env_values = true)]
        password: String,

        #[arg(long, default_value = "")]
        first_name: String,

        #[arg(long, default_value = "")]
        last_name: String,
    },
    /// Replace an account's password
    SetPassword {
        #[arg(short, long)]
        username: String,

        /// New password; prefer the environment variable over the flag
        #[arg(long, env = "BAZAAR_USER_PASSWORD", hide_env_values = true)]
        password: String,
    },
}

#[derive(Subcommand)]
enum AdminAction {
    /// List the newest records of an entity
    List {
        /// users, stores, products, orders, order-items, reviews or reset-tokens
        entity: Entity,

        #[arg(short, long, default_value_t = 50)]
        limit: i64,
    },
    /// Delete one record and everything that depends on it
    Delete {
        /// users, stores, products, orders, order-items, reviews or reset-tokens
        entity: Entity,

        id: i32,
    },
}

#[derive(Subcommand)]
enum TokenAction {
    /// Delete used and expired password reset tokens
    Purge,
}

#[tokio::main]
async fn main() {
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
                username,
                email,
                role,
                password,
                first_name,
                last_name,
            } => {
                commands::users::create(commands::users::NewAccount {
                    username,
                    email,
                    role,
                    password,
                    first_name,
                    last_name,
                })
                .await?;
            }
            UserAction::SetPassword { username, password } => {
                commands::users::set_password(&username, &password).await?;
            }
        },
        Commands::Tokens { action } => match action {
            TokenAction::Purge => {
                commands::tokens::purge().await?;
            }
        },
        Commands::Admin { action } => match action {
            AdminAction::List { entity, limit } => commands::admin::list(entity, limit).await?,
            AdminAction::Delete { entity, id } => commands::admin::delete(entity, id).await?,
        },
    }
    Ok(())
}
