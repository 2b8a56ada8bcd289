//! CLI administration tool for resource-api.
//!
//! Manages user accounts, issues bearer tokens and performs database
//! operations without going through the HTTP API.
//!
//! # Usage
//!
//! ```bash
//! # Create an administrator (password is prompted)
//! cargo run --bin admin -- user create --email admin@example.com --admin
//!
//! # Promote, demote or reset a password
//! cargo run --bin admin -- user update --email someone@example.com --admin
//! cargo run --bin admin -- user update --email someone@example.com --password
//!
//! # Bring back a deleted account
//! cargo run --bin admin -- user restore --email someone@example.com
//!
//! # Issue a bearer token
//! cargo run --bin admin -- token issue --email admin@example.com
//!
//! # Database
//! cargo run --bin admin -- db check
//! cargo run --bin admin -- db migrate
//! ```
//!
//! # Environment Variables
//!
//! - `DATABASE_URL` (optional): SQLite URL, defaults to `sqlite://resource-api.db`
//! - `TOKEN_SIGNING_SECRET` (required for `token issue`)

use resource_api::application::services::UserService;
use resource_api::config::{Config, DEFAULT_DATABASE_URL};
use resource_api::domain::entities::User;
use resource_api::domain::entity::Fields;
use resource_api::infrastructure::persistence::{ListQuery, RecordStore, pool};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use dialoguer::{Confirm, Password};
use serde_json::Value;
use sqlx::SqlitePool;

/// CLI tool for managing resource-api.
#[derive(Parser)]
#[command(name = "admin")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Top-level command groups.
#[derive(Subcommand)]
enum Commands {
    /// Manage user accounts
    User {
        #[command(subcommand)]
        action: UserAction,
    },

    /// Issue bearer tokens
    Token {
        #[command(subcommand)]
        action: TokenAction,
    },

    /// Database operations
    Db {
        #[command(subcommand)]
        action: DbAction,
    },
}

/// User management subcommands.
#[derive(Subcommand)]
enum UserAction {
    /// Create a user
    Create {
        #[arg(short, long)]
        email: String,

        /// Grant administrator rights
        #[arg(long)]
        admin: bool,

        #[arg(long)]
        first_name: Option<String>,

        #[arg(long)]
        last_name: Option<String>,

        /// Skip confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },

    /// Update a user
    Update {
        #[arg(short, long)]
        email: String,

        /// Prompt for a new password
        #[arg(long)]
        password: bool,

        /// Grant administrator rights
        #[arg(long, conflicts_with = "no_admin")]
        admin: bool,

        /// Revoke administrator rights
        #[arg(long)]
        no_admin: bool,

        #[arg(long)]
        first_name: Option<String>,

        #[arg(long)]
        last_name: Option<String>,
    },

    /// Restore a deleted user
    Restore {
        #[arg(short, long)]
        email: String,
    },

    /// List users
    List {
        /// Include deleted users
        #[arg(long)]
        deleted: bool,
    },
}

/// Token subcommands.
#[derive(Subcommand)]
enum TokenAction {
    /// Issue a bearer token for a user
    Issue {
        #[arg(short, long)]
        email: String,
    },
}

/// Database operation subcommands.
#[derive(Subcommand)]
enum DbAction {
    /// Check database connection
    Check,

    /// Apply pending migrations
    Migrate,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let database_url =
        std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string());
    let pool = pool::connect_url(&database_url).await?;

    match cli.command {
        Commands::User { action } => handle_user_action(action, &pool).await?,
        Commands::Token { action } => handle_token_action(action, &pool).await?,
        Commands::Db { action } => handle_db_action(action, &pool).await?,
    }

    Ok(())
}

/// Dispatches user management commands.
async fn handle_user_action(action: UserAction, pool: &SqlitePool) -> Result<()> {
    match action {
        UserAction::Create {
            email,
            admin,
            first_name,
            last_name,
            yes,
        } => create_user(pool, email, admin, first_name, last_name, yes).await,
        UserAction::Update {
            email,
            password,
            admin,
            no_admin,
            first_name,
            last_name,
        } => {
            let is_admin = match (admin, no_admin) {
                (true, _) => Some(true),
                (_, true) => Some(false),
                _ => None,
            };
            update_user(pool, email, password, is_admin, first_name, last_name).await
        }
        UserAction::Restore { email } => restore_user(pool, email).await,
        UserAction::List { deleted } => list_users(pool, deleted).await,
    }
}

fn prompt_password() -> Result<String> {
    let password = Password::new()
        .with_prompt("Password")
        .with_confirmation("Repeat password", "Passwords don't match")
        .interact()?;
    Ok(password)
}

/// Creates a user with a prompted password.
async fn create_user(
    pool: &SqlitePool,
    email: String,
    admin: bool,
    first_name: Option<String>,
    last_name: Option<String>,
    skip_confirm: bool,
) -> Result<()> {
    println!("{}", "Create user".bright_blue().bold());
    println!();

    let password = prompt_password()?;

    let mut fields = Fields::new();
    fields.insert("email".into(), Value::String(email.clone()));
    fields.insert("password".into(), Value::String(password));
    fields.insert("is_admin".into(), Value::Bool(admin));
    if let Some(name) = first_name {
        fields.insert("first_name".into(), Value::String(name));
    }
    if let Some(name) = last_name {
        fields.insert("last_name".into(), Value::String(name));
    }

    println!();
    println!("  Email: {}", email.cyan());
    println!(
        "  Admin: {}",
        if admin { "yes".yellow() } else { "no".normal() }
    );
    println!();

    if !skip_confirm {
        let confirmed = Confirm::new()
            .with_prompt("Create this user?")
            .default(true)
            .interact()?;

        if !confirmed {
            println!("{}", "Cancelled".red());
            return Ok(());
        }
    }

    let mut tx = pool.begin().await?;
    let user = RecordStore::<User>::new(&mut tx)
        .create(&fields)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create user: {e}"))?;
    tx.commit().await?;

    println!();
    println!("{}", "User created".green().bold());
    println!("  ID: {}", user.id.to_string().bright_black());
    println!();

    Ok(())
}

async fn find_user(pool: &SqlitePool, email: &str, including_deleted: bool) -> Result<User> {
    let mut conn = pool.acquire().await?;
    UserService::new(&mut conn)
        .find_by_email(email, including_deleted)
        .await
        .map_err(|e| anyhow::anyhow!("Database error: {e}"))?
        .with_context(|| format!("No user with email {email}"))
}

/// Updates password, administrator flag or names of a live user.
async fn update_user(
    pool: &SqlitePool,
    email: String,
    password: bool,
    is_admin: Option<bool>,
    first_name: Option<String>,
    last_name: Option<String>,
) -> Result<()> {
    println!("{}", "Update user".bright_blue().bold());
    println!();

    let user = find_user(pool, &email, false).await?;

    let mut fields = Fields::new();
    if password {
        fields.insert("password".into(), Value::String(prompt_password()?));
    }
    if let Some(flag) = is_admin {
        fields.insert("is_admin".into(), Value::Bool(flag));
    }
    if let Some(name) = first_name {
        fields.insert("first_name".into(), Value::String(name));
    }
    if let Some(name) = last_name {
        fields.insert("last_name".into(), Value::String(name));
    }

    if fields.is_empty() {
        println!("{}", "Nothing to update".yellow());
        return Ok(());
    }

    let mut tx = pool.begin().await?;
    let user = RecordStore::<User>::new(&mut tx)
        .update(user.id, &fields)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to update user: {e}"))?;
    tx.commit().await?;

    println!("{}", "User updated".green().bold());
    println!("  Email: {}", user.email.cyan());
    println!("  Admin: {}", user.is_admin);
    println!();

    Ok(())
}

/// Clears the deleted marker of an account.
async fn restore_user(pool: &SqlitePool, email: String) -> Result<()> {
    let user = find_user(pool, &email, true).await?;

    if !user.is_deleted() {
        println!("{}", "This user is not deleted".yellow());
        return Ok(());
    }

    let confirmed = Confirm::new()
        .with_prompt(format!("Restore {}?", user.email))
        .default(false)
        .interact()?;

    if !confirmed {
        println!("{}", "Cancelled".red());
        return Ok(());
    }

    let mut tx = pool.begin().await?;
    RecordStore::<User>::new(&mut tx)
        .including_deleted()
        .restore(user.id)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to restore user: {e}"))?;
    tx.commit().await?;

    println!("{}", "User restored".green().bold());
    println!();

    Ok(())
}

/// Lists users, newest first.
///
/// # Output Format
///
/// ```text
/// Users
///
///   Email                          Name                 Created           Status
///   ---------------------------------------------------------------------------------
///   admin@example.com              Ada Lovelace         2024-01-15 10:30  ADMIN
/// ```
async fn list_users(pool: &SqlitePool, including_deleted: bool) -> Result<()> {
    println!("{}", "Users".bright_blue().bold());
    println!();

    let mut conn = pool.acquire().await?;
    let mut store = RecordStore::<User>::new(&mut conn);
    if including_deleted {
        store = store.including_deleted();
    }
    let users = store
        .all(&ListQuery::new())
        .await
        .map_err(|e| anyhow::anyhow!("Failed to list users: {e}"))?;

    if users.is_empty() {
        println!("{}", "  No users found".yellow());
        println!();
        println!(
            "  Create one with: {} admin user create --email <email> --admin",
            "cargo run --bin".bright_cyan()
        );
        return Ok(());
    }

    println!(
        "  {:<30} {:<20} {:<17} {:<10}",
        "Email".bright_white().bold(),
        "Name".bright_white().bold(),
        "Created".bright_white().bold(),
        "Status".bright_white().bold()
    );
    println!("  {}", "-".repeat(81).bright_black());

    for user in &users {
        let status = if user.is_deleted() {
            "DELETED".red()
        } else if user.is_admin {
            "ADMIN".yellow()
        } else {
            "ACTIVE".green()
        };

        println!(
            "  {:<30} {:<20} {:<17} {}",
            user.email.cyan(),
            user.full_name(),
            user.created_date
                .format("%Y-%m-%d %H:%M")
                .to_string()
                .bright_black(),
            status
        );
    }

    println!();
    println!("  Total: {}", users.len().to_string().bright_white().bold());
    println!();

    Ok(())
}

/// Dispatches token commands.
async fn handle_token_action(action: TokenAction, pool: &SqlitePool) -> Result<()> {
    match action {
        TokenAction::Issue { email } => {
            let config = Config::from_env()?;
            config.validate()?;
            let tokens = config.token_service()?;

            let user = find_user(pool, &email, false).await?;
            let issued = tokens.issue(user.id);

            println!("{}", "Bearer token issued".green().bold());
            println!("  User:    {}", user.email.cyan());
            println!(
                "  Expires: {}",
                issued.expires.format("%Y-%m-%d %H:%M UTC").to_string().bright_black()
            );
            println!();
            println!(
                "  {}: Bearer {}",
                "Authorization".bright_cyan(),
                issued.token.bright_yellow()
            );
            println!();
        }
    }

    Ok(())
}

/// Dispatches database commands.
async fn handle_db_action(action: DbAction, pool: &SqlitePool) -> Result<()> {
    match action {
        DbAction::Check => {
            println!("{}", "Checking database connection...".bright_blue());

            sqlx::query("SELECT 1")
                .fetch_one(pool)
                .await
                .context("Database check failed")?;

            println!("{}", "Database connection OK".green().bold());
        }
        DbAction::Migrate => {
            println!("{}", "Applying migrations...".bright_blue());
            pool::migrate(pool).await?;
            println!("{}", "Migrations applied".green().bold());
        }
    }

    Ok(())
}
