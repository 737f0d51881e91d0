use std::fs;
use std::sync::Arc;

use anyhow::bail;
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use stockroom::auth::TokenGenerator;
use stockroom::cache::MemoryCache;
use stockroom::config::ServerConfig;
use stockroom::server::{AppState, create_router};
use stockroom::store::{SqliteStore, Store};
use stockroom::types::Token;

const SEED_CATEGORIES: &[&str] = &["food", "drink", "desert"];

fn create_token(generator: &TokenGenerator, user_id: i64) -> anyhow::Result<(Token, String)> {
    let (raw_token, lookup, hash) = generator.generate()?;
    let token = Token {
        id: Uuid::new_v4().to_string(),
        token_hash: hash,
        token_lookup: lookup,
        user_id,
        created_at: Utc::now(),
        expires_at: None,
        last_used_at: None,
    };
    Ok((token, raw_token))
}

#[cfg(unix)]
fn set_restrictive_permissions(path: &std::path::Path) {
    use std::os::unix::fs::PermissionsExt;
    if let Err(e) = fs::set_permissions(path, fs::Permissions::from_mode(0o600)) {
        tracing::warn!("Failed to set permissions on {}: {e}", path.display());
    }
}

#[derive(Parser)]
#[command(name = "stockroom")]
#[command(about = "A product catalog server", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Administrative commands
    Admin {
        #[command(subcommand)]
        command: AdminCommands,
    },

    /// Start the server
    Serve {
        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind to
        #[arg(long, short, default_value = "8080")]
        port: u16,

        /// Data directory for the database
        #[arg(long, default_value = "./data")]
        data_dir: String,
    },
}

#[derive(Subcommand)]
enum AdminCommands {
    /// Initialize the server (create database, seed categories, create a user)
    Init {
        /// Data directory for the database
        #[arg(long, default_value = "./data")]
        data_dir: String,

        /// Email for the initial user
        #[arg(long, default_value = "test@example.com")]
        email: String,

        /// Password for the initial user
        #[arg(long, default_value = "password")]
        password: String,
    },

    /// Revoke a user's tokens and print a fresh one
    Token {
        /// Data directory for the database
        #[arg(long, default_value = "./data")]
        data_dir: String,

        /// Email of the user to issue a token for
        #[arg(long)]
        email: String,
    },
}

fn run_init(data_dir: String, email: String, password: String) -> anyhow::Result<()> {
    let data_path: std::path::PathBuf = data_dir.into();
    fs::create_dir_all(&data_path)?;

    let db_path = data_path.join("stockroom.db");
    let store = SqliteStore::new(&db_path)?;
    store.initialize()?;

    if store.get_user_by_email(&email)?.is_some() {
        bail!("Server already initialized. User '{email}' exists at: {}", db_path.display());
    }

    for name in SEED_CATEGORIES {
        store.upsert_category(name)?;
    }

    let generator = TokenGenerator::new();
    let password_hash = generator.hash(&password)?;
    let user = store.create_user(&email, &password_hash)?;

    let (token, raw_token) = create_token(&generator, user.id)?;
    store.create_token(&token)?;

    let token_file = data_path.join(".api_token");
    fs::write(&token_file, &raw_token)?;

    #[cfg(unix)]
    set_restrictive_permissions(&token_file);

    println!();
    println!("========================================");
    println!("Created user '{email}' with token (save this, it won't be shown again):");
    println!();
    println!("  {raw_token}");
    println!();
    println!("Token also written to: {}", token_file.display());
    println!("========================================");
    println!();

    Ok(())
}

fn run_token(data_dir: String, email: String) -> anyhow::Result<()> {
    let data_path: std::path::PathBuf = data_dir.into();
    let db_path = data_path.join("stockroom.db");
    if !db_path.exists() {
        bail!("Server not initialized. Run 'stockroom admin init' first.");
    }

    let store = SqliteStore::new(&db_path)?;
    store.initialize()?;

    let Some(user) = store.get_user_by_email(&email)? else {
        bail!("No user with email '{email}'");
    };

    let revoked = store.delete_user_tokens(user.id)?;
    if revoked > 0 {
        println!("Revoked {revoked} existing token(s).");
    }

    let generator = TokenGenerator::new();
    let (token, raw_token) = create_token(&generator, user.id)?;
    store.create_token(&token)?;

    println!();
    println!("|Token|");
    println!("-------");
    println!("{raw_token}");

    Ok(())
}

fn user_count(store: &SqliteStore) -> anyhow::Result<i64> {
    let count = store
        .connection()
        .query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
    Ok(count)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("stockroom=info".parse()?))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Admin { command } => match command {
            AdminCommands::Init {
                data_dir,
                email,
                password,
            } => {
                run_init(data_dir, email, password)?;
            }
            AdminCommands::Token { data_dir, email } => {
                run_token(data_dir, email)?;
            }
        },
        Commands::Serve {
            host,
            port,
            data_dir,
        } => {
            let config = ServerConfig {
                host,
                port,
                data_dir: data_dir.into(),
            };

            if !config.db_path().exists() {
                bail!(
                    "Server not initialized. Run 'stockroom admin init' first to create the database and user."
                );
            }

            let store = SqliteStore::new(config.db_path())?;
            store.initialize()?;
            if user_count(&store)? == 0 {
                bail!(
                    "Server not initialized. Run 'stockroom admin init' first to create the database and user."
                );
            }

            let state = Arc::new(AppState::new(
                Arc::new(store),
                Arc::new(MemoryCache::new()),
            ));

            let app = create_router(state);
            let addr = config.socket_addr()?;

            info!("Starting server on {}", addr);

            let listener = tokio::net::TcpListener::bind(addr).await?;
            axum::serve(listener, app).await?;
        }
    }

    Ok(())
}
