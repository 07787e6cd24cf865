//! CLI administration tool for shortkey.
//!
//! Provides maintenance commands for the key filter, link listings and
//! database checks without going through the HTTP API.
//!
//! # Usage
//!
//! ```bash
//! # Rebuild the key filter from the link store and overwrite its snapshot
//! cargo run --bin admin -- filter rebuild
//!
//! # Ask the filter and the store about one key
//! cargo run --bin admin -- filter check 1
//!
//! # Filter sizing
//! cargo run --bin admin -- filter stats
//!
//! # Links registered by an owner
//! cargo run --bin admin -- links list --owner 42
//!
//! # Check database connection
//! cargo run --bin admin -- db check
//! ```
//!
//! # Environment Variables
//!
//! Same as the server (see `shortkey::config`). Without `REDIS_URL` the
//! filter commands operate on a process-local snapshot, which is only useful
//! for checking the store.

use shortkey::config::{self, Config};
use shortkey::domain::key_filter::KeyFilter;
use shortkey::domain::repositories::LinkRepository;
use shortkey::server::{build_backends, connect_database};
use shortkey::state::Backends;
use shortkey::utils::base62;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;

/// CLI tool for managing shortkey.
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
    /// Key filter maintenance
    Filter {
        #[command(subcommand)]
        action: FilterAction,
    },

    /// Link inspection
    Links {
        #[command(subcommand)]
        action: LinksAction,
    },

    /// Database operations
    Db {
        #[command(subcommand)]
        action: DbAction,
    },
}

#[derive(Subcommand)]
enum FilterAction {
    /// Drop the snapshot and rebuild the filter from every stored key
    Rebuild,

    /// Check a key against the filter and the store
    Check {
        /// Short key to look up
        key: String,
    },

    /// Show filter sizing
    Stats,
}

#[derive(Subcommand)]
enum LinksAction {
    /// List links registered by an owner
    List {
        /// Owner identity
        #[arg(short, long)]
        owner: i64,
    },
}

#[derive(Subcommand)]
enum DbAction {
    /// Check database connection
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = config::load_from_env().context("Invalid configuration")?;

    match cli.command {
        Commands::Filter { action } => handle_filter_action(action, &config).await?,
        Commands::Links { action } => handle_links_action(action, &config).await?,
        Commands::Db { action } => handle_db_action(action, &config).await?,
    }

    Ok(())
}

async fn open_filter(config: &Config) -> Result<(KeyFilter, Backends)> {
    let pool = connect_database(config).await?;
    let backends = build_backends(config, pool).await?;
    let settings = config.core_settings();

    let filter = KeyFilter::new(
        backends.links.clone(),
        backends.snapshots.clone(),
        settings.filter,
        settings.op_timeout,
    );

    Ok((filter, backends))
}

async fn handle_filter_action(action: FilterAction, config: &Config) -> Result<()> {
    let (filter, backends) = open_filter(config).await?;

    match action {
        FilterAction::Rebuild => {
            println!("{}", "🔄 Rebuild Key Filter".bright_blue().bold());
            println!();

            let loaded = filter
                .reset()
                .await
                .map_err(|e| anyhow::anyhow!("Rebuild failed: {}", e))?;

            println!(
                "{}",
                format!("✅ Filter rebuilt from {} keys, snapshot saved", loaded)
                    .green()
                    .bold()
            );
        }
        FilterAction::Check { key } => {
            println!("{}", "🔍 Check Key".bright_blue().bold());
            println!();

            let maybe = filter
                .might_contain(&key)
                .await
                .map_err(|e| anyhow::anyhow!("Filter unavailable: {}", e))?;
            let stored = backends
                .links
                .find_by_key(&key)
                .await
                .map_err(|e| anyhow::anyhow!("Database error: {}", e))?;

            println!("  Key:      {}", key.cyan());
            match base62::decode(&key) {
                Some(n) => println!("  Sequence: {}", n.to_string().bright_black()),
                None => println!("  Sequence: {}", "not a base-62 key".yellow()),
            }
            println!(
                "  Filter:   {}",
                if maybe {
                    "maybe present".yellow()
                } else {
                    "absent".green()
                }
            );
            match stored {
                Some(link) => {
                    println!("  Store:    {}", "present".green());
                    println!("  Target:   {}", link.original_url.cyan());
                    println!(
                        "  Owner:    {}",
                        link.owner_id
                            .map(|id| id.to_string())
                            .unwrap_or_else(|| "anonymous".to_string())
                    );
                    println!("  Clicks:   {}", link.click_count);
                    if !maybe {
                        println!();
                        println!(
                            "{}",
                            "⚠️  Stored key missing from the filter: run `admin filter rebuild`"
                                .red()
                                .bold()
                        );
                    }
                }
                None => println!("  Store:    {}", "absent".bright_black()),
            }
        }
        FilterAction::Stats => {
            println!("{}", "📊 Key Filter".bright_blue().bold());
            println!();

            filter
                .initialize()
                .await
                .map_err(|e| anyhow::anyhow!("Filter unavailable: {}", e))?;
            let stats = filter.stats();

            println!("  Capacity:        {}", stats.capacity.to_string().cyan());
            println!("  Error rate:      {}", stats.error_rate.to_string().cyan());
            println!("  Bits:            {}", stats.number_of_bits);
            println!("  Hash functions:  {}", stats.number_of_hash_functions);
            println!(
                "  Size:            {} KiB",
                (stats.number_of_bits / 8 / 1024).to_string().bright_white()
            );
        }
    }

    println!();
    Ok(())
}

async fn handle_links_action(action: LinksAction, config: &Config) -> Result<()> {
    let pool = connect_database(config).await?;
    let backends = build_backends(config, pool).await?;

    match action {
        LinksAction::List { owner } => {
            println!("{}", "📋 Links".bright_blue().bold());
            println!();

            let links = backends
                .links
                .list_by_owner(owner)
                .await
                .map_err(|e| anyhow::anyhow!("Failed to list links: {}", e))?;

            if links.is_empty() {
                println!("{}", format!("  No links for owner {}", owner).yellow());
                return Ok(());
            }

            println!(
                "  {:<12} {:<8} {:<20} {}",
                "Key".bright_white().bold(),
                "Clicks".bright_white().bold(),
                "Created".bright_white().bold(),
                "Target".bright_white().bold()
            );
            println!("  {}", "─".repeat(75).bright_black());

            for link in &links {
                println!(
                    "  {:<12} {:<8} {:<20} {}",
                    link.shorten_key.cyan(),
                    link.click_count,
                    link.created_at
                        .format("%Y-%m-%d %H:%M")
                        .to_string()
                        .bright_black(),
                    link.original_url
                );
            }

            println!();
            println!("  Total: {}", links.len().to_string().bright_white().bold());
            println!();
        }
    }

    Ok(())
}

async fn handle_db_action(action: DbAction, config: &Config) -> Result<()> {
    match action {
        DbAction::Check => {
            println!("{}", "🔌 Database Check".bright_blue().bold());
            println!();
            println!(
                "  URL: {}",
                config::mask_connection_string(&config.database_url).bright_black()
            );

            let pool = connect_database(config).await?;
            let version: String = sqlx::query_scalar("SELECT version()")
                .fetch_one(&pool)
                .await
                .context("Failed to query server version")?;
            let links: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM links")
                .fetch_one(&pool)
                .await
                .context("Failed to count links (migrations applied?)")?;

            println!("{}", "  ✅ Connected".green().bold());
            println!("  Server: {}", version.bright_black());
            println!("  Links:  {}", links.to_string().cyan());
            println!();
        }
    }

    Ok(())
}
