//! CLI administration tool for shortlink-ttl.
//!
//! Runs lifecycle maintenance against the configured record store without
//! going through the HTTP API.
//!
//! # Usage
//!
//! ```bash
//! # Evict every expired link now
//! cargo run --bin admin -- sweep
//!
//! # Show the most recent evictions
//! cargo run --bin admin -- audit --limit 20
//! cargo run --bin admin -- audit --code promo1
//!
//! # View counts
//! cargo run --bin admin -- stats
//!
//! # Check store connection
//! cargo run --bin admin -- db check
//! ```
//!
//! # Environment Variables
//!
//! Same as the server: `STORAGE_BACKEND`, `DATABASE_URL` / `REDIS_URL`, etc.

use shortlink_ttl::config;
use shortlink_ttl::domain::time::SystemClock;
use shortlink_ttl::infrastructure::{Store, connect_store};
use shortlink_ttl::state::AppState;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use dialoguer::Confirm;
use std::sync::Arc;

/// CLI tool for managing shortlink-ttl.
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
    /// Run one expiry sweep now
    Sweep {
        /// Skip confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },

    /// Show the deletion audit log, newest first
    Audit {
        /// Only entries for this short code
        #[arg(short, long)]
        code: Option<String>,

        /// Maximum number of entries to show
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },

    /// Show statistics
    Stats,

    /// Store operations
    Db {
        #[command(subcommand)]
        action: DbAction,
    },
}

/// Store diagnostic subcommands.
#[derive(Subcommand)]
enum DbAction {
    /// Check store connection
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let config = config::load_from_env().context("Invalid configuration")?;

    let store = connect_store(&config)
        .await
        .context("Failed to connect to the record store")?;

    match cli.command {
        Commands::Sweep { yes } => {
            let state = AppState::new(store, &config, Arc::new(SystemClock));
            run_sweep(&state, yes).await?
        }
        Commands::Audit { code, limit } => show_audit(&store, code, limit).await?,
        Commands::Stats => handle_stats(&store).await?,
        Commands::Db { action } => handle_db_action(action, &store, &config).await?,
    }

    Ok(())
}

/// Runs one sweep and prints its report.
///
/// Asks for confirmation first unless `--yes` is given, since every evicted
/// link is deleted permanently.
async fn run_sweep(state: &AppState, skip_confirm: bool) -> Result<()> {
    println!("{}", "🧹 Expiry Sweep".bright_blue().bold());
    println!();

    if !skip_confirm {
        let confirmed = Confirm::new()
            .with_prompt("Delete every expired link now?")
            .default(true)
            .interact()?;

        if !confirmed {
            println!("{}", "❌ Cancelled".red());
            return Ok(());
        }
    }

    let report = state
        .sweeper
        .sweep()
        .await
        .map_err(|e| anyhow::anyhow!("Sweep failed: {}", e))?;

    let Some(report) = report else {
        println!("{}", "⚠️  A sweep is already running".yellow());
        return Ok(());
    };

    println!(
        "  Scanned:      {}",
        report.scanned.to_string().bright_white().bold()
    );
    println!(
        "  Evicted:      {}",
        report.evicted.to_string().bright_green().bold()
    );
    println!(
        "  Already gone: {}",
        report.already_gone.to_string().bright_black()
    );

    let failed = report.failed.to_string();
    println!(
        "  Failed:       {}",
        if report.failed > 0 {
            failed.red().bold()
        } else {
            failed.bright_black()
        }
    );
    println!();

    if report.failed > 0 {
        println!(
            "{}",
            "⚠️  Some links could not be evicted; the next sweep retries them".yellow()
        );
    } else {
        println!("{}", "✅ Sweep finished".green().bold());
    }
    println!();

    Ok(())
}

/// Lists deletion log entries.
///
/// # Output Format
///
/// ```text
/// 📜 Deletion Log
///
///   ID    Code          Expired              Deleted              Target
///   ──────────────────────────────────────────────────────────────────────────
///   12    promo1        2025-01-15 10:30     2025-01-15 11:00     https://example.com/sale
/// ```
async fn show_audit(store: &Store, code: Option<String>, limit: usize) -> Result<()> {
    println!("{}", "📜 Deletion Log".bright_blue().bold());
    println!();

    let entries = store
        .deletion_log
        .list_recent(code, limit)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to read deletion log: {}", e))?;

    if entries.is_empty() {
        println!("{}", "  No entries found".yellow());
        println!();
        return Ok(());
    }

    println!(
        "  {:<5} {:<13} {:<20} {:<20} {}",
        "ID".bright_white().bold(),
        "Code".bright_white().bold(),
        "Expired".bright_white().bold(),
        "Deleted".bright_white().bold(),
        "Target".bright_white().bold()
    );
    println!("  {}", "─".repeat(90).bright_black());

    for entry in &entries {
        println!(
            "  {:<5} {:<13} {:<20} {:<20} {}",
            entry.id.to_string().bright_black(),
            entry.code.cyan(),
            entry.expired_at.format("%Y-%m-%d %H:%M").to_string(),
            entry
                .deleted_at
                .format("%Y-%m-%d %H:%M")
                .to_string()
                .bright_black(),
            entry.target_url
        );
    }

    println!();
    println!(
        "  Shown: {}",
        entries.len().to_string().bright_white().bold()
    );
    println!();

    Ok(())
}

/// Displays store statistics.
///
/// Shows:
/// - Stored links (including expired links awaiting eviction)
/// - Expired links awaiting eviction
/// - Deletion log entries
async fn handle_stats(store: &Store) -> Result<()> {
    println!("{}", "📊 Statistics".bright_blue().bold());
    println!();

    let links_count = store
        .links
        .count()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to count links: {}", e))?;

    let expired_count = store
        .links
        .list_expired(chrono::Utc::now())
        .await
        .map_err(|e| anyhow::anyhow!("Failed to list expired links: {}", e))?
        .len();

    let evictions_count = store
        .deletion_log
        .count()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to count deletion log: {}", e))?;

    println!(
        "  Links:           {}",
        links_count.to_string().bright_green().bold()
    );
    println!(
        "  Awaiting sweep:  {}",
        expired_count.to_string().yellow().bold()
    );
    println!(
        "  Evictions:       {}",
        evictions_count.to_string().bright_green().bold()
    );
    println!();

    Ok(())
}

/// Handles store diagnostic commands.
async fn handle_db_action(action: DbAction, store: &Store, config: &config::Config) -> Result<()> {
    match action {
        DbAction::Check => {
            println!(
                "{}",
                format!("🔍 Checking {} connection...", config.storage_backend).bright_blue()
            );

            if !store.links.health_check().await {
                anyhow::bail!("Record store is unreachable");
            }

            println!("{}", "✅ Store connection OK".green().bold());
        }
    }

    Ok(())
}
