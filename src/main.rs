//! # Contact Lookup CLI (`contacts`)
//!
//! ## Usage
//!
//! ```bash
//! contacts --config ./config/contacts.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `contacts init` | Create the index database and schema |
//! | `contacts search "<match>"` | Search contacts |
//! | `contacts serve` | Start the HTTP server |
//!
//! ## Examples
//!
//! ```bash
//! contacts init
//! contacts search "jane@x.com"
//! contacts search "*" --page 2 --page-size 5
//! contacts search "jan" --json
//! RUST_LOG=contact_lookup_core=debug contacts search "jon smyth"
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use contact_lookup::{config, migrate, search, server};

/// Contact Lookup CLI: contact search over an indexed store of customer
/// profiles and their visit history.
#[derive(Parser)]
#[command(
    name = "contacts",
    about = "Contact Lookup: search contacts and their latest visits",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/contacts.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the index database schema.
    ///
    /// Creates the SQLite file named by the configured search index and
    /// all required tables. Idempotent.
    Init,

    /// Search contacts.
    ///
    /// Tries an exact match on full name or email first, then a substring
    /// match, then an approximate match. Empty or `*` lists every contact.
    Search {
        /// Text to match; `*` matches all contacts.
        #[arg(name = "match", default_value = "*")]
        match_text: String,

        /// 1-based page number.
        #[arg(long, default_value_t = 1)]
        page: u32,

        /// Page size (defaults to `contact_search.default_page_size`).
        #[arg(long)]
        page_size: Option<u32>,

        /// Print the result envelope as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Start the HTTP server on `[server].bind`.
    Serve,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            tracing::info!(
                index = %cfg.contact_search.search_index_name,
                "index schema ready"
            );
            println!("Index database initialized successfully.");
        }
        Commands::Search {
            match_text,
            page,
            page_size,
            json,
        } => {
            search::run_search(&cfg, &match_text, page, page_size, json).await?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
