//! # Contact Lookup
//!
//! **Contact search over an indexed store of customer profiles and their
//! visit history.**
//!
//! Given free text and paging, Contact Lookup returns a page of contacts
//! enriched with a summary of each contact's most recent visit.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────┐       ┌────────────────────┐   ┌──────────┐
//! │   CLI    │──▶│          │       │ contact-lookup-core│   │  SQLite  │
//! │(contacts)│   │  search  │──────▶│  select → enrich   │──▶│  index   │
//! └──────────┘   │          │       │  → assemble        │   └──────────┘
//! ┌──────────┐   │          │       └────────────────────┘
//! │   HTTP   │──▶│          │
//! └──────────┘   └──────────┘
//! ```
//!
//! ## Match strategies
//!
//! | Match text | Strategy | Fallback |
//! |------------|----------|----------|
//! | empty or `*` | match-all | none |
//! | anything else | exact (full name or email) | wildcard `*text*`, then fuzzy (slop 10) |
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing and validation |
//! | [`db`] | SQLite connection pool with WAL mode |
//! | [`migrate`] | Index schema (idempotent) |
//! | [`sqlite_index`] | SQLite implementation of the `ContactIndex` trait |
//! | [`search`] | Search entry points for CLI and HTTP |
//! | [`server`] | HTTP server (Axum) with CORS |
//!
//! ## Configuration
//!
//! Contact Lookup is configured via a TOML file (default:
//! `config/contacts.toml`). See [`config`] for all options.

pub mod config;
pub mod db;
pub mod migrate;
pub mod search;
pub mod server;
pub mod sqlite_index;

pub use contact_lookup_core::{models, store};
pub use sqlite_index::SqliteIndex;
