//! # Contact Lookup Core
//!
//! Shared logic for Contact Lookup: data models, the index abstraction,
//! match strategy selection, latest-visit enrichment, and result assembly.
//!
//! This crate contains no tokio, sqlx, filesystem I/O, or other
//! native-only dependencies. Storage backends implement
//! [`store::ContactIndex`]; [`search::find`] is the single entry point.

pub mod calculator;
pub mod enrich;
pub mod models;
pub mod search;
pub mod store;
pub mod text;
