//! Application-level entry points for contact search.
//!
//! The strategy cascade, enrichment, and ordering live in
//! `contact-lookup-core::search` and operate through the `ContactIndex`
//! trait. This wrapper handles config, the database connection, and CLI
//! output formatting.

use anyhow::Result;

pub use contact_lookup_core::models::{
    ContactSearchParameters, ContactSearchResult, ResultSet, CONTACT_SEARCH_RESULTS,
};
pub use contact_lookup_core::search::{MatchStrategy, FUZZY_SLOP, MATCH_ALL_TOKEN};

use crate::config::Config;
use crate::db;
use crate::sqlite_index::SqliteIndex;

/// Core search function returning the paging envelope.
///
/// Used by `contacts search`; the server holds one long-lived index instead.
/// Opens the configured index, delegates to
/// `contact_lookup_core::search::find` (which rejects invalid paging), and
/// closes the pool.
pub async fn search_contacts(
    config: &Config,
    params: &ContactSearchParameters,
) -> Result<ResultSet<ContactSearchResult>> {
    let pool = db::connect(config).await?;
    let index = SqliteIndex::new(pool.clone());

    let result = contact_lookup_core::search::find(&index, params).await;

    pool.close().await;
    result
}

/// CLI entry point: calls [`search_contacts`] and prints results to stdout.
pub async fn run_search(
    config: &Config,
    match_text: &str,
    page_number: u32,
    page_size: Option<u32>,
    json: bool,
) -> Result<()> {
    let params = ContactSearchParameters::new(
        match_text,
        page_number,
        page_size.unwrap_or(config.contact_search.default_page_size),
    );
    let set = search_contacts(config, &params).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&set)?);
        return Ok(());
    }

    let items = set.items(CONTACT_SEARCH_RESULTS);
    if items.is_empty() {
        println!("No contacts. (total: {})", set.total_result_count);
        return Ok(());
    }

    println!(
        "Page {} (size {}) of {} matching contacts",
        set.page_number, set.page_size, set.total_result_count
    );
    println!();

    let offset = params.offset();
    for (i, c) in items.iter().enumerate() {
        let name = [&c.first_name, &c.middle_name, &c.surname]
            .iter()
            .filter_map(|p| p.as_deref())
            .collect::<Vec<_>>()
            .join(" ");
        println!(
            "{}. {} [{}]",
            offset + i + 1,
            if name.is_empty() { "(unnamed)" } else { name.as_str() },
            c.identification_level
        );
        if let Some(ref email) = c.preferred_email {
            println!("    email: {}", email);
        }
        if let Some(ref title) = c.job_title {
            println!("    job title: {}", title);
        }
        println!(
            "    value: {}  visits: {}  value/visit: {:.2}",
            c.value, c.visit_count, c.value_per_visit
        );
        match c.latest_visit_start_date_time {
            Some(start) => {
                let place = [
                    &c.latest_visit_location_city_display_name,
                    &c.latest_visit_location_region_display_name,
                    &c.latest_visit_location_country_display_name,
                ]
                .iter()
                .filter_map(|p| p.as_deref())
                .collect::<Vec<_>>()
                .join(", ");
                println!(
                    "    latest visit: {} ({} pages, value {}){}",
                    start.format("%Y-%m-%dT%H:%M:%SZ"),
                    c.latest_visit_page_view_count.unwrap_or_default(),
                    c.latest_visit_value.unwrap_or_default(),
                    if place.is_empty() {
                        String::new()
                    } else {
                        format!(" from {}", place)
                    }
                );
            }
            None => println!("    latest visit: none"),
        }
        println!("    id: {}", c.contact_id);
        println!();
    }

    Ok(())
}
