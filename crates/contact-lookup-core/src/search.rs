//! Contact search: match strategy selection, enrichment, and assembly.
//!
//! The algorithm operates entirely through the [`ContactIndex`] trait, with
//! no database or configuration dependencies.
//!
//! # Strategy cascade
//!
//! 1. Empty (after trimming) or `*` match text: **match-all**, one paged query
//!    with no predicate. No fallback.
//! 2. **Exact**: full name or any email equals the text, ignoring case.
//! 3. If exact found nothing, **wildcard** `*text*` (substring).
//! 4. If wildcard found nothing, **fuzzy** with an edit-distance tolerance of
//!    [`FUZZY_SLOP`].
//!
//! The first strategy with a non-zero total supplies the page and the total.
//! Each hit is then mapped to a [`ContactSearchResult`], joined with its most
//! recent visit (one lookup per hit), and the page is sorted by first name
//! then latest-visit start.

use std::cmp::Ordering;
use std::fmt;

use anyhow::{bail, Context, Result};

use crate::enrich::{build_base_result, populate_latest_visit};
use crate::models::{
    ContactSearchParameters, ContactSearchResult, IndexedContact, ResultSet,
    CONTACT_SEARCH_RESULTS,
};
use crate::store::{ContactFilter, ContactIndex, ContactQuery, Page, SearchContext, SearchResults};
use crate::text;

/// Match text that selects every contact.
pub const MATCH_ALL_TOKEN: &str = "*";

/// Edit-distance tolerance of the fuzzy fallback.
pub const FUZZY_SLOP: u32 = 10;

/// Which branch of the cascade produced a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchStrategy {
    MatchAll,
    Exact,
    Wildcard,
    Fuzzy,
}

impl MatchStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            MatchStrategy::MatchAll => "match_all",
            MatchStrategy::Exact => "exact",
            MatchStrategy::Wildcard => "wildcard",
            MatchStrategy::Fuzzy => "fuzzy",
        }
    }
}

impl fmt::Display for MatchStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The selected strategy and the raw page it produced.
#[derive(Debug, Clone)]
pub struct MatchOutcome {
    pub strategy: MatchStrategy,
    pub results: SearchResults<IndexedContact>,
}

/// True when `match_text` selects every contact.
pub fn is_match_all(match_text: &str) -> bool {
    match_text.trim().is_empty() || match_text == MATCH_ALL_TOKEN
}

/// Reject paging that cannot address a page.
pub fn validate_parameters(params: &ContactSearchParameters) -> Result<()> {
    if params.page_number < 1 {
        bail!("invalid paging: page_number must be >= 1");
    }
    if params.page_size < 1 {
        bail!("invalid paging: page_size must be >= 1");
    }
    Ok(())
}

/// Run a contact search against an index.
///
/// This is the core function that all frontends (CLI, HTTP) delegate to.
/// A search context is opened for the request and released afterwards,
/// whether or not the search succeeded.
pub async fn find<I>(index: &I, params: &ContactSearchParameters) -> Result<ResultSet<ContactSearchResult>>
where
    I: ContactIndex + ?Sized,
{
    validate_parameters(params)?;

    let ctx = index
        .open_context()
        .await
        .context("failed to open search context")?;

    let outcome = find_in_context(ctx.as_ref(), params).await;
    let released = ctx.release().await.context("failed to release search context");

    let set = outcome?;
    released?;
    Ok(set)
}

/// Search, enrich, and assemble using an already-open context.
///
/// Paging must already have passed [`validate_parameters`].
async fn find_in_context(
    ctx: &dyn SearchContext,
    params: &ContactSearchParameters,
) -> Result<ResultSet<ContactSearchResult>> {
    let outcome = select_matches(ctx, params).await?;
    tracing::debug!(
        strategy = %outcome.strategy,
        total = outcome.results.total_search_results,
        page_number = params.page_number,
        page_size = params.page_size,
        "contact search resolved"
    );

    let mut results = Vec::with_capacity(outcome.results.hits.len());
    for contact in &outcome.results.hits {
        results.push(enrich_contact(ctx, contact).await?);
    }

    Ok(assemble(
        results,
        outcome.results.total_search_results,
        params.page_number,
        params.page_size,
    ))
}

/// Choose and run the first strategy of the cascade that yields matches.
pub async fn select_matches(
    ctx: &dyn SearchContext,
    params: &ContactSearchParameters,
) -> Result<MatchOutcome> {
    let page = Page {
        offset: params.offset(),
        limit: params.page_size as usize,
    };
    let text = params.match_text.as_str();

    if is_match_all(text) {
        let results = run_query(ctx, ContactFilter::All, page, MatchStrategy::MatchAll).await?;
        return Ok(MatchOutcome {
            strategy: MatchStrategy::MatchAll,
            results,
        });
    }

    let exact = run_query(
        ctx,
        ContactFilter::Exact(text.to_string()),
        page,
        MatchStrategy::Exact,
    )
    .await?;
    if exact.total_search_results > 0 {
        return Ok(MatchOutcome {
            strategy: MatchStrategy::Exact,
            results: exact,
        });
    }

    tracing::debug!(match_text = text, "no exact match, trying wildcard");
    let wildcard = run_query(
        ctx,
        ContactFilter::Wildcard(format!("*{}*", text)),
        page,
        MatchStrategy::Wildcard,
    )
    .await?;
    if wildcard.total_search_results > 0 {
        return Ok(MatchOutcome {
            strategy: MatchStrategy::Wildcard,
            results: wildcard,
        });
    }

    tracing::debug!(match_text = text, slop = FUZZY_SLOP, "no wildcard match, trying fuzzy");
    let fuzzy = run_query(
        ctx,
        ContactFilter::Fuzzy {
            text: text.to_string(),
            slop: FUZZY_SLOP,
        },
        page,
        MatchStrategy::Fuzzy,
    )
    .await?;
    Ok(MatchOutcome {
        strategy: MatchStrategy::Fuzzy,
        results: fuzzy,
    })
}

async fn run_query(
    ctx: &dyn SearchContext,
    filter: ContactFilter,
    page: Page,
    strategy: MatchStrategy,
) -> Result<SearchResults<IndexedContact>> {
    ctx.query_contacts(&ContactQuery { filter, page })
        .await
        .with_context(|| format!("{} contact query failed", strategy))
}

/// Build a result for `contact` and attach its most recent visit, if any.
pub async fn enrich_contact(
    ctx: &dyn SearchContext,
    contact: &IndexedContact,
) -> Result<ContactSearchResult> {
    let mut result = build_base_result(contact);
    let latest = ctx
        .recent_visits(&contact.contact_id, 1)
        .await
        .with_context(|| format!("latest visit lookup failed for contact {}", contact.contact_id))?;
    if let Some(visit) = latest.first() {
        populate_latest_visit(&mut result, visit);
    }
    Ok(result)
}

/// Sort a page into presentation order.
///
/// First name ascending ignoring case, then latest-visit start ascending.
/// Absent values sort first; ties keep their incoming order.
pub fn sort_results(results: &mut [ContactSearchResult]) {
    results.sort_by(|a, b| {
        compare_names(a.first_name.as_deref(), b.first_name.as_deref())
            .then(a.latest_visit_start_date_time.cmp(&b.latest_visit_start_date_time))
    });
}

/// Folded comparison, falling back to the raw text so "ann" and "Ann"
/// still order deterministically.
fn compare_names(a: Option<&str>, b: Option<&str>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => text::fold(a).cmp(&text::fold(b)).then_with(|| a.cmp(b)),
        _ => a.is_some().cmp(&b.is_some()),
    }
}

/// Sort the page and wrap it in the paging envelope.
pub fn assemble(
    mut results: Vec<ContactSearchResult>,
    total_result_count: u64,
    page_number: u32,
    page_size: u32,
) -> ResultSet<ContactSearchResult> {
    sort_results(&mut results);
    let mut set = ResultSet::new(page_number, page_size);
    set.total_result_count = total_result_count;
    set.data
        .dataset
        .insert(CONTACT_SEARCH_RESULTS.to_string(), results);
    set
}
