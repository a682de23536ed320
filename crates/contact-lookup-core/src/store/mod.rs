//! Index abstraction for Contact Lookup.
//!
//! A [`ContactIndex`] hands out scoped [`SearchContext`]s. Every query of a
//! single request goes through one context, which is released afterwards
//! by consuming it, so no query can be issued once the context is gone.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

use crate::models::{IndexedContact, IndexedVisit};
use crate::text;

/// Predicate applied to the contact collection.
///
/// Text predicates test the contact's full name and each of its emails;
/// a contact matches when any of those fields does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContactFilter {
    /// No predicate: every contact, in natural order.
    All,
    /// Case-insensitive equality.
    Exact(String),
    /// Case-insensitive wildcard pattern: `*` matches any run of
    /// characters, `?` exactly one; everything else is literal.
    Wildcard(String),
    /// Case-insensitive edit distance of at most `slop`.
    Fuzzy { text: String, slop: u32 },
}

impl ContactFilter {
    /// Field-level test for predicates that need no compilation.
    ///
    /// Returns `None` for [`ContactFilter::Wildcard`]; backends evaluate
    /// patterns with their own matcher.
    pub fn matches_field(&self, value: &str) -> Option<bool> {
        match self {
            ContactFilter::All => Some(true),
            ContactFilter::Exact(t) => Some(text::eq_ignore_case(value, t)),
            ContactFilter::Fuzzy { text: t, slop } => Some(text::approx_eq(value, t, *slop)),
            ContactFilter::Wildcard(_) => None,
        }
    }
}

/// Offset/limit window over a result list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub offset: usize,
    pub limit: usize,
}

/// A filtered, paged contact query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactQuery {
    pub filter: ContactFilter,
    pub page: Page,
}

/// One page of hits plus the total number of matches outside the window.
#[derive(Debug, Clone)]
pub struct SearchResults<T> {
    pub hits: Vec<T>,
    pub total_search_results: u64,
}

/// Source of search contexts.
#[async_trait]
pub trait ContactIndex: Send + Sync {
    /// Acquire a context for one request.
    async fn open_context(&self) -> Result<Box<dyn SearchContext>>;
}

/// Scoped, read-only view of the contact and visit collections.
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`query_contacts`](SearchContext::query_contacts) | Filtered, paged contacts with total count |
/// | [`recent_visits`](SearchContext::recent_visits) | A contact's visits, newest start first |
/// | [`release`](SearchContext::release) | Give the context back |
#[async_trait]
pub trait SearchContext: Send + Sync {
    /// Run a contact query. Hits keep the backend's natural order.
    async fn query_contacts(&self, query: &ContactQuery) -> Result<SearchResults<IndexedContact>>;

    /// Up to `take` visits of `contact_id`, ordered by start time descending.
    async fn recent_visits(&self, contact_id: &Uuid, take: usize) -> Result<Vec<IndexedVisit>>;

    /// Release the context.
    async fn release(self: Box<Self>) -> Result<()>;
}

/// Any of the contact's full name or emails satisfies `field_matches`.
pub fn contact_matches(contact: &IndexedContact, mut field_matches: impl FnMut(&str) -> bool) -> bool {
    contact.full_name.as_deref().is_some_and(|n| field_matches(n))
        || contact.emails.iter().any(|e| field_matches(e))
}

/// Apply `page` to an already-filtered list, keeping the full count.
pub fn paginate<T>(matched: Vec<T>, page: Page) -> SearchResults<T> {
    let total = matched.len() as u64;
    let hits = matched
        .into_iter()
        .skip(page.offset)
        .take(page.limit)
        .collect();
    SearchResults {
        hits,
        total_search_results: total,
    }
}
