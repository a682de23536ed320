//! In-memory [`ContactIndex`] implementation for testing and embedded use.
//!
//! Records live in `Vec`s behind `std::sync::RwLock`. Each context captures
//! an `Arc` snapshot of the collections, so writes made while a request is
//! in flight are invisible to it. Insertion order is the natural order.
//! Wildcard patterns are compiled with `globset`.

use std::sync::{Arc, RwLock};

use anyhow::{Context, Result};
use async_trait::async_trait;
use globset::{GlobBuilder, GlobMatcher};
use uuid::Uuid;

use crate::models::{IndexedContact, IndexedVisit};

use super::{
    contact_matches, paginate, ContactFilter, ContactIndex, ContactQuery, SearchContext,
    SearchResults,
};

#[derive(Default, Clone)]
struct Collections {
    contacts: Vec<IndexedContact>,
    visits: Vec<IndexedVisit>,
}

/// In-memory contact index.
pub struct InMemoryIndex {
    data: RwLock<Arc<Collections>>,
}

impl InMemoryIndex {
    pub fn new() -> Self {
        Self {
            data: RwLock::new(Arc::new(Collections::default())),
        }
    }

    /// Insert a contact, replacing any record with the same ID in place.
    pub fn upsert_contact(&self, contact: IndexedContact) {
        let mut guard = self.data.write().unwrap_or_else(|e| e.into_inner());
        let data = Arc::make_mut(&mut guard);
        match data
            .contacts
            .iter_mut()
            .find(|c| c.contact_id == contact.contact_id)
        {
            Some(existing) => *existing = contact,
            None => data.contacts.push(contact),
        }
    }

    /// Insert a visit, replacing any record with the same interaction ID.
    pub fn upsert_visit(&self, visit: IndexedVisit) {
        let mut guard = self.data.write().unwrap_or_else(|e| e.into_inner());
        let data = Arc::make_mut(&mut guard);
        data.visits
            .retain(|v| v.interaction_id != visit.interaction_id);
        data.visits.push(visit);
    }

    pub fn contact_count(&self) -> usize {
        self.snapshot().contacts.len()
    }

    fn snapshot(&self) -> Arc<Collections> {
        self.data
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl Default for InMemoryIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContactIndex for InMemoryIndex {
    async fn open_context(&self) -> Result<Box<dyn SearchContext>> {
        Ok(Box::new(InMemoryContext {
            data: self.snapshot(),
        }))
    }
}

struct InMemoryContext {
    data: Arc<Collections>,
}

/// Translate an index wildcard pattern into a case-insensitive glob.
///
/// `*` and `?` keep their meaning; glob metacharacters are escaped.
pub fn compile_wildcard(pattern: &str) -> Result<GlobMatcher> {
    let mut glob = String::with_capacity(pattern.len() + 8);
    for ch in pattern.chars() {
        match ch {
            '*' | '?' => glob.push(ch),
            '[' | ']' | '{' | '}' | '\\' | ',' | '!' => {
                glob.push('\\');
                glob.push(ch);
            }
            _ => glob.push(ch),
        }
    }
    let matcher = GlobBuilder::new(&glob)
        .case_insensitive(true)
        .literal_separator(false)
        .backslash_escape(true)
        .build()
        .with_context(|| format!("invalid wildcard pattern: {}", pattern))?
        .compile_matcher();
    Ok(matcher)
}

#[async_trait]
impl SearchContext for InMemoryContext {
    async fn query_contacts(&self, query: &ContactQuery) -> Result<SearchResults<IndexedContact>> {
        let matched: Vec<IndexedContact> = match &query.filter {
            ContactFilter::All => self.data.contacts.clone(),
            ContactFilter::Wildcard(pattern) => {
                let matcher = compile_wildcard(pattern)?;
                self.data
                    .contacts
                    .iter()
                    .filter(|c| contact_matches(c, |v| matcher.is_match(v)))
                    .cloned()
                    .collect()
            }
            filter => self
                .data
                .contacts
                .iter()
                .filter(|c| contact_matches(c, |v| filter.matches_field(v).unwrap_or(false)))
                .cloned()
                .collect(),
        };
        Ok(paginate(matched, query.page))
    }

    async fn recent_visits(&self, contact_id: &Uuid, take: usize) -> Result<Vec<IndexedVisit>> {
        let mut visits: Vec<IndexedVisit> = self
            .data
            .visits
            .iter()
            .filter(|v| &v.contact_id == contact_id)
            .cloned()
            .collect();
        // Stable: equal start times keep insertion order.
        visits.sort_by(|a, b| b.start_date_time.cmp(&a.start_date_time));
        visits.truncate(take);
        Ok(visits)
    }

    async fn release(self: Box<Self>) -> Result<()> {
        // Dropping the snapshot is the whole release.
        Ok(())
    }
}
