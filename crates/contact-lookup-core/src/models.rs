//! Core data models used throughout Contact Lookup.
//!
//! Indexed records ([`IndexedContact`], [`IndexedVisit`]) are read-only
//! inputs supplied by an index backend. [`ContactSearchResult`] and
//! [`ResultSet`] are the response shapes returned to callers.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use uuid::Uuid;

/// Dataset name under which contact search pages are stored in a [`ResultSet`].
pub const CONTACT_SEARCH_RESULTS: &str = "ContactSearchResults";

/// How confidently a contact's identity is known.
///
/// Ordered from least to most confident. Serialized as its integer ordinal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum IdentificationLevel {
    #[default]
    None = 0,
    Anonymous = 1,
    Known = 2,
    Identified = 3,
}

impl IdentificationLevel {
    pub const ALL: [IdentificationLevel; 4] = [
        IdentificationLevel::None,
        IdentificationLevel::Anonymous,
        IdentificationLevel::Known,
        IdentificationLevel::Identified,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            IdentificationLevel::None => "None",
            IdentificationLevel::Anonymous => "Anonymous",
            IdentificationLevel::Known => "Known",
            IdentificationLevel::Identified => "Identified",
        }
    }

    pub fn ordinal(self) -> i32 {
        self as i32
    }

    pub fn from_ordinal(ordinal: i64) -> Option<Self> {
        Self::ALL.into_iter().find(|l| l.ordinal() as i64 == ordinal)
    }

    /// Parse a loosely-typed index value, falling back to [`IdentificationLevel::None`].
    pub fn parse_or_default(raw: Option<&str>) -> Self {
        raw.and_then(|s| s.parse().ok()).unwrap_or_default()
    }
}

impl fmt::Display for IdentificationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string names no [`IdentificationLevel`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownIdentificationLevel(pub String);

impl fmt::Display for UnknownIdentificationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown identification level: '{}'", self.0)
    }
}

impl std::error::Error for UnknownIdentificationLevel {}

impl FromStr for IdentificationLevel {
    type Err = UnknownIdentificationLevel;

    /// Accepts member names in any case, or a defined integer ordinal.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Ok(n) = trimmed.parse::<i64>() {
            return Self::from_ordinal(n).ok_or_else(|| UnknownIdentificationLevel(s.to_string()));
        }
        Self::ALL
            .into_iter()
            .find(|l| l.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| UnknownIdentificationLevel(s.to_string()))
    }
}

impl Serialize for IdentificationLevel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i32(self.ordinal())
    }
}

/// A contact record as stored in the index.
#[derive(Debug, Clone, Default)]
pub struct IndexedContact {
    pub contact_id: Uuid,
    /// Free text; not guaranteed to name an [`IdentificationLevel`].
    pub identification_level: Option<String>,
    pub first_name: Option<String>,
    pub middle_name: Option<String>,
    pub surname: Option<String>,
    pub preferred_email: Option<String>,
    pub job_title: Option<String>,
    pub value: i64,
    pub visit_count: i64,
    /// Text-matching field.
    pub full_name: Option<String>,
    /// Text-matching field.
    pub emails: Vec<String>,
}

/// Geolocation attached to a visit.
#[derive(Debug, Clone, PartialEq)]
pub struct VisitLocation {
    pub location_id: Uuid,
    pub city: Option<String>,
    pub region: Option<String>,
    pub country: Option<String>,
}

/// One recorded interaction belonging to a contact.
#[derive(Debug, Clone)]
pub struct IndexedVisit {
    pub interaction_id: Uuid,
    pub contact_id: Uuid,
    pub start_date_time: DateTime<Utc>,
    pub end_date_time: DateTime<Utc>,
    pub visit_page_count: i64,
    pub value: i64,
    pub location: Option<VisitLocation>,
}

/// Inputs for a single contact search.
#[derive(Debug, Clone)]
pub struct ContactSearchParameters {
    /// Free text; empty or `*` matches every contact.
    pub match_text: String,
    /// 1-based.
    pub page_number: u32,
    pub page_size: u32,
}

impl ContactSearchParameters {
    pub fn new(match_text: impl Into<String>, page_number: u32, page_size: u32) -> Self {
        Self {
            match_text: match_text.into(),
            page_number,
            page_size,
        }
    }

    /// Zero-based offset of the first hit on the requested page.
    ///
    /// Saturates instead of overflowing for pages far past any collection.
    pub fn offset(&self) -> usize {
        (self.page_number.saturating_sub(1) as usize).saturating_mul(self.page_size as usize)
    }
}

/// A contact search hit enriched with its latest visit.
///
/// Latest-visit fields are `None` (and omitted when serialized) for
/// contacts without any recorded visit.
#[derive(Debug, Clone, Serialize)]
pub struct ContactSearchResult {
    pub identification_level: IdentificationLevel,
    pub contact_id: Uuid,
    pub first_name: Option<String>,
    pub middle_name: Option<String>,
    pub surname: Option<String>,
    pub preferred_email: Option<String>,
    pub job_title: Option<String>,
    pub value: i64,
    pub visit_count: i64,
    pub value_per_visit: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest_visit_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest_visit_start_date_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest_visit_end_date_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest_visit_page_view_count: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest_visit_value: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest_visit_location_city_display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest_visit_location_region_display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest_visit_location_country_display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest_visit_location_id: Option<Uuid>,
}

/// Named collections carried by a [`ResultSet`].
#[derive(Debug, Clone, Serialize)]
pub struct ResultData<T> {
    pub dataset: BTreeMap<String, Vec<T>>,
}

impl<T> Default for ResultData<T> {
    fn default() -> Self {
        Self {
            dataset: BTreeMap::new(),
        }
    }
}

/// Paging envelope: total count plus one page of items.
#[derive(Debug, Clone, Serialize)]
pub struct ResultSet<T> {
    /// Matches before paging.
    pub total_result_count: u64,
    pub page_number: u32,
    pub page_size: u32,
    pub data: ResultData<T>,
}

impl<T> ResultSet<T> {
    pub fn new(page_number: u32, page_size: u32) -> Self {
        Self {
            total_result_count: 0,
            page_number,
            page_size,
            data: ResultData::default(),
        }
    }

    /// Items stored under `name`, or an empty slice.
    pub fn items(&self, name: &str) -> &[T] {
        self.data
            .dataset
            .get(name)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}
