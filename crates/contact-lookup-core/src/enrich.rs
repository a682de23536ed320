//! Conversion of indexed contacts into search results.
//!
//! [`build_base_result`] maps the contact's own fields; [`populate_latest_visit`]
//! merges the summary of its most recent visit.

use crate::calculator::average_value;
use crate::models::{ContactSearchResult, IdentificationLevel, IndexedContact, IndexedVisit};

/// Map an indexed contact onto a result with no latest-visit data.
///
/// An unrecognized identification level resolves to
/// [`IdentificationLevel::None`]; this function never fails.
pub fn build_base_result(contact: &IndexedContact) -> ContactSearchResult {
    ContactSearchResult {
        identification_level: IdentificationLevel::parse_or_default(
            contact.identification_level.as_deref(),
        ),
        contact_id: contact.contact_id,
        first_name: contact.first_name.clone(),
        middle_name: contact.middle_name.clone(),
        surname: contact.surname.clone(),
        preferred_email: contact.preferred_email.clone(),
        job_title: contact.job_title.clone(),
        value: contact.value,
        visit_count: contact.visit_count,
        value_per_visit: average_value(contact.value as f64, contact.visit_count as f64),
        latest_visit_id: None,
        latest_visit_start_date_time: None,
        latest_visit_end_date_time: None,
        latest_visit_page_view_count: None,
        latest_visit_value: None,
        latest_visit_location_city_display_name: None,
        latest_visit_location_region_display_name: None,
        latest_visit_location_country_display_name: None,
        latest_visit_location_id: None,
    }
}

/// Copy the summary of `visit` into `result`.
///
/// Location fields are only touched when the visit carries a location.
pub fn populate_latest_visit(result: &mut ContactSearchResult, visit: &IndexedVisit) {
    result.latest_visit_id = Some(visit.interaction_id);
    result.latest_visit_start_date_time = Some(visit.start_date_time);
    result.latest_visit_end_date_time = Some(visit.end_date_time);
    result.latest_visit_page_view_count = Some(visit.visit_page_count);
    result.latest_visit_value = Some(visit.value);

    if let Some(location) = &visit.location {
        result.latest_visit_location_city_display_name = location.city.clone();
        result.latest_visit_location_region_display_name = location.region.clone();
        result.latest_visit_location_country_display_name = location.country.clone();
        result.latest_visit_location_id = Some(location.location_id);
    }
}
