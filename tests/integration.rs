use chrono::{DateTime, TimeZone, Utc};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;
use uuid::Uuid;

use contact_lookup::config::{self, Config};
use contact_lookup::models::{
    ContactSearchParameters, IndexedContact, IndexedVisit, VisitLocation, CONTACT_SEARCH_RESULTS,
};
use contact_lookup::search::search_contacts;
use contact_lookup::{db, migrate, SqliteIndex};

fn contacts_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("contacts");
    path
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let config_content = format!(
        r#"[contact_search]
search_index_name = "analytics"
default_page_size = 5

[indexes.analytics]
path = "{}/data/contacts.sqlite"

[server]
bind = "127.0.0.1:7341"
"#,
        root.display()
    );

    let config_path = config_dir.join("contacts.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_contacts(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = contacts_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run contacts binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

fn at(hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, hour, 0, 0).unwrap()
}

fn contact(first: &str, surname: &str, email: &str) -> IndexedContact {
    IndexedContact {
        contact_id: Uuid::new_v4(),
        identification_level: Some("Known".to_string()),
        first_name: Some(first.to_string()),
        surname: Some(surname.to_string()),
        preferred_email: Some(email.to_string()),
        value: 30,
        visit_count: 3,
        full_name: Some(format!("{} {}", first, surname)),
        emails: vec![email.to_string()],
        ..Default::default()
    }
}

fn visit(contact_id: Uuid, hour: u32, pages: i64, location: Option<VisitLocation>) -> IndexedVisit {
    IndexedVisit {
        interaction_id: Uuid::new_v4(),
        contact_id,
        start_date_time: at(hour),
        end_date_time: at(hour + 1),
        visit_page_count: pages,
        value: 10,
        location,
    }
}

/// Creates the schema and seeds five people; returns Jane's contact id.
async fn seed(config: &Config) -> Uuid {
    migrate::run_migrations(config).await.unwrap();
    let pool = db::connect(config).await.unwrap();
    let index = SqliteIndex::new(pool.clone());

    let jane = contact("Jane", "Doe", "jane@x.com");
    let jane_id = jane.contact_id;
    index.upsert_contact(&jane).await.unwrap();
    index
        .upsert_contact(&contact("Janet", "Roe", "janet@roe.org"))
        .await
        .unwrap();
    index
        .upsert_contact(&contact("Benjamin", "Janssen", "ben@janssen.nl"))
        .await
        .unwrap();
    index
        .upsert_contact(&contact("Oscar", "Wilde", "oscar@wilde.ie"))
        .await
        .unwrap();
    index
        .upsert_contact(&contact(
            "Bartholomew",
            "Montgomery-Featherstonehaugh",
            "bmf@estate.co.uk",
        ))
        .await
        .unwrap();

    index.upsert_visit(&visit(jane_id, 8, 2, None)).await.unwrap();
    index
        .upsert_visit(&visit(
            jane_id,
            14,
            7,
            Some(VisitLocation {
                location_id: Uuid::new_v4(),
                city: Some("Copenhagen".to_string()),
                region: Some("Capital Region".to_string()),
                country: Some("Denmark".to_string()),
            }),
        ))
        .await
        .unwrap();
    index.upsert_visit(&visit(jane_id, 11, 4, None)).await.unwrap();

    pool.close().await;
    jane_id
}

async fn seeded_config() -> (TempDir, Config, Uuid) {
    let (tmp, config_path) = setup_test_env();
    let cfg = config::load_config(&config_path).unwrap();
    let jane_id = seed(&cfg).await;
    (tmp, cfg, jane_id)
}

fn first_names(set: &contact_lookup::models::ResultSet<contact_lookup::models::ContactSearchResult>) -> Vec<String> {
    set.items(CONTACT_SEARCH_RESULTS)
        .iter()
        .map(|c| c.first_name.clone().unwrap_or_default())
        .collect()
}

#[tokio::test]
async fn test_exact_email_match() {
    let (_tmp, cfg, jane_id) = seeded_config().await;

    let set = search_contacts(&cfg, &ContactSearchParameters::new("jane@x.com", 1, 10))
        .await
        .unwrap();

    assert_eq!(set.total_result_count, 1);
    let items = set.items(CONTACT_SEARCH_RESULTS);
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].contact_id, jane_id);
    assert_eq!(items[0].value_per_visit, 10.0);
}

#[tokio::test]
async fn test_exact_match_ignores_case() {
    let (_tmp, cfg, jane_id) = seeded_config().await;

    let set = search_contacts(&cfg, &ContactSearchParameters::new("JANE DOE", 1, 10))
        .await
        .unwrap();

    assert_eq!(set.total_result_count, 1);
    assert_eq!(set.items(CONTACT_SEARCH_RESULTS)[0].contact_id, jane_id);
}

#[tokio::test]
async fn test_latest_visit_is_most_recent_start() {
    let (_tmp, cfg, _) = seeded_config().await;

    let set = search_contacts(&cfg, &ContactSearchParameters::new("jane@x.com", 1, 10))
        .await
        .unwrap();
    let jane = &set.items(CONTACT_SEARCH_RESULTS)[0];

    assert_eq!(jane.latest_visit_start_date_time, Some(at(14)));
    assert_eq!(jane.latest_visit_end_date_time, Some(at(15)));
    assert_eq!(jane.latest_visit_page_view_count, Some(7));
    assert_eq!(
        jane.latest_visit_location_city_display_name.as_deref(),
        Some("Copenhagen")
    );
    assert_eq!(
        jane.latest_visit_location_country_display_name.as_deref(),
        Some("Denmark")
    );
    assert!(jane.latest_visit_location_id.is_some());
}

#[tokio::test]
async fn test_wildcard_fallback_sorted_by_first_name() {
    let (_tmp, cfg, _) = seeded_config().await;

    let set = search_contacts(&cfg, &ContactSearchParameters::new("jan", 1, 10))
        .await
        .unwrap();

    assert_eq!(set.total_result_count, 3);
    assert_eq!(first_names(&set), vec!["Benjamin", "Jane", "Janet"]);
}

#[tokio::test]
async fn test_contact_without_visits_has_no_visit_fields() {
    let (_tmp, cfg, _) = seeded_config().await;

    let set = search_contacts(&cfg, &ContactSearchParameters::new("oscar@wilde.ie", 1, 10))
        .await
        .unwrap();
    let oscar = &set.items(CONTACT_SEARCH_RESULTS)[0];

    assert!(oscar.latest_visit_id.is_none());
    assert!(oscar.latest_visit_start_date_time.is_none());
    assert!(oscar.latest_visit_location_id.is_none());
}

#[tokio::test]
async fn test_fuzzy_fallback() {
    let (_tmp, cfg, _) = seeded_config().await;

    let set = search_contacts(
        &cfg,
        &ContactSearchParameters::new("bartholomew montgomery featherstonhaugh", 1, 10),
    )
    .await
    .unwrap();

    assert_eq!(first_names(&set), vec!["Bartholomew"]);
}

#[tokio::test]
async fn test_no_match_in_any_strategy() {
    let (_tmp, cfg, _) = seeded_config().await;

    let set = search_contacts(
        &cfg,
        &ContactSearchParameters::new("zzzzzzzzzzzzzzzzzzzzzzzzzzzzzz", 1, 10),
    )
    .await
    .unwrap();

    assert_eq!(set.total_result_count, 0);
    assert!(set.items(CONTACT_SEARCH_RESULTS).is_empty());
    assert_eq!(set.page_number, 1);
    assert_eq!(set.page_size, 10);
}

#[tokio::test]
async fn test_match_all_paging() {
    let (_tmp, cfg, _) = seeded_config().await;

    let first = search_contacts(&cfg, &ContactSearchParameters::new("*", 1, 2))
        .await
        .unwrap();
    let second = search_contacts(&cfg, &ContactSearchParameters::new("", 2, 2))
        .await
        .unwrap();
    let third = search_contacts(&cfg, &ContactSearchParameters::new("   ", 3, 2))
        .await
        .unwrap();

    for set in [&first, &second, &third] {
        assert_eq!(set.total_result_count, 5);
    }
    // Pages follow insertion order; sorting applies within each page.
    assert_eq!(first_names(&first), vec!["Jane", "Janet"]);
    assert_eq!(first_names(&second), vec!["Benjamin", "Oscar"]);
    assert_eq!(first_names(&third), vec!["Bartholomew"]);
}

#[tokio::test]
async fn test_search_deterministic() {
    let (_tmp, cfg, _) = seeded_config().await;
    let params = ContactSearchParameters::new("jan", 1, 10);

    let a = search_contacts(&cfg, &params).await.unwrap();
    let b = search_contacts(&cfg, &params).await.unwrap();

    assert_eq!(
        serde_json::to_value(&a).unwrap(),
        serde_json::to_value(&b).unwrap()
    );
}

#[tokio::test]
async fn test_invalid_paging_rejected() {
    let (_tmp, cfg, _) = seeded_config().await;

    let err = search_contacts(&cfg, &ContactSearchParameters::new("*", 0, 10))
        .await
        .unwrap_err();
    assert!(err.to_string().starts_with("invalid paging"));

    let err = search_contacts(&cfg, &ContactSearchParameters::new("*", 1, 0))
        .await
        .unwrap_err();
    assert!(err.to_string().starts_with("invalid paging"));
}

#[tokio::test]
async fn test_page_beyond_any_offset_is_empty() {
    let (_tmp, cfg, _) = seeded_config().await;

    let set = search_contacts(
        &cfg,
        &ContactSearchParameters::new("*", u32::MAX, u32::MAX),
    )
    .await
    .unwrap();

    assert_eq!(set.total_result_count, 5);
    assert!(set.items(CONTACT_SEARCH_RESULTS).is_empty());
}

#[tokio::test]
async fn test_exact_match_folds_non_ascii_case() {
    let (_tmp, config_path) = setup_test_env();
    let cfg = config::load_config(&config_path).unwrap();
    migrate::run_migrations(&cfg).await.unwrap();

    let pool = db::connect(&cfg).await.unwrap();
    let index = SqliteIndex::new(pool.clone());
    let jose = contact("José", "Núñez", "jose@nunez.es");
    let jose_id = jose.contact_id;
    index.upsert_contact(&jose).await.unwrap();
    index
        .upsert_contact(&contact("Anna", "Berg", "anna@berg.se"))
        .await
        .unwrap();
    index
        .upsert_contact(&contact("Søren", "Ågård", "SØREN@ÅGÅRD.DK"))
        .await
        .unwrap();
    pool.close().await;

    let set = search_contacts(&cfg, &ContactSearchParameters::new("JOSÉ NÚÑEZ", 1, 10))
        .await
        .unwrap();
    assert_eq!(set.total_result_count, 1);
    assert_eq!(set.items(CONTACT_SEARCH_RESULTS)[0].contact_id, jose_id);

    let set = search_contacts(&cfg, &ContactSearchParameters::new("søren@ågård.dk", 1, 10))
        .await
        .unwrap();
    assert_eq!(first_names(&set), vec!["Søren"]);

    // Substring branch folds the same way.
    let set = search_contacts(&cfg, &ContactSearchParameters::new("ÑEZ", 1, 10))
        .await
        .unwrap();
    assert_eq!(set.total_result_count, 1);
    assert_eq!(first_names(&set), vec!["José"]);
}

#[tokio::test]
async fn test_upsert_contact_replaces_emails() {
    let (_tmp, cfg, jane_id) = seeded_config().await;

    let pool = db::connect(&cfg).await.unwrap();
    let index = SqliteIndex::new(pool.clone());
    let mut jane = contact("Jane", "Doe", "jane.doe@new.example");
    jane.contact_id = jane_id;
    index.upsert_contact(&jane).await.unwrap();
    pool.close().await;

    let old = search_contacts(&cfg, &ContactSearchParameters::new("jane@x.com", 1, 10))
        .await
        .unwrap();
    // Only the fuzzy pass can still hit; the old address is gone.
    assert!(old
        .items(CONTACT_SEARCH_RESULTS)
        .iter()
        .all(|c| c.preferred_email.as_deref() != Some("jane@x.com")));

    let new = search_contacts(
        &cfg,
        &ContactSearchParameters::new("jane.doe@new.example", 1, 10),
    )
    .await
    .unwrap();
    assert_eq!(new.total_result_count, 1);
    assert_eq!(new.items(CONTACT_SEARCH_RESULTS)[0].contact_id, jane_id);

    let all = search_contacts(&cfg, &ContactSearchParameters::new("*", 1, 10))
        .await
        .unwrap();
    assert_eq!(all.total_result_count, 5);
}

#[tokio::test]
async fn test_unconfigured_index_errors() {
    let (_tmp, config_path) = setup_test_env();
    let mut cfg = config::load_config(&config_path).unwrap();
    cfg.contact_search.search_index_name = "missing".to_string();

    let err = search_contacts(&cfg, &ContactSearchParameters::new("*", 1, 10))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("not configured"));
}

// ============ CLI ============

#[test]
fn test_init_creates_database() {
    let (tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_contacts(&config_path, &["init"]);
    assert!(success, "init failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("initialized"));
    assert!(tmp.path().join("data/contacts.sqlite").exists());
}

#[test]
fn test_init_idempotent() {
    let (_tmp, config_path) = setup_test_env();

    let (_, _, success1) = run_contacts(&config_path, &["init"]);
    assert!(success1, "First init failed");

    let (_, _, success2) = run_contacts(&config_path, &["init"]);
    assert!(success2, "Second init failed (not idempotent)");
}

#[test]
fn test_cli_search_empty_index() {
    let (_tmp, config_path) = setup_test_env();

    run_contacts(&config_path, &["init"]);
    let (stdout, stderr, success) = run_contacts(&config_path, &["search", "*"]);
    assert!(success, "search failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("No contacts. (total: 0)"));
}

#[tokio::test]
async fn test_cli_search_json() {
    let (_tmp, config_path) = setup_test_env();
    let cfg = config::load_config(&config_path).unwrap();
    seed(&cfg).await;

    let (stdout, stderr, success) = run_contacts(
        &config_path,
        &["search", "*", "--page", "2", "--page-size", "2", "--json"],
    );
    assert!(success, "search failed: stdout={}, stderr={}", stdout, stderr);

    let body: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(body["total_result_count"], 5);
    assert_eq!(body["page_number"], 2);
    assert_eq!(body["page_size"], 2);
    let rows = body["data"]["dataset"][CONTACT_SEARCH_RESULTS]
        .as_array()
        .unwrap();
    assert_eq!(rows.len(), 2);
}

#[tokio::test]
async fn test_cli_search_listing_uses_default_page_size() {
    let (_tmp, config_path) = setup_test_env();
    let cfg = config::load_config(&config_path).unwrap();
    seed(&cfg).await;

    let (stdout, stderr, success) = run_contacts(&config_path, &["search", "jane@x.com"]);
    assert!(success, "search failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("Page 1 (size 5) of 1 matching contacts"));
    assert!(stdout.contains("Jane Doe"));
    assert!(stdout.contains("from Copenhagen, Capital Region, Denmark"));
}

#[test]
fn test_cli_search_invalid_page_fails() {
    let (_tmp, config_path) = setup_test_env();

    run_contacts(&config_path, &["init"]);
    let (_, stderr, success) = run_contacts(&config_path, &["search", "*", "--page", "0"]);
    assert!(!success);
    assert!(stderr.contains("invalid paging"));
}
