//! SQLite-backed [`ContactIndex`] implementation.
//!
//! Each search context is one read transaction, so every query of a
//! request sees the same snapshot. Releasing the context rolls the
//! transaction back.
//!
//! Exact and wildcard filters are evaluated in SQL against the case-folded
//! columns (`=` and `LIKE ... ESCAPE`), with the search text folded the
//! same way, so non-ASCII names match like they do in memory. SQLite has no
//! edit-distance function, so fuzzy filters scan the contacts in natural
//! order and test them with the core's matcher.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite, SqlitePool, Transaction};
use tokio::sync::Mutex;
use uuid::Uuid;

use contact_lookup_core::models::{IndexedContact, IndexedVisit, VisitLocation};
use contact_lookup_core::text;
use contact_lookup_core::store::{
    contact_matches, paginate, ContactFilter, ContactIndex, ContactQuery, SearchContext,
    SearchResults,
};

/// Separator used when folding a contact's emails into one column.
const EMAIL_SEPARATOR: char = '\u{1f}';

const CONTACT_COLUMNS: &str = r#"
    c.contact_id, c.identification_level, c.first_name, c.middle_name, c.surname,
    c.preferred_email, c.job_title, c.value, c.visit_count, c.full_name,
    (SELECT group_concat(e.email, char(31)) FROM contact_emails e
      WHERE e.contact_id = c.contact_id) AS emails
"#;

const EXACT_CLAUSE: &str = r#"
    WHERE c.full_name_folded = ?
       OR EXISTS (SELECT 1 FROM contact_emails e
                   WHERE e.contact_id = c.contact_id AND e.email_folded = ?)
"#;

const WILDCARD_CLAUSE: &str = r#"
    WHERE c.full_name_folded LIKE ? ESCAPE '\'
       OR EXISTS (SELECT 1 FROM contact_emails e
                   WHERE e.contact_id = c.contact_id AND e.email_folded LIKE ? ESCAPE '\')
"#;

/// SQLite implementation of the [`ContactIndex`] trait.
pub struct SqliteIndex {
    pool: SqlitePool,
}

impl SqliteIndex {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert or update a contact and replace its emails.
    ///
    /// Updating keeps the contact's position in the natural order.
    pub async fn upsert_contact(&self, contact: &IndexedContact) -> Result<()> {
        let contact_id = contact.contact_id.to_string();
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO contacts (contact_id, identification_level, first_name, middle_name,
                                  surname, preferred_email, job_title, value, visit_count,
                                  full_name, full_name_folded)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(contact_id) DO UPDATE SET
                identification_level = excluded.identification_level,
                first_name = excluded.first_name,
                middle_name = excluded.middle_name,
                surname = excluded.surname,
                preferred_email = excluded.preferred_email,
                job_title = excluded.job_title,
                value = excluded.value,
                visit_count = excluded.visit_count,
                full_name = excluded.full_name,
                full_name_folded = excluded.full_name_folded
            "#,
        )
        .bind(&contact_id)
        .bind(&contact.identification_level)
        .bind(&contact.first_name)
        .bind(&contact.middle_name)
        .bind(&contact.surname)
        .bind(&contact.preferred_email)
        .bind(&contact.job_title)
        .bind(contact.value)
        .bind(contact.visit_count)
        .bind(&contact.full_name)
        .bind(contact.full_name.as_deref().map(text::fold))
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM contact_emails WHERE contact_id = ?")
            .bind(&contact_id)
            .execute(&mut *tx)
            .await?;

        for (position, email) in contact.emails.iter().enumerate() {
            sqlx::query(
                "INSERT INTO contact_emails (contact_id, position, email, email_folded) \
                 VALUES (?, ?, ?, ?)",
            )
            .bind(&contact_id)
            .bind(position as i64)
            .bind(email)
            .bind(text::fold(email))
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Insert or update a visit.
    pub async fn upsert_visit(&self, visit: &IndexedVisit) -> Result<()> {
        let location = visit.location.as_ref();
        sqlx::query(
            r#"
            INSERT INTO visits (interaction_id, contact_id, start_date_time, end_date_time,
                                visit_page_count, value, location_id, city, region, country)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(interaction_id) DO UPDATE SET
                contact_id = excluded.contact_id,
                start_date_time = excluded.start_date_time,
                end_date_time = excluded.end_date_time,
                visit_page_count = excluded.visit_page_count,
                value = excluded.value,
                location_id = excluded.location_id,
                city = excluded.city,
                region = excluded.region,
                country = excluded.country
            "#,
        )
        .bind(visit.interaction_id.to_string())
        .bind(visit.contact_id.to_string())
        .bind(visit.start_date_time.timestamp_millis())
        .bind(visit.end_date_time.timestamp_millis())
        .bind(visit.visit_page_count)
        .bind(visit.value)
        .bind(location.map(|l| l.location_id.to_string()))
        .bind(location.and_then(|l| l.city.clone()))
        .bind(location.and_then(|l| l.region.clone()))
        .bind(location.and_then(|l| l.country.clone()))
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl ContactIndex for SqliteIndex {
    async fn open_context(&self) -> Result<Box<dyn SearchContext>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(SqliteContext { tx: Mutex::new(tx) }))
    }
}

struct SqliteContext {
    tx: Mutex<Transaction<'static, Sqlite>>,
}

/// Translate an index wildcard pattern into a `LIKE` pattern escaped with `\`.
pub fn like_pattern(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len() + 4);
    for ch in pattern.chars() {
        match ch {
            '*' => out.push('%'),
            '?' => out.push('_'),
            '%' | '_' | '\\' => {
                out.push('\\');
                out.push(ch);
            }
            _ => out.push(ch),
        }
    }
    out
}

fn parse_uuid(raw: &str, column: &str) -> Result<Uuid> {
    Uuid::parse_str(raw).with_context(|| format!("invalid UUID in {}: {}", column, raw))
}

fn parse_millis(ms: i64, column: &str) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ms).with_context(|| format!("invalid timestamp in {}: {}", column, ms))
}

fn row_to_contact(row: &SqliteRow) -> Result<IndexedContact> {
    let contact_id: String = row.try_get("contact_id")?;
    let emails: Option<String> = row.try_get("emails")?;

    Ok(IndexedContact {
        contact_id: parse_uuid(&contact_id, "contacts.contact_id")?,
        identification_level: row.try_get("identification_level")?,
        first_name: row.try_get("first_name")?,
        middle_name: row.try_get("middle_name")?,
        surname: row.try_get("surname")?,
        preferred_email: row.try_get("preferred_email")?,
        job_title: row.try_get("job_title")?,
        value: row.try_get("value")?,
        visit_count: row.try_get("visit_count")?,
        full_name: row.try_get("full_name")?,
        emails: emails
            .map(|s| s.split(EMAIL_SEPARATOR).map(str::to_string).collect())
            .unwrap_or_default(),
    })
}

fn row_to_visit(row: &SqliteRow) -> Result<IndexedVisit> {
    let interaction_id: String = row.try_get("interaction_id")?;
    let contact_id: String = row.try_get("contact_id")?;
    let location_id: Option<String> = row.try_get("location_id")?;

    let location = match location_id {
        Some(id) => Some(VisitLocation {
            location_id: parse_uuid(&id, "visits.location_id")?,
            city: row.try_get("city")?,
            region: row.try_get("region")?,
            country: row.try_get("country")?,
        }),
        None => None,
    };

    Ok(IndexedVisit {
        interaction_id: parse_uuid(&interaction_id, "visits.interaction_id")?,
        contact_id: parse_uuid(&contact_id, "visits.contact_id")?,
        start_date_time: parse_millis(row.try_get("start_date_time")?, "visits.start_date_time")?,
        end_date_time: parse_millis(row.try_get("end_date_time")?, "visits.end_date_time")?,
        visit_page_count: row.try_get("visit_page_count")?,
        value: row.try_get("value")?,
        location,
    })
}

impl SqliteContext {
    async fn query_filtered(
        &self,
        clause: &str,
        arg: Option<String>,
        query: &ContactQuery,
    ) -> Result<SearchResults<IndexedContact>> {
        let mut tx = self.tx.lock().await;

        let count_sql = format!("SELECT COUNT(*) AS n FROM contacts c {}", clause);
        let mut count_query = sqlx::query(&count_sql);
        if let Some(arg) = &arg {
            count_query = count_query.bind(arg.clone()).bind(arg.clone());
        }
        let total: i64 = count_query.fetch_one(&mut **tx).await?.try_get("n")?;

        let total = total.max(0) as u64;

        // A window SQLite cannot address lies past every row.
        let (Ok(limit), Ok(offset)) = (
            i64::try_from(query.page.limit),
            i64::try_from(query.page.offset),
        ) else {
            return Ok(SearchResults {
                hits: Vec::new(),
                total_search_results: total,
            });
        };

        let page_sql = format!(
            "SELECT {} FROM contacts c {} ORDER BY c.seq LIMIT ? OFFSET ?",
            CONTACT_COLUMNS, clause
        );
        let mut page_query = sqlx::query(&page_sql);
        if let Some(arg) = &arg {
            page_query = page_query.bind(arg.clone()).bind(arg.clone());
        }
        let rows = page_query
            .bind(limit)
            .bind(offset)
            .fetch_all(&mut **tx)
            .await?;

        let hits = rows.iter().map(row_to_contact).collect::<Result<Vec<_>>>()?;
        Ok(SearchResults {
            hits,
            total_search_results: total,
        })
    }

    async fn query_fuzzy(&self, query: &ContactQuery) -> Result<SearchResults<IndexedContact>> {
        let mut tx = self.tx.lock().await;
        let sql = format!("SELECT {} FROM contacts c ORDER BY c.seq", CONTACT_COLUMNS);
        let rows = sqlx::query(&sql).fetch_all(&mut **tx).await?;

        let mut matched = Vec::new();
        for row in &rows {
            let contact = row_to_contact(row)?;
            if contact_matches(&contact, |v| query.filter.matches_field(v).unwrap_or(false)) {
                matched.push(contact);
            }
        }
        Ok(paginate(matched, query.page))
    }
}

#[async_trait]
impl SearchContext for SqliteContext {
    async fn query_contacts(&self, query: &ContactQuery) -> Result<SearchResults<IndexedContact>> {
        match &query.filter {
            ContactFilter::All => self.query_filtered("", None, query).await,
            ContactFilter::Exact(value) => {
                self.query_filtered(EXACT_CLAUSE, Some(text::fold(value)), query)
                    .await
            }
            ContactFilter::Wildcard(pattern) => {
                let folded = like_pattern(&text::fold(pattern));
                self.query_filtered(WILDCARD_CLAUSE, Some(folded), query)
                    .await
            }
            ContactFilter::Fuzzy { .. } => self.query_fuzzy(query).await,
        }
    }

    async fn recent_visits(&self, contact_id: &Uuid, take: usize) -> Result<Vec<IndexedVisit>> {
        let mut tx = self.tx.lock().await;
        let rows = sqlx::query(
            r#"
            SELECT interaction_id, contact_id, start_date_time, end_date_time,
                   visit_page_count, value, location_id, city, region, country
            FROM visits
            WHERE contact_id = ?
            ORDER BY start_date_time DESC, rowid ASC
            LIMIT ?
            "#,
        )
        .bind(contact_id.to_string())
        .bind(take as i64)
        .fetch_all(&mut **tx)
        .await?;

        rows.iter().map(row_to_visit).collect()
    }

    async fn release(self: Box<Self>) -> Result<()> {
        let SqliteContext { tx } = *self;
        tx.into_inner().rollback().await?;
        Ok(())
    }
}
