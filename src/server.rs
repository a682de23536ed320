//! HTTP server exposing contact search as a JSON API.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/contacts/search` | Run a contact search, returns the paging envelope |
//! | `GET`  | `/health` | Liveness, crate version and configured index name |
//!
//! # Request
//!
//! ```json
//! { "match": "jane@x.com", "page_number": 1, "page_size": 20 }
//! ```
//!
//! `page_number` defaults to 1 and `page_size` to
//! `contact_search.default_page_size`.
//!
//! Failures return
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "invalid paging: page_number must be >= 1" } }
//! ```
//!
//! Error codes: `bad_request` (400, including malformed bodies) and
//! `internal` (500). An index failure fails the whole request; there are
//! no partial results.
//!
//! Responses allow any origin so browser dashboards can call the API
//! directly.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use contact_lookup_core::models::{ContactSearchParameters, ContactSearchResult, ResultSet};
use contact_lookup_core::store::ContactIndex;

use crate::config::Config;
use crate::db;
use crate::sqlite_index::SqliteIndex;

#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    /// Index searched by every request; contexts are opened per request.
    index: Arc<dyn ContactIndex>,
}

impl AppState {
    pub fn new(config: Config, index: Arc<dyn ContactIndex>) -> Self {
        Self {
            config: Arc::new(config),
            index,
        }
    }
}

/// Build the router with all routes and CORS applied.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/contacts/search", post(handle_search))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(state)
}

/// Starts the HTTP server.
///
/// Connects to the configured search index once, then binds to
/// `[server].bind` and serves until the process is terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let pool = db::connect(config).await?;
    let index: Arc<dyn ContactIndex> = Arc::new(SqliteIndex::new(pool));
    let bind_addr = config.server.bind.clone();

    let app = router(AppState::new(config.clone(), index));

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(
        bind = %bind_addr,
        index = %config.contact_search.search_index_name,
        "contact search server listening"
    );
    axum::serve(listener, app).await?;

    Ok(())
}

/// Failure response: `{"error": {"code", "message"}}` with a status code.
struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl AppError {
    fn bad_request(message: String) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            code: "bad_request",
            message,
        }
    }

    fn internal(message: String) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            code: "internal",
            message,
        }
    }
}

impl From<anyhow::Error> for AppError {
    /// Paging validation failures are client errors; anything else came
    /// from the index.
    fn from(err: anyhow::Error) -> Self {
        let message = format!("{:#}", err);
        if message.starts_with("invalid paging") {
            Self::bad_request(message)
        } else {
            tracing::warn!(error = %message, "contact search failed");
            Self::internal(message)
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "error": { "code": self.code, "message": self.message }
        });
        (self.status, Json(body)).into_response()
    }
}

#[derive(Serialize)]
struct Health {
    status: &'static str,
    version: &'static str,
    index: String,
}

async fn handle_health(State(state): State<AppState>) -> Json<Health> {
    Json(Health {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        index: state.config.contact_search.search_index_name.clone(),
    })
}

// ============ POST /contacts/search ============

/// JSON body of `POST /contacts/search`.
///
/// Paging is read as signed integers so out-of-range values reach the
/// paging check and come back as `invalid paging` instead of a decode error.
#[derive(Debug, Deserialize)]
pub struct SearchBody {
    #[serde(rename = "match", default)]
    pub match_text: String,
    #[serde(default = "default_page_number")]
    pub page_number: i64,
    #[serde(default)]
    pub page_size: Option<i64>,
}

fn default_page_number() -> i64 {
    1
}

fn paging_value(field: &str, value: i64) -> Result<u32, AppError> {
    u32::try_from(value).map_err(|_| {
        AppError::bad_request(format!(
            "invalid paging: {} must be between 1 and {}",
            field,
            u32::MAX
        ))
    })
}

async fn handle_search(
    State(state): State<AppState>,
    payload: Result<Json<SearchBody>, JsonRejection>,
) -> Result<Json<ResultSet<ContactSearchResult>>, AppError> {
    let Json(body) = payload.map_err(|rejection| {
        AppError::bad_request(format!("invalid request body: {}", rejection.body_text()))
    })?;

    let page_size = match body.page_size {
        Some(size) => paging_value("page_size", size)?,
        None => state.config.contact_search.default_page_size,
    };
    let params = ContactSearchParameters::new(
        body.match_text,
        paging_value("page_number", body.page_number)?,
        page_size,
    );

    let set = contact_lookup_core::search::find(state.index.as_ref(), &params).await?;
    Ok(Json(set))
}
