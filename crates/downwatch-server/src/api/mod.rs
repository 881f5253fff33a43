mod analyze;
mod reports;
mod scrape;

use std::sync::Arc;

use axum::{
    http::{header, HeaderName, Method, StatusCode},
    response::IntoResponse,
    routing::{delete, get},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use downwatch_core::{ServiceConfig, ServicesFile};
use downwatch_insight::{GenerateInsights, InsightError};
use downwatch_scraper::{PageClient, ScrapeError};
use downwatch_store::{ReportStore, SnapshotStore, StoreError};
use serde::Serialize;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;

use crate::middleware::{request_id, RequestId};

#[derive(Clone)]
pub struct AppState {
    pub services: Arc<ServicesFile>,
    pub snapshots: SnapshotStore,
    pub reports: ReportStore,
    pub pages: Arc<PageClient>,
    pub generator: Arc<dyn GenerateInsights>,
    /// A snapshot younger than this satisfies ensure-fresh without a scrape.
    pub snapshot_max_age: chrono::Duration,
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: ErrorBody,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct HealthData {
    status: &'static str,
    services: usize,
}

impl ResponseMeta {
    pub(super) fn new(request_id: String) -> Self {
        Self {
            request_id,
            timestamp: Utc::now(),
        }
    }
}

impl ApiError {
    pub fn new(
        request_id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
            },
            meta: ResponseMeta::new(request_id.into()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.error.code.as_str() {
            "not_found" => StatusCode::NOT_FOUND,
            "bad_request" | "validation_error" => StatusCode::BAD_REQUEST,
            "rate_limited" => StatusCode::TOO_MANY_REQUESTS,
            "upstream_error" => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

/// Resolves a `service` query value to a configured provider by slug.
/// A slug outside the registry is a client error, not a missing resource.
pub(super) fn resolve_service<'a>(
    state: &'a AppState,
    request_id: &str,
    slug: &str,
) -> Result<&'a ServiceConfig, ApiError> {
    state.services.find(slug).ok_or_else(|| {
        ApiError::new(
            request_id,
            "validation_error",
            format!("unknown service: '{slug}'"),
        )
    })
}

/// Filenames come from clients, so they are validated before touching the
/// store: ASCII alphanumerics and dashes plus a `.json` suffix, nothing
/// path-like. Covers both report names (`t-mobile.json`) and snapshot ids
/// (`t-mobile-20251105T215200Z.json`).
pub(super) fn validate_filename(request_id: &str, filename: &str) -> Result<(), ApiError> {
    let stem = filename.strip_suffix(".json").unwrap_or_default();
    let valid = !stem.is_empty()
        && stem
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-');
    if valid {
        Ok(())
    } else {
        Err(ApiError::new(
            request_id,
            "validation_error",
            format!("invalid report filename: '{filename}'"),
        ))
    }
}

pub(super) fn map_store_error(request_id: String, error: &StoreError) -> ApiError {
    if error.is_not_found() {
        return ApiError::new(request_id, "not_found", error.to_string());
    }
    tracing::error!(error = %error, "storage operation failed");
    ApiError::new(request_id, "internal_error", "storage operation failed")
}

pub(super) fn map_scrape_error(request_id: String, error: &ScrapeError) -> ApiError {
    match error {
        // A missing provider page is an upstream fault, not a missing
        // resource of ours.
        ScrapeError::PageNotFound { url } => ApiError::new(
            request_id,
            "upstream_error",
            format!("provider page not found: {url}"),
        ),
        ScrapeError::RateLimited {
            domain,
            retry_after_secs,
        } => ApiError::new(
            request_id,
            "rate_limited",
            format!("rate limited by {domain}; retry after {retry_after_secs}s"),
        ),
        other => {
            tracing::error!(error = %other, "scrape failed");
            ApiError::new(request_id, "upstream_error", "failed to fetch outage data")
        }
    }
}

pub(super) fn map_insight_error(request_id: String, error: &InsightError) -> ApiError {
    match error {
        InsightError::MissingApiKey => ApiError::new(
            request_id,
            "internal_error",
            "insight generation is not configured",
        ),
        other => {
            tracing::error!(error = %other, "insight generation failed");
            ApiError::new(
                request_id,
                "upstream_error",
                "failed to generate insight report",
            )
        }
    }
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::DELETE])
        .allow_headers([
            header::CONTENT_TYPE,
            HeaderName::from_static("x-request-id"),
        ])
}

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/analyze", get(analyze::analyze))
        .route("/compare_metrics", get(analyze::compare_metrics))
        .route("/check_report", get(reports::check_report))
        .route("/get_report", get(reports::get_report))
        .route("/delete_report", delete(reports::delete_report))
        .route("/get_scraped_data", get(scrape::get_scraped_data))
        .route("/ensure_scraped_data", get(scrape::ensure_scraped_data))
        .layer(
            ServiceBuilder::new()
                .layer(build_cors())
                .layer(axum::middleware::from_fn(request_id)),
        )
        .with_state(state)
}

async fn health(
    axum::extract::State(state): axum::extract::State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> impl IntoResponse {
    Json(ApiResponse {
        data: HealthData {
            status: "ok",
            services: state.services.services.len(),
        },
        meta: ResponseMeta::new(req_id.0),
    })
}

#[cfg(test)]
#[path = "routes_test.rs"]
mod tests;
