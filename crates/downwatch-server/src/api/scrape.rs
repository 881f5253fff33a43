use axum::{
    extract::{Query, State},
    Extension, Json,
};
use chrono::Utc;
use downwatch_core::ServiceConfig;
use downwatch_scraper::{extract_snapshot, Snapshot};
use serde::{Deserialize, Serialize};

use crate::middleware::RequestId;

use super::{
    map_scrape_error, map_store_error, resolve_service, validate_filename, ApiError,
    ApiResponse, AppState, ResponseMeta,
};

#[derive(Debug, Deserialize)]
pub(super) struct ServiceQuery {
    pub service: String,
}

#[derive(Debug, Serialize)]
pub(super) struct ScrapedData {
    pub snapshot_id: String,
    pub snapshot: Snapshot,
}

#[derive(Debug, Serialize)]
pub(super) struct EnsuredData {
    pub snapshot_id: String,
    /// True when this request scraped; false when a fresh snapshot already
    /// existed.
    pub refreshed: bool,
    pub snapshot: Snapshot,
}

/// Returns a fresh snapshot id and its contents, scraping only when the
/// latest stored snapshot is older than the configured max age.
///
/// Concurrent callers may each scrape; immutable time-derived ids make
/// that safe, and readers resolve whichever snapshot sorts latest.
pub(super) async fn ensure_fresh_snapshot(
    state: &AppState,
    request_id: &str,
    service: &ServiceConfig,
) -> Result<(String, Snapshot, bool), ApiError> {
    let slug = service.slug();

    if let Some(id) = state
        .snapshots
        .fresh(&slug, state.snapshot_max_age)
        .map_err(|e| map_store_error(request_id.to_owned(), &e))?
    {
        let snapshot = state
            .snapshots
            .load(&id)
            .map_err(|e| map_store_error(request_id.to_owned(), &e))?;
        tracing::debug!(service = %slug, snapshot_id = %id, "reusing fresh snapshot");
        return Ok((id, snapshot, false));
    }

    let (problems_html, map_html) = tokio::try_join!(
        state.pages.fetch_problems_page(&slug),
        state.pages.fetch_map_page(&slug),
    )
    .map_err(|e| map_scrape_error(request_id.to_owned(), &e))?;

    let snapshot = extract_snapshot(&slug, Utc::now(), &problems_html, &map_html);
    let id = state
        .snapshots
        .save(&snapshot)
        .map_err(|e| map_store_error(request_id.to_owned(), &e))?;
    Ok((id, snapshot, true))
}

#[derive(Debug, Deserialize)]
pub(super) struct SnapshotQuery {
    pub filename: String,
}

/// Serves one stored snapshot by its id (snapshot ids double as filenames).
pub(super) async fn get_scraped_data(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<SnapshotQuery>,
) -> Result<Json<ApiResponse<ScrapedData>>, ApiError> {
    validate_filename(&req_id.0, &query.filename)?;
    let snapshot = state
        .snapshots
        .load(&query.filename)
        .map_err(|e| map_store_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: ScrapedData {
            snapshot_id: query.filename,
            snapshot,
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn ensure_scraped_data(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<ServiceQuery>,
) -> Result<Json<ApiResponse<EnsuredData>>, ApiError> {
    let service = resolve_service(&state, &req_id.0, &query.service)?.clone();
    let (snapshot_id, snapshot, refreshed) =
        ensure_fresh_snapshot(&state, &req_id.0, &service).await?;

    Ok(Json(ApiResponse {
        data: EnsuredData {
            snapshot_id,
            refreshed,
            snapshot,
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}
