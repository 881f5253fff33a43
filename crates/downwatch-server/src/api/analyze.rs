use axum::{
    extract::{Query, State},
    Extension, Json,
};
use downwatch_insight::{compare_services, ComparisonResult, InsightReport};

use crate::middleware::RequestId;

use super::scrape::{ensure_fresh_snapshot, ServiceQuery};
use super::{
    map_insight_error, map_store_error, resolve_service, ApiError, ApiResponse, AppState,
    ResponseMeta,
};

/// Full pipeline for one provider: ensure a fresh snapshot, generate an
/// insight report from it, persist the report under `{slug}.json`, and
/// return it.
pub(super) async fn analyze(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<ServiceQuery>,
) -> Result<Json<ApiResponse<InsightReport>>, ApiError> {
    let service = resolve_service(&state, &req_id.0, &query.service)?.clone();
    let (snapshot_id, snapshot, refreshed) =
        ensure_fresh_snapshot(&state, &req_id.0, &service).await?;
    tracing::info!(
        service = %service.name,
        snapshot_id = %snapshot_id,
        refreshed,
        "analyzing provider"
    );

    let report = state
        .generator
        .generate(&service.name, &snapshot_id, &snapshot)
        .await
        .map_err(|e| map_insight_error(req_id.0.clone(), &e))?;

    state
        .reports
        .save(&service.report_filename(), &report)
        .map_err(|e| map_store_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: report,
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// Cross-provider comparison built from stored snapshots and reports only.
pub(super) async fn compare_metrics(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<ComparisonResult>>, ApiError> {
    let comparison = compare_services(&state.services, &state.snapshots, &state.reports)
        .map_err(|e| map_store_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: comparison,
        meta: ResponseMeta::new(req_id.0),
    }))
}
