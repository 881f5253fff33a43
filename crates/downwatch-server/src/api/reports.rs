use axum::{
    extract::{Query, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::middleware::RequestId;

use super::{
    map_store_error, validate_filename, ApiError, ApiResponse, AppState, ResponseMeta,
};

#[derive(Debug, Deserialize)]
pub(super) struct FilenameQuery {
    pub filename: String,
}

#[derive(Debug, Serialize)]
pub(super) struct ReportPresence {
    pub filename: String,
    pub exists: bool,
}

#[derive(Debug, Serialize)]
pub(super) struct ReportDeleted {
    pub filename: String,
    pub deleted: bool,
}

pub(super) async fn check_report(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<FilenameQuery>,
) -> Result<Json<ApiResponse<ReportPresence>>, ApiError> {
    validate_filename(&req_id.0, &query.filename)?;
    let exists = state
        .reports
        .exists(&query.filename)
        .map_err(|e| map_store_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: ReportPresence {
            filename: query.filename,
            exists,
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// Serves a stored report verbatim; the body was validated at write time.
pub(super) async fn get_report(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<FilenameQuery>,
) -> Result<Json<ApiResponse<Value>>, ApiError> {
    validate_filename(&req_id.0, &query.filename)?;
    let report: Value = state
        .reports
        .load(&query.filename)
        .map_err(|e| map_store_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: report,
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn delete_report(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<FilenameQuery>,
) -> Result<Json<ApiResponse<ReportDeleted>>, ApiError> {
    validate_filename(&req_id.0, &query.filename)?;
    state
        .reports
        .delete(&query.filename)
        .map_err(|e| map_store_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: ReportDeleted {
            filename: query.filename,
            deleted: true,
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}
