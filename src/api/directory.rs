//! Store directory endpoints.

use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{success, ApiResult};
use crate::errors::AppError;
use crate::models::{id_to_string, VerifyOutcome, VerifyRequest};
use crate::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryStatus {
    pub stores: usize,
    pub fetched_at: DateTime<Utc>,
}

/// POST /api/verify-users - Split store ids into known stores and unknown ids.
pub async fn verify_users(
    State(state): State<AppState>,
    Json(request): Json<VerifyRequest>,
) -> ApiResult<VerifyOutcome> {
    let Some(serde_json::Value::Array(raw_ids)) = request.store_ids else {
        return Err(AppError::BadRequest("Invalid storeIds".to_string()));
    };
    let store_ids: Vec<String> = raw_ids.iter().map(id_to_string).collect();

    let snapshot = state.directory.get().await?;
    let outcome = snapshot.verify(&store_ids);
    tracing::info!(
        found = outcome.found_users.len(),
        not_found = outcome.not_found_ids.len(),
        "Verified store ids"
    );

    success(outcome)
}

/// POST /api/directory/refresh - Rebuild the directory snapshot now.
pub async fn refresh_directory(State(state): State<AppState>) -> ApiResult<DirectoryStatus> {
    let snapshot = state.directory.force_refresh().await?;

    success(DirectoryStatus {
        stores: snapshot.len(),
        fetched_at: snapshot.fetched_at(),
    })
}
