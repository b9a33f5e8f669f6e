use axum::Json;
use axum::extract::{Query, State};
use serde::Deserialize;

use super::AppState;
use crate::error::AppError;
use crate::model::{Principal, SearchHit};

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
}

#[derive(Debug, Deserialize)]
pub struct CheckParams {
    #[serde(default)]
    pub national_id: String,
}

/// Free-text cross-tenant search; open to any authenticated principal
/// and audited inside the service.
pub async fn search_employees(
    State(state): State<AppState>,
    principal: Principal,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<SearchHit>>, AppError> {
    let hits = state.search.search(&principal, &params.q).await?;
    Ok(Json(hits))
}

/// Exact national-id lookup over active employees, any tenant.
pub async fn check_identity(
    State(state): State<AppState>,
    _principal: Principal,
    Query(params): Query<CheckParams>,
) -> Result<Json<Option<SearchHit>>, AppError> {
    let hit = state.search.check_identity(&params.national_id).await?;
    Ok(Json(hit))
}
