use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use serde::Serialize;
use serde_json::{Value, json};
use uuid::Uuid;

use super::AppState;
use super::extract::AdminPrincipal;
use crate::dealers::{DealerUpdate, NewDealer};
use crate::error::AppError;
use crate::model::{AuditLog, Dealer};

#[derive(Debug, Serialize)]
pub struct CreatedDealer {
    pub dealer: Dealer,
    /// Plaintext temporary password, disclosed exactly once
    pub temp_password: String,
}

pub async fn list_dealers(
    State(state): State<AppState>,
    AdminPrincipal(_): AdminPrincipal,
) -> Result<Json<Vec<Dealer>>, AppError> {
    let dealers = state.dealers.list().await?;
    Ok(Json(dealers))
}

pub async fn create_dealer(
    State(state): State<AppState>,
    AdminPrincipal(principal): AdminPrincipal,
    Json(req): Json<NewDealer>,
) -> Result<(StatusCode, Json<CreatedDealer>), AppError> {
    let (dealer, temp_password) = state.dealers.create(&principal, req).await?;
    Ok((
        StatusCode::CREATED,
        Json(CreatedDealer {
            dealer,
            temp_password,
        }),
    ))
}

pub async fn update_dealer(
    State(state): State<AppState>,
    AdminPrincipal(principal): AdminPrincipal,
    Path(dealer_id): Path<Uuid>,
    Json(req): Json<DealerUpdate>,
) -> Result<Json<Dealer>, AppError> {
    let dealer = state.dealers.update(&principal, dealer_id, req).await?;
    Ok(Json(dealer))
}

pub async fn delete_dealer(
    State(state): State<AppState>,
    AdminPrincipal(principal): AdminPrincipal,
    Path(dealer_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.dealers.delete(&principal, dealer_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn reset_password(
    State(state): State<AppState>,
    AdminPrincipal(principal): AdminPrincipal,
    Path(user_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let temp_password = state.auth.reset_password(&principal, user_id).await?;
    Ok(Json(json!({ "temp_password": temp_password })))
}

pub async fn audit_logs(
    State(state): State<AppState>,
    AdminPrincipal(_): AdminPrincipal,
) -> Result<Json<Vec<AuditLog>>, AppError> {
    let logs = state.audit.list_all().await?;
    Ok(Json(logs))
}
