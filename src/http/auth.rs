use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::AppState;
use crate::error::AppError;
use crate::model::{Principal, User};
use crate::validate;

#[derive(Debug, Deserialize)]
pub struct AdminLoginRequest {
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct DealerLoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub new_password: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub username: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: User,
}

pub async fn admin_login(
    State(state): State<AppState>,
    Json(req): Json<AdminLoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let mut errors = Vec::new();
    validate::require(&mut errors, "password", &req.password);
    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }

    let (user, token) = state.auth.admin_login(&req.password).await?;
    Ok(Json(LoginResponse { token, user }))
}

pub async fn dealer_login(
    State(state): State<AppState>,
    Json(req): Json<DealerLoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let mut errors = Vec::new();
    validate::email(&mut errors, "email", &req.email);
    validate::require(&mut errors, "password", &req.password);
    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }

    let (user, token) = state.auth.dealer_login(&req.email, &req.password).await?;
    Ok(Json(LoginResponse { token, user }))
}

/// Always responds 204, whether or not the email exists, so the endpoint
/// cannot be used to enumerate accounts.
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(req): Json<ForgotPasswordRequest>,
) -> Result<StatusCode, AppError> {
    let mut errors = Vec::new();
    validate::email(&mut errors, "email", &req.email);
    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }

    state.auth.forgot_password(&req.email).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Tokens are stateless; logout exists for client symmetry only.
pub async fn logout(_principal: Principal) -> StatusCode {
    StatusCode::NO_CONTENT
}

pub async fn change_password(
    State(state): State<AppState>,
    principal: Principal,
    Json(req): Json<ChangePasswordRequest>,
) -> Result<Json<Value>, AppError> {
    let mut errors = Vec::new();
    validate::password(&mut errors, "new_password", &req.new_password);
    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }

    let user = state
        .auth
        .change_password(&principal, &req.new_password)
        .await?;
    Ok(Json(json!({ "user": user })))
}

pub async fn update_profile(
    State(state): State<AppState>,
    principal: Principal,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<Json<User>, AppError> {
    let mut errors = Vec::new();
    if req.name.is_none() && req.username.is_none() {
        errors.push(crate::error::FieldError::new(
            "body",
            "at least one field must be provided",
        ));
    }
    if let Some(name) = &req.name {
        validate::require(&mut errors, "name", name);
    }
    if let Some(username) = &req.username {
        validate::username(&mut errors, "username", username);
    }
    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }

    let user = state
        .auth
        .update_profile(&principal, req.name, req.username)
        .await?;
    Ok(Json(user))
}
