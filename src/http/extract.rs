use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use uuid::Uuid;

use super::AppState;
use crate::auth::JwtConfig;
use crate::error::AppError;
use crate::model::{Principal, Role};

/// Resolve the bearer token into a Principal. Missing, malformed, expired
/// or forged credentials are rejected with 401 before any handler runs.
#[async_trait]
impl FromRequestParts<AppState> for Principal {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::authentication("Missing authorization header."))?;

        let token = header
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::authentication("Invalid authorization header."))?;

        let claims = state
            .auth
            .jwt_config
            .validate_token(token)
            .map_err(|_| AppError::authentication("Invalid or expired token."))?;

        Ok(JwtConfig::claims_to_principal(claims))
    }
}

/// Role gate for the admin route group. Authenticated non-admins get a
/// 403, distinct from the 401 an unauthenticated caller gets.
pub struct AdminPrincipal(pub Principal);

#[async_trait]
impl FromRequestParts<AppState> for AdminPrincipal {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let principal = Principal::from_request_parts(parts, state).await?;
        if principal.role != Role::Admin {
            return Err(AppError::authorization("Admin access required."));
        }
        Ok(AdminPrincipal(principal))
    }
}

/// Role gate for the dealer route group; carries the tenant id every
/// dealer-scoped operation is filtered by.
pub struct DealerPrincipal {
    pub principal: Principal,
    pub dealer_id: Uuid,
}

#[async_trait]
impl FromRequestParts<AppState> for DealerPrincipal {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let principal = Principal::from_request_parts(parts, state).await?;
        let dealer_id = match (principal.role, principal.dealer_id) {
            (Role::Dealer, Some(dealer_id)) => dealer_id,
            _ => return Err(AppError::authorization("Dealer access required.")),
        };
        Ok(DealerPrincipal {
            principal,
            dealer_id,
        })
    }
}
