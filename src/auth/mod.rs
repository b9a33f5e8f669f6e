mod auth_service;

use anyhow::{Result, anyhow};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::env;
use time::{Duration, OffsetDateTime};
use tracing::debug;
use uuid::Uuid;

use crate::model::{Principal, Role};

pub use auth_service::AuthService;

/// JWT Claims structure that will be encoded in the token
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: Uuid,
    /// Role of the authenticated user
    pub role: Role,
    /// Dealer ID when the user belongs to a tenant
    #[serde(skip_serializing_if = "Option::is_none")]
    pub did: Option<Uuid>,
    /// Issued at timestamp
    pub iat: i64,
    /// Expiration timestamp
    pub exp: i64,
    /// Issuer
    pub iss: String,
}

/// Configuration for JWT tokens
#[derive(Clone)]
pub struct JwtConfig {
    /// Secret key for signing tokens
    encoding_key: EncodingKey,
    /// Key for verifying token signatures
    decoding_key: DecodingKey,
    /// Token expiration time in seconds
    expiration: i64,
    /// Issuer claim value
    issuer: String,
}

impl JwtConfig {
    /// Initialize JWT configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let secret = env::var("JWT_SECRET").map_err(|_| anyhow!("JWT_SECRET must be set"))?;
        let expiration = env::var("JWT_EXPIRATION_SECONDS")
            .unwrap_or_else(|_| "28800".to_string()) // Default to 8 hours
            .parse::<i64>()
            .map_err(|_| anyhow!("JWT_EXPIRATION_SECONDS must be a valid number"))?;
        let issuer = env::var("JWT_ISSUER").unwrap_or_else(|_| "unioncore".to_string());

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            expiration,
            issuer,
        })
    }

    /// Generate a JWT token carrying the principal's identity
    pub fn generate_token(&self, principal: &Principal) -> Result<String> {
        let now = OffsetDateTime::now_utc();
        let expiration = now + Duration::seconds(self.expiration);

        let claims = Claims {
            sub: principal.user_id,
            role: principal.role,
            did: principal.dealer_id,
            iat: now.unix_timestamp(),
            exp: expiration.unix_timestamp(),
            iss: self.issuer.clone(),
        };

        let token = encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| anyhow!("Failed to generate JWT token: {}", e))?;

        debug!("Generated JWT token for user_id: {}", principal.user_id);
        Ok(token)
    }

    /// Validate a JWT token and extract the claims
    pub fn validate_token(&self, token: &str) -> Result<Claims> {
        let validation = Validation::new(Algorithm::HS256);

        let token_data = decode::<Claims>(token, &self.decoding_key, &validation)
            .map_err(|e| anyhow!("Failed to validate JWT token: {}", e))?;

        debug!("Validated JWT token for user_id: {}", token_data.claims.sub);
        Ok(token_data.claims)
    }

    /// Convert JWT claims to a Principal
    pub fn claims_to_principal(claims: Claims) -> Principal {
        Principal {
            user_id: claims.sub,
            role: claims.role,
            dealer_id: claims.did,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    fn test_config() -> JwtConfig {
        unsafe {
            env::set_var("JWT_SECRET", "test_secret_key_for_jwt_token_testing");
            env::set_var("JWT_EXPIRATION_SECONDS", "3600");
            env::set_var("JWT_ISSUER", "test_issuer");
        }
        JwtConfig::from_env().unwrap()
    }

    #[test]
    fn test_jwt_token_lifecycle() {
        let jwt_config = test_config();

        let dealer_id = Uuid::new_v4();
        let principal = Principal {
            user_id: Uuid::new_v4(),
            role: Role::Dealer,
            dealer_id: Some(dealer_id),
        };

        // Generate token
        let token = jwt_config.generate_token(&principal).unwrap();
        assert!(!token.is_empty());

        // Validate token
        let claims = jwt_config.validate_token(&token).unwrap();
        assert_eq!(claims.sub, principal.user_id);
        assert_eq!(claims.role, Role::Dealer);
        assert_eq!(claims.did, Some(dealer_id));
        assert_eq!(claims.iss, "test_issuer");

        // Convert claims back to a principal
        let decoded = JwtConfig::claims_to_principal(claims);
        assert_eq!(decoded.user_id, principal.user_id);
        assert_eq!(decoded.role, principal.role);
        assert_eq!(decoded.dealer_id, principal.dealer_id);
    }

    #[test]
    fn test_admin_token_carries_no_dealer() {
        let jwt_config = test_config();

        let principal = Principal {
            user_id: Uuid::new_v4(),
            role: Role::Admin,
            dealer_id: None,
        };

        let token = jwt_config.generate_token(&principal).unwrap();
        let claims = jwt_config.validate_token(&token).unwrap();
        assert_eq!(claims.role, Role::Admin);
        assert!(claims.did.is_none());
    }

    #[test]
    fn test_tampered_token_is_rejected() {
        let jwt_config = test_config();

        let principal = Principal {
            user_id: Uuid::new_v4(),
            role: Role::Admin,
            dealer_id: None,
        };

        let mut token = jwt_config.generate_token(&principal).unwrap();
        token.push('x');
        assert!(jwt_config.validate_token(&token).is_err());
    }
}
