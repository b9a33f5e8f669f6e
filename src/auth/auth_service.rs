use anyhow::{Result, anyhow};
use argon2::{
    Argon2,
    password_hash::{
        PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
        rand_core::{OsRng, RngCore},
    },
};
use sqlx::PgPool;
use time::OffsetDateTime;
use tracing::{error, info};
use uuid::Uuid;

use super::JwtConfig;
use crate::audit::{AuditEntry, AuditService};
use crate::config::AppConfig;
use crate::error::AppError;
use crate::model::{AuditAction, Dealer, DealerStatus, Principal, Role, User};

/// Characters used for generated temporary passwords. Visually ambiguous
/// characters (I, l, 0, O, 1) are excluded.
const TEMP_PASSWORD_CHARS: &[u8] =
    b"ABCDEFGHJKLMNPQRSTUVWXYZabcdefghjkmnpqrstuvwxyz23456789@#$%";
const TEMP_PASSWORD_LEN: usize = 12;

/// Authentication service: credential verification, token issuance,
/// password lifecycle and profile updates.
#[derive(Clone)]
pub struct AuthService {
    /// Database connection pool
    db_pool: PgPool,
    /// JWT configuration
    pub jwt_config: JwtConfig,
    /// Application configuration (admin credential, seed email)
    config: AppConfig,
    /// Audit trail writer
    audit: AuditService,
}

impl AuthService {
    /// Create a new authentication service
    pub fn new(db_pool: PgPool, jwt_config: JwtConfig, config: AppConfig) -> Self {
        let audit = AuditService::new(db_pool.clone());
        Self {
            db_pool,
            jwt_config,
            config,
            audit,
        }
    }

    /// Hash a password using Argon2
    pub fn hash_password(password: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let argon2 = Argon2::default();
        let password_hash = argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| anyhow!("Password hashing error: {}", e))?
            .to_string();
        Ok(password_hash)
    }

    /// Verify a password against a hash using Argon2
    pub fn verify_password(password: &str, password_hash: &str) -> Result<bool> {
        let parsed_hash = PasswordHash::new(password_hash)
            .map_err(|e| anyhow!("Password hash parsing error: {}", e))?;
        let result = Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok();
        Ok(result)
    }

    /// Generate a random temporary password for new dealers and resets
    pub fn generate_temp_password() -> String {
        let mut bytes = [0u8; TEMP_PASSWORD_LEN];
        OsRng.fill_bytes(&mut bytes);
        bytes
            .iter()
            .map(|b| TEMP_PASSWORD_CHARS[*b as usize % TEMP_PASSWORD_CHARS.len()] as char)
            .collect()
    }

    /// Ensure the admin user exists, creating it on first startup
    pub async fn seed_admin(&self) -> Result<Uuid> {
        let existing: Option<Uuid> =
            sqlx::query_scalar("SELECT id FROM app_user WHERE email = $1")
                .bind(&self.config.admin_email)
                .fetch_optional(&self.db_pool)
                .await?;

        if let Some(id) = existing {
            info!("Admin user already exists");
            return Ok(id);
        }

        info!("Creating admin user");
        let password_hash = Self::hash_password(&self.config.admin_password)?;
        let id: Uuid = sqlx::query_scalar(
            "INSERT INTO app_user (role, name, username, email, password_hash, temp_password, created_at, updated_at)
             VALUES ('admin', 'Administrator', 'admin', $1, $2, FALSE, $3, $3)
             RETURNING id",
        )
        .bind(&self.config.admin_email)
        .bind(password_hash)
        .bind(OffsetDateTime::now_utc())
        .fetch_one(&self.db_pool)
        .await?;

        Ok(id)
    }

    /// Authenticate against the shared admin credential
    pub async fn admin_login(&self, password: &str) -> Result<(User, String), AppError> {
        if password != self.config.admin_password {
            error!("Admin password verification failed");
            return Err(AppError::authentication("Invalid admin credentials."));
        }

        let admin = sqlx::query_as::<_, User>("SELECT * FROM app_user WHERE email = $1")
            .bind(&self.config.admin_email)
            .fetch_optional(&self.db_pool)
            .await?
            .ok_or_else(|| AppError::authentication("Invalid admin credentials."))?;

        let principal = Principal {
            user_id: admin.id,
            role: Role::Admin,
            dealer_id: None,
        };
        let token = self.jwt_config.generate_token(&principal)?;

        self.audit
            .record(AuditEntry {
                actor_user_id: admin.id,
                actor_name: admin.name.clone(),
                dealer_id: None,
                action: AuditAction::Login,
                details: "Admin logged in".to_string(),
            })
            .await?;

        info!("Admin authenticated successfully");
        Ok((admin, token))
    }

    /// Authenticate a dealer user with email and password
    pub async fn dealer_login(&self, email: &str, password: &str) -> Result<(User, String), AppError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT * FROM app_user WHERE email = $1 AND role = 'dealer'",
        )
        .bind(email)
        .fetch_optional(&self.db_pool)
        .await?
        .ok_or_else(|| AppError::authentication("Invalid dealer credentials."))?;

        if !Self::verify_password(password, &user.password_hash)? {
            error!("Password verification failed for user: {}", email);
            return Err(AppError::authentication("Invalid dealer credentials."));
        }

        let dealer = sqlx::query_as::<_, Dealer>("SELECT * FROM dealer WHERE user_id = $1")
            .bind(user.id)
            .fetch_optional(&self.db_pool)
            .await?
            .ok_or_else(|| AppError::authentication("Invalid dealer credentials."))?;

        if dealer.status == DealerStatus::Suspended {
            return Err(AppError::authorization("Dealer account is suspended."));
        }

        let principal = Principal {
            user_id: user.id,
            role: Role::Dealer,
            dealer_id: Some(dealer.id),
        };
        let token = self.jwt_config.generate_token(&principal)?;

        self.audit
            .record(AuditEntry {
                actor_user_id: user.id,
                actor_name: user.name.clone(),
                dealer_id: Some(dealer.id),
                action: AuditAction::Login,
                details: format!("Dealer logged in: {}", dealer.company_name),
            })
            .await?;

        info!("Dealer authenticated successfully: {}", email);
        Ok((user, token))
    }

    /// Password reset request. Succeeds whether or not the email exists so
    /// the endpoint cannot be used to enumerate accounts.
    pub async fn forgot_password(&self, email: &str) -> Result<(), AppError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM app_user WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.db_pool)
            .await?;

        if let Some(user) = user {
            let dealer_id: Option<Uuid> = if user.role == Role::Dealer {
                sqlx::query_scalar("SELECT id FROM dealer WHERE user_id = $1")
                    .bind(user.id)
                    .fetch_optional(&self.db_pool)
                    .await?
            } else {
                None
            };

            self.audit
                .record(AuditEntry {
                    actor_user_id: user.id,
                    actor_name: user.name,
                    dealer_id,
                    action: AuditAction::ForgotPassword,
                    details: format!("Password reset requested for email: {}", email),
                })
                .await?;
        }

        Ok(())
    }

    /// Change the calling user's own password
    pub async fn change_password(
        &self,
        principal: &Principal,
        new_password: &str,
    ) -> Result<User, AppError> {
        let password_hash = Self::hash_password(new_password)?;

        let mut tx = self.db_pool.begin().await?;

        let user = sqlx::query_as::<_, User>(
            "UPDATE app_user SET password_hash = $1, temp_password = FALSE, updated_at = $2
             WHERE id = $3
             RETURNING *",
        )
        .bind(password_hash)
        .bind(OffsetDateTime::now_utc())
        .bind(principal.user_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(AppError::NotFound("user"))?;

        AuditService::record_in(
            &mut tx,
            AuditEntry {
                actor_user_id: user.id,
                actor_name: user.name.clone(),
                dealer_id: principal.dealer_id,
                action: AuditAction::ChangePassword,
                details: "User changed their password".to_string(),
            },
        )
        .await?;

        tx.commit().await?;

        info!("Password changed for user_id: {}", user.id);
        Ok(user)
    }

    /// Update the calling user's display name and/or username
    pub async fn update_profile(
        &self,
        principal: &Principal,
        name: Option<String>,
        username: Option<String>,
    ) -> Result<User, AppError> {
        if let Some(username) = &username {
            let taken: bool = sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM app_user WHERE username = $1 AND id <> $2)",
            )
            .bind(username)
            .bind(principal.user_id)
            .fetch_one(&self.db_pool)
            .await?;

            if taken {
                return Err(AppError::conflict(
                    "A user with this username already exists.",
                ));
            }
        }

        let mut tx = self.db_pool.begin().await?;

        let user = sqlx::query_as::<_, User>(
            "UPDATE app_user SET
                name = COALESCE($1, name),
                username = COALESCE($2, username),
                updated_at = $3
             WHERE id = $4
             RETURNING *",
        )
        .bind(&name)
        .bind(&username)
        .bind(OffsetDateTime::now_utc())
        .bind(principal.user_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|err| {
            if crate::error::is_unique_violation(&err) {
                AppError::conflict("A user with this username already exists.")
            } else {
                err.into()
            }
        })?
        .ok_or(AppError::NotFound("user"))?;

        AuditService::record_in(
            &mut tx,
            AuditEntry {
                actor_user_id: user.id,
                actor_name: user.name.clone(),
                dealer_id: principal.dealer_id,
                action: AuditAction::UpdateProfile,
                details: format!("User updated their profile: {}", user.username),
            },
        )
        .await?;

        tx.commit().await?;

        Ok(user)
    }

    /// Admin-driven reset: issue a new temporary password for a user
    pub async fn reset_password(
        &self,
        actor: &Principal,
        user_id: Uuid,
    ) -> Result<String, AppError> {
        let target = sqlx::query_as::<_, User>("SELECT * FROM app_user WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.db_pool)
            .await?
            .ok_or(AppError::NotFound("user"))?;

        let actor_user = self.get_user(actor.user_id).await?;

        let temp_password = Self::generate_temp_password();
        let password_hash = Self::hash_password(&temp_password)?;

        let mut tx = self.db_pool.begin().await?;

        sqlx::query(
            "UPDATE app_user SET password_hash = $1, temp_password = TRUE, updated_at = $2
             WHERE id = $3",
        )
        .bind(password_hash)
        .bind(OffsetDateTime::now_utc())
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        AuditService::record_in(
            &mut tx,
            AuditEntry {
                actor_user_id: actor.user_id,
                actor_name: actor_user.name,
                dealer_id: None,
                action: AuditAction::ResetPassword,
                details: format!("Reset password for user: {}", target.name),
            },
        )
        .await?;

        tx.commit().await?;

        info!("Password reset for user_id: {}", user_id);
        Ok(temp_password)
    }

    /// Fetch a user by id
    pub async fn get_user(&self, user_id: Uuid) -> Result<User, AppError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM app_user WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.db_pool)
            .await?
            .ok_or(AppError::NotFound("user"))?;

        Ok(user)
    }
}
