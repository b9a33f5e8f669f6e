use serde::Deserialize;
use sqlx::PgPool;
use time::OffsetDateTime;
use tracing::info;
use uuid::Uuid;

use crate::audit::{AuditEntry, AuditService};
use crate::auth::AuthService;
use crate::error::{self, AppError};
use crate::model::{AuditAction, Dealer, DealerStatus, Principal};
use crate::validate;

/// Payload for creating a dealer together with its login user.
#[derive(Debug, Deserialize)]
pub struct NewDealer {
    pub company_name: String,
    pub contact_name: String,
    pub contact_phone: String,
    pub contact_email: String,
    pub address: String,
    /// Login username for the dealer's user account
    pub username: String,
    /// Display name for the dealer's user account
    pub name: String,
}

impl NewDealer {
    pub fn validate(&self) -> Result<(), AppError> {
        let mut errors = Vec::new();
        validate::require(&mut errors, "company_name", &self.company_name);
        validate::require(&mut errors, "contact_name", &self.contact_name);
        validate::phone(&mut errors, "contact_phone", &self.contact_phone);
        validate::email(&mut errors, "contact_email", &self.contact_email);
        validate::require(&mut errors, "address", &self.address);
        validate::username(&mut errors, "username", &self.username);
        validate::require(&mut errors, "name", &self.name);
        if errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(errors))
        }
    }
}

/// Partial update. The login email and username are deliberately absent:
/// they are fixed after creation.
#[derive(Debug, Deserialize)]
pub struct DealerUpdate {
    pub company_name: Option<String>,
    pub contact_name: Option<String>,
    pub contact_phone: Option<String>,
    pub contact_email: Option<String>,
    pub address: Option<String>,
    pub status: Option<DealerStatus>,
}

impl DealerUpdate {
    pub fn validate(&self) -> Result<(), AppError> {
        let mut errors = Vec::new();
        if self.company_name.is_none()
            && self.contact_name.is_none()
            && self.contact_phone.is_none()
            && self.contact_email.is_none()
            && self.address.is_none()
            && self.status.is_none()
        {
            errors.push(crate::error::FieldError::new(
                "body",
                "at least one field must be provided",
            ));
        }
        if let Some(company_name) = &self.company_name {
            validate::require(&mut errors, "company_name", company_name);
        }
        if let Some(phone) = &self.contact_phone {
            validate::phone(&mut errors, "contact_phone", phone);
        }
        if let Some(email) = &self.contact_email {
            validate::email(&mut errors, "contact_email", email);
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(errors))
        }
    }
}

/// Translate a unique-constraint violation on the dealer/user tables into
/// the same conflict the pre-insert checks report. Covers creates racing
/// past those checks, where the database constraint is the backstop.
fn map_unique_violation(err: sqlx::Error) -> AppError {
    if error::is_unique_violation(&err) {
        let message = match error::violated_constraint(&err) {
            Some("app_user_email_key") => "A user with this email already exists.",
            Some("app_user_username_key") => "A user with this username already exists.",
            _ => "A dealer with this company name already exists.",
        };
        return AppError::conflict(message);
    }
    err.into()
}

/// Admin-managed tenant lifecycle: each dealer owns a login user created
/// alongside it and everything cascades away on deletion.
#[derive(Clone)]
pub struct DealerService {
    db_pool: PgPool,
    audit: AuditService,
}

impl DealerService {
    pub fn new(db_pool: PgPool) -> Self {
        let audit = AuditService::new(db_pool.clone());
        Self { db_pool, audit }
    }

    pub async fn list(&self) -> Result<Vec<Dealer>, AppError> {
        let dealers =
            sqlx::query_as::<_, Dealer>("SELECT * FROM dealer ORDER BY company_name")
                .fetch_all(&self.db_pool)
                .await?;
        Ok(dealers)
    }

    pub async fn get(&self, dealer_id: Uuid) -> Result<Dealer, AppError> {
        let dealer = sqlx::query_as::<_, Dealer>("SELECT * FROM dealer WHERE id = $1")
            .bind(dealer_id)
            .fetch_optional(&self.db_pool)
            .await?
            .ok_or(AppError::NotFound("dealer"))?;
        Ok(dealer)
    }

    /// Create a dealer and its login user. Returns the dealer and the
    /// plaintext temporary password, disclosed exactly once.
    pub async fn create(
        &self,
        actor: &Principal,
        req: NewDealer,
    ) -> Result<(Dealer, String), AppError> {
        req.validate()?;

        let company_taken: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM dealer WHERE company_name = $1)")
                .bind(&req.company_name)
                .fetch_one(&self.db_pool)
                .await?;
        if company_taken {
            return Err(AppError::conflict(
                "A dealer with this company name already exists.",
            ));
        }

        let email_taken: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM app_user WHERE email = $1)")
                .bind(&req.contact_email)
                .fetch_one(&self.db_pool)
                .await?;
        if email_taken {
            return Err(AppError::conflict("A user with this email already exists."));
        }

        let username_taken: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM app_user WHERE username = $1)")
                .bind(&req.username)
                .fetch_one(&self.db_pool)
                .await?;
        if username_taken {
            return Err(AppError::conflict(
                "A user with this username already exists.",
            ));
        }

        let temp_password = AuthService::generate_temp_password();
        let password_hash = AuthService::hash_password(&temp_password)?;
        let actor_name = self.audit.actor_name(actor.user_id).await?;
        let now = OffsetDateTime::now_utc();

        let mut tx = self.db_pool.begin().await?;

        let user_id: Uuid = sqlx::query_scalar(
            "INSERT INTO app_user (role, name, username, email, password_hash, temp_password, created_at, updated_at)
             VALUES ('dealer', $1, $2, $3, $4, TRUE, $5, $5)
             RETURNING id",
        )
        .bind(&req.name)
        .bind(&req.username)
        .bind(&req.contact_email)
        .bind(password_hash)
        .bind(now)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_unique_violation)?;

        let dealer = sqlx::query_as::<_, Dealer>(
            "INSERT INTO dealer (user_id, company_name, contact_name, contact_phone, contact_email, address, status, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, 'active', $7, $7)
             RETURNING *",
        )
        .bind(user_id)
        .bind(&req.company_name)
        .bind(&req.contact_name)
        .bind(&req.contact_phone)
        .bind(&req.contact_email)
        .bind(&req.address)
        .bind(now)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_unique_violation)?;

        AuditService::record_in(
            &mut tx,
            AuditEntry {
                actor_user_id: actor.user_id,
                actor_name,
                dealer_id: None,
                action: AuditAction::CreateDealer,
                details: format!("Created dealer: {}", dealer.company_name),
            },
        )
        .await?;

        tx.commit().await?;

        info!("Dealer created: {}", dealer.company_name);
        Ok((dealer, temp_password))
    }

    pub async fn update(
        &self,
        actor: &Principal,
        dealer_id: Uuid,
        req: DealerUpdate,
    ) -> Result<Dealer, AppError> {
        req.validate()?;

        let dealer = self.get(dealer_id).await?;

        if let Some(company_name) = &req.company_name {
            if company_name != &dealer.company_name {
                let taken: bool = sqlx::query_scalar(
                    "SELECT EXISTS(SELECT 1 FROM dealer WHERE company_name = $1)",
                )
                .bind(company_name)
                .fetch_one(&self.db_pool)
                .await?;
                if taken {
                    return Err(AppError::conflict(
                        "A dealer with this company name already exists.",
                    ));
                }
            }
        }

        let actor_name = self.audit.actor_name(actor.user_id).await?;

        let mut tx = self.db_pool.begin().await?;

        let updated = sqlx::query_as::<_, Dealer>(
            "UPDATE dealer SET
                company_name = COALESCE($1, company_name),
                contact_name = COALESCE($2, contact_name),
                contact_phone = COALESCE($3, contact_phone),
                contact_email = COALESCE($4, contact_email),
                address = COALESCE($5, address),
                status = COALESCE($6, status),
                updated_at = $7
             WHERE id = $8
             RETURNING *",
        )
        .bind(&req.company_name)
        .bind(&req.contact_name)
        .bind(&req.contact_phone)
        .bind(&req.contact_email)
        .bind(&req.address)
        .bind(req.status)
        .bind(OffsetDateTime::now_utc())
        .bind(dealer_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_unique_violation)?;

        AuditService::record_in(
            &mut tx,
            AuditEntry {
                actor_user_id: actor.user_id,
                actor_name,
                dealer_id: None,
                action: AuditAction::UpdateDealer,
                details: format!("Updated dealer: {}", updated.company_name),
            },
        )
        .await?;

        tx.commit().await?;

        Ok(updated)
    }

    /// Delete a dealer. The audit entry is written before the row goes
    /// away; the login user and all tenant-owned employees and customers
    /// cascade in the same transaction.
    pub async fn delete(&self, actor: &Principal, dealer_id: Uuid) -> Result<(), AppError> {
        let dealer = self.get(dealer_id).await?;
        let actor_name = self.audit.actor_name(actor.user_id).await?;

        let mut tx = self.db_pool.begin().await?;

        AuditService::record_in(
            &mut tx,
            AuditEntry {
                actor_user_id: actor.user_id,
                actor_name,
                dealer_id: None,
                action: AuditAction::DeleteDealer,
                details: format!("Deleted dealer: {}", dealer.company_name),
            },
        )
        .await?;

        sqlx::query("DELETE FROM app_user WHERE id = $1")
            .bind(dealer.user_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        info!("Dealer deleted: {}", dealer.company_name);
        Ok(())
    }
}
