use sqlx::{PgPool, Postgres, Transaction};
use time::OffsetDateTime;
use tracing::debug;
use uuid::Uuid;

use crate::error::AppError;
use crate::model::{AuditAction, AuditLog};

/// Display cap for the admin-facing listing
const ADMIN_LOG_LIMIT: i64 = 1000;
/// Display cap for dealer-scoped reads
const DEALER_LOG_LIMIT: i64 = 500;

/// One audit entry waiting to be appended.
#[derive(Debug, Clone)]
pub struct AuditEntry {
    pub actor_user_id: Uuid,
    pub actor_name: String,
    pub dealer_id: Option<Uuid>,
    pub action: AuditAction,
    pub details: String,
}

/// Append-only audit trail. Writes happen on every sensitive operation;
/// reads are role-filtered list operations. No update or delete exists.
#[derive(Clone)]
pub struct AuditService {
    db_pool: PgPool,
}

impl AuditService {
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }

    /// Append one entry outside any transaction (logins, searches).
    pub async fn record(&self, entry: AuditEntry) -> Result<(), AppError> {
        Self::insert(&self.db_pool, &entry).await
    }

    /// Append one entry inside the caller's transaction so the primary
    /// write and its audit record commit or roll back together.
    pub async fn record_in(
        tx: &mut Transaction<'_, Postgres>,
        entry: AuditEntry,
    ) -> Result<(), AppError> {
        Self::insert(&mut **tx, &entry).await
    }

    async fn insert<'e, E>(executor: E, entry: &AuditEntry) -> Result<(), AppError>
    where
        E: sqlx::Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            "INSERT INTO audit_log (actor_user_id, actor_name, dealer_id, action, details, created_at)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(entry.actor_user_id)
        .bind(&entry.actor_name)
        .bind(entry.dealer_id)
        .bind(entry.action)
        .bind(&entry.details)
        .bind(OffsetDateTime::now_utc())
        .execute(executor)
        .await?;

        debug!("Audit entry recorded: {:?}", entry.action);
        Ok(())
    }

    /// All entries, newest first (admin view).
    pub async fn list_all(&self) -> Result<Vec<AuditLog>, AppError> {
        let logs = sqlx::query_as::<_, AuditLog>(
            "SELECT * FROM audit_log ORDER BY created_at DESC LIMIT $1",
        )
        .bind(ADMIN_LOG_LIMIT)
        .fetch_all(&self.db_pool)
        .await?;

        Ok(logs)
    }

    /// Snapshot of the acting user's display name for denormalized entries.
    pub async fn actor_name(&self, user_id: Uuid) -> Result<String, AppError> {
        let name: String = sqlx::query_scalar("SELECT name FROM app_user WHERE id = $1")
            .bind(user_id)
            .fetch_one(&self.db_pool)
            .await?;
        Ok(name)
    }

    /// Entries scoped to one tenant, newest first (dealer view).
    pub async fn list_for_dealer(&self, dealer_id: Uuid) -> Result<Vec<AuditLog>, AppError> {
        let logs = sqlx::query_as::<_, AuditLog>(
            "SELECT * FROM audit_log WHERE dealer_id = $1 ORDER BY created_at DESC LIMIT $2",
        )
        .bind(dealer_id)
        .bind(DEALER_LOG_LIMIT)
        .fetch_all(&self.db_pool)
        .await?;

        Ok(logs)
    }
}
