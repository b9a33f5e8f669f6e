use sqlx::PgPool;
use tracing::info;

use crate::audit::{AuditEntry, AuditService};
use crate::error::AppError;
use crate::model::{AuditAction, Principal, SearchHit};

/// Cap on free-text search results; bounds response size, not correctness.
const SEARCH_RESULT_LIMIT: i64 = 50;

const HIT_COLUMNS: &str = "e.id, e.dealer_id, d.company_name AS employer_name, \
     e.first_name || ' ' || e.last_name AS full_name, \
     e.first_name, e.last_name, e.phone, e.national_id, e.position, \
     e.status, e.hire_date, e.termination_date, e.termination_reason";

/// Cross-tenant identity search. This is the one read path that
/// deliberately crosses tenant isolation: it scans every tenant's
/// employees and reports the owning dealer on each hit. Free-text
/// queries are audited so the crossing is traceable after the fact.
#[derive(Clone)]
pub struct SearchService {
    db_pool: PgPool,
    audit: AuditService,
}

impl SearchService {
    pub fn new(db_pool: PgPool) -> Self {
        let audit = AuditService::new(db_pool.clone());
        Self { db_pool, audit }
    }

    /// Free-text search over all tenants' employees. Matches are
    /// case-insensitive substrings of first name, last name, phone or
    /// national id. Available to any authenticated principal.
    pub async fn search(
        &self,
        principal: &Principal,
        query: &str,
    ) -> Result<Vec<SearchHit>, AppError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(AppError::validation("q", "Search query is required"));
        }

        let pattern = like_pattern(query);

        let sql = format!(
            "SELECT {HIT_COLUMNS}
             FROM employee e
             JOIN dealer d ON d.id = e.dealer_id
             WHERE e.first_name ILIKE $1
                OR e.last_name ILIKE $1
                OR e.phone ILIKE $1
                OR e.national_id ILIKE $1
             ORDER BY e.last_name, e.first_name
             LIMIT $2",
        );
        let hits = sqlx::query_as::<_, SearchHit>(&sql)
            .bind(&pattern)
            .bind(SEARCH_RESULT_LIMIT)
            .fetch_all(&self.db_pool)
            .await?;

        let actor_name = self.audit.actor_name(principal.user_id).await?;
        self.audit
            .record(AuditEntry {
                actor_user_id: principal.user_id,
                actor_name,
                dealer_id: principal.dealer_id,
                action: AuditAction::SearchEmployees,
                details: format!(
                    "Searched for employees: \"{}\" ({} results)",
                    query,
                    hits.len()
                ),
            })
            .await?;

        info!(
            "Cross-tenant search by user_id {}: {} results",
            principal.user_id,
            hits.len()
        );
        Ok(hits)
    }

    /// Exact national-id lookup over ACTIVE employees across all tenants.
    /// Returns the current holder annotated with their employer, or `None`
    /// once no active employee owns the id. This is the enforcement check
    /// run before any employee creation.
    pub async fn check_identity(
        &self,
        national_id: &str,
    ) -> Result<Option<SearchHit>, AppError> {
        let national_id = national_id.trim();
        if national_id.is_empty() {
            return Err(AppError::validation(
                "national_id",
                "National ID is required",
            ));
        }

        let sql = format!(
            "SELECT {HIT_COLUMNS}
             FROM employee e
             JOIN dealer d ON d.id = e.dealer_id
             WHERE e.national_id = $1 AND e.status = 'active'",
        );
        let hit = sqlx::query_as::<_, SearchHit>(&sql)
            .bind(national_id)
            .fetch_optional(&self.db_pool)
            .await?;

        Ok(hit)
    }
}

/// Build an ILIKE substring pattern, escaping the wildcard characters in
/// the raw query so user input matches literally.
fn like_pattern(query: &str) -> String {
    let mut escaped = String::with_capacity(query.len() + 2);
    escaped.push('%');
    for c in query.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_pattern_wraps_query() {
        assert_eq!(like_pattern("sharma"), "%sharma%");
    }

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("100%"), "%100\\%%");
        assert_eq!(like_pattern("a_b"), "%a\\_b%");
        assert_eq!(like_pattern("a\\b"), "%a\\\\b%");
    }
}
