use serde::Deserialize;
use sqlx::PgPool;
use time::{Date, OffsetDateTime};
use tracing::info;
use uuid::Uuid;

use crate::audit::{AuditEntry, AuditService};
use crate::error::{self, AppError};
use crate::model::{AuditAction, Employee, Principal};
use crate::search::SearchService;
use crate::validate;

#[derive(Debug, Deserialize)]
pub struct NewEmployee {
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub email: String,
    pub national_id: String,
    pub position: String,
    pub hire_date: Date,
}

impl NewEmployee {
    pub fn validate(&self) -> Result<(), AppError> {
        let mut errors = Vec::new();
        validate::require(&mut errors, "first_name", &self.first_name);
        validate::require(&mut errors, "last_name", &self.last_name);
        validate::phone(&mut errors, "phone", &self.phone);
        validate::email(&mut errors, "email", &self.email);
        validate::national_id(&mut errors, "national_id", &self.national_id);
        validate::require(&mut errors, "position", &self.position);
        validate::not_future(&mut errors, "hire_date", self.hire_date);
        if errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(errors))
        }
    }
}

/// Partial update. The national id is deliberately absent: it is
/// immutable for the life of the record.
#[derive(Debug, Deserialize)]
pub struct EmployeeUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub position: Option<String>,
    pub hire_date: Option<Date>,
}

impl EmployeeUpdate {
    pub fn validate(&self) -> Result<(), AppError> {
        let mut errors = Vec::new();
        if self.first_name.is_none()
            && self.last_name.is_none()
            && self.phone.is_none()
            && self.email.is_none()
            && self.position.is_none()
            && self.hire_date.is_none()
        {
            errors.push(crate::error::FieldError::new(
                "body",
                "at least one field must be provided",
            ));
        }
        if let Some(phone) = &self.phone {
            validate::phone(&mut errors, "phone", phone);
        }
        if let Some(email) = &self.email {
            validate::email(&mut errors, "email", email);
        }
        if let Some(hire_date) = self.hire_date {
            validate::not_future(&mut errors, "hire_date", hire_date);
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(errors))
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Termination {
    pub date: Date,
    pub reason: String,
}

impl Termination {
    pub fn validate(&self) -> Result<(), AppError> {
        let mut errors = Vec::new();
        validate::require(&mut errors, "reason", &self.reason);
        validate::not_future(&mut errors, "date", self.date);
        if errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(errors))
        }
    }
}

/// Tenant-scoped employee management. Creation runs the cross-tenant
/// national-id check; a hit anywhere in the system blocks the insert and
/// names the current employer.
#[derive(Clone)]
pub struct EmployeeService {
    db_pool: PgPool,
    audit: AuditService,
    search: SearchService,
}

impl EmployeeService {
    pub fn new(db_pool: PgPool) -> Self {
        let audit = AuditService::new(db_pool.clone());
        let search = SearchService::new(db_pool.clone());
        Self {
            db_pool,
            audit,
            search,
        }
    }

    pub async fn list(&self, dealer_id: Uuid) -> Result<Vec<Employee>, AppError> {
        let employees = sqlx::query_as::<_, Employee>(
            "SELECT * FROM employee WHERE dealer_id = $1 ORDER BY last_name, first_name",
        )
        .bind(dealer_id)
        .fetch_all(&self.db_pool)
        .await?;
        Ok(employees)
    }

    /// Load an employee and verify tenant ownership. An unknown id is a
    /// 404; an id owned by another dealer is a 403, never a 404.
    pub async fn get_owned(
        &self,
        dealer_id: Uuid,
        employee_id: Uuid,
    ) -> Result<Employee, AppError> {
        let employee = sqlx::query_as::<_, Employee>("SELECT * FROM employee WHERE id = $1")
            .bind(employee_id)
            .fetch_optional(&self.db_pool)
            .await?
            .ok_or(AppError::NotFound("employee"))?;

        if employee.dealer_id != dealer_id {
            return Err(AppError::authorization("Forbidden."));
        }

        Ok(employee)
    }

    pub async fn create(
        &self,
        actor: &Principal,
        dealer_id: Uuid,
        req: NewEmployee,
    ) -> Result<Employee, AppError> {
        req.validate()?;

        // Cross-tenant enforcement: one active holder per national id,
        // system-wide.
        if let Some(holder) = self.search.check_identity(&req.national_id).await? {
            return Err(AppError::conflict(format!(
                "An employee with this national ID already exists. Current Employer: {} (Status: {}).",
                holder.employer_name,
                holder.status.as_str()
            )));
        }

        let actor_name = self.audit.actor_name(actor.user_id).await?;
        let company_name: String = sqlx::query_scalar("SELECT company_name FROM dealer WHERE id = $1")
            .bind(dealer_id)
            .fetch_one(&self.db_pool)
            .await?;
        let now = OffsetDateTime::now_utc();

        let mut tx = self.db_pool.begin().await?;

        let inserted = sqlx::query_as::<_, Employee>(
            "INSERT INTO employee (dealer_id, first_name, last_name, phone, email, national_id, position, hire_date, status, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'active', $9, $9)
             RETURNING *",
        )
        .bind(dealer_id)
        .bind(&req.first_name)
        .bind(&req.last_name)
        .bind(&req.phone)
        .bind(&req.email)
        .bind(&req.national_id)
        .bind(&req.position)
        .bind(req.hire_date)
        .bind(now)
        .fetch_one(&mut *tx)
        .await;

        let employee = match inserted {
            Ok(employee) => employee,
            Err(err) if error::is_unique_violation(&err) => {
                // The partial unique index fired: another create won the
                // race between our check and this insert. Report the same
                // conflict the check would have.
                drop(tx);
                let message = match self.search.check_identity(&req.national_id).await? {
                    Some(holder) => format!(
                        "An employee with this national ID already exists. Current Employer: {} (Status: {}).",
                        holder.employer_name,
                        holder.status.as_str()
                    ),
                    None => "An employee with this national ID already exists.".to_string(),
                };
                return Err(AppError::conflict(message));
            }
            Err(err) => return Err(err.into()),
        };

        AuditService::record_in(
            &mut tx,
            AuditEntry {
                actor_user_id: actor.user_id,
                actor_name,
                dealer_id: Some(dealer_id),
                action: AuditAction::CreateEmployee,
                details: format!(
                    "Created employee: {} at {}",
                    employee.full_name(),
                    company_name
                ),
            },
        )
        .await?;

        tx.commit().await?;

        info!("Employee created: {}", employee.full_name());
        Ok(employee)
    }

    pub async fn update(
        &self,
        actor: &Principal,
        dealer_id: Uuid,
        employee_id: Uuid,
        req: EmployeeUpdate,
    ) -> Result<Employee, AppError> {
        req.validate()?;

        self.get_owned(dealer_id, employee_id).await?;

        let actor_name = self.audit.actor_name(actor.user_id).await?;

        let mut tx = self.db_pool.begin().await?;

        let updated = sqlx::query_as::<_, Employee>(
            "UPDATE employee SET
                first_name = COALESCE($1, first_name),
                last_name = COALESCE($2, last_name),
                phone = COALESCE($3, phone),
                email = COALESCE($4, email),
                position = COALESCE($5, position),
                hire_date = COALESCE($6, hire_date),
                updated_at = $7
             WHERE id = $8
             RETURNING *",
        )
        .bind(&req.first_name)
        .bind(&req.last_name)
        .bind(&req.phone)
        .bind(&req.email)
        .bind(&req.position)
        .bind(req.hire_date)
        .bind(OffsetDateTime::now_utc())
        .bind(employee_id)
        .fetch_one(&mut *tx)
        .await?;

        AuditService::record_in(
            &mut tx,
            AuditEntry {
                actor_user_id: actor.user_id,
                actor_name,
                dealer_id: Some(dealer_id),
                action: AuditAction::UpdateEmployee,
                details: format!("Updated employee: {}", updated.full_name()),
            },
        )
        .await?;

        tx.commit().await?;

        Ok(updated)
    }

    /// One-way transition to terminated status. The termination date may
    /// not precede the hire date; there is no un-terminate operation.
    pub async fn terminate(
        &self,
        actor: &Principal,
        dealer_id: Uuid,
        employee_id: Uuid,
        req: Termination,
    ) -> Result<Employee, AppError> {
        req.validate()?;

        let employee = self.get_owned(dealer_id, employee_id).await?;

        if req.date < employee.hire_date {
            return Err(AppError::validation(
                "date",
                "Termination date cannot be earlier than the hire date.",
            ));
        }

        let actor_name = self.audit.actor_name(actor.user_id).await?;

        let mut tx = self.db_pool.begin().await?;

        let updated = sqlx::query_as::<_, Employee>(
            "UPDATE employee SET
                status = 'terminated',
                termination_date = $1,
                termination_reason = $2,
                updated_at = $3
             WHERE id = $4
             RETURNING *",
        )
        .bind(req.date)
        .bind(&req.reason)
        .bind(OffsetDateTime::now_utc())
        .bind(employee_id)
        .fetch_one(&mut *tx)
        .await?;

        AuditService::record_in(
            &mut tx,
            AuditEntry {
                actor_user_id: actor.user_id,
                actor_name,
                dealer_id: Some(dealer_id),
                action: AuditAction::TerminateEmployee,
                details: format!(
                    "Terminated employee: {}. Reason: {}",
                    updated.full_name(),
                    req.reason
                ),
            },
        )
        .await?;

        tx.commit().await?;

        info!("Employee terminated: {}", updated.full_name());
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dotenv::dotenv;
    use sqlx::postgres::PgPoolOptions;
    use std::env;
    use time::macros::date;

    use crate::dealers::{DealerService, NewDealer};
    use crate::model::{Dealer, EmployeeStatus, Role};
    use crate::search::SearchService;

    async fn setup_test_db() -> PgPool {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set for tests");

        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(&database_url)
            .await
            .expect("Failed to create database connection pool");

        // Run migrations to ensure schema is up to date
        sqlx::migrate!("./sql/migrations")
            .run(&pool)
            .await
            .expect("Failed to run migrations");

        pool
    }

    /// Digits-only uniqueness tag, usable inside usernames and national ids
    fn unique_tag() -> String {
        format!(
            "{}",
            OffsetDateTime::now_utc().unix_timestamp_nanos().unsigned_abs()
        )
    }

    fn national_id_from(tag: &str) -> String {
        format!("{:0>12}", &tag[tag.len().saturating_sub(12)..])
    }

    async fn seed_admin(pool: &PgPool) -> Principal {
        let tag = unique_tag();
        let id: Uuid = sqlx::query_scalar(
            "INSERT INTO app_user (role, name, username, email, password_hash, temp_password, created_at, updated_at)
             VALUES ('admin', 'Test Admin', $1, $2, 'unused', FALSE, $3, $3)
             RETURNING id",
        )
        .bind(format!("adm{tag}"))
        .bind(format!("adm{tag}@example.com"))
        .bind(OffsetDateTime::now_utc())
        .fetch_one(pool)
        .await
        .expect("Failed to seed admin user");
        Principal {
            user_id: id,
            role: Role::Admin,
            dealer_id: None,
        }
    }

    async fn seed_dealer(pool: &PgPool) -> (Dealer, Principal) {
        let admin = seed_admin(pool).await;
        let tag = unique_tag();
        let dealers = DealerService::new(pool.clone());
        let (dealer, _temp_password) = dealers
            .create(
                &admin,
                NewDealer {
                    company_name: format!("Test Fuels {tag}"),
                    contact_name: "Ravi Sharma".to_string(),
                    contact_phone: "9876543210".to_string(),
                    contact_email: format!("dlr{tag}@example.com"),
                    address: "12 Depot Road".to_string(),
                    username: format!("dlr{tag}"),
                    name: "Dealer User".to_string(),
                },
            )
            .await
            .expect("Failed to create dealer");
        let principal = Principal {
            user_id: dealer.user_id,
            role: Role::Dealer,
            dealer_id: Some(dealer.id),
        };
        (dealer, principal)
    }

    async fn audit_rows_for(pool: &PgPool, dealer_id: Uuid) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM audit_log WHERE dealer_id = $1")
            .bind(dealer_id)
            .fetch_one(pool)
            .await
            .expect("Failed to count audit rows")
    }

    fn valid_new_employee() -> NewEmployee {
        NewEmployee {
            first_name: "Priya".to_string(),
            last_name: "Sharma".to_string(),
            phone: "9876543210".to_string(),
            email: "priya@x.com".to_string(),
            national_id: "123456789012".to_string(),
            position: "Attendant".to_string(),
            hire_date: date!(2023 - 04 - 01),
        }
    }

    #[test]
    fn test_new_employee_validation() {
        assert!(valid_new_employee().validate().is_ok());

        let mut bad = valid_new_employee();
        bad.national_id = "12345".to_string();
        bad.hire_date = date!(2099 - 01 - 01);
        let err = bad.validate().unwrap_err();
        match err {
            AppError::Validation(errors) => {
                let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
                assert!(fields.contains(&"national_id"));
                assert!(fields.contains(&"hire_date"));
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_employee_update_is_rejected() {
        let update = EmployeeUpdate {
            first_name: None,
            last_name: None,
            phone: None,
            email: None,
            position: None,
            hire_date: None,
        };
        assert!(update.validate().is_err());
    }

    #[test]
    fn test_termination_requires_reason() {
        let termination = Termination {
            date: date!(2024 - 06 - 01),
            reason: String::new(),
        };
        assert!(termination.validate().is_err());

        let termination = Termination {
            date: date!(2024 - 06 - 01),
            reason: "Resigned".to_string(),
        };
        assert!(termination.validate().is_ok());
    }

    #[tokio::test]
    async fn test_duplicate_national_id_conflict_names_current_employer() {
        let pool = setup_test_db().await;
        let service = EmployeeService::new(pool.clone());
        let (dealer_a, principal_a) = seed_dealer(&pool).await;
        let (dealer_b, principal_b) = seed_dealer(&pool).await;
        let national_id = national_id_from(&unique_tag());

        let mut req = valid_new_employee();
        req.national_id = national_id.clone();
        service
            .create(&principal_a, dealer_a.id, req)
            .await
            .expect("first create should succeed");

        let mut req = valid_new_employee();
        req.first_name = "Anil".to_string();
        req.national_id = national_id;
        let err = service
            .create(&principal_b, dealer_b.id, req)
            .await
            .unwrap_err();
        match err {
            AppError::Conflict(message) => {
                assert!(message.contains(&dealer_a.company_name));
                assert!(message.contains("active"));
            }
            other => panic!("expected conflict, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_terminated_holder_frees_national_id() {
        let pool = setup_test_db().await;
        let service = EmployeeService::new(pool.clone());
        let search = SearchService::new(pool.clone());
        let (dealer_a, principal_a) = seed_dealer(&pool).await;
        let (dealer_b, principal_b) = seed_dealer(&pool).await;
        let national_id = national_id_from(&unique_tag());

        let mut req = valid_new_employee();
        req.national_id = national_id.clone();
        let employee = service
            .create(&principal_a, dealer_a.id, req)
            .await
            .expect("create should succeed");
        assert!(
            search
                .check_identity(&national_id)
                .await
                .unwrap()
                .is_some()
        );

        service
            .terminate(
                &principal_a,
                dealer_a.id,
                employee.id,
                Termination {
                    date: date!(2024 - 06 - 01),
                    reason: "Resigned".to_string(),
                },
            )
            .await
            .expect("terminate should succeed");
        assert!(
            search
                .check_identity(&national_id)
                .await
                .unwrap()
                .is_none()
        );

        let mut req = valid_new_employee();
        req.national_id = national_id;
        service
            .create(&principal_b, dealer_b.id, req)
            .await
            .expect("create should succeed once the holder is terminated");
    }

    #[tokio::test]
    async fn test_foreign_employee_is_forbidden_and_untouched() {
        let pool = setup_test_db().await;
        let service = EmployeeService::new(pool.clone());
        let (dealer_a, principal_a) = seed_dealer(&pool).await;
        let (dealer_b, principal_b) = seed_dealer(&pool).await;

        let mut req = valid_new_employee();
        req.national_id = national_id_from(&unique_tag());
        let employee = service
            .create(&principal_a, dealer_a.id, req)
            .await
            .expect("create should succeed");

        // An id owned by another dealer is a 403, never a 404
        let err = service.get_owned(dealer_b.id, employee.id).await.unwrap_err();
        assert!(matches!(err, AppError::Authorization(_)));

        let err = service
            .update(
                &principal_b,
                dealer_b.id,
                employee.id,
                EmployeeUpdate {
                    first_name: Some("Hijacked".to_string()),
                    last_name: None,
                    phone: None,
                    email: None,
                    position: None,
                    hire_date: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Authorization(_)));

        let err = service
            .terminate(
                &principal_b,
                dealer_b.id,
                employee.id,
                Termination {
                    date: date!(2024 - 06 - 01),
                    reason: "Hostile".to_string(),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Authorization(_)));

        // An unknown id is a 404
        let err = service.get_owned(dealer_b.id, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        // The failed attempts changed nothing
        let unchanged = service
            .get_owned(dealer_a.id, employee.id)
            .await
            .expect("owner can still read");
        assert_eq!(unchanged.first_name, "Priya");
        assert_eq!(unchanged.status, EmployeeStatus::Active);
    }

    #[tokio::test]
    async fn test_each_mutation_writes_one_audit_row() {
        let pool = setup_test_db().await;
        let service = EmployeeService::new(pool.clone());
        let (dealer, principal) = seed_dealer(&pool).await;
        assert_eq!(audit_rows_for(&pool, dealer.id).await, 0);

        let mut req = valid_new_employee();
        req.national_id = national_id_from(&unique_tag());
        let employee = service
            .create(&principal, dealer.id, req)
            .await
            .expect("create should succeed");
        assert_eq!(audit_rows_for(&pool, dealer.id).await, 1);

        service
            .update(
                &principal,
                dealer.id,
                employee.id,
                EmployeeUpdate {
                    first_name: None,
                    last_name: None,
                    phone: None,
                    email: None,
                    position: Some("Supervisor".to_string()),
                    hire_date: None,
                },
            )
            .await
            .expect("update should succeed");
        assert_eq!(audit_rows_for(&pool, dealer.id).await, 2);

        service
            .terminate(
                &principal,
                dealer.id,
                employee.id,
                Termination {
                    date: date!(2024 - 06 - 01),
                    reason: "Resigned".to_string(),
                },
            )
            .await
            .expect("terminate should succeed");
        assert_eq!(audit_rows_for(&pool, dealer.id).await, 3);
    }
}
