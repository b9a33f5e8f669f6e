use serde::Deserialize;
use sqlx::PgPool;
use time::OffsetDateTime;
use tracing::info;
use uuid::Uuid;

use crate::audit::{AuditEntry, AuditService};
use crate::error::{AppError, FieldError};
use crate::model::{AuditAction, Customer, CustomerKind, CustomerStatus, Principal};
use crate::validate;

#[derive(Debug, Deserialize)]
pub struct NewCustomer {
    pub kind: CustomerKind,
    pub name_or_entity: String,
    pub contact_person: Option<String>,
    pub phone: String,
    pub email: String,
    pub official_id: String,
    pub address: String,
}

impl NewCustomer {
    pub fn validate(&self) -> Result<(), AppError> {
        let mut errors = Vec::new();
        validate::require(&mut errors, "name_or_entity", &self.name_or_entity);
        validate::phone(&mut errors, "phone", &self.phone);
        validate::email(&mut errors, "email", &self.email);
        validate::require(&mut errors, "official_id", &self.official_id);
        validate::require(&mut errors, "address", &self.address);
        // Government entities must name a contact person
        if self.kind == CustomerKind::Government
            && self
                .contact_person
                .as_deref()
                .is_none_or(|p| p.trim().is_empty())
        {
            errors.push(FieldError::new(
                "contact_person",
                "is required for government customers",
            ));
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(errors))
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CustomerUpdate {
    pub kind: Option<CustomerKind>,
    pub name_or_entity: Option<String>,
    pub contact_person: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub official_id: Option<String>,
    pub address: Option<String>,
    pub status: Option<CustomerStatus>,
}

impl CustomerUpdate {
    pub fn validate(&self) -> Result<(), AppError> {
        let mut errors = Vec::new();
        if self.kind.is_none()
            && self.name_or_entity.is_none()
            && self.contact_person.is_none()
            && self.phone.is_none()
            && self.email.is_none()
            && self.official_id.is_none()
            && self.address.is_none()
            && self.status.is_none()
        {
            errors.push(FieldError::new("body", "at least one field must be provided"));
        }
        if let Some(phone) = &self.phone {
            validate::phone(&mut errors, "phone", phone);
        }
        if let Some(email) = &self.email {
            validate::email(&mut errors, "email", email);
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(errors))
        }
    }
}

/// Tenant-scoped customer management. Purely tenant-local: no customer
/// data participates in cross-tenant search.
#[derive(Clone)]
pub struct CustomerService {
    db_pool: PgPool,
    audit: AuditService,
}

impl CustomerService {
    pub fn new(db_pool: PgPool) -> Self {
        let audit = AuditService::new(db_pool.clone());
        Self { db_pool, audit }
    }

    pub async fn list(&self, dealer_id: Uuid) -> Result<Vec<Customer>, AppError> {
        let customers = sqlx::query_as::<_, Customer>(
            "SELECT * FROM customer WHERE dealer_id = $1 ORDER BY name_or_entity",
        )
        .bind(dealer_id)
        .fetch_all(&self.db_pool)
        .await?;
        Ok(customers)
    }

    /// Load a customer and verify tenant ownership. An unknown id is a
    /// 404; an id owned by another dealer is a 403, never a 404.
    pub async fn get_owned(
        &self,
        dealer_id: Uuid,
        customer_id: Uuid,
    ) -> Result<Customer, AppError> {
        let customer = sqlx::query_as::<_, Customer>("SELECT * FROM customer WHERE id = $1")
            .bind(customer_id)
            .fetch_optional(&self.db_pool)
            .await?
            .ok_or(AppError::NotFound("customer"))?;

        if customer.dealer_id != dealer_id {
            return Err(AppError::authorization("Forbidden."));
        }

        Ok(customer)
    }

    pub async fn create(
        &self,
        actor: &Principal,
        dealer_id: Uuid,
        req: NewCustomer,
    ) -> Result<Customer, AppError> {
        req.validate()?;

        let actor_name = self.audit.actor_name(actor.user_id).await?;
        let company_name: String = sqlx::query_scalar("SELECT company_name FROM dealer WHERE id = $1")
            .bind(dealer_id)
            .fetch_one(&self.db_pool)
            .await?;
        let now = OffsetDateTime::now_utc();

        let mut tx = self.db_pool.begin().await?;

        let customer = sqlx::query_as::<_, Customer>(
            "INSERT INTO customer (dealer_id, kind, name_or_entity, contact_person, phone, email, official_id, address, status, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'active', $9, $9)
             RETURNING *",
        )
        .bind(dealer_id)
        .bind(req.kind)
        .bind(&req.name_or_entity)
        .bind(&req.contact_person)
        .bind(&req.phone)
        .bind(&req.email)
        .bind(&req.official_id)
        .bind(&req.address)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        AuditService::record_in(
            &mut tx,
            AuditEntry {
                actor_user_id: actor.user_id,
                actor_name,
                dealer_id: Some(dealer_id),
                action: AuditAction::CreateCustomer,
                details: format!(
                    "Created customer: {} at {}",
                    customer.name_or_entity, company_name
                ),
            },
        )
        .await?;

        tx.commit().await?;

        info!("Customer created: {}", customer.name_or_entity);
        Ok(customer)
    }

    pub async fn update(
        &self,
        actor: &Principal,
        dealer_id: Uuid,
        customer_id: Uuid,
        req: CustomerUpdate,
    ) -> Result<Customer, AppError> {
        req.validate()?;

        self.get_owned(dealer_id, customer_id).await?;

        let actor_name = self.audit.actor_name(actor.user_id).await?;

        let mut tx = self.db_pool.begin().await?;

        let updated = sqlx::query_as::<_, Customer>(
            "UPDATE customer SET
                kind = COALESCE($1, kind),
                name_or_entity = COALESCE($2, name_or_entity),
                contact_person = COALESCE($3, contact_person),
                phone = COALESCE($4, phone),
                email = COALESCE($5, email),
                official_id = COALESCE($6, official_id),
                address = COALESCE($7, address),
                status = COALESCE($8, status),
                updated_at = $9
             WHERE id = $10
             RETURNING *",
        )
        .bind(req.kind)
        .bind(&req.name_or_entity)
        .bind(&req.contact_person)
        .bind(&req.phone)
        .bind(&req.email)
        .bind(&req.official_id)
        .bind(&req.address)
        .bind(req.status)
        .bind(OffsetDateTime::now_utc())
        .bind(customer_id)
        .fetch_one(&mut *tx)
        .await?;

        AuditService::record_in(
            &mut tx,
            AuditEntry {
                actor_user_id: actor.user_id,
                actor_name,
                dealer_id: Some(dealer_id),
                action: AuditAction::UpdateCustomer,
                details: format!("Updated customer: {}", updated.name_or_entity),
            },
        )
        .await?;

        tx.commit().await?;

        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_new_customer(kind: CustomerKind) -> NewCustomer {
        NewCustomer {
            kind,
            name_or_entity: "State Transport Dept".to_string(),
            contact_person: None,
            phone: "9876543210".to_string(),
            email: "fleet@x.gov".to_string(),
            official_id: "GOV-4411".to_string(),
            address: "Secretariat Block C".to_string(),
        }
    }

    #[test]
    fn test_government_customer_needs_contact_person() {
        let customer = valid_new_customer(CustomerKind::Government);
        let err = customer.validate().unwrap_err();
        match err {
            AppError::Validation(errors) => {
                assert_eq!(errors[0].field, "contact_person");
            }
            other => panic!("expected validation error, got {other:?}"),
        }

        let mut customer = valid_new_customer(CustomerKind::Government);
        customer.contact_person = Some("A. Verma".to_string());
        assert!(customer.validate().is_ok());
    }

    #[test]
    fn test_private_customer_contact_person_optional() {
        assert!(valid_new_customer(CustomerKind::Private).validate().is_ok());
    }

    #[test]
    fn test_empty_customer_update_is_rejected() {
        let update = CustomerUpdate {
            kind: None,
            name_or_entity: None,
            contact_person: None,
            phone: None,
            email: None,
            official_id: None,
            address: None,
            status: None,
        };
        assert!(update.validate().is_err());
    }
}
