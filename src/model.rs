use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Dealer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "dealer_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum DealerStatus {
    Active,
    Suspended,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "employee_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum EmployeeStatus {
    Active,
    Terminated,
}

impl EmployeeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmployeeStatus::Active => "active",
            EmployeeStatus::Terminated => "terminated",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "customer_kind", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum CustomerKind {
    Private,
    Government,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "customer_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum CustomerStatus {
    Active,
    Inactive,
}

/// Closed set of auditable actions. Every sensitive operation maps to
/// exactly one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "audit_action", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Login,
    ForgotPassword,
    ChangePassword,
    UpdateProfile,
    ResetPassword,
    CreateDealer,
    UpdateDealer,
    DeleteDealer,
    CreateEmployee,
    UpdateEmployee,
    TerminateEmployee,
    CreateCustomer,
    UpdateCustomer,
    SearchEmployees,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub role: Role,
    pub name: String,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub temp_password: bool,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Dealer {
    pub id: Uuid,
    pub user_id: Uuid,
    pub company_name: String,
    pub contact_name: String,
    pub contact_phone: String,
    pub contact_email: String,
    pub address: String,
    pub status: DealerStatus,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Employee {
    pub id: Uuid,
    pub dealer_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub email: String,
    pub national_id: String,
    pub position: String,
    pub hire_date: Date,
    pub status: EmployeeStatus,
    pub termination_date: Option<Date>,
    pub termination_reason: Option<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl Employee {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Customer {
    pub id: Uuid,
    pub dealer_id: Uuid,
    pub kind: CustomerKind,
    pub name_or_entity: String,
    pub contact_person: Option<String>,
    pub phone: String,
    pub email: String,
    pub official_id: String,
    pub address: String,
    pub status: CustomerStatus,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AuditLog {
    pub id: i64,
    pub actor_user_id: Uuid,
    pub actor_name: String,
    pub dealer_id: Option<Uuid>,
    pub action: AuditAction,
    pub details: String,
    pub created_at: OffsetDateTime,
}

/// A cross-tenant search hit: one employee annotated with the owning
/// dealer's identity. Termination detail is only present when the match
/// is a terminated employee.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SearchHit {
    pub id: Uuid,
    pub dealer_id: Uuid,
    pub employer_name: String,
    /// Canonical "first last" rendering, precomputed for clients.
    pub full_name: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub national_id: String,
    pub position: String,
    pub status: EmployeeStatus,
    pub hire_date: Date,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub termination_date: Option<Date>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub termination_reason: Option<String>,
}

/// The resolved identity attached to every authenticated request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Principal {
    pub user_id: Uuid,
    pub role: Role,
    pub dealer_id: Option<Uuid>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    fn active_hit() -> SearchHit {
        SearchHit {
            id: Uuid::new_v4(),
            dealer_id: Uuid::new_v4(),
            employer_name: "Acme Fuels".to_string(),
            full_name: "Priya Sharma".to_string(),
            first_name: "Priya".to_string(),
            last_name: "Sharma".to_string(),
            phone: "9876543210".to_string(),
            national_id: "123456789012".to_string(),
            position: "Attendant".to_string(),
            status: EmployeeStatus::Active,
            hire_date: date!(2023 - 04 - 01),
            termination_date: None,
            termination_reason: None,
        }
    }

    #[test]
    fn test_search_hit_carries_full_name() {
        let json = serde_json::to_value(active_hit()).unwrap();
        assert_eq!(json["full_name"], "Priya Sharma");
        assert_eq!(json["employer_name"], "Acme Fuels");
    }

    #[test]
    fn test_active_hit_omits_termination_detail() {
        let json = serde_json::to_value(active_hit()).unwrap();
        assert!(json.get("termination_date").is_none());
        assert!(json.get("termination_reason").is_none());
    }

    #[test]
    fn test_terminated_hit_includes_termination_detail() {
        let mut hit = active_hit();
        hit.status = EmployeeStatus::Terminated;
        hit.termination_date = Some(date!(2024 - 06 - 01));
        hit.termination_reason = Some("Resigned".to_string());
        let json = serde_json::to_value(hit).unwrap();
        assert_eq!(json["status"], "terminated");
        assert_eq!(json["termination_reason"], "Resigned");
    }
}
