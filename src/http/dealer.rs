use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use uuid::Uuid;

use super::AppState;
use super::extract::DealerPrincipal;
use crate::customers::{CustomerUpdate, NewCustomer};
use crate::employees::{EmployeeUpdate, NewEmployee, Termination};
use crate::error::AppError;
use crate::model::{AuditLog, Customer, Employee};

pub async fn list_employees(
    State(state): State<AppState>,
    dealer: DealerPrincipal,
) -> Result<Json<Vec<Employee>>, AppError> {
    let employees = state.employees.list(dealer.dealer_id).await?;
    Ok(Json(employees))
}

pub async fn create_employee(
    State(state): State<AppState>,
    dealer: DealerPrincipal,
    Json(req): Json<NewEmployee>,
) -> Result<(StatusCode, Json<Employee>), AppError> {
    let employee = state
        .employees
        .create(&dealer.principal, dealer.dealer_id, req)
        .await?;
    Ok((StatusCode::CREATED, Json(employee)))
}

pub async fn update_employee(
    State(state): State<AppState>,
    dealer: DealerPrincipal,
    Path(employee_id): Path<Uuid>,
    Json(req): Json<EmployeeUpdate>,
) -> Result<Json<Employee>, AppError> {
    let employee = state
        .employees
        .update(&dealer.principal, dealer.dealer_id, employee_id, req)
        .await?;
    Ok(Json(employee))
}

pub async fn terminate_employee(
    State(state): State<AppState>,
    dealer: DealerPrincipal,
    Path(employee_id): Path<Uuid>,
    Json(req): Json<Termination>,
) -> Result<Json<Employee>, AppError> {
    let employee = state
        .employees
        .terminate(&dealer.principal, dealer.dealer_id, employee_id, req)
        .await?;
    Ok(Json(employee))
}

pub async fn list_customers(
    State(state): State<AppState>,
    dealer: DealerPrincipal,
) -> Result<Json<Vec<Customer>>, AppError> {
    let customers = state.customers.list(dealer.dealer_id).await?;
    Ok(Json(customers))
}

pub async fn create_customer(
    State(state): State<AppState>,
    dealer: DealerPrincipal,
    Json(req): Json<NewCustomer>,
) -> Result<(StatusCode, Json<Customer>), AppError> {
    let customer = state
        .customers
        .create(&dealer.principal, dealer.dealer_id, req)
        .await?;
    Ok((StatusCode::CREATED, Json(customer)))
}

pub async fn update_customer(
    State(state): State<AppState>,
    dealer: DealerPrincipal,
    Path(customer_id): Path<Uuid>,
    Json(req): Json<CustomerUpdate>,
) -> Result<Json<Customer>, AppError> {
    let customer = state
        .customers
        .update(&dealer.principal, dealer.dealer_id, customer_id, req)
        .await?;
    Ok(Json(customer))
}

pub async fn audit_logs(
    State(state): State<AppState>,
    dealer: DealerPrincipal,
) -> Result<Json<Vec<AuditLog>>, AppError> {
    let logs = state.audit.list_for_dealer(dealer.dealer_id).await?;
    Ok(Json(logs))
}
