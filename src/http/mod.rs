mod admin;
mod auth;
mod dealer;
mod extract;
mod search;

use axum::Router;
use axum::routing::{get, post, put};
use sqlx::PgPool;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::audit::AuditService;
use crate::auth::{AuthService, JwtConfig};
use crate::config::AppConfig;
use crate::customers::CustomerService;
use crate::dealers::DealerService;
use crate::employees::EmployeeService;
use crate::search::SearchService;

/// Shared handler state. Every service is a thin wrapper over the pool,
/// so cloning the state per request is cheap.
#[derive(Clone)]
pub struct AppState {
    pub auth: AuthService,
    pub audit: AuditService,
    pub dealers: DealerService,
    pub employees: EmployeeService,
    pub customers: CustomerService,
    pub search: SearchService,
}

impl AppState {
    pub fn new(pool: PgPool, jwt_config: JwtConfig, config: AppConfig) -> Self {
        Self {
            auth: AuthService::new(pool.clone(), jwt_config, config),
            audit: AuditService::new(pool.clone()),
            dealers: DealerService::new(pool.clone()),
            employees: EmployeeService::new(pool.clone()),
            customers: CustomerService::new(pool.clone()),
            search: SearchService::new(pool),
        }
    }
}

/// Build the full application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        // Authentication
        .route("/auth/admin-login", post(auth::admin_login))
        .route("/auth/dealer-login", post(auth::dealer_login))
        .route("/auth/forgot-password", post(auth::forgot_password))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/change-password", post(auth::change_password))
        .route("/auth/profile", put(auth::update_profile))
        // Admin console
        .route("/admin/dealers", get(admin::list_dealers).post(admin::create_dealer))
        .route("/admin/dealers/:id", put(admin::update_dealer).delete(admin::delete_dealer))
        .route("/admin/users/:id/reset-password", post(admin::reset_password))
        .route("/admin/audit-logs", get(admin::audit_logs))
        // Dealer console
        .route("/dealer/employees", get(dealer::list_employees).post(dealer::create_employee))
        .route("/dealer/employees/:id", put(dealer::update_employee))
        .route("/dealer/employees/:id/terminate", post(dealer::terminate_employee))
        .route("/dealer/customers", get(dealer::list_customers).post(dealer::create_customer))
        .route("/dealer/customers/:id", put(dealer::update_customer))
        .route("/dealer/audit-logs", get(dealer::audit_logs))
        // Cross-tenant identity search
        .route("/search", get(search::search_employees))
        .route("/employees/check-id", get(search::check_identity))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
