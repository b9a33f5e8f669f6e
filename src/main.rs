use anyhow::Result;
use dotenv::dotenv;
use sqlx::Connection;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod audit;
mod auth;
mod config;
mod customers;
mod db;
mod dealers;
mod employees;
mod error;
mod http;
mod model;
mod search;
mod validate;

use auth::JwtConfig;
use config::AppConfig;
use http::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize environment variables from .env file
    dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    info!("Starting union registry backend");

    // Run migrations over a dedicated admin connection
    info!("Running database migrations");
    let mut admin_conn = db::create_admin_connection().await?;
    sqlx::migrate!("./sql/migrations").run(&mut admin_conn).await?;
    info!("Migrations completed successfully");
    let _ = admin_conn.close().await;

    // Initialize the application database connection pool
    let pool = db::init_pool().await?;

    // Load configuration
    let config = AppConfig::from_env()?;
    let jwt_config = JwtConfig::from_env()?;
    info!("Configuration loaded");

    let state = AppState::new(pool, jwt_config, config.clone());

    // Ensure the admin user exists
    let admin_id = state.auth.seed_admin().await?;
    info!("Admin user ready: {}", admin_id);

    // Serve
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on {}", addr);

    axum::serve(listener, http::router(state)).await?;

    Ok(())
}
