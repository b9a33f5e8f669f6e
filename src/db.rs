use anyhow::Result;
use sqlx::{
    Connection, PgConnection, PgPool,
    postgres::{PgConnectOptions, PgPoolOptions},
};
use std::{env, str::FromStr};
use tracing::info;

/// Initialize the database connection pool for the application
pub async fn init_pool() -> Result<PgPool> {
    let database_url = env::var("DATABASE_URL")?;

    info!("Initializing application database connection pool");

    let options = PgConnectOptions::from_str(&database_url)?;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    info!("Application database connection pool initialized");
    Ok(pool)
}

/// Create a single privileged connection used only for running migrations
pub async fn create_admin_connection() -> Result<PgConnection> {
    // Fall back to the application URL when no separate admin URL is given
    let database_admin_url =
        env::var("DATABASE_ADMIN_URL").or_else(|_| env::var("DATABASE_URL"))?;

    info!("Creating admin database connection for migrations");

    let options = PgConnectOptions::from_str(&database_admin_url)?;

    let conn = PgConnection::connect_with(&options).await?;

    info!("Admin database connection established");
    Ok(conn)
}
