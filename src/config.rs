use anyhow::{Result, anyhow};
use std::env;

/// Application configuration sourced from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Port the HTTP listener binds to
    pub port: u16,
    /// Email address of the seeded admin user
    pub admin_email: String,
    /// Shared admin console password
    pub admin_password: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let port = env::var("PORT")
            .unwrap_or_else(|_| "3001".to_string())
            .parse::<u16>()
            .map_err(|_| anyhow!("PORT must be a valid port number"))?;
        let admin_email =
            env::var("ADMIN_EMAIL").unwrap_or_else(|_| "admin@unionregistry.com".to_string());
        let admin_password =
            env::var("ADMIN_PASSWORD").map_err(|_| anyhow!("ADMIN_PASSWORD must be set"))?;

        Ok(Self {
            port,
            admin_email,
            admin_password,
        })
    }
}
