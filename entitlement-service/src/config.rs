//! Service configuration.

use anyhow::Result;
use dotenvy::dotenv;
use secrecy::Secret;
use std::env;

#[derive(Debug, Clone)]
pub struct EntitlementConfig {
    pub common: service_core::config::Config,
    pub service_name: String,
    pub log_level: String,
    /// Span export is disabled when unset.
    pub otlp_endpoint: Option<String>,
    pub database: DatabaseConfig,
    pub webhook: WebhookConfig,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

#[derive(Debug, Clone)]
pub struct WebhookConfig {
    pub signing_secret: Secret<String>,
}

impl EntitlementConfig {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let common = service_core::config::Config::load()?;

        let db_url =
            env::var("ENTITLEMENT_DATABASE_URL").expect("ENTITLEMENT_DATABASE_URL must be set");
        let max_connections = env::var("ENTITLEMENT_DB_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()?;
        let min_connections = env::var("ENTITLEMENT_DB_MIN_CONNECTIONS")
            .unwrap_or_else(|_| "2".to_string())
            .parse()?;

        let signing_secret =
            env::var("ENTITLEMENT_WEBHOOK_SECRET").unwrap_or_else(|_| "dev-secret".to_string());

        let log_level = env::var("ENTITLEMENT_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        let otlp_endpoint = env::var("OTLP_EXPORTER_ENDPOINT").ok();

        Ok(Self {
            common,
            service_name: "entitlement-service".to_string(),
            log_level,
            otlp_endpoint,
            database: DatabaseConfig {
                url: db_url,
                max_connections,
                min_connections,
            },
            webhook: WebhookConfig {
                signing_secret: Secret::new(signing_secret),
            },
        })
    }
}
