use std::sync::Arc;

use anyhow::{Context, Result};
use compute::timezone::parse_timezone;
use config::{Config, Environment};
use sea_orm::Database;
use serde::Deserialize;
use tracing::{debug, info};

use crate::auth::SessionIdentityProvider;
use crate::schemas::AppState;

/// Runtime settings. Every field can be set through a `SALDO_`-prefixed environment
/// variable, e.g. `SALDO_DEFAULT_TIMEZONE=Europe/Prague`.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct AppConfig {
    pub database_url: String,
    pub bind_address: String,
    /// Zone for requests that send no `x-timezone` header
    pub default_timezone: String,
    pub request_timeout_secs: u64,
    /// Allowed CORS origin; any origin when unset
    pub cors_origin: Option<String>,
    /// Expose Prometheus metrics on `/metrics`
    pub metrics_enabled: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite://saldo.db?mode=rwc".to_string(),
            bind_address: "0.0.0.0:3000".to_string(),
            default_timezone: compute::DEFAULT_TIMEZONE.to_string(),
            request_timeout_secs: 30,
            cors_origin: None,
            metrics_enabled: false,
        }
    }
}

impl AppConfig {
    /// Reads `.env` (when present) and `SALDO_*` variables on top of the defaults.
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();
        let defaults = AppConfig::default();

        let config = Config::builder()
            .set_default("database_url", defaults.database_url)?
            .set_default("bind_address", defaults.bind_address)?
            .set_default("default_timezone", defaults.default_timezone)?
            .set_default("request_timeout_secs", defaults.request_timeout_secs as i64)?
            .set_default("metrics_enabled", defaults.metrics_enabled)?
            .add_source(Environment::with_prefix("SALDO").try_parsing(true))
            .build()
            .context("Failed to read configuration")?;

        let loaded: AppConfig = config
            .try_deserialize()
            .context("Invalid configuration")?;
        debug!("Loaded configuration: {:?}", loaded);
        Ok(loaded)
    }

    /// Applies command line overrides.
    pub fn with_overrides(mut self, database_url: Option<String>, bind_address: Option<String>) -> Self {
        if let Some(url) = database_url {
            self.database_url = url;
        }
        if let Some(address) = bind_address {
            self.bind_address = address;
        }
        self
    }
}

/// Connects to the database and assembles the shared handler state.
pub async fn initialize_app_state(config: AppConfig) -> Result<AppState> {
    let default_tz = parse_timezone(&config.default_timezone)
        .with_context(|| format!("Unknown default time zone {}", config.default_timezone))?;

    info!("Connecting to database: {}", config.database_url);
    let db = Database::connect(&config.database_url).await?;

    Ok(AppState {
        identity: Arc::new(SessionIdentityProvider::new(db.clone())),
        db,
        default_tz,
        config: Arc::new(config),
    })
}
