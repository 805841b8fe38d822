//! Process configuration read from the environment.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Context;

use gymdesk_infra::StoreConfig;
use gymdesk_observability::LogFormat;

const DEV_JWT_SECRET: &str = "dev-secret";

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub bind_addr: SocketAddr,
    pub jwt_secret: String,
    pub store: StoreConfig,
    pub log_format: LogFormat,
}

impl ApiConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from any key lookup; blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let bind_addr = get("BIND_ADDR")
            .unwrap_or_else(|| "0.0.0.0:8080".to_string())
            .parse::<SocketAddr>()
            .context("BIND_ADDR must be a socket address like 0.0.0.0:8080")?;

        let jwt_secret = get("JWT_SECRET").unwrap_or_else(|| DEV_JWT_SECRET.to_string());

        let mut store = StoreConfig::default();
        store.database_url = get("DATABASE_URL");
        if let Some(raw) = get("DATABASE_MAX_CONNECTIONS") {
            store.max_connections = raw
                .parse()
                .context("DATABASE_MAX_CONNECTIONS must be a positive integer")?;
        }
        if let Some(raw) = get("DATABASE_ACQUIRE_TIMEOUT_SECS") {
            let secs: u64 = raw
                .parse()
                .context("DATABASE_ACQUIRE_TIMEOUT_SECS must be a whole number of seconds")?;
            store.acquire_timeout = Duration::from_secs(secs);
        }

        let log_format = match get("LOG_FORMAT") {
            Some(raw) => raw.parse::<LogFormat>().map_err(anyhow::Error::msg)?,
            None => LogFormat::default(),
        };

        Ok(Self {
            bind_addr,
            jwt_secret,
            store,
            log_format,
        })
    }

    /// `true` when no `JWT_SECRET` was configured.
    pub fn uses_dev_secret(&self) -> bool {
        self.jwt_secret == DEV_JWT_SECRET
    }
}
