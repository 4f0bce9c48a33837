use std::env;
use std::net::SocketAddr;

use tracing::info;

use crate::db::LocalStore;
use crate::error::AppError;
use crate::remote::RemoteConfig;
use crate::services::{Discipline, SyncStrategy};

/// Key under which a remote store configuration entered at runtime is kept.
pub const REMOTE_CONFIG_KEY: &str = "remote_config";

const DEFAULT_DATABASE_URL: &str = "sqlite://unitrack.db?mode=rwc";
const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    /// Remote store from the environment. A persisted record is only
    /// consulted when this is absent.
    pub remote: Option<RemoteConfig>,
    pub strategy: SyncStrategy,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string());

        let bind_addr = lookup("BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse::<SocketAddr>()
            .map_err(|e| AppError::BadRequest(format!("BIND_ADDR is invalid: {}", e)))?;

        let remote = match (non_empty(lookup("REMOTE_STORE_URL")), non_empty(lookup("REMOTE_STORE_KEY"))) {
            (Some(url), Some(api_key)) => Some(RemoteConfig { url, api_key }),
            (None, None) => None,
            (Some(_), None) => {
                return Err(AppError::BadRequest("REMOTE_STORE_KEY is not set".to_string()));
            }
            (None, Some(_)) => {
                return Err(AppError::BadRequest("REMOTE_STORE_URL is not set".to_string()));
            }
        };

        let discipline = match lookup("SYNC_DISCIPLINE") {
            Some(value) => Discipline::parse(&value)?,
            None => Discipline::default(),
        };
        let verify_writes = match lookup("VERIFY_WRITES") {
            Some(value) => parse_flag(&value)?,
            None => false,
        };

        Ok(Self {
            database_url,
            bind_addr,
            remote,
            strategy: SyncStrategy {
                discipline,
                verify_writes,
            },
        })
    }

    /// Remote store to use, if any: the environment wins over a record
    /// saved through the API.
    pub async fn resolve_remote(&self, local: &LocalStore) -> Result<Option<RemoteConfig>, AppError> {
        if let Some(remote) = &self.remote {
            info!("Using remote store from environment: {}", remote.url);
            return Ok(Some(remote.clone()));
        }

        let stored = local.read_record::<RemoteConfig>(REMOTE_CONFIG_KEY).await?;
        match &stored {
            Some(remote) => info!("Using saved remote store: {}", remote.url),
            None => info!("No remote store configured, running local-only"),
        }
        Ok(stored)
    }
}

/// Persists a remote store configuration for the next start.
pub async fn save_remote(local: &LocalStore, remote: &RemoteConfig) -> Result<(), AppError> {
    if remote.url.trim().is_empty() || remote.api_key.trim().is_empty() {
        return Err(AppError::BadRequest("Remote url and key are required".to_string()));
    }
    reqwest::Url::parse(remote.url.trim())
        .map_err(|e| AppError::BadRequest(format!("Invalid remote store url: {}", e)))?;

    local.write_record(REMOTE_CONFIG_KEY, remote).await
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn parse_flag(value: &str) -> Result<bool, AppError> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(AppError::BadRequest(format!("VERIFY_WRITES is invalid: {}", other))),
    }
}
