//! Environment-driven configuration shared by the `server`, `worker`, and
//! `rickoverctl` binaries. A single `Config::from_env()` call fails fast with
//! a `Fatal`-kind error rather than letting a missing variable surface deep
//! inside a task.

use crate::error::StoreError;

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub worker_pool_size: u32,
    pub server_pool_size: u32,
    pub downstream_url: Option<String>,
    pub downstream_worker_auth: Option<String>,
    pub http_max_idle_conns: usize,
    pub allow_unencrypted_proxy_traffic: bool,
    pub port: u16,
    pub reap_interval_secs: u64,
    pub reap_older_than_secs: i64,
    pub max_initial_jitter_ms: u64,
    pub executor_timeout_secs: u64,
    pub shutdown_deadline_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self, StoreError> {
        dotenvy::dotenv().ok();

        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| StoreError::Fatal("DATABASE_URL is missing".into()))?;

        let worker_pool_size = env_u32("PG_WORKER_POOL_SIZE").unwrap_or(20);
        let server_pool_size = env_u32("PG_SERVER_POOL_SIZE").unwrap_or(10);

        let downstream_url = env_nonempty("DOWNSTREAM_URL");
        let downstream_worker_auth = env_nonempty("DOWNSTREAM_WORKER_AUTH");

        let http_max_idle_conns = env_u32("HTTP_MAX_IDLE_CONNS").unwrap_or(100) as usize;
        let allow_unencrypted_proxy_traffic =
            env_bool("ALLOW_UNENCRYPTED_PROXY_TRAFFIC").unwrap_or(false);
        let port = env_u32("PORT").unwrap_or(9090) as u16;

        let reap_interval_secs = env_u64("RICKOVER_REAP_INTERVAL_SECS").unwrap_or(60);
        let reap_older_than_secs = env_i64("RICKOVER_REAP_OLDER_THAN_SECS").unwrap_or(420);
        let max_initial_jitter_ms = env_u64("RICKOVER_MAX_INITIAL_JITTER_MS").unwrap_or(1000);
        let executor_timeout_secs = env_u64("RICKOVER_EXECUTOR_TIMEOUT_SECS").unwrap_or(300);
        let shutdown_deadline_secs = env_u64("RICKOVER_SHUTDOWN_DEADLINE_SECS").unwrap_or(10);

        Ok(Self {
            database_url,
            worker_pool_size,
            server_pool_size,
            downstream_url,
            downstream_worker_auth,
            http_max_idle_conns,
            allow_unencrypted_proxy_traffic,
            port,
            reap_interval_secs,
            reap_older_than_secs,
            max_initial_jitter_ms,
            executor_timeout_secs,
            shutdown_deadline_secs,
        })
    }

    /// Fails fast (`Fatal`) if the downstream URL required by the worker binary
    /// was not configured, or if it does not parse as a URL.
    pub fn require_downstream_url(&self) -> Result<&str, StoreError> {
        let url = self
            .downstream_url
            .as_deref()
            .ok_or_else(|| StoreError::Fatal("DOWNSTREAM_URL is missing".into()))?;

        url::Url::parse(url)
            .map_err(|e| StoreError::Fatal(format!("DOWNSTREAM_URL is not a valid URL: {e}")))?;

        Ok(url)
    }
}

fn env_nonempty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|s| !s.trim().is_empty())
}

fn env_bool(key: &str) -> Option<bool> {
    std::env::var(key)
        .ok()
        .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
}

fn env_u32(key: &str) -> Option<u32> {
    env_nonempty(key).and_then(|s| s.parse().ok())
}

fn env_u64(key: &str) -> Option<u64> {
    env_nonempty(key).and_then(|s| s.parse().ok())
}

fn env_i64(key: &str) -> Option<i64> {
    env_nonempty(key).and_then(|s| s.parse().ok())
}
