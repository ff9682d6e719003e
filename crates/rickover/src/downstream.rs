//! The client half of the downstream executor interface: a single POST to
//! the configured downstream service. Retry-on-503 and the wait-for-terminal
//! loop live in [`crate::executor::http`], which is the thing that actually
//! knows what "terminal" means; this module only knows how to make the one
//! HTTP call.

use std::time::Duration;

use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct DownstreamConfig {
    pub base_url: String,
    pub auth_user: String,
    pub auth_password: String,
    pub request_timeout: Duration,
}

impl Default for DownstreamConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            auth_user: "jobs".to_string(),
            auth_password: String::new(),
            request_timeout: Duration::from_millis(6500),
        }
    }
}

#[derive(Serialize)]
struct DispatchRequest<'a> {
    data: &'a serde_json::Value,
    attempts: i16,
}

pub enum DispatchResponse {
    /// 2xx: downstream accepted the job and will call back with a terminal
    /// status asynchronously.
    Accepted,
    /// 503: downstream is overloaded, caller should retry with backoff.
    Unavailable,
    /// Any other non-2xx status.
    Rejected(reqwest::StatusCode),
}

#[derive(Clone)]
pub struct DownstreamClient {
    client: reqwest::Client,
    config: DownstreamConfig,
}

impl DownstreamClient {
    pub fn new(config: DownstreamConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self { client, config })
    }

    fn url(&self, name: &str, id: Uuid) -> String {
        format!(
            "{}/v1/jobs/{name}/{id}",
            self.config.base_url.trim_end_matches('/')
        )
    }

    pub async fn dispatch(
        &self,
        name: &str,
        id: Uuid,
        data: &serde_json::Value,
        attempts: i16,
    ) -> Result<DispatchResponse, reqwest::Error> {
        let resp = self
            .client
            .post(self.url(name, id))
            .basic_auth(&self.config.auth_user, Some(&self.config.auth_password))
            .json(&DispatchRequest { data, attempts })
            .send()
            .await?;

        let status = resp.status();
        if status == reqwest::StatusCode::SERVICE_UNAVAILABLE {
            Ok(DispatchResponse::Unavailable)
        } else if status.is_success() {
            Ok(DispatchResponse::Accepted)
        } else {
            Ok(DispatchResponse::Rejected(status))
        }
    }
}
