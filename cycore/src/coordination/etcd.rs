//! etcd v2 keys API client.

use std::time::Duration;

use async_trait::async_trait;
use cycore_shared::errors::{CycoreError, CycoreResult};
use reqwest::StatusCode;
use serde::Deserialize;

use super::KeyValueStore;
use crate::runtime::constants::timeouts;

/// etcd error code for "Key not found".
const ETCD_KEY_NOT_FOUND: u64 = 100;

#[derive(Debug, Deserialize)]
struct GetResponse {
    node: Node,
}

#[derive(Debug, Deserialize)]
struct Node {
    #[serde(default)]
    value: Option<String>,
    #[serde(default)]
    dir: bool,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    #[serde(rename = "errorCode")]
    error_code: u64,
    #[serde(default)]
    message: String,
}

/// Outcome of asking one endpoint.
enum Attempt {
    Found(Option<String>),
    Retry(String),
}

/// etcd client that walks its endpoint list until one answers.
pub struct EtcdStore {
    client: reqwest::Client,
    endpoints: Vec<String>,
}

impl EtcdStore {
    pub fn new(endpoints: Vec<String>) -> CycoreResult<Self> {
        Self::with_timeout(endpoints, Duration::from_secs(timeouts::ETCD_REQUEST_SECS))
    }

    pub fn with_timeout(endpoints: Vec<String>, timeout: Duration) -> CycoreResult<Self> {
        if endpoints.is_empty() {
            return Err(CycoreError::Store("no etcd endpoints configured".into()));
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CycoreError::Store(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { client, endpoints })
    }

    fn key_url(endpoint: &str, key: &str) -> String {
        let key = key.trim_start_matches('/');
        format!("{}/v2/keys/{}", endpoint.trim_end_matches('/'), key)
    }

    async fn get_from(&self, endpoint: &str, key: &str) -> CycoreResult<Attempt> {
        let url = Self::key_url(endpoint, key);

        let resp = match self.client.get(&url).send().await {
            Ok(resp) => resp,
            Err(e) => return Ok(Attempt::Retry(format!("{}: {}", url, e))),
        };

        let status = resp.status();
        let body = match resp.text().await {
            Ok(body) => body,
            Err(e) => return Ok(Attempt::Retry(format!("{}: {}", url, e))),
        };

        if status == StatusCode::OK {
            let parsed: GetResponse = serde_json::from_str(&body).map_err(|e| {
                CycoreError::Store(format!("malformed etcd response for {}: {}", key, e))
            })?;
            if parsed.node.dir {
                return Err(CycoreError::Store(format!("{} is a directory", key)));
            }
            return Ok(Attempt::Found(Some(parsed.node.value.unwrap_or_default())));
        }

        if status == StatusCode::NOT_FOUND
            && let Ok(err) = serde_json::from_str::<ErrorResponse>(&body)
            && err.error_code == ETCD_KEY_NOT_FOUND
        {
            tracing::debug!(key, message = %err.message, "etcd key not found");
            return Ok(Attempt::Found(None));
        }

        Ok(Attempt::Retry(format!("{} returned {}", url, status)))
    }
}

#[async_trait]
impl KeyValueStore for EtcdStore {
    async fn get(&self, key: &str) -> CycoreResult<Option<String>> {
        let mut last_error = String::new();

        for endpoint in &self.endpoints {
            match self.get_from(endpoint, key).await? {
                Attempt::Found(value) => return Ok(value),
                Attempt::Retry(reason) => {
                    tracing::warn!(endpoint = %endpoint, key, %reason, "etcd endpoint failed");
                    last_error = reason;
                }
            }
        }

        Err(CycoreError::Store(format!(
            "all {} etcd endpoints failed for {} (last: {})",
            self.endpoints.len(),
            key,
            last_error
        )))
    }
}
