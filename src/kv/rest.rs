//! REST key-value backend.
//!
//! Every command is sent as `POST {url}` with a JSON array body such as
//! `["SET", "key", "value", "EX", "3600"]` and an
//! `Authorization: Bearer {token}` header. The service answers
//! `{"result": ...}` on success and `{"error": "..."}` on failure.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;

use super::{KvError, KvErrorKind, KvResult, KvStore};

/// Raw response envelope of the REST endpoint.
#[derive(Debug, Deserialize)]
struct CommandResponse {
    #[serde(default)]
    result: Value,
    #[serde(default)]
    error: Option<String>,
}

/// Key-value store reached over HTTPS.
#[derive(Clone)]
pub struct RestKvStore {
    client: Client,
    url: String,
    token: String,
}

impl std::fmt::Debug for RestKvStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestKvStore")
            .field("url", &self.url)
            .field("token", &"<redacted>")
            .finish_non_exhaustive()
    }
}

impl RestKvStore {
    /// Creates a client for the given endpoint.
    ///
    /// # Errors
    ///
    /// Returns a [`KvErrorKind::Connection`] error if the HTTP client cannot
    /// be built.
    pub fn new(url: impl Into<String>, token: impl Into<String>, timeout: Duration) -> KvResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| KvError::new(KvErrorKind::Connection, e.to_string()))?;

        Ok(Self {
            client,
            url: url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }

    /// Sends one command and returns its `result` value.
    async fn command(&self, args: &[&str]) -> KvResult<Value> {
        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.token)
            .json(args)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        match status.as_u16() {
            401 | 403 => return Err(KvError::new(KvErrorKind::Unauthorized, body)),
            429 => return Err(KvError::new(KvErrorKind::Unavailable, body)),
            s if s >= 500 => {
                return Err(KvError::new(
                    KvErrorKind::Unavailable,
                    format!("status {s}: {body}"),
                ));
            }
            _ => {}
        }

        let parsed: CommandResponse = serde_json::from_str(&body).map_err(KvError::serialization)?;
        if let Some(error) = parsed.error {
            return Err(KvError::new(KvErrorKind::Command, error));
        }
        Ok(parsed.result)
    }
}

fn as_count(value: &Value) -> KvResult<u64> {
    value
        .as_u64()
        .ok_or_else(|| KvError::serialization(format!("expected integer, got {value}")))
}

#[async_trait]
impl KvStore for RestKvStore {
    async fn get(&self, key: &str) -> KvResult<Option<String>> {
        match self.command(&["GET", key]).await? {
            Value::Null => Ok(None),
            Value::String(s) => Ok(Some(s)),
            other => Ok(Some(other.to_string())),
        }
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> KvResult<()> {
        let secs = ttl.as_secs().max(1).to_string();
        self.command(&["SET", key, value, "EX", &secs]).await?;
        Ok(())
    }

    async fn publish(&self, channel: &str, message: &str) -> KvResult<u64> {
        let result = self.command(&["PUBLISH", channel, message]).await?;
        as_count(&result)
    }

    async fn lpush(&self, key: &str, value: &str) -> KvResult<u64> {
        let result = self.command(&["LPUSH", key, value]).await?;
        as_count(&result)
    }

    async fn ltrim(&self, key: &str, start: i64, stop: i64) -> KvResult<()> {
        let (start, stop) = (start.to_string(), stop.to_string());
        self.command(&["LTRIM", key, &start, &stop]).await?;
        Ok(())
    }

    async fn lrange(&self, key: &str, start: i64, stop: i64) -> KvResult<Vec<String>> {
        let (start, stop) = (start.to_string(), stop.to_string());
        let result = self.command(&["LRANGE", key, &start, &stop]).await?;
        match result {
            Value::Null => Ok(Vec::new()),
            Value::Array(items) => Ok(items
                .into_iter()
                .map(|item| match item {
                    Value::String(s) => s,
                    other => other.to_string(),
                })
                .collect()),
            other => Err(KvError::serialization(format!("expected array, got {other}"))),
        }
    }
}
