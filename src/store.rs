//! Key-value store seam.
//!
//! The server treats persistence as an external collaborator exposing two
//! primitive operations: `get(key)` and `put(key, value)`. Each operation is
//! atomic per call, but a read-then-write pair is not: concurrent writers to
//! the same collection can race and one writer's update can be lost. This is
//! accepted here; the store keys hold whole collections, not records.
//!
//! Two implementations are provided:
//!
//! - [`HttpKvStore`] - talks to a key-value service over HTTP
//!   (`GET /{key}`, `PUT /{key}`), with a request timeout and optional
//!   bearer authentication.
//! - [`MemoryStore`] - an in-process map, used in tests and as the volatile
//!   development fallback when no store URL is configured.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::debug;

/// Default timeout for store requests.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Errors that can occur when talking to the key-value store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The request to the store timed out.
    #[error("store request timed out after {0:?}")]
    Timeout(Duration),

    /// The store is unreachable.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The store returned an unexpected response.
    #[error("unexpected store response: {0}")]
    InvalidResponse(String),

    /// A stored value could not be parsed as the expected collection shape.
    #[error("corrupt stored value for '{key}': {message}")]
    Data {
        /// The store key holding the corrupt value.
        key: String,
        /// Description of the parse failure.
        message: String,
    },

    /// Client configuration error.
    #[error("store client configuration error: {0}")]
    Configuration(String),
}

/// Primitive get/put interface over the external key-value store.
///
/// Implementations must be shareable across request handlers; the server
/// holds one behind an `Arc<dyn KvStore>`.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Fetches the raw value stored under `key`, or `None` if absent.
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Stores `value` under `key`, replacing any previous value.
    async fn put(&self, key: &str, value: String) -> Result<(), StoreError>;
}

/// Reads a whole collection from the store.
///
/// An absent key reads as an empty collection. A present value that does not
/// parse as a JSON array of `T` is reported as [`StoreError::Data`].
pub async fn load_collection<T: DeserializeOwned>(
    store: &dyn KvStore,
    key: &str,
) -> Result<Vec<T>, StoreError> {
    match store.get(key).await? {
        Some(raw) => serde_json::from_str(&raw).map_err(|e| StoreError::Data {
            key: key.to_string(),
            message: e.to_string(),
        }),
        None => Ok(Vec::new()),
    }
}

/// Writes a whole collection back to the store.
pub async fn save_collection<T: Serialize>(
    store: &dyn KvStore,
    key: &str,
    collection: &[T],
) -> Result<(), StoreError> {
    let raw = serde_json::to_string(collection).map_err(|e| StoreError::Data {
        key: key.to_string(),
        message: e.to_string(),
    })?;
    store.put(key, raw).await
}

/// HTTP-backed key-value store client.
///
/// Maps the primitive operations onto `GET {base_url}/{key}` (404 means
/// absent) and `PUT {base_url}/{key}` with the raw value as the request body.
#[derive(Debug, Clone)]
pub struct HttpKvStore {
    http_client: Client,
    base_url: String,
    auth_token: Option<String>,
}

impl HttpKvStore {
    /// Creates a new HTTP store client.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Configuration`] if the HTTP client cannot be
    /// created.
    pub fn new(
        base_url: impl Into<String>,
        auth_token: Option<String>,
    ) -> Result<Self, StoreError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();

        let http_client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| {
                StoreError::Configuration(format!("failed to create HTTP client: {e}"))
            })?;

        Ok(Self {
            http_client,
            base_url,
            auth_token,
        })
    }

    /// Returns the base URL of the store service.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn key_url(&self, key: &str) -> String {
        format!("{}/{key}", self.base_url)
    }

    fn map_transport_error(err: reqwest::Error) -> StoreError {
        if err.is_timeout() {
            StoreError::Timeout(REQUEST_TIMEOUT)
        } else if err.is_connect() {
            StoreError::Unavailable(format!("connection failed: {err}"))
        } else {
            StoreError::Unavailable(format!("request failed: {err}"))
        }
    }
}

#[async_trait]
impl KvStore for HttpKvStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let url = self.key_url(key);
        debug!(key = %key, "Fetching value from store");

        let mut request = self.http_client.get(&url);
        if let Some(token) = &self.auth_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(Self::map_transport_error)?;
        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::InvalidResponse(format!(
                "GET {key} returned {status}: {body}"
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| StoreError::InvalidResponse(format!("failed to read body: {e}")))?;

        Ok(Some(body))
    }

    async fn put(&self, key: &str, value: String) -> Result<(), StoreError> {
        let url = self.key_url(key);
        debug!(key = %key, bytes = value.len(), "Writing value to store");

        let mut request = self.http_client.put(&url).body(value);
        if let Some(token) = &self.auth_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(Self::map_transport_error)?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::InvalidResponse(format!(
                "PUT {key} returned {status}: {body}"
            )));
        }

        Ok(())
    }
}

/// In-process key-value store.
///
/// Volatile: contents are lost on restart. Used by the test suite and as the
/// development fallback when no store URL is configured.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    /// Creates an empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn put(&self, key: &str, value: String) -> Result<(), StoreError> {
        self.entries.write().await.insert(key.to_string(), value);
        Ok(())
    }
}
