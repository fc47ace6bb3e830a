//! JSON-RPC client for conductor and sequencer endpoints
//!
//! Requests are plain JSON-RPC 2.0 envelopes POSTed to the endpoint URL. The
//! transport sits behind [`RpcTransport`] so the control logic can be driven
//! against an in-memory fake.

use crate::error::{ConfigError, RpcError, RpcErrorPayload};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Protocol version tag sent with every request
pub const JSONRPC_VERSION: &str = "2.0";

/// Default per-call timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// JSON-RPC request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub id: u64,
    pub method: String,
    #[serde(default)]
    pub params: Vec<Value>,
}

impl JsonRpcRequest {
    pub fn new(id: u64, method: &str, params: Vec<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            method: method.to_string(),
            params,
        }
    }
}

/// JSON-RPC response
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    #[serde(default)]
    pub jsonrpc: Option<String>,
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcErrorPayload>,
}

/// Why a request never produced a usable response envelope
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    #[error("{0}")]
    Unreachable(String),
    #[error("HTTP status {0}")]
    Status(u16),
    #[error("invalid response body: {0}")]
    Body(String),
}

impl TransportError {
    fn into_rpc_error(self, url: &str, method: &str) -> RpcError {
        match self {
            TransportError::Body(reason) => RpcError::Decode {
                url: url.to_string(),
                method: method.to_string(),
                reason,
            },
            other => RpcError::Transport {
                url: url.to_string(),
                method: method.to_string(),
                reason: other.to_string(),
            },
        }
    }
}

/// Delivers one request to one endpoint and returns the decoded envelope
#[async_trait]
pub trait RpcTransport: Send + Sync {
    async fn post(&self, url: &str, request: &JsonRpcRequest)
        -> Result<JsonRpcResponse, TransportError>;
}

/// HTTP transport settings
#[derive(Debug, Clone)]
pub struct HttpSettings {
    /// Per-call timeout
    pub timeout: Duration,
    /// PEM CA certificate trusted for https endpoints
    pub ca_cert: Option<PathBuf>,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            ca_cert: None,
        }
    }
}

/// reqwest-backed transport
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(settings: &HttpSettings) -> Result<Self, ConfigError> {
        let mut builder = reqwest::Client::builder().timeout(settings.timeout);

        if let Some(path) = &settings.ca_cert {
            let pem = std::fs::read(path).map_err(|e| ConfigError::Certificate {
                path: path.clone(),
                reason: e.to_string(),
            })?;
            let cert = reqwest::Certificate::from_pem(&pem).map_err(|e| ConfigError::Certificate {
                path: path.clone(),
                reason: e.to_string(),
            })?;
            builder = builder.add_root_certificate(cert);
            tracing::debug!("Trusting CA certificate {:?}", path);
        }

        let client = builder.build().map_err(|e| ConfigError::Certificate {
            path: settings.ca_cert.clone().unwrap_or_default(),
            reason: e.to_string(),
        })?;

        Ok(Self { client })
    }
}

#[async_trait]
impl RpcTransport for HttpTransport {
    async fn post(
        &self,
        url: &str,
        request: &JsonRpcRequest,
    ) -> Result<JsonRpcResponse, TransportError> {
        let response = self
            .client
            .post(url)
            .json(request)
            .send()
            .await
            .map_err(|e| TransportError::Unreachable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status(status.as_u16()));
        }

        response
            .json::<JsonRpcResponse>()
            .await
            .map_err(|e| TransportError::Body(e.to_string()))
    }
}

/// JSON-RPC client shared by every endpoint call in a run
#[derive(Clone)]
pub struct RpcClient {
    transport: Arc<dyn RpcTransport>,
    next_id: Arc<AtomicU64>,
}

impl RpcClient {
    pub fn new<T: RpcTransport + 'static>(transport: T) -> Self {
        Self::from_arc(Arc::new(transport))
    }

    pub fn from_arc(transport: Arc<dyn RpcTransport>) -> Self {
        Self {
            transport,
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Client over HTTP(S)
    pub fn http(settings: &HttpSettings) -> Result<Self, ConfigError> {
        Ok(Self::new(HttpTransport::new(settings)?))
    }

    /// Call `method` on `url` and decode its result as `T`.
    ///
    /// No retries: a failed call is returned to the caller as-is.
    pub async fn call<T: DeserializeOwned>(
        &self,
        url: &str,
        method: &str,
        params: Vec<Value>,
    ) -> Result<T, RpcError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = JsonRpcRequest::new(id, method, params);
        tracing::debug!("RPC {} -> {} (id {})", method, url, id);

        let response = self
            .transport
            .post(url, &request)
            .await
            .map_err(|e| e.into_rpc_error(url, method))?;

        if let Some(error) = response.error {
            return Err(RpcError::Logical {
                url: url.to_string(),
                method: method.to_string(),
                error,
            });
        }

        serde_json::from_value(response.result.unwrap_or(Value::Null)).map_err(|e| {
            RpcError::Decode {
                url: url.to_string(),
                method: method.to_string(),
                reason: e.to_string(),
            }
        })
    }
}
