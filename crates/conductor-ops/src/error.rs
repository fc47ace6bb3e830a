//! Conductor Ops Errors

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Error payload carried in a JSON-RPC response's `error` field.
///
/// Conductors answer with the structured JSON-RPC 2.0 object, but some proxies
/// in front of them reply with a bare string, so both are accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RpcErrorPayload {
    Object {
        code: i64,
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        data: Option<serde_json::Value>,
    },
    Message(String),
    Other(serde_json::Value),
}

impl fmt::Display for RpcErrorPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RpcErrorPayload::Object { code, message, .. } => write!(f, "{} (code {})", message, code),
            RpcErrorPayload::Message(message) => f.write_str(message),
            RpcErrorPayload::Other(value) => write!(f, "{}", value),
        }
    }
}

/// Failure of a single remote call
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RpcError {
    /// Call could not complete: connection failure, timeout or non-success HTTP status
    #[error("transport error calling {method} on {url}: {reason}")]
    Transport {
        url: String,
        method: String,
        reason: String,
    },

    /// Well-formed response carrying an error payload
    #[error("{method} on {url} returned an error: {error}")]
    Logical {
        url: String,
        method: String,
        error: RpcErrorPayload,
    },

    /// Result did not have the shape the method promises
    #[error("malformed {method} response from {url}: {reason}")]
    Decode {
        url: String,
        method: String,
        reason: String,
    },
}

impl RpcError {
    /// Name of the method whose call failed
    pub fn method(&self) -> &str {
        match self {
            RpcError::Transport { method, .. }
            | RpcError::Logical { method, .. }
            | RpcError::Decode { method, .. } => method,
        }
    }

    /// Whether the server answered with an explicit error payload
    pub fn is_logical(&self) -> bool {
        matches!(self, RpcError::Logical { .. })
    }
}

/// Configuration loading errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("network {network} references undefined sequencer {sequencer_id}")]
    UnknownSequencer {
        network: String,
        sequencer_id: String,
    },

    #[error("network {network} lists sequencer {sequencer_id} more than once")]
    DuplicateSequencer {
        network: String,
        sequencer_id: String,
    },

    #[error("network {0} has no sequencers")]
    EmptyNetwork(String),

    #[error("failed to load certificate {path:?}: {reason}")]
    Certificate { path: PathBuf, reason: String },
}

/// Which half of a leader override failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverrideStage {
    Conductor,
    Node,
}

impl fmt::Display for OverrideStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OverrideStage::Conductor => f.write_str("conductor"),
            OverrideStage::Node => f.write_str("sequencer"),
        }
    }
}

/// Operation errors surfaced to commands
#[derive(Error, Debug)]
pub enum OpsError {
    #[error(transparent)]
    Rpc(#[from] RpcError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("network {name} not found, must be one of: {}", known.join(", "))]
    NetworkNotFound { name: String, known: Vec<String> },

    #[error("sequencer ID {sequencer_id} not found in network {network}")]
    SequencerNotFound {
        network: String,
        sequencer_id: String,
    },

    #[error("sequencer {0} is not a voter")]
    NotVoter(String),

    #[error("target sequencer {0} is not healthy")]
    Unhealthy(String),

    #[error("health of target sequencer {0} is unknown")]
    HealthUnknown(String),

    #[error("could not find current leader in network {0}")]
    NoLeader(String),

    #[error("multiple conductors claim leadership in network {network}: {}", leaders.join(", "))]
    SplitBrain {
        network: String,
        leaders: Vec<String>,
    },

    #[error("failed to override {stage} leader status for {sequencer_id}: {source}")]
    OverrideFailed {
        sequencer_id: String,
        stage: OverrideStage,
        #[source]
        source: RpcError,
    },
}

impl OpsError {
    /// Whether the error was raised before any remote call was issued
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            OpsError::NetworkNotFound { .. }
                | OpsError::SequencerNotFound { .. }
                | OpsError::NotVoter(_)
                | OpsError::Unhealthy(_)
                | OpsError::HealthUnknown(_)
                | OpsError::NoLeader(_)
                | OpsError::SplitBrain { .. }
        )
    }
}

pub type Result<T, E = OpsError> = std::result::Result<T, E>;
