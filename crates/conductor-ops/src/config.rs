//! Ops Configuration
//!
//! TOML file declaring networks, their sequencers and each sequencer's
//! intended voting role.

use crate::error::ConfigError;
use crate::network::{Network, NetworkRegistry};
use crate::rpc::{HttpSettings, DEFAULT_TIMEOUT};
use crate::sequencer::Sequencer;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default config location
pub const DEFAULT_CONFIG_PATH: &str = "./config.toml";

/// Static description of one sequencer/conductor pair
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SequencerConfig {
    /// Raft address of the conductor
    pub raft_addr: String,
    /// Conductor control-plane RPC URL
    pub conductor_rpc_url: String,
    /// Sequencer node RPC URL
    pub node_rpc_url: String,
    /// Whether this sequencer should be a Raft voter
    pub voting: bool,
}

/// A named deployment, listing sequencer IDs in display order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub sequencers: Vec<String>,
}

/// Ops configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OpsConfig {
    /// CA certificate for https endpoints
    #[serde(default)]
    pub cert_path: Option<PathBuf>,
    /// Per-call RPC timeout in seconds
    #[serde(default)]
    pub rpc_timeout_secs: Option<u64>,
    #[serde(default)]
    pub networks: BTreeMap<String, NetworkConfig>,
    #[serde(default)]
    pub sequencers: BTreeMap<String, SequencerConfig>,
}

impl OpsConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::parse(&contents)?;
        tracing::debug!(
            "Loaded {} networks, {} sequencers from {:?}",
            config.networks.len(),
            config.sequencers.len(),
            path
        );
        Ok(config)
    }

    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        let config: OpsConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for (name, network) in &self.networks {
            if network.sequencers.is_empty() {
                return Err(ConfigError::EmptyNetwork(name.clone()));
            }
            let mut seen = HashSet::new();
            for sequencer_id in &network.sequencers {
                if !self.sequencers.contains_key(sequencer_id) {
                    return Err(ConfigError::UnknownSequencer {
                        network: name.clone(),
                        sequencer_id: sequencer_id.clone(),
                    });
                }
                if !seen.insert(sequencer_id.as_str()) {
                    return Err(ConfigError::DuplicateSequencer {
                        network: name.clone(),
                        sequencer_id: sequencer_id.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Unrefreshed networks for every configured deployment
    pub fn registry(&self) -> NetworkRegistry {
        let mut registry = NetworkRegistry::new();
        for (name, network) in &self.networks {
            let sequencers = network
                .sequencers
                .iter()
                .filter_map(|id| {
                    self.sequencers.get(id).map(|s| {
                        Sequencer::new(id, &s.conductor_rpc_url, &s.node_rpc_url, &s.raft_addr, s.voting)
                    })
                })
                .collect();
            registry.insert(Network::new(name, sequencers));
        }
        registry
    }

    /// HTTP settings, with command-line overrides taking precedence
    pub fn http_settings(&self, cert_override: Option<PathBuf>, timeout_override: Option<u64>) -> HttpSettings {
        HttpSettings {
            timeout: timeout_override
                .or(self.rpc_timeout_secs)
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_TIMEOUT),
            ca_cert: cert_override.or_else(|| self.cert_path.clone()),
        }
    }
}
