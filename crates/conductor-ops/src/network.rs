//! Networks of sequencers and the registry that holds them

use crate::error::{OpsError, Result};
use crate::rpc::RpcClient;
use crate::sequencer::Sequencer;
use std::collections::BTreeMap;

/// Outcome of leader discovery across a network's snapshots
#[derive(Debug)]
pub enum LeaderLookup<'a> {
    /// No conductor reports leadership
    None,
    Found(&'a Sequencer),
    /// More than one conductor reports leadership
    SplitBrain(Vec<&'a Sequencer>),
}

impl<'a> LeaderLookup<'a> {
    /// The leader, when exactly one exists
    pub fn leader(&self) -> Option<&'a Sequencer> {
        match self {
            LeaderLookup::Found(sequencer) => Some(sequencer),
            _ => None,
        }
    }
}

/// One named deployment
#[derive(Debug, Clone)]
pub struct Network {
    pub name: String,
    /// Configuration order
    pub sequencers: Vec<Sequencer>,
}

impl Network {
    pub fn new(name: &str, sequencers: Vec<Sequencer>) -> Self {
        Self {
            name: name.to_string(),
            sequencers,
        }
    }

    /// Refresh every snapshot, one after another.
    ///
    /// A sequencer that cannot be reached only affects its own snapshot.
    pub async fn update(&mut self, client: &RpcClient) {
        tracing::info!("Refreshing {} sequencers in {}", self.sequencers.len(), self.name);
        for sequencer in &mut self.sequencers {
            sequencer.update(client).await;
        }
    }

    pub fn get_sequencer_by_id(&self, sequencer_id: &str) -> Option<&Sequencer> {
        self.sequencers
            .iter()
            .find(|sequencer| sequencer.sequencer_id == sequencer_id)
    }

    /// Like [`Network::get_sequencer_by_id`], as a precondition error
    pub fn sequencer(&self, sequencer_id: &str) -> Result<&Sequencer> {
        self.get_sequencer_by_id(sequencer_id)
            .ok_or_else(|| OpsError::SequencerNotFound {
                network: self.name.clone(),
                sequencer_id: sequencer_id.to_string(),
            })
    }

    /// Snapshots whose conductor last reported itself as leader.
    ///
    /// An unknown leader flag never counts as leadership.
    pub fn find_conductor_leader(&self) -> LeaderLookup<'_> {
        let mut leaders: Vec<&Sequencer> = self
            .sequencers
            .iter()
            .filter(|sequencer| sequencer.conductor_leader.is_true())
            .collect();

        match leaders.len() {
            0 => LeaderLookup::None,
            1 => LeaderLookup::Found(leaders.remove(0)),
            _ => LeaderLookup::SplitBrain(leaders),
        }
    }

    /// The single leader, failing closed on none or several
    pub fn leader(&self) -> Result<&Sequencer> {
        match self.find_conductor_leader() {
            LeaderLookup::Found(leader) => Ok(leader),
            LeaderLookup::None => Err(OpsError::NoLeader(self.name.clone())),
            LeaderLookup::SplitBrain(leaders) => Err(OpsError::SplitBrain {
                network: self.name.clone(),
                leaders: leaders.iter().map(|s| s.sequencer_id.clone()).collect(),
            }),
        }
    }
}

/// Every configured network, keyed by name.
///
/// Built once at startup and handed to each command.
#[derive(Debug, Clone, Default)]
pub struct NetworkRegistry {
    networks: BTreeMap<String, Network>,
}

impl NetworkRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, network: Network) {
        self.networks.insert(network.name.clone(), network);
    }

    pub fn names(&self) -> Vec<String> {
        self.networks.keys().cloned().collect()
    }

    pub fn get(&self, name: &str) -> Option<&Network> {
        self.networks.get(name)
    }

    pub fn network_mut(&mut self, name: &str) -> Result<&mut Network> {
        let known = if self.networks.contains_key(name) {
            Vec::new()
        } else {
            self.names()
        };
        self.networks
            .get_mut(name)
            .ok_or_else(|| OpsError::NetworkNotFound {
                name: name.to_string(),
                known,
            })
    }

    /// Look up a network and refresh its live state
    pub async fn refreshed(&mut self, name: &str, client: &RpcClient) -> Result<&Network> {
        let network = self.network_mut(name)?;
        network.update(client).await;
        Ok(network)
    }

    pub fn len(&self) -> usize {
        self.networks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.networks.is_empty()
    }
}
