//! Per-node control operations: pause, resume, remove-server

use crate::error::{RpcError, Result};
use crate::methods::ANY_MEMBERSHIP_VERSION;
use crate::network::Network;
use crate::rpc::RpcClient;
use crate::sequencer::Sequencer;

/// Remove `sequencer_id` from the Raft cluster via the leader's conductor.
///
/// Shared by the `remove-server` command and membership reconciliation.
pub async fn remove_from_cluster(
    client: &RpcClient,
    leader: &Sequencer,
    sequencer_id: &str,
) -> Result<(), RpcError> {
    tracing::info!(
        "Removing {} from cluster via leader {}",
        sequencer_id,
        leader.sequencer_id
    );
    leader
        .conductor(client)
        .remove_server(sequencer_id, ANY_MEMBERSHIP_VERSION)
        .await
}

/// Remove a configured sequencer from the cluster
pub async fn remove_server(network: &Network, client: &RpcClient, sequencer_id: &str) -> Result<()> {
    network.sequencer(sequencer_id)?;
    let leader = network.leader()?;
    remove_from_cluster(client, leader, sequencer_id).await?;
    Ok(())
}

/// Conductor control action applied to individual nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeAction {
    Pause,
    Resume,
}

impl NodeAction {
    pub fn past_tense(self) -> &'static str {
        match self {
            NodeAction::Pause => "paused",
            NodeAction::Resume => "resumed",
        }
    }
}

impl std::fmt::Display for NodeAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NodeAction::Pause => f.write_str("pause"),
            NodeAction::Resume => f.write_str("resume"),
        }
    }
}

/// Result of one target in a bulk operation
#[derive(Debug, Clone)]
pub struct TargetOutcome {
    pub sequencer_id: String,
    pub result: Result<(), RpcError>,
}

/// Per-target results of a bulk pause/resume
#[derive(Debug, Clone)]
pub struct BulkReport {
    pub action: NodeAction,
    pub outcomes: Vec<TargetOutcome>,
}

impl BulkReport {
    pub fn has_failures(&self) -> bool {
        self.outcomes.iter().any(|o| o.result.is_err())
    }

    pub fn failed(&self) -> impl Iterator<Item = &TargetOutcome> {
        self.outcomes.iter().filter(|o| o.result.is_err())
    }
}

/// Pause or resume conductors: every sequencer in the network, or only
/// `target` when given.
///
/// Each target is contacted on its own conductor, in order, and every target
/// is attempted even after a failure.
pub async fn apply_node_action(
    network: &Network,
    client: &RpcClient,
    action: NodeAction,
    target: Option<&str>,
) -> Result<BulkReport> {
    let targets: Vec<&Sequencer> = match target {
        Some(sequencer_id) => vec![network.sequencer(sequencer_id)?],
        None => network.sequencers.iter().collect(),
    };

    let mut outcomes = Vec::with_capacity(targets.len());
    for sequencer in targets {
        let conductor = sequencer.conductor(client);
        let result = match action {
            NodeAction::Pause => conductor.pause().await,
            NodeAction::Resume => conductor.resume().await,
        };
        match &result {
            Ok(()) => tracing::info!("{} conductor {}", action.past_tense(), sequencer.sequencer_id),
            Err(e) => tracing::warn!("Failed to {} {}: {}", action, sequencer.sequencer_id, e),
        }
        outcomes.push(TargetOutcome {
            sequencer_id: sequencer.sequencer_id.clone(),
            result,
        });
    }

    Ok(BulkReport { action, outcomes })
}

pub async fn pause(network: &Network, client: &RpcClient, target: Option<&str>) -> Result<BulkReport> {
    apply_node_action(network, client, NodeAction::Pause, target).await
}

pub async fn resume(network: &Network, client: &RpcClient, target: Option<&str>) -> Result<BulkReport> {
    apply_node_action(network, client, NodeAction::Resume, target).await
}
