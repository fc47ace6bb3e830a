//! Sequencer state snapshot - one sequencer/conductor pair at a point in time

use crate::error::RpcError;
use crate::methods::{ConductorEndpoint, NodeEndpoint};
use crate::rpc::RpcClient;
use crate::types::{LiveFlag, UnsafeHead};

/// A sequencer and its conductor.
///
/// Identity and `voting` come from configuration. Everything else is live and
/// only as fresh as the last [`Sequencer::update`].
#[derive(Debug, Clone)]
pub struct Sequencer {
    pub sequencer_id: String,
    pub conductor_rpc_url: String,
    pub node_rpc_url: String,
    /// Address of this node inside the Raft cluster
    pub raft_addr: String,
    /// Declared role: voter when true
    pub voting: bool,

    pub conductor_active: LiveFlag,
    pub sequencer_healthy: LiveFlag,
    pub conductor_leader: LiveFlag,
    pub sequencer_active: LiveFlag,
    pub unsafe_l2: Option<UnsafeHead>,

    /// Errors from the last refresh, one per failed fetch
    pub fetch_errors: Vec<RpcError>,
}

impl Sequencer {
    /// Create an unrefreshed snapshot
    pub fn new(
        sequencer_id: &str,
        conductor_rpc_url: &str,
        node_rpc_url: &str,
        raft_addr: &str,
        voting: bool,
    ) -> Self {
        Self {
            sequencer_id: sequencer_id.to_string(),
            conductor_rpc_url: conductor_rpc_url.to_string(),
            node_rpc_url: node_rpc_url.to_string(),
            raft_addr: raft_addr.to_string(),
            voting,
            conductor_active: LiveFlag::Unknown,
            sequencer_healthy: LiveFlag::Unknown,
            conductor_leader: LiveFlag::Unknown,
            sequencer_active: LiveFlag::Unknown,
            unsafe_l2: None,
            fetch_errors: Vec::new(),
        }
    }

    pub fn conductor<'a>(&'a self, client: &'a RpcClient) -> ConductorEndpoint<'a> {
        ConductorEndpoint::new(client, &self.conductor_rpc_url)
    }

    pub fn node<'a>(&'a self, client: &'a RpcClient) -> NodeEndpoint<'a> {
        NodeEndpoint::new(client, &self.node_rpc_url)
    }

    /// Re-fetch every live field.
    ///
    /// Each fetch is independent: a failure leaves its own field unknown and
    /// is recorded in `fetch_errors`; the other fields are still refreshed.
    pub async fn update(&mut self, client: &RpcClient) {
        let mut errors = Vec::new();

        let (active, leader, healthy) = {
            let conductor = self.conductor(client);
            (
                conductor.active().await,
                conductor.leader().await,
                conductor.sequencer_healthy().await,
            )
        };
        let (sequencer_active, unsafe_head) = {
            let node = self.node(client);
            (node.sequencer_active().await, node.unsafe_head().await)
        };

        self.conductor_active = flag(active, &mut errors);
        self.conductor_leader = flag(leader, &mut errors);
        self.sequencer_healthy = flag(healthy, &mut errors);
        self.sequencer_active = flag(sequencer_active, &mut errors);
        self.unsafe_l2 = match unsafe_head {
            Ok(head) => Some(head),
            Err(e) => {
                errors.push(e);
                None
            }
        };

        for error in &errors {
            tracing::warn!("Refresh of {} incomplete: {}", self.sequencer_id, error);
        }
        self.fetch_errors = errors;
    }

    /// Whether the last refresh filled in every live field
    pub fn is_fully_observed(&self) -> bool {
        self.fetch_errors.is_empty()
    }
}

fn flag(result: Result<bool, RpcError>, errors: &mut Vec<RpcError>) -> LiveFlag {
    match result {
        Ok(value) => LiveFlag::from(value),
        Err(e) => {
            errors.push(e);
            LiveFlag::Unknown
        }
    }
}
