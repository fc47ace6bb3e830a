//! Typed conductor and sequencer RPC methods
//!
//! One async fn per consumed method; each knows its parameter order and the
//! shape of its result.

use crate::error::RpcError;
use crate::rpc::RpcClient;
use crate::types::{ClusterMembership, SyncStatus, UnsafeHead};
use serde::de::IgnoredAny;
use serde_json::json;

/// Membership-change version meaning "do not check the configuration index"
pub const ANY_MEMBERSHIP_VERSION: u64 = 0;

// ============ Method Names ============

pub mod names {
    pub const CONDUCTOR_ACTIVE: &str = "conductor_active";
    pub const CONDUCTOR_LEADER: &str = "conductor_leader";
    pub const CONDUCTOR_SEQUENCER_HEALTHY: &str = "conductor_sequencerHealthy";
    pub const CONDUCTOR_CLUSTER_MEMBERSHIP: &str = "conductor_clusterMembership";
    pub const CONDUCTOR_TRANSFER_LEADER_TO_SERVER: &str = "conductor_transferLeaderToServer";
    pub const CONDUCTOR_PAUSE: &str = "conductor_pause";
    pub const CONDUCTOR_RESUME: &str = "conductor_resume";
    pub const CONDUCTOR_OVERRIDE_LEADER: &str = "conductor_overrideLeader";
    pub const CONDUCTOR_ADD_SERVER_AS_VOTER: &str = "conductor_addServerAsVoter";
    pub const CONDUCTOR_ADD_SERVER_AS_NONVOTER: &str = "conductor_addServerAsNonvoter";
    pub const CONDUCTOR_REMOVE_SERVER: &str = "conductor_removeServer";

    pub const ADMIN_SEQUENCER_ACTIVE: &str = "admin_sequencerActive";
    pub const ADMIN_OVERRIDE_LEADER: &str = "admin_overrideLeader";
    pub const OPTIMISM_SYNC_STATUS: &str = "optimism_syncStatus";
}

// ============ Conductor ============

/// Control-plane endpoint of one conductor
pub struct ConductorEndpoint<'a> {
    client: &'a RpcClient,
    url: &'a str,
}

impl<'a> ConductorEndpoint<'a> {
    pub fn new(client: &'a RpcClient, url: &'a str) -> Self {
        Self { client, url }
    }

    pub fn url(&self) -> &str {
        self.url
    }

    /// Whether the conductor is running (not paused)
    pub async fn active(&self) -> Result<bool, RpcError> {
        self.client.call(self.url, names::CONDUCTOR_ACTIVE, vec![]).await
    }

    /// Whether this conductor believes it is the Raft leader
    pub async fn leader(&self) -> Result<bool, RpcError> {
        self.client.call(self.url, names::CONDUCTOR_LEADER, vec![]).await
    }

    /// Conductor's view of its sequencer's health
    pub async fn sequencer_healthy(&self) -> Result<bool, RpcError> {
        self.client
            .call(self.url, names::CONDUCTOR_SEQUENCER_HEALTHY, vec![])
            .await
    }

    /// Membership listing; only meaningful on the leader
    pub async fn cluster_membership(&self) -> Result<ClusterMembership, RpcError> {
        self.client
            .call(self.url, names::CONDUCTOR_CLUSTER_MEMBERSHIP, vec![])
            .await
    }

    /// Hand leadership to `id`; must be sent to the incumbent leader
    pub async fn transfer_leader_to_server(&self, id: &str, raft_addr: &str) -> Result<(), RpcError> {
        self.ack(
            names::CONDUCTOR_TRANSFER_LEADER_TO_SERVER,
            vec![json!(id), json!(raft_addr)],
        )
        .await
    }

    pub async fn pause(&self) -> Result<(), RpcError> {
        self.ack(names::CONDUCTOR_PAUSE, vec![]).await
    }

    pub async fn resume(&self) -> Result<(), RpcError> {
        self.ack(names::CONDUCTOR_RESUME, vec![]).await
    }

    /// Force this conductor to report itself as leader, bypassing consensus
    pub async fn override_leader(&self) -> Result<(), RpcError> {
        self.ack(names::CONDUCTOR_OVERRIDE_LEADER, vec![]).await
    }

    pub async fn add_server_as_voter(
        &self,
        id: &str,
        raft_addr: &str,
        version: u64,
    ) -> Result<(), RpcError> {
        self.ack(
            names::CONDUCTOR_ADD_SERVER_AS_VOTER,
            vec![json!(id), json!(raft_addr), json!(version)],
        )
        .await
    }

    pub async fn add_server_as_nonvoter(
        &self,
        id: &str,
        raft_addr: &str,
        version: u64,
    ) -> Result<(), RpcError> {
        self.ack(
            names::CONDUCTOR_ADD_SERVER_AS_NONVOTER,
            vec![json!(id), json!(raft_addr), json!(version)],
        )
        .await
    }

    pub async fn remove_server(&self, id: &str, version: u64) -> Result<(), RpcError> {
        self.ack(names::CONDUCTOR_REMOVE_SERVER, vec![json!(id), json!(version)])
            .await
    }

    async fn ack(&self, method: &str, params: Vec<serde_json::Value>) -> Result<(), RpcError> {
        self.client
            .call::<IgnoredAny>(self.url, method, params)
            .await
            .map(|_| ())
    }
}

// ============ Sequencer Node ============

/// RPC endpoint of one sequencer node
pub struct NodeEndpoint<'a> {
    client: &'a RpcClient,
    url: &'a str,
}

impl<'a> NodeEndpoint<'a> {
    pub fn new(client: &'a RpcClient, url: &'a str) -> Self {
        Self { client, url }
    }

    /// Whether the node is actively sequencing
    pub async fn sequencer_active(&self) -> Result<bool, RpcError> {
        self.client
            .call(self.url, names::ADMIN_SEQUENCER_ACTIVE, vec![])
            .await
    }

    /// Latest unsafe L2 block
    pub async fn unsafe_head(&self) -> Result<UnsafeHead, RpcError> {
        let status: SyncStatus = self
            .client
            .call(self.url, names::OPTIMISM_SYNC_STATUS, vec![])
            .await?;
        Ok(status.unsafe_l2)
    }

    /// Force the node to trust itself as leader
    pub async fn override_leader(&self) -> Result<(), RpcError> {
        self.client
            .call::<IgnoredAny>(self.url, names::ADMIN_OVERRIDE_LEADER, vec![])
            .await
            .map(|_| ())
    }
}
