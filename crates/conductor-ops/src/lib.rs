//! Conductor Ops - control tool core for op-conductor sequencer fleets
//!
//! Architecture:
//! - Each sequencer runs beside a conductor; conductors elect one leader via Raft
//! - Snapshots of every pair are re-fetched on each run, nothing is persisted
//! - Membership changes and leadership handoff go through the current leader
//! - Pause/resume are per-node and go to each target's own conductor
//!
//! All remote calls are issued one at a time.

pub mod config;
pub mod control;
pub mod error;
pub mod leadership;
pub mod methods;
pub mod network;
pub mod reconcile;
pub mod rpc;
pub mod sequencer;
pub mod status;
pub mod types;

#[cfg(test)]
mod tests;

pub use config::{OpsConfig, DEFAULT_CONFIG_PATH};
pub use control::{pause, remove_server, resume, BulkReport, NodeAction, TargetOutcome};
pub use error::{ConfigError, OpsError, OverrideStage, RpcError, RpcErrorPayload};
pub use leadership::{override_leader, transfer_leader, TransferOutcome};
pub use network::{LeaderLookup, Network, NetworkRegistry};
pub use reconcile::{
    reconcile, ClusterAction, Discrepancy, Outcome, ReconcilePlan, ReconcileReport,
};
pub use rpc::{HttpSettings, RpcClient, RpcTransport};
pub use sequencer::Sequencer;
pub use status::{build_status, StatusReport, StatusWarning};
pub use types::*;
