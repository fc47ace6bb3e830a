//! Network status - live snapshots plus membership warnings, ready for display

use crate::error::RpcError;
use crate::network::{LeaderLookup, Network};
use crate::reconcile::{diagnose, Discrepancy};
use crate::rpc::RpcClient;
use crate::sequencer::Sequencer;
use crate::types::ClusterMember;
use std::fmt;

/// Operator-visible condition that does not fail the status command
#[derive(Debug, Clone)]
pub enum StatusWarning {
    NoLeader,
    SplitBrain(Vec<String>),
    /// Conductors whose leader flag could not be read; a split-brain may be hidden
    LeadershipUnobserved(Vec<String>),
    /// Leader found but its membership listing could not be fetched
    MembershipUnavailable(RpcError),
    Membership {
        sequencer_id: String,
        discrepancy: Discrepancy,
    },
    UnknownMember(ClusterMember),
}

impl StatusWarning {
    /// Errors as opposed to plain warnings
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            StatusWarning::SplitBrain(_)
                | StatusWarning::Membership {
                    discrepancy: Discrepancy::VotingMismatch { .. },
                    ..
                }
        )
    }
}

impl fmt::Display for StatusWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusWarning::NoLeader => f.write_str("could not find current leader"),
            StatusWarning::SplitBrain(leaders) => {
                write!(f, "multiple conductors claim leadership: {}", leaders.join(", "))
            }
            StatusWarning::LeadershipUnobserved(ids) => {
                write!(f, "leadership of {} could not be observed", ids.join(", "))
            }
            StatusWarning::MembershipUnavailable(e) => {
                write!(f, "could not fetch cluster membership: {}", e)
            }
            StatusWarning::Membership {
                sequencer_id,
                discrepancy,
            } => write!(f, "{} {}", sequencer_id, discrepancy),
            StatusWarning::UnknownMember(member) => write!(
                f,
                "cluster member {} ({}, {}) is not in the configuration",
                member.id, member.addr, member.suffrage
            ),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StatusReport {
    pub network: String,
    /// Refreshed snapshots in configuration order
    pub sequencers: Vec<Sequencer>,
    pub leader_id: Option<String>,
    pub warnings: Vec<StatusWarning>,
}

impl StatusReport {
    /// Whether `update-cluster-membership` would change anything
    pub fn recommends_reconciliation(&self) -> bool {
        self.warnings
            .iter()
            .any(|w| matches!(w, StatusWarning::Membership { .. }))
    }
}

/// Assemble status from an already refreshed network.
///
/// The only call made is the leader's membership listing; failures become
/// warnings rather than errors.
pub async fn build_status(network: &Network, client: &RpcClient) -> StatusReport {
    let mut warnings = Vec::new();

    let leader = match network.find_conductor_leader() {
        LeaderLookup::Found(leader) => Some(leader),
        LeaderLookup::None => {
            warnings.push(StatusWarning::NoLeader);
            None
        }
        LeaderLookup::SplitBrain(leaders) => {
            warnings.push(StatusWarning::SplitBrain(
                leaders.iter().map(|s| s.sequencer_id.clone()).collect(),
            ));
            None
        }
    };

    let unobserved: Vec<String> = network
        .sequencers
        .iter()
        .filter(|s| !s.conductor_leader.is_known())
        .map(|s| s.sequencer_id.clone())
        .collect();
    if !unobserved.is_empty() {
        warnings.push(StatusWarning::LeadershipUnobserved(unobserved));
    }

    if let Some(leader) = leader {
        match leader.conductor(client).cluster_membership().await {
            Ok(membership) => {
                let diagnosis = diagnose(network, &membership);
                for (sequencer_id, discrepancy) in diagnosis.discrepancies() {
                    warnings.push(StatusWarning::Membership {
                        sequencer_id: sequencer_id.to_string(),
                        discrepancy: discrepancy.clone(),
                    });
                }
                warnings.extend(
                    diagnosis
                        .unknown_members
                        .into_iter()
                        .map(StatusWarning::UnknownMember),
                );
            }
            Err(e) => {
                tracing::warn!("Membership listing from {} failed: {}", leader.sequencer_id, e);
                warnings.push(StatusWarning::MembershipUnavailable(e));
            }
        }
    }

    StatusReport {
        network: network.name.clone(),
        sequencers: network.sequencers.clone(),
        leader_id: leader.map(|l| l.sequencer_id.clone()),
        warnings,
    }
}
