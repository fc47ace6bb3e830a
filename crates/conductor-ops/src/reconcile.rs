//! Cluster membership reconciliation
//!
//! Compares each sequencer's declared voting role with the membership the
//! current leader reports, plans the corrective membership changes and drives
//! them through the leader's conductor.
//!
//! Execution is best-effort: every sequencer is attempted and its outcome
//! recorded, one failure never stops the rest, and nothing is retried.
//! A role change has no direct primitive in the consensus library, so it is a
//! remove followed by a re-add; the re-add is only sent once the remove has
//! been acknowledged.

use crate::control::remove_from_cluster;
use crate::error::{Result, RpcError};
use crate::methods::ANY_MEMBERSHIP_VERSION;
use crate::network::Network;
use crate::rpc::RpcClient;
use crate::sequencer::Sequencer;
use crate::types::{ClusterMember, ClusterMembership, Suffrage};
use std::fmt;

// ============ Diagnosis ============

/// How a declared sequencer differs from the live membership
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Discrepancy {
    /// Absent from the membership listing
    NotInCluster,
    /// Present with the wrong role
    VotingMismatch { expected: Suffrage, recorded: Suffrage },
}

impl fmt::Display for Discrepancy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Discrepancy::NotInCluster => f.write_str("is not in the cluster"),
            Discrepancy::VotingMismatch { expected, recorded } => write!(
                f,
                "does not have the correct voting status (expected {}, recorded {})",
                expected, recorded
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequencerDiagnosis {
    pub sequencer_id: String,
    /// `None` when consistent
    pub discrepancy: Option<Discrepancy>,
}

/// Comparison of a network's declared roles against live membership
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnosis {
    /// One entry per declared sequencer, in declaration order
    pub sequencers: Vec<SequencerDiagnosis>,
    /// Cluster members no configured sequencer accounts for
    pub unknown_members: Vec<ClusterMember>,
}

impl Diagnosis {
    /// Whether any declared sequencer needs a membership change
    pub fn needs_correction(&self) -> bool {
        self.discrepancies().next().is_some()
    }

    pub fn discrepancies(&self) -> impl Iterator<Item = (&str, &Discrepancy)> {
        self.sequencers.iter().filter_map(|d| {
            d.discrepancy
                .as_ref()
                .map(|discrepancy| (d.sequencer_id.as_str(), discrepancy))
        })
    }
}

/// Classify every declared sequencer against `membership`
pub fn diagnose(network: &Network, membership: &ClusterMembership) -> Diagnosis {
    let sequencers = network
        .sequencers
        .iter()
        .map(|sequencer| {
            let expected = Suffrage::for_voting(sequencer.voting);
            let discrepancy = match membership.get(&sequencer.sequencer_id) {
                None => Some(Discrepancy::NotInCluster),
                Some(member) if member.suffrage != expected => Some(Discrepancy::VotingMismatch {
                    expected,
                    recorded: member.suffrage,
                }),
                Some(_) => None,
            };
            SequencerDiagnosis {
                sequencer_id: sequencer.sequencer_id.clone(),
                discrepancy,
            }
        })
        .collect();

    let unknown_members = membership
        .servers
        .iter()
        .filter(|member| network.get_sequencer_by_id(&member.id).is_none())
        .cloned()
        .collect();

    Diagnosis {
        sequencers,
        unknown_members,
    }
}

// ============ Planning ============

/// A single membership change sent to the leader
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClusterAction {
    Remove,
    AddVoter,
    AddNonvoter,
}

impl ClusterAction {
    pub fn add_for(voting: bool) -> Self {
        if voting {
            ClusterAction::AddVoter
        } else {
            ClusterAction::AddNonvoter
        }
    }
}

impl fmt::Display for ClusterAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClusterAction::Remove => f.write_str("remove"),
            ClusterAction::AddVoter => f.write_str("add as voter"),
            ClusterAction::AddNonvoter => f.write_str("add as non-voter"),
        }
    }
}

/// Ordered membership changes for one sequencer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedCorrection {
    pub sequencer_id: String,
    pub raft_addr: String,
    pub discrepancy: Discrepancy,
    pub actions: Vec<ClusterAction>,
}

/// Turn a diagnosis into corrections, in declaration order
pub fn plan(network: &Network, diagnosis: &Diagnosis) -> Vec<PlannedCorrection> {
    diagnosis
        .discrepancies()
        .filter_map(|(sequencer_id, discrepancy)| {
            let sequencer = network.get_sequencer_by_id(sequencer_id)?;
            let add = ClusterAction::add_for(sequencer.voting);
            let actions = match discrepancy {
                Discrepancy::NotInCluster => vec![add],
                Discrepancy::VotingMismatch { .. } => vec![ClusterAction::Remove, add],
            };
            Some(PlannedCorrection {
                sequencer_id: sequencer.sequencer_id.clone(),
                raft_addr: sequencer.raft_addr.clone(),
                discrepancy: discrepancy.clone(),
                actions,
            })
        })
        .collect()
}

/// Everything needed to correct a network, computed before any change is sent
#[derive(Debug, Clone)]
pub struct ReconcilePlan {
    pub network: String,
    pub leader_id: String,
    pub membership: ClusterMembership,
    pub diagnosis: Diagnosis,
    pub corrections: Vec<PlannedCorrection>,
}

/// Find the leader, fetch its membership listing and plan corrections.
///
/// Fails closed when there is no single leader: membership changes are
/// leader-only, so nothing can be corrected.
pub async fn prepare(network: &Network, client: &RpcClient) -> Result<ReconcilePlan> {
    let leader = network.leader()?;
    let membership = leader.conductor(client).cluster_membership().await?;
    let diagnosis = diagnose(network, &membership);
    let corrections = plan(network, &diagnosis);

    tracing::info!(
        "{}: leader {}, {} cluster members, {} corrections planned",
        network.name,
        leader.sequencer_id,
        membership.servers.len(),
        corrections.len()
    );

    Ok(ReconcilePlan {
        network: network.name.clone(),
        leader_id: leader.sequencer_id.clone(),
        membership,
        diagnosis,
        corrections,
    })
}

// ============ Execution ============

/// Why a correction did not complete
#[derive(Debug, Clone, thiserror::Error)]
pub enum CorrectionFailure {
    #[error(transparent)]
    Rpc(#[from] RpcError),

    /// Removing the incumbent leader would make it step down mid-correction
    #[error("refusing to remove the current leader; transfer leadership first")]
    IncumbentLeader,
}

#[derive(Debug, Clone)]
pub enum Outcome {
    Unchanged,
    Corrected(Vec<ClusterAction>),
    Failed {
        /// Actions acknowledged before the failure
        completed: Vec<ClusterAction>,
        failed_action: ClusterAction,
        error: CorrectionFailure,
    },
}

#[derive(Debug, Clone)]
pub struct SequencerOutcome {
    pub sequencer_id: String,
    pub discrepancy: Option<Discrepancy>,
    pub outcome: Outcome,
}

/// Per-sequencer results of a reconciliation run
#[derive(Debug, Clone)]
pub struct ReconcileReport {
    pub network: String,
    pub leader_id: String,
    pub outcomes: Vec<SequencerOutcome>,
    pub unknown_members: Vec<ClusterMember>,
}

impl ReconcileReport {
    pub fn has_failures(&self) -> bool {
        self.failed().next().is_some()
    }

    pub fn failed(&self) -> impl Iterator<Item = &SequencerOutcome> {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.outcome, Outcome::Failed { .. }))
    }

    pub fn corrected(&self) -> impl Iterator<Item = &SequencerOutcome> {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.outcome, Outcome::Corrected(_)))
    }

    pub fn unchanged(&self) -> impl Iterator<Item = &SequencerOutcome> {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.outcome, Outcome::Unchanged))
    }
}

/// Send one membership change to the leader
async fn apply(
    client: &RpcClient,
    leader: &Sequencer,
    correction: &PlannedCorrection,
    action: ClusterAction,
) -> Result<(), RpcError> {
    let conductor = leader.conductor(client);
    let id = correction.sequencer_id.as_str();
    let raft_addr = correction.raft_addr.as_str();
    match action {
        ClusterAction::Remove => remove_from_cluster(client, leader, id).await,
        ClusterAction::AddVoter => {
            conductor
                .add_server_as_voter(id, raft_addr, ANY_MEMBERSHIP_VERSION)
                .await
        }
        ClusterAction::AddNonvoter => {
            conductor
                .add_server_as_nonvoter(id, raft_addr, ANY_MEMBERSHIP_VERSION)
                .await
        }
    }
}

/// Run one correction's actions in order, stopping at the first failure
async fn correct(client: &RpcClient, leader: &Sequencer, correction: &PlannedCorrection) -> Outcome {
    if correction.sequencer_id == leader.sequencer_id
        && correction.actions.contains(&ClusterAction::Remove)
    {
        tracing::error!(
            "Not correcting voting status of leader {}: transfer leadership first",
            leader.sequencer_id
        );
        return Outcome::Failed {
            completed: Vec::new(),
            failed_action: ClusterAction::Remove,
            error: CorrectionFailure::IncumbentLeader,
        };
    }

    let mut completed = Vec::with_capacity(correction.actions.len());
    for &action in &correction.actions {
        tracing::info!("{}: {}", correction.sequencer_id, action);
        if let Err(e) = apply(client, leader, correction, action).await {
            tracing::error!("Failed to {} {}: {}", action, correction.sequencer_id, e);
            return Outcome::Failed {
                completed,
                failed_action: action,
                error: e.into(),
            };
        }
        completed.push(action);
    }
    Outcome::Corrected(completed)
}

/// Execute a plan against the leader it was prepared with
pub async fn execute(network: &Network, client: &RpcClient, plan: ReconcilePlan) -> Result<ReconcileReport> {
    let leader = network.sequencer(&plan.leader_id)?;

    let mut outcomes = Vec::with_capacity(plan.diagnosis.sequencers.len());
    for diagnosed in &plan.diagnosis.sequencers {
        let correction = plan
            .corrections
            .iter()
            .find(|c| c.sequencer_id == diagnosed.sequencer_id);
        let outcome = match correction {
            Some(correction) => correct(client, leader, correction).await,
            None => Outcome::Unchanged,
        };
        outcomes.push(SequencerOutcome {
            sequencer_id: diagnosed.sequencer_id.clone(),
            discrepancy: diagnosed.discrepancy.clone(),
            outcome,
        });
    }

    Ok(ReconcileReport {
        network: plan.network,
        leader_id: plan.leader_id,
        outcomes,
        unknown_members: plan.diagnosis.unknown_members,
    })
}

/// Bring cluster membership in line with the declared voting roles
pub async fn reconcile(network: &Network, client: &RpcClient) -> Result<ReconcileReport> {
    let plan = prepare(network, client).await?;
    execute(network, client, plan).await
}
