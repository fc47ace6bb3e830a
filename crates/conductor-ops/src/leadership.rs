//! Leadership control - handoff to a chosen sequencer and disaster-recovery override

use crate::error::{OpsError, OverrideStage, Result};
use crate::network::Network;
use crate::rpc::RpcClient;
use crate::types::LiveFlag;

/// What a transfer request ended up doing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferOutcome {
    Transferred { from: String, to: String },
    /// Target already holds leadership; nothing was sent
    AlreadyLeader(String),
}

/// Hand leadership to `target_id`.
///
/// Preconditions are checked in order and fail closed before any RPC: the
/// target exists, is a declared voter, reports healthy, and exactly one
/// leader exists. The request goes to the incumbent leader's conductor,
/// since only the leader can hand off.
pub async fn transfer_leader(
    network: &Network,
    client: &RpcClient,
    target_id: &str,
) -> Result<TransferOutcome> {
    let target = network.sequencer(target_id)?;
    if !target.voting {
        return Err(OpsError::NotVoter(target_id.to_string()));
    }
    match target.sequencer_healthy {
        LiveFlag::True => {}
        LiveFlag::False => return Err(OpsError::Unhealthy(target_id.to_string())),
        LiveFlag::Unknown => return Err(OpsError::HealthUnknown(target_id.to_string())),
    }
    let leader = network.leader()?;

    if leader.sequencer_id == target.sequencer_id {
        tracing::info!("{} is already the leader of {}", target_id, network.name);
        return Ok(TransferOutcome::AlreadyLeader(target_id.to_string()));
    }

    tracing::info!(
        "Transferring leadership of {} from {} to {} ({})",
        network.name,
        leader.sequencer_id,
        target.sequencer_id,
        target.raft_addr
    );
    leader
        .conductor(client)
        .transfer_leader_to_server(&target.sequencer_id, &target.raft_addr)
        .await?;

    Ok(TransferOutcome::Transferred {
        from: leader.sequencer_id.clone(),
        to: target.sequencer_id.clone(),
    })
}

/// Force `sequencer_id` to report itself as leader without going through
/// consensus. For disaster recovery only.
///
/// The conductor is overridden first and the node only after the conductor
/// has acknowledged.
// TODO: the conductor-before-node ordering has no documented safety argument;
// confirm with the conductor maintainers before relying on it.
pub async fn override_leader(network: &Network, client: &RpcClient, sequencer_id: &str) -> Result<()> {
    let sequencer = network.sequencer(sequencer_id)?;
    tracing::warn!(
        "Overriding leader status of {} in {}; consensus is bypassed",
        sequencer_id,
        network.name
    );

    sequencer
        .conductor(client)
        .override_leader()
        .await
        .map_err(|source| OpsError::OverrideFailed {
            sequencer_id: sequencer_id.to_string(),
            stage: OverrideStage::Conductor,
            source,
        })?;

    sequencer
        .node(client)
        .override_leader()
        .await
        .map_err(|source| OpsError::OverrideFailed {
            sequencer_id: sequencer_id.to_string(),
            stage: OverrideStage::Node,
            source,
        })?;

    tracing::info!("Overrode leader status for {}", sequencer_id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::support::{self, conductor_url, node_url, FakeState, MockTransport, Reply};
    use serde_json::json;
    use std::sync::Arc;

    async fn network_with(mock: &Arc<MockTransport>, target: FakeState, target_voting: bool) -> Network {
        support::script_sequencer(mock, "seq-0", FakeState::leader());
        support::script_sequencer(mock, "seq-1", target);
        support::refreshed_network(
            mock,
            "op-sepolia",
            vec![
                support::sequencer("seq-0", true),
                support::sequencer("seq-1", target_voting),
            ],
        )
        .await
    }

    #[tokio::test]
    async fn test_transfer_goes_to_incumbent_leader() {
        let mock = MockTransport::new();
        let network = network_with(&mock, FakeState::follower(), true).await;
        mock.on(&conductor_url("seq-0"), "conductor_transferLeaderToServer", Reply::ok());

        let outcome = transfer_leader(&network, &mock.client(), "seq-1").await.unwrap();

        assert_eq!(
            outcome,
            TransferOutcome::Transferred {
                from: "seq-0".to_string(),
                to: "seq-1".to_string()
            }
        );
        assert_eq!(
            mock.call_log(),
            vec![(
                conductor_url("seq-0"),
                "conductor_transferLeaderToServer".to_string(),
                vec![json!("seq-1"), json!("seq-1:50050")]
            )]
        );
    }

    #[tokio::test]
    async fn test_transfer_preconditions_send_nothing() {
        let mock = MockTransport::new();
        let network = network_with(&mock, FakeState::follower(), false).await;
        let err = transfer_leader(&network, &mock.client(), "seq-1").await.unwrap_err();
        assert!(matches!(err, OpsError::NotVoter(_)));

        let err = transfer_leader(&network, &mock.client(), "seq-9").await.unwrap_err();
        assert!(matches!(err, OpsError::SequencerNotFound { .. }));
        assert!(mock.calls().is_empty());

        let mock = MockTransport::new();
        let unhealthy = FakeState {
            leader: false,
            healthy: false,
        };
        let network = network_with(&mock, unhealthy, true).await;
        let err = transfer_leader(&network, &mock.client(), "seq-1").await.unwrap_err();
        assert!(matches!(err, OpsError::Unhealthy(_)));

        assert!(mock.calls().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_health_blocks_transfer() {
        let mock = MockTransport::new();
        support::script_sequencer(&mock, "seq-0", FakeState::leader());
        support::script_sequencer(&mock, "seq-1", FakeState::follower());
        mock.on(&conductor_url("seq-1"), "conductor_sequencerHealthy", Reply::Unreachable);
        let network = support::refreshed_network(
            &mock,
            "op-sepolia",
            vec![support::sequencer("seq-0", true), support::sequencer("seq-1", true)],
        )
        .await;

        let err = transfer_leader(&network, &mock.client(), "seq-1").await.unwrap_err();

        assert!(matches!(err, OpsError::HealthUnknown(_)));
        assert!(mock.calls().is_empty());
    }

    #[tokio::test]
    async fn test_transfer_without_leader_fails_closed() {
        let mock = MockTransport::new();
        support::script_sequencer(&mock, "seq-0", FakeState::follower());
        support::script_sequencer(&mock, "seq-1", FakeState::follower());
        let network = support::refreshed_network(
            &mock,
            "op-sepolia",
            vec![support::sequencer("seq-0", true), support::sequencer("seq-1", true)],
        )
        .await;

        let err = transfer_leader(&network, &mock.client(), "seq-1").await.unwrap_err();
        assert!(matches!(err, OpsError::NoLeader(_)));
        assert!(mock.calls().is_empty());
    }

    #[tokio::test]
    async fn test_transfer_surfaces_logical_error() {
        let mock = MockTransport::new();
        let network = network_with(&mock, FakeState::follower(), true).await;
        mock.on(
            &conductor_url("seq-0"),
            "conductor_transferLeaderToServer",
            Reply::error(json!({"code": -32000, "message": "target is not up to date"})),
        );

        let err = transfer_leader(&network, &mock.client(), "seq-1").await.unwrap_err();

        assert!(matches!(err, OpsError::Rpc(ref e) if e.is_logical()));
        assert_eq!(mock.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_transfer_to_current_leader_is_noop() {
        let mock = MockTransport::new();
        let network = network_with(&mock, FakeState::follower(), true).await;

        let outcome = transfer_leader(&network, &mock.client(), "seq-0").await.unwrap();

        assert_eq!(outcome, TransferOutcome::AlreadyLeader("seq-0".to_string()));
        assert!(mock.calls().is_empty());
    }

    #[tokio::test]
    async fn test_override_conductor_then_node() {
        let mock = MockTransport::new();
        mock.on(&conductor_url("seq-1"), "conductor_overrideLeader", Reply::ok());
        mock.on(&node_url("seq-1"), "admin_overrideLeader", Reply::ok());
        let network = Network::new("op-sepolia", vec![support::sequencer("seq-1", true)]);

        override_leader(&network, &mock.client(), "seq-1").await.unwrap();

        let methods: Vec<String> = mock.call_log().into_iter().map(|(_, m, _)| m).collect();
        assert_eq!(methods, vec!["conductor_overrideLeader", "admin_overrideLeader"]);
    }

    #[tokio::test]
    async fn test_override_stops_when_conductor_fails() {
        let mock = MockTransport::new();
        mock.on(&conductor_url("seq-1"), "conductor_overrideLeader", Reply::error(json!("denied")));
        mock.on(&node_url("seq-1"), "admin_overrideLeader", Reply::ok());
        let network = Network::new("op-sepolia", vec![support::sequencer("seq-1", true)]);

        let err = override_leader(&network, &mock.client(), "seq-1").await.unwrap_err();

        assert!(matches!(
            err,
            OpsError::OverrideFailed {
                stage: OverrideStage::Conductor,
                ..
            }
        ));
        assert_eq!(mock.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_override_reports_node_stage() {
        let mock = MockTransport::new();
        mock.on(&conductor_url("seq-1"), "conductor_overrideLeader", Reply::ok());
        mock.on(&node_url("seq-1"), "admin_overrideLeader", Reply::Status(500));
        let network = Network::new("op-sepolia", vec![support::sequencer("seq-1", true)]);

        let err = override_leader(&network, &mock.client(), "seq-1").await.unwrap_err();

        assert!(matches!(
            err,
            OpsError::OverrideFailed {
                stage: OverrideStage::Node,
                ..
            }
        ));
        assert_eq!(mock.calls().len(), 2);
    }
}
