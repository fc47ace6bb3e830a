//! Whole-network scenarios
//!
//! Drive config loading, refresh, status and reconciliation together against
//! scripted conductors.

use serde_json::json;

use crate::{
    build_status, pause, reconcile, ClusterAction, Discrepancy, OpsConfig, OpsError, Outcome,
    StatusWarning, Suffrage,
};

use super::support::{self, conductor_url, FakeState, MockTransport, Reply};

/// A (voting, leader), B (voting), C (non-voting), all healthy
fn abc_config() -> OpsConfig {
    let mut contents = String::from("[networks.devnet]\nsequencers = [\"A\", \"B\", \"C\"]\n");
    for (id, voting) in [("A", true), ("B", true), ("C", false)] {
        contents.push_str(&format!(
            "\n[sequencers.{id}]\nraft_addr = \"{raft}\"\nconductor_rpc_url = \"{conductor}\"\nnode_rpc_url = \"{node}\"\nvoting = {voting}\n",
            id = id,
            raft = support::raft_addr(id),
            conductor = conductor_url(id),
            node = support::node_url(id),
            voting = voting,
        ));
    }
    OpsConfig::parse(&contents).unwrap()
}

fn script_abc(mock: &MockTransport) {
    support::script_sequencer(mock, "A", FakeState::leader());
    support::script_sequencer(mock, "B", FakeState::follower());
    support::script_sequencer(mock, "C", FakeState::follower());
}

#[tokio::test]
async fn test_abc_reconciliation_sequence() {
    let mock = MockTransport::new();
    script_abc(&mock);
    support::script_membership(&mock, "A", &[("A", 0), ("B", 1)]);
    for method in [
        "conductor_removeServer",
        "conductor_addServerAsVoter",
        "conductor_addServerAsNonvoter",
    ] {
        mock.on(&conductor_url("A"), method, Reply::ok());
    }
    let client = mock.client();
    let mut registry = abc_config().registry();

    let network = registry.refreshed("devnet", &client).await.unwrap();
    mock.clear_calls();
    let report = reconcile(network, &client).await.unwrap();

    let changes: Vec<(String, String, Vec<serde_json::Value>)> = mock
        .call_log()
        .into_iter()
        .filter(|(_, method, _)| method != "conductor_clusterMembership")
        .collect();
    assert_eq!(
        changes,
        vec![
            (
                conductor_url("A"),
                "conductor_removeServer".to_string(),
                vec![json!("B"), json!(0)]
            ),
            (
                conductor_url("A"),
                "conductor_addServerAsVoter".to_string(),
                vec![json!("B"), json!("B:50050"), json!(0)]
            ),
            (
                conductor_url("A"),
                "conductor_addServerAsNonvoter".to_string(),
                vec![json!("C"), json!("C:50050"), json!(0)]
            ),
        ]
    );

    assert_eq!(report.leader_id, "A");
    assert!(matches!(report.outcomes[0].outcome, Outcome::Unchanged));
    assert_eq!(
        report.outcomes[1].discrepancy,
        Some(Discrepancy::VotingMismatch {
            expected: Suffrage::Voter,
            recorded: Suffrage::Nonvoter
        })
    );
    assert!(matches!(
        &report.outcomes[1].outcome,
        Outcome::Corrected(actions) if actions == &vec![ClusterAction::Remove, ClusterAction::AddVoter]
    ));
    assert_eq!(report.outcomes[2].discrepancy, Some(Discrepancy::NotInCluster));
    assert!(!report.has_failures());
}

#[tokio::test]
async fn test_abc_status_recommends_reconciliation() {
    let mock = MockTransport::new();
    script_abc(&mock);
    support::script_membership(&mock, "A", &[("A", 0), ("B", 1)]);
    let client = mock.client();
    let mut registry = abc_config().registry();

    let network = registry.refreshed("devnet", &client).await.unwrap();
    let report = build_status(network, &client).await;

    let flagged: Vec<&str> = report
        .warnings
        .iter()
        .filter_map(|w| match w {
            StatusWarning::Membership { sequencer_id, .. } => Some(sequencer_id.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(flagged, vec!["B", "C"]);
    assert!(report.recommends_reconciliation());
    assert_eq!(report.sequencers.len(), 3);
    assert!(report.sequencers.iter().all(|s| s.is_fully_observed()));
}

#[tokio::test]
async fn test_unknown_network_is_rejected_before_any_call() {
    let mock = MockTransport::new();
    let mut registry = abc_config().registry();

    let err = registry.refreshed("mainnet", &mock.client()).await.unwrap_err();

    assert!(matches!(err, OpsError::NetworkNotFound { ref known, .. } if known == &vec!["devnet".to_string()]));
    assert!(mock.calls().is_empty());
}

#[tokio::test]
async fn test_pause_middle_failure_reports_it() {
    let mock = MockTransport::new();
    script_abc(&mock);
    mock.on(&conductor_url("A"), "conductor_pause", Reply::ok());
    mock.on(&conductor_url("B"), "conductor_pause", Reply::Unreachable);
    mock.on(&conductor_url("C"), "conductor_pause", Reply::ok());
    let client = mock.client();
    let mut registry = abc_config().registry();

    let network = registry.refreshed("devnet", &client).await.unwrap();
    mock.clear_calls();
    let report = pause(network, &client, None).await.unwrap();

    assert_eq!(mock.calls().len(), 3);
    assert!(report.has_failures());
    assert!(report.outcomes[0].result.is_ok());
    assert!(report.outcomes[1].result.is_err());
    assert!(report.outcomes[2].result.is_ok());
}
