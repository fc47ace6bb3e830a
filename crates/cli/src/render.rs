//! Plain-text rendering of reports

use conductor_ops::{
    BulkReport, Outcome, ReconcilePlan, ReconcileReport, StatusReport, StatusWarning,
};
use conductor_ops::reconcile::CorrectionFailure;
use std::fmt::Write;

const STATUS_HEADERS: [&str; 7] = [
    "Sequencer ID",
    "Conductor Active",
    "Sequencer Healthy",
    "Conductor Leader",
    "Active Sequencer",
    "Unsafe Number",
    "Unsafe Hash",
];

/// Left-aligned table with a header rule
fn table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.len());
        }
    }

    let render_line = |cells: &[String]| -> String {
        let padded: Vec<String> = cells
            .iter()
            .zip(&widths)
            .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
            .collect();
        padded.join("  ").trim_end().to_string()
    };

    let header: Vec<String> = headers.iter().map(|h| h.to_string()).collect();
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();

    let mut out = String::new();
    for cells in [&header, &rule].into_iter().chain(rows) {
        out.push_str(&render_line(cells));
        out.push('\n');
    }
    out
}

pub fn status(report: &StatusReport) -> String {
    let rows: Vec<Vec<String>> = report
        .sequencers
        .iter()
        .map(|s| {
            vec![
                s.sequencer_id.clone(),
                s.conductor_active.to_string(),
                s.sequencer_healthy.to_string(),
                s.conductor_leader.to_string(),
                s.sequencer_active.to_string(),
                s.unsafe_l2
                    .as_ref()
                    .map(|head| head.number.to_string())
                    .unwrap_or_else(|| "?".to_string()),
                s.unsafe_l2
                    .as_ref()
                    .map(|head| head.hash.clone())
                    .unwrap_or_else(|| "?".to_string()),
            ]
        })
        .collect();

    let mut out = table(&STATUS_HEADERS, &rows);

    for sequencer in &report.sequencers {
        for error in &sequencer.fetch_errors {
            let _ = writeln!(out, "WARN: {}: {}", sequencer.sequencer_id, error);
        }
    }

    for warning in &report.warnings {
        let level = if warning.is_error() { "ERROR" } else { "WARN" };
        match warning {
            StatusWarning::NoLeader | StatusWarning::SplitBrain(_) => {
                let _ = writeln!(out, "{}: {} in network {}", level, warning, report.network);
            }
            _ => {
                let _ = writeln!(out, "{}: {}", level, warning);
            }
        }
    }

    if report.recommends_reconciliation() {
        out.push_str("WARN: Run 'update-cluster-membership' to correct membership issues\n");
    }
    out
}

pub fn bulk(report: &BulkReport) -> String {
    let mut out = String::new();
    for outcome in &report.outcomes {
        let _ = match &outcome.result {
            Ok(()) => writeln!(out, "Successfully {} {}", report.action.past_tense(), outcome.sequencer_id),
            Err(e) => writeln!(out, "Failed to {} {}: {}", report.action, outcome.sequencer_id, e),
        };
    }
    out
}

pub fn plan(plan: &ReconcilePlan) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Leader {} reports {} cluster members (version {})",
        plan.leader_id,
        plan.membership.servers.len(),
        plan.membership.version
    );
    if plan.corrections.is_empty() {
        out.push_str("Cluster membership matches configuration\n");
    }
    for correction in &plan.corrections {
        let actions: Vec<String> = correction.actions.iter().map(|a| a.to_string()).collect();
        let _ = writeln!(
            out,
            "{} {}: will {}",
            correction.sequencer_id,
            correction.discrepancy,
            actions.join(", then ")
        );
    }
    for member in &plan.diagnosis.unknown_members {
        let _ = writeln!(
            out,
            "WARN: cluster member {} is not in the configuration and will be left alone",
            member.id
        );
    }
    out
}

pub fn reconcile(report: &ReconcileReport) -> String {
    let mut out = String::new();
    for outcome in &report.outcomes {
        let _ = match &outcome.outcome {
            Outcome::Unchanged => writeln!(out, "{}: unchanged", outcome.sequencer_id),
            Outcome::Corrected(actions) => {
                let actions: Vec<String> = actions.iter().map(|a| a.to_string()).collect();
                writeln!(out, "{}: corrected ({})", outcome.sequencer_id, actions.join(", "))
            }
            Outcome::Failed {
                completed,
                failed_action,
                error,
            } => {
                let note = match (error, completed.is_empty()) {
                    (CorrectionFailure::Rpc(_), false) => " after partial progress",
                    _ => "",
                };
                writeln!(
                    out,
                    "{}: failed to {}{}: {}",
                    outcome.sequencer_id, failed_action, note, error
                )
            }
        };
    }
    let _ = writeln!(
        out,
        "{} unchanged, {} corrected, {} failed",
        report.unchanged().count(),
        report.corrected().count(),
        report.failed().count()
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use conductor_ops::{LiveFlag, Sequencer, UnsafeHead};

    #[test]
    fn test_status_table_shows_unknowns() {
        let mut leader = Sequencer::new("seq-0", "http://c0", "http://n0", "seq-0:50050", true);
        leader.conductor_active = LiveFlag::True;
        leader.sequencer_healthy = LiveFlag::True;
        leader.conductor_leader = LiveFlag::True;
        leader.sequencer_active = LiveFlag::True;
        leader.unsafe_l2 = Some(UnsafeHead {
            number: 77,
            hash: "0xabc".to_string(),
        });
        let unreachable = Sequencer::new("seq-1", "http://c1", "http://n1", "seq-1:50050", true);

        let report = StatusReport {
            network: "devnet".to_string(),
            sequencers: vec![leader, unreachable],
            leader_id: Some("seq-0".to_string()),
            warnings: Vec::new(),
        };
        let out = status(&report);
        let lines: Vec<&str> = out.lines().collect();

        assert!(lines[0].starts_with("Sequencer ID"));
        assert!(lines[2].starts_with("seq-0"));
        assert!(lines[2].contains("0xabc"));
        assert!(lines[3].starts_with("seq-1"));
        assert!(lines[3].ends_with('?'));
        assert!(!out.contains("update-cluster-membership"));
    }

    #[test]
    fn test_status_lists_no_leader() {
        let report = StatusReport {
            network: "devnet".to_string(),
            sequencers: Vec::new(),
            leader_id: None,
            warnings: vec![StatusWarning::NoLeader],
        };
        assert!(status(&report).contains("WARN: could not find current leader in network devnet"));
    }
}
