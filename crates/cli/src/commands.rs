//! Command handlers

use crate::render;
use anyhow::{bail, Result};
use clap::Subcommand;
use conductor_ops::{
    build_status, control, leadership, reconcile, NetworkRegistry, RpcClient, TransferOutcome,
};

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the status of all sequencers in a network
    Status { network: String },

    /// Transfer leadership to a specific sequencer
    TransferLeader { network: String, sequencer_id: String },

    /// Pause all conductors, or only the one given by --sequencer-id
    Pause {
        network: String,
        #[arg(long)]
        sequencer_id: Option<String>,
    },

    /// Resume all conductors, or only the one given by --sequencer-id
    Resume {
        network: String,
        #[arg(long)]
        sequencer_id: Option<String>,
    },

    /// Force a sequencer to report itself as leader. Does not go through
    /// consensus; disaster recovery only
    OverrideLeader { network: String, sequencer_id: String },

    /// Remove a sequencer from the cluster
    RemoveServer { network: String, sequencer_id: String },

    /// Update the cluster membership to match the sequencer configuration
    UpdateClusterMembership {
        network: String,
        /// Print the planned changes without applying them
        #[arg(long)]
        dry_run: bool,
    },
}

pub async fn run(command: Command, registry: &mut NetworkRegistry, client: &RpcClient) -> Result<()> {
    match command {
        Command::Status { network } => {
            let network = registry.refreshed(&network, client).await?;
            let report = build_status(network, client).await;
            print!("{}", render::status(&report));
        }

        Command::TransferLeader {
            network,
            sequencer_id,
        } => {
            let network = registry.refreshed(&network, client).await?;
            match leadership::transfer_leader(network, client, &sequencer_id).await? {
                TransferOutcome::Transferred { to, .. } => {
                    println!("Successfully transferred leader to {}", to)
                }
                TransferOutcome::AlreadyLeader(id) => println!("{} is already the leader", id),
            }
        }

        Command::Pause {
            network,
            sequencer_id,
        } => {
            let network = registry.refreshed(&network, client).await?;
            let report = control::pause(network, client, sequencer_id.as_deref()).await?;
            print!("{}", render::bulk(&report));
            if report.has_failures() {
                bail!("failed to pause {} conductor(s)", report.failed().count());
            }
        }

        Command::Resume {
            network,
            sequencer_id,
        } => {
            let network = registry.refreshed(&network, client).await?;
            let report = control::resume(network, client, sequencer_id.as_deref()).await?;
            print!("{}", render::bulk(&report));
            if report.has_failures() {
                bail!("failed to resume {} conductor(s)", report.failed().count());
            }
        }

        Command::OverrideLeader {
            network,
            sequencer_id,
        } => {
            let network = registry.refreshed(&network, client).await?;
            leadership::override_leader(network, client, &sequencer_id).await?;
            println!("Successfully overrode leader for {}", sequencer_id);
        }

        Command::RemoveServer {
            network,
            sequencer_id,
        } => {
            let network = registry.refreshed(&network, client).await?;
            control::remove_server(network, client, &sequencer_id).await?;
            println!("Successfully removed {}", sequencer_id);
        }

        Command::UpdateClusterMembership { network, dry_run } => {
            let network = registry.refreshed(&network, client).await?;
            let plan = reconcile::prepare(network, client).await?;
            print!("{}", render::plan(&plan));
            if dry_run {
                return Ok(());
            }

            let report = reconcile::execute(network, client, plan).await?;
            print!("{}", render::reconcile(&report));
            if report.has_failures() {
                bail!(
                    "failed to correct membership of {} sequencer(s)",
                    report.failed().count()
                );
            }
        }
    }

    Ok(())
}
