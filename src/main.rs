#![allow(clippy::doc_markdown)]

mod cli;
mod tables;

use anyhow::Context;
use clap::{Parser, crate_version};
use envoy_gateway::Gateway;
use itertools::Itertools;
use tokio::time::sleep;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::{
    cli::{Args, Command, PollArgs},
    tables::{build_batteries_table, build_energy_table, build_inverters_table},
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .without_time()
        .compact()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    info!(version = crate_version!(), "starting…");

    let args = Args::parse();
    let mut gateway = args.gateway.connect().context("failed to set up the gateway client")?;

    match args.command {
        Command::Probe => {
            let capabilities = gateway.probe().await.context("discovery failed")?;
            info!(?capabilities, "gotcha");
            for (index, name) in gateway.active_updaters().enumerate() {
                info!(index, name, "active updater");
            }
        }
        Command::Snapshot => {
            let snapshot = gateway.update().await.context("aggregation failed")?;
            println!("{}", serde_json::to_string_pretty(&*snapshot)?);
        }
        Command::Poll(args) => {
            poll(&mut gateway, &args).await;
        }
        Command::GoOnGrid => {
            gateway.update().await?;
            gateway.go_on_grid().await.context("failed to close the main relay")?;
            info!("done");
        }
        Command::GoOffGrid => {
            gateway.update().await?;
            gateway.go_off_grid().await.context("failed to open the main relay")?;
            info!("done");
        }
        Command::StorageMode { mode } => {
            gateway.update().await?;
            gateway.set_storage_mode(mode).await.context("failed to change the storage mode")?;
            info!(?mode, "done");
        }
        Command::Reserve { soc } => {
            gateway.update().await?;
            gateway.set_reserve_soc(soc).await.context("failed to change the reserve")?;
            info!(soc, "done");
        }
    }

    Ok(())
}

/// Failed cycles are only logged: the gateway keeps the last good snapshot.
async fn poll(gateway: &mut Gateway, args: &PollArgs) {
    let mut n_cycles = 0;
    loop {
        match gateway.update().await {
            Ok(snapshot) => {
                println!("{}", build_energy_table(&snapshot));
                if !snapshot.inverters.is_empty() {
                    println!("{}", build_inverters_table(&snapshot));
                }
                if !snapshot.batteries.is_empty() || snapshot.enpower.is_some() {
                    println!("{}", build_batteries_table(&snapshot));
                }
                info!(
                    updaters = gateway.active_updaters().join(","),
                    n_endpoints = snapshot.raw.len(),
                    "cycle completed",
                );
            }
            Err(error) => {
                warn!("cycle failed: {error:#}");
            }
        }
        n_cycles += 1;
        if args.n_cycles.is_some_and(|max_cycles| n_cycles >= max_cycles) {
            break;
        }
        sleep(args.interval()).await;
    }
}
