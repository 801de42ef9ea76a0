//! Headless simulation runner.
//!
//! Drives the homestead world for a fixed number of ticks, logging
//! notable events and periodically printing world snapshots as JSON
//! lines.

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use sim_core::{SimConfig, Simulation};

/// Command line arguments for the simulation.
#[derive(Parser, Debug)]
#[command(name = "homestead_sim")]
#[command(about = "A headless homestead simulation runner")]
struct Args {
    /// Random seed for the run
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Number of ticks to simulate
    #[arg(long, default_value_t = 1000)]
    ticks: u64,

    /// Interval between world snapshots (in ticks); 0 disables them
    #[arg(long, default_value_t = 100)]
    snapshot_interval: u64,

    /// Optional TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => match SimConfig::from_file(path) {
            Ok(config) => config,
            Err(error) => {
                eprintln!("failed to load config: {error}");
                return ExitCode::FAILURE;
            }
        },
        None => SimConfig::default(),
    };

    tracing::info!(seed = args.seed, ticks = args.ticks, "starting simulation");

    let mut sim = match Simulation::new(config, args.seed) {
        Ok(sim) => sim,
        Err(error) => {
            eprintln!("failed to build simulation: {error}");
            return ExitCode::FAILURE;
        }
    };

    let mut event_total = 0usize;
    for _ in 0..args.ticks {
        sim.step();

        for envelope in sim.drain_events() {
            event_total += 1;
            tracing::debug!(tick = envelope.tick, event = ?envelope.event, "world event");
        }

        if args.snapshot_interval > 0 && sim.tick() % args.snapshot_interval == 0 {
            match sim.snapshot().to_json_line() {
                Ok(line) => println!("{line}"),
                Err(error) => tracing::warn!(%error, "snapshot serialization failed"),
            }
        }
    }

    let final_snapshot = sim.snapshot();
    tracing::info!(
        ticks = sim.tick(),
        time = %sim.now(),
        agents = final_snapshot.agents.len(),
        items = final_snapshot.items.len(),
        events = event_total,
        "simulation finished"
    );

    ExitCode::SUCCESS
}
