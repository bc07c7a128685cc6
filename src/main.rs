use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use intersection_sim::simulation::{CommitPolicy, SimConfig, Simulation};

#[derive(Parser)]
#[command(name = "intersection_sim")]
#[command(about = "Headless simulation of a signalised four-way crossing")]
struct Cli {
    /// Number of simulation ticks to run
    #[arg(long, default_value = "3600")]
    ticks: u64,

    /// Time delta per tick in seconds (defaults to 1/60)
    #[arg(long)]
    delta: Option<f32>,

    /// Seed for a reproducible run
    #[arg(long)]
    seed: Option<u64>,

    /// Per-tick probability of spawning a vehicle
    #[arg(long)]
    vehicle_spawn: Option<f64>,

    /// Per-tick probability of spawning a pedestrian
    #[arg(long)]
    pedestrian_spawn: Option<f64>,

    /// Run the two lights on independent fixed cycles instead of as a pair
    #[arg(long)]
    unpaired: bool,

    /// Vehicles inside the box ignore pedestrians too
    #[arg(long)]
    strict_commit: bool,

    /// Log a progress line every N ticks (0 disables)
    #[arg(long, default_value = "600")]
    report_every: u64,

    /// Print the map and a summary with every progress line and at the end
    #[arg(long)]
    map: bool,
}

impl Cli {
    fn config(&self) -> SimConfig {
        let mut config = if self.unpaired {
            SimConfig::unpaired()
        } else {
            SimConfig::default()
        };
        if let Some(delta) = self.delta {
            config.tick_duration = delta;
        }
        config.seed = self.seed;
        if let Some(p) = self.vehicle_spawn {
            config.spawn.vehicle_probability = p;
        }
        if let Some(p) = self.pedestrian_spawn {
            config.spawn.pedestrian_probability = p;
        }
        if self.strict_commit {
            config.commit_policy = CommitPolicy::IgnoreAll;
        }
        config
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("warn,intersection_sim=info"),
    )
    .init();

    let cli = Cli::parse();
    run_headless(&cli)
}

/// Run the simulation in headless mode (no graphics)
fn run_headless(cli: &Cli) -> Result<()> {
    let config = cli.config();
    info!(
        "Running intersection simulation: {} ticks of {:.4}s, seed {:?}",
        cli.ticks, config.tick_duration, config.seed
    );

    let mut sim = Simulation::new(config).context("invalid simulation configuration")?;

    if cli.map {
        sim.print_summary();
        sim.draw_map();
    }

    for tick in 1..=cli.ticks {
        sim.step();

        if cli.report_every > 0 && tick % cli.report_every == 0 {
            sim.log_progress();
            if cli.map {
                sim.draw_map();
            }
        }
    }

    if cli.map {
        println!("=== Final State ===");
        sim.print_summary();
        sim.draw_map();
    }

    sim.stats()
        .log_summary(sim.vehicles.len(), sim.pedestrians.len());
    Ok(())
}
