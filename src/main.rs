//! # trajcompute CLI
//!
//! Dry-run tool for analysis plans. It builds every compute of a plan against
//! a recording engine and prints the instructions the analysis engine would
//! receive.

use std::path::PathBuf;
use std::rc::Rc;
use std::time::Instant;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;
use trajcompute::{AnalysisPlan, RecordingEngine, Trajectory};

#[derive(Debug, Parser)]
#[command(name = "trajcompute", version, about = "Dry-run an analysis plan")]
struct Cli {
    /// Analysis plan (TOML)
    plan: PathBuf,

    /// Label of the trajectory the computes are attached to
    #[arg(long, default_value = "trajectory")]
    trajectory: String,

    /// Rebuild every compute on a second trajectory after creation
    #[arg(long)]
    replay: bool,
}

fn main() -> anyhow::Result<()> {
    // Logs go to stderr so stdout stays the report, filtered by RUST_LOG
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let start_time = Instant::now();

    // Load the plan
    let plan = AnalysisPlan::from_file(&cli.plan)
        .with_context(|| format!("failed to load plan {}", cli.plan.display()))?;

    // Build every compute against a recording engine
    let engine = Rc::new(RecordingEngine::new());
    let trajectory = Trajectory::new(engine.clone(), engine.open_trajectory(&cli.trajectory));
    let mut registry = plan.registry();

    let mut computes = plan
        .build(&mut registry, &trajectory)
        .context("failed to build plan")?;

    // Print the configured computes
    println!("Plan: {}", cli.plan.display());
    println!("  Collision policy: {:?}", registry.collision_policy());
    println!("  Computes: {}", computes.len());
    for compute in &computes {
        let types: Vec<&str> = compute.selected_types().iter().collect();
        println!(
            "    {} ({}) -> \"{}\" types: [{}]",
            compute.name(),
            compute.kind(),
            compute.descriptor().file_name(),
            types.join(", ")
        );
    }

    // Optionally move everything onto a second trajectory
    if cli.replay {
        let label = format!("{}-replay", cli.trajectory);
        let rerun = Trajectory::new(engine.clone(), engine.open_trajectory(&label));
        for compute in computes.iter_mut() {
            compute
                .construct(&rerun)
                .with_context(|| format!("failed to rebuild compute {}", compute.name()))?;
        }
    }

    // What the engine received, in order
    println!("\nInstructions:");
    for instruction in engine.instructions() {
        println!("  {}", instruction);
    }

    // Print elapsed time
    let elapsed = start_time.elapsed();
    println!("\nBuilt {} computes in {:.2?}", computes.len(), elapsed);

    Ok(())
}
