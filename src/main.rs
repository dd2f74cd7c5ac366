//! Neurofauna - headless runner
//!
//! Seeds a world, runs it for a fixed number of ticks, prints a progress
//! summary, and writes the qualified gene pool to a JSON export.

use std::time::Instant;

use clap::Parser;

use neurofauna::core::error::Result;
use neurofauna::simulation::{Simulation, SimulationEvent};
use neurofauna::world::snapshot::GenomeExport;
use neurofauna::SimulationConfig;

#[derive(Debug, Parser)]
#[command(name = "neurofauna", about = "Evolvable neural-agent simulation")]
struct Args {
    /// Ticks to simulate
    #[arg(long, default_value_t = 50_000)]
    ticks: u64,

    /// World RNG seed (overrides the config file)
    #[arg(long)]
    seed: Option<u64>,

    /// Founder population size (overrides the config file)
    #[arg(long)]
    population: Option<u32>,

    /// Path to a TOML config file; defaults apply when omitted
    #[arg(long)]
    config: Option<std::path::PathBuf>,

    /// Where to write the gene-pool export
    #[arg(long, default_value = "gene_pool.json")]
    export: std::path::PathBuf,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "neurofauna=info".into()),
        )
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => SimulationConfig::from_toml_str(&std::fs::read_to_string(path)?)?,
        None => SimulationConfig::default(),
    };
    if let Some(seed) = args.seed {
        config.world.seed = seed;
    }
    if let Some(population) = args.population {
        config.world.initial_population = population;
    }

    println!("Neurofauna");
    println!("==========");
    println!(
        "World: {}x{}, seed {}",
        config.world.width, config.world.height, config.world.seed
    );
    println!(
        "Founders: {}, food target: {}",
        config.world.initial_population, config.world.food_target
    );
    println!("Simulating {} ticks...", args.ticks);
    println!();

    let mut sim = Simulation::new(config)?;
    sim.seed_population();

    let start = Instant::now();
    let mut births = 0u64;
    let mut deaths = 0u64;
    let mut meals = 0u64;
    for _ in 0..args.ticks {
        for event in sim.step() {
            match event {
                SimulationEvent::AgentBorn { .. } | SimulationEvent::Split { .. } => births += 1,
                SimulationEvent::AgentDied { .. } => deaths += 1,
                SimulationEvent::FoodEaten { .. } => meals += 1,
                _ => {}
            }
        }
        if sim.world.tick % 10_000 == 0 {
            tracing::info!(
                tick = sim.world.tick,
                population = sim.world.agent_count(),
                births,
                deaths,
                "progress"
            );
        }
        if sim.world.agent_count() == 0 {
            tracing::warn!(tick = sim.world.tick, "population extinct, stopping early");
            break;
        }
    }
    let elapsed = start.elapsed();

    println!("Ticks simulated: {}", sim.world.tick);
    println!("Final population: {}", sim.world.agent_count());
    println!("Births: {births}  Deaths: {deaths}  Meals: {meals}");
    println!(
        "Wall time: {:.2}s ({:.0} ticks/s)",
        elapsed.as_secs_f64(),
        sim.world.tick as f64 / elapsed.as_secs_f64().max(1e-9)
    );

    let export = GenomeExport::capture(&sim.world);
    println!("\nQualified genomes: {}", export.genomes.len());
    if let Some(best) = export.genomes.first() {
        println!(
            "Best lineage: {} gen {} fitness {:.1}",
            best.specialization, best.generation, best.fitness
        );
    }
    std::fs::write(&args.export, export.to_json()?)?;
    println!("Gene pool written to {}", args.export.display());

    Ok(())
}
