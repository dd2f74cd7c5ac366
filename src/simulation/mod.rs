//! The simulation driver: population seeding, the tick loop, and events
//!
//! [`Simulation`] owns the world and exposes a single [`Simulation::step`]
//! entry point. Each step emits the tick's [`SimulationEvent`]s so callers
//! can log, aggregate, or display without reaching into world internals.

pub mod tick;

use rand::Rng;

use crate::agent::specialization::ALL_SPECIALIZATIONS;
use crate::agent::AgentSeed;
use crate::core::config::SimulationConfig;
use crate::core::error::{FaunaError, Result};
use crate::core::types::{AgentId, Vec2};
use crate::signaling::VocalKind;
use crate::world::World;

/// Ticks per full seasonal cycle
pub const SEASON_TICKS: f32 = 20_000.0;

/// Something that happened during a tick, in commit order
#[derive(Debug, Clone, PartialEq)]
pub enum SimulationEvent {
    AgentDied {
        id: AgentId,
        specialization: &'static str,
        frames_alive: u64,
    },
    AgentBorn {
        id: AgentId,
        mother: AgentId,
        father: Option<AgentId>,
        specialization: &'static str,
        generation: u32,
    },
    Mated {
        initiator: AgentId,
        partner: AgentId,
    },
    Split {
        parent: AgentId,
        child: AgentId,
    },
    FoodEaten {
        agent: AgentId,
        high_value: bool,
    },
    Attacked {
        attacker: AgentId,
        victim: AgentId,
        lethal: bool,
    },
    VocalEmitted {
        agent: AgentId,
        kind: VocalKind,
    },
}

/// Owns a world and drives it tick by tick
pub struct Simulation {
    pub world: World,
}

impl Simulation {
    /// Build a simulation from a validated config
    pub fn new(config: SimulationConfig) -> Result<Self> {
        validate_config(&config)?;
        Ok(Self {
            world: World::new(config),
        })
    }

    /// Seed founders round-robin across the specializations, at random
    /// positions away from the walls, and scatter the initial food
    pub fn seed_population(&mut self) {
        let count = self.world.config.world.initial_population;
        let energy = self.world.config.energy.starting_energy;
        let (w, h) = (self.world.config.world.width, self.world.config.world.height);
        for i in 0..count {
            let spec = ALL_SPECIALIZATIONS[i as usize % ALL_SPECIALIZATIONS.len()];
            let position = Vec2::new(
                self.world.rng.gen_range(w * 0.05..w * 0.95),
                self.world.rng.gen_range(h * 0.05..h * 0.95),
            );
            self.world
                .spawn_founder(AgentSeed::founder(position, energy, spec));
        }
        tick::replenish_food(&mut self.world);
        tracing::info!(
            founders = count,
            foods = self.world.foods.len(),
            "population seeded"
        );
    }

    /// Advance one tick and return what happened
    pub fn step(&mut self) -> Vec<SimulationEvent> {
        self.world.season_phase = (self.world.tick as f32 / SEASON_TICKS).fract();
        tick::run_tick(&mut self.world)
    }
}

fn validate_config(config: &SimulationConfig) -> Result<()> {
    if config.world.width <= 0.0 || config.world.height <= 0.0 {
        return Err(FaunaError::ConfigError(format!(
            "world dimensions must be positive, got {}x{}",
            config.world.width, config.world.height
        )));
    }
    if config.energy.max_energy <= 0.0 || config.energy.starting_energy <= 0.0 {
        return Err(FaunaError::ConfigError(
            "energy ceilings must be positive".to_string(),
        ));
    }
    if !(0.0..=1.0).contains(&config.reproduction.mutation_rate) {
        return Err(FaunaError::ConfigError(format!(
            "mutation_rate must be in [0, 1], got {}",
            config.reproduction.mutation_rate
        )));
    }
    Ok(())
}
