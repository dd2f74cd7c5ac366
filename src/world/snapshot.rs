//! One-way serialization surfaces: render snapshots and genome exports
//!
//! Nothing here feeds state back into the simulation. Snapshots are cheap
//! copies a display layer can poll; genome exports persist the gene pool of
//! qualified agents across runs.

use serde::{Deserialize, Serialize};

use crate::agent::{Agent, LifetimeStats};
use crate::core::error::Result;
use crate::core::types::{GeneId, Tick, Vec2};
use crate::perception::rays::RayHit;
use crate::signaling::VocalKind;
use crate::world::World;

/// Energy fraction below which an agent renders as starving
const LOW_ENERGY_FRACTION: f32 = 0.2;

/// Display-facing copy of one agent's visible state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSnapshot {
    pub position: Vec2,
    pub angle: f32,
    pub size: f32,
    pub energy: f32,
    pub specialization: String,
    pub generation: u32,
    pub fitness: f32,
    pub low_energy: bool,
    pub shouting: Option<VocalKind>,
    pub rays: Vec<RayHit>,
}

/// Full-world frame for a display layer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldSnapshot {
    pub tick: Tick,
    pub season_phase: f32,
    pub ambient_temperature: f32,
    pub agents: Vec<AgentSnapshot>,
    pub food_positions: Vec<Vec2>,
}

impl WorldSnapshot {
    pub fn capture(world: &World) -> Self {
        let max_energy = world.config.energy.max_energy;
        Self {
            tick: world.tick,
            season_phase: world.season_phase,
            ambient_temperature: world.ambient_temperature(),
            agents: world
                .agents()
                .filter(|a| !a.is_dead())
                .map(|a| snapshot_agent(a, max_energy))
                .collect(),
            food_positions: world.foods.iter().map(|f| f.position).collect(),
        }
    }
}

fn snapshot_agent(agent: &Agent, max_energy: f32) -> AgentSnapshot {
    AgentSnapshot {
        position: agent.position,
        angle: agent.angle,
        size: agent.size,
        energy: agent.energy,
        specialization: agent.specialization.name().to_string(),
        generation: agent.generation,
        fitness: agent.fitness,
        low_energy: agent.energy < max_energy * LOW_ENERGY_FRACTION,
        shouting: agent.current_shout,
        rays: agent.last_ray_hits.clone(),
    }
}

/// One qualified genome, keyed by lineage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenomeRecord {
    pub gene_id: GeneId,
    pub specialization: String,
    pub generation: u32,
    pub fitness: f32,
    pub weights: Vec<f32>,
    pub stats: LifetimeStats,
}

/// Gene-pool export of every currently qualified agent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenomeExport {
    pub tick: Tick,
    pub genomes: Vec<GenomeRecord>,
}

impl GenomeExport {
    /// Collect qualified agents, best lineage representative first
    pub fn capture(world: &World) -> Self {
        let mut genomes: Vec<GenomeRecord> = world
            .agents()
            .filter(|a| !a.is_dead() && a.fit_for_gene_pool)
            .map(|a| GenomeRecord {
                gene_id: a.gene_id,
                specialization: a.specialization.name().to_string(),
                generation: a.generation,
                fitness: a.fitness,
                weights: a.brain.to_blob(),
                stats: a.stats,
            })
            .collect();
        genomes.sort_by(|a, b| b.fitness.total_cmp(&a.fitness));
        // One representative per lineage keeps the export compact
        genomes.dedup_by_key(|g| g.gene_id);
        Self {
            tick: world.tick,
            genomes,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
