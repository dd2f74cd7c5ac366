//! World state: the agent arena, read-only entities, and the spatial index
//!
//! Agents live in a flat store keyed by id with a separate deterministic
//! iteration order; nothing holds owning references across entities, so
//! removing an agent is just clearing its index entries.

pub mod snapshot;
pub mod spatial;

use ahash::AHashMap;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::agent::genealogy::{GenealogyRecord, GenealogyRegistry};
use crate::agent::{Agent, AgentSeed};
use crate::core::config::SimulationConfig;
use crate::core::types::{AgentId, Tick, Vec2};
use crate::perception::AgentScratch;
use crate::signaling::{SignalPulse, VocalSignal};
use spatial::{SparseHashGrid, SpatialEntry, SpatialRef};

/// A food item, consumed read-only by agents until the world removes it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Food {
    pub position: Vec2,
    pub size: f32,
    pub energy_value: f32,
    pub high_value: bool,
}

/// A circular obstacle, possibly drifting
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Obstacle {
    pub position: Vec2,
    pub radius: f32,
    pub velocity: Vec2,
}

/// Read-only per-tick view of the living population, used for
/// relative-fitness normalization in mate scoring and mutation scaling
#[derive(Debug, Clone, Default)]
pub struct PopulationView {
    /// Living agents' fitness scores, ascending
    fitnesses: Vec<f32>,
}

impl PopulationView {
    pub fn from_fitnesses(mut fitnesses: Vec<f32>) -> Self {
        fitnesses.sort_by(|a, b| a.total_cmp(b));
        Self { fitnesses }
    }

    pub fn len(&self) -> usize {
        self.fitnesses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fitnesses.is_empty()
    }

    /// Highest fitness in the population, at least epsilon to keep ratios
    /// finite
    pub fn max_fitness(&self) -> f32 {
        self.fitnesses.last().copied().unwrap_or(0.0).max(1e-6)
    }

    /// Fraction of the population at or below `fitness`, in [0, 1]
    pub fn percentile(&self, fitness: f32) -> f32 {
        if self.fitnesses.is_empty() {
            return 0.5;
        }
        let below = self.fitnesses.partition_point(|&f| f <= fitness);
        below as f32 / self.fitnesses.len() as f32
    }
}

/// Borrow bundle handed to the parallel decision phase
///
/// Everything shared is a committed previous-tick view; only the scratch
/// slice is mutable, and each rayon task touches exactly one slot of it.
pub struct DecisionBuffers<'a> {
    pub agents: &'a AHashMap<AgentId, Agent>,
    pub order: &'a [AgentId],
    pub scratches: &'a mut [AgentScratch],
    pub grid: &'a SparseHashGrid,
    pub foods: &'a [Food],
    pub obstacles: &'a [Obstacle],
    pub pulses: &'a [SignalPulse],
    pub vocals: &'a [VocalSignal],
    pub config: &'a SimulationConfig,
}

/// The simulation world
pub struct World {
    pub config: SimulationConfig,
    pub tick: Tick,
    /// Season phase in [0, 1), supplied by the driver each tick
    pub season_phase: f32,
    /// Additive ambient-temperature modifier from the driver
    pub ambient_modifier: f32,

    agents: AHashMap<AgentId, Agent>,
    /// Deterministic iteration order over the arena
    order: Vec<AgentId>,
    /// Per-agent scratch buffers, aligned with `order`; each buffer is
    /// exclusively owned by its slot for the duration of a tick
    scratches: Vec<AgentScratch>,

    pub foods: Vec<Food>,
    pub obstacles: Vec<Obstacle>,
    pub pulses: Vec<SignalPulse>,
    pub vocals: Vec<VocalSignal>,
    pub genealogy: GenealogyRegistry,
    pub grid: SparseHashGrid,
    pub rng: ChaCha8Rng,
}

impl World {
    pub fn new(config: SimulationConfig) -> Self {
        let rng = ChaCha8Rng::seed_from_u64(config.world.seed);
        let grid = SparseHashGrid::new(config.world.grid_cell_size);
        let genealogy = GenealogyRegistry::new(config.reproduction.offspring_list_cap);
        Self {
            config,
            tick: 0,
            season_phase: 0.0,
            ambient_modifier: 0.0,
            agents: AHashMap::new(),
            order: Vec::new(),
            scratches: Vec::new(),
            foods: Vec::new(),
            obstacles: Vec::new(),
            pulses: Vec::new(),
            vocals: Vec::new(),
            genealogy,
            grid,
            rng,
        }
    }

    /// Spawn a founder agent (no parents) and register its lineage
    pub fn spawn_founder(&mut self, seed: AgentSeed) -> AgentId {
        let agent = Agent::spawn(seed, &self.config, &mut self.rng);
        let id = agent.id;
        self.genealogy.insert(GenealogyRecord::founder(id));
        self.insert_agent(agent);
        id
    }

    /// Insert a fully constructed agent; the caller has already registered
    /// its genealogy record
    pub fn insert_agent(&mut self, agent: Agent) {
        let id = agent.id;
        let scratch = AgentScratch::for_specialization(agent.specialization);
        self.agents.insert(id, agent);
        self.order.push(id);
        self.scratches.push(scratch);
    }

    /// Remove an agent from the arena, severing its index entries. The
    /// genealogy record is retained so surviving relatives still classify
    /// correctly.
    pub fn remove_agent(&mut self, id: AgentId) -> Option<Agent> {
        let agent = self.agents.remove(&id)?;
        if let Some(idx) = self.order.iter().position(|&o| o == id) {
            self.order.remove(idx);
            self.scratches.remove(idx);
        }
        Some(agent)
    }

    pub fn agent(&self, id: AgentId) -> Option<&Agent> {
        self.agents.get(&id)
    }

    pub fn agent_mut(&mut self, id: AgentId) -> Option<&mut Agent> {
        self.agents.get_mut(&id)
    }

    pub fn agent_count(&self) -> usize {
        self.agents.len()
    }

    pub fn agent_ids(&self) -> &[AgentId] {
        &self.order
    }

    pub fn agents(&self) -> impl Iterator<Item = &Agent> {
        self.order.iter().filter_map(|id| self.agents.get(id))
    }

    /// Split borrows for the parallel perceive/decide phase: shared views of
    /// everything committed, exclusive slices of the scratch buffers
    pub fn decision_buffers(&mut self) -> DecisionBuffers<'_> {
        DecisionBuffers {
            agents: &self.agents,
            order: &self.order,
            scratches: &mut self.scratches,
            grid: &self.grid,
            foods: &self.foods,
            obstacles: &self.obstacles,
            pulses: &self.pulses,
            vocals: &self.vocals,
            config: &self.config,
        }
    }

    /// Scratch buffer for the arena slot at `index`, aligned with
    /// [`World::agent_ids`]
    pub fn scratch(&self, index: usize) -> Option<&AgentScratch> {
        self.scratches.get(index)
    }

    /// Mutable agent access alongside the world RNG, for paths that mutate
    /// an agent and draw randomness in the same expression
    pub fn agent_mut_with_rng(&mut self, id: AgentId) -> Option<(&mut Agent, &mut ChaCha8Rng)> {
        let agent = self.agents.get_mut(&id)?;
        Some((agent, &mut self.rng))
    }

    /// Spawn a child from a birth or split seed, registering its lineage and
    /// crediting the parents' offspring lists
    pub fn spawn_child(
        &mut self,
        seed: AgentSeed,
        parent1: AgentId,
        parent2: Option<AgentId>,
    ) -> AgentId {
        let generation = seed.generation;
        let agent = Agent::spawn(seed, &self.config, &mut self.rng);
        let id = agent.id;
        self.genealogy
            .insert(GenealogyRecord::child(id, parent1, parent2, generation));
        self.genealogy.record_offspring(parent1, id);
        if let Some(p2) = parent2 {
            self.genealogy.record_offspring(p2, id);
        }
        self.insert_agent(agent);
        id
    }

    /// Rebuild the spatial index from committed positions. Called exactly
    /// once per tick before any queries.
    pub fn rebuild_index(&mut self) {
        let agents = self.order.iter().filter_map(|id| {
            let a = self.agents.get(id)?;
            Some(SpatialEntry {
                target: SpatialRef::Agent(a.id),
                position: a.position,
                radius: a.size,
            })
        });
        let foods = self.foods.iter().enumerate().map(|(i, f)| SpatialEntry {
            target: SpatialRef::Food(i),
            position: f.position,
            radius: f.size,
        });
        let pulses = self.pulses.iter().enumerate().map(|(i, p)| SpatialEntry {
            target: SpatialRef::Pulse(i),
            position: p.position,
            radius: 1.0,
        });
        // Collect first: the grid borrow conflicts with the entity borrows
        let entries: Vec<SpatialEntry> = agents.chain(foods).chain(pulses).collect();
        self.grid.rebuild(entries.into_iter());
    }

    /// Snapshot living fitness scores for this tick's normalization
    pub fn population_view(&self) -> PopulationView {
        PopulationView::from_fitnesses(
            self.agents
                .values()
                .filter(|a| !a.is_dead())
                .map(|a| a.fitness)
                .collect(),
        )
    }

    /// Ambient temperature after the driver's modifier and seasonal swing
    pub fn ambient_temperature(&self) -> f32 {
        let seasonal = (self.season_phase * std::f32::consts::TAU).sin() * 6.0;
        self.config.thermal.ambient_baseline + seasonal + self.ambient_modifier
    }
}
