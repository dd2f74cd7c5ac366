//! The agent: identity, physical state, behavioral state, cognition, and
//! lifetime bookkeeping
//!
//! Agents live in a flat arena keyed by [`AgentId`]; nothing in here holds
//! an owning reference to the population, the world, or another agent.
//! Death is flagged exactly once and cleanup is an index removal.

pub mod genealogy;
pub mod memory;
pub mod specialization;

use serde::{Deserialize, Serialize};

use crate::brain::Brain;
use crate::core::config::SimulationConfig;
use crate::core::types::{AgentId, GeneId, Tick, Vec2};
use crate::perception::features::input_size;
use memory::{Goal, GoalMemory, ShortTermMemory, TargetMemory};
use specialization::Specialization;

/// Frames a recent-event flag stays raised
const EVENT_FLAG_FRAMES: u32 = 30;

/// Frames between per-frame cache refreshes
pub const CACHE_REFRESH_FRAMES: u64 = 5;

/// Side length of the coarse exploration grid (cells per axis)
pub const EXPLORATION_CELLS: usize = 16;

/// Minimum body radius regardless of energy
pub const MIN_SIZE: f32 = 3.0;

/// Heritable physical traits, drifted at birth with a specialization bias
///
/// Clamped to [0.5, 1.5] like every multiplicative trait in the system.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PhysicalTraits {
    /// Multiplier on thrust and top speed, capped by the specialization
    pub speed_factor: f32,
    /// Multiplier on ray range
    pub vision_factor: f32,
    /// Multiplier on metabolic cost and collision durability
    pub bulk_factor: f32,
}

impl Default for PhysicalTraits {
    fn default() -> Self {
        Self {
            speed_factor: 1.0,
            vision_factor: 1.0,
            bulk_factor: 1.0,
        }
    }
}

/// Active pregnancy: the partner is looked up again at birth, so a partner
/// that died in the meantime degrades to single-parent inheritance
#[derive(Debug, Clone)]
pub struct Pregnancy {
    pub partner: AgentId,
    pub partner_gene: GeneId,
    pub ticks_remaining: u32,
}

/// Lifetime counters feeding the fitness engine
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct LifetimeStats {
    pub offspring: u32,
    pub kills: u32,
    pub food_eaten: u32,
    pub collisions: u32,
    pub distance_traveled: f32,
    pub energy_spent: f32,
    pub reproduction_attempts: u32,
    pub goal_completions: u32,
    pub clever_turns: u32,
    pub turns_toward_food: u32,
    pub obstacle_avoidances: u32,
    pub circling_frames: u32,
    pub low_activity_frames: u32,
    pub thermal_active_frames: u32,
}

/// Countdown flags for the five binary recent-event perception inputs
#[derive(Debug, Clone, Copy, Default)]
pub struct RecentEvents {
    ate: u32,
    was_attacked: u32,
    attacked: u32,
    reproduced: u32,
    collided: u32,
}

impl RecentEvents {
    pub fn flag_ate(&mut self) {
        self.ate = EVENT_FLAG_FRAMES;
    }
    pub fn flag_was_attacked(&mut self) {
        self.was_attacked = EVENT_FLAG_FRAMES;
    }
    pub fn flag_attacked(&mut self) {
        self.attacked = EVENT_FLAG_FRAMES;
    }
    pub fn flag_reproduced(&mut self) {
        self.reproduced = EVENT_FLAG_FRAMES;
    }
    pub fn flag_collided(&mut self) {
        self.collided = EVENT_FLAG_FRAMES;
    }

    pub fn tick(&mut self) {
        self.ate = self.ate.saturating_sub(1);
        self.was_attacked = self.was_attacked.saturating_sub(1);
        self.attacked = self.attacked.saturating_sub(1);
        self.reproduced = self.reproduced.saturating_sub(1);
        self.collided = self.collided.saturating_sub(1);
    }

    /// The five flags as binary perception inputs
    pub fn as_inputs(&self) -> [f32; 5] {
        [
            f32::from(u8::from(self.ate > 0)),
            f32::from(u8::from(self.was_attacked > 0)),
            f32::from(u8::from(self.attacked > 0)),
            f32::from(u8::from(self.reproduced > 0)),
            f32::from(u8::from(self.collided > 0)),
        ]
    }
}

/// Coarse visited-cell bitset backing the exploration fitness term
#[derive(Debug, Clone, Copy, Default)]
pub struct ExplorationGrid {
    cells: [u64; 4],
}

impl ExplorationGrid {
    pub fn visit(&mut self, position: Vec2, world_width: f32, world_height: f32) {
        if !position.is_finite() || world_width <= 0.0 || world_height <= 0.0 {
            return;
        }
        let cx = ((position.x / world_width) * EXPLORATION_CELLS as f32)
            .clamp(0.0, EXPLORATION_CELLS as f32 - 1.0) as usize;
        let cy = ((position.y / world_height) * EXPLORATION_CELLS as f32)
            .clamp(0.0, EXPLORATION_CELLS as f32 - 1.0) as usize;
        let bit = cy * EXPLORATION_CELLS + cx;
        self.cells[bit / 64] |= 1u64 << (bit % 64);
    }

    /// Fraction of world cells visited, in [0, 1]
    pub fn coverage(&self) -> f32 {
        let visited: u32 = self.cells.iter().map(|c| c.count_ones()).sum();
        visited as f32 / (EXPLORATION_CELLS * EXPLORATION_CELLS) as f32
    }
}

/// Pheromone intensities smelled last tick, one per trail type
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct SmellState {
    pub danger: f32,
    pub attack: f32,
    pub mating: f32,
}

/// Aggregated vocal-signal intensities heard last tick
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct HeardState {
    pub predator_alert: f32,
    pub food_found: f32,
    pub help_request: f32,
    pub mate_call: f32,
}

/// Per-frame derived values, refreshed on a fixed cadence instead of every
/// tick
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameCache {
    pub speed: f32,
    pub target_distance: f32,
    pub target_angle: f32,
    pub refreshed_at: Tick,
}

/// Digest of the last tick's neighbor query, cached for the fitness engine
///
/// Refreshed every tick from the perception pass, unlike [`FrameCache`]
/// which runs on a slower cadence.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeighborSnapshot {
    /// Same-specialization neighbors in sensor range
    pub allies: u32,
    /// Mean heading alignment with those allies, in [-1, 1]; 0 when alone
    pub ally_alignment: f32,
    /// Smaller non-predator neighbors inside guard range
    pub guarded: u32,
    /// Closeness of the nearest prey, 0 when none in range
    pub prey_closeness: f32,
}

/// Everything needed to construct an agent
pub struct AgentSeed {
    pub position: Vec2,
    pub energy: f32,
    pub specialization: Specialization,
    /// Inherited weight blob; `None` means fresh random weights
    pub weights: Option<Vec<f32>>,
    /// Lineage tag; `None` mints a new one
    pub gene_id: Option<GeneId>,
    pub generation: u32,
    pub traits: PhysicalTraits,
}

/// The central entity
#[derive(Debug)]
pub struct Agent {
    // Identity
    pub id: AgentId,
    pub gene_id: GeneId,
    pub generation: u32,
    pub specialization: Specialization,

    // Physical state
    pub position: Vec2,
    pub velocity: Vec2,
    pub angle: f32,
    pub size: f32,
    pub energy: f32,
    pub temperature: f32,
    pub traits: PhysicalTraits,

    // Behavioral state
    pub hunger: f32,
    pub fear: f32,
    pub aggression: f32,
    /// Predator-only burst response; always 0 for other specializations
    pub adrenaline: f32,
    pub pregnancy: Option<Pregnancy>,
    pub reproduction_cooldown: u32,

    // Cognition
    pub brain: Brain,
    pub hidden: Vec<f32>,
    pub memory: ShortTermMemory,
    pub target: Option<TargetMemory>,
    pub goal: GoalMemory,

    // Movement smoothing state (recomputed thresholds, persisted magnitudes)
    pub thrust: f32,
    pub rotation: f32,
    pub sprint_level: f32,
    pub resting: bool,
    pub braking: bool,
    pub prev_angle: f32,

    // Bookkeeping
    pub frames_alive: u64,
    pub spawned_wallclock: std::time::Instant,
    pub stats: LifetimeStats,
    pub events: RecentEvents,
    pub exploration: ExplorationGrid,
    pub smell: SmellState,
    pub heard: HeardState,
    pub current_shout: Option<crate::signaling::VocalKind>,
    /// Last tick's resolved sensor rays, exposed read-only for display
    pub last_ray_hits: Vec<crate::perception::rays::RayHit>,
    pub attack_damage_decay: f32,
    pub collision_damage_decay: f32,

    // Derived / cached
    pub fitness: f32,
    pub fit_for_gene_pool: bool,
    pub cache: FrameCache,
    pub social: NeighborSnapshot,
    dead: bool,
}

impl Agent {
    /// Construct an agent from a seed
    ///
    /// Malformed energy is substituted with the configured starting energy
    /// and logged; an incompatible weight blob is discarded for fresh random
    /// weights. Neither condition is an error.
    pub fn spawn(seed: AgentSeed, config: &SimulationConfig, rng: &mut impl rand::Rng) -> Self {
        let energy = if seed.energy.is_finite() && seed.energy > 0.0 {
            seed.energy.min(config.energy.max_energy)
        } else {
            tracing::warn!(
                energy = seed.energy,
                "agent seeded with invalid energy, using starting baseline"
            );
            config.energy.starting_energy
        };

        let spec = seed.specialization;
        let n_inputs = input_size(spec);
        let hidden_size = spec.hidden_size();

        let weights_absent = seed.weights.is_none();
        let (brain, regenerated) = match seed.weights {
            Some(blob) => Brain::from_blob(n_inputs, hidden_size, blob, rng),
            None => (Brain::new_random(n_inputs, hidden_size, rng), true),
        };
        // A discarded blob is a new lineage even if the seed carried a gene
        // id; fresh random founders may still keep a supplied id
        let gene_id = match seed.gene_id {
            Some(g) if !regenerated || weights_absent => g,
            _ => GeneId::new(),
        };

        let angle = rng.gen_range(0.0..std::f32::consts::TAU);
        let mut traits = seed.traits;
        traits.speed_factor = traits.speed_factor.clamp(0.5, spec.speed_cap().min(1.5));
        traits.vision_factor = traits.vision_factor.clamp(0.5, 1.5);
        traits.bulk_factor = traits.bulk_factor.clamp(0.5, 1.5);

        Self {
            id: AgentId::new(),
            gene_id,
            generation: seed.generation,
            specialization: spec,
            position: seed.position,
            velocity: Vec2::default(),
            angle,
            size: size_for_energy(energy),
            energy,
            temperature: config.thermal.ambient_baseline,
            traits,
            hunger: 0.5,
            fear: 0.0,
            aggression: 0.0,
            adrenaline: 0.0,
            pregnancy: None,
            reproduction_cooldown: 0,
            brain,
            hidden: vec![0.0; hidden_size],
            memory: ShortTermMemory::new(),
            target: None,
            goal: GoalMemory::new(Goal::SeekFood, 0.5, 0),
            thrust: 0.0,
            rotation: 0.0,
            sprint_level: 0.0,
            resting: false,
            braking: true,
            prev_angle: angle,
            frames_alive: 0,
            spawned_wallclock: std::time::Instant::now(),
            stats: LifetimeStats::default(),
            events: RecentEvents::default(),
            exploration: ExplorationGrid::default(),
            smell: SmellState::default(),
            heard: HeardState::default(),
            current_shout: None,
            last_ray_hits: Vec::new(),
            attack_damage_decay: 0.0,
            collision_damage_decay: 0.0,
            fitness: 0.0,
            fit_for_gene_pool: false,
            cache: FrameCache::default(),
            social: NeighborSnapshot::default(),
            dead: false,
        }
    }

    pub fn is_dead(&self) -> bool {
        self.dead
    }

    /// Flag the agent dead. Returns true only on the first call so cleanup
    /// stays idempotent.
    pub fn mark_dead(&mut self) -> bool {
        if self.dead {
            return false;
        }
        self.dead = true;
        tracing::debug!(agent = ?self.id, spec = self.specialization.name(), frames = self.frames_alive, "agent died");
        true
    }

    /// Clamp energy into [0, max] and record what was spent
    pub fn spend_energy(&mut self, amount: f32, max_energy: f32) {
        if amount > 0.0 {
            self.stats.energy_spent += amount;
        }
        self.energy = (self.energy - amount).clamp(0.0, max_energy);
    }

    pub fn gain_energy(&mut self, amount: f32, max_energy: f32) {
        self.energy = (self.energy + amount).clamp(0.0, max_energy);
    }

    /// Smoothly interpolate body size toward the energy-derived target
    pub fn settle_size(&mut self) {
        let target = size_for_energy(self.energy);
        self.size += (target - self.size) * 0.1;
        self.size = self.size.max(MIN_SIZE);
    }

    /// Seconds since construction, real time
    pub fn wall_age_secs(&self) -> f32 {
        self.spawned_wallclock.elapsed().as_secs_f32()
    }

    /// Effective ray range after the vision trait
    pub fn ray_range(&self) -> f32 {
        self.specialization.ray_range() * self.traits.vision_factor
    }

    /// Refresh the per-frame cache when the cadence has elapsed
    pub fn refresh_cache(&mut self, now: Tick) {
        if now.saturating_sub(self.cache.refreshed_at) < CACHE_REFRESH_FRAMES
            && self.cache.refreshed_at != 0
        {
            return;
        }
        self.cache.speed = self.velocity.length();
        if let Some(target) = self.target {
            let to_target = target.position - self.position;
            self.cache.target_distance = to_target.length();
            self.cache.target_angle = to_target.y.atan2(to_target.x) - self.angle;
        } else {
            self.cache.target_distance = 0.0;
            self.cache.target_angle = 0.0;
        }
        self.cache.refreshed_at = now;
    }

    /// Swap the active goal, crediting completion of the old one when the
    /// new goal arrives with a lower priority (the old objective resolved
    /// rather than being preempted)
    pub fn set_goal(&mut self, goal: Goal, priority: f32, now: Tick) {
        if self.goal.goal != goal {
            if priority < self.goal.priority {
                self.stats.goal_completions += 1;
            }
            self.goal = GoalMemory::new(goal, priority, now);
        } else {
            self.goal.priority = priority;
        }
    }
}

impl AgentSeed {
    /// New founder seed with random weights
    pub fn founder(position: Vec2, energy: f32, specialization: Specialization) -> Self {
        Self {
            position,
            energy,
            specialization,
            weights: None,
            gene_id: None,
            generation: 0,
            traits: PhysicalTraits::default(),
        }
    }
}

/// Body radius derived from energy
pub fn size_for_energy(energy: f32) -> f32 {
    (MIN_SIZE + energy.max(0.0).sqrt() * 0.45).max(MIN_SIZE)
}
