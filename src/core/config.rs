//! Simulation configuration with documented constants
//!
//! All magic numbers are collected here with explanations of their purpose
//! and how they interact with each other. Values can be overridden from a
//! TOML file; anything omitted falls back to the tuned default.

use serde::{Deserialize, Serialize};

use crate::core::error::{FaunaError, Result};

/// Top-level configuration for the simulation core
///
/// These values have been tuned to produce interesting evolutionary
/// dynamics. Changing them shifts the balance between survival pressure
/// and reproductive opportunity.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub world: WorldConfig,
    pub energy: EnergyConfig,
    pub movement: MovementConfig,
    pub thermal: ThermalConfig,
    pub signals: SignalConfig,
    pub reproduction: ReproductionConfig,
    pub fitness: FitnessConfig,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            world: WorldConfig::default(),
            energy: EnergyConfig::default(),
            movement: MovementConfig::default(),
            thermal: ThermalConfig::default(),
            signals: SignalConfig::default(),
            reproduction: ReproductionConfig::default(),
            fitness: FitnessConfig::default(),
        }
    }
}

impl SimulationConfig {
    /// Parse a config from TOML text, falling back to defaults for any
    /// omitted section or field
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| FaunaError::ConfigError(e.to_string()))
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| FaunaError::ConfigError(e.to_string()))
    }
}

/// World geometry and population seeding
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// World width in world units
    pub width: f32,

    /// World height in world units
    pub height: f32,

    /// Seed for the world RNG. Runs with the same seed, config, and tick
    /// count replay identically on the same hardware.
    pub seed: u64,

    /// Number of agents spawned at startup with random weights
    pub initial_population: u32,

    /// Size of each cell in the spatial hash grid (world units)
    ///
    /// Should be roughly 1/4 of the longest specialization ray range for a
    /// good balance between cell count and per-query filtering work.
    pub grid_cell_size: f32,

    /// Number of food items maintained by the headless runner
    pub food_target: u32,

    /// Energy granted by a standard food item
    pub food_energy: f32,

    /// Probability per tick that a fresh food item is high-value (worth
    /// double energy). Rare on purpose so agents that learn to chase these
    /// get a real edge.
    pub high_value_food_chance: f32,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            width: 2000.0,
            height: 2000.0,
            seed: 42,
            initial_population: 60,
            grid_cell_size: 64.0,
            food_target: 200,
            food_energy: 35.0,
            high_value_food_chance: 0.05,
        }
    }
}

/// Energy budget: every cost an agent pays per tick lives here
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnergyConfig {
    /// Hard ceiling on agent energy. Size is derived from energy, so this
    /// also bounds how large agents can grow.
    pub max_energy: f32,

    /// Energy granted to agents at initial spawn
    pub starting_energy: f32,

    /// Passive metabolic loss per tick before size/temperature scaling
    ///
    /// At 0.02 an idle agent in the optimal thermal band survives roughly
    /// 10k ticks on a full energy bar. Halved while resting.
    pub metabolic_rate: f32,

    /// Movement cost multiplier applied to velocity-squared
    pub movement_cost_scale: f32,

    /// Cap on per-tick movement cost so sprint bursts drain fast but never
    /// instantly kill
    pub movement_cost_cap: f32,

    /// Rotation cost multiplier applied to the smoothed rotation magnitude
    pub rotation_cost_scale: f32,

    /// Fraction of max energy above which the obesity tax starts skimming
    pub obesity_threshold: f32,

    /// Fraction of the excess-above-threshold skimmed per tick
    pub obesity_tax_rate: f32,

    /// Energy charged for each wall or obstacle collision
    pub collision_penalty: f32,

    /// Energy cost of sprinting at full intensity for one tick, scaled down
    /// linearly with intensity
    pub sprint_cost: f32,
}

impl Default for EnergyConfig {
    fn default() -> Self {
        Self {
            max_energy: 312.5,
            starting_energy: 150.0,
            metabolic_rate: 0.02,
            movement_cost_scale: 0.004,
            movement_cost_cap: 0.6,
            rotation_cost_scale: 0.05,
            obesity_threshold: 0.85,
            obesity_tax_rate: 0.002,
            collision_penalty: 2.0,
            sprint_cost: 0.25,
        }
    }
}

/// Thrust, rotation, and collision response tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MovementConfig {
    /// Smoothing constant while thrust magnitude is increasing
    ///
    /// Higher = snappier acceleration. All three smoothing constants are
    /// exponential interpolation factors in (0, 1].
    pub accel_smoothing: f32,

    /// Smoothing constant while thrust magnitude is decreasing
    pub decel_smoothing: f32,

    /// Smoothing constant during emergency braking (high danger smell or a
    /// dense burst of ray hits). Deliberately the largest of the three so
    /// panicked agents stop almost immediately.
    pub emergency_smoothing: f32,

    /// Thrust magnitude below which the agent is considered braking
    pub thrust_deadzone: f32,

    /// Per-tick velocity retention (1.0 = frictionless)
    pub drag: f32,

    /// Velocity magnitude clamp before specialization speed caps
    pub max_speed: f32,

    /// Extra velocity multiplier at full sprint intensity
    pub sprint_speed_bonus: f32,

    /// Rotation momentum: fraction of last tick's rotation carried forward
    pub rotation_momentum: f32,

    /// How strongly speed degrades rotation authority. At 0.5, an agent at
    /// max speed turns at half rate, which forces braking before tight turns.
    pub rotation_efficiency_penalty: f32,

    /// Minimum outward speed applied when un-embedding from a collision
    pub min_push_speed: f32,

    /// Danger-smell intensity above which emergency braking engages
    pub emergency_danger_threshold: f32,

    /// Ray hits per frame above which emergency braking engages
    pub emergency_ray_hits: usize,
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            accel_smoothing: 0.25,
            decel_smoothing: 0.12,
            emergency_smoothing: 0.6,
            thrust_deadzone: 0.08,
            drag: 0.94,
            max_speed: 6.0,
            sprint_speed_bonus: 0.7,
            rotation_momentum: 0.35,
            rotation_efficiency_penalty: 0.5,
            min_push_speed: 0.4,
            emergency_danger_threshold: 0.7,
            emergency_ray_hits: 6,
        }
    }
}

/// Body temperature dynamics and the five-band efficiency curve
///
/// Temperature rises with movement and cools toward ambient. The band an
/// agent sits in multiplies both its passive metabolic loss and its
/// thrust/rotation gain, so thermal management is a real survival skill.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ThermalConfig {
    /// Lower clamp on body temperature
    pub min_temperature: f32,

    /// Upper clamp on body temperature
    pub max_temperature: f32,

    /// Band edges, ascending: severe-cold | moderate-cold | optimal |
    /// moderate-heat | severe-heat. Four edges split the range into five
    /// bands.
    pub band_edges: [f32; 4],

    /// Efficiency multiplier per band, same order as the bands
    pub band_multipliers: [f32; 5],

    /// Temperature gained per unit of speed per tick
    pub heat_per_speed: f32,

    /// Passive cooling rate toward ambient per tick
    pub cooling_rate: f32,

    /// Baseline ambient temperature before the driver's seasonal modifier
    pub ambient_baseline: f32,
}

impl Default for ThermalConfig {
    fn default() -> Self {
        Self {
            min_temperature: 0.0,
            max_temperature: 40.0,
            band_edges: [8.0, 14.0, 24.0, 32.0],
            band_multipliers: [0.45, 0.75, 1.0, 0.8, 0.5],
            heat_per_speed: 0.08,
            cooling_rate: 0.02,
            ambient_baseline: 18.0,
        }
    }
}

/// Pheromone trails and vocal signals
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalConfig {
    /// Radius within which pheromone trails are smelled
    pub pheromone_radius: f32,

    /// Ticks a pheromone trail lasts before fully decaying
    pub pheromone_lifetime: u32,

    /// Fear/aggression/mating-intent level above which emission becomes
    /// possible
    pub emission_threshold: f32,

    /// Per-tick emission probability once over the threshold. Kept low so
    /// trails stay sparse and meaningful.
    pub emission_chance: f32,

    /// Radius within which vocal signals are heard (much longer than smell)
    pub vocal_radius: f32,

    /// Ticks a vocal signal remains audible. Defender alerts last twice
    /// this long.
    pub vocal_duration: u32,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            pheromone_radius: 90.0,
            pheromone_lifetime: 240,
            emission_threshold: 0.6,
            emission_chance: 0.15,
            vocal_radius: 350.0,
            vocal_duration: 45,
        }
    }
}

/// Mating gates, pregnancy, and mutation tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReproductionConfig {
    /// Frames an agent must have lived before it can mate
    pub maturity_frames: u64,

    /// Minimum energy required to propose or accept mating
    pub min_energy_to_reproduce: f32,

    /// Ticks of cooldown after a successful mating
    pub mating_cooldown: u32,

    /// Energy each party pays on a successful mating
    pub mating_energy_cost: f32,

    /// Ticks from conception to birth
    pub pregnancy_duration: u32,

    /// Fraction of max energy above which the asexual split path triggers
    pub split_energy_fraction: f32,

    /// Post-split cooldown as a multiple of the standard mating cooldown
    pub split_cooldown_factor: f32,

    /// Mutation rate applied to a split clone, as a fraction of the
    /// standard rate. Clones are meant to be near-copies.
    pub split_mutation_scale: f32,

    /// Base Gaussian mutation rate for sexual offspring
    pub mutation_rate: f32,

    /// Probability that a birth flips the child to a random different
    /// specialization. Forces fresh weights and a new gene id because
    /// hidden-layer widths differ between specializations.
    pub specialization_mutation_chance: f32,

    /// Fraction of the proposer's own mate-quality score a candidate must
    /// reach. At 0.5 agents accept partners half as attractive as
    /// themselves, keeping the mating market liquid.
    pub mate_quality_floor: f32,

    /// Physical trait drift magnitude applied at birth before the
    /// specialization bias
    pub trait_drift: f32,

    /// Cap on the genealogy offspring list; oldest entries evicted first
    pub offspring_list_cap: usize,
}

impl Default for ReproductionConfig {
    fn default() -> Self {
        Self {
            maturity_frames: 600,
            min_energy_to_reproduce: 80.0,
            mating_cooldown: 400,
            mating_energy_cost: 25.0,
            pregnancy_duration: 300,
            split_energy_fraction: 0.8,
            split_cooldown_factor: 1.5,
            split_mutation_scale: 0.3,
            mutation_rate: 0.08,
            specialization_mutation_chance: 0.02,
            mate_quality_floor: 0.5,
            trait_drift: 0.05,
            offspring_list_cap: 12,
        }
    }
}

/// Fitness term weights and gene-pool qualification thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FitnessConfig {
    /// Ticks between fitness recomputation. Also recomputed on reproduction
    /// attempts so mate-quality scores are never stale.
    pub fitness_interval: u64,

    /// Simulation ticks per wall-clock second, used to convert the
    /// frames-alive counter into the seconds-alive criterion
    pub ticks_per_second: f32,

    pub weight_offspring: f32,
    pub weight_goal_completions: f32,
    pub weight_reproduction_attempts: f32,
    pub weight_exploration: f32,
    pub weight_food: f32,
    pub weight_kills: f32,
    pub weight_clever_turns: f32,
    pub weight_navigation: f32,
    pub weight_distance: f32,
    pub weight_efficiency: f32,
    pub weight_thermal_activity: f32,
    pub weight_survival: f32,
    pub weight_job_performance: f32,

    pub penalty_collisions: f32,
    pub penalty_circling: f32,
    pub penalty_inefficiency: f32,
    pub penalty_inactivity: f32,

    /// Efficiency term cap (distance per energy spent can explode for
    /// agents that barely move)
    pub efficiency_cap: f32,

    /// Fraction of life spent thermally active that counts as break-even.
    /// Time above earns the thermal weight as a bonus, time below costs it.
    pub thermal_active_threshold: f32,

    /// Survival bonus only starts accruing past this many seconds alive
    pub survival_threshold_secs: f32,

    /// Survival bonus cap
    pub survival_cap: f32,

    // Gene-pool qualification: five criteria, pass with all five or with
    // four when the score clears the exceptional override.
    pub min_score: f32,
    pub min_food_eaten: u32,
    pub min_seconds_alive: f32,
    pub min_exploration_pct: f32,
    pub min_turns_toward_food: u32,
    pub exceptional_score_override: f32,
}

impl Default for FitnessConfig {
    fn default() -> Self {
        Self {
            fitness_interval: 30,
            ticks_per_second: 30.0,
            weight_offspring: 40.0,
            weight_goal_completions: 6.0,
            weight_reproduction_attempts: 1.5,
            weight_exploration: 50.0,
            weight_food: 8.0,
            weight_kills: 25.0,
            weight_clever_turns: 3.0,
            weight_navigation: 2.0,
            weight_distance: 0.01,
            weight_efficiency: 12.0,
            weight_thermal_activity: 10.0,
            weight_survival: 0.5,
            weight_job_performance: 15.0,
            penalty_collisions: 1.2,
            penalty_circling: 0.02,
            penalty_inefficiency: 8.0,
            penalty_inactivity: 0.01,
            efficiency_cap: 4.0,
            thermal_active_threshold: 0.25,
            survival_threshold_secs: 30.0,
            survival_cap: 60.0,
            min_score: 120.0,
            min_food_eaten: 3,
            min_seconds_alive: 45.0,
            min_exploration_pct: 0.08,
            min_turns_toward_food: 5,
            exceptional_score_override: 300.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_round_trips_toml() {
        let config = SimulationConfig::default();
        let text = config.to_toml_string().unwrap();
        let parsed = SimulationConfig::from_toml_str(&text).unwrap();
        assert_eq!(parsed.energy.max_energy, config.energy.max_energy);
        assert_eq!(parsed.world.seed, config.world.seed);
        assert_eq!(
            parsed.reproduction.mating_cooldown,
            config.reproduction.mating_cooldown
        );
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = SimulationConfig::from_toml_str(
            r#"
            [world]
            seed = 7
            "#,
        )
        .unwrap();
        assert_eq!(config.world.seed, 7);
        assert_eq!(
            config.energy.max_energy,
            EnergyConfig::default().max_energy
        );
    }

    #[test]
    fn test_thermal_bands_are_ascending() {
        let t = ThermalConfig::default();
        for pair in t.band_edges.windows(2) {
            assert!(pair[0] < pair[1]);
        }
    }
}
