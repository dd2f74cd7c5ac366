//! The fitness engine: scoring lifetimes and gating the gene pool
//!
//! Fitness is a weighted sum over lifetime counters, recomputed on a fixed
//! cadence and on reproduction attempts. Gene-pool qualification is
//! separate and stricter: an agent can carry a respectable score and still
//! fail the criteria that prove it actually lived well.

use crate::agent::specialization::Specialization;
use crate::agent::Agent;
use crate::core::config::FitnessConfig;

/// Per-criterion breakdown of a qualification check
#[derive(Debug, Clone, Copy, Default)]
pub struct Qualification {
    pub score: bool,
    pub food: bool,
    pub longevity: bool,
    pub exploration: bool,
    pub navigation: bool,
    pub qualified: bool,
}

/// Compute an agent's fitness score from its lifetime counters
pub fn calculate_fitness(agent: &Agent, config: &FitnessConfig) -> f32 {
    let stats = &agent.stats;
    let seconds_alive = agent.frames_alive as f32 / config.ticks_per_second;

    let efficiency = raw_efficiency(agent).min(config.efficiency_cap);
    let survival = (seconds_alive - config.survival_threshold_secs)
        .clamp(0.0, config.survival_cap);

    let mut score = 0.0;
    score += stats.offspring as f32 * config.weight_offspring;
    score += stats.goal_completions as f32 * config.weight_goal_completions;
    score += stats.reproduction_attempts as f32 * config.weight_reproduction_attempts;
    score += agent.exploration.coverage() * config.weight_exploration;
    score += stats.food_eaten as f32 * config.weight_food;
    score += stats.kills as f32 * config.weight_kills;
    score += stats.clever_turns as f32 * config.weight_clever_turns;
    score += (stats.turns_toward_food + stats.obstacle_avoidances) as f32
        * config.weight_navigation;
    score += stats.distance_traveled * config.weight_distance;
    score += efficiency * config.weight_efficiency;
    // Symmetric thermal term: time active above the threshold earns the
    // weight, time below it costs the same weight
    score += (thermal_activity(agent) - config.thermal_active_threshold)
        * config.weight_thermal_activity;
    score += survival * config.weight_survival;
    score += job_performance(agent) * config.weight_job_performance;

    score -= stats.collisions as f32 * config.penalty_collisions;
    score -= stats.circling_frames as f32 * config.penalty_circling;
    score -= stats.low_activity_frames as f32 * config.penalty_inactivity;
    if efficiency < 1.0 && stats.energy_spent > 1.0 {
        score -= (1.0 - efficiency) * config.penalty_inefficiency;
    }

    score.max(0.0)
}

/// Distance covered per unit of energy spent, the core thriftiness signal
fn raw_efficiency(agent: &Agent) -> f32 {
    if agent.stats.energy_spent <= 1.0 {
        return 0.0;
    }
    agent.stats.distance_traveled / agent.stats.energy_spent
}

/// Fraction of life spent moving outside the optimal thermal band, in [0, 1]
fn thermal_activity(agent: &Agent) -> f32 {
    if agent.frames_alive == 0 {
        return 0.0;
    }
    (agent.stats.thermal_active_frames as f32 / agent.frames_alive as f32).min(1.0)
}

/// How well the agent performs the job its specialization exists for
///
/// Each score is normalized so a competent specialist lands near 1.0 over a
/// moderate lifetime; the weight does the rest. Pursuit, flocking, and
/// guarding read the per-tick neighbor snapshot cached on the agent.
fn job_performance(agent: &Agent) -> f32 {
    let stats = &agent.stats;
    let social = &agent.social;
    let lifetime = (agent.frames_alive as f32).max(1.0);
    match agent.specialization {
        Specialization::Forager => {
            let food_rate = (stats.food_eaten as f32 / (lifetime / 600.0)).min(2.0);
            (food_rate + flocking_alignment(social)).min(3.0)
        }
        Specialization::Predator => {
            let kill_rate = (stats.kills as f32 / (lifetime / 1800.0)).min(2.0);
            (kill_rate + social.prey_closeness).min(3.0)
        }
        Specialization::Scout => {
            (agent.exploration.coverage() * 2.0 + flocking_alignment(social)).min(3.0)
        }
        Specialization::Defender => (social.guarded as f32 * 0.5).min(3.0),
        Specialization::Reproducer => (stats.offspring as f32 / (lifetime / 1200.0)).min(3.0),
    }
}

/// Heading agreement with same-specialization neighbors; lone agents earn
/// nothing and anti-aligned groups earn nothing
fn flocking_alignment(social: &crate::agent::NeighborSnapshot) -> f32 {
    if social.allies == 0 {
        return 0.0;
    }
    social.ally_alignment.max(0.0)
}

/// Evaluate the five gene-pool criteria
///
/// All five must pass, unless exactly one fails and the score clears the
/// exceptional override.
pub fn qualify(agent: &Agent, fitness: f32, config: &FitnessConfig) -> Qualification {
    let seconds_alive = agent.frames_alive as f32 / config.ticks_per_second;
    let mut q = Qualification {
        score: fitness >= config.min_score,
        food: agent.stats.food_eaten >= config.min_food_eaten,
        longevity: seconds_alive >= config.min_seconds_alive,
        exploration: agent.exploration.coverage() >= config.min_exploration_pct,
        navigation: agent.stats.turns_toward_food >= config.min_turns_toward_food,
        qualified: false,
    };
    let passed = [q.score, q.food, q.longevity, q.exploration, q.navigation]
        .iter()
        .filter(|&&p| p)
        .count();
    q.qualified = passed == 5 || (passed == 4 && fitness >= config.exceptional_score_override);
    q
}

/// Recompute and store the agent's fitness and gene-pool flag
pub fn refresh(agent: &mut Agent, config: &FitnessConfig) {
    let score = calculate_fitness(agent, config);
    agent.fitness = score;
    agent.fit_for_gene_pool = qualify(agent, score, config).qualified;
}
