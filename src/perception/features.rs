//! Input-vector assembly
//!
//! The controller input is `num_sensor_rays * 5` ray channels, one
//! distance-only channel per alignment ray, then a fixed block of
//! [`FIXED_SCALAR_COUNT`] scalars. The width is fixed per specialization
//! and asserted at controller construction; every writer below fills its
//! slots unconditionally so the layout never drifts.

use crate::agent::memory::{Goal, TargetKind, MEMORY_FRAMES};
use crate::agent::specialization::Specialization;
use crate::agent::Agent;
use crate::core::config::SimulationConfig;
use crate::core::types::Tick;
use crate::movement::thermal;
use crate::perception::Percept;

/// Number of input channels per primary sensor ray: food, smaller agent,
/// larger agent, same-size agent, obstacle-or-edge
pub const RAY_CHANNELS: usize = 5;

/// Width of the fixed scalar block appended after the ray channels
///
/// 7 body + 4 thermal + 1 season + 8 memory + 4 achievements + 5 event
/// flags + 13 awareness + 4 movement + 6 target memory + 6 goal memory +
/// 7 social signals.
pub const FIXED_SCALAR_COUNT: usize = 65;

/// Canonical input width for a specialization
pub fn input_size(spec: Specialization) -> usize {
    spec.num_sensor_rays() * RAY_CHANNELS + spec.num_alignment_rays() + FIXED_SCALAR_COUNT
}

/// Fill the fixed scalar block of `inputs`, starting at `offset`
///
/// `inputs` must already be sized to the full canonical width; ray writers
/// ran before this.
pub fn write_scalars(
    inputs: &mut [f32],
    offset: usize,
    agent: &Agent,
    percept: &Percept,
    now: Tick,
    season_phase: f32,
    config: &SimulationConfig,
) {
    let out = &mut inputs[offset..offset + FIXED_SCALAR_COUNT];
    let max_energy = config.energy.max_energy;
    let energy_frac = (agent.energy / max_energy).clamp(0.0, 1.0);
    let mut i = 0;

    // Body scalars
    out[i] = agent.hunger;
    out[i + 1] = agent.fear;
    out[i + 2] = agent.aggression;
    out[i + 3] = energy_frac;
    out[i + 4] = (agent.frames_alive as f32 / 10_000.0).min(1.0);
    out[i + 5] = (agent.cache.speed / config.movement.max_speed).clamp(0.0, 1.0);
    out[i + 6] = (wrap_angle(agent.angle - agent.prev_angle) / std::f32::consts::PI).clamp(-1.0, 1.0);
    i += 7;

    // Temperature stress
    let (cold, heat) = thermal::stress(agent.temperature, &config.thermal);
    let temp_range = (config.thermal.max_temperature - config.thermal.min_temperature).max(1e-6);
    out[i] = cold;
    out[i + 1] = heat;
    out[i + 2] = ((agent.temperature - config.thermal.min_temperature) / temp_range).clamp(0.0, 1.0);
    out[i + 3] = thermal::efficiency(agent.temperature, &config.thermal);
    i += 4;

    // Season
    out[i] = season_phase.rem_euclid(1.0);
    i += 1;

    // Short-term memory saliences, oldest first
    let saliences = agent.memory.saliences();
    out[i..i + MEMORY_FRAMES].copy_from_slice(&saliences);
    i += MEMORY_FRAMES;

    // Normalized lifetime achievements
    out[i] = (agent.stats.offspring as f32 / 10.0).min(1.0);
    out[i + 1] = (agent.stats.kills as f32 / 10.0).min(1.0);
    out[i + 2] = (agent.stats.food_eaten as f32 / 50.0).min(1.0);
    out[i + 3] = (agent.stats.distance_traveled / 20_000.0).min(1.0);
    i += 4;

    // Binary recent-event flags
    out[i..i + 5].copy_from_slice(&agent.events.as_inputs());
    i += 5;

    // Awareness scalars
    let food_proximity = percept.max_food_closeness;
    let repro = &config.reproduction;
    let repro_ready = agent.frames_alive >= repro.maturity_frames
        && agent.reproduction_cooldown == 0
        && agent.energy >= repro.min_energy_to_reproduce
        && agent.pregnancy.is_none();
    out[i] = ((1.0 - energy_frac) * 0.7 + agent.fear * 0.3).clamp(0.0, 1.0); // death risk
    out[i + 1] = (agent.hunger * (1.0 - food_proximity)).clamp(0.0, 1.0); // food urgency
    out[i + 2] = food_proximity;
    out[i + 3] = (percept.food_count as f32 / 10.0).min(1.0); // availability
    out[i + 4] = percept.max_obstacle_closeness; // collision risk
    out[i + 5] = percept.threat_closeness; // predator threat
    out[i + 6] = ((1.0 - energy_frac) * 0.5 + percept.threat_closeness * 0.5).clamp(0.0, 1.0); // vulnerability
    out[i + 7] = f32::from(u8::from(repro_ready));
    out[i + 8] = (energy_frac - repro.min_energy_to_reproduce / max_energy).clamp(0.0, 1.0); // benefit
    out[i + 9] = percept.mate_closeness;
    out[i + 10] = agent.attack_damage_decay;
    out[i + 11] = agent.collision_damage_decay;
    out[i + 12] = (percept.agent_count as f32 / 10.0).min(1.0); // crowding
    i += 13;

    // Movement state
    out[i] = f32::from(u8::from(agent.resting));
    out[i + 1] = f32::from(u8::from(agent.braking));
    out[i + 2] = agent.sprint_level;
    out[i + 3] = agent.rotation.clamp(-1.0, 1.0);
    i += 4;

    // Target memory
    if let Some(target) = &agent.target {
        let to_target = target.position - agent.position;
        let dist = to_target.length();
        let range = agent.ray_range().max(1e-6);
        out[i] = 1.0;
        out[i + 1] = match target.kind {
            TargetKind::Food => 0.0,
            TargetKind::Mate => 1.0,
        };
        out[i + 2] = (1.0 - dist / range).clamp(0.0, 1.0);
        out[i + 3] = (wrap_angle(to_target.y.atan2(to_target.x) - agent.angle)
            / std::f32::consts::PI)
            .clamp(-1.0, 1.0);
        out[i + 4] = target.priority.clamp(0.0, 1.0);
        let age = now.saturating_sub(target.last_seen);
        out[i + 5] = 1.0 - (age as f32 / target.attention_span.max(1) as f32).min(1.0);
    } else {
        out[i..i + 6].fill(0.0);
    }
    i += 6;

    // Goal memory: one-hot over the four goals, then priority and age
    let goal_hot = match agent.goal.goal {
        Goal::SeekFood => 0,
        Goal::SeekMate => 1,
        Goal::AvoidDanger => 2,
        Goal::Rest => 3,
    };
    for slot in 0..4 {
        out[i + slot] = f32::from(u8::from(slot == goal_hot));
    }
    out[i + 4] = agent.goal.priority.clamp(0.0, 1.0);
    let goal_age = now.saturating_sub(agent.goal.started);
    out[i + 5] = (goal_age as f32 / 600.0).min(1.0);
    i += 6;

    // Social signals: three pheromone smells, then one slot per vocal kind
    // so the controller can tell an alert from a mate call
    out[i] = agent.smell.danger;
    out[i + 1] = agent.smell.attack;
    out[i + 2] = agent.smell.mating;
    out[i + 3] = agent.heard.predator_alert;
    out[i + 4] = agent.heard.food_found;
    out[i + 5] = agent.heard.help_request;
    out[i + 6] = agent.heard.mate_call;
    i += 7;

    debug_assert_eq!(i, FIXED_SCALAR_COUNT);
}

/// Wrap an angle difference into (-pi, pi]
pub fn wrap_angle(angle: f32) -> f32 {
    let mut a = angle.rem_euclid(std::f32::consts::TAU);
    if a > std::f32::consts::PI {
        a -= std::f32::consts::TAU;
    }
    a
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::specialization::ALL_SPECIALIZATIONS;
    use crate::agent::AgentSeed;
    use crate::core::types::Vec2;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_input_size_formula() {
        for spec in ALL_SPECIALIZATIONS {
            assert_eq!(
                input_size(spec),
                spec.num_sensor_rays() * 5 + spec.num_alignment_rays() + FIXED_SCALAR_COUNT
            );
        }
    }

    #[test]
    fn test_scalar_block_fills_exactly() {
        let config = SimulationConfig::default();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let agent = Agent::spawn(
            AgentSeed::founder(Vec2::new(100.0, 100.0), 150.0, Specialization::Forager),
            &config,
            &mut rng,
        );
        let percept = Percept::default();
        let mut inputs = vec![-9.0; FIXED_SCALAR_COUNT];
        write_scalars(&mut inputs, 0, &agent, &percept, 10, 0.25, &config);
        // Every slot written: the sentinel never survives
        assert!(inputs.iter().all(|&v| v != -9.0));
    }

    #[test]
    fn test_vocal_kinds_keep_distinct_slots() {
        let config = SimulationConfig::default();
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let mut agent = Agent::spawn(
            AgentSeed::founder(Vec2::new(100.0, 100.0), 150.0, Specialization::Forager),
            &config,
            &mut rng,
        );
        agent.heard.predator_alert = 0.9;
        agent.heard.food_found = 0.2;
        agent.heard.help_request = 0.4;
        agent.heard.mate_call = 0.6;

        let percept = Percept::default();
        let mut inputs = vec![0.0; FIXED_SCALAR_COUNT];
        write_scalars(&mut inputs, 0, &agent, &percept, 10, 0.0, &config);

        let base = FIXED_SCALAR_COUNT - 4;
        assert_eq!(inputs[base], 0.9);
        assert_eq!(inputs[base + 1], 0.2);
        assert_eq!(inputs[base + 2], 0.4);
        assert_eq!(inputs[base + 3], 0.6);
    }

    #[test]
    fn test_wrap_angle() {
        use std::f32::consts::{PI, TAU};
        assert!((wrap_angle(0.0)).abs() < 1e-6);
        assert!((wrap_angle(TAU + 0.1) - 0.1).abs() < 1e-5);
        assert!((wrap_angle(-0.1) + 0.1).abs() < 1e-5);
        assert!(wrap_angle(PI + 0.1) < 0.0);
    }
}
