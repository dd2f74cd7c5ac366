//! Movement integration: smoothing, collision response, and energy costs
//!
//! Runs in the sequential phase, one agent at a time, against committed
//! obstacle geometry. The controller only ever expresses intent; everything
//! here turns intent into clamped, smoothed, billed motion.

pub mod thermal;

use crate::agent::Agent;
use crate::brain::ActionVector;
use crate::core::config::SimulationConfig;
use crate::core::types::Vec2;
use crate::perception::Percept;
use crate::world::Obstacle;

/// Thrust-to-acceleration scale, world units per tick squared at full thrust
const THRUST_ACCEL: f32 = 0.35;

/// Radians per tick at full rotation authority
const TURN_RATE: f32 = 0.12;

/// Speed below which a braking agent counts as resting
const REST_SPEED: f32 = 0.15;

/// Speed below which a frame counts as inactive for fitness purposes
const LOW_ACTIVITY_SPEED: f32 = 0.3;

/// Turn magnitude above which sustained slow rotation reads as circling
const CIRCLING_TURN: f32 = 0.06;

/// What one movement step did to the agent, for event emission upstream
#[derive(Debug, Clone, Copy, Default)]
pub struct MovementOutcome {
    pub hit_wall: bool,
    pub hit_obstacle: bool,
    pub distance: f32,
}

/// Integrate one tick of movement for one agent
///
/// Order matters: smooth intent, rotate, accelerate, drag, clamp, move,
/// collide, then bill energy against the post-collision state so a bounce
/// never refunds the thrust that caused it.
pub fn apply_movement(
    agent: &mut Agent,
    actions: &ActionVector,
    percept: &Percept,
    obstacles: &[Obstacle],
    ambient: f32,
    config: &SimulationConfig,
) -> MovementOutcome {
    let movement = &config.movement;
    let energy = &config.energy;
    let mut outcome = MovementOutcome::default();

    let efficiency = thermal::efficiency(agent.temperature, &config.thermal);
    let speed_before = agent.velocity.length();

    // Emergency braking engages on strong danger smell or a dense ray burst
    let emergency = agent.smell.danger > movement.emergency_danger_threshold
        || percept.ray_hit_count as usize >= movement.emergency_ray_hits;

    let mut target_thrust = actions.thrust();
    agent.braking = target_thrust.abs() < movement.thrust_deadzone || emergency;
    if agent.braking {
        target_thrust = 0.0;
    }
    let smoothing = if emergency {
        movement.emergency_smoothing
    } else if target_thrust.abs() > agent.thrust.abs() {
        movement.accel_smoothing
    } else {
        movement.decel_smoothing
    };
    agent.thrust += (target_thrust - agent.thrust) * smoothing;

    // Rotation carries momentum, and speed bleeds turn authority so tight
    // turns require slowing down first
    agent.rotation = agent.rotation * movement.rotation_momentum
        + actions.rotation() * (1.0 - movement.rotation_momentum);
    let speed_fraction = (speed_before / movement.max_speed).min(1.0);
    let authority =
        (1.0 - movement.rotation_efficiency_penalty * speed_fraction).max(0.0) * efficiency;
    let turn = agent.rotation * TURN_RATE * authority;
    agent.prev_angle = agent.angle;
    agent.angle = (agent.angle + turn).rem_euclid(std::f32::consts::TAU);

    agent.sprint_level = if agent.braking { 0.0 } else { actions.sprint() };
    let sprint_mult = 1.0 + agent.sprint_level * movement.sprint_speed_bonus;

    let heading = Vec2::from_angle(agent.angle);
    agent.velocity = agent.velocity
        + heading * (agent.thrust * THRUST_ACCEL * efficiency * agent.traits.speed_factor);
    agent.velocity = agent.velocity * movement.drag;

    let speed_cap = movement.max_speed
        * agent.traits.speed_factor.min(agent.specialization.speed_cap())
        * sprint_mult;
    let speed = agent.velocity.length();
    if speed > speed_cap && speed > 0.0 {
        agent.velocity = agent.velocity * (speed_cap / speed);
    }

    agent.position = agent.position + agent.velocity;
    outcome.distance = agent.velocity.length();

    resolve_wall_collision(agent, config, &mut outcome);
    resolve_obstacle_collisions(agent, obstacles, config, &mut outcome);
    if outcome.hit_wall || outcome.hit_obstacle {
        // Durable agents shrug off more of the impact
        let penalty = energy.collision_penalty / agent.traits.bulk_factor.max(0.5);
        agent.spend_energy(penalty, energy.max_energy);
        agent.stats.collisions += 1;
        agent.events.flag_collided();
        agent.collision_damage_decay = 1.0;
    }

    agent.resting = agent.braking && agent.velocity.length() < REST_SPEED;

    bill_energy(agent, turn, efficiency, config);
    credit_navigation(agent, percept, turn, &outcome);

    agent.temperature = thermal::step_temperature(
        agent.temperature,
        agent.velocity.length(),
        ambient,
        &config.thermal,
    );
    if thermal::band(agent.temperature, &config.thermal) != thermal::ThermalBand::Optimal
        && agent.velocity.length() > LOW_ACTIVITY_SPEED
    {
        agent.stats.thermal_active_frames += 1;
    }

    agent.stats.distance_traveled += outcome.distance;
    agent
        .exploration
        .visit(agent.position, config.world.width, config.world.height);
    agent.settle_size();

    outcome
}

/// Reflect off world edges with positional correction
fn resolve_wall_collision(agent: &mut Agent, config: &SimulationConfig, outcome: &mut MovementOutcome) {
    let min_push = config.movement.min_push_speed;
    let (w, h) = (config.world.width, config.world.height);
    let r = agent.size;

    if !agent.position.is_finite() {
        // A corrupted position resets to center rather than propagating
        tracing::warn!(agent = ?agent.id, "non-finite position, recentering");
        agent.position = Vec2::new(w / 2.0, h / 2.0);
        agent.velocity = Vec2::default();
        return;
    }

    if agent.position.x < r {
        agent.position.x = r;
        agent.velocity.x = (-agent.velocity.x * 0.5).max(min_push);
        outcome.hit_wall = true;
    } else if agent.position.x > w - r {
        agent.position.x = w - r;
        agent.velocity.x = (-agent.velocity.x * 0.5).min(-min_push);
        outcome.hit_wall = true;
    }
    if agent.position.y < r {
        agent.position.y = r;
        agent.velocity.y = (-agent.velocity.y * 0.5).max(min_push);
        outcome.hit_wall = true;
    } else if agent.position.y > h - r {
        agent.position.y = h - r;
        agent.velocity.y = (-agent.velocity.y * 0.5).min(-min_push);
        outcome.hit_wall = true;
    }
}

/// Push out of any overlapping obstacle and reflect the inward velocity
/// component
fn resolve_obstacle_collisions(
    agent: &mut Agent,
    obstacles: &[Obstacle],
    config: &SimulationConfig,
    outcome: &mut MovementOutcome,
) {
    let min_push = config.movement.min_push_speed;
    for obstacle in obstacles {
        let offset = agent.position - obstacle.position;
        let min_dist = agent.size + obstacle.radius;
        let dist_sq = offset.length_sq();
        if dist_sq >= min_dist * min_dist {
            continue;
        }
        let dist = dist_sq.sqrt();
        let normal = if dist > 1e-4 {
            offset * (1.0 / dist)
        } else {
            // Dead center: pick an arbitrary escape direction
            Vec2::new(1.0, 0.0)
        };
        agent.position = obstacle.position + normal * min_dist;
        let inward = agent.velocity.dot(&normal);
        if inward < 0.0 {
            agent.velocity = agent.velocity - normal * (inward * 1.5);
        }
        let outward = agent.velocity.dot(&normal);
        if outward < min_push {
            agent.velocity = agent.velocity + normal * (min_push - outward);
        }
        outcome.hit_obstacle = true;
    }
}

/// Charge metabolic, movement, rotation, sprint, and obesity costs
fn bill_energy(agent: &mut Agent, turn: f32, efficiency: f32, config: &SimulationConfig) {
    let energy = &config.energy;
    let speed = agent.velocity.length();

    // Passive upkeep scales with body size and worsens outside the optimal
    // thermal band; resting halves it
    let size_scale = 0.5 + agent.size / 20.0;
    let thermal_scale = 2.0 - efficiency;
    let mut metabolic =
        energy.metabolic_rate * size_scale * thermal_scale * agent.traits.bulk_factor;
    if agent.resting {
        metabolic *= 0.5;
    }

    let movement_cost =
        (energy.movement_cost_scale * speed * speed).min(energy.movement_cost_cap);
    let rotation_cost = energy.rotation_cost_scale * turn.abs();
    let sprint_cost = energy.sprint_cost * agent.sprint_level;

    let threshold = energy.obesity_threshold * energy.max_energy;
    let obesity_tax = if agent.energy > threshold {
        (agent.energy - threshold) * energy.obesity_tax_rate
    } else {
        0.0
    };

    agent.spend_energy(
        metabolic + movement_cost + rotation_cost + sprint_cost + obesity_tax,
        energy.max_energy,
    );
}

/// Attribute navigation-quality counters from this frame's motion
fn credit_navigation(
    agent: &mut Agent,
    percept: &Percept,
    turn: f32,
    outcome: &MovementOutcome,
) {
    let speed = agent.velocity.length();

    if speed < LOW_ACTIVITY_SPEED && !agent.resting {
        agent.stats.low_activity_frames += 1;
    }

    // Tight sustained turning with little displacement reads as circling
    if turn.abs() > CIRCLING_TURN && outcome.distance < 1.0 && !agent.braking {
        agent.stats.circling_frames += 1;
    }

    // Turning toward visible food
    if percept.nearest_food.is_some()
        && percept.food_bearing.abs() > 0.2
        && turn.signum() == percept.food_bearing.signum()
        && turn.abs() > 0.01
    {
        agent.stats.turns_toward_food += 1;
    }

    // Steering through a crowded frame without touching anything
    let crowded = percept.ray_hit_count >= 3;
    if crowded && turn.abs() > 0.02 && !outcome.hit_wall && !outcome.hit_obstacle {
        agent.stats.clever_turns += 1;
    }

    // Close obstacle seen, turned, no collision
    if percept.max_obstacle_closeness > 0.5
        && turn.abs() > 0.02
        && !outcome.hit_wall
        && !outcome.hit_obstacle
    {
        agent.stats.obstacle_avoidances += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::specialization::Specialization;
    use crate::agent::AgentSeed;
    use crate::brain::OUTPUT_SIZE;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn fixture() -> (Agent, SimulationConfig) {
        let config = SimulationConfig::default();
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let agent = Agent::spawn(
            AgentSeed::founder(
                Vec2::new(config.world.width / 2.0, config.world.height / 2.0),
                150.0,
                Specialization::Forager,
            ),
            &config,
            &mut rng,
        );
        (agent, config)
    }

    fn full_thrust() -> ActionVector {
        ActionVector {
            raw: [1.0, 0.0, -1.0, -1.0, -1.0],
        }
    }

    fn idle() -> ActionVector {
        ActionVector {
            raw: [0.0; OUTPUT_SIZE],
        }
    }

    #[test]
    fn test_thrust_builds_speed_gradually() {
        let (mut agent, config) = fixture();
        let actions = full_thrust();
        let percept = Percept::default();
        apply_movement(&mut agent, &actions, &percept, &[], 20.0, &config);
        let speed_one = agent.velocity.length();
        for _ in 0..30 {
            apply_movement(&mut agent, &actions, &percept, &[], 20.0, &config);
        }
        let speed_many = agent.velocity.length();
        assert!(speed_one > 0.0);
        assert!(speed_many > speed_one * 2.0, "smoothing should ramp speed");
        assert!(speed_many <= config.movement.max_speed * 1.01);
    }

    #[test]
    fn test_deadzone_counts_as_braking_and_rests() {
        let (mut agent, config) = fixture();
        let percept = Percept::default();
        let actions = ActionVector {
            raw: [0.05, 0.0, -1.0, -1.0, -1.0],
        };
        for _ in 0..50 {
            apply_movement(&mut agent, &actions, &percept, &[], 20.0, &config);
        }
        assert!(agent.braking);
        assert!(agent.resting);
        assert!(agent.velocity.length() < REST_SPEED);
    }

    #[test]
    fn test_wall_collision_reflects_and_bills() {
        let (mut agent, config) = fixture();
        agent.position = Vec2::new(1.0, config.world.height / 2.0);
        agent.velocity = Vec2::new(-3.0, 0.0);
        agent.angle = std::f32::consts::PI;
        let energy_before = agent.energy;
        let collisions_before = agent.stats.collisions;

        let outcome = apply_movement(&mut agent, &idle(), &Percept::default(), &[], 20.0, &config);
        assert!(outcome.hit_wall);
        assert!(agent.position.x >= agent.size);
        assert!(agent.velocity.x >= config.movement.min_push_speed);
        assert!(agent.energy < energy_before);
        assert_eq!(agent.stats.collisions, collisions_before + 1);
    }

    #[test]
    fn test_obstacle_unembeds_agent() {
        let (mut agent, config) = fixture();
        let obstacle = Obstacle {
            position: agent.position,
            radius: 20.0,
            velocity: Vec2::default(),
        };
        // Fully embedded at the obstacle center
        let outcome = apply_movement(
            &mut agent,
            &idle(),
            &Percept::default(),
            &[obstacle.clone()],
            20.0,
            &config,
        );
        assert!(outcome.hit_obstacle);
        let dist = agent.position.distance(&obstacle.position);
        assert!(dist >= obstacle.radius + agent.size - 1e-3);
    }

    #[test]
    fn test_resting_halves_metabolic_cost() {
        let (mut resting, config) = fixture();
        let (mut moving, _) = fixture();
        resting.velocity = Vec2::default();
        moving.velocity = Vec2::default();

        apply_movement(&mut resting, &idle(), &Percept::default(), &[], 20.0, &config);
        apply_movement(
            &mut moving,
            &full_thrust(),
            &Percept::default(),
            &[],
            20.0,
            &config,
        );
        assert!(resting.stats.energy_spent < moving.stats.energy_spent);
    }

    #[test]
    fn test_emergency_braking_on_danger_smell() {
        let (mut agent, config) = fixture();
        agent.smell.danger = 0.9;
        agent.thrust = 1.0;
        agent.velocity = Vec2::new(4.0, 0.0);
        apply_movement(&mut agent, &full_thrust(), &Percept::default(), &[], 20.0, &config);
        assert!(agent.braking);
        // Emergency smoothing collapses thrust far faster than normal decel
        assert!(agent.thrust < 0.5);
    }

    #[test]
    fn test_speed_degrades_turn_authority() {
        let (mut slow, config) = fixture();
        let (mut fast, _) = fixture();
        slow.angle = 0.0;
        slow.prev_angle = 0.0;
        fast.angle = 0.0;
        fast.prev_angle = 0.0;
        fast.velocity = Vec2::new(config.movement.max_speed, 0.0);
        let turn_action = ActionVector {
            raw: [0.0, 1.0, -1.0, -1.0, -1.0],
        };
        apply_movement(&mut slow, &turn_action, &Percept::default(), &[], 20.0, &config);
        apply_movement(&mut fast, &turn_action, &Percept::default(), &[], 20.0, &config);
        let slow_turn = (slow.angle - slow.prev_angle).abs();
        let fast_turn = (fast.angle - fast.prev_angle).abs();
        assert!(slow_turn > fast_turn);
    }

    #[test]
    fn test_nonfinite_position_recenters() {
        let (mut agent, config) = fixture();
        agent.position = Vec2::new(f32::NAN, f32::NAN);
        apply_movement(&mut agent, &idle(), &Percept::default(), &[], 20.0, &config);
        assert!(agent.position.is_finite());
    }
}
