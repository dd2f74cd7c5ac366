//! Sensing: rays, scalar features, and the per-tick percept summary
//!
//! Perception runs in the read-only half of the tick. Every agent reads the
//! committed state of the previous tick through [`PerceptionEnv`] and writes
//! only into its own [`AgentScratch`], so the whole pass parallelizes
//! without locks. Malformed coordinates anywhere degrade to missed rays and
//! a neutral percept; perception never errors and never kills an agent.

pub mod features;
pub mod rays;

use ahash::AHashMap;

use crate::agent::specialization::Specialization;
use crate::agent::Agent;
use crate::brain::ActionVector;
use crate::core::config::SimulationConfig;
use crate::core::types::{AgentId, Rect, Tick, Vec2};
use crate::world::spatial::{SpatialEntry, SpatialQuery, SpatialRef};
use crate::world::{Food, Obstacle};
use features::{input_size, wrap_angle, write_scalars, RAY_CHANNELS};
use rays::{closeness, ray_circle, ray_world_edge, RayHit, RayHitKind};

/// A perceived agent, kept by id so phase B can re-resolve it
#[derive(Debug, Clone, Copy)]
pub struct AgentSighting {
    pub id: AgentId,
    pub position: Vec2,
    pub distance: f32,
}

/// A perceived food item, kept by list index
#[derive(Debug, Clone, Copy)]
pub struct FoodSighting {
    pub index: usize,
    pub position: Vec2,
    pub distance: f32,
}

/// Digest of one agent's sensory frame, consumed by the sequential phase
#[derive(Debug, Clone, Copy, Default)]
pub struct Percept {
    pub nearest_food: Option<FoodSighting>,
    pub nearest_mate: Option<AgentSighting>,
    pub nearest_threat: Option<AgentSighting>,
    pub nearest_prey: Option<AgentSighting>,
    /// Strongest food closeness seen this frame, rays or sightings
    pub max_food_closeness: f32,
    /// Strongest obstacle-or-edge closeness across all rays
    pub max_obstacle_closeness: f32,
    pub threat_closeness: f32,
    pub mate_closeness: f32,
    /// Relative bearing to the nearest food, in (-pi, pi]; 0 when none seen
    pub food_bearing: f32,
    pub ray_hit_count: u32,
    pub food_count: u32,
    pub agent_count: u32,
    /// Same-specialization neighbors in range
    pub ally_count: u32,
    /// Mean heading alignment with those allies, in [-1, 1]
    pub ally_alignment: f32,
    /// Smaller non-predator neighbors inside guard range
    pub guarded_neighbors: u32,
    pub prey_closeness: f32,
}

/// Body snapshot of a nearby agent, cached for the ray loop
#[derive(Debug, Clone, Copy)]
struct NeighborBody {
    id: AgentId,
    position: Vec2,
    size: f32,
    specialization: Specialization,
}

/// Per-agent working buffers, reused across ticks
///
/// One scratch lives alongside every arena slot; a tick hands each rayon
/// task exclusive access to its own scratch and shared access to the world.
pub struct AgentScratch {
    /// Full controller input vector, sized once at construction
    pub inputs: Vec<f32>,
    /// Resolved primary rays, copied onto the agent in phase B
    pub ray_hits: Vec<RayHit>,
    pub percept: Percept,
    /// Controller output for this tick
    pub actions: ActionVector,
    /// Recurrent hidden state, staged here so phase A never touches the agent
    pub hidden: Vec<f32>,
    query: Vec<SpatialEntry>,
    neighbors: Vec<NeighborBody>,
    foods: Vec<FoodSighting>,
}

impl AgentScratch {
    pub fn for_specialization(spec: Specialization) -> Self {
        Self {
            inputs: vec![0.0; input_size(spec)],
            ray_hits: Vec::with_capacity(spec.num_sensor_rays()),
            percept: Percept::default(),
            actions: ActionVector::default(),
            hidden: vec![0.0; spec.hidden_size()],
            query: Vec::new(),
            neighbors: Vec::new(),
            foods: Vec::new(),
        }
    }
}

/// Read-only view of the committed world state for one perception pass
pub struct PerceptionEnv<'a> {
    pub agents: &'a AHashMap<AgentId, Agent>,
    pub foods: &'a [Food],
    pub obstacles: &'a [Obstacle],
    pub index: &'a (dyn SpatialQuery + Sync),
    pub tick: Tick,
    pub season_phase: f32,
    pub config: &'a SimulationConfig,
}

/// Size ratio above which another agent reads as larger, below the inverse
/// as smaller
const SIZE_RATIO_MARGIN: f32 = 1.1;

/// Prey must be at most this fraction of the observer's size
const PREY_SIZE_RATIO: f32 = 0.8;

/// Threats at least this much larger register even when not predators
const THREAT_SIZE_RATIO: f32 = 1.3;

/// Range inside which a defender counts a smaller neighbor as guarded
const GUARD_RADIUS: f32 = 80.0;

/// Fill `scratch` with the agent's full sensory frame
///
/// Writes the complete input vector, the resolved primary rays, and the
/// percept digest. An agent with a non-finite position gets a zeroed input
/// vector and an empty percept.
pub fn perceive(agent: &Agent, env: &PerceptionEnv<'_>, scratch: &mut AgentScratch) {
    let spec = agent.specialization;
    let n_rays = spec.num_sensor_rays();
    let n_align = spec.num_alignment_rays();
    let range = agent.ray_range();
    let scalar_offset = n_rays * RAY_CHANNELS + n_align;

    scratch.ray_hits.clear();
    scratch.percept = Percept::default();
    scratch.inputs.fill(0.0);
    debug_assert_eq!(scratch.inputs.len(), input_size(spec));

    if !agent.position.is_finite() {
        return;
    }

    let mut percept = Percept::default();
    gather_candidates(agent, env, scratch, range, &mut percept);

    // Primary rays: fan centered on the heading, nearest hit wins
    let spread = spec.sensor_spread();
    for i in 0..n_rays {
        let frac = (i as f32 + 0.5) / n_rays as f32;
        let angle = agent.angle - spread / 2.0 + spread * frac;
        let hit = cast_primary(agent, env, scratch, angle, range);
        if hit.kind != RayHitKind::None {
            percept.ray_hit_count += 1;
            match hit.kind {
                RayHitKind::Food => {
                    percept.max_food_closeness = percept.max_food_closeness.max(hit.closeness)
                }
                RayHitKind::ObstacleOrEdge => {
                    percept.max_obstacle_closeness =
                        percept.max_obstacle_closeness.max(hit.closeness)
                }
                _ => {}
            }
            let channel = match hit.kind {
                RayHitKind::Food => 0,
                RayHitKind::SmallerAgent => 1,
                RayHitKind::LargerAgent => 2,
                RayHitKind::SameSizeAgent => 3,
                RayHitKind::ObstacleOrEdge => 4,
                RayHitKind::None => unreachable!(),
            };
            scratch.inputs[i * RAY_CHANNELS + channel] = hit.closeness;
        }
        scratch.ray_hits.push(hit);
    }

    // Alignment rays: evenly spaced around the body, obstacles and edges
    // only, one distance channel each
    for j in 0..n_align {
        let angle = agent.angle + std::f32::consts::TAU * j as f32 / n_align as f32;
        let c = cast_alignment(agent, env, angle, range);
        percept.max_obstacle_closeness = percept.max_obstacle_closeness.max(c);
        scratch.inputs[n_rays * RAY_CHANNELS + j] = c;
    }

    // Sightings feed the digest even when no ray happened to line up
    if let Some(food) = &percept.nearest_food {
        percept.max_food_closeness = percept
            .max_food_closeness
            .max(closeness(food.distance, range));
        let to_food = food.position - agent.position;
        percept.food_bearing = wrap_angle(to_food.y.atan2(to_food.x) - agent.angle);
    }
    if let Some(mate) = &percept.nearest_mate {
        percept.mate_closeness = closeness(mate.distance, range);
    }
    if let Some(threat) = &percept.nearest_threat {
        percept.threat_closeness = closeness(threat.distance, range);
    }
    if let Some(prey) = &percept.nearest_prey {
        percept.prey_closeness = closeness(prey.distance, range);
    }
    if percept.ally_count > 0 {
        percept.ally_alignment /= percept.ally_count as f32;
    }

    write_scalars(
        &mut scratch.inputs,
        scalar_offset,
        agent,
        &percept,
        env.tick,
        env.season_phase,
        env.config,
    );
    scratch.percept = percept;
}

/// Range-query the index and bucket candidates into neighbor bodies, food
/// sightings, and the nearest-of-each-kind digest slots
fn gather_candidates(
    agent: &Agent,
    env: &PerceptionEnv<'_>,
    scratch: &mut AgentScratch,
    range: f32,
    percept: &mut Percept,
) {
    env.index
        .query_rect(Rect::around(agent.position, range), &mut scratch.query);
    scratch.neighbors.clear();
    scratch.foods.clear();

    for entry in &scratch.query {
        match entry.target {
            SpatialRef::Agent(id) if id != agent.id => {
                let Some(other) = env.agents.get(&id) else {
                    continue;
                };
                if other.is_dead() || !other.position.is_finite() {
                    continue;
                }
                let distance = agent.position.distance(&other.position);
                if distance > range + other.size {
                    continue;
                }
                percept.agent_count += 1;
                scratch.neighbors.push(NeighborBody {
                    id,
                    position: other.position,
                    size: other.size,
                    specialization: other.specialization,
                });

                let sighting = AgentSighting {
                    id,
                    position: other.position,
                    distance,
                };
                if other.specialization == agent.specialization {
                    replace_if_closer(&mut percept.nearest_mate, sighting);
                    percept.ally_count += 1;
                    // Accumulated raw; normalized to a mean after the scan
                    percept.ally_alignment += (other.angle - agent.angle).cos();
                }
                if other.specialization != Specialization::Predator
                    && other.size < agent.size
                    && distance < GUARD_RADIUS
                {
                    percept.guarded_neighbors += 1;
                }
                let is_threat = (other.specialization == Specialization::Predator
                    && agent.specialization != Specialization::Predator)
                    || other.size > agent.size * THREAT_SIZE_RATIO;
                if is_threat {
                    replace_if_closer(&mut percept.nearest_threat, sighting);
                }
                if other.size < agent.size * PREY_SIZE_RATIO {
                    replace_if_closer(&mut percept.nearest_prey, sighting);
                }
            }
            SpatialRef::Food(index) => {
                let Some(food) = env.foods.get(index) else {
                    continue;
                };
                if !food.position.is_finite() {
                    continue;
                }
                let distance = agent.position.distance(&food.position);
                if distance > range + food.size {
                    continue;
                }
                percept.food_count += 1;
                let sighting = FoodSighting {
                    index,
                    position: food.position,
                    distance,
                };
                scratch.foods.push(sighting);
                if percept
                    .nearest_food
                    .map_or(true, |best| sighting.distance < best.distance)
                {
                    percept.nearest_food = Some(sighting);
                }
            }
            _ => {}
        }
    }
}

fn replace_if_closer(slot: &mut Option<AgentSighting>, candidate: AgentSighting) {
    if slot.map_or(true, |best| candidate.distance < best.distance) {
        *slot = Some(candidate);
    }
}

/// Cast one primary ray against edges, obstacles, neighbors, and food
fn cast_primary(
    agent: &Agent,
    env: &PerceptionEnv<'_>,
    scratch: &AgentScratch,
    angle: f32,
    range: f32,
) -> RayHit {
    let dir = Vec2::from_angle(angle);
    let mut best_t = range;
    let mut best_kind = RayHitKind::None;

    if let Some(t) = ray_world_edge(
        agent.position,
        dir,
        env.config.world.width,
        env.config.world.height,
    ) {
        if t < best_t {
            best_t = t;
            best_kind = RayHitKind::ObstacleOrEdge;
        }
    }
    for obstacle in env.obstacles {
        if let Some(t) = ray_circle(agent.position, dir, obstacle.position, obstacle.radius) {
            if t < best_t {
                best_t = t;
                best_kind = RayHitKind::ObstacleOrEdge;
            }
        }
    }
    for neighbor in &scratch.neighbors {
        if let Some(t) = ray_circle(agent.position, dir, neighbor.position, neighbor.size) {
            if t < best_t {
                best_t = t;
                best_kind = classify_agent(agent.size, neighbor.size);
            }
        }
    }
    for food in &scratch.foods {
        let Some(body) = env.foods.get(food.index) else {
            continue;
        };
        if let Some(t) = ray_circle(agent.position, dir, body.position, body.size) {
            if t < best_t {
                best_t = t;
                best_kind = RayHitKind::Food;
            }
        }
    }

    if best_kind == RayHitKind::None {
        RayHit::miss(angle, range)
    } else {
        RayHit {
            kind: best_kind,
            distance: best_t,
            closeness: closeness(best_t, range),
            angle,
        }
    }
}

/// Alignment rays only care about hard geometry; returns closeness
fn cast_alignment(agent: &Agent, env: &PerceptionEnv<'_>, angle: f32, range: f32) -> f32 {
    let dir = Vec2::from_angle(angle);
    let mut best_t = range;
    if let Some(t) = ray_world_edge(
        agent.position,
        dir,
        env.config.world.width,
        env.config.world.height,
    ) {
        best_t = best_t.min(t);
    }
    for obstacle in env.obstacles {
        if let Some(t) = ray_circle(agent.position, dir, obstacle.position, obstacle.radius) {
            best_t = best_t.min(t);
        }
    }
    closeness(best_t, range)
}

fn classify_agent(own_size: f32, other_size: f32) -> RayHitKind {
    if other_size > own_size * SIZE_RATIO_MARGIN {
        RayHitKind::LargerAgent
    } else if other_size * SIZE_RATIO_MARGIN < own_size {
        RayHitKind::SmallerAgent
    } else {
        RayHitKind::SameSizeAgent
    }
}

/// Commit this frame's percept into the agent's target and goal memories
///
/// Runs in the sequential phase. Stale targets are forgotten before fresher
/// sightings replace them; goal swaps route through [`Agent::set_goal`] so
/// completion credit is attributed there.
pub fn update_target_and_goal(
    agent: &mut Agent,
    percept: &Percept,
    config: &SimulationConfig,
    now: Tick,
) {
    use crate::agent::memory::{Goal, TargetKind, TargetMemory};

    if agent.target.is_some_and(|t| t.is_stale(now)) {
        agent.target = None;
    }

    let repro = &config.reproduction;
    let repro_ready = agent.frames_alive >= repro.maturity_frames
        && agent.reproduction_cooldown == 0
        && agent.energy >= repro.min_energy_to_reproduce
        && agent.pregnancy.is_none();

    if let Some(food) = &percept.nearest_food {
        agent.target = Some(TargetMemory {
            kind: TargetKind::Food,
            position: food.position,
            priority: agent.hunger.max(0.2),
            last_seen: now,
            attention_span: 120,
        });
    } else if repro_ready {
        if let Some(mate) = &percept.nearest_mate {
            agent.target = Some(TargetMemory {
                kind: TargetKind::Mate,
                position: mate.position,
                priority: 0.6,
                last_seen: now,
                attention_span: 90,
            });
        }
    }

    let energy_frac = agent.energy / config.energy.max_energy;
    let danger = agent.fear.max(percept.threat_closeness);
    let (goal, priority) = if danger > 0.6 {
        (Goal::AvoidDanger, danger)
    } else if agent.hunger > 0.55 || percept.nearest_food.is_some() {
        (Goal::SeekFood, agent.hunger.max(0.3))
    } else if repro_ready && percept.nearest_mate.is_some() {
        (Goal::SeekMate, 0.5)
    } else if energy_frac < 0.3 {
        (Goal::Rest, 0.4)
    } else {
        (Goal::SeekFood, 0.3)
    };
    agent.set_goal(goal, priority, now);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AgentSeed;
    use crate::world::spatial::SparseHashGrid;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn env_fixture<'a>(
        agents: &'a AHashMap<AgentId, Agent>,
        foods: &'a [Food],
        obstacles: &'a [Obstacle],
        grid: &'a SparseHashGrid,
        config: &'a SimulationConfig,
    ) -> PerceptionEnv<'a> {
        PerceptionEnv {
            agents,
            foods,
            obstacles,
            index: grid,
            tick: 1,
            season_phase: 0.0,
            config,
        }
    }

    fn rebuild(
        grid: &mut SparseHashGrid,
        agents: &AHashMap<AgentId, Agent>,
        foods: &[Food],
    ) {
        let entries: Vec<SpatialEntry> = agents
            .values()
            .map(|a| SpatialEntry {
                target: SpatialRef::Agent(a.id),
                position: a.position,
                radius: a.size,
            })
            .chain(foods.iter().enumerate().map(|(i, f)| SpatialEntry {
                target: SpatialRef::Food(i),
                position: f.position,
                radius: f.size,
            }))
            .collect();
        grid.rebuild(entries.into_iter());
    }

    fn spawn_at(pos: Vec2, spec: Specialization, config: &SimulationConfig) -> Agent {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        Agent::spawn(AgentSeed::founder(pos, 150.0, spec), config, &mut rng)
    }

    #[test]
    fn test_empty_world_neutral_percept() {
        let config = SimulationConfig::default();
        let mut agents = AHashMap::new();
        let agent = spawn_at(
            Vec2::new(
                config.world.width / 2.0,
                config.world.height / 2.0,
            ),
            Specialization::Forager,
            &config,
        );
        let id = agent.id;
        agents.insert(id, agent);
        let mut grid = SparseHashGrid::new(config.world.grid_cell_size);
        rebuild(&mut grid, &agents, &[]);

        let env = env_fixture(&agents, &[], &[], &grid, &config);
        let mut scratch = AgentScratch::for_specialization(Specialization::Forager);
        perceive(&agents[&id], &env, &mut scratch);

        assert!(scratch.percept.nearest_food.is_none());
        assert!(scratch.percept.nearest_threat.is_none());
        assert_eq!(scratch.percept.agent_count, 0);
        assert_eq!(
            scratch.ray_hits.len(),
            Specialization::Forager.num_sensor_rays()
        );
        // Far from every wall, all ray channels stay at the no-hit baseline
        let ray_block = Specialization::Forager.num_sensor_rays() * RAY_CHANNELS;
        assert!(scratch.inputs[..ray_block].iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_food_in_front_is_seen() {
        let config = SimulationConfig::default();
        let mut agents = AHashMap::new();
        let mut agent = spawn_at(
            Vec2::new(500.0, 500.0),
            Specialization::Forager,
            &config,
        );
        agent.angle = 0.0;
        let id = agent.id;
        let foods = vec![Food {
            position: Vec2::new(560.0, 500.0),
            size: 6.0,
            energy_value: 20.0,
            high_value: false,
        }];
        agents.insert(id, agent);
        let mut grid = SparseHashGrid::new(config.world.grid_cell_size);
        rebuild(&mut grid, &agents, &foods);

        let env = env_fixture(&agents, &foods, &[], &grid, &config);
        let mut scratch = AgentScratch::for_specialization(Specialization::Forager);
        perceive(&agents[&id], &env, &mut scratch);

        let food = scratch.percept.nearest_food.expect("food visible");
        assert_eq!(food.index, 0);
        assert!(scratch.percept.max_food_closeness > 0.0);
        assert!(scratch.percept.food_bearing.abs() < 0.1);
        assert!(scratch
            .ray_hits
            .iter()
            .any(|h| h.kind == RayHitKind::Food));
    }

    #[test]
    fn test_predator_registers_as_threat() {
        let config = SimulationConfig::default();
        let mut agents = AHashMap::new();
        let prey = spawn_at(
            Vec2::new(400.0, 400.0),
            Specialization::Forager,
            &config,
        );
        let predator = spawn_at(
            Vec2::new(450.0, 400.0),
            Specialization::Predator,
            &config,
        );
        let prey_id = prey.id;
        let predator_id = predator.id;
        agents.insert(prey_id, prey);
        agents.insert(predator_id, predator);
        let mut grid = SparseHashGrid::new(config.world.grid_cell_size);
        rebuild(&mut grid, &agents, &[]);

        let env = env_fixture(&agents, &[], &[], &grid, &config);
        let mut scratch = AgentScratch::for_specialization(Specialization::Forager);
        perceive(&agents[&prey_id], &env, &mut scratch);

        let threat = scratch.percept.nearest_threat.expect("predator sensed");
        assert_eq!(threat.id, predator_id);
        assert!(scratch.percept.threat_closeness > 0.0);
    }

    #[test]
    fn test_allies_feed_alignment_and_guard_counts() {
        let config = SimulationConfig::default();
        let mut agents = AHashMap::new();
        let mut observer = spawn_at(
            Vec2::new(400.0, 400.0),
            Specialization::Defender,
            &config,
        );
        observer.angle = 0.0;
        let id = observer.id;
        let mut ally = spawn_at(
            Vec2::new(430.0, 400.0),
            Specialization::Defender,
            &config,
        );
        ally.angle = 0.05;
        let ally_id = ally.id;
        let mut ward = spawn_at(
            Vec2::new(440.0, 400.0),
            Specialization::Forager,
            &config,
        );
        ward.size = observer.size * 0.5;
        let ward_id = ward.id;
        agents.insert(id, observer);
        agents.insert(ally_id, ally);
        agents.insert(ward_id, ward);
        let mut grid = SparseHashGrid::new(config.world.grid_cell_size);
        rebuild(&mut grid, &agents, &[]);

        let env = env_fixture(&agents, &[], &[], &grid, &config);
        let mut scratch = AgentScratch::for_specialization(Specialization::Defender);
        perceive(&agents[&id], &env, &mut scratch);

        // The same-size defender is the only ally; the smaller forager is
        // the only guarded neighbor
        assert_eq!(scratch.percept.ally_count, 1);
        assert!(scratch.percept.ally_alignment > 0.95);
        assert_eq!(scratch.percept.guarded_neighbors, 1);
    }

    #[test]
    fn test_nonfinite_position_yields_zero_inputs() {
        let config = SimulationConfig::default();
        let mut agents = AHashMap::new();
        let mut agent = spawn_at(
            Vec2::new(100.0, 100.0),
            Specialization::Scout,
            &config,
        );
        agent.position = Vec2::new(f32::NAN, 50.0);
        let id = agent.id;
        agents.insert(id, agent);
        let grid = SparseHashGrid::new(config.world.grid_cell_size);

        let env = env_fixture(&agents, &[], &[], &grid, &config);
        let mut scratch = AgentScratch::for_specialization(Specialization::Scout);
        scratch.inputs.fill(0.7);
        perceive(&agents[&id], &env, &mut scratch);

        assert!(scratch.inputs.iter().all(|&v| v == 0.0));
        assert!(scratch.ray_hits.is_empty());
    }

    #[test]
    fn test_goal_prefers_danger_over_food() {
        let config = SimulationConfig::default();
        let mut agent = spawn_at(
            Vec2::new(100.0, 100.0),
            Specialization::Forager,
            &config,
        );
        agent.fear = 0.9;
        agent.hunger = 0.9;
        let percept = Percept {
            nearest_food: Some(FoodSighting {
                index: 0,
                position: Vec2::new(110.0, 100.0),
                distance: 10.0,
            }),
            ..Percept::default()
        };
        update_target_and_goal(&mut agent, &percept, &config, 5);
        assert_eq!(agent.goal.goal, crate::agent::memory::Goal::AvoidDanger);
        // The food target is still remembered for when the danger passes
        assert!(agent.target.is_some());
    }
}
