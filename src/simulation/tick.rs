//! The two-phase tick
//!
//! Phase A is embarrassingly parallel: every agent perceives the committed
//! previous-tick state and runs its controller, writing only to its own
//! scratch buffer. Phase B is sequential and deterministic: it applies the
//! decisions in arena order, so identical seeds produce identical runs
//! regardless of thread count.

use ahash::AHashSet;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;

use crate::agent::memory::MemoryFrame;
use crate::agent::{Agent, NeighborSnapshot};
use crate::brain::ActionVector;
use crate::core::types::{AgentId, Tick, Vec2};
use crate::fitness;
use crate::genetics;
use crate::movement;
use crate::perception::rays::RayHit;
use crate::perception::{perceive, update_target_and_goal, Percept, PerceptionEnv};
use crate::signaling::{
    apply_signal_feedback, emit_vocal, maybe_emit_pheromones, sense_pheromones, sense_vocals,
    VocalKind,
};
use crate::simulation::SimulationEvent;
use crate::world::{Food, World};

/// How far beyond touching range an attack can still land
const ATTACK_REACH: f32 = 6.0;

/// Intent threshold above which attack and mate actions fire
const INTENT_THRESHOLD: f32 = 0.6;

/// Fraction of the victim's remaining energy absorbed on a kill
const KILL_ENERGY_YIELD: f32 = 0.3;

/// Base attack damage per point of attacker size
const ATTACK_DAMAGE_PER_SIZE: f32 = 1.1;

/// Extra wander range for mate contact beyond body overlap
const MATE_REACH: f32 = 14.0;

/// Mate intent above which an agent will also call for mates vocally
const MATE_CALL_INTENT: f32 = 0.75;

/// A decision lifted out of a scratch buffer for the sequential phase
struct Decision {
    actions: ActionVector,
    percept: Percept,
    hidden: Vec<f32>,
    rays: Vec<RayHit>,
}

/// Advance the world by one tick
pub fn run_tick(world: &mut World) -> Vec<SimulationEvent> {
    world.tick += 1;
    let now = world.tick;
    let mut events = Vec::new();

    world.rebuild_index();
    decide_parallel(world, now);

    let population = world.population_view();
    let ambient = world.ambient_temperature();
    let order: Vec<AgentId> = world.agent_ids().to_vec();
    let mut consumed_food: AHashSet<usize> = AHashSet::new();

    for (slot, &id) in order.iter().enumerate() {
        let Some(decision) = lift_decision(world, slot) else {
            continue;
        };
        if world.agent(id).map_or(true, Agent::is_dead) {
            continue;
        }

        commit_decision(world, id, &decision, ambient, now);
        eat_nearby_food(world, id, &decision.percept, &mut consumed_food, &mut events);
        resolve_attack(world, id, &decision, &mut events);
        attempt_mating(world, id, &decision, &population, &mut events);
        attempt_split(world, id, &mut events);
        emit_signals(world, id, &decision, now, &mut events);

        let fitness_config = world.config.fitness.clone();
        if now % fitness_config.fitness_interval.max(1) == 0 {
            if let Some(agent) = world.agent_mut(id) {
                fitness::refresh(agent, &fitness_config);
            }
        }
    }

    deliver_births(world, &order, &population, &mut events);
    reap_dead(world, &mut events);
    remove_consumed_food(world, consumed_food);
    drift_obstacles(world);
    age_signals(world, now);
    replenish_food(world);

    events
}

/// Phase A: perceive and decide for every living agent in parallel
fn decide_parallel(world: &mut World, now: Tick) {
    let season_phase = world.season_phase;
    let buffers = world.decision_buffers();
    let env = PerceptionEnv {
        agents: buffers.agents,
        foods: buffers.foods,
        obstacles: buffers.obstacles,
        index: buffers.grid,
        tick: now,
        season_phase,
        config: buffers.config,
    };

    buffers
        .order
        .par_iter()
        .zip(buffers.scratches.par_iter_mut())
        .for_each(|(id, scratch)| {
            let Some(agent) = env.agents.get(id) else {
                return;
            };
            if agent.is_dead() {
                return;
            }
            perceive(agent, &env, scratch);
            scratch.hidden.copy_from_slice(&agent.hidden);
            scratch.actions = agent.brain.forward(&scratch.inputs, &mut scratch.hidden);
        });
}

/// Copy the per-agent scratch results out so phase B can mutate the arena
fn lift_decision(world: &World, slot: usize) -> Option<Decision> {
    let scratch = world.scratch(slot)?;
    Some(Decision {
        actions: scratch.actions,
        percept: scratch.percept,
        hidden: scratch.hidden.clone(),
        rays: scratch.ray_hits.clone(),
    })
}

/// Apply bookkeeping, senses, movement, and memory for one agent
fn commit_decision(world: &mut World, id: AgentId, decision: &Decision, ambient: f32, now: Tick) {
    let config = world.config.clone();
    let Some(position) = world.agent(id).map(|a| a.position) else {
        return;
    };
    let smell = sense_pheromones(position, &world.pulses, config.signals.pheromone_radius);
    let heard = sense_vocals(id, position, &world.vocals, now, config.signals.vocal_radius);
    let obstacles = world.obstacles.clone();

    let Some(agent) = world.agent_mut(id) else {
        return;
    };
    agent.frames_alive += 1;
    agent.events.tick();
    agent.reproduction_cooldown = agent.reproduction_cooldown.saturating_sub(1);
    agent.attack_damage_decay *= 0.9;
    agent.collision_damage_decay *= 0.9;
    agent.hidden.copy_from_slice(&decision.hidden);
    agent.last_ray_hits.clone_from(&decision.rays);
    agent.smell = smell;
    agent.heard = heard;
    agent.social = NeighborSnapshot {
        allies: decision.percept.ally_count,
        ally_alignment: decision.percept.ally_alignment,
        guarded: decision.percept.guarded_neighbors,
        prey_closeness: decision.percept.prey_closeness,
    };
    apply_signal_feedback(agent);
    agent.hunger = (1.0 - agent.energy / config.energy.max_energy).clamp(0.0, 1.0);

    movement::apply_movement(
        agent,
        &decision.actions,
        &decision.percept,
        &obstacles,
        ambient,
        &config,
    );
    agent.refresh_cache(now);

    agent.memory.record(MemoryFrame {
        speed: agent.cache.speed,
        energy_fraction: agent.energy / config.energy.max_energy,
        danger: agent.fear,
        aggression: agent.aggression,
        ray_hits: decision.percept.ray_hit_count,
    });
    update_target_and_goal(agent, &decision.percept, &config, now);

    // Death fires below one unit of energy, not at zero
    if agent.energy < 1.0 {
        agent.mark_dead();
    }
}

/// Consume the nearest food item if it is in body contact; first eater wins
fn eat_nearby_food(
    world: &mut World,
    id: AgentId,
    percept: &Percept,
    consumed: &mut AHashSet<usize>,
    events: &mut Vec<SimulationEvent>,
) {
    let Some(sighting) = percept.nearest_food else {
        return;
    };
    if consumed.contains(&sighting.index) {
        return;
    }
    let Some(food) = world.foods.get(sighting.index).cloned() else {
        return;
    };
    let max_energy = world.config.energy.max_energy;
    let Some(agent) = world.agent_mut(id) else {
        return;
    };
    if agent.is_dead() || agent.position.distance(&food.position) > agent.size + food.size {
        return;
    }
    consumed.insert(sighting.index);
    agent.gain_energy(food.energy_value, max_energy);
    agent.stats.food_eaten += 1;
    agent.events.flag_ate();
    agent.hunger = (agent.hunger - 0.3).max(0.0);
    events.push(SimulationEvent::FoodEaten {
        agent: id,
        high_value: food.high_value,
    });
}

/// Land an attack on the nearest prey if intent and reach allow it
fn resolve_attack(
    world: &mut World,
    id: AgentId,
    decision: &Decision,
    events: &mut Vec<SimulationEvent>,
) {
    if decision.actions.attack_intent() < INTENT_THRESHOLD {
        return;
    }
    let Some(prey) = decision.percept.nearest_prey else {
        return;
    };
    let max_energy = world.config.energy.max_energy;

    let Some(attacker) = world.agent(id) else {
        return;
    };
    if attacker.is_dead() {
        return;
    }
    let damage =
        attacker.size * ATTACK_DAMAGE_PER_SIZE * (1.0 + attacker.adrenaline * 0.5);
    let reach = attacker.size + ATTACK_REACH;
    let attacker_pos = attacker.position;

    let Some(victim) = world.agent_mut(prey.id) else {
        return;
    };
    if victim.is_dead() || victim.position.distance(&attacker_pos) > reach + victim.size {
        return;
    }
    let energy_before = victim.energy;
    victim.spend_energy(damage, max_energy);
    victim.events.flag_was_attacked();
    victim.attack_damage_decay = 1.0;
    victim.fear = (victim.fear + 0.3).min(1.0);
    let lethal = victim.energy < 1.0;
    if lethal {
        victim.mark_dead();
    }

    if let Some(attacker) = world.agent_mut(id) {
        attacker.events.flag_attacked();
        attacker.aggression = (attacker.aggression + 0.2).min(1.0);
        if lethal {
            attacker.stats.kills += 1;
            attacker.gain_energy(energy_before * KILL_ENERGY_YIELD, max_energy);
        }
    }
    events.push(SimulationEvent::Attacked {
        attacker: id,
        victim: prey.id,
        lethal,
    });
}

/// Initiate a mating with the nearest same-specialization neighbor in reach
fn attempt_mating(
    world: &mut World,
    id: AgentId,
    decision: &Decision,
    population: &crate::world::PopulationView,
    events: &mut Vec<SimulationEvent>,
) {
    if decision.actions.mate_intent() < INTENT_THRESHOLD {
        return;
    }
    let Some(mate) = decision.percept.nearest_mate else {
        return;
    };
    let in_reach = world.agent(id).is_some_and(|a| {
        !a.is_dead() && a.position.distance(&mate.position) <= a.size + MATE_REACH
    });
    if !in_reach {
        return;
    }
    // Mate scoring reads fitness, so refresh the initiator's first
    let fitness_config = world.config.fitness.clone();
    if let Some(agent) = world.agent_mut(id) {
        fitness::refresh(agent, &fitness_config);
    }
    if genetics::try_sexual_mate(world, id, mate.id, population).is_ok() {
        events.push(SimulationEvent::Mated {
            initiator: id,
            partner: mate.id,
        });
    }
}

/// Asexual split for saturated agents
fn attempt_split(world: &mut World, id: AgentId, events: &mut Vec<SimulationEvent>) {
    let config = world.config.clone();
    let seed = {
        let Some((agent, rng)) = world.agent_mut_with_rng(id) else {
            return;
        };
        if agent.is_dead() {
            return;
        }
        genetics::try_split(agent, &config, rng)
    };
    if let Some(seed) = seed {
        let child = world.spawn_child(seed, id, None);
        tracing::debug!(parent = ?id, ?child, "agent split");
        events.push(SimulationEvent::Split { parent: id, child });
    }
}

/// Deposit pheromones and possibly shout, based on this tick's state
fn emit_signals(
    world: &mut World,
    id: AgentId,
    decision: &Decision,
    now: Tick,
    events: &mut Vec<SimulationEvent>,
) {
    let config = world.config.signals.clone();
    let mate_intent = decision.actions.mate_intent();

    let (pulses, vocal) = {
        let Some((agent, rng)) = world.agent_mut_with_rng(id) else {
            return;
        };
        if agent.is_dead() {
            return;
        }
        let pulses = maybe_emit_pheromones(agent, mate_intent, &config, rng);
        let chosen = choose_vocal(agent, &decision.percept, mate_intent);
        let vocal = match chosen {
            Some(kind) if rng.gen::<f32>() < config.emission_chance => {
                emit_vocal(agent, kind, 1.0, now, &config)
            }
            _ => None,
        };
        agent.current_shout = vocal.as_ref().map(|v| v.kind);
        (pulses, vocal)
    };

    world.pulses.extend(pulses);
    if let Some(vocal) = vocal {
        events.push(SimulationEvent::VocalEmitted {
            agent: id,
            kind: vocal.kind,
        });
        world.vocals.push(vocal);
    }
}

/// Pick the most urgent vocal for the agent's situation, if any
fn choose_vocal(agent: &Agent, percept: &Percept, mate_intent: f32) -> Option<VocalKind> {
    if percept.threat_closeness > 0.5 && agent.fear > 0.5 {
        Some(VocalKind::PredatorAlert)
    } else if agent.events.as_inputs()[1] > 0.0 {
        // Recently attacked
        Some(VocalKind::HelpRequest)
    } else if agent.events.as_inputs()[0] > 0.0 && percept.food_count > 1 {
        // Recently ate amid plenty
        Some(VocalKind::FoodFound)
    } else if mate_intent > MATE_CALL_INTENT {
        Some(VocalKind::MateCall)
    } else {
        None
    }
}

/// Advance pregnancies and deliver any that have come to term
fn deliver_births(
    world: &mut World,
    order: &[AgentId],
    population: &crate::world::PopulationView,
    events: &mut Vec<SimulationEvent>,
) {
    let config = world.config.clone();
    for &mother_id in order {
        let due = {
            let Some(mother) = world.agent_mut(mother_id) else {
                continue;
            };
            if mother.is_dead() {
                continue;
            }
            let mut at_term = false;
            if let Some(p) = &mut mother.pregnancy {
                p.ticks_remaining = p.ticks_remaining.saturating_sub(1);
                at_term = p.ticks_remaining == 0;
            }
            if at_term {
                mother.pregnancy.take()
            } else {
                None
            }
        };
        let Some(pregnancy) = due else {
            continue;
        };

        // Split off a deterministic birth RNG so the parent borrows below
        // stay immutable
        let birth_seed: u64 = world.rng.gen();
        let mut birth_rng = ChaCha8Rng::seed_from_u64(birth_seed);

        // A partner that died or was replaced by a regenerated lineage
        // degrades the birth to single-parent inheritance
        let father_id = world
            .agent(pregnancy.partner)
            .filter(|f| !f.is_dead() && f.gene_id == pregnancy.partner_gene)
            .map(|f| f.id);
        let seed = {
            let Some(mother) = world.agent(mother_id) else {
                continue;
            };
            let father = father_id.and_then(|f| world.agent(f));
            genetics::birth_child(mother, father, population, &config, &mut birth_rng)
        };
        let specialization = seed.specialization;
        let generation = seed.generation;
        let child = world.spawn_child(seed, mother_id, father_id);
        if let Some(mother) = world.agent_mut(mother_id) {
            mother.stats.offspring += 1;
            mother.events.flag_reproduced();
        }
        if let Some(f) = father_id {
            if let Some(father) = world.agent_mut(f) {
                father.stats.offspring += 1;
            }
        }
        tracing::debug!(?mother_id, ?child, spec = specialization.name(), "birth");
        events.push(SimulationEvent::AgentBorn {
            id: child,
            mother: mother_id,
            father: father_id,
            specialization: specialization.name(),
            generation,
        });
    }
}

/// Remove every agent flagged dead this tick
fn reap_dead(world: &mut World, events: &mut Vec<SimulationEvent>) {
    let dead: Vec<AgentId> = world
        .agents()
        .filter(|a| a.is_dead())
        .map(|a| a.id)
        .collect();
    for id in dead {
        if let Some(agent) = world.remove_agent(id) {
            events.push(SimulationEvent::AgentDied {
                id,
                specialization: agent.specialization.name(),
                frames_alive: agent.frames_alive,
            });
        }
    }
}

fn remove_consumed_food(world: &mut World, consumed: AHashSet<usize>) {
    if consumed.is_empty() {
        return;
    }
    let mut index = 0;
    world.foods.retain(|_| {
        let keep = !consumed.contains(&index);
        index += 1;
        keep
    });
}

/// Drift obstacles and reflect them off the world edges
fn drift_obstacles(world: &mut World) {
    let (w, h) = (world.config.world.width, world.config.world.height);
    for obstacle in &mut world.obstacles {
        obstacle.position = obstacle.position + obstacle.velocity;
        if obstacle.position.x < obstacle.radius || obstacle.position.x > w - obstacle.radius {
            obstacle.velocity.x = -obstacle.velocity.x;
            obstacle.position.x = obstacle.position.x.clamp(obstacle.radius, w - obstacle.radius);
        }
        if obstacle.position.y < obstacle.radius || obstacle.position.y > h - obstacle.radius {
            obstacle.velocity.y = -obstacle.velocity.y;
            obstacle.position.y = obstacle.position.y.clamp(obstacle.radius, h - obstacle.radius);
        }
    }
}

/// Age pheromone pulses and drop expired signals of both kinds
fn age_signals(world: &mut World, now: Tick) {
    for pulse in &mut world.pulses {
        pulse.age += 1;
    }
    world.pulses.retain(|p| !p.is_expired());
    world.vocals.retain(|v| v.is_audible(now));
}

/// Top the food supply back up to the configured target
pub fn replenish_food(world: &mut World) {
    let target = world.config.world.food_target as usize;
    let (w, h) = (world.config.world.width, world.config.world.height);
    let base_energy = world.config.world.food_energy;
    let high_chance = world.config.world.high_value_food_chance;
    while world.foods.len() < target {
        let high_value = world.rng.gen::<f32>() < high_chance;
        let position = Vec2::new(
            world.rng.gen_range(0.0..w),
            world.rng.gen_range(0.0..h),
        );
        world.foods.push(Food {
            position,
            size: if high_value { 7.0 } else { 4.5 },
            energy_value: if high_value {
                base_energy * 2.5
            } else {
                base_energy
            },
            high_value,
        });
    }
}
