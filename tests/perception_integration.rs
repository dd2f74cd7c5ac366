//! Perception-through-a-full-tick tests: sightings, pheromones, vocals

use neurofauna::agent::memory::TargetKind;
use neurofauna::agent::specialization::Specialization;
use neurofauna::agent::AgentSeed;
use neurofauna::core::types::Vec2;
use neurofauna::signaling::{PulseKind, SignalPulse, VocalKind, VocalSignal};
use neurofauna::simulation::{Simulation, SimulationEvent};
use neurofauna::world::Food;
use neurofauna::SimulationConfig;

/// A sim with no ambient food or obstacles so the scenario under test is
/// the only thing an agent can sense
fn bare_sim(seed: u64) -> Simulation {
    let mut config = SimulationConfig::default();
    config.world.seed = seed;
    config.world.food_target = 0;
    Simulation::new(config).expect("valid config")
}

fn scratch_index(sim: &Simulation, id: neurofauna::core::types::AgentId) -> usize {
    sim.world
        .agent_ids()
        .iter()
        .position(|&other| other == id)
        .expect("agent in arena")
}

#[test]
fn test_food_ahead_fills_percept_and_target() {
    let mut sim = bare_sim(11);
    let id = sim.world.spawn_founder(AgentSeed::founder(
        Vec2::new(500.0, 500.0),
        150.0,
        Specialization::Forager,
    ));
    sim.world.foods.push(Food {
        position: Vec2::new(560.0, 500.0),
        size: 6.0,
        energy_value: 20.0,
        high_value: false,
    });

    sim.step();

    let idx = scratch_index(&sim, id);
    let percept = sim.world.scratch(idx).expect("scratch slot").percept;
    assert!(percept.nearest_food.is_some());
    assert!(percept.max_food_closeness > 0.0);

    let agent = sim.world.agent(id).expect("agent alive");
    let target = agent.target.expect("target memory set");
    assert_eq!(target.kind, TargetKind::Food);
}

#[test]
fn test_adjacent_food_gets_eaten() {
    let mut sim = bare_sim(23);
    let id = sim.world.spawn_founder(AgentSeed::founder(
        Vec2::new(300.0, 300.0),
        150.0,
        Specialization::Forager,
    ));
    sim.world.foods.push(Food {
        position: Vec2::new(301.0, 300.0),
        size: 6.0,
        energy_value: 25.0,
        high_value: false,
    });
    let before = sim.world.agent(id).expect("agent alive").energy;

    let events = sim.step();

    assert!(events
        .iter()
        .any(|e| matches!(e, SimulationEvent::FoodEaten { agent, .. } if *agent == id)));
    assert!(sim.world.foods.is_empty());
    let agent = sim.world.agent(id).expect("agent alive");
    assert!(agent.energy > before - 1.0);
    assert_eq!(agent.stats.food_eaten, 1);
}

#[test]
fn test_predator_shows_up_as_threat() {
    let mut sim = bare_sim(31);
    let prey = sim.world.spawn_founder(AgentSeed::founder(
        Vec2::new(400.0, 400.0),
        150.0,
        Specialization::Forager,
    ));
    sim.world.spawn_founder(AgentSeed::founder(
        Vec2::new(450.0, 400.0),
        150.0,
        Specialization::Predator,
    ));

    sim.step();

    let idx = scratch_index(&sim, prey);
    let percept = sim.world.scratch(idx).expect("scratch slot").percept;
    let threat = percept.nearest_threat.expect("predator sensed");
    assert!(threat.distance < 100.0);
    assert!(percept.threat_closeness > 0.0);
}

#[test]
fn test_danger_pheromone_raises_fear() {
    let mut sim = bare_sim(47);
    let id = sim.world.spawn_founder(AgentSeed::founder(
        Vec2::new(200.0, 200.0),
        150.0,
        Specialization::Forager,
    ));
    sim.world.pulses.push(SignalPulse::new(
        Vec2::new(205.0, 200.0),
        PulseKind::Danger,
        1.0,
        200,
    ));

    sim.step();

    let agent = sim.world.agent(id).expect("agent alive");
    assert!(agent.smell.danger > 0.5);
    assert!(agent.fear > 0.0);
}

#[test]
fn test_vocal_heard_by_neighbor_not_emitter() {
    let mut sim = bare_sim(59);
    let shouter = sim.world.spawn_founder(AgentSeed::founder(
        Vec2::new(600.0, 600.0),
        150.0,
        Specialization::Scout,
    ));
    let listener = sim.world.spawn_founder(AgentSeed::founder(
        Vec2::new(620.0, 600.0),
        150.0,
        Specialization::Forager,
    ));
    sim.world.vocals.push(VocalSignal {
        emitter: shouter,
        position: Vec2::new(600.0, 600.0),
        kind: VocalKind::PredatorAlert,
        intensity: 0.9,
        emitted_at: 0,
        duration: 100,
    });

    sim.step();

    let heard = sim.world.agent(listener).expect("listener alive").heard;
    assert!(heard.predator_alert > 0.5);
    let own = sim.world.agent(shouter).expect("shouter alive").heard;
    assert_eq!(own.predator_alert, 0.0);
}

#[test]
fn test_expired_signals_are_silent() {
    let mut sim = bare_sim(71);
    let id = sim.world.spawn_founder(AgentSeed::founder(
        Vec2::new(100.0, 100.0),
        150.0,
        Specialization::Forager,
    ));
    let mut pulse = SignalPulse::new(Vec2::new(100.0, 100.0), PulseKind::Attack, 1.0, 10);
    pulse.age = 10;
    sim.world.pulses.push(pulse);

    sim.step();

    let agent = sim.world.agent(id).expect("agent alive");
    assert_eq!(agent.smell.attack, 0.0);
    // The expired pulse is also swept out of the world
    assert!(sim.world.pulses.is_empty());
}
