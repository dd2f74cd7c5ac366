//! Reproduction integration tests: mating gates, splits, births, kinship

use neurofauna::agent::genealogy::{GenealogyRecord, GenealogyRegistry, Kinship};
use neurofauna::agent::specialization::Specialization;
use neurofauna::agent::AgentSeed;
use neurofauna::core::types::{AgentId, Vec2};
use neurofauna::genetics::{self, MateRefusal};
use neurofauna::simulation::Simulation;
use neurofauna::world::World;
use neurofauna::SimulationConfig;

use proptest::prelude::*;

fn mature_pair(spec: Specialization) -> (World, AgentId, AgentId) {
    let mut world = World::new(SimulationConfig::default());
    let a = world.spawn_founder(AgentSeed::founder(Vec2::new(200.0, 200.0), 150.0, spec));
    let b = world.spawn_founder(AgentSeed::founder(Vec2::new(210.0, 200.0), 150.0, spec));
    let maturity = world.config.reproduction.maturity_frames;
    for id in [a, b] {
        world.agent_mut(id).unwrap().frames_alive = maturity;
    }
    (world, a, b)
}

#[test]
fn test_underfed_initiator_refused_but_attempt_recorded() {
    let (mut world, a, b) = mature_pair(Specialization::Forager);
    world.agent_mut(a).unwrap().energy = 50.0;
    let population = world.population_view();

    assert_eq!(
        genetics::try_sexual_mate(&mut world, a, b, &population),
        Err(MateRefusal::LowEnergy)
    );
    assert_eq!(world.agent(a).unwrap().stats.reproduction_attempts, 1);
    assert!(world.agent(a).unwrap().pregnancy.is_none());
    assert_eq!(world.agent(b).unwrap().reproduction_cooldown, 0);
}

#[test]
fn test_successful_mating_charges_both_sides() {
    let (mut world, a, b) = mature_pair(Specialization::Reproducer);
    let cost = world.config.reproduction.mating_energy_cost;
    let cooldown = world.config.reproduction.mating_cooldown;
    let population = world.population_view();

    genetics::try_sexual_mate(&mut world, a, b, &population).unwrap();

    let initiator = world.agent(a).unwrap();
    assert_eq!(initiator.pregnancy.as_ref().unwrap().partner, b);
    assert!((initiator.energy - (150.0 - cost)).abs() < 1e-3);
    assert_eq!(initiator.reproduction_cooldown, cooldown);

    let partner = world.agent(b).unwrap();
    assert!(partner.pregnancy.is_none());
    assert!((partner.energy - (150.0 - cost)).abs() < 1e-3);
    assert_eq!(partner.reproduction_cooldown, cooldown);

    // The mate link is recorded immediately, not deferred to the birth
    assert!(world.genealogy.get(b).unwrap().offspring.contains(&a));
}

#[test]
fn test_mating_refused_while_on_cooldown() {
    let (mut world, a, b) = mature_pair(Specialization::Forager);
    let population = world.population_view();
    genetics::try_sexual_mate(&mut world, a, b, &population).unwrap();

    // Partner tries to come back for more immediately
    assert_eq!(
        genetics::try_sexual_mate(&mut world, b, a, &population),
        Err(MateRefusal::AlreadyPregnant)
    );
}

#[test]
fn test_split_produces_viable_child_in_world() {
    let mut config = SimulationConfig::default();
    config.world.seed = 31;
    config.world.initial_population = 0;
    let mut sim = Simulation::new(config).unwrap();
    let parent = sim.world.spawn_founder(AgentSeed::founder(
        Vec2::new(500.0, 500.0),
        300.0,
        Specialization::Reproducer,
    ));

    sim.step();

    assert_eq!(sim.world.agent_count(), 2, "split should fire at energy 300");
    let parent_agent = sim.world.agent(parent).unwrap();
    assert!(parent_agent.energy < 160.0);
    assert_eq!(
        parent_agent.reproduction_cooldown,
        (sim.world.config.reproduction.mating_cooldown as f32
            * sim.world.config.reproduction.split_cooldown_factor) as u32
    );

    let child = sim
        .world
        .agents()
        .find(|ag| ag.id != parent)
        .expect("child exists");
    assert_eq!(child.specialization, Specialization::Reproducer);
    assert_eq!(child.gene_id, parent_agent.gene_id);
    assert_eq!(child.generation, 1);
    // Lineage registered both directions
    let record = sim.world.genealogy.get(child.id).unwrap();
    assert_eq!(record.parent1, Some(parent));
    assert_eq!(
        sim.world.genealogy.relatedness(parent, child.id),
        Kinship::ParentChild
    );
}

#[test]
fn test_birth_degrades_to_single_parent_when_father_dies() {
    let (mut world, a, b) = mature_pair(Specialization::Forager);
    let population = world.population_view();
    genetics::try_sexual_mate(&mut world, a, b, &population).unwrap();

    // Father dies mid-pregnancy
    world.agent_mut(b).unwrap().mark_dead();
    world.remove_agent(b);

    let pregnancy = world.agent(a).unwrap().pregnancy.clone().unwrap();
    let mother = world.agent(a).unwrap();
    let mut rng = {
        use rand::SeedableRng;
        rand_chacha::ChaCha8Rng::seed_from_u64(4)
    };
    let seed = genetics::birth_child(mother, None, &population, &world.config, &mut rng);
    assert_eq!(pregnancy.partner, b);
    assert!(seed.weights.is_some(), "mother-only inheritance still works");
}

#[test]
fn test_sibling_and_cousin_gates() {
    let mut registry = GenealogyRegistry::new(12);
    let grandparent = AgentId::new();
    let parent1 = AgentId::new();
    let parent2 = AgentId::new();
    let child1 = AgentId::new();
    let child2 = AgentId::new();

    registry.insert(GenealogyRecord::founder(grandparent));
    registry.insert(GenealogyRecord::child(parent1, grandparent, None, 1));
    registry.insert(GenealogyRecord::child(parent2, grandparent, None, 1));
    registry.insert(GenealogyRecord::child(child1, parent1, None, 2));
    registry.insert(GenealogyRecord::child(child2, parent2, None, 2));

    // Siblings blocked, cousins allowed
    assert!(registry.relatedness(parent1, parent2).too_close_to_mate());
    assert!(!registry.relatedness(child1, child2).too_close_to_mate());
    assert_eq!(
        registry.relatedness(child1, child2),
        Kinship::DistantSameGeneration
    );
}

proptest! {
    /// Kinship classification never depends on argument order
    #[test]
    fn prop_kinship_is_symmetric(seed in 0u64..500) {
        use rand::{Rng, SeedableRng};
        let mut rng = rand_chacha::ChaCha8Rng::seed_from_u64(seed);

        let mut registry = GenealogyRegistry::new(12);
        let mut ids = vec![AgentId::new(), AgentId::new()];
        registry.insert(GenealogyRecord::founder(ids[0]));
        registry.insert(GenealogyRecord::founder(ids[1]));
        for gen in 1..4u32 {
            let mut next = Vec::new();
            for _ in 0..3 {
                let p1 = ids[rng.gen_range(0..ids.len())];
                let p2 = ids[rng.gen_range(0..ids.len())];
                let child = AgentId::new();
                let second = if p1 != p2 { Some(p2) } else { None };
                registry.insert(GenealogyRecord::child(child, p1, second, gen));
                next.push(child);
            }
            ids.extend(next);
        }

        for &x in &ids {
            for &y in &ids {
                prop_assert_eq!(registry.relatedness(x, y), registry.relatedness(y, x));
            }
        }
    }

    /// Energy mutations through the public helpers never escape [0, max]
    #[test]
    fn prop_energy_stays_clamped(
        start in 1.0f32..300.0,
        deltas in proptest::collection::vec(-80.0f32..80.0, 1..40),
    ) {
        use rand::SeedableRng;
        let config = SimulationConfig::default();
        let mut rng = rand_chacha::ChaCha8Rng::seed_from_u64(7);
        let mut agent = neurofauna::agent::Agent::spawn(
            AgentSeed::founder(Vec2::new(10.0, 10.0), start, Specialization::Forager),
            &config,
            &mut rng,
        );
        for delta in deltas {
            if delta >= 0.0 {
                agent.gain_energy(delta, config.energy.max_energy);
            } else {
                agent.spend_energy(-delta, config.energy.max_energy);
            }
            prop_assert!(agent.energy >= 0.0);
            prop_assert!(agent.energy <= config.energy.max_energy);
        }
    }
}
