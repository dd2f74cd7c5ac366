//! Reproduction: mate gating, asexual splitting, and offspring assembly
//!
//! Sexual reproduction is a two-step affair: a successful mate attempt sets
//! a pregnancy on the initiator, and the birth happens when the pregnancy
//! timer expires, at which point the partner may already be gone. Splitting
//! is the pressure valve for energy-saturated agents with nobody to mate.

use rand::Rng;
use rand_distr::{Distribution, Normal};

use crate::agent::specialization::{Specialization, ALL_SPECIALIZATIONS};
use crate::agent::{Agent, AgentSeed, PhysicalTraits, Pregnancy};
use crate::brain::Brain;
use crate::core::config::SimulationConfig;
use crate::core::types::{AgentId, Vec2};
use crate::world::{PopulationView, World};

/// How far from the parent a newborn is placed
const BIRTH_OFFSET: f32 = 12.0;

/// Why a mate attempt was refused, surfaced in events and logs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MateRefusal {
    PartnerGone,
    DifferentSpecialization,
    Immature,
    AlreadyPregnant,
    OnCooldown,
    LowEnergy,
    TooCloselyRelated,
    QualityBelowStandard,
}

/// Attempt a mating between two agents; on success the initiator becomes
/// pregnant and both pay the energy and cooldown price
///
/// Every attempt by a living initiator counts toward its
/// `reproduction_attempts` stat, refused or not.
pub fn try_sexual_mate(
    world: &mut World,
    initiator: AgentId,
    partner: AgentId,
    population: &PopulationView,
) -> Result<(), MateRefusal> {
    let repro = world.config.reproduction.clone();
    let max_energy = world.config.energy.max_energy;

    if let Some(a) = world.agent_mut(initiator) {
        a.stats.reproduction_attempts += 1;
    } else {
        return Err(MateRefusal::PartnerGone);
    }

    let refusal = {
        let Some(a) = world.agent(initiator) else {
            return Err(MateRefusal::PartnerGone);
        };
        let Some(b) = world.agent(partner) else {
            return Err(MateRefusal::PartnerGone);
        };
        if b.is_dead() {
            Some(MateRefusal::PartnerGone)
        } else if a.specialization != b.specialization {
            Some(MateRefusal::DifferentSpecialization)
        } else if a.frames_alive < repro.maturity_frames || b.frames_alive < repro.maturity_frames
        {
            Some(MateRefusal::Immature)
        } else if a.pregnancy.is_some() || b.pregnancy.is_some() {
            Some(MateRefusal::AlreadyPregnant)
        } else if a.reproduction_cooldown > 0 || b.reproduction_cooldown > 0 {
            Some(MateRefusal::OnCooldown)
        } else if a.energy < repro.min_energy_to_reproduce
            || b.energy < repro.min_energy_to_reproduce
        {
            Some(MateRefusal::LowEnergy)
        } else if world
            .genealogy
            .relatedness(initiator, partner)
            .too_close_to_mate()
        {
            Some(MateRefusal::TooCloselyRelated)
        } else {
            let own = mate_quality(a, population, max_energy);
            let offered = mate_quality(b, population, max_energy);
            if offered < repro.mate_quality_floor * own {
                Some(MateRefusal::QualityBelowStandard)
            } else {
                None
            }
        }
    };
    if let Some(reason) = refusal {
        tracing::trace!(?initiator, ?partner, ?reason, "mate attempt refused");
        return Err(reason);
    }

    let partner_gene = match world.agent(partner) {
        Some(b) => b.gene_id,
        None => return Err(MateRefusal::PartnerGone),
    };
    if let Some(a) = world.agent_mut(initiator) {
        a.pregnancy = Some(Pregnancy {
            partner,
            partner_gene,
            ticks_remaining: repro.pregnancy_duration,
        });
        a.reproduction_cooldown = repro.mating_cooldown;
        a.spend_energy(repro.mating_energy_cost, max_energy);
        a.events.flag_reproduced();
    }
    if let Some(b) = world.agent_mut(partner) {
        b.reproduction_cooldown = repro.mating_cooldown;
        b.spend_energy(repro.mating_energy_cost, max_energy);
        b.events.flag_reproduced();
    }
    // The mate link lands on the partner's record at mate time; the child
    // links both parents at birth, which may never come
    world.genealogy.record_offspring(partner, initiator);
    tracing::debug!(?initiator, ?partner, "mating succeeded");
    Ok(())
}

/// Desirability of an agent as a mate: normalized fitness, inherited speed,
/// and current energy reserves
fn mate_quality(agent: &Agent, population: &PopulationView, max_energy: f32) -> f32 {
    let norm_fitness = (agent.fitness / population.max_fitness()).clamp(0.0, 1.0);
    let norm_speed = ((agent.traits.speed_factor - 0.5) / 1.0).clamp(0.0, 1.0);
    let norm_energy = (agent.energy / max_energy).clamp(0.0, 1.0);
    0.4 * norm_fitness + 0.3 * norm_speed + 0.3 * norm_energy
}

/// Asexual split for an energy-saturated agent off cooldown
///
/// Returns the child seed; the caller inserts it and registers genealogy.
/// The parent keeps half its energy and takes an extended cooldown.
pub fn try_split(
    agent: &mut Agent,
    config: &SimulationConfig,
    rng: &mut impl Rng,
) -> Option<AgentSeed> {
    let repro = &config.reproduction;
    let threshold = repro.split_energy_fraction * config.energy.max_energy;
    if agent.energy <= threshold || agent.reproduction_cooldown > 0 || agent.pregnancy.is_some() {
        return None;
    }

    agent.energy /= 2.0;
    agent.reproduction_cooldown =
        (repro.mating_cooldown as f32 * repro.split_cooldown_factor) as u32;
    agent.stats.offspring += 1;
    agent.events.flag_reproduced();

    let mut brain = agent.brain.clone();
    brain.mutate(repro.mutation_rate * repro.split_mutation_scale, rng, None);

    Some(AgentSeed {
        position: birth_position(agent.position, rng),
        energy: agent.energy,
        specialization: agent.specialization,
        weights: Some(brain.to_blob()),
        // A split clone carries the parent's lineage tag
        gene_id: Some(agent.gene_id),
        generation: agent.generation + 1,
        traits: drift_traits(agent.traits, agent.specialization, repro.trait_drift, rng),
    })
}

/// Assemble the seed for a pregnancy that has come to term
///
/// A dead or vanished partner degrades to single-parent inheritance from
/// the mother alone. A specialization mutation discards the inherited
/// weights entirely, since layer shapes differ between specializations.
pub fn birth_child(
    mother: &Agent,
    father: Option<&Agent>,
    population: &PopulationView,
    config: &SimulationConfig,
    rng: &mut impl Rng,
) -> AgentSeed {
    let repro = &config.reproduction;

    let mut specialization = mother.specialization;
    let mutated_specialization = rng.gen::<f32>() < repro.specialization_mutation_chance;
    if mutated_specialization {
        let options: Vec<Specialization> = ALL_SPECIALIZATIONS
            .into_iter()
            .filter(|s| *s != mother.specialization)
            .collect();
        specialization = options[rng.gen_range(0..options.len())];
        tracing::debug!(
            mother = ?mother.id,
            from = mother.specialization.name(),
            to = specialization.name(),
            "specialization mutated at birth"
        );
    }

    let base_traits = match father {
        Some(f) => PhysicalTraits {
            speed_factor: (mother.traits.speed_factor + f.traits.speed_factor) / 2.0,
            vision_factor: (mother.traits.vision_factor + f.traits.vision_factor) / 2.0,
            bulk_factor: (mother.traits.bulk_factor + f.traits.bulk_factor) / 2.0,
        },
        None => mother.traits,
    };
    let generation = father.map_or(mother.generation, |f| f.generation.max(mother.generation)) + 1;

    let (weights, gene_id) = if mutated_specialization {
        // Fresh lineage: random weights for the new layer shape
        (None, None)
    } else {
        let mut brain = match father {
            Some(f) => Brain::crossover(&mother.brain, &f.brain, mother.fitness, f.fitness),
            None => mother.brain.clone(),
        };
        let percentile = population.percentile(mother.fitness);
        brain.mutate(repro.mutation_rate, rng, Some(percentile));
        // The child stays in the fitter parent's gene lineage; only a
        // specialization mutation mints a new gene id
        let lineage = match father {
            Some(f) if f.fitness > mother.fitness => f.gene_id,
            _ => mother.gene_id,
        };
        (Some(brain.to_blob()), Some(lineage))
    };

    AgentSeed {
        position: birth_position(mother.position, rng),
        energy: config.energy.starting_energy,
        specialization,
        weights,
        gene_id,
        generation,
        traits: drift_traits(base_traits, specialization, repro.trait_drift, rng),
    }
}

/// Gaussian trait drift nudged by the specialization's bias direction
fn drift_traits(
    base: PhysicalTraits,
    specialization: Specialization,
    drift: f32,
    rng: &mut impl Rng,
) -> PhysicalTraits {
    let Ok(noise) = Normal::new(0.0f32, drift.max(1e-6)) else {
        return base;
    };
    let (speed_bias, vision_bias, bulk_bias) = specialization.drift_bias();
    PhysicalTraits {
        speed_factor: (base.speed_factor + noise.sample(rng) + speed_bias * drift)
            .clamp(0.5, 1.5),
        vision_factor: (base.vision_factor + noise.sample(rng) + vision_bias * drift)
            .clamp(0.5, 1.5),
        bulk_factor: (base.bulk_factor + noise.sample(rng) + bulk_bias * drift).clamp(0.5, 1.5),
    }
}

fn birth_position(parent: Vec2, rng: &mut impl Rng) -> Vec2 {
    let angle = rng.gen_range(0.0..std::f32::consts::TAU);
    parent + Vec2::from_angle(angle) * BIRTH_OFFSET
}
