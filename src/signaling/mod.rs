//! Social signaling: pheromone trails and vocal signals
//!
//! Trails are short-range and probabilistic, with per-trail decay; sensing
//! aggregates by maximum intensity in range, never by summation, so a pile
//! of weak trails cannot outweigh one strong one. Vocal signals are
//! instant, longer-range bursts with specialization-specific emission
//! rules.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::agent::specialization::Specialization;
use crate::agent::{Agent, HeardState, SmellState};
use crate::core::config::SignalConfig;
use crate::core::types::{AgentId, Tick, Vec2};

/// Pheromone trail type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PulseKind {
    Danger,
    Attack,
    MatingIntent,
}

/// A deposited pheromone trail
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalPulse {
    pub position: Vec2,
    pub kind: PulseKind,
    pub intensity: f32,
    pub age: u32,
    pub lifetime: u32,
}

impl SignalPulse {
    pub fn new(position: Vec2, kind: PulseKind, intensity: f32, lifetime: u32) -> Self {
        Self {
            position,
            kind,
            intensity: intensity.clamp(0.0, 1.0),
            age: 0,
            lifetime: lifetime.max(1),
        }
    }

    /// Intensity after linear decay over the trail's own lifetime
    pub fn current_intensity(&self) -> f32 {
        let remaining = 1.0 - self.age as f32 / self.lifetime as f32;
        (self.intensity * remaining).max(0.0)
    }

    pub fn is_expired(&self) -> bool {
        self.age >= self.lifetime
    }
}

/// Vocal signal type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VocalKind {
    PredatorAlert,
    FoodFound,
    HelpRequest,
    MateCall,
}

/// An instant, longer-range vocal burst with a duration window
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VocalSignal {
    pub emitter: AgentId,
    pub position: Vec2,
    pub kind: VocalKind,
    pub intensity: f32,
    pub emitted_at: Tick,
    pub duration: u32,
}

impl VocalSignal {
    pub fn is_audible(&self, now: Tick) -> bool {
        now.saturating_sub(self.emitted_at) < u64::from(self.duration)
    }
}

/// Whether a specialization may emit a given vocal kind
///
/// Predators never warn about themselves.
pub fn can_emit(spec: Specialization, kind: VocalKind) -> bool {
    !(spec == Specialization::Predator && kind == VocalKind::PredatorAlert)
}

/// Duration window for an emitted vocal; defender alerts carry twice as long
pub fn vocal_duration(spec: Specialization, kind: VocalKind, config: &SignalConfig) -> u32 {
    if spec == Specialization::Defender && kind == VocalKind::PredatorAlert {
        config.vocal_duration * 2
    } else {
        config.vocal_duration
    }
}

/// Probabilistically deposit pheromone trails for one agent
///
/// Each trail type keys off its own drive: fear lays danger trails,
/// aggression lays attack trails, and mating intent from the last action
/// vector lays mating trails.
pub fn maybe_emit_pheromones(
    agent: &Agent,
    mate_intent: f32,
    config: &SignalConfig,
    rng: &mut impl Rng,
) -> Vec<SignalPulse> {
    let mut out = Vec::new();
    let candidates = [
        (PulseKind::Danger, agent.fear),
        (PulseKind::Attack, agent.aggression),
        (PulseKind::MatingIntent, mate_intent),
    ];
    for (kind, drive) in candidates {
        if drive >= config.emission_threshold && rng.gen::<f32>() < config.emission_chance {
            out.push(SignalPulse::new(
                agent.position,
                kind,
                drive,
                config.pheromone_lifetime,
            ));
        }
    }
    out
}

/// Build a vocal burst for an agent, honoring specialization rules
pub fn emit_vocal(
    agent: &Agent,
    kind: VocalKind,
    intensity: f32,
    now: Tick,
    config: &SignalConfig,
) -> Option<VocalSignal> {
    if !can_emit(agent.specialization, kind) {
        return None;
    }
    Some(VocalSignal {
        emitter: agent.id,
        position: agent.position,
        kind,
        intensity: intensity.clamp(0.0, 1.0),
        emitted_at: now,
        duration: vocal_duration(agent.specialization, kind, config),
    })
}

/// Max-intensity-in-range pheromone aggregation for one position
pub fn sense_pheromones(position: Vec2, pulses: &[SignalPulse], radius: f32) -> SmellState {
    let mut smell = SmellState::default();
    for pulse in pulses {
        if pulse.is_expired() || pulse.position.distance(&position) > radius {
            continue;
        }
        let intensity = pulse.current_intensity();
        let slot = match pulse.kind {
            PulseKind::Danger => &mut smell.danger,
            PulseKind::Attack => &mut smell.attack,
            PulseKind::MatingIntent => &mut smell.mating,
        };
        if intensity > *slot {
            *slot = intensity;
        }
    }
    smell
}

/// Max-intensity aggregation of audible vocals for one listener
///
/// An agent never hears its own shout.
pub fn sense_vocals(
    listener: AgentId,
    position: Vec2,
    vocals: &[VocalSignal],
    now: Tick,
    radius: f32,
) -> HeardState {
    let mut heard = HeardState::default();
    for vocal in vocals {
        if vocal.emitter == listener
            || !vocal.is_audible(now)
            || vocal.position.distance(&position) > radius
        {
            continue;
        }
        let slot = match vocal.kind {
            VocalKind::PredatorAlert => &mut heard.predator_alert,
            VocalKind::FoodFound => &mut heard.food_found,
            VocalKind::HelpRequest => &mut heard.help_request,
            VocalKind::MateCall => &mut heard.mate_call,
        };
        if vocal.intensity > *slot {
            *slot = vocal.intensity;
        }
    }
    heard
}

/// Fold sensed signals back into the agent's fear/aggression state
///
/// Both drives decay every tick; signals push against the decay.
pub fn apply_signal_feedback(agent: &mut Agent) {
    let fear_push = agent
        .smell
        .danger
        .max(agent.heard.predator_alert)
        .max(agent.heard.help_request * 0.5);
    let aggression_push = agent.smell.attack;

    agent.fear = (agent.fear * 0.97 + fear_push * 0.1).clamp(0.0, 1.0);
    agent.aggression = (agent.aggression * 0.97 + aggression_push * 0.08).clamp(0.0, 1.0);

    // Adrenaline is a predator-only burst that tracks aggression spikes
    if agent.specialization == Specialization::Predator {
        agent.adrenaline = (agent.adrenaline * 0.95).max(agent.aggression * 0.8);
    } else {
        agent.adrenaline = 0.0;
    }
}
