//! Agent specializations - fixed archetypes with their own sensor geometry
//!
//! Each specialization fixes the agent's ray count, ray range, and hidden
//! layer width. Because the hidden width differs, weight blobs are only
//! compatible between agents of the same specialization.

use serde::{Deserialize, Serialize};

/// Fixed agent archetype
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Specialization {
    /// Generalist food gatherer
    Forager,
    /// Hunts other agents; the only archetype with an adrenaline response
    Predator,
    /// Long vision, fast, fragile
    Scout,
    /// Slow and durable; its predator alerts carry twice as long
    Defender,
    /// Optimized for the asexual split path
    Reproducer,
}

pub const ALL_SPECIALIZATIONS: [Specialization; 5] = [
    Specialization::Forager,
    Specialization::Predator,
    Specialization::Scout,
    Specialization::Defender,
    Specialization::Reproducer,
];

impl Specialization {
    /// Number of primary sensor rays (each contributes 5 input channels)
    pub fn num_sensor_rays(&self) -> usize {
        match self {
            Self::Forager => 12,
            Self::Predator => 14,
            Self::Scout => 16,
            Self::Defender => 10,
            Self::Reproducer => 10,
        }
    }

    /// Number of distance-only alignment rays
    pub fn num_alignment_rays(&self) -> usize {
        match self {
            Self::Scout => 6,
            _ => 4,
        }
    }

    /// Maximum ray length in world units, before the agent's vision trait
    pub fn ray_range(&self) -> f32 {
        match self {
            Self::Forager => 180.0,
            Self::Predator => 220.0,
            Self::Scout => 260.0,
            Self::Defender => 160.0,
            Self::Reproducer => 170.0,
        }
    }

    /// Recurrent hidden layer width. Fixed for the agent's whole life;
    /// mismatched widths make weight blobs incompatible.
    pub fn hidden_size(&self) -> usize {
        match self {
            Self::Forager => 18,
            Self::Predator => 22,
            Self::Scout => 16,
            Self::Defender => 20,
            Self::Reproducer => 16,
        }
    }

    /// Specialization cap on the base speed factor
    pub fn speed_cap(&self) -> f32 {
        match self {
            Self::Forager => 1.0,
            Self::Predator => 1.2,
            Self::Scout => 1.15,
            Self::Defender => 0.85,
            Self::Reproducer => 0.95,
        }
    }

    /// Angular spread of the primary sensor ring, radians, centered on the
    /// facing direction
    pub fn sensor_spread(&self) -> f32 {
        match self {
            Self::Scout => std::f32::consts::PI * 1.5,
            _ => std::f32::consts::PI,
        }
    }

    /// Trait drift bias applied at birth: (speed, vision, bulk)
    ///
    /// Predators drift faster, scouts drift longer vision, defenders drift
    /// tankier. The remaining archetypes drift without bias.
    pub fn drift_bias(&self) -> (f32, f32, f32) {
        match self {
            Self::Predator => (0.02, 0.0, 0.0),
            Self::Scout => (0.005, 0.02, -0.005),
            Self::Defender => (-0.005, 0.0, 0.02),
            Self::Forager | Self::Reproducer => (0.0, 0.0, 0.0),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Forager => "forager",
            Self::Predator => "predator",
            Self::Scout => "scout",
            Self::Defender => "defender",
            Self::Reproducer => "reproducer",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hidden_sizes_differ_between_some_specs() {
        // Incompatibility between archetypes relies on differing widths
        assert_ne!(
            Specialization::Forager.hidden_size(),
            Specialization::Predator.hidden_size()
        );
    }

    #[test]
    fn test_predator_is_fastest() {
        for spec in ALL_SPECIALIZATIONS {
            assert!(spec.speed_cap() <= Specialization::Predator.speed_cap());
        }
    }

    #[test]
    fn test_scout_sees_farthest() {
        for spec in ALL_SPECIALIZATIONS {
            assert!(spec.ray_range() <= Specialization::Scout.ray_range());
        }
    }
}
