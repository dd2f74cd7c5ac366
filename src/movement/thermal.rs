//! Body temperature dynamics and the five-band efficiency curve

use serde::{Deserialize, Serialize};

use crate::core::config::ThermalConfig;

/// The five thermal bands, coldest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ThermalBand {
    SevereCold,
    ModerateCold,
    Optimal,
    ModerateHeat,
    SevereHeat,
}

/// Classify a body temperature into its band
pub fn band(temperature: f32, config: &ThermalConfig) -> ThermalBand {
    let e = &config.band_edges;
    if temperature < e[0] {
        ThermalBand::SevereCold
    } else if temperature < e[1] {
        ThermalBand::ModerateCold
    } else if temperature < e[2] {
        ThermalBand::Optimal
    } else if temperature < e[3] {
        ThermalBand::ModerateHeat
    } else {
        ThermalBand::SevereHeat
    }
}

/// Efficiency multiplier for a body temperature
///
/// Applied to both passive metabolic loss and thrust/rotation gain: a cold
/// agent burns less but also moves weakly.
pub fn efficiency(temperature: f32, config: &ThermalConfig) -> f32 {
    let idx = match band(temperature, config) {
        ThermalBand::SevereCold => 0,
        ThermalBand::ModerateCold => 1,
        ThermalBand::Optimal => 2,
        ThermalBand::ModerateHeat => 3,
        ThermalBand::SevereHeat => 4,
    };
    config.band_multipliers[idx]
}

/// One tick of temperature change: movement heats, the environment pulls
/// toward ambient
pub fn step_temperature(temperature: f32, speed: f32, ambient: f32, config: &ThermalConfig) -> f32 {
    let heated = temperature + speed * config.heat_per_speed;
    let cooled = heated + (ambient - heated) * config.cooling_rate;
    cooled.clamp(config.min_temperature, config.max_temperature)
}

/// Cold and heat stress scalars for the perception vector, each in [0, 1]
pub fn stress(temperature: f32, config: &ThermalConfig) -> (f32, f32) {
    let e = &config.band_edges;
    let cold = if temperature < e[1] {
        ((e[1] - temperature) / (e[1] - config.min_temperature).max(1e-6)).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let heat = if temperature >= e[2] {
        ((temperature - e[2]) / (config.max_temperature - e[2]).max(1e-6)).clamp(0.0, 1.0)
    } else {
        0.0
    };
    (cold, heat)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ThermalConfig {
        ThermalConfig::default()
    }

    #[test]
    fn test_band_classification() {
        let cfg = config();
        assert_eq!(band(2.0, &cfg), ThermalBand::SevereCold);
        assert_eq!(band(10.0, &cfg), ThermalBand::ModerateCold);
        assert_eq!(band(18.0, &cfg), ThermalBand::Optimal);
        assert_eq!(band(28.0, &cfg), ThermalBand::ModerateHeat);
        assert_eq!(band(38.0, &cfg), ThermalBand::SevereHeat);
    }

    #[test]
    fn test_efficiency_peaks_at_optimal() {
        let cfg = config();
        let optimal = efficiency(18.0, &cfg);
        for t in [2.0, 10.0, 28.0, 38.0] {
            assert!(efficiency(t, &cfg) < optimal);
        }
    }

    #[test]
    fn test_efficiency_monotone_toward_optimal() {
        let cfg = config();
        // Ascending through the cold side must never decrease
        assert!(efficiency(2.0, &cfg) <= efficiency(10.0, &cfg));
        assert!(efficiency(10.0, &cfg) <= efficiency(18.0, &cfg));
        // Descending through the hot side must never increase
        assert!(efficiency(28.0, &cfg) >= efficiency(38.0, &cfg));
        assert!(efficiency(18.0, &cfg) >= efficiency(28.0, &cfg));
    }

    #[test]
    fn test_movement_heats_environment_cools() {
        let cfg = config();
        let warmed = step_temperature(18.0, 5.0, 18.0, &cfg);
        assert!(warmed > 18.0);
        let cooled = step_temperature(30.0, 0.0, 18.0, &cfg);
        assert!(cooled < 30.0);
    }

    #[test]
    fn test_temperature_clamped() {
        let cfg = config();
        let t = step_temperature(39.9, 100.0, 60.0, &cfg);
        assert!(t <= cfg.max_temperature);
    }

    #[test]
    fn test_stress_zero_in_optimal_band() {
        let cfg = config();
        let (cold, heat) = stress(18.0, &cfg);
        assert_eq!(cold, 0.0);
        assert_eq!(heat, 0.0);
        let (cold, _) = stress(2.0, &cfg);
        assert!(cold > 0.5);
        let (_, heat) = stress(38.0, &cfg);
        assert!(heat > 0.5);
    }
}
