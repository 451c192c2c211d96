//! Simulation configuration.
//!
//! Every tunable of a run lives here, grouped by concern. Files are loaded by
//! [`loader::load_config`]; any field left out falls back to its default.

pub mod base;
pub mod loader;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SwarmError};
use crate::world::{AnomalyDetector, AnomalyKind};

pub use base::{BasePosition, Cardinal};
pub use loader::load_config;

/// Decision policy shared by every drone of the swarm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Explore, and treat an anomaly as soon as one is known.
    #[default]
    Action,
    /// Explore the whole map before treating anything.
    Exploration,
    /// Head for known anomalies, switching to more severe ones en route.
    #[serde(alias = "mixte")]
    Mixed,
}

impl Strategy {
    pub const ALL: [Strategy; 3] = [Strategy::Action, Strategy::Exploration, Strategy::Mixed];

    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Action => "action",
            Strategy::Exploration => "exploration",
            Strategy::Mixed => "mixed",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "action" => Ok(Strategy::Action),
            "exploration" => Ok(Strategy::Exploration),
            "mixed" | "mixte" => Ok(Strategy::Mixed),
            other => Err(format!(
                "unknown strategy '{}' (expected action, exploration or mixed)",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub strategy: Strategy,
    pub simulation: RunSettings,
    pub battery: BatterySettings,
    pub drone: DroneSettings,
    pub anomalies: AnomalySettings,
    pub environment: EnvironmentSettings,
    pub detector: DetectorSettings,
    pub output: OutputSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunSettings {
    pub max_turns: u32,
    pub num_drones: usize,
    /// Fixed seed for reproducible runs; entropy when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    /// Stop before `max_turns` once every anomaly is treated and the map is explored
    pub stop_when_complete: bool,
    /// Steps between two status reports
    pub status_interval: u32,
    /// Steps between two periodic transmissions to the control center
    pub transmission_interval: u32,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            max_turns: 300,
            num_drones: 5,
            seed: Some(42),
            stop_when_complete: false,
            status_interval: 50,
            transmission_interval: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatterySettings {
    pub max: f64,
    /// Charge restored per turn at the base
    pub recharge_rate: f64,
    /// Charge consumed per map unit travelled
    pub movement_cost: f64,
    pub treatment_cost_weak: f64,
    pub treatment_cost_intense: f64,
    /// Fraction of `max` required before leaving the base
    pub departure_threshold: f64,
    /// Fraction of `max` below which a drone stays at the base
    pub critical_threshold: f64,
}

impl Default for BatterySettings {
    fn default() -> Self {
        Self {
            max: 100.0,
            recharge_rate: 10.0,
            movement_cost: 0.1,
            treatment_cost_weak: 5.0,
            treatment_cost_intense: 15.0,
            departure_threshold: 0.85,
            critical_threshold: 0.15,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DroneSettings {
    /// Map units per turn
    pub speed: f64,
    pub vision_radius: f64,
    pub communication_radius: f64,
    /// Distance under which a target counts as reached
    pub arrival_radius: f64,
    /// Cells marked explored on each side of the flight path
    pub trail_radius: i32,
    /// Maximum offset from the base at spawn
    pub spawn_jitter: f64,
}

impl Default for DroneSettings {
    fn default() -> Self {
        Self {
            speed: 5.0,
            vision_radius: 10.0,
            communication_radius: 10.0,
            arrival_radius: 3.0,
            trail_radius: 2,
            spawn_jitter: 5.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnomalySettings {
    pub count: usize,
    pub kinds: Vec<AnomalyKind>,
    /// Probability that a generated anomaly is intense
    pub intense_ratio: f64,
    pub min_distance: f64,
    pub min_distance_from_base: f64,
    /// Per-step chance that an intense anomaly spawns a weak neighbour
    pub spread_chance: f64,
    /// Per-step chance that a weak anomaly turns intense
    pub snowball_chance: f64,
    pub min_radius: f64,
    pub max_radius: f64,
}

impl Default for AnomalySettings {
    fn default() -> Self {
        Self {
            count: 20,
            kinds: AnomalyKind::ALL.to_vec(),
            intense_ratio: 0.5,
            min_distance: 1.0,
            min_distance_from_base: 10.0,
            spread_chance: 0.0,
            snowball_chance: 0.0,
            min_radius: 5.0,
            max_radius: 10.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentSettings {
    pub width: usize,
    pub height: usize,
    pub base: BasePosition,
    /// Generate forests, rivers and lakes; a flat plain otherwise
    pub terrain: bool,
}

impl Default for EnvironmentSettings {
    fn default() -> Self {
        Self {
            width: 100,
            height: 100,
            base: BasePosition::Cardinal(Cardinal::West),
            terrain: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorSettings {
    pub temperature_threshold: f64,
    pub radiation_threshold: f64,
    pub meteorites_threshold: f64,
    pub flooding_threshold: f64,
    /// Score above which a reading raises an alert
    pub alert_threshold: f64,
}

impl Default for DetectorSettings {
    fn default() -> Self {
        Self {
            temperature_threshold: 30.0,
            radiation_threshold: 0.4,
            meteorites_threshold: 0.3,
            flooding_threshold: 0.4,
            alert_threshold: 0.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    pub directory: String,
    pub run_name: String,
    pub save_movements_csv: bool,
    pub save_report: bool,
    pub save_map: bool,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            directory: "results".to_string(),
            run_name: "simulation".to_string(),
            save_movements_csv: true,
            save_report: true,
            save_map: true,
        }
    }
}

impl SimulationConfig {
    /// Rejects configurations the simulation cannot run.
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(SwarmError::InvalidConfig(msg));

        if self.simulation.num_drones == 0 {
            return invalid("num_drones must be at least 1".to_string());
        }
        if self.environment.width == 0 || self.environment.height == 0 {
            return invalid(format!(
                "map size must be positive, got {}x{}",
                self.environment.width, self.environment.height
            ));
        }
        if self.drone.speed <= 0.0 {
            return invalid(format!("drone speed must be positive, got {}", self.drone.speed));
        }
        if self.drone.vision_radius < 0.0
            || self.drone.communication_radius < 0.0
            || self.drone.spawn_jitter < 0.0
            || self.drone.trail_radius < 0
        {
            return invalid("radii must not be negative".to_string());
        }
        if self.drone.arrival_radius <= 0.0 {
            return invalid(format!(
                "arrival_radius must be positive, got {}",
                self.drone.arrival_radius
            ));
        }
        if self.battery.max <= 0.0 {
            return invalid(format!("battery max must be positive, got {}", self.battery.max));
        }
        if self.battery.movement_cost < 0.0
            || self.battery.treatment_cost_weak < 0.0
            || self.battery.treatment_cost_intense < 0.0
        {
            return invalid("battery costs must not be negative".to_string());
        }

        let fractions = [
            ("departure_threshold", self.battery.departure_threshold),
            ("critical_threshold", self.battery.critical_threshold),
            ("intense_ratio", self.anomalies.intense_ratio),
            ("spread_chance", self.anomalies.spread_chance),
            ("snowball_chance", self.anomalies.snowball_chance),
            ("alert_threshold", self.detector.alert_threshold),
        ];
        for (name, value) in fractions {
            if !(0.0..=1.0).contains(&value) {
                return invalid(format!("{} must be within [0, 1], got {}", name, value));
            }
        }

        // Sensor thresholds divide by their distance to the saturation point.
        let sensor_thresholds = [
            ("radiation_threshold", self.detector.radiation_threshold),
            ("meteorites_threshold", self.detector.meteorites_threshold),
            ("flooding_threshold", self.detector.flooding_threshold),
        ];
        for (name, value) in sensor_thresholds {
            if !(0.0..1.0).contains(&value) {
                return invalid(format!("{} must be within [0, 1), got {}", name, value));
            }
        }
        if self.detector.temperature_threshold >= AnomalyDetector::TEMPERATURE_CEILING {
            return invalid(format!(
                "temperature_threshold must be below {}, got {}",
                AnomalyDetector::TEMPERATURE_CEILING,
                self.detector.temperature_threshold
            ));
        }

        if self.anomalies.count > 0 && self.anomalies.kinds.is_empty() {
            return invalid("at least one anomaly kind is required".to_string());
        }
        if self.anomalies.min_radius <= 0.0 || self.anomalies.min_radius > self.anomalies.max_radius {
            return invalid(format!(
                "anomaly radius range is invalid: {}..{}",
                self.anomalies.min_radius, self.anomalies.max_radius
            ));
        }

        if let BasePosition::Fixed { x, y } = self.environment.base {
            let (w, h) = (self.environment.width as f64, self.environment.height as f64);
            if x < 0.0 || y < 0.0 || x >= w || y >= h {
                return invalid(format!("base ({}, {}) lies outside the {}x{} map", x, y, w, h));
            }
        }

        if self.simulation.transmission_interval == 0 || self.simulation.status_interval == 0 {
            return invalid("intervals must be at least 1".to_string());
        }

        Ok(())
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = SimulationConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.simulation.max_turns, 300);
        assert_eq!(config.simulation.num_drones, 5);
        assert_eq!(config.strategy, Strategy::Action);
    }

    #[test]
    fn test_zero_drones_rejected() {
        let mut config = SimulationConfig::default();
        config.simulation.num_drones = 0;
        assert!(matches!(config.validate(), Err(SwarmError::InvalidConfig(_))));
    }

    #[test]
    fn test_threshold_out_of_range_rejected() {
        let mut config = SimulationConfig::default();
        config.battery.departure_threshold = 1.5;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("departure_threshold"));
    }

    #[test]
    fn test_sensor_thresholds_out_of_range_rejected() {
        for value in [1.0, 1.5, -0.1] {
            let mut config = SimulationConfig::default();
            config.detector.radiation_threshold = value;
            let err = config.validate().unwrap_err();
            assert!(err.to_string().contains("radiation_threshold"));

            let mut config = SimulationConfig::default();
            config.detector.meteorites_threshold = value;
            let err = config.validate().unwrap_err();
            assert!(err.to_string().contains("meteorites_threshold"));

            let mut config = SimulationConfig::default();
            config.detector.flooding_threshold = value;
            let err = config.validate().unwrap_err();
            assert!(err.to_string().contains("flooding_threshold"));
        }
    }

    #[test]
    fn test_temperature_threshold_at_ceiling_rejected() {
        let mut config = SimulationConfig::default();
        config.detector.temperature_threshold = AnomalyDetector::TEMPERATURE_CEILING;
        assert!(config.validate().is_err());

        config.detector.temperature_threshold = 60.0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("temperature_threshold"));

        config.detector.temperature_threshold = 49.0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_non_positive_arrival_radius_rejected() {
        let mut config = SimulationConfig::default();
        config.drone.arrival_radius = 0.0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("arrival_radius"));

        config.drone.arrival_radius = -1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_negative_jitter_or_trail_rejected() {
        let mut config = SimulationConfig::default();
        config.drone.spawn_jitter = -0.5;
        assert!(config.validate().is_err());

        let mut config = SimulationConfig::default();
        config.drone.trail_radius = -1;
        assert!(config.validate().is_err());

        let mut config = SimulationConfig::default();
        config.drone.trail_radius = 0;
        config.drone.spawn_jitter = 0.0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_fixed_base_outside_map_rejected() {
        let mut config = SimulationConfig::default();
        config.environment.base = BasePosition::Fixed { x: 150.0, y: 10.0 };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_bad_radius_range_rejected() {
        let mut config = SimulationConfig::default();
        config.anomalies.min_radius = 12.0;
        config.anomalies.max_radius = 4.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_strategy_parsing() {
        assert_eq!("mixte".parse::<Strategy>(), Ok(Strategy::Mixed));
        assert_eq!("ACTION".parse::<Strategy>(), Ok(Strategy::Action));
        assert!("random".parse::<Strategy>().is_err());
    }

    #[test]
    fn test_toml_roundtrip_preserves_defaults() {
        let config = SimulationConfig::default();
        let text = config.to_toml().unwrap();
        let parsed: SimulationConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed, config);
    }
}
