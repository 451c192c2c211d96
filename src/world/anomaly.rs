//! Environmental anomalies and how they evolve over time.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::geometry::Point;
use super::sensors::SensorReading;

/// Stable identifier of an anomaly within one environment.
pub type AnomalyId = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyKind {
    #[serde(alias = "pluie_meteorites")]
    MeteorShower,
    Radiation,
    #[serde(alias = "inondations")]
    Flood,
}

impl AnomalyKind {
    pub const ALL: [AnomalyKind; 3] = [
        AnomalyKind::MeteorShower,
        AnomalyKind::Radiation,
        AnomalyKind::Flood,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AnomalyKind::MeteorShower => "meteor_shower",
            AnomalyKind::Radiation => "radiation",
            AnomalyKind::Flood => "flood",
        }
    }
}

impl FromStr for AnomalyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "meteor_shower" | "meteors" | "pluie_meteorites" => Ok(AnomalyKind::MeteorShower),
            "radiation" => Ok(AnomalyKind::Radiation),
            "flood" | "inondations" => Ok(AnomalyKind::Flood),
            other => Err(format!("unknown anomaly kind '{}'", other)),
        }
    }
}

/// Weak anomalies are cheaper to treat than intense ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Weak,
    Intense,
}

impl Severity {
    pub fn initial_signal(&self) -> f64 {
        match self {
            Severity::Weak => 0.6,
            Severity::Intense => 0.9,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Weak => "weak",
            Severity::Intense => "intense",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Anomaly {
    pub id: AnomalyId,
    pub position: Point,
    pub kind: AnomalyKind,
    pub severity: Severity,
    /// Sensor signal strength in `[0, 1]`
    pub signal: f64,
    /// Spatial spread of the sensor signal
    pub radius: f64,
    pub treated: bool,
}

impl Anomaly {
    pub fn new(id: AnomalyId, position: Point, kind: AnomalyKind, severity: Severity, radius: f64) -> Self {
        Self {
            id,
            position,
            kind,
            severity,
            signal: severity.initial_signal(),
            radius,
            treated: false,
        }
    }

    pub fn is_intense(&self) -> bool {
        self.severity == Severity::Intense
    }

    /// Contribution of this anomaly to the sensors at `at`, on top of the baseline.
    ///
    /// The influence decays as a gaussian of the distance with `radius` as the
    /// standard deviation.
    pub fn sensor_delta(&self, at: &Point) -> SensorReading {
        let dx = self.position.x - at.x;
        let dy = self.position.y - at.y;
        let d2 = dx * dx + dy * dy;
        let influence = self.signal * (-d2 / (2.0 * self.radius * self.radius)).exp();

        match self.kind {
            AnomalyKind::MeteorShower => SensorReading {
                temperature: 10.0 * influence,
                radiation: 0.0,
                meteorites: influence,
                flooding: 0.0,
            },
            AnomalyKind::Radiation => SensorReading {
                temperature: 15.0 * influence,
                radiation: influence,
                meteorites: 0.0,
                flooding: 0.0,
            },
            AnomalyKind::Flood => SensorReading {
                temperature: 5.0 * influence,
                radiation: 0.0,
                meteorites: 0.3 * influence,
                flooding: influence,
            },
        }
    }

    /// Advances the kind-specific dynamics by one step.
    pub fn evolve(&mut self, step: u32) {
        if self.treated {
            return;
        }

        match self.kind {
            AnomalyKind::MeteorShower => {
                let variation = (step as f64 * 0.1).sin() * 0.15;
                self.signal = (self.signal + variation).clamp(0.3, 1.0);
            }
            AnomalyKind::Radiation => {
                if step % 20 == 0 {
                    self.radius = (self.radius + 0.2).min(20.0);
                    self.signal = (self.signal - 0.01).max(0.4);
                }
            }
            AnomalyKind::Flood => {
                if step < 100 {
                    if step % 15 == 0 {
                        self.radius = (self.radius + 0.5).min(18.0);
                        self.signal = (self.signal + 0.02).min(1.0);
                    }
                } else if step % 25 == 0 {
                    self.radius = (self.radius - 0.3).max(5.0);
                    self.signal = (self.signal - 0.015).max(0.3);
                }
            }
        }
    }

    /// Turns a weak anomaly into an intense one.
    pub fn escalate(&mut self) {
        if self.severity == Severity::Weak {
            self.severity = Severity::Intense;
            self.signal = self.signal.max(Severity::Intense.initial_signal());
        }
    }
}
