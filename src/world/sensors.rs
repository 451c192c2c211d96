//! Sensor readings and the threshold-based anomaly detector.

use serde::{Deserialize, Serialize};

use crate::config::DetectorSettings;

/// Sensor values as reported by a drone's payload.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SensorReading {
    /// Degrees Celsius
    pub temperature: f64,
    pub radiation: f64,
    pub meteorites: f64,
    pub flooding: f64,
}

impl SensorReading {
    /// Readings of a healthy environment.
    pub const BASELINE: SensorReading = SensorReading {
        temperature: 20.0,
        radiation: 0.1,
        meteorites: 0.1,
        flooding: 0.1,
    };

    pub fn add(&mut self, delta: &SensorReading) {
        self.temperature += delta.temperature;
        self.radiation += delta.radiation;
        self.meteorites += delta.meteorites;
        self.flooding += delta.flooding;
    }

    pub fn clamped(&self) -> SensorReading {
        SensorReading {
            temperature: self.temperature.clamp(0.0, 100.0),
            radiation: self.radiation.clamp(0.0, 100.0),
            meteorites: self.meteorites.clamp(0.0, 100.0),
            flooding: self.flooding.clamp(0.0, 100.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Weighted anomaly score in `[0, 1]`
    pub score: f64,
    pub alert: bool,
}

/// Scores readings against per-sensor thresholds.
#[derive(Debug, Clone)]
pub struct AnomalyDetector {
    settings: DetectorSettings,
}

impl AnomalyDetector {
    /// Temperature at which the temperature term saturates.
    pub const TEMPERATURE_CEILING: f64 = 50.0;

    pub fn new(settings: DetectorSettings) -> Self {
        Self { settings }
    }

    pub fn score(&self, reading: &SensorReading) -> f64 {
        let s = &self.settings;
        let mut score = 0.0;

        if reading.temperature > s.temperature_threshold {
            score += 0.3 * (reading.temperature - s.temperature_threshold)
                / (Self::TEMPERATURE_CEILING - s.temperature_threshold);
        }
        if reading.radiation > s.radiation_threshold {
            score += 0.3 * (reading.radiation - s.radiation_threshold) / (1.0 - s.radiation_threshold);
        }
        if reading.meteorites > s.meteorites_threshold {
            score +=
                0.2 * (reading.meteorites - s.meteorites_threshold) / (1.0 - s.meteorites_threshold);
        }
        if reading.flooding > s.flooding_threshold {
            score += 0.2 * (reading.flooding - s.flooding_threshold) / (1.0 - s.flooding_threshold);
        }

        score.min(1.0)
    }

    pub fn detect(&self, reading: &SensorReading) -> Detection {
        let score = self.score(reading);
        Detection {
            score,
            alert: score > self.settings.alert_threshold,
        }
    }
}

impl Default for AnomalyDetector {
    fn default() -> Self {
        Self::new(DetectorSettings::default())
    }
}
