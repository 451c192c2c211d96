//! The ground station: collects drone reports, keeps the global picture and
//! ranks hazardous areas.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::world::{Cell, Detection, Point};

use super::drone::{Activity, Drone};
use super::knowledge::Knowledge;
use super::DroneId;

/// Hazard score above which a zone is high priority.
pub const HIGH_PRIORITY_SCORE: f64 = 0.7;
/// Hazard score above which a zone is medium priority.
pub const MEDIUM_PRIORITY_SCORE: f64 = 0.5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transmission {
    pub step: u32,
    pub drone_id: DroneId,
    pub position: Point,
    pub battery: f64,
    pub detection: Detection,
    pub at_base: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    High,
    Medium,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::High => "HIGH",
            Priority::Medium => "MEDIUM",
        }
    }

    pub fn from_score(score: f64) -> Option<Self> {
        if score > HIGH_PRIORITY_SCORE {
            Some(Priority::High)
        } else if score > MEDIUM_PRIORITY_SCORE {
            Some(Priority::Medium)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriorityZone {
    pub cell: Cell,
    pub score: f64,
    pub priority: Priority,
}

#[derive(Debug, Clone)]
pub struct ControlCenter {
    base: Point,
    knowledge: Knowledge,
    hazard: BTreeMap<Cell, f64>,
    transmissions: Vec<Transmission>,
}

impl ControlCenter {
    pub fn new(base: Point, width: usize, height: usize) -> Self {
        Self {
            base,
            knowledge: Knowledge::new(width, height),
            hazard: BTreeMap::new(),
            transmissions: Vec::new(),
        }
    }

    pub fn base(&self) -> Point {
        self.base
    }

    pub fn knowledge(&self) -> &Knowledge {
        &self.knowledge
    }

    pub fn transmissions(&self) -> &[Transmission] {
        &self.transmissions
    }

    pub fn hazard_at(&self, cell: Cell) -> Option<f64> {
        self.hazard.get(&cell).copied()
    }

    /// Takes in a drone report: its observations and the detector score at its position.
    pub fn receive_transmission(&mut self, drone: &Drone, detection: Detection, step: u32) {
        self.knowledge.merge_observations(&drone.knowledge);

        if detection.score > 0.0 {
            let score = self.hazard.entry(drone.position.cell()).or_insert(0.0);
            *score = score.max(detection.score);
        }
        if detection.alert {
            tracing::debug!(
                "Drone {} reports hazard {:.2} at ({:.1}, {:.1})",
                drone.id,
                detection.score,
                drone.position.x,
                drone.position.y
            );
        }

        self.transmissions.push(Transmission {
            step,
            drone_id: drone.id,
            position: drone.position,
            battery: drone.battery,
            detection,
            at_base: drone.is_at_base(),
        });
    }

    /// Hands the global picture to a drone sitting at the base.
    ///
    /// Returns `false` and leaves the drone untouched when it is away.
    pub fn sync_drone(&self, drone: &mut Drone) -> bool {
        if !drone.is_at_base() {
            return false;
        }
        drone.knowledge.merge_observations(&self.knowledge);
        true
    }

    /// Hazardous cells, most dangerous first.
    pub fn priority_zones(&self) -> Vec<PriorityZone> {
        let mut zones: Vec<PriorityZone> = self
            .hazard
            .iter()
            .filter_map(|(cell, score)| {
                Priority::from_score(*score).map(|priority| PriorityZone {
                    cell: *cell,
                    score: *score,
                    priority,
                })
            })
            .collect();
        zones.sort_by(|a, b| b.score.total_cmp(&a.score));
        zones
    }

    pub fn status(&self, drones: &[Drone], step: u32) -> StatusReport {
        StatusReport {
            step,
            base: self.base,
            transmissions: self.transmissions.len(),
            known_anomalies: self.knowledge.anomalies().count(),
            known_treated: self.knowledge.anomalies().filter(|a| a.treated).count(),
            explored_percent: 100.0 * self.knowledge.explored_ratio(),
            drones: drones
                .iter()
                .map(|d| DroneStatus {
                    id: d.id,
                    at_base: d.is_at_base(),
                    position: d.position,
                    battery_percent: d.battery_percent(),
                    activity: d.last_activity,
                })
                .collect(),
            zones: self.priority_zones().into_iter().take(5).collect(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DroneStatus {
    pub id: DroneId,
    pub at_base: bool,
    pub position: Point,
    pub battery_percent: f64,
    pub activity: Activity,
}

/// Snapshot of the mission as seen from the base.
#[derive(Debug, Clone)]
pub struct StatusReport {
    pub step: u32,
    pub base: Point,
    pub transmissions: usize,
    pub known_anomalies: usize,
    pub known_treated: usize,
    pub explored_percent: f64,
    pub drones: Vec<DroneStatus>,
    pub zones: Vec<PriorityZone>,
}

impl fmt::Display for StatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Control center, step {} ===", self.step)?;
        writeln!(f, "  Base: ({:.1}, {:.1})", self.base.x, self.base.y)?;
        writeln!(f, "  Drones: {}", self.drones.len())?;
        writeln!(f, "  Transmissions: {}", self.transmissions)?;
        writeln!(
            f,
            "  Known anomalies: {} ({} treated)",
            self.known_anomalies, self.known_treated
        )?;
        writeln!(f, "  Known map: {:.1}%", self.explored_percent)?;

        for drone in &self.drones {
            writeln!(
                f,
                "    Drone {} [{}] ({:.1}, {:.1}) battery {:.0}% {}",
                drone.id,
                if drone.at_base { "BASE" } else { "MISSION" },
                drone.position.x,
                drone.position.y,
                drone.battery_percent,
                drone.activity.as_str()
            )?;
        }

        if !self.zones.is_empty() {
            writeln!(f, "  Priority zones:")?;
            for zone in &self.zones {
                writeln!(
                    f,
                    "    {} ({}, {}) score {:.2}",
                    zone.priority.as_str(),
                    zone.cell.x,
                    zone.cell.y,
                    zone.score
                )?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::swarm::drone::DroneParams;
    use crate::swarm::knowledge::KnownAnomaly;
    use crate::world::{AnomalyKind, Severity};

    fn drone(position: Point) -> Drone {
        Drone::new(1, position, Point::new(5.0, 5.0), DroneParams::default(), 50, 50)
    }

    fn detection(score: f64) -> Detection {
        Detection {
            score,
            alert: score > 0.5,
        }
    }

    #[test]
    fn test_transmission_merges_knowledge_and_hazard() {
        let mut center = ControlCenter::new(Point::new(5.0, 5.0), 50, 50);
        let mut d = drone(Point::new(20.0, 20.0));
        d.knowledge.mark_explored(Cell::new(20, 20));
        d.knowledge.learn(KnownAnomaly {
            id: 0,
            position: Point::new(22.0, 20.0),
            kind: AnomalyKind::Radiation,
            severity: Severity::Intense,
            signal: 0.9,
            treated: false,
        });

        center.receive_transmission(&d, detection(0.6), 10);
        center.receive_transmission(&d, detection(0.3), 20);

        assert_eq!(center.transmissions().len(), 2);
        assert!(center.knowledge().is_explored(Cell::new(20, 20)));
        assert!(center.knowledge().knows(0));
        assert_eq!(center.hazard_at(Cell::new(20, 20)), Some(0.6));
    }

    #[test]
    fn test_sync_only_at_base() {
        let mut center = ControlCenter::new(Point::new(5.0, 5.0), 50, 50);
        let mut scout = drone(Point::new(30.0, 30.0));
        scout.knowledge.mark_explored(Cell::new(30, 30));
        center.receive_transmission(&scout, detection(0.0), 0);

        let mut away = drone(Point::new(40.0, 40.0));
        assert!(!center.sync_drone(&mut away));
        assert!(!away.knowledge.is_explored(Cell::new(30, 30)));

        let mut home = drone(Point::new(5.0, 6.0));
        assert!(center.sync_drone(&mut home));
        assert!(home.knowledge.is_explored(Cell::new(30, 30)));
    }

    #[test]
    fn test_priority_zones_sorted_and_filtered() {
        let mut center = ControlCenter::new(Point::new(5.0, 5.0), 50, 50);
        center.receive_transmission(&drone(Point::new(10.0, 10.0)), detection(0.55), 0);
        center.receive_transmission(&drone(Point::new(20.0, 20.0)), detection(0.9), 0);
        center.receive_transmission(&drone(Point::new(30.0, 30.0)), detection(0.2), 0);

        let zones = center.priority_zones();
        assert_eq!(zones.len(), 2);
        assert_eq!(zones[0].priority, Priority::High);
        assert_eq!(zones[0].cell, Cell::new(20, 20));
        assert_eq!(zones[1].priority, Priority::Medium);
    }

    #[test]
    fn test_status_report_display() {
        let mut center = ControlCenter::new(Point::new(5.0, 5.0), 50, 50);
        center.receive_transmission(&drone(Point::new(20.0, 20.0)), detection(0.9), 3);
        let drones = vec![drone(Point::new(5.0, 5.0)), drone(Point::new(25.0, 5.0))];

        let text = center.status(&drones, 3).to_string();
        assert!(text.contains("step 3"));
        assert!(text.contains("Drones: 2"));
        assert!(text.contains("[BASE]"));
        assert!(text.contains("[MISSION]"));
        assert!(text.contains("HIGH (20, 20)"));
    }
}
