use serde::{Deserialize, Serialize};

use crate::config::Strategy;
use crate::swarm::{ActivityStats, DroneId, PriorityZone};
use crate::world::Point;

use super::engine::Simulation;

/// Zones listed in a report.
const REPORT_ZONES: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DroneSummary {
    pub id: DroneId,
    pub activity: ActivityStats,
    pub distance_travelled: f64,
    pub battery: f64,
    pub position: Point,
    pub treated: usize,
    pub direct_detections: usize,
    pub exploration_blocked: bool,
}

/// Outcome of a run, written as JSON next to the other outputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationReport {
    pub strategy: Strategy,
    pub seed: u64,
    pub steps: u32,
    pub complete: bool,
    pub exploration_percent: f64,
    pub anomalies_total: usize,
    pub anomalies_treated: usize,
    /// Anomalies the control center has heard of.
    pub anomalies_known: usize,
    pub transmissions: usize,
    pub total_detections: usize,
    pub drones: Vec<DroneSummary>,
    pub priority_zones: Vec<PriorityZone>,
}

impl SimulationReport {
    pub fn from_simulation(sim: &Simulation) -> Self {
        let env = sim.environment();
        let control = sim.control_center();
        let drones: Vec<DroneSummary> = sim
            .drones()
            .iter()
            .map(|d| DroneSummary {
                id: d.id,
                activity: d.stats,
                distance_travelled: d.distance_travelled,
                battery: d.battery,
                position: d.position,
                treated: d.treated,
                direct_detections: d.direct_detections,
                exploration_blocked: d.exploration_blocked,
            })
            .collect();

        Self {
            strategy: sim.strategy(),
            seed: sim.seed(),
            steps: sim.current_step(),
            complete: sim.is_complete(),
            exploration_percent: 100.0 * env.exploration_ratio(),
            anomalies_total: env.anomalies().len(),
            anomalies_treated: env.treated_count(),
            anomalies_known: control.knowledge().anomalies().count(),
            transmissions: control.transmissions().len(),
            total_detections: drones.iter().map(|d| d.direct_detections).sum(),
            drones,
            priority_zones: control.priority_zones().into_iter().take(REPORT_ZONES).collect(),
        }
    }

    /// Anomalies treated, summed over drones.
    pub fn treated_by_drones(&self) -> usize {
        self.drones.iter().map(|d| d.treated).sum()
    }
}
