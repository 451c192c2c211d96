pub mod config;
pub mod error;
pub mod simulation;
pub mod swarm;
pub mod world;

pub use config::{load_config, BasePosition, Cardinal, SimulationConfig, Strategy};
pub use error::{Result, SwarmError};
pub use simulation::{
    compare_strategies, export_run, render_map, DroneSummary, ExportedFiles, Simulation,
    SimulationReport, StrategySummary,
};
pub use swarm::{
    Activity, ActivityStats, ControlCenter, Drone, DroneId, DroneParams, Knowledge, KnownAnomaly,
    Message, MovementEvent, Priority, PriorityZone, StatusReport, Target,
};
pub use world::{Anomaly, AnomalyDetector, AnomalyKind, Cell, Environment, Point, Severity};
