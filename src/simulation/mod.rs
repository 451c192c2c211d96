//! Running a mission end to end and reporting on it.

pub mod compare;
pub mod engine;
pub mod export;
pub mod report;

pub use compare::{compare_strategies, StrategySummary};
pub use engine::Simulation;
pub use export::{export_run, render_map, ExportedFiles};
pub use report::{DroneSummary, SimulationReport};
