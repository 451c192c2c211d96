//! Drones, their shared knowledge and the control center they report to.

pub mod comms;
pub mod control_center;
pub mod drone;
pub mod knowledge;
pub mod strategy;

/// Index of a drone within its swarm.
pub type DroneId = usize;

pub use comms::Message;
pub use control_center::{ControlCenter, Priority, PriorityZone, StatusReport, Transmission};
pub use drone::{
    Activity, ActivityStats, Drone, DroneParams, MovementEvent, MovementKind, Target, TreatOutcome,
};
pub use knowledge::{Knowledge, KnownAnomaly};
pub use strategy::{select_next_target, Decision};
