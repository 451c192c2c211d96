//! The physical world the swarm operates in.

pub mod anomaly;
pub mod environment;
pub mod geometry;
pub mod sensors;
pub mod terrain;

pub use anomaly::{Anomaly, AnomalyId, AnomalyKind, Severity};
pub use environment::{Environment, EXPLORED_RATIO};
pub use geometry::{Cell, Point};
pub use sensors::{AnomalyDetector, Detection, SensorReading};
pub use terrain::{Terrain, TerrainMap};
