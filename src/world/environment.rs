//! The simulated area: terrain, anomalies and the ground-truth exploration map.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::config::{AnomalySettings, SimulationConfig};

use super::anomaly::{Anomaly, AnomalyId, AnomalyKind, Severity};
use super::geometry::{Cell, Point};
use super::sensors::SensorReading;
use super::terrain::{Terrain, TerrainMap};

/// Give up placing an anomaly after this many rejected positions.
const MAX_PLACEMENT_ATTEMPTS: usize = 1000;

/// Exploration ratio treated as a fully explored map.
pub const EXPLORED_RATIO: f64 = 0.999;

#[derive(Debug, Clone)]
pub struct Environment {
    width: usize,
    height: usize,
    base: Point,
    terrain: TerrainMap,
    anomalies: Vec<Anomaly>,
    explored: Vec<bool>,
    explored_count: usize,
}

impl Environment {
    pub fn new(width: usize, height: usize, base: Point, terrain: TerrainMap) -> Self {
        Self {
            width,
            height,
            base,
            terrain,
            anomalies: Vec::new(),
            explored: vec![false; width * height],
            explored_count: 0,
        }
    }

    /// Builds the environment described by `config`: base, terrain and anomalies.
    pub fn generate<R: Rng>(config: &SimulationConfig, rng: &mut R) -> Self {
        let settings = &config.environment;
        let base = settings.base.resolve(settings.width, settings.height, rng);
        let terrain = if settings.terrain {
            TerrainMap::generate(settings.width, settings.height, rng)
        } else {
            TerrainMap::flat(settings.width, settings.height)
        };

        let mut env = Self::new(settings.width, settings.height, base, terrain);
        env.populate(&config.anomalies, rng);
        env
    }

    fn populate<R: Rng>(&mut self, settings: &AnomalySettings, rng: &mut R) {
        for n in 0..settings.count {
            let Some(position) = self.find_free_position(settings, rng) else {
                tracing::warn!(
                    "Placed only {} of {} anomalies: no free position left",
                    n,
                    settings.count
                );
                break;
            };

            let Some(kind) = settings.kinds.choose(rng).copied() else {
                break;
            };
            let severity = if rng.gen_bool(settings.intense_ratio) {
                Severity::Intense
            } else {
                Severity::Weak
            };
            let radius = if settings.max_radius > settings.min_radius {
                rng.gen_range(settings.min_radius..settings.max_radius)
            } else {
                settings.min_radius
            };

            self.add_anomaly(position, kind, severity, radius);
        }
    }

    fn find_free_position<R: Rng>(&self, settings: &AnomalySettings, rng: &mut R) -> Option<Point> {
        (0..MAX_PLACEMENT_ATTEMPTS)
            .map(|_| {
                Point::new(
                    rng.gen_range(0.0..self.width as f64),
                    rng.gen_range(0.0..self.height as f64),
                )
            })
            .find(|candidate| self.is_free(candidate, settings))
    }

    fn is_free(&self, candidate: &Point, settings: &AnomalySettings) -> bool {
        candidate.distance(&self.base) >= settings.min_distance_from_base
            && self
                .anomalies
                .iter()
                .all(|a| a.position.distance(candidate) >= settings.min_distance)
    }

    pub fn add_anomaly(
        &mut self,
        position: Point,
        kind: AnomalyKind,
        severity: Severity,
        radius: f64,
    ) -> AnomalyId {
        let id = self.anomalies.len() as AnomalyId;
        self.anomalies.push(Anomaly::new(id, position, kind, severity, radius));
        id
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn base(&self) -> Point {
        self.base
    }

    pub fn terrain(&self) -> &TerrainMap {
        &self.terrain
    }

    pub fn terrain_at(&self, point: &Point) -> Terrain {
        self.terrain.get(point.cell())
    }

    pub fn anomalies(&self) -> &[Anomaly] {
        &self.anomalies
    }

    pub fn anomaly(&self, id: AnomalyId) -> Option<&Anomaly> {
        self.anomalies.get(id as usize)
    }

    pub fn contains(&self, cell: Cell) -> bool {
        cell.x >= 0 && cell.y >= 0 && (cell.x as usize) < self.width && (cell.y as usize) < self.height
    }

    /// Readings a sensor would report at `point`: terrain effects plus every untreated anomaly.
    pub fn sensor_data(&self, point: &Point) -> SensorReading {
        let mut reading = SensorReading::BASELINE;

        match self.terrain_at(point) {
            Terrain::Plain => {}
            Terrain::Forest => reading.temperature -= 2.0,
            Terrain::River => {
                reading.flooding += 0.15;
                reading.temperature -= 3.0;
            }
            Terrain::Lake => {
                reading.flooding += 0.1;
                reading.temperature -= 4.0;
            }
        }

        for anomaly in self.anomalies.iter().filter(|a| !a.treated) {
            reading.add(&anomaly.sensor_delta(point));
        }

        reading.clamped()
    }

    /// Marks one cell explored; returns `true` if it was not explored before.
    pub fn mark_cell(&mut self, cell: Cell) -> bool {
        if !self.contains(cell) {
            return false;
        }
        let idx = cell.y as usize * self.width + cell.x as usize;
        if self.explored[idx] {
            return false;
        }
        self.explored[idx] = true;
        self.explored_count += 1;
        true
    }

    /// Marks the square of cells within `radius` of the cell containing `point`.
    pub fn mark_explored(&mut self, point: &Point, radius: i32) {
        let center = point.cell();
        for dx in -radius..=radius {
            for dy in -radius..=radius {
                self.mark_cell(Cell::new(center.x + dx, center.y + dy));
            }
        }
    }

    pub fn is_explored(&self, cell: Cell) -> bool {
        self.contains(cell) && self.explored[cell.y as usize * self.width + cell.x as usize]
    }

    pub fn explored_cells(&self) -> usize {
        self.explored_count
    }

    pub fn total_cells(&self) -> usize {
        self.width * self.height
    }

    pub fn exploration_ratio(&self) -> f64 {
        if self.total_cells() == 0 {
            return 0.0;
        }
        self.explored_count as f64 / self.total_cells() as f64
    }

    /// Untreated anomalies within `radius` of `point`.
    pub fn anomalies_in_range(&self, point: &Point, radius: f64) -> Vec<&Anomaly> {
        self.anomalies
            .iter()
            .filter(|a| !a.treated && a.position.distance(point) <= radius)
            .collect()
    }

    /// Marks an anomaly treated. Returns `false` if it is unknown or was already treated.
    pub fn treat(&mut self, id: AnomalyId) -> bool {
        match self.anomalies.get_mut(id as usize) {
            Some(anomaly) if !anomaly.treated => {
                anomaly.treated = true;
                true
            }
            _ => false,
        }
    }

    pub fn treated_count(&self) -> usize {
        self.anomalies.iter().filter(|a| a.treated).count()
    }

    pub fn is_complete(&self) -> bool {
        self.anomalies.iter().all(|a| a.treated) && self.exploration_ratio() >= EXPLORED_RATIO
    }

    /// Evolves every anomaly, then applies random escalation and spreading.
    pub fn evolve<R: Rng>(&mut self, step: u32, settings: &AnomalySettings, rng: &mut R) {
        for anomaly in &mut self.anomalies {
            anomaly.evolve(step);
        }

        if settings.snowball_chance > 0.0 {
            for anomaly in self.anomalies.iter_mut().filter(|a| !a.treated) {
                if anomaly.severity == Severity::Weak && rng.gen_bool(settings.snowball_chance) {
                    anomaly.escalate();
                    tracing::debug!("Anomaly {} escalated to intense", anomaly.id);
                }
            }
        }

        if settings.spread_chance > 0.0 {
            let sources: Vec<(Point, AnomalyKind, f64)> = self
                .anomalies
                .iter()
                .filter(|a| !a.treated && a.is_intense())
                .map(|a| (a.position, a.kind, a.radius))
                .collect();

            for (origin, kind, radius) in sources {
                if !rng.gen_bool(settings.spread_chance) {
                    continue;
                }
                let dx = rng.gen_range(-1..=1) as f64;
                let dy = rng.gen_range(-1..=1) as f64;
                let target = Point::new(origin.x + dx, origin.y + dy);
                let fits = self.contains(target.cell())
                    && self
                        .anomalies
                        .iter()
                        .all(|a| a.position.distance(&target) >= settings.min_distance);
                if fits {
                    let id = self.add_anomaly(target, kind, Severity::Weak, radius);
                    tracing::debug!("Anomaly spread to ({:.1}, {:.1}) as {}", target.x, target.y, id);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn flat_env() -> Environment {
        Environment::new(20, 20, Point::new(2.0, 2.0), TerrainMap::flat(20, 20))
    }

    #[test]
    fn test_generate_respects_distances() {
        let config = SimulationConfig::default();
        let mut rng = StdRng::seed_from_u64(42);
        let env = Environment::generate(&config, &mut rng);

        assert_eq!(env.anomalies().len(), 20);
        assert_eq!(env.base(), Point::new(5.0, 50.0));
        for a in env.anomalies() {
            assert!(a.position.distance(&env.base()) >= 10.0);
            for b in env.anomalies().iter().filter(|b| b.id != a.id) {
                assert!(a.position.distance(&b.position) >= 1.0);
            }
        }
    }

    #[test]
    fn test_generate_gives_up_when_crowded() {
        let mut config = SimulationConfig::default();
        config.environment.width = 10;
        config.environment.height = 10;
        config.environment.base = crate::config::BasePosition::Fixed { x: 5.0, y: 5.0 };
        config.anomalies.count = 5;
        let mut rng = StdRng::seed_from_u64(1);
        let env = Environment::generate(&config, &mut rng);

        // The whole map lies within 10 units of the base.
        assert!(env.anomalies().is_empty());
    }

    #[test]
    fn test_sensor_data_baseline_on_plain() {
        let env = flat_env();
        assert_eq!(env.sensor_data(&Point::new(10.0, 10.0)), SensorReading::BASELINE);
    }

    #[test]
    fn test_sensor_data_includes_terrain() {
        let mut terrain = TerrainMap::flat(20, 20);
        terrain.set(Cell::new(4, 4), Terrain::River);
        let env = Environment::new(20, 20, Point::new(0.0, 0.0), terrain);

        let reading = env.sensor_data(&Point::new(4.5, 4.5));
        assert_eq!(reading.temperature, 17.0);
        assert!((reading.flooding - 0.25).abs() < 1e-9);
    }

    #[test]
    fn test_treated_anomaly_stops_emitting() {
        let mut env = flat_env();
        let id = env.add_anomaly(Point::new(10.0, 10.0), AnomalyKind::Radiation, Severity::Intense, 5.0);
        let at = Point::new(10.0, 10.0);
        assert!(env.sensor_data(&at).radiation > 0.5);

        assert!(env.treat(id));
        assert!(!env.treat(id));
        assert_eq!(env.sensor_data(&at), SensorReading::BASELINE);
        assert_eq!(env.treated_count(), 1);
    }

    #[test]
    fn test_mark_explored_counts_unique_cells() {
        let mut env = flat_env();
        env.mark_explored(&Point::new(5.0, 5.0), 2);
        assert_eq!(env.explored_cells(), 25);
        env.mark_explored(&Point::new(5.0, 5.0), 2);
        assert_eq!(env.explored_cells(), 25);
        env.mark_explored(&Point::new(0.0, 0.0), 1);
        assert_eq!(env.explored_cells(), 25 + 4);
        assert!((env.exploration_ratio() - 29.0 / 400.0).abs() < 1e-12);
    }

    #[test]
    fn test_anomalies_in_range_skips_treated() {
        let mut env = flat_env();
        let near = env.add_anomaly(Point::new(5.0, 5.0), AnomalyKind::Flood, Severity::Weak, 5.0);
        env.add_anomaly(Point::new(18.0, 18.0), AnomalyKind::Flood, Severity::Weak, 5.0);

        assert_eq!(env.anomalies_in_range(&Point::new(4.0, 4.0), 3.0).len(), 1);
        env.treat(near);
        assert!(env.anomalies_in_range(&Point::new(4.0, 4.0), 3.0).is_empty());
    }

    #[test]
    fn test_snowball_escalates_weak_anomalies() {
        let mut env = flat_env();
        env.add_anomaly(Point::new(10.0, 10.0), AnomalyKind::Flood, Severity::Weak, 5.0);
        let settings = AnomalySettings {
            snowball_chance: 1.0,
            ..AnomalySettings::default()
        };
        env.evolve(1, &settings, &mut StdRng::seed_from_u64(5));
        assert!(env.anomalies()[0].is_intense());
    }

    #[test]
    fn test_spread_adds_weak_neighbour() {
        let mut env = flat_env();
        env.add_anomaly(Point::new(10.0, 10.0), AnomalyKind::Radiation, Severity::Intense, 5.0);
        let settings = AnomalySettings {
            spread_chance: 1.0,
            min_distance: 0.5,
            ..AnomalySettings::default()
        };
        let mut rng = StdRng::seed_from_u64(11);
        for step in 1..20 {
            env.evolve(step, &settings, &mut rng);
        }
        assert!(env.anomalies().len() > 1);
        let spawned = &env.anomalies()[1];
        assert_eq!(spawned.severity, Severity::Weak);
        assert_eq!(spawned.kind, AnomalyKind::Radiation);
    }

    #[test]
    fn test_is_complete_requires_treatment_and_exploration() {
        let mut env = flat_env();
        let id = env.add_anomaly(Point::new(10.0, 10.0), AnomalyKind::Flood, Severity::Weak, 5.0);
        env.mark_explored(&Point::new(10.0, 10.0), 20);
        assert!(!env.is_complete());
        env.treat(id);
        assert!(env.is_complete());
    }
}
