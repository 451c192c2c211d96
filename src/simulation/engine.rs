//! The turn loop tying the world, the swarm and the control center together.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::{SimulationConfig, Strategy};
use crate::error::Result;
use crate::swarm::comms::{connected_components, receivers_in_range};
use crate::swarm::{ControlCenter, Drone, DroneId, DroneParams, Message, StatusReport};
use crate::world::{AnomalyDetector, Detection, Environment, Point};

use super::report::SimulationReport;

pub struct Simulation {
    config: SimulationConfig,
    seed: u64,
    rng: StdRng,
    env: Environment,
    drones: Vec<Drone>,
    control: ControlCenter,
    detector: AnomalyDetector,
    step: u32,
}

impl Simulation {
    /// Builds a run from `config`. Without a configured seed a random one is drawn.
    pub fn new(config: SimulationConfig) -> Result<Self> {
        config.validate()?;

        let seed = config.simulation.seed.unwrap_or_else(rand::random);
        let mut rng = StdRng::seed_from_u64(seed);
        let env = Environment::generate(&config, &mut rng);
        let base = env.base();
        let (width, height) = (env.width(), env.height());

        let params = DroneParams::from_config(&config);
        let jitter = config.drone.spawn_jitter;
        let drones = (0..config.simulation.num_drones)
            .map(|id| {
                let position = if jitter > 0.0 {
                    Point::new(
                        base.x + rng.gen_range(-jitter..=jitter),
                        base.y + rng.gen_range(-jitter..=jitter),
                    )
                } else {
                    base
                };
                let position = position.clamp(width as f64 - 1.0, height as f64 - 1.0);
                Drone::new(id, position, base, params, width, height)
            })
            .collect();

        let control = ControlCenter::new(base, width, height);
        let detector = AnomalyDetector::new(config.detector.clone());

        tracing::info!(
            "Simulation ready: {} drones, {} anomalies, strategy {}, seed {}",
            config.simulation.num_drones,
            env.anomalies().len(),
            config.strategy,
            seed
        );

        Ok(Self {
            config,
            seed,
            rng,
            env,
            drones,
            control,
            detector,
            step: 0,
        })
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn strategy(&self) -> Strategy {
        self.config.strategy
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn environment(&self) -> &Environment {
        &self.env
    }

    pub fn drones(&self) -> &[Drone] {
        &self.drones
    }

    pub fn control_center(&self) -> &ControlCenter {
        &self.control
    }

    /// Number of steps played so far.
    pub fn current_step(&self) -> u32 {
        self.step
    }

    pub fn is_complete(&self) -> bool {
        self.env.is_complete()
    }

    pub fn status(&self) -> StatusReport {
        self.control.status(&self.drones, self.step)
    }

    /// Plays one turn.
    pub fn step(&mut self) {
        let step = self.step;
        self.communicate();

        let strategy = self.config.strategy;
        let interval = self.config.simulation.transmission_interval;
        let mut due: Vec<(DroneId, Detection)> = Vec::new();

        for id in 0..self.drones.len() {
            if self.drones[id].is_at_base() {
                self.control.sync_drone(&mut self.drones[id]);
            }

            let outcome = self.drones[id].take_turn(&mut self.env, &self.detector, strategy, step);
            self.deliver(id, &outcome.messages);

            if step % interval == 0 || self.drones[id].is_at_base() {
                due.push((id, outcome.detection));
            }
        }

        for (id, detection) in due {
            self.control.receive_transmission(&self.drones[id], detection, step);
        }

        self.env.evolve(step, &self.config.anomalies, &mut self.rng);
        self.step += 1;
    }

    /// Merges knowledge across every radio component, relaying over several hops.
    fn communicate(&mut self) {
        let positions: Vec<Point> = self.drones.iter().map(|d| d.position).collect();
        let radius = self.config.drone.communication_radius;

        for component in connected_components(&positions, radius) {
            let [first, rest @ ..] = component.as_slice() else {
                continue;
            };
            if rest.is_empty() {
                continue;
            }
            let mut shared = self.drones[*first].knowledge.clone();
            for id in rest {
                shared.merge(&self.drones[*id].knowledge);
            }
            for id in &component {
                self.drones[*id].knowledge.merge(&shared);
            }
        }
    }

    fn deliver(&mut self, sender: DroneId, messages: &[Message]) {
        if messages.is_empty() {
            return;
        }
        let positions: Vec<Point> = self.drones.iter().map(|d| d.position).collect();
        let receivers: Vec<DroneId> =
            receivers_in_range(&positions, sender, self.config.drone.communication_radius).collect();
        for receiver in receivers {
            for message in messages {
                tracing::trace!("Drone {} -> drone {}: {}", sender, receiver, message.kind());
                self.drones[receiver].receive(message);
            }
        }
    }

    pub fn run(&mut self) -> SimulationReport {
        self.run_with(|_| {})
    }

    /// Steps until `max_turns`, calling `observer` after every step.
    ///
    /// With `stop_when_complete`, the run ends as soon as every anomaly is
    /// treated and the map is explored.
    pub fn run_with<F>(&mut self, mut observer: F) -> SimulationReport
    where
        F: FnMut(&Simulation),
    {
        let max_turns = self.config.simulation.max_turns;
        while self.step < max_turns {
            self.step();
            observer(self);

            if self.config.simulation.stop_when_complete && self.is_complete() {
                tracing::info!("Mission complete at step {}", self.step);
                break;
            }
        }

        let report = self.report();
        tracing::info!(
            "Finished after {} steps: {:.1}% explored, {}/{} anomalies treated",
            report.steps,
            report.exploration_percent,
            report.anomalies_treated,
            report.anomalies_total
        );
        report
    }

    pub fn report(&self) -> SimulationReport {
        SimulationReport::from_simulation(self)
    }
}
