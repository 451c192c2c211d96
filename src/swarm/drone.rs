//! A single autonomous drone: battery bookkeeping, perception, movement and
//! treatment.
//!
//! Every battery-spending action is checked against the cost of flying back
//! to the base from where the drone would end up, so a drone never strands
//! itself.

use serde::{Deserialize, Serialize};

use crate::config::{SimulationConfig, Strategy};
use crate::world::{AnomalyDetector, AnomalyId, Cell, Detection, Environment, Point, Severity};

use super::comms::Message;
use super::knowledge::{Knowledge, KnownAnomaly, Stake};
use super::strategy;
use super::DroneId;

/// Flight and battery parameters shared by every drone of a run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DroneParams {
    pub speed: f64,
    pub vision_radius: f64,
    pub communication_radius: f64,
    pub arrival_radius: f64,
    pub trail_radius: i32,
    pub battery_max: f64,
    pub recharge_rate: f64,
    pub movement_cost: f64,
    pub treatment_cost_weak: f64,
    pub treatment_cost_intense: f64,
    pub departure_threshold: f64,
    pub critical_threshold: f64,
}

impl DroneParams {
    pub fn from_config(config: &SimulationConfig) -> Self {
        Self {
            speed: config.drone.speed,
            vision_radius: config.drone.vision_radius,
            communication_radius: config.drone.communication_radius,
            arrival_radius: config.drone.arrival_radius,
            trail_radius: config.drone.trail_radius,
            battery_max: config.battery.max,
            recharge_rate: config.battery.recharge_rate,
            movement_cost: config.battery.movement_cost,
            treatment_cost_weak: config.battery.treatment_cost_weak,
            treatment_cost_intense: config.battery.treatment_cost_intense,
            departure_threshold: config.battery.departure_threshold,
            critical_threshold: config.battery.critical_threshold,
        }
    }

    pub fn treatment_cost(&self, severity: Severity) -> f64 {
        match severity {
            Severity::Weak => self.treatment_cost_weak,
            Severity::Intense => self.treatment_cost_intense,
        }
    }
}

impl Default for DroneParams {
    fn default() -> Self {
        Self::from_config(&SimulationConfig::default())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Target {
    Explore(Point),
    Anomaly { id: AnomalyId, position: Point },
    Base,
}

impl Target {
    pub fn position(&self, base: Point) -> Point {
        match self {
            Target::Explore(point) => *point,
            Target::Anomaly { position, .. } => *position,
            Target::Base => base,
        }
    }

    pub fn anomaly_id(&self) -> Option<AnomalyId> {
        match self {
            Target::Anomaly { id, .. } => Some(*id),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Target::Explore(_) => "explore",
            Target::Anomaly { .. } => "anomaly",
            Target::Base => "base",
        }
    }
}

/// What a drone spent a turn doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activity {
    Recharging,
    Moving,
    Exploring,
    Treating,
    Waiting,
}

impl Activity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Activity::Recharging => "recharging",
            Activity::Moving => "moving",
            Activity::Exploring => "exploring",
            Activity::Treating => "treating",
            Activity::Waiting => "waiting",
        }
    }
}

/// Number of turns spent in each activity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityStats {
    pub recharging: u32,
    pub moving: u32,
    pub exploring: u32,
    pub treating: u32,
    pub waiting: u32,
}

impl ActivityStats {
    pub fn record(&mut self, activity: Activity) {
        match activity {
            Activity::Recharging => self.recharging += 1,
            Activity::Moving => self.moving += 1,
            Activity::Exploring => self.exploring += 1,
            Activity::Treating => self.treating += 1,
            Activity::Waiting => self.waiting += 1,
        }
    }

    pub fn total(&self) -> u32 {
        self.recharging + self.moving + self.exploring + self.treating + self.waiting
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementKind {
    Explore,
    Approach,
    Return,
}

/// One row of the movement log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovementEvent {
    pub step: u32,
    pub drone_id: DroneId,
    pub action: MovementKind,
    pub start_x: f64,
    pub start_y: f64,
    pub end_x: f64,
    pub end_y: f64,
    pub battery: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreatOutcome {
    Treated,
    AlreadyTreated,
    /// Treating now would leave too little battery to get home.
    Unaffordable,
}

#[derive(Debug, Clone)]
pub struct Perception {
    /// Anomalies this drone did not know about before.
    pub discoveries: Vec<KnownAnomaly>,
    pub detection: Detection,
}

/// Result of one drone turn, handed back to the simulation for delivery.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub messages: Vec<Message>,
    pub detection: Detection,
    pub activity: Activity,
}

#[derive(Debug, Clone)]
pub struct Drone {
    pub id: DroneId,
    pub position: Point,
    pub base: Point,
    pub battery: f64,
    pub target: Option<Target>,
    pub knowledge: Knowledge,
    /// No affordable unexplored cell was found from the base.
    pub exploration_blocked: bool,
    pub stats: ActivityStats,
    pub last_activity: Activity,
    pub treated: usize,
    /// Anomalies first sensed by this drone rather than learnt from peers.
    pub direct_detections: usize,
    pub distance_travelled: f64,
    pub path: Vec<Point>,
    pub movements: Vec<MovementEvent>,
    params: DroneParams,
}

impl Drone {
    pub fn new(
        id: DroneId,
        position: Point,
        base: Point,
        params: DroneParams,
        width: usize,
        height: usize,
    ) -> Self {
        Self {
            id,
            position,
            base,
            battery: params.battery_max,
            target: None,
            knowledge: Knowledge::new(width, height),
            exploration_blocked: false,
            stats: ActivityStats::default(),
            last_activity: Activity::Waiting,
            treated: 0,
            direct_detections: 0,
            distance_travelled: 0.0,
            path: vec![position],
            movements: Vec::new(),
            params,
        }
    }

    pub fn params(&self) -> &DroneParams {
        &self.params
    }

    pub fn is_at_base(&self) -> bool {
        self.position.distance(&self.base) < self.params.arrival_radius
    }

    pub fn battery_percent(&self) -> f64 {
        if self.params.battery_max <= 0.0 {
            return 0.0;
        }
        100.0 * self.battery / self.params.battery_max
    }

    // === Battery ===

    pub fn return_cost(&self) -> f64 {
        self.return_cost_from(&self.position)
    }

    pub fn return_cost_from(&self, point: &Point) -> f64 {
        point.distance(&self.base) * self.params.movement_cost
    }

    /// Cost of flying to `point` and then back to the base.
    pub fn trip_cost(&self, point: &Point) -> f64 {
        (self.position.distance(point) + point.distance(&self.base)) * self.params.movement_cost
    }

    pub fn can_afford_trip(&self, point: &Point, extra: f64) -> bool {
        self.trip_cost(point) + extra <= self.battery
    }

    /// Whether reaching and treating `anomaly` leaves enough battery to get home.
    pub fn can_afford_anomaly(&self, anomaly: &KnownAnomaly) -> bool {
        self.can_afford_trip(&anomaly.position, self.params.treatment_cost(anomaly.severity))
    }

    /// Same check, as if starting from the base with a full battery.
    pub fn can_afford_anomaly_when_full(&self, anomaly: &KnownAnomaly) -> bool {
        let round_trip = 2.0 * anomaly.position.distance(&self.base) * self.params.movement_cost;
        round_trip + self.params.treatment_cost(anomaly.severity) <= self.params.battery_max
    }

    pub fn must_return(&self) -> bool {
        self.battery < self.return_cost()
            || (self.is_at_base()
                && self.battery < self.params.battery_max * self.params.critical_threshold)
    }

    /// Recharges when at base. Returns `true` if the battery went up.
    pub fn recharge(&mut self) -> bool {
        if !self.is_at_base() || self.battery >= self.params.battery_max {
            return false;
        }
        self.battery = (self.battery + self.params.recharge_rate).min(self.params.battery_max);
        true
    }

    fn ready_to_leave(&self) -> bool {
        self.battery >= self.params.battery_max * self.params.departure_threshold
    }

    // === Perception ===

    /// Scans the vision disc: marks it explored and reports new anomalies.
    pub fn perceive(&mut self, env: &mut Environment, detector: &AnomalyDetector) -> Perception {
        for cell in Cell::disc(&self.position, self.params.vision_radius) {
            if env.contains(cell) {
                env.mark_cell(cell);
                self.knowledge.mark_explored(cell);
            }
        }

        let mut discoveries = Vec::new();
        for anomaly in env.anomalies_in_range(&self.position, self.params.vision_radius) {
            let known = KnownAnomaly::from(anomaly);
            if self.knowledge.learn(known.clone()) {
                discoveries.push(known);
            }
        }
        self.direct_detections += discoveries.len();

        let detection = detector.detect(&env.sensor_data(&self.position));
        Perception {
            discoveries,
            detection,
        }
    }

    // === Messaging ===

    pub fn receive(&mut self, message: &Message) {
        match message {
            Message::Discovery(anomaly) => {
                self.knowledge.learn(anomaly.clone());
            }
            Message::Treated(id) => {
                self.knowledge.mark_treated(*id);
                if self.target.and_then(|t| t.anomaly_id()) == Some(*id) {
                    self.target = None;
                }
            }
            Message::Claim {
                anomaly,
                drone,
                step,
            } => {
                if *drone == self.id {
                    return;
                }
                self.knowledge.claim(
                    *anomaly,
                    Stake {
                        drone: *drone,
                        step: *step,
                    },
                );
                if self.target.and_then(|t| t.anomaly_id()) == Some(*anomaly) {
                    tracing::trace!("Drone {} yields anomaly {} to drone {}", self.id, anomaly, drone);
                    self.target = None;
                }
            }
            Message::Release { anomaly, drone } => {
                self.knowledge.release(*anomaly, *drone);
            }
            Message::Explore {
                target,
                radius,
                drone,
                step,
            } => {
                if *drone == self.id {
                    return;
                }
                self.knowledge.reserve_area(
                    target,
                    *radius,
                    Stake {
                        drone: *drone,
                        step: *step,
                    },
                );
                if let Some(Target::Explore(own)) = self.target {
                    if self.knowledge.is_reserved_by_other(own.cell(), self.id, *step) {
                        self.target = None;
                    }
                }
            }
        }
    }

    /// Switches target, announcing claims, releases and reservations.
    pub fn set_target(&mut self, target: Option<Target>, step: u32, outbox: &mut Vec<Message>) {
        if self.target == target {
            return;
        }

        let previous = self.target.and_then(|t| t.anomaly_id());
        let next = target.and_then(|t| t.anomaly_id());
        if let Some(id) = previous.filter(|id| Some(*id) != next) {
            self.knowledge.release(id, self.id);
            let still_open = self.knowledge.anomaly(id).map(|a| !a.treated).unwrap_or(false);
            if still_open {
                outbox.push(Message::Release {
                    anomaly: id,
                    drone: self.id,
                });
            }
        }

        let stake = Stake {
            drone: self.id,
            step,
        };
        match target {
            Some(Target::Anomaly { id, .. }) if previous != Some(id) => {
                self.knowledge.claim(id, stake);
                outbox.push(Message::Claim {
                    anomaly: id,
                    drone: self.id,
                    step,
                });
            }
            Some(Target::Explore(point)) => {
                let radius = self.params.vision_radius;
                self.knowledge.reserve_area(&point, radius, stake);
                outbox.push(Message::Explore {
                    target: point,
                    radius,
                    drone: self.id,
                    step,
                });
            }
            _ => {}
        }

        self.target = target;
    }

    // === Actions ===

    /// Attempts to treat anomaly `id`, which must be within reach.
    pub fn treat(&mut self, env: &mut Environment, id: AnomalyId) -> TreatOutcome {
        let severity = match env.anomaly(id) {
            Some(anomaly) if !anomaly.treated => anomaly.severity,
            _ => {
                self.knowledge.mark_treated(id);
                return TreatOutcome::AlreadyTreated;
            }
        };

        let cost = self.params.treatment_cost(severity);
        if self.battery - cost < self.return_cost() {
            return TreatOutcome::Unaffordable;
        }
        if !env.treat(id) {
            self.knowledge.mark_treated(id);
            return TreatOutcome::AlreadyTreated;
        }

        self.battery -= cost;
        self.knowledge.mark_treated(id);
        self.treated += 1;
        tracing::debug!("Drone {} treated anomaly {}", self.id, id);
        TreatOutcome::Treated
    }

    /// Moves at most `speed` towards the current target.
    ///
    /// A move that would leave less battery than the flight home from the new
    /// position is replaced by a move towards the base. Returns `true` if the
    /// drone actually moved.
    pub fn step_towards_target(
        &mut self,
        env: &mut Environment,
        step: u32,
        outbox: &mut Vec<Message>,
    ) -> bool {
        let Some(target) = self.target else {
            return false;
        };
        let bounds = ((env.width() as f64 - 1.0).max(0.0), (env.height() as f64 - 1.0).max(0.0));

        let mut destination = target.position(self.base);
        if target != Target::Base {
            let next = self
                .position
                .step_towards(&destination, self.params.speed)
                .clamp(bounds.0, bounds.1);
            let cost = self.position.distance(&next) * self.params.movement_cost;
            if self.battery - cost < self.return_cost_from(&next) {
                tracing::debug!(
                    "Drone {} heads home: {:.1} battery left, {:.1} needed",
                    self.id,
                    self.battery,
                    self.return_cost()
                );
                self.set_target(Some(Target::Base), step, outbox);
                destination = self.base;
            }
        }

        let start = self.position;
        let end = start
            .step_towards(&destination, self.params.speed)
            .clamp(bounds.0, bounds.1);
        let travel = start.distance(&end);
        if travel <= f64::EPSILON {
            return false;
        }

        self.battery = (self.battery - travel * self.params.movement_cost).max(0.0);
        self.position = end;
        self.distance_travelled += travel;
        self.mark_trail(env, &start, &end, travel);
        self.path.push(end);

        let action = match self.target {
            Some(Target::Explore(_)) => MovementKind::Explore,
            Some(Target::Anomaly { .. }) => MovementKind::Approach,
            Some(Target::Base) | None => MovementKind::Return,
        };
        self.movements.push(MovementEvent {
            step,
            drone_id: self.id,
            action,
            start_x: start.x,
            start_y: start.y,
            end_x: end.x,
            end_y: end.y,
            battery: self.battery,
        });
        true
    }

    fn mark_trail(&mut self, env: &mut Environment, start: &Point, end: &Point, travel: f64) {
        let samples = ((travel * 2.0).ceil() as usize).max(1);
        let r = self.params.trail_radius;
        for i in 0..=samples {
            let point = start.lerp(end, i as f64 / samples as f64);
            env.mark_explored(&point, r);
            let center = point.cell();
            for dx in -r..=r {
                for dy in -r..=r {
                    self.knowledge.mark_explored(Cell::new(center.x + dx, center.y + dy));
                }
            }
        }
    }

    fn needs_decision(&self, strategy: Strategy, at_base: bool, step: u32) -> bool {
        match self.target {
            None => true,
            Some(Target::Base) => at_base,
            Some(Target::Explore(point)) => {
                self.position.distance(&point) < self.params.arrival_radius
                    || self.knowledge.is_explored(point.cell())
                    || self.knowledge.is_reserved_by_other(point.cell(), self.id, step)
                    || strategy::should_reconsider(self, strategy, step)
            }
            Some(Target::Anomaly { id, .. }) => {
                let open = self.knowledge.anomaly(id).map(|a| !a.treated).unwrap_or(false);
                !open
                    || self.knowledge.is_claimed_by_other(id, self.id, step)
                    || strategy::should_reconsider(self, strategy, step)
            }
        }
    }

    /// Plays one turn: recharge, perceive, decide, treat, move.
    ///
    /// Messages meant for peers are returned rather than delivered, so the
    /// caller decides who is in range.
    pub fn take_turn(
        &mut self,
        env: &mut Environment,
        detector: &AnomalyDetector,
        strategy: Strategy,
        step: u32,
    ) -> TurnOutcome {
        let mut outbox = Vec::new();
        self.knowledge.prune(step);

        let at_base = self.is_at_base();
        let recharged = self.recharge();

        let perception = self.perceive(env, detector);
        for anomaly in &perception.discoveries {
            outbox.push(Message::Discovery(anomaly.clone()));
            if let Some(target) = strategy::on_discovery(self, strategy, anomaly) {
                self.set_target(Some(target), step, &mut outbox);
            }
        }

        if self.must_return() {
            self.set_target(Some(Target::Base), step, &mut outbox);
        } else if self.needs_decision(strategy, at_base, step) {
            let decision = strategy::select_next_target(self, strategy, step);
            if let Some(blocked) = decision.exploration_blocked {
                self.exploration_blocked = blocked;
            }
            self.set_target(Some(decision.target), step, &mut outbox);
        }
        if let Some(Target::Anomaly { id, .. }) = self.target {
            self.knowledge.claim(id, Stake { drone: self.id, step });
        }

        let mut treated = false;
        if let Some(Target::Anomaly { id, position }) = self.target {
            if self.position.distance(&position) < self.params.arrival_radius {
                match self.treat(env, id) {
                    TreatOutcome::Treated => {
                        outbox.push(Message::Treated(id));
                        self.target = None;
                        treated = true;
                    }
                    TreatOutcome::AlreadyTreated => self.target = None,
                    TreatOutcome::Unaffordable => {
                        self.set_target(Some(Target::Base), step, &mut outbox)
                    }
                }
            }
        }

        let mut moved = false;
        if !treated {
            let grounded = self.is_at_base() && !self.ready_to_leave();
            let parked = self.target == Some(Target::Base) && self.is_at_base();
            if !grounded && !parked {
                moved = self.step_towards_target(env, step, &mut outbox);
            }
        }

        let activity = if treated {
            Activity::Treating
        } else if moved {
            match self.target {
                Some(Target::Explore(_)) => Activity::Exploring,
                _ => Activity::Moving,
            }
        } else if recharged {
            Activity::Recharging
        } else {
            Activity::Waiting
        };
        self.stats.record(activity);
        self.last_activity = activity;

        TurnOutcome {
            messages: outbox,
            detection: perception.detection,
            activity,
        }
    }
}
