//! Target selection for the three mission strategies.
//!
//! Every choice is made from the drone's own knowledge; drones never look at
//! the ground-truth environment when deciding where to go.

use std::cmp::Ordering;

use crate::config::Strategy;
use crate::world::{Point, Severity, EXPLORED_RATIO};

use super::drone::{Drone, Target};
use super::knowledge::KnownAnomaly;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Decision {
    pub target: Target,
    /// `Some` when exploration was attempted; `Some(true)` if it found nothing from the base.
    pub exploration_blocked: Option<bool>,
}

impl Decision {
    fn go(target: Target) -> Self {
        Self {
            target,
            exploration_blocked: None,
        }
    }
}

pub fn select_next_target(drone: &Drone, strategy: Strategy, now: u32) -> Decision {
    match strategy {
        Strategy::Action => select_action(drone, now),
        Strategy::Exploration => select_exploration(drone, now),
        Strategy::Mixed => select_mixed(drone, now),
    }
}

/// Reaction to an anomaly the drone just sensed itself.
///
/// Only the action strategy lets a fresh discovery interrupt the current
/// task; the others pick it up at their next decision.
pub fn on_discovery(drone: &Drone, strategy: Strategy, anomaly: &KnownAnomaly) -> Option<Target> {
    if strategy != Strategy::Action || has_live_anomaly(drone) {
        return None;
    }
    if drone.can_afford_anomaly(anomaly) {
        Some(Target::Anomaly {
            id: anomaly.id,
            position: anomaly.position,
        })
    } else if drone.can_afford_anomaly_when_full(anomaly) {
        tracing::debug!(
            "Drone {} recharges before anomaly {} ({:.1}% battery)",
            drone.id,
            anomaly.id,
            drone.battery_percent()
        );
        Some(Target::Base)
    } else {
        None
    }
}

/// Whether a drone travelling to its target should look again.
///
/// Only the mixed strategy switches en route, and only for a strictly more
/// severe anomaly than the one it is heading to.
pub fn should_reconsider(drone: &Drone, strategy: Strategy, now: u32) -> bool {
    if strategy != Strategy::Mixed {
        return false;
    }
    let current = current_anomaly(drone).map(|a| a.severity);
    pending(drone, now, false).any(|a| match current {
        Some(severity) => a.severity > severity,
        None => true,
    })
}

fn select_action(drone: &Drone, now: u32) -> Decision {
    if let Some(current) = current_anomaly(drone) {
        if !drone.knowledge.is_claimed_by_other(current.id, drone.id, now) {
            return Decision::go(anomaly_target(current));
        }
    }

    for severity in [Severity::Intense, Severity::Weak] {
        let candidates = pending(drone, now, false).filter(|a| a.severity == severity);
        if let Some(nearest) = nearest(candidates, &drone.position) {
            return Decision::go(anomaly_target(nearest));
        }
    }

    explore_or_home(drone, now)
}

fn select_exploration(drone: &Drone, now: u32) -> Decision {
    if let Some(current) = current_anomaly(drone) {
        return Decision::go(anomaly_target(current));
    }

    let mut blocked = None;
    if drone.knowledge.explored_ratio() < EXPLORED_RATIO {
        match exploration_target(drone, now) {
            Some(point) => {
                return Decision {
                    target: Target::Explore(point),
                    exploration_blocked: Some(false),
                }
            }
            None if !drone.is_at_base() => return Decision::go(Target::Base),
            None => blocked = Some(true),
        }
    }

    // Strongest signal first; anomalies claimed by peers stay as a fallback.
    let strongest = strongest(pending(drone, now, false))
        .or_else(|| strongest(pending(drone, now, true)));
    Decision {
        target: strongest.map(anomaly_target).unwrap_or(Target::Base),
        exploration_blocked: blocked,
    }
}

fn select_mixed(drone: &Drone, now: u32) -> Decision {
    let best = most_severe(pending(drone, now, false), &drone.position);
    match (current_anomaly(drone), best) {
        (Some(current), Some(best)) if best.severity > current.severity => {
            Decision::go(anomaly_target(best))
        }
        (Some(current), _) if !drone.knowledge.is_claimed_by_other(current.id, drone.id, now) => {
            Decision::go(anomaly_target(current))
        }
        (_, Some(best)) => Decision::go(anomaly_target(best)),
        (_, None) => explore_or_home(drone, now),
    }
}

fn explore_or_home(drone: &Drone, now: u32) -> Decision {
    match exploration_target(drone, now) {
        Some(point) => Decision {
            target: Target::Explore(point),
            exploration_blocked: Some(false),
        },
        None => Decision {
            target: Target::Base,
            exploration_blocked: drone.is_at_base().then_some(true),
        },
    }
}

/// Nearest cell unexplored in the drone's knowledge, not reserved by a peer
/// and reachable with enough battery to come back.
///
/// Ties go to the cell farther from the base.
pub fn exploration_target(drone: &Drone, now: u32) -> Option<Point> {
    let knowledge = &drone.knowledge;
    let mut best: Option<(f64, f64, Point)> = None;

    for cell in knowledge.unexplored_cells() {
        if knowledge.is_reserved_by_other(cell, drone.id, now) {
            continue;
        }
        let point = cell.center();
        if !drone.can_afford_trip(&point, 0.0) {
            continue;
        }
        let distance = drone.position.distance(&point);
        let from_base = point.distance(&drone.base);
        let better = match best {
            None => true,
            Some((d, b, _)) => distance < d || (distance == d && from_base > b),
        };
        if better {
            best = Some((distance, from_base, point));
        }
    }

    best.map(|(_, _, point)| point)
}

fn anomaly_target(anomaly: &KnownAnomaly) -> Target {
    Target::Anomaly {
        id: anomaly.id,
        position: anomaly.position,
    }
}

fn has_live_anomaly(drone: &Drone) -> bool {
    current_anomaly(drone).is_some()
}

fn current_anomaly(drone: &Drone) -> Option<&KnownAnomaly> {
    let id = drone.target.and_then(|t| t.anomaly_id())?;
    drone.knowledge.anomaly(id).filter(|a| !a.treated)
}

/// Untreated, affordable anomalies; peers' fresh claims are skipped unless
/// `include_claimed`.
fn pending(drone: &Drone, now: u32, include_claimed: bool) -> impl Iterator<Item = &KnownAnomaly> {
    drone.knowledge.untreated().filter(move |a| {
        (include_claimed || !drone.knowledge.is_claimed_by_other(a.id, drone.id, now))
            && drone.can_afford_anomaly(a)
    })
}

fn nearest<'a>(
    candidates: impl Iterator<Item = &'a KnownAnomaly>,
    from: &Point,
) -> Option<&'a KnownAnomaly> {
    candidates.min_by(|a, b| a.position.distance(from).total_cmp(&b.position.distance(from)))
}

fn strongest<'a>(candidates: impl Iterator<Item = &'a KnownAnomaly>) -> Option<&'a KnownAnomaly> {
    candidates.fold(None, |best: Option<&KnownAnomaly>, a| match best {
        Some(b) if b.signal >= a.signal => Some(b),
        _ => Some(a),
    })
}

fn most_severe<'a>(
    candidates: impl Iterator<Item = &'a KnownAnomaly>,
    from: &Point,
) -> Option<&'a KnownAnomaly> {
    candidates.min_by(|a, b| {
        b.severity.cmp(&a.severity).then_with(|| {
            a.position
                .distance(from)
                .partial_cmp(&b.position.distance(from))
                .unwrap_or(Ordering::Equal)
        })
    })
}
