//! Messages drones exchange over the short-range radio.

use crate::world::{AnomalyId, Point};

use super::knowledge::KnownAnomaly;
use super::DroneId;

#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// A drone sensed an anomaly it did not know about.
    Discovery(KnownAnomaly),
    /// An anomaly has been neutralised.
    Treated(AnomalyId),
    /// `drone` is heading for `anomaly`; others should look elsewhere.
    Claim {
        anomaly: AnomalyId,
        drone: DroneId,
        step: u32,
    },
    /// `drone` gave up on `anomaly`.
    Release { anomaly: AnomalyId, drone: DroneId },
    /// `drone` is exploring the area of `radius` around `target`.
    Explore {
        target: Point,
        radius: f64,
        drone: DroneId,
        step: u32,
    },
}

impl Message {
    pub fn kind(&self) -> &'static str {
        match self {
            Message::Discovery(_) => "discovery",
            Message::Treated(_) => "treated",
            Message::Claim { .. } => "claim",
            Message::Release { .. } => "release",
            Message::Explore { .. } => "explore",
        }
    }
}

/// Drones within `radius` of `sender`, excluding the sender itself.
pub fn receivers_in_range(
    positions: &[Point],
    sender: DroneId,
    radius: f64,
) -> impl Iterator<Item = DroneId> + '_ {
    let origin = positions.get(sender).copied();
    positions
        .iter()
        .enumerate()
        .filter(move |(id, position)| {
            *id != sender
                && origin
                    .map(|o| o.distance(position) <= radius)
                    .unwrap_or(false)
        })
        .map(|(id, _)| id)
}

/// Groups drones into radio components: two drones share a component when a
/// chain of links no longer than `radius` connects them.
pub fn connected_components(positions: &[Point], radius: f64) -> Vec<Vec<DroneId>> {
    let n = positions.len();
    let mut component = vec![usize::MAX; n];
    let mut groups = Vec::new();

    for start in 0..n {
        if component[start] != usize::MAX {
            continue;
        }
        let group_id = groups.len();
        let mut members = vec![start];
        component[start] = group_id;
        let mut cursor = 0;
        while cursor < members.len() {
            let current = members[cursor];
            cursor += 1;
            for other in 0..n {
                if component[other] == usize::MAX
                    && positions[current].distance(&positions[other]) <= radius
                {
                    component[other] = group_id;
                    members.push(other);
                }
            }
        }
        members.sort_unstable();
        groups.push(members);
    }

    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_components_follow_relays() {
        let positions = vec![
            Point::new(0.0, 0.0),
            Point::new(8.0, 0.0),
            Point::new(16.0, 0.0),
            Point::new(50.0, 50.0),
        ];
        let groups = connected_components(&positions, 10.0);
        assert_eq!(groups, vec![vec![0, 1, 2], vec![3]]);
    }

    #[test]
    fn test_components_empty() {
        assert!(connected_components(&[], 10.0).is_empty());
    }

    #[test]
    fn test_receivers_in_range_is_single_hop() {
        let positions = vec![
            Point::new(0.0, 0.0),
            Point::new(8.0, 0.0),
            Point::new(16.0, 0.0),
        ];
        let receivers: Vec<DroneId> = receivers_in_range(&positions, 0, 10.0).collect();
        assert_eq!(receivers, vec![1]);
    }

    #[test]
    fn test_message_kinds() {
        assert_eq!(Message::Treated(3).kind(), "treated");
        let claim = Message::Claim { anomaly: 1, drone: 4, step: 0 };
        assert_eq!(claim.kind(), "claim");
    }
}
