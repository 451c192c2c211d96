//! What a single drone (or the control center) believes about the world.
//!
//! Knowledge is partial: a drone only knows the cells it explored itself or
//! heard about from peers, and the anomalies it saw or was told about.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::world::{Anomaly, AnomalyId, AnomalyKind, Cell, Point, Severity};

use super::DroneId;

/// Steps after which a peer's claim on an anomaly is considered stale.
pub const CLAIM_TTL: u32 = 60;

/// Steps after which a peer's exploration reservation is considered stale.
pub const RESERVATION_TTL: u32 = 40;

/// An anomaly as known by a drone; may lag behind the ground truth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnownAnomaly {
    pub id: AnomalyId,
    pub position: Point,
    pub kind: AnomalyKind,
    pub severity: Severity,
    pub signal: f64,
    pub treated: bool,
}

impl From<&Anomaly> for KnownAnomaly {
    fn from(anomaly: &Anomaly) -> Self {
        Self {
            id: anomaly.id,
            position: anomaly.position,
            kind: anomaly.kind,
            severity: anomaly.severity,
            signal: anomaly.signal,
            treated: anomaly.treated,
        }
    }
}

/// A drone's stake on an anomaly or a cell, stamped with the step it was made.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stake {
    pub drone: DroneId,
    pub step: u32,
}

impl Stake {
    fn is_fresh(&self, now: u32, ttl: u32) -> bool {
        now.saturating_sub(self.step) <= ttl
    }

    /// Newer stakes win; equal steps go to the lower drone id.
    fn supersedes(&self, other: &Stake) -> bool {
        self.step > other.step || (self.step == other.step && self.drone < other.drone)
    }
}

#[derive(Debug, Clone)]
pub struct Knowledge {
    width: usize,
    height: usize,
    explored: Vec<bool>,
    explored_count: usize,
    anomalies: BTreeMap<AnomalyId, KnownAnomaly>,
    claims: HashMap<AnomalyId, Stake>,
    reservations: HashMap<Cell, Stake>,
}

impl Knowledge {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            explored: vec![false; width * height],
            explored_count: 0,
            anomalies: BTreeMap::new(),
            claims: HashMap::new(),
            reservations: HashMap::new(),
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    fn index(&self, cell: Cell) -> Option<usize> {
        if cell.x < 0 || cell.y < 0 {
            return None;
        }
        let (x, y) = (cell.x as usize, cell.y as usize);
        (x < self.width && y < self.height).then(|| y * self.width + x)
    }

    // === Exploration ===

    pub fn mark_explored(&mut self, cell: Cell) {
        if let Some(idx) = self.index(cell) {
            if !self.explored[idx] {
                self.explored[idx] = true;
                self.explored_count += 1;
            }
            self.reservations.remove(&cell);
        }
    }

    pub fn is_explored(&self, cell: Cell) -> bool {
        self.index(cell).map(|idx| self.explored[idx]).unwrap_or(false)
    }

    pub fn explored_count(&self) -> usize {
        self.explored_count
    }

    pub fn explored_ratio(&self) -> f64 {
        let total = self.width * self.height;
        if total == 0 {
            return 0.0;
        }
        self.explored_count as f64 / total as f64
    }

    /// Unexplored cells in row-major order.
    pub fn unexplored_cells(&self) -> impl Iterator<Item = Cell> + '_ {
        self.explored
            .iter()
            .enumerate()
            .filter(|(_, explored)| !**explored)
            .map(move |(idx, _)| Cell::new((idx % self.width) as i32, (idx / self.width) as i32))
    }

    // === Anomalies ===

    /// Records an anomaly. Returns `true` if it was not known before.
    pub fn learn(&mut self, anomaly: KnownAnomaly) -> bool {
        match self.anomalies.get_mut(&anomaly.id) {
            Some(known) => {
                known.treated |= anomaly.treated;
                known.severity = known.severity.max(anomaly.severity);
                known.signal = anomaly.signal;
                false
            }
            None => {
                self.anomalies.insert(anomaly.id, anomaly);
                true
            }
        }
    }

    pub fn knows(&self, id: AnomalyId) -> bool {
        self.anomalies.contains_key(&id)
    }

    pub fn anomaly(&self, id: AnomalyId) -> Option<&KnownAnomaly> {
        self.anomalies.get(&id)
    }

    pub fn anomalies(&self) -> impl Iterator<Item = &KnownAnomaly> {
        self.anomalies.values()
    }

    /// Known anomalies not yet known to be treated, in id order.
    pub fn untreated(&self) -> impl Iterator<Item = &KnownAnomaly> {
        self.anomalies.values().filter(|a| !a.treated)
    }

    pub fn mark_treated(&mut self, id: AnomalyId) {
        if let Some(known) = self.anomalies.get_mut(&id) {
            known.treated = true;
        }
        self.claims.remove(&id);
    }

    // === Coordination ===

    pub fn claim(&mut self, id: AnomalyId, stake: Stake) {
        self.claims.insert(id, stake);
    }

    /// Drops `drone`'s claim on `id`, leaving peers' claims alone.
    pub fn release(&mut self, id: AnomalyId, drone: DroneId) {
        if self.claims.get(&id).map(|s| s.drone) == Some(drone) {
            self.claims.remove(&id);
        }
    }

    pub fn claimant(&self, id: AnomalyId) -> Option<Stake> {
        self.claims.get(&id).copied()
    }

    /// Whether a drone other than `me` holds a fresh claim on `id`.
    pub fn is_claimed_by_other(&self, id: AnomalyId, me: DroneId, now: u32) -> bool {
        self.claims
            .get(&id)
            .map(|s| s.drone != me && s.is_fresh(now, CLAIM_TTL))
            .unwrap_or(false)
    }

    /// Reserves every unexplored cell within `radius` of `target` for `stake.drone`.
    pub fn reserve_area(&mut self, target: &Point, radius: f64, stake: Stake) {
        for cell in Cell::disc(target, radius) {
            if self.index(cell).is_some() && !self.is_explored(cell) {
                self.reservations.insert(cell, stake);
            }
        }
    }

    pub fn is_reserved_by_other(&self, cell: Cell, me: DroneId, now: u32) -> bool {
        self.reservations
            .get(&cell)
            .map(|s| s.drone != me && s.is_fresh(now, RESERVATION_TTL))
            .unwrap_or(false)
    }

    /// Forgets stakes older than their time-to-live.
    pub fn prune(&mut self, now: u32) {
        self.claims.retain(|_, s| s.is_fresh(now, CLAIM_TTL));
        self.reservations.retain(|_, s| s.is_fresh(now, RESERVATION_TTL));
    }

    // === Merging ===

    /// Takes in explored cells and anomalies from `other`, ignoring its stakes.
    pub fn merge_observations(&mut self, other: &Knowledge) {
        if other.width == self.width && other.height == self.height {
            for (idx, explored) in other.explored.iter().enumerate() {
                if *explored && !self.explored[idx] {
                    self.explored[idx] = true;
                    self.explored_count += 1;
                }
            }
        }
        for anomaly in other.anomalies.values() {
            self.learn(anomaly.clone());
        }

        let treated: Vec<AnomalyId> = self
            .anomalies
            .values()
            .filter(|a| a.treated)
            .map(|a| a.id)
            .collect();
        for id in treated {
            self.claims.remove(&id);
        }
        let (explored, width, height) = (&self.explored, self.width, self.height);
        self.reservations.retain(|cell, _| {
            let (x, y) = (cell.x as usize, cell.y as usize);
            cell.x >= 0 && cell.y >= 0 && x < width && y < height && !explored[y * width + x]
        });
    }

    /// Full merge: observations plus claims and reservations.
    ///
    /// Newer stakes win whoever holds them, so two drones
    /// heading for the same anomaly settle on the same claimant.
    pub fn merge(&mut self, other: &Knowledge) {
        for (id, stake) in &other.claims {
            let known_treated = self.anomalies.get(id).map(|a| a.treated).unwrap_or(false)
                || other.anomalies.get(id).map(|a| a.treated).unwrap_or(false);
            if known_treated {
                continue;
            }
            match self.claims.get(id) {
                Some(existing) if !stake.supersedes(existing) => {}
                _ => {
                    self.claims.insert(*id, *stake);
                }
            }
        }
        for (cell, stake) in &other.reservations {
            match self.reservations.get(cell) {
                Some(existing) if !stake.supersedes(existing) => {}
                _ => {
                    self.reservations.insert(*cell, *stake);
                }
            }
        }
        self.merge_observations(other);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn known(id: AnomalyId, severity: Severity) -> KnownAnomaly {
        KnownAnomaly {
            id,
            position: Point::new(5.0, 5.0),
            kind: AnomalyKind::Radiation,
            severity,
            signal: severity.initial_signal(),
            treated: false,
        }
    }

    #[test]
    fn test_mark_explored_is_idempotent() {
        let mut k = Knowledge::new(10, 10);
        k.mark_explored(Cell::new(1, 1));
        k.mark_explored(Cell::new(1, 1));
        k.mark_explored(Cell::new(-1, 1));
        assert_eq!(k.explored_count(), 1);
        assert!(k.is_explored(Cell::new(1, 1)));
        assert!((k.explored_ratio() - 0.01).abs() < 1e-12);
    }

    #[test]
    fn test_unexplored_cells_row_major() {
        let mut k = Knowledge::new(2, 2);
        k.mark_explored(Cell::new(0, 0));
        let cells: Vec<Cell> = k.unexplored_cells().collect();
        assert_eq!(cells, vec![Cell::new(1, 0), Cell::new(0, 1), Cell::new(1, 1)]);
    }

    #[test]
    fn test_learn_reports_novelty_and_keeps_treated() {
        let mut k = Knowledge::new(10, 10);
        assert!(k.learn(known(1, Severity::Weak)));

        let mut treated = known(1, Severity::Weak);
        treated.treated = true;
        assert!(!k.learn(treated));
        assert!(!k.learn(known(1, Severity::Weak)));
        assert!(k.anomaly(1).unwrap().treated);
        assert_eq!(k.untreated().count(), 0);
    }

    #[test]
    fn test_claims_expire() {
        let mut k = Knowledge::new(10, 10);
        k.claim(3, Stake { drone: 2, step: 10 });
        assert!(k.is_claimed_by_other(3, 1, 20));
        assert!(!k.is_claimed_by_other(3, 2, 20));
        assert!(!k.is_claimed_by_other(3, 1, 10 + CLAIM_TTL + 1));

        k.prune(10 + CLAIM_TTL + 1);
        assert!(k.claimant(3).is_none());
    }

    #[test]
    fn test_release_only_own_claim() {
        let mut k = Knowledge::new(10, 10);
        k.claim(3, Stake { drone: 2, step: 1 });
        k.release(3, 1);
        assert!(k.claimant(3).is_some());
        k.release(3, 2);
        assert!(k.claimant(3).is_none());
    }

    #[test]
    fn test_reservations_cleared_by_exploration() {
        let mut k = Knowledge::new(20, 20);
        k.reserve_area(&Point::new(10.0, 10.0), 2.0, Stake { drone: 4, step: 0 });
        assert!(k.is_reserved_by_other(Cell::new(10, 10), 0, 1));
        k.mark_explored(Cell::new(10, 10));
        assert!(!k.is_reserved_by_other(Cell::new(10, 10), 0, 1));
        assert!(k.is_reserved_by_other(Cell::new(11, 10), 0, 1));
    }

    #[test]
    fn test_merge_unions_observations() {
        let mut a = Knowledge::new(10, 10);
        let mut b = Knowledge::new(10, 10);
        a.mark_explored(Cell::new(0, 0));
        b.mark_explored(Cell::new(0, 0));
        b.mark_explored(Cell::new(9, 9));
        b.learn(known(7, Severity::Intense));

        a.merge(&b);
        assert_eq!(a.explored_count(), 2);
        assert!(a.knows(7));
    }

    #[test]
    fn test_merge_drops_claims_on_treated_anomalies() {
        let mut a = Knowledge::new(10, 10);
        a.learn(known(1, Severity::Weak));
        a.claim(1, Stake { drone: 0, step: 5 });

        let mut b = Knowledge::new(10, 10);
        let mut treated = known(1, Severity::Weak);
        treated.treated = true;
        b.learn(treated);

        a.merge(&b);
        assert!(a.anomaly(1).unwrap().treated);
        assert!(a.claimant(1).is_none());
    }

    #[test]
    fn test_merge_newer_claim_wins() {
        let mut a = Knowledge::new(10, 10);
        a.claim(1, Stake { drone: 3, step: 5 });
        let mut b = Knowledge::new(10, 10);
        b.claim(1, Stake { drone: 1, step: 8 });

        a.merge(&b);
        assert_eq!(a.claimant(1).unwrap().drone, 1);

        let mut c = Knowledge::new(10, 10);
        c.claim(1, Stake { drone: 0, step: 2 });
        a.merge(&c);
        assert_eq!(a.claimant(1).unwrap().drone, 1);
    }

    #[test]
    fn test_merge_own_claim_follows_stake_order() {
        let mut mine = Knowledge::new(10, 10);
        mine.claim(1, Stake { drone: 0, step: 5 });

        let mut older = Knowledge::new(10, 10);
        older.claim(1, Stake { drone: 3, step: 4 });
        mine.merge(&older);
        assert_eq!(mine.claimant(1), Some(Stake { drone: 0, step: 5 }));

        let mut newer = Knowledge::new(10, 10);
        newer.claim(1, Stake { drone: 3, step: 6 });
        mine.merge(&newer);
        assert_eq!(mine.claimant(1), Some(Stake { drone: 3, step: 6 }));
        assert!(mine.is_claimed_by_other(1, 0, 6));
    }

    #[test]
    fn test_merge_equal_steps_go_to_lower_id() {
        let mut mine = Knowledge::new(10, 10);
        mine.claim(2, Stake { drone: 4, step: 9 });
        let mut peer = Knowledge::new(10, 10);
        peer.claim(2, Stake { drone: 1, step: 9 });

        mine.merge(&peer);
        assert_eq!(mine.claimant(2), Some(Stake { drone: 1, step: 9 }));

        peer.merge(&mine);
        assert_eq!(peer.claimant(2), Some(Stake { drone: 1, step: 9 }));
    }

    #[test]
    fn test_merge_observations_ignores_stakes() {
        let mut a = Knowledge::new(10, 10);
        let mut b = Knowledge::new(10, 10);
        b.claim(1, Stake { drone: 2, step: 0 });
        b.reserve_area(&Point::new(3.0, 3.0), 1.0, Stake { drone: 2, step: 0 });

        a.merge_observations(&b);
        assert!(a.claimant(1).is_none());
        assert!(!a.is_reserved_by_other(Cell::new(3, 3), 0, 0));
    }
}
