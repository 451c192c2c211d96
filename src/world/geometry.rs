//! Continuous positions and integer grid cells.

use serde::{Deserialize, Serialize};

/// A position on the map, in map units.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// Moves at most `max_step` towards `target`, landing exactly on it when close enough.
    pub fn step_towards(&self, target: &Point, max_step: f64) -> Point {
        let distance = self.distance(target);
        if distance <= max_step || distance == 0.0 {
            return *target;
        }
        let ratio = max_step / distance;
        Point::new(
            self.x + (target.x - self.x) * ratio,
            self.y + (target.y - self.y) * ratio,
        )
    }

    pub fn clamp(&self, width: f64, height: f64) -> Point {
        Point::new(self.x.clamp(0.0, width), self.y.clamp(0.0, height))
    }

    /// Grid cell containing this point (truncating towards zero).
    pub fn cell(&self) -> Cell {
        Cell::new(self.x as i32, self.y as i32)
    }

    pub fn lerp(&self, other: &Point, t: f64) -> Point {
        Point::new(
            self.x + (other.x - self.x) * t,
            self.y + (other.y - self.y) * t,
        )
    }
}

/// An integer grid coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Cell {
    pub x: i32,
    pub y: i32,
}

impl Cell {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn center(&self) -> Point {
        Point::new(self.x as f64, self.y as f64)
    }

    /// All cells whose coordinates lie within `radius` of `center`.
    pub fn disc(center: &Point, radius: f64) -> impl Iterator<Item = Cell> + '_ {
        let x_min = (center.x - radius).floor() as i32;
        let x_max = (center.x + radius).ceil() as i32;
        let y_min = (center.y - radius).floor() as i32;
        let y_max = (center.y + radius).ceil() as i32;
        let r2 = radius * radius;

        (x_min..=x_max).flat_map(move |x| {
            (y_min..=y_max).filter_map(move |y| {
                let dx = x as f64 - center.x;
                let dy = y as f64 - center.y;
                if dx * dx + dy * dy <= r2 {
                    Some(Cell::new(x, y))
                } else {
                    None
                }
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_distance() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(3.0, 4.0);
        assert_eq!(a.distance(&b), 5.0);
    }

    #[test]
    fn test_step_towards_lands_on_close_target() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(1.0, 1.0);
        assert_eq!(a.step_towards(&b, 5.0), b);
    }

    #[test]
    fn test_step_towards_partial() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(10.0, 0.0);
        let moved = a.step_towards(&b, 5.0);
        assert!((moved.x - 5.0).abs() < 1e-9);
        assert_eq!(moved.y, 0.0);
    }

    #[test]
    fn test_cell_truncates() {
        assert_eq!(Point::new(3.9, 7.2).cell(), Cell::new(3, 7));
    }

    #[test]
    fn test_disc_contains_center_and_respects_radius() {
        let center = Point::new(5.0, 5.0);
        let cells: Vec<Cell> = Cell::disc(&center, 2.0).collect();
        assert!(cells.contains(&Cell::new(5, 5)));
        assert!(cells.contains(&Cell::new(7, 5)));
        assert!(!cells.contains(&Cell::new(7, 7)));
        assert_eq!(cells.len(), 13);
    }

    proptest! {
        #[test]
        fn prop_step_never_exceeds_max(
            ax in -100.0f64..100.0, ay in -100.0f64..100.0,
            bx in -100.0f64..100.0, by in -100.0f64..100.0,
            step in 0.1f64..20.0,
        ) {
            let a = Point::new(ax, ay);
            let b = Point::new(bx, by);
            let moved = a.step_towards(&b, step);
            prop_assert!(a.distance(&moved) <= step + 1e-9);
            prop_assert!(moved.distance(&b) <= a.distance(&b) + 1e-9);
        }

        #[test]
        fn prop_distance_is_symmetric(
            ax in -100.0f64..100.0, ay in -100.0f64..100.0,
            bx in -100.0f64..100.0, by in -100.0f64..100.0,
        ) {
            let a = Point::new(ax, ay);
            let b = Point::new(bx, by);
            prop_assert!((a.distance(&b) - b.distance(&a)).abs() < 1e-12);
        }
    }
}
