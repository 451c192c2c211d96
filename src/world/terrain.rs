//! Procedural terrain: plains, forests, rivers and lakes.

use std::f64::consts::PI;

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::geometry::{Cell, Point};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Terrain {
    Plain,
    Forest,
    River,
    Lake,
}

impl Terrain {
    pub fn as_str(&self) -> &'static str {
        match self {
            Terrain::Plain => "plain",
            Terrain::Forest => "forest",
            Terrain::River => "river",
            Terrain::Lake => "lake",
        }
    }

    pub fn is_water(&self) -> bool {
        matches!(self, Terrain::River | Terrain::Lake)
    }
}

/// Row-major terrain grid.
#[derive(Debug, Clone)]
pub struct TerrainMap {
    width: usize,
    height: usize,
    cells: Vec<Terrain>,
}

impl TerrainMap {
    pub fn flat(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            cells: vec![Terrain::Plain; width * height],
        }
    }

    /// Forests first, then lakes over them, then rivers over everything.
    pub fn generate<R: Rng>(width: usize, height: usize, rng: &mut R) -> Self {
        let mut map = Self::flat(width, height);
        if width < 32 || height < 32 {
            // Feature sizes below assume a map of reasonable size.
            return map;
        }

        let forests = rng.gen_range(3..6);
        for _ in 0..forests {
            let center = Point::new(
                rng.gen_range(10..width - 10) as f64,
                rng.gen_range(10..height - 10) as f64,
            );
            let radius = rng.gen_range(8.0..15.0);
            for cell in Cell::disc(&center, radius).collect::<Vec<_>>() {
                let dist = cell.center().distance(&center);
                let density = 1.0 - dist / radius;
                if rng.gen::<f64>() < density * 0.8 {
                    map.set(cell, Terrain::Forest);
                }
            }
        }

        let lakes = rng.gen_range(2..4);
        for _ in 0..lakes {
            let center = Point::new(
                rng.gen_range(15..width - 15) as f64,
                rng.gen_range(15..height - 15) as f64,
            );
            let radius = rng.gen_range(5.0..10.0);
            for cell in Cell::disc(&center, radius).collect::<Vec<_>>() {
                map.set(cell, Terrain::Lake);
            }
        }

        let rivers = rng.gen_range(1..3);
        for _ in 0..rivers {
            let (mut x, mut y, mut heading) = if rng.gen_bool(0.5) {
                (0.0, rng.gen_range(0..height) as f64, rng.gen_range(0.0..PI / 2.0))
            } else {
                (
                    rng.gen_range(0..width) as f64,
                    0.0,
                    rng.gen_range(PI / 4.0..3.0 * PI / 4.0),
                )
            };

            let length = rng.gen_range(40..80);
            let half_width = 2;
            for _ in 0..length {
                for dx in -half_width..=half_width {
                    for dy in -half_width..=half_width {
                        map.set(Cell::new(x as i32 + dx, y as i32 + dy), Terrain::River);
                    }
                }

                heading += rng.gen_range(-0.3..0.3);
                x += heading.cos() * 1.5;
                y += heading.sin() * 1.5;

                if x < 0.0 || x >= width as f64 || y < 0.0 || y >= height as f64 {
                    break;
                }
            }
        }

        map
    }

    /// Terrain at a cell, plain outside the map.
    pub fn get(&self, cell: Cell) -> Terrain {
        self.index(cell)
            .map(|idx| self.cells[idx])
            .unwrap_or(Terrain::Plain)
    }

    pub fn set(&mut self, cell: Cell, terrain: Terrain) {
        if let Some(idx) = self.index(cell) {
            self.cells[idx] = terrain;
        }
    }

    pub fn count(&self, terrain: Terrain) -> usize {
        self.cells.iter().filter(|t| **t == terrain).count()
    }

    fn index(&self, cell: Cell) -> Option<usize> {
        if cell.x < 0 || cell.y < 0 {
            return None;
        }
        let (x, y) = (cell.x as usize, cell.y as usize);
        if x < self.width && y < self.height {
            Some(y * self.width + x)
        } else {
            None
        }
    }
}
