//! Where the base sits on the map.

use std::fmt;
use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::world::Point;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cardinal {
    North,
    South,
    East,
    West,
    NorthEast,
    NorthWest,
    SouthEast,
    SouthWest,
}

impl Cardinal {
    pub fn as_str(&self) -> &'static str {
        match self {
            Cardinal::North => "N",
            Cardinal::South => "S",
            Cardinal::East => "E",
            Cardinal::West => "W",
            Cardinal::NorthEast => "NE",
            Cardinal::NorthWest => "NW",
            Cardinal::SouthEast => "SE",
            Cardinal::SouthWest => "SW",
        }
    }

    /// Accepts English and French abbreviations (`O` for ouest).
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "N" => Some(Cardinal::North),
            "S" => Some(Cardinal::South),
            "E" => Some(Cardinal::East),
            "W" | "O" => Some(Cardinal::West),
            "NE" => Some(Cardinal::NorthEast),
            "NW" | "NO" => Some(Cardinal::NorthWest),
            "SE" => Some(Cardinal::SouthEast),
            "SW" | "SO" => Some(Cardinal::SouthWest),
            _ => None,
        }
    }

    /// Edge points sit 5 units inside the border, corners 10 units.
    pub fn locate(&self, width: f64, height: f64) -> Point {
        match self {
            Cardinal::North => Point::new(width / 2.0, height - 5.0),
            Cardinal::South => Point::new(width / 2.0, 5.0),
            Cardinal::East => Point::new(width - 5.0, height / 2.0),
            Cardinal::West => Point::new(5.0, height / 2.0),
            Cardinal::NorthEast => Point::new(width - 10.0, height - 10.0),
            Cardinal::NorthWest => Point::new(10.0, height - 10.0),
            Cardinal::SouthEast => Point::new(width - 10.0, 10.0),
            Cardinal::SouthWest => Point::new(10.0, 10.0),
        }
    }
}

/// Base placement, written in config files as `"W"`, `"random"` or `"x,y"`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum BasePosition {
    Fixed { x: f64, y: f64 },
    Cardinal(Cardinal),
    Random,
}

impl BasePosition {
    /// Resolves the placement to a concrete point inside a `width` x `height` map.
    pub fn resolve<R: Rng>(&self, width: usize, height: usize, rng: &mut R) -> Point {
        let (w, h) = (width as f64, height as f64);
        let point = match self {
            BasePosition::Fixed { x, y } => Point::new(*x, *y),
            BasePosition::Cardinal(cardinal) => cardinal.locate(w, h),
            BasePosition::Random => {
                let margin_x = (w * 0.1).min(10.0);
                let margin_y = (h * 0.1).min(10.0);
                Point::new(
                    rng.gen_range(margin_x..=(w - margin_x)),
                    rng.gen_range(margin_y..=(h - margin_y)),
                )
            }
        };
        // Cardinal offsets can overshoot on very small maps.
        point.clamp((w - 1.0).max(0.0), (h - 1.0).max(0.0))
    }
}

impl fmt::Display for BasePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BasePosition::Fixed { x, y } => write!(f, "{},{}", x, y),
            BasePosition::Cardinal(cardinal) => f.write_str(cardinal.as_str()),
            BasePosition::Random => f.write_str("random"),
        }
    }
}

impl FromStr for BasePosition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if matches!(trimmed.to_uppercase().as_str(), "A" | "RANDOM") {
            return Ok(BasePosition::Random);
        }
        if let Some(cardinal) = Cardinal::from_str(trimmed) {
            return Ok(BasePosition::Cardinal(cardinal));
        }
        if let Some((x, y)) = trimmed.split_once(',') {
            let x = x.trim().parse::<f64>().map_err(|e| format!("invalid base x '{}': {}", x, e))?;
            let y = y.trim().parse::<f64>().map_err(|e| format!("invalid base y '{}': {}", y, e))?;
            return Ok(BasePosition::Fixed { x, y });
        }
        Err(format!(
            "invalid base position '{}' (expected a cardinal point, 'random' or 'x,y')",
            s
        ))
    }
}

impl TryFrom<String> for BasePosition {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<BasePosition> for String {
    fn from(value: BasePosition) -> Self {
        value.to_string()
    }
}
