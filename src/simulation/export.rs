//! Writing run results to disk: movement log, JSON report and ASCII map.

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::OutputSettings;
use crate::error::Result;
use crate::swarm::{Drone, MovementEvent};
use crate::world::{Cell, Environment, Severity};

use super::engine::Simulation;
use super::report::SimulationReport;

/// Widest map rendered, in characters.
pub const MAX_MAP_COLUMNS: usize = 100;

/// Files written by [`export_run`]; `None` for outputs switched off.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExportedFiles {
    pub movements: Option<PathBuf>,
    pub report: Option<PathBuf>,
    pub map: Option<PathBuf>,
}

/// `{run_name}_{strategy}_{seed}`, shared by every output of a run.
pub fn output_stem(output: &OutputSettings, report: &SimulationReport) -> String {
    format!("{}_{}_{}", output.run_name, report.strategy, report.seed)
}

pub fn export_run(sim: &Simulation, report: &SimulationReport) -> Result<ExportedFiles> {
    let output = &sim.config().output;
    let dir = Path::new(&output.directory);
    fs::create_dir_all(dir)?;
    let stem = output_stem(output, report);

    let mut files = ExportedFiles::default();
    if output.save_movements_csv {
        let path = dir.join(format!("{}.csv", stem));
        write_movements_csv(&path, sim.drones())?;
        files.movements = Some(path);
    }
    if output.save_report {
        let path = dir.join(format!("{}.json", stem));
        write_report_json(&path, report)?;
        files.report = Some(path);
    }
    if output.save_map {
        let path = dir.join(format!("{}.txt", stem));
        fs::write(&path, render_map(sim.environment(), sim.drones()))?;
        files.map = Some(path);
    }

    tracing::info!("Exported results to {}", dir.display());
    Ok(files)
}

/// Every drone movement, ordered by step then drone.
pub fn write_movements_csv(path: &Path, drones: &[Drone]) -> Result<()> {
    let mut events: Vec<&MovementEvent> = drones.iter().flat_map(|d| d.movements.iter()).collect();
    events.sort_by_key(|e| (e.step, e.drone_id));

    let mut writer = csv::Writer::from_path(path)?;
    for event in events {
        writer.serialize(event)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_report_json(path: &Path, report: &SimulationReport) -> Result<()> {
    let json = serde_json::to_string_pretty(report)?;
    fs::write(path, json)?;
    Ok(())
}

/// Draws the map with north up, downsampled to at most [`MAX_MAP_COLUMNS`].
///
/// `#` unexplored, `.` explored, `~` unexplored water, `B` base,
/// `A`/`a` untreated intense/weak anomaly, `+` treated anomaly, digits drones.
pub fn render_map(env: &Environment, drones: &[Drone]) -> String {
    let scale = env.width().div_ceil(MAX_MAP_COLUMNS).max(1);
    let cols = env.width().div_ceil(scale);
    let rows = env.height().div_ceil(scale);
    let mut grid = vec![vec!['#'; cols]; rows];

    for (row, line) in grid.iter_mut().enumerate() {
        for (col, glyph) in line.iter_mut().enumerate() {
            let x0 = col * scale;
            let y0 = (rows - 1 - row) * scale;
            let block = (x0..(x0 + scale).min(env.width())).flat_map(|x| {
                (y0..(y0 + scale).min(env.height())).map(move |y| Cell::new(x as i32, y as i32))
            });
            let mut explored = true;
            let mut water = false;
            for cell in block {
                explored &= env.is_explored(cell);
                water |= env.terrain().get(cell).is_water();
            }
            *glyph = match (explored, water) {
                (true, _) => '.',
                (false, true) => '~',
                (false, false) => '#',
            };
        }
    }

    let mut put = |x: f64, y: f64, glyph: char| {
        let col = (x.max(0.0) as usize / scale).min(cols - 1);
        let row = rows - 1 - (y.max(0.0) as usize / scale).min(rows - 1);
        grid[row][col] = glyph;
    };

    for anomaly in env.anomalies() {
        let glyph = match (anomaly.treated, anomaly.severity) {
            (true, _) => '+',
            (false, Severity::Intense) => 'A',
            (false, Severity::Weak) => 'a',
        };
        put(anomaly.position.x, anomaly.position.y, glyph);
    }
    put(env.base().x, env.base().y, 'B');
    for drone in drones {
        let glyph = char::from_digit((drone.id % 10) as u32, 10).unwrap_or('?');
        put(drone.position.x, drone.position.y, glyph);
    }

    let mut out = String::with_capacity(rows * (cols + 1));
    for line in grid {
        out.extend(line);
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::swarm::DroneParams;
    use crate::world::{AnomalyKind, Point, TerrainMap};

    #[test]
    fn test_render_small_map() {
        let mut env = Environment::new(4, 3, Point::new(0.0, 0.0), TerrainMap::flat(4, 3));
        env.add_anomaly(Point::new(3.0, 2.0), AnomalyKind::Radiation, Severity::Intense, 5.0);
        let weak = env.add_anomaly(Point::new(3.0, 0.0), AnomalyKind::Flood, Severity::Weak, 5.0);
        env.treat(weak);
        env.mark_cell(Cell::new(1, 2));
        let drones = vec![Drone::new(
            7,
            Point::new(2.0, 1.0),
            Point::new(0.0, 0.0),
            DroneParams::default(),
            4,
            3,
        )];

        let map = render_map(&env, &drones);
        assert_eq!(map, "#.#A\n##7#\nB##+\n");
    }

    #[test]
    fn test_render_downsamples_wide_maps() {
        let env = Environment::new(250, 20, Point::new(5.0, 5.0), TerrainMap::flat(250, 20));
        let map = render_map(&env, &[]);
        let lines: Vec<&str> = map.lines().collect();
        assert_eq!(lines.len(), 7);
        assert!(lines.iter().all(|l| l.chars().count() == 84));
    }

    #[test]
    fn test_render_marks_water() {
        let mut terrain = TerrainMap::flat(2, 1);
        terrain.set(Cell::new(1, 0), crate::world::Terrain::Lake);
        let env = Environment::new(2, 1, Point::new(0.0, 0.0), terrain);
        assert_eq!(render_map(&env, &[]), "B~\n");
    }
}
