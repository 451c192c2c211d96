use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};

use drone_swarm::config::{load_config, SimulationConfig, Strategy};
use drone_swarm::error::Result;
use drone_swarm::simulation::{compare_strategies, export_run, Simulation, SimulationReport};

#[derive(Parser)]
#[command(name = "drone-swarm")]
#[command(about = "Simulate a cooperative drone swarm surveying and treating environmental anomalies")]
#[command(version)]
#[command(after_long_help = r#"
EXAMPLES:
    # Run the default scenario
    drone-swarm run

    # Run a scenario file with another strategy
    drone-swarm run --config scenario.toml --strategy mixed

    # Short run without writing any file
    drone-swarm run --turns 50 --no-export

    # Compare every strategy over 5 seeds
    drone-swarm compare --seeds 5

    # Write the default configuration to a file
    drone-swarm config --output scenario.toml
"#)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Show debug logs
    #[arg(long, short, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run one simulation
    Run {
        /// Scenario file (.toml, .yaml or .yml)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Strategy: action, exploration or mixed
        #[arg(long)]
        strategy: Option<Strategy>,

        /// Number of drones
        #[arg(long)]
        drones: Option<usize>,

        /// Maximum number of turns
        #[arg(long)]
        turns: Option<u32>,

        /// Random seed
        #[arg(long)]
        seed: Option<u64>,

        /// Output directory
        #[arg(long)]
        output: Option<PathBuf>,

        /// Do not write result files
        #[arg(long)]
        no_export: bool,

        /// No progress bar or periodic status
        #[arg(long, short)]
        quiet: bool,
    },

    /// Compare strategies over several seeds
    Compare {
        /// Scenario file (.toml, .yaml or .yml)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Number of seeds per strategy
        #[arg(long, default_value = "5")]
        seeds: u64,

        /// Maximum number of turns
        #[arg(long)]
        turns: Option<u32>,
    },

    /// Print the default configuration
    Config {
        /// Write to this file instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

/// Overrides applied on top of the scenario file.
#[derive(Debug, Default)]
pub struct RunOverrides {
    pub strategy: Option<Strategy>,
    pub drones: Option<usize>,
    pub turns: Option<u32>,
    pub seed: Option<u64>,
    pub output: Option<PathBuf>,
}

impl RunOverrides {
    fn apply(&self, config: &mut SimulationConfig) {
        if let Some(strategy) = self.strategy {
            config.strategy = strategy;
        }
        if let Some(drones) = self.drones {
            config.simulation.num_drones = drones;
        }
        if let Some(turns) = self.turns {
            config.simulation.max_turns = turns;
        }
        if let Some(seed) = self.seed {
            config.simulation.seed = Some(seed);
        }
        if let Some(output) = &self.output {
            config.output.directory = output.display().to_string();
        }
    }
}

fn load_or_default(path: Option<&Path>) -> Result<SimulationConfig> {
    match path {
        Some(path) => load_config(path),
        None => Ok(SimulationConfig::default()),
    }
}

pub fn run_simulation(
    config_path: Option<&Path>,
    overrides: &RunOverrides,
    export: bool,
    quiet: bool,
) -> Result<()> {
    let mut config = load_or_default(config_path)?;
    overrides.apply(&mut config);
    config.validate()?;

    let mut sim = Simulation::new(config)?;
    let status_interval = sim.config().simulation.status_interval;

    println!(
        "Running {} turns with {} drones, strategy {}, seed {}",
        sim.config().simulation.max_turns,
        sim.drones().len(),
        sim.strategy(),
        sim.seed()
    );

    let progress = if quiet {
        ProgressBar::hidden()
    } else {
        let bar = ProgressBar::new(sim.config().simulation.max_turns as u64);
        if let Ok(style) =
            ProgressStyle::with_template("{bar:40.cyan/blue} {pos}/{len} turns {msg}")
        {
            bar.set_style(style.progress_chars("=> "));
        }
        bar
    };

    let report = sim.run_with(|sim| {
        progress.set_position(sim.current_step() as u64);
        progress.set_message(format!(
            "{:.1}% explored, {} treated",
            100.0 * sim.environment().exploration_ratio(),
            sim.environment().treated_count()
        ));
        if !quiet && sim.current_step() % status_interval == 0 {
            progress.println(sim.status().to_string());
        }
    });
    progress.finish_and_clear();

    print!("{}", sim.status());
    print_report(&report);

    if export {
        let files = export_run(&sim, &report)?;
        for path in [files.movements, files.report, files.map].into_iter().flatten() {
            println!("  Wrote {}", path.display());
        }
    }

    Ok(())
}

fn print_report(report: &SimulationReport) {
    println!("Simulation Results:");
    println!("  Strategy: {}", report.strategy);
    println!("  Steps: {}", report.steps);
    println!("  Explored: {:.1}%", report.exploration_percent);
    println!(
        "  Anomalies treated: {}/{}",
        report.anomalies_treated, report.anomalies_total
    );
    println!("  Known to control center: {}", report.anomalies_known);
    println!("  Transmissions: {}", report.transmissions);
    println!("  Direct detections: {}", report.total_detections);

    println!("\n  Drones:");
    for drone in &report.drones {
        println!(
            "    #{}: {} treated, {:.1} travelled, battery {:.1}, moving {} / exploring {} / treating {} / recharging {} / waiting {}",
            drone.id,
            drone.treated,
            drone.distance_travelled,
            drone.battery,
            drone.activity.moving,
            drone.activity.exploring,
            drone.activity.treating,
            drone.activity.recharging,
            drone.activity.waiting
        );
    }

    if !report.priority_zones.is_empty() {
        println!("\n  Priority zones:");
        for zone in &report.priority_zones {
            println!(
                "    {} ({}, {}) score {:.2}",
                zone.priority.as_str(),
                zone.cell.x,
                zone.cell.y,
                zone.score
            );
        }
    }
}

pub fn compare(config_path: Option<&Path>, seeds: u64, turns: Option<u32>) -> Result<()> {
    let mut config = load_or_default(config_path)?;
    if let Some(turns) = turns {
        config.simulation.max_turns = turns;
    }
    let first = config.simulation.seed.unwrap_or(0);
    let seeds: Vec<u64> = (0..seeds).map(|i| first.wrapping_add(i)).collect();

    let summaries = compare_strategies(&config, &seeds)?;

    println!("Strategy comparison ({} seeds):", seeds.len());
    println!(
        "  {:<12} {:>6} {:>12} {:>10} {:>8}",
        "strategy", "runs", "explored %", "treated", "steps"
    );
    for summary in summaries {
        println!(
            "  {:<12} {:>6} {:>12.1} {:>10.2} {:>8.1}",
            summary.strategy.as_str(),
            summary.runs,
            summary.mean_exploration_percent,
            summary.mean_treated,
            summary.mean_steps
        );
    }

    Ok(())
}

pub fn write_default_config(output: Option<&Path>) -> Result<()> {
    let toml = SimulationConfig::default().to_toml()?;
    match output {
        Some(path) => {
            fs::write(path, toml)?;
            println!("Wrote default configuration to {}", path.display());
        }
        None => print!("{}", toml),
    }
    Ok(())
}
