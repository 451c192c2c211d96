//! Running every strategy over the same seeds to compare them.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::{SimulationConfig, Strategy};
use crate::error::Result;

use super::engine::Simulation;
use super::report::SimulationReport;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategySummary {
    pub strategy: Strategy,
    pub runs: usize,
    pub mean_exploration_percent: f64,
    pub mean_treated: f64,
    pub mean_steps: f64,
}

impl StrategySummary {
    fn from_reports<'a>(strategy: Strategy, reports: impl Iterator<Item = &'a SimulationReport>) -> Self {
        let (mut runs, mut exploration, mut treated, mut steps) = (0usize, 0.0, 0.0, 0.0);
        for report in reports {
            runs += 1;
            exploration += report.exploration_percent;
            treated += report.anomalies_treated as f64;
            steps += report.steps as f64;
        }
        let mean = |total: f64| if runs == 0 { 0.0 } else { total / runs as f64 };
        Self {
            strategy,
            runs,
            mean_exploration_percent: mean(exploration),
            mean_treated: mean(treated),
            mean_steps: mean(steps),
        }
    }
}

/// Runs each strategy once per seed, in parallel, and averages the results.
///
/// Every run gets the same configuration apart from the strategy and seed.
pub fn compare_strategies(config: &SimulationConfig, seeds: &[u64]) -> Result<Vec<StrategySummary>> {
    config.validate()?;

    let jobs: Vec<(Strategy, u64)> = Strategy::ALL
        .iter()
        .flat_map(|strategy| seeds.iter().map(move |seed| (*strategy, *seed)))
        .collect();
    tracing::info!("Comparing {} strategies over {} seeds", Strategy::ALL.len(), seeds.len());

    let reports: Vec<SimulationReport> = jobs
        .par_iter()
        .map(|(strategy, seed)| {
            let mut run_config = config.clone();
            run_config.strategy = *strategy;
            run_config.simulation.seed = Some(*seed);
            Simulation::new(run_config).map(|mut sim| sim.run())
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Strategy::ALL
        .iter()
        .map(|strategy| {
            StrategySummary::from_reports(*strategy, reports.iter().filter(|r| r.strategy == *strategy))
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_means() {
        let mut config = SimulationConfig::default();
        config.environment.width = 30;
        config.environment.height = 30;
        config.anomalies.count = 2;
        config.anomalies.min_distance_from_base = 5.0;
        config.simulation.max_turns = 20;
        config.simulation.num_drones = 2;

        let summaries = compare_strategies(&config, &[1, 2]).unwrap();
        assert_eq!(summaries.len(), 3);
        for (summary, strategy) in summaries.iter().zip(Strategy::ALL) {
            assert_eq!(summary.strategy, strategy);
            assert_eq!(summary.runs, 2);
            assert_eq!(summary.mean_steps, 20.0);
            assert!(summary.mean_exploration_percent > 0.0);
        }
    }

    #[test]
    fn test_no_seeds_gives_empty_runs() {
        let summaries = compare_strategies(&SimulationConfig::default(), &[]).unwrap();
        assert!(summaries.iter().all(|s| s.runs == 0 && s.mean_treated == 0.0));
    }
}
