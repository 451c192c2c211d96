//! Integration tests for whole simulation runs.
//!
//! These tests check the invariants that must hold on every step of a run,
//! whatever the strategy.

use drone_swarm::{Simulation, SimulationConfig, Strategy};

/// Small map with few anomalies so runs stay fast.
fn small_config(strategy: Strategy, seed: u64) -> SimulationConfig {
    let mut config = SimulationConfig::default();
    config.strategy = strategy;
    config.environment.width = 40;
    config.environment.height = 40;
    config.anomalies.count = 4;
    config.anomalies.min_distance_from_base = 8.0;
    config.simulation.num_drones = 3;
    config.simulation.max_turns = 200;
    config.simulation.seed = Some(seed);
    config
}

/// Expensive flights force drones back to base regularly.
fn tight_battery_config(strategy: Strategy) -> SimulationConfig {
    let mut config = small_config(strategy, 11);
    config.environment.width = 60;
    config.environment.height = 60;
    config.battery.movement_cost = 1.0;
    config.simulation.max_turns = 250;
    config
}

mod invariants {
    use super::*;

    #[test]
    fn test_battery_never_below_return_cost() {
        for strategy in Strategy::ALL {
            let mut sim = Simulation::new(tight_battery_config(strategy)).unwrap();
            let max = sim.config().battery.max;
            sim.run_with(|sim| {
                for drone in sim.drones() {
                    assert!(
                        drone.battery >= drone.return_cost() - 1e-6,
                        "{} step {}: drone {} has {:.3} battery, needs {:.3}",
                        strategy,
                        sim.current_step(),
                        drone.id,
                        drone.battery,
                        drone.return_cost()
                    );
                    assert!(drone.battery >= 0.0 && drone.battery <= max);
                }
            });
        }
    }

    #[test]
    fn test_tight_battery_forces_recharges() {
        let mut sim = Simulation::new(tight_battery_config(Strategy::Action)).unwrap();
        let report = sim.run();
        let recharges: u32 = report.drones.iter().map(|d| d.activity.recharging).sum();
        assert!(recharges > 0);
    }

    #[test]
    fn test_positions_stay_on_map() {
        let mut sim = Simulation::new(small_config(Strategy::Mixed, 3)).unwrap();
        sim.run_with(|sim| {
            let env = sim.environment();
            for drone in sim.drones() {
                assert!(drone.position.x >= 0.0 && drone.position.x <= env.width() as f64 - 1.0);
                assert!(drone.position.y >= 0.0 && drone.position.y <= env.height() as f64 - 1.0);
            }
        });
    }

    #[test]
    fn test_exploration_is_monotonic() {
        let mut sim = Simulation::new(small_config(Strategy::Exploration, 5)).unwrap();
        let mut last = 0;
        sim.run_with(|sim| {
            let explored = sim.environment().explored_cells();
            assert!(explored >= last);
            last = explored;
        });
    }

    #[test]
    fn test_each_anomaly_treated_once() {
        for strategy in Strategy::ALL {
            let mut sim = Simulation::new(small_config(strategy, 21)).unwrap();
            let report = sim.run();
            assert_eq!(report.treated_by_drones(), report.anomalies_treated, "{}", strategy);
            assert!(report.anomalies_treated <= report.anomalies_total);
        }
    }

    #[test]
    fn test_activity_counted_every_turn() {
        let mut sim = Simulation::new(small_config(Strategy::Action, 8)).unwrap();
        let report = sim.run();
        for drone in &report.drones {
            assert_eq!(drone.activity.total(), report.steps);
        }
    }
}

mod outcomes {
    use super::*;

    #[test]
    fn test_same_seed_same_report() {
        for strategy in Strategy::ALL {
            let first = Simulation::new(small_config(strategy, 42)).unwrap().run();
            let second = Simulation::new(small_config(strategy, 42)).unwrap().run();
            assert_eq!(first, second, "{}", strategy);
        }
    }

    #[test]
    fn test_small_map_gets_explored() {
        for strategy in Strategy::ALL {
            let report = Simulation::new(small_config(strategy, 7)).unwrap().run();
            assert!(
                report.exploration_percent > 50.0,
                "{} explored only {:.1}%",
                strategy,
                report.exploration_percent
            );
        }
    }

    #[test]
    fn test_action_treats_anomalies() {
        let report = Simulation::new(small_config(Strategy::Action, 7)).unwrap().run();
        assert!(report.anomalies_treated > 0);
        assert!(report.total_detections > 0);
    }

    #[test]
    fn test_stop_when_complete_ends_early() {
        let mut config = small_config(Strategy::Action, 9);
        config.environment.width = 20;
        config.environment.height = 20;
        config.anomalies.count = 0;
        config.simulation.max_turns = 500;
        config.simulation.stop_when_complete = true;

        let report = Simulation::new(config).unwrap().run();
        assert!(report.complete);
        assert!(report.steps < 500);
    }

    #[test]
    fn test_control_center_hears_from_drones() {
        let report = Simulation::new(small_config(Strategy::Mixed, 13)).unwrap().run();
        assert!(report.transmissions >= 3);
        assert!(report.anomalies_known <= report.anomalies_total);
    }
}
