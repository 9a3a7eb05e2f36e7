use log::debug;

use crate::basic_types::moving_averages::ExponentialMovingAverage;
use crate::basic_types::moving_averages::MovingAverage;
#[cfg(doc)]
use crate::engine::SatisfactionSolver;
use crate::engine::SolverOptions;

/// Decides when the search should abandon its current path and restart.
///
/// The strategy keeps a fast and a slow exponential moving average of the glue of learned
/// clauses. A restart is forced when the fast average rises above the slow one by a configured
/// margin: recent learned clauses are worse than the long-run baseline, which signals a
/// degrading part of the search space. A forced restart may still be delayed when the current
/// decision level is low compared to the moving average of backjump levels, since the search is
/// then already operating close to where a restart would put it.
pub(crate) struct RestartStrategy {
    enabled: bool,
    /// The minimum number of conflicts between two considered restarts.
    base_interval: u64,
    /// The fast average has to exceed the slow one by this fraction before a restart is forced.
    margin: f64,
    delay_enabled: bool,
    /// Fraction of the jump average below which a forced restart is suppressed.
    delay_fraction: f64,
    glue_fast_moving_average: ExponentialMovingAverage,
    glue_slow_moving_average: ExponentialMovingAverage,
    jump_moving_average: ExponentialMovingAverage,
    /// The conflict count that has to be exceeded before the next restart is considered.
    num_conflicts_until_restart: u64,
    num_delayed_restarts: u64,
}

impl RestartStrategy {
    pub(crate) fn new(options: &SolverOptions) -> RestartStrategy {
        RestartStrategy {
            enabled: options.restart_enabled,
            base_interval: options.restart_base_interval,
            margin: options.restart_margin,
            delay_enabled: options.restart_delay_enabled,
            delay_fraction: options.restart_delay_fraction,
            glue_fast_moving_average: ExponentialMovingAverage::new(options.glue_fast_alpha),
            glue_slow_moving_average: ExponentialMovingAverage::new(options.glue_slow_alpha),
            jump_moving_average: ExponentialMovingAverage::new(options.jump_alpha),
            num_conflicts_until_restart: options.restart_base_interval,
            num_delayed_restarts: 0,
        }
    }

    /// Notifies the strategy of the glue of the clause learned from a conflict and the level the
    /// search jumped back to.
    pub(crate) fn notify_conflict(&mut self, glue: u32, backjump_level: usize) {
        self.glue_fast_moving_average.add_term(glue as u64);
        self.glue_slow_moving_average.add_term(glue as u64);
        self.jump_moving_average.add_term(backjump_level as u64);
    }

    /// Determines whether a restart should take place; a restart is only considered once enough
    /// conflicts have accumulated since the last consideration, and is forced when the recent
    /// glue average exceeds the long-run one by the configured margin, unless the delay rule
    /// suppresses it.
    pub(crate) fn should_restart(
        &mut self,
        num_conflicts: u64,
        current_decision_level: usize,
    ) -> bool {
        if !self.enabled {
            return false;
        }
        if num_conflicts <= self.num_conflicts_until_restart {
            return false;
        }

        let slow = self.glue_slow_moving_average.value();
        let fast = self.glue_fast_moving_average.value();
        let limit = (1.0 + self.margin) * slow;
        if limit > fast {
            //recent learned clauses are not worse than the baseline, no reason to restart
            self.num_conflicts_until_restart = num_conflicts + self.base_interval;
            return false;
        }

        if self.delay_enabled
            && (current_decision_level as f64) < self.delay_fraction * self.jump_moving_average.value()
        {
            debug!(
                "restart delayed at level {} with jump average {:.2}",
                current_decision_level,
                self.jump_moving_average.value()
            );
            self.num_conflicts_until_restart = num_conflicts + self.base_interval;
            self.num_delayed_restarts += 1;
            return false;
        }

        true
    }

    /// Notifies the strategy that a restart has taken place so that it can adjust its internal
    /// values.
    pub(crate) fn notify_restart(&mut self, num_conflicts: u64) {
        self.num_conflicts_until_restart = num_conflicts + self.base_interval;
    }

    pub(crate) fn num_delayed_restarts(&self) -> u64 {
        self.num_delayed_restarts
    }

    /// The moving average of backjump levels, reported in the periodic progress lines of the
    /// [`SatisfactionSolver`].
    pub(crate) fn jump_average(&self) -> f64 {
        self.jump_moving_average.value()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strategy_with_options(configure: impl FnOnce(&mut SolverOptions)) -> RestartStrategy {
        let mut options = SolverOptions::default();
        configure(&mut options);
        RestartStrategy::new(&options)
    }

    #[test]
    fn no_restart_before_the_conflict_interval_has_passed() {
        let mut strategy = strategy_with_options(|options| {
            options.restart_base_interval = 10;
        });

        for _ in 0..5 {
            strategy.notify_conflict(10, 1);
        }
        assert!(!strategy.should_restart(10, 5));
    }

    #[test]
    fn rising_glue_forces_a_restart() {
        let mut strategy = strategy_with_options(|options| {
            options.restart_base_interval = 1;
            options.restart_delay_enabled = false;
        });

        //a long run of good clauses followed by a burst of bad ones
        for _ in 0..100 {
            strategy.notify_conflict(2, 1);
        }
        for _ in 0..50 {
            strategy.notify_conflict(40, 1);
        }
        assert!(strategy.should_restart(150, 10));
    }

    #[test]
    fn stable_glue_does_not_force_a_restart() {
        let mut strategy = strategy_with_options(|options| {
            options.restart_base_interval = 1;
        });

        for _ in 0..100 {
            strategy.notify_conflict(3, 1);
        }
        assert!(!strategy.should_restart(100, 10));
    }

    #[test]
    fn a_declined_restart_moves_the_next_consideration_forward() {
        let mut strategy = strategy_with_options(|options| {
            options.restart_base_interval = 7;
        });

        for _ in 0..20 {
            strategy.notify_conflict(3, 1);
        }
        assert!(!strategy.should_restart(20, 10));
        //the next consideration happens only after another interval of conflicts
        assert!(!strategy.should_restart(25, 10));
    }

    #[test]
    fn shallow_searches_delay_forced_restarts() {
        let mut strategy = strategy_with_options(|options| {
            options.restart_base_interval = 1;
            options.restart_delay_fraction = 0.5;
        });

        //bad glue with deep backjumps drives the jump average up
        for _ in 0..100 {
            strategy.notify_conflict(2, 100);
        }
        for _ in 0..50 {
            strategy.notify_conflict(40, 100);
        }

        //at a shallow decision level the forced restart is suppressed
        assert!(!strategy.should_restart(150, 1));
        assert_eq!(1, strategy.num_delayed_restarts());

        //deep in the search it goes through
        assert!(strategy.should_restart(160, 100));
    }
}
