// This is an implementation of the exponential moving average with the smooth warm-up described
// in the paper "Evaluating CDCL Restart Schemes" by Biere and Fröhlich. The idea is to eliminate
// the strong bias of the first terms: a plain exponential moving average with a small alpha needs
// thousands of observations before its value means anything.
//
// Instead of applying the configured `alpha` from the start, updates use an upper approximation
// `beta` which starts at 1 (so the first observation is taken as-is) and is halved on a
// geometrically growing schedule until it reaches `alpha`. The sequence of betas is
//
//   1,
//   1/2, 1/2,
//   1/4, 1/4, 1/4, 1/4,
//   1/8, 1/8, 1/8, 1/8, 1/8, 1/8, 1/8, 1/8,
//   ...
//
// The `wait`/`period` counters implement exactly this schedule; changing the trigger point by a
// single update changes the entire search trajectory, so the update must not be "simplified".

use super::MovingAverage;
use crate::gourd_assert_simple;

#[derive(Debug, Copy, Clone)]
pub(crate) struct ExponentialMovingAverage {
    value: f64,
    /// The configured contribution of new terms once the warm-up has finished.
    alpha: f64,
    /// The current upper approximation of `alpha` used for updates.
    beta: f64,
    /// Number of updates until `beta` is halved again.
    wait: u64,
    /// Length of the current waiting phase.
    period: u64,
}

impl ExponentialMovingAverage {
    pub(crate) fn new(alpha: f64) -> Self {
        gourd_assert_simple!((0.0..=1.0).contains(&alpha));
        ExponentialMovingAverage {
            value: 0.0,
            alpha,
            beta: 1.0,
            wait: 0,
            period: 0,
        }
    }
}

impl MovingAverage for ExponentialMovingAverage {
    fn add_term(&mut self, new_term: u64) {
        self.value += self.beta * (new_term as f64 - self.value);

        if self.beta <= self.alpha {
            return;
        }
        // The waiting phase is still running; the halving triggers on the update _after_ the
        // count-down hits zero.
        if self.wait > 0 {
            self.wait -= 1;
            return;
        }
        self.period = 2 * (self.period + 1) - 1;
        self.wait = self.period;
        self.beta *= 0.5;
        if self.beta < self.alpha {
            self.beta = self.alpha;
        }
    }

    fn value(&self) -> f64 {
        self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_term_is_taken_as_is() {
        let mut ema = ExponentialMovingAverage::new(1e-5);
        ema.add_term(7);
        assert_eq!(7.0, ema.value());
    }

    #[test]
    fn warm_up_halves_beta_on_a_geometrically_growing_schedule() {
        let mut ema = ExponentialMovingAverage::new(1e-5);

        // One update with beta 1, two with 1/2, four with 1/4, eight with 1/8.
        let expected_betas = [
            (1, 1.0),
            (2, 0.5),
            (4, 0.25),
            (8, 0.125),
            (16, 0.0625),
        ];
        for (count, beta) in expected_betas {
            for _ in 0..count {
                assert_eq!(beta, ema.beta);
                ema.add_term(1);
            }
        }
        assert_eq!(0.03125, ema.beta);
    }

    #[test]
    fn beta_is_clamped_to_alpha() {
        let mut ema = ExponentialMovingAverage::new(0.4);
        ema.add_term(1);
        // Halving 1 yields 0.5 which is still above alpha.
        assert_eq!(0.5, ema.beta);
        ema.add_term(1);
        ema.add_term(1);
        // The next halving would yield 0.25 which is clamped up to alpha.
        assert_eq!(0.4, ema.beta);
    }

    #[test]
    fn value_stays_within_observed_bounds() {
        let mut ema = ExponentialMovingAverage::new(3e-2);
        let observations = [4, 9, 2, 2, 7, 11, 3, 5, 6, 1];
        for term in observations {
            ema.add_term(term);
            assert!(ema.value() >= 1.0);
            assert!(ema.value() <= 11.0);
        }
    }

    #[test]
    fn constant_input_keeps_the_average_constant() {
        let mut ema = ExponentialMovingAverage::new(1e-6);
        for _ in 0..100 {
            ema.add_term(5);
            assert_eq!(5.0, ema.value());
        }
    }
}
