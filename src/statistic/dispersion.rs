use crate::statistic::algorithm::WelfordOnline;

/// Running dispersion (range, variance, standard deviation) of a run's
/// tick-to-tick portfolio returns, updated one value at a time via
/// Welford's algorithm so [`crate::statistic::TradingSummary`] never needs
/// to retain the full `PortfolioSnapshot` history (spec §4.3 `SnapShotter`).
#[derive(Debug, Clone, PartialOrd, PartialEq)]
pub struct Dispersion {
    pub range: Range,
    pub recurrence_relation_m: f64,
    pub variance: f64,
    pub std_dev: f64,
}

impl Default for Dispersion {
    fn default() -> Self {
        Self {
            range: Range::default(),
            recurrence_relation_m: 0.0,
            variance: 0.0,
            std_dev: 0.0,
        }
    }
}

impl Dispersion {
    /// Iteratively updates the measures of dispersion given the previous mean, new mean, new
    /// tick return, and the return count.
    pub fn update(&mut self, prev_mean: f64, new_mean: f64, new_value: f64, value_count: usize) {
        self.range.update(new_value);

        self.recurrence_relation_m = WelfordOnline::calculate_recurrence_relation_m(self.recurrence_relation_m, prev_mean, new_value, new_mean);

        self.variance = WelfordOnline::calculate_population_variance(self.recurrence_relation_m, value_count);

        self.std_dev = self.variance.sqrt();
    }
}

/// Highest and lowest tick return seen so far this run. Lazy evaluation is
/// used when calculating the spread between them via `calculate()`, read by
/// [`crate::statistic::TradingSummary::return_range`] for the end-of-run
/// table.
#[derive(Debug, Clone, PartialOrd, PartialEq)]
pub struct Range {
    pub activated: bool,
    pub highest: f64,
    pub lowest: f64,
}

impl Default for Range {
    fn default() -> Self {
        Self {
            activated: false,
            highest: 0.0,
            lowest: 0.0,
        }
    }
}

impl Range {
    /// Iteratively updates the range given the next tick return.
    fn update(&mut self, new_value: f64) {
        match self.activated {
            true => {
                if new_value > self.highest {
                    self.highest = new_value;
                }

                if new_value < self.lowest {
                    self.lowest = new_value;
                }
            }
            false => {
                self.activated = true;
                self.highest = new_value;
                self.lowest = new_value;
            }
        }
    }

    /// Calculates the spread between the highest and lowest tick return.
    pub fn calculate(&self) -> f64 {
        self.highest - self.lowest
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct UpdateInput {
        prev_mean: f64,
        new_mean: f64,
        new_value: f64,
        value_count: usize,
    }

    #[test]
    fn dispersion_tracks_a_drawdown_then_recovery_in_tick_returns() {
        let mut dispersion = Dispersion::default();

        // Tick returns for a run that gains, gains, gains, then gives most
        // of it back: [0.02, 0.01, 0.03, -0.04].
        // Means: [0.02, 0.015, 0.02, 0.005]
        let inputs = vec![
            UpdateInput { prev_mean: 0.0, new_mean: 0.02, new_value: 0.02, value_count: 1 },
            UpdateInput { prev_mean: 0.02, new_mean: 0.015, new_value: 0.01, value_count: 2 },
            UpdateInput { prev_mean: 0.015, new_mean: 0.02, new_value: 0.03, value_count: 3 },
            UpdateInput { prev_mean: 0.02, new_mean: 0.005, new_value: -0.04, value_count: 4 },
        ];

        for input in inputs {
            dispersion.update(input.prev_mean, input.new_mean, input.new_value, input.value_count);
        }

        assert!(dispersion.range.activated);
        assert_eq!(dispersion.range.highest, 0.03);
        assert_eq!(dispersion.range.lowest, -0.04);
        assert!((dispersion.range.calculate() - 0.07).abs() < 1e-10);
        assert!(dispersion.variance > 0.0);
        assert!((dispersion.std_dev - dispersion.variance.sqrt()).abs() < 1e-10);
    }

    #[test]
    fn range_widens_to_the_single_worst_and_best_tick_return() {
        let tick_returns = [0.001, 0.01, 0.012, 0.013, 0.014, 0.015, -0.2, 0.45];
        let mut range = Range::default();

        for &value in &tick_returns {
            range.update(value);
        }

        assert_eq!(range, Range { activated: true, highest: 0.45, lowest: -0.2 });
        assert!((range.calculate() - 0.65).abs() < 1e-10);
    }
}
