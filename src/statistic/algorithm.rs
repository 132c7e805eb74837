/// Welford's online algorithm for computing running mean and variance in a
/// single pass, without retaining the full dataset (used by [`super::dispersion::Dispersion`]
/// to track return dispersion across a [`crate::portfolio::PortfolioSnapshot`] series).
pub struct WelfordOnline;

impl WelfordOnline {
    /// Calculates the next mean given the previous mean, the new value, and the
    /// dataset count including the new value.
    pub fn calculate_mean(prev_mean: f64, new_value: f64, value_count: usize) -> f64 {
        prev_mean + (new_value - prev_mean) / value_count as f64
    }

    /// Calculates the next recurrence relation `M` given the previous `M`, the
    /// mean before and after the new value was added, and the new value.
    pub fn calculate_recurrence_relation_m(prev_m: f64, prev_mean: f64, new_value: f64, new_mean: f64) -> f64 {
        prev_m + (new_value - prev_mean) * (new_value - new_mean)
    }

    /// Calculates population variance from the recurrence relation `M` and the
    /// dataset count.
    pub fn calculate_population_variance(recurrence_relation_m: f64, value_count: usize) -> f64 {
        if value_count == 0 {
            0.0
        } else {
            recurrence_relation_m / value_count as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_converges_to_simple_average() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0];
        let mut mean = 0.0;
        for (i, &v) in values.iter().enumerate() {
            mean = WelfordOnline::calculate_mean(mean, v, i + 1);
        }
        assert!((mean - 3.0).abs() < 1e-10);
    }
}
