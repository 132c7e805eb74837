use super::algorithm::WelfordOnline;
use super::dispersion::Dispersion;
use prettytable::{row, Table};

/// Accumulates tick-to-tick portfolio return statistics over a run and
/// prints them as a table at the end, the way a completed back-test reports
/// its performance.
#[derive(Debug, Clone, PartialEq)]
pub struct TradingSummary {
    starting_cash: f64,
    last_value: Option<f64>,
    tick_count: usize,
    mean_return: f64,
    return_dispersion: Dispersion,
    final_value: f64,
}

impl TradingSummary {
    pub fn new(starting_cash: f64) -> Self {
        Self {
            starting_cash,
            last_value: None,
            tick_count: 0,
            mean_return: 0.0,
            return_dispersion: Dispersion::default(),
            final_value: starting_cash,
        }
    }

    /// Feeds the latest `PortfolioSnapshot.value` (spec §4.3 `SnapShotter`)
    /// into the running return statistics.
    pub fn update(&mut self, portfolio_value: f64) {
        self.final_value = portfolio_value;
        if let Some(previous) = self.last_value {
            if previous != 0.0 {
                let tick_return = (portfolio_value - previous) / previous;
                self.tick_count += 1;
                let prev_mean = self.mean_return;
                self.mean_return = WelfordOnline::calculate_mean(prev_mean, tick_return, self.tick_count);
                self.return_dispersion.update(prev_mean, self.mean_return, tick_return, self.tick_count);
            }
        }
        self.last_value = Some(portfolio_value);
    }

    pub fn total_return(&self) -> f64 {
        if self.starting_cash == 0.0 {
            0.0
        } else {
            (self.final_value - self.starting_cash) / self.starting_cash
        }
    }

    pub fn mean_tick_return(&self) -> f64 {
        self.mean_return
    }

    pub fn return_std_dev(&self) -> f64 {
        self.return_dispersion.std_dev
    }

    /// Spread between the single best and worst tick return seen this run.
    pub fn return_range(&self) -> f64 {
        self.return_dispersion.range.calculate()
    }

    pub fn print(&self) {
        let mut table = Table::new();
        table.add_row(row!["Metric", "Value"]);
        table.add_row(row!["Starting Cash", format!("{:.2}", self.starting_cash)]);
        table.add_row(row!["Final Value", format!("{:.2}", self.final_value)]);
        table.add_row(row!["Total Return", format!("{:.4}", self.total_return())]);
        table.add_row(row!["Mean Tick Return", format!("{:.6}", self.mean_tick_return())]);
        table.add_row(row!["Tick Return Std Dev", format!("{:.6}", self.return_std_dev())]);
        table.add_row(row!["Tick Return Range", format!("{:.6}", self.return_range())]);
        table.printstd();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_return_reflects_starting_and_final_value() {
        let mut summary = TradingSummary::new(1000.0);
        summary.update(1000.0);
        summary.update(1100.0);
        summary.update(1210.0);

        assert!((summary.total_return() - 0.21).abs() < 1e-9);
        assert!(summary.mean_tick_return() > 0.0);
    }

    #[test]
    fn no_ticks_yields_zero_return() {
        let summary = TradingSummary::new(500.0);
        assert_eq!(summary.total_return(), 0.0);
    }

    #[test]
    fn return_range_spans_the_best_and_worst_tick() {
        let mut summary = TradingSummary::new(1000.0);
        summary.update(1000.0);
        summary.update(1100.0); // +0.10
        summary.update(990.0); // -0.10
        summary.update(1188.0); // +0.20

        assert!((summary.return_range() - 0.30).abs() < 1e-9);
    }
}
