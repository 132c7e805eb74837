//! Pair-trading strategy: one strategy type covering both mean-reversion
//! directions via a `reverse` flag (spec §9 Open Question #1 — rejecting
//! two near-duplicate `PairStrategy`/`ReversePairStrategy` types in favor of
//! a single signed-gamma parametrization).

use super::{emit_purchase, emit_sale, StrategySystem};
use crate::asset_ledger::AssetLedger;
use crate::bars::Close;
use crate::indicator::{want_moving_std_dev, want_sma, Indicator, MovingStdDev, SMA};
use crate::ledger::{ComponentMeta, Ledger};
use crate::strategy::StrategyError;
use std::collections::HashMap;

/// Spread series of a pair: `close_a - gamma * close_b`, carried on its own
/// entity in the pair's combined ledger so it can feed an `SMA`/
/// `MovingStdDev` like any other indicator source.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Spread(pub f64);

impl Indicator for Spread {
    fn zero() -> Self {
        Spread(0.0)
    }
    fn add(self, other: Self) -> Self {
        Spread(self.0 + other.0)
    }
    fn scale(self, factor: f64) -> Self {
        Spread(self.0 * factor)
    }
    fn sqrt(self) -> Self {
        Spread(self.0.sqrt())
    }
    fn value(self) -> f64 {
        self.0
    }
}

/// Mean-reverting pair strategy over a `{H}`-bar z-score of the spread
/// between two tickers (spec §2 "Strategy descriptors").
///
/// Assumes both legs are fed in lockstep, one bar per tick, so the same
/// `EntityId` in each asset ledger denotes the same instant — a
/// simplification adequate for the synchronized-bar back-testing this
/// crate targets, not for legs with independent or gapped bar streams.
pub struct PairStrategy<const H: usize> {
    pub ticker_a: String,
    pub ticker_b: String,
    pub gamma: f64,
    pub quantity: f64,
    pub z_threshold: f64,
    /// Flips which leg buys and which sells on a given z-score sign (spec
    /// §9 Open Question #1).
    pub reverse: bool,
}

impl<const H: usize> PairStrategy<H> {
    pub fn new(ticker_a: impl Into<String>, ticker_b: impl Into<String>, gamma: f64, quantity: f64, z_threshold: f64, reverse: bool) -> Self {
        Self {
            ticker_a: ticker_a.into(),
            ticker_b: ticker_b.into(),
            gamma,
            quantity,
            z_threshold,
            reverse,
        }
    }
}

impl<const H: usize> StrategySystem for PairStrategy<H> {
    fn name(&self) -> &'static str {
        "PairStrategy"
    }

    fn run(
        &self,
        main: &mut Ledger,
        assets: &mut HashMap<String, AssetLedger>,
        combined: &mut AssetLedger,
    ) -> Result<(), StrategyError> {
        want_sma::<H, Spread>(combined.ledger_mut());
        want_moving_std_dev::<H, Spread>(combined.ledger_mut());

        let close_meta = [ComponentMeta::of::<Close>("Close", true)];
        let new_entities = {
            let ledger_a = assets
                .get_mut(&self.ticker_a)
                .ok_or_else(|| StrategyError::ConfigInvalid {
                    reason: format!("unknown ticker {}", self.ticker_a),
                })?
                .ledger_mut();
            ledger_a.ensure_requested(self.name(), &close_meta)?;
            ledger_a.new_entities(self.name(), &close_meta)
        };

        for entity in new_entities {
            let close_a = assets
                .get(&self.ticker_a)
                .and_then(|a| a.ledger().column::<Close>())
                .and_then(|c| c.get(entity))
                .copied();
            let close_b = assets
                .get(&self.ticker_b)
                .and_then(|a| a.ledger().column::<Close>())
                .and_then(|c| c.get(entity))
                .copied();
            let timestamp = assets
                .get(&self.ticker_a)
                .and_then(|a| a.ledger().column::<crate::bars::TimeStamp>())
                .and_then(|c| c.get(entity))
                .map(|t| t.0)
                .unwrap_or_default();
            let (Some(close_a), Some(close_b)) = (close_a, close_b) else {
                continue;
            };

            let spread_value = close_a.0 - self.gamma * close_b.0;
            let spread_entity = combined.push_value(timestamp, Spread(spread_value));
            combined.ledger_mut().run_stages()?;

            let sma = combined
                .ledger()
                .column::<SMA<H, Spread>>()
                .and_then(|c| c.get(spread_entity))
                .map(|s| s.value.0);
            let std_dev = combined
                .ledger()
                .column::<MovingStdDev<H, Spread>>()
                .and_then(|c| c.get(spread_entity))
                .map(|s| s.value);

            let (Some(sma), Some(std_dev)) = (sma, std_dev) else {
                continue;
            };
            if std_dev == 0.0 {
                continue;
            }

            let z = (spread_value - sma) / std_dev;
            if z.abs() <= self.z_threshold {
                continue;
            }

            let qty_b = (self.quantity * close_a.0 * self.gamma / close_b.0).round();
            // Spread above its mean (z > 0): buy leg A, sell leg B (spec §8
            // scenario 3). `reverse` inverts both legs.
            let buy_a = (z > 0.0) != self.reverse;
            if buy_a {
                emit_purchase(main, &self.ticker_a, self.quantity);
                emit_sale(main, &self.ticker_b, qty_b);
            } else {
                emit_sale(main, &self.ticker_a, self.quantity);
                emit_purchase(main, &self.ticker_b, qty_b);
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bars::Bar;
    use crate::portfolio::order::{Purchase, Sale};
    use chrono::{DateTime, Utc};

    fn bar_at(seconds: i64, close: f64) -> Bar {
        Bar {
            timestamp: DateTime::<Utc>::UNIX_EPOCH + chrono::Duration::seconds(seconds),
            open: close,
            high: close,
            low: close,
            close,
            volume: 0.0,
        }
    }

    #[test]
    fn spread_tracks_close_difference_with_unit_gamma() {
        let mut a = AssetLedger::new("A");
        let mut b = AssetLedger::new("B");
        for (t, close) in [(0, 10.0), (60, 11.0), (120, 12.0)] {
            a.push_bar(bar_at(t, close));
        }
        for (t, close) in [(0, 5.0), (60, 6.0), (120, 7.0)] {
            b.push_bar(bar_at(t, close));
        }

        let mut assets = HashMap::new();
        assets.insert("A".to_string(), a);
        assets.insert("B".to_string(), b);
        let mut combined = AssetLedger::new("A_B");
        let mut main = Ledger::new("MAIN");

        let strategy = PairStrategy::<2>::new("A", "B", 1.0, 10.0, 100.0, false);
        strategy.run(&mut main, &mut assets, &mut combined).unwrap();

        let spreads: Vec<f64> = combined.ledger().column::<Spread>().unwrap().iter().map(|(_, s)| s.0).collect();
        assert_eq!(spreads, vec![5.0, 5.0, 5.0]);
    }

    #[test]
    fn positive_zscore_crossing_emits_purchase_a_and_sale_b() {
        // Mirrors spec §8 scenario 3's shape (a spread well above its
        // rolling mean crosses the threshold) without reproducing its exact
        // SMA=10/σ=2/z=2.5 figures: the window here also folds the crossing
        // bar itself into the SMA/σ it's compared against (spec §4.2
        // "otherwise unqualified" windowing), so an input engineered to
        // match those figures pre-crossing would no longer match them once
        // the window recomputes with the new bar included. What's asserted
        // instead is the scenario's direction: spread above its mean beyond
        // the threshold buys the A leg and sells the B leg.
        let mut a = AssetLedger::new("A");
        let mut b = AssetLedger::new("B");
        // Spread history: 10,10,10,10 then a jump to 25 with a tiny
        // nonzero variance baked into the warm-up window.
        for (t, close) in [(0, 10.0), (60, 10.0), (120, 10.1), (180, 25.0)] {
            a.push_bar(bar_at(t, close));
        }
        for (t, close) in [(0, 0.0), (60, 0.0), (120, 0.0), (180, 0.0)] {
            b.push_bar(bar_at(t, close));
        }

        let mut assets = HashMap::new();
        assets.insert("A".to_string(), a);
        assets.insert("B".to_string(), b);
        let mut combined = AssetLedger::new("A_B");
        let mut main = Ledger::new("MAIN");
        let clock_entity = main.create_entity();
        main.insert_singleton(clock_entity, crate::portfolio::Clock::default()).unwrap();

        let strategy = PairStrategy::<3>::new("A", "B", 1.0, 10.0, 1.0, false);
        strategy.run(&mut main, &mut assets, &mut combined).unwrap();

        let purchases = main.column::<Purchase>().map(|c| c.len()).unwrap_or(0);
        let sales = main.column::<Sale>().map(|c| c.len()).unwrap_or(0);
        assert_eq!(purchases, 1, "rising spread past threshold should buy the A leg");
        assert_eq!(sales, 1, "rising spread past threshold should sell the B leg");

        let bought_a = main.column::<Purchase>().unwrap().iter().any(|(_, p)| p.ticker == "A");
        let sold_b = main.column::<Sale>().unwrap().iter().any(|(_, s)| s.ticker == "B");
        assert!(bought_a && sold_b);
    }

    #[test]
    fn reverse_flag_inverts_the_crossing_direction() {
        let mut a = AssetLedger::new("A");
        let mut b = AssetLedger::new("B");
        for (t, close) in [(0, 10.0), (60, 10.0), (120, 10.1), (180, 25.0)] {
            a.push_bar(bar_at(t, close));
        }
        for (t, close) in [(0, 0.0), (60, 0.0), (120, 0.0), (180, 0.0)] {
            b.push_bar(bar_at(t, close));
        }

        let mut assets = HashMap::new();
        assets.insert("A".to_string(), a);
        assets.insert("B".to_string(), b);
        let mut combined = AssetLedger::new("A_B");
        let mut main = Ledger::new("MAIN");
        let clock_entity = main.create_entity();
        main.insert_singleton(clock_entity, crate::portfolio::Clock::default()).unwrap();

        let strategy = PairStrategy::<3>::new("A", "B", 1.0, 10.0, 1.0, true);
        strategy.run(&mut main, &mut assets, &mut combined).unwrap();

        let sold_a = main.column::<Sale>().unwrap().iter().any(|(_, s)| s.ticker == "A");
        let bought_b = main.column::<Purchase>().unwrap().iter().any(|(_, p)| p.ticker == "B");
        assert!(sold_a && bought_b);
    }
}
