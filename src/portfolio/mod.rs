//! Portfolio bookkeeping components (spec §3 "Bookkeeping", §4.3 pipeline).

pub mod order;

use crate::ledger::{Ledger, Singleton};
use chrono::{DateTime, Duration, Utc};

/// Virtual (historical) or wall (live) clock, singleton in the main ledger
/// (spec §3 invariants).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Clock {
    pub time: DateTime<Utc>,
    pub dtime: Duration,
}

impl Default for Clock {
    fn default() -> Self {
        Self {
            time: DateTime::<Utc>::UNIX_EPOCH,
            dtime: Duration::zero(),
        }
    }
}

impl Singleton for Clock {}

/// The account's true cash balance, singleton in the main ledger. Adjusted
/// only by `Filler` (spec §4.3).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Cash {
    pub cash: f64,
}

impl Singleton for Cash {}

/// A start-of-tick snapshot of `Cash` that strategies size orders against
/// (spec §4.3 "PurchasePower snapshot", §9 Open Questions).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PurchasePower {
    pub cash: f64,
}

impl Singleton for PurchasePower {}

/// Running position in one ticker. Exactly one entity per ticker any
/// strategy observes (spec §3 invariants).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Position {
    pub ticker: String,
    pub quantity: f64,
}

/// Mark-to-market portfolio value, emitted once per tick by `SnapShotter`
/// (spec §4.3).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PortfolioSnapshot {
    pub time: DateTime<Utc>,
    pub value: f64,
}

impl Default for PortfolioSnapshot {
    fn default() -> Self {
        Self {
            time: DateTime::<Utc>::UNIX_EPOCH,
            value: 0.0,
        }
    }
}

/// Quantity held in `ticker`, or `0.0` if no `Position` entity exists for it
/// — the numeric behaviour is canonical, never `Option::None` (spec §9 Open
/// Questions).
pub fn current_position(ledger: &Ledger, ticker: &str) -> f64 {
    ledger
        .column::<Position>()
        .and_then(|c| c.iter().find(|(_, p)| p.ticker == ticker))
        .map(|(_, p)| p.quantity)
        .unwrap_or(0.0)
}

/// Finds (or lazily creates) the `Position` entity for `ticker` and adjusts
/// its quantity by `delta` (spec §4.3 `Filler`).
pub fn adjust_position(ledger: &mut Ledger, ticker: &str, delta: f64) {
    let existing = ledger
        .column::<Position>()
        .and_then(|c| c.iter().find(|(_, p)| p.ticker == ticker).map(|(e, _)| e));

    match existing {
        Some(entity) => {
            if let Some(position) = ledger.column_mut::<Position>().get_mut(entity) {
                position.quantity += delta;
            }
        }
        None => {
            let entity = ledger.create_entity();
            ledger.insert_component(
                entity,
                Position {
                    ticker: ticker.to_string(),
                    quantity: delta,
                },
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn current_position_defaults_to_zero() {
        let ledger = Ledger::new("MAIN");
        assert_eq!(current_position(&ledger, "AAPL"), 0.0);
    }

    #[test]
    fn adjust_position_creates_then_accumulates() {
        let mut ledger = Ledger::new("MAIN");
        adjust_position(&mut ledger, "AAPL", 10.0);
        adjust_position(&mut ledger, "AAPL", -3.0);
        assert_eq!(current_position(&ledger, "AAPL"), 7.0);
    }
}
