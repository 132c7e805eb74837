//! Per-ticker (or per-ticker-combination) entity stores (spec GLOSSARY
//! "Asset ledger" / "Combined ledger").

use crate::bars::{Bar, Close, High, Low, Open, TimeStamp, Volume};
use crate::entity::EntityId;
use crate::ledger::{Component, Ledger};
use chrono::{DateTime, Utc};

/// A [`Ledger`] scoped to one ticker (or, for a combined ledger, the join of
/// several), holding only `TimeStamp` plus bar and derived-indicator
/// components — never orders (spec §3 invariants).
pub struct AssetLedger {
    ledger: Ledger,
}

impl AssetLedger {
    pub fn new(ticker: impl Into<String>) -> Self {
        Self {
            ledger: Ledger::new(ticker),
        }
    }

    /// Builds the identifier a strategy's combined ledger is given: its
    /// tickers joined with `_` (spec §6 "Strategy configuration surface").
    pub fn combined_id(tickers: &[String]) -> String {
        tickers.join("_")
    }

    pub fn ticker(&self) -> &str {
        self.ledger.id()
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn ledger_mut(&mut self) -> &mut Ledger {
        &mut self.ledger
    }

    /// Appends one bar as a new entity: a fresh `TimeStamp` plus `Open`,
    /// `High`, `Low`, `Close`, `Volume` components on the same entity (spec
    /// §3 "Lifecycle").
    pub fn push_bar(&mut self, bar: Bar) -> EntityId {
        let entity = self.ledger.create_entity();
        self.ledger.insert_component(entity, TimeStamp(bar.timestamp));
        self.ledger.insert_component(entity, Open(bar.open));
        self.ledger.insert_component(entity, High(bar.high));
        self.ledger.insert_component(entity, Low(bar.low));
        self.ledger.insert_component(entity, Close(bar.close));
        self.ledger.insert_component(entity, Volume(bar.volume));
        entity
    }

    /// Appends a single derived value (e.g. a `Spread`) as a fresh entity
    /// carrying `timestamp`, for ledgers fed by a strategy rather than raw
    /// bars (spec GLOSSARY "Combined ledger").
    pub fn push_value<T: Component + Default>(&mut self, timestamp: DateTime<Utc>, value: T) -> EntityId {
        let entity = self.ledger.create_entity();
        self.ledger.insert_component(entity, TimeStamp(timestamp));
        self.ledger.insert_component(entity, value);
        entity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
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
    fn combined_id_joins_tickers_with_underscore() {
        let id = AssetLedger::combined_id(&["A".to_string(), "B".to_string()]);
        assert_eq!(id, "A_B");
    }

    #[test]
    fn push_bar_carries_timestamp_and_close() {
        let mut asset = AssetLedger::new("AAPL");
        let e = asset.push_bar(bar_at(0, 10.0));
        assert!(asset.ledger().has_component::<TimeStamp>(e));
        assert_eq!(asset.ledger().column::<Close>().unwrap().get(e).unwrap().0, 10.0);
    }
}
