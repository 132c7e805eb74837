//! Strategy descriptors and the systems that turn indicator state into order
//! intents (spec §2 "Strategy descriptors", §4.3 `StrategyRunner`, §6
//! "Strategy configuration surface").

pub mod error;
pub mod pair;
pub mod pipeline;

pub use error::StrategyError;

use crate::asset_ledger::AssetLedger;
use crate::bars::TimeStamp;
use crate::ledger::Ledger;
use crate::portfolio::order::{Purchase, Sale};
use crate::portfolio::Clock;
use serde::Deserialize;
use std::collections::HashMap;

/// Deserializable strategy configuration (spec §6).
#[derive(Debug, Clone, Deserialize)]
pub struct StrategyConfig {
    pub name: String,
    pub tickers: Vec<String>,
    #[serde(default)]
    pub only_day: bool,
}

impl StrategyConfig {
    pub fn validate(&self) -> Result<(), StrategyError> {
        if self.tickers.is_empty() {
            return Err(StrategyError::ConfigInvalid {
                reason: "tickers must be non-empty".to_string(),
            });
        }
        Ok(())
    }

    /// Identifier of this strategy's combined ledger: its tickers joined
    /// with `_` (spec §6).
    pub fn combined_id(&self) -> String {
        AssetLedger::combined_id(&self.tickers)
    }
}

/// A unit of strategy computation invoked once per tick, given mutable
/// access to the asset ledgers it observes, its combined ledger, and the
/// main ledger to emit `Purchase`/`Sale` intents into (spec §4.3
/// `StrategyRunner`).
pub trait StrategySystem: Send + Sync {
    fn name(&self) -> &'static str;

    fn run(
        &self,
        main: &mut Ledger,
        assets: &mut HashMap<String, AssetLedger>,
        combined: &mut AssetLedger,
    ) -> Result<(), StrategyError>;
}

/// Binds a name, an ordered list of systems, and the asset identifiers it
/// observes (spec §2).
pub struct Strategy {
    pub config: StrategyConfig,
    pub systems: Vec<Box<dyn StrategySystem>>,
}

impl Strategy {
    pub fn new(config: StrategyConfig, systems: Vec<Box<dyn StrategySystem>>) -> Result<Self, StrategyError> {
        config.validate()?;
        Ok(Self { config, systems })
    }

    /// Whether this strategy should run this tick, given whether the clock
    /// is currently within the trading day (spec §4.3 `StrategyRunner`).
    pub fn is_active(&self, within_trading_day: bool) -> bool {
        !self.config.only_day || within_trading_day
    }
}

fn clock_time(main: &Ledger) -> chrono::DateTime<chrono::Utc> {
    main.singleton::<Clock>().map(|c| c.time).unwrap_or_default()
}

/// Attaches a `Purchase` intent onto a fresh entity in the main ledger
/// (spec §3 "Lifecycle").
pub fn emit_purchase(main: &mut Ledger, ticker: &str, quantity: f64) {
    let entity = main.create_entity();
    main.insert_component(entity, TimeStamp(clock_time(main)));
    main.insert_component(
        entity,
        Purchase {
            ticker: ticker.to_string(),
            quantity,
        },
    );
}

/// Attaches a `Sale` intent onto a fresh entity in the main ledger.
pub fn emit_sale(main: &mut Ledger, ticker: &str, quantity: f64) {
    let entity = main.create_entity();
    main.insert_component(entity, TimeStamp(clock_time(main)));
    main.insert_component(
        entity,
        Sale {
            ticker: ticker.to_string(),
            quantity,
        },
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_tickers_is_invalid() {
        let config = StrategyConfig {
            name: "pair".into(),
            tickers: vec![],
            only_day: false,
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn combined_id_joins_tickers() {
        let config = StrategyConfig {
            name: "pair".into(),
            tickers: vec!["A".into(), "B".into()],
            only_day: false,
        };
        assert_eq!(config.combined_id(), "A_B");
    }
}
