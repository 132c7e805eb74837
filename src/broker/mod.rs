//! Broker abstraction consumed identically by live and historical trading
//! (spec §4.4).

pub mod error;
pub mod historical;

pub use error::BrokerError;
pub use historical::HistoricalBroker;

use crate::bars::Bar;
use crate::portfolio::order::{Order, OrderResponse, SubmitOrderRequest};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// One historical trade print, returned by [`Broker::trades`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Trade {
    pub time: DateTime<Utc>,
    pub price: f64,
    pub quantity: f64,
}

/// The subset of a venue's API the core consumes (spec §4.4 "Broker
/// interface consumed by the core"). A single implementation is used
/// identically in live and replay modes; [`HistoricalBroker`] is the replay
/// driver.
#[async_trait]
pub trait Broker: Send + Sync {
    fn current_time(&self) -> DateTime<Utc>;

    fn current_price(&self, ticker: &str) -> Result<f64, BrokerError>;

    /// Resolves a fill (or failure) for `request`, returning the
    /// lifecycle [`Order`] component `Purchaser`/`Seller` attaches (spec
    /// §4.3).
    async fn submit_order(&mut self, request: SubmitOrderRequest) -> Order;

    /// Polls the order-update stream (spec §6); the only broker call
    /// permitted to suspend (spec §5 "Suspension points").
    async fn receive_order(&mut self) -> Option<OrderResponse>;

    fn delete_all_orders(&mut self);

    fn trades(&self, ticker: &str, start: DateTime<Utc>, stop: DateTime<Utc>) -> Vec<Trade>;

    fn bars(&self, ticker: &str, start: DateTime<Utc>, stop: DateTime<Utc>) -> Vec<Bar>;
}

/// `{variable_transaction_fee, fee_per_share, fixed_transaction_fee}` (spec
/// §4.4), always capped at `0.005·|qty|·price` regardless of broker.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FeeModel {
    pub variable_transaction_fee: f64,
    pub fee_per_share: f64,
    pub fixed_transaction_fee: f64,
}

impl FeeModel {
    /// The invariant fee cap every broker must honour (spec §4.4).
    pub const CAP_FRACTION: f64 = 0.005;

    pub fn fee(&self, qty: f64, price: f64) -> f64 {
        let naive = qty.abs() * (price * self.variable_transaction_fee + self.fee_per_share) + self.fixed_transaction_fee;
        let cap = Self::CAP_FRACTION * qty.abs() * price;
        naive.min(cap)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fee_is_capped_at_half_percent_of_notional() {
        let fees = FeeModel {
            variable_transaction_fee: 0.0,
            fee_per_share: 1.0,
            fixed_transaction_fee: 0.0,
        };
        // naive = 100 shares * $1/share = 100; cap = 0.005 * 100 * 10 = 5
        assert_eq!(fees.fee(100.0, 10.0), 5.0);
    }

    #[test]
    fn fee_below_cap_is_unaffected() {
        let fees = FeeModel {
            variable_transaction_fee: 0.001,
            fee_per_share: 0.0,
            fixed_transaction_fee: 0.0,
        };
        // naive = 10 * (100 * 0.001) = 1.0; cap = 0.005*10*100 = 5.0
        assert_eq!(fees.fee(10.0, 100.0), 1.0);
    }
}
