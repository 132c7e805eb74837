//! Deterministic replay driver: advances a virtual clock, serves bars from a
//! cache, and fills orders with a deterministic fee model (spec §4.4
//! "Historical broker").

use super::{Broker, BrokerError, FeeModel, Trade};
use crate::bars::Bar;
use crate::portfolio::order::{Order, OrderResponse, Side, SubmitOrderRequest};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use tracing::{debug, warn};
use uuid::Uuid;

/// Historical broker: carries a virtual clock, a bar cache keyed by ticker,
/// and a [`FeeModel`] (spec §4.4).
pub struct HistoricalBroker {
    time: DateTime<Utc>,
    dtime: Duration,
    fee_model: FeeModel,
    cache: HashMap<String, Vec<Bar>>,
}

impl HistoricalBroker {
    pub fn new(start: DateTime<Utc>, dtime: Duration, fee_model: FeeModel) -> Self {
        Self {
            time: start,
            dtime,
            fee_model,
            cache: HashMap::new(),
        }
    }

    pub fn load_bars(&mut self, ticker: impl Into<String>, bars: Vec<Bar>) {
        self.cache.insert(ticker.into(), bars);
    }

    pub fn advance(&mut self) {
        self.time += self.dtime;
    }

    /// The bar at or immediately after `at`, if one exists in the cache
    /// (spec §4.4 "resolves a fill at the next price slot").
    fn bar_at_or_after(&self, ticker: &str, at: DateTime<Utc>) -> Option<&Bar> {
        self.cache.get(ticker)?.iter().find(|bar| bar.timestamp >= at)
    }

    fn bar_at_or_before(&self, ticker: &str, at: DateTime<Utc>) -> Option<&Bar> {
        self.cache.get(ticker)?.iter().rev().find(|bar| bar.timestamp <= at)
    }
}

#[async_trait]
impl Broker for HistoricalBroker {
    fn current_time(&self) -> DateTime<Utc> {
        self.time
    }

    fn current_price(&self, ticker: &str) -> Result<f64, BrokerError> {
        self.bar_at_or_before(ticker, self.time)
            .map(|bar| bar.close)
            .ok_or_else(|| BrokerError::PriceUnavailable { ticker: ticker.to_string() })
    }

    async fn submit_order(&mut self, request: SubmitOrderRequest) -> Order {
        let next_slot = self.time + self.dtime;
        let side = request.side;
        let symbol = request.symbol.clone();

        let Some(bar) = self.bar_at_or_after(&symbol, next_slot) else {
            warn!(symbol = %symbol, "historical fill failed: no price at next slot");
            return Order::failed(symbol, side, request.qty, "no price available for requested fill time");
        };

        let price = bar.close;
        let fee = self.fee_model.fee(request.qty, price);
        debug!(symbol = %symbol, qty = request.qty, price, fee, "historical fill resolved");

        Order {
            trace_id: Uuid::new_v4(),
            symbol,
            side,
            requested_quantity: request.qty,
            status: Order::STATUS_FILLED.to_string(),
            filled_qty: request.qty,
            filled_avg_price: price,
            fee,
        }
    }

    async fn receive_order(&mut self) -> Option<OrderResponse> {
        None
    }

    fn delete_all_orders(&mut self) {}

    fn trades(&self, ticker: &str, start: DateTime<Utc>, stop: DateTime<Utc>) -> Vec<Trade> {
        self.cache
            .get(ticker)
            .map(|bars| {
                bars.iter()
                    .filter(|b| b.timestamp >= start && b.timestamp <= stop)
                    .map(|b| Trade {
                        time: b.timestamp,
                        price: b.close,
                        quantity: b.volume,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    fn bars(&self, ticker: &str, start: DateTime<Utc>, stop: DateTime<Utc>) -> Vec<Bar> {
        self.cache
            .get(ticker)
            .map(|bars| bars.iter().filter(|b| b.timestamp >= start && b.timestamp <= stop).copied().collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(seconds: i64, close: f64) -> Bar {
        Bar {
            timestamp: DateTime::<Utc>::UNIX_EPOCH + Duration::seconds(seconds),
            open: close,
            high: close,
            low: close,
            close,
            volume: 100.0,
        }
    }

    #[tokio::test]
    async fn fee_is_capped_on_historical_fill() {
        let mut broker = HistoricalBroker::new(
            DateTime::<Utc>::UNIX_EPOCH,
            Duration::seconds(60),
            FeeModel {
                variable_transaction_fee: 0.0,
                fee_per_share: 1.0,
                fixed_transaction_fee: 0.0,
            },
        );
        broker.load_bars("AAPL", vec![bar(0, 10.0), bar(60, 10.0)]);

        let order = broker
            .submit_order(SubmitOrderRequest {
                symbol: "AAPL".into(),
                qty: 100.0,
                side: Side::Buy,
                order_type: Default::default(),
                time_in_force: Default::default(),
                limit_price: None,
            })
            .await;

        assert_eq!(order.status, Order::STATUS_FILLED);
        assert_eq!(order.fee, 5.0);
        assert_eq!(order.filled_avg_price, 10.0);
    }

    #[tokio::test]
    async fn missing_price_yields_failed_order() {
        let mut broker = HistoricalBroker::new(DateTime::<Utc>::UNIX_EPOCH, Duration::seconds(60), FeeModel::default());

        let order = broker
            .submit_order(SubmitOrderRequest {
                symbol: "AAPL".into(),
                qty: 10.0,
                side: Side::Buy,
                order_type: Default::default(),
                time_in_force: Default::default(),
                limit_price: None,
            })
            .await;

        assert!(order.is_failed());
        assert_eq!(order.filled_qty, 0.0);
    }
}
