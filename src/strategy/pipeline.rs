//! Order, fill, and bookkeeping pipeline run once per tick after the
//! strategy systems (spec §4.3): `Purchaser` → `Seller` → `Filler` →
//! `SnapShotter` → `Timer` → `DayCloser`. Unlike the indicator calculators,
//! these need broker and cross-ledger access the generic
//! [`crate::ledger::System`] trait doesn't carry, so the trader invokes them
//! directly rather than through a [`crate::ledger::Stage`].

use crate::asset_ledger::AssetLedger;
use crate::bars::TimeStamp;
use crate::broker::Broker;
use crate::ledger::query::with_not;
use crate::ledger::Ledger;
use crate::portfolio::order::{Filled, Order, Purchase, Sale, Side, SubmitOrderRequest};
use crate::portfolio::{adjust_position, Cash, Clock, PortfolioSnapshot, Position, PurchasePower};
use crate::statistic::TradingSummary;
use crate::strategy::StrategyError;

/// `PurchasePower.cash ← Cash.cash`, run before any other system in a
/// `main` tick so strategies size orders against a stable snapshot (spec
/// §9 Open Questions, §4.3 "PurchasePower snapshot").
pub fn snapshot_purchase_power(main: &mut Ledger) -> Result<(), StrategyError> {
    let cash = main.singleton::<Cash>()?.cash;
    main.singleton_mut::<PurchasePower>()?.cash = cash;
    Ok(())
}

/// Parses a failed order's reason text for the two retry rules (spec §4.3
/// "Insufficient-funds/quantity retry"), returning the next quantity to
/// resubmit with, or `None` if the failure isn't retryable.
fn retry_quantity(status: &str, current_qty: f64) -> Option<f64> {
    let reason = status.strip_prefix("failed\n")?;
    if reason.contains("insufficient day-trading buying power") {
        return Some((current_qty * 0.9).round());
    }
    let marker = "available: ";
    let idx = reason.find(marker)?;
    let tail = &reason[idx + marker.len()..];
    let digits: String = tail.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse::<f64>().ok()
}

async fn submit_with_retry(broker: &mut dyn Broker, symbol: &str, side: Side, mut qty: f64) -> Order {
    loop {
        let request = SubmitOrderRequest {
            symbol: symbol.to_string(),
            qty,
            side,
            order_type: Default::default(),
            time_in_force: Default::default(),
            limit_price: None,
        };
        let order = broker.submit_order(request).await;
        if !order.is_failed() {
            return order;
        }
        match retry_quantity(&order.status, qty) {
            Some(next_qty) if next_qty > 0.0 && next_qty < qty => {
                qty = next_qty;
                continue;
            }
            _ => return order,
        }
    }
}

/// Scans the main ledger for `Purchase` entities without an `Order` yet,
/// submits each (retrying per §4.3), and attaches the result.
pub struct Purchaser;

impl Purchaser {
    pub async fn run(main: &mut Ledger, broker: &mut dyn Broker) -> Result<(), StrategyError> {
        for entity in with_not::<Purchase, Order>(main) {
            let Some(purchase) = main.column::<Purchase>().and_then(|c| c.get(entity)).cloned() else {
                continue;
            };
            let order = submit_with_retry(broker, &purchase.ticker, Side::Buy, purchase.quantity).await;
            main.insert_component(entity, order);
        }
        Ok(())
    }
}

/// Mirrors [`Purchaser`] for `Sale` entities.
pub struct Seller;

impl Seller {
    pub async fn run(main: &mut Ledger, broker: &mut dyn Broker) -> Result<(), StrategyError> {
        for entity in with_not::<Sale, Order>(main) {
            let Some(sale) = main.column::<Sale>().and_then(|c| c.get(entity)).cloned() else {
                continue;
            };
            let order = submit_with_retry(broker, &sale.ticker, Side::Sell, sale.quantity).await;
            main.insert_component(entity, order);
        }
        Ok(())
    }
}

/// Settles entities bearing a filled `Order` but no `Filled` yet: attaches
/// `Filled`, adjusts `Position`, and debits/credits `Cash` (spec §4.3
/// `Filler`).
pub struct Filler;

impl Filler {
    pub fn run(main: &mut Ledger) -> Result<(), StrategyError> {
        for entity in with_not::<Order, Filled>(main) {
            let Some(order) = main.column::<Order>().and_then(|c| c.get(entity)).cloned() else {
                continue;
            };
            if order.status != Order::STATUS_FILLED {
                continue;
            }
            let is_purchase = main.has_component::<Purchase>(entity);
            let is_sale = main.has_component::<Sale>(entity);

            main.insert_component(
                entity,
                Filled {
                    filled_avg_price: order.filled_avg_price,
                    filled_qty: order.filled_qty,
                },
            );

            let notional = order.filled_qty * order.filled_avg_price;
            if is_purchase {
                adjust_position(main, &order.symbol, order.filled_qty);
                main.singleton_mut::<Cash>()?.cash -= notional + order.fee;
            } else if is_sale {
                adjust_position(main, &order.symbol, -order.filled_qty);
                main.singleton_mut::<Cash>()?.cash += notional - order.fee;
            }
        }
        Ok(())
    }
}

/// Emits one `PortfolioSnapshot` per tick and feeds the running
/// [`TradingSummary`] (spec §4.3 `SnapShotter`).
pub struct SnapShotter;

impl SnapShotter {
    pub fn run(main: &mut Ledger, broker: &dyn Broker, summary: &mut TradingSummary) -> Result<(), StrategyError> {
        let cash = main.singleton::<Cash>()?.cash;
        let mut value = cash;
        if let Some(positions) = main.column::<Position>() {
            for (_, position) in positions.iter() {
                if position.quantity == 0.0 {
                    continue;
                }
                if let Ok(price) = broker.current_price(&position.ticker) {
                    value += price * position.quantity;
                }
            }
        }

        let time = main.singleton::<Clock>()?.time;
        let entity = main.create_entity();
        main.insert_component(entity, TimeStamp(time));
        main.insert_component(entity, PortfolioSnapshot { time, value });
        summary.update(value);
        Ok(())
    }
}

/// Advances or publishes the virtual/wall clock (spec §4.3 `Timer`).
pub struct Timer;

impl Timer {
    /// Historical mode: `Clock.time += Clock.dtime`.
    pub fn advance(main: &mut Ledger) -> Result<(), StrategyError> {
        let clock = main.singleton_mut::<Clock>()?;
        clock.time += clock.dtime;
        Ok(())
    }

    /// Live mode: the clock merely publishes wall time (spec §4.3 `Timer`).
    pub fn publish(main: &mut Ledger, now: chrono::DateTime<chrono::Utc>) -> Result<(), StrategyError> {
        main.singleton_mut::<Clock>()?.time = now;
        Ok(())
    }
}

/// Resets per-day `new_entities` watermarks for the named strategy systems
/// across every asset and combined ledger, so day 2's view starts clean
/// (spec §4.3 `DayCloser`, §8 scenario 6).
pub struct DayCloser;

impl DayCloser {
    pub fn run<'a>(ledgers: impl Iterator<Item = &'a mut AssetLedger>, system_names: &[&'static str]) {
        for asset in ledgers {
            for name in system_names {
                asset.ledger_mut().reset_watermarks(name);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_shrinks_by_ninety_percent_on_buying_power_rejection() {
        let next = retry_quantity("failed\ninsufficient day-trading buying power", 100.0);
        assert_eq!(next, Some(90.0));
    }

    #[test]
    fn retry_replaces_with_available_quantity() {
        let next = retry_quantity("failed\ninsufficient qty available for order (available: 7)", 10.0);
        assert_eq!(next, Some(7.0));
    }

    #[test]
    fn retry_with_zero_available_is_not_retried_further() {
        let next = retry_quantity("failed\ninsufficient qty available for order (available: 0)", 10.0);
        assert_eq!(next, Some(0.0));
    }

    #[test]
    fn non_retryable_failure_yields_none() {
        let next = retry_quantity("failed\nno price available for requested fill time", 10.0);
        assert_eq!(next, None);
    }

    #[test]
    fn filler_settles_purchase_and_debits_cash() {
        let mut main = Ledger::new("MAIN");
        let cash_entity = main.create_entity();
        main.insert_singleton(cash_entity, Cash { cash: 1000.0 }).unwrap();

        let entity = main.create_entity();
        main.insert_component(
            entity,
            Purchase {
                ticker: "AAPL".into(),
                quantity: 10.0,
            },
        );
        main.insert_component(
            entity,
            Order {
                trace_id: uuid::Uuid::new_v4(),
                symbol: "AAPL".into(),
                side: Side::Buy,
                requested_quantity: 10.0,
                status: Order::STATUS_FILLED.to_string(),
                filled_qty: 10.0,
                filled_avg_price: 10.0,
                fee: 1.0,
            },
        );

        Filler::run(&mut main).unwrap();

        assert!(main.has_component::<Filled>(entity));
        assert_eq!(crate::portfolio::current_position(&main, "AAPL"), 10.0);
        assert_eq!(main.singleton::<Cash>().unwrap().cash, 1000.0 - 101.0);
    }

    #[test]
    fn filler_skips_unfilled_orders() {
        let mut main = Ledger::new("MAIN");
        let cash_entity = main.create_entity();
        main.insert_singleton(cash_entity, Cash { cash: 500.0 }).unwrap();

        let entity = main.create_entity();
        main.insert_component(
            entity,
            Sale {
                ticker: "AAPL".into(),
                quantity: 5.0,
            },
        );
        main.insert_component(entity, Order::failed("AAPL", Side::Sell, 5.0, "insufficient qty available for order (available: 0)"));

        Filler::run(&mut main).unwrap();

        assert!(!main.has_component::<Filled>(entity));
        assert_eq!(main.singleton::<Cash>().unwrap().cash, 500.0);
    }
}
