//! Order lifecycle components (spec §2 "Order lifecycle") and the
//! broker-agnostic wire format they are submitted/resolved through (spec
//! §6 "External interfaces").

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A buy intent, attached to a fresh entity by a strategy system. Picked up
/// by `Purchaser` (spec §4.3).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Purchase {
    pub ticker: String,
    pub quantity: f64,
}

/// A sell intent, attached to a fresh entity by a strategy system. Picked up
/// by `Seller` (spec §4.3).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sale {
    pub ticker: String,
    pub quantity: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Buy,
    Sell,
}

impl Default for Side {
    fn default() -> Self {
        Self::Buy
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderType {
    Market,
    Limit,
    Stop,
    StopLimit,
    TrailingStop,
}

impl Default for OrderType {
    fn default() -> Self {
        Self::Market
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeInForce {
    Day,
    Gtc,
    Opg,
    Cls,
    Ioc,
    Fok,
}

impl Default for TimeInForce {
    fn default() -> Self {
        Self::Day
    }
}

/// Submit-order request, broker-agnostic (spec §6 "Order wire format").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmitOrderRequest {
    pub symbol: String,
    pub qty: f64,
    pub side: Side,
    #[serde(rename = "type")]
    pub order_type: OrderType,
    pub time_in_force: TimeInForce,
    pub limit_price: Option<f64>,
}

/// Submit-order response, broker-agnostic (spec §6). Absent timestamps are
/// optional, matching a venue that only fills some of the lifecycle fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderResponse {
    pub symbol: String,
    pub side: Side,
    pub id: Uuid,
    pub client_order_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub filled_at: Option<DateTime<Utc>>,
    pub expired_at: Option<DateTime<Utc>>,
    pub canceled_at: Option<DateTime<Utc>>,
    pub failed_at: Option<DateTime<Utc>>,
    pub filled_qty: f64,
    pub filled_avg_price: f64,
    pub status: String,
    pub qty: f64,
}

/// The submitted-order component, attached by `Purchaser`/`Seller` once the
/// broker has responded (spec §4.3). A failed order carries a `status`
/// beginning `"failed\n"` and a zero `filled_qty` — a permitted terminal
/// form, not an error path (spec §7 kind 1).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub trace_id: Uuid,
    pub symbol: String,
    pub side: Side,
    pub requested_quantity: f64,
    pub status: String,
    pub filled_qty: f64,
    pub filled_avg_price: f64,
    pub fee: f64,
}

impl Order {
    pub const STATUS_FILLED: &'static str = "filled";

    pub fn failed(symbol: impl Into<String>, side: Side, requested_quantity: f64, reason: &str) -> Self {
        Self {
            trace_id: Uuid::new_v4(),
            symbol: symbol.into(),
            side,
            requested_quantity,
            status: format!("failed\n{reason}"),
            filled_qty: 0.0,
            filled_avg_price: 0.0,
            fee: 0.0,
        }
    }

    pub fn is_failed(&self) -> bool {
        self.status.starts_with("failed\n")
    }
}

/// Attached once an `Order`'s fill has settled; adjusts `Position`/`Cash`
/// (spec §4.3 `Filler`).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Filled {
    pub filled_avg_price: f64,
    pub filled_qty: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_order_status_begins_with_marker() {
        let order = Order::failed("AAPL", Side::Buy, 10.0, "insufficient qty available for order (available: 0)");
        assert!(order.is_failed());
        assert_eq!(order.filled_qty, 0.0);
    }

    #[test]
    fn filled_order_is_not_failed() {
        let order = Order {
            trace_id: Uuid::new_v4(),
            symbol: "AAPL".into(),
            side: Side::Buy,
            requested_quantity: 10.0,
            status: Order::STATUS_FILLED.to_string(),
            filled_qty: 10.0,
            filled_avg_price: 100.0,
            fee: 1.0,
        };
        assert!(!order.is_failed());
    }

    #[test]
    fn submit_request_round_trips_through_the_wire_shape() {
        let request = SubmitOrderRequest {
            symbol: "AAPL".into(),
            qty: 10.0,
            side: Side::Buy,
            order_type: OrderType::Limit,
            time_in_force: TimeInForce::Gtc,
            limit_price: Some(190.5),
        };

        let wire = serde_json::to_string(&request).unwrap();
        let parsed: SubmitOrderRequest = serde_json::from_str(&wire).unwrap();

        assert_eq!(request, parsed);
    }

    #[test]
    fn order_response_round_trips_through_the_wire_shape() {
        let response = OrderResponse {
            symbol: "AAPL".into(),
            side: Side::Sell,
            id: Uuid::new_v4(),
            client_order_id: Uuid::new_v4(),
            created_at: Utc::now(),
            updated_at: Some(Utc::now()),
            submitted_at: Some(Utc::now()),
            filled_at: None,
            expired_at: None,
            canceled_at: None,
            failed_at: None,
            filled_qty: 10.0,
            filled_avg_price: 190.5,
            status: Order::STATUS_FILLED.to_string(),
            qty: 10.0,
        };

        let wire = serde_json::to_string(&response).unwrap();
        let parsed: OrderResponse = serde_json::from_str(&wire).unwrap();

        assert_eq!(response, parsed);
    }

    #[test]
    fn order_component_round_trips_through_the_wire_shape() {
        let order = Order::failed("AAPL", Side::Buy, 10.0, "insufficient qty available for order (available: 0)");

        let wire = serde_json::to_string(&order).unwrap();
        let parsed: Order = serde_json::from_str(&wire).unwrap();

        assert_eq!(order, parsed);
    }
}
