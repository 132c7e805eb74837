//! Primitive bar components (spec §2): `Open`, `Close`, `High`, `Low`,
//! `Volume`, each a scalar-valued indicator tagged with its semantic role,
//! plus `TimeStamp` — the component every entity in the main ledger bears
//! (spec §3 invariants).

use crate::indicator::Indicator;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

macro_rules! scalar_bar_component {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd, Serialize, Deserialize)]
        pub struct $name(pub f64);

        impl Indicator for $name {
            fn zero() -> Self {
                $name(0.0)
            }
            fn add(self, other: Self) -> Self {
                $name(self.0 + other.0)
            }
            fn scale(self, factor: f64) -> Self {
                $name(self.0 * factor)
            }
            fn sqrt(self) -> Self {
                $name(self.0.sqrt())
            }
            fn value(self) -> f64 {
                self.0
            }
        }

        impl From<f64> for $name {
            fn from(value: f64) -> Self {
                $name(value)
            }
        }
    };
}

scalar_bar_component!(Open);
scalar_bar_component!(Close);
scalar_bar_component!(High);
scalar_bar_component!(Low);
scalar_bar_component!(Volume);

/// Wall/market-clock instant an entity pertains to. Every entity in the
/// main ledger bears one (spec §3 invariants); asset ledgers attach one to
/// every bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TimeStamp(pub DateTime<Utc>);

impl Default for TimeStamp {
    fn default() -> Self {
        TimeStamp(DateTime::<Utc>::UNIX_EPOCH)
    }
}

/// A single unit of time-sliced market data (spec GLOSSARY "Bar"),
/// convenient for bulk-loading an [`crate::asset_ledger::AssetLedger`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn close_indicator_ops() {
        let a = Close(2.0);
        let b = Close(3.0);
        assert_eq!(a.add(b), Close(5.0));
        assert_eq!(a.scale(2.0), Close(4.0));
        assert_eq!(Close(9.0).sqrt(), Close(3.0));
        assert_eq!(Close::zero(), Close(0.0));
    }
}
