//! Performance metrics computed over a completed run's `PortfolioSnapshot`
//! history (spec §4.3 `SnapShotter`), printed at the end of a back-test.

pub mod algorithm;
pub mod dispersion;
pub mod summary;

pub use summary::TradingSummary;
