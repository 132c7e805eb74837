//! `quantledger` is an entity-component ledger core for algorithmic
//! trading: market-data bars, derived technical indicators, strategies,
//! and orders coexist as typed entities in a column-oriented store, driven
//! through a deterministic per-tick pipeline that runs identically whether
//! the data comes from a live venue or a historical replay.
//!
//! The four load-bearing pieces:
//!
//! - [`ledger`] — the typed, column-oriented entity-component store with
//!   stage-ordered systems and change tracking.
//! - [`indicator`] — the dependency solver that turns "I want an
//!   `SMA<20,Close>`" into the calculator systems required to produce it.
//! - [`strategy`] and [`portfolio`] — the strategy/order/fill pipeline that
//!   consumes fresh bars and emits, submits, and settles orders.
//! - [`broker`] — the venue-agnostic interface and its deterministic
//!   historical replay implementation.
//!
//! [`trader`] wires these together into a runnable trader, and
//! [`statistic`] reports on a completed run.

/// Opaque entity identifiers and their monotonic allocator.
pub mod entity;

/// Primitive bar components (`Open`/`High`/`Low`/`Close`/`Volume`) and
/// `TimeStamp`.
pub mod bars;

/// The entity-component ledger: columns, stages, systems, change tracking,
/// and joins.
pub mod ledger;

/// Derived indicator components and the dependency solver that installs
/// the systems required to populate them.
pub mod indicator;

/// Per-ticker (and per-strategy combined) entity stores built on top of
/// [`ledger`].
pub mod asset_ledger;

/// Portfolio bookkeeping components: `Clock`, `Cash`, `PurchasePower`,
/// `Position`, `PortfolioSnapshot`, and the order lifecycle.
pub mod portfolio;

/// The broker abstraction consumed identically by live and historical
/// trading, plus the historical replay implementation.
pub mod broker;

/// Strategy descriptors, the pair-trading strategy, and the order/fill
/// pipeline systems run alongside them.
pub mod strategy;

/// The top-level orchestrator binding ledgers, strategies, and a broker
/// into a runnable trader.
pub mod trader;

/// Performance metrics computed over a completed run.
pub mod statistic;
