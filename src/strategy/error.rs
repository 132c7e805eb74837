use crate::ledger::LedgerError;
use thiserror::Error;

/// Errors raised while constructing or running a strategy, or the pipeline
/// systems (`Purchaser`/`Seller`/`Filler`/`SnapShotter`) that run alongside
/// it (spec §4.3, §7 category 4).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StrategyError {
    #[error("failed to build struct due to incomplete attributes provided")]
    BuilderIncomplete,

    #[error("invalid strategy configuration: {reason}")]
    ConfigInvalid { reason: String },

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}
