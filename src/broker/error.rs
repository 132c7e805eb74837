use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum BrokerError {
    #[error("no price available for ticker {ticker} at the requested time")]
    PriceUnavailable { ticker: String },

    #[error("no bar cache registered for ticker {ticker}")]
    UnknownTicker { ticker: String },
}
