//! Error types for Pontoon

use thiserror::Error;

/// Core errors that can occur in Pontoon
#[derive(Debug, Error)]
pub enum Error {
    #[error("Amount error: {0}")]
    Amount(#[from] AmountError),

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("Invalid address: {reason}")]
    InvalidAddress { reason: String },

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Decimal amount parsing and formatting errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AmountError {
    #[error("Amount is empty")]
    Empty,

    #[error("Amount is not a decimal number: {input}")]
    Malformed { input: String },

    #[error("Amount {input} has more than {decimals} decimal places")]
    ExcessPrecision { input: String, decimals: u32 },

    #[error("Amount overflows the supported range")]
    Overflow,
}

/// Token registry construction and lookup errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Duplicate token symbol: {symbol}")]
    DuplicateSymbol { symbol: String },

    #[error("Token {symbol} names unknown counterpart {counter}")]
    UnknownCounterpart { symbol: String, counter: String },

    #[error("Counterpart relation between {a} and {b} is not symmetric")]
    AsymmetricPair { a: String, b: String },

    #[error("Unknown token symbol: {symbol}")]
    UnknownToken { symbol: String },
}

/// Result type alias for Pontoon operations
pub type Result<T> = std::result::Result<T, Error>;
