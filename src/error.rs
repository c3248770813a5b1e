//! Error types.
//!
//! [`BookError`] covers every rejected operation; a rejected operation leaves
//! book state untouched and emits no trade log. [`ExchangeError`] adds the
//! failure modes of the worker-per-symbol [`crate::exchange::Exchange`].

use crate::types::OrderId;
use rust_decimal::Decimal;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BookError {
    #[error("price {0} is below zero")]
    NegativePrice(Decimal),

    #[error("price {price} is not a multiple of tick {tick}")]
    OffTick { price: Decimal, tick: Decimal },

    #[error("price {price} is above the book's max price {max_price}")]
    PriceOutOfRange { price: Decimal, max_price: Decimal },

    #[error("order volume must be positive")]
    ZeroVolume,

    #[error("adding {volume} at {price} would overflow the level's total volume")]
    VolumeOverflow { price: Decimal, volume: u64 },

    #[error("order {order_id} can only be reduced (current {current}, requested {requested})")]
    VolumeIncrease {
        order_id: OrderId,
        current: u64,
        requested: u64,
    },

    #[error("order {0} not found")]
    UnknownOrder(OrderId),

    #[error("unknown symbol {0}")]
    UnknownSymbol(String),

    #[error("symbol {0} is already listed")]
    DuplicateSymbol(String),

    #[error("order {0} is already resting in the book")]
    DuplicateOrder(OrderId),

    #[error("order {order_id} belongs to {actual}, not {requested}")]
    SymbolMismatch {
        order_id: OrderId,
        requested: String,
        actual: String,
    },

    #[error("invalid book configuration: {0}")]
    InvalidConfig(String),

    /// Internal: an order was routed to a level with a different price.
    #[error("order price {order_price} does not match level price {level_price}")]
    PriceMismatch {
        order_price: Decimal,
        level_price: Decimal,
    },
}

impl BookError {
    /// True for caller mistakes; false for internal invariant violations.
    pub fn is_validation(&self) -> bool {
        !matches!(self, BookError::PriceMismatch { .. })
    }

    /// True when the error names something that does not exist (symbol or order).
    pub fn is_not_found(&self) -> bool {
        matches!(self, BookError::UnknownOrder(_) | BookError::UnknownSymbol(_))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ExchangeError {
    #[error(transparent)]
    Book(#[from] BookError),

    #[error("book worker for {0} is not running")]
    Unavailable(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid {key}: {message}")]
    Invalid { key: &'static str, message: String },

    #[error("cannot read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_and_invariant_errors_are_distinguished() {
        assert!(BookError::ZeroVolume.is_validation());
        assert!(BookError::UnknownOrder(OrderId(3)).is_not_found());
        let internal = BookError::PriceMismatch {
            order_price: Decimal::ONE,
            level_price: Decimal::TWO,
        };
        assert!(!internal.is_validation());
    }

    #[test]
    fn messages_name_the_offending_values() {
        let err = BookError::VolumeIncrease {
            order_id: OrderId(9),
            current: 200,
            requested: 250,
        };
        let msg = err.to_string();
        assert!(msg.contains("9") && msg.contains("200") && msg.contains("250"));
    }
}
