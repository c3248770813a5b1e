//! Core types and IDs for the exchange.
//!
//! All identifiers are newtype wrappers. [`Order`] is the resting-order record
//! stored in a [`crate::price_level::PriceLevel`]; [`NewOrder`] is the validated
//! request a caller hands to the registry.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::fmt;

/// Exchange-assigned order identifier. Unique for the registry's lifetime.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub struct OrderId(pub u64);

/// Identifier of the client that sent the order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct ClientId(pub u64);

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Order direction. Serialized as `"BUY"` / `"SELL"`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn opposite(self) -> Side {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => f.write_str("BUY"),
            Side::Sell => f.write_str("SELL"),
        }
    }
}

/// A limit order. Everything but `volume` is fixed at creation.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Order {
    pub order_id: OrderId,
    pub client_id: ClientId,
    pub symbol: String,
    pub side: Side,
    pub price: Decimal,
    /// Remaining (unfilled) volume.
    pub volume: u64,
    pub timestamp: DateTime<Utc>,
}

impl Order {
    /// Builds the order the registry hands to a book once an id and arrival time are assigned.
    pub fn from_request(request: NewOrder, order_id: OrderId, timestamp: DateTime<Utc>) -> Self {
        Self {
            order_id,
            client_id: request.client_id,
            symbol: request.symbol,
            side: request.side,
            price: request.price,
            volume: request.volume,
            timestamp,
        }
    }
}

/// ADD request fields. JSON accepts `direction`/`dir` for `side` and `cid`/`clientId` for `client_id`.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct NewOrder {
    pub symbol: String,
    #[serde(alias = "direction", alias = "dir")]
    pub side: Side,
    pub price: Decimal,
    pub volume: u64,
    #[serde(alias = "cid", alias = "clientId")]
    pub client_id: ClientId,
}

impl NewOrder {
    pub fn new(symbol: impl Into<String>, side: Side, price: Decimal, volume: u64, client_id: ClientId) -> Self {
        Self {
            symbol: symbol.into(),
            side,
            price,
            volume,
            client_id,
        }
    }
}
