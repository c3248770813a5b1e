//! Trade log: the append-only record of every book mutation.
//!
//! [`TradeLog`] is emitted for each Add, Cancel, Edit and Trade, in the order the
//! mutations happen. It serializes as an internally tagged JSON object
//! (`"type": "ADD" | "CANCEL" | "TRADE" | "EDIT"`) and displays as one
//! human-readable line.

use crate::types::{ClientId, OrderId, Side};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::fmt;

const TIME_FORMAT: &str = "%F %T";

/// An order (or its unfilled remainder) started resting.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct OrderAdded {
    pub side: Side,
    pub price: Decimal,
    pub volume: u64,
    pub order_id: OrderId,
    pub timestamp: DateTime<Utc>,
    pub symbol: String,
}

/// A resting order was canceled; `volume` is what was still unfilled.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct OrderCanceled {
    pub side: Side,
    pub price: Decimal,
    pub volume: u64,
    pub order_id: OrderId,
    pub timestamp: DateTime<Utc>,
    pub symbol: String,
}

/// One match between an aggressor and one resting order.
///
/// Executes at the resting order's price and carries the aggressor's arrival time.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Trade {
    pub price: Decimal,
    pub volume: u64,
    pub timestamp: DateTime<Utc>,
    pub aggressor: Side,
    pub resting_order_id: OrderId,
    pub aggressor_order_id: OrderId,
    pub resting_client_id: ClientId,
    pub aggressor_client_id: ClientId,
    pub symbol: String,
}

impl Trade {
    /// (buy order id, sell order id)
    pub fn order_ids(&self) -> (OrderId, OrderId) {
        match self.aggressor {
            Side::Buy => (self.aggressor_order_id, self.resting_order_id),
            Side::Sell => (self.resting_order_id, self.aggressor_order_id),
        }
    }
}

/// A resting order's volume was reduced.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct OrderEdited {
    pub side: Side,
    pub price: Decimal,
    pub old_volume: u64,
    pub new_volume: u64,
    pub order_id: OrderId,
    pub timestamp: DateTime<Utc>,
    pub symbol: String,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", rename_all = "UPPERCASE")]
pub enum TradeLog {
    Add(OrderAdded),
    Cancel(OrderCanceled),
    Trade(Trade),
    Edit(OrderEdited),
}

impl TradeLog {
    pub fn symbol(&self) -> &str {
        match self {
            TradeLog::Add(e) => &e.symbol,
            TradeLog::Cancel(e) => &e.symbol,
            TradeLog::Trade(e) => &e.symbol,
            TradeLog::Edit(e) => &e.symbol,
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            TradeLog::Add(e) => e.timestamp,
            TradeLog::Cancel(e) => e.timestamp,
            TradeLog::Trade(e) => e.timestamp,
            TradeLog::Edit(e) => e.timestamp,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            TradeLog::Add(_) => "ADD",
            TradeLog::Cancel(_) => "CANCEL",
            TradeLog::Trade(_) => "TRADE",
            TradeLog::Edit(_) => "EDIT",
        }
    }

    pub fn as_trade(&self) -> Option<&Trade> {
        match self {
            TradeLog::Trade(t) => Some(t),
            _ => None,
        }
    }
}

impl fmt::Display for TradeLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeLog::Add(e) => write!(
                f,
                "Type: ADD, Symbol: {}, Direction: {}, Price: {}, Volume: {}, Order ID: {}, Timestamp: {}",
                e.symbol,
                e.side,
                e.price,
                e.volume,
                e.order_id,
                e.timestamp.format(TIME_FORMAT)
            ),
            TradeLog::Cancel(e) => write!(
                f,
                "Type: CANCEL, Symbol: {}, Direction: {}, Price: {}, Volume: {}, Order ID: {}, Timestamp: {}",
                e.symbol,
                e.side,
                e.price,
                e.volume,
                e.order_id,
                e.timestamp.format(TIME_FORMAT)
            ),
            TradeLog::Trade(e) => write!(
                f,
                "Type: TRADE, Symbol: {}, Aggressor: {}, Price: {}, Volume: {}, Resting Client: {}, Aggressor Client: {}, Timestamp: {}",
                e.symbol,
                e.aggressor,
                e.price,
                e.volume,
                e.resting_client_id,
                e.aggressor_client_id,
                e.timestamp.format(TIME_FORMAT)
            ),
            TradeLog::Edit(e) => write!(
                f,
                "Type: EDIT, Symbol: {}, Direction: {}, Price: {}, Old Volume: {}, New Volume: {}, Order ID: {}, Timestamp: {}",
                e.symbol,
                e.side,
                e.price,
                e.old_volume,
                e.new_volume,
                e.order_id,
                e.timestamp.format(TIME_FORMAT)
            ),
        }
    }
}
