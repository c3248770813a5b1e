//! Market-data mirror: a client-side view of the books rebuilt from the trade
//! log alone.
//!
//! A consumer that only sees [`TradeLog`] events (a WebSocket subscriber, a
//! trading bot) can keep aggregated depth and best prices per symbol by
//! applying every event in order. Trades reduce the resting side at the trade
//! price; the resting order id tells which order shrank.

use crate::order_book::{BookSnapshot, LevelSummary};
use crate::sink::LogSink;
use crate::trade_log::TradeLog;
use crate::types::{OrderId, Side};
use log::warn;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct Depth {
    volume: u64,
    orders: usize,
}

#[derive(Clone, Copy, Debug)]
struct Resting {
    side: Side,
    price: Decimal,
    volume: u64,
}

#[derive(Debug, Default)]
struct MirrorBook {
    bids: BTreeMap<Decimal, Depth>,
    asks: BTreeMap<Decimal, Depth>,
    orders: HashMap<OrderId, Resting>,
}

impl MirrorBook {
    fn side_mut(&mut self, side: Side) -> &mut BTreeMap<Decimal, Depth> {
        match side {
            Side::Buy => &mut self.bids,
            Side::Sell => &mut self.asks,
        }
    }

    fn add(&mut self, order_id: OrderId, side: Side, price: Decimal, volume: u64) {
        let depth = self.side_mut(side).entry(price).or_default();
        depth.volume = depth.volume.saturating_add(volume);
        depth.orders += 1;
        self.orders.insert(order_id, Resting { side, price, volume });
    }

    /// Takes `volume` off a known order, dropping it (and its level) at zero.
    fn reduce(&mut self, order_id: OrderId, volume: u64) -> bool {
        let Some(resting) = self.orders.get_mut(&order_id) else {
            return false;
        };
        let taken = volume.min(resting.volume);
        resting.volume -= taken;
        let Resting { side, price, volume: left } = *resting;
        if left == 0 {
            self.orders.remove(&order_id);
        }
        let levels = self.side_mut(side);
        if let Some(depth) = levels.get_mut(&price) {
            depth.volume = depth.volume.saturating_sub(taken);
            if left == 0 {
                depth.orders = depth.orders.saturating_sub(1);
            }
            if depth.orders == 0 {
                levels.remove(&price);
            }
        }
        true
    }

    fn snapshot(&self, symbol: &str, depth: Option<usize>) -> BookSnapshot {
        let limit = depth.unwrap_or(usize::MAX);
        let summarize = |(&price, d): (&Decimal, &Depth)| LevelSummary {
            price,
            volume: d.volume,
            orders: d.orders,
        };
        BookSnapshot {
            symbol: symbol.to_string(),
            best_bid: self.bids.keys().next_back().copied(),
            best_ask: self.asks.keys().next().copied(),
            bids: self.bids.iter().rev().take(limit).map(summarize).collect(),
            asks: self.asks.iter().take(limit).map(summarize).collect(),
        }
    }
}

#[derive(Debug, Default)]
pub struct MarketMirror {
    books: HashMap<String, MirrorBook>,
}

impl MarketMirror {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies one event. Events about orders this mirror never saw added
    /// (it joined mid-stream) are skipped with a warning.
    pub fn apply(&mut self, event: &TradeLog) {
        let book = self.books.entry(event.symbol().to_string()).or_default();
        let known = match event {
            TradeLog::Add(e) => {
                book.add(e.order_id, e.side, e.price, e.volume);
                true
            }
            TradeLog::Cancel(e) => book.reduce(e.order_id, e.volume),
            TradeLog::Edit(e) => book.reduce(e.order_id, e.old_volume.saturating_sub(e.new_volume)),
            TradeLog::Trade(e) => book.reduce(e.resting_order_id, e.volume),
        };
        if !known {
            warn!("mirror {}: {} event for an order it never saw", event.symbol(), event.kind());
        }
    }

    pub fn apply_all<'a>(&mut self, events: impl IntoIterator<Item = &'a TradeLog>) {
        for event in events {
            self.apply(event);
        }
    }

    pub fn best_bid(&self, symbol: &str) -> Option<Decimal> {
        self.books.get(symbol)?.bids.keys().next_back().copied()
    }

    pub fn best_ask(&self, symbol: &str) -> Option<Decimal> {
        self.books.get(symbol)?.asks.keys().next().copied()
    }

    /// Aggregated depth in the same shape as [`crate::OrderBook::snapshot`].
    /// An unseen symbol yields an empty snapshot.
    pub fn snapshot(&self, symbol: &str, depth: Option<usize>) -> BookSnapshot {
        match self.books.get(symbol) {
            Some(book) => book.snapshot(symbol, depth),
            None => MirrorBook::default().snapshot(symbol, depth),
        }
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.books.keys().map(String::as_str)
    }
}

/// Lets a shared mirror sit behind a sink and follow a live exchange.
impl LogSink for Mutex<MarketMirror> {
    fn record(&self, event: &TradeLog) {
        if let Ok(mut mirror) = self.lock() {
            mirror.apply(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::BookRegistry;
    use crate::types::ClientId;
    use std::sync::Arc;

    fn d(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn registry() -> BookRegistry {
        let mut reg = BookRegistry::new();
        reg.add_symbol("AAPL", d("1000"), d("0.01")).unwrap();
        reg
    }

    #[test]
    fn follows_adds_trades_and_cancels() {
        let mut reg = registry();
        reg.add_order("AAPL", Side::Sell, d("101"), 100, ClientId(1)).unwrap();
        reg.add_order("AAPL", Side::Sell, d("101"), 50, ClientId(2)).unwrap();
        let bid = reg.add_order("AAPL", Side::Buy, d("99.50"), 10, ClientId(3)).unwrap();
        reg.add_order("AAPL", Side::Buy, d("101"), 120, ClientId(4)).unwrap();
        reg.edit_order("AAPL", bid, 4).unwrap();

        let mut mirror = MarketMirror::new();
        mirror.apply_all(reg.logs());
        assert_eq!(mirror.best_ask("AAPL"), Some(d("101")));
        assert_eq!(mirror.best_bid("AAPL"), Some(d("99.50")));
        assert_eq!(mirror.snapshot("AAPL", None), reg.snapshot("AAPL", None).unwrap());

        reg.cancel_order("AAPL", bid).unwrap();
        mirror.apply_all(&reg.logs()[reg.logs().len() - 1..]);
        assert_eq!(mirror.best_bid("AAPL"), None);
        assert_eq!(mirror.snapshot("AAPL", None), reg.snapshot("AAPL", None).unwrap());
    }

    #[test]
    fn unseen_orders_are_ignored() {
        let mut reg = registry();
        reg.add_order("AAPL", Side::Sell, d("10"), 5, ClientId(1)).unwrap();
        reg.add_order("AAPL", Side::Buy, d("10"), 2, ClientId(2)).unwrap();
        let mut mirror = MarketMirror::new();
        // Skip the initial add.
        mirror.apply_all(&reg.logs()[1..]);
        assert_eq!(mirror.best_ask("AAPL"), None);
        assert!(mirror.snapshot("AAPL", None).asks.is_empty());
    }

    #[test]
    fn shared_mirror_follows_a_live_registry() {
        let mirror = Arc::new(Mutex::new(MarketMirror::new()));
        let mut reg = registry().with_sink(Arc::clone(&mirror));
        reg.add_order("AAPL", Side::Buy, d("12.34"), 7, ClientId(1)).unwrap();
        let snapshot = mirror.lock().unwrap().snapshot("AAPL", Some(1));
        assert_eq!(snapshot.best_bid, Some(d("12.34")));
        assert_eq!(snapshot.bids[0].volume, 7);
    }
}
