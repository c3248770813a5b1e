//! Multi-symbol book registry: the sequential entry point of the exchange.
//!
//! Owns one [`OrderBook`] per symbol, hands out order ids, routes cancel/edit
//! by order id, and forwards every emitted [`TradeLog`] to its audit queue and
//! to an optional [`LogSink`]. All operations run to completion before the
//! next one starts; see [`crate::exchange::Exchange`] for the concurrent form.

use crate::clock::{Clock, SystemClock};
use crate::config::SymbolConfig;
use crate::error::BookError;
use crate::order_book::{AddOutcome, BookSnapshot, OrderBook};
use crate::request::{Request, Response};
use crate::sink::LogSink;
use crate::trade_log::TradeLog;
use crate::types::{ClientId, NewOrder, Order, OrderId, Side};
use log::{info, warn};
use rust_decimal::Decimal;
use std::collections::HashMap;

pub struct BookRegistry {
    books: Vec<OrderBook>,
    by_symbol: HashMap<String, usize>,
    /// Resting order -> owning book.
    routes: HashMap<OrderId, usize>,
    next_order_id: u64,
    logs: Vec<TradeLog>,
    sink: Option<Box<dyn LogSink>>,
    clock: Box<dyn Clock>,
}

impl Default for BookRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl BookRegistry {
    pub fn new() -> Self {
        Self {
            books: Vec::new(),
            by_symbol: HashMap::new(),
            routes: HashMap::new(),
            next_order_id: 1,
            logs: Vec::new(),
            sink: None,
            clock: Box::new(SystemClock),
        }
    }

    /// Builds a registry with one book per configured symbol.
    pub fn from_config(symbols: &[SymbolConfig]) -> Result<Self, BookError> {
        let mut registry = Self::new();
        for s in symbols {
            registry.add_symbol(&s.symbol, s.max_price, s.tick)?;
        }
        Ok(registry)
    }

    /// Forwards every event to `sink` as well as the audit queue.
    pub fn with_sink(mut self, sink: impl LogSink + 'static) -> Self {
        self.sink = Some(Box::new(sink));
        self
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn add_symbol(&mut self, symbol: &str, max_price: Decimal, tick: Decimal) -> Result<(), BookError> {
        if self.by_symbol.contains_key(symbol) {
            return Err(BookError::DuplicateSymbol(symbol.to_string()));
        }
        let book = OrderBook::new(symbol, max_price, tick)?;
        info!("symbol listed symbol={} max_price={} tick={}", symbol, max_price, tick);
        self.by_symbol.insert(symbol.to_string(), self.books.len());
        self.books.push(book);
        Ok(())
    }

    /// Assigns the next order id, stamps the arrival time and runs the order
    /// through its book. Returns the id whether the order rested or fully matched.
    pub fn add_order(
        &mut self,
        symbol: &str,
        side: Side,
        price: Decimal,
        volume: u64,
        client_id: ClientId,
    ) -> Result<OrderId, BookError> {
        self.submit(NewOrder::new(symbol, side, price, volume, client_id))
            .map(|outcome| outcome.order_id)
    }

    /// Like [`BookRegistry::add_order`] but returns everything the add did.
    pub fn submit(&mut self, request: NewOrder) -> Result<AddOutcome, BookError> {
        let slot = self.slot(&request.symbol)?;
        let order_id = OrderId(self.next_order_id);
        self.next_order_id += 1;
        let order = Order::from_request(request, order_id, self.clock.now());
        info!(
            "order submitted order_id={} symbol={} side={} price={} volume={} client={}",
            order_id, order.symbol, order.side, order.price, order.volume, order.client_id
        );
        let outcome = match self.books[slot].add_order(order) {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!("order rejected order_id={}: {}", order_id, e);
                return Err(e);
            }
        };
        for filled in &outcome.filled {
            self.routes.remove(filled);
        }
        if outcome.resting_volume > 0 {
            self.routes.insert(order_id, slot);
        }
        for event in &outcome.events {
            if let TradeLog::Trade(trade) = event {
                info!(
                    "trade symbol={} price={} volume={} aggressor={} resting_order={} aggressor_order={}",
                    trade.symbol, trade.price, trade.volume, trade.aggressor, trade.resting_order_id, trade.aggressor_order_id
                );
            }
            self.add_log(event.clone());
        }
        Ok(outcome)
    }

    pub fn cancel_order(&mut self, symbol: &str, order_id: OrderId) -> Result<(), BookError> {
        let slot = self.route(symbol, order_id)?;
        let event = self.books[slot].cancel_order(order_id).map_err(|e| {
            warn!("cancel rejected order_id={}: {}", order_id, e);
            e
        })?;
        self.routes.remove(&order_id);
        info!("order canceled order_id={} symbol={}", order_id, symbol);
        self.add_log(event);
        Ok(())
    }

    /// Reduces a resting order to `new_volume`. Zero removes it.
    pub fn edit_order(&mut self, symbol: &str, order_id: OrderId, new_volume: u64) -> Result<(), BookError> {
        let slot = self.route(symbol, order_id)?;
        let event = self.books[slot].edit_order(order_id, new_volume).map_err(|e| {
            warn!("edit rejected order_id={}: {}", order_id, e);
            e
        })?;
        if new_volume == 0 {
            self.routes.remove(&order_id);
        }
        info!("order edited order_id={} symbol={} new_volume={}", order_id, symbol, new_volume);
        self.add_log(event);
        Ok(())
    }

    /// Dispatches a transport request.
    pub fn process(&mut self, request: Request) -> Result<Response, BookError> {
        match request {
            Request::Add(new_order) => {
                let outcome = self.submit(new_order)?;
                Ok(Response::Added {
                    order_id: outcome.order_id,
                })
            }
            Request::Cancel(cancel) => {
                self.cancel_order(&cancel.symbol, cancel.order_id)?;
                Ok(Response::Ack)
            }
            Request::Edit(edit) => {
                self.edit_order(&edit.symbol, edit.order_id, edit.new_volume)?;
                Ok(Response::Ack)
            }
        }
    }

    /// A resting order, looked up by id alone.
    pub fn get_order(&self, order_id: OrderId) -> Option<&Order> {
        let &slot = self.routes.get(&order_id)?;
        self.books[slot].get_order(order_id)
    }

    pub fn best_bid(&self, symbol: &str) -> Result<Decimal, BookError> {
        Ok(self.book_for(symbol)?.best_bid())
    }

    pub fn best_ask(&self, symbol: &str) -> Result<Decimal, BookError> {
        Ok(self.book_for(symbol)?.best_ask())
    }

    pub fn snapshot(&self, symbol: &str, depth: Option<usize>) -> Result<BookSnapshot, BookError> {
        Ok(self.book_for(symbol)?.snapshot(depth))
    }

    pub fn book(&self, symbol: &str) -> Option<&OrderBook> {
        self.by_symbol.get(symbol).map(|&slot| &self.books[slot])
    }

    pub fn books(&self) -> impl Iterator<Item = &OrderBook> {
        self.books.iter()
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.books.iter().map(OrderBook::symbol)
    }

    /// Audit queue: every event emitted so far, oldest first.
    pub fn logs(&self) -> &[TradeLog] {
        &self.logs
    }

    pub fn drain_logs(&mut self) -> Vec<TradeLog> {
        std::mem::take(&mut self.logs)
    }

    fn add_log(&mut self, event: TradeLog) {
        if let Some(sink) = &self.sink {
            sink.record(&event);
        }
        self.logs.push(event);
    }

    fn slot(&self, symbol: &str) -> Result<usize, BookError> {
        self.by_symbol
            .get(symbol)
            .copied()
            .ok_or_else(|| BookError::UnknownSymbol(symbol.to_string()))
    }

    fn book_for(&self, symbol: &str) -> Result<&OrderBook, BookError> {
        self.slot(symbol).map(|slot| &self.books[slot])
    }

    /// Book of a resting order; `symbol` must agree with it.
    fn route(&self, symbol: &str, order_id: OrderId) -> Result<usize, BookError> {
        self.slot(symbol)?;
        let &slot = self
            .routes
            .get(&order_id)
            .ok_or(BookError::UnknownOrder(order_id))?;
        let actual = self.books[slot].symbol();
        if actual != symbol {
            return Err(BookError::SymbolMismatch {
                order_id,
                requested: symbol.to_string(),
                actual: actual.to_string(),
            });
        }
        Ok(slot)
    }
}
