//! Single-symbol order book on a fixed tick ladder.
//!
//! Both sides are arrays of [`PriceLevel`], one slot per tick from `0` to
//! `max_price`, allocated once at construction. An order-id index maps each
//! resting order to `(side, slot)` for O(1) cancel and edit. The best bid/ask
//! cursors point at the highest bid slot and the lowest ask slot holding
//! volume; they are repaired whenever a removal empties the slot they point at.

use crate::error::BookError;
use crate::matching::match_order;
use crate::price::TickGrid;
use crate::price_level::{Fill, PriceLevel};
use crate::trade_log::{OrderAdded, OrderCanceled, OrderEdited, Trade, TradeLog};
use crate::types::{Order, OrderId, Side};
use log::debug;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::fmt;

/// What an accepted ADD did to the book.
#[derive(Clone, Debug, PartialEq)]
pub struct AddOutcome {
    pub order_id: OrderId,
    /// Trades first, then the Add of the remainder (if any).
    pub events: Vec<TradeLog>,
    /// Resting orders that were fully filled and left the book.
    pub filled: Vec<OrderId>,
    /// Volume left resting under `order_id`; zero if it fully matched.
    pub resting_volume: u64,
}

impl AddOutcome {
    pub fn trades(&self) -> impl Iterator<Item = &Trade> {
        self.events.iter().filter_map(TradeLog::as_trade)
    }
}

/// Aggregated volume at one price.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct LevelSummary {
    pub price: Decimal,
    pub volume: u64,
    pub orders: usize,
}

/// Depth view of one book: bids best (highest) first, asks best (lowest) first.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct BookSnapshot {
    pub symbol: String,
    pub best_bid: Option<Decimal>,
    pub best_ask: Option<Decimal>,
    pub bids: Vec<LevelSummary>,
    pub asks: Vec<LevelSummary>,
}

#[derive(Debug)]
pub struct OrderBook {
    symbol: String,
    grid: TickGrid,
    bids: Vec<PriceLevel>,
    asks: Vec<PriceLevel>,
    index: HashMap<OrderId, (Side, usize)>,
    best_bid: usize,
    best_ask: usize,
}

impl OrderBook {
    pub fn new(symbol: impl Into<String>, max_price: Decimal, tick: Decimal) -> Result<Self, BookError> {
        let grid = TickGrid::new(max_price, tick)?;
        let ladder = |grid: &TickGrid| -> Vec<PriceLevel> {
            (0..grid.slots()).map(|i| PriceLevel::new(grid.price_at(i))).collect()
        };
        Ok(Self {
            symbol: symbol.into(),
            bids: ladder(&grid),
            asks: ladder(&grid),
            index: HashMap::new(),
            best_bid: 0,
            best_ask: grid.max_index(),
            grid,
        })
    }

    /// Validates `order`, matches it against the opposite side while it
    /// crosses, and rests any remainder.
    ///
    /// On error nothing in the book changes.
    pub fn add_order(&mut self, mut order: Order) -> Result<AddOutcome, BookError> {
        if order.symbol != self.symbol {
            return Err(BookError::SymbolMismatch {
                order_id: order.order_id,
                requested: order.symbol,
                actual: self.symbol.clone(),
            });
        }
        if order.volume == 0 {
            return Err(BookError::ZeroVolume);
        }
        let slot = self.grid.index_of(order.price)?;
        if self.index.contains_key(&order.order_id) {
            return Err(BookError::DuplicateOrder(order.order_id));
        }
        // Checked before matching so a rejected add leaves the book untouched.
        if self.levels(order.side)[slot]
            .total_volume()
            .checked_add(order.volume)
            .is_none()
        {
            return Err(BookError::VolumeOverflow {
                price: self.grid.price_at(slot),
                volume: order.volume,
            });
        }
        order.price = self.grid.price_at(slot);

        let fills = match_order(self, &mut order, slot);
        let mut events: Vec<TradeLog> = fills
            .iter()
            .map(|fill| TradeLog::Trade(self.trade(&order, fill)))
            .collect();
        let filled = fills
            .iter()
            .filter(|f| f.resting_fully_filled)
            .map(|f| f.resting_order_id)
            .collect();

        let order_id = order.order_id;
        let resting_volume = order.volume;
        if resting_volume > 0 {
            let added = OrderAdded {
                side: order.side,
                price: order.price,
                volume: order.volume,
                order_id: order.order_id,
                timestamp: order.timestamp,
                symbol: self.symbol.clone(),
            };
            self.insert(slot, order)?;
            events.push(TradeLog::Add(added));
        }
        debug!(
            "{} add order_id={} trades={} resting={} bid={} ask={}",
            self.symbol,
            order_id,
            fills.len(),
            resting_volume,
            self.best_bid(),
            self.best_ask()
        );
        Ok(AddOutcome {
            order_id,
            events,
            filled,
            resting_volume,
        })
    }

    /// Removes a resting order. The Cancel event carries its unfilled volume.
    pub fn cancel_order(&mut self, order_id: OrderId) -> Result<TradeLog, BookError> {
        let (side, slot) = self.locate(order_id)?;
        let order = self
            .levels_mut(side)[slot]
            .remove_order(order_id)
            .ok_or(BookError::UnknownOrder(order_id))?;
        self.index.remove(&order_id);
        self.repair_best(side, slot);
        Ok(TradeLog::Cancel(OrderCanceled {
            side: order.side,
            price: order.price,
            volume: order.volume,
            order_id,
            timestamp: order.timestamp,
            symbol: self.symbol.clone(),
        }))
    }

    /// Reduces a resting order's volume. Reducing to zero removes the order.
    pub fn edit_order(&mut self, order_id: OrderId, new_volume: u64) -> Result<TradeLog, BookError> {
        let (side, slot) = self.locate(order_id)?;
        let level = &mut self.levels_mut(side)[slot];
        let (price, timestamp) = level
            .get_order(order_id)
            .map(|o| (o.price, o.timestamp))
            .ok_or(BookError::UnknownOrder(order_id))?;
        let old_volume = level.update_order(order_id, new_volume)?;
        if new_volume == 0 {
            self.index.remove(&order_id);
            self.repair_best(side, slot);
        }
        Ok(TradeLog::Edit(OrderEdited {
            side,
            price,
            old_volume,
            new_volume,
            order_id,
            timestamp,
            symbol: self.symbol.clone(),
        }))
    }

    pub fn get_order(&self, order_id: OrderId) -> Option<&Order> {
        let &(side, slot) = self.index.get(&order_id)?;
        self.levels(side)[slot].get_order(order_id)
    }

    pub fn contains(&self, order_id: OrderId) -> bool {
        self.index.contains_key(&order_id)
    }

    /// Highest bid price with volume, or `0` when there are no bids.
    pub fn best_bid(&self) -> Decimal {
        self.best_bid_price().unwrap_or(Decimal::ZERO)
    }

    /// Lowest ask price with volume, or the book's max price when there are no asks.
    pub fn best_ask(&self) -> Decimal {
        self.best_ask_price().unwrap_or(self.grid.max_price())
    }

    pub fn best_bid_price(&self) -> Option<Decimal> {
        let level = &self.bids[self.best_bid];
        (!level.is_empty()).then(|| level.price())
    }

    pub fn best_ask_price(&self) -> Option<Decimal> {
        let level = &self.asks[self.best_ask];
        (!level.is_empty()).then(|| level.price())
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn tick(&self) -> Decimal {
        self.grid.tick()
    }

    pub fn max_price(&self) -> Decimal {
        self.grid.max_price()
    }

    /// Number of resting orders.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// The level at `price` on `side`, if `price` is on the grid.
    pub fn level(&self, side: Side, price: Decimal) -> Option<&PriceLevel> {
        let slot = self.grid.index_of(price).ok()?;
        Some(&self.levels(side)[slot])
    }

    /// Whole ladder for one side, slot `i` at price `i * tick`.
    pub fn levels(&self, side: Side) -> &[PriceLevel] {
        match side {
            Side::Buy => &self.bids,
            Side::Sell => &self.asks,
        }
    }

    /// Aggregated depth, limited to `depth` non-empty levels per side when given.
    pub fn snapshot(&self, depth: Option<usize>) -> BookSnapshot {
        let limit = depth.unwrap_or(usize::MAX);
        let summarize = |level: &PriceLevel| LevelSummary {
            price: level.price(),
            volume: level.total_volume(),
            orders: level.len(),
        };
        let bids = self.bids[..=self.best_bid]
            .iter()
            .rev()
            .filter(|l| !l.is_empty())
            .take(limit)
            .map(summarize)
            .collect();
        let asks = self.asks[self.best_ask..]
            .iter()
            .filter(|l| !l.is_empty())
            .take(limit)
            .map(summarize)
            .collect();
        BookSnapshot {
            symbol: self.symbol.clone(),
            best_bid: self.best_bid_price(),
            best_ask: self.best_ask_price(),
            bids,
            asks,
        }
    }

    /// Slot of the best opposite level if an order on `side` limited at
    /// `limit` crosses it.
    pub(crate) fn crossing_slot(&self, side: Side, limit: usize) -> Option<usize> {
        match side {
            Side::Buy => (self.best_ask <= limit).then_some(self.best_ask),
            Side::Sell => (self.best_bid >= limit).then_some(self.best_bid),
        }
    }

    pub(crate) fn fill_at(&mut self, side: Side, slot: usize, volume: u64) -> Option<Fill> {
        self.levels_mut(side)[slot].fill_front(volume)
    }

    pub(crate) fn slot_is_empty(&self, side: Side, slot: usize) -> bool {
        self.levels(side)[slot].is_empty()
    }

    pub(crate) fn unindex(&mut self, order_id: OrderId) {
        self.index.remove(&order_id);
    }

    /// Moves the `side` cursor outward past empty slots (bids down to 0, asks up
    /// to the max slot). Returns whether it now points at a non-empty slot.
    pub(crate) fn advance_best(&mut self, side: Side) -> bool {
        match side {
            Side::Buy => {
                while self.bids[self.best_bid].is_empty() && self.best_bid > 0 {
                    self.best_bid -= 1;
                }
                !self.bids[self.best_bid].is_empty()
            }
            Side::Sell => {
                let max = self.grid.max_index();
                while self.asks[self.best_ask].is_empty() && self.best_ask < max {
                    self.best_ask += 1;
                }
                !self.asks[self.best_ask].is_empty()
            }
        }
    }

    fn repair_best(&mut self, side: Side, emptied: usize) {
        let cursor = match side {
            Side::Buy => self.best_bid,
            Side::Sell => self.best_ask,
        };
        if cursor == emptied && self.slot_is_empty(side, emptied) {
            self.advance_best(side);
        }
    }

    fn insert(&mut self, slot: usize, order: Order) -> Result<(), BookError> {
        let side = order.side;
        let order_id = order.order_id;
        self.levels_mut(side)[slot].add_order(order)?;
        self.index.insert(order_id, (side, slot));
        match side {
            Side::Buy => {
                if slot > self.best_bid || self.bids[self.best_bid].is_empty() {
                    self.best_bid = slot;
                }
            }
            Side::Sell => {
                if slot < self.best_ask || self.asks[self.best_ask].is_empty() {
                    self.best_ask = slot;
                }
            }
        }
        Ok(())
    }

    fn trade(&self, aggressor: &Order, fill: &Fill) -> Trade {
        Trade {
            price: fill.price,
            volume: fill.volume,
            timestamp: aggressor.timestamp,
            aggressor: aggressor.side,
            resting_order_id: fill.resting_order_id,
            aggressor_order_id: aggressor.order_id,
            resting_client_id: fill.resting_client_id,
            aggressor_client_id: aggressor.client_id,
            symbol: self.symbol.clone(),
        }
    }

    fn locate(&self, order_id: OrderId) -> Result<(Side, usize), BookError> {
        self.index
            .get(&order_id)
            .copied()
            .ok_or(BookError::UnknownOrder(order_id))
    }

    fn levels_mut(&mut self, side: Side) -> &mut [PriceLevel] {
        match side {
            Side::Buy => &mut self.bids,
            Side::Sell => &mut self.asks,
        }
    }
}

impl fmt::Display for BookSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "------------------------------------";
        writeln!(f, "Order Book: {}", self.symbol)?;
        writeln!(f, "{}", rule)?;
        writeln!(f, "{:<28}    ASKS", "BIDS")?;
        writeln!(f, "{:<5} | {:<8} ||    Price |   Qty", "Qty", "Price")?;
        writeln!(f, "{}", rule)?;
        for level in self.asks.iter().rev() {
            writeln!(
                f,
                "{:<5} | {:<8} || {:>8} | {:>5}",
                "",
                "",
                level.price.to_string(),
                level.volume
            )?;
        }
        for level in &self.bids {
            writeln!(
                f,
                "{:<5} | {:<8} || {:>8} | {:>5}",
                level.volume,
                level.price.to_string(),
                "",
                ""
            )?;
        }
        write!(f, "{}", rule)
    }
}
