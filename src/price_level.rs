//! One slot of the ladder: a FIFO queue of resting orders at a single price.
//!
//! `total_volume` always equals the sum of the queued orders' remaining volume,
//! and no queued order has zero volume.

use crate::error::BookError;
use crate::types::{ClientId, Order, OrderId};
use log::warn;
use rust_decimal::Decimal;
use std::collections::VecDeque;

/// Result of filling the head of a level against an incoming order.
#[derive(Clone, Debug, PartialEq)]
pub struct Fill {
    pub resting_order_id: OrderId,
    pub resting_client_id: ClientId,
    pub price: Decimal,
    pub volume: u64,
    /// True if the resting order was fully filled (removed from the level).
    pub resting_fully_filled: bool,
}

#[derive(Clone, Debug)]
pub struct PriceLevel {
    price: Decimal,
    orders: VecDeque<Order>,
    total_volume: u64,
}

impl PriceLevel {
    pub fn new(price: Decimal) -> Self {
        Self {
            price,
            orders: VecDeque::new(),
            total_volume: 0,
        }
    }

    pub fn price(&self) -> Decimal {
        self.price
    }

    pub fn total_volume(&self) -> u64 {
        self.total_volume
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    /// Queued orders, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &Order> {
        self.orders.iter()
    }

    /// Appends `order` at the back of the queue.
    pub fn add_order(&mut self, order: Order) -> Result<(), BookError> {
        if order.price != self.price {
            warn!(
                "order {} has price {} but level price is {}",
                order.order_id, order.price, self.price
            );
            return Err(BookError::PriceMismatch {
                order_price: order.price,
                level_price: self.price,
            });
        }
        if order.volume == 0 {
            return Err(BookError::ZeroVolume);
        }
        self.total_volume = self
            .total_volume
            .checked_add(order.volume)
            .ok_or(BookError::VolumeOverflow {
                price: self.price,
                volume: order.volume,
            })?;
        self.orders.push_back(order);
        Ok(())
    }

    /// Removes an order by id and returns it. `None` if it is not in this level.
    pub fn remove_order(&mut self, order_id: OrderId) -> Option<Order> {
        let position = self.orders.iter().position(|o| o.order_id == order_id)?;
        let order = self.orders.remove(position)?;
        self.total_volume -= order.volume;
        Some(order)
    }

    pub fn get_order(&self, order_id: OrderId) -> Option<&Order> {
        self.orders.iter().find(|o| o.order_id == order_id)
    }

    /// Oldest order, i.e. the next one to trade.
    pub fn priority_order(&self) -> Option<&Order> {
        self.orders.front()
    }

    /// Reduces a queued order to `new_volume`; returns the previous volume.
    ///
    /// A reduction to zero removes the order from the queue.
    pub fn update_order(&mut self, order_id: OrderId, new_volume: u64) -> Result<u64, BookError> {
        let position = self
            .orders
            .iter()
            .position(|o| o.order_id == order_id)
            .ok_or(BookError::UnknownOrder(order_id))?;
        let current = self.orders[position].volume;
        if new_volume > current {
            return Err(BookError::VolumeIncrease {
                order_id,
                current,
                requested: new_volume,
            });
        }
        self.total_volume -= current - new_volume;
        if new_volume == 0 {
            self.orders.remove(position);
        } else {
            self.orders[position].volume = new_volume;
        }
        Ok(current)
    }

    /// Trades up to `volume` against the priority order. `None` if the level is empty.
    pub fn fill_front(&mut self, volume: u64) -> Option<Fill> {
        let front = self.orders.front_mut()?;
        let traded = volume.min(front.volume);
        front.volume -= traded;
        self.total_volume -= traded;
        let fill = Fill {
            resting_order_id: front.order_id,
            resting_client_id: front.client_id,
            price: front.price,
            volume: traded,
            resting_fully_filled: front.volume == 0,
        };
        if fill.resting_fully_filled {
            self.orders.pop_front();
        }
        Some(fill)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Side;
    use chrono::{TimeZone, Utc};

    fn order(id: u64, price: i64, volume: u64) -> Order {
        Order {
            order_id: OrderId(id),
            client_id: ClientId(id * 10),
            symbol: "AAPL".into(),
            side: Side::Buy,
            price: Decimal::from(price),
            volume,
            timestamp: Utc.timestamp_opt(1_700_000_000 + id as i64, 0).unwrap(),
        }
    }

    fn queued_sum(level: &PriceLevel) -> u64 {
        level.iter().map(|o| o.volume).sum()
    }

    #[test]
    fn add_order_appends_and_accumulates_volume() {
        let mut level = PriceLevel::new(Decimal::from(100));
        level.add_order(order(1, 100, 10)).unwrap();
        level.add_order(order(2, 100, 5)).unwrap();
        assert_eq!(level.total_volume(), 15);
        assert_eq!(level.len(), 2);
        assert_eq!(level.priority_order().unwrap().order_id, OrderId(1));
    }

    #[test]
    fn add_order_that_would_overflow_the_total_is_rejected() {
        let mut level = PriceLevel::new(Decimal::from(100));
        level.add_order(order(1, 100, u64::MAX)).unwrap();
        let err = level.add_order(order(2, 100, 1)).unwrap_err();
        assert!(matches!(err, BookError::VolumeOverflow { volume: 1, .. }));
        assert_eq!(level.len(), 1);
        assert_eq!(level.total_volume(), u64::MAX);
    }

    #[test]
    fn add_order_with_wrong_price_is_rejected() {
        let mut level = PriceLevel::new(Decimal::from(100));
        let err = level.add_order(order(1, 101, 10)).unwrap_err();
        assert!(matches!(err, BookError::PriceMismatch { .. }));
        assert!(level.is_empty());
        assert_eq!(level.total_volume(), 0);
    }

    #[test]
    fn remove_order_subtracts_remaining_volume() {
        let mut level = PriceLevel::new(Decimal::from(100));
        level.add_order(order(1, 100, 10)).unwrap();
        level.add_order(order(2, 100, 5)).unwrap();
        let removed = level.remove_order(OrderId(1)).unwrap();
        assert_eq!(removed.volume, 10);
        assert_eq!(level.total_volume(), 5);
        assert!(level.remove_order(OrderId(42)).is_none());
        assert_eq!(level.total_volume(), queued_sum(&level));
    }

    #[test]
    fn update_order_only_reduces() {
        let mut level = PriceLevel::new(Decimal::from(100));
        level.add_order(order(1, 100, 10)).unwrap();
        assert_eq!(level.update_order(OrderId(1), 4).unwrap(), 10);
        assert_eq!(level.total_volume(), 4);
        let err = level.update_order(OrderId(1), 5).unwrap_err();
        assert!(matches!(err, BookError::VolumeIncrease { current: 4, requested: 5, .. }));
        assert_eq!(level.get_order(OrderId(1)).unwrap().volume, 4);
    }

    #[test]
    fn update_order_to_zero_removes_it() {
        let mut level = PriceLevel::new(Decimal::from(100));
        level.add_order(order(1, 100, 10)).unwrap();
        level.update_order(OrderId(1), 0).unwrap();
        assert!(level.is_empty());
        assert_eq!(level.total_volume(), 0);
    }

    #[test]
    fn fill_front_consumes_oldest_first() {
        let mut level = PriceLevel::new(Decimal::from(100));
        level.add_order(order(1, 100, 10)).unwrap();
        level.add_order(order(2, 100, 5)).unwrap();

        let fill = level.fill_front(4).unwrap();
        assert_eq!(fill.resting_order_id, OrderId(1));
        assert_eq!(fill.volume, 4);
        assert!(!fill.resting_fully_filled);
        assert_eq!(level.total_volume(), 11);

        let fill = level.fill_front(100).unwrap();
        assert_eq!(fill.resting_order_id, OrderId(1));
        assert_eq!(fill.volume, 6);
        assert!(fill.resting_fully_filled);
        assert_eq!(level.priority_order().unwrap().order_id, OrderId(2));
        assert_eq!(level.total_volume(), queued_sum(&level));
    }

    #[test]
    fn fill_front_on_empty_level_is_none() {
        let mut level = PriceLevel::new(Decimal::from(100));
        assert!(level.fill_front(1).is_none());
        assert!(level.priority_order().is_none());
    }
}
