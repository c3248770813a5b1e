//! Tick grid: conversion between boundary prices and ladder slots.
//!
//! A book's ladder has one slot per tick from `0` to `max_price`. Prices are
//! validated and turned into a slot index once; everything downstream works on
//! indices, so "is this price on the grid" and "which slot" are exact.

use crate::error::BookError;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

/// Largest ladder (slots per side) a book may allocate.
pub const MAX_LADDER_SLOTS: usize = 10_000_000;

/// Relative tolerance, in ticks, for accepting a price as tick-aligned.
pub fn tick_tolerance() -> Decimal {
    Decimal::new(1, 9)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TickGrid {
    tick: Decimal,
    max_price: Decimal,
    max_index: usize,
}

impl TickGrid {
    pub fn new(max_price: Decimal, tick: Decimal) -> Result<Self, BookError> {
        if tick <= Decimal::ZERO {
            return Err(BookError::InvalidConfig(format!("tick must be positive, got {}", tick)));
        }
        if max_price <= Decimal::ZERO {
            return Err(BookError::InvalidConfig(format!(
                "max price must be positive, got {}",
                max_price
            )));
        }
        let max_index = max_price
            .checked_div(tick)
            .and_then(|slots| slots.floor().to_usize())
            .filter(|&i| i < MAX_LADDER_SLOTS)
            .ok_or_else(|| {
                BookError::InvalidConfig(format!(
                    "max price {} / tick {} exceeds {} slots",
                    max_price, tick, MAX_LADDER_SLOTS
                ))
            })?;
        Ok(Self {
            tick,
            max_price,
            max_index,
        })
    }

    pub fn tick(&self) -> Decimal {
        self.tick
    }

    pub fn max_price(&self) -> Decimal {
        self.max_price
    }

    /// Index of the highest slot.
    pub fn max_index(&self) -> usize {
        self.max_index
    }

    /// Number of slots per side.
    pub fn slots(&self) -> usize {
        self.max_index + 1
    }

    /// Validates `price` and returns its slot.
    pub fn index_of(&self, price: Decimal) -> Result<usize, BookError> {
        if price.is_sign_negative() && !price.is_zero() {
            return Err(BookError::NegativePrice(price));
        }
        if price > self.max_price {
            return Err(BookError::PriceOutOfRange {
                price,
                max_price: self.max_price,
            });
        }
        let nearest = price
            .checked_div(self.tick)
            .ok_or(BookError::PriceOutOfRange {
                price,
                max_price: self.max_price,
            })?
            .round();
        if (nearest * self.tick - price).abs() > self.tick * tick_tolerance() {
            return Err(BookError::OffTick {
                price,
                tick: self.tick,
            });
        }
        match nearest.to_usize() {
            Some(index) if index <= self.max_index => Ok(index),
            _ => Err(BookError::PriceOutOfRange {
                price,
                max_price: self.max_price,
            }),
        }
    }

    /// Price of slot `index`.
    pub fn price_at(&self, index: usize) -> Decimal {
        self.tick * Decimal::from(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn slot_count_covers_zero_through_max_price() {
        let grid = TickGrid::new(d("1000"), d("0.01")).unwrap();
        assert_eq!(grid.max_index(), 100_000);
        assert_eq!(grid.slots(), 100_001);
        assert_eq!(grid.price_at(10_000), d("100.00"));
    }

    #[test]
    fn index_of_on_grid_prices() {
        let grid = TickGrid::new(d("1000"), d("0.01")).unwrap();
        assert_eq!(grid.index_of(d("0")).unwrap(), 0);
        assert_eq!(grid.index_of(d("100.00")).unwrap(), 10_000);
        assert_eq!(grid.index_of(d("101.01")).unwrap(), 10_101);
        assert_eq!(grid.index_of(d("1000")).unwrap(), 100_000);
    }

    #[test]
    fn off_tick_price_is_rejected() {
        let grid = TickGrid::new(d("1000"), d("0.01")).unwrap();
        let err = grid.index_of(d("100.015")).unwrap_err();
        assert!(matches!(err, BookError::OffTick { .. }));
    }

    #[test]
    fn price_within_tolerance_is_accepted() {
        let grid = TickGrid::new(d("1000"), d("0.01")).unwrap();
        // 1e-12 off the grid, well inside 1e-9 ticks
        assert_eq!(grid.index_of(d("100.000000000001")).unwrap(), 10_000);
    }

    #[test]
    fn negative_and_out_of_range_prices_are_rejected() {
        let grid = TickGrid::new(d("1000"), d("0.01")).unwrap();
        assert!(matches!(grid.index_of(d("-0.01")), Err(BookError::NegativePrice(_))));
        assert!(matches!(
            grid.index_of(d("1000.01")),
            Err(BookError::PriceOutOfRange { .. })
        ));
    }

    #[test]
    fn invalid_grids_are_rejected() {
        assert!(TickGrid::new(d("1000"), d("0")).is_err());
        assert!(TickGrid::new(d("0"), d("0.01")).is_err());
        assert!(TickGrid::new(d("1000000"), d("0.00001")).is_err());
        assert!(matches!(
            TickGrid::new(Decimal::MAX, Decimal::new(1, 28)),
            Err(BookError::InvalidConfig(_))
        ));
    }

    #[test]
    fn max_price_off_the_grid_rounds_the_ladder_down() {
        let grid = TickGrid::new(d("10"), d("0.03")).unwrap();
        assert_eq!(grid.max_index(), 333);
        assert!(matches!(
            grid.index_of(d("10")),
            Err(BookError::OffTick { .. })
        ));
    }
}
