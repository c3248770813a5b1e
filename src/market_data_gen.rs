//! Synthetic order flow.
//!
//! Deterministic, configurable stream of on-grid ADD requests for replay
//! tests, property tests and benchmarks. Same seed ⇒ same sequence of orders.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::error::BookError;
use crate::registry::BookRegistry;
use crate::types::{ClientId, NewOrder, Side};

/// Configuration for the synthetic order generator.
/// All ranges are inclusive. Same config + seed produces the same stream.
#[derive(Clone, Debug)]
pub struct GeneratorConfig {
    pub seed: u64,
    pub symbol: String,
    /// Book tick; every generated price is a multiple of it.
    pub tick: Decimal,
    /// Number of orders [`Generator::all_orders`] returns.
    pub num_orders: usize,
    /// Probability of Buy (0.0..=1.0). Sell otherwise.
    pub buy_ratio: f64,
    /// Price band, snapped inward to the tick grid.
    pub price_min: Decimal,
    pub price_max: Decimal,
    pub volume_min: u64,
    pub volume_max: u64,
    /// Client ids are drawn from `0..num_clients`.
    pub num_clients: u64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            symbol: "AAPL".to_string(),
            tick: Decimal::new(1, 2),
            num_orders: 1000,
            buy_ratio: 0.5,
            price_min: Decimal::from(95),
            price_max: Decimal::from(105),
            volume_min: 1,
            volume_max: 100,
            num_clients: 5,
        }
    }
}

/// Deterministic order stream. Create with [`Generator::new`]; iterate to get orders.
pub struct Generator {
    rng: StdRng,
    config: GeneratorConfig,
    min_slot: u64,
    max_slot: u64,
}

impl Generator {
    pub fn new(config: GeneratorConfig) -> Self {
        let rng = StdRng::seed_from_u64(config.seed);
        let (min_slot, max_slot) = if config.tick > Decimal::ZERO {
            let lo = config
                .price_min
                .checked_div(config.tick)
                .and_then(|s| s.ceil().to_u64())
                .unwrap_or(0);
            let hi = config
                .price_max
                .checked_div(config.tick)
                .and_then(|s| s.floor().to_u64())
                .unwrap_or(0);
            (lo, hi.max(lo))
        } else {
            (0, 0)
        };
        Self {
            rng,
            config,
            min_slot,
            max_slot,
        }
    }

    /// Generates the next ADD request. Advances the RNG.
    pub fn next_order(&mut self) -> NewOrder {
        let side = if self.rng.gen::<f64>() < self.config.buy_ratio {
            Side::Buy
        } else {
            Side::Sell
        };
        let slot = self.rng.gen_range(self.min_slot..=self.max_slot);
        let price = self.config.tick * Decimal::from(slot);
        let volume_min = self.config.volume_min.max(1);
        let volume = self.rng.gen_range(volume_min..=self.config.volume_max.max(volume_min));
        let client_id = ClientId(self.rng.gen_range(0..self.config.num_clients.max(1)));
        NewOrder::new(self.config.symbol.clone(), side, price, volume, client_id)
    }

    pub fn take_orders(&mut self, n: usize) -> Vec<NewOrder> {
        (0..n).map(|_| self.next_order()).collect()
    }

    /// Returns `config.num_orders` orders.
    pub fn all_orders(&mut self) -> Vec<NewOrder> {
        self.take_orders(self.config.num_orders)
    }
}

impl Iterator for Generator {
    type Item = NewOrder;

    fn next(&mut self) -> Option<NewOrder> {
        Some(self.next_order())
    }
}

/// Replays ADD requests into the registry. Returns (orders accepted, trades), or
/// the first rejection.
pub fn replay_into_registry(
    registry: &mut BookRegistry,
    orders: impl IntoIterator<Item = NewOrder>,
) -> Result<(usize, usize), BookError> {
    let mut accepted = 0usize;
    let mut trades = 0usize;
    for order in orders {
        let outcome = registry.submit(order)?;
        accepted += 1;
        trades += outcome.trades().count();
    }
    Ok((accepted, trades))
}
