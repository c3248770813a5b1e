//! Property-based and deterministic invariant tests.
//!
//! Uses proptest to generate random add/cancel/edit sequences and asserts after
//! every step: level totals match their orders, the book is never crossed, the
//! best-price cursors point at the extreme non-empty levels, order ids are
//! strictly increasing, and a mirror fed only the trade log agrees with the book.

use ladder_exchange::market_data_gen::{replay_into_registry, Generator, GeneratorConfig};
use ladder_exchange::{BookRegistry, ClientId, MarketMirror, OrderBook, OrderId, Side, TradeLog};
use proptest::prelude::*;
use rust_decimal::Decimal;

const SYMBOL: &str = "TEST";

#[derive(Clone, Debug)]
enum Op {
    Add { side: Side, price: u32, volume: u64 },
    Cancel { pick: usize },
    Edit { pick: usize, keep_percent: u64 },
}

fn side() -> impl Strategy<Value = Side> {
    prop_oneof![Just(Side::Buy), Just(Side::Sell)]
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        6 => (side(), 40u32..=60, 1u64..=50).prop_map(|(side, price, volume)| Op::Add { side, price, volume }),
        2 => any::<usize>().prop_map(|pick| Op::Cancel { pick }),
        2 => (any::<usize>(), 0u64..=100).prop_map(|(pick, keep_percent)| Op::Edit { pick, keep_percent }),
    ]
}

fn registry() -> BookRegistry {
    let mut registry = BookRegistry::new();
    registry.add_symbol(SYMBOL, Decimal::from(100), Decimal::ONE).unwrap();
    registry
}

/// Invariant: every level's total equals the sum of its orders, and no resting order has zero volume.
fn assert_level_accounting(book: &OrderBook) {
    for side in [Side::Buy, Side::Sell] {
        for level in book.levels(side) {
            let sum: u64 = level.iter().map(|o| o.volume).sum();
            assert_eq!(level.total_volume(), sum, "level {} total", level.price());
            assert!(level.iter().all(|o| o.volume > 0 && o.price == level.price() && o.side == side));
        }
    }
}

/// Invariant: best_bid < best_ask when both exist, and both are the extreme non-empty levels.
fn assert_best_prices(book: &OrderBook) {
    let highest_bid = book.levels(Side::Buy).iter().rev().find(|l| !l.is_empty()).map(|l| l.price());
    let lowest_ask = book.levels(Side::Sell).iter().find(|l| !l.is_empty()).map(|l| l.price());
    assert_eq!(book.best_bid_price(), highest_bid);
    assert_eq!(book.best_ask_price(), lowest_ask);
    if let (Some(bid), Some(ask)) = (highest_bid, lowest_ask) {
        assert!(bid < ask, "crossed book: bid {} ask {}", bid, ask);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_invariants_hold_after_every_operation(ops in prop::collection::vec(op(), 1..120)) {
        let mut registry = registry();
        let mut live: Vec<OrderId> = Vec::new();
        let mut last_id: Option<OrderId> = None;

        for op in ops {
            match op {
                Op::Add { side, price, volume } => {
                    let id = registry
                        .add_order(SYMBOL, side, Decimal::from(price), volume, ClientId(1))
                        .unwrap();
                    if let Some(last) = last_id {
                        prop_assert!(id > last);
                    }
                    last_id = Some(id);
                    live.push(id);
                }
                Op::Cancel { pick } if !live.is_empty() => {
                    let id = live[pick % live.len()];
                    let resting = registry.get_order(id).is_some();
                    prop_assert_eq!(registry.cancel_order(SYMBOL, id).is_ok(), resting);
                }
                Op::Edit { pick, keep_percent } if !live.is_empty() => {
                    let id = live[pick % live.len()];
                    if let Some(volume) = registry.get_order(id).map(|o| o.volume) {
                        registry.edit_order(SYMBOL, id, volume * keep_percent / 100).unwrap();
                    } else {
                        prop_assert!(registry.edit_order(SYMBOL, id, 0).is_err());
                    }
                }
                _ => {}
            }
            live.retain(|id| registry.get_order(*id).is_some());

            let book = registry.book(SYMBOL).unwrap();
            assert_level_accounting(book);
            assert_best_prices(book);
            prop_assert_eq!(book.len(), live.len());
        }

        // Reads are idempotent.
        let before = registry.snapshot(SYMBOL, None).unwrap();
        let log_len = registry.logs().len();
        for id in &live {
            let first = registry.get_order(*id).cloned();
            prop_assert_eq!(registry.get_order(*id).cloned(), first);
        }
        let book = registry.book(SYMBOL).unwrap();
        prop_assert_eq!(book.best_bid(), registry.best_bid(SYMBOL).unwrap());
        prop_assert_eq!(book.best_ask(), registry.best_ask(SYMBOL).unwrap());
        prop_assert_eq!(book.best_bid_price(), book.best_bid_price());
        prop_assert_eq!(book.best_ask_price(), book.best_ask_price());
        prop_assert_eq!(registry.snapshot(SYMBOL, None).unwrap(), before);
        prop_assert_eq!(registry.logs().len(), log_len);

        let mut mirror = MarketMirror::new();
        mirror.apply_all(registry.logs());
        prop_assert_eq!(mirror.snapshot(SYMBOL, None), registry.snapshot(SYMBOL, None).unwrap());
    }

    /// Adding a non-crossing order and canceling it leaves the book exactly as it was.
    #[test]
    fn prop_add_then_cancel_round_trips(
        setup in prop::collection::vec((side(), 40u32..=60, 1u64..=50), 0..40),
        side in side(),
        volume in 1u64..=50,
    ) {
        let mut registry = registry();
        for (s, price, v) in setup {
            registry.add_order(SYMBOL, s, Decimal::from(price), v, ClientId(1)).unwrap();
        }
        let book = registry.book(SYMBOL).unwrap();
        // Deepest price on our own side never crosses.
        let price = match side {
            Side::Buy => Decimal::ZERO,
            Side::Sell => book.max_price(),
        };
        let before = registry.snapshot(SYMBOL, None).unwrap();
        let events_before = registry.logs().len();

        let id = registry.add_order(SYMBOL, side, price, volume, ClientId(2)).unwrap();
        registry.cancel_order(SYMBOL, id).unwrap();

        prop_assert_eq!(registry.snapshot(SYMBOL, None).unwrap(), before);
        let new_events = &registry.logs()[events_before..];
        prop_assert_eq!(new_events.len(), 2);
        prop_assert!(matches!(new_events[0], TradeLog::Add(_)));
        prop_assert!(matches!(new_events[1], TradeLog::Cancel(_)));
    }
}

/// Deterministic replay: same seed ⇒ same trades and same final book.
#[test]
fn deterministic_replay_same_seed_same_outcome() {
    let config = GeneratorConfig {
        seed: 999,
        symbol: SYMBOL.to_string(),
        tick: Decimal::ONE,
        price_min: Decimal::from(40),
        price_max: Decimal::from(60),
        num_orders: 300,
        ..Default::default()
    };

    let mut registry1 = registry();
    let (accepted1, trades1) = replay_into_registry(&mut registry1, Generator::new(config.clone()).all_orders()).unwrap();
    let mut registry2 = registry();
    let (accepted2, trades2) = replay_into_registry(&mut registry2, Generator::new(config).all_orders()).unwrap();

    assert_eq!(accepted1, 300);
    assert_eq!((accepted1, trades1), (accepted2, trades2));
    assert_eq!(
        registry1.snapshot(SYMBOL, None).unwrap(),
        registry2.snapshot(SYMBOL, None).unwrap()
    );
    let traded1: u64 = registry1.logs().iter().filter_map(TradeLog::as_trade).map(|t| t.volume).sum();
    let traded2: u64 = registry2.logs().iter().filter_map(TradeLog::as_trade).map(|t| t.volume).sum();
    assert_eq!(traded1, traded2);
}
