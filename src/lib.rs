//! # Ladder Exchange
//!
//! Multi-symbol limit order matching engine. Each symbol's book is a fixed
//! ladder of price levels (one per tick from `0` to a configured max price);
//! orders match by price-time priority and every mutation is reported as a
//! [`TradeLog`] event.
//!
//! ## Entry points
//!
//! - [`BookRegistry`]: sequential, one call at a time. Create with
//!   [`BookRegistry::new`], list symbols with [`BookRegistry::add_symbol`], then
//!   [`BookRegistry::add_order`], [`BookRegistry::cancel_order`] and
//!   [`BookRegistry::edit_order`].
//! - [`Exchange`]: one tokio worker per symbol, same operations as async calls.
//!
//! ## Example
//!
//! ```rust
//! use ladder_exchange::{BookRegistry, ClientId, Side, TradeLog};
//! use rust_decimal::Decimal;
//!
//! let mut registry = BookRegistry::new();
//! registry.add_symbol("AAPL", Decimal::from(1000), Decimal::new(1, 2)).unwrap();
//!
//! let sell = registry.add_order("AAPL", Side::Sell, Decimal::new(10100, 2), 100, ClientId(1)).unwrap();
//! registry.add_order("AAPL", Side::Buy, Decimal::new(10100, 2), 40, ClientId(2)).unwrap();
//!
//! assert_eq!(registry.get_order(sell).map(|o| o.volume), Some(60));
//! assert!(matches!(registry.logs().last(), Some(TradeLog::Trade(_))));
//! ```
//!
//! ## Lower-level API
//!
//! [`OrderBook`] can be used directly if you assign order ids and timestamps yourself.

pub mod api;
pub mod clock;
pub mod config;
pub mod error;
pub mod exchange;
pub mod market_data_gen;
pub mod matching;
pub mod mirror;
pub mod order_book;
pub mod price;
pub mod price_level;
pub mod registry;
pub mod request;
pub mod sink;
pub mod trade_log;
pub mod types;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{ServerConfig, SymbolConfig};
pub use error::{BookError, ConfigError, ExchangeError};
pub use exchange::{Exchange, Quote};
pub use market_data_gen::{replay_into_registry, Generator, GeneratorConfig};
pub use matching::match_order;
pub use mirror::MarketMirror;
pub use order_book::{AddOutcome, BookSnapshot, LevelSummary, OrderBook};
pub use price::TickGrid;
pub use price_level::{Fill, PriceLevel};
pub use registry::BookRegistry;
pub use request::{CancelRequest, EditRequest, Request, Response};
pub use sink::{write_json_lines, BroadcastLogSink, ChannelLogSink, FanoutLogSink, InMemoryLogSink, LogSink, StdoutLogSink};
pub use trade_log::{OrderAdded, OrderCanceled, OrderEdited, Trade, TradeLog};
pub use types::{ClientId, NewOrder, Order, OrderId, Side};
