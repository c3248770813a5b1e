//! Worker-per-symbol exchange.
//!
//! Each symbol's [`OrderBook`] is owned by one tokio task that drains a bounded
//! command channel; callers get replies on oneshot channels. Books never share
//! state, so different symbols match in parallel while each book sees its
//! operations strictly in arrival order. Order ids come from a shared atomic
//! counter; the routing table (order id -> worker) is written only by the
//! worker that owns the order.

use crate::clock::{Clock, SystemClock};
use crate::config::SymbolConfig;
use crate::error::{BookError, ExchangeError};
use crate::order_book::{AddOutcome, BookSnapshot, OrderBook};
use crate::request::{Request, Response};
use crate::sink::LogSink;
use crate::trade_log::TradeLog;
use crate::types::{ClientId, NewOrder, Order, OrderId, Side};
use log::{debug, info, warn};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::{mpsc, oneshot};

/// Per-worker command buffer.
pub const COMMAND_BUFFER: usize = 1024;

/// Best prices of one book. Empty sides report `0` (bid) and `max_price` (ask).
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Quote {
    pub symbol: String,
    pub best_bid: Decimal,
    pub best_ask: Decimal,
}

#[derive(Debug)]
enum Command {
    Add {
        order: Order,
        reply: oneshot::Sender<Result<AddOutcome, BookError>>,
    },
    Cancel {
        order_id: OrderId,
        reply: oneshot::Sender<Result<(), BookError>>,
    },
    Edit {
        order_id: OrderId,
        new_volume: u64,
        reply: oneshot::Sender<Result<(), BookError>>,
    },
    GetOrder {
        order_id: OrderId,
        reply: oneshot::Sender<Option<Order>>,
    },
    Quote {
        reply: oneshot::Sender<Quote>,
    },
    Snapshot {
        depth: Option<usize>,
        reply: oneshot::Sender<BookSnapshot>,
    },
}

type Routes = Arc<Mutex<HashMap<OrderId, usize>>>;

fn lock(routes: &Routes) -> MutexGuard<'_, HashMap<OrderId, usize>> {
    // A panicked worker cannot leave the map half-written; keep serving.
    routes.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

struct BookWorker {
    slot: usize,
    book: OrderBook,
    routes: Routes,
    sink: Arc<dyn LogSink>,
}

impl BookWorker {
    async fn run(mut self, mut rx: mpsc::Receiver<Command>) {
        debug!("{} worker started", self.book.symbol());
        while let Some(cmd) = rx.recv().await {
            self.handle(cmd);
        }
        info!("{} worker stopped", self.book.symbol());
    }

    fn handle(&mut self, cmd: Command) {
        match cmd {
            Command::Add { order, reply } => {
                let _ = reply.send(self.add(order));
            }
            Command::Cancel { order_id, reply } => {
                let result = self.book.cancel_order(order_id).map(|event| {
                    lock(&self.routes).remove(&order_id);
                    self.sink.record(&event);
                });
                let _ = reply.send(result);
            }
            Command::Edit {
                order_id,
                new_volume,
                reply,
            } => {
                let result = self.book.edit_order(order_id, new_volume).map(|event| {
                    if new_volume == 0 {
                        lock(&self.routes).remove(&order_id);
                    }
                    self.sink.record(&event);
                });
                let _ = reply.send(result);
            }
            Command::GetOrder { order_id, reply } => {
                let _ = reply.send(self.book.get_order(order_id).cloned());
            }
            Command::Quote { reply } => {
                let _ = reply.send(Quote {
                    symbol: self.book.symbol().to_string(),
                    best_bid: self.book.best_bid(),
                    best_ask: self.book.best_ask(),
                });
            }
            Command::Snapshot { depth, reply } => {
                let _ = reply.send(self.book.snapshot(depth));
            }
        }
    }

    fn add(&mut self, order: Order) -> Result<AddOutcome, BookError> {
        let outcome = self.book.add_order(order)?;
        {
            let mut routes = lock(&self.routes);
            for filled in &outcome.filled {
                routes.remove(filled);
            }
            if outcome.resting_volume > 0 {
                routes.insert(outcome.order_id, self.slot);
            }
        }
        for event in &outcome.events {
            if let TradeLog::Trade(trade) = event {
                info!(
                    "trade symbol={} price={} volume={} resting_order={} aggressor_order={}",
                    trade.symbol, trade.price, trade.volume, trade.resting_order_id, trade.aggressor_order_id
                );
            }
            self.sink.record(event);
        }
        Ok(outcome)
    }
}

struct Inner {
    symbols: Vec<String>,
    by_symbol: HashMap<String, usize>,
    workers: Vec<mpsc::Sender<Command>>,
    next_order_id: AtomicU64,
    routes: Routes,
    clock: Arc<dyn Clock>,
}

/// Handle to the running exchange. Cheap to clone; workers stop once every
/// handle is dropped.
#[derive(Clone)]
pub struct Exchange {
    inner: Arc<Inner>,
}

impl Exchange {
    /// Builds every book and spawns one worker per symbol on the current
    /// tokio runtime. Every event goes to `sink`.
    pub fn start(symbols: &[SymbolConfig], sink: impl LogSink + 'static) -> Result<Self, BookError> {
        Self::start_with_clock(symbols, sink, SystemClock)
    }

    /// Like [`Exchange::start`], with arrival times taken from `clock`.
    pub fn start_with_clock(
        symbols: &[SymbolConfig],
        sink: impl LogSink + 'static,
        clock: impl Clock + 'static,
    ) -> Result<Self, BookError> {
        let sink: Arc<dyn LogSink> = Arc::new(sink);
        let routes: Routes = Arc::new(Mutex::new(HashMap::new()));
        let mut books = Vec::with_capacity(symbols.len());
        let mut by_symbol = HashMap::new();
        for config in symbols {
            if by_symbol.contains_key(&config.symbol) {
                return Err(BookError::DuplicateSymbol(config.symbol.clone()));
            }
            by_symbol.insert(config.symbol.clone(), books.len());
            books.push(OrderBook::new(&config.symbol, config.max_price, config.tick)?);
        }

        let mut workers = Vec::with_capacity(books.len());
        for (slot, book) in books.into_iter().enumerate() {
            let (tx, rx) = mpsc::channel(COMMAND_BUFFER);
            info!("listing {} max_price={} tick={}", book.symbol(), book.max_price(), book.tick());
            let worker = BookWorker {
                slot,
                book,
                routes: Arc::clone(&routes),
                sink: Arc::clone(&sink),
            };
            tokio::spawn(worker.run(rx));
            workers.push(tx);
        }

        Ok(Self {
            inner: Arc::new(Inner {
                symbols: symbols.iter().map(|c| c.symbol.clone()).collect(),
                by_symbol,
                workers,
                next_order_id: AtomicU64::new(1),
                routes,
                clock: Arc::new(clock),
            }),
        })
    }

    pub fn symbols(&self) -> &[String] {
        &self.inner.symbols
    }

    pub async fn add_order(
        &self,
        symbol: &str,
        side: Side,
        price: Decimal,
        volume: u64,
        client_id: ClientId,
    ) -> Result<OrderId, ExchangeError> {
        self.submit(NewOrder::new(symbol, side, price, volume, client_id))
            .await
            .map(|outcome| outcome.order_id)
    }

    /// Assigns an id and arrival time and hands the order to its symbol's worker.
    pub async fn submit(&self, request: NewOrder) -> Result<AddOutcome, ExchangeError> {
        let slot = self.slot(&request.symbol)?;
        let order_id = OrderId(self.inner.next_order_id.fetch_add(1, Ordering::Relaxed));
        let order = Order::from_request(request, order_id, self.inner.clock.now());
        let result = self
            .call(slot, |reply| Command::Add { order, reply })
            .await?;
        result.map_err(|e| {
            warn!("order rejected order_id={}: {}", order_id, e);
            ExchangeError::Book(e)
        })
    }

    pub async fn cancel_order(&self, symbol: &str, order_id: OrderId) -> Result<(), ExchangeError> {
        let slot = self.route(symbol, order_id)?;
        self.call(slot, |reply| Command::Cancel { order_id, reply })
            .await?
            .map_err(ExchangeError::from)
    }

    /// Reduces a resting order to `new_volume`. Zero removes it.
    pub async fn edit_order(&self, symbol: &str, order_id: OrderId, new_volume: u64) -> Result<(), ExchangeError> {
        let slot = self.route(symbol, order_id)?;
        self.call(slot, |reply| Command::Edit {
            order_id,
            new_volume,
            reply,
        })
        .await?
        .map_err(ExchangeError::from)
    }

    /// A resting order, looked up by id alone.
    pub async fn get_order(&self, order_id: OrderId) -> Result<Option<Order>, ExchangeError> {
        let Some(slot) = lock(&self.inner.routes).get(&order_id).copied() else {
            return Ok(None);
        };
        self.call(slot, |reply| Command::GetOrder { order_id, reply }).await
    }

    pub async fn quote(&self, symbol: &str) -> Result<Quote, ExchangeError> {
        let slot = self.slot(symbol)?;
        self.call(slot, |reply| Command::Quote { reply }).await
    }

    pub async fn best_bid(&self, symbol: &str) -> Result<Decimal, ExchangeError> {
        Ok(self.quote(symbol).await?.best_bid)
    }

    pub async fn best_ask(&self, symbol: &str) -> Result<Decimal, ExchangeError> {
        Ok(self.quote(symbol).await?.best_ask)
    }

    pub async fn snapshot(&self, symbol: &str, depth: Option<usize>) -> Result<BookSnapshot, ExchangeError> {
        let slot = self.slot(symbol)?;
        self.call(slot, |reply| Command::Snapshot { depth, reply }).await
    }

    pub async fn process(&self, request: Request) -> Result<Response, ExchangeError> {
        match request {
            Request::Add(new_order) => {
                let outcome = self.submit(new_order).await?;
                Ok(Response::Added {
                    order_id: outcome.order_id,
                })
            }
            Request::Cancel(cancel) => {
                self.cancel_order(&cancel.symbol, cancel.order_id).await?;
                Ok(Response::Ack)
            }
            Request::Edit(edit) => {
                self.edit_order(&edit.symbol, edit.order_id, edit.new_volume).await?;
                Ok(Response::Ack)
            }
        }
    }

    fn slot(&self, symbol: &str) -> Result<usize, BookError> {
        self.inner
            .by_symbol
            .get(symbol)
            .copied()
            .ok_or_else(|| BookError::UnknownSymbol(symbol.to_string()))
    }

    fn route(&self, symbol: &str, order_id: OrderId) -> Result<usize, BookError> {
        self.slot(symbol)?;
        let slot = lock(&self.inner.routes)
            .get(&order_id)
            .copied()
            .ok_or(BookError::UnknownOrder(order_id))?;
        let actual = &self.inner.symbols[slot];
        if actual != symbol {
            return Err(BookError::SymbolMismatch {
                order_id,
                requested: symbol.to_string(),
                actual: actual.clone(),
            });
        }
        Ok(slot)
    }

    async fn call<T>(
        &self,
        slot: usize,
        command: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, ExchangeError> {
        let unavailable = || ExchangeError::Unavailable(self.inner.symbols[slot].clone());
        let (reply, rx) = oneshot::channel();
        self.inner.workers[slot]
            .send(command(reply))
            .await
            .map_err(|_| unavailable())?;
        rx.await.map_err(|_| unavailable())
    }
}
