//! Trade log sinks.
//!
//! The core calls [`LogSink::record`] once per event, in emission order, and
//! never waits on delivery. Implementations must not block: the channel and
//! broadcast sinks hand events off without awaiting the consumer.

use crate::trade_log::TradeLog;
use log::{debug, warn};
use std::io::{self, Write};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{broadcast, mpsc};

pub trait LogSink: Send + Sync {
    fn record(&self, event: &TradeLog);
}

impl<S: LogSink + ?Sized> LogSink for Arc<S> {
    fn record(&self, event: &TradeLog) {
        (**self).record(event)
    }
}

impl<S: LogSink + ?Sized> LogSink for Box<S> {
    fn record(&self, event: &TradeLog) {
        (**self).record(event)
    }
}

fn write_json_line(out: &mut impl Write, event: &TradeLog) -> io::Result<()> {
    serde_json::to_writer(&mut *out, event)?;
    writeln!(out)
}

/// Writes one JSON line per event to stdout, on the caller's thread. Write
/// errors are logged, never raised. Prefer [`write_json_lines`] behind a
/// [`ChannelLogSink`] when stdout may block.
pub struct StdoutLogSink;

impl LogSink for StdoutLogSink {
    fn record(&self, event: &TradeLog) {
        if let Err(e) = write_json_line(&mut io::stdout().lock(), event) {
            warn!("cannot write {} event to stdout: {}", event.kind(), e);
        }
    }
}

/// Drains `rx` into `out` as JSON lines until every sender is gone. Blocks the
/// calling thread; run it under `tokio::task::spawn_blocking`. Stops at the
/// first write error and returns the number of events written.
pub fn write_json_lines(mut rx: mpsc::Receiver<TradeLog>, mut out: impl Write) -> u64 {
    let mut written = 0;
    while let Some(event) = rx.blocking_recv() {
        if let Err(e) = write_json_line(&mut out, &event).and_then(|()| out.flush()) {
            warn!("trade log writer stopped after {} events: {}", written, e);
            break;
        }
        written += 1;
    }
    written
}

/// In-memory sink for tests. Clone shares the same backing buffer.
#[derive(Clone, Default)]
pub struct InMemoryLogSink {
    events: Arc<Mutex<Vec<TradeLog>>>,
}

impl InMemoryLogSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<TradeLog> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    pub fn clear(&self) {
        if let Ok(mut events) = self.events.lock() {
            events.clear();
        }
    }
}

impl LogSink for InMemoryLogSink {
    fn record(&self, event: &TradeLog) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}

/// Bounded handoff to an async consumer. A full buffer drops the event rather
/// than stall matching; drops are counted.
pub struct ChannelLogSink {
    tx: mpsc::Sender<TradeLog>,
    dropped: AtomicU64,
}

impl ChannelLogSink {
    /// Returns the sink and the receiving end the consumer drains.
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<TradeLog>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (
            Self {
                tx,
                dropped: AtomicU64::new(0),
            },
            rx,
        )
    }

    /// Events discarded because the buffer was full or the consumer had gone.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl LogSink for ChannelLogSink {
    fn record(&self, event: &TradeLog) {
        match self.tx.try_send(event.clone()) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(event)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                warn!("trade log buffer full, dropped {} event for {}", event.kind(), event.symbol());
            }
            Err(mpsc::error::TrySendError::Closed(event)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                debug!("trade log consumer gone, dropped {} event", event.kind());
            }
        }
    }
}

/// Fan-out to any number of live subscribers (WebSocket feed). Subscribers that
/// fall behind lose the oldest events.
#[derive(Clone)]
pub struct BroadcastLogSink {
    tx: broadcast::Sender<TradeLog>,
}

impl BroadcastLogSink {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TradeLog> {
        self.tx.subscribe()
    }
}

impl LogSink for BroadcastLogSink {
    fn record(&self, event: &TradeLog) {
        // No subscribers is not an error.
        let _ = self.tx.send(event.clone());
    }
}

/// Forwards every event to each inner sink in order.
#[derive(Default)]
pub struct FanoutLogSink {
    sinks: Vec<Box<dyn LogSink>>,
}

impl FanoutLogSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: impl LogSink + 'static) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }
}

impl LogSink for FanoutLogSink {
    fn record(&self, event: &TradeLog) {
        for sink in &self.sinks {
            sink.record(event);
        }
    }
}
