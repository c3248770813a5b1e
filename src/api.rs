//! HTTP and WebSocket surface over an [`Exchange`].
//!
//! Used by the binary and by integration tests. [`create_router`] passes the
//! exchange and the log feed to handlers as extensions and returns a plain
//! `Router<()>`.
//!
//! Errors come back as `{"error": message}`: 400 for rejected input, 404 for an
//! unknown symbol or order, 503 when a symbol's worker has stopped.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Extension, Path, Query,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use log::{debug, warn};
use tokio::sync::broadcast;

use crate::error::ExchangeError;
use crate::exchange::Exchange;
use crate::request::{CancelRequest, EditRequest, Request};
use crate::sink::BroadcastLogSink;
use crate::trade_log::Trade;
use crate::types::{NewOrder, OrderId};

#[derive(Clone)]
pub struct AppState {
    pub(crate) exchange: Exchange,
    pub(crate) feed: BroadcastLogSink,
}

/// Builds the router. `feed` must be the broadcast sink the exchange records to;
/// `/ws/logs` subscribers read from it.
pub fn create_router(exchange: Exchange, feed: BroadcastLogSink) -> Router<()> {
    let state = AppState { exchange, feed };
    Router::new()
        .route("/health", get(health))
        .route("/orders", post(add_order))
        .route("/orders/cancel", post(cancel_order))
        .route("/orders/edit", post(edit_order))
        .route("/orders/:order_id", get(get_order))
        .route("/requests", post(process_request))
        .route("/books/:symbol", get(book_snapshot))
        .route("/books/:symbol/quote", get(book_quote))
        .route("/ws/logs", get(ws_logs))
        .layer(Extension(state))
}

fn error_response(err: ExchangeError) -> Response {
    let status = match &err {
        ExchangeError::Book(e) if e.is_not_found() => StatusCode::NOT_FOUND,
        ExchangeError::Book(e) if e.is_validation() => StatusCode::BAD_REQUEST,
        ExchangeError::Book(_) => StatusCode::INTERNAL_SERVER_ERROR,
        ExchangeError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
    };
    debug!("request failed with {}: {}", status, err);
    (status, Json(serde_json::json!({ "error": err.to_string() }))).into_response()
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

async fn add_order(Extension(state): Extension<AppState>, Json(body): Json<NewOrder>) -> Response {
    match state.exchange.submit(body).await {
        Ok(outcome) => {
            #[derive(serde::Serialize)]
            struct Out {
                order_id: OrderId,
                resting_volume: u64,
                trades: Vec<Trade>,
            }
            let out = Out {
                order_id: outcome.order_id,
                resting_volume: outcome.resting_volume,
                trades: outcome.trades().cloned().collect(),
            };
            (StatusCode::OK, Json(out)).into_response()
        }
        Err(e) => error_response(e),
    }
}

async fn cancel_order(Extension(state): Extension<AppState>, Json(body): Json<CancelRequest>) -> Response {
    respond(state.exchange.process(Request::Cancel(body)).await)
}

async fn edit_order(Extension(state): Extension<AppState>, Json(body): Json<EditRequest>) -> Response {
    respond(state.exchange.process(Request::Edit(body)).await)
}

async fn process_request(Extension(state): Extension<AppState>, Json(body): Json<Request>) -> Response {
    respond(state.exchange.process(body).await)
}

fn respond<T: serde::Serialize>(result: Result<T, ExchangeError>) -> Response {
    match result {
        Ok(body) => (StatusCode::OK, Json(body)).into_response(),
        Err(e) => error_response(e),
    }
}

async fn get_order(Extension(state): Extension<AppState>, Path(order_id): Path<u64>) -> Response {
    let order_id = OrderId(order_id);
    match state.exchange.get_order(order_id).await {
        Ok(Some(order)) => (StatusCode::OK, Json(order)).into_response(),
        Ok(None) => error_response(crate::error::BookError::UnknownOrder(order_id).into()),
        Err(e) => error_response(e),
    }
}

#[derive(serde::Deserialize)]
struct DepthQuery {
    depth: Option<usize>,
}

async fn book_snapshot(
    Extension(state): Extension<AppState>,
    Path(symbol): Path<String>,
    Query(query): Query<DepthQuery>,
) -> Response {
    respond(state.exchange.snapshot(&symbol, query.depth).await)
}

async fn book_quote(Extension(state): Extension<AppState>, Path(symbol): Path<String>) -> Response {
    respond(state.exchange.quote(&symbol).await)
}

#[derive(serde::Deserialize)]
struct FeedQuery {
    symbol: Option<String>,
}

/// Streams every trade log event as a JSON text frame; `?symbol=` narrows the feed.
async fn ws_logs(
    ws: WebSocketUpgrade,
    Extension(state): Extension<AppState>,
    Query(query): Query<FeedQuery>,
) -> Response {
    // Subscribe before the upgrade so nothing recorded after the handshake is missed.
    let rx = state.feed.subscribe();
    ws.on_upgrade(move |socket| stream_logs(socket, rx, query.symbol))
}

async fn stream_logs(
    mut socket: WebSocket,
    mut rx: broadcast::Receiver<crate::trade_log::TradeLog>,
    symbol: Option<String>,
) {
    loop {
        tokio::select! {
            event = rx.recv() => match event {
                Ok(event) => {
                    if symbol.as_deref().is_some_and(|s| s != event.symbol()) {
                        continue;
                    }
                    let text = match serde_json::to_string(&event) {
                        Ok(text) => text,
                        Err(e) => {
                            warn!("cannot serialize {} event: {}", event.kind(), e);
                            continue;
                        }
                    };
                    if socket.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("trade log subscriber lagged, skipped {} events", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                Some(Ok(_)) => {}
            },
        }
    }
    debug!("trade log subscriber disconnected");
}
