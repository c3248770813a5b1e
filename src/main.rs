//! HTTP server for the exchange.
//!
//! Reads [`ServerConfig`] from the environment, starts one book worker per
//! listed symbol and serves the REST and WebSocket routes. Every trade log
//! event is pushed to WebSocket subscribers and handed to a writer thread that
//! prints it to stdout as a JSON line; workers never wait on stdout.

use ladder_exchange::{api, write_json_lines, BroadcastLogSink, ChannelLogSink, Exchange, FanoutLogSink, ServerConfig};
use log::{error, info};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() {
    let _ = env_logger::try_init();
    if let Err(e) = run().await {
        error!("{}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = ServerConfig::from_env()?;
    let feed = BroadcastLogSink::new(config.log_buffer);
    let (stdout, rx) = ChannelLogSink::new(config.log_buffer);
    tokio::task::spawn_blocking(move || write_json_lines(rx, std::io::stdout()));
    let sink = FanoutLogSink::new().with(stdout).with(feed.clone());
    let exchange = Exchange::start(&config.symbols, sink)?;

    let app = api::create_router(exchange, feed);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("listening on http://{} symbols={:?}", addr, config.symbols.iter().map(|s| &s.symbol).collect::<Vec<_>>());
    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}
