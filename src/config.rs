//! Server configuration from the environment or a JSON file.
//!
//! - `PORT` (default 8080)
//! - `SYMBOLS`: `SYMBOL:MAX_PRICE:TICK[,...]` (default `AAPL:1000:0.01`)
//! - `LOG_BUFFER`: trade log handoff capacity (default 1024)
//! - `EXCHANGE_CONFIG`: path to a JSON [`ServerConfig`]; overrides the above

use crate::error::ConfigError;
use rust_decimal::Decimal;
use std::path::Path;

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_LOG_BUFFER: usize = 1024;
pub const DEFAULT_SYMBOLS: &str = "AAPL:1000:0.01";

/// One listed symbol: its ladder spans `0..=max_price` in steps of `tick`.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SymbolConfig {
    pub symbol: String,
    pub max_price: Decimal,
    pub tick: Decimal,
}

impl SymbolConfig {
    pub fn new(symbol: impl Into<String>, max_price: Decimal, tick: Decimal) -> Self {
        Self {
            symbol: symbol.into(),
            max_price,
            tick,
        }
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_log_buffer")]
    pub log_buffer: usize,
    pub symbols: Vec<SymbolConfig>,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_log_buffer() -> usize {
    DEFAULT_LOG_BUFFER
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`ServerConfig::from_env`] with an injectable variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        if let Some(path) = lookup("EXCHANGE_CONFIG") {
            return Self::load(path);
        }
        let port = match lookup("PORT") {
            Some(v) => v.parse().map_err(|_| ConfigError::Invalid {
                key: "PORT",
                message: format!("{:?} is not a port number", v),
            })?,
            None => DEFAULT_PORT,
        };
        let log_buffer = match lookup("LOG_BUFFER") {
            Some(v) => v.parse().map_err(|_| ConfigError::Invalid {
                key: "LOG_BUFFER",
                message: format!("{:?} is not a size", v),
            })?,
            None => DEFAULT_LOG_BUFFER,
        };
        let symbols = parse_symbols(&lookup("SYMBOLS").unwrap_or_else(|| DEFAULT_SYMBOLS.to_string()))?;
        Ok(Self {
            port,
            log_buffer,
            symbols,
        })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        serde_json::from_str(&data).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }
}

/// Parses `SYMBOL:MAX_PRICE:TICK` entries separated by commas.
pub fn parse_symbols(list: &str) -> Result<Vec<SymbolConfig>, ConfigError> {
    let invalid = |message: String| ConfigError::Invalid {
        key: "SYMBOLS",
        message,
    };
    let mut symbols = Vec::new();
    for entry in list.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let parts: Vec<&str> = entry.split(':').map(str::trim).collect();
        let [symbol, max_price, tick] = parts.as_slice() else {
            return Err(invalid(format!("{:?} is not SYMBOL:MAX_PRICE:TICK", entry)));
        };
        if symbol.is_empty() {
            return Err(invalid(format!("{:?} has an empty symbol", entry)));
        }
        let max_price: Decimal = max_price
            .parse()
            .map_err(|_| invalid(format!("bad max price in {:?}", entry)))?;
        let tick: Decimal = tick
            .parse()
            .map_err(|_| invalid(format!("bad tick in {:?}", entry)))?;
        symbols.push(SymbolConfig::new(*symbol, max_price, tick));
    }
    if symbols.is_empty() {
        return Err(invalid("no symbols configured".into()));
    }
    Ok(symbols)
}
