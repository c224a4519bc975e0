//! Relay configuration loaded from environment variables.
//!
//! Follows 12-factor style: all settings come from environment variables
//! (or a `.env` file via `dotenvy`).

use std::net::SocketAddr;
use std::time::Duration;

use crate::api::cors::OriginAllowlist;
use crate::error::RelayError;
use crate::watcher::Network;

/// Default contract emitting `PathzChoosed`.
pub const DEFAULT_CONTRACT_ADDRESS: &str = "0x9017B2224597bA0A71F08f685fD4D17A9ec92Fdd";

/// Top-level relay configuration.
///
/// Loaded once at startup via [`RelayConfig::from_env`].
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Socket address to bind the HTTP server to (e.g. `0.0.0.0:3000`).
    pub listen_addr: SocketAddr,

    /// Alchemy API key. The watcher is disabled and the upgrade endpoint
    /// answers 500 when absent.
    pub api_key: Option<String>,

    /// Network the watcher follows.
    pub network: Network,

    /// Address of the contract whose events are relayed.
    pub contract_address: String,

    /// Delay between two log polls.
    pub poll_interval: Duration,

    /// Maximum number of blocks requested in one `eth_getLogs` call.
    pub max_block_range: u64,

    /// Frames buffered per connection before it is considered dead.
    pub connection_queue_capacity: usize,

    /// Upper bound on a single socket write. A peer that stops reading is
    /// disconnected once a write stalls this long.
    pub send_timeout: Duration,

    /// Origins granted CORS access.
    pub allowed_origins: OriginAllowlist,

    /// Master switch for the upstream event watcher.
    pub watcher_enabled: bool,

    /// Emit logs as JSON lines instead of human-readable text.
    pub json_logs: bool,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            api_key: None,
            network: Network::default(),
            contract_address: DEFAULT_CONTRACT_ADDRESS.to_string(),
            poll_interval: Duration::from_secs(4),
            max_block_range: 500,
            connection_queue_capacity: 64,
            send_timeout: Duration::from_secs(10),
            allowed_origins: OriginAllowlist::default(),
            watcher_enabled: true,
            json_logs: false,
        }
    }
}

impl RelayConfig {
    /// Loads configuration from environment variables.
    ///
    /// Falls back to sensible defaults when a variable is not set.
    /// Calls `dotenvy::dotenv().ok()` to optionally load a `.env` file.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Config`] if `LISTEN_ADDR` cannot be parsed as
    /// a [`SocketAddr`], and [`RelayError::InvalidNetwork`] if
    /// `ALCHEMY_NETWORK` names an unsupported network.
    pub fn from_env() -> Result<Self, RelayError> {
        dotenvy::dotenv().ok();
        let defaults = Self::default();

        let listen_addr = match std::env::var("LISTEN_ADDR") {
            Ok(value) => value
                .parse()
                .map_err(|e| RelayError::Config(format!("LISTEN_ADDR: {e}")))?,
            Err(_) => defaults.listen_addr,
        };

        let api_key = std::env::var("ALCHEMY_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty());

        let network = match std::env::var("ALCHEMY_NETWORK") {
            Ok(value) => value.parse()?,
            Err(_) => defaults.network,
        };

        let contract_address =
            std::env::var("CONTRACT_ADDRESS").unwrap_or(defaults.contract_address);

        let poll_interval = std::env::var("POLL_INTERVAL_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .map_or(defaults.poll_interval, |secs| {
                Duration::from_secs(secs.max(1))
            });
        let max_block_range = parse_env("MAX_BLOCK_RANGE", defaults.max_block_range).max(1);
        let connection_queue_capacity =
            parse_env("CONNECTION_QUEUE_CAPACITY", defaults.connection_queue_capacity);
        let send_timeout = std::env::var("SEND_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .map_or(defaults.send_timeout, |secs| Duration::from_secs(secs.max(1)));

        let allowed_origins = std::env::var("ALLOWED_ORIGINS")
            .map_or(defaults.allowed_origins, |list| OriginAllowlist::from_csv(&list));

        let watcher_enabled = parse_env_bool("WATCHER_ENABLED", defaults.watcher_enabled);
        let json_logs = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

        Ok(Self {
            listen_addr,
            api_key,
            network,
            contract_address,
            poll_interval,
            max_block_range,
            connection_queue_capacity,
            send_timeout,
            allowed_origins,
            watcher_enabled,
            json_logs,
        })
    }
}

/// Parses an environment variable as `T`, returning `default` on missing
/// or invalid values.
fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Parses an environment variable as a boolean. Accepts `"true"`, `"1"`,
/// `"false"`, `"0"` (case-insensitive). Returns `default` otherwise.
fn parse_env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .and_then(|v| parse_bool(&v))
        .unwrap_or(default)
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}
