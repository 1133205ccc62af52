//! Configuration for the match server.
//!
//! For now this is intentionally simple: you can either use defaults
//! or override via a few environment variables:
//!
//! - `FOURLINE_BIND_ADDR`      (default: "0.0.0.0")
//! - `FOURLINE_PORT`           (default: "8080")
//! - `FOURLINE_MAX_CLIENTS`    (default: "1024")
//! - `FOURLINE_MATCH_WAIT_SECS` (default: "10")
//! - `FOURLINE_BOT_DELAY_MS`   (default: "1000")
//! - `FOURLINE_GRACE_SECS`     (default: "30")

use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Server configuration.
///
/// The three timings are part of the protocol contract (matchmaking
/// wait budget, bot "thinking" delay, disconnect grace period); tests
/// construct a `Config` directly with shortened values.
#[derive(Debug, Clone)]
pub struct Config {
    /// IP address / interface to bind to (e.g. "0.0.0.0" or "127.0.0.1").
    pub bind_addr: String,

    /// TCP port to listen on.
    pub port: u16,

    /// Maximum number of simultaneously connected clients.
    pub max_clients: usize,

    /// How long a lone player waits for a human opponent before being
    /// assigned the bot.
    pub match_wait: Duration,

    /// Delay before the bot plays its reply.
    pub bot_delay: Duration,

    /// How long a disconnected player may reconnect before forfeiting.
    pub grace_period: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            bind_addr: "0.0.0.0".to_string(),
            port: 8080,
            max_clients: 1024,
            match_wait: Duration::from_secs(10),
            bot_delay: Duration::from_millis(1000),
            grace_period: Duration::from_secs(30),
        }
    }
}

impl Config {
    /// Construct a `Config` from environment variables, falling back
    /// to the defaults.
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Config::default();
        let bind_addr = env::var("FOURLINE_BIND_ADDR").unwrap_or(defaults.bind_addr);
        let port = read_env_or_default("FOURLINE_PORT", defaults.port)?;
        let max_clients = read_env_or_default("FOURLINE_MAX_CLIENTS", defaults.max_clients)?;
        let match_wait_secs = read_env_or_default("FOURLINE_MATCH_WAIT_SECS", 10u64)?;
        let bot_delay_ms = read_env_or_default("FOURLINE_BOT_DELAY_MS", 1000u64)?;
        let grace_secs = read_env_or_default("FOURLINE_GRACE_SECS", 30u64)?;

        Ok(Config {
            bind_addr,
            port,
            max_clients,
            match_wait: Duration::from_secs(match_wait_secs),
            bot_delay: Duration::from_millis(bot_delay_ms),
            grace_period: Duration::from_secs(grace_secs),
        })
    }

    /// Convenience: `addr:port` socket string.
    pub fn socket_addr_string(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }
}

fn read_env_or_default<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(val) => Ok(val.parse::<T>()?),
        Err(_) => Ok(default),
    }
}
