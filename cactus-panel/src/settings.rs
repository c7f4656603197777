use cactus_common::DEFAULT_HUB_PORT;
use std::time::Duration;

pub const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:9991/path-hash/";
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 5000;
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_HTTP_CONNECT_TIMEOUT_SECS: u64 = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelSettings {
    pub api_base_url: String,
    pub hub_port: u16,
    pub poll_interval: Duration,
    pub http_timeout: Duration,
    pub http_connect_timeout: Duration,
}

impl Default for PanelSettings {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            hub_port: DEFAULT_HUB_PORT,
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            http_connect_timeout: Duration::from_secs(DEFAULT_HTTP_CONNECT_TIMEOUT_SECS),
        }
    }
}

impl PanelSettings {
    /// Read `CACTUS_*` variables. Call `dotenv::dotenv()` first to pick up a `.env`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let api_base_url = lookup("CACTUS_API_BASE_URL")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or(defaults.api_base_url);

        let hub_port = parse_number(&lookup, "CACTUS_HUB_PORT")
            .and_then(|v| match u16::try_from(v) {
                Ok(port) => Some(port),
                Err(_) => {
                    tracing::warn!(key = "CACTUS_HUB_PORT", value = v, "port out of range, using default");
                    None
                }
            })
            .unwrap_or(defaults.hub_port);

        let poll_interval = parse_number(&lookup, "CACTUS_POLL_INTERVAL_MS")
            .map(Duration::from_millis)
            .unwrap_or(defaults.poll_interval);

        let http_timeout = parse_number(&lookup, "CACTUS_HTTP_TIMEOUT_SECS")
            .map(Duration::from_secs)
            .unwrap_or(defaults.http_timeout);

        let http_connect_timeout = parse_number(&lookup, "CACTUS_HTTP_CONNECT_TIMEOUT_SECS")
            .map(Duration::from_secs)
            .unwrap_or(defaults.http_connect_timeout);

        Self {
            api_base_url,
            hub_port,
            poll_interval,
            http_timeout,
            http_connect_timeout,
        }
    }
}

/// Positive integer from `key`; anything else falls back to the default.
fn parse_number<F>(lookup: &F, key: &str) -> Option<u64>
where
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    match raw.trim().parse::<u64>() {
        Ok(v) if v > 0 => Some(v),
        _ => {
            tracing::warn!(key, value = %raw, "ignoring invalid setting, using default");
            None
        }
    }
}
