//! Configuration module for the broadcast backend.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::net::SocketAddr;
use std::time::Duration;

/// Operators that can always see every channel, regardless of group membership.
pub const DEFAULT_FIXED_OPS_IDS: [&str; 3] = [
    "691ca9ba71a3fe45bbe2c8ba",
    "691e295f4808c62fcbda1638",
    "691e2976bae4ad46ecc44b37",
];

/// Privileged operations group whose members see every channel.
pub const DEFAULT_OPS_GROUP_ID: &str = "692a1bc3f912873d71f98e39";

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Pre-shared key for API authentication (optional)
    pub api_psk: Option<String>,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Upstream platform connection
    pub upstream: UpstreamConfig,
    /// Directory and audience settings
    pub directory: DirectoryConfig,
    /// Broadcast creation and fan-out settings
    pub broadcast: BroadcastConfig,
}

/// Connection and retry settings for the upstream platform API.
#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    pub base_url: String,
    /// Sent as `Authorization: Basic <token>`
    pub token: String,
    /// Wait before retrying a rate-limited call
    pub retry_backoff: Duration,
    /// Total attempts per call, including the first one
    pub max_attempts: u32,
    /// Records requested per page on paginated scans
    pub page_size: usize,
}

#[derive(Debug, Clone)]
pub struct DirectoryConfig {
    /// Profile attribute carrying the external store identifier
    pub store_attribute: String,
    pub ttl: Duration,
    /// Pause inserted every `pace_every` scanned records
    pub pace_delay: Duration,
    pub pace_every: usize,
    pub ops_group_id: String,
    pub fixed_ops_ids: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct BroadcastConfig {
    pub space_id: String,
    /// Plugin type of announcement channels
    pub plugin_id: String,
    /// Installations processed concurrently per fan-out batch
    pub batch_size: usize,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let api_psk = env::var("BROADCAST_API_PSK").ok().filter(|s| !s.is_empty());

        let bind_addr = env::var("BROADCAST_BIND_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:3000".to_string())
            .parse()
            .expect("Invalid BROADCAST_BIND_ADDR format");

        let log_level = env::var("BROADCAST_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let upstream = UpstreamConfig {
            base_url: env::var("STAFFBASE_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:9000/api".to_string())
                .trim_end_matches('/')
                .to_string(),
            token: env::var("STAFFBASE_TOKEN").unwrap_or_default(),
            ..UpstreamConfig::default()
        };

        let fixed_ops_ids = match env::var("FIXED_OPS_IDS") {
            Ok(raw) => parse_id_list(&raw),
            Err(_) => DEFAULT_FIXED_OPS_IDS.iter().map(|s| s.to_string()).collect(),
        };

        let directory = DirectoryConfig {
            store_attribute: env::var("HIDDEN_ATTRIBUTE_KEY")
                .unwrap_or_else(|_| "storeId".to_string()),
            ops_group_id: env::var("OPS_GROUP_ID")
                .unwrap_or_else(|_| DEFAULT_OPS_GROUP_ID.to_string()),
            fixed_ops_ids,
            ..DirectoryConfig::default()
        };

        let broadcast = BroadcastConfig {
            space_id: env::var("STAFFBASE_SPACE_ID").unwrap_or_default(),
            ..BroadcastConfig::default()
        };

        Self {
            api_psk,
            bind_addr,
            log_level,
            upstream,
            directory,
            broadcast,
        }
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:9000/api".to_string(),
            token: String::new(),
            retry_backoff: Duration::from_secs(2),
            max_attempts: 3,
            page_size: 100,
        }
    }
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            store_attribute: "storeId".to_string(),
            ttl: Duration::from_secs(15 * 60),
            pace_delay: Duration::from_millis(200),
            pace_every: 1000,
            ops_group_id: DEFAULT_OPS_GROUP_ID.to_string(),
            fixed_ops_ids: DEFAULT_FIXED_OPS_IDS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            space_id: String::new(),
            plugin_id: "news".to_string(),
            batch_size: 5,
        }
    }
}

/// Split a comma-separated identifier list, dropping blanks.
fn parse_id_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        // Clear any existing env vars
        env::remove_var("BROADCAST_API_PSK");
        env::remove_var("BROADCAST_BIND_ADDR");
        env::remove_var("BROADCAST_LOG_LEVEL");
        env::remove_var("FIXED_OPS_IDS");
        env::remove_var("OPS_GROUP_ID");

        let config = Config::from_env();

        assert!(config.api_psk.is_none());
        assert_eq!(config.bind_addr.to_string(), "127.0.0.1:3000");
        assert_eq!(config.log_level, "info");
        assert_eq!(config.directory.fixed_ops_ids.len(), 3);
        assert_eq!(config.directory.ops_group_id, DEFAULT_OPS_GROUP_ID);
        assert_eq!(config.directory.ttl, Duration::from_secs(900));
        assert_eq!(config.upstream.max_attempts, 3);
        assert_eq!(config.broadcast.batch_size, 5);
        assert_eq!(config.broadcast.plugin_id, "news");
    }

    #[test]
    fn test_parse_id_list() {
        assert_eq!(parse_id_list(" a, b ,,c "), vec!["a", "b", "c"]);
        assert!(parse_id_list("").is_empty());
    }
}
