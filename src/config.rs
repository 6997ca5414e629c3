//! Hub configuration, loaded from environment variables

use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_STATIC_DIR: &str = "public";

/// Runtime settings for the hub
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// TCP port to listen on (all interfaces)
    pub port: u16,
    /// Directory served at `/` for the companion client page
    pub static_dir: PathBuf,
    /// Close a connection that sends nothing for this long (None = never)
    pub read_timeout: Option<Duration>,
    /// Close a connection whose socket write takes longer than this
    pub write_timeout: Duration,
    /// Frames buffered per connection before it counts as dead
    pub outbound_queue: usize,
    /// Votes buffered ahead of the aggregator
    pub funnel_queue: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            static_dir: PathBuf::from(DEFAULT_STATIC_DIR),
            read_timeout: None,
            write_timeout: Duration::from_secs(10),
            outbound_queue: 64,
            funnel_queue: 256,
        }
    }
}

impl HubConfig {
    /// Load config from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let port = parse_env("JURYHUB_PORT").unwrap_or(defaults.port);

        let static_dir = std::env::var("JURYHUB_STATIC_DIR")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.static_dir);

        // 0 disables the idle deadline
        let read_timeout = parse_env::<u64>("JURYHUB_READ_TIMEOUT_SECS")
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs);

        let write_timeout = parse_env::<u64>("JURYHUB_WRITE_TIMEOUT_SECS")
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .unwrap_or(defaults.write_timeout);

        let outbound_queue = parse_env::<usize>("JURYHUB_OUTBOUND_QUEUE")
            .filter(|n| *n > 0)
            .unwrap_or(defaults.outbound_queue);

        let funnel_queue = parse_env::<usize>("JURYHUB_FUNNEL_QUEUE")
            .filter(|n| *n > 0)
            .unwrap_or(defaults.funnel_queue);

        let config = Self {
            port,
            static_dir,
            read_timeout,
            write_timeout,
            outbound_queue,
            funnel_queue,
        };

        tracing::info!(
            port = config.port,
            static_dir = %config.static_dir.display(),
            read_timeout = ?config.read_timeout,
            write_timeout = ?config.write_timeout,
            outbound_queue = config.outbound_queue,
            funnel_queue = config.funnel_queue,
            "Hub config loaded"
        );

        config
    }
}

/// Read and parse an env var. Unparseable values are logged and ignored.
fn parse_env<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = %raw, "Ignoring unparseable config value");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const KEYS: [&str; 6] = [
        "JURYHUB_PORT",
        "JURYHUB_STATIC_DIR",
        "JURYHUB_READ_TIMEOUT_SECS",
        "JURYHUB_WRITE_TIMEOUT_SECS",
        "JURYHUB_OUTBOUND_QUEUE",
        "JURYHUB_FUNNEL_QUEUE",
    ];

    fn clear_env() {
        for key in KEYS {
            std::env::remove_var(key);
        }
    }

    #[test]
    #[serial]
    fn test_defaults_without_env() {
        clear_env();
        let config = HubConfig::from_env();
        assert_eq!(config.port, 8080);
        assert_eq!(config.static_dir, PathBuf::from("public"));
        assert_eq!(config.read_timeout, None);
        assert_eq!(config.write_timeout, Duration::from_secs(10));
        assert_eq!(config.outbound_queue, 64);
        assert_eq!(config.funnel_queue, 256);
    }

    #[test]
    #[serial]
    fn test_values_from_env() {
        clear_env();
        std::env::set_var("JURYHUB_PORT", "9000");
        std::env::set_var("JURYHUB_STATIC_DIR", "/srv/jury");
        std::env::set_var("JURYHUB_READ_TIMEOUT_SECS", "30");
        std::env::set_var("JURYHUB_WRITE_TIMEOUT_SECS", "2");
        std::env::set_var("JURYHUB_OUTBOUND_QUEUE", "8");
        std::env::set_var("JURYHUB_FUNNEL_QUEUE", "16");

        let config = HubConfig::from_env();
        assert_eq!(config.port, 9000);
        assert_eq!(config.static_dir, PathBuf::from("/srv/jury"));
        assert_eq!(config.read_timeout, Some(Duration::from_secs(30)));
        assert_eq!(config.write_timeout, Duration::from_secs(2));
        assert_eq!(config.outbound_queue, 8);
        assert_eq!(config.funnel_queue, 16);
        clear_env();
    }

    #[test]
    #[serial]
    fn test_invalid_values_fall_back() {
        clear_env();
        std::env::set_var("JURYHUB_PORT", "not-a-port");
        std::env::set_var("JURYHUB_READ_TIMEOUT_SECS", "0");
        std::env::set_var("JURYHUB_OUTBOUND_QUEUE", "0");
        std::env::set_var("JURYHUB_STATIC_DIR", "   ");

        let config = HubConfig::from_env();
        assert_eq!(config.port, 8080);
        assert_eq!(config.read_timeout, None);
        assert_eq!(config.outbound_queue, 64);
        assert_eq!(config.static_dir, PathBuf::from("public"));
        clear_env();
    }
}
