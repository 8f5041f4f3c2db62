use std::env;
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

/// Tunables of the session core
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub auth_timeout: Duration,
    pub heartbeat_interval: Duration,
    /// A connection silent for longer than this fails its liveness check
    pub heartbeat_timeout: Duration,
    pub max_message_bytes: usize,
    pub rate_limit_per_sec: u32,
    /// Pause between an error frame and the close frame that follows it
    pub close_grace: Duration,
    pub settlement_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        let heartbeat_interval = Duration::from_secs(30);
        Self {
            auth_timeout: Duration::from_secs(10),
            heartbeat_interval,
            heartbeat_timeout: heartbeat_interval * 2,
            max_message_bytes: 10 * 1024,
            rate_limit_per_sec: 20,
            close_grace: Duration::from_millis(100),
            settlement_timeout: Duration::from_secs(10),
        }
    }
}

pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub auth_secret: Option<String>,
    pub session: SessionConfig,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let defaults = SessionConfig::default();
        let heartbeat_interval = nonzero(
            "HEARTBEAT_INTERVAL_SECS",
            secs("HEARTBEAT_INTERVAL_SECS"),
            defaults.heartbeat_interval,
        );

        Self {
            port: var("PORT").unwrap_or(3000),
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://boardroom.db?mode=rwc".to_string()),
            auth_secret: env::var("AUTH_SECRET").ok().filter(|s| !s.is_empty()),
            session: SessionConfig {
                auth_timeout: secs("AUTH_TIMEOUT_SECS").unwrap_or(defaults.auth_timeout),
                heartbeat_interval,
                heartbeat_timeout: secs("HEARTBEAT_TIMEOUT_SECS")
                    .unwrap_or(heartbeat_interval * 2),
                max_message_bytes: var("MAX_MESSAGE_BYTES").unwrap_or(defaults.max_message_bytes),
                rate_limit_per_sec: var("RATE_LIMIT_PER_SEC").unwrap_or(defaults.rate_limit_per_sec),
                close_grace: var("CLOSE_GRACE_MS")
                    .map(Duration::from_millis)
                    .unwrap_or(defaults.close_grace),
                settlement_timeout: secs("SETTLEMENT_TIMEOUT_SECS")
                    .unwrap_or(defaults.settlement_timeout),
            },
        }
    }

    pub fn addr(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }
}

fn var<T: FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.parse().ok())
}

fn secs(key: &str) -> Option<Duration> {
    var::<u64>(key).map(Duration::from_secs)
}

/// Ticker periods cannot be zero; such a value falls back to `default`.
fn nonzero(key: &str, value: Option<Duration>, default: Duration) -> Duration {
    match value {
        Some(d) if d.is_zero() => {
            warn!(key, default = ?default, "Zero interval is not allowed, using default");
            default
        }
        Some(d) => d,
        None => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_heartbeat_interval_falls_back_to_default() {
        let default = Duration::from_secs(30);

        assert_eq!(nonzero("HEARTBEAT_INTERVAL_SECS", Some(Duration::ZERO), default), default);
        assert_eq!(
            nonzero("HEARTBEAT_INTERVAL_SECS", Some(Duration::from_secs(5)), default),
            Duration::from_secs(5)
        );
        assert_eq!(nonzero("HEARTBEAT_INTERVAL_SECS", None, default), default);
    }

    #[test]
    fn default_timeout_is_twice_the_interval() {
        let config = SessionConfig::default();
        assert_eq!(config.heartbeat_timeout, config.heartbeat_interval * 2);
        assert!(!config.heartbeat_interval.is_zero());
    }
}
