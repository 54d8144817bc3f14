use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub engine: EngineConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            engine: EngineConfig::from_env()?,
        })
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing and metrics controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Timing and delivery knobs for recomputation and alert notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub recompute_interval: Duration,
    pub submit_latency: Duration,
    pub acquire_timeout: Duration,
    pub alert_endpoint: Option<String>,
    pub notify_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            recompute_interval: Duration::from_millis(5_000),
            submit_latency: Duration::from_millis(3_000),
            acquire_timeout: Duration::from_millis(10_000),
            alert_endpoint: None,
            notify_timeout: Duration::from_millis(5_000),
        }
    }
}

impl EngineConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let recompute_interval =
            duration_var("RISK_RECOMPUTE_INTERVAL_MS", defaults.recompute_interval)?;
        if recompute_interval.is_zero() {
            return Err(ConfigError::InvalidDuration {
                variable: "RISK_RECOMPUTE_INTERVAL_MS",
            });
        }

        let alert_endpoint = env::var("RISK_ALERT_ENDPOINT")
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());

        Ok(Self {
            recompute_interval,
            submit_latency: duration_var("RISK_SUBMIT_LATENCY_MS", defaults.submit_latency)?,
            acquire_timeout: duration_var("RISK_ACQUIRE_TIMEOUT_MS", defaults.acquire_timeout)?,
            alert_endpoint,
            notify_timeout: duration_var("RISK_NOTIFY_TIMEOUT_MS", defaults.notify_timeout)?,
        })
    }
}

fn duration_var(variable: &'static str, default: Duration) -> Result<Duration, ConfigError> {
    match env::var(variable) {
        Ok(raw) => raw
            .trim()
            .parse::<u64>()
            .map(Duration::from_millis)
            .map_err(|_| ConfigError::InvalidDuration { variable }),
        Err(_) => Ok(default),
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidDuration { variable: &'static str },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidDuration { variable } => {
                write!(f, "{variable} must be a positive number of milliseconds")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort | ConfigError::InvalidDuration { .. } => None,
            ConfigError::InvalidHost { source } => Some(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        for variable in [
            "APP_ENV",
            "APP_HOST",
            "APP_PORT",
            "APP_LOG_LEVEL",
            "RISK_RECOMPUTE_INTERVAL_MS",
            "RISK_SUBMIT_LATENCY_MS",
            "RISK_ACQUIRE_TIMEOUT_MS",
            "RISK_ALERT_ENDPOINT",
            "RISK_NOTIFY_TIMEOUT_MS",
        ] {
            env::remove_var(variable);
        }
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.telemetry.log_level, "info");
        assert_eq!(config.engine, EngineConfig::default());
    }

    #[test]
    fn accepts_localhost_host() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_HOST", "localhost");
        let config = AppConfig::load().expect("config loads");
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 3000));
        reset_env();
    }

    #[test]
    fn engine_settings_read_from_env() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("RISK_RECOMPUTE_INTERVAL_MS", "2000");
        env::set_var("RISK_SUBMIT_LATENCY_MS", "0");
        env::set_var("RISK_ALERT_ENDPOINT", " http://127.0.0.1:9000/api/emergency-alert ");
        let config = AppConfig::load().expect("config loads");
        assert_eq!(config.engine.recompute_interval, Duration::from_secs(2));
        assert_eq!(config.engine.submit_latency, Duration::ZERO);
        assert_eq!(
            config.engine.alert_endpoint.as_deref(),
            Some("http://127.0.0.1:9000/api/emergency-alert")
        );
        reset_env();
    }

    #[test]
    fn rejects_zero_recompute_interval() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("RISK_RECOMPUTE_INTERVAL_MS", "0");
        match AppConfig::load() {
            Err(ConfigError::InvalidDuration { variable }) => {
                assert_eq!(variable, "RISK_RECOMPUTE_INTERVAL_MS")
            }
            other => panic!("expected invalid duration, got {other:?}"),
        }
        reset_env();
    }
}
