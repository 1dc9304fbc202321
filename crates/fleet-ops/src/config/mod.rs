use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
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

/// Top-level configuration for the dispatch service.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub geo: GeoConfig,
    pub session: SessionConfig,
    pub fleet: FleetSourceConfig,
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

        let routing_endpoint = env::var("FLEET_ROUTING_ENDPOINT")
            .unwrap_or_else(|_| "https://router.project-osrm.org".to_string());
        let geocoder_endpoint = env::var("FLEET_GEOCODER_ENDPOINT")
            .unwrap_or_else(|_| "https://nominatim.openstreetmap.org".to_string());
        let geocoder_city = env::var("FLEET_GEOCODER_CITY")
            .ok()
            .filter(|value| !value.trim().is_empty());
        let http_timeout_secs = env::var("FLEET_HTTP_TIMEOUT_SECS")
            .unwrap_or_else(|_| "5".to_string())
            .parse::<u64>()
            .map_err(|_| ConfigError::InvalidNumber {
                key: "FLEET_HTTP_TIMEOUT_SECS",
            })?;

        let tick_interval_ms = env::var("FLEET_TICK_INTERVAL_MS")
            .unwrap_or_else(|_| "300".to_string())
            .parse::<u64>()
            .ok()
            .filter(|millis| *millis > 0)
            .ok_or(ConfigError::InvalidNumber {
                key: "FLEET_TICK_INTERVAL_MS",
            })?;
        let progress_increment = env::var("FLEET_PROGRESS_INCREMENT")
            .unwrap_or_else(|_| "10".to_string())
            .parse::<u8>()
            .map_err(|_| ConfigError::InvalidNumber {
                key: "FLEET_PROGRESS_INCREMENT",
            })?;
        if progress_increment == 0 || progress_increment > 100 {
            return Err(ConfigError::InvalidProgressIncrement(progress_increment));
        }

        let snapshot_csv = env::var("FLEET_SNAPSHOT_CSV")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from);

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            geo: GeoConfig {
                routing_endpoint,
                geocoder_endpoint,
                geocoder_city,
                http_timeout: Duration::from_secs(http_timeout_secs),
            },
            session: SessionConfig {
                tick_interval: Duration::from_millis(tick_interval_ms),
                progress_increment,
            },
            fleet: FleetSourceConfig { snapshot_csv },
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

/// Endpoints for the routing and geocoding collaborators.
#[derive(Debug, Clone)]
pub struct GeoConfig {
    pub routing_endpoint: String,
    pub geocoder_endpoint: String,
    pub geocoder_city: Option<String>,
    pub http_timeout: Duration,
}

/// Cadence of the simulated processing progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    pub tick_interval: Duration,
    pub progress_increment: u8,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(300),
            progress_increment: 10,
        }
    }
}

/// Where the initial fleet snapshot comes from.
#[derive(Debug, Clone, Default)]
pub struct FleetSourceConfig {
    pub snapshot_csv: Option<PathBuf>,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidNumber { key: &'static str },
    InvalidProgressIncrement(u8),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidNumber { key } => {
                write!(f, "{key} must be a non-negative integer")
            }
            ConfigError::InvalidProgressIncrement(value) => write!(
                f,
                "FLEET_PROGRESS_INCREMENT must be between 1 and 100 (found {value})"
            ),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidNumber { .. }
            | ConfigError::InvalidProgressIncrement(_) => None,
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
        for key in [
            "APP_ENV",
            "APP_HOST",
            "APP_PORT",
            "APP_LOG_LEVEL",
            "FLEET_ROUTING_ENDPOINT",
            "FLEET_GEOCODER_ENDPOINT",
            "FLEET_GEOCODER_CITY",
            "FLEET_HTTP_TIMEOUT_SECS",
            "FLEET_TICK_INTERVAL_MS",
            "FLEET_PROGRESS_INCREMENT",
            "FLEET_SNAPSHOT_CSV",
        ] {
            env::remove_var(key);
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
        assert_eq!(config.session, SessionConfig::default());
        assert_eq!(config.geo.http_timeout, Duration::from_secs(5));
        assert!(config.geo.geocoder_city.is_none());
        assert!(config.fleet.snapshot_csv.is_none());
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
    fn rejects_out_of_range_progress_increment() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("FLEET_PROGRESS_INCREMENT", "0");
        let result = AppConfig::load();
        assert!(matches!(
            result,
            Err(ConfigError::InvalidProgressIncrement(0))
        ));
        reset_env();
    }

    #[test]
    fn reads_session_cadence_overrides() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("FLEET_TICK_INTERVAL_MS", "50");
        env::set_var("FLEET_PROGRESS_INCREMENT", "25");
        env::set_var("FLEET_GEOCODER_CITY", "Chicago");
        let config = AppConfig::load().expect("config loads");
        assert_eq!(config.session.tick_interval, Duration::from_millis(50));
        assert_eq!(config.session.progress_increment, 25);
        assert_eq!(config.geo.geocoder_city.as_deref(), Some("Chicago"));
        reset_env();
    }

    #[test]
    fn rejects_zero_tick_interval() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("FLEET_TICK_INTERVAL_MS", "0");
        let result = AppConfig::load();
        assert!(matches!(
            result,
            Err(ConfigError::InvalidNumber {
                key: "FLEET_TICK_INTERVAL_MS"
            })
        ));
        reset_env();
    }
}
