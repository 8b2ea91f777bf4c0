use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

use crate::workflows::compensation::SeasonWindow;

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
    pub compensation: CompensationConfig,
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

        let season_start_month = month_var("COMP_SEASON_START_MONTH", 4)?;
        let season_end_month = month_var("COMP_SEASON_END_MONTH", 8)?;
        if season_start_month > season_end_month {
            return Err(ConfigError::InvertedSeason {
                start: season_start_month,
                end: season_end_month,
            });
        }

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            compensation: CompensationConfig {
                season_start_month,
                season_end_month,
            },
        })
    }
}

fn month_var(key: &'static str, default: u32) -> Result<u32, ConfigError> {
    let month = match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<u32>()
            .map_err(|_| ConfigError::InvalidMonth { key })?,
        Err(_) => default,
    };

    if (1..=12).contains(&month) {
        Ok(month)
    } else {
        Err(ConfigError::InvalidMonth { key })
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

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Incentive season used by the licensee summary. Months are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompensationConfig {
    pub season_start_month: u32,
    pub season_end_month: u32,
}

impl CompensationConfig {
    pub fn season_for(&self, year: i32) -> Option<SeasonWindow> {
        SeasonWindow::for_months(year, self.season_start_month, self.season_end_month)
    }
}

impl Default for CompensationConfig {
    fn default() -> Self {
        Self {
            season_start_month: 4,
            season_end_month: 8,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidMonth { key: &'static str },
    InvertedSeason { start: u32, end: u32 },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidMonth { key } => {
                write!(f, "{key} must be a month between 1 and 12")
            }
            ConfigError::InvertedSeason { start, end } => write!(
                f,
                "season start month {start} falls after season end month {end}"
            ),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidMonth { .. }
            | ConfigError::InvertedSeason { .. } => None,
        }
    }
}
