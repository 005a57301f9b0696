use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
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
    pub upload: UploadConfig,
    pub progress: ProgressConfig,
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
        let log_spans = env::var("APP_LOG_SPANS")
            .map(|value| matches!(value.trim(), "1" | "true" | "yes"))
            .unwrap_or(false);

        let defaults = UploadConfig::default();
        let max_concurrent = env_number("UPLOAD_MAX_CONCURRENT", defaults.max_concurrent)?;
        if max_concurrent == 0 {
            return Err(ConfigError::InvalidConcurrency);
        }
        let upload = UploadConfig {
            max_file_bytes: env_number("UPLOAD_MAX_FILE_BYTES", defaults.max_file_bytes)?,
            max_concurrent,
            transfer_timeout: Duration::from_secs(env_number(
                "UPLOAD_TRANSFER_TIMEOUT_SECS",
                defaults.transfer_timeout.as_secs(),
            )?),
            progress_interval: Duration::from_millis(env_number(
                "UPLOAD_PROGRESS_INTERVAL_MS",
                defaults.progress_interval.as_millis() as u64,
            )?),
            completion_hold: Duration::from_millis(env_number(
                "UPLOAD_COMPLETION_HOLD_MS",
                defaults.completion_hold.as_millis() as u64,
            )?),
        };

        let progress_defaults = ProgressConfig::default();
        let progress = ProgressConfig {
            debounce: Duration::from_millis(env_number(
                "PROGRESS_DEBOUNCE_MS",
                progress_defaults.debounce.as_millis() as u64,
            )?),
            min_delta: env_number("PROGRESS_MIN_DELTA", progress_defaults.min_delta)?,
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig {
                log_level,
                log_spans,
            },
            upload,
            progress,
        })
    }
}

fn env_number<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidNumber { key }),
        Err(_) => Ok(default),
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
    /// Emit a line when instrumented spans (uploads, refreshes) close.
    pub log_spans: bool,
}

/// Limits and pacing for the document upload pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadConfig {
    pub max_file_bytes: u64,
    pub max_concurrent: usize,
    pub transfer_timeout: Duration,
    pub progress_interval: Duration,
    pub completion_hold: Duration,
}

pub const DEFAULT_MAX_FILE_BYTES: u64 = 50 * 1024 * 1024;

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
            max_concurrent: 3,
            transfer_timeout: Duration::from_secs(120),
            progress_interval: Duration::from_millis(200),
            completion_hold: Duration::from_millis(500),
        }
    }
}

/// Debounce settings for persisting the completion score.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressConfig {
    pub debounce: Duration,
    pub min_delta: u8,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(500),
            min_delta: 1,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidNumber { key: &'static str },
    InvalidConcurrency,
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
            ConfigError::InvalidConcurrency => {
                write!(f, "UPLOAD_MAX_CONCURRENT must be at least 1")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidNumber { .. }
            | ConfigError::InvalidConcurrency => None,
        }
    }
}
