use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

use url::Url;

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
    pub payment_links: PaymentLinkConfig,
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

        let public_origin =
            env::var("APP_PUBLIC_ORIGIN").unwrap_or_else(|_| format!("http://{host}:{port}"));
        validate_public_origin(&public_origin)?;
        let default_expiry_days = env::var("APP_LINK_EXPIRY_DAYS")
            .unwrap_or_else(|_| "7".to_string())
            .parse::<i64>()
            .map_err(|_| ConfigError::InvalidExpiryDays)?;
        if default_expiry_days < 1 {
            return Err(ConfigError::InvalidExpiryDays);
        }
        let max_screenshot_bytes = env::var("APP_MAX_SCREENSHOT_BYTES")
            .unwrap_or_else(|_| PaymentLinkConfig::DEFAULT_MAX_SCREENSHOT_BYTES.to_string())
            .parse::<usize>()
            .map_err(|_| ConfigError::InvalidScreenshotCap)?;

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            payment_links: PaymentLinkConfig {
                public_origin,
                default_expiry_days,
                max_screenshot_bytes,
            },
        })
    }
}

/// Bind address settings for the HTTP server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let ip = self
            .host
            .parse::<IpAddr>()
            .map_err(|_| ConfigError::InvalidHost(self.host.clone()))?;
        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Log filter settings consumed by the telemetry module.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Knobs for the payment-link workflow.
#[derive(Debug, Clone)]
pub struct PaymentLinkConfig {
    /// Base origin embedded in shareable verification URLs.
    pub public_origin: String,
    /// Expiry window applied when a request does not specify one.
    pub default_expiry_days: i64,
    /// Upper bound accepted for proof-of-payment screenshots.
    pub max_screenshot_bytes: usize,
}

impl PaymentLinkConfig {
    pub const DEFAULT_MAX_SCREENSHOT_BYTES: usize = 5 * 1024 * 1024;
}

/// The origin gets embedded in every shareable URL, so a malformed one is a
/// startup error rather than a per-link surprise.
fn validate_public_origin(origin: &str) -> Result<(), ConfigError> {
    let parsed = Url::parse(origin)
        .map_err(|_| ConfigError::InvalidPublicOrigin(origin.to_string()))?;
    let scheme_ok = matches!(parsed.scheme(), "http" | "https");
    if !scheme_ok || parsed.host_str().is_none() {
        return Err(ConfigError::InvalidPublicOrigin(origin.to_string()));
    }
    Ok(())
}

impl Default for PaymentLinkConfig {
    fn default() -> Self {
        Self {
            public_origin: "http://127.0.0.1:3000".to_string(),
            default_expiry_days: 7,
            max_screenshot_bytes: Self::DEFAULT_MAX_SCREENSHOT_BYTES,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost(String),
    InvalidExpiryDays,
    InvalidScreenshotCap,
    InvalidPublicOrigin(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost(host) => write!(f, "APP_HOST '{host}' is not an IP address"),
            ConfigError::InvalidExpiryDays => {
                write!(f, "APP_LINK_EXPIRY_DAYS must be an integer >= 1")
            }
            ConfigError::InvalidScreenshotCap => {
                write!(f, "APP_MAX_SCREENSHOT_BYTES must be a byte count")
            }
            ConfigError::InvalidPublicOrigin(origin) => {
                write!(f, "APP_PUBLIC_ORIGIN '{origin}' is not an http(s) origin")
            }
        }
    }
}

impl std::error::Error for ConfigError {}
