use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use crate::proposal::{InputLimits, TariffSchedule};

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
    pub proposal: ProposalConfig,
    pub rate_limit: RateLimitConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "8000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let requests_per_minute = match env::var("APP_RATE_LIMIT_PER_MINUTE") {
            Ok(raw) => raw
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|value| *value > 0)
                .ok_or(ConfigError::InvalidNumber {
                    variable: "APP_RATE_LIMIT_PER_MINUTE",
                    value: raw,
                })?,
            Err(_) => RateLimitConfig::DEFAULT_PER_MINUTE,
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            proposal: ProposalConfig::from_env()?,
            rate_limit: RateLimitConfig {
                requests_per_minute,
            },
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

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Where proposals are written and which tariff they are priced with.
#[derive(Debug, Clone)]
pub struct ProposalConfig {
    /// Receives `simulacao_<name>.pdf` files and the `charts/` subdirectory.
    pub output_dir: PathBuf,
    /// Receives the uniquely named copies served under `/media`.
    pub media_dir: PathBuf,
    /// Optional background template lives here as `modelo-SEM-texto.png`.
    pub assets_dir: PathBuf,
    pub public_base_url: Option<String>,
    pub limits: InputLimits,
    pub tariff: TariffSchedule,
}

impl ProposalConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let output_dir = env::var("PROPOSAL_OUTPUT_DIR").unwrap_or_else(|_| "output".to_string());
        let media_dir = env::var("PROPOSAL_MEDIA_DIR").unwrap_or_else(|_| "media".to_string());
        let assets_dir = env::var("PROPOSAL_ASSETS_DIR").unwrap_or_else(|_| "assets".to_string());
        let public_base_url = env::var("PROPOSAL_PUBLIC_BASE_URL")
            .ok()
            .map(|url| url.trim().trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty());

        let mut limits = InputLimits::default();
        if let Some(cap) = positive_number("PROPOSAL_MAX_BILL_AMOUNT")? {
            limits.max_bill_amount = cap;
        }

        let mut tariff = TariffSchedule::default();
        if let Some(unit_tariff) = positive_number("PROPOSAL_UNIT_TARIFF")? {
            tariff.unit_tariff = unit_tariff;
        }
        if let Some(discount) = positive_number("PROPOSAL_DISCOUNT_PCT")? {
            if discount >= 100.0 {
                return Err(ConfigError::InvalidNumber {
                    variable: "PROPOSAL_DISCOUNT_PCT",
                    value: discount.to_string(),
                });
            }
            tariff.discount_pct = discount;
        }

        Ok(Self {
            output_dir: PathBuf::from(output_dir),
            media_dir: PathBuf::from(media_dir),
            assets_dir: PathBuf::from(assets_dir),
            public_base_url,
            limits,
            tariff,
        })
    }
}

fn positive_number(variable: &'static str) -> Result<Option<f64>, ConfigError> {
    let Ok(raw) = env::var(variable) else {
        return Ok(None);
    };

    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite() && *value > 0.0)
        .map(Some)
        .ok_or(ConfigError::InvalidNumber {
            variable,
            value: raw,
        })
}

/// Per-client request budget for the webhook.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    pub requests_per_minute: u32,
}

impl RateLimitConfig {
    pub const DEFAULT_PER_MINUTE: u32 = 10;
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_minute: Self::DEFAULT_PER_MINUTE,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidNumber { variable: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidNumber { variable, value } => {
                write!(f, "{variable} must be a positive number (got '{value}')")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort | ConfigError::InvalidNumber { .. } => None,
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
            "APP_RATE_LIMIT_PER_MINUTE",
            "PROPOSAL_OUTPUT_DIR",
            "PROPOSAL_MEDIA_DIR",
            "PROPOSAL_ASSETS_DIR",
            "PROPOSAL_PUBLIC_BASE_URL",
            "PROPOSAL_MAX_BILL_AMOUNT",
            "PROPOSAL_UNIT_TARIFF",
            "PROPOSAL_DISCOUNT_PCT",
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
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.telemetry.log_level, "info");
        assert_eq!(config.rate_limit.requests_per_minute, 10);
        assert_eq!(config.proposal.output_dir, PathBuf::from("output"));
        assert_eq!(config.proposal.limits.max_bill_amount, 99_999.99);
        assert_eq!(config.proposal.tariff.unit_tariff, 1.138131);
        assert!(config.proposal.public_base_url.is_none());
    }

    #[test]
    fn accepts_localhost_host() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_HOST", "localhost");
        let config = AppConfig::load().expect("config loads");
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 8000));
    }

    #[test]
    fn tariff_overrides_are_applied() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("PROPOSAL_UNIT_TARIFF", "0.95");
        env::set_var("PROPOSAL_DISCOUNT_PCT", "15");
        env::set_var("PROPOSAL_PUBLIC_BASE_URL", "https://propostas.example.com/");
        let config = AppConfig::load().expect("config loads");
        reset_env();

        assert_eq!(config.proposal.tariff.unit_tariff, 0.95);
        assert_eq!(config.proposal.tariff.discount_pct, 15.0);
        assert_eq!(
            config.proposal.public_base_url.as_deref(),
            Some("https://propostas.example.com")
        );
    }

    #[test]
    fn rejects_non_numeric_limits() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("PROPOSAL_MAX_BILL_AMOUNT", "lots");
        let err = AppConfig::load().expect_err("cap must be numeric");
        reset_env();

        assert!(matches!(
            err,
            ConfigError::InvalidNumber {
                variable: "PROPOSAL_MAX_BILL_AMOUNT",
                ..
            }
        ));
    }

    #[test]
    fn rejects_discount_of_one_hundred_percent() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("PROPOSAL_DISCOUNT_PCT", "100");
        let result = AppConfig::load();
        reset_env();

        assert!(result.is_err());
    }
}
