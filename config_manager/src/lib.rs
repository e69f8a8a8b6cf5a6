use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum ConfigurationError {
    #[error("Configuration loading error: {0}")]
    ConfigLoad(#[from] ConfigError),
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

pub type Result<T> = std::result::Result<T, ConfigurationError>;

/// Upper bound for `screening.lookback_days` and the `--days` override
pub const MAX_LOOKBACK_DAYS: i64 = 3650;
/// Upper bound for `screening.sniping_window_seconds` (one day)
pub const MAX_SNIPING_WINDOW_SECONDS: i64 = 86_400;
/// Upper bound for a fixed-delay limiter's `delay_ms`
pub const MAX_RATE_LIMIT_DELAY_MS: u64 = 60_000;

/// Flat environment names understood in addition to the `SCREENER__*` layout.
/// They take precedence over every other source.
pub const LEGACY_ENV_KEYS: &[(&str, &str)] = &[
    ("WINRATE_MIN", "thresholds.winrate_min"),
    ("WINRATE_MAX", "thresholds.winrate_max"),
    ("ROI_MIN", "thresholds.roi_min"),
    ("INVESTED_MIN", "thresholds.invested_min"),
    ("NETWORK", "shyft.network"),
    ("ACCOUNT", "screening.account"),
    ("SHYFT_API_KEY", "shyft.api_key"),
    ("SOLANA_TRACKER_API_KEY", "solana_tracker.api_key"),
    ("DEBUG", "system.debug_mode"),
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemConfig {
    /// General system settings
    pub system: SystemSettings,

    /// Profitability thresholds applied to every candidate wallet
    pub thresholds: ThresholdsConfig,

    /// Transaction-window and sniping settings
    pub screening: ScreeningConfig,

    /// Shyft API configuration (wallet transaction history)
    pub shyft: ShyftConfig,

    /// Solana Tracker API configuration (PnL, token pools, discovery)
    pub solana_tracker: SolanaTrackerConfig,

    /// Candidate wallet discovery
    pub discovery: DiscoveryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemSettings {
    /// Enable debug logging
    pub debug_mode: bool,

    /// Directory holding the wallet files and the verdict report
    pub outputs_dir: PathBuf,

    /// Wallets evaluated concurrently. 1 keeps the run strictly sequential.
    pub max_concurrent_wallets: usize,
}

/// Win rate and ROI are percentages (0-100), matching what the PnL provider reports.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ThresholdsConfig {
    pub winrate_min: Option<f64>,
    pub winrate_max: Option<f64>,
    pub roi_min: Option<f64>,
    pub invested_min: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreeningConfig {
    /// How far back from a wallet's latest transaction to look
    pub lookback_days: i64,

    /// Max distance between first buy and pool creation that counts as sniping
    pub sniping_window_seconds: i64,

    /// Symbol of the network's native asset; swaps paying with it are buys
    pub native_symbol: String,

    /// Single account inspected by the `history` command when none is given
    pub account: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateLimitStrategy {
    FixedDelay,
    TokenBucket,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub strategy: RateLimitStrategy,

    /// Minimum spacing between two calls (fixed_delay)
    pub delay_ms: u64,

    /// Sustained rate (token_bucket)
    pub requests_per_second: u32,

    /// Bucket size (token_bucket)
    pub burst: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShyftConfig {
    pub api_key: String,
    pub api_base_url: String,

    /// Cluster name sent with every request, e.g. "mainnet-beta"
    pub network: String,

    /// Transactions requested per history page (provider maximum is 100)
    pub page_size: u32,

    pub request_timeout_seconds: u64,
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolanaTrackerConfig {
    pub api_key: String,
    pub api_base_url: String,
    pub request_timeout_seconds: u64,
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// Run discovery before screening in the `run` command
    pub enabled: bool,

    pub max_top_trader_pages: u32,

    /// Trending window passed to the provider ("1h", "24h", ...)
    pub trending_timeframe: String,

    pub max_trending_tokens: usize,

    /// Pages of recent trades scanned per trending token
    pub max_trade_pages: u32,

    /// Mints never used as discovery seeds (SOL, stables, majors)
    pub excluded_tokens: Vec<String>,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            system: SystemSettings {
                debug_mode: false,
                outputs_dir: PathBuf::from("outputs"),
                max_concurrent_wallets: 1,
            },
            thresholds: ThresholdsConfig::default(),
            screening: ScreeningConfig {
                lookback_days: 7,
                sniping_window_seconds: 60,
                native_symbol: "SOL".to_string(),
                account: None,
            },
            shyft: ShyftConfig {
                api_key: "".to_string(), // Must be set in .env or config file
                api_base_url: "https://api.shyft.to/sol/v1".to_string(),
                network: "mainnet-beta".to_string(),
                page_size: 100,
                request_timeout_seconds: 30,
                rate_limit: RateLimitConfig::one_per_second(),
            },
            solana_tracker: SolanaTrackerConfig {
                api_key: "".to_string(), // Must be set in .env or config file
                api_base_url: "https://data.solanatracker.io".to_string(),
                request_timeout_seconds: 30,
                rate_limit: RateLimitConfig::one_per_second(),
            },
            discovery: DiscoveryConfig {
                enabled: true,
                max_top_trader_pages: 5,
                trending_timeframe: "24h".to_string(),
                max_trending_tokens: 1,
                max_trade_pages: 10,
                excluded_tokens: vec![
                    "So11111111111111111111111111111111111111112".to_string(),
                    "7vfCXTUXx5WJV5JADk17DUJ4ksgau7utNKj4b963voxs".to_string(),
                    "3NZ9JMVBmGAqocybic2c7LQCJScmgsAZ6vQqTDzcqmJh".to_string(),
                    "Es9vMFrzaCERmJfrF4H2FYD4KCoNkY11McCe8BenwNYB".to_string(),
                    "JUPyiwrYJFskUPiHa7hkeR8VUtAeFoSYbKedZNsDvCN".to_string(),
                ],
            },
        }
    }
}

impl RateLimitConfig {
    /// Free-tier quota of both providers
    pub fn one_per_second() -> Self {
        Self {
            strategy: RateLimitStrategy::FixedDelay,
            delay_ms: 1000,
            requests_per_second: 1,
            burst: 1,
        }
    }

    pub fn validate(&self, provider: &str) -> Result<()> {
        match self.strategy {
            RateLimitStrategy::FixedDelay => {
                if self.delay_ms > MAX_RATE_LIMIT_DELAY_MS {
                    return Err(ConfigurationError::InvalidValue(format!(
                        "{} delay_ms must be at most {}, got {}",
                        provider, MAX_RATE_LIMIT_DELAY_MS, self.delay_ms
                    )));
                }
                Ok(())
            }
            RateLimitStrategy::TokenBucket => {
                if self.requests_per_second == 0 || self.burst == 0 {
                    return Err(ConfigurationError::InvalidValue(format!(
                        "{} token bucket needs requests_per_second > 0 and burst > 0",
                        provider
                    )));
                }
                Ok(())
            }
        }
    }
}

impl ThresholdsConfig {
    /// Every threshold must be present and finite; the win-rate range must be a
    /// non-empty subrange of 0-100.
    pub fn validate(&self) -> Result<()> {
        let named = [
            ("WINRATE_MIN", self.winrate_min),
            ("WINRATE_MAX", self.winrate_max),
            ("ROI_MIN", self.roi_min),
            ("INVESTED_MIN", self.invested_min),
        ];

        for (name, value) in named {
            match value {
                None => {
                    return Err(ConfigurationError::InvalidValue(format!(
                        "{} is required",
                        name
                    )))
                }
                Some(v) if !v.is_finite() => {
                    return Err(ConfigurationError::InvalidValue(format!(
                        "{} must be a finite number, got {}",
                        name, v
                    )))
                }
                Some(_) => {}
            }
        }

        let (min, max) = (self.winrate_min.unwrap_or(0.0), self.winrate_max.unwrap_or(0.0));
        if !(0.0..=100.0).contains(&min) || !(0.0..=100.0).contains(&max) {
            return Err(ConfigurationError::InvalidValue(format!(
                "Win rate thresholds are percentages (0-100), got {}..{}",
                min, max
            )));
        }
        if min > max {
            return Err(ConfigurationError::InvalidValue(format!(
                "WINRATE_MIN ({}) is greater than WINRATE_MAX ({})",
                min, max
            )));
        }

        Ok(())
    }
}

impl ScreeningConfig {
    pub fn validate(&self) -> Result<()> {
        validate_lookback_days(self.lookback_days)?;

        if !(0..=MAX_SNIPING_WINDOW_SECONDS).contains(&self.sniping_window_seconds) {
            return Err(ConfigurationError::InvalidValue(format!(
                "sniping_window_seconds must be between 0 and {}, got {}",
                MAX_SNIPING_WINDOW_SECONDS, self.sniping_window_seconds
            )));
        }

        if self.native_symbol.trim().is_empty() {
            return Err(ConfigurationError::InvalidValue(
                "native_symbol cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}

/// Lookback windows are whole days in `1..=MAX_LOOKBACK_DAYS`
pub fn validate_lookback_days(days: i64) -> Result<()> {
    if !(1..=MAX_LOOKBACK_DAYS).contains(&days) {
        return Err(ConfigurationError::InvalidValue(format!(
            "lookback_days must be between 1 and {}, got {}",
            MAX_LOOKBACK_DAYS, days
        )));
    }
    Ok(())
}

impl ShyftConfig {
    pub fn validate(&self) -> Result<()> {
        if self.api_key.is_empty() {
            return Err(ConfigurationError::InvalidValue(
                "Shyft API key is required".to_string(),
            ));
        }

        if self.request_timeout_seconds == 0 {
            return Err(ConfigurationError::InvalidValue(
                "Request timeout must be greater than 0".to_string(),
            ));
        }

        if !(1..=100).contains(&self.page_size) {
            return Err(ConfigurationError::InvalidValue(format!(
                "Shyft page_size must be between 1 and 100, got {}",
                self.page_size
            )));
        }

        self.rate_limit.validate("shyft")
    }
}

impl SolanaTrackerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.api_key.is_empty() {
            return Err(ConfigurationError::InvalidValue(
                "Solana Tracker API key is required".to_string(),
            ));
        }

        if self.request_timeout_seconds == 0 {
            return Err(ConfigurationError::InvalidValue(
                "Request timeout must be greater than 0".to_string(),
            ));
        }

        self.rate_limit.validate("solana_tracker")
    }
}

impl SystemConfig {
    /// Load configuration from `config.toml` and the process environment
    pub fn load() -> Result<Self> {
        Self::load_from_path("config.toml")
    }

    /// Load configuration from a specific file path and the process environment
    pub fn load_from_path<P: AsRef<Path>>(config_path: P) -> Result<Self> {
        Self::load_with(config_path, |name| std::env::var(name).ok())
    }

    /// Load configuration, resolving the flat legacy names through `lookup`
    pub fn load_with<P, F>(config_path: P, lookup: F) -> Result<Self>
    where
        P: AsRef<Path>,
        F: Fn(&str) -> Option<String>,
    {
        let mut config_builder = Config::builder()
            // Start with defaults
            .add_source(Config::try_from(&SystemConfig::default())?);

        if config_path.as_ref().exists() {
            info!(
                "Loading configuration from: {}",
                config_path.as_ref().display()
            );
            config_builder = config_builder.add_source(File::from(config_path.as_ref()));
        } else {
            debug!("Config file not found, using defaults and environment variables");
        }

        config_builder = config_builder.add_source(
            Environment::with_prefix("SCREENER")
                .try_parsing(true)
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("discovery.excluded_tokens"),
        );

        for (env_name, key) in LEGACY_ENV_KEYS {
            if let Some(value) = lookup(env_name) {
                debug!("Applying {} to {}", env_name, key);
                config_builder = config_builder.set_override(*key, value)?;
            }
        }

        let system_config: SystemConfig = config_builder.build()?.try_deserialize()?;

        system_config.validate()?;

        Ok(system_config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        self.thresholds.validate()?;
        self.shyft.validate()?;
        self.solana_tracker.validate()?;

        self.screening.validate()?;

        if self.system.max_concurrent_wallets == 0 {
            return Err(ConfigurationError::InvalidValue(
                "max_concurrent_wallets must be at least 1".to_string(),
            ));
        }

        Ok(())
    }

    /// Configuration as JSON with API keys masked, for printing
    pub fn to_redacted_json(&self) -> serde_json::Value {
        let mut redacted = self.clone();
        redacted.shyft.api_key = mask_secret(&redacted.shyft.api_key);
        redacted.solana_tracker.api_key = mask_secret(&redacted.solana_tracker.api_key);
        serde_json::to_value(redacted).unwrap_or(serde_json::Value::Null)
    }
}

fn mask_secret(secret: &str) -> String {
    if secret.len() <= 8 {
        return "*".repeat(secret.len());
    }
    format!("{}...{}", &secret[..4], &secret[secret.len() - 4..])
}
