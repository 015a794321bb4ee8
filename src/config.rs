use clap::{Parser, Subcommand};
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub sync: SyncConfig,
    pub processing: ProcessingConfig,
    pub llm: LlmConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self { url: "sqlite://data/engagic.db".to_string() }
    }
}

/// Sync-loop cadence and the historical/future window a meeting must fall
/// in to be eligible for enqueue.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    #[serde(deserialize_with = "deserialize_duration_secs")]
    pub interval_hours: u64,
    pub historical_cutoff_days: i64,
    pub future_cutoff_days: i64,
    pub fetch_concurrency: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self { interval_hours: 72, historical_cutoff_days: 180, future_cutoff_days: 60, fetch_concurrency: 1 }
    }
}

/// Queue-worker pool sizing, retry policy, and LLM call shaping.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    pub llm_concurrency: usize,
    pub max_retries: i32,
    pub queue_lease_ttl_secs: i64,
    pub batch_chunk_size: usize,
    #[serde(deserialize_with = "deserialize_duration_secs")]
    pub batch_chunk_delay_secs: u64,
    pub use_flash_lite: bool,
    #[serde(deserialize_with = "deserialize_duration_secs")]
    pub pdf_extract_timeout_secs: u64,
    #[serde(deserialize_with = "deserialize_duration_secs")]
    pub llm_call_timeout_secs: u64,
    #[serde(deserialize_with = "deserialize_duration_secs")]
    pub llm_retry_budget_secs: u64,
    #[serde(deserialize_with = "deserialize_duration_secs")]
    pub shutdown_grace_secs: u64,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            llm_concurrency: 3,
            max_retries: 3,
            queue_lease_ttl_secs: 600,
            batch_chunk_size: 5,
            batch_chunk_delay_secs: 120,
            use_flash_lite: false,
            pdf_extract_timeout_secs: 600,
            llm_call_timeout_secs: 300,
            llm_retry_budget_secs: 180,
            shutdown_grace_secs: 15,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub api_base: String,
    pub api_key: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self { api_base: "https://generativelanguage.googleapis.com/v1beta".to_string(), api_key: String::new() }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info,engagic_core=debug".to_string(), file: Some("logs/engagic.log".to_string()) }
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Fetch new meetings for active cities and enqueue eligible ones.
    SyncCities {
        #[arg(long)]
        banana: Option<String>,
    },
    /// Drain the processing queue once, claiming jobs up to `llm_concurrency`.
    ProcessCities,
    /// Run sync then process, the default single-pass entry point.
    SyncAndProcessCities {
        #[arg(long)]
        banana: Option<String>,
    },
    /// List pending queue jobs without claiming them.
    PreviewQueue {
        #[arg(long, default_value_t = 20)]
        limit: i64,
    },
    /// Run text extraction against a single URL and print the result.
    ExtractText {
        url: String,
    },
    /// Print queue depth by status and exit.
    Status,
    /// Run the long-lived process: a sync loop on `SYNC_INTERVAL` alongside
    /// a continuously-polling processing loop, until interrupted.
    Serve,
}

#[derive(Parser, Debug, Clone)]
#[command(name = "engagic")]
#[command(version, about = "Civic meeting agenda ingestion and summarization")]
pub struct CommandLineArgs {
    #[command(subcommand)]
    pub command: Command,

    /// Path to configuration file
    #[arg(long, value_name = "PATH")]
    pub config: Option<String>,

    /// Database URL (overrides config file)
    #[arg(long, value_name = "URL")]
    pub database_url: Option<String>,

    /// Logging level (overrides config file, e.g. "info,engagic_core=debug")
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// LLM provider API key (overrides config file)
    #[arg(long, value_name = "KEY")]
    pub llm_api_key: Option<String>,

    /// Use the cheaper flash-lite tier for eligible items (overrides config file)
    #[arg(long, value_name = "BOOL")]
    pub use_flash_lite: Option<bool>,

    /// Concurrent LLM workers draining the queue (overrides config file)
    #[arg(long, value_name = "N")]
    pub llm_concurrency: Option<usize>,
}

impl Config {
    /// Loading order (lowest to highest priority): defaults, config file,
    /// `APP_*` environment variables, command line flags.
    pub fn load(args: &CommandLineArgs) -> Result<Self, anyhow::Error> {
        let config_path = args.config.clone().or_else(Self::find_config_file);
        let mut config = if let Some(config_path) = config_path {
            Self::from_toml(&config_path)?
        } else {
            tracing::warn!("configuration file not found, using defaults");
            Config::default()
        };

        config.apply_env_overrides();
        config.apply_cli_overrides(args);
        config.validate()?;

        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(db_url) = std::env::var("APP_DATABASE_URL") {
            self.database.url = db_url;
            tracing::info!("override database.url from env");
        }
        if let Ok(level) = std::env::var("APP_LOG_LEVEL") {
            self.logging.level = level;
            tracing::info!("override logging.level from env: {}", self.logging.level);
        }
        if let Ok(key) = std::env::var("APP_LLM_API_KEY") {
            self.llm.api_key = key;
            tracing::info!("override llm.api_key from env");
        }
        if let Ok(flag) = std::env::var("APP_USE_FLASH_LITE")
            && let Ok(val) = flag.parse()
        {
            self.processing.use_flash_lite = val;
            tracing::info!("override processing.use_flash_lite from env: {}", val);
        }
        if let Ok(n) = std::env::var("APP_LLM_CONCURRENCY")
            && let Ok(val) = n.parse()
        {
            self.processing.llm_concurrency = val;
            tracing::info!("override processing.llm_concurrency from env: {}", val);
        }
    }

    fn apply_cli_overrides(&mut self, args: &CommandLineArgs) {
        if let Some(db_url) = &args.database_url {
            self.database.url = db_url.clone();
            tracing::info!("override database.url from CLI");
        }
        if let Some(level) = &args.log_level {
            self.logging.level = level.clone();
            tracing::info!("override logging.level from CLI: {}", self.logging.level);
        }
        if let Some(key) = &args.llm_api_key {
            self.llm.api_key = key.clone();
            tracing::info!("override llm.api_key from CLI");
        }
        if let Some(flag) = args.use_flash_lite {
            self.processing.use_flash_lite = flag;
            tracing::info!("override processing.use_flash_lite from CLI: {}", flag);
        }
        if let Some(n) = args.llm_concurrency {
            self.processing.llm_concurrency = n;
            tracing::info!("override processing.llm_concurrency from CLI: {}", n);
        }
    }

    fn validate(&self) -> Result<(), anyhow::Error> {
        if self.database.url.is_empty() {
            anyhow::bail!("database.url cannot be empty");
        }
        if self.processing.llm_concurrency == 0 {
            anyhow::bail!("processing.llm_concurrency must be > 0");
        }
        if self.sync.interval_hours == 0 {
            anyhow::bail!("sync.interval_hours must be > 0");
        }
        if self.llm.api_key.is_empty() {
            tracing::warn!("llm.api_key is empty; LLM calls will fail until it's set");
        }
        Ok(())
    }

    fn find_config_file() -> Option<String> {
        let possible_paths = ["conf/config.toml", "config.toml", "./conf/config.toml", "./config.toml"];
        possible_paths.iter().find(|p| Path::new(p).exists()).map(|p| p.to_string())
    }

    fn from_toml(path: &str) -> Result<Self, anyhow::Error> {
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}

fn parse_duration_to_secs(input: &str) -> Result<u64, String> {
    if let Ok(val) = input.parse::<u64>() {
        return Ok(val);
    }
    let s = input.trim().to_lowercase();
    let (num_str, unit) = s.split_at(s.chars().take_while(|c| c.is_ascii_digit()).count());
    if num_str.is_empty() || unit.is_empty() {
        return Err("missing number or unit".into());
    }
    let n: u64 = num_str.parse().map_err(|_| "invalid number".to_string())?;
    match unit {
        "s" | "sec" | "secs" | "second" | "seconds" => Ok(n),
        "m" | "min" | "mins" | "minute" | "minutes" => Ok(n * 60),
        "h" | "hr" | "hour" | "hours" => Ok(n * 60 * 60),
        "d" | "day" | "days" => Ok(n * 60 * 60 * 24),
        _ => Err(format!("unsupported unit: {}", unit)),
    }
}

fn deserialize_duration_secs<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    struct Visitor;
    impl<'de> serde::de::Visitor<'de> for Visitor {
        type Value = u64;
        fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
            write!(f, "a number of seconds or a string like '30s', '5m', '1h'")
        }
        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E> {
            Ok(v)
        }
        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            if v >= 0 { Ok(v as u64) } else { Err(E::custom("negative not allowed")) }
        }
        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            parse_duration_to_secs(v).map_err(E::custom)
        }
        fn visit_string<E>(self, v: String) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            parse_duration_to_secs(&v).map_err(E::custom)
        }
    }
    deserializer.deserialize_any(Visitor)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_pass_validation() {
        let mut config = Config::default();
        config.llm.api_key = "test-key".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_zero_concurrency() {
        let mut config = Config::default();
        config.processing.llm_concurrency = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn duration_parsing_accepts_units() {
        assert_eq!(parse_duration_to_secs("30").unwrap(), 30);
        assert_eq!(parse_duration_to_secs("5m").unwrap(), 300);
        assert_eq!(parse_duration_to_secs("2h").unwrap(), 7200);
    }
}
