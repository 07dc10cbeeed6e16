use std::time::Duration;

use chrono::{FixedOffset, Local, Offset, Utc};
use serde::Deserialize;

use crate::types::{Location, SearchOptions};

const DEFAULTS: &str = include_str!("../config/default.toml");

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    /// Daily-rolling log files are written here when set.
    pub directory: Option<String>,
    pub file_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub timezone: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchConfig {
    pub max_depth: usize,
    pub max_items: usize,
    pub max_duration_secs: f64,
    pub skip_empty: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResolverConfig {
    pub max_chain_length: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RequestConfig {
    pub location: Location,
    pub path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub logging: LoggingConfig,
    pub storage: StorageConfig,
    pub search: SearchConfig,
    pub resolver: ResolverConfig,
    pub request: RequestConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        // Fallback: parse the embedded default TOML
        match from_str(DEFAULTS) {
            Ok(cfg) => cfg,
            Err(e) => panic!("Failed to parse default config: {}", e),
        }
    }
}

impl AppConfig {
    /// Default limits for searches that do not set their own.
    pub fn search_options(&self) -> SearchOptions {
        SearchOptions {
            max_depth: self.search.max_depth,
            max_items: self.search.max_items,
            max_duration: Duration::try_from_secs_f64(self.search.max_duration_secs).unwrap_or(Duration::MAX),
            skip_empty: self.search.skip_empty,
        }
    }

    /// `None` when the chain ceiling is disabled.
    pub fn max_chain_length(&self) -> Option<usize> {
        match self.resolver.max_chain_length {
            0 => None,
            n => Some(n),
        }
    }

    pub fn timezone(&self) -> anyhow::Result<FixedOffset> {
        parse_timezone(&self.storage.timezone)
    }
}

/// Parses `"UTC"`, `"local"` or a fixed offset like `"+02:00"`.
pub fn parse_timezone(value: &str) -> anyhow::Result<FixedOffset> {
    match value.trim() {
        v if v.eq_ignore_ascii_case("utc") || v.eq_ignore_ascii_case("z") => Ok(Utc.fix()),
        v if v.eq_ignore_ascii_case("local") => Ok(Local::now().offset().fix()),
        v => v
            .parse::<FixedOffset>()
            .map_err(|e| anyhow::anyhow!("invalid storage.timezone '{}': {}", v, e)),
    }
}

fn from_str(toml: &str) -> anyhow::Result<AppConfig> {
    let cfg = ::config::Config::builder()
        .add_source(::config::File::from_str(toml, ::config::FileFormat::Toml))
        .build()?;
    Ok(cfg.try_deserialize()?)
}

pub fn load() -> anyhow::Result<AppConfig> {
    // Load .env first (optional)
    let _ = dotenvy::dotenv();

    let mut builder = ::config::Config::builder()
        .add_source(::config::File::from_str(DEFAULTS, ::config::FileFormat::Toml))
        // Optional local file: searchfs.toml (in CWD)
        .add_source(::config::File::with_name("searchfs").required(false));

    if let Ok(custom_path) = std::env::var("SEARCHFS_CONFIG") {
        builder = builder.add_source(::config::File::with_name(&custom_path).required(false));
    }
    // Environment variables last to have highest precedence
    builder = builder.add_source(::config::Environment::with_prefix("SEARCHFS").separator("__"));

    let cfg = builder.build()?;
    let app_cfg: AppConfig = cfg.try_deserialize()?;
    validate(&app_cfg)?;
    Ok(app_cfg)
}

pub fn validate(cfg: &AppConfig) -> anyhow::Result<()> {
    // Search
    if cfg.search.max_depth == 0 {
        return Err(anyhow::anyhow!("search.max_depth must be > 0"));
    }
    if cfg.search.max_items == 0 {
        return Err(anyhow::anyhow!("search.max_items must be > 0"));
    }
    if !cfg.search.max_duration_secs.is_finite() || cfg.search.max_duration_secs <= 0.0 {
        return Err(anyhow::anyhow!("search.max_duration_secs must be a positive number"));
    }

    // Storage
    cfg.timezone()?;

    // Request
    if cfg.request.path.trim().is_empty() {
        return Err(anyhow::anyhow!("request.path must not be empty"));
    }

    Ok(())
}

/// Rejects non-positive limits in the options a search will actually run with.
pub fn validate_search_options(options: &SearchOptions) -> anyhow::Result<()> {
    if options.max_depth == 0 {
        return Err(anyhow::anyhow!("options.max_depth must be > 0"));
    }
    if options.max_items == 0 {
        return Err(anyhow::anyhow!("options.max_items must be > 0"));
    }
    if options.max_duration.is_zero() {
        return Err(anyhow::anyhow!("options.max_duration must be > 0"));
    }
    Ok(())
}
