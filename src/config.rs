use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use error_stack::{Report, ResultExt};
use serde::Deserialize;

use crate::error::ConfigError;
use crate::filter::FilterCriteria;
use crate::indicator::IndicatorSettings;
use crate::model::HistoryPeriod;
use crate::strategy::StrategyKind;

fn default_log_level() -> String {
    "info".into()
}

fn default_log_format() -> String {
    "text".into()
}

fn default_history_period() -> String {
    "6mo".into()
}

fn default_strategy() -> String {
    "rating".into()
}

fn default_max_concurrent_fetches() -> usize {
    4
}

fn default_fetch_timeout_secs() -> u64 {
    15
}

fn default_report_path() -> String {
    "top_stocks.json".into()
}

fn default_rsi_period() -> usize {
    14
}

fn default_sma_short() -> usize {
    20
}

fn default_sma_long() -> usize {
    50
}

fn default_base_url() -> String {
    "https://query1.finance.yahoo.com".into()
}

fn default_cookie_url() -> String {
    "https://fc.yahoo.com".into()
}

fn default_requests_per_second() -> u32 {
    5
}

fn default_max_rsi() -> f64 {
    100.0
}

fn default_min_analysts() -> u32 {
    3
}

#[derive(Debug, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub indicators: IndicatorConfig,
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub filter: FilterConfig,
    #[serde(default)]
    pub markets: Vec<MarketConfig>,
}

#[derive(Debug, Deserialize)]
pub struct GeneralConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Accepted values: `"text"` | `"json"`
    #[serde(default = "default_log_format")]
    pub log_format: String,
    #[serde(default = "default_history_period")]
    pub history_period: String,
    /// Accepted values: `"rating"` | `"technical"`
    #[serde(default = "default_strategy")]
    pub strategy: String,
    #[serde(default = "default_max_concurrent_fetches")]
    pub max_concurrent_fetches: usize,
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
    #[serde(default = "default_report_path")]
    pub report_path: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
            history_period: default_history_period(),
            strategy: default_strategy(),
            max_concurrent_fetches: default_max_concurrent_fetches(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
            report_path: default_report_path(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct IndicatorConfig {
    #[serde(default = "default_rsi_period")]
    pub rsi_period: usize,
    #[serde(default = "default_sma_short")]
    pub sma_short: usize,
    #[serde(default = "default_sma_long")]
    pub sma_long: usize,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            rsi_period: default_rsi_period(),
            sma_short: default_sma_short(),
            sma_long: default_sma_long(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SourceConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Host that hands out the session cookie for `quoteSummary`.
    #[serde(default = "default_cookie_url")]
    pub cookie_url: String,
    #[serde(default = "default_requests_per_second")]
    pub requests_per_second: u32,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            cookie_url: default_cookie_url(),
            requests_per_second: default_requests_per_second(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct FilterConfig {
    /// Empty selects every configured market.
    #[serde(default)]
    pub markets: Vec<String>,
    #[serde(default)]
    pub strong_buy_only: bool,
    #[serde(default)]
    pub hide_downside_risk: bool,
    #[serde(default)]
    pub min_rsi: f64,
    #[serde(default = "default_max_rsi")]
    pub max_rsi: f64,
    #[serde(default = "default_min_analysts")]
    pub min_analysts: u32,
    #[serde(default)]
    pub min_return_pct: f64,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            markets: Vec::new(),
            strong_buy_only: false,
            hide_downside_risk: false,
            min_rsi: 0.0,
            max_rsi: default_max_rsi(),
            min_analysts: default_min_analysts(),
            min_return_pct: 0.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MarketConfig {
    pub name: String,
    pub symbols: Vec<String>,
}

impl AppConfig {
    pub fn history_period(&self) -> HistoryPeriod {
        HistoryPeriod::from_str(&self.general.history_period).unwrap_or(HistoryPeriod::Month6)
    }

    pub fn strategy_kind(&self) -> StrategyKind {
        StrategyKind::from_str(&self.general.strategy).unwrap_or(StrategyKind::Rating)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.general.fetch_timeout_secs)
    }

    pub fn indicator_settings(&self) -> IndicatorSettings {
        IndicatorSettings {
            rsi_period: self.indicators.rsi_period,
            sma_short: self.indicators.sma_short,
            sma_long: self.indicators.sma_long,
        }
    }

    /// Filter criteria from the `[filter]` section.
    pub fn filter_criteria(&self) -> FilterCriteria {
        let markets = if self.filter.markets.is_empty() {
            self.markets.iter().map(|m| m.name.clone()).collect()
        } else {
            self.filter.markets.iter().cloned().collect()
        };
        FilterCriteria {
            markets,
            strong_buy_only: self.filter.strong_buy_only,
            hide_downside_risk: self.filter.hide_downside_risk,
            min_rsi: self.filter.min_rsi,
            max_rsi: self.filter.max_rsi,
            min_analysts: self.filter.min_analysts,
            min_return_pct: self.filter.min_return_pct,
        }
    }
}

/// Load and validate an `AppConfig` from a TOML file at `path`.
pub fn load(path: &Path) -> Result<AppConfig, Report<ConfigError>> {
    let content = std::fs::read_to_string(path)
        .change_context(ConfigError::ReadFile)
        .attach_with(|| format!("path: {}", path.display()))?;

    let config: AppConfig = toml::from_str(&content).change_context(ConfigError::Parse {
        reason: "invalid TOML syntax or schema mismatch".into(),
    })?;

    validate(&config)?;

    Ok(config)
}

const VALID_LOG_FORMATS: &[&str] = &["text", "json"];

fn invalid(field: String) -> Report<ConfigError> {
    Report::new(ConfigError::Validation { field })
}

fn validate(config: &AppConfig) -> Result<(), Report<ConfigError>> {
    validate_general(config)?;
    validate_indicators(config)?;
    validate_markets(config)?;
    validate_filter(config)?;
    Ok(())
}

fn validate_general(config: &AppConfig) -> Result<(), Report<ConfigError>> {
    let general = &config.general;
    if !VALID_LOG_FORMATS.contains(&general.log_format.as_str()) {
        return Err(invalid(format!(
            "general.log_format \"{}\" is not valid",
            general.log_format
        )));
    }
    if HistoryPeriod::from_str(&general.history_period).is_none() {
        return Err(invalid(format!(
            "general.history_period: unknown period \"{}\"",
            general.history_period
        )));
    }
    if StrategyKind::from_str(&general.strategy).is_none() {
        return Err(invalid(format!(
            "general.strategy: unknown strategy \"{}\"",
            general.strategy
        )));
    }
    if general.max_concurrent_fetches == 0 {
        return Err(invalid("general.max_concurrent_fetches must be > 0".into()));
    }
    if general.fetch_timeout_secs == 0 {
        return Err(invalid("general.fetch_timeout_secs must be > 0".into()));
    }
    if config.source.requests_per_second == 0 {
        return Err(invalid("source.requests_per_second must be > 0".into()));
    }
    Ok(())
}

fn validate_indicators(config: &AppConfig) -> Result<(), Report<ConfigError>> {
    let ind = &config.indicators;
    if ind.rsi_period == 0 || ind.sma_short == 0 || ind.sma_long == 0 {
        return Err(invalid("indicators: periods must be > 0".into()));
    }
    if ind.sma_short >= ind.sma_long {
        return Err(invalid(format!(
            "indicators.sma_short ({}) must be shorter than sma_long ({})",
            ind.sma_short, ind.sma_long
        )));
    }
    Ok(())
}

fn validate_markets(config: &AppConfig) -> Result<(), Report<ConfigError>> {
    if config.markets.is_empty() {
        return Err(invalid("markets: at least one market is required".into()));
    }
    let mut seen = HashSet::new();
    for market in &config.markets {
        if !seen.insert(market.name.as_str()) {
            return Err(invalid(format!(
                "markets: duplicate name \"{}\"",
                market.name
            )));
        }
        if market.symbols.is_empty() {
            return Err(invalid(format!(
                "markets[\"{}\"].symbols must not be empty",
                market.name
            )));
        }
    }
    Ok(())
}

fn validate_filter(config: &AppConfig) -> Result<(), Report<ConfigError>> {
    let filter = &config.filter;
    for name in &filter.markets {
        if !config.markets.iter().any(|m| &m.name == name) {
            return Err(invalid(format!(
                "filter.markets: \"{name}\" does not match any market"
            )));
        }
    }
    if !(0.0..=100.0).contains(&filter.min_rsi)
        || !(0.0..=100.0).contains(&filter.max_rsi)
        || filter.min_rsi > filter.max_rsi
    {
        return Err(invalid(format!(
            "filter: RSI range [{}, {}] must satisfy 0 <= min <= max <= 100",
            filter.min_rsi, filter.max_rsi
        )));
    }
    Ok(())
}
