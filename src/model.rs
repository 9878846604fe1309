use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// History range requested from the data provider.
///
/// String representations match the config file format (e.g. `"1mo"`, `"1y"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HistoryPeriod {
    Month1,
    Month3,
    Month6,
    Year1,
    Year2,
}

impl HistoryPeriod {
    /// Parse a config-format string into a `HistoryPeriod`.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "1mo" => Some(Self::Month1),
            "3mo" => Some(Self::Month3),
            "6mo" => Some(Self::Month6),
            "1y" => Some(Self::Year1),
            "2y" => Some(Self::Year2),
            _ => None,
        }
    }

    /// Return the config-format string, which is also the provider range token.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Month1 => "1mo",
            Self::Month3 => "3mo",
            Self::Month6 => "6mo",
            Self::Year1 => "1y",
            Self::Year2 => "2y",
        }
    }
}

impl fmt::Display for HistoryPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One daily OHLCV bar.
#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Chronological (oldest first) price history for one symbol.
#[derive(Debug, Clone, Default)]
pub struct PriceSeries(Vec<Bar>);

impl PriceSeries {
    pub fn new(mut bars: Vec<Bar>) -> Self {
        bars.sort_by_key(|b| b.timestamp);
        Self(bars)
    }

    pub fn bars(&self) -> &[Bar] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn last_close(&self) -> Option<f64> {
        self.0.last().map(|b| b.close)
    }
}

/// Company and analyst metadata as reported by the provider.
///
/// Every field is optional; the assembler substitutes defaults.
#[derive(Debug, Clone, Default)]
pub struct Metadata {
    pub long_name: Option<String>,
    pub target_mean_price: Option<f64>,
    pub target_high_price: Option<f64>,
    pub target_low_price: Option<f64>,
    pub recommendation_mean: Option<f64>,
    pub analyst_count: Option<u32>,
    pub description: Option<String>,
    pub sector: Option<String>,
    pub industry: Option<String>,
    pub website: Option<String>,
    pub employees: Option<u64>,
}

/// Raw inputs for one symbol, as fetched.
#[derive(Debug, Clone)]
pub struct StockData {
    pub series: PriceSeries,
    pub metadata: Metadata,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnalystRating {
    pub mean: f64,
    pub analyst_count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct IndicatorSet {
    pub rsi: Option<f64>,
    pub sma_short: Option<f64>,
    pub sma_long: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TrendLabel {
    Bullish,
    Bearish,
    Neutral,
}

impl fmt::Display for TrendLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bullish => write!(f, "Bullish"),
            Self::Bearish => write!(f, "Bearish"),
            Self::Neutral => write!(f, "Neutral"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecommendationLabel {
    StrongBuy,
    Buy,
    Hold,
    Sell,
    StrongSell,
}

impl RecommendationLabel {
    /// Locale-independent label, matching the provider's recommendation keys.
    pub fn canonical(self) -> &'static str {
        match self {
            Self::StrongBuy => "strongBuy",
            Self::Buy => "buy",
            Self::Hold => "hold",
            Self::Sell => "sell",
            Self::StrongSell => "strongSell",
        }
    }

    /// Danish display label.
    pub fn display(self) -> &'static str {
        match self {
            Self::StrongBuy => "STÆRK KØB",
            Self::Buy => "KØB",
            Self::Hold => "HOLD",
            Self::Sell => "SÆLG",
            Self::StrongSell => "STÆRK SÆLG",
        }
    }
}

const NO_DATA_CANONICAL: &str = "none";
const NO_DATA_DISPLAY: &str = "INGEN ANBEFALING";

/// Outcome of a recommendation strategy.
///
/// `label` is `None` when there was no data to score.
#[derive(Debug, Clone, PartialEq)]
pub struct RecommendationScore {
    pub label: Option<RecommendationLabel>,
    pub points: i32,
    pub reasons: Vec<String>,
}

impl RecommendationScore {
    pub fn no_data(reason: impl Into<String>) -> Self {
        Self {
            label: None,
            points: 0,
            reasons: vec![reason.into()],
        }
    }

    pub fn canonical(&self) -> &'static str {
        self.label.map_or(NO_DATA_CANONICAL, RecommendationLabel::canonical)
    }

    pub fn display(&self) -> &'static str {
        self.label.map_or(NO_DATA_DISPLAY, RecommendationLabel::display)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceTargets {
    pub mean: f64,
    pub high: f64,
    pub low: f64,
}

/// Percentage gap between the current price and each analyst target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PotentialReturns {
    pub mean_pct: f64,
    pub high_pct: f64,
    pub low_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompanyInfo {
    pub description: String,
    pub sector: String,
    pub industry: String,
    pub website: String,
    pub employees: Option<u64>,
}

/// Everything the presentation layer needs for one symbol.
#[derive(Debug, Clone)]
pub struct StockRecord {
    pub symbol: String,
    pub name: String,
    pub market: String,
    pub current_price: f64,
    pub targets: PriceTargets,
    pub returns: PotentialReturns,
    pub analyst: AnalystRating,
    pub indicators: IndicatorSet,
    pub trend: TrendLabel,
    pub recommendation: RecommendationScore,
    pub company: CompanyInfo,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn history_period_parses_config_strings() {
        let periods = [
            ("1mo", HistoryPeriod::Month1),
            ("3mo", HistoryPeriod::Month3),
            ("6mo", HistoryPeriod::Month6),
            ("1y", HistoryPeriod::Year1),
            ("2y", HistoryPeriod::Year2),
        ];
        for (s, period) in periods {
            assert_eq!(HistoryPeriod::from_str(s), Some(period));
            assert_eq!(period.as_str(), s);
        }
    }

    #[test]
    fn history_period_invalid_string_returns_none() {
        assert_eq!(HistoryPeriod::from_str("5d"), None);
        assert_eq!(HistoryPeriod::from_str(""), None);
    }

    #[test]
    fn price_series_sorts_oldest_first() {
        let now = Utc::now();
        let bar = |offset: i64, close: f64| Bar {
            timestamp: now + Duration::days(offset),
            open: close,
            high: close,
            low: close,
            close,
            volume: 0.0,
        };
        let series = PriceSeries::new(vec![bar(2, 3.0), bar(0, 1.0), bar(1, 2.0)]);
        let closes: Vec<f64> = series.bars().iter().map(|b| b.close).collect();
        assert_eq!(closes, vec![1.0, 2.0, 3.0]);
        assert_eq!(series.last_close(), Some(3.0));
    }

    #[test]
    fn recommendation_label_exposes_both_locales() {
        assert_eq!(RecommendationLabel::StrongBuy.canonical(), "strongBuy");
        assert_eq!(RecommendationLabel::StrongBuy.display(), "STÆRK KØB");
        assert_eq!(RecommendationLabel::Sell.canonical(), "sell");
        assert_eq!(RecommendationLabel::Sell.display(), "SÆLG");
    }

    #[test]
    fn no_data_score_has_single_reason() {
        let score = RecommendationScore::no_data("nothing fetched");
        assert_eq!(score.label, None);
        assert_eq!(score.points, 0);
        assert_eq!(score.reasons, vec!["nothing fetched".to_string()]);
        assert_eq!(score.canonical(), "none");
        assert_eq!(score.display(), "INGEN ANBEFALING");
    }
}
