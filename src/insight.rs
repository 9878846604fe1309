use serde::Serialize;
use tracing::warn;

use crate::assembler::{ScanSettings, build_signals, fetch_stock_data};
use crate::indicator::{IndicatorSeries, compute_indicator_series};
use crate::model::TrendLabel;
use crate::sentiment::{Sentiment, analyze_sentiment};
use crate::source::MarketDataSource;
use crate::strategy::RecommendationStrategy;
use crate::strategy::technical::{TechnicalStrategy, price_vs_sma_pct};

#[derive(Debug, Clone, Serialize)]
pub struct TechnicalSummary {
    pub trend: TrendLabel,
    pub rsi: Option<f64>,
    pub price_vs_sma_short_pct: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Analysis {
    pub recommendation: &'static str,
    pub recommendation_display: &'static str,
    pub reasons: Vec<String>,
    pub technical_score: i32,
}

/// Single-symbol deep dive: technical summary, news sentiment and chart series.
#[derive(Debug, Clone, Serialize)]
pub struct MarketInsight {
    pub symbol: String,
    pub current_price: Option<f64>,
    pub technical_summary: Option<TechnicalSummary>,
    pub sentiment: Option<Sentiment>,
    pub analysis: Analysis,
    pub chart: Option<IndicatorSeries>,
    /// Set when the symbol's data could not be fetched.
    pub error: Option<String>,
}

/// Analyse one symbol with `strategy`, folding in sentiment of `news`.
///
/// A failed fetch still yields an insight, with a no-data recommendation and
/// the failure in `error`.
pub async fn market_insight(
    source: &dyn MarketDataSource,
    symbol: &str,
    strategy: &dyn RecommendationStrategy,
    settings: &ScanSettings,
    news: Option<&str>,
) -> MarketInsight {
    let sentiment = news.map(analyze_sentiment);

    let fetched = tokio::time::timeout(
        settings.fetch_timeout,
        fetch_stock_data(source, symbol, settings.history_period),
    )
    .await;
    let data = match fetched {
        Ok(Ok(data)) => Some(data),
        Ok(Err(e)) => {
            warn!(symbol, error = ?e, "insight fetch failed");
            None
        }
        Err(_) => {
            warn!(symbol, timeout = ?settings.fetch_timeout, "insight fetch timed out");
            None
        }
    };

    let signals = data
        .as_ref()
        .and_then(|d| build_signals(d, &settings.indicators, sentiment));
    let score = strategy.score(signals.as_ref());
    // The technical score is reported even when another strategy drives the label
    let technical_score = signals.as_ref().map_or(0, |s| {
        TechnicalStrategy::new(settings.indicators.sma_short, settings.indicators.sma_long)
            .score(Some(s))
            .points
    });

    MarketInsight {
        symbol: symbol.to_owned(),
        current_price: signals.as_ref().map(|s| s.price),
        technical_summary: signals.as_ref().map(|s| TechnicalSummary {
            trend: s.trend,
            rsi: s.indicators.rsi,
            price_vs_sma_short_pct: price_vs_sma_pct(s),
        }),
        sentiment,
        analysis: Analysis {
            recommendation: score.canonical(),
            recommendation_display: score.display(),
            reasons: score.reasons,
            technical_score,
        },
        chart: data
            .as_ref()
            .map(|d| compute_indicator_series(&d.series, &settings.indicators)),
        error: data
            .is_none()
            .then(|| format!("could not fetch data for {symbol}")),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::assembler::tests::{MockSource, rated, rising};
    use crate::indicator::IndicatorSettings;
    use crate::model::HistoryPeriod;
    use crate::strategy::RatingStrategy;

    fn settings() -> ScanSettings {
        ScanSettings {
            history_period: HistoryPeriod::Month6,
            indicators: IndicatorSettings::default(),
            fetch_timeout: Duration::from_secs(5),
            max_concurrent_fetches: 1,
        }
    }

    #[tokio::test]
    async fn insight_summarises_technicals_and_sentiment() {
        let source = MockSource::default().with("NVDA", rising(60), rated(1.3, 40));
        let insight = market_insight(
            &source,
            "NVDA",
            &RatingStrategy,
            &settings(),
            Some("Strong growth and rising margins"),
        )
        .await;

        assert_eq!(insight.current_price, Some(109.0));
        assert!(insight.error.is_none());
        let summary = insight.technical_summary.unwrap();
        assert_eq!(summary.trend, TrendLabel::Bullish);
        assert_eq!(summary.rsi, Some(100.0));
        assert!(summary.price_vs_sma_short_pct.unwrap() > 5.0);

        assert_eq!(insight.analysis.recommendation, "strongBuy");
        assert_eq!(insight.analysis.recommendation_display, "STÆRK KØB");
        assert!(
            insight
                .analysis
                .reasons
                .iter()
                .any(|r| r.starts_with("Positive news sentiment"))
        );
        // +2 trend, -2 overbought, -1 stretched above SMA20
        assert_eq!(insight.analysis.technical_score, -1);

        let chart = insight.chart.unwrap();
        assert_eq!(chart.rsi.len(), 60);
        assert_eq!(chart.sma_long.iter().filter(|v| v.is_some()).count(), 11);
    }

    #[tokio::test]
    async fn failed_fetch_yields_no_data_insight() {
        let source = MockSource::default();
        let insight =
            market_insight(&source, "GONE", &RatingStrategy, &settings(), None).await;

        assert_eq!(insight.analysis.recommendation, "none");
        assert_eq!(insight.analysis.recommendation_display, "INGEN ANBEFALING");
        assert_eq!(insight.analysis.reasons.len(), 1);
        assert!(insight.current_price.is_none());
        assert!(insight.chart.is_none());
        assert!(insight.error.is_some());
    }
}
