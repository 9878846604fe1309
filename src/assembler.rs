use std::time::Duration;

use error_stack::{Report, ResultExt, bail};
use futures::{StreamExt, stream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::MarketConfig;
use crate::error::SourceError;
use crate::indicator::{IndicatorSettings, compute_indicator_set};
use crate::model::{
    AnalystRating, CompanyInfo, HistoryPeriod, PotentialReturns, PriceTargets, StockData,
    StockRecord,
};
use crate::sentiment::Sentiment;
use crate::source::MarketDataSource;
use crate::strategy::{RecommendationStrategy, Signals};
use crate::trend::trend_of;

const DEFAULT_RATING_MEAN: f64 = 3.0;
const DEFAULT_DESCRIPTION: &str = "No description available";
const DEFAULT_SECTOR: &str = "Unknown sector";
const DEFAULT_INDUSTRY: &str = "Unknown industry";
const DEFAULT_WEBSITE: &str = "#";

/// Knobs for one refresh of the symbol universe.
#[derive(Debug, Clone)]
pub struct ScanSettings {
    pub history_period: HistoryPeriod,
    pub indicators: IndicatorSettings,
    pub fetch_timeout: Duration,
    pub max_concurrent_fetches: usize,
}

/// Records that made it through a batch, and the symbols that did not.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub records: Vec<StockRecord>,
    pub skipped: Vec<String>,
}

#[derive(Debug)]
pub enum Refresh {
    Completed(BatchOutcome),
    Cancelled,
}

/// Fetch history and metadata for `symbol` concurrently.
pub async fn fetch_stock_data(
    source: &dyn MarketDataSource,
    symbol: &str,
    period: HistoryPeriod,
) -> Result<StockData, Report<SourceError>> {
    let (series, metadata) = futures::try_join!(
        source.fetch_history(symbol, period),
        source.fetch_metadata(symbol)
    )?;

    if series.is_empty() {
        bail!(SourceError::EmptyHistory {
            symbol: symbol.to_owned(),
        });
    }

    Ok(StockData { series, metadata })
}

/// Signals for a strategy, or `None` when the series has no bars.
pub fn build_signals(
    data: &StockData,
    settings: &IndicatorSettings,
    sentiment: Option<Sentiment>,
) -> Option<Signals> {
    let price = data.series.last_close()?;
    let indicators = compute_indicator_set(&data.series, settings);
    let md = &data.metadata;

    Some(Signals {
        price,
        trend: trend_of(&indicators),
        indicators,
        analyst: AnalystRating {
            mean: md.recommendation_mean.unwrap_or(DEFAULT_RATING_MEAN),
            analyst_count: md.analyst_count.unwrap_or(0),
        },
        sentiment,
    })
}

/// Percentage gap from `current` to `target`; zero when there is no price.
pub fn potential_return(target: f64, current: f64) -> f64 {
    if current == 0.0 {
        return 0.0;
    }
    (target - current) / current * 100.0
}

/// Build the record for one symbol from already-fetched data.
///
/// Missing metadata falls back to defaults: targets to the current price,
/// the analyst mean to 3.0 and the analyst count to 0.
pub fn assemble_record(
    symbol: &str,
    market: &str,
    data: &StockData,
    strategy: &dyn RecommendationStrategy,
    settings: &IndicatorSettings,
) -> Result<StockRecord, Report<SourceError>> {
    let Some(signals) = build_signals(data, settings, None) else {
        bail!(SourceError::EmptyHistory {
            symbol: symbol.to_owned(),
        });
    };

    if signals.indicators.rsi.is_none() {
        debug!(symbol, bars = data.series.len(), "RSI undefined for short history");
    }

    let recommendation = strategy.score(Some(&signals));
    let md = &data.metadata;
    let current = signals.price;
    let targets = PriceTargets {
        mean: md.target_mean_price.unwrap_or(current),
        high: md.target_high_price.unwrap_or(current),
        low: md.target_low_price.unwrap_or(current),
    };

    Ok(StockRecord {
        symbol: symbol.to_owned(),
        name: md.long_name.clone().unwrap_or_else(|| symbol.to_owned()),
        market: market.to_owned(),
        current_price: current,
        returns: PotentialReturns {
            mean_pct: potential_return(targets.mean, current),
            high_pct: potential_return(targets.high, current),
            low_pct: potential_return(targets.low, current),
        },
        targets,
        analyst: signals.analyst,
        indicators: signals.indicators,
        trend: signals.trend,
        recommendation,
        company: CompanyInfo {
            description: md
                .description
                .clone()
                .unwrap_or_else(|| DEFAULT_DESCRIPTION.into()),
            sector: md.sector.clone().unwrap_or_else(|| DEFAULT_SECTOR.into()),
            industry: md.industry.clone().unwrap_or_else(|| DEFAULT_INDUSTRY.into()),
            website: md.website.clone().unwrap_or_else(|| DEFAULT_WEBSITE.into()),
            employees: md.employees,
        },
    })
}

async fn evaluate_symbol(
    source: &dyn MarketDataSource,
    market: &str,
    symbol: &str,
    strategy: &dyn RecommendationStrategy,
    settings: &ScanSettings,
) -> Result<StockRecord, Report<SourceError>> {
    let data = tokio::time::timeout(
        settings.fetch_timeout,
        fetch_stock_data(source, symbol, settings.history_period),
    )
    .await
    .change_context(SourceError::Timeout {
        symbol: symbol.to_owned(),
    })
    .attach_with(|| format!("timeout: {:?}", settings.fetch_timeout))??;

    assemble_record(symbol, market, &data, strategy, &settings.indicators)
}

/// Keep every successful record; log and skip every failed symbol.
pub fn collect_outcomes(
    outcomes: impl IntoIterator<Item = (String, Result<StockRecord, Report<SourceError>>)>,
) -> BatchOutcome {
    let mut batch = BatchOutcome::default();
    for (symbol, outcome) in outcomes {
        match outcome {
            Ok(record) => batch.records.push(record),
            Err(e) => {
                warn!(symbol = %symbol, error = ?e, "symbol skipped");
                batch.skipped.push(symbol);
            }
        }
    }
    batch
}

/// Evaluate every symbol of `universe` concurrently.
///
/// At most `max_concurrent_fetches` symbols are in flight; each gets
/// `fetch_timeout`. Failed symbols are dropped, never the batch. Returns
/// `Refresh::Cancelled` as soon as `cancel` fires.
pub async fn assemble_batch(
    source: &dyn MarketDataSource,
    universe: &[MarketConfig],
    strategy: &dyn RecommendationStrategy,
    settings: &ScanSettings,
    cancel: &CancellationToken,
) -> Refresh {
    let jobs: Vec<(String, String)> = universe
        .iter()
        .flat_map(|m| m.symbols.iter().map(move |s| (m.name.clone(), s.clone())))
        .collect();

    info!(
        symbols = jobs.len(),
        strategy = strategy.name(),
        period = %settings.history_period,
        "refresh started"
    );

    let work = stream::iter(jobs)
        .map(|(market, symbol)| async move {
            let outcome = evaluate_symbol(source, &market, &symbol, strategy, settings).await;
            (symbol, outcome)
        })
        .buffer_unordered(settings.max_concurrent_fetches.max(1))
        .collect::<Vec<_>>();

    tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            info!("refresh cancelled");
            Refresh::Cancelled
        }
        outcomes = work => {
            let batch = collect_outcomes(outcomes);
            info!(
                records = batch.records.len(),
                skipped = batch.skipped.len(),
                "refresh complete"
            );
            Refresh::Completed(batch)
        }
    }
}

/// Hands out one cancellation token per refresh.
///
/// Starting a refresh cancels the one still in flight, so stale results never
/// reach the presenter.
#[derive(Debug, Default)]
pub struct RefreshController {
    current: Option<CancellationToken>,
}

impl RefreshController {
    pub fn begin(&mut self) -> CancellationToken {
        let token = CancellationToken::new();
        if let Some(stale) = self.current.replace(token.clone()) {
            stale.cancel();
        }
        token
    }

    pub fn cancel(&mut self) {
        if let Some(token) = self.current.take() {
            token.cancel();
        }
    }
}
