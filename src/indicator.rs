pub mod ma;
pub mod rsi;

use error_stack::Report;
use serde::Serialize;

use crate::error::IndicatorError;
use crate::indicator::ma::{Ema, Sma};
use crate::indicator::rsi::Rsi;
use crate::model::{Bar, IndicatorSet, PriceSeries};

/// A technical analysis indicator that operates on a slice of bars.
///
/// Bars must be in ascending chronological order (oldest first).
pub trait Indicator: Send + Sync {
    /// Unique name of this indicator (e.g., "rsi", "sma").
    fn name(&self) -> &str;

    /// Minimum number of bars required to produce at least one output value.
    fn required_bars(&self) -> usize;

    /// Calculate indicator values from bars.
    ///
    /// Returns one value per output point. The number of values may be less
    /// than the number of input bars depending on the indicator's lookback.
    fn calculate(&self, bars: &[Bar]) -> Result<Vec<f64>, Report<IndicatorError>>;

    /// Latest value, or the error explaining why there is none.
    fn latest(&self, bars: &[Bar]) -> Result<f64, Report<IndicatorError>> {
        let values = self.calculate(bars)?;
        values.last().copied().ok_or_else(|| {
            Report::new(IndicatorError::InsufficientData {
                required: self.required_bars(),
                available: bars.len(),
            })
        })
    }

    /// Full series aligned to `bars`, `None` where the lookback is not filled.
    fn aligned(&self, bars: &[Bar]) -> Vec<Option<f64>> {
        match self.calculate(bars) {
            Ok(values) => align_series(bars.len(), values),
            Err(_) => vec![None; bars.len()],
        }
    }
}

/// Extract close prices from a slice of bars.
pub fn close_prices(bars: &[Bar]) -> Vec<f64> {
    bars.iter().map(|b| b.close).collect()
}

fn align_series(total_len: usize, values: Vec<f64>) -> Vec<Option<f64>> {
    let offset = total_len.saturating_sub(values.len());
    let mut output = vec![None; total_len];
    for (index, value) in values.into_iter().enumerate() {
        output[offset + index] = Some(value);
    }
    output
}

/// Lookback windows used for a single evaluation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndicatorSettings {
    pub rsi_period: usize,
    pub sma_short: usize,
    pub sma_long: usize,
}

impl Default for IndicatorSettings {
    fn default() -> Self {
        Self {
            rsi_period: 14,
            sma_short: 20,
            sma_long: 50,
        }
    }
}

/// Rolling indicator series for charting.
#[derive(Debug, Clone, Serialize)]
pub struct IndicatorSeries {
    pub rsi: Vec<Option<f64>>,
    pub sma_short: Vec<Option<f64>>,
    pub sma_long: Vec<Option<f64>>,
    pub ema_short: Vec<Option<f64>>,
}

fn latest_or_log<I: Indicator>(
    indicator: Result<I, Report<IndicatorError>>,
    bars: &[Bar],
) -> Option<f64> {
    let indicator = match indicator {
        Ok(i) => i,
        Err(e) => {
            tracing::warn!(error = ?e, "indicator misconfigured");
            return None;
        }
    };
    match indicator.latest(bars) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::debug!(indicator = indicator.name(), error = %e, "indicator undefined");
            None
        }
    }
}

fn aligned_or_empty<I: Indicator>(
    indicator: Result<I, Report<IndicatorError>>,
    bars: &[Bar],
) -> Vec<Option<f64>> {
    match indicator {
        Ok(i) => i.aligned(bars),
        Err(_) => vec![None; bars.len()],
    }
}

/// Compute the latest RSI and moving averages for `series`.
///
/// Each value is `None` when the series is too short for its lookback.
pub fn compute_indicator_set(series: &PriceSeries, settings: &IndicatorSettings) -> IndicatorSet {
    let bars = series.bars();
    IndicatorSet {
        rsi: latest_or_log(Rsi::new(settings.rsi_period), bars),
        sma_short: latest_or_log(Sma::new(settings.sma_short), bars),
        sma_long: latest_or_log(Sma::new(settings.sma_long), bars),
    }
}

/// Compute the full aligned series for every indicator.
pub fn compute_indicator_series(series: &PriceSeries, settings: &IndicatorSettings) -> IndicatorSeries {
    let bars = series.bars();
    IndicatorSeries {
        rsi: aligned_or_empty(Rsi::new(settings.rsi_period), bars),
        sma_short: aligned_or_empty(Sma::new(settings.sma_short), bars),
        sma_long: aligned_or_empty(Sma::new(settings.sma_long), bars),
        ema_short: aligned_or_empty(Ema::new(settings.sma_short), bars),
    }
}
