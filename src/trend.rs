use crate::model::{IndicatorSet, TrendLabel};

/// Classify the trend from the latest short and long moving averages.
pub fn classify_trend(sma_short: f64, sma_long: f64) -> TrendLabel {
    if sma_short > sma_long {
        TrendLabel::Bullish
    } else if sma_short < sma_long {
        TrendLabel::Bearish
    } else {
        TrendLabel::Neutral
    }
}

/// Trend for an indicator set; `Neutral` when either average is undefined.
pub fn trend_of(indicators: &IndicatorSet) -> TrendLabel {
    match (indicators.sma_short, indicators.sma_long) {
        (Some(short), Some(long)) => classify_trend(short, long),
        _ => TrendLabel::Neutral,
    }
}
