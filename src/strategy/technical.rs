use crate::model::{RecommendationLabel, RecommendationScore, TrendLabel};
use crate::sentiment::sentiment_reason;
use crate::strategy::{RecommendationStrategy, Signals};

const RSI_OVERBOUGHT: f64 = 70.0;
const RSI_OVERSOLD: f64 = 30.0;
const RSI_NEUTRAL_LOW: f64 = 40.0;
const RSI_NEUTRAL_HIGH: f64 = 60.0;
/// Percent distance from the short SMA that counts as stretched.
const MOMENTUM_BAND_PCT: f64 = 5.0;

/// Additive point score over trend, RSI and momentum.
pub struct TechnicalStrategy {
    short_window: usize,
    long_window: usize,
}

impl TechnicalStrategy {
    pub fn new(short_window: usize, long_window: usize) -> Self {
        Self {
            short_window,
            long_window,
        }
    }
}

impl RecommendationStrategy for TechnicalStrategy {
    fn name(&self) -> &str {
        "technical"
    }

    fn score_signals(&self, signals: &Signals) -> RecommendationScore {
        let mut points = 0;
        let mut reasons = Vec::new();

        match signals.trend {
            TrendLabel::Bullish => {
                points += 2;
                reasons.push(format!(
                    "Positive trend: {}-day SMA is above {}-day SMA",
                    self.short_window, self.long_window
                ));
            }
            TrendLabel::Bearish => {
                points -= 2;
                reasons.push(format!(
                    "Negative trend: {}-day SMA is below {}-day SMA",
                    self.short_window, self.long_window
                ));
            }
            TrendLabel::Neutral => {}
        }

        if let Some(rsi) = signals.indicators.rsi {
            if rsi > RSI_OVERBOUGHT {
                points -= 2;
                reasons.push(format!("Overbought: RSI is high ({rsi:.1})"));
            } else if rsi < RSI_OVERSOLD {
                points += 2;
                reasons.push(format!("Oversold: RSI is low ({rsi:.1})"));
            } else if (RSI_NEUTRAL_LOW..=RSI_NEUTRAL_HIGH).contains(&rsi) {
                points += 1;
                reasons.push(format!("RSI is in the neutral zone ({rsi:.1})"));
            }
        }

        if let Some(pct) = price_vs_sma_pct(signals) {
            if pct > MOMENTUM_BAND_PCT {
                points -= 1;
                reasons.push(format!(
                    "Trading {pct:.1}% above the {}-day SMA",
                    self.short_window
                ));
            } else if pct < -MOMENTUM_BAND_PCT {
                points += 1;
                reasons.push(format!(
                    "Trading {:.1}% below the {}-day SMA",
                    pct.abs(),
                    self.short_window
                ));
            }
        }

        reasons.extend(signals.sentiment.as_ref().and_then(sentiment_reason));

        RecommendationScore {
            label: Some(label_for_points(points)),
            points,
            reasons,
        }
    }
}

/// Percent distance of the price from the short SMA, when that SMA is usable.
pub fn price_vs_sma_pct(signals: &Signals) -> Option<f64> {
    signals
        .indicators
        .sma_short
        .filter(|&sma| sma != 0.0)
        .map(|sma| (signals.price - sma) / sma * 100.0)
}

/// Label for a point total.
///
/// StrongBuy starts at +3 while StrongSell starts below -3, so -3 is Sell.
pub fn label_for_points(points: i32) -> RecommendationLabel {
    if points >= 3 {
        RecommendationLabel::StrongBuy
    } else if points > 0 {
        RecommendationLabel::Buy
    } else if points < -3 {
        RecommendationLabel::StrongSell
    } else if points < 0 {
        RecommendationLabel::Sell
    } else {
        RecommendationLabel::Hold
    }
}
