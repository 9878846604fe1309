pub mod rating;
pub mod technical;

use crate::indicator::IndicatorSettings;
use crate::model::{AnalystRating, IndicatorSet, RecommendationScore, TrendLabel};
use crate::sentiment::Sentiment;

pub use rating::RatingStrategy;
pub use technical::TechnicalStrategy;

const NO_DATA_REASON: &str = "Could not fetch stock data";

/// Signals a strategy scores for one symbol.
#[derive(Debug, Clone)]
pub struct Signals {
    pub price: f64,
    pub indicators: IndicatorSet,
    pub trend: TrendLabel,
    pub analyst: AnalystRating,
    pub sentiment: Option<Sentiment>,
}

/// Maps a bundle of signals to a recommendation.
///
/// Implementations are pure: identical signals give identical scores.
pub trait RecommendationStrategy: Send + Sync {
    fn name(&self) -> &str;

    /// Score `signals`. `None` means the symbol's data could not be fetched.
    fn score(&self, signals: Option<&Signals>) -> RecommendationScore {
        match signals {
            Some(signals) => self.score_signals(signals),
            None => RecommendationScore::no_data(NO_DATA_REASON),
        }
    }

    fn score_signals(&self, signals: &Signals) -> RecommendationScore;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyKind {
    Rating,
    Technical,
}

impl StrategyKind {
    /// Parse a config-format string (`"rating"` or `"technical"`).
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "rating" => Some(Self::Rating),
            "technical" => Some(Self::Technical),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Rating => "rating",
            Self::Technical => "technical",
        }
    }
}

pub fn build_strategy(
    kind: StrategyKind,
    settings: &IndicatorSettings,
) -> Box<dyn RecommendationStrategy> {
    match kind {
        StrategyKind::Rating => Box::new(RatingStrategy),
        StrategyKind::Technical => Box::new(TechnicalStrategy::new(
            settings.sma_short,
            settings.sma_long,
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strategy_kind_parses_config_strings() {
        assert_eq!(StrategyKind::from_str("rating"), Some(StrategyKind::Rating));
        assert_eq!(
            StrategyKind::from_str("technical"),
            Some(StrategyKind::Technical)
        );
        assert_eq!(StrategyKind::from_str("momentum"), None);
    }

    #[test]
    fn build_strategy_selects_variant() {
        let settings = IndicatorSettings::default();
        assert_eq!(build_strategy(StrategyKind::Rating, &settings).name(), "rating");
        assert_eq!(
            build_strategy(StrategyKind::Technical, &settings).name(),
            "technical"
        );
    }

    #[test]
    fn missing_data_yields_no_data_for_every_strategy() {
        let settings = IndicatorSettings::default();
        for kind in [StrategyKind::Rating, StrategyKind::Technical] {
            let score = build_strategy(kind, &settings).score(None);
            assert_eq!(score.label, None);
            assert_eq!(score.points, 0);
            assert_eq!(score.reasons.len(), 1);
        }
    }
}
