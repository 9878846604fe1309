use crate::model::{RecommendationLabel, RecommendationScore};
use crate::sentiment::sentiment_reason;
use crate::strategy::{RecommendationStrategy, Signals};

/// Map an analyst consensus mean (1 = strong buy, 5 = strong sell) to a label.
///
/// Upper bounds are inclusive.
pub fn map_rating_to_label(mean: f64) -> RecommendationLabel {
    if mean <= 1.5 {
        RecommendationLabel::StrongBuy
    } else if mean <= 2.2 {
        RecommendationLabel::Buy
    } else if mean <= 3.2 {
        RecommendationLabel::Hold
    } else if mean <= 4.2 {
        RecommendationLabel::Sell
    } else {
        RecommendationLabel::StrongSell
    }
}

/// Recommendation straight from the analyst consensus.
pub struct RatingStrategy;

impl RecommendationStrategy for RatingStrategy {
    fn name(&self) -> &str {
        "rating"
    }

    fn score_signals(&self, signals: &Signals) -> RecommendationScore {
        let mut reasons = vec![format!(
            "Analyst consensus {:.1}/5.0 from {} analysts",
            signals.analyst.mean, signals.analyst.analyst_count
        )];
        reasons.extend(signals.sentiment.as_ref().and_then(sentiment_reason));

        RecommendationScore {
            label: Some(map_rating_to_label(signals.analyst.mean)),
            points: 0,
            reasons,
        }
    }
}
