pub mod json;
pub mod terminal;

use serde::Serialize;

use crate::model::{CompanyInfo, IndicatorSet, StockRecord, TrendLabel};

pub const NO_RESULTS_MESSAGE: &str =
    "No stocks match the selected criteria. Try adjusting your filters.";

/// Sink for a ranked, filtered result set.
pub trait Presenter: Send + Sync {
    fn present(&self, records: &[&StockRecord]);

    /// Called instead of `present` when nothing passed the filters.
    fn no_results(&self);
}

/// Flat, serializable view of a record.
///
/// Recommendation is exposed both as the canonical key and the display label.
#[derive(Debug, Clone, Serialize)]
pub struct RecordView {
    pub symbol: String,
    pub name: String,
    pub market: String,
    pub current_price: f64,
    pub target_price: f64,
    pub target_high: f64,
    pub target_low: f64,
    pub potential_return: f64,
    pub potential_return_high: f64,
    pub potential_return_low: f64,
    pub analyst_rating: f64,
    pub analyst_count: u32,
    pub indicators: IndicatorSet,
    pub trend: TrendLabel,
    pub recommendation: &'static str,
    pub recommendation_display: &'static str,
    pub reasons: Vec<String>,
    pub company: CompanyInfo,
}

impl From<&StockRecord> for RecordView {
    fn from(r: &StockRecord) -> Self {
        Self {
            symbol: r.symbol.clone(),
            name: r.name.clone(),
            market: r.market.clone(),
            current_price: r.current_price,
            target_price: r.targets.mean,
            target_high: r.targets.high,
            target_low: r.targets.low,
            potential_return: r.returns.mean_pct,
            potential_return_high: r.returns.high_pct,
            potential_return_low: r.returns.low_pct,
            analyst_rating: r.analyst.mean,
            analyst_count: r.analyst.analyst_count,
            indicators: r.indicators,
            trend: r.trend,
            recommendation: r.recommendation.canonical(),
            recommendation_display: r.recommendation.display(),
            reasons: r.recommendation.reasons.clone(),
            company: r.company.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::tests::record;

    #[test]
    fn record_view_flattens_record() {
        let view = RecordView::from(&record("AAPL", "US"));
        let json = serde_json::to_value(&view).unwrap();

        assert_eq!(json["symbol"], "AAPL");
        assert_eq!(json["target_price"], 110.0);
        assert_eq!(json["potential_return_low"], -5.0);
        assert_eq!(json["analyst_rating"], 2.0);
        assert_eq!(json["analyst_count"], 10);
        assert_eq!(json["indicators"]["rsi"], 50.0);
        assert_eq!(json["trend"], "Bullish");
        assert_eq!(json["recommendation"], "buy");
        assert_eq!(json["recommendation_display"], "KØB");
    }
}
