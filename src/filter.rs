use std::collections::HashSet;

use crate::model::{RecommendationLabel, StockRecord};

/// User-selectable predicates over assembled records.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterCriteria {
    pub markets: HashSet<String>,
    pub strong_buy_only: bool,
    pub hide_downside_risk: bool,
    pub min_rsi: f64,
    pub max_rsi: f64,
    pub min_analysts: u32,
    pub min_return_pct: f64,
}

impl FilterCriteria {
    fn rsi_range_is_full(&self) -> bool {
        self.min_rsi <= 0.0 && self.max_rsi >= 100.0
    }

    pub fn matches(&self, record: &StockRecord) -> bool {
        let rsi_ok = match record.indicators.rsi {
            Some(rsi) => (self.min_rsi..=self.max_rsi).contains(&rsi),
            None => self.rsi_range_is_full(),
        };

        self.markets.contains(&record.market)
            && (!self.strong_buy_only
                || record.recommendation.label == Some(RecommendationLabel::StrongBuy))
            && rsi_ok
            && record.analyst.analyst_count >= self.min_analysts
            && record.returns.mean_pct >= self.min_return_pct
            && (!self.hide_downside_risk || record.returns.low_pct >= 0.0)
    }
}

/// Records satisfying every predicate in `criteria`. Empty when nothing matches.
pub fn apply<'a>(records: &'a [StockRecord], criteria: &FilterCriteria) -> Vec<&'a StockRecord> {
    records.iter().filter(|r| criteria.matches(r)).collect()
}

/// Best `limit` records by mean potential return, highest first.
pub fn rank_by_potential_return<'a>(
    mut records: Vec<&'a StockRecord>,
    limit: usize,
) -> Vec<&'a StockRecord> {
    records.sort_by(|a, b| b.returns.mean_pct.total_cmp(&a.returns.mean_pct));
    records.truncate(limit);
    records
}
