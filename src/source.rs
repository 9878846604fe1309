pub mod yahoo;

use error_stack::Report;
use futures::future::BoxFuture;

use crate::error::SourceError;
use crate::model::{HistoryPeriod, Metadata, PriceSeries};

/// Abstraction over a market-data provider.
///
/// Uses `BoxFuture` (from `futures` crate) instead of `async fn` in trait
/// to keep the trait object-safe (`dyn MarketDataSource`).
pub trait MarketDataSource: Send + Sync {
    /// Daily price history covering `period`, oldest first.
    fn fetch_history(
        &self,
        symbol: &str,
        period: HistoryPeriod,
    ) -> BoxFuture<'_, Result<PriceSeries, Report<SourceError>>>;

    /// Company and analyst metadata.
    fn fetch_metadata(&self, symbol: &str) -> BoxFuture<'_, Result<Metadata, Report<SourceError>>>;
}
