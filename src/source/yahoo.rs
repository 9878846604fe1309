use std::num::NonZeroU32;
use std::sync::Arc;

use chrono::DateTime;
use error_stack::{Report, ResultExt};
use futures::future::BoxFuture;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use nonzero_ext::nonzero;
use reqwest::StatusCode;
use reqwest::header::{COOKIE, HeaderMap, SET_COOKIE, USER_AGENT};
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::config::SourceConfig;
use crate::error::SourceError;
use crate::model::{Bar, HistoryPeriod, Metadata, PriceSeries};
use crate::source::MarketDataSource;

const QUOTE_SUMMARY_MODULES: &str = "price,financialData,assetProfile";
/// Yahoo answers requests without a browser-like agent with 429.
const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

/// Cookie plus crumb pair that `quoteSummary` requires.
#[derive(Debug, Clone)]
struct Session {
    cookie: String,
    crumb: String,
}

/// Yahoo Finance client.
///
/// The chart endpoint is public. `quoteSummary` needs a session: a cookie
/// from `cookie_url` and a crumb from `/v1/test/getcrumb` sent with it. The
/// session is opened on first use and dropped when Yahoo rejects it, so the
/// next refresh opens a new one.
pub struct YahooSource {
    client: reqwest::Client,
    base_url: String,
    cookie_url: String,
    rate_limiter: Arc<DefaultDirectRateLimiter>,
    session: Mutex<Option<Session>>,
}

impl YahooSource {
    pub fn new(config: &SourceConfig) -> Self {
        let rps = NonZeroU32::new(config.requests_per_second).unwrap_or(nonzero!(5u32));
        Self {
            client: reqwest::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_owned(),
            cookie_url: config.cookie_url.clone(),
            rate_limiter: Arc::new(RateLimiter::direct(Quota::per_second(rps))),
            session: Mutex::new(None),
        }
    }

    async fn session(&self, symbol: &str) -> Result<Session, Report<SourceError>> {
        // Held across the handshake so concurrent fetches share one session
        let mut current = self.session.lock().await;
        if let Some(session) = current.as_ref() {
            return Ok(session.clone());
        }
        let session = self.open_session(symbol).await?;
        *current = Some(session.clone());
        Ok(session)
    }

    async fn open_session(&self, symbol: &str) -> Result<Session, Report<SourceError>> {
        let request_failed = || SourceError::Request {
            symbol: symbol.to_owned(),
        };

        self.rate_limiter.until_ready().await;
        // The cookie host answers 404 but still sets the cookie
        let response = self
            .client
            .get(&self.cookie_url)
            .header(USER_AGENT, BROWSER_USER_AGENT)
            .send()
            .await
            .change_context(request_failed())
            .attach_with(|| format!("cookie url: {}", self.cookie_url))?;
        let cookie = cookie_header(response.headers()).ok_or_else(|| {
            Report::new(request_failed()).attach("no session cookie in response")
        })?;

        self.rate_limiter.until_ready().await;
        let crumb = self
            .client
            .get(format!("{}/v1/test/getcrumb", self.base_url))
            .header(USER_AGENT, BROWSER_USER_AGENT)
            .header(COOKIE, cookie.as_str())
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .change_context(request_failed())?
            .text()
            .await
            .change_context(request_failed())?;
        let crumb = crumb.trim().to_owned();
        if crumb.is_empty() {
            return Err(Report::new(request_failed()).attach("empty crumb"));
        }

        debug!("yahoo session opened");
        Ok(Session { cookie, crumb })
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        symbol: &str,
        url: &str,
        params: &[(&str, &str)],
        session: Option<&Session>,
    ) -> Result<T, Report<SourceError>> {
        // Wait for rate limiter before making the request
        self.rate_limiter.until_ready().await;

        let mut request = self
            .client
            .get(url)
            .header(USER_AGENT, BROWSER_USER_AGENT)
            .query(params);
        if let Some(session) = session {
            request = request
                .header(COOKIE, session.cookie.as_str())
                .query(&[("crumb", session.crumb.as_str())]);
        }

        let response = request.send().await.change_context(SourceError::Request {
            symbol: symbol.to_owned(),
        })?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(Report::new(SourceError::Unauthorized {
                symbol: symbol.to_owned(),
            }));
        }
        if !status.is_success() {
            return Err(Report::new(SourceError::Request {
                symbol: symbol.to_owned(),
            })
            .attach(format!("HTTP status: {status}")));
        }

        response
            .json()
            .await
            .change_context(SourceError::ResponseParse {
                symbol: symbol.to_owned(),
            })
    }
}

/// `name=value` pairs of every `Set-Cookie` header, joined for a `Cookie` header.
fn cookie_header(headers: &HeaderMap) -> Option<String> {
    let pairs: Vec<&str> = headers
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .filter_map(|value| value.split(';').next())
        .map(str::trim)
        .filter(|pair| pair.contains('='))
        .collect();
    (!pairs.is_empty()).then(|| pairs.join("; "))
}

impl MarketDataSource for YahooSource {
    fn fetch_history(
        &self,
        symbol: &str,
        period: HistoryPeriod,
    ) -> BoxFuture<'_, Result<PriceSeries, Report<SourceError>>> {
        let symbol = symbol.to_owned();
        Box::pin(async move {
            let url = format!("{}/v8/finance/chart/{}", self.base_url, symbol);
            let params = [("range", period.as_str()), ("interval", "1d")];
            let body: ChartResponse = self.get_json(&symbol, &url, &params, None).await?;
            let series = body.into_series(&symbol)?;

            debug!(symbol = %symbol, period = %period, bars = series.len(), "history fetched");
            Ok(series)
        })
    }

    fn fetch_metadata(&self, symbol: &str) -> BoxFuture<'_, Result<Metadata, Report<SourceError>>> {
        let symbol = symbol.to_owned();
        Box::pin(async move {
            let session = self.session(&symbol).await?;
            let url = format!("{}/v10/finance/quoteSummary/{}", self.base_url, symbol);
            let params = [("modules", QUOTE_SUMMARY_MODULES)];
            let result: Result<QuoteSummaryResponse, _> =
                self.get_json(&symbol, &url, &params, Some(&session)).await;

            match result {
                Ok(body) => body.into_metadata(&symbol),
                Err(e) => {
                    if matches!(e.current_context(), SourceError::Unauthorized { .. }) {
                        warn!(symbol = %symbol, "yahoo session rejected, dropping it");
                        *self.session.lock().await = None;
                    }
                    Err(e)
                }
            }
        })
    }
}

// ── Chart endpoint ───────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    result: Option<Vec<ChartResult>>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: ChartIndicators,
}

#[derive(Debug, Deserialize)]
struct ChartIndicators {
    quote: Vec<ChartQuote>,
}

#[derive(Debug, Default, Deserialize)]
struct ChartQuote {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

impl ChartResponse {
    fn into_series(self, symbol: &str) -> Result<PriceSeries, Report<SourceError>> {
        let result = self
            .chart
            .result
            .and_then(|mut r| r.pop())
            .ok_or_else(|| {
                Report::new(SourceError::EmptyHistory {
                    symbol: symbol.to_owned(),
                })
            })?;
        let quote = result.indicators.quote.into_iter().next().unwrap_or_default();

        let at = |values: &[Option<f64>], i: usize| values.get(i).copied().flatten();
        let bars: Vec<Bar> = result
            .timestamp
            .iter()
            .enumerate()
            .filter_map(|(i, &ts)| {
                // Rows without a close are holidays or halted sessions
                let close = at(&quote.close, i)?;
                Some(Bar {
                    timestamp: DateTime::from_timestamp(ts, 0)?,
                    open: at(&quote.open, i).unwrap_or(close),
                    high: at(&quote.high, i).unwrap_or(close),
                    low: at(&quote.low, i).unwrap_or(close),
                    close,
                    volume: at(&quote.volume, i).unwrap_or(0.0),
                })
            })
            .collect();

        if bars.is_empty() {
            return Err(Report::new(SourceError::EmptyHistory {
                symbol: symbol.to_owned(),
            }));
        }
        Ok(PriceSeries::new(bars))
    }
}

// ── quoteSummary endpoint ────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteSummaryResponse {
    quote_summary: QuoteSummary,
}

#[derive(Debug, Deserialize)]
struct QuoteSummary {
    result: Option<Vec<QuoteSummaryResult>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteSummaryResult {
    #[serde(default)]
    price: Option<PriceModule>,
    #[serde(default)]
    financial_data: Option<FinancialData>,
    #[serde(default)]
    asset_profile: Option<AssetProfile>,
}

/// Yahoo wraps numbers as `{ "raw": 1.5, "fmt": "1.50" }`, or `{}` when absent.
#[derive(Debug, Default, Deserialize)]
struct RawValue {
    raw: Option<f64>,
}

fn raw(value: &Option<RawValue>) -> Option<f64> {
    value.as_ref().and_then(|v| v.raw)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PriceModule {
    long_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FinancialData {
    target_mean_price: Option<RawValue>,
    target_high_price: Option<RawValue>,
    target_low_price: Option<RawValue>,
    recommendation_mean: Option<RawValue>,
    number_of_analyst_opinions: Option<RawValue>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AssetProfile {
    long_business_summary: Option<String>,
    sector: Option<String>,
    industry: Option<String>,
    website: Option<String>,
    full_time_employees: Option<u64>,
}

impl QuoteSummaryResponse {
    fn into_metadata(self, symbol: &str) -> Result<Metadata, Report<SourceError>> {
        let result = self
            .quote_summary
            .result
            .and_then(|mut r| r.pop())
            .ok_or_else(|| {
                Report::new(SourceError::EmptyMetadata {
                    symbol: symbol.to_owned(),
                })
            })?;

        let mut metadata = Metadata {
            long_name: result.price.and_then(|p| p.long_name),
            ..Metadata::default()
        };
        if let Some(fd) = result.financial_data {
            metadata.target_mean_price = raw(&fd.target_mean_price);
            metadata.target_high_price = raw(&fd.target_high_price);
            metadata.target_low_price = raw(&fd.target_low_price);
            metadata.recommendation_mean = raw(&fd.recommendation_mean);
            metadata.analyst_count = raw(&fd.number_of_analyst_opinions).map(|n| n as u32);
        }
        if let Some(profile) = result.asset_profile {
            metadata.description = profile.long_business_summary;
            metadata.sector = profile.sector;
            metadata.industry = profile.industry;
            metadata.website = profile.website;
            metadata.employees = profile.full_time_employees;
        }
        Ok(metadata)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chart_response_parses_into_series() {
        let json = r#"{
            "chart": {
                "result": [{
                    "timestamp": [1704153600, 1704240000, 1704326400],
                    "indicators": {
                        "quote": [{
                            "open": [185.0, 184.0, null],
                            "high": [188.0, 186.0, null],
                            "low": [183.0, 182.5, null],
                            "close": [185.6, 184.2, null],
                            "volume": [82488700, 58414500, null]
                        }]
                    }
                }],
                "error": null
            }
        }"#;
        let body: ChartResponse = serde_json::from_str(json).unwrap();
        let series = body.into_series("AAPL").unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.bars()[0].open, 185.0);
        assert_eq!(series.last_close(), Some(184.2));
        assert_eq!(series.bars()[1].volume, 58414500.0);
    }

    #[test]
    fn chart_without_result_is_empty_history() {
        let json = r#"{ "chart": { "result": null, "error": { "code": "Not Found" } } }"#;
        let body: ChartResponse = serde_json::from_str(json).unwrap();
        let err = body.into_series("NOPE").unwrap_err();
        assert!(matches!(
            err.current_context(),
            SourceError::EmptyHistory { .. }
        ));
    }

    #[test]
    fn quote_summary_parses_into_metadata() {
        let json = r#"{
            "quoteSummary": {
                "result": [{
                    "price": { "longName": "Novo Nordisk A/S" },
                    "financialData": {
                        "targetMeanPrice": { "raw": 900.5, "fmt": "900.50" },
                        "targetHighPrice": { "raw": 1100.0, "fmt": "1,100.00" },
                        "targetLowPrice": {},
                        "recommendationMean": { "raw": 1.9, "fmt": "1.90" },
                        "numberOfAnalystOpinions": { "raw": 21, "fmt": "21" }
                    },
                    "assetProfile": {
                        "longBusinessSummary": "Healthcare company.",
                        "sector": "Healthcare",
                        "industry": "Biotechnology",
                        "website": "https://www.novonordisk.com",
                        "fullTimeEmployees": 64319
                    }
                }],
                "error": null
            }
        }"#;
        let body: QuoteSummaryResponse = serde_json::from_str(json).unwrap();
        let metadata = body.into_metadata("NOVO-B.CO").unwrap();
        assert_eq!(metadata.long_name.as_deref(), Some("Novo Nordisk A/S"));
        assert_eq!(metadata.target_mean_price, Some(900.5));
        assert_eq!(metadata.target_low_price, None);
        assert_eq!(metadata.recommendation_mean, Some(1.9));
        assert_eq!(metadata.analyst_count, Some(21));
        assert_eq!(metadata.employees, Some(64319));
    }

    #[test]
    fn quote_summary_without_result_is_empty_metadata() {
        let json = r#"{ "quoteSummary": { "result": [], "error": null } }"#;
        let body: QuoteSummaryResponse = serde_json::from_str(json).unwrap();
        assert!(body.into_metadata("NOPE").is_err());
    }

    #[test]
    fn cookie_header_keeps_name_value_pairs() {
        let mut headers = HeaderMap::new();
        headers.append(
            SET_COOKIE,
            "A3=d=AQABBK8&S=AQAAAk; Expires=Sun, 1 Jun 2025 00:00:00 GMT; Domain=.yahoo.com"
                .parse()
                .unwrap(),
        );
        headers.append(SET_COOKIE, "B=xyz; Path=/".parse().unwrap());
        assert_eq!(
            cookie_header(&headers).as_deref(),
            Some("A3=d=AQABBK8&S=AQAAAk; B=xyz")
        );
    }

    #[test]
    fn no_set_cookie_means_no_session() {
        assert_eq!(cookie_header(&HeaderMap::new()), None);
    }

    /// Integration test: requires network access. Run with `cargo test -- --ignored`
    #[tokio::test]
    #[ignore]
    async fn integration_fetch_metadata() {
        let source = YahooSource::new(&SourceConfig::default());
        let metadata = source.fetch_metadata("AAPL").await.unwrap();
        assert!(metadata.long_name.is_some());
        // Second call reuses the session
        assert!(source.fetch_metadata("MSFT").await.is_ok());
    }

    /// Integration test: requires network access. Run with `cargo test -- --ignored`
    #[tokio::test]
    #[ignore]
    async fn integration_fetch_history() {
        let source = YahooSource::new(&SourceConfig::default());
        let series = source
            .fetch_history("AAPL", HistoryPeriod::Month1)
            .await
            .unwrap();
        assert!(!series.is_empty());
    }
}
