use crate::errors::{PricerError, PricerResult};
use reqwest::{Client, Url};
use std::future::Future;
use std::time::Duration;

/// Longest slice of a raw error body quoted back to the user.
const ERROR_BODY_LIMIT: usize = 200;

/// Source of the latest closing price for a ticker.
/// One call per trigger. No retry: a failure surfaces immediately.
pub trait QuoteSource: Send + Sync {
    fn fetch_latest_close(&self, ticker: &str) -> impl Future<Output = PricerResult<f64>> + Send;
}

/// Chart-endpoint REST client (Yahoo Finance v8 chart format).
/// Reads the 1-day history and returns its last close.
#[derive(Clone)]
pub struct ChartQuoteClient {
    client: Client,
    base_url: String,
}

impl ChartQuoteClient {
    pub fn new(base_url: &str, timeout: Duration, user_agent: &str) -> Self {
        Self {
            client: Client::builder()
                .timeout(timeout)
                .user_agent(user_agent)
                .build()
                .unwrap_or_default(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn chart_url(&self, ticker: &str) -> PricerResult<Url> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| PricerError::Lookup(format!("invalid quote base url: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| PricerError::Lookup("quote base url cannot have a path".into()))?
            .pop_if_empty()
            .extend(&["v8", "finance", "chart", ticker]);
        url.query_pairs_mut()
            .append_pair("range", "1d")
            .append_pair("interval", "1d");
        Ok(url)
    }
}

impl QuoteSource for ChartQuoteClient {
    async fn fetch_latest_close(&self, ticker: &str) -> PricerResult<f64> {
        let ticker = ticker.trim().to_ascii_uppercase();
        if ticker.is_empty() {
            return Err(PricerError::Lookup("ticker must not be empty".into()));
        }

        let url = self.chart_url(&ticker)?;
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| PricerError::Lookup(format!("request failed: {e}")))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| PricerError::Lookup(format!("read body: {e}")))?;

        let parsed = serde_json::from_str::<ChartResponse>(&body);

        // Unknown symbols come back as a 404 carrying an error payload; prefer
        // its description over the raw body.
        if !status.is_success() {
            let detail = parsed
                .ok()
                .and_then(|c| c.chart.error)
                .and_then(|e| e.description.or(e.code));
            return Err(match detail {
                Some(d) => PricerError::Lookup(format!("{ticker}: {d}")),
                None => PricerError::Lookup(http_error(status, &body)),
            });
        }

        let chart = parsed?;
        let (price, timestamp) = latest_close(&ticker, chart)?;

        let as_of = timestamp
            .and_then(|ts| chrono::DateTime::from_timestamp(ts, 0))
            .map(|dt| dt.to_rfc3339())
            .unwrap_or_default();
        tracing::debug!(ticker = %ticker, price = price, as_of = %as_of, "latest close fetched");

        Ok(price)
    }
}

fn http_error(status: reqwest::StatusCode, body: &str) -> String {
    let body = body.trim();
    if body.is_empty() {
        return format!("HTTP {status}");
    }
    let mut snippet: String = body.chars().take(ERROR_BODY_LIMIT).collect();
    if snippet.len() < body.len() {
        snippet.push_str("...");
    }
    format!("HTTP {status}: {snippet}")
}

// Chart response format (trimmed to the fields we read):
// {
//   "chart": {
//     "result": [
//       {
//         "timestamp": [1760706000],
//         "indicators": { "quote": [ { "close": [252.29] } ] }
//       }
//     ],
//     "error": null
//   }
// }

#[derive(Debug, serde::Deserialize)]
struct ChartResponse {
    chart: ChartBody,
}

#[derive(Debug, serde::Deserialize)]
struct ChartBody {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartError>,
}

#[derive(Debug, serde::Deserialize)]
struct ChartResult {
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: Indicators,
}

#[derive(Debug, serde::Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<QuoteSeries>,
}

#[derive(Debug, serde::Deserialize)]
struct QuoteSeries {
    #[serde(default)]
    close: Vec<Option<f64>>,
}

#[derive(Debug, serde::Deserialize)]
struct ChartError {
    code: Option<String>,
    description: Option<String>,
}

/// Last non-null close in the series, with its timestamp when present.
fn latest_close(ticker: &str, chart: ChartResponse) -> PricerResult<(f64, Option<i64>)> {
    if let Some(err) = chart.chart.error {
        let detail = err
            .description
            .or(err.code)
            .unwrap_or_else(|| "unknown provider error".into());
        return Err(PricerError::Lookup(format!("{ticker}: {detail}")));
    }

    let result = chart
        .chart
        .result
        .and_then(|r| r.into_iter().next())
        .ok_or_else(|| PricerError::Lookup(format!("no price data found for {ticker}")))?;

    let closes = result
        .indicators
        .quote
        .into_iter()
        .next()
        .map(|q| q.close)
        .unwrap_or_default();

    let (idx, price) = closes
        .iter()
        .enumerate()
        .rev()
        .find_map(|(i, c)| c.map(|p| (i, p)))
        .ok_or_else(|| PricerError::Lookup(format!("no price data found for {ticker}")))?;

    if price <= 0.0 || !price.is_finite() {
        return Err(PricerError::Lookup(format!("invalid close for {ticker}: {price}")));
    }

    Ok((price, result.timestamp.get(idx).copied()))
}
