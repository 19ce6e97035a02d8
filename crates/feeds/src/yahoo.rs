use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use guildkeeper_core::domain::watchlist::QuoteSnapshot;
use guildkeeper_core::feeds::{FetchError, QuoteSource};

use crate::http::get_text;

/// Daily chart endpoint; the last two closes give price and day change.
#[derive(Clone)]
pub struct YahooQuoteSource {
    client: Client,
    base_url: String,
}

impl YahooQuoteSource {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self { client, base_url: base_url.into().trim_end_matches('/').to_owned() }
    }

    fn chart_url(&self, ticker: &str) -> String {
        format!("{}/v8/finance/chart/{}?range=2d&interval=1d", self.base_url, encode_ticker(ticker))
    }

    async fn chart(&self, ticker: &str) -> Result<ChartResult, FetchError> {
        let body = get_text(&self.client, &self.chart_url(ticker), ticker).await?;
        let envelope: ChartEnvelope = serde_json::from_str(&body).map_err(|error| {
            FetchError::Malformed { target: ticker.to_owned(), message: error.to_string() }
        })?;

        envelope
            .chart
            .result
            .and_then(|results| results.into_iter().next())
            .ok_or_else(|| FetchError::Empty(ticker.to_owned()))
    }
}

#[async_trait]
impl QuoteSource for YahooQuoteSource {
    async fn snapshot(&self, ticker: &str) -> Result<QuoteSnapshot, FetchError> {
        let chart = self.chart(ticker).await?;
        let snapshot = snapshot_from_closes(ticker, &chart.closes())
            .ok_or_else(|| FetchError::Empty(ticker.to_owned()))?;

        debug!(
            event_name = "feeds.quote.fetched",
            ticker,
            price = snapshot.price,
            change_percent = snapshot.change_percent,
            "quote fetched"
        );
        Ok(snapshot)
    }

    async fn lookup_name(&self, ticker: &str) -> Result<Option<String>, FetchError> {
        let chart = self.chart(ticker).await?;
        Ok(chart.meta.long_name.or(chart.meta.short_name).filter(|name| !name.trim().is_empty()))
    }
}

/// Change is measured against the previous close; a single close means no change.
fn snapshot_from_closes(ticker: &str, closes: &[f64]) -> Option<QuoteSnapshot> {
    let (&price, earlier) = closes.split_last()?;
    let (change, change_percent) = match earlier.last() {
        Some(&previous) if previous != 0.0 => {
            let change = price - previous;
            (change, change / previous * 100.0)
        }
        _ => (0.0, 0.0),
    };

    Some(QuoteSnapshot { ticker: ticker.to_owned(), price, change, change_percent })
}

fn encode_ticker(ticker: &str) -> String {
    ticker.replace('^', "%5E").replace('=', "%3D")
}

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    result: Option<Vec<ChartResult>>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    meta: ChartMeta,
    #[serde(default)]
    indicators: Indicators,
}

impl ChartResult {
    fn closes(&self) -> Vec<f64> {
        self.indicators
            .quote
            .first()
            .map(|quote| quote.close.iter().flatten().copied().collect())
            .unwrap_or_default()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    long_name: Option<String>,
    short_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<QuoteSeries>,
}

#[derive(Debug, Deserialize)]
struct QuoteSeries {
    #[serde(default)]
    close: Vec<Option<f64>>,
}
