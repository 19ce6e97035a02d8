//! Contracts for external news and quote sources, plus the catalogs they are addressed by.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::watchlist::QuoteSnapshot;
use crate::errors::{ApplicationError, DomainError};

pub const DEFAULT_NEWS_LIMIT: usize = 5;
pub const MAX_NEWS_LIMIT: usize = 10;
pub const SUMMARY_MAX_CHARS: usize = 200;
pub const TITLE_MAX_CHARS: usize = 100;
pub const DEFAULT_NEWS_SOURCE: &str = "google_kr";
pub const DEFAULT_STOCK_INDICES: [&str; 3] = ["KOSPI", "KOSDAQ", "NASDAQ"];
pub const MAX_STOCK_INDICES_PER_REQUEST: usize = 4;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedItem {
    pub title: String,
    pub link: String,
    pub published_at: Option<DateTime<Utc>>,
    pub summary: String,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("request to `{target}` failed: {message}")]
    Transport { target: String, message: String },
    #[error("request to `{target}` timed out")]
    Timeout { target: String },
    #[error("`{target}` answered with HTTP {status}")]
    Status { target: String, status: u16 },
    #[error("could not parse response from `{target}`: {message}")]
    Malformed { target: String, message: String },
    #[error("no data available for `{0}`")]
    Empty(String),
}

impl From<FetchError> for ApplicationError {
    fn from(value: FetchError) -> Self {
        Self::ExternalFetch(value.to_string())
    }
}

#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Fetches at most `limit` items in feed order.
    async fn fetch(&self, feed_url: &str, limit: usize) -> Result<Vec<FeedItem>, FetchError>;
}

#[async_trait]
pub trait QuoteSource: Send + Sync {
    async fn snapshot(&self, ticker: &str) -> Result<QuoteSnapshot, FetchError>;

    /// Human readable name for a ticker, when the source knows one.
    async fn lookup_name(&self, ticker: &str) -> Result<Option<String>, FetchError>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NewsSource {
    pub key: &'static str,
    pub label: &'static str,
    pub url: &'static str,
}

pub const NEWS_SOURCES: [NewsSource; 4] = [
    NewsSource {
        key: "google_kr",
        label: "Google News Korea",
        url: "https://news.google.com/rss?hl=ko&gl=KR&ceid=KR:ko",
    },
    NewsSource {
        key: "naver_headlines",
        label: "Naver Headlines",
        url: "https://news.google.com/rss/search?q=when:24h+allinurl:naver.com&hl=ko&gl=KR&ceid=KR:ko",
    },
    NewsSource {
        key: "it",
        label: "IT News",
        url: "https://news.google.com/rss/search?q=IT+%EA%B8%B0%EC%88%A0+when:24h&hl=ko&gl=KR&ceid=KR:ko",
    },
    NewsSource {
        key: "economy",
        label: "Economy News",
        url: "https://news.google.com/rss/search?q=%EA%B2%BD%EC%A0%9C+when:24h&hl=ko&gl=KR&ceid=KR:ko",
    },
];

pub fn news_source(key: &str) -> Result<&'static NewsSource, DomainError> {
    let wanted = key.trim().to_ascii_lowercase();
    NEWS_SOURCES.iter().find(|source| source.key == wanted).ok_or_else(|| {
        DomainError::InvalidArgument(format!(
            "unknown news source `{}`; available: {}",
            key.trim(),
            NEWS_SOURCES.iter().map(|source| source.key).collect::<Vec<_>>().join(", ")
        ))
    })
}

pub fn validate_news_limit(limit: i64) -> Result<usize, DomainError> {
    if !(1..=MAX_NEWS_LIMIT as i64).contains(&limit) {
        return Err(DomainError::InvalidArgument(format!(
            "news count must be between 1 and {MAX_NEWS_LIMIT}"
        )));
    }
    Ok(limit as usize)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MarketIndex {
    pub name: &'static str,
    pub label: &'static str,
    pub ticker: &'static str,
}

pub const MARKET_INDICES: [MarketIndex; 8] = [
    MarketIndex { name: "KOSPI", label: "KOSPI", ticker: "^KS11" },
    MarketIndex { name: "KOSDAQ", label: "KOSDAQ", ticker: "^KQ11" },
    MarketIndex { name: "NASDAQ", label: "NASDAQ Composite", ticker: "^IXIC" },
    MarketIndex { name: "SP500", label: "S&P 500", ticker: "^GSPC" },
    MarketIndex { name: "DOW", label: "Dow Jones", ticker: "^DJI" },
    MarketIndex { name: "BTC", label: "Bitcoin", ticker: "BTC-USD" },
    MarketIndex { name: "ETH", label: "Ethereum", ticker: "ETH-USD" },
    MarketIndex { name: "USDKRW", label: "USD/KRW", ticker: "KRW=X" },
];

pub fn market_index(name: &str) -> Option<&'static MarketIndex> {
    let wanted = name.trim().to_ascii_uppercase().replace(['&', '_', ' '], "");
    MARKET_INDICES.iter().find(|index| index.name == wanted)
}

/// Resolves a list of index names, dropping unknown ones. Errors when none remain.
pub fn resolve_indices<S: AsRef<str>>(names: &[S]) -> Result<Vec<&'static MarketIndex>, DomainError> {
    let mut resolved: Vec<&'static MarketIndex> = Vec::new();
    for name in names {
        if let Some(index) = market_index(name.as_ref()) {
            if !resolved.iter().any(|known| known.name == index.name) {
                resolved.push(index);
            }
        }
    }

    if resolved.is_empty() {
        return Err(DomainError::InvalidArgument(format!(
            "no known index given; available: {}",
            MARKET_INDICES.iter().map(|index| index.name).collect::<Vec<_>>().join(", ")
        )));
    }
    Ok(resolved)
}

pub fn format_price(price: f64, ticker: &str) -> String {
    if ticker == "KRW=X" {
        return format!("{price:.2} KRW");
    }
    if ticker.contains("BTC") || ticker.contains("ETH") {
        return format!("${}", group_thousands(price));
    }
    group_thousands(price)
}

pub fn format_change(change: f64, change_percent: f64) -> String {
    if change > 0.0 {
        format!("+{change:.2} (+{change_percent:.2}%)")
    } else if change < 0.0 {
        format!("{change:.2} ({change_percent:.2}%)")
    } else {
        "0.00 (0.00%)".to_owned()
    }
}

/// Two decimals with comma grouping, e.g. `2,456.10`.
fn group_thousands(value: f64) -> String {
    let formatted = format!("{:.2}", value.abs());
    let (integer, fraction) = formatted.split_once('.').unwrap_or((formatted.as_str(), "00"));

    let mut grouped = String::with_capacity(integer.len() + integer.len() / 3);
    for (index, digit) in integer.chars().enumerate() {
        if index > 0 && (integer.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if value < 0.0 { "-" } else { "" };
    format!("{sign}{grouped}.{fraction}")
}

pub fn truncate_chars(value: &str, max_chars: usize) -> String {
    value.chars().take(max_chars).collect()
}

/// Titles over the limit keep their first 97 characters plus an ellipsis.
pub fn truncate_title(title: &str) -> String {
    if title.chars().count() <= TITLE_MAX_CHARS {
        return title.to_owned();
    }
    let mut shortened = truncate_chars(title, TITLE_MAX_CHARS - 3);
    shortened.push_str("...");
    shortened
}

#[cfg(test)]
mod tests {
    use super::{
        format_change, format_price, market_index, news_source, resolve_indices, truncate_title,
        validate_news_limit, DEFAULT_NEWS_SOURCE,
    };

    #[test]
    fn prices_format_per_ticker_class() {
        assert_eq!(format_price(1_334.5, "KRW=X"), "1334.50 KRW");
        assert_eq!(format_price(97_250.456, "BTC-USD"), "$97,250.46");
        assert_eq!(format_price(2_456.1, "^KS11"), "2,456.10");
        assert_eq!(format_price(18_002_345.0, "^IXIC"), "18,002,345.00");
        assert_eq!(format_price(999.999, "^DJI"), "1,000.00");
        assert_eq!(format_price(-1_500.0, "^DJI"), "-1,500.00");
    }

    #[test]
    fn change_text_carries_sign() {
        assert_eq!(format_change(12.3, 0.51), "+12.30 (+0.51%)");
        assert_eq!(format_change(-7.0, -1.2), "-7.00 (-1.20%)");
        assert_eq!(format_change(0.0, 0.0), "0.00 (0.00%)");
    }

    #[test]
    fn long_titles_are_cut_to_one_hundred_chars() {
        let title = "가".repeat(150);
        let cut = truncate_title(&title);

        assert_eq!(cut.chars().count(), 100);
        assert!(cut.ends_with("..."));
        assert_eq!(truncate_title("short"), "short");
    }

    #[test]
    fn catalogs_resolve_names_case_insensitively() {
        assert_eq!(market_index("kospi").map(|index| index.ticker), Some("^KS11"));
        assert_eq!(market_index("S&P_500").map(|index| index.ticker), Some("^GSPC"));
        assert!(news_source(DEFAULT_NEWS_SOURCE).is_ok());
        assert!(news_source("tabloid").is_err());
    }

    #[test]
    fn unknown_indices_are_dropped_but_not_all() {
        let resolved = resolve_indices(&["kospi", "gold", "KOSPI", "btc"]).expect("some known");
        let names: Vec<_> = resolved.iter().map(|index| index.name).collect();
        assert_eq!(names, vec!["KOSPI", "BTC"]);

        assert!(resolve_indices(&["gold", "oil"]).is_err());
    }

    #[test]
    fn news_limit_is_bounded() {
        assert_eq!(validate_news_limit(5), Ok(5));
        assert!(validate_news_limit(0).is_err());
        assert!(validate_news_limit(11).is_err());
    }
}
