//! HTTP-backed news and quote sources.
//!
//! Both clients implement the contracts in `guildkeeper_core::feeds` so the
//! scheduler and command services never see reqwest directly.

pub mod http;
pub mod rss;
pub mod yahoo;

pub use http::{build_client, HttpClientError};
pub use rss::RssFeedSource;
pub use yahoo::YahooQuoteSource;
