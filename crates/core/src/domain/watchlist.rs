use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::community::{ChannelId, CommunityId};
use crate::errors::DomainError;

pub const WATCHLIST_CAPACITY: usize = 10;
pub const DEFAULT_ALERT_THRESHOLD_PERCENT: f64 = 5.0;
pub const MIN_ALERT_THRESHOLD_PERCENT: f64 = 1.0;
pub const MAX_ALERT_THRESHOLD_PERCENT: f64 = 50.0;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WatchlistEntry {
    pub community_id: CommunityId,
    pub ticker: String,
    pub display_name: String,
    pub last_price: Option<f64>,
    pub last_change_percent: f64,
    pub added_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AlertConfig {
    pub community_id: CommunityId,
    pub enabled: bool,
    pub channel_id: ChannelId,
    pub threshold_percent: f64,
    pub updated_at: DateTime<Utc>,
}

/// Latest price point for a ticker, relative to the previous close.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QuoteSnapshot {
    pub ticker: String,
    pub price: f64,
    pub change: f64,
    pub change_percent: f64,
}

pub fn normalize_ticker(raw: &str) -> Result<String, DomainError> {
    let ticker = raw.trim().to_ascii_uppercase();
    let valid = !ticker.is_empty()
        && ticker.len() <= 20
        && ticker.chars().all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '.' | '-' | '^' | '='));
    if !valid {
        return Err(DomainError::InvalidArgument(format!("invalid ticker symbol `{}`", raw.trim())));
    }
    Ok(ticker)
}

pub fn validate_threshold(threshold_percent: f64) -> Result<f64, DomainError> {
    if !threshold_percent.is_finite()
        || !(MIN_ALERT_THRESHOLD_PERCENT..=MAX_ALERT_THRESHOLD_PERCENT).contains(&threshold_percent)
    {
        return Err(DomainError::InvalidArgument(format!(
            "alert threshold must be between {MIN_ALERT_THRESHOLD_PERCENT}% and {MAX_ALERT_THRESHOLD_PERCENT}%"
        )));
    }
    Ok(threshold_percent)
}
