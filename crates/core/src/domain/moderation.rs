use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::community::{CommunityId, UserId};
use crate::errors::DomainError;

pub const MAX_TIMEOUT_MINUTES: i64 = 40_320;
pub const MAX_PURGE_MESSAGES: i64 = 100;
pub const MAX_BAN_DELETE_DAYS: i64 = 7;
pub const WARNING_LIST_LIMIT: usize = 10;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warning {
    pub id: i64,
    pub community_id: CommunityId,
    pub user_id: UserId,
    pub moderator_id: UserId,
    pub reason: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewWarning {
    pub community_id: CommunityId,
    pub user_id: UserId,
    pub moderator_id: UserId,
    pub reason: String,
}

pub fn validate_timeout_minutes(minutes: i64) -> Result<i64, DomainError> {
    if !(1..=MAX_TIMEOUT_MINUTES).contains(&minutes) {
        return Err(DomainError::InvalidArgument(format!(
            "timeout must be between 1 and {MAX_TIMEOUT_MINUTES} minutes"
        )));
    }
    Ok(minutes)
}

pub fn validate_purge_amount(amount: i64) -> Result<i64, DomainError> {
    if !(1..=MAX_PURGE_MESSAGES).contains(&amount) {
        return Err(DomainError::InvalidArgument(format!(
            "message count must be between 1 and {MAX_PURGE_MESSAGES}"
        )));
    }
    Ok(amount)
}

/// Message history deletion on ban is capped by the platform.
pub fn clamp_ban_delete_days(days: i64) -> i64 {
    days.clamp(0, MAX_BAN_DELETE_DAYS)
}
