use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::community::{CommunityId, UserId};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct XpRecord {
    pub community_id: CommunityId,
    pub user_id: UserId,
    pub xp: i64,
    pub level: i64,
    pub total_messages: i64,
    pub last_grant_at: Option<DateTime<Utc>>,
}

/// One row of a community leaderboard.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub user_id: UserId,
    pub xp: i64,
    pub level: i64,
    pub total_messages: i64,
}

impl From<XpRecord> for LeaderboardEntry {
    fn from(record: XpRecord) -> Self {
        Self {
            user_id: record.user_id,
            xp: record.xp,
            level: record.level,
            total_messages: record.total_messages,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardPage {
    pub page: i64,
    pub total_pages: i64,
    pub entries: Vec<(i64, LeaderboardEntry)>,
}
