use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use thiserror::Error;

use guildkeeper_core::domain::community::{CommunityId, MessageId, RoleId, UserId};
use guildkeeper_core::domain::moderation::{NewWarning, Warning};
use guildkeeper_core::domain::roles::ReactionRole;
use guildkeeper_core::domain::schedule::{Feature, ScheduleConfig};
use guildkeeper_core::domain::watchlist::{AlertConfig, WatchlistEntry};
use guildkeeper_core::domain::welcome::WelcomeSettings;
use guildkeeper_core::domain::xp::{LeaderboardEntry, LeaderboardPage, XpRecord};
use guildkeeper_core::errors::{ApplicationError, DomainError};

pub mod memory;
pub mod moderation;
pub mod roles;
pub mod schedule;
pub mod watchlist;
pub mod welcome;
pub mod xp;

pub use memory::{
    InMemoryAlertConfigRepository, InMemoryRoleRepository, InMemoryScheduleRepository,
    InMemoryWarningRepository, InMemoryWatchlistRepository, InMemoryWelcomeRepository,
    InMemoryXpLedger,
};
pub use moderation::SqlWarningRepository;
pub use roles::SqlRoleRepository;
pub use schedule::SqlScheduleRepository;
pub use watchlist::{SqlAlertConfigRepository, SqlWatchlistRepository};
pub use welcome::SqlWelcomeRepository;
pub use xp::SqlXpLedger;

pub const LEADERBOARD_PAGE_SIZE: u32 = 10;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error(transparent)]
    Domain(#[from] DomainError),
}

impl From<RepositoryError> for ApplicationError {
    fn from(value: RepositoryError) -> Self {
        match value {
            RepositoryError::Domain(error) => Self::Domain(error),
            other => Self::Persistence(other.to_string()),
        }
    }
}

pub(crate) fn decode_error(error: sqlx::Error) -> RepositoryError {
    RepositoryError::Decode(error.to_string())
}

/// Fixed-width UTC form so that text ordering matches time ordering.
pub(crate) fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|value| value.with_timezone(&Utc))
        .map_err(|error| RepositoryError::Decode(format!("invalid timestamp `{raw}`: {error}")))
}

/// Per-member XP ledger plus the leaderboard and rank reads derived from it.
#[async_trait]
pub trait XpLedger: Send + Sync {
    /// Adds `amount` XP and one message. Returns the new level only when it went up.
    async fn grant(
        &self,
        community_id: &CommunityId,
        user_id: &UserId,
        amount: i64,
        at: DateTime<Utc>,
    ) -> Result<Option<i64>, RepositoryError>;

    /// Administrative overwrite: xp becomes exactly the threshold of `level`.
    async fn set_level(
        &self,
        community_id: &CommunityId,
        user_id: &UserId,
        level: i64,
    ) -> Result<XpRecord, RepositoryError>;

    async fn record(
        &self,
        community_id: &CommunityId,
        user_id: &UserId,
    ) -> Result<Option<XpRecord>, RepositoryError>;

    async fn leaderboard(
        &self,
        community_id: &CommunityId,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<LeaderboardEntry>, RepositoryError>;

    async fn member_count(&self, community_id: &CommunityId) -> Result<i64, RepositoryError>;

    /// `1 + number of members with strictly more XP`; `None` without a record.
    async fn rank(
        &self,
        community_id: &CommunityId,
        user_id: &UserId,
    ) -> Result<Option<i64>, RepositoryError>;

    async fn leaderboard_page(
        &self,
        community_id: &CommunityId,
        page: i64,
    ) -> Result<LeaderboardPage, RepositoryError> {
        if page < 1 {
            return Err(DomainError::InvalidArgument("page must be 1 or greater".to_owned()).into());
        }

        let page_size = i64::from(LEADERBOARD_PAGE_SIZE);
        let total = self.member_count(community_id).await?;
        let total_pages = ((total + page_size - 1) / page_size).max(1);

        let offset = (page - 1).saturating_mul(page_size);
        let entries = match u32::try_from(offset) {
            Ok(offset) if offset < u32::MAX => {
                self.leaderboard(community_id, LEADERBOARD_PAGE_SIZE, offset).await?
            }
            _ => Vec::new(),
        };

        let entries = entries
            .into_iter()
            .enumerate()
            .map(|(index, entry)| (offset + index as i64 + 1, entry))
            .collect();

        Ok(LeaderboardPage { page, total_pages, entries })
    }
}

#[async_trait]
pub trait WarningRepository: Send + Sync {
    async fn add(&self, warning: NewWarning, at: DateTime<Utc>) -> Result<Warning, RepositoryError>;

    /// Newest first.
    async fn list(
        &self,
        community_id: &CommunityId,
        user_id: &UserId,
        limit: u32,
    ) -> Result<Vec<Warning>, RepositoryError>;

    async fn count(&self, community_id: &CommunityId, user_id: &UserId)
        -> Result<i64, RepositoryError>;

    /// Deletes every warning of the member and returns how many were removed.
    async fn clear(&self, community_id: &CommunityId, user_id: &UserId)
        -> Result<u64, RepositoryError>;
}

#[async_trait]
pub trait ScheduleRepository: Send + Sync {
    async fn upsert(&self, schedule: ScheduleConfig) -> Result<(), RepositoryError>;

    async fn get(
        &self,
        community_id: &CommunityId,
        feature: Feature,
    ) -> Result<Option<ScheduleConfig>, RepositoryError>;

    /// Returns `false` when the community has no schedule for the feature.
    async fn set_enabled(
        &self,
        community_id: &CommunityId,
        feature: Feature,
        enabled: bool,
        at: DateTime<Utc>,
    ) -> Result<bool, RepositoryError>;

    async fn list_enabled(&self, feature: Feature) -> Result<Vec<ScheduleConfig>, RepositoryError>;
}

#[async_trait]
pub trait AlertConfigRepository: Send + Sync {
    async fn upsert(&self, config: AlertConfig) -> Result<(), RepositoryError>;

    async fn get(&self, community_id: &CommunityId) -> Result<Option<AlertConfig>, RepositoryError>;

    async fn set_enabled(
        &self,
        community_id: &CommunityId,
        enabled: bool,
        at: DateTime<Utc>,
    ) -> Result<bool, RepositoryError>;

    async fn list_enabled(&self) -> Result<Vec<AlertConfig>, RepositoryError>;
}

#[async_trait]
pub trait WatchlistRepository: Send + Sync {
    /// Inserts unless the list is full or already holds the ticker; neither case mutates.
    async fn add(&self, entry: WatchlistEntry) -> Result<(), RepositoryError>;

    async fn remove(&self, community_id: &CommunityId, ticker: &str)
        -> Result<bool, RepositoryError>;

    /// Insertion order.
    async fn list(&self, community_id: &CommunityId) -> Result<Vec<WatchlistEntry>, RepositoryError>;

    async fn update_snapshot(
        &self,
        community_id: &CommunityId,
        ticker: &str,
        price: f64,
        change_percent: f64,
    ) -> Result<bool, RepositoryError>;

    async fn count(&self, community_id: &CommunityId) -> Result<i64, RepositoryError>;
}

#[async_trait]
pub trait RoleRepository: Send + Sync {
    async fn set_auto_role(
        &self,
        community_id: &CommunityId,
        role_id: &RoleId,
        at: DateTime<Utc>,
    ) -> Result<(), RepositoryError>;

    async fn auto_role(&self, community_id: &CommunityId) -> Result<Option<RoleId>, RepositoryError>;

    async fn clear_auto_role(&self, community_id: &CommunityId) -> Result<bool, RepositoryError>;

    /// Rejects a second mapping for the same message and emoji.
    async fn add_reaction_role(&self, mapping: ReactionRole) -> Result<(), RepositoryError>;

    async fn reaction_role(
        &self,
        message_id: &MessageId,
        emoji: &str,
    ) -> Result<Option<ReactionRole>, RepositoryError>;

    async fn remove_reaction_role(
        &self,
        message_id: &MessageId,
        emoji: &str,
    ) -> Result<bool, RepositoryError>;

    async fn list_reaction_roles(
        &self,
        community_id: &CommunityId,
    ) -> Result<Vec<ReactionRole>, RepositoryError>;
}

#[async_trait]
pub trait WelcomeRepository: Send + Sync {
    async fn get(&self, community_id: &CommunityId)
        -> Result<Option<WelcomeSettings>, RepositoryError>;

    async fn save(&self, settings: WelcomeSettings, at: DateTime<Utc>) -> Result<(), RepositoryError>;
}
