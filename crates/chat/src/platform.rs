use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{info, warn};

use guildkeeper_core::domain::community::{
    ChannelId, Community, CommunityId, Member, MessageId, Role, RoleId, UserId,
};
use guildkeeper_core::errors::ApplicationError;

use crate::messages::OutgoingMessage;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum PlatformError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("platform unavailable: {0}")]
    Unavailable(String),
}

impl From<PlatformError> for ApplicationError {
    fn from(value: PlatformError) -> Self {
        match value {
            PlatformError::NotFound(message) => Self::NotFound(message),
            PlatformError::Forbidden(message) => Self::PermissionDenied(message),
            PlatformError::Unavailable(message) => Self::ExternalFetch(message),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChannelInfo {
    pub id: ChannelId,
    pub name: String,
    pub community_id: Option<CommunityId>,
}

/// Outbound operations against the host messaging platform.
///
/// Permission enforcement stays with the platform: a call the bot is not allowed to make
/// comes back as [`PlatformError::Forbidden`].
#[async_trait]
pub trait ChatPlatform: Send + Sync {
    async fn deliver(
        &self,
        channel_id: &ChannelId,
        message: &OutgoingMessage,
    ) -> Result<MessageId, PlatformError>;

    async fn send_direct(
        &self,
        user_id: &UserId,
        message: &OutgoingMessage,
    ) -> Result<(), PlatformError>;

    async fn community(&self, community_id: &CommunityId) -> Result<Community, PlatformError>;

    async fn member(
        &self,
        community_id: &CommunityId,
        user_id: &UserId,
    ) -> Result<Member, PlatformError>;

    /// The bot's own membership, used for role hierarchy checks.
    async fn bot_member(&self, community_id: &CommunityId) -> Result<Member, PlatformError>;

    async fn channel(&self, channel_id: &ChannelId) -> Result<ChannelInfo, PlatformError>;

    async fn role(&self, community_id: &CommunityId, role_id: &RoleId) -> Result<Role, PlatformError>;

    async fn add_role(
        &self,
        community_id: &CommunityId,
        user_id: &UserId,
        role_id: &RoleId,
        reason: &str,
    ) -> Result<(), PlatformError>;

    async fn remove_role(
        &self,
        community_id: &CommunityId,
        user_id: &UserId,
        role_id: &RoleId,
        reason: &str,
    ) -> Result<(), PlatformError>;

    async fn kick(
        &self,
        community_id: &CommunityId,
        user_id: &UserId,
        reason: &str,
    ) -> Result<(), PlatformError>;

    async fn ban(
        &self,
        community_id: &CommunityId,
        user_id: &UserId,
        reason: &str,
        delete_message_days: i64,
    ) -> Result<(), PlatformError>;

    async fn unban(&self, community_id: &CommunityId, user_id: &UserId) -> Result<(), PlatformError>;

    async fn timeout(
        &self,
        community_id: &CommunityId,
        user_id: &UserId,
        until: DateTime<Utc>,
        reason: &str,
    ) -> Result<(), PlatformError>;

    async fn remove_timeout(
        &self,
        community_id: &CommunityId,
        user_id: &UserId,
    ) -> Result<(), PlatformError>;

    /// Deletes up to `amount` recent messages and returns how many were removed.
    async fn purge(&self, channel_id: &ChannelId, amount: u32) -> Result<u32, PlatformError>;

    async fn add_reaction(
        &self,
        channel_id: &ChannelId,
        message_id: &MessageId,
        emoji: &str,
    ) -> Result<(), PlatformError>;
}

/// Default wiring without a live connection: outbound messages are written to the log,
/// lookups and moderation calls report the platform as unavailable.
#[derive(Default)]
pub struct LoggingPlatform {
    next_message: AtomicU64,
}

impl LoggingPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    fn unavailable<T>(operation: &str) -> Result<T, PlatformError> {
        warn!(
            event_name = "gateway.platform.unavailable",
            operation,
            "platform call skipped without a live connection"
        );
        Err(PlatformError::Unavailable(format!("`{operation}` needs a live platform connection")))
    }
}

#[async_trait]
impl ChatPlatform for LoggingPlatform {
    async fn deliver(
        &self,
        channel_id: &ChannelId,
        message: &OutgoingMessage,
    ) -> Result<MessageId, PlatformError> {
        let sequence = self.next_message.fetch_add(1, Ordering::Relaxed) + 1;
        info!(
            event_name = "gateway.platform.delivered",
            channel_id = %channel_id,
            embeds = message.embeds.len(),
            summary = %message.summary(),
            "message delivered to log"
        );
        Ok(MessageId(format!("log-{sequence}")))
    }

    async fn send_direct(
        &self,
        user_id: &UserId,
        message: &OutgoingMessage,
    ) -> Result<(), PlatformError> {
        info!(
            event_name = "gateway.platform.direct_message",
            user_id = %user_id,
            summary = %message.summary(),
            "direct message delivered to log"
        );
        Ok(())
    }

    async fn community(&self, _community_id: &CommunityId) -> Result<Community, PlatformError> {
        Self::unavailable("community")
    }

    async fn member(
        &self,
        _community_id: &CommunityId,
        _user_id: &UserId,
    ) -> Result<Member, PlatformError> {
        Self::unavailable("member")
    }

    async fn bot_member(&self, _community_id: &CommunityId) -> Result<Member, PlatformError> {
        Self::unavailable("bot_member")
    }

    async fn channel(&self, _channel_id: &ChannelId) -> Result<ChannelInfo, PlatformError> {
        Self::unavailable("channel")
    }

    async fn role(&self, _community_id: &CommunityId, _role_id: &RoleId) -> Result<Role, PlatformError> {
        Self::unavailable("role")
    }

    async fn add_role(
        &self,
        _community_id: &CommunityId,
        _user_id: &UserId,
        _role_id: &RoleId,
        _reason: &str,
    ) -> Result<(), PlatformError> {
        Self::unavailable("add_role")
    }

    async fn remove_role(
        &self,
        _community_id: &CommunityId,
        _user_id: &UserId,
        _role_id: &RoleId,
        _reason: &str,
    ) -> Result<(), PlatformError> {
        Self::unavailable("remove_role")
    }

    async fn kick(
        &self,
        _community_id: &CommunityId,
        _user_id: &UserId,
        _reason: &str,
    ) -> Result<(), PlatformError> {
        Self::unavailable("kick")
    }

    async fn ban(
        &self,
        _community_id: &CommunityId,
        _user_id: &UserId,
        _reason: &str,
        _delete_message_days: i64,
    ) -> Result<(), PlatformError> {
        Self::unavailable("ban")
    }

    async fn unban(&self, _community_id: &CommunityId, _user_id: &UserId) -> Result<(), PlatformError> {
        Self::unavailable("unban")
    }

    async fn timeout(
        &self,
        _community_id: &CommunityId,
        _user_id: &UserId,
        _until: DateTime<Utc>,
        _reason: &str,
    ) -> Result<(), PlatformError> {
        Self::unavailable("timeout")
    }

    async fn remove_timeout(
        &self,
        _community_id: &CommunityId,
        _user_id: &UserId,
    ) -> Result<(), PlatformError> {
        Self::unavailable("remove_timeout")
    }

    async fn purge(&self, _channel_id: &ChannelId, _amount: u32) -> Result<u32, PlatformError> {
        Self::unavailable("purge")
    }

    async fn add_reaction(
        &self,
        channel_id: &ChannelId,
        message_id: &MessageId,
        emoji: &str,
    ) -> Result<(), PlatformError> {
        info!(
            event_name = "gateway.platform.reaction_added",
            channel_id = %channel_id,
            message_id = %message_id,
            emoji,
            "reaction delivered to log"
        );
        Ok(())
    }
}
