//! Command and event services backing the chat handlers.
//!
//! Every feature module adds an `impl BotServices` block; `execute` below is the single
//! dispatch point from a parsed [`BotCommand`] into them.

use std::fmt::Display;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use guildkeeper_chat::commands::{BotCommand, CommandContext, CommandService};
use guildkeeper_chat::messages::{help_message, OutgoingMessage};
use guildkeeper_chat::platform::ChatPlatform;
use guildkeeper_core::clock::Clock;
use guildkeeper_core::config::AppConfig;
use guildkeeper_core::domain::community::{ChannelId, Member, Role};
use guildkeeper_core::domain::schedule::Feature;
use guildkeeper_core::errors::{ApplicationError, DomainError};
use guildkeeper_core::feeds::{FeedSource, QuoteSource};
use guildkeeper_core::leveling::CooldownCache;
use guildkeeper_db::{
    AlertConfigRepository, RoleRepository, ScheduleRepository, WarningRepository,
    WatchlistRepository, WelcomeRepository, XpLedger,
};

mod feeds;
mod leveling;
mod moderation;
mod roles;
mod utility;
mod welcome;

#[cfg(test)]
pub(crate) mod testing;

pub use feeds::{news_digest, stocks_summary};

/// Storage handles behind the services.
#[derive(Clone)]
pub struct Repositories {
    pub xp: Arc<dyn XpLedger>,
    pub warnings: Arc<dyn WarningRepository>,
    pub schedules: Arc<dyn ScheduleRepository>,
    pub alerts: Arc<dyn AlertConfigRepository>,
    pub watchlist: Arc<dyn WatchlistRepository>,
    pub roles: Arc<dyn RoleRepository>,
    pub welcome: Arc<dyn WelcomeRepository>,
}

#[derive(Clone)]
pub struct BotServices {
    config: Arc<AppConfig>,
    platform: Arc<dyn ChatPlatform>,
    clock: Arc<dyn Clock>,
    repositories: Repositories,
    news: Arc<dyn FeedSource>,
    quotes: Arc<dyn QuoteSource>,
    cooldowns: Arc<CooldownCache>,
}

impl BotServices {
    pub fn new(
        config: Arc<AppConfig>,
        platform: Arc<dyn ChatPlatform>,
        clock: Arc<dyn Clock>,
        repositories: Repositories,
        news: Arc<dyn FeedSource>,
        quotes: Arc<dyn QuoteSource>,
    ) -> Self {
        let cooldowns = Arc::new(CooldownCache::new(config.leveling.cooldown_secs));
        Self { config, platform, clock, repositories, news, quotes, cooldowns }
    }

    pub fn platform(&self) -> &Arc<dyn ChatPlatform> {
        &self.platform
    }

    pub fn repositories(&self) -> &Repositories {
        &self.repositories
    }

    pub fn news_source(&self) -> &Arc<dyn FeedSource> {
        &self.news
    }

    pub fn quote_source(&self) -> &Arc<dyn QuoteSource> {
        &self.quotes
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Mirrors a moderation or role action into the configured log channel.
    async fn audit(&self, message: &OutgoingMessage) {
        let Some(channel) = self.config.moderation.log_channel_id.as_ref() else {
            return;
        };
        best_effort(
            "moderation.log_failed",
            self.platform.deliver(&ChannelId(channel.clone()), message).await,
        );
    }
}

#[async_trait]
impl CommandService for BotServices {
    async fn execute(
        &self,
        command: BotCommand,
        ctx: &CommandContext,
    ) -> Result<OutgoingMessage, ApplicationError> {
        match command {
            BotCommand::Help => Ok(help_message()),
            BotCommand::Ping => Ok(OutgoingMessage::text("Pong!")),
            BotCommand::ServerInfo => self.server_info(ctx).await,
            BotCommand::UserInfo { member } => self.user_info(ctx, member).await,
            BotCommand::Avatar { member } => self.avatar(ctx, member).await,
            BotCommand::Poll { question, choices } => self.poll(ctx, question, choices).await,
            BotCommand::Announce { title, description, color } => {
                self.announce(ctx, title, description, color).await
            }
            BotCommand::Rank { member } => self.rank(ctx, member).await,
            BotCommand::Leaderboard { page } => self.leaderboard(ctx, page).await,
            BotCommand::SetLevel { member, level } => self.set_level(ctx, member, level).await,
            BotCommand::Kick { member, reason } => self.kick(ctx, member, reason).await,
            BotCommand::Ban { member, reason, delete_days } => {
                self.ban(ctx, member, reason, delete_days).await
            }
            BotCommand::Unban { user } => self.unban(ctx, user).await,
            BotCommand::Timeout { member, minutes, reason } => {
                self.timeout(ctx, member, minutes, reason).await
            }
            BotCommand::Untimeout { member } => self.untimeout(ctx, member).await,
            BotCommand::Clear { amount } => self.clear(ctx, amount).await,
            BotCommand::Warn { member, reason } => self.warn(ctx, member, reason).await,
            BotCommand::Warnings { member } => self.warnings(ctx, member).await,
            BotCommand::ClearWarnings { member } => self.clear_warnings(ctx, member).await,
            BotCommand::AutoRole { role } => self.auto_role(ctx, role).await,
            BotCommand::RemoveAutoRole => self.remove_auto_role(ctx).await,
            BotCommand::Role { member, role, action } => {
                self.manage_role(ctx, member, role, action).await
            }
            BotCommand::ReactionRole { message_id, emoji, role } => {
                self.reaction_role(ctx, message_id, emoji, role).await
            }
            BotCommand::News { source, count } => self.news(source, count).await,
            BotCommand::ScheduleNews { channel, time, source } => {
                self.schedule_news(ctx, channel, time, source).await
            }
            BotCommand::StopNews => self.stop_schedule(ctx, Feature::News).await,
            BotCommand::NewsStatus => self.schedule_status(ctx, Feature::News).await,
            BotCommand::Stocks { indices } => self.stocks(indices).await,
            BotCommand::ScheduleStocks { channel, time, indices } => {
                self.schedule_stocks(ctx, channel, time, indices).await
            }
            BotCommand::StopStocks => self.stop_schedule(ctx, Feature::Stocks).await,
            BotCommand::StocksStatus => self.schedule_status(ctx, Feature::Stocks).await,
            BotCommand::AddStock { ticker, name } => self.add_stock(ctx, ticker, name).await,
            BotCommand::RemoveStock { ticker } => self.remove_stock(ctx, ticker).await,
            BotCommand::Watchlist => self.watchlist(ctx).await,
            BotCommand::SetAlert { channel, threshold } => {
                self.set_alert(ctx, channel, threshold).await
            }
            BotCommand::StopAlert => self.stop_alert(ctx).await,
            BotCommand::SetWelcome { update } => self.set_welcome(ctx, update).await,
            BotCommand::WelcomeTest => self.welcome_test(ctx).await,
            BotCommand::WelcomeChannel { channel } => self.welcome_channel(ctx, channel).await,
            BotCommand::WelcomeToggle { enabled } => self.welcome_toggle(ctx, enabled).await,
        }
    }
}

/// Runs a non-critical side effect: a failure is logged at warn and dropped.
pub(crate) fn best_effort<T, E: Display>(event_name: &'static str, result: Result<T, E>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(error) => {
            warn!(event_name, error = %error, "best-effort side effect failed");
            None
        }
    }
}

/// Moderation target rules: never yourself, never someone ranked at or above you.
pub(crate) fn ensure_can_moderate(
    invoker: &Member,
    target: &Member,
    action: &str,
) -> Result<(), ApplicationError> {
    if invoker.user_id == target.user_id {
        return Err(DomainError::InvalidArgument(format!("you cannot {action} yourself")).into());
    }
    if !invoker.outranks(target) {
        return Err(ApplicationError::PermissionDenied(format!(
            "you cannot {action} a member whose top role is at or above yours"
        )));
    }
    Ok(())
}

/// The bot can only hand out roles strictly below its own top role.
pub(crate) fn ensure_role_below(
    role: &Role,
    holder: &Member,
    whose: &str,
) -> Result<(), ApplicationError> {
    if role.managed {
        return Err(DomainError::InvalidArgument(format!(
            "{} is managed by an integration and cannot be assigned",
            role.id.mention()
        ))
        .into());
    }
    if role.position >= holder.top_role_position {
        return Err(ApplicationError::PermissionDenied(format!(
            "{} is at or above {whose} top role",
            role.id.mention()
        )));
    }
    Ok(())
}
