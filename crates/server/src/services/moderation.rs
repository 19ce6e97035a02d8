use chrono::Duration;
use tracing::info;

use guildkeeper_chat::commands::CommandContext;
use guildkeeper_chat::platform::PlatformError;
use guildkeeper_chat::messages::{
    notice_message, success_message, MessageBuilder, OutgoingMessage, COLOR_GREEN, COLOR_ORANGE,
    COLOR_RED, COLOR_YELLOW,
};
use guildkeeper_core::domain::community::{Member, UserId};
use guildkeeper_core::domain::moderation::{
    clamp_ban_delete_days, validate_purge_amount, validate_timeout_minutes, NewWarning,
    WARNING_LIST_LIMIT,
};
use guildkeeper_core::errors::{ApplicationError, DomainError};

use super::{best_effort, ensure_can_moderate, BotServices};

const NO_REASON: &str = "No reason given";

fn reason_or_default(reason: Option<String>) -> String {
    reason
        .map(|reason| reason.trim().to_owned())
        .filter(|reason| !reason.is_empty())
        .unwrap_or_else(|| NO_REASON.to_owned())
}

/// Embed used both as the command reply and as the log-channel entry.
fn action_message(
    title: &str,
    color: u32,
    target: &str,
    moderator: &Member,
    extra: &[(&str, String)],
) -> OutgoingMessage {
    MessageBuilder::new(String::new())
        .embed(|embed| {
            embed
                .title(title)
                .color(color)
                .field("Member", target, true)
                .field("Moderator", moderator.mention(), true);
            for (name, value) in extra {
                embed.field(*name, value.clone(), false);
            }
        })
        .build()
}

impl BotServices {
    async fn moderation_target(
        &self,
        ctx: &CommandContext,
        user_id: &UserId,
        action: &str,
    ) -> Result<Member, ApplicationError> {
        let target = self.platform.member(&ctx.community_id, user_id).await?;
        ensure_can_moderate(&ctx.invoker, &target, action)?;
        Ok(target)
    }

    fn log_action(&self, ctx: &CommandContext, action: &'static str, target: &UserId) {
        info!(
            event_name = "moderation.action.applied",
            correlation_id = %ctx.request_id,
            community_id = %ctx.community_id,
            moderator_id = %ctx.invoker.user_id,
            target_id = %target,
            action,
            "moderation action applied"
        );
    }

    pub(super) async fn kick(
        &self,
        ctx: &CommandContext,
        member: UserId,
        reason: Option<String>,
    ) -> Result<OutgoingMessage, ApplicationError> {
        let target = self.moderation_target(ctx, &member, "kick").await?;
        let reason = reason_or_default(reason);

        self.platform.kick(&ctx.community_id, &target.user_id, &reason).await?;
        self.log_action(ctx, "kick", &target.user_id);

        let message = action_message(
            "👢 Member kicked",
            COLOR_ORANGE,
            &target.mention(),
            &ctx.invoker,
            &[("Reason", reason)],
        );
        self.audit(&message).await;
        Ok(message)
    }

    pub(super) async fn ban(
        &self,
        ctx: &CommandContext,
        member: UserId,
        reason: Option<String>,
        delete_days: i64,
    ) -> Result<OutgoingMessage, ApplicationError> {
        let target = self.moderation_target(ctx, &member, "ban").await?;
        let reason = reason_or_default(reason);
        let delete_days = clamp_ban_delete_days(delete_days);

        self.platform.ban(&ctx.community_id, &target.user_id, &reason, delete_days).await?;
        self.log_action(ctx, "ban", &target.user_id);

        let message = action_message(
            "🔨 Member banned",
            COLOR_RED,
            &target.mention(),
            &ctx.invoker,
            &[("Reason", reason), ("Deleted messages", format!("{delete_days} days"))],
        );
        self.audit(&message).await;
        Ok(message)
    }

    pub(super) async fn unban(
        &self,
        ctx: &CommandContext,
        user: UserId,
    ) -> Result<OutgoingMessage, ApplicationError> {
        self.platform.unban(&ctx.community_id, &user).await.map_err(|error| match error {
            PlatformError::NotFound(_) => {
                ApplicationError::NotFound(format!("{} is not banned", user.mention()))
            }
            other => other.into(),
        })?;
        self.log_action(ctx, "unban", &user);

        let message =
            action_message("✅ Member unbanned", COLOR_GREEN, &user.mention(), &ctx.invoker, &[]);
        self.audit(&message).await;
        Ok(message)
    }

    pub(super) async fn timeout(
        &self,
        ctx: &CommandContext,
        member: UserId,
        minutes: i64,
        reason: Option<String>,
    ) -> Result<OutgoingMessage, ApplicationError> {
        let minutes = validate_timeout_minutes(minutes)?;
        let target = self.moderation_target(ctx, &member, "time out").await?;
        let reason = reason_or_default(reason);
        let until = self.clock.now_utc() + Duration::minutes(minutes);

        self.platform.timeout(&ctx.community_id, &target.user_id, until, &reason).await?;
        self.log_action(ctx, "timeout", &target.user_id);

        let message = action_message(
            "⏱️ Member timed out",
            COLOR_YELLOW,
            &target.mention(),
            &ctx.invoker,
            &[("Duration", format!("{minutes} minutes")), ("Reason", reason)],
        );
        self.audit(&message).await;
        Ok(message)
    }

    pub(super) async fn untimeout(
        &self,
        ctx: &CommandContext,
        member: UserId,
    ) -> Result<OutgoingMessage, ApplicationError> {
        let target = self.platform.member(&ctx.community_id, &member).await?;
        self.platform.remove_timeout(&ctx.community_id, &target.user_id).await?;
        self.log_action(ctx, "untimeout", &target.user_id);

        let message =
            action_message("✅ Timeout removed", COLOR_GREEN, &target.mention(), &ctx.invoker, &[]);
        self.audit(&message).await;
        Ok(message)
    }

    pub(super) async fn clear(
        &self,
        ctx: &CommandContext,
        amount: i64,
    ) -> Result<OutgoingMessage, ApplicationError> {
        let amount = validate_purge_amount(amount)?;
        let requested = u32::try_from(amount)
            .map_err(|_| DomainError::InvalidArgument(format!("invalid amount {amount}")))?;

        let deleted = self.platform.purge(&ctx.channel_id, requested).await?;
        self.log_action(ctx, "clear", &ctx.invoker.user_id);

        Ok(success_message("🧹 Messages deleted", &format!("Deleted {deleted} messages."))
            .ephemeral())
    }

    pub(super) async fn warn(
        &self,
        ctx: &CommandContext,
        member: UserId,
        reason: String,
    ) -> Result<OutgoingMessage, ApplicationError> {
        if member == ctx.invoker.user_id {
            return Err(DomainError::InvalidArgument("you cannot warn yourself".to_owned()).into());
        }
        let reason = reason.trim().to_owned();
        if reason.is_empty() {
            return Err(DomainError::InvalidArgument("a warning needs a reason".to_owned()).into());
        }

        let warnings = &self.repositories.warnings;
        let warning = warnings
            .add(
                NewWarning {
                    community_id: ctx.community_id.clone(),
                    user_id: member.clone(),
                    moderator_id: ctx.invoker.user_id.clone(),
                    reason: reason.clone(),
                },
                self.clock.now_utc(),
            )
            .await?;
        let total = warnings.count(&ctx.community_id, &member).await?;
        self.log_action(ctx, "warn", &member);

        let server = best_effort(
            "moderation.warn.community_lookup_failed",
            self.platform.community(&ctx.community_id).await,
        )
        .map(|community| community.name)
        .unwrap_or_else(|| "the server".to_owned());
        let direct = MessageBuilder::new(String::new())
            .embed(|embed| {
                embed
                    .title(format!("⚠️ You received a warning in {server}"))
                    .color(COLOR_YELLOW)
                    .field("Reason", reason.clone(), false)
                    .field("Total warnings", total.to_string(), true);
            })
            .build();
        best_effort("moderation.warn.dm_failed", self.platform.send_direct(&member, &direct).await);

        let max_warnings = i64::from(self.config.moderation.max_warnings);
        let mut extra = vec![
            ("Reason", reason),
            ("Total warnings", total.to_string()),
            ("Warning id", warning.id.to_string()),
        ];
        if max_warnings > 0 && total >= max_warnings {
            extra.push(("Limit reached", format!("{total}/{max_warnings} warnings")));
        }

        let message =
            action_message("⚠️ Warning issued", COLOR_YELLOW, &member.mention(), &ctx.invoker, &extra);
        self.audit(&message).await;
        Ok(message)
    }

    pub(super) async fn warnings(
        &self,
        ctx: &CommandContext,
        member: UserId,
    ) -> Result<OutgoingMessage, ApplicationError> {
        let warnings = &self.repositories.warnings;
        let listed = warnings.list(&ctx.community_id, &member, WARNING_LIST_LIMIT as u32).await?;
        if listed.is_empty() {
            return Ok(notice_message(
                "Warnings",
                &format!("{} has no warnings.", member.mention()),
            )
            .ephemeral());
        }
        let total = warnings.count(&ctx.community_id, &member).await?;

        Ok(MessageBuilder::new(String::new())
            .embed(|embed| {
                embed
                    .title("⚠️ Warnings")
                    .description(format!("{} has {total} warnings.", member.mention()))
                    .color(COLOR_YELLOW);
                for warning in &listed {
                    embed.field(
                        format!("#{} · {}", warning.id, warning.created_at.format("%Y-%m-%d %H:%M")),
                        format!("{} (by {})", warning.reason, warning.moderator_id.mention()),
                        false,
                    );
                }
            })
            .ephemeral()
            .build())
    }

    pub(super) async fn clear_warnings(
        &self,
        ctx: &CommandContext,
        member: UserId,
    ) -> Result<OutgoingMessage, ApplicationError> {
        let removed = self.repositories.warnings.clear(&ctx.community_id, &member).await?;
        self.log_action(ctx, "clear_warnings", &member);

        let message = action_message(
            "🧽 Warnings cleared",
            COLOR_GREEN,
            &member.mention(),
            &ctx.invoker,
            &[("Removed", removed.to_string())],
        );
        self.audit(&message).await;
        Ok(message)
    }
}
