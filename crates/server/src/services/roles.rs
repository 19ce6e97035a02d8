use async_trait::async_trait;
use tracing::info;

use guildkeeper_chat::commands::{CommandContext, RoleAction};
use guildkeeper_chat::events::{
    EventContext, EventHandlerError, ReactionChange, ReactionEvent, ReactionService,
};
use guildkeeper_chat::messages::{
    notice_message, success_message, MessageBuilder, OutgoingMessage, COLOR_GREEN, COLOR_ORANGE,
};
use guildkeeper_core::domain::community::{MessageId, RoleId, UserId};
use guildkeeper_core::domain::roles::{normalize_emoji, ReactionRole};
use guildkeeper_core::errors::{ApplicationError, DomainError};

use super::{ensure_role_below, BotServices};

impl BotServices {
    pub(super) async fn auto_role(
        &self,
        ctx: &CommandContext,
        role_id: RoleId,
    ) -> Result<OutgoingMessage, ApplicationError> {
        let role = self.platform.role(&ctx.community_id, &role_id).await?;
        let bot = self.platform.bot_member(&ctx.community_id).await?;
        ensure_role_below(&role, &bot, "the bot's")?;

        self.repositories
            .roles
            .set_auto_role(&ctx.community_id, &role.id, self.clock.now_utc())
            .await?;
        info!(
            event_name = "roles.auto_role.set",
            correlation_id = %ctx.request_id,
            community_id = %ctx.community_id,
            role_id = %role.id,
            "auto-role configured"
        );

        Ok(success_message(
            "✅ Auto-role set",
            &format!("New members will receive {}.", role.id.mention()),
        ))
    }

    pub(super) async fn remove_auto_role(
        &self,
        ctx: &CommandContext,
    ) -> Result<OutgoingMessage, ApplicationError> {
        if !self.repositories.roles.clear_auto_role(&ctx.community_id).await? {
            return Ok(notice_message("Auto-role", "No auto-role was configured.").ephemeral());
        }
        Ok(success_message("✅ Auto-role removed", "New members no longer receive a role."))
    }

    pub(super) async fn manage_role(
        &self,
        ctx: &CommandContext,
        member: UserId,
        role_id: RoleId,
        action: RoleAction,
    ) -> Result<OutgoingMessage, ApplicationError> {
        let role = self.platform.role(&ctx.community_id, &role_id).await?;
        let bot = self.platform.bot_member(&ctx.community_id).await?;
        ensure_role_below(&role, &bot, "the bot's")?;

        let community = self.platform.community(&ctx.community_id).await?;
        if community.owner_id != ctx.invoker.user_id {
            ensure_role_below(&role, &ctx.invoker, "your")?;
        }

        let target = self.platform.member(&ctx.community_id, &member).await?;
        let reason = format!("requested by {}", ctx.invoker.display_name);
        let (title, verb, color) = match action {
            RoleAction::Add => {
                if target.has_role(&role.id) {
                    return Err(DomainError::InvalidArgument(format!(
                        "{} already has {}",
                        target.mention(),
                        role.id.mention()
                    ))
                    .into());
                }
                self.platform.add_role(&ctx.community_id, &target.user_id, &role.id, &reason).await?;
                ("✅ Role added", "now has", COLOR_GREEN)
            }
            RoleAction::Remove => {
                if !target.has_role(&role.id) {
                    return Err(DomainError::InvalidArgument(format!(
                        "{} does not have {}",
                        target.mention(),
                        role.id.mention()
                    ))
                    .into());
                }
                self.platform
                    .remove_role(&ctx.community_id, &target.user_id, &role.id, &reason)
                    .await?;
                ("✅ Role removed", "no longer has", COLOR_ORANGE)
            }
        };

        let message = MessageBuilder::new(String::new())
            .embed(|embed| {
                embed
                    .title(title)
                    .description(format!("{} {verb} {}.", target.mention(), role.id.mention()))
                    .color(color)
                    .field("Moderator", ctx.invoker.mention(), false);
            })
            .build();
        self.audit(&message).await;
        Ok(message)
    }

    pub(super) async fn reaction_role(
        &self,
        ctx: &CommandContext,
        message_id: MessageId,
        emoji: String,
        role_id: RoleId,
    ) -> Result<OutgoingMessage, ApplicationError> {
        let role = self.platform.role(&ctx.community_id, &role_id).await?;
        let bot = self.platform.bot_member(&ctx.community_id).await?;
        ensure_role_below(&role, &bot, "the bot's")?;

        let emoji = normalize_emoji(&emoji);
        if emoji.is_empty() {
            return Err(DomainError::InvalidArgument("emoji must not be empty".to_owned()).into());
        }

        self.repositories
            .roles
            .add_reaction_role(ReactionRole {
                community_id: ctx.community_id.clone(),
                message_id: message_id.clone(),
                emoji: emoji.clone(),
                role_id: role.id.clone(),
                created_at: self.clock.now_utc(),
            })
            .await?;
        if let Err(error) = self.platform.add_reaction(&ctx.channel_id, &message_id, &emoji).await {
            self.repositories.roles.remove_reaction_role(&message_id, &emoji).await?;
            return Err(error.into());
        }

        Ok(MessageBuilder::new(String::new())
            .embed(|embed| {
                embed
                    .title("✅ Reaction role set")
                    .description(format!(
                        "Reacting with {emoji} grants {}.",
                        role.id.mention()
                    ))
                    .color(COLOR_GREEN)
                    .field("Message", message_id.0.clone(), true)
                    .field("Emoji", emoji.clone(), true)
                    .field("Role", role.id.mention(), true);
            })
            .build())
    }
}

#[async_trait]
impl ReactionService for BotServices {
    async fn reaction_changed(
        &self,
        change: ReactionChange,
        event: &ReactionEvent,
        ctx: &EventContext,
    ) -> Result<(), EventHandlerError> {
        let mapping = self
            .repositories
            .roles
            .reaction_role(&event.message_id, &normalize_emoji(&event.emoji))
            .await
            .map_err(|error| EventHandlerError::Reaction(error.to_string()))?;
        let Some(mapping) = mapping.filter(|mapping| mapping.community_id == event.community_id)
        else {
            return Ok(());
        };

        let reason = "reaction role";
        let outcome = match change {
            ReactionChange::Added => {
                self.platform
                    .add_role(&event.community_id, &event.user_id, &mapping.role_id, reason)
                    .await
            }
            ReactionChange::Removed => {
                self.platform
                    .remove_role(&event.community_id, &event.user_id, &mapping.role_id, reason)
                    .await
            }
        };
        outcome.map_err(|error| EventHandlerError::Reaction(error.to_string()))?;

        info!(
            event_name = "roles.reaction_role.applied",
            correlation_id = %ctx.correlation_id,
            community_id = %event.community_id,
            user_id = %event.user_id,
            role_id = %mapping.role_id,
            change = ?change,
            "reaction role applied"
        );
        Ok(())
    }
}
