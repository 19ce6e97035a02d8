use async_trait::async_trait;
use tracing::{info, warn};

use guildkeeper_chat::commands::CommandContext;
use guildkeeper_chat::events::{EventContext, EventHandlerError, MemberJoinedEvent, MemberService};
use guildkeeper_chat::messages::{success_message, MessageBuilder, OutgoingMessage};
use guildkeeper_core::domain::community::{ChannelId, Community, CommunityId, Member};
use guildkeeper_core::domain::welcome::{render_template, TemplateVars, WelcomeSettings, WelcomeUpdate};
use guildkeeper_core::errors::{ApplicationError, DomainError};

use super::{best_effort, BotServices};

/// Renders the welcome embed for `member`. `community` is absent when the platform lookup failed.
pub(crate) fn welcome_message(
    settings: &WelcomeSettings,
    community: Option<&Community>,
    member: &Member,
) -> OutgoingMessage {
    let mention = member.mention();
    let vars = TemplateVars {
        mention: &mention,
        name: &member.display_name,
        server: community.map(|community| community.name.as_str()).unwrap_or("the server"),
        member_count: community.map(|community| community.member_count),
        level: None,
    };

    MessageBuilder::new(String::new())
        .embed(|embed| {
            embed
                .title(render_template(&settings.title, &vars))
                .description(render_template(&settings.description, &vars))
                .color(settings.color)
                .footer(render_template(&settings.footer, &vars));
            if settings.show_member_count {
                if let Some(count) = vars.member_count {
                    embed.field("Members", format!("You are member #{count}"), false);
                }
            }
            if settings.show_avatar {
                if let Some(avatar) = &member.avatar_url {
                    embed.thumbnail(avatar.clone());
                }
            }
        })
        .build()
}

impl BotServices {
    async fn welcome_settings(
        &self,
        community_id: &CommunityId,
    ) -> Result<WelcomeSettings, ApplicationError> {
        Ok(self
            .repositories
            .welcome
            .get(community_id)
            .await?
            .unwrap_or_else(|| self.config.welcome.settings_for(community_id)))
    }

    async fn save_welcome(&self, settings: WelcomeSettings) -> Result<(), ApplicationError> {
        self.repositories.welcome.save(settings, self.clock.now_utc()).await?;
        Ok(())
    }

    pub(super) async fn set_welcome(
        &self,
        ctx: &CommandContext,
        update: WelcomeUpdate,
    ) -> Result<OutgoingMessage, ApplicationError> {
        let mut settings = self.welcome_settings(&ctx.community_id).await?;
        update.apply(&mut settings)?;
        self.save_welcome(settings).await?;

        Ok(success_message(
            "✅ Welcome message updated",
            "Use `welcometest` to preview the new message.",
        ))
    }

    pub(super) async fn welcome_test(
        &self,
        ctx: &CommandContext,
    ) -> Result<OutgoingMessage, ApplicationError> {
        let settings = self.welcome_settings(&ctx.community_id).await?;
        let community = self.platform.community(&ctx.community_id).await?;
        Ok(welcome_message(&settings, Some(&community), &ctx.invoker))
    }

    pub(super) async fn welcome_channel(
        &self,
        ctx: &CommandContext,
        channel: ChannelId,
    ) -> Result<OutgoingMessage, ApplicationError> {
        let info = self.platform.channel(&channel).await?;
        if info.community_id.as_ref().is_some_and(|owner| *owner != ctx.community_id) {
            return Err(DomainError::InvalidArgument(format!(
                "{} belongs to another server",
                channel.mention()
            ))
            .into());
        }

        let mut settings = self.welcome_settings(&ctx.community_id).await?;
        settings.channel_id = Some(channel.clone());
        self.save_welcome(settings).await?;

        Ok(success_message(
            "✅ Welcome channel set",
            &format!("Welcome messages will be posted in {}.", channel.mention()),
        ))
    }

    pub(super) async fn welcome_toggle(
        &self,
        ctx: &CommandContext,
        enabled: bool,
    ) -> Result<OutgoingMessage, ApplicationError> {
        let mut settings = self.welcome_settings(&ctx.community_id).await?;
        settings.enabled = enabled;
        self.save_welcome(settings).await?;

        let state = if enabled { "enabled" } else { "disabled" };
        Ok(success_message("✅ Welcome message", &format!("Welcome messages are now {state}.")))
    }
}

#[async_trait]
impl MemberService for BotServices {
    async fn member_joined(
        &self,
        event: &MemberJoinedEvent,
        ctx: &EventContext,
    ) -> Result<(), EventHandlerError> {
        let community_id = &event.community_id;
        let settings = self
            .welcome_settings(community_id)
            .await
            .map_err(|error| EventHandlerError::MemberJoined(error.to_string()))?;
        let community = best_effort(
            "welcome.community_lookup.failed",
            self.platform.community(community_id).await,
        );

        if settings.enabled {
            let channel = settings
                .channel_id
                .clone()
                .or_else(|| community.as_ref().and_then(|community| community.system_channel_id.clone()));
            match channel {
                Some(channel) => {
                    let message = welcome_message(&settings, community.as_ref(), &event.member);
                    best_effort(
                        "welcome.delivery.failed",
                        self.platform.deliver(&channel, &message).await,
                    );
                }
                None => warn!(
                    event_name = "welcome.delivery.skipped",
                    correlation_id = %ctx.correlation_id,
                    community_id = %community_id,
                    "no welcome channel configured and no system channel"
                ),
            }
        }

        let auto_role = self
            .repositories
            .roles
            .auto_role(community_id)
            .await
            .map_err(|error| EventHandlerError::MemberJoined(error.to_string()))?;
        if let Some(role_id) = auto_role {
            let granted = best_effort(
                "roles.auto_role.failed",
                self.platform
                    .add_role(community_id, &event.member.user_id, &role_id, "auto-role on join")
                    .await,
            );
            if granted.is_some() {
                info!(
                    event_name = "roles.auto_role.granted",
                    correlation_id = %ctx.correlation_id,
                    community_id = %community_id,
                    user_id = %event.member.user_id,
                    role_id = %role_id,
                    "auto-role granted"
                );
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use guildkeeper_chat::commands::{BotCommand, CommandService};
    use guildkeeper_chat::events::{EventContext, MemberJoinedEvent, MemberService};
    use guildkeeper_core::domain::community::{ChannelId, RoleId};
    use guildkeeper_core::domain::welcome::WelcomeUpdate;
    use guildkeeper_core::errors::ApplicationError;

    use crate::services::testing::{community_id, context, member, start_time, FakePlatform, Harness};

    fn joined(id: &str) -> MemberJoinedEvent {
        MemberJoinedEvent { community_id: community_id(), member: member(id, 0) }
    }

    #[tokio::test]
    async fn join_posts_to_system_channel_and_grants_auto_role() {
        let harness = Harness::new(FakePlatform::default());
        harness
            .repositories
            .roles
            .set_auto_role(&community_id(), &RoleId("newcomer".to_owned()), start_time())
            .await
            .expect("auto role");

        harness.services.member_joined(&joined("ada"), &EventContext::default()).await.expect("join");

        let delivered = harness.platform.delivered();
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].0, ChannelId("system".to_owned()));
        let embed = &delivered[0].1.embeds[0];
        assert_eq!(embed.description.as_deref(), Some("<@ada>, welcome to Test Guild!"));
        assert_eq!(embed.fields[0].value, "You are member #42");
        assert_eq!(harness.platform.actions(), vec!["add_role ada newcomer"]);
    }

    #[tokio::test]
    async fn broken_welcome_channel_does_not_block_auto_role() {
        let harness = Harness::new(FakePlatform::default());
        let ctx = context(member("admin", 99));
        harness
            .services
            .execute(BotCommand::WelcomeChannel { channel: ChannelId("hall".to_owned()) }, &ctx)
            .await
            .expect("channel");
        harness.platform.break_channel("hall");
        harness
            .repositories
            .roles
            .set_auto_role(&community_id(), &RoleId("newcomer".to_owned()), start_time())
            .await
            .expect("auto role");

        harness.services.member_joined(&joined("ada"), &EventContext::default()).await.expect("join");

        assert!(harness.platform.delivered().is_empty());
        assert_eq!(harness.platform.actions(), vec!["add_role ada newcomer"]);
    }

    #[tokio::test]
    async fn toggled_off_welcome_sends_nothing() {
        let harness = Harness::new(FakePlatform::default());
        let ctx = context(member("admin", 99));
        harness
            .services
            .execute(BotCommand::WelcomeToggle { enabled: false }, &ctx)
            .await
            .expect("toggle");

        harness.services.member_joined(&joined("ada"), &EventContext::default()).await.expect("join");

        assert!(harness.platform.delivered().is_empty());
    }

    #[tokio::test]
    async fn edits_show_up_in_the_preview() {
        let harness = Harness::new(FakePlatform::default());
        let ctx = context(member("admin", 99));

        let empty = harness
            .services
            .execute(BotCommand::SetWelcome { update: WelcomeUpdate::default() }, &ctx)
            .await;
        assert!(matches!(empty, Err(ApplicationError::Domain(_))));

        harness
            .services
            .execute(
                BotCommand::SetWelcome {
                    update: WelcomeUpdate {
                        title: Some("Hello {name}".to_owned()),
                        footer: Some("{member_count} strong".to_owned()),
                        ..WelcomeUpdate::default()
                    },
                },
                &ctx,
            )
            .await
            .expect("update");

        let preview = harness.services.execute(BotCommand::WelcomeTest, &ctx).await.expect("preview");
        let embed = &preview.embeds[0];
        assert_eq!(embed.title.as_deref(), Some("Hello admin"));
        assert_eq!(embed.footer.as_deref(), Some("42 strong"));
    }
}
