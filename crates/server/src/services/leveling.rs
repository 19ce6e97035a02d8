use async_trait::async_trait;
use tracing::{debug, info};

use guildkeeper_chat::commands::CommandContext;
use guildkeeper_chat::events::{EventContext, EventHandlerError, MessageCreatedEvent, MessageService};
use guildkeeper_chat::messages::{
    notice_message, success_message, MessageBuilder, OutgoingMessage, COLOR_GOLD, COLOR_PURPLE,
};
use guildkeeper_core::domain::community::UserId;
use guildkeeper_core::domain::welcome::{render_template, TemplateVars};
use guildkeeper_core::errors::ApplicationError;
use guildkeeper_core::leveling::{validate_level, LevelProgress};

use super::{best_effort, BotServices};

const MEDALS: [&str; 3] = ["🥇", "🥈", "🥉"];

impl BotServices {
    pub(super) async fn rank(
        &self,
        ctx: &CommandContext,
        member: Option<UserId>,
    ) -> Result<OutgoingMessage, ApplicationError> {
        let target = match member {
            Some(user_id) if user_id != ctx.invoker.user_id => {
                self.platform.member(&ctx.community_id, &user_id).await?
            }
            _ => ctx.invoker.clone(),
        };

        let xp = &self.repositories.xp;
        let Some(record) = xp.record(&ctx.community_id, &target.user_id).await? else {
            return Ok(notice_message(
                "No level record",
                &format!("{} has not earned any XP yet.", target.mention()),
            )
            .ephemeral());
        };
        let rank = xp.rank(&ctx.community_id, &target.user_id).await?.unwrap_or(1);
        let progress = LevelProgress::for_xp(record.xp);

        Ok(MessageBuilder::new(String::new())
            .embed(|embed| {
                embed
                    .title(format!("{}'s rank", target.display_name))
                    .color(COLOR_PURPLE)
                    .field("Level", format!("**{}**", record.level), true)
                    .field("Rank", format!("**#{rank}**"), true)
                    .field("Total XP", format!("**{}**", record.xp), true)
                    .field(
                        "Progress",
                        format!(
                            "{} {}/{}",
                            progress.bar(),
                            progress.xp_into_level,
                            progress.xp_for_next_level
                        ),
                        false,
                    )
                    .field("Messages", record.total_messages.to_string(), true)
                    .footer(format!("Requested by {}", ctx.invoker.display_name));
                if let Some(avatar) = &target.avatar_url {
                    embed.thumbnail(avatar.clone());
                }
            })
            .build())
    }

    pub(super) async fn leaderboard(
        &self,
        ctx: &CommandContext,
        page: i64,
    ) -> Result<OutgoingMessage, ApplicationError> {
        let board = self.repositories.xp.leaderboard_page(&ctx.community_id, page).await?;
        if board.entries.is_empty() {
            return Ok(notice_message("Leaderboard", "No data on this page.").ephemeral());
        }

        let lines = board
            .entries
            .iter()
            .map(|(position, entry)| {
                let marker = usize::try_from(*position - 1)
                    .ok()
                    .and_then(|index| MEDALS.get(index))
                    .map(|medal| (*medal).to_owned())
                    .unwrap_or_else(|| format!("**#{position}**"));
                format!(
                    "{marker} {} · Level {} · {} XP",
                    entry.user_id.mention(),
                    entry.level,
                    entry.xp
                )
            })
            .collect::<Vec<_>>()
            .join("\n");

        Ok(MessageBuilder::new(String::new())
            .embed(|embed| {
                embed
                    .title("🏆 Leaderboard")
                    .description(lines)
                    .color(COLOR_GOLD)
                    .footer(format!("Page {}/{}", board.page, board.total_pages));
            })
            .build())
    }

    pub(super) async fn set_level(
        &self,
        ctx: &CommandContext,
        member: UserId,
        level: i64,
    ) -> Result<OutgoingMessage, ApplicationError> {
        let level = validate_level(level)?;
        let record = self.repositories.xp.set_level(&ctx.community_id, &member, level).await?;

        info!(
            event_name = "leveling.level.set",
            correlation_id = %ctx.request_id,
            community_id = %ctx.community_id,
            user_id = %member,
            level,
            "administrator set member level"
        );

        Ok(success_message(
            "Level updated",
            &format!("{} is now level {} with {} XP.", member.mention(), record.level, record.xp),
        ))
    }
}

#[async_trait]
impl MessageService for BotServices {
    async fn handle_message(
        &self,
        event: &MessageCreatedEvent,
        ctx: &EventContext,
    ) -> Result<(), EventHandlerError> {
        let leveling = &self.config.leveling;
        let Some(community_id) = event.community_id.as_ref() else {
            return Ok(());
        };
        if !leveling.enabled || event.author.is_bot {
            return Ok(());
        }

        let user_id = &event.author.user_id;
        let now = self.clock.now_utc();
        if !self.cooldowns.try_acquire(community_id, user_id, now) {
            debug!(
                event_name = "leveling.grant.cooldown",
                correlation_id = %ctx.correlation_id,
                community_id = %community_id,
                user_id = %user_id,
                "grant skipped inside cooldown window"
            );
            return Ok(());
        }

        let new_level = self
            .repositories
            .xp
            .grant(community_id, user_id, leveling.xp_per_message, now)
            .await
            .map_err(|error| EventHandlerError::Message(error.to_string()))?;

        let Some(level) = new_level else {
            return Ok(());
        };
        info!(
            event_name = "leveling.level.up",
            correlation_id = %ctx.correlation_id,
            community_id = %community_id,
            user_id = %user_id,
            level,
            "member levelled up"
        );

        if leveling.announce_level_up {
            let text = render_template(
                &leveling.level_up_message,
                &TemplateVars {
                    mention: &event.author.mention(),
                    name: &event.author.display_name,
                    level: Some(level),
                    ..TemplateVars::default()
                },
            );
            best_effort(
                "leveling.announce.failed",
                self.platform.deliver(&event.channel_id, &OutgoingMessage::text(text)).await,
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use guildkeeper_chat::commands::{BotCommand, CommandService};
    use guildkeeper_chat::events::{EventContext, MessageCreatedEvent, MessageService};
    use guildkeeper_core::config::AppConfig;
    use guildkeeper_core::domain::community::{ChannelId, MessageId, UserId};

    use crate::services::testing::{community_id, context, member, FakePlatform, Harness};

    fn message_from(user: &str) -> MessageCreatedEvent {
        MessageCreatedEvent {
            community_id: Some(community_id()),
            channel_id: ChannelId("chat".to_owned()),
            message_id: MessageId("m".to_owned()),
            author: member(user, 1),
            content: "hello".to_owned(),
        }
    }

    #[tokio::test]
    async fn rapid_messages_grant_once_per_cooldown() {
        let harness = Harness::new(FakePlatform::default());
        let ctx = EventContext::default();

        harness.services.handle_message(&message_from("ada"), &ctx).await.expect("first");
        harness.services.handle_message(&message_from("ada"), &ctx).await.expect("second");

        let record = harness
            .repositories
            .xp
            .record(&community_id(), &UserId("ada".to_owned()))
            .await
            .expect("read")
            .expect("record");
        assert_eq!(record.xp, 10);
        assert_eq!(record.total_messages, 1);

        harness.clock.advance(Duration::seconds(61));
        harness.services.handle_message(&message_from("ada"), &ctx).await.expect("third");
        let record = harness
            .repositories
            .xp
            .record(&community_id(), &UserId("ada".to_owned()))
            .await
            .expect("read")
            .expect("record");
        assert_eq!(record.xp, 20);
    }

    #[tokio::test]
    async fn level_up_is_announced_in_the_message_channel() {
        let mut config = AppConfig::default();
        config.leveling.xp_per_message = 100;
        let harness = Harness::with_config(FakePlatform::default(), config);

        harness
            .services
            .handle_message(&message_from("ada"), &EventContext::default())
            .await
            .expect("grant");
        assert!(harness.platform.delivered().is_empty(), "100 xp is still level 0");

        harness.clock.advance(Duration::seconds(61));
        harness
            .services
            .handle_message(&message_from("ada"), &EventContext::default())
            .await
            .expect("grant");

        let delivered = harness.platform.delivered();
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].0, ChannelId("chat".to_owned()));
        assert_eq!(delivered[0].1.content, "<@ada> reached level 1!");
    }

    #[tokio::test]
    async fn disabled_leveling_grants_nothing() {
        let mut config = AppConfig::default();
        config.leveling.enabled = false;
        let harness = Harness::with_config(FakePlatform::default(), config);

        harness
            .services
            .handle_message(&message_from("ada"), &EventContext::default())
            .await
            .expect("ignored");

        let count = harness.repositories.xp.member_count(&community_id()).await.expect("count");
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn rank_reports_missing_record_and_then_position() {
        let harness = Harness::new(FakePlatform::default());
        let ctx = context(member("ada", 1));

        let reply = harness
            .services
            .execute(BotCommand::Rank { member: None }, &ctx)
            .await
            .expect("rank");
        assert!(reply.ephemeral);
        assert!(reply.summary().contains("No level record"));

        harness
            .services
            .execute(BotCommand::SetLevel { member: UserId("ada".to_owned()), level: 2 }, &ctx)
            .await
            .expect("set level");
        let reply = harness
            .services
            .execute(BotCommand::Rank { member: None }, &ctx)
            .await
            .expect("rank");

        let fields = &reply.embeds[0].fields;
        assert_eq!(fields[0].value, "**2**");
        assert_eq!(fields[1].value, "**#1**");
        assert_eq!(fields[2].value, "**220**");
    }

    #[tokio::test]
    async fn leaderboard_rejects_page_zero_and_reports_empty_pages() {
        let harness = Harness::new(FakePlatform::default());
        let ctx = context(member("ada", 1));

        assert!(harness
            .services
            .execute(BotCommand::Leaderboard { page: 0 }, &ctx)
            .await
            .is_err());

        let reply = harness
            .services
            .execute(BotCommand::Leaderboard { page: 3 }, &ctx)
            .await
            .expect("empty page");
        assert!(reply.summary().contains("Leaderboard"));
        assert_eq!(reply.embeds[0].description.as_deref(), Some("No data on this page."));
    }
}
