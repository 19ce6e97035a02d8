use guildkeeper_chat::commands::CommandContext;
use guildkeeper_chat::messages::{MessageBuilder, OutgoingMessage, COLOR_BLUE, COLOR_PURPLE};
use guildkeeper_core::domain::community::{Member, UserId};
use guildkeeper_core::errors::{ApplicationError, DomainError};

use super::{best_effort, BotServices};

pub(crate) const POLL_REACTIONS: [&str; 5] = ["1️⃣", "2️⃣", "3️⃣", "4️⃣", "5️⃣"];

impl BotServices {
    async fn resolve_member(
        &self,
        ctx: &CommandContext,
        member: Option<UserId>,
    ) -> Result<Member, ApplicationError> {
        match member {
            Some(user_id) if user_id != ctx.invoker.user_id => {
                Ok(self.platform.member(&ctx.community_id, &user_id).await?)
            }
            _ => Ok(ctx.invoker.clone()),
        }
    }

    pub(super) async fn server_info(
        &self,
        ctx: &CommandContext,
    ) -> Result<OutgoingMessage, ApplicationError> {
        let community = self.platform.community(&ctx.community_id).await?;

        Ok(MessageBuilder::new(String::new())
            .embed(|embed| {
                embed
                    .title(format!("📊 {}", community.name))
                    .color(COLOR_BLUE)
                    .field("Server id", community.id.0.clone(), true)
                    .field("Owner", community.owner_id.mention(), true)
                    .field("Members", community.member_count.to_string(), true);
                if let Some(channel) = &community.system_channel_id {
                    embed.field("System channel", channel.mention(), true);
                }
            })
            .build())
    }

    pub(super) async fn user_info(
        &self,
        ctx: &CommandContext,
        member: Option<UserId>,
    ) -> Result<OutgoingMessage, ApplicationError> {
        let member = self.resolve_member(ctx, member).await?;
        let roles = if member.role_ids.is_empty() {
            "none".to_owned()
        } else {
            member.role_ids.iter().map(|role| role.mention()).collect::<Vec<_>>().join(" ")
        };

        Ok(MessageBuilder::new(String::new())
            .embed(|embed| {
                embed
                    .title(format!("👤 {}", member.display_name))
                    .color(COLOR_PURPLE)
                    .field("Id", member.user_id.0.clone(), true)
                    .field("Bot", if member.is_bot { "yes" } else { "no" }, true)
                    .field("Roles", roles, false);
                if let Some(joined_at) = member.joined_at {
                    embed.field("Joined", joined_at.format("%Y-%m-%d").to_string(), true);
                }
                if let Some(avatar) = &member.avatar_url {
                    embed.thumbnail(avatar.clone());
                }
            })
            .build())
    }

    pub(super) async fn avatar(
        &self,
        ctx: &CommandContext,
        member: Option<UserId>,
    ) -> Result<OutgoingMessage, ApplicationError> {
        let member = self.resolve_member(ctx, member).await?;
        let Some(avatar) = member.avatar_url.clone() else {
            return Err(ApplicationError::NotFound(format!(
                "{} has no avatar",
                member.mention()
            )));
        };

        Ok(MessageBuilder::new(String::new())
            .embed(|embed| {
                embed
                    .title(format!("{}'s avatar", member.display_name))
                    .url(avatar.clone())
                    .image(avatar)
                    .color(COLOR_PURPLE);
            })
            .build())
    }

    /// Posts the poll into the invoking channel and seeds one reaction per choice.
    pub(super) async fn poll(
        &self,
        ctx: &CommandContext,
        question: String,
        choices: Vec<String>,
    ) -> Result<OutgoingMessage, ApplicationError> {
        if !(2..=POLL_REACTIONS.len()).contains(&choices.len()) {
            return Err(DomainError::InvalidArgument(format!(
                "a poll needs between 2 and {} options",
                POLL_REACTIONS.len()
            ))
            .into());
        }

        let lines = choices
            .iter()
            .zip(POLL_REACTIONS)
            .map(|(choice, marker)| format!("{marker} {choice}"))
            .collect::<Vec<_>>()
            .join("\n");
        let poll = MessageBuilder::new(String::new())
            .embed(|embed| {
                embed
                    .title(format!("📊 {question}"))
                    .description(lines)
                    .color(COLOR_BLUE)
                    .footer(format!("Poll by {}", ctx.invoker.display_name));
            })
            .build();

        let message_id = self.platform.deliver(&ctx.channel_id, &poll).await?;
        for marker in POLL_REACTIONS.iter().take(choices.len()) {
            best_effort(
                "utility.poll.reaction_failed",
                self.platform.add_reaction(&ctx.channel_id, &message_id, marker).await,
            );
        }

        Ok(OutgoingMessage::text("Poll created.").ephemeral())
    }

    pub(super) async fn announce(
        &self,
        ctx: &CommandContext,
        title: String,
        description: String,
        color: u32,
    ) -> Result<OutgoingMessage, ApplicationError> {
        let announcement = MessageBuilder::new(String::new())
            .embed(|embed| {
                embed
                    .title(format!("📢 {title}"))
                    .description(description.replace("\\n", "\n"))
                    .color(color)
                    .footer(format!("Announced by {}", ctx.invoker.display_name));
            })
            .build();

        self.platform.deliver(&ctx.channel_id, &announcement).await?;
        Ok(OutgoingMessage::text("Announcement posted.").ephemeral())
    }
}

#[cfg(test)]
mod tests {
    use guildkeeper_chat::commands::{BotCommand, CommandService};
    use guildkeeper_chat::messages::COLOR_RED;
    use guildkeeper_core::errors::ApplicationError;

    use crate::services::testing::{context, member, FakePlatform, Harness};

    #[tokio::test]
    async fn poll_posts_and_reacts_per_choice() {
        let harness = Harness::new(FakePlatform::default());
        let reply = harness
            .services
            .execute(
                BotCommand::Poll {
                    question: "Lunch?".to_owned(),
                    choices: vec!["Pizza".to_owned(), "Ramen".to_owned(), "Salad".to_owned()],
                },
                &context(member("ada", 1)),
            )
            .await
            .expect("poll");

        assert!(reply.ephemeral);
        let delivered = harness.platform.delivered();
        assert_eq!(delivered.len(), 1);
        assert_eq!(
            delivered[0].1.embeds[0].description.as_deref(),
            Some("1️⃣ Pizza\n2️⃣ Ramen\n3️⃣ Salad")
        );
        assert_eq!(harness.platform.actions(), vec!["react m-1 1️⃣", "react m-1 2️⃣", "react m-1 3️⃣"]);
    }

    #[tokio::test]
    async fn poll_needs_two_choices() {
        let harness = Harness::new(FakePlatform::default());
        let result = harness
            .services
            .execute(
                BotCommand::Poll { question: "Yes?".to_owned(), choices: vec!["Yes".to_owned()] },
                &context(member("ada", 1)),
            )
            .await;

        assert!(matches!(result, Err(ApplicationError::Domain(_))));
        assert!(harness.platform.delivered().is_empty());
    }

    #[tokio::test]
    async fn announce_keeps_the_chosen_color() {
        let harness = Harness::new(FakePlatform::default());
        harness
            .services
            .execute(
                BotCommand::Announce {
                    title: "Maintenance".to_owned(),
                    description: "Down at 10pm\\nBack soon".to_owned(),
                    color: COLOR_RED,
                },
                &context(member("ada", 1)),
            )
            .await
            .expect("announce");

        let embed = &harness.platform.delivered()[0].1.embeds[0];
        assert_eq!(embed.color, Some(COLOR_RED));
        assert_eq!(embed.description.as_deref(), Some("Down at 10pm\nBack soon"));
    }

    #[tokio::test]
    async fn server_info_reads_the_platform() {
        let harness = Harness::new(FakePlatform::default());
        let reply = harness
            .services
            .execute(BotCommand::ServerInfo, &context(member("ada", 1)))
            .await
            .expect("info");

        assert_eq!(reply.embeds[0].title.as_deref(), Some("📊 Test Guild"));
    }
}
