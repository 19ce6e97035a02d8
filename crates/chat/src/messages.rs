use serde::Serialize;

use guildkeeper_core::feeds::{truncate_chars, FeedItem};

pub const COLOR_BLUE: u32 = 0x3498db;
pub const COLOR_GREEN: u32 = 0x2ecc71;
pub const COLOR_RED: u32 = 0xe74c3c;
pub const COLOR_YELLOW: u32 = 0xf1c40f;
pub const COLOR_PURPLE: u32 = 0x9b59b6;
pub const COLOR_ORANGE: u32 = 0xe67e22;
pub const COLOR_GOLD: u32 = 0xffd700;

/// Named colors accepted by the announce command.
pub fn named_color(name: &str) -> Option<u32> {
    match name.trim().to_ascii_lowercase().as_str() {
        "red" => Some(COLOR_RED),
        "green" => Some(COLOR_GREEN),
        "blue" => Some(COLOR_BLUE),
        "yellow" => Some(COLOR_YELLOW),
        "purple" => Some(COLOR_PURPLE),
        "orange" => Some(COLOR_ORANGE),
        _ => None,
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Embed {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<EmbedField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub footer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

/// A message as handed to the platform: plain content plus optional embeds.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct OutgoingMessage {
    pub content: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub embeds: Vec<Embed>,
    /// Only visible to the invoking user; meaningful for command replies.
    pub ephemeral: bool,
}

impl OutgoingMessage {
    pub fn text(content: impl Into<String>) -> Self {
        Self { content: content.into(), embeds: Vec::new(), ephemeral: false }
    }

    pub fn ephemeral(mut self) -> Self {
        self.ephemeral = true;
        self
    }

    /// Flattened text used for logs and plain-text fallbacks.
    pub fn summary(&self) -> String {
        if !self.content.is_empty() {
            return self.content.clone();
        }
        self.embeds
            .iter()
            .filter_map(|embed| embed.title.clone().or_else(|| embed.description.clone()))
            .collect::<Vec<_>>()
            .join(" | ")
    }
}

pub struct MessageBuilder {
    content: String,
    embeds: Vec<Embed>,
    ephemeral: bool,
}

impl MessageBuilder {
    pub fn new(content: impl Into<String>) -> Self {
        Self { content: content.into(), embeds: Vec::new(), ephemeral: false }
    }

    pub fn embed<F>(mut self, build: F) -> Self
    where
        F: FnOnce(&mut EmbedBuilder),
    {
        let mut builder = EmbedBuilder::default();
        build(&mut builder);
        self.embeds.push(builder.build());
        self
    }

    pub fn ephemeral(mut self) -> Self {
        self.ephemeral = true;
        self
    }

    pub fn build(self) -> OutgoingMessage {
        OutgoingMessage { content: self.content, embeds: self.embeds, ephemeral: self.ephemeral }
    }
}

#[derive(Default)]
pub struct EmbedBuilder {
    embed: Embed,
}

impl EmbedBuilder {
    pub fn title(&mut self, title: impl Into<String>) -> &mut Self {
        self.embed.title = Some(title.into());
        self
    }

    pub fn description(&mut self, description: impl Into<String>) -> &mut Self {
        self.embed.description = Some(description.into());
        self
    }

    pub fn url(&mut self, url: impl Into<String>) -> &mut Self {
        self.embed.url = Some(url.into());
        self
    }

    pub fn color(&mut self, color: u32) -> &mut Self {
        self.embed.color = Some(color);
        self
    }

    pub fn field(&mut self, name: impl Into<String>, value: impl Into<String>, inline: bool) -> &mut Self {
        self.embed.fields.push(EmbedField { name: name.into(), value: value.into(), inline });
        self
    }

    pub fn footer(&mut self, footer: impl Into<String>) -> &mut Self {
        let footer = footer.into();
        if !footer.is_empty() {
            self.embed.footer = Some(footer);
        }
        self
    }

    pub fn thumbnail(&mut self, url: impl Into<String>) -> &mut Self {
        self.embed.thumbnail_url = Some(url.into());
        self
    }

    pub fn image(&mut self, url: impl Into<String>) -> &mut Self {
        self.embed.image_url = Some(url.into());
        self
    }

    fn build(self) -> Embed {
        self.embed
    }
}

pub fn error_message(detail: &str, correlation_id: &str) -> OutgoingMessage {
    MessageBuilder::new(format!("Error: {detail}"))
        .embed(|embed| {
            embed
                .title("Something went wrong")
                .description(detail)
                .color(COLOR_RED)
                .footer(format!("ref {correlation_id}"));
        })
        .ephemeral()
        .build()
}

pub fn usage_message(detail: &str, usage: &str) -> OutgoingMessage {
    MessageBuilder::new(format!("{detail} Usage: {usage}"))
        .embed(|embed| {
            embed.title("Invalid command").description(detail).color(COLOR_ORANGE).field(
                "Usage",
                format!("`{usage}`"),
                false,
            );
        })
        .ephemeral()
        .build()
}

pub fn success_message(title: &str, description: &str) -> OutgoingMessage {
    MessageBuilder::new(String::new())
        .embed(|embed| {
            embed.title(title).description(description).color(COLOR_GREEN);
        })
        .build()
}

pub fn notice_message(title: &str, description: &str) -> OutgoingMessage {
    MessageBuilder::new(String::new())
        .embed(|embed| {
            embed.title(title).description(description).color(COLOR_BLUE);
        })
        .build()
}

/// Numbered headline list; every title links to its article.
pub fn news_digest_message(source_label: &str, items: &[FeedItem]) -> OutgoingMessage {
    if items.is_empty() {
        return notice_message("News unavailable", "No headlines could be fetched right now.");
    }

    let lines = items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            let title = guildkeeper_core::feeds::truncate_title(&item.title);
            if item.link.is_empty() {
                format!("**{}.** {title}", index + 1)
            } else {
                format!("**{}.** [{title}]({})", index + 1, item.link)
            }
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    MessageBuilder::new(String::new())
        .embed(|embed| {
            embed
                .title(format!("📰 {source_label}"))
                .description(truncate_chars(&lines, 4_000))
                .color(COLOR_BLUE)
                .footer(format!("{} headlines", items.len()));
        })
        .build()
}

pub fn help_message() -> OutgoingMessage {
    MessageBuilder::new(String::new())
        .embed(|embed| {
            embed
                .title("Guildkeeper commands")
                .color(COLOR_BLUE)
                .field("General", "`help` `ping` `serverinfo` `userinfo` `avatar` `poll` `announce`", false)
                .field("Levels", "`rank` `leaderboard` `setlevel`", false)
                .field(
                    "Moderation",
                    "`kick` `ban` `unban` `timeout` `untimeout` `clear` `warn` `warnings` `clearwarnings`",
                    false,
                )
                .field("Roles", "`autorole` `removeautorole` `role` `reactionrole`", false)
                .field("News", "`news` `schedulenews` `stopnews` `newsstatus`", false)
                .field(
                    "Markets",
                    "`stocks` `schedulestocks` `stopstocks` `stocksstatus` `addstock` `removestock` `watchlist` `setalert` `stopalert`",
                    false,
                )
                .field("Welcome", "`setwelcome` `welcometest` `welcomechannel` `welcometoggle`", false);
        })
        .ephemeral()
        .build()
}
