use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{info, warn};

use guildkeeper_core::domain::community::{ChannelId, CommunityId, Member, MessageId, RoleId, UserId};
use guildkeeper_core::domain::schedule::TimeOfDay;
use guildkeeper_core::domain::watchlist::DEFAULT_ALERT_THRESHOLD_PERCENT;
use guildkeeper_core::domain::welcome::{parse_color, WelcomeUpdate};
use guildkeeper_core::errors::ApplicationError;

use crate::messages::{self, named_color, OutgoingMessage, COLOR_BLUE};

/// Permissions the host platform grants to the invoking member.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Permission {
    Administrator,
    KickMembers,
    BanMembers,
    ModerateMembers,
    ManageMessages,
    ManageRoles,
}

impl Permission {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Administrator => "Administrator",
            Self::KickMembers => "Kick Members",
            Self::BanMembers => "Ban Members",
            Self::ModerateMembers => "Moderate Members",
            Self::ManageMessages => "Manage Messages",
            Self::ManageRoles => "Manage Roles",
        }
    }
}

pub fn has_permission(granted: &[Permission], required: Permission) -> bool {
    granted.iter().any(|permission| *permission == Permission::Administrator || *permission == required)
}

/// A slash-command invocation with its options flattened to `name -> value`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlashCommandPayload {
    pub name: String,
    pub options: BTreeMap<String, String>,
    pub community_id: Option<CommunityId>,
    pub channel_id: ChannelId,
    pub invoker: Member,
    pub permissions: Vec<Permission>,
    pub request_id: String,
}

/// What a command handler needs to know about where and by whom it was invoked.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandContext {
    pub community_id: CommunityId,
    pub channel_id: ChannelId,
    pub invoker: Member,
    pub permissions: Vec<Permission>,
    pub request_id: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RoleAction {
    Add,
    Remove,
}

#[derive(Clone, Debug, PartialEq)]
pub enum BotCommand {
    Help,
    Ping,
    ServerInfo,
    UserInfo { member: Option<UserId> },
    Avatar { member: Option<UserId> },
    Poll { question: String, choices: Vec<String> },
    Announce { title: String, description: String, color: u32 },
    Rank { member: Option<UserId> },
    Leaderboard { page: i64 },
    SetLevel { member: UserId, level: i64 },
    Kick { member: UserId, reason: Option<String> },
    Ban { member: UserId, reason: Option<String>, delete_days: i64 },
    Unban { user: UserId },
    Timeout { member: UserId, minutes: i64, reason: Option<String> },
    Untimeout { member: UserId },
    Clear { amount: i64 },
    Warn { member: UserId, reason: String },
    Warnings { member: UserId },
    ClearWarnings { member: UserId },
    AutoRole { role: RoleId },
    RemoveAutoRole,
    Role { member: UserId, role: RoleId, action: RoleAction },
    ReactionRole { message_id: MessageId, emoji: String, role: RoleId },
    News { source: Option<String>, count: Option<i64> },
    ScheduleNews { channel: ChannelId, time: TimeOfDay, source: Option<String> },
    StopNews,
    NewsStatus,
    Stocks { indices: Vec<String> },
    ScheduleStocks { channel: ChannelId, time: TimeOfDay, indices: Vec<String> },
    StopStocks,
    StocksStatus,
    AddStock { ticker: String, name: Option<String> },
    RemoveStock { ticker: String },
    Watchlist,
    SetAlert { channel: ChannelId, threshold: f64 },
    StopAlert,
    SetWelcome { update: WelcomeUpdate },
    WelcomeTest,
    WelcomeChannel { channel: ChannelId },
    WelcomeToggle { enabled: bool },
}

impl BotCommand {
    pub fn required_permission(&self) -> Option<Permission> {
        match self {
            Self::Help
            | Self::Ping
            | Self::ServerInfo
            | Self::UserInfo { .. }
            | Self::Avatar { .. }
            | Self::Poll { .. }
            | Self::Rank { .. }
            | Self::Leaderboard { .. }
            | Self::News { .. }
            | Self::NewsStatus
            | Self::Stocks { .. }
            | Self::StocksStatus
            | Self::Watchlist => None,
            Self::Announce { .. } | Self::Clear { .. } => Some(Permission::ManageMessages),
            Self::Kick { .. } => Some(Permission::KickMembers),
            Self::Ban { .. } | Self::Unban { .. } => Some(Permission::BanMembers),
            Self::Timeout { .. }
            | Self::Untimeout { .. }
            | Self::Warn { .. }
            | Self::Warnings { .. } => Some(Permission::ModerateMembers),
            Self::AutoRole { .. }
            | Self::RemoveAutoRole
            | Self::Role { .. }
            | Self::ReactionRole { .. } => Some(Permission::ManageRoles),
            Self::SetLevel { .. }
            | Self::ClearWarnings { .. }
            | Self::ScheduleNews { .. }
            | Self::StopNews
            | Self::ScheduleStocks { .. }
            | Self::StopStocks
            | Self::AddStock { .. }
            | Self::RemoveStock { .. }
            | Self::SetAlert { .. }
            | Self::StopAlert
            | Self::SetWelcome { .. }
            | Self::WelcomeTest
            | Self::WelcomeChannel { .. }
            | Self::WelcomeToggle { .. } => Some(Permission::Administrator),
        }
    }

    /// `help` and `ping` also work in direct messages.
    pub fn requires_community(&self) -> bool {
        !matches!(self, Self::Help | Self::Ping)
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CommandParseError {
    #[error("unknown command `{0}`")]
    Unknown(String),
    #[error("missing option `{option}`")]
    MissingOption { command: String, option: &'static str },
    #[error("invalid `{option}`: {reason}")]
    InvalidOption { command: String, option: &'static str, reason: String },
}

impl CommandParseError {
    pub fn command(&self) -> &str {
        match self {
            Self::Unknown(command) => command,
            Self::MissingOption { command, .. } | Self::InvalidOption { command, .. } => command,
        }
    }
}

pub fn usage(command: &str) -> &'static str {
    match command {
        "help" => "help",
        "ping" => "ping",
        "serverinfo" => "serverinfo",
        "userinfo" => "userinfo [member:@user]",
        "avatar" => "avatar [member:@user]",
        "poll" => "poll question:<text> option1:<text> option2:<text> [option3..option5]",
        "announce" => "announce title:<text> description:<text> [color:red|green|blue|yellow|purple|orange]",
        "rank" => "rank [member:@user]",
        "leaderboard" => "leaderboard [page:<n>]",
        "setlevel" => "setlevel member:@user level:<n>",
        "kick" => "kick member:@user [reason:<text>]",
        "ban" => "ban member:@user [reason:<text>] [delete_days:0-7]",
        "unban" => "unban user_id:<id>",
        "timeout" => "timeout member:@user minutes:1-40320 [reason:<text>]",
        "untimeout" => "untimeout member:@user",
        "clear" => "clear amount:1-100",
        "warn" => "warn member:@user reason:<text>",
        "warnings" => "warnings member:@user",
        "clearwarnings" => "clearwarnings member:@user",
        "autorole" => "autorole role:@role",
        "removeautorole" => "removeautorole",
        "role" => "role member:@user role:@role action:add|remove",
        "reactionrole" => "reactionrole message_id:<id> emoji:<emoji> role:@role",
        "news" => "news [source:<key>] [count:1-10]",
        "schedulenews" => "schedulenews channel:#channel time:HH:MM [source:<key>]",
        "stopnews" => "stopnews",
        "newsstatus" => "newsstatus",
        "stocks" => "stocks [indices:KOSPI,NASDAQ,...]",
        "schedulestocks" => "schedulestocks channel:#channel time:HH:MM [indices:KOSPI,KOSDAQ,NASDAQ]",
        "stopstocks" => "stopstocks",
        "stocksstatus" => "stocksstatus",
        "addstock" => "addstock ticker:<symbol> [name:<text>]",
        "removestock" => "removestock ticker:<symbol>",
        "watchlist" => "watchlist",
        "setalert" => "setalert channel:#channel [threshold:1-50]",
        "stopalert" => "stopalert",
        "setwelcome" => "setwelcome [title:<text>] [description:<text>] [color:#RRGGBB] [footer:<text>]",
        "welcometest" => "welcometest",
        "welcomechannel" => "welcomechannel channel:#channel",
        "welcometoggle" => "welcometoggle enabled:on|off",
        _ => "help",
    }
}

struct Options<'a> {
    command: &'a str,
    values: &'a BTreeMap<String, String>,
}

impl<'a> Options<'a> {
    fn optional(&self, name: &'static str) -> Option<String> {
        self.values
            .get(name)
            .map(|value| value.trim().to_owned())
            .filter(|value| !value.is_empty())
    }

    fn required(&self, name: &'static str) -> Result<String, CommandParseError> {
        self.optional(name).ok_or_else(|| CommandParseError::MissingOption {
            command: self.command.to_owned(),
            option: name,
        })
    }

    fn invalid(&self, name: &'static str, reason: impl fmt::Display) -> CommandParseError {
        CommandParseError::InvalidOption {
            command: self.command.to_owned(),
            option: name,
            reason: reason.to_string(),
        }
    }

    fn integer(&self, name: &'static str) -> Result<Option<i64>, CommandParseError> {
        self.optional(name)
            .map(|raw| raw.parse::<i64>().map_err(|_| self.invalid(name, format!("`{raw}` is not a whole number"))))
            .transpose()
    }

    fn required_integer(&self, name: &'static str) -> Result<i64, CommandParseError> {
        self.integer(name)?.ok_or_else(|| CommandParseError::MissingOption {
            command: self.command.to_owned(),
            option: name,
        })
    }

    fn user(&self, name: &'static str) -> Result<Option<UserId>, CommandParseError> {
        self.optional(name)
            .map(|raw| parse_user_ref(&raw).ok_or_else(|| self.invalid(name, format!("`{raw}` is not a member"))))
            .transpose()
    }

    fn required_user(&self, name: &'static str) -> Result<UserId, CommandParseError> {
        let raw = self.required(name)?;
        parse_user_ref(&raw).ok_or_else(|| self.invalid(name, format!("`{raw}` is not a member")))
    }

    fn required_channel(&self, name: &'static str) -> Result<ChannelId, CommandParseError> {
        let raw = self.required(name)?;
        parse_channel_ref(&raw).ok_or_else(|| self.invalid(name, format!("`{raw}` is not a channel")))
    }

    fn required_role(&self, name: &'static str) -> Result<RoleId, CommandParseError> {
        let raw = self.required(name)?;
        parse_role_ref(&raw).ok_or_else(|| self.invalid(name, format!("`{raw}` is not a role")))
    }

    fn time(&self, name: &'static str) -> Result<TimeOfDay, CommandParseError> {
        let raw = self.required(name)?;
        raw.parse::<TimeOfDay>().map_err(|error| self.invalid(name, error))
    }

    fn list(&self, name: &'static str) -> Vec<String> {
        self.optional(name)
            .map(|raw| {
                raw.split(|ch: char| ch == ',' || ch.is_whitespace())
                    .map(str::trim)
                    .filter(|item| !item.is_empty())
                    .map(str::to_owned)
                    .collect()
            })
            .unwrap_or_default()
    }
}

fn strip_id(raw: &str, prefixes: &[&str]) -> Option<String> {
    let trimmed = raw.trim();
    let inner = if trimmed.starts_with('<') && trimmed.ends_with('>') {
        let body = &trimmed[1..trimmed.len() - 1];
        prefixes.iter().find_map(|prefix| body.strip_prefix(prefix))?
    } else {
        trimmed
    };
    (!inner.is_empty() && inner.chars().all(|ch| ch.is_ascii_digit())).then(|| inner.to_owned())
}

/// Accepts `<@id>`, `<@!id>` or a bare numeric id.
pub fn parse_user_ref(raw: &str) -> Option<UserId> {
    strip_id(raw, &["@!", "@"]).map(UserId)
}

pub fn parse_channel_ref(raw: &str) -> Option<ChannelId> {
    strip_id(raw, &["#"]).map(ChannelId)
}

pub fn parse_role_ref(raw: &str) -> Option<RoleId> {
    strip_id(raw, &["@&"]).map(RoleId)
}

fn parse_toggle(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "on" | "true" | "yes" | "enable" | "enabled" => Some(true),
        "off" | "false" | "no" | "disable" | "disabled" => Some(false),
        _ => None,
    }
}

pub fn parse_command(
    name: &str,
    values: &BTreeMap<String, String>,
) -> Result<BotCommand, CommandParseError> {
    let command = name.trim().trim_start_matches('/').to_ascii_lowercase();
    let options = Options { command: &command, values };

    let parsed = match command.as_str() {
        "help" => BotCommand::Help,
        "ping" => BotCommand::Ping,
        "serverinfo" => BotCommand::ServerInfo,
        "userinfo" => BotCommand::UserInfo { member: options.user("member")? },
        "avatar" => BotCommand::Avatar { member: options.user("member")? },
        "poll" => {
            let question = options.required("question")?;
            let mut choices = vec![options.required("option1")?, options.required("option2")?];
            for name in ["option3", "option4", "option5"] {
                if let Some(choice) = options.optional(name) {
                    choices.push(choice);
                }
            }
            BotCommand::Poll { question, choices }
        }
        "announce" => {
            let color = match options.optional("color") {
                Some(raw) => named_color(&raw)
                    .ok_or_else(|| options.invalid("color", format!("unknown color `{raw}`")))?,
                None => COLOR_BLUE,
            };
            BotCommand::Announce {
                title: options.required("title")?,
                description: options.required("description")?,
                color,
            }
        }
        "rank" => BotCommand::Rank { member: options.user("member")? },
        "leaderboard" => BotCommand::Leaderboard { page: options.integer("page")?.unwrap_or(1) },
        "setlevel" => BotCommand::SetLevel {
            member: options.required_user("member")?,
            level: options.required_integer("level")?,
        },
        "kick" => BotCommand::Kick {
            member: options.required_user("member")?,
            reason: options.optional("reason"),
        },
        "ban" => BotCommand::Ban {
            member: options.required_user("member")?,
            reason: options.optional("reason"),
            delete_days: options.integer("delete_days")?.unwrap_or(0),
        },
        "unban" => BotCommand::Unban { user: options.required_user("user_id")? },
        "timeout" => BotCommand::Timeout {
            member: options.required_user("member")?,
            minutes: options.required_integer("minutes")?,
            reason: options.optional("reason"),
        },
        "untimeout" => BotCommand::Untimeout { member: options.required_user("member")? },
        "clear" => BotCommand::Clear { amount: options.required_integer("amount")? },
        "warn" => BotCommand::Warn {
            member: options.required_user("member")?,
            reason: options.required("reason")?,
        },
        "warnings" => BotCommand::Warnings { member: options.required_user("member")? },
        "clearwarnings" => BotCommand::ClearWarnings { member: options.required_user("member")? },
        "autorole" => BotCommand::AutoRole { role: options.required_role("role")? },
        "removeautorole" => BotCommand::RemoveAutoRole,
        "role" => {
            let raw = options.required("action")?;
            let action = match raw.to_ascii_lowercase().as_str() {
                "add" => RoleAction::Add,
                "remove" => RoleAction::Remove,
                _ => return Err(options.invalid("action", format!("`{raw}` must be add or remove"))),
            };
            BotCommand::Role {
                member: options.required_user("member")?,
                role: options.required_role("role")?,
                action,
            }
        }
        "reactionrole" => {
            let raw = options.required("message_id")?;
            if !raw.chars().all(|ch| ch.is_ascii_digit()) {
                return Err(options.invalid("message_id", format!("`{raw}` is not a message id")));
            }
            BotCommand::ReactionRole {
                message_id: MessageId(raw),
                emoji: options.required("emoji")?,
                role: options.required_role("role")?,
            }
        }
        "news" => BotCommand::News {
            source: options.optional("source"),
            count: options.integer("count")?,
        },
        "schedulenews" => BotCommand::ScheduleNews {
            channel: options.required_channel("channel")?,
            time: options.time("time")?,
            source: options.optional("source"),
        },
        "stopnews" => BotCommand::StopNews,
        "newsstatus" => BotCommand::NewsStatus,
        "stocks" => BotCommand::Stocks { indices: options.list("indices") },
        "schedulestocks" => BotCommand::ScheduleStocks {
            channel: options.required_channel("channel")?,
            time: options.time("time")?,
            indices: options.list("indices"),
        },
        "stopstocks" => BotCommand::StopStocks,
        "stocksstatus" => BotCommand::StocksStatus,
        "addstock" => BotCommand::AddStock {
            ticker: options.required("ticker")?,
            name: options.optional("name"),
        },
        "removestock" => BotCommand::RemoveStock { ticker: options.required("ticker")? },
        "watchlist" => BotCommand::Watchlist,
        "setalert" => {
            let threshold = match options.optional("threshold") {
                Some(raw) => raw
                    .trim_end_matches('%')
                    .parse::<f64>()
                    .map_err(|_| options.invalid("threshold", format!("`{raw}` is not a number")))?,
                None => DEFAULT_ALERT_THRESHOLD_PERCENT,
            };
            BotCommand::SetAlert { channel: options.required_channel("channel")?, threshold }
        }
        "stopalert" => BotCommand::StopAlert,
        "setwelcome" => {
            let color = options
                .optional("color")
                .map(|raw| parse_color(&raw).map_err(|error| options.invalid("color", error)))
                .transpose()?;
            BotCommand::SetWelcome {
                update: WelcomeUpdate {
                    title: options.optional("title"),
                    description: options.optional("description"),
                    color,
                    footer: options.optional("footer"),
                },
            }
        }
        "welcometest" => BotCommand::WelcomeTest,
        "welcomechannel" => BotCommand::WelcomeChannel { channel: options.required_channel("channel")? },
        "welcometoggle" => {
            let raw = options.required("enabled")?;
            let enabled = parse_toggle(&raw)
                .ok_or_else(|| options.invalid("enabled", format!("`{raw}` must be on or off")))?;
            BotCommand::WelcomeToggle { enabled }
        }
        _ => return Err(CommandParseError::Unknown(command)),
    };

    Ok(parsed)
}

/// Executes parsed commands against the application services.
#[async_trait]
pub trait CommandService: Send + Sync {
    async fn execute(
        &self,
        command: BotCommand,
        ctx: &CommandContext,
    ) -> Result<OutgoingMessage, ApplicationError>;
}

#[derive(Default)]
pub struct NoopCommandService;

#[async_trait]
impl CommandService for NoopCommandService {
    async fn execute(
        &self,
        command: BotCommand,
        _ctx: &CommandContext,
    ) -> Result<OutgoingMessage, ApplicationError> {
        Ok(match command {
            BotCommand::Help => messages::help_message(),
            BotCommand::Ping => OutgoingMessage::text("Pong!"),
            other => OutgoingMessage::text(format!("received {other:?}")).ephemeral(),
        })
    }
}

pub struct CommandRouter<S> {
    service: S,
}

impl<S> CommandRouter<S>
where
    S: CommandService,
{
    pub fn new(service: S) -> Self {
        Self { service }
    }

    /// Parses, authorizes and executes one invocation. Every failure becomes an ephemeral reply.
    pub async fn route(&self, payload: &SlashCommandPayload) -> OutgoingMessage {
        let command = match parse_command(&payload.name, &payload.options) {
            Ok(command) => command,
            Err(error) => {
                info!(
                    event_name = "gateway.command.rejected",
                    correlation_id = %payload.request_id,
                    command = %payload.name,
                    error = %error,
                    "command options rejected"
                );
                return messages::usage_message(
                    &capitalize(&error.to_string()),
                    usage(error.command()),
                );
            }
        };

        if let Some(required) = command.required_permission() {
            if !has_permission(&payload.permissions, required) {
                return messages::error_message(
                    &format!("You need the {} permission to use `{}`.", required.label(), payload.name),
                    &payload.request_id,
                );
            }
        }

        let community_id = match (&payload.community_id, command.requires_community()) {
            (Some(community_id), _) => community_id.clone(),
            (None, false) => CommunityId(String::new()),
            (None, true) => {
                return messages::error_message(
                    "This command can only be used inside a server.",
                    &payload.request_id,
                );
            }
        };

        let ctx = CommandContext {
            community_id,
            channel_id: payload.channel_id.clone(),
            invoker: payload.invoker.clone(),
            permissions: payload.permissions.clone(),
            request_id: payload.request_id.clone(),
        };

        match self.service.execute(command, &ctx).await {
            Ok(message) => message,
            Err(error) => {
                let interface = error.into_interface(payload.request_id.clone());
                warn!(
                    event_name = "gateway.command.failed",
                    correlation_id = %payload.request_id,
                    command = %payload.name,
                    error = %interface,
                    "command failed"
                );
                messages::error_message(interface.detail(), interface.correlation_id())
            }
        }
    }
}

fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Arc;

    use async_trait::async_trait;
    use tokio::sync::Mutex;

    use guildkeeper_core::domain::community::{ChannelId, CommunityId, Member, UserId};
    use guildkeeper_core::errors::{ApplicationError, DomainError};

    use super::{
        parse_channel_ref, parse_command, parse_role_ref, parse_user_ref, BotCommand,
        CommandContext, CommandParseError, CommandRouter, CommandService, Permission, RoleAction,
        SlashCommandPayload,
    };
    use crate::messages::{OutgoingMessage, COLOR_BLUE, COLOR_RED};

    fn options(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs.iter().map(|(key, value)| ((*key).to_owned(), (*value).to_owned())).collect()
    }

    fn payload(name: &str, pairs: &[(&str, &str)], permissions: Vec<Permission>) -> SlashCommandPayload {
        SlashCommandPayload {
            name: name.to_owned(),
            options: options(pairs),
            community_id: Some(CommunityId("g-1".to_owned())),
            channel_id: ChannelId("c-1".to_owned()),
            invoker: Member {
                user_id: UserId("100".to_owned()),
                display_name: "mod".to_owned(),
                is_bot: false,
                role_ids: Vec::new(),
                top_role_position: 5,
                avatar_url: None,
                joined_at: None,
            },
            permissions,
            request_id: "req-1".to_owned(),
        }
    }

    #[derive(Default)]
    struct RecordingService {
        executed: Mutex<Vec<BotCommand>>,
        fail_with: Option<ApplicationError>,
    }

    #[async_trait]
    impl CommandService for Arc<RecordingService> {
        async fn execute(
            &self,
            command: BotCommand,
            _ctx: &CommandContext,
        ) -> Result<OutgoingMessage, ApplicationError> {
            self.executed.lock().await.push(command);
            match &self.fail_with {
                Some(error) => Err(error.clone()),
                None => Ok(OutgoingMessage::text("ok")),
            }
        }
    }

    #[test]
    fn mentions_and_bare_ids_resolve() {
        assert_eq!(parse_user_ref("<@123>"), Some(UserId("123".to_owned())));
        assert_eq!(parse_user_ref("<@!123>"), Some(UserId("123".to_owned())));
        assert_eq!(parse_user_ref("123"), Some(UserId("123".to_owned())));
        assert_eq!(parse_user_ref("<#123>"), None);
        assert_eq!(parse_channel_ref("<#55>").map(|channel| channel.0), Some("55".to_owned()));
        assert_eq!(parse_role_ref("<@&77>").map(|role| role.0), Some("77".to_owned()));
        assert_eq!(parse_role_ref("moderators"), None);
    }

    #[test]
    fn parses_moderation_options() {
        let command = parse_command(
            "ban",
            &options(&[("member", "<@42>"), ("reason", "spam"), ("delete_days", "3")]),
        )
        .expect("parse");

        assert_eq!(
            command,
            BotCommand::Ban {
                member: UserId("42".to_owned()),
                reason: Some("spam".to_owned()),
                delete_days: 3,
            }
        );
        assert_eq!(command.required_permission(), Some(Permission::BanMembers));
    }

    #[test]
    fn schedule_time_is_normalized_at_parse_time() {
        let command = parse_command(
            "schedulestocks",
            &options(&[("channel", "<#9>"), ("time", "7:30"), ("indices", "kospi, btc")]),
        )
        .expect("parse");

        let BotCommand::ScheduleStocks { time, indices, .. } = command else {
            panic!("expected schedulestocks");
        };
        assert_eq!(time.to_string(), "07:30");
        assert_eq!(indices, vec!["kospi", "btc"]);
    }

    #[test]
    fn malformed_options_are_reported_per_option() {
        assert!(matches!(
            parse_command("schedulenews", &options(&[("channel", "<#9>"), ("time", "25:00")])),
            Err(CommandParseError::InvalidOption { option: "time", .. })
        ));
        assert!(matches!(
            parse_command("warn", &options(&[("member", "<@1>")])),
            Err(CommandParseError::MissingOption { option: "reason", .. })
        ));
        assert!(matches!(
            parse_command("role", &options(&[("member", "<@1>"), ("role", "<@&2>"), ("action", "toggle")])),
            Err(CommandParseError::InvalidOption { option: "action", .. })
        ));
        assert!(matches!(parse_command("dance", &options(&[])), Err(CommandParseError::Unknown(_))));
    }

    #[test]
    fn defaults_fill_optional_values() {
        assert_eq!(
            parse_command("announce", &options(&[("title", "Hi"), ("description", "All")])).expect("parse"),
            BotCommand::Announce { title: "Hi".to_owned(), description: "All".to_owned(), color: COLOR_BLUE }
        );
        assert_eq!(
            parse_command("setalert", &options(&[("channel", "<#3>")])).expect("parse"),
            BotCommand::SetAlert { channel: ChannelId("3".to_owned()), threshold: 5.0 }
        );
        assert_eq!(
            parse_command("leaderboard", &options(&[])).expect("parse"),
            BotCommand::Leaderboard { page: 1 }
        );
        assert_eq!(
            parse_command("role", &options(&[("member", "1"), ("role", "<@&2>"), ("action", "ADD")]))
                .expect("parse"),
            BotCommand::Role {
                member: UserId("1".to_owned()),
                role: guildkeeper_core::domain::community::RoleId("2".to_owned()),
                action: RoleAction::Add,
            }
        );
    }

    #[tokio::test]
    async fn router_refuses_missing_permission_without_executing() {
        let service = Arc::new(RecordingService::default());
        let router = CommandRouter::new(service.clone());

        let reply = router.route(&payload("kick", &[("member", "<@2>")], vec![Permission::ManageRoles])).await;

        assert!(reply.ephemeral);
        assert!(reply.summary().contains("Kick Members"));
        assert!(service.executed.lock().await.is_empty());
    }

    #[tokio::test]
    async fn administrator_implies_every_permission() {
        let service = Arc::new(RecordingService::default());
        let router = CommandRouter::new(service.clone());

        let reply = router
            .route(&payload("kick", &[("member", "<@2>")], vec![Permission::Administrator]))
            .await;

        assert_eq!(reply.content, "ok");
        assert_eq!(service.executed.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn usage_error_is_ephemeral_and_names_the_option() {
        let router = CommandRouter::new(Arc::new(RecordingService::default()));
        let reply = router.route(&payload("clear", &[("amount", "lots")], vec![Permission::ManageMessages])).await;

        assert!(reply.ephemeral);
        assert!(reply.summary().contains("amount"));
        assert!(reply.summary().contains("clear amount:1-100"));
    }

    #[tokio::test]
    async fn service_errors_become_user_safe_replies() {
        let service = Arc::new(RecordingService {
            executed: Mutex::new(Vec::new()),
            fail_with: Some(ApplicationError::Domain(DomainError::CapacityExceeded {
                what: "watchlist entries",
                limit: 10,
            })),
        });
        let router = CommandRouter::new(service);

        let reply = router
            .route(&payload("addstock", &[("ticker", "aapl")], vec![Permission::Administrator]))
            .await;

        assert!(reply.ephemeral);
        assert_eq!(reply.embeds[0].color, Some(COLOR_RED));
        assert!(reply.summary().contains("at most 10 watchlist entries"));
    }

    #[tokio::test]
    async fn community_commands_are_refused_in_direct_messages() {
        let router = CommandRouter::new(Arc::new(RecordingService::default()));
        let mut direct = payload("rank", &[], Vec::new());
        direct.community_id = None;

        let reply = router.route(&direct).await;
        assert!(reply.summary().contains("inside a server"));

        let mut ping = payload("ping", &[], Vec::new());
        ping.community_id = None;
        assert_eq!(router.route(&ping).await.content, "ok");
    }
}
