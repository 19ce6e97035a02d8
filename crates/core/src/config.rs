use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::community::{ChannelId, CommunityId};
use crate::domain::welcome::{parse_color, WelcomeSettings};
use crate::feeds::{news_source, MAX_NEWS_LIMIT};
use crate::leveling::{DEFAULT_COOLDOWN_SECS, DEFAULT_XP_PER_MESSAGE};

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub platform: PlatformConfig,
    pub leveling: LevelingConfig,
    pub welcome: WelcomeConfig,
    pub moderation: ModerationConfig,
    pub feeds: FeedsConfig,
    pub scheduler: SchedulerConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct PlatformConfig {
    pub bot_token: SecretString,
    pub application_id: Option<String>,
}

#[derive(Clone, Debug)]
pub struct LevelingConfig {
    pub enabled: bool,
    pub xp_per_message: i64,
    pub cooldown_secs: u64,
    pub announce_level_up: bool,
    pub level_up_message: String,
}

/// Template used for communities that never customised their welcome message.
#[derive(Clone, Debug)]
pub struct WelcomeConfig {
    pub enabled: bool,
    pub title: String,
    pub description: String,
    pub color: u32,
    pub footer: String,
    pub show_member_count: bool,
    pub show_avatar: bool,
    pub channel_id: Option<String>,
}

#[derive(Clone, Debug)]
pub struct ModerationConfig {
    pub log_channel_id: Option<String>,
    pub max_warnings: u32,
}

#[derive(Clone, Debug)]
pub struct FeedsConfig {
    pub timeout_secs: u64,
    pub news_limit: usize,
    pub default_news_source: String,
    pub quote_base_url: String,
    pub user_agent: String,
}

#[derive(Clone, Debug)]
pub struct SchedulerConfig {
    pub schedule_tick_secs: u64,
    pub alert_tick_secs: u64,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub health_check_port: u16,
    pub graceful_shutdown_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub log_level: Option<String>,
    pub bot_token: Option<String>,
    pub leveling_enabled: Option<bool>,
    pub health_check_port: Option<u16>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

pub const DEFAULT_LEVEL_UP_MESSAGE: &str = "{mention} reached level {level}!";
pub const DEFAULT_WELCOME_DESCRIPTION: &str = "{mention}, welcome to {server}!";

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://guildkeeper.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            platform: PlatformConfig { bot_token: String::new().into(), application_id: None },
            leveling: LevelingConfig {
                enabled: true,
                xp_per_message: DEFAULT_XP_PER_MESSAGE,
                cooldown_secs: DEFAULT_COOLDOWN_SECS,
                announce_level_up: true,
                level_up_message: DEFAULT_LEVEL_UP_MESSAGE.to_string(),
            },
            welcome: WelcomeConfig {
                enabled: true,
                title: "Welcome!".to_string(),
                description: DEFAULT_WELCOME_DESCRIPTION.to_string(),
                color: 0x00FF00,
                footer: String::new(),
                show_member_count: true,
                show_avatar: true,
                channel_id: None,
            },
            moderation: ModerationConfig { log_channel_id: None, max_warnings: 3 },
            feeds: FeedsConfig {
                timeout_secs: 10,
                news_limit: 5,
                default_news_source: "google_kr".to_string(),
                quote_base_url: "https://query1.finance.yahoo.com".to_string(),
                user_agent: "Mozilla/5.0 (compatible; guildkeeper/0.1)".to_string(),
            },
            scheduler: SchedulerConfig { schedule_tick_secs: 60, alert_tick_secs: 300 },
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                health_check_port: 8080,
                graceful_shutdown_secs: 15,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl WelcomeConfig {
    /// Settings a community gets until it stores its own.
    pub fn settings_for(&self, community_id: &CommunityId) -> WelcomeSettings {
        WelcomeSettings {
            community_id: community_id.clone(),
            enabled: self.enabled,
            title: self.title.clone(),
            description: self.description.clone(),
            color: self.color,
            footer: self.footer.clone(),
            show_member_count: self.show_member_count,
            show_avatar: self.show_avatar,
            channel_id: self.channel_id.clone().map(ChannelId),
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch)?;
        } else if options.require_file {
            let expected =
                options.config_path.unwrap_or_else(|| PathBuf::from("guildkeeper.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) -> Result<(), ConfigError> {
        if let Some(database) = patch.database {
            if let Some(url) = database.url {
                self.database.url = url;
            }
            if let Some(max_connections) = database.max_connections {
                self.database.max_connections = max_connections;
            }
            if let Some(timeout_secs) = database.timeout_secs {
                self.database.timeout_secs = timeout_secs;
            }
        }

        if let Some(platform) = patch.platform {
            if let Some(bot_token_value) = platform.bot_token {
                self.platform.bot_token = secret_value(bot_token_value);
            }
            if let Some(application_id) = platform.application_id {
                self.platform.application_id = Some(application_id);
            }
        }

        if let Some(leveling) = patch.leveling {
            if let Some(enabled) = leveling.enabled {
                self.leveling.enabled = enabled;
            }
            if let Some(xp_per_message) = leveling.xp_per_message {
                self.leveling.xp_per_message = xp_per_message;
            }
            if let Some(cooldown_secs) = leveling.cooldown_secs {
                self.leveling.cooldown_secs = cooldown_secs;
            }
            if let Some(announce_level_up) = leveling.announce_level_up {
                self.leveling.announce_level_up = announce_level_up;
            }
            if let Some(level_up_message) = leveling.level_up_message {
                self.leveling.level_up_message = level_up_message;
            }
        }

        if let Some(welcome) = patch.welcome {
            if let Some(enabled) = welcome.enabled {
                self.welcome.enabled = enabled;
            }
            if let Some(title) = welcome.title {
                self.welcome.title = title;
            }
            if let Some(description) = welcome.description {
                self.welcome.description = description;
            }
            if let Some(color) = welcome.color {
                self.welcome.color = parse_color(&color)
                    .map_err(|error| ConfigError::Validation(format!("welcome.color: {error}")))?;
            }
            if let Some(footer) = welcome.footer {
                self.welcome.footer = footer;
            }
            if let Some(show_member_count) = welcome.show_member_count {
                self.welcome.show_member_count = show_member_count;
            }
            if let Some(show_avatar) = welcome.show_avatar {
                self.welcome.show_avatar = show_avatar;
            }
            if let Some(channel_id) = welcome.channel_id {
                self.welcome.channel_id = Some(channel_id);
            }
        }

        if let Some(moderation) = patch.moderation {
            if let Some(log_channel_id) = moderation.log_channel_id {
                self.moderation.log_channel_id = Some(log_channel_id);
            }
            if let Some(max_warnings) = moderation.max_warnings {
                self.moderation.max_warnings = max_warnings;
            }
        }

        if let Some(feeds) = patch.feeds {
            if let Some(timeout_secs) = feeds.timeout_secs {
                self.feeds.timeout_secs = timeout_secs;
            }
            if let Some(news_limit) = feeds.news_limit {
                self.feeds.news_limit = news_limit;
            }
            if let Some(default_news_source) = feeds.default_news_source {
                self.feeds.default_news_source = default_news_source;
            }
            if let Some(quote_base_url) = feeds.quote_base_url {
                self.feeds.quote_base_url = quote_base_url;
            }
            if let Some(user_agent) = feeds.user_agent {
                self.feeds.user_agent = user_agent;
            }
        }

        if let Some(scheduler) = patch.scheduler {
            if let Some(schedule_tick_secs) = scheduler.schedule_tick_secs {
                self.scheduler.schedule_tick_secs = schedule_tick_secs;
            }
            if let Some(alert_tick_secs) = scheduler.alert_tick_secs {
                self.scheduler.alert_tick_secs = alert_tick_secs;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(health_check_port) = server.health_check_port {
                self.server.health_check_port = health_check_port;
            }
            if let Some(graceful_shutdown_secs) = server.graceful_shutdown_secs {
                self.server.graceful_shutdown_secs = graceful_shutdown_secs;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }

        Ok(())
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("GUILDKEEPER_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("GUILDKEEPER_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections =
                parse_u32("GUILDKEEPER_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("GUILDKEEPER_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_u64("GUILDKEEPER_DATABASE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("GUILDKEEPER_PLATFORM_BOT_TOKEN") {
            self.platform.bot_token = secret_value(value);
        }
        if let Some(value) = read_env("GUILDKEEPER_PLATFORM_APPLICATION_ID") {
            self.platform.application_id = Some(value);
        }

        if let Some(value) = read_env("GUILDKEEPER_LEVELING_ENABLED") {
            self.leveling.enabled = parse_bool("GUILDKEEPER_LEVELING_ENABLED", &value)?;
        }
        if let Some(value) = read_env("GUILDKEEPER_LEVELING_XP_PER_MESSAGE") {
            self.leveling.xp_per_message =
                parse_i64("GUILDKEEPER_LEVELING_XP_PER_MESSAGE", &value)?;
        }
        if let Some(value) = read_env("GUILDKEEPER_LEVELING_COOLDOWN_SECS") {
            self.leveling.cooldown_secs = parse_u64("GUILDKEEPER_LEVELING_COOLDOWN_SECS", &value)?;
        }
        if let Some(value) = read_env("GUILDKEEPER_LEVELING_ANNOUNCE_LEVEL_UP") {
            self.leveling.announce_level_up =
                parse_bool("GUILDKEEPER_LEVELING_ANNOUNCE_LEVEL_UP", &value)?;
        }

        if let Some(value) = read_env("GUILDKEEPER_WELCOME_CHANNEL_ID") {
            self.welcome.channel_id = Some(value);
        }
        if let Some(value) = read_env("GUILDKEEPER_MODERATION_LOG_CHANNEL_ID") {
            self.moderation.log_channel_id = Some(value);
        }
        if let Some(value) = read_env("GUILDKEEPER_MODERATION_MAX_WARNINGS") {
            self.moderation.max_warnings =
                parse_u32("GUILDKEEPER_MODERATION_MAX_WARNINGS", &value)?;
        }

        if let Some(value) = read_env("GUILDKEEPER_FEEDS_TIMEOUT_SECS") {
            self.feeds.timeout_secs = parse_u64("GUILDKEEPER_FEEDS_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("GUILDKEEPER_FEEDS_QUOTE_BASE_URL") {
            self.feeds.quote_base_url = value;
        }
        if let Some(value) = read_env("GUILDKEEPER_FEEDS_NEWS_LIMIT") {
            self.feeds.news_limit = parse_u32("GUILDKEEPER_FEEDS_NEWS_LIMIT", &value)? as usize;
        }
        if let Some(value) = read_env("GUILDKEEPER_FEEDS_DEFAULT_NEWS_SOURCE") {
            self.feeds.default_news_source = value;
        }

        if let Some(value) = read_env("GUILDKEEPER_SCHEDULER_SCHEDULE_TICK_SECS") {
            self.scheduler.schedule_tick_secs =
                parse_u64("GUILDKEEPER_SCHEDULER_SCHEDULE_TICK_SECS", &value)?;
        }
        if let Some(value) = read_env("GUILDKEEPER_SCHEDULER_ALERT_TICK_SECS") {
            self.scheduler.alert_tick_secs =
                parse_u64("GUILDKEEPER_SCHEDULER_ALERT_TICK_SECS", &value)?;
        }

        if let Some(value) = read_env("GUILDKEEPER_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("GUILDKEEPER_SERVER_HEALTH_CHECK_PORT") {
            self.server.health_check_port =
                parse_u16("GUILDKEEPER_SERVER_HEALTH_CHECK_PORT", &value)?;
        }
        if let Some(value) = read_env("GUILDKEEPER_SERVER_GRACEFUL_SHUTDOWN_SECS") {
            self.server.graceful_shutdown_secs =
                parse_u64("GUILDKEEPER_SERVER_GRACEFUL_SHUTDOWN_SECS", &value)?;
        }

        let log_level =
            read_env("GUILDKEEPER_LOGGING_LEVEL").or_else(|| read_env("GUILDKEEPER_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("GUILDKEEPER_LOGGING_FORMAT").or_else(|| read_env("GUILDKEEPER_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(database_url) = overrides.database_url {
            self.database.url = database_url;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(bot_token) = overrides.bot_token {
            self.platform.bot_token = secret_value(bot_token);
        }
        if let Some(enabled) = overrides.leveling_enabled {
            self.leveling.enabled = enabled;
        }
        if let Some(port) = overrides.health_check_port {
            self.server.health_check_port = port;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_database(&self.database)?;
        validate_platform(&self.platform)?;
        validate_leveling(&self.leveling)?;
        validate_feeds(&self.feeds)?;
        validate_scheduler(&self.scheduler)?;
        validate_server(&self.server)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("guildkeeper.toml"), PathBuf::from("config/guildkeeper.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_database(database: &DatabaseConfig) -> Result<(), ConfigError> {
    let url = database.url.trim();
    let sqlite_url =
        url.starts_with("sqlite://") || url.starts_with("sqlite::") || url == ":memory:";
    if !sqlite_url {
        return Err(ConfigError::Validation(
            "database.url must be a sqlite URL (`sqlite://...`, `sqlite::...`, or `:memory:`)"
                .to_string(),
        ));
    }

    if database.max_connections == 0 {
        return Err(ConfigError::Validation(
            "database.max_connections must be greater than zero".to_string(),
        ));
    }

    if database.timeout_secs == 0 || database.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "database.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_platform(platform: &PlatformConfig) -> Result<(), ConfigError> {
    let bot_token = platform.bot_token.expose_secret();
    if bot_token.trim().is_empty() {
        return Err(ConfigError::Validation(
            "platform.bot_token is required. Set it in guildkeeper.toml or GUILDKEEPER_PLATFORM_BOT_TOKEN"
                .to_string(),
        ));
    }
    if bot_token.chars().any(char::is_whitespace) {
        return Err(ConfigError::Validation(
            "platform.bot_token must not contain whitespace".to_string(),
        ));
    }

    Ok(())
}

fn validate_leveling(leveling: &LevelingConfig) -> Result<(), ConfigError> {
    if leveling.xp_per_message <= 0 {
        return Err(ConfigError::Validation(
            "leveling.xp_per_message must be greater than zero".to_string(),
        ));
    }
    if leveling.announce_level_up && leveling.level_up_message.trim().is_empty() {
        return Err(ConfigError::Validation(
            "leveling.level_up_message must not be empty when announce_level_up is enabled"
                .to_string(),
        ));
    }

    Ok(())
}

fn validate_feeds(feeds: &FeedsConfig) -> Result<(), ConfigError> {
    if feeds.timeout_secs == 0 || feeds.timeout_secs > 120 {
        return Err(ConfigError::Validation(
            "feeds.timeout_secs must be in range 1..=120".to_string(),
        ));
    }
    if feeds.news_limit == 0 || feeds.news_limit > MAX_NEWS_LIMIT {
        return Err(ConfigError::Validation(format!(
            "feeds.news_limit must be in range 1..={MAX_NEWS_LIMIT}"
        )));
    }
    news_source(&feeds.default_news_source)
        .map_err(|error| ConfigError::Validation(format!("feeds.default_news_source: {error}")))?;
    if !feeds.quote_base_url.starts_with("http://") && !feeds.quote_base_url.starts_with("https://")
    {
        return Err(ConfigError::Validation(
            "feeds.quote_base_url must start with http:// or https://".to_string(),
        ));
    }

    Ok(())
}

fn validate_scheduler(scheduler: &SchedulerConfig) -> Result<(), ConfigError> {
    // A tick longer than a minute could step over a configured HH:MM entirely.
    if scheduler.schedule_tick_secs == 0 || scheduler.schedule_tick_secs > 60 {
        return Err(ConfigError::Validation(
            "scheduler.schedule_tick_secs must be in range 1..=60".to_string(),
        ));
    }
    if scheduler.alert_tick_secs == 0 {
        return Err(ConfigError::Validation(
            "scheduler.alert_tick_secs must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.health_check_port == 0 {
        return Err(ConfigError::Validation(
            "server.health_check_port must be greater than zero".to_string(),
        ));
    }

    if server.graceful_shutdown_secs == 0 {
        return Err(ConfigError::Validation(
            "server.graceful_shutdown_secs must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn invalid_override(key: &str, value: &str) -> ConfigError {
    ConfigError::InvalidEnvOverride { key: key.to_string(), value: value.to_string() }
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| invalid_override(key, value))
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| invalid_override(key, value))
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| invalid_override(key, value))
}

fn parse_i64(key: &str, value: &str) -> Result<i64, ConfigError> {
    value.parse::<i64>().map_err(|_| invalid_override(key, value))
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    value.parse::<bool>().map_err(|_| invalid_override(key, value))
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    platform: Option<PlatformPatch>,
    leveling: Option<LevelingPatch>,
    welcome: Option<WelcomePatch>,
    moderation: Option<ModerationPatch>,
    feeds: Option<FeedsPatch>,
    scheduler: Option<SchedulerPatch>,
    server: Option<ServerPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct PlatformPatch {
    bot_token: Option<String>,
    application_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct LevelingPatch {
    enabled: Option<bool>,
    xp_per_message: Option<i64>,
    cooldown_secs: Option<u64>,
    announce_level_up: Option<bool>,
    level_up_message: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct WelcomePatch {
    enabled: Option<bool>,
    title: Option<String>,
    description: Option<String>,
    color: Option<String>,
    footer: Option<String>,
    show_member_count: Option<bool>,
    show_avatar: Option<bool>,
    channel_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ModerationPatch {
    log_channel_id: Option<String>,
    max_warnings: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct FeedsPatch {
    timeout_secs: Option<u64>,
    news_limit: Option<usize>,
    default_news_source: Option<String>,
    quote_base_url: Option<String>,
    user_agent: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct SchedulerPatch {
    schedule_tick_secs: Option<u64>,
    alert_tick_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    health_check_port: Option<u16>,
    graceful_shutdown_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
