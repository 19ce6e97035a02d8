use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use guildkeeper_core::config::{AppConfig, LoadOptions};
use secrecy::ExposeSecret;
use toml::Value;

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for (key, value) in effective_values(&config) {
        let source = field_source(key, config_file_doc.as_ref(), config_file_path.as_deref());
        lines.push(render_line(key, &value, source));
    }

    lines.join("\n")
}

fn effective_values(config: &AppConfig) -> Vec<(&'static str, String)> {
    let optional = |value: &Option<String>| value.clone().unwrap_or_else(|| "<unset>".to_string());

    vec![
        ("database.url", config.database.url.clone()),
        ("database.max_connections", config.database.max_connections.to_string()),
        ("database.timeout_secs", config.database.timeout_secs.to_string()),
        ("platform.bot_token", redact_token(config.platform.bot_token.expose_secret())),
        ("platform.application_id", optional(&config.platform.application_id)),
        ("leveling.enabled", config.leveling.enabled.to_string()),
        ("leveling.xp_per_message", config.leveling.xp_per_message.to_string()),
        ("leveling.cooldown_secs", config.leveling.cooldown_secs.to_string()),
        ("leveling.announce_level_up", config.leveling.announce_level_up.to_string()),
        ("welcome.channel_id", optional(&config.welcome.channel_id)),
        ("moderation.log_channel_id", optional(&config.moderation.log_channel_id)),
        ("moderation.max_warnings", config.moderation.max_warnings.to_string()),
        ("feeds.timeout_secs", config.feeds.timeout_secs.to_string()),
        ("feeds.news_limit", config.feeds.news_limit.to_string()),
        ("feeds.quote_base_url", config.feeds.quote_base_url.clone()),
        ("feeds.default_news_source", config.feeds.default_news_source.clone()),
        ("scheduler.schedule_tick_secs", config.scheduler.schedule_tick_secs.to_string()),
        ("scheduler.alert_tick_secs", config.scheduler.alert_tick_secs.to_string()),
        ("server.bind_address", config.server.bind_address.clone()),
        ("server.health_check_port", config.server.health_check_port.to_string()),
        ("server.graceful_shutdown_secs", config.server.graceful_shutdown_secs.to_string()),
        ("logging.level", config.logging.level.clone()),
        ("logging.format", format!("{:?}", config.logging.format)),
    ]
}

/// `leveling.cooldown_secs` reads from `GUILDKEEPER_LEVELING_COOLDOWN_SECS`.
fn env_key(key_path: &str) -> String {
    format!("GUILDKEEPER_{}", key_path.replace('.', "_").to_ascii_uppercase())
}

fn detect_config_path() -> Option<PathBuf> {
    [PathBuf::from("guildkeeper.toml"), PathBuf::from("config/guildkeeper.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    let env_key = env_key(key_path);
    if env::var_os(&env_key).is_some() {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

/// Keeps the first four characters so operators can tell tokens apart.
fn redact_token(token: &str) -> String {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }

    let prefix: String = trimmed.chars().take(4).collect();
    if trimmed.chars().count() <= 8 {
        return "<redacted>".to_string();
    }
    format!("{prefix}***")
}
