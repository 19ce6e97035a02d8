use serde::{Deserialize, Serialize};

use crate::domain::community::{ChannelId, CommunityId};
use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WelcomeSettings {
    pub community_id: CommunityId,
    pub enabled: bool,
    pub title: String,
    pub description: String,
    pub color: u32,
    pub footer: String,
    pub show_member_count: bool,
    pub show_avatar: bool,
    pub channel_id: Option<ChannelId>,
}

/// Partial edit applied by the welcome settings command.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WelcomeUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub color: Option<u32>,
    pub footer: Option<String>,
}

impl WelcomeUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.color.is_none()
            && self.footer.is_none()
    }

    pub fn apply(self, settings: &mut WelcomeSettings) -> Result<(), DomainError> {
        if self.is_empty() {
            return Err(DomainError::InvalidArgument(
                "provide at least one of title, description, color or footer".to_owned(),
            ));
        }
        if let Some(title) = self.title {
            settings.title = title;
        }
        if let Some(description) = self.description {
            settings.description = description;
        }
        if let Some(color) = self.color {
            settings.color = color;
        }
        if let Some(footer) = self.footer {
            settings.footer = footer;
        }
        Ok(())
    }
}

/// Values substituted into welcome and level-up templates.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TemplateVars<'a> {
    pub mention: &'a str,
    pub name: &'a str,
    pub server: &'a str,
    pub member_count: Option<u64>,
    pub level: Option<i64>,
}

pub fn render_template(template: &str, vars: &TemplateVars<'_>) -> String {
    let mut rendered = template
        .replace("{mention}", vars.mention)
        .replace("{name}", vars.name)
        .replace("{server}", vars.server);
    if let Some(member_count) = vars.member_count {
        rendered = rendered.replace("{member_count}", &member_count.to_string());
    }
    if let Some(level) = vars.level {
        rendered = rendered.replace("{level}", &level.to_string());
    }
    rendered
}

/// Accepts `#RRGGBB`, `RRGGBB` or `0xRRGGBB`.
pub fn parse_color(raw: &str) -> Result<u32, DomainError> {
    let trimmed = raw.trim();
    let hex = trimmed
        .strip_prefix('#')
        .or_else(|| trimmed.strip_prefix("0x"))
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    if hex.len() != 6 {
        return Err(DomainError::InvalidArgument(format!(
            "invalid color `{trimmed}`; use a hex value such as #00FF00"
        )));
    }
    u32::from_str_radix(hex, 16).map_err(|_| {
        DomainError::InvalidArgument(format!(
            "invalid color `{trimmed}`; use a hex value such as #00FF00"
        ))
    })
}
