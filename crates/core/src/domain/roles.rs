use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::community::{CommunityId, MessageId, RoleId};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionRole {
    pub community_id: CommunityId,
    pub message_id: MessageId,
    pub emoji: String,
    pub role_id: RoleId,
    pub created_at: DateTime<Utc>,
}

/// Emoji keys are compared after trimming whitespace and surrounding colons.
pub fn normalize_emoji(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.starts_with('<') && trimmed.ends_with('>') {
        return trimmed.to_owned();
    }
    trimmed.trim_matches(':').to_owned()
}

#[cfg(test)]
mod tests {
    use super::normalize_emoji;

    #[test]
    fn emoji_keys_ignore_colons_and_spacing() {
        assert_eq!(normalize_emoji(" :tada: "), "tada");
        assert_eq!(normalize_emoji("🎉"), "🎉");
        assert_eq!(normalize_emoji("<:custom:1234>"), "<:custom:1234>");
    }
}
