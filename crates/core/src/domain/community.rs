use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CommunityId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChannelId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoleId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub String);

impl UserId {
    pub fn mention(&self) -> String {
        format!("<@{}>", self.0)
    }
}

impl ChannelId {
    pub fn mention(&self) -> String {
        format!("<#{}>", self.0)
    }
}

impl RoleId {
    pub fn mention(&self) -> String {
        format!("<@&{}>", self.0)
    }
}

impl fmt::Display for CommunityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for RoleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A member as seen by the host platform at the time of the lookup.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub user_id: UserId,
    pub display_name: String,
    pub is_bot: bool,
    pub role_ids: Vec<RoleId>,
    /// Position of the member's highest role; higher outranks lower.
    pub top_role_position: i64,
    pub avatar_url: Option<String>,
    pub joined_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl Member {
    pub fn mention(&self) -> String {
        self.user_id.mention()
    }

    pub fn has_role(&self, role_id: &RoleId) -> bool {
        self.role_ids.iter().any(|candidate| candidate == role_id)
    }

    pub fn outranks(&self, other: &Member) -> bool {
        self.top_role_position > other.top_role_position
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Community {
    pub id: CommunityId,
    pub name: String,
    pub member_count: u64,
    pub owner_id: UserId,
    pub system_channel_id: Option<ChannelId>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: RoleId,
    pub name: String,
    pub position: i64,
    /// Roles owned by integrations cannot be granted by hand.
    pub managed: bool,
}

#[cfg(test)]
mod tests {
    use super::{ChannelId, Member, RoleId, UserId};

    fn member(id: &str, position: i64) -> Member {
        Member {
            user_id: UserId(id.to_owned()),
            display_name: id.to_owned(),
            is_bot: false,
            role_ids: vec![RoleId("r-1".to_owned())],
            top_role_position: position,
            avatar_url: None,
            joined_at: None,
        }
    }

    #[test]
    fn mentions_use_platform_markup() {
        assert_eq!(UserId("42".to_owned()).mention(), "<@42>");
        assert_eq!(ChannelId("7".to_owned()).mention(), "<#7>");
        assert_eq!(RoleId("9".to_owned()).mention(), "<@&9>");
    }

    #[test]
    fn equal_positions_do_not_outrank() {
        let moderator = member("mod", 5);
        let target = member("target", 5);

        assert!(!moderator.outranks(&target));
        assert!(moderator.outranks(&member("newbie", 1)));
        assert!(moderator.has_role(&RoleId("r-1".to_owned())));
    }
}
