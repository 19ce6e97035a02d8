pub mod alerts;
pub mod clock;
pub mod config;
pub mod domain;
pub mod errors;
pub mod feeds;
pub mod leveling;
pub mod scheduling;

pub use alerts::{AlertDecision, AlertDirection};
pub use clock::{Clock, ManualClock, SystemClock};
pub use domain::community::{ChannelId, Community, CommunityId, Member, MessageId, Role, RoleId, UserId};
pub use domain::schedule::{Feature, ScheduleConfig, SchedulePayload, TimeOfDay};
pub use domain::watchlist::{AlertConfig, QuoteSnapshot, WatchlistEntry};
pub use domain::xp::{LeaderboardEntry, LeaderboardPage, XpRecord};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use feeds::{FeedItem, FeedSource, FetchError, QuoteSource};
pub use leveling::{level_for_xp, xp_threshold, CooldownCache, LevelProgress};
pub use scheduling::FiredMinutes;
