pub mod community;
pub mod moderation;
pub mod roles;
pub mod schedule;
pub mod watchlist;
pub mod welcome;
pub mod xp;
