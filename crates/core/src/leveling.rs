//! Level math and the grant cooldown gate.
//!
//! Total XP needed to *reach* level `L` is `5L² + 50L + 100` for `L >= 1`, and zero for level 0.
//! A record's level is always the largest `L` whose threshold is at or below its XP.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Duration, Utc};

use crate::domain::community::{CommunityId, UserId};
use crate::errors::DomainError;

pub const DEFAULT_XP_PER_MESSAGE: i64 = 10;
pub const DEFAULT_COOLDOWN_SECS: u64 = 60;
pub const PROGRESS_BAR_WIDTH: usize = 20;

/// Cumulative XP required to reach `level`. Saturates instead of overflowing.
pub fn xp_threshold(level: i64) -> i64 {
    i64::try_from(wide_threshold(level)).unwrap_or(i64::MAX)
}

fn wide_threshold(level: i64) -> i128 {
    if level <= 0 {
        return 0;
    }
    let level = i128::from(level);
    level
        .checked_mul(level)
        .and_then(|squared| squared.checked_mul(5))
        .and_then(|quadratic| quadratic.checked_add(50 * level + 100))
        .unwrap_or(i128::MAX)
}

pub fn level_for_xp(xp: i64) -> i64 {
    if xp < xp_threshold(1) {
        return 0;
    }

    // Closed-form root of 5L² + 50L + 100 = xp, then corrected for float rounding.
    let estimate = ((-50.0 + (20.0 * xp as f64 + 500.0).sqrt()) / 10.0).floor();
    let mut level = if estimate.is_finite() && estimate >= 0.0 { estimate as i64 } else { 0 };

    let xp_wide = i128::from(xp);
    while level > 0 && wide_threshold(level) > xp_wide {
        level -= 1;
    }
    while wide_threshold(level + 1) <= xp_wide {
        level += 1;
    }
    level
}

pub fn validate_level(level: i64) -> Result<i64, DomainError> {
    if level < 0 {
        return Err(DomainError::InvalidArgument(format!("level must be 0 or greater (got {level})")));
    }
    // Levels whose threshold no longer fits in i64 could not be stored consistently.
    if wide_threshold(level.saturating_add(1)) > i128::from(i64::MAX) {
        return Err(DomainError::InvalidArgument(format!("level {level} is too large")));
    }
    Ok(level)
}

/// How far a record is between its current level and the next one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LevelProgress {
    pub level: i64,
    pub xp_into_level: i64,
    pub xp_for_next_level: i64,
}

impl LevelProgress {
    pub fn for_xp(xp: i64) -> Self {
        let level = level_for_xp(xp);
        let floor = xp_threshold(level);
        let ceiling = xp_threshold(level.saturating_add(1));
        Self {
            level,
            xp_into_level: xp.saturating_sub(floor),
            xp_for_next_level: ceiling.saturating_sub(floor),
        }
    }

    pub fn filled_cells(&self, width: usize) -> usize {
        if self.xp_for_next_level <= 0 {
            return width;
        }
        let ratio = self.xp_into_level as f64 / self.xp_for_next_level as f64;
        ((ratio * width as f64).floor() as usize).min(width)
    }

    pub fn bar(&self) -> String {
        let filled = self.filled_cells(PROGRESS_BAR_WIDTH);
        format!("[{}{}]", "█".repeat(filled), "░".repeat(PROGRESS_BAR_WIDTH - filled))
    }
}

const PRUNE_AFTER_ENTRIES: usize = 4_096;

/// Process-local gate that admits at most one XP grant per member per window.
///
/// State is ephemeral: a restart forgets every entry, which at worst allows one early grant.
pub struct CooldownCache {
    window: Duration,
    last_attempt: Mutex<HashMap<(CommunityId, UserId), DateTime<Utc>>>,
}

impl CooldownCache {
    pub fn new(window_secs: u64) -> Self {
        let window_secs = window_secs.min(u64::from(u32::MAX)) as i64;
        Self {
            window: Duration::seconds(window_secs),
            last_attempt: Mutex::new(HashMap::new()),
        }
    }

    /// Returns `true` and records `now` when the member is outside the window.
    pub fn try_acquire(&self, community_id: &CommunityId, user_id: &UserId, now: DateTime<Utc>) -> bool {
        let mut entries = self.last_attempt.lock().unwrap_or_else(PoisonError::into_inner);
        let key = (community_id.clone(), user_id.clone());

        if let Some(previous) = entries.get(&key) {
            if now.signed_duration_since(*previous) < self.window {
                return false;
            }
        }

        if entries.len() >= PRUNE_AFTER_ENTRIES {
            let window = self.window;
            entries.retain(|_, seen| now.signed_duration_since(*seen) < window);
        }
        entries.insert(key, now);
        true
    }

    pub fn len(&self) -> usize {
        self.last_attempt.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.last_attempt.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }
}

impl Default for CooldownCache {
    fn default() -> Self {
        Self::new(DEFAULT_COOLDOWN_SECS)
    }
}
