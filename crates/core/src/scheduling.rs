//! Minute-granularity trigger matching for daily schedules.

use std::collections::HashMap;

use chrono::{Duration, NaiveDateTime, Timelike};

use crate::domain::community::CommunityId;
use crate::domain::schedule::{Feature, ScheduleConfig};

/// Remembers the last minute each (feature, community) schedule fired so that two ticks
/// landing inside the same minute deliver once.
#[derive(Debug, Default)]
pub struct FiredMinutes {
    fired: HashMap<(Feature, CommunityId), NaiveDateTime>,
}

impl FiredMinutes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` exactly once per matching minute for an enabled schedule.
    pub fn claim(&mut self, schedule: &ScheduleConfig, now_local: NaiveDateTime) -> bool {
        if !schedule.enabled || !schedule.time_of_day.matches(&now_local) {
            return false;
        }

        let minute = truncate_to_minute(now_local);
        let key = (schedule.feature(), schedule.community_id.clone());
        if self.fired.get(&key) == Some(&minute) {
            return false;
        }
        self.fired.insert(key, minute);
        true
    }

    /// Drops markers older than a day; they can never match again.
    pub fn prune(&mut self, now_local: NaiveDateTime) {
        let horizon = now_local - Duration::days(1);
        self.fired.retain(|_, minute| *minute > horizon);
    }

    pub fn len(&self) -> usize {
        self.fired.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fired.is_empty()
    }
}

fn truncate_to_minute(moment: NaiveDateTime) -> NaiveDateTime {
    moment.with_second(0).and_then(|value| value.with_nanosecond(0)).unwrap_or(moment)
}
