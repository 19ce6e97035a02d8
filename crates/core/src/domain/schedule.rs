use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::community::{ChannelId, CommunityId};
use crate::errors::DomainError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    News,
    Stocks,
}

impl Feature {
    pub const ALL: [Feature; 2] = [Feature::News, Feature::Stocks];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::News => "news",
            Self::Stocks => "stocks",
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Feature {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "news" => Ok(Self::News),
            "stocks" => Ok(Self::Stocks),
            other => Err(DomainError::InvalidArgument(format!("unknown schedule feature `{other}`"))),
        }
    }
}

/// Local wall-clock time with minute granularity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TimeOfDay {
    hour: u8,
    minute: u8,
}

impl TimeOfDay {
    pub fn new(hour: u8, minute: u8) -> Result<Self, DomainError> {
        if hour > 23 || minute > 59 {
            return Err(DomainError::InvalidArgument(format!(
                "time must be HH:MM with hour 0-23 and minute 0-59 (got {hour}:{minute})"
            )));
        }
        Ok(Self { hour, minute })
    }

    pub fn hour(&self) -> u8 {
        self.hour
    }

    pub fn minute(&self) -> u8 {
        self.minute
    }

    pub fn of(moment: &NaiveDateTime) -> Self {
        Self { hour: moment.hour() as u8, minute: moment.minute() as u8 }
    }

    pub fn matches(&self, moment: &NaiveDateTime) -> bool {
        *self == Self::of(moment)
    }
}

impl Default for TimeOfDay {
    fn default() -> Self {
        Self { hour: 9, minute: 0 }
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

impl FromStr for TimeOfDay {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let invalid = || {
            DomainError::InvalidArgument(format!(
                "invalid time `{}`; expected HH:MM such as 09:00 or 18:30",
                value.trim()
            ))
        };

        let (hour, minute) = value.trim().split_once(':').ok_or_else(invalid)?;
        let well_formed = |part: &str| {
            (1..=2).contains(&part.len()) && part.bytes().all(|byte| byte.is_ascii_digit())
        };
        if !well_formed(hour) || !well_formed(minute) {
            return Err(invalid());
        }
        let hour = hour.parse::<u8>().map_err(|_| invalid())?;
        let minute = minute.parse::<u8>().map_err(|_| invalid())?;
        Self::new(hour, minute).map_err(|_| invalid())
    }
}

/// What a schedule delivers when it fires.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SchedulePayload {
    News { source: String },
    Stocks { indices: Vec<String> },
}

impl SchedulePayload {
    pub fn feature(&self) -> Feature {
        match self {
            Self::News { .. } => Feature::News,
            Self::Stocks { .. } => Feature::Stocks,
        }
    }

    /// Storage form: the news source key, or comma-joined index names.
    pub fn encode(&self) -> String {
        match self {
            Self::News { source } => source.clone(),
            Self::Stocks { indices } => indices.join(","),
        }
    }

    pub fn decode(feature: Feature, raw: &str) -> Self {
        match feature {
            Feature::News => Self::News { source: raw.trim().to_owned() },
            Feature::Stocks => Self::Stocks {
                indices: raw
                    .split(',')
                    .map(str::trim)
                    .filter(|name| !name.is_empty())
                    .map(str::to_owned)
                    .collect(),
            },
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Self::News { source } => source.clone(),
            Self::Stocks { indices } if indices.is_empty() => "none".to_owned(),
            Self::Stocks { indices } => indices.join(", "),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleConfig {
    pub community_id: CommunityId,
    pub enabled: bool,
    pub channel_id: ChannelId,
    pub time_of_day: TimeOfDay,
    pub payload: SchedulePayload,
    pub updated_at: DateTime<Utc>,
}

impl ScheduleConfig {
    pub fn feature(&self) -> Feature {
        self.payload.feature()
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::{Feature, SchedulePayload, TimeOfDay};
    use crate::errors::DomainError;

    #[test]
    fn parses_and_normalizes_time_of_day() {
        let time: TimeOfDay = "9:05".parse().expect("single digit hour is accepted");
        assert_eq!(time.to_string(), "09:05");

        let time: TimeOfDay = " 18:30 ".parse().expect("surrounding spaces are trimmed");
        assert_eq!((time.hour(), time.minute()), (18, 30));
    }

    #[test]
    fn rejects_out_of_range_and_malformed_times() {
        for raw in ["24:00", "12:60", "noon", "12", "12:", ":30", "-1:00", "123:00", "12:5a"] {
            assert!(raw.parse::<TimeOfDay>().is_err(), "`{raw}` should be rejected");
        }
    }

    #[test]
    fn signed_or_padded_parts_are_not_times() {
        for raw in ["+9:+5", "+9:05", "09:+5", " 9: 05", "٩:05"] {
            let error = raw.parse::<TimeOfDay>().expect_err("only ascii digits form a time");
            assert!(matches!(error, DomainError::InvalidArgument(_)), "`{raw}`: {error}");
        }
    }

    #[test]
    fn matches_only_the_exact_minute() {
        let time = TimeOfDay::new(9, 0).expect("valid time");
        let day = NaiveDate::from_ymd_opt(2026, 3, 2).expect("date");

        assert!(time.matches(&day.and_hms_opt(9, 0, 0).expect("09:00:00")));
        assert!(time.matches(&day.and_hms_opt(9, 0, 59).expect("09:00:59")));
        assert!(!time.matches(&day.and_hms_opt(8, 59, 59).expect("08:59:59")));
        assert!(!time.matches(&day.and_hms_opt(9, 1, 0).expect("09:01:00")));
    }

    #[test]
    fn stock_payload_survives_storage_form() {
        let payload =
            SchedulePayload::Stocks { indices: vec!["KOSPI".to_owned(), "NASDAQ".to_owned()] };
        let stored = payload.encode();

        assert_eq!(stored, "KOSPI,NASDAQ");
        assert_eq!(SchedulePayload::decode(Feature::Stocks, &stored), payload);
        assert_eq!("stocks".parse::<Feature>().expect("feature"), Feature::Stocks);
    }
}
