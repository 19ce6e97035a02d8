//! Threshold alerts with suppression of repeats.
//!
//! A ticker alerts when its daily move is at least the community threshold and differs from the
//! last stored move by at least [`ALERT_REPEAT_DELTA_PERCENT`]. The caller always stores the fresh
//! snapshot afterwards, whether or not an alert went out.

use crate::domain::watchlist::{QuoteSnapshot, WatchlistEntry};

pub const ALERT_REPEAT_DELTA_PERCENT: f64 = 0.1;

// Absorbs binary rounding so that a 5.0 -> 5.1 move counts as a full 0.1.
const FLOAT_TOLERANCE: f64 = 1e-9;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AlertDirection {
    Surge,
    Drop,
}

impl AlertDirection {
    pub fn of(change_percent: f64) -> Self {
        if change_percent > 0.0 {
            Self::Surge
        } else {
            Self::Drop
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Surge => "surge",
            Self::Drop => "drop",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum AlertDecision {
    Fire { direction: AlertDirection },
    BelowThreshold,
    Repeat,
}

impl AlertDecision {
    pub fn fires(&self) -> bool {
        matches!(self, Self::Fire { .. })
    }
}

pub fn evaluate(threshold_percent: f64, last_change_percent: f64, change_percent: f64) -> AlertDecision {
    if !change_percent.is_finite() || change_percent.abs() + FLOAT_TOLERANCE < threshold_percent {
        return AlertDecision::BelowThreshold;
    }
    if (change_percent - last_change_percent).abs() + FLOAT_TOLERANCE < ALERT_REPEAT_DELTA_PERCENT {
        return AlertDecision::Repeat;
    }
    AlertDecision::Fire { direction: AlertDirection::of(change_percent) }
}

pub fn evaluate_entry(
    threshold_percent: f64,
    entry: &WatchlistEntry,
    snapshot: &QuoteSnapshot,
) -> AlertDecision {
    evaluate(threshold_percent, entry.last_change_percent, snapshot.change_percent)
}
