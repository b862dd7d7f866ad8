//! Expiry status classification.
//!
//! A document's status is derived from its `valid_to` date alone, measured in
//! whole calendar days from an explicitly supplied `now`.

use crate::error::ValidationError;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use time::Date;
use time::macros::format_description;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum StatusLabel {
    Ok,
    Warning,
    Critical,
    Expired,
    Unknown,
}

impl StatusLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusLabel::Ok => "ok",
            StatusLabel::Warning => "warning",
            StatusLabel::Critical => "critical",
            StatusLabel::Expired => "expired",
            StatusLabel::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for StatusLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Day-count boundaries for the `critical` and `warning` bands.
///
/// Both bounds are inclusive: with the defaults, 0..=7 days is critical and
/// 8..=30 days is warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct Thresholds {
    pub critical_days: i64,
    pub warning_days: i64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            critical_days: 7,
            warning_days: 30,
        }
    }
}

impl Thresholds {
    pub fn new(critical_days: i64, warning_days: i64) -> Result<Self, ValidationError> {
        let thresholds = Self {
            critical_days,
            warning_days,
        };
        thresholds.validate()?;
        Ok(thresholds)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.critical_days < 0 || self.critical_days > self.warning_days {
            return Err(ValidationError::InvalidThresholds {
                critical: self.critical_days,
                warning: self.warning_days,
            });
        }
        Ok(())
    }

    pub fn label_for(&self, days_left: i64) -> StatusLabel {
        if days_left < 0 {
            StatusLabel::Expired
        } else if days_left <= self.critical_days {
            StatusLabel::Critical
        } else if days_left <= self.warning_days {
            StatusLabel::Warning
        } else {
            StatusLabel::Ok
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub status: StatusLabel,
    pub days_left: Option<i64>,
}

impl Classification {
    pub const UNKNOWN: Classification = Classification {
        status: StatusLabel::Unknown,
        days_left: None,
    };
}

pub fn classify(valid_to: Option<Date>, now: Date, thresholds: &Thresholds) -> Classification {
    match valid_to {
        Some(valid_to) => {
            let days_left = (valid_to - now).whole_days();
            Classification {
                status: thresholds.label_for(days_left),
                days_left: Some(days_left),
            }
        }
        None => Classification::UNKNOWN,
    }
}

/// Parses an ISO calendar date. A trailing time part (`T...` or ` ...`) is
/// dropped so timestamps classify the same as their date.
pub fn parse_date(raw: &str) -> Option<Date> {
    let trimmed = raw.trim();
    let date_part = match trimmed.get(..10) {
        Some(head) if trimmed.len() == 10 => head,
        Some(head) if matches!(trimmed.as_bytes()[10], b'T' | b' ') => head,
        _ => return None,
    };
    Date::parse(date_part, format_description!("[year]-[month]-[day]")).ok()
}
