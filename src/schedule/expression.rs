//! EventBridge schedule expressions

use crate::error::ValidationError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

const EXPECTED: &str =
    "rate(<n> minute|minutes|hour|hours|day|days) or cron(<minutes> <hours> <day-of-month> <month> <day-of-week> <year>) with exactly one of day-of-month/day-of-week set to '?'";

static RATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^rate\((\d+) (minute|minutes|hour|hours|day|days)\)$").expect("rate regex compiles")
});
static CRON: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^cron\(([^()]*)\)$").expect("cron regex compiles"));
static CRON_FIELD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9A-Za-z*?,/#-]+$").expect("cron field regex compiles"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateUnit {
    Minute,
    Hour,
    Day,
}

impl RateUnit {
    fn parse(word: &str) -> Option<(Self, bool)> {
        match word {
            "minute" => Some((Self::Minute, false)),
            "minutes" => Some((Self::Minute, true)),
            "hour" => Some((Self::Hour, false)),
            "hours" => Some((Self::Hour, true)),
            "day" => Some((Self::Day, false)),
            "days" => Some((Self::Day, true)),
            _ => None,
        }
    }

    fn word(self, plural: bool) -> &'static str {
        match (self, plural) {
            (Self::Minute, false) => "minute",
            (Self::Minute, true) => "minutes",
            (Self::Hour, false) => "hour",
            (Self::Hour, true) => "hours",
            (Self::Day, false) => "day",
            (Self::Day, true) => "days",
        }
    }
}

/// A validated `rate(...)` or `cron(...)` expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduleExpression {
    Rate { value: u32, unit: RateUnit },
    Cron { fields: [String; 6] },
}

impl ScheduleExpression {
    /// Parse `text`, naming `field` in the error
    pub fn parse(field: &str, text: &str) -> Result<Self, ValidationError> {
        let text = text.trim();
        let invalid = || ValidationError::format(field, text, EXPECTED);

        if let Some(caps) = RATE.captures(text) {
            let value: u32 = caps[1].parse().map_err(|_| invalid())?;
            let (unit, plural) = RateUnit::parse(&caps[2]).ok_or_else(invalid)?;
            if value == 0 || plural != (value != 1) {
                return Err(invalid());
            }
            return Ok(Self::Rate { value, unit });
        }

        if let Some(caps) = CRON.captures(text) {
            let parts: Vec<&str> = caps[1].split_whitespace().collect();
            let fields: [String; 6] = parts
                .iter()
                .map(|p| p.to_string())
                .collect::<Vec<_>>()
                .try_into()
                .map_err(|_| invalid())?;
            if !fields.iter().all(|f| CRON_FIELD.is_match(f)) {
                return Err(invalid());
            }
            let day_of_month_any = fields[2] == "?";
            let day_of_week_any = fields[4] == "?";
            if day_of_month_any == day_of_week_any {
                return Err(invalid());
            }
            let misplaced_any = fields
                .iter()
                .enumerate()
                .any(|(i, f)| i != 2 && i != 4 && f.contains('?'));
            if misplaced_any {
                return Err(invalid());
            }
            return Ok(Self::Cron { fields });
        }

        Err(invalid())
    }

    pub fn is_rate(&self) -> bool {
        matches!(self, Self::Rate { .. })
    }
}

impl fmt::Display for ScheduleExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rate { value, unit } => write!(f, "rate({} {})", value, unit.word(*value != 1)),
            Self::Cron { fields } => write!(f, "cron({})", fields.join(" ")),
        }
    }
}

impl FromStr for ScheduleExpression {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse("schedule_expression", s)
    }
}

impl Serialize for ScheduleExpression {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ScheduleExpression {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}
