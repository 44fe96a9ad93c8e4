//! Bar frequency and history-window labels.
//!
//! `BarFrequency` drives annualization: periods per year are derived from the bar
//! duration over a 365-day year. Labels follow the two conventions users type:
//! Yahoo-style (`60m`, `1d`, `1wk`, `1mo`) and pandas-style (`H`, `D`, `W`, `T`).

use std::fmt;
use std::str::FromStr;

use chrono::Duration;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const SECONDS_PER_YEAR: f64 = 365.0 * 86_400.0;
const SECONDS_PER_MONTH: i64 = 365 * 86_400 / 12;
/// Largest span `chrono::Duration` can hold, in whole seconds.
const MAX_SPAN_SECONDS: i64 = i64::MAX / 1_000;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrequencyError {
    #[error("unknown frequency label '{0}'")]
    Unknown(String),

    #[error("unknown period label '{0}'")]
    UnknownPeriod(String),

    #[error("frequency must be positive, got '{0}'")]
    NonPositive(String),
}

/// Duration of one bar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BarFrequency {
    label: String,
    seconds: i64,
}

impl BarFrequency {
    pub fn hourly() -> Self {
        Self {
            label: "H".into(),
            seconds: 3_600,
        }
    }

    pub fn daily() -> Self {
        Self {
            label: "D".into(),
            seconds: 86_400,
        }
    }

    pub fn minutes(count: u32) -> Self {
        Self {
            label: format!("{count}m"),
            seconds: i64::from(count) * 60,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn duration(&self) -> Duration {
        Duration::seconds(self.seconds)
    }

    /// Number of bars in a 365-day year.
    pub fn periods_per_year(&self) -> f64 {
        SECONDS_PER_YEAR / self.seconds as f64
    }
}

impl Default for BarFrequency {
    fn default() -> Self {
        Self::hourly()
    }
}

impl fmt::Display for BarFrequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}

impl FromStr for BarFrequency {
    type Err = FrequencyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let label = s.trim();
        let seconds = match label {
            "T" | "min" => 60,
            "H" | "h" => 3_600,
            "D" | "d" => 86_400,
            "W" | "w" | "wk" => 7 * 86_400,
            "M" | "mo" => SECONDS_PER_MONTH,
            _ => {
                let (count, unit) = split_count(label)
                    .ok_or_else(|| FrequencyError::Unknown(label.to_string()))?;
                let unit_seconds = match unit {
                    "m" | "min" | "T" => 60,
                    "h" | "H" => 3_600,
                    "d" | "D" => 86_400,
                    "w" | "wk" | "W" => 7 * 86_400,
                    "mo" | "M" => SECONDS_PER_MONTH,
                    _ => return Err(FrequencyError::Unknown(label.to_string())),
                };
                if count == 0 {
                    return Err(FrequencyError::NonPositive(label.to_string()));
                }
                span_seconds(count, unit_seconds)
                    .ok_or_else(|| FrequencyError::Unknown(label.to_string()))?
            }
        };
        Ok(Self {
            label: label.to_string(),
            seconds,
        })
    }
}

impl TryFrom<String> for BarFrequency {
    type Error = FrequencyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<BarFrequency> for String {
    fn from(value: BarFrequency) -> Self {
        value.label
    }
}

/// How much history to keep, measured back from the last bar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Period {
    label: String,
    /// `None` means unbounded (`max`).
    span: Option<i64>,
}

impl Period {
    pub fn days(count: u32) -> Self {
        Self {
            label: format!("{count}d"),
            span: Some(i64::from(count) * 86_400),
        }
    }

    pub fn max() -> Self {
        Self {
            label: "max".into(),
            span: None,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn duration(&self) -> Option<Duration> {
        self.span.map(Duration::seconds)
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}

impl FromStr for Period {
    type Err = FrequencyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let label = s.trim();
        if label.eq_ignore_ascii_case("max") {
            return Ok(Self {
                label: label.to_string(),
                span: None,
            });
        }
        let (count, unit) =
            split_count(label).ok_or_else(|| FrequencyError::UnknownPeriod(label.to_string()))?;
        let unit_seconds = match unit {
            "d" => 86_400,
            "w" | "wk" => 7 * 86_400,
            "mo" => SECONDS_PER_MONTH,
            "y" => 365 * 86_400,
            _ => return Err(FrequencyError::UnknownPeriod(label.to_string())),
        };
        if count == 0 {
            return Err(FrequencyError::NonPositive(label.to_string()));
        }
        let span = span_seconds(count, unit_seconds)
            .ok_or_else(|| FrequencyError::UnknownPeriod(label.to_string()))?;
        Ok(Self {
            label: label.to_string(),
            span: Some(span),
        })
    }
}

impl TryFrom<String> for Period {
    type Error = FrequencyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Period> for String {
    fn from(value: Period) -> Self {
        value.label
    }
}

fn span_seconds(count: i64, unit_seconds: i64) -> Option<i64> {
    count
        .checked_mul(unit_seconds)
        .filter(|&secs| secs <= MAX_SPAN_SECONDS)
}

/// Split `"60m"` into `(60, "m")`.
fn split_count(label: &str) -> Option<(i64, &str)> {
    let digits = label.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits == 0 || digits == label.len() {
        return None;
    }
    let count = label[..digits].parse().ok()?;
    Some((count, &label[digits..]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hourly_aliases_agree() {
        for label in ["H", "1h", "60m"] {
            let f: BarFrequency = label.parse().unwrap();
            assert_eq!(f.duration(), Duration::hours(1), "label {label}");
            assert!((f.periods_per_year() - 8_760.0).abs() < 1e-9);
        }
    }

    #[test]
    fn daily_is_365_per_year() {
        let f: BarFrequency = "1d".parse().unwrap();
        assert!((f.periods_per_year() - 365.0).abs() < 1e-9);
    }

    #[test]
    fn minute_labels() {
        let f: BarFrequency = "5m".parse().unwrap();
        assert_eq!(f.duration(), Duration::minutes(5));
        let t: BarFrequency = "15T".parse().unwrap();
        assert_eq!(t.duration(), Duration::minutes(15));
    }

    #[test]
    fn rejects_unknown_and_zero() {
        assert!(matches!(
            "fortnight".parse::<BarFrequency>(),
            Err(FrequencyError::Unknown(_))
        ));
        assert!(matches!(
            "0m".parse::<BarFrequency>(),
            Err(FrequencyError::NonPositive(_))
        ));
    }

    #[test]
    fn frequency_serializes_as_label() {
        let f: BarFrequency = "60m".parse().unwrap();
        assert_eq!(serde_json::to_string(&f).unwrap(), "\"60m\"");
        let back: BarFrequency = serde_json::from_str("\"60m\"").unwrap();
        assert_eq!(back, f);
    }

    #[test]
    fn period_labels() {
        let p: Period = "730d".parse().unwrap();
        assert_eq!(p.duration(), Some(Duration::days(730)));
        let y: Period = "2y".parse().unwrap();
        assert_eq!(y.duration(), Some(Duration::days(730)));
        let max: Period = "max".parse().unwrap();
        assert_eq!(max.duration(), None);
        assert!("10q".parse::<Period>().is_err());
    }

    #[test]
    fn oversized_labels_are_errors() {
        assert!(matches!(
            "200000000000000d".parse::<Period>(),
            Err(FrequencyError::UnknownPeriod(_))
        ));
        assert!(matches!(
            "1000000000000000000m".parse::<BarFrequency>(),
            Err(FrequencyError::Unknown(_))
        ));
        assert!(matches!(
            "99999999999999999999d".parse::<Period>(),
            Err(FrequencyError::UnknownPeriod(_))
        ));
        let wide: Period = "300000y".parse().unwrap();
        assert_eq!(wide.duration(), Some(Duration::days(300_000 * 365)));
    }
}
