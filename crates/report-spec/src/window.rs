use chrono::{DateTime, FixedOffset, Offset, Timelike, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Outcome of a time-window check. Failing the check never aborts generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Validation {
    pub is_valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Earliest timestamp, epoch milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<i64>,
    /// Latest timestamp, epoch milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<i64>,
}

impl Validation {
    fn invalid(reason: impl Into<String>, start_time: Option<i64>, end_time: Option<i64>) -> Self {
        Self {
            is_valid: false,
            reason: Some(reason.into()),
            start_time,
            end_time,
        }
    }
}

pub trait TimeWindowValidator {
    /// `sorted_timestamps` are epoch milliseconds in ascending order.
    fn validate(&self, collection_id: &str, time_zone: &str, sorted_timestamps: &[i64])
    -> Validation;
}

/// Bounds applied by [`WindowValidator`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct WindowConfig {
    /// First local hour (inclusive) a collection may start in.
    pub earliest_hour: u32,
    /// Local hour (exclusive) by which a collection must have started.
    pub latest_hour: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_duration_minutes: Option<i64>,
    /// Timestamps at or below this value are treated as unset clocks.
    pub min_timestamp_ms: i64,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            earliest_hour: 0,
            latest_hour: 24,
            max_duration_minutes: None,
            min_timestamp_ms: 0,
        }
    }
}

/// Parses `Z`, `UTC` or a `+HH:MM` / `+HHMM` / `+HH` offset (either sign).
pub fn parse_offset(time_zone: &str) -> Option<FixedOffset> {
    let trimmed = time_zone.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("utc") || trimmed == "Z" {
        return Some(Utc.fix());
    }
    if let Ok(offset) = trimmed.parse::<FixedOffset>() {
        return Some(offset);
    }
    let (sign, hours) = match (trimmed.strip_prefix('+'), trimmed.strip_prefix('-')) {
        (Some(hours), _) => (1, hours),
        (_, Some(hours)) => (-1, hours),
        _ => return None,
    };
    if hours.len() != 2 || !hours.bytes().all(|byte| byte.is_ascii_digit()) {
        return None;
    }
    let hours: i32 = hours.parse().ok()?;
    if hours > 23 {
        return None;
    }
    FixedOffset::east_opt(sign * hours * 3600)
}

/// Resolves a time zone, falling back to UTC when it cannot be parsed.
pub fn resolve_offset(time_zone: &str) -> FixedOffset {
    parse_offset(time_zone).unwrap_or_else(|| {
        warn!(time_zone, "unrecognized time zone; using UTC");
        Utc.fix()
    })
}

pub fn local_time(timestamp_ms: i64, offset: FixedOffset) -> Option<DateTime<FixedOffset>> {
    DateTime::from_timestamp_millis(timestamp_ms).map(|utc| utc.with_timezone(&offset))
}

/// Default validator: bounds, start-hour window and maximum duration.
#[derive(Debug, Clone, Default)]
pub struct WindowValidator {
    config: WindowConfig,
}

impl WindowValidator {
    pub fn new(config: WindowConfig) -> Self {
        Self { config }
    }
}

impl TimeWindowValidator for WindowValidator {
    fn validate(
        &self,
        collection_id: &str,
        time_zone: &str,
        sorted_timestamps: &[i64],
    ) -> Validation {
        let (Some(&start), Some(&end)) = (sorted_timestamps.first(), sorted_timestamps.last())
        else {
            return Validation::invalid(
                format!("no timestamps recorded for {}", collection_id),
                None,
                None,
            );
        };
        let (start_time, end_time) = (Some(start), Some(end));

        if start <= self.config.min_timestamp_ms {
            return Validation::invalid(
                format!(
                    "timestamp {} precedes minimum {}",
                    start, self.config.min_timestamp_ms
                ),
                start_time,
                end_time,
            );
        }

        let offset = resolve_offset(time_zone);
        let Some(local_start) = local_time(start, offset) else {
            return Validation::invalid(
                format!("timestamp {} is out of range", start),
                start_time,
                end_time,
            );
        };
        let hour = local_start.hour();
        if hour < self.config.earliest_hour || hour >= self.config.latest_hour {
            return Validation::invalid(
                format!(
                    "started at {} outside {:02}:00-{:02}:00 ({})",
                    local_start.format("%H:%M"),
                    self.config.earliest_hour,
                    self.config.latest_hour,
                    offset
                ),
                start_time,
                end_time,
            );
        }

        if let Some(max_minutes) = self.config.max_duration_minutes {
            let Some(elapsed) = end.checked_sub(start) else {
                return Validation::invalid(
                    format!("duration between {} and {} overflows", start, end),
                    start_time,
                    end_time,
                );
            };
            let minutes = elapsed / 60_000;
            if minutes > max_minutes {
                return Validation::invalid(
                    format!(
                        "duration of {} minutes exceeds {} minutes",
                        minutes, max_minutes
                    ),
                    start_time,
                    end_time,
                );
            }
        }

        Validation {
            is_valid: true,
            reason: None,
            start_time,
            end_time,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // 2024-03-05T06:30:00Z
    const EARLY_MORNING_UTC: i64 = 1_709_620_200_000;

    fn school_hours() -> WindowValidator {
        WindowValidator::new(WindowConfig {
            earliest_hour: 7,
            latest_hour: 17,
            max_duration_minutes: Some(90),
            min_timestamp_ms: 0,
        })
    }

    #[test]
    fn parses_offsets() {
        assert_eq!(parse_offset("+03:00"), FixedOffset::east_opt(3 * 3600));
        assert_eq!(parse_offset("-0530"), FixedOffset::east_opt(-(5 * 3600 + 30 * 60)));
        assert_eq!(parse_offset("UTC"), FixedOffset::east_opt(0));
        assert_eq!(parse_offset("+05"), FixedOffset::east_opt(5 * 3600));
        assert_eq!(parse_offset("Africa/Nairobi"), None);
        assert_eq!(parse_offset("+aé1"), None);
        assert_eq!(parse_offset("-é"), None);
        assert_eq!(parse_offset("+99"), None);
    }

    #[test]
    fn unparseable_zones_validate_in_utc() {
        let stamps = [EARLY_MORNING_UTC];
        for zone in ["Africa/Nairobi", "+aé1", "é", "+3:0:0"] {
            let validation = school_hours().validate("a1", zone, &stamps);
            assert!(!validation.is_valid, "{} should fall back to UTC", zone);
            assert_eq!(
                validation.reason.as_deref(),
                Some("started at 06:30 outside 07:00-17:00 (+00:00)")
            );
        }
        let validation = WindowValidator::default().validate("a1", "+aé1", &stamps);
        assert!(validation.is_valid);
        assert_eq!(validation.start_time, Some(EARLY_MORNING_UTC));
    }

    #[test]
    fn overflowing_durations_are_flagged() {
        let validator = WindowValidator::new(WindowConfig {
            max_duration_minutes: Some(10),
            min_timestamp_ms: i64::MIN,
            ..WindowConfig::default()
        });
        let validation = validator.validate("a1", "+00:00", &[-1, i64::MAX]);
        assert!(!validation.is_valid);
        assert_eq!(validation.start_time, Some(-1));
        assert_eq!(validation.end_time, Some(i64::MAX));
    }

    #[test]
    fn empty_sequence_is_invalid() {
        let validation = school_hours().validate("a1", "+00:00", &[]);
        assert!(!validation.is_valid);
        assert_eq!(validation.start_time, None);
    }

    #[test]
    fn start_hour_uses_the_time_zone() {
        let stamps = [EARLY_MORNING_UTC, EARLY_MORNING_UTC + 60_000];
        let utc = school_hours().validate("a1", "+00:00", &stamps);
        assert!(!utc.is_valid);
        assert!(utc.reason.as_deref().unwrap_or_default().contains("06:30"));

        let nairobi = school_hours().validate("a1", "+03:00", &stamps);
        assert!(nairobi.is_valid);
        assert_eq!(nairobi.start_time, Some(EARLY_MORNING_UTC));
        assert_eq!(nairobi.end_time, Some(EARLY_MORNING_UTC + 60_000));
    }

    #[test]
    fn long_sessions_are_flagged() {
        let stamps = [EARLY_MORNING_UTC, EARLY_MORNING_UTC + 120 * 60_000];
        let validation = school_hours().validate("a1", "+03:00", &stamps);
        assert!(!validation.is_valid);
        assert_eq!(
            validation.reason.as_deref(),
            Some("duration of 120 minutes exceeds 90 minutes")
        );
    }

    #[test]
    fn unset_clocks_are_flagged() {
        let validation = WindowValidator::default().validate("a1", "+00:00", &[0, 5]);
        assert!(!validation.is_valid);
    }
}
