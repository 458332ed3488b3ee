//! Resource bound values: time budgets and byte sizes.
//!
//! Both kinds are parsed from human-readable strings (`"90s"`, `"1.5m"`,
//! `"64KB"`) and combined by taking the more restrictive of a global ("hard")
//! and a per-operation ("soft") bound.

use std::fmt;
use std::time::Duration;

use tracing::warn;

use crate::error::ExtractError;

/// An optional time budget in seconds. `TimeValue::UNBOUNDED` means no limit.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TimeValue {
    raw: Option<f64>,
}

impl TimeValue {
    pub const UNBOUNDED: TimeValue = TimeValue { raw: None };

    #[must_use]
    pub fn from_secs(secs: f64) -> Self {
        Self { raw: Some(secs) }
    }

    /// Parse a duration string. A trailing `h`/`m`/`s` (case-insensitive)
    /// scales the leading float by 3600/60/1; no suffix means seconds.
    /// Empty, unparsable, or out-of-range input (non-finite, or too large to
    /// be a `Duration`) yields no bound; it is logged, not an error.
    #[must_use]
    pub fn parse(tag: &str, input: &str) -> Self {
        let input = input.trim();
        if input.is_empty() {
            return Self::UNBOUNDED;
        }
        let (number_part, scale) = match input.chars().last() {
            Some('h' | 'H') => (&input[..input.len() - 1], 3600.0),
            Some('m' | 'M') => (&input[..input.len() - 1], 60.0),
            Some('s' | 'S') => (&input[..input.len() - 1], 1.0),
            _ => (input, 1.0),
        };
        match number_part.trim().parse::<f64>() {
            Ok(number) if number >= 0.0 && Duration::try_from_secs_f64(number * scale).is_ok() => {
                Self::from_secs(number * scale)
            }
            _ => {
                warn!(tag, value = input, "ignoring invalid time value");
                Self::UNBOUNDED
            }
        }
    }

    #[must_use]
    pub fn raw(&self) -> Option<f64> {
        self.raw
    }

    #[must_use]
    pub fn is_unbounded(&self) -> bool {
        self.raw.is_none()
    }

    /// The bound as a `Duration`. Values a `Duration` cannot represent
    /// (non-finite or too large) count as unbounded.
    #[must_use]
    pub fn as_duration(&self) -> Option<Duration> {
        self.raw
            .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
    }

    /// The more restrictive of two bounds; an absent bound never wins.
    #[must_use]
    pub fn min(self, other: TimeValue) -> TimeValue {
        match (self.raw, other.raw) {
            (Some(a), Some(b)) => TimeValue::from_secs(a.min(b)),
            (Some(_), None) => self,
            (None, _) => other,
        }
    }
}

impl fmt::Display for TimeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.raw {
            None => write!(f, "unlimited"),
            Some(raw) if raw < 1.0 => write!(f, "{:.2}ms", raw * 1000.0),
            Some(raw) if raw < 60.0 => write!(f, "{raw:.2}s"),
            Some(raw) if raw < 3600.0 => write!(f, "{:.2}m", raw / 60.0),
            Some(raw) => write!(f, "{:.2}h", raw / 3600.0),
        }
    }
}

/// Parse a size string into a byte count.
///
/// `KB`/`MB`/`GB`/`TB` and the `KiB`/`MiB`/`GiB` spellings all scale by
/// powers of 1024; a bare `B` (or no suffix) is a raw byte count. Single
/// letter suffixes (`K`, `M`, ...) are accepted too.
pub fn parse_size(input: &str) -> Result<u64, ExtractError> {
    let trimmed = input.trim();
    let lower = trimmed.to_ascii_lowercase();
    const UNITS: &[(&str, u64)] = &[
        ("tib", 1 << 40),
        ("gib", 1 << 30),
        ("mib", 1 << 20),
        ("kib", 1 << 10),
        ("tb", 1 << 40),
        ("gb", 1 << 30),
        ("mb", 1 << 20),
        ("kb", 1 << 10),
        ("t", 1 << 40),
        ("g", 1 << 30),
        ("m", 1 << 20),
        ("k", 1 << 10),
        ("b", 1),
    ];
    let (number_part, scale) = UNITS
        .iter()
        .find_map(|(suffix, scale)| {
            lower
                .strip_suffix(suffix)
                .map(|_| (&trimmed[..trimmed.len() - suffix.len()], *scale))
        })
        .unwrap_or((trimmed, 1));
    let number: f64 = number_part
        .trim()
        .parse()
        .map_err(|_| ExtractError::InvalidSize(input.to_string()))?;
    if number < 0.0 {
        return Err(ExtractError::InvalidSize(input.to_string()));
    }
    Ok((number * scale as f64).round() as u64)
}

/// The more restrictive of two optional byte bounds.
#[must_use]
pub fn min_size(a: Option<u64>, b: Option<u64>) -> Option<u64> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (Some(a), None) => Some(a),
        (None, b) => b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_seconds() {
        assert_eq!(TimeValue::parse("timeout", "90s").raw(), Some(90.0));
    }

    #[test]
    fn test_parse_unitless_is_seconds() {
        assert_eq!(TimeValue::parse("timeout", "12.5").raw(), Some(12.5));
    }

    #[test]
    fn test_parse_minutes() {
        assert_eq!(TimeValue::parse("timeout", "1.5m").raw(), Some(90.0));
    }

    #[test]
    fn test_parse_hours_case_insensitive() {
        assert_eq!(TimeValue::parse("timeout", "2H").raw(), Some(7200.0));
    }

    #[test]
    fn test_parse_empty_is_unbounded() {
        assert!(TimeValue::parse("timeout", "").is_unbounded());
    }

    #[test]
    fn test_parse_garbage_is_unbounded() {
        assert!(TimeValue::parse("timeout", "soon").is_unbounded());
        assert!(TimeValue::parse("timeout", "-5s").is_unbounded());
    }

    #[test]
    fn test_parse_non_finite_is_unbounded() {
        assert!(TimeValue::parse("timeout", "inf").is_unbounded());
        assert!(TimeValue::parse("timeout", "NaN").is_unbounded());
    }

    #[test]
    fn test_parse_overflowing_is_unbounded() {
        // 1e300 is a valid float but overflows a Duration.
        assert!(TimeValue::parse("timeout", "1e300").is_unbounded());
        assert!(TimeValue::parse("timeout", "1e300h").is_unbounded());
    }

    #[test]
    fn test_as_duration_rejects_unrepresentable() {
        assert_eq!(TimeValue::from_secs(f64::INFINITY).as_duration(), None);
        assert_eq!(TimeValue::from_secs(1e300).as_duration(), None);
        assert_eq!(
            TimeValue::from_secs(2.0).as_duration(),
            Some(Duration::from_secs(2))
        );
    }

    #[test]
    fn test_parse_idempotent_through_display() {
        let value = TimeValue::parse("timeout", "90s");
        assert_eq!(value.to_string(), "90.00s");
        let reparsed = TimeValue::parse("timeout", &value.to_string());
        assert_eq!(reparsed.raw(), value.raw());
    }

    #[test]
    fn test_display_scales() {
        assert_eq!(TimeValue::from_secs(0.5).to_string(), "500.00ms");
        assert_eq!(TimeValue::from_secs(90.0).to_string(), "1.50m");
        assert_eq!(TimeValue::from_secs(5400.0).to_string(), "1.50h");
        assert_eq!(TimeValue::UNBOUNDED.to_string(), "unlimited");
    }

    #[test]
    fn test_min_both_set() {
        let hard = TimeValue::from_secs(60.0);
        let soft = TimeValue::from_secs(10.0);
        assert_eq!(hard.min(soft).raw(), Some(10.0));
        assert_eq!(soft.min(hard).raw(), Some(10.0));
    }

    #[test]
    fn test_min_one_set() {
        let bound = TimeValue::from_secs(60.0);
        assert_eq!(TimeValue::UNBOUNDED.min(bound).raw(), Some(60.0));
        assert_eq!(bound.min(TimeValue::UNBOUNDED).raw(), Some(60.0));
    }

    #[test]
    fn test_min_neither_set() {
        assert!(TimeValue::UNBOUNDED.min(TimeValue::UNBOUNDED).is_unbounded());
    }

    #[test]
    fn test_parse_size_binary_kb() {
        assert_eq!(parse_size("1.5KB").unwrap(), 1536);
        assert_eq!(parse_size("1.5KiB").unwrap(), 1536);
        assert_eq!(parse_size("1.5k").unwrap(), 1536);
    }

    #[test]
    fn test_parse_size_larger_units() {
        assert_eq!(parse_size("1MB").unwrap(), 1 << 20);
        assert_eq!(parse_size("2GiB").unwrap(), 2 << 30);
        assert_eq!(parse_size("1TB").unwrap(), 1 << 40);
    }

    #[test]
    fn test_parse_size_bytes() {
        assert_eq!(parse_size("123").unwrap(), 123);
        assert_eq!(parse_size("123B").unwrap(), 123);
    }

    #[test]
    fn test_parse_size_invalid() {
        assert!(parse_size("large").is_err());
        assert!(parse_size("").is_err());
        assert!(parse_size("-1KB").is_err());
    }

    #[test]
    fn test_min_size() {
        assert_eq!(min_size(Some(10), Some(20)), Some(10));
        assert_eq!(min_size(None, Some(20)), Some(20));
        assert_eq!(min_size(Some(10), None), Some(10));
        assert_eq!(min_size(None, None), None);
    }
}
