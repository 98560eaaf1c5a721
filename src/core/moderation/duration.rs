// Human durations like `1d12h` or `90`.

use regex::Regex;
use std::sync::OnceLock;
use thiserror::Error;

pub const SECOND: u64 = 1;
pub const MINUTE: u64 = 60;
pub const HOUR: u64 = 3600;
pub const DAY: u64 = 86_400;
pub const WEEK: u64 = 604_800;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DurationError {
    #[error("Invalid duration format: `{0}`")]
    InvalidFormat(String),

    #[error("Invalid unit `{unit}` in `{value}`")]
    UnknownUnit { unit: String, value: String },

    #[error("Duration can't be longer than {max} seconds")]
    ExceedsMax { seconds: u64, max: u64 },
}

fn duration_re() -> &'static Regex {
    static DURATION_RE: OnceLock<Regex> = OnceLock::new();
    DURATION_RE.get_or_init(|| Regex::new(r"(\d+)([a-zA-Z]+)").expect("valid duration pattern"))
}

/// Seconds per unit, or `None` for unknown units.
pub fn unit_seconds(unit: &str) -> Option<u64> {
    let seconds = match unit {
        "s" | "sec" | "secs" | "second" | "seconds" => SECOND,
        "m" | "min" | "mins" | "minute" | "minutes" => MINUTE,
        "h" | "hr" | "hrs" | "hour" | "hours" => HOUR,
        "d" | "day" | "days" => DAY,
        "w" | "week" | "weeks" => WEEK,
        "mo" => 2_629_800,
        "y" => 31_557_600,
        _ => return None,
    };
    Some(seconds)
}

/// Parse a duration into seconds.
///
/// Bare numbers use `default_unit`. Anything else is read as a sequence of
/// `<amount><unit>` pairs which are summed, so `1h30m` is 5400.
pub fn parse_duration(value: &str, default_unit: &str, max: Option<u64>) -> Result<u64, DurationError> {
    let value = value.trim().to_lowercase();

    let total = if !value.is_empty() && value.chars().all(|c| c.is_ascii_digit()) {
        let amount: u64 = value
            .parse()
            .map_err(|_| DurationError::InvalidFormat(value.clone()))?;
        let unit = unit_seconds(default_unit).ok_or_else(|| DurationError::UnknownUnit {
            unit: default_unit.to_string(),
            value: value.clone(),
        })?;
        amount.saturating_mul(unit)
    } else {
        let mut total: u64 = 0;
        let mut matched = false;
        for caps in duration_re().captures_iter(&value) {
            matched = true;
            let unit = &caps[2];
            let per_unit = unit_seconds(unit).ok_or_else(|| DurationError::UnknownUnit {
                unit: unit.to_string(),
                value: value.clone(),
            })?;
            let amount: u64 = caps[1]
                .parse()
                .map_err(|_| DurationError::InvalidFormat(value.clone()))?;
            total = total.saturating_add(amount.saturating_mul(per_unit));
        }
        if !matched {
            return Err(DurationError::InvalidFormat(value));
        }
        total
    };

    match max {
        Some(max) if total > max => Err(DurationError::ExceedsMax { seconds: total, max }),
        _ => Ok(total),
    }
}

/// Short human form, e.g. `1d 2h 5m`.
pub fn format_duration(seconds: u64) -> String {
    if seconds == 0 {
        return "0s".to_string();
    }

    let parts = [(DAY, "d"), (HOUR, "h"), (MINUTE, "m"), (SECOND, "s")];
    let mut remaining = seconds;
    let mut out = Vec::new();
    for (size, suffix) in parts {
        if remaining >= size {
            out.push(format!("{}{}", remaining / size, suffix));
            remaining %= size;
        }
    }
    out.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_numbers_use_the_default_unit() {
        assert_eq!(parse_duration("90", "s", None), Ok(90));
        assert_eq!(parse_duration(" 2 ", "d", None), Ok(2 * DAY));
    }

    #[test]
    fn unit_pairs_are_summed() {
        assert_eq!(parse_duration("1h30m", "s", None), Ok(5400));
        assert_eq!(parse_duration("1D 12H", "s", None), Ok(DAY + 12 * HOUR));
        assert_eq!(parse_duration("2weeks", "s", None), Ok(2 * WEEK));
        assert_eq!(parse_duration("1mo", "s", None), Ok(2_629_800));
    }

    #[test]
    fn rejects_garbage_and_unknown_units() {
        assert!(matches!(
            parse_duration("spam", "s", None),
            Err(DurationError::InvalidFormat(_))
        ));
        assert!(matches!(
            parse_duration("", "s", None),
            Err(DurationError::InvalidFormat(_))
        ));
        assert_eq!(
            parse_duration("5x", "s", None),
            Err(DurationError::UnknownUnit {
                unit: "x".into(),
                value: "5x".into()
            })
        );
    }

    #[test]
    fn enforces_the_maximum() {
        assert_eq!(parse_duration("7d", "s", Some(WEEK)), Ok(WEEK));
        assert_eq!(
            parse_duration("8d", "s", Some(WEEK)),
            Err(DurationError::ExceedsMax {
                seconds: 8 * DAY,
                max: WEEK
            })
        );
    }

    #[test]
    fn formats_compactly() {
        assert_eq!(format_duration(0), "0s");
        assert_eq!(format_duration(90), "1m 30s");
        assert_eq!(format_duration(DAY + 2 * HOUR), "1d 2h");
    }
}
