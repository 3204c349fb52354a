use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

/// Values above this are taken to be seconds rather than minutes
const SECONDS_THRESHOLD: f64 = 1000.0;

/// Seconds past the minute boundary above which the minute is rounded up
const ROUND_UP_AFTER_SECONDS: u32 = 30;

static INTEGER_TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").expect("valid regex"));

/// Normalizes a duration of unknown shape into whole minutes.
///
/// Accepts numbers (seconds when above 1000, minutes otherwise), `H:MM:SS`,
/// `MM:SS`, bare numeric strings and free text with an embedded integer.
/// Anything unparseable yields `None`.
pub fn parse_duration_minutes(raw: &Value) -> Option<u32> {
    let minutes = match raw {
        Value::Null => None,
        Value::Number(n) => n.as_f64().and_then(minutes_from_number),
        Value::String(s) => parse_duration_str(s),
        _ => None,
    };

    if minutes.is_none() && !raw.is_null() {
        tracing::debug!(duration = %raw, "Unrecognized duration format");
    }

    minutes
}

/// String form of [`parse_duration_minutes`]
pub fn parse_duration_str(raw: &str) -> Option<u32> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    let parts: Vec<&str> = trimmed.split(':').collect();
    match parts.as_slice() {
        [hours, minutes, seconds] => {
            let hours: u32 = hours.trim().parse().ok()?;
            let minutes: u32 = minutes.trim().parse().ok()?;
            let seconds: u32 = seconds.trim().parse().ok()?;
            hours
                .checked_mul(60)?
                .checked_add(minutes)?
                .checked_add(round_up(seconds))
        }
        [minutes, seconds] => {
            let minutes: u32 = minutes.trim().parse().ok()?;
            let seconds: u32 = seconds.trim().parse().ok()?;
            minutes.checked_add(round_up(seconds))
        }
        [single] => match single.parse::<f64>() {
            Ok(number) => minutes_from_number(number),
            Err(_) => INTEGER_TOKEN
                .find(single)
                .and_then(|m| m.as_str().parse::<f64>().ok())
                .and_then(minutes_from_number),
        },
        _ => None,
    }
}

fn round_up(seconds: u32) -> u32 {
    u32::from(seconds > ROUND_UP_AFTER_SECONDS)
}

fn minutes_from_number(value: f64) -> Option<u32> {
    if !value.is_finite() || value < 0.0 {
        return None;
    }

    let minutes = if value > SECONDS_THRESHOLD {
        (value / 60.0).trunc()
    } else {
        value.trunc()
    };

    if minutes > f64::from(u32::MAX) {
        return None;
    }

    Some(minutes as u32)
}
