//! Go `time.Duration` strings (`500ms`, `10s`, `1m30s`), as used in
//! Kubernetes resources and in our environment settings.

use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DurationError {
    #[error("empty duration")]
    Empty,

    #[error("negative durations are not allowed: {0:?}")]
    Negative(String),

    #[error("missing unit in {0:?}; expected one of ns, us, ms, s, m, h")]
    NoUnit(String),

    #[error("invalid unit {0:?}; expected one of ns, us, ms, s, m, h")]
    InvalidUnit(String),

    #[error("invalid number {0:?}")]
    NotANumber(String),

    #[error("duration {0:?} is out of range")]
    OutOfRange(String),
}

fn unit_base(unit: &str) -> Option<Duration> {
    Some(match unit {
        "ns" => Duration::from_nanos(1),
        "us" | "\u{00b5}s" | "\u{03bc}s" => Duration::from_micros(1),
        "ms" => Duration::from_millis(1),
        "s" => Duration::from_secs(1),
        "m" => Duration::from_secs(60),
        "h" => Duration::from_secs(3600),
        _ => return None,
    })
}

/// Parse a non-negative Go duration. A bare `0` is accepted.
pub fn parse_duration(input: &str) -> Result<Duration, DurationError> {
    let s = input.trim();
    if s.is_empty() {
        return Err(DurationError::Empty);
    }
    if s.starts_with('-') {
        return Err(DurationError::Negative(input.to_string()));
    }
    let mut rest = s.trim_start_matches('+');
    if rest == "0" {
        return Ok(Duration::ZERO);
    }

    let mut total = Duration::ZERO;
    while !rest.is_empty() {
        let unit_start = rest
            .find(|c: char| c.is_alphabetic() || c == '\u{00b5}')
            .ok_or_else(|| DurationError::NoUnit(input.to_string()))?;
        let (number, tail) = rest.split_at(unit_start);
        let unit_end = tail
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(tail.len());
        let (unit, tail) = tail.split_at(unit_end);

        let value: f64 = number
            .parse()
            .map_err(|_| DurationError::NotANumber(number.to_string()))?;
        let base = unit_base(unit).ok_or_else(|| DurationError::InvalidUnit(unit.to_string()))?;
        let part = Duration::try_from_secs_f64(base.as_secs_f64() * value)
            .map_err(|_| DurationError::OutOfRange(input.to_string()))?;
        total = total
            .checked_add(part)
            .ok_or_else(|| DurationError::OutOfRange(input.to_string()))?;
        rest = tail;
    }

    Ok(total)
}

/// Format a duration the way Go prints whole units (`1m30s`, `250ms`).
pub fn format_duration(d: Duration) -> String {
    if d.is_zero() {
        return "0s".to_string();
    }
    if d < Duration::from_secs(1) {
        let ms = d.as_millis();
        if Duration::from_millis(ms as u64) == d {
            return format!("{ms}ms");
        }
        return format!("{}us", d.as_micros());
    }

    let secs = d.as_secs();
    let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    let millis = d.subsec_millis();
    let mut out = String::new();
    if h > 0 {
        out.push_str(&format!("{h}h"));
    }
    if m > 0 {
        out.push_str(&format!("{m}m"));
    }
    if s > 0 || millis > 0 {
        if millis > 0 {
            out.push_str(&format!("{s}.{millis:03}s"));
        } else {
            out.push_str(&format!("{s}s"));
        }
    }
    out
}
