//! Duration strings in the `5s` / `1h30m` / `250ms` style.
//!
//! A value is one or more `<number><unit>` pairs. Numbers may carry a
//! fraction; units are `ns`, `us` (or `µs`), `ms`, `s`, `m` and `h`. A bare
//! integer is read as seconds.

use std::time::Duration;

use crate::error::{ServerError, ServerResult};

const NANOS_PER_SEC: u128 = 1_000_000_000;

/// Longest fraction kept; further digits cannot change a nanosecond count.
const MAX_FRACTION_DIGITS: usize = 18;

fn unit_nanos(unit: &str) -> Option<u128> {
    Some(match unit {
        "ns" => 1,
        "us" | "µs" | "μs" => 1_000,
        "ms" => 1_000_000,
        "s" => NANOS_PER_SEC,
        "m" => 60 * NANOS_PER_SEC,
        "h" => 3_600 * NANOS_PER_SEC,
        _ => return None,
    })
}

/// Parse a duration string.
///
/// # Errors
///
/// Returns [`ServerError::InvalidDuration`] for empty or negative input,
/// unknown units, or values that overflow.
pub fn parse_duration(input: &str) -> ServerResult<Duration> {
    let text = input.trim();
    if text.is_empty() {
        return Err(ServerError::duration(input, "empty duration"));
    }
    if let Ok(secs) = text.parse::<u64>() {
        return Ok(Duration::from_secs(secs));
    }
    if text.starts_with('-') {
        return Err(ServerError::duration(input, "negative durations are not allowed"));
    }
    let mut rest = text.strip_prefix('+').unwrap_or(text);

    let mut total: u128 = 0;
    while !rest.is_empty() {
        let number_len = rest
            .find(|c: char| !c.is_ascii_digit() && c != '.')
            .unwrap_or(rest.len());
        let (number, tail) = rest.split_at(number_len);
        let unit_len = tail
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(tail.len());
        let (unit, tail) = tail.split_at(unit_len);

        if unit.is_empty() {
            return Err(ServerError::duration(input, format!("missing unit after {number:?}")));
        }
        let scale = unit_nanos(unit)
            .ok_or_else(|| ServerError::duration(input, format!("unknown unit {unit:?}")))?;
        let nanos = component_nanos(number, scale)
            .ok_or_else(|| ServerError::duration(input, format!("invalid number {number:?}")))?;

        total = total
            .checked_add(nanos)
            .ok_or_else(|| ServerError::duration(input, "duration out of range"))?;
        rest = tail;
    }

    let secs = u64::try_from(total / NANOS_PER_SEC)
        .map_err(|_| ServerError::duration(input, "duration out of range"))?;
    Ok(Duration::new(secs, (total % NANOS_PER_SEC) as u32))
}

/// Nanoseconds for `number` units of `scale`, or `None` if the number is
/// malformed or too large.
fn component_nanos(number: &str, scale: u128) -> Option<u128> {
    let (whole, fraction) = number.split_once('.').unwrap_or((number, ""));
    if (whole.is_empty() && fraction.is_empty()) || fraction.contains('.') {
        return None;
    }

    let whole: u128 = if whole.is_empty() { 0 } else { whole.parse().ok()? };
    let mut nanos = whole.checked_mul(scale)?;

    let fraction = &fraction[..fraction.len().min(MAX_FRACTION_DIGITS)];
    if !fraction.is_empty() {
        let digits: u128 = fraction.parse().ok()?;
        let divisor = 10u128.pow(fraction.len() as u32);
        nanos = nanos.checked_add(digits * scale / divisor)?;
    }
    Some(nanos)
}

/// Parse a duration that must be greater than zero.
///
/// # Errors
///
/// Returns [`ServerError::InvalidDuration`] if parsing fails or the value
/// is zero.
pub fn parse_positive_duration(input: &str) -> ServerResult<Duration> {
    let duration = parse_duration(input)?;
    if duration.is_zero() {
        return Err(ServerError::duration(input, "must be greater than zero"));
    }
    Ok(duration)
}
