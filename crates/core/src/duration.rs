//! Duration strings used by configuration and CLI flags
//!
//! Accepts a sequence of `<number><unit>` groups such as `"300ms"`, `"1.5h"`
//! or `"1h30m"`. Units: `ns`, `us` (or `µs`), `ms`, `s`, `m`, `h`.
//! A bare `"0"` is accepted as zero. Signs are not accepted.

use std::time::Duration;

/// Parses a duration string.
///
/// Returns a human-readable reason on failure; callers wrap it into their
/// own error type with the offending field name.
pub fn parse_duration(input: &str) -> Result<Duration, String> {
    let s = input.trim();
    if s.is_empty() {
        return Err("empty duration".to_owned());
    }
    if s == "0" {
        return Ok(Duration::ZERO);
    }

    let mut total_nanos: f64 = 0.0;
    let mut rest = s;

    while !rest.is_empty() {
        let num_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        if num_len == 0 {
            return Err(format!("invalid duration '{input}': expected a number"));
        }
        let (number, tail) = rest.split_at(num_len);
        let value: f64 = number
            .parse()
            .map_err(|_| format!("invalid duration '{input}': bad number '{number}'"))?;

        let unit_len = tail
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(tail.len());
        let (unit, next) = tail.split_at(unit_len);
        let scale = unit_nanos(unit)
            .ok_or_else(|| format!("invalid duration '{input}': unknown unit '{unit}'"))?;

        total_nanos += value * scale;
        rest = next;
    }

    if !total_nanos.is_finite() || total_nanos > u64::MAX as f64 {
        return Err(format!("invalid duration '{input}': out of range"));
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    Ok(Duration::from_nanos(total_nanos.round() as u64))
}

fn unit_nanos(unit: &str) -> Option<f64> {
    match unit {
        "ns" => Some(1.0),
        "us" | "µs" => Some(1_000.0),
        "ms" => Some(1_000_000.0),
        "s" => Some(1_000_000_000.0),
        "m" => Some(60.0 * 1_000_000_000.0),
        "h" => Some(3_600.0 * 1_000_000_000.0),
        _ => None,
    }
}
