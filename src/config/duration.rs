//! Human-readable durations in configuration ("500ms", "10s", "2m", "1h").

use std::time::Duration;

/// Parse a duration string. A bare number means seconds.
///
/// ```
/// use stackhub::config::parse_duration_string;
/// use std::time::Duration;
///
/// assert_eq!(parse_duration_string("10s"), Some(Duration::from_secs(10)));
/// assert_eq!(parse_duration_string("250ms"), Some(Duration::from_millis(250)));
/// assert_eq!(parse_duration_string("2m"), Some(Duration::from_secs(120)));
/// assert_eq!(parse_duration_string("45"), Some(Duration::from_secs(45)));
/// ```
pub fn parse_duration_string(s: &str) -> Option<Duration> {
    let s = s.trim();
    let split = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    let (digits, unit) = s.split_at(split);
    if digits.is_empty() {
        return None;
    }
    let n: u64 = digits.parse().ok()?;
    match unit {
        "ms" => Some(Duration::from_millis(n)),
        "" | "s" => Some(Duration::from_secs(n)),
        "m" => n.checked_mul(60).map(Duration::from_secs),
        "h" => n.checked_mul(3600).map(Duration::from_secs),
        _ => None,
    }
}

/// Render a duration the way it would be written in the config file.
pub fn format_duration(d: Duration) -> String {
    let ms = d.as_millis();
    if ms % 1000 != 0 {
        format!("{}ms", ms)
    } else if ms % 60_000 != 0 || ms == 0 {
        format!("{}s", ms / 1000)
    } else {
        format!("{}m", ms / 60_000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn units() {
        assert_eq!(parse_duration_string("1h"), Some(Duration::from_secs(3600)));
        assert_eq!(parse_duration_string(" 5s "), Some(Duration::from_secs(5)));
        assert_eq!(parse_duration_string("0ms"), Some(Duration::ZERO));
    }

    #[test]
    fn rejects_garbage() {
        for bad in ["", "s", "-5s", "5x", "1.5s", "ms10"] {
            assert_eq!(parse_duration_string(bad), None, "{}", bad);
        }
    }

    #[test]
    fn formats_round_trip_for_common_values() {
        for text in ["500ms", "10s", "2m", "0s"] {
            let d = parse_duration_string(text).unwrap();
            assert_eq!(format_duration(d), text);
        }
    }
}
