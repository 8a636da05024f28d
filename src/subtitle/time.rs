/// Format seconds as an SRT timestamp `HH:MM:SS,mmm`.
pub fn format_time(seconds: f64) -> String {
    let total_ms = (seconds.max(0.0) * 1000.0).round() as u64;
    let hours = total_ms / 3_600_000;
    let minutes = (total_ms % 3_600_000) / 60_000;
    let secs = (total_ms % 60_000) / 1000;
    let millis = total_ms % 1000;
    format!("{:02}:{:02}:{:02},{:03}", hours, minutes, secs, millis)
}

/// Parse an SRT/VTT timestamp into seconds.
///
/// Accepts both `HH:MM:SS,mmm` and `HH:MM:SS.mmm`; the milliseconds field
/// may be missing.
pub fn parse_time(value: &str) -> Option<f64> {
    let value = value.trim();
    let mut parts = value.split(':');
    let hours: u64 = parts.next()?.trim().parse().ok()?;
    let minutes: u64 = parts.next()?.trim().parse().ok()?;
    let sec_field = parts.next()?.trim();
    if parts.next().is_some() || minutes >= 60 {
        return None;
    }

    let (secs, millis) = match sec_field.split_once([',', '.']) {
        Some((s, ms)) => {
            let secs: u64 = s.parse().ok()?;
            // Normalize to milliseconds regardless of digits present.
            let digits: String = ms.chars().take_while(|c| c.is_ascii_digit()).collect();
            if digits.is_empty() || digits.len() != ms.len() {
                return None;
            }
            let padded = format!("{:0<3}", digits);
            (secs, padded[..3].parse::<u64>().ok()?)
        }
        None => (sec_field.parse().ok()?, 0),
    };
    if secs >= 60 {
        return None;
    }

    Some((hours * 3600 + minutes * 60 + secs) as f64 + millis as f64 / 1000.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_time() {
        assert_eq!(format_time(1.5), "00:00:01,500");
        assert_eq!(format_time(3661.123), "01:01:01,123");
        assert_eq!(format_time(0.0), "00:00:00,000");
    }

    #[test]
    fn test_parse_time_comma_and_period() {
        assert_eq!(parse_time("00:00:01,500"), Some(1.5));
        assert_eq!(parse_time("00:00:01.500"), Some(1.5));
        assert_eq!(parse_time("01:01:01,123"), Some(3661.123));
    }

    #[test]
    fn test_parse_time_invalid() {
        assert_eq!(parse_time("not a time"), None);
        assert_eq!(parse_time("00:99:00,000"), None);
        assert_eq!(parse_time("00:00:75,000"), None);
        assert_eq!(parse_time("00:00:01,5x0"), None);
    }

    #[test]
    fn test_round_trip() {
        for secs in [0.0, 0.001, 59.999, 60.0, 3599.5, 86399.999] {
            let formatted = format_time(secs);
            let parsed = parse_time(&formatted).unwrap();
            assert!((parsed - secs).abs() < 0.0005, "{} -> {}", secs, formatted);
        }
    }
}
