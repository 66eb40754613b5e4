use crate::{
    error::{LecternError, Result},
    types::LogEntry,
};

/// Format seconds the way the player clock shows them: `MM:SS`, or `H:MM:SS`
/// from one hour on.
pub fn format_clock(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds.floor() as u64
    } else {
        0
    };
    let hours = total / 3600;
    let mins = (total / 60) % 60;
    let secs = total % 60;
    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, mins, secs)
    } else {
        format!("{:02}:{:02}", mins, secs)
    }
}

pub const EMPTY_TIME_DISPLAY: &str = "0:00 / 0:00";

/// `None` while the media duration is still unknown.
pub fn time_display(current: f64, duration: f64) -> Option<String> {
    if !duration.is_finite() || duration <= 0.0 {
        return None;
    }
    Some(format!("{} / {}", format_clock(current), format_clock(duration)))
}

/// Parse a strict `H:MM:SS` / `HH:MM:SS` timestamp into seconds.
pub fn parse_hhmmss(input: &str) -> Option<f64> {
    let mut parts = input.trim().split(':');
    let (h, m, s) = (parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some() {
        return None;
    }
    let digits = |p: &str, min: usize, max: usize| {
        (min..=max).contains(&p.len()) && p.bytes().all(|b| b.is_ascii_digit())
    };
    if !digits(h, 1, 2) || !digits(m, 2, 2) || !digits(s, 2, 2) {
        return None;
    }
    let h: u32 = h.parse().ok()?;
    let m: u32 = m.parse().ok()?;
    let s: u32 = s.parse().ok()?;
    Some(f64::from(h * 3600 + m * 60 + s))
}

/// Parse a user-supplied position: plain seconds (`93.5`), `MM:SS` or `H:MM:SS`.
pub fn parse_position(input: &str) -> Result<f64> {
    let trimmed = input.trim();
    if let Ok(secs) = trimmed.parse::<f64>() {
        if secs.is_finite() && secs >= 0.0 {
            return Ok(secs);
        }
        return Err(LecternError::InvalidTimestamp(input.to_string()));
    }

    let fields: Vec<&str> = trimmed.split(':').collect();
    let numbers: Option<Vec<u32>> = fields.iter().map(|f| f.parse::<u32>().ok()).collect();
    match numbers.as_deref() {
        Some([m, s]) if *s < 60 => Ok(f64::from(m * 60 + s)),
        Some([h, m, s]) if *m < 60 && *s < 60 => Ok(f64::from(h * 3600 + m * 60 + s)),
        _ => Err(LecternError::InvalidTimestamp(input.to_string())),
    }
}

/// Header line for a backend log entry
pub fn format_log_header(entry: &LogEntry) -> String {
    format!("{} | {}", entry.time, entry.kind)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_switches_to_hours() {
        assert_eq!(format_clock(0.0), "00:00");
        assert_eq!(format_clock(75.9), "01:15");
        assert_eq!(format_clock(3599.0), "59:59");
        assert_eq!(format_clock(3661.0), "1:01:01");
        assert_eq!(format_clock(f64::NAN), "00:00");
    }

    #[test]
    fn display_waits_for_duration() {
        assert_eq!(time_display(3.0, 0.0), None);
        assert_eq!(time_display(3.0, 90.0).as_deref(), Some("00:03 / 01:30"));
    }

    #[test]
    fn hhmmss_is_strict() {
        assert_eq!(parse_hhmmss("00:00:10"), Some(10.0));
        assert_eq!(parse_hhmmss(" 1:02:03 "), Some(3723.0));
        assert_eq!(parse_hhmmss("01:2:03"), None);
        assert_eq!(parse_hhmmss("100:00:00"), None);
        assert_eq!(parse_hhmmss("00:10"), None);
        assert_eq!(parse_hhmmss(""), None);
        assert_eq!(parse_hhmmss("aa:bb:cc"), None);
    }

    #[test]
    fn positions_accept_seconds_and_clock() {
        assert_eq!(parse_position("93.5").unwrap(), 93.5);
        assert_eq!(parse_position("01:30").unwrap(), 90.0);
        assert_eq!(parse_position("1:00:05").unwrap(), 3605.0);
        assert!(parse_position("-4").is_err());
        assert!(parse_position("1:75").is_err());
        assert!(parse_position("soon").is_err());
    }
}
