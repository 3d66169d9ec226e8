//! Human-readable duration formatting
//!
//! Used when reporting recording durations in CLI output and log lines.

/// Format selection thresholds (seconds)
const SHORT_FORMAT_MAX: f64 = 100.0; // < 100s → X.XXs
const MEDIUM_FORMAT_MAX: f64 = 6000.0; // < 100m → M:SS.Xs
const LONG_FORMAT_MAX: f64 = 90000.0; // < 25h → H:MM:SS
                                      // >= 25h → Dd-H:MM:SS

/// Format a duration in seconds, choosing the format by magnitude
///
/// # Examples
///
/// ```
/// use prec_common::human_time::format_duration;
///
/// assert_eq!(format_duration(45.0), "45.00s");
/// assert_eq!(format_duration(330.0), "5:30.0s");
/// assert_eq!(format_duration(7261.0), "2:01:01");
/// assert_eq!(format_duration(90000.0), "1d-1:00:00");
/// ```
pub fn format_duration(seconds: f64) -> String {
    if !seconds.is_finite() {
        return "--".to_string();
    }

    let sign = if seconds < 0.0 { "-" } else { "" };
    let abs = seconds.abs();

    let body = if abs < SHORT_FORMAT_MAX {
        format!("{:.2}s", abs)
    } else if abs < MEDIUM_FORMAT_MAX {
        let minutes = (abs / 60.0).floor();
        let secs = abs - minutes * 60.0;
        format!("{}:{:04.1}s", minutes as u64, secs)
    } else {
        let total = abs.round() as u64;
        let hours = total / 3600;
        let mins = (total % 3600) / 60;
        let secs = total % 60;
        if abs < LONG_FORMAT_MAX {
            format!("{}:{:02}:{:02}", hours, mins, secs)
        } else {
            format!("{}d-{}:{:02}:{:02}", hours / 24, hours % 24, mins, secs)
        }
    };

    format!("{}{}", sign, body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_format() {
        assert_eq!(format_duration(0.0), "0.00s");
        assert_eq!(format_duration(60.0), "60.00s");
        assert_eq!(format_duration(99.994), "99.99s");
    }

    #[test]
    fn test_medium_format() {
        assert_eq!(format_duration(120.0), "2:00.0s");
        assert_eq!(format_duration(125.5), "2:05.5s");
    }

    #[test]
    fn test_long_and_extended_format() {
        assert_eq!(format_duration(7200.0), "2:00:00");
        assert_eq!(format_duration(604800.0), "7d-0:00:00");
    }

    #[test]
    fn test_negative_and_non_finite() {
        assert_eq!(format_duration(-5.0), "-5.00s");
        assert_eq!(format_duration(f64::NAN), "--");
    }
}
