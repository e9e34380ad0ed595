use crate::error::{Error, Result};

/// Parse `HH:MM:SS.mmm`, `MM:SS` or bare seconds into an offset in seconds.
///
/// Missing high-order fields count as zero. Hours and minutes must be whole
/// numbers; the seconds field may carry a fraction.
pub fn parse(text: &str) -> Result<f64> {
    let trimmed = text.trim();
    let parts: Vec<&str> = trimmed.split(':').collect();
    if parts.len() > 3 {
        return Err(Error::malformed_timestamp(text, "more than three fields"));
    }

    let (hours, minutes, seconds) = match parts.as_slice() {
        [h, m, s] => (whole_field(text, h)?, whole_field(text, m)?, seconds_field(text, s)?),
        [m, s] => (0, whole_field(text, m)?, seconds_field(text, s)?),
        [s] => (0, 0, seconds_field(text, s)?),
        _ => return Err(Error::malformed_timestamp(text, "empty timestamp")),
    };

    let total = hours as f64 * 3600.0 + minutes as f64 * 60.0 + seconds;
    if !total.is_finite() {
        return Err(Error::malformed_timestamp(text, "offset is not finite"));
    }
    Ok(total)
}

/// Format an offset as `HH:MM:SS.mmm`, rounded to the millisecond.
pub fn format(offset: f64) -> String {
    let total_ms = to_millis(offset);
    let h = total_ms / 3_600_000;
    let m = (total_ms % 3_600_000) / 60_000;
    let s = (total_ms % 60_000) / 1000;
    let ms = total_ms % 1000;
    format!("{h:02}:{m:02}:{s:02}.{ms:03}")
}

/// Round an offset to whole milliseconds. Negative or non-finite input maps to zero.
pub fn to_millis(offset: f64) -> u64 {
    if offset.is_finite() && offset > 0.0 {
        (offset * 1000.0).round() as u64
    } else {
        0
    }
}

fn whole_field(input: &str, field: &str) -> Result<u64> {
    if field.is_empty() || !field.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::malformed_timestamp(
            input,
            format!("field {field:?} is not a whole number"),
        ));
    }
    field
        .parse()
        .map_err(|_| Error::malformed_timestamp(input, format!("field {field:?} out of range")))
}

fn seconds_field(input: &str, field: &str) -> Result<f64> {
    // f64::from_str also accepts "inf", "NaN" and signs; only plain decimals are timestamps.
    let digits_only = field.bytes().all(|b| b.is_ascii_digit() || b == b'.');
    let dots = field.bytes().filter(|&b| b == b'.').count();
    if field.is_empty() || !digits_only || dots > 1 || field == "." {
        return Err(Error::malformed_timestamp(
            input,
            format!("seconds field {field:?} is not numeric"),
        ));
    }
    field
        .parse()
        .map_err(|_| Error::malformed_timestamp(input, format!("seconds field {field:?} is not numeric")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_all_three_shapes() {
        assert_eq!(parse("01:02:03.500").unwrap(), 3723.5);
        assert_eq!(parse("02:03").unwrap(), 123.0);
        assert_eq!(parse("42.25").unwrap(), 42.25);
        assert_eq!(parse(" 00:00:01.000 ").unwrap(), 1.0);
    }

    #[test]
    fn rejects_too_many_fields() {
        let err = parse("1:2:3:4").unwrap_err();
        assert!(matches!(err, Error::MalformedTimestamp { .. }));
    }

    #[test]
    fn rejects_non_numeric_fields() {
        for bad in ["aa:00:01", "00:bb:01", "00:00:cc", "", "00::01", "-5", "inf", "1.2.3", "00:1.5:00"] {
            assert!(
                matches!(parse(bad), Err(Error::MalformedTimestamp { .. })),
                "expected {bad:?} to be rejected"
            );
        }
    }

    #[test]
    fn formats_canonical_form() {
        assert_eq!(format(0.0), "00:00:00.000");
        assert_eq!(format(3723.5), "01:02:03.500");
        assert_eq!(format(59.9996), "00:01:00.000");
        assert_eq!(format(36_000.001), "10:00:00.001");
    }

    #[test]
    fn round_trips_to_the_millisecond() {
        for ms in [0u64, 1, 999, 1000, 59_999, 60_000, 3_599_999, 3_600_000, 86_399_999] {
            let x = ms as f64 / 1000.0;
            assert_eq!(to_millis(parse(&format(x)).unwrap()), ms);
        }
        for s in ["00:00:01.000", "00:12:34.567", "10:00:00.001"] {
            assert_eq!(format(parse(s).unwrap()), s);
        }
    }
}
