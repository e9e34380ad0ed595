use std::sync::LazyLock;

use regex::Regex;

use crate::error::Result;
use crate::transcript::timestamp;

/// `[00:00:01.000 --> 00:00:02.500] spoken text`
static BRACKETED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\[\s*(\d[^\s\]]*?)\s*-->\s*(\d[^\s\]]*)\s*\]\s*(.*)$").expect("bracketed line pattern")
});

/// Match a single-line bracketed record. `None` when the line is not in this grammar.
pub fn match_line(line: &str) -> Option<Result<(f64, f64, String)>> {
    let caps = BRACKETED_RE.captures(line)?;
    Some(parse_captures(&caps[1], &caps[2], &caps[3]))
}

fn parse_captures(start: &str, end: &str, text: &str) -> Result<(f64, f64, String)> {
    let start = timestamp::parse(start)?;
    let end = timestamp::parse(end)?;
    Ok((start, end, text.trim().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_whisper_style_lines() {
        let (start, end, text) = match_line("[00:00:01.000 --> 00:00:02.500]  buy my spam product ")
            .unwrap()
            .unwrap();
        assert_eq!(start, 1.0);
        assert_eq!(end, 2.5);
        assert_eq!(text, "buy my spam product");
    }

    #[test]
    fn ignores_other_lines() {
        assert!(match_line("00:00:01.000 --> 00:00:02.000").is_none());
        assert!(match_line("just words").is_none());
    }

    #[test]
    fn surfaces_bad_timestamps() {
        assert!(match_line("[1:2:3:4 --> 00:00:02.000] x").unwrap().is_err());
    }
}
