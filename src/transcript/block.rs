use std::sync::LazyLock;

use regex::Regex;

use crate::error::Result;
use crate::transcript::timestamp;

/// `00:00:01.000 --> 00:00:02.500` optionally followed by cue settings.
static RANGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d\S*?)\s*-->\s*(\d\S*)(?:\s+.*)?$").expect("range line pattern")
});

/// Match a timestamp-range line that opens a block record.
pub fn match_range(line: &str) -> Option<Result<(f64, f64)>> {
    let caps = RANGE_RE.captures(line)?;
    Some(timestamp::parse(&caps[1]).and_then(|start| Ok((start, timestamp::parse(&caps[2])?))))
}

/// Text lines accumulated under the most recent range line.
#[derive(Debug)]
pub struct PendingBlock {
    pub start: f64,
    pub end: f64,
    pub line_no: usize,
    lines: Vec<String>,
}

impl PendingBlock {
    pub fn new(start: f64, end: f64, line_no: usize) -> Self {
        Self {
            start,
            end,
            line_no,
            lines: Vec::new(),
        }
    }

    pub fn push(&mut self, line: &str) {
        self.lines.push(line.to_string());
    }

    /// Joined text, or `None` when no text line followed the range.
    pub fn text(&self) -> Option<String> {
        if self.lines.is_empty() {
            None
        } else {
            Some(self.lines.join(" "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_vtt_cue_timing_with_settings() {
        let (start, end) = match_range("00:01:00.000 --> 00:01:04.250 align:start position:0%")
            .unwrap()
            .unwrap();
        assert_eq!(start, 60.0);
        assert_eq!(end, 64.25);
    }

    #[test]
    fn bracketed_lines_are_not_ranges() {
        assert!(match_range("[00:00:01.000 --> 00:00:02.000] hi").is_none());
    }

    #[test]
    fn joins_text_with_single_spaces() {
        let mut block = PendingBlock::new(0.0, 1.0, 3);
        assert_eq!(block.text(), None);
        block.push("first line");
        block.push("second line");
        assert_eq!(block.text().as_deref(), Some("first line second line"));
    }
}
