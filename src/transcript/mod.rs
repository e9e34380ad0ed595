pub mod block;
pub mod bracketed;
pub mod text;
pub mod timestamp;

use serde::Serialize;
use std::path::Path;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use block::PendingBlock;

/// One timestamped span of spoken text.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TranscriptRecord {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

/// Read a transcript file into records, in file order.
pub fn read(path: &Path) -> Result<Vec<TranscriptRecord>> {
    let content = std::fs::read_to_string(path).map_err(|source| Error::UnreadableTranscript {
        path: path.to_path_buf(),
        source,
    })?;
    let records = parse_content(&content)?;
    debug!("Read {} records from {}", records.len(), path.display());
    Ok(records)
}

/// Parse transcript text in either grammar (or a mix of both).
///
/// Bracketed lines (`[start --> end] text`) are complete records. A bare
/// range line (`start --> end`) opens a block whose following text lines are
/// joined with single spaces until the next range line or end of input.
/// Blank lines, `WEBVTT` headers and stray lines are skipped.
pub fn parse_content(content: &str) -> Result<Vec<TranscriptRecord>> {
    let mut records = Vec::new();
    let mut pending: Option<PendingBlock> = None;

    for (idx, raw) in content.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw.trim_start_matches('\u{feff}').trim();

        if line.is_empty() || line.starts_with("WEBVTT") {
            continue;
        }

        if let Some(parsed) = bracketed::match_line(line) {
            flush(pending.take(), &mut records)?;
            let (start, end, text) = parsed?;
            push_record(&mut records, start, end, text, line_no)?;
            continue;
        }

        if let Some(parsed) = block::match_range(line) {
            flush(pending.take(), &mut records)?;
            let (start, end) = parsed?;
            pending = Some(PendingBlock::new(start, end, line_no));
            continue;
        }

        match pending.as_mut() {
            Some(block) => block.push(line),
            None => debug!("Skipping unmatched line {line_no}"),
        }
    }

    flush(pending, &mut records)?;
    Ok(records)
}

fn flush(block: Option<PendingBlock>, records: &mut Vec<TranscriptRecord>) -> Result<()> {
    let Some(block) = block else {
        return Ok(());
    };
    match block.text() {
        Some(text) => push_record(records, block.start, block.end, text, block.line_no),
        None => {
            debug!("Range on line {} has no text; skipped", block.line_no);
            Ok(())
        }
    }
}

fn push_record(
    records: &mut Vec<TranscriptRecord>,
    start: f64,
    end: f64,
    text: String,
    line_no: usize,
) -> Result<()> {
    if start > end {
        return Err(Error::invalid_interval(
            start,
            end,
            format!("transcript line {line_no} ends before it starts"),
        ));
    }
    if start == end {
        warn!("Zero-length record on line {line_no} skipped");
        return Ok(());
    }
    records.push(TranscriptRecord { start, end, text });
    Ok(())
}
