use std::path::Path;

use crate::error::{Error, Result};
use crate::intervals::Interval;
use crate::transcript::timestamp;

/// Render intervals as `start end` lines in `HH:MM:SS.mmm` form.
pub fn render(intervals: &[Interval]) -> String {
    intervals
        .iter()
        .map(|iv| format!("{} {}\n", timestamp::format(iv.start), timestamp::format(iv.end)))
        .collect()
}

/// Parse `start end` lines. Blank lines are skipped; anything else must be a valid pair.
pub fn parse(content: &str) -> Result<Vec<Interval>> {
    let mut intervals = Vec::new();
    for (idx, line) in content.lines().enumerate() {
        let fields: Vec<&str> = line.split_whitespace().collect();
        match fields.as_slice() {
            [] => continue,
            [start, end] => {
                let start = timestamp::parse(start)?;
                let end = timestamp::parse(end)?;
                intervals.push(Interval::new(start, end)?);
            }
            _ => {
                return Err(Error::malformed_timestamp(
                    line,
                    format!("line {} is not a `start end` pair", idx + 1),
                ))
            }
        }
    }
    Ok(intervals)
}

/// Write the diagnostic interval listing, creating parent directories.
pub fn write_interval_file(path: &Path, intervals: &[Interval]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, render(intervals))?;
    Ok(())
}

/// Read an interval listing produced by `write_interval_file` (or by hand).
pub fn read_interval_file(path: &Path) -> Result<Vec<Interval>> {
    let content = std::fs::read_to_string(path).map_err(|source| Error::UnreadableInput {
        path: path.to_path_buf(),
        source,
    })?;
    parse(&content)
}
