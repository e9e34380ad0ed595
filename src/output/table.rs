use unicode_width::UnicodeWidthStr;

use crate::intervals::Interval;
use crate::pipeline::RunReport;
use crate::transcript::{timestamp, TranscriptRecord};

/// Format duration in seconds to human-readable string.
pub fn format_duration(seconds: f64) -> String {
    let total = seconds.max(0.0).round() as u64;
    let h = total / 3600;
    let m = (total % 3600) / 60;
    let s = total % 60;
    if h > 0 {
        format!("{h}h{m:02}m")
    } else if m > 0 {
        format!("{m}m{s:02}s")
    } else {
        format!("{s}s")
    }
}

/// Truncate a string to fit within max_width (respecting unicode width).
fn truncate(s: &str, max_width: usize) -> String {
    if UnicodeWidthStr::width(s) <= max_width {
        return s.to_string();
    }
    let mut result = String::new();
    let mut width = 0;
    for ch in s.chars() {
        let cw = unicode_width::UnicodeWidthChar::width(ch).unwrap_or(0);
        if width + cw + 3 > max_width {
            result.push_str("...");
            break;
        }
        result.push(ch);
        width += cw;
    }
    result
}

fn plural(n: usize) -> &'static str {
    if n == 1 {
        ""
    } else {
        "s"
    }
}

/// Print the planned intervals as a table.
pub fn print_intervals(intervals: &[Interval]) {
    if intervals.is_empty() {
        println!("No intervals.");
        return;
    }

    println!("  {:<4} {:<14} {:<14} {:<8}", "#", "START", "END", "LENGTH");
    println!("  {}", "-".repeat(42));
    for (i, iv) in intervals.iter().enumerate() {
        println!(
            "  {:<4} {:<14} {:<14} {:<8}",
            i + 1,
            timestamp::format(iv.start),
            timestamp::format(iv.end),
            format_duration(iv.duration()),
        );
    }
}

/// Print the transcript records a classifier flagged.
pub fn print_flagged_records(records: &[TranscriptRecord]) {
    if records.is_empty() {
        println!("No records flagged.");
        return;
    }

    println!("{} flagged record{}:\n", records.len(), plural(records.len()));
    for r in records {
        println!(
            "  [{} --> {}] {}",
            timestamp::format(r.start),
            timestamp::format(r.end),
            truncate(&r.text.replace('\n', " "), 60)
        );
    }
}

/// Print a run report for `trimscript run` / `detect` / `render`.
pub fn print_run_report(report: &RunReport) {
    println!("Run {}", report.run_id);
    println!("  Classifier: {}", report.classifier);
    if report.records > 0 {
        println!("  Records:    {} ({} flagged)", report.records, report.flagged);
    }
    println!("  Policy:     {}", report.policy.as_str());
    println!("  Media:      {}", format_duration(report.media_duration));
    println!(
        "  Plan:       {} interval{}, {}",
        report.intervals.len(),
        plural(report.intervals.len()),
        format_duration(report.planned_duration)
    );
    if let Some(ref path) = report.intervals_file {
        println!("  Intervals:  {}", path.display());
    }
    if let Some(ref path) = report.output {
        match report.output_duration {
            Some(d) => println!("  Output:     {} ({})", path.display(), format_duration(d)),
            None => println!("  Output:     {}", path.display()),
        }
    }

    if !report.flagged_records.is_empty() {
        println!();
        print_flagged_records(&report.flagged_records);
    }
    println!();
    print_intervals(&report.intervals);
}
