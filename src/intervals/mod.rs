pub mod file;
pub mod plan;

use serde::Serialize;

use crate::classify::ClassifiedRecord;
use crate::error::{Error, Result};

/// A half-open time range `[start, end)` in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Interval {
    pub start: f64,
    pub end: f64,
}

impl Interval {
    /// Build an interval, rejecting negative, non-finite or empty ranges.
    pub fn new(start: f64, end: f64) -> Result<Self> {
        if !start.is_finite() || !end.is_finite() {
            return Err(Error::invalid_interval(start, end, "bound is not finite"));
        }
        if start < 0.0 {
            return Err(Error::invalid_interval(start, end, "starts before zero"));
        }
        if start >= end {
            return Err(Error::invalid_interval(start, end, "start is not before end"));
        }
        Ok(Self { start, end })
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// Intervals of every flagged record, in record order.
pub fn flagged_intervals(records: &[ClassifiedRecord]) -> Vec<Interval> {
    records
        .iter()
        .filter(|c| c.flagged)
        .map(|c| Interval {
            start: c.record.start,
            end: c.record.end,
        })
        .collect()
}

/// Sort by start and coalesce overlapping or touching intervals.
pub fn merge(mut intervals: Vec<Interval>) -> Vec<Interval> {
    intervals.sort_by(|a, b| a.start.total_cmp(&b.start));

    let mut merged: Vec<Interval> = Vec::with_capacity(intervals.len());
    for next in intervals {
        match merged.last_mut() {
            Some(running) if next.start <= running.end => {
                running.end = running.end.max(next.end);
            }
            _ => merged.push(next),
        }
    }
    merged
}

/// Clip merged intervals to the media duration.
///
/// An interval reaching past `duration` is cut at `duration`; one that
/// starts at or after it cannot be clipped into a valid range.
pub fn clip_to_duration(intervals: Vec<Interval>, duration: f64) -> Result<Vec<Interval>> {
    intervals
        .into_iter()
        .map(|iv| Interval::new(iv.start, iv.end.min(duration)))
        .collect::<Result<Vec<_>>>()
        .map_err(|e| match e {
            Error::InvalidInterval { start, end, .. } => Error::invalid_interval(
                start,
                end,
                format!("outside media duration {duration:.3}s"),
            ),
            other => other,
        })
}

/// The gaps around a merged interval set within `[0, duration)`.
///
/// Zero-length gaps are dropped. Intervals reaching past `duration` are
/// treated as ending there.
pub fn complement(intervals: &[Interval], duration: f64) -> Vec<Interval> {
    let mut gaps = Vec::new();
    let mut cursor = 0.0_f64;

    for iv in intervals {
        let start = iv.start.min(duration);
        if start > cursor {
            gaps.push(Interval {
                start: cursor,
                end: start,
            });
        }
        cursor = cursor.max(iv.end.min(duration));
    }

    if duration > cursor {
        gaps.push(Interval {
            start: cursor,
            end: duration,
        });
    }
    gaps
}

/// Total seconds covered by a set of non-overlapping intervals.
pub fn total_duration(intervals: &[Interval]) -> f64 {
    intervals.iter().map(Interval::duration).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcript::TranscriptRecord;

    fn iv(start: f64, end: f64) -> Interval {
        Interval { start, end }
    }

    fn classified(start: f64, end: f64, flagged: bool) -> ClassifiedRecord {
        ClassifiedRecord {
            record: TranscriptRecord {
                start,
                end,
                text: String::new(),
            },
            flagged,
        }
    }

    fn assert_disjoint_sorted(set: &[Interval]) {
        for pair in set.windows(2) {
            assert!(pair[0].end < pair[1].start, "{pair:?} overlap or touch");
        }
    }

    #[test]
    fn touching_intervals_merge() {
        let flagged = flagged_intervals(&[classified(1.0, 2.0, true), classified(2.0, 3.0, true)]);
        assert_eq!(merge(flagged), vec![iv(1.0, 3.0)]);
    }

    #[test]
    fn only_flagged_records_contribute() {
        let flagged = flagged_intervals(&[
            classified(0.0, 1.0, false),
            classified(4.0, 5.0, true),
            classified(1.0, 2.0, true),
        ]);
        assert_eq!(flagged, vec![iv(4.0, 5.0), iv(1.0, 2.0)]);
    }

    #[test]
    fn merge_sorts_and_absorbs_contained_ranges() {
        let merged = merge(vec![iv(8.0, 9.0), iv(0.0, 5.0), iv(1.0, 2.0), iv(4.0, 6.0), iv(10.0, 11.0)]);
        assert_eq!(merged, vec![iv(0.0, 6.0), iv(8.0, 9.0), iv(10.0, 11.0)]);
        assert_disjoint_sorted(&merged);
    }

    #[test]
    fn merge_is_idempotent_and_preserves_coverage() {
        let input = vec![iv(3.0, 4.0), iv(0.5, 1.5), iv(1.0, 2.0), iv(3.5, 3.75), iv(6.0, 7.0)];
        let raw_union = 1.5 + 1.0 + 1.0; // [0.5,2) + [3,4) + [6,7)
        let once = merge(input.clone());
        assert_eq!(merge(once.clone()), once);
        assert!(total_duration(&once) >= raw_union - 1e-9);
        assert_disjoint_sorted(&once);
    }

    #[test]
    fn complement_of_empty_set_is_whole_media() {
        assert_eq!(complement(&[], 120.0), vec![iv(0.0, 120.0)]);
    }

    #[test]
    fn complement_and_flagged_tile_the_media() {
        let duration = 30.0;
        let merged = merge(vec![iv(0.0, 2.0), iv(5.0, 7.5), iv(7.5, 9.0), iv(20.0, 30.0)]);
        let gaps = complement(&merged, duration);
        assert_eq!(gaps, vec![iv(2.0, 5.0), iv(9.0, 20.0)]);

        let mut all: Vec<Interval> = merged.iter().chain(gaps.iter()).copied().collect();
        all.sort_by(|a, b| a.start.total_cmp(&b.start));
        assert_eq!(all.first().unwrap().start, 0.0);
        assert_eq!(all.last().unwrap().end, duration);
        for pair in all.windows(2) {
            assert_eq!(pair[0].end, pair[1].start, "gap or overlap at {pair:?}");
        }
    }

    #[test]
    fn complement_clips_intervals_past_duration() {
        assert_eq!(complement(&[iv(8.0, 15.0)], 10.0), vec![iv(0.0, 8.0)]);
    }

    #[test]
    fn clipping_cuts_at_duration_or_rejects() {
        assert_eq!(
            clip_to_duration(vec![iv(1.0, 2.0), iv(9.0, 12.0)], 10.0).unwrap(),
            vec![iv(1.0, 2.0), iv(9.0, 10.0)]
        );
        let err = clip_to_duration(vec![iv(10.0, 12.0)], 10.0).unwrap_err();
        assert!(matches!(err, Error::InvalidInterval { .. }));
    }

    #[test]
    fn interval_constructor_enforces_order() {
        assert!(Interval::new(1.0, 1.0).is_err());
        assert!(Interval::new(-1.0, 1.0).is_err());
        assert!(Interval::new(0.0, f64::NAN).is_err());
        assert_eq!(Interval::new(1.0, 2.0).unwrap().duration(), 1.0);
    }
}
