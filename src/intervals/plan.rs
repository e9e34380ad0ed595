use serde::{Deserialize, Serialize};

use crate::classify::ClassifiedRecord;
use crate::error::Result;
use crate::intervals::{self, Interval};

/// Which side of the flagged set ends up in the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PlanPolicy {
    /// Keep everything except flagged content.
    #[default]
    RemoveFlagged,
    /// Keep only the flagged content.
    KeepFlagged,
}

impl PlanPolicy {
    pub fn as_str(&self) -> &str {
        match self {
            PlanPolicy::RemoveFlagged => "remove-flagged",
            PlanPolicy::KeepFlagged => "keep-flagged",
        }
    }
}

/// The ordered intervals to materialize, plus the policy that produced them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentPlan {
    pub policy: PlanPolicy,
    pub intervals: Vec<Interval>,
}

impl SegmentPlan {
    /// Derive a plan from classified records and the media duration.
    pub fn from_records(
        records: &[ClassifiedRecord],
        duration: f64,
        policy: PlanPolicy,
    ) -> Result<Self> {
        Self::from_flagged(intervals::flagged_intervals(records), duration, policy)
    }

    /// Derive a plan from raw flagged intervals (any order, may overlap).
    pub fn from_flagged(flagged: Vec<Interval>, duration: f64, policy: PlanPolicy) -> Result<Self> {
        let flagged = intervals::clip_to_duration(intervals::merge(flagged), duration)?;
        let intervals = match policy {
            PlanPolicy::KeepFlagged => flagged,
            PlanPolicy::RemoveFlagged => intervals::complement(&flagged, duration),
        };
        Ok(Self { policy, intervals })
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    /// Expected runtime of the rendered output.
    pub fn total_duration(&self) -> f64 {
        intervals::total_duration(&self.intervals)
    }
}
