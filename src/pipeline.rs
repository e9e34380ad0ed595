use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;
use uuid::Uuid;

use crate::classify::judgment::{JudgmentClassifier, JudgmentOptions};
use crate::classify::keyword::KeywordClassifier;
use crate::classify::{self, ClassifiedRecord, Classifier};
use crate::error::Result;
use crate::intervals::file::write_interval_file;
use crate::intervals::plan::{PlanPolicy, SegmentPlan};
use crate::intervals::Interval;
use crate::media::MediaTool;
use crate::reconstruct::Reconstructor;
use crate::transcript::{self, TranscriptRecord};

/// Which classification strategy a run uses.
#[derive(Debug, Clone)]
pub enum Strategy {
    Keywords(PathBuf),
    Judgment(JudgmentOptions),
}

/// Build the classifier for a run. The judgment client is owned by the
/// returned value and released when the run drops it.
pub fn build_classifier(strategy: &Strategy) -> Result<Box<dyn Classifier>> {
    match strategy {
        Strategy::Keywords(path) => Ok(Box::new(KeywordClassifier::load(path)?)),
        Strategy::Judgment(options) => Ok(Box::new(JudgmentClassifier::new(options.clone())?)),
    }
}

/// Where and how segments are rendered.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    pub work_dir: PathBuf,
    pub workers: usize,
    pub verify: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            work_dir: std::env::temp_dir(),
            workers: 1,
            verify: true,
        }
    }
}

/// Everything a full transcript-to-video run needs.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub source: PathBuf,
    pub transcript: PathBuf,
    pub output: PathBuf,
    pub policy: PlanPolicy,
    /// Diagnostic listing of the planned intervals.
    pub intervals_file: Option<PathBuf>,
    pub render: RenderOptions,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub classifier: String,
    pub records: usize,
    pub flagged: usize,
    pub flagged_records: Vec<TranscriptRecord>,
    pub policy: PlanPolicy,
    pub media_duration: f64,
    pub intervals: Vec<Interval>,
    pub planned_duration: f64,
    pub intervals_file: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub output_duration: Option<f64>,
}

impl RunReport {
    fn new(classifier: &str, policy: PlanPolicy, media_duration: f64) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            classifier: classifier.to_string(),
            records: 0,
            flagged: 0,
            flagged_records: Vec::new(),
            policy,
            media_duration,
            intervals: Vec::new(),
            planned_duration: 0.0,
            intervals_file: None,
            output: None,
            output_duration: None,
        }
    }

    fn record_plan(&mut self, classified: &[ClassifiedRecord], plan: &SegmentPlan) {
        self.records = classified.len();
        self.flagged_records = classified
            .iter()
            .filter(|c| c.flagged)
            .map(|c| c.record.clone())
            .collect();
        self.flagged = self.flagged_records.len();
        self.intervals = plan.intervals.clone();
        self.planned_duration = plan.total_duration();
    }
}

/// Read and classify a transcript, then derive the segment plan.
pub fn plan_transcript(
    transcript_path: &Path,
    classifier: &dyn Classifier,
    media_duration: f64,
    policy: PlanPolicy,
) -> Result<(Vec<ClassifiedRecord>, SegmentPlan)> {
    let records = transcript::read(transcript_path)?;
    let classified = classify::classify_all(classifier, &records)?;
    let plan = SegmentPlan::from_records(&classified, media_duration, policy)?;
    info!(
        "Plan ({}): {} interval(s), {:.3}s of {:.3}s",
        policy.as_str(),
        plan.len(),
        plan.total_duration(),
        media_duration
    );
    Ok((classified, plan))
}

/// Compute the plan and write the interval listing, without rendering.
pub fn detect(
    transcript_path: &Path,
    classifier: &dyn Classifier,
    media_duration: f64,
    policy: PlanPolicy,
    intervals_file: &Path,
) -> Result<RunReport> {
    let mut report = RunReport::new(classifier.name(), policy, media_duration);
    let (classified, plan) = plan_transcript(transcript_path, classifier, media_duration, policy)?;
    write_interval_file(intervals_file, &plan.intervals)?;
    report.record_plan(&classified, &plan);
    report.intervals_file = Some(intervals_file.to_path_buf());
    Ok(report)
}

/// Full pipeline: transcript, classification, plan, reconstruction.
///
/// Every parsing and planning step finishes before the first extraction,
/// so bad input never reaches the media tool.
pub fn run(config: &RunConfig, classifier: &dyn Classifier, tool: &dyn MediaTool) -> Result<RunReport> {
    let records = transcript::read(&config.transcript)?;
    let classified = classify::classify_all(classifier, &records)?;

    let media_duration = tool.probe_duration(&config.source)?;
    let mut report = RunReport::new(classifier.name(), config.policy, media_duration);
    let plan = SegmentPlan::from_records(&classified, media_duration, config.policy)?;
    report.record_plan(&classified, &plan);

    if let Some(ref path) = config.intervals_file {
        write_interval_file(path, &plan.intervals)?;
        report.intervals_file = Some(path.clone());
    }

    render_plan(&config.source, &plan, &config.output, tool, &config.render, &mut report)?;
    Ok(report)
}

/// Render previously computed intervals (e.g. from an interval file).
///
/// Intervals are merged and clipped to the probed media duration first;
/// with `RemoveFlagged` they are treated as content to cut out.
pub fn render_intervals(
    source: &Path,
    intervals: Vec<Interval>,
    policy: PlanPolicy,
    output: &Path,
    tool: &dyn MediaTool,
    options: &RenderOptions,
) -> Result<RunReport> {
    let media_duration = tool.probe_duration(source)?;
    let mut report = RunReport::new("interval-file", policy, media_duration);
    let plan = SegmentPlan::from_flagged(intervals, media_duration, policy)?;
    report.intervals = plan.intervals.clone();
    report.planned_duration = plan.total_duration();

    render_plan(source, &plan, output, tool, options, &mut report)?;
    Ok(report)
}

fn render_plan(
    source: &Path,
    plan: &SegmentPlan,
    output: &Path,
    tool: &dyn MediaTool,
    options: &RenderOptions,
    report: &mut RunReport,
) -> Result<()> {
    let mut reconstructor = Reconstructor::new(tool, &options.work_dir)
        .with_workers(options.workers)
        .with_run_id(report.run_id)
        .with_verify(options.verify);
    let rendered = reconstructor.run(source, plan, output)?;
    report.output = Some(rendered.output);
    report.output_duration = rendered.output_duration;
    Ok(())
}
