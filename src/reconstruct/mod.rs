pub mod workspace;

use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::intervals::plan::SegmentPlan;
use crate::intervals::Interval;
use crate::media::{Manifest, MediaTool};
use workspace::RunWorkspace;

/// Allowed gap between the planned runtime and the probed output runtime.
pub const DURATION_TOLERANCE: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Idle,
    Extracting,
    Concatenating,
    Done,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconstructReport {
    pub run_id: Uuid,
    pub segments: usize,
    pub output: PathBuf,
    pub planned_duration: f64,
    pub output_duration: Option<f64>,
}

/// Drives extraction and concatenation of a `SegmentPlan` through a `MediaTool`.
pub struct Reconstructor<'a> {
    tool: &'a dyn MediaTool,
    work_root: PathBuf,
    workers: usize,
    verify: bool,
    run_id: Uuid,
    phase: Phase,
}

impl<'a> Reconstructor<'a> {
    pub fn new(tool: &'a dyn MediaTool, work_root: impl Into<PathBuf>) -> Self {
        Self {
            tool,
            work_root: work_root.into(),
            workers: 1,
            verify: true,
            run_id: Uuid::new_v4(),
            phase: Phase::Idle,
        }
    }

    /// Extract up to `workers` clips at once. Clip order in the output is unaffected.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_run_id(mut self, run_id: Uuid) -> Self {
        self.run_id = run_id;
        self
    }

    /// Probe the finished output and compare it against the plan.
    pub fn with_verify(mut self, verify: bool) -> Self {
        self.verify = verify;
        self
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Render `plan` from `source` into `output`.
    ///
    /// Temporary clips and the manifest are removed whether the run succeeds
    /// or fails. Concatenation writes inside the run workspace and the result
    /// is moved to `output` only once it is complete, so a failed run never
    /// touches whatever already exists at `output`.
    pub fn run(&mut self, source: &Path, plan: &SegmentPlan, output: &Path) -> Result<ReconstructReport> {
        if plan.is_empty() {
            self.phase = Phase::Failed;
            return Err(Error::EmptyPlan);
        }
        if let Err(e) = validate_order(&plan.intervals) {
            self.phase = Phase::Failed;
            return Err(e);
        }

        let workspace = match RunWorkspace::create(&self.work_root, self.run_id) {
            Ok(ws) => ws,
            Err(e) => {
                self.phase = Phase::Failed;
                return Err(e);
            }
        };
        let extension = output
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("mp4")
            .to_string();
        let clips: Vec<PathBuf> = (0..plan.len())
            .map(|i| workspace.clip_path(i, &extension))
            .collect();

        self.phase = Phase::Extracting;
        info!(
            "Run {}: extracting {} segment(s) from {}",
            self.run_id,
            plan.len(),
            source.display()
        );
        if let Err(e) = self.extract_all(source, &plan.intervals, &clips) {
            self.phase = Phase::Failed;
            workspace.close();
            return Err(e);
        }

        self.phase = Phase::Concatenating;
        let manifest = Manifest::new(workspace.manifest_path(), clips);
        let staged = workspace.staged_output_path(&extension);
        let concatenated = manifest
            .write()
            .and_then(|()| self.tool.concatenate(&manifest, &staged))
            .and_then(|()| publish(&staged, output));
        workspace.close();
        if let Err(e) = concatenated {
            self.phase = Phase::Failed;
            return Err(e);
        }

        self.phase = Phase::Done;
        info!("Run {}: wrote {}", self.run_id, output.display());

        let planned_duration = plan.total_duration();
        let output_duration = if self.verify {
            self.verify_output(output, planned_duration)
        } else {
            None
        };

        Ok(ReconstructReport {
            run_id: self.run_id,
            segments: plan.len(),
            output: output.to_path_buf(),
            planned_duration,
            output_duration,
        })
    }

    fn extract_all(&self, source: &Path, intervals: &[Interval], clips: &[PathBuf]) -> Result<()> {
        let workers = self.workers.min(intervals.len());
        if workers <= 1 {
            for (i, (interval, clip)) in intervals.iter().zip(clips).enumerate() {
                self.extract_one(source, i, intervals.len(), interval, clip)?;
            }
            return Ok(());
        }

        let next = AtomicUsize::new(0);
        let stop = AtomicBool::new(false);
        let first_error: Mutex<Option<(usize, Error)>> = Mutex::new(None);

        std::thread::scope(|scope| {
            for _ in 0..workers {
                scope.spawn(|| loop {
                    if stop.load(Ordering::SeqCst) {
                        break;
                    }
                    let i = next.fetch_add(1, Ordering::SeqCst);
                    if i >= intervals.len() {
                        break;
                    }
                    if let Err(e) = self.extract_one(source, i, intervals.len(), &intervals[i], &clips[i]) {
                        stop.store(true, Ordering::SeqCst);
                        let mut slot = first_error.lock().unwrap_or_else(|p| p.into_inner());
                        if slot.as_ref().map_or(true, |(j, _)| i < *j) {
                            *slot = Some((i, e));
                        }
                    }
                });
            }
        });

        match first_error.into_inner().unwrap_or_else(|p| p.into_inner()) {
            Some((_, e)) => Err(e),
            None => Ok(()),
        }
    }

    fn extract_one(
        &self,
        source: &Path,
        index: usize,
        total: usize,
        interval: &Interval,
        clip: &Path,
    ) -> Result<()> {
        info!(
            "  [{}/{}] {:.3}s - {:.3}s",
            index + 1,
            total,
            interval.start,
            interval.end
        );
        self.tool.extract(source, interval, clip).inspect_err(|e| {
            warn!("Segment {} failed: {e}", index + 1);
        })
    }

    fn verify_output(&self, output: &Path, planned: f64) -> Option<f64> {
        match self.tool.probe_duration(output) {
            Ok(actual) => {
                if (actual - planned).abs() > DURATION_TOLERANCE {
                    warn!(
                        "Output runs {actual:.3}s but the plan covers {planned:.3}s ({})",
                        output.display()
                    );
                }
                Some(actual)
            }
            Err(e) => {
                warn!("Could not probe output {}: {e}", output.display());
                None
            }
        }
    }
}

/// Plans must be sorted, non-overlapping and made of valid intervals.
fn validate_order(intervals: &[Interval]) -> Result<()> {
    for iv in intervals {
        Interval::new(iv.start, iv.end)?;
    }
    for pair in intervals.windows(2) {
        if pair[1].start < pair[0].end {
            return Err(Error::invalid_interval(
                pair[1].start,
                pair[1].end,
                "plan intervals overlap or are out of order",
            ));
        }
    }
    Ok(())
}

/// Move the finished file into place. Falls back to copying through a
/// temporary file next to `output` when the workspace is on another filesystem.
fn publish(staged: &Path, output: &Path) -> Result<()> {
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    if std::fs::rename(staged, output).is_ok() {
        return Ok(());
    }

    let parent = match output.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(parent) => parent,
        None => Path::new("."),
    };
    let mut pending = tempfile::NamedTempFile::new_in(parent)?;
    std::io::copy(&mut std::fs::File::open(staged)?, pending.as_file_mut())?;
    pending.persist(output).map_err(|e| e.error)?;
    Ok(())
}
