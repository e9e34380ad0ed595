pub mod ffmpeg;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::intervals::Interval;

/// Fixed re-encode profile applied to every extracted clip and to the final concat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncodeProfile {
    pub video_codec: String,
    pub crf: u8,
    pub preset: String,
    pub audio_codec: String,
    pub audio_bitrate: String,
}

impl Default for EncodeProfile {
    fn default() -> Self {
        Self {
            video_codec: "libx264".to_string(),
            crf: 23,
            preset: "fast".to_string(),
            audio_codec: "aac".to_string(),
            audio_bitrate: "192k".to_string(),
        }
    }
}

impl EncodeProfile {
    /// Encoder arguments in ffmpeg's option syntax.
    pub fn to_args(&self) -> Vec<String> {
        vec![
            "-c:v".to_string(),
            self.video_codec.clone(),
            "-crf".to_string(),
            self.crf.to_string(),
            "-preset".to_string(),
            self.preset.clone(),
            "-c:a".to_string(),
            self.audio_codec.clone(),
            "-b:a".to_string(),
            self.audio_bitrate.clone(),
        ]
    }
}

/// An ordered list of clips to join, and where its listing is written.
#[derive(Debug, Clone, PartialEq)]
pub struct Manifest {
    pub path: PathBuf,
    pub entries: Vec<PathBuf>,
}

impl Manifest {
    pub fn new(path: PathBuf, entries: Vec<PathBuf>) -> Self {
        Self { path, entries }
    }

    /// Concat-demuxer listing: `file '<path>'` per line, single quotes escaped.
    pub fn render(&self) -> String {
        self.entries
            .iter()
            .map(|p| {
                let escaped = p.to_string_lossy().replace('\'', r"'\''");
                format!("file '{escaped}'\n")
            })
            .collect()
    }

    pub fn write(&self) -> Result<()> {
        std::fs::write(&self.path, self.render())?;
        Ok(())
    }
}

/// The narrow contract the reconstructor needs from a media backend.
///
/// Each call is all-or-nothing: on failure the backend reports its own
/// diagnostic text through `Error::ExternalToolFailure`.
pub trait MediaTool: Sync {
    /// Total duration of a media file in seconds.
    fn probe_duration(&self, input: &Path) -> Result<f64>;

    /// Re-encode `[interval.start, interval.end)` of `input` into `output`.
    fn extract(&self, input: &Path, interval: &Interval, output: &Path) -> Result<()>;

    /// Join the manifest's clips, in order, into `output`.
    fn concatenate(&self, manifest: &Manifest, output: &Path) -> Result<()>;
}
