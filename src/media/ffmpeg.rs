use std::ffi::OsString;
use std::path::Path;
use std::process::Command;

use tracing::debug;

use crate::error::{Error, Result, ToolOperation};
use crate::intervals::Interval;
use crate::media::{EncodeProfile, Manifest, MediaTool};
use crate::transcript::timestamp;

/// `MediaTool` backed by the ffmpeg / ffprobe executables.
#[derive(Debug, Clone)]
pub struct Ffmpeg {
    ffmpeg_path: String,
    ffprobe_path: String,
    profile: EncodeProfile,
}

impl Default for Ffmpeg {
    fn default() -> Self {
        Self::new("ffmpeg", "ffprobe", EncodeProfile::default())
    }
}

impl Ffmpeg {
    pub fn new(
        ffmpeg_path: impl Into<String>,
        ffprobe_path: impl Into<String>,
        profile: EncodeProfile,
    ) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.into(),
            ffprobe_path: ffprobe_path.into(),
            profile,
        }
    }

    pub fn profile(&self) -> &EncodeProfile {
        &self.profile
    }

    /// Arguments for cutting one interval. Re-encodes so cuts land exactly
    /// on the requested times rather than the nearest keyframe.
    pub fn extract_args(&self, input: &Path, interval: &Interval, output: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = ["-hide_banner", "-loglevel", "error", "-ss"]
            .into_iter()
            .map(OsString::from)
            .collect();
        args.push(timestamp::format(interval.start).into());
        args.push("-i".into());
        args.push(input.as_os_str().to_owned());
        args.push("-t".into());
        args.push(format!("{:.3}", interval.duration()).into());
        args.extend(self.profile.to_args().into_iter().map(OsString::from));
        args.push("-y".into());
        args.push(output.as_os_str().to_owned());
        args
    }

    pub fn concat_args(&self, manifest: &Manifest, output: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = [
            "-hide_banner",
            "-loglevel",
            "error",
            "-f",
            "concat",
            "-safe",
            "0",
            "-i",
        ]
        .into_iter()
        .map(OsString::from)
        .collect();
        args.push(manifest.path.as_os_str().to_owned());
        args.extend(self.profile.to_args().into_iter().map(OsString::from));
        args.push("-y".into());
        args.push(output.as_os_str().to_owned());
        args
    }

    fn run(&self, program: &str, args: &[OsString], operation: ToolOperation) -> Result<Vec<u8>> {
        debug!("Running {program} for {operation}: {args:?}");
        let output = Command::new(program)
            .args(args)
            .output()
            .map_err(|e| Error::tool(operation, format!("failed to execute {program}: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::tool(
                operation,
                format!(
                    "{program} exited with {}: {}",
                    output.status.code().unwrap_or(-1),
                    stderr.trim()
                ),
            ));
        }
        Ok(output.stdout)
    }
}

impl MediaTool for Ffmpeg {
    fn probe_duration(&self, input: &Path) -> Result<f64> {
        let mut args: Vec<OsString> = ["-v", "error", "-print_format", "json", "-show_format"]
            .into_iter()
            .map(OsString::from)
            .collect();
        args.push(input.as_os_str().to_owned());

        let stdout = self.run(&self.ffprobe_path, &args, ToolOperation::Probe)?;
        parse_probe_duration(&stdout)
    }

    fn extract(&self, input: &Path, interval: &Interval, output: &Path) -> Result<()> {
        let args = self.extract_args(input, interval, output);
        self.run(&self.ffmpeg_path, &args, ToolOperation::Extract)?;
        Ok(())
    }

    fn concatenate(&self, manifest: &Manifest, output: &Path) -> Result<()> {
        let args = self.concat_args(manifest, output);
        self.run(&self.ffmpeg_path, &args, ToolOperation::Concatenate)?;
        Ok(())
    }
}

/// Pull `format.duration` out of ffprobe's JSON output.
fn parse_probe_duration(stdout: &[u8]) -> Result<f64> {
    let json: serde_json::Value = serde_json::from_slice(stdout)
        .map_err(|e| Error::tool(ToolOperation::Probe, format!("unreadable ffprobe output: {e}")))?;

    let duration = json["format"]["duration"]
        .as_str()
        .and_then(|d| d.parse::<f64>().ok())
        .or_else(|| json["format"]["duration"].as_f64())
        .ok_or_else(|| Error::tool(ToolOperation::Probe, "ffprobe reported no duration"))?;

    if !duration.is_finite() || duration <= 0.0 {
        return Err(Error::tool(
            ToolOperation::Probe,
            format!("ffprobe reported unusable duration {duration}"),
        ));
    }
    Ok(duration)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn joined(args: &[OsString]) -> String {
        args.iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[test]
    fn extract_reencodes_the_requested_window() {
        let ff = Ffmpeg::default();
        let args = ff.extract_args(
            Path::new("in.mp4"),
            &Interval { start: 10.0, end: 15.0 },
            Path::new("seg.mp4"),
        );
        assert_eq!(
            joined(&args),
            "-hide_banner -loglevel error -ss 00:00:10.000 -i in.mp4 -t 5.000 \
             -c:v libx264 -crf 23 -preset fast -c:a aac -b:a 192k -y seg.mp4"
        );
        assert!(!joined(&args).contains("copy"));
    }

    #[test]
    fn concat_reads_the_manifest() {
        let ff = Ffmpeg::default();
        let manifest = Manifest::new(PathBuf::from("list.txt"), vec![PathBuf::from("a.mp4")]);
        let args = joined(&ff.concat_args(&manifest, Path::new("out.mp4")));
        assert!(args.starts_with("-hide_banner -loglevel error -f concat -safe 0 -i list.txt"));
        assert!(args.ends_with("-y out.mp4"));
    }

    #[test]
    fn parses_probe_output() {
        let out = br#"{"format": {"filename": "in.mp4", "duration": "120.040000"}}"#;
        assert_eq!(parse_probe_duration(out).unwrap(), 120.04);
        let err = parse_probe_duration(br#"{"format": {}}"#).unwrap_err();
        assert_eq!(err.stage(), "probe");
    }

    #[test]
    fn missing_binary_is_a_tool_failure() {
        let ff = Ffmpeg::new(
            "/nonexistent/ffmpeg",
            "/nonexistent/ffprobe",
            EncodeProfile::default(),
        );
        let err = ff
            .extract(
                Path::new("in.mp4"),
                &Interval { start: 0.0, end: 1.0 },
                Path::new("out.mp4"),
            )
            .unwrap_err();
        assert!(matches!(
            err,
            Error::ExternalToolFailure {
                operation: ToolOperation::Extract,
                ..
            }
        ));
    }
}
