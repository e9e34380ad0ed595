use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::classify::judgment::{self, JudgmentOptions};
use crate::classify::retry::{RetryPolicy, MAX_RETRIES};
use crate::media::EncodeProfile;

pub const API_KEY_ENV: &str = "TRIMSCRIPT_API_KEY";

/// `[judgment]` block: the delegated-judgment service.
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct JudgmentConfig {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub api_key_command: Option<String>,
    pub timeout_secs: u64,
    pub retries: u32,
    pub backoff_ms: u64,
    pub batch_size: usize,
    pub instruction: Option<String>,
    pub system_prompt: Option<String>,
}

impl Default for JudgmentConfig {
    fn default() -> Self {
        Self {
            endpoint: judgment::DEFAULT_ENDPOINT.to_string(),
            api_key: None,
            api_key_command: None,
            timeout_secs: 60,
            retries: MAX_RETRIES,
            backoff_ms: 1000,
            batch_size: 3,
            instruction: None,
            system_prompt: None,
        }
    }
}

impl JudgmentConfig {
    /// Build client options; `api_key` is the already-resolved credential.
    pub fn to_options(&self, api_key: Option<String>) -> JudgmentOptions {
        let defaults = JudgmentOptions::default();
        JudgmentOptions {
            endpoint: self.endpoint.clone(),
            api_key,
            timeout: Duration::from_secs(self.timeout_secs.max(1)),
            retry: RetryPolicy::new(self.retries, Duration::from_millis(self.backoff_ms)),
            batch_size: self.batch_size.max(1),
            instruction: self.instruction.clone().unwrap_or(defaults.instruction),
            system_prompt: self.system_prompt.clone().unwrap_or(defaults.system_prompt),
        }
    }
}

/// `[media]` block: external tool locations and scratch space.
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct MediaConfig {
    pub ffmpeg: String,
    pub ffprobe: String,
    pub workers: usize,
    pub work_dir: Option<PathBuf>,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            ffmpeg: "ffmpeg".to_string(),
            ffprobe: "ffprobe".to_string(),
            workers: 1,
            work_dir: None,
        }
    }
}

impl MediaConfig {
    pub fn work_dir(&self) -> PathBuf {
        self.work_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}

/// Top-level trimscript config file structure.
#[derive(Debug, Deserialize, Serialize, Default, Clone)]
#[serde(default)]
pub struct TrimConfig {
    pub judgment: JudgmentConfig,
    pub encode: EncodeProfile,
    pub media: MediaConfig,
}

impl TrimConfig {
    /// Load config from ~/.trimscript/config.toml. Returns default if file doesn't exist.
    pub fn load() -> Result<Self> {
        let path = config_path()?;
        if !path.exists() {
            return Ok(TrimConfig::default());
        }
        Self::load_from(&path)
    }

    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).with_context(|| "Failed to parse config.toml")
    }

    /// A copy safe to print: the API key is masked.
    pub fn redacted(&self) -> Self {
        let mut shown = self.clone();
        shown.judgment.api_key = shown.judgment.api_key.as_deref().map(redact);
        shown
    }

    /// Display config with secrets redacted.
    pub fn display_redacted(&self) -> String {
        let j = &self.judgment;
        let mut lines = vec!["[judgment]".to_string()];
        lines.push(format!("  endpoint = \"{}\"", j.endpoint));
        if let Some(ref key) = j.api_key {
            lines.push(format!("  api_key = \"{}\"", redact(key)));
        }
        if let Some(ref cmd) = j.api_key_command {
            lines.push(format!("  api_key_command = \"{}\"", cmd));
        }
        lines.push(format!("  timeout_secs = {}", j.timeout_secs));
        lines.push(format!("  retries = {}", j.retries));
        lines.push(format!("  backoff_ms = {}", j.backoff_ms));
        lines.push(format!("  batch_size = {}", j.batch_size));

        let e = &self.encode;
        lines.push("[encode]".to_string());
        lines.push(format!("  video_codec = \"{}\"", e.video_codec));
        lines.push(format!("  crf = {}", e.crf));
        lines.push(format!("  preset = \"{}\"", e.preset));
        lines.push(format!("  audio_codec = \"{}\"", e.audio_codec));
        lines.push(format!("  audio_bitrate = \"{}\"", e.audio_bitrate));

        let m = &self.media;
        lines.push("[media]".to_string());
        lines.push(format!("  ffmpeg = \"{}\"", m.ffmpeg));
        lines.push(format!("  ffprobe = \"{}\"", m.ffprobe));
        lines.push(format!("  workers = {}", m.workers));
        lines.push(format!("  work_dir = \"{}\"", m.work_dir().display()));
        lines.join("\n")
    }
}

fn redact(key: &str) -> String {
    if key.len() > 8 && key.is_char_boundary(4) && key.is_char_boundary(key.len() - 4) {
        format!("{}...{}", &key[..4], &key[key.len() - 4..])
    } else {
        "****".to_string()
    }
}

/// Resolve the service credential: CLI flag > env var > config key > config command.
///
/// Returns `None` when nothing is configured; local services need no key.
pub fn resolve_api_key(cli_flag: Option<&str>, config: &JudgmentConfig) -> Result<Option<String>> {
    // 1. CLI flag
    if let Some(key) = cli_flag.filter(|k| !k.is_empty()) {
        return Ok(Some(key.to_string()));
    }

    // 2. Environment variable
    if let Ok(val) = std::env::var(API_KEY_ENV) {
        if !val.is_empty() {
            return Ok(Some(val));
        }
    }

    // 3. Config file api_key
    if let Some(key) = config.api_key.as_deref().filter(|k| !k.is_empty()) {
        return Ok(Some(key.to_string()));
    }

    // 4. External command
    if let Some(cmd) = config.api_key_command.as_deref().filter(|c| !c.is_empty()) {
        let output = std::process::Command::new("sh")
            .arg("-c")
            .arg(cmd)
            .output()
            .with_context(|| format!("Failed to run api_key_command: {cmd}"))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!(
                "api_key_command failed (exit {}): {}",
                output.status.code().unwrap_or(-1),
                stderr.trim()
            );
        }

        let secret = String::from_utf8(output.stdout)
            .context("api_key_command output is not valid UTF-8")?
            .trim()
            .to_string();

        if !secret.is_empty() {
            return Ok(Some(secret));
        }
    }

    Ok(None)
}

/// Path to the config file: ~/.trimscript/config.toml
pub fn config_path() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home.join(".trimscript").join("config.toml"))
}

/// Default config template content.
pub fn default_config_template() -> &'static str {
    r#"# ~/.trimscript/config.toml
# Credential resolution order: CLI flag > TRIMSCRIPT_API_KEY > api_key > api_key_command

[judgment]
# endpoint = "http://localhost:5055/generate"
# api_key = "your-service-key"
# api_key_command = "your-secrets-manager-command-here"
# timeout_secs = 60
# retries = 2          # timeouts only, at most 2
# backoff_ms = 1000
# batch_size = 3       # transcript records per prompt
# instruction = "..."

[encode]
# video_codec = "libx264"
# crf = 23
# preset = "fast"
# audio_codec = "aac"
# audio_bitrate = "192k"

[media]
# ffmpeg = "ffmpeg"
# ffprobe = "ffprobe"
# workers = 1
# work_dir = "/tmp"
"#
}

/// Create the default config file if it doesn't already exist.
pub fn init_config() -> Result<bool> {
    let path = config_path()?;
    if path.exists() {
        return Ok(false);
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&path, default_config_template())?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_parses_to_defaults() {
        let config = TrimConfig::parse(default_config_template()).unwrap();
        assert_eq!(config.judgment.endpoint, judgment::DEFAULT_ENDPOINT);
        assert_eq!(config.encode, EncodeProfile::default());
        assert_eq!(config.media.workers, 1);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = TrimConfig::parse(
            "[judgment]\nretries = 9\nbatch_size = 0\n[encode]\ncrf = 18\n",
        )
        .unwrap();
        assert_eq!(config.encode.crf, 18);
        assert_eq!(config.encode.preset, "fast");

        let options = config.judgment.to_options(None);
        assert_eq!(options.retry.retries, MAX_RETRIES);
        assert_eq!(options.batch_size, 1);
        assert_eq!(options.timeout, Duration::from_secs(60));
    }

    #[test]
    fn redacts_api_keys() {
        let config = TrimConfig {
            judgment: JudgmentConfig {
                api_key: Some("sk-1234567890abcd".to_string()),
                ..JudgmentConfig::default()
            },
            ..TrimConfig::default()
        };
        let shown = config.display_redacted();
        assert!(shown.contains("sk-1...abcd"));
        assert!(!shown.contains("1234567890"));
    }

    #[test]
    fn json_view_masks_the_api_key() {
        let config = TrimConfig {
            judgment: JudgmentConfig {
                api_key: Some("sk-1234567890abcd".to_string()),
                ..JudgmentConfig::default()
            },
            ..TrimConfig::default()
        };
        let json = serde_json::to_string_pretty(&config.redacted()).unwrap();
        assert!(json.contains("sk-1...abcd"));
        assert!(!json.contains("1234567890"));
        assert_eq!(config.judgment.api_key.as_deref(), Some("sk-1234567890abcd"));
    }

    #[test]
    fn cli_flag_wins_then_config_command() {
        let config = JudgmentConfig {
            api_key_command: Some("echo from-command".to_string()),
            ..JudgmentConfig::default()
        };
        assert_eq!(
            resolve_api_key(Some("flag"), &config).unwrap().as_deref(),
            Some("flag")
        );
        if std::env::var(API_KEY_ENV).is_err() {
            assert_eq!(
                resolve_api_key(None, &config).unwrap().as_deref(),
                Some("from-command")
            );
        }
    }
}
