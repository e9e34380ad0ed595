use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use tracing::debug;

use crate::classify::retry::RetryPolicy;
use crate::classify::Classifier;
use crate::error::{Error, Result, ServiceFailure};
use crate::transcript::{timestamp, TranscriptRecord};

pub const DEFAULT_ENDPOINT: &str = "http://localhost:5055/generate";
pub const DEFAULT_INSTRUCTION: &str = "Review the transcript excerpts below. For every excerpt that \
promotes a product, thanks viewers for gifts, or otherwise violates the removal policy, output its \
time range as `start --> end`. Separate multiple ranges with commas. If nothing violates the \
policy, reply with nothing.";
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a transcript screening assistant. Judge each \
excerpt against the given condition and reply only with what is asked, without greetings or \
explanations.";

/// Matching tolerance for a returned start against a record's start.
const START_TOLERANCE: f64 = 0.001;

static RESPONSE_TIME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\d+(?::\d+){1,2}(?:\.\d+)?").expect("response timestamp pattern")
});

/// Settings for the delegated-judgment strategy.
#[derive(Debug, Clone)]
pub struct JudgmentOptions {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
    pub retry: RetryPolicy,
    pub batch_size: usize,
    pub instruction: String,
    pub system_prompt: String,
}

impl Default for JudgmentOptions {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key: None,
            timeout: Duration::from_secs(60),
            retry: RetryPolicy::default(),
            batch_size: 3,
            instruction: DEFAULT_INSTRUCTION.to_string(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
        }
    }
}

/// Sends batches of excerpts to an external text-classification service and
/// maps the time ranges it returns back onto records.
///
/// The HTTP client lives as long as this value; build one per run.
pub struct JudgmentClassifier {
    options: JudgmentOptions,
    client: reqwest::blocking::Client,
}

impl JudgmentClassifier {
    pub fn new(options: JudgmentOptions) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(options.timeout)
            .build()
            .map_err(|e| ServiceFailure::Unavailable(format!("cannot build HTTP client: {e}")))?;
        Ok(Self { options, client })
    }

    pub fn build_prompt(&self, batch: &[TranscriptRecord]) -> String {
        let mut prompt = self.options.instruction.trim().to_string();
        prompt.push_str("\n\ntranscripts:\n");
        for r in batch {
            prompt.push_str(&format!(
                "[{} --> {}] {}\n",
                timestamp::format(r.start),
                timestamp::format(r.end),
                r.text
            ));
        }
        prompt
    }

    fn request_once(&self, body: &serde_json::Value) -> Result<String> {
        let mut request = self.client.post(&self.options.endpoint).json(body);
        if let Some(ref key) = self.options.api_key {
            request = request.header("Authorization", format!("Bearer {key}"));
        }

        let resp = request.send().map_err(transport_failure)?;
        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().unwrap_or_default();
            return Err(ServiceFailure::Unavailable(format!("service returned {status}: {text}")).into());
        }

        let json: serde_json::Value = resp.json().map_err(|e| {
            if e.is_timeout() {
                transport_failure(e)
            } else {
                ServiceFailure::Malformed(format!("response is not JSON: {e}")).into()
            }
        })?;

        json.get("response")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| {
                ServiceFailure::Malformed("missing string field `response`".to_string()).into()
            })
    }
}

impl Classifier for JudgmentClassifier {
    fn name(&self) -> &str {
        "judgment"
    }

    fn batch_size(&self) -> usize {
        self.options.batch_size.max(1)
    }

    fn classify_batch(&self, batch: &[TranscriptRecord]) -> Result<Vec<bool>> {
        let body = serde_json::json!({
            "prompt": self.build_prompt(batch),
            "system": self.options.system_prompt,
        });
        let reply = self.options.retry.run(|| self.request_once(&body))?;
        debug!("Judgment reply: {}", reply.trim());
        let ranges = parse_flagged_ranges(&reply)?;
        Ok(batch.iter().map(|r| is_flagged(r, &ranges)).collect())
    }
}

fn transport_failure(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        ServiceFailure::Timeout { attempts: 1 }.into()
    } else {
        ServiceFailure::Unavailable(e.to_string()).into()
    }
}

/// Recover flagged `(start, end)` ranges from the service's reply text.
///
/// An empty reply means nothing was flagged. Items are separated by commas,
/// semicolons or newlines. Within an item, timestamps pair up into ranges in
/// order of appearance and a leftover timestamp is a point. A non-empty reply
/// with no timestamps is malformed.
pub fn parse_flagged_ranges(reply: &str) -> std::result::Result<Vec<(f64, f64)>, ServiceFailure> {
    let trimmed = reply.trim();
    if trimmed.is_empty() || trimmed == "[]" || trimmed.eq_ignore_ascii_case("none") {
        return Ok(Vec::new());
    }

    let mut ranges = Vec::new();
    for item in trimmed.split([',', ';', '\n', '，', '；']) {
        let times = RESPONSE_TIME_RE
            .find_iter(item)
            .map(|m| timestamp::parse(m.as_str()))
            .collect::<Result<Vec<f64>>>()
            .map_err(|e| ServiceFailure::Malformed(e.to_string()))?;
        if times.is_empty() {
            debug!("Ignoring reply item without timestamps: {}", item.trim());
        }
        // Consecutive pairs are ranges; an odd trailing timestamp is a point.
        for pair in times.chunks(2) {
            match *pair {
                [t] => ranges.push((t, t)),
                [a, b] => ranges.push((a.min(b), a.max(b))),
                _ => {}
            }
        }
    }

    if ranges.is_empty() {
        return Err(ServiceFailure::Malformed(format!(
            "no time ranges found in reply: {}",
            truncate_reply(trimmed)
        )));
    }
    Ok(ranges)
}

/// A record is flagged when a range starts with it or reaches into its interior.
fn is_flagged(record: &TranscriptRecord, ranges: &[(f64, f64)]) -> bool {
    ranges.iter().any(|&(a, b)| {
        (a - record.start).abs() <= START_TOLERANCE
            || (a < record.end - START_TOLERANCE && b > record.start + START_TOLERANCE)
    })
}

fn truncate_reply(reply: &str) -> String {
    const MAX: usize = 120;
    if reply.chars().count() <= MAX {
        reply.to_string()
    } else {
        format!("{}...", reply.chars().take(MAX).collect::<String>())
    }
}
