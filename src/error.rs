use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Crate-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// The external media-tool operation that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolOperation {
    Probe,
    Extract,
    Concatenate,
}

impl ToolOperation {
    pub fn as_str(&self) -> &str {
        match self {
            ToolOperation::Probe => "probe",
            ToolOperation::Extract => "extract",
            ToolOperation::Concatenate => "concatenate",
        }
    }
}

impl fmt::Display for ToolOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a delegated-judgment call did not produce verdicts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceFailure {
    #[error("timed out after {attempts} attempt(s)")]
    Timeout { attempts: u32 },

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("service unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("malformed timestamp {input:?}: {reason}")]
    MalformedTimestamp { input: String, reason: String },

    #[error("cannot read transcript {}: {source}", path.display())]
    UnreadableTranscript {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot read {}: {source}", path.display())]
    UnreadableInput {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("segment plan is empty; nothing to render")]
    EmptyPlan,

    #[error("{operation} failed: {diagnostic}")]
    ExternalToolFailure {
        operation: ToolOperation,
        diagnostic: String,
    },

    #[error("classifier service failure: {0}")]
    ClassifierServiceFailure(#[from] ServiceFailure),

    #[error("invalid interval [{start}, {end}]: {reason}")]
    InvalidInterval { start: f64, end: f64, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn malformed_timestamp(input: &str, reason: impl Into<String>) -> Self {
        Self::MalformedTimestamp {
            input: input.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_interval(start: f64, end: f64, reason: impl Into<String>) -> Self {
        Self::InvalidInterval {
            start,
            end,
            reason: reason.into(),
        }
    }

    pub(crate) fn tool(operation: ToolOperation, diagnostic: impl Into<String>) -> Self {
        Self::ExternalToolFailure {
            operation,
            diagnostic: diagnostic.into(),
        }
    }

    /// The pipeline stage this error aborted.
    pub fn stage(&self) -> &str {
        match self {
            Error::MalformedTimestamp { .. } | Error::UnreadableTranscript { .. } => "transcript",
            Error::UnreadableInput { .. } => "input",
            Error::ClassifierServiceFailure(_) => "classify",
            Error::InvalidInterval { .. } | Error::EmptyPlan => "plan",
            Error::ExternalToolFailure { operation, .. } => operation.as_str(),
            Error::Io(_) => "io",
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Error::ClassifierServiceFailure(ServiceFailure::Timeout { .. })
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_names_follow_the_failing_step() {
        assert_eq!(Error::EmptyPlan.stage(), "plan");
        assert_eq!(Error::tool(ToolOperation::Extract, "boom").stage(), "extract");
        assert_eq!(
            Error::from(ServiceFailure::Timeout { attempts: 3 }).stage(),
            "classify"
        );
        assert_eq!(Error::malformed_timestamp("x", "bad").stage(), "transcript");
    }

    #[test]
    fn tool_failure_keeps_diagnostic_verbatim() {
        let err = Error::tool(ToolOperation::Concatenate, "Invalid data found when processing input");
        assert_eq!(
            err.to_string(),
            "concatenate failed: Invalid data found when processing input"
        );
    }
}
