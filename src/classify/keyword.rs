use std::path::Path;

use crate::classify::Classifier;
use crate::error::{Error, Result};
use crate::transcript::TranscriptRecord;

/// Flags records whose text contains any keyword (case-sensitive substring).
#[derive(Debug, Clone)]
pub struct KeywordClassifier {
    keywords: Vec<String>,
}

impl KeywordClassifier {
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keywords: keywords
                .into_iter()
                .map(Into::into)
                .filter(|k: &String| !k.is_empty())
                .collect(),
        }
    }

    /// Load a newline-separated keyword list. Blank lines are ignored.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| Error::UnreadableInput {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::new(
            content.lines().map(str::trim).filter(|l| !l.is_empty()),
        ))
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    pub fn classify(&self, record: &TranscriptRecord) -> bool {
        self.keywords.iter().any(|k| record.text.contains(k.as_str()))
    }
}

impl Classifier for KeywordClassifier {
    fn name(&self) -> &str {
        "keywords"
    }

    fn classify_batch(&self, batch: &[TranscriptRecord]) -> Result<Vec<bool>> {
        Ok(batch.iter().map(|r| self.classify(r)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn record(text: &str) -> TranscriptRecord {
        TranscriptRecord {
            start: 0.0,
            end: 1.0,
            text: text.to_string(),
        }
    }

    #[test]
    fn flags_substring_matches() {
        let classifier = KeywordClassifier::new(["spam"]);
        assert!(classifier.classify(&record("buy my spam product")));
        assert!(!classifier.classify(&record("hello")));
    }

    #[test]
    fn matching_is_case_sensitive() {
        let classifier = KeywordClassifier::new(["G"]);
        assert!(classifier.classify(&record("a big G moment")));
        assert!(!classifier.classify(&record("a big g moment")));
    }

    #[test]
    fn loads_list_skipping_blank_lines() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "high quality\n\n  high-level  \r\n").unwrap();
        let classifier = KeywordClassifier::load(file.path()).unwrap();
        assert_eq!(classifier.keywords(), ["high quality", "high-level"]);
    }

    #[test]
    fn empty_list_flags_nothing() {
        let classifier = KeywordClassifier::new(Vec::<String>::new());
        assert!(!classifier.classify(&record("anything")));
    }

    #[test]
    fn missing_list_is_unreadable_input() {
        let err = KeywordClassifier::load(Path::new("/no/such/keywords.txt")).unwrap_err();
        assert!(matches!(err, Error::UnreadableInput { .. }));
    }
}
