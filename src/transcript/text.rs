use crate::transcript::TranscriptRecord;

/// Render records as plain text: one record per line, timestamps dropped.
pub fn to_plain_text(records: &[TranscriptRecord]) -> String {
    records
        .iter()
        .map(|r| r.text.trim())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcript::parse_content;

    #[test]
    fn strips_timing_and_headers() {
        let records = parse_content(
            "WEBVTT\n\n00:00:01.000 --> 00:00:02.000\nhello\nworld\n\n00:00:02.000 --> 00:00:03.000\nagain\n",
        )
        .unwrap();
        assert_eq!(to_plain_text(&records), "hello world\nagain");
    }
}
