pub mod judgment;
pub mod keyword;
pub mod retry;

use serde::Serialize;
use tracing::{debug, info};

use crate::error::{Error, Result, ServiceFailure};
use crate::transcript::TranscriptRecord;

/// A transcript record with its policy verdict.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassifiedRecord {
    #[serde(flatten)]
    pub record: TranscriptRecord,
    pub flagged: bool,
}

/// Trait every classification strategy implements.
///
/// A verdict for one record never depends on another record's verdict, even
/// when records are sent to a strategy in batches.
pub trait Classifier {
    /// Strategy name, used in logs and reports.
    fn name(&self) -> &str;

    /// How many records to hand to `classify_batch` at once.
    fn batch_size(&self) -> usize {
        1
    }

    /// One verdict per record, in the same order as `batch`.
    fn classify_batch(&self, batch: &[TranscriptRecord]) -> Result<Vec<bool>>;
}

/// Classify every record, batching as the strategy asks.
pub fn classify_all(
    classifier: &dyn Classifier,
    records: &[TranscriptRecord],
) -> Result<Vec<ClassifiedRecord>> {
    let batch_size = classifier.batch_size().max(1);
    let mut classified = Vec::with_capacity(records.len());

    for batch in records.chunks(batch_size) {
        let verdicts = classifier.classify_batch(batch)?;
        if verdicts.len() != batch.len() {
            return Err(Error::ClassifierServiceFailure(ServiceFailure::Malformed(format!(
                "{} returned {} verdicts for {} records",
                classifier.name(),
                verdicts.len(),
                batch.len()
            ))));
        }
        for (record, flagged) in batch.iter().zip(verdicts) {
            if flagged {
                debug!("Flagged [{:.3}, {:.3}]: {}", record.start, record.end, record.text);
            }
            classified.push(ClassifiedRecord {
                record: record.clone(),
                flagged,
            });
        }
    }

    let flagged = classified.iter().filter(|c| c.flagged).count();
    info!(
        "{} flagged {} of {} records",
        classifier.name(),
        flagged,
        classified.len()
    );
    Ok(classified)
}
