//! Batched dispatch to the corrector collaborator.
//!
//! Segments are grouped into fixed-size batches and corrected concurrently
//! up to a bounded number of in-flight calls. A batch that errors, times
//! out, or comes back with the wrong length falls back to its original
//! texts; sibling batches are unaffected and the request never fails here.

use std::collections::HashMap;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use tracing::{debug, warn};

use crate::corrector::Corrector;
use crate::segmenter::SentenceSegment;

/// Configuration for batch dispatch
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// Sentences per corrector call; smaller batches shrink the blast
    /// radius of a failed call
    pub batch_size: usize,
    /// Upper bound on concurrent corrector calls
    pub max_concurrent: usize,
    /// A batch exceeding this deadline falls back to its originals
    pub batch_timeout: Duration,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            batch_size: 5,
            max_concurrent: (num_cpus::get() / 2).max(1),
            batch_timeout: Duration::from_secs(30),
        }
    }
}

/// Correct all segments in batches.
///
/// The returned map holds exactly one entry per input segment index,
/// whatever the corrector does: failed batches map back to their original
/// texts, and a corrected text that comes back blank keeps the original.
pub async fn dispatch(
    corrector: &dyn Corrector,
    segments: &[SentenceSegment],
    config: &DispatchConfig,
) -> HashMap<usize, String> {
    let indexed: Vec<(usize, String)> = segments
        .iter()
        .enumerate()
        .filter(|(_, seg)| !seg.text.trim().is_empty())
        .map(|(idx, seg)| (idx, seg.text.clone()))
        .collect();

    let batch_size = config.batch_size.max(1);
    let batches: Vec<Vec<(usize, String)>> =
        indexed.chunks(batch_size).map(|chunk| chunk.to_vec()).collect();
    debug!(
        segments = segments.len(),
        batches = batches.len(),
        batch_size,
        "dispatching correction batches"
    );

    let results: Vec<Vec<(usize, String)>> = stream::iter(batches.into_iter().map(|batch| async move {
        let texts: Vec<String> = batch.iter().map(|(_, text)| text.clone()).collect();
        let corrected =
            match tokio::time::timeout(config.batch_timeout, corrector.correct_batch(&texts)).await
            {
                Ok(Ok(out)) if out.len() == texts.len() => out,
                Ok(Ok(out)) => {
                    warn!(
                        expected = texts.len(),
                        got = out.len(),
                        "corrector returned a mismatched batch; keeping originals"
                    );
                    texts.clone()
                }
                Ok(Err(e)) => {
                    warn!(error = %e, "batch correction failed; keeping originals");
                    texts.clone()
                }
                Err(_) => {
                    warn!(
                        timeout_ms = config.batch_timeout.as_millis() as u64,
                        "batch correction timed out; keeping originals"
                    );
                    texts.clone()
                }
            };

        batch
            .into_iter()
            .zip(corrected)
            .map(|((idx, original), corrected)| {
                let trimmed = corrected.trim();
                let text = if trimmed.is_empty() { original } else { trimmed.to_string() };
                (idx, text)
            })
            .collect::<Vec<_>>()
    }))
    .buffer_unordered(config.max_concurrent.max(1))
    .collect()
    .await;

    let mut map: HashMap<usize, String> = results.into_iter().flatten().collect();

    // Total coverage: every input index resolves, even for segments the
    // batching filter skipped
    for (idx, seg) in segments.iter().enumerate() {
        map.entry(idx).or_insert_with(|| seg.text.clone());
    }
    map
}
