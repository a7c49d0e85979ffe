//! Offset-preserving sentence segmentation.
//!
//! Splits a document into sentence segments whose offsets index the original
//! text exactly. Boundaries come from the tagging collaborator; if it is
//! unavailable the request fails rather than guessing boundaries, since a
//! guessed split would corrupt every downstream offset silently.

use tracing::debug;

use crate::error::{EngineError, Result};
use crate::offsets::char_slice;
use crate::tagger::Tagger;

/// One sentence-equivalent unit of the input document.
///
/// `start`/`end` are half-open character offsets into the original document;
/// `text` equals `document[start..end]` with surrounding whitespace excluded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentenceSegment {
    pub text: String,
    pub start: usize,
    pub end: usize,
}

/// Split `text` into ordered, non-overlapping sentence segments.
///
/// Whitespace-only input yields an empty list. Any tagger failure surfaces
/// as [`EngineError::DependencyUnavailable`].
pub fn segment_text(tagger: &dyn Tagger, text: &str) -> Result<Vec<SentenceSegment>> {
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }

    let doc = tagger
        .tag(text)
        .map_err(|e| EngineError::DependencyUnavailable(format!("sentence tagging failed: {e}")))?;

    let mut segments = Vec::with_capacity(doc.sentences.len());
    for &(raw_start, raw_end) in &doc.sentences {
        let raw = char_slice(text, raw_start, raw_end);
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            continue;
        }
        // Tighten offsets to the trimmed content so text == document[start..end]
        let lead: usize = raw.chars().take_while(|c| c.is_whitespace()).count();
        let trail: usize = raw.chars().rev().take_while(|c| c.is_whitespace()).count();
        segments.push(SentenceSegment {
            text: trimmed.to_string(),
            start: raw_start + lead,
            end: raw_end - trail,
        });
    }

    debug!(segments = segments.len(), "segmented input text");
    Ok(segments)
}
