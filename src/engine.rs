//! Top-level correction engine.
//!
//! Owns the immutable collaborators (tagger, corrector, rule sets) and runs
//! the whole pipeline for one request: segment, dispatch, diff, classify,
//! and assemble the document-ordered issue list plus the reconstructed
//! corrected document.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::corrector::Corrector;
use crate::dispatcher::{dispatch, DispatchConfig};
use crate::error::{EngineError, Result};
use crate::issue::{generate_issues_for_sentence, GrammarCorrectionIssue, IssueConfig};
use crate::offsets::{char_len, char_slice};
use crate::rules::{apply_post_rules, RuleSet};
use crate::segmenter::segment_text;
use crate::tagger::Tagger;

/// Engine configuration; constructed once and shared across requests
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub dispatch: DispatchConfig,
    pub issue: IssueConfig,
    /// Run the post-processing rules over corrected text before diffing.
    /// Off by default: normalization is an explicitly requested step.
    pub apply_post_rules: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            dispatch: DispatchConfig::default(),
            issue: IssueConfig::default(),
            apply_post_rules: false,
        }
    }
}

/// Result of one correction request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrectionOutcome {
    pub original_text: String,
    pub corrected_text_suggestion: String,
    pub issues: Vec<GrammarCorrectionIssue>,
}

/// The grammar-correction diff & classification engine.
///
/// Holds no mutable state; safe to share behind an `Arc` across concurrent
/// requests.
pub struct GrammarEngine {
    tagger: Arc<dyn Tagger>,
    corrector: Arc<dyn Corrector>,
    rules: RuleSet,
    config: EngineConfig,
}

impl GrammarEngine {
    pub fn new(
        tagger: Arc<dyn Tagger>,
        corrector: Arc<dyn Corrector>,
        rules: RuleSet,
        config: EngineConfig,
    ) -> Self {
        info!(
            classification_rules = rules.classification.len(),
            post_rules = rules.post.len(),
            "constructed grammar engine"
        );
        Self { tagger, corrector, rules, config }
    }

    /// Correct `text` and return the reconstructed document plus the
    /// document-ordered issue list.
    ///
    /// Empty input is an error; a failing corrector degrades to "no
    /// suggestion" per batch; only an unavailable tagger fails the request.
    pub async fn correct(&self, text: &str) -> Result<CorrectionOutcome> {
        if text.trim().is_empty() {
            return Err(EngineError::InputEmpty);
        }

        let segments = segment_text(self.tagger.as_ref(), text)?;
        let corrected_map =
            dispatch(self.corrector.as_ref(), &segments, &self.config.dispatch).await;

        let mut issues: Vec<GrammarCorrectionIssue> = Vec::new();
        let mut corrected_doc = String::new();
        let mut prev_end = 0usize;

        for (idx, seg) in segments.iter().enumerate() {
            let corrected = corrected_map
                .get(&idx)
                .cloned()
                .unwrap_or_else(|| seg.text.clone());
            let corrected = if self.config.apply_post_rules {
                apply_post_rules(&self.rules.post, &corrected)
            } else {
                corrected
            };

            // Keep the original inter-segment whitespace around the
            // corrected sentence
            corrected_doc.push_str(char_slice(text, prev_end, seg.start));
            corrected_doc.push_str(&corrected);
            prev_end = seg.end;

            issues.extend(generate_issues_for_sentence(
                &seg.text,
                &corrected,
                seg.start,
                text,
                self.tagger.as_ref(),
                &self.rules.classification,
                &self.config.issue,
            )?);
        }
        corrected_doc.push_str(char_slice(text, prev_end, char_len(text)));

        // Batches complete in arbitrary order but issues are built per
        // segment in document order; the sort re-establishes global order
        // and is stable for issues sharing an offset
        issues.sort_by_key(|issue| issue.offset);

        debug!(segments = segments.len(), issues = issues.len(), "assembled correction outcome");
        Ok(CorrectionOutcome {
            original_text: text.to_string(),
            corrected_text_suggestion: corrected_doc,
            issues,
        })
    }
}
