//! Issue generation for one sentence pair.
//!
//! Turns the opcode stream for an (original, corrected) sentence pair into
//! [`GrammarCorrectionIssue`] values: classifies each non-equal opcode with
//! the first matching rule, anchors insertions to a neighboring token so the
//! displayed change reads as a natural unit, widens deletions over adjacent
//! function words, and converts sentence-local character offsets into global
//! document offsets with 1-based line/column coordinates.

use std::panic::{self, AssertUnwindSafe};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::diff::{diff_tokens, DiffTag};
use crate::error::Result;
use crate::offsets::{char_len, char_slice, offset_to_line_col};
use crate::rules::{ClassificationOutput, ClassificationRule, Severity};
use crate::tagger::{PosTag, TaggedDoc, Tagger, Token};

/// The externally visible unit of the engine: one addressable change between
/// the original document and its corrected counterpart
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrammarCorrectionIssue {
    pub offset: usize,
    pub length: usize,
    pub original_segment: String,
    pub suggested_segment: String,
    pub context_before: String,
    pub context_after: String,
    pub full_sentence_context: String,
    pub display_context: String,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub line: usize,
    pub column: usize,
    pub severity: Severity,
    pub explanation: String,
}

/// Tunables for issue generation
#[derive(Debug, Clone)]
pub struct IssueConfig {
    /// Characters of document context captured on each side of an issue
    pub context_chars: usize,
    /// Expansion bound for [`expand_span`]
    pub expand_max_tokens: usize,
}

impl Default for IssueConfig {
    fn default() -> Self {
        Self { context_chars: 25, expand_max_tokens: 1 }
    }
}

/// Direction in which [`expand_span`] may widen a token span
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpandDirection {
    Left,
    Right,
    Both,
}

fn is_expandable(token: &Token) -> bool {
    token.is_punct
        || matches!(
            token.pos,
            PosTag::Det | PosTag::Adp | PosTag::Cconj | PosTag::Sconj | PosTag::Part
        )
}

/// Widen the token span `[start, end)` over adjacent punctuation and
/// function words, pulling in at most `max_tokens` per direction
pub fn expand_span(
    tokens: &[Token],
    start: usize,
    end: usize,
    direction: ExpandDirection,
    max_tokens: usize,
) -> (usize, usize) {
    let mut new_start = start;
    let mut new_end = end;

    if matches!(direction, ExpandDirection::Left | ExpandDirection::Both) {
        for _ in 0..max_tokens {
            if new_start > 0 && is_expandable(&tokens[new_start - 1]) {
                new_start -= 1;
            } else {
                break;
            }
        }
    }

    if matches!(direction, ExpandDirection::Right | ExpandDirection::Both) {
        for _ in 0..max_tokens {
            if new_end < tokens.len() && is_expandable(&tokens[new_end]) {
                new_end += 1;
            } else {
                break;
            }
        }
    }

    (new_start, new_end)
}

/// First-match scan over the rule list.
///
/// Rules whose tag filter does not cover `tag` are skipped; a panicking
/// predicate counts as "does not match" so one bad rule can never fail the
/// request. Falls back to a fixed default when nothing matches.
pub fn classify_span(
    original: &[Token],
    corrected: &[Token],
    tag: DiffTag,
    rules: &[ClassificationRule],
) -> ClassificationOutput {
    for rule in rules {
        if !rule.tag_filter.matches(tag) {
            continue;
        }
        match panic::catch_unwind(AssertUnwindSafe(|| (rule.condition)(original, corrected, tag))) {
            Ok(true) => return rule.output.clone(),
            Ok(false) => {}
            Err(_) => warn!(rule = %rule.name, "classification rule panicked; skipping"),
        }
    }
    ClassificationOutput::new("Grammar", "Unclassified change.", Severity::Low, "No matching rule.")
}

/// Diff one sentence pair and emit issues with global document offsets
pub fn generate_issues_for_sentence(
    original_sentence: &str,
    corrected_sentence: &str,
    global_offset_start: usize,
    full_text: &str,
    tagger: &dyn Tagger,
    rules: &[ClassificationRule],
    config: &IssueConfig,
) -> Result<Vec<GrammarCorrectionIssue>> {
    let original_doc = tagger.tag(original_sentence)?;
    let corrected_doc = tagger.tag(corrected_sentence)?;

    let original_texts: Vec<&str> =
        original_doc.tokens.iter().map(|t| t.text.as_str()).collect();
    let corrected_texts: Vec<&str> =
        corrected_doc.tokens.iter().map(|t| t.text.as_str()).collect();

    let mut issues = Vec::new();

    for opcode in diff_tokens(&original_texts, &corrected_texts) {
        if opcode.tag == DiffTag::Equal {
            continue;
        }

        let (i1, i2) = opcode.orig;
        let (j1, j2) = opcode.corr;
        let orig_span = &original_doc.tokens[i1..i2];
        let corr_span = &corrected_doc.tokens[j1..j2];

        let (original_segment, suggested_segment, start, length) = match opcode.tag {
            DiffTag::Insert => insert_anchor(&original_doc, &corrected_doc, i1, j1, j2),
            DiffTag::Replace => {
                let original_segment = original_doc.span_text(i1, i2).trim().to_string();
                let suggested_segment = corrected_doc.span_text(j1, j2).trim().to_string();
                let start = original_doc.tokens[i1].idx;
                let length = char_len(&original_segment);
                (original_segment, suggested_segment, start, length)
            }
            DiffTag::Delete => {
                // Pull in a leading function word so the removal reads as a
                // unit; what survives the deletion becomes the suggestion
                let (new_i1, _) = expand_span(
                    &original_doc.tokens,
                    i1,
                    i2,
                    ExpandDirection::Left,
                    config.expand_max_tokens,
                );
                let original_segment = original_doc.span_text(new_i1, i2).trim().to_string();
                let suggested_segment = original_doc.span_text(new_i1, i1).trim().to_string();
                let start = original_doc.tokens[new_i1].idx;
                let length = char_len(&original_segment);
                (original_segment, suggested_segment, start, length)
            }
            DiffTag::Equal => unreachable!(),
        };

        let mut output = classify_span(orig_span, corr_span, opcode.tag, rules);

        // Appending a bare period is always a punctuation fix, whatever the
        // rule scan decided
        if matches!(opcode.tag, DiffTag::Replace | DiffTag::Insert)
            && !original_segment.is_empty()
            && suggested_segment == format!("{original_segment}.")
        {
            output = ClassificationOutput::new(
                "Punctuation",
                "Punctuation correction.",
                Severity::Low,
                "A punctuation mark was added.",
            );
        }

        let global_offset = global_offset_start + start;
        let (line, column) = offset_to_line_col(full_text, global_offset);
        let total_chars = char_len(full_text);
        let context_before = char_slice(
            full_text,
            global_offset.saturating_sub(config.context_chars),
            global_offset,
        )
        .to_string();
        let context_after = char_slice(
            full_text,
            global_offset + length,
            (global_offset + length + config.context_chars).min(total_chars),
        )
        .to_string();

        issues.push(GrammarCorrectionIssue {
            offset: global_offset,
            length,
            display_context: format!("[{original_segment}] → {suggested_segment}"),
            original_segment,
            suggested_segment,
            context_before,
            context_after,
            full_sentence_context: original_sentence.to_string(),
            message: output.message,
            kind: output.kind,
            line,
            column,
            severity: output.severity,
            explanation: output.explanation,
        });
    }

    Ok(merge_overlapping(issues, full_text))
}

/// Pick the anchor token and compose the displayed before/after for an
/// insertion at original token index `i1`.
///
/// Punctuation-only insertions attach to the preceding token without a
/// space; word insertions attach with a space, or to the following token at
/// the sentence start. With no tokens to anchor on, the issue degenerates to
/// a zero-length insertion point.
fn insert_anchor(
    original_doc: &TaggedDoc,
    corrected_doc: &TaggedDoc,
    i1: usize,
    j1: usize,
    j2: usize,
) -> (String, String, usize, usize) {
    let inserted = corrected_doc.span_text(j1, j2);
    let punct_only = corrected_doc.tokens[j1..j2].iter().all(|t| t.is_punct);
    let tokens = &original_doc.tokens;

    if punct_only && i1 > 0 {
        let before = &tokens[i1 - 1];
        let original_segment = before.text.clone();
        let suggested_segment = format!("{}{inserted}", before.text);
        let length = char_len(&original_segment);
        (original_segment, suggested_segment, before.idx, length)
    } else if !punct_only && i1 > 0 {
        let before = &tokens[i1 - 1];
        let original_segment = before.text.clone();
        let suggested_segment = format!("{} {inserted}", before.text);
        let length = char_len(&original_segment);
        (original_segment, suggested_segment, before.idx, length)
    } else if !punct_only && i1 < tokens.len() {
        let after = &tokens[i1];
        let original_segment = after.text.clone();
        let suggested_segment = format!("{inserted} {}", after.text);
        let length = char_len(&original_segment);
        (original_segment, suggested_segment, after.idx, length)
    } else {
        let start = if i1 > 0 { tokens[i1 - 1].end_idx() } else { 0 };
        (String::new(), inserted.to_string(), start, 0)
    }
}

/// Coalesce overlapping expanded spans within one sentence.
///
/// Bounded expansion can only overlap when a later opcode anchors on a token
/// an earlier issue already covers and purely appends to it (a Replace at
/// sentence end followed by a period insertion on the same token). Such a
/// pair merges into one issue over the union range, keeping the earlier
/// classification; any other overlap is left as separate issues.
fn merge_overlapping(
    issues: Vec<GrammarCorrectionIssue>,
    full_text: &str,
) -> Vec<GrammarCorrectionIssue> {
    let mut merged: Vec<GrammarCorrectionIssue> = Vec::with_capacity(issues.len());

    for issue in issues {
        let Some(prev) = merged.last_mut() else {
            merged.push(issue);
            continue;
        };
        let overlaps = issue.offset < prev.offset + prev.length;
        let appended = issue
            .suggested_segment
            .strip_prefix(issue.original_segment.as_str())
            .filter(|rest| !rest.is_empty() && !issue.original_segment.is_empty());
        if let (true, Some(rest)) = (overlaps, appended) {
            let new_end = (prev.offset + prev.length).max(issue.offset + issue.length);
            prev.suggested_segment.push_str(rest);
            prev.length = new_end - prev.offset;
            prev.original_segment =
                char_slice(full_text, prev.offset, new_end).to_string();
            prev.display_context =
                format!("[{}] → {}", prev.original_segment, prev.suggested_segment);
        } else {
            merged.push(issue);
        }
    }

    merged
}
