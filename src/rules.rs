//! Rule definitions and loading.
//!
//! Two rule families are loaded from declarative JSON files and held
//! immutably for the process lifetime: post-processing regex rules that
//! normalize corrected text before diffing, and classification rules that
//! assign semantic meaning to diff opcodes. Classification conditions are
//! referenced by name and resolved against a fixed registry of compiled-in
//! predicates; the rule file never carries executable code.

use std::fs;
use std::path::Path;

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::diff::DiffTag;
use crate::error::{EngineError, Result};
use crate::tagger::{PosTag, Token};

/// Issue severity, serialized lowercase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

/// Classification result attached to an issue
#[derive(Debug, Clone)]
pub struct ClassificationOutput {
    pub kind: String,
    pub message: String,
    pub severity: Severity,
    pub explanation: String,
}

impl ClassificationOutput {
    pub fn new(
        kind: impl Into<String>,
        message: impl Into<String>,
        severity: Severity,
        explanation: impl Into<String>,
    ) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
            severity,
            explanation: explanation.into(),
        }
    }
}

/// Which opcode tags a classification rule applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagFilter {
    Any,
    Only(DiffTag),
}

impl TagFilter {
    pub fn matches(&self, tag: DiffTag) -> bool {
        match self {
            TagFilter::Any => true,
            TagFilter::Only(t) => *t == tag,
        }
    }
}

/// Predicate over the original span, corrected span, and opcode tag
pub type ConditionFn = fn(&[Token], &[Token], DiffTag) -> bool;

/// One classification rule; rules are evaluated in declaration order and the
/// first match wins
#[derive(Clone)]
pub struct ClassificationRule {
    pub name: String,
    pub condition: ConditionFn,
    pub output: ClassificationOutput,
    pub tag_filter: TagFilter,
}

impl std::fmt::Debug for ClassificationRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassificationRule")
            .field("name", &self.name)
            .field("tag_filter", &self.tag_filter)
            .field("kind", &self.output.kind)
            .finish()
    }
}

/// One post-processing substitution; flags are folded into the compiled
/// pattern at load time
#[derive(Debug, Clone)]
pub struct RegexRule {
    pub pattern: Regex,
    pub replacement: String,
}

/// Immutable rule configuration shared across requests
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    pub post: Vec<RegexRule>,
    pub classification: Vec<ClassificationRule>,
}

impl RuleSet {
    /// Compiled-in defaults: the stock classification rules plus cosmetic
    /// whitespace normalization
    pub fn builtin() -> Self {
        Self {
            post: default_post_rules(),
            classification: default_classification_rules(),
        }
    }

    /// Load rules from optional JSON files; a missing classification file
    /// (or an empty one) falls back to a single catch-all rule so the
    /// classifier always produces an answer
    pub fn from_files(
        classification: Option<&Path>,
        post_processing: Option<&Path>,
    ) -> Result<Self> {
        let mut set = RuleSet::default();
        if let Some(path) = post_processing {
            set.post = load_post_rules(path)?;
        }
        if let Some(path) = classification {
            set.classification = load_classification_rules(path)?;
        }
        if set.classification.is_empty() {
            warn!("no classification rules loaded; adding a default fallback rule");
            set.classification.push(fallback_rule());
        }
        Ok(set)
    }
}

/// Apply post-processing rules as ordered substitutions
pub fn apply_post_rules(rules: &[RegexRule], text: &str) -> String {
    let mut out = text.to_string();
    for rule in rules {
        out = rule.pattern.replace_all(&out, rule.replacement.as_str()).into_owned();
    }
    out
}

// --- Conditions ---

fn always_true(_original: &[Token], _corrected: &[Token], _tag: DiffTag) -> bool {
    true
}

fn is_single_token_replace_and_contraction_apostrophe_missing(
    original: &[Token],
    corrected: &[Token],
    _tag: DiffTag,
) -> bool {
    original.len() == 1
        && corrected.len() == 1
        && corrected[0].text.contains('\'')
        && !original[0].text.contains('\'')
        && matches!(original[0].pos, PosTag::Aux | PosTag::Verb | PosTag::Pron)
}

fn is_single_token_replace_and_punctuation_change(
    original: &[Token],
    corrected: &[Token],
    _tag: DiffTag,
) -> bool {
    original.len() == 1
        && corrected.len() == 1
        && original.iter().any(|t| t.is_punct)
        && corrected.iter().any(|t| t.is_punct)
}

fn is_its_to_its_contraction(original: &[Token], corrected: &[Token], _tag: DiffTag) -> bool {
    original.len() == 1
        && corrected.len() == 1
        && original[0].text.to_lowercase() == "its"
        && corrected[0].text.to_lowercase() == "it's"
}

fn is_its_contraction_to_its_possessive(
    original: &[Token],
    corrected: &[Token],
    _tag: DiffTag,
) -> bool {
    original.len() == 1
        && corrected.len() == 1
        && original[0].text.to_lowercase() == "it's"
        && corrected[0].text.to_lowercase() == "its"
}

fn is_single_token_case_change(original: &[Token], corrected: &[Token], _tag: DiffTag) -> bool {
    original.len() == 1
        && corrected.len() == 1
        && original[0].text != corrected[0].text
        && original[0].text.to_lowercase() == corrected[0].text.to_lowercase()
}

fn is_article_replacement(original: &[Token], corrected: &[Token], _tag: DiffTag) -> bool {
    const ARTICLES: [&str; 3] = ["a", "an", "the"];
    original.len() == 1
        && corrected.len() == 1
        && ARTICLES.contains(&original[0].text.to_lowercase().as_str())
        && ARTICLES.contains(&corrected[0].text.to_lowercase().as_str())
}

/// Fixed registry of predicate implementations; rule files reference these
/// by name and unknown names are rejected at load time
pub fn resolve_condition(name: &str) -> Option<ConditionFn> {
    match name {
        "always_true" => Some(always_true),
        "is_single_token_replace_and_contraction_apostrophe_missing" => {
            Some(is_single_token_replace_and_contraction_apostrophe_missing)
        }
        "is_single_token_replace_and_punctuation_change" => {
            Some(is_single_token_replace_and_punctuation_change)
        }
        "is_its_to_its_contraction" => Some(is_its_to_its_contraction),
        "is_its_contraction_to_its_possessive" => Some(is_its_contraction_to_its_possessive),
        "is_single_token_case_change" => Some(is_single_token_case_change),
        "is_article_replacement" => Some(is_article_replacement),
        _ => None,
    }
}

fn fallback_rule() -> ClassificationRule {
    ClassificationRule {
        name: "always_true".to_string(),
        condition: always_true,
        output: ClassificationOutput::new(
            "Grammar",
            "Unclassified change.",
            Severity::Low,
            "No explanation available.",
        ),
        tag_filter: TagFilter::Any,
    }
}

fn default_classification_rules() -> Vec<ClassificationRule> {
    vec![
        ClassificationRule {
            name: "is_its_to_its_contraction".to_string(),
            condition: is_its_to_its_contraction,
            output: ClassificationOutput::new(
                "Grammar",
                "Use the contraction \"it's\".",
                Severity::Medium,
                "\"It's\" is the contraction of \"it is\"; \"its\" is possessive.",
            ),
            tag_filter: TagFilter::Only(DiffTag::Replace),
        },
        ClassificationRule {
            name: "is_its_contraction_to_its_possessive".to_string(),
            condition: is_its_contraction_to_its_possessive,
            output: ClassificationOutput::new(
                "Grammar",
                "Use the possessive \"its\".",
                Severity::Medium,
                "\"Its\" marks possession; \"it's\" means \"it is\".",
            ),
            tag_filter: TagFilter::Only(DiffTag::Replace),
        },
        ClassificationRule {
            name: "is_single_token_replace_and_contraction_apostrophe_missing".to_string(),
            condition: is_single_token_replace_and_contraction_apostrophe_missing,
            output: ClassificationOutput::new(
                "Spelling",
                "Missing apostrophe in contraction.",
                Severity::Medium,
                "Contractions need an apostrophe where letters are omitted.",
            ),
            tag_filter: TagFilter::Only(DiffTag::Replace),
        },
        ClassificationRule {
            name: "is_single_token_replace_and_punctuation_change".to_string(),
            condition: is_single_token_replace_and_punctuation_change,
            output: ClassificationOutput::new(
                "Punctuation",
                "Punctuation change.",
                Severity::Low,
                "A punctuation mark was replaced.",
            ),
            tag_filter: TagFilter::Only(DiffTag::Replace),
        },
        ClassificationRule {
            name: "is_single_token_case_change".to_string(),
            condition: is_single_token_case_change,
            output: ClassificationOutput::new(
                "Capitalization",
                "Capitalization change.",
                Severity::Low,
                "Only the letter case of this word changed.",
            ),
            tag_filter: TagFilter::Only(DiffTag::Replace),
        },
        ClassificationRule {
            name: "is_article_replacement".to_string(),
            condition: is_article_replacement,
            output: ClassificationOutput::new(
                "Grammar",
                "Article choice.",
                Severity::Low,
                "A different article fits this noun phrase.",
            ),
            tag_filter: TagFilter::Only(DiffTag::Replace),
        },
    ]
}

fn default_post_rules() -> Vec<RegexRule> {
    // Collapse runs of spaces and drop space before closing punctuation;
    // both are common cosmetic artifacts of sequence models
    let raw = [(" {2,}", " "), (r" +([,.;:!?])", "$1")];
    raw.iter()
        .map(|(pattern, replacement)| RegexRule {
            pattern: Regex::new(pattern).expect("builtin pattern is valid"),
            replacement: (*replacement).to_string(),
        })
        .collect()
}

// --- Rule file loading ---

#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: serde::de::Deserialize<'de>"))]
struct RawRuleFile<T> {
    #[serde(default = "Vec::new")]
    rules: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct RawPostRule {
    pattern: String,
    #[serde(default)]
    replacement: String,
    #[serde(default)]
    flags: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawClassificationRule {
    condition: String,
    output: (String, String, Severity, String),
    #[serde(default = "default_tag_specific")]
    tag_specific: String,
}

fn default_tag_specific() -> String {
    "any".to_string()
}

/// Load post-processing regex rules from a JSON file.
///
/// A missing file logs a warning and yields no rules; an invalid pattern is
/// a configuration error.
pub fn load_post_rules(path: &Path) -> Result<Vec<RegexRule>> {
    let Some(raw) = read_rule_file::<RawPostRule>(path, "post-processing")? else {
        return Ok(Vec::new());
    };

    let mut rules = Vec::with_capacity(raw.len());
    for rule in raw {
        let mut builder = RegexBuilder::new(&rule.pattern);
        if let Some(flags) = &rule.flags {
            for flag in flags.split('|') {
                match flag.trim().to_uppercase().as_str() {
                    "IGNORECASE" => {
                        builder.case_insensitive(true);
                    }
                    "MULTILINE" => {
                        builder.multi_line(true);
                    }
                    "DOTALL" => {
                        builder.dot_matches_new_line(true);
                    }
                    "" => {}
                    other => warn!(flag = other, "ignoring unsupported regex flag"),
                }
            }
        }
        let pattern = builder.build().map_err(|e| {
            EngineError::RuleConfig(format!("invalid pattern {:?}: {e}", rule.pattern))
        })?;
        rules.push(RegexRule { pattern, replacement: rule.replacement });
    }

    info!(count = rules.len(), path = %path.display(), "loaded post-processing rules");
    Ok(rules)
}

/// Load classification rules from a JSON file.
///
/// A missing file logs a warning and yields no rules; an unknown condition
/// name is a configuration error rather than a silent skip.
pub fn load_classification_rules(path: &Path) -> Result<Vec<ClassificationRule>> {
    let Some(raw) = read_rule_file::<RawClassificationRule>(path, "classification")? else {
        return Ok(Vec::new());
    };

    let mut rules = Vec::with_capacity(raw.len());
    for rule in raw {
        let condition = resolve_condition(&rule.condition).ok_or_else(|| {
            EngineError::RuleConfig(format!("unknown classification condition: {}", rule.condition))
        })?;
        let tag_filter = parse_tag_filter(&rule.tag_specific)?;
        let (kind, message, severity, explanation) = rule.output;
        rules.push(ClassificationRule {
            name: rule.condition,
            condition,
            output: ClassificationOutput { kind, message, severity, explanation },
            tag_filter,
        });
    }

    info!(count = rules.len(), path = %path.display(), "loaded classification rules");
    Ok(rules)
}

fn parse_tag_filter(raw: &str) -> Result<TagFilter> {
    match raw {
        "any" => Ok(TagFilter::Any),
        "equal" => Ok(TagFilter::Only(DiffTag::Equal)),
        "replace" => Ok(TagFilter::Only(DiffTag::Replace)),
        "insert" => Ok(TagFilter::Only(DiffTag::Insert)),
        "delete" => Ok(TagFilter::Only(DiffTag::Delete)),
        other => Err(EngineError::RuleConfig(format!("unknown tag_specific value: {other:?}"))),
    }
}

fn read_rule_file<T: serde::de::DeserializeOwned>(
    path: &Path,
    rule_type: &str,
) -> Result<Option<Vec<T>>> {
    if !path.exists() {
        warn!(path = %path.display(), rule_type, "rule file not found");
        return Ok(None);
    }
    let content = fs::read_to_string(path).map_err(|e| {
        EngineError::RuleConfig(format!("failed to read {}: {e}", path.display()))
    })?;
    let file: RawRuleFile<T> = serde_json::from_str(&content).map_err(|e| {
        EngineError::RuleConfig(format!("failed to parse {}: {e}", path.display()))
    })?;
    Ok(Some(file.rules))
}
