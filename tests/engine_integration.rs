use std::collections::HashMap;
use std::sync::Arc;

use anyhow::anyhow;
use futures::future::BoxFuture;

use redpen::{
    rules, Corrector, DispatchConfig, EngineConfig, EngineError, GrammarEngine,
    IdentityCorrector, LexiconTagger, RuleSet, Severity,
};

/// Corrector that rewrites sentences it knows and echoes the rest
struct MapCorrector(HashMap<String, String>);

impl MapCorrector {
    fn new(pairs: &[(&str, &str)]) -> Self {
        Self(pairs.iter().map(|(a, b)| (a.to_string(), b.to_string())).collect())
    }
}

impl Corrector for MapCorrector {
    fn correct_batch<'a>(&'a self, texts: &'a [String]) -> BoxFuture<'a, anyhow::Result<Vec<String>>> {
        Box::pin(async move {
            Ok(texts.iter().map(|t| self.0.get(t).cloned().unwrap_or_else(|| t.clone())).collect())
        })
    }
}

/// Corrector that fails every batch containing the marker text
struct MarkerFailCorrector {
    inner: MapCorrector,
    marker: &'static str,
}

impl Corrector for MarkerFailCorrector {
    fn correct_batch<'a>(&'a self, texts: &'a [String]) -> BoxFuture<'a, anyhow::Result<Vec<String>>> {
        Box::pin(async move {
            if texts.iter().any(|t| t.contains(self.marker)) {
                Err(anyhow!("corrector crashed on batch"))
            } else {
                self.inner.correct_batch(texts).await
            }
        })
    }
}

fn engine_with(corrector: Arc<dyn Corrector>) -> GrammarEngine {
    GrammarEngine::new(
        Arc::new(LexiconTagger::new().expect("tagger should build")),
        corrector,
        RuleSet::builtin(),
        EngineConfig::default(),
    )
}

#[tokio::test]
async fn test_she_go_scenario() {
    let corrector = MapCorrector::new(&[("She go to school.", "She goes to school.")]);
    let engine = engine_with(Arc::new(corrector));

    let outcome = engine.correct("She go to school.").await.expect("correct should succeed");
    assert_eq!(outcome.corrected_text_suggestion, "She goes to school.");
    assert_eq!(outcome.issues.len(), 1);

    let issue = &outcome.issues[0];
    assert_eq!(issue.original_segment, "go");
    assert_eq!(issue.suggested_segment, "goes");
    assert_eq!(issue.offset, 4);
    assert_eq!(issue.line, 1);
    assert_eq!(issue.kind, "Grammar");
    assert_eq!(issue.message, "Unclassified change.");
    assert_eq!(issue.full_sentence_context, "She go to school.");
}

#[tokio::test]
async fn test_period_append_scenario() {
    let corrector = MapCorrector::new(&[("I like the bag", "I like the bag.")]);
    let engine = engine_with(Arc::new(corrector));

    let outcome = engine.correct("I like the bag").await.unwrap();
    assert_eq!(outcome.issues.len(), 1);

    let issue = &outcome.issues[0];
    assert_eq!(issue.original_segment, "bag");
    assert_eq!(issue.suggested_segment, "bag.");
    assert_eq!(issue.kind, "Punctuation");
    assert_eq!(issue.severity, Severity::Low);
}

#[tokio::test]
async fn test_identity_yields_no_issues() {
    let engine = engine_with(Arc::new(IdentityCorrector));
    let text = "Nothing wrong here. Or here. Or even here.";

    let outcome = engine.correct(text).await.unwrap();
    assert!(outcome.issues.is_empty());
    assert_eq!(outcome.corrected_text_suggestion, text);
}

#[tokio::test]
async fn test_empty_input_is_rejected() {
    let engine = engine_with(Arc::new(IdentityCorrector));
    assert!(matches!(engine.correct("   \n").await, Err(EngineError::InputEmpty)));
}

#[tokio::test]
async fn test_failed_batch_degrades_to_no_suggestion() {
    // Batch size 3: the first three sentences share the failing batch,
    // the fourth lands in a healthy one
    let corrector = MarkerFailCorrector {
        inner: MapCorrector::new(&[("He go away.", "He goes away.")]),
        marker: "BOOM",
    };
    let engine = GrammarEngine::new(
        Arc::new(LexiconTagger::new().unwrap()),
        Arc::new(corrector),
        RuleSet::builtin(),
        EngineConfig {
            dispatch: DispatchConfig { batch_size: 3, ..DispatchConfig::default() },
            ..EngineConfig::default()
        },
    );

    let text = "This has BOOM inside. Second sentence stands. Third one holds. He go away.";
    let outcome = engine.correct(text).await.unwrap();

    // The failed batch contributes zero issues and keeps its text; the
    // healthy batch still produces its correction
    assert_eq!(outcome.issues.len(), 1);
    assert_eq!(outcome.issues[0].original_segment, "go");
    assert!(outcome.corrected_text_suggestion.contains("This has BOOM inside."));
    assert!(outcome.corrected_text_suggestion.contains("He goes away."));
}

#[tokio::test]
async fn test_global_offsets_across_sentences() {
    let corrector = MapCorrector::new(&[("She go to school.", "She goes to school.")]);
    let engine = engine_with(Arc::new(corrector));

    let text = "This part is fine. She go to school.";
    let outcome = engine.correct(text).await.unwrap();
    assert_eq!(outcome.issues.len(), 1);

    // Second segment starts at char 19; "go" sits 4 chars into it
    let issue = &outcome.issues[0];
    assert_eq!(issue.offset, 23);
    assert_eq!(issue.length, 2);
    assert_eq!(issue.line, 1);
    assert_eq!(issue.column, 24);
}

#[tokio::test]
async fn test_line_column_across_newlines() {
    let corrector = MapCorrector::new(&[("She go to school.", "She goes to school.")]);
    let engine = engine_with(Arc::new(corrector));

    let text = "First line is fine.\nShe go to school.";
    let outcome = engine.correct(text).await.unwrap();
    let issue = &outcome.issues[0];
    assert_eq!(issue.offset, 24);
    assert_eq!(issue.line, 2);
    assert_eq!(issue.column, 5);
}

#[tokio::test]
async fn test_inter_segment_whitespace_preserved() {
    let corrector = MapCorrector::new(&[
        ("She go home.", "She goes home."),
        ("He go away.", "He goes away."),
    ]);
    let engine = engine_with(Arc::new(corrector));

    let text = "She go home.\n\nHe go away.";
    let outcome = engine.correct(text).await.unwrap();
    assert_eq!(outcome.corrected_text_suggestion, "She goes home.\n\nHe goes away.");
    assert_eq!(outcome.issues.len(), 2);
    assert!(outcome.issues[0].offset < outcome.issues[1].offset);
}

#[tokio::test]
async fn test_first_match_rule_precedence() {
    // R1 matches everything and is declared first; R2 is the specific
    // "its" rule. The opcode satisfies both, so R1 must win.
    let catch_all = redpen::ClassificationRule {
        name: "always_true".to_string(),
        condition: rules::resolve_condition("always_true").unwrap(),
        output: redpen::rules::ClassificationOutput::new(
            "Style",
            "Flagged by catch-all.",
            Severity::Low,
            "First rule in the list.",
        ),
        tag_filter: redpen::rules::TagFilter::Any,
    };
    let specific = redpen::ClassificationRule {
        name: "is_its_to_its_contraction".to_string(),
        condition: rules::resolve_condition("is_its_to_its_contraction").unwrap(),
        output: redpen::rules::ClassificationOutput::new(
            "Grammar",
            "Use the contraction \"it's\".",
            Severity::Medium,
            "Specific rule declared second.",
        ),
        tag_filter: redpen::rules::TagFilter::Any,
    };
    let rule_set = RuleSet { post: Vec::new(), classification: vec![catch_all, specific] };

    let corrector = MapCorrector::new(&[("its cold outside.", "it's cold outside.")]);
    let engine = GrammarEngine::new(
        Arc::new(LexiconTagger::new().unwrap()),
        Arc::new(corrector),
        rule_set,
        EngineConfig::default(),
    );

    let outcome = engine.correct("its cold outside.").await.unwrap();
    assert_eq!(outcome.issues.len(), 1);
    assert_eq!(outcome.issues[0].kind, "Style");
    assert_eq!(outcome.issues[0].message, "Flagged by catch-all.");
}

#[tokio::test]
async fn test_issue_serialization_shape() {
    let corrector = MapCorrector::new(&[("I like the bag", "I like the bag.")]);
    let engine = engine_with(Arc::new(corrector));

    let outcome = engine.correct("I like the bag").await.unwrap();
    let value = serde_json::to_value(&outcome).unwrap();

    let issue = &value["issues"][0];
    for field in [
        "offset",
        "length",
        "original_segment",
        "suggested_segment",
        "context_before",
        "context_after",
        "full_sentence_context",
        "display_context",
        "message",
        "type",
        "line",
        "column",
        "severity",
        "explanation",
    ] {
        assert!(!issue[field].is_null(), "missing field {field}");
    }
    assert_eq!(issue["type"], "Punctuation");
    assert_eq!(issue["severity"], "low");
    assert_eq!(issue["display_context"], "[bag] → bag.");
}

#[tokio::test]
async fn test_normalization_suppresses_cosmetic_diffs() {
    // The model sticks a double space into its output; with post-processing
    // enabled the cosmetic artifact never reaches the diff
    let corrector = MapCorrector::new(&[("She go to school.", "She  goes to school.")]);
    let engine = GrammarEngine::new(
        Arc::new(LexiconTagger::new().unwrap()),
        Arc::new(corrector),
        RuleSet::builtin(),
        EngineConfig { apply_post_rules: true, ..EngineConfig::default() },
    );

    let outcome = engine.correct("She go to school.").await.unwrap();
    assert_eq!(outcome.corrected_text_suggestion, "She goes to school.");
    assert_eq!(outcome.issues.len(), 1);
    assert_eq!(outcome.issues[0].suggested_segment, "goes");
}
