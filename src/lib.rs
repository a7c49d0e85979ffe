pub mod corrector;
pub mod diff;
pub mod dispatcher;
pub mod engine;
pub mod error;
pub mod issue;
pub mod offsets;
pub mod rules;
pub mod segmenter;
pub mod tagger;

// Re-export main types for convenient access
pub use corrector::{CommandCorrector, Corrector, IdentityCorrector};
pub use diff::{diff_tokens, DiffOpcode, DiffTag};
pub use dispatcher::{dispatch, DispatchConfig};
pub use engine::{CorrectionOutcome, EngineConfig, GrammarEngine};
pub use error::{EngineError, Result};
pub use issue::{GrammarCorrectionIssue, IssueConfig};
pub use rules::{ClassificationRule, RegexRule, RuleSet, Severity};
pub use segmenter::{segment_text, SentenceSegment};
pub use tagger::{LexiconTagger, PosTag, TaggedDoc, Tagger, Token};
