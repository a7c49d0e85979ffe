//! Linguistic tagging collaborator.
//!
//! The engine never tokenizes or tags text itself: it consumes a [`Tagger`],
//! which produces character-exact token and sentence boundaries plus the
//! part-of-speech and punctuation attributes the classification rules and
//! span expansion inspect. [`LexiconTagger`] is the built-in implementation:
//! a deterministic char-scan tokenizer with a closed-class lexicon and a
//! compiled boundary pattern for sentence detection.

use regex_automata::{meta::Regex, Input};
use tracing::debug;

use crate::error::{EngineError, Result};
use crate::offsets::char_len;

/// Coarse part-of-speech tag attached to each token.
///
/// Only the closed classes are decided by the built-in lexicon; open-class
/// tags exist so richer taggers can populate them behind the same trait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PosTag {
    Det,
    Adp,
    Cconj,
    Sconj,
    Part,
    Pron,
    Aux,
    Verb,
    Adv,
    Num,
    Punct,
    Other,
}

/// One token of analyzed text with its character offset into that text
#[derive(Debug, Clone)]
pub struct Token {
    pub text: String,
    /// Character offset of the token within the tagged text
    pub idx: usize,
    pub pos: PosTag,
    pub is_punct: bool,
}

impl Token {
    /// Token length in characters
    pub fn char_len(&self) -> usize {
        char_len(&self.text)
    }

    /// Character offset one past the end of the token
    pub fn end_idx(&self) -> usize {
        self.idx + self.char_len()
    }
}

/// Tagged view of one piece of text: tokens plus sentence boundaries,
/// both addressed in character offsets into `text`
#[derive(Debug, Clone)]
pub struct TaggedDoc {
    pub text: String,
    pub tokens: Vec<Token>,
    /// Half-open character ranges of detected sentences, in order
    pub sentences: Vec<(usize, usize)>,
}

impl TaggedDoc {
    /// Text covered by a half-open token range, including interior spacing.
    /// Empty ranges yield an empty string.
    pub fn span_text(&self, start_tok: usize, end_tok: usize) -> &str {
        if start_tok >= end_tok || end_tok > self.tokens.len() {
            return "";
        }
        let start = self.tokens[start_tok].idx;
        let end = self.tokens[end_tok - 1].end_idx();
        crate::offsets::char_slice(&self.text, start, end)
    }
}

/// Tagging collaborator contract: deterministic for identical input
pub trait Tagger: Send + Sync {
    fn tag(&self, text: &str) -> Result<TaggedDoc>;
}

/// Sentence boundary: end punctuation, optional closing quotes, whitespace,
/// then an optional opening quote/parenthetical and an uppercase letter or
/// digit
const BOUNDARY_PATTERN: &str = r#"[.!?]["'”’]*\s+["'“‘(\[{]*[\p{Lu}\p{N}]"#;

/// Titles and common abbreviations that end in a period without closing a
/// sentence
const ABBREVIATIONS: &[&str] = &[
    "mr", "mrs", "ms", "dr", "prof", "rev", "hon", "sr", "jr", "st", "vs",
    "etc", "inc", "ltd", "co", "dept", "fig", "no", "vol", "approx",
];

/// Built-in deterministic tagger: char-scan tokenizer, closed-class lexicon,
/// compiled boundary pattern with an abbreviation guard
pub struct LexiconTagger {
    boundary: Regex,
}

impl LexiconTagger {
    pub fn new() -> Result<Self> {
        let boundary = Regex::new(BOUNDARY_PATTERN)
            .map_err(|e| EngineError::DependencyUnavailable(format!(
                "failed to compile sentence boundary pattern: {e}"
            )))?;
        Ok(Self { boundary })
    }

    /// Detect sentence boundaries, returning byte ranges over `text`
    fn sentence_byte_ranges(&self, text: &str) -> Vec<(usize, usize)> {
        let mut ranges = Vec::new();
        let mut sent_start = 0usize;
        let mut search_start = 0usize;

        while search_start < text.len() {
            let input = Input::new(&text[search_start..]);
            let Some(m) = self.boundary.find(input) else {
                break;
            };
            let match_abs = search_start + m.start();
            let matched = &text[match_abs..search_start + m.end()];

            // Sentence content ends where the whitespace run of the match begins
            let ws_off = matched
                .char_indices()
                .find(|(_, c)| c.is_whitespace())
                .map(|(b, _)| b)
                .unwrap_or(matched.len());
            let sent_end = match_abs + ws_off;

            // The final matched char is the first char of the next sentence
            let last_len = matched.chars().last().map(char::len_utf8).unwrap_or(0);
            let next_start = search_start + m.end() - last_len;

            if self.is_abbreviation_boundary(text, match_abs) {
                search_start = next_start;
                continue;
            }

            ranges.push((sent_start, sent_end));
            sent_start = next_start;
            search_start = next_start;
        }

        if sent_start < text.len() {
            ranges.push((sent_start, text.len()));
        }
        ranges
    }

    /// True when the period at `punct_byte` ends an abbreviation or a single
    /// initial rather than a sentence
    fn is_abbreviation_boundary(&self, text: &str, punct_byte: usize) -> bool {
        if !text[punct_byte..].starts_with('.') {
            return false;
        }
        let word: String = text[..punct_byte]
            .chars()
            .rev()
            .take_while(|c| c.is_alphabetic())
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();
        if word.is_empty() {
            return false;
        }
        if char_len(&word) == 1 && word.chars().all(char::is_uppercase) {
            return true;
        }
        ABBREVIATIONS.contains(&word.to_lowercase().as_str())
    }

    /// Char-scan tokenizer: words keep interior apostrophes and hyphens,
    /// numbers keep interior separators, punctuation is one token per char
    fn tokenize(&self, text: &str) -> Vec<Token> {
        let chars: Vec<char> = text.chars().collect();
        let mut tokens = Vec::new();
        let mut i = 0;

        while i < chars.len() {
            let ch = chars[i];
            if ch.is_whitespace() {
                i += 1;
                continue;
            }

            if ch.is_alphabetic() {
                let start = i;
                i += 1;
                while i < chars.len() {
                    let c = chars[i];
                    if c.is_alphanumeric() {
                        i += 1;
                    } else if is_word_joiner(c)
                        && i + 1 < chars.len()
                        && chars[i + 1].is_alphanumeric()
                    {
                        i += 2;
                    } else {
                        break;
                    }
                }
                let word: String = chars[start..i].iter().collect();
                let pos = lookup_pos(&word.to_lowercase());
                tokens.push(Token { text: word, idx: start, pos, is_punct: false });
            } else if ch.is_ascii_digit() {
                let start = i;
                i += 1;
                while i < chars.len() {
                    let c = chars[i];
                    if c.is_ascii_digit() {
                        i += 1;
                    } else if (c == '.' || c == ',')
                        && i + 1 < chars.len()
                        && chars[i + 1].is_ascii_digit()
                    {
                        i += 2;
                    } else {
                        break;
                    }
                }
                let num: String = chars[start..i].iter().collect();
                tokens.push(Token { text: num, idx: start, pos: PosTag::Num, is_punct: false });
            } else {
                tokens.push(Token {
                    text: ch.to_string(),
                    idx: i,
                    pos: PosTag::Punct,
                    is_punct: true,
                });
                i += 1;
            }
        }

        tokens
    }
}

impl Tagger for LexiconTagger {
    fn tag(&self, text: &str) -> Result<TaggedDoc> {
        let tokens = self.tokenize(text);
        let sentences: Vec<(usize, usize)> = self
            .sentence_byte_ranges(text)
            .into_iter()
            .map(|(b_start, b_end)| {
                (char_len(&text[..b_start]), char_len(&text[..b_end]))
            })
            .collect();
        debug!(
            tokens = tokens.len(),
            sentences = sentences.len(),
            "tagged {} chars",
            char_len(text)
        );
        Ok(TaggedDoc { text: text.to_string(), tokens, sentences })
    }
}

fn is_word_joiner(c: char) -> bool {
    c == '\'' || c == '\u{2019}' || c == '-'
}

/// Closed-class lexicon lookup; open-class words fall through to `Other`
fn lookup_pos(lower: &str) -> PosTag {
    match lower {
        "a" | "an" | "the" | "this" | "that" | "these" | "those" | "my" | "your" | "his"
        | "her" | "its" | "our" | "their" | "each" | "every" | "some" | "any" | "no" => {
            PosTag::Det
        }
        "of" | "in" | "on" | "at" | "by" | "for" | "with" | "from" | "about" | "into"
        | "onto" | "over" | "under" | "between" | "through" | "during" | "against"
        | "to" | "as" => PosTag::Adp,
        "and" | "or" | "but" | "nor" | "yet" | "so" => PosTag::Cconj,
        "because" | "if" | "although" | "though" | "while" | "since" | "unless"
        | "whereas" | "whether" => PosTag::Sconj,
        "not" => PosTag::Part,
        "i" | "you" | "he" | "she" | "it" | "we" | "they" | "me" | "him" | "us" | "them"
        | "who" | "whom" | "which" | "what" | "mine" | "yours" | "hers" | "ours"
        | "theirs" | "it's" | "it\u{2019}s" => PosTag::Pron,
        "is" | "are" | "was" | "were" | "be" | "been" | "being" | "am" | "have" | "has"
        | "had" | "do" | "does" | "did" | "will" | "would" | "can" | "could" | "shall"
        | "should" | "may" | "might" | "must" => PosTag::Aux,
        // Contractions and their commonly misspelled apostrophe-less forms
        "don't" | "doesn't" | "didn't" | "can't" | "won't" | "isn't" | "aren't"
        | "wasn't" | "weren't" | "hasn't" | "haven't" | "hadn't" | "couldn't"
        | "shouldn't" | "wouldn't" | "dont" | "doesnt" | "didnt" | "cant" | "wont"
        | "isnt" | "arent" | "wasnt" | "werent" | "hasnt" | "havent" | "hadnt"
        | "couldnt" | "shouldnt" | "wouldnt" => PosTag::Aux,
        "very" | "really" | "quite" | "always" | "never" | "often" | "sometimes"
        | "here" | "there" | "now" | "then" | "well" | "too" | "also" | "just" => {
            PosTag::Adv
        }
        _ => PosTag::Other,
    }
}
