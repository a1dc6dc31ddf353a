//! Turns raw extracted text into candidate questions.
//!
//! Two strategies run in order and never mix within one call:
//!
//! 1. The structured pass looks for `Question?` lines followed by lettered
//!    choices (`A. ...`, `B. ...`).
//! 2. The fallback pass, used only when the structured pass finds nothing,
//!    turns long sentences into open "What is discussed about" prompts.
//!
//! Parsing is deterministic: the same input always yields the same list.

use std::sync::LazyLock;

use regex::Regex;

use crate::model::{Difficulty, QuestionDraft, QuestionKind};

/// Sentences at or below this many characters are skipped by the fallback pass.
pub const MIN_SENTENCE_CHARS: usize = 50;

/// Characters of the sentence quoted in a generated prompt.
pub const PROMPT_EXCERPT_CHARS: usize = 100;

/// Upper bound on questions produced by the fallback pass.
pub const MAX_GENERATED_QUESTIONS: usize = 10;

const GENERATED_PREFIX: &str = "What is discussed about: ";

static CHOICE_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Z])\.\s*(.+)$").expect("choice pattern is valid"));

static SENTENCE_END: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.!?]+").expect("sentence pattern is valid"));

/// Which strategy produced a parse result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseStrategy {
    Structured,
    Generated,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseOutcome {
    pub strategy: ParseStrategy,
    pub candidates: Vec<QuestionDraft>,
}

impl ParseOutcome {
    /// True when candidates came from multiple-choice detection.
    #[must_use]
    pub fn is_structured(&self) -> bool {
        self.strategy == ParseStrategy::Structured
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TextParser;

impl TextParser {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Parse raw text into candidate questions in source order.
    #[must_use]
    pub fn parse(&self, raw: &str) -> Vec<QuestionDraft> {
        self.parse_with_strategy(raw).candidates
    }

    /// Like [`TextParser::parse`], also reporting which pass was used.
    #[must_use]
    pub fn parse_with_strategy(&self, raw: &str) -> ParseOutcome {
        let structured = self.parse_structured(raw);
        if !structured.is_empty() {
            return ParseOutcome {
                strategy: ParseStrategy::Structured,
                candidates: structured,
            };
        }
        ParseOutcome {
            strategy: ParseStrategy::Generated,
            candidates: self.generate_from_sentences(raw),
        }
    }

    /// Multiple-choice detection.
    ///
    /// The correct answer of every candidate defaults to its first choice.
    /// That value is a placeholder for a human to correct, not a guess.
    #[must_use]
    pub fn parse_structured(&self, raw: &str) -> Vec<QuestionDraft> {
        let mut out = Vec::new();
        let mut current: Option<&str> = None;
        let mut choices: Vec<String> = Vec::new();

        for line in raw.lines().map(str::trim).filter(|l| !l.is_empty()) {
            if line.ends_with('?') {
                flush_candidate(&mut out, current.take(), std::mem::take(&mut choices));
                current = Some(line);
            } else if let Some(caps) = CHOICE_LINE.captures(line) {
                choices.push(caps[2].trim().to_owned());
            }
        }
        flush_candidate(&mut out, current, choices);

        out
    }

    /// Naive sentence-based generation used when no choice blocks exist.
    #[must_use]
    pub fn generate_from_sentences(&self, raw: &str) -> Vec<QuestionDraft> {
        SENTENCE_END
            .split(raw)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .filter(|s| s.chars().count() > MIN_SENTENCE_CHARS)
            .take(MAX_GENERATED_QUESTIONS)
            .map(|sentence| {
                let excerpt: String = sentence.chars().take(PROMPT_EXCERPT_CHARS).collect();
                QuestionDraft {
                    text: format!("{GENERATED_PREFIX}{excerpt}...?"),
                    kind: QuestionKind::TextAnswer,
                    correct_answer: sentence.to_owned(),
                    difficulty: Difficulty::Medium,
                }
            })
            .collect()
    }
}

fn flush_candidate(out: &mut Vec<QuestionDraft>, question: Option<&str>, choices: Vec<String>) {
    let Some(question) = question else {
        return;
    };
    if choices.len() < 2 {
        return;
    }
    let placeholder = choices[0].clone();
    out.push(QuestionDraft::multiple_choice(question, choices, placeholder));
}
