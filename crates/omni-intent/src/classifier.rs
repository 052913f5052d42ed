//! Complexity classification.
//!
//! [`ComplexityClassifier::classify`] buckets normalized command text into a
//! [`ComplexityLevel`] from lexical signal counts.  Rules are checked in a
//! fixed order and the first hit wins:
//!
//! 1. a workflow-indicator phrase (`"data analysis"`, `"complete setup"`, ...)
//! 2. three or more data-science tool names
//! 3. two or more bulk-indicator rules (`"5 folders"`, `"naming from"`, ...)
//! 4. any single-action verb and no bulk indicators: SIMPLE, before any
//!    conjunction counting, so `"copy a to b and delete c"` stays one step
//! 5. conditional words, then conjunction / action-verb / bulk counts
//!
//! Classification never fails; unmatched text is SIMPLE.

use omni_kernel::{PatternTable, PhraseSet};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::step::ComplexityLevel;

const WORKFLOW_INDICATORS: &[&str] = &[
    "data analysis",
    "web scraping",
    "development environment",
    "machine learning",
    "full stack",
    "complete setup",
];

const DATA_SCIENCE_TOOLS: &[&str] = &["pandas", "matplotlib", "seaborn", "jupyter", "numpy"];

const ACTION_KEYWORDS: &[&str] = &[
    "create", "make", "build", "generate", "setup", "install", "download", "upload", "copy",
    "move", "delete", "remove", "open", "close", "start", "stop", "run", "execute", "launch",
    "kill", "terminate", "backup", "restore", "sync", "clone", "commit", "push", "pull", "deploy",
    "test", "debug", "compile",
];

const BULK_INDICATORS: &[&str] = &[
    r"\b\d+\s+(?:folders?|directories|files?)\b",
    r"\bnaming\s+(?:from|as)\b",
    r"\bfrom\s+[\w.]+\s+to\s+[\w.]+",
    r"\bamong\s+(?:those|them|these|the)\b",
    r"\b(?:in|inside)\s+each\s+of\s+(?:those|them|these)\b",
];

const SIMPLE_ACTIONS: &[(&str, &str)] = &[
    (r"\bcopy\b", "copy"),
    (r"\bmove\b", "move"),
    (r"\bdelete\b", "delete"),
    (r"\brename\b", "rename"),
    (r"\bcreate\s+(?:(?:a|an|the|new)\s+)*(?:folder|directory)\b", "create folder"),
    (r"\bcreate\s+(?:(?:a|an|the|new)\s+)*file\b", "create file"),
];

/// Sequencing words.  The compound splitter in the extractor is built from
/// the same list.
pub(crate) const CONJUNCTIONS: &[&str] = &["and", "then", "after", "next", "also", "plus", "followed by"];

const CONDITIONALS: &[&str] = &["if", "when", "unless", "before", "while"];

/// The raw counts behind a classification, for diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplexitySignals {
    pub workflow_indicator: bool,
    pub data_science_tools: usize,
    pub bulk_indicators: usize,
    pub simple_actions: usize,
    pub conjunctions: usize,
    pub conditionals: usize,
    pub action_keywords: usize,
}

/// Lexical complexity classifier.  Build once, reuse for every command.
#[derive(Debug, Clone)]
pub struct ComplexityClassifier {
    workflow_indicators: PhraseSet,
    data_science_tools: PhraseSet,
    action_keywords: PhraseSet,
    bulk_indicators: PatternTable<()>,
    simple_actions: PatternTable<&'static str>,
    conjunctions: PatternTable<&'static str>,
    conditionals: PatternTable<&'static str>,
}

impl ComplexityClassifier {
    /// Compile the built-in vocabularies.
    pub fn new() -> Result<Self> {
        let mut bulk_indicators = PatternTable::new();
        for pattern in BULK_INDICATORS {
            bulk_indicators.push(*pattern, ())?;
        }

        let mut simple_actions = PatternTable::new();
        for (pattern, label) in SIMPLE_ACTIONS {
            simple_actions.push(*pattern, *label)?;
        }

        Ok(Self {
            workflow_indicators: PhraseSet::new(WORKFLOW_INDICATORS)?,
            data_science_tools: PhraseSet::new(DATA_SCIENCE_TOOLS)?,
            action_keywords: PhraseSet::new(ACTION_KEYWORDS)?,
            bulk_indicators,
            simple_actions,
            conjunctions: word_table(CONJUNCTIONS)?,
            conditionals: word_table(CONDITIONALS)?,
        })
    }

    /// Count every signal in `text`.
    pub fn signals(&self, text: &str) -> ComplexitySignals {
        ComplexitySignals {
            workflow_indicator: self.workflow_indicators.contains_any(text),
            data_science_tools: self.data_science_tools.count_distinct(text),
            bulk_indicators: self.bulk_indicators.count_matching(text),
            simple_actions: self.simple_actions.count_matching(text),
            conjunctions: self.conjunctions.count_matching(text),
            conditionals: self.conditionals.count_matching(text),
            action_keywords: self.action_keywords.count_distinct(text),
        }
    }

    /// Classify normalized command text.
    pub fn classify(&self, text: &str) -> ComplexityLevel {
        let level = Self::decide(&self.signals(text));
        tracing::debug!(text = %text, level = %level, "command classified");
        level
    }

    /// Apply the precedence rules to precomputed signals.
    pub fn decide(s: &ComplexitySignals) -> ComplexityLevel {
        if s.workflow_indicator || s.data_science_tools >= 3 || s.bulk_indicators >= 2 {
            return ComplexityLevel::Workflow;
        }
        if s.simple_actions >= 1 && s.bulk_indicators == 0 {
            return ComplexityLevel::Simple;
        }
        if s.conditionals > 0 {
            return ComplexityLevel::Conditional;
        }
        if s.conjunctions >= 2 || s.action_keywords >= 3 || s.bulk_indicators > 0 {
            return ComplexityLevel::Workflow;
        }
        if s.conjunctions >= 1 || s.action_keywords >= 2 {
            return ComplexityLevel::Compound;
        }
        ComplexityLevel::Simple
    }
}

fn word_table(words: &[&'static str]) -> Result<PatternTable<&'static str>> {
    let mut table = PatternTable::new();
    for word in words {
        let pattern = format!(r"\b{}\b", word.replace(' ', r"\s+"));
        table.push(pattern, *word)?;
    }
    Ok(table)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(text: &str) -> ComplexityLevel {
        ComplexityClassifier::new().unwrap().classify(text)
    }

    #[test]
    fn workflow_indicator_phrase() {
        assert_eq!(classify("set up a data analysis project"), ComplexityLevel::Workflow);
        assert_eq!(classify("complete setup for python"), ComplexityLevel::Workflow);
    }

    #[test]
    fn data_science_stack() {
        assert_eq!(
            classify("install pandas numpy and matplotlib"),
            ComplexityLevel::Workflow
        );
    }

    #[test]
    fn two_bulk_indicators_force_workflow() {
        let texts = [
            "create 5 folders naming from a1 to a5",
            "copy x to y, 3 folders among those",
            "if ready then create 2 folders from t1 to t2",
            "delete 4 files from old1 to old4",
        ];
        for text in texts {
            assert_eq!(classify(text), ComplexityLevel::Workflow, "{text}");
        }
    }

    #[test]
    fn single_action_short_circuit_ignores_to() {
        assert_eq!(classify("copy a.txt to b.txt"), ComplexityLevel::Simple);
        assert_eq!(classify("move report.pdf to documents"), ComplexityLevel::Simple);
        assert_eq!(classify("create a folder named photos"), ComplexityLevel::Simple);
    }

    #[test]
    fn short_circuit_beats_conditional_words() {
        // "before" is conditional, but a single copy verb wins first.
        assert_eq!(classify("copy a to b before lunch"), ComplexityLevel::Simple);
    }

    #[test]
    fn several_simple_verbs_still_short_circuit() {
        assert_eq!(classify("copy a.txt to b.txt and delete c.txt"), ComplexityLevel::Simple);
        assert_eq!(
            classify("create a folder named x and rename y to z"),
            ComplexityLevel::Simple
        );
        let s = ComplexitySignals {
            simple_actions: 2,
            conjunctions: 2,
            action_keywords: 3,
            ..Default::default()
        };
        assert_eq!(ComplexityClassifier::decide(&s), ComplexityLevel::Simple);
    }

    #[test]
    fn conditional_words() {
        assert_eq!(
            classify("if the build passes then deploy the app"),
            ComplexityLevel::Conditional
        );
        assert_eq!(classify("open browser when idle"), ComplexityLevel::Conditional);
    }

    #[test]
    fn conjunction_counts() {
        assert_eq!(classify("open browser and start music"), ComplexityLevel::Compound);
        assert_eq!(
            classify("open browser then start music and also launch chat"),
            ComplexityLevel::Workflow
        );
    }

    #[test]
    fn action_keyword_counts() {
        assert_eq!(classify("install build deploy"), ComplexityLevel::Workflow);
        assert_eq!(classify("install compile"), ComplexityLevel::Compound);
    }

    #[test]
    fn single_bulk_indicator_is_workflow() {
        assert_eq!(
            classify("create 15 folders naming as 1.1 to 1.15"),
            ComplexityLevel::Workflow
        );
    }

    #[test]
    fn unmatched_text_is_simple() {
        assert_eq!(classify("hello there"), ComplexityLevel::Simple);
        assert_eq!(classify(""), ComplexityLevel::Simple);
    }

    #[test]
    fn signals_are_reported() {
        let classifier = ComplexityClassifier::new().unwrap();
        let s = classifier.signals("create 3 folders naming from m1 to m3 and among those open it");
        assert!(s.bulk_indicators >= 3);
        assert_eq!(s.conjunctions, 1);
    }
}
