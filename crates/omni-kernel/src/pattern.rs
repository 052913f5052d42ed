//! Data-driven text matching.
//!
//! Two building blocks back every grammar in the pipeline:
//!
//! | Type | Technique | Used for |
//! |------|-----------|----------|
//! | [`PhraseSet`] | Multi-phrase search via [`aho_corasick`] | keyword and indicator counting |
//! | [`PatternTable`] | Ordered [`regex`] entries, each paired with a handler | extraction rules |
//!
//! A grammar is extended by adding a table entry, not by adding another
//! branch to a conditional cascade.
//!
//! # Example
//!
//! ```rust
//! # use omni_kernel::pattern::{PatternTable, PhraseSet};
//! let table = PatternTable::new()
//!     .with(r"^copy\s+(\S+)\s+to\s+(\S+)$", "copy").unwrap()
//!     .with(r"^move\s+(\S+)\s+to\s+(\S+)$", "move").unwrap();
//!
//! let (handler, caps) = table.first_match("move a.txt to b.txt").unwrap();
//! assert_eq!(*handler, "move");
//! assert_eq!(&caps[1], "a.txt");
//!
//! let verbs = PhraseSet::new(["copy", "delete"]).unwrap();
//! assert_eq!(verbs.count_distinct("copy a and delete b and copy c"), 2);
//! ```

use aho_corasick::{AhoCorasick, MatchKind};
use regex::{Captures, Regex};

use crate::error::{KernelError, Result};

// ---------------------------------------------------------------------------
// PatternTable
// ---------------------------------------------------------------------------

/// One regex rule and the handler invoked when it matches.
#[derive(Debug, Clone)]
pub struct PatternEntry<H> {
    /// The original pattern string.
    pub pattern: String,
    /// The handler associated with this rule.
    pub handler: H,
    compiled: Regex,
}

impl<H> PatternEntry<H> {
    /// The compiled regex.
    pub fn regex(&self) -> &Regex {
        &self.compiled
    }
}

/// An ordered list of `(regex, handler)` rules.  The first rule that matches
/// wins.
#[derive(Debug, Clone)]
pub struct PatternTable<H> {
    entries: Vec<PatternEntry<H>>,
}

impl<H> PatternTable<H> {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Append a rule, builder style.
    pub fn with(mut self, pattern: impl Into<String>, handler: H) -> Result<Self> {
        self.push(pattern, handler)?;
        Ok(self)
    }

    /// Append a rule.  Returns an error if the regex fails to compile.
    pub fn push(&mut self, pattern: impl Into<String>, handler: H) -> Result<()> {
        let pattern = pattern.into();
        let compiled = Regex::new(&pattern).map_err(|e| KernelError::InvalidPattern {
            pattern: pattern.clone(),
            reason: e.to_string(),
        })?;

        tracing::trace!(pattern = %pattern, "pattern rule added");

        self.entries.push(PatternEntry {
            pattern,
            handler,
            compiled,
        });
        Ok(())
    }

    /// Return the handler and captures of the first rule matching `text`.
    pub fn first_match<'t>(&self, text: &'t str) -> Option<(&H, Captures<'t>)> {
        self.entries.iter().find_map(|entry| {
            entry
                .compiled
                .captures(text)
                .map(|caps| (&entry.handler, caps))
        })
    }

    /// Whether any rule matches `text`.
    pub fn is_match(&self, text: &str) -> bool {
        self.entries.iter().any(|entry| entry.compiled.is_match(text))
    }

    /// Number of distinct rules that match `text` at least once.
    pub fn count_matching(&self, text: &str) -> usize {
        self.entries
            .iter()
            .filter(|entry| entry.compiled.is_match(text))
            .count()
    }

    /// Iterate the rules in order.
    pub fn iter(&self) -> impl Iterator<Item = &PatternEntry<H>> {
        self.entries.iter()
    }

    /// Number of rules in the table.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table has no rules.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<H> Default for PatternTable<H> {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// PhraseSet
// ---------------------------------------------------------------------------

/// A fixed set of phrases searched in a single pass.
///
/// Matches only count when they start on a word boundary, so `"restore"`
/// does not count as a hit for `"store"`.
#[derive(Debug, Clone)]
pub struct PhraseSet {
    phrases: Vec<String>,
    automaton: AhoCorasick,
}

impl PhraseSet {
    /// Build a set from lowercase phrases.
    pub fn new<I, S>(phrases: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let phrases: Vec<String> = phrases
            .into_iter()
            .map(|p| p.as_ref().to_lowercase())
            .collect();

        let automaton = AhoCorasick::builder()
            .match_kind(MatchKind::Standard)
            .build(&phrases)
            .map_err(|e| KernelError::PhraseSetBuild {
                reason: e.to_string(),
            })?;

        Ok(Self { phrases, automaton })
    }

    /// Whether any phrase occurs in `text`.
    pub fn contains_any(&self, text: &str) -> bool {
        !self.matched(text).is_empty()
    }

    /// Number of distinct phrases that occur in `text`.
    pub fn count_distinct(&self, text: &str) -> usize {
        self.matched(text).len()
    }

    /// The distinct phrases that occur in `text`, in registration order.
    pub fn matched(&self, text: &str) -> Vec<&str> {
        let mut seen = vec![false; self.phrases.len()];
        for mat in self.automaton.find_overlapping_iter(text) {
            if starts_word(text, mat.start()) {
                seen[mat.pattern().as_usize()] = true;
            }
        }
        self.phrases
            .iter()
            .zip(seen)
            .filter_map(|(phrase, hit)| hit.then_some(phrase.as_str()))
            .collect()
    }

    /// Number of phrases in the set.
    pub fn len(&self) -> usize {
        self.phrases.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.phrases.is_empty()
    }
}

fn starts_word(text: &str, start: usize) -> bool {
    text[..start]
        .chars()
        .next_back()
        .is_none_or(|c| !c.is_alphanumeric())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
