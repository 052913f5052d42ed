//! Naming patterns for bulk folder creation.
//!
//! A [`NamingPattern`] describes a numbered run of sibling names.  Three
//! surface forms are recognised in `"naming from A to B"` phrases:
//!
//! | Form | Example | Pattern |
//! |------|---------|---------|
//! | numeric | `1 to 10` | `{numeric, prefix "", 1..=10}` |
//! | decimal | `1.1 to 1.15` | `{decimal, prefix "1", separator ".", 1..=15}` |
//! | alphanumeric | `test2 to test100` | `{alphanumeric, prefix "test", 2..=100}` |
//!
//! Ranges are inclusive on both ends.  Bounds are never reordered: a pattern
//! with `start > end` expands to nothing.

use omni_kernel::PatternTable;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{IntentError, Result};

/// Surface form of a naming pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatternKind {
    Numeric,
    Alphanumeric,
    Decimal,
}

/// A structured descriptor of a numbered sequence of names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamingPattern {
    #[serde(rename = "type")]
    pub kind: PatternKind,
    #[serde(default)]
    pub prefix: String,
    pub start: u64,
    pub end: u64,
    #[serde(default)]
    pub separator: String,
}

impl NamingPattern {
    /// Plain numbers: `start..=end`.
    pub fn numeric(start: u64, end: u64) -> Self {
        Self {
            kind: PatternKind::Numeric,
            prefix: String::new(),
            start,
            end,
            separator: String::new(),
        }
    }

    /// `prefix` followed directly by the number.
    pub fn alphanumeric(prefix: impl Into<String>, start: u64, end: u64) -> Self {
        Self {
            kind: PatternKind::Alphanumeric,
            prefix: prefix.into(),
            start,
            end,
            separator: String::new(),
        }
    }

    /// `prefix.number`, as in outline numbering.
    pub fn decimal(prefix: impl Into<String>, start: u64, end: u64) -> Self {
        Self {
            kind: PatternKind::Decimal,
            prefix: prefix.into(),
            start,
            end,
            separator: ".".into(),
        }
    }

    /// Names for the whole range in ascending order.  Empty when
    /// `start > end`.
    pub fn expand(&self) -> Vec<String> {
        (self.start..=self.end).map(|i| self.name_at(i)).collect()
    }

    /// The name for a single number.
    pub fn name_at(&self, n: u64) -> String {
        format!("{}{}{}", self.prefix, self.separator, n)
    }

    /// Number of names the pattern expands to.  Saturates at `u64::MAX`
    /// for the full `0..=u64::MAX` range.
    pub fn len(&self) -> u64 {
        if self.start > self.end {
            0
        } else {
            (self.end - self.start).saturating_add(1)
        }
    }

    /// Whether the pattern expands to nothing.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Serialize into a step param value.
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// Read back from a step param value.
    pub fn from_value(value: &Value) -> Result<Self> {
        serde_json::from_value(value.clone()).map_err(|e| IntentError::InvalidNamingPattern {
            reason: e.to_string(),
        })
    }

    /// Build a pattern from the two range endpoints as written.
    ///
    /// Returns `None` when the endpoints share no recognisable shape, e.g.
    /// `alpha to omega`.
    pub fn from_bounds(first: &str, last: &str) -> Option<Self> {
        let first = first.trim_matches(|c| c == '"' || c == '\'');
        let last = last.trim_matches(|c| c == '"' || c == '\'');

        if is_digits(first) && is_digits(last) {
            return Some(Self::numeric(first.parse().ok()?, last.parse().ok()?));
        }

        if first.contains('.') && last.contains('.') {
            let (prefix, start) = first.rsplit_once('.')?;
            let (_, end) = last.rsplit_once('.')?;
            if !is_digits(start) || !is_digits(end) {
                return None;
            }
            return Some(Self::decimal(prefix, start.parse().ok()?, end.parse().ok()?));
        }

        let (prefix, start) = split_trailing_digits(first)?;
        let (_, end) = split_trailing_digits(last)?;
        Some(Self::alphanumeric(prefix, start, end))
    }
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

fn split_trailing_digits(s: &str) -> Option<(&str, u64)> {
    let cut = s.trim_end_matches(|c: char| c.is_ascii_digit()).len();
    let digits = &s[cut..];
    if digits.is_empty() {
        return None;
    }
    Some((&s[..cut], digits.parse().ok()?))
}

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

const RANGE_PHRASES: &[&str] = &[
    r#"\b(?:naming|named|called)\s+(?:from\s+|as\s+)?["']?([\w.-]+?)["']?\s+(?:to|through|until)\s+["']?([\w.-]+)"#,
    r#"\bfrom\s+["']?([\w.-]+?)["']?\s+(?:to|through)\s+["']?([\w.-]+)"#,
];

/// Finds `naming from A to B` phrases and turns them into patterns.
#[derive(Debug, Clone)]
pub struct NamingParser {
    ranges: PatternTable<()>,
}

impl NamingParser {
    /// Compile the range phrases.
    pub fn new() -> Result<Self> {
        let mut ranges = PatternTable::new();
        for pattern in RANGE_PHRASES {
            ranges.push(*pattern, ())?;
        }
        Ok(Self { ranges })
    }

    /// Find a range phrase in `text` and parse its endpoints.
    pub fn extract(&self, text: &str) -> Option<NamingPattern> {
        let (_, caps) = self.ranges.first_match(text)?;
        let first = trim_trailing_punct(caps.get(1)?.as_str());
        let last = trim_trailing_punct(caps.get(2)?.as_str());
        let pattern = NamingPattern::from_bounds(first, last);
        if pattern.is_none() {
            tracing::debug!(first = %first, last = %last, "range endpoints have no common shape");
        }
        pattern
    }
}

fn trim_trailing_punct(s: &str) -> &str {
    s.trim_end_matches(['.', '-'])
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn extract_naming_pattern(text: &str) -> Option<NamingPattern> {
        NamingParser::new().unwrap().extract(text)
    }

    #[test]
    fn numeric_range_round_trip() {
        for (a, b) in [(1u64, 1u64), (1, 10), (7, 42), (0, 3)] {
            let text = format!("create folders naming from {a} to {b}");
            let pattern = extract_naming_pattern(&text).unwrap();
            assert_eq!(pattern.kind, PatternKind::Numeric);
            assert_eq!((pattern.start, pattern.end), (a, b));

            let names = pattern.expand();
            assert_eq!(names.len() as u64, b - a + 1);
            let mut unique = names.clone();
            unique.dedup();
            assert_eq!(unique.len(), names.len());
        }
    }

    #[test]
    fn decimal_pattern() {
        let pattern = extract_naming_pattern("create 15 folders naming as 1.1 to 1.15").unwrap();
        assert_eq!(pattern, NamingPattern::decimal("1", 1, 15));

        let names = pattern.expand();
        assert_eq!(names.len(), 15);
        assert_eq!(names[0], "1.1");
        assert_eq!(names[1], "1.2");
        assert_eq!(names[14], "1.15");
    }

    #[test]
    fn alphanumeric_pattern() {
        let pattern =
            extract_naming_pattern("create 99 folders naming from test2 to test100").unwrap();
        assert_eq!(pattern, NamingPattern::alphanumeric("test", 2, 100));

        let names = pattern.expand();
        assert_eq!(names.len(), 99);
        assert_eq!(names.first().map(String::as_str), Some("test2"));
        assert_eq!(names.last().map(String::as_str), Some("test100"));
    }

    #[test]
    fn plain_from_to_without_naming_keyword() {
        let pattern = extract_naming_pattern("create 3 folders from mod1 to mod3").unwrap();
        assert_eq!(pattern, NamingPattern::alphanumeric("mod", 1, 3));
    }

    #[test]
    fn start_after_end_expands_to_nothing() {
        let pattern = extract_naming_pattern("naming from 10 to 2").unwrap();
        assert_eq!((pattern.start, pattern.end), (10, 2));
        assert!(pattern.expand().is_empty());
        assert!(pattern.is_empty());
    }

    #[test]
    fn full_u64_range_length_saturates() {
        let pattern = NamingPattern::numeric(0, u64::MAX);
        assert_eq!(pattern.len(), u64::MAX);
        assert!(!pattern.is_empty());
        assert_eq!(NamingPattern::numeric(1, u64::MAX).len(), u64::MAX);
        assert_eq!(NamingPattern::numeric(u64::MAX, u64::MAX).len(), 1);
    }

    #[test]
    fn shapeless_bounds_yield_none() {
        assert!(extract_naming_pattern("naming from alpha to omega").is_none());
        assert!(extract_naming_pattern("create some folders").is_none());
    }

    #[test]
    fn serializes_with_type_tag() {
        let value = NamingPattern::numeric(1, 3).to_value();
        assert_eq!(
            value,
            json!({"type": "numeric", "prefix": "", "start": 1, "end": 3, "separator": ""})
        );
        assert_eq!(NamingPattern::from_value(&value).unwrap(), NamingPattern::numeric(1, 3));
    }

    #[test]
    fn malformed_value_is_rejected() {
        let err = NamingPattern::from_value(&json!({"type": "roman"})).unwrap_err();
        assert!(matches!(err, IntentError::InvalidNamingPattern { .. }));
    }
}
