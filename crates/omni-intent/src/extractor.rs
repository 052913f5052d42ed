//! Step extraction.
//!
//! [`StepExtractor::extract`] turns normalized command text into an ordered
//! sequence of [`StepSpec`]s.  The routine is chosen by complexity level:
//!
//! | Level | Routine |
//! |-------|---------|
//! | Simple | first matching rule of the simple table, else an `unknown` step |
//! | Compound | conjunction split, each segment simple, chained left to right |
//! | Workflow | bulk/nested folder grammar, else a workflow template, else a wider conjunction split |
//! | Conditional | `if X then Y` / `when X, Y`: Y extracted simple, X attached as a guard |
//!
//! Every grammar is a [`PatternTable`] of `(regex, rule)` pairs; extending a
//! grammar means adding a row.  Extraction never fails outright: text that
//! matches nothing degrades to a fallback step.
//!
//! Compound segments are chained (segment *i* depends on segment *i - 1*)
//! even when the actions are unrelated.  This keeps execution order identical
//! to reading order.

use omni_kernel::{KernelError, PatternTable};
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::classifier::CONJUNCTIONS;
use crate::error::{IntentError, Result};
use crate::naming::{NamingParser, NamingPattern};
use crate::step::{ComplexityLevel, StepSource, StepSpec};
use crate::templates::WorkflowTemplates;

/// Confidence given to the loop grammar's last-resort container step.
const FALLBACK_CONFIDENCE: f32 = 0.4;

/// Words the folder rules can capture that are not folder names.
const NOT_A_NAME: &[&str] = &["on", "in", "at", "inside", "a", "an", "the", "new", "named", "called"];

// ---------------------------------------------------------------------------
// Extraction context
// ---------------------------------------------------------------------------

/// Scratch state threaded through the sub-routines of one command.
///
/// Later operations read what earlier ones recorded: the bulk rule places its
/// folders inside the container, and the nested rule needs the bulk rule's
/// pattern to find the parents.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractionContext {
    /// Name of the most recently created container folder.
    pub container: Option<String>,
    /// Location alias mentioned in the command (e.g. `desktop`).
    pub location: Option<String>,
    /// Prefix of the most recent bulk set.
    pub current_parent: Option<String>,
    /// Count of the most recent bulk set.
    pub last_count: Option<u64>,
    /// Full naming pattern of the most recent bulk set.
    pub last_pattern: Option<NamingPattern>,
}

// ---------------------------------------------------------------------------
// Rule tables
// ---------------------------------------------------------------------------

/// A grammar rule: captures of its regex plus the matched text in, steps out.
type Rule = fn(&StepExtractor, &Captures<'_>, &str, &mut ExtractionContext) -> Vec<StepSpec>;

/// How a conditional pattern's groups map onto condition and action.
#[derive(Debug, Clone, Copy)]
struct ConditionShape {
    condition: usize,
    action: usize,
    negated: bool,
}

const FOLDER_WORD: &str = r"(?:folders?|directories|directory)";

fn simple_rules() -> Vec<(String, Rule)> {
    vec![
        (
            r"\bmodify\s+(\S+)\s+from\s+(\w+)\s+to\s+(\w+(?:\s+\w+)*)".into(),
            rule_modify as Rule,
        ),
        (
            format!(r"\b(?:create|make)\s+(\d+)\s+{FOLDER_WORD}\b"),
            rule_bulk as Rule,
        ),
        (r"^copy\s+(.+?)\s+(?:to|into)\s+(.+)$".into(), rule_copy as Rule),
        (r"^move\s+(.+?)\s+(?:to|into)\s+(.+)$".into(), rule_move as Rule),
        (r"^rename\s+(.+?)\s+(?:to|as)\s+(.+)$".into(), rule_rename as Rule),
        (
            r#"^(?:delete|remove)\s+(?:the\s+)?(?:(?:file|folder|directory)\s+)?["']?(.+?)["']?$"#
                .into(),
            rule_delete as Rule,
        ),
        (
            r#"\b(?:create|make)\s+(?:(?:a|an|the|new)\s+)*file\s+(?:(?:named|called)\s+)?["']?([\w.-]+)["']?(?:.*?\bwith\s+(?:the\s+)?(?:content|text)\s+["']?(.+?)["']?$)?"#
                .into(),
            rule_create_file as Rule,
        ),
        (
            r#"\b(?:create|make)\s+(?:(?:a|an|the|new)\s+)*(?:folder|directory)\s+(?:(?:named|called)\s+)?["']?([\w.-]+)["']?"#
                .into(),
            rule_create_folder as Rule,
        ),
        (
            r"\b(?:create|make)\s+(?:(?:a|an|the|new)\s+)*([\w-]+)\s+(?:folder|directory)\b".into(),
            rule_create_folder as Rule,
        ),
    ]
}

fn loop_rules() -> Vec<(String, Rule)> {
    vec![
        (
            format!(
                r"^(?:among\s+(?:those|them|these|the(?:m|se)?\s+{FOLDER_WORD})|(?:in|inside)\s+(?:each\s+(?:of\s+)?)?(?:those|them|these|each\s+folder))\s*,?\s*(?:create|make)\s+(\d+)\s+(?:sub)?{FOLDER_WORD}"
            ),
            rule_nested as Rule,
        ),
        (
            format!(
                r"(?:create|make)\s+(\d+)\s+(?:sub)?{FOLDER_WORD}\b.*\b(?:in|inside)\s+each\s+(?:of\s+)?(?:those|them|these|one|folder)"
            ),
            rule_nested as Rule,
        ),
        (
            format!(r"(?:create|make)\s+(\d+)\s+{FOLDER_WORD}\b"),
            rule_bulk as Rule,
        ),
    ]
}

const CONTAINER_RULES: &[&str] = &[
    r#"^(?:create|make)\s+(?:(?:a|an|the|new)\s+)*(?:folder|directory)\s+(?:(?:named|called)\s+)?["']?([\w.-]+)["']?"#,
    r"^(?:create|make)\s+(?:(?:a|an|the|new)\s+)*([\w-]+)\s+(?:folder|directory)\s*$",
];

const LOOP_ENTRY: &[&str] = &[
    r"\b(?:create|make)\s+\d+\s+(?:sub)?(?:folders?|directories)\b",
    r"\bamong\s+(?:those|them|these)\b",
];

const CONDITIONAL_RULES: &[(&str, ConditionShape)] = &[
    (
        r"\bif\s+(.+?)\s*,?\s+then\s+(.+)$",
        ConditionShape { condition: 1, action: 2, negated: false },
    ),
    (
        r"\bwhen\s+(.+?)\s*(?:,\s*|\s+then\s+)(.+)$",
        ConditionShape { condition: 1, action: 2, negated: false },
    ),
    (
        r"\bif\s+([^,]+),\s*(.+)$",
        ConditionShape { condition: 1, action: 2, negated: false },
    ),
    (
        r"\bunless\s+([^,]+),\s*(.+)$",
        ConditionShape { condition: 1, action: 2, negated: true },
    ),
    (
        r"^(.+?)\s+(?:if|when)\s+(.+)$",
        ConditionShape { condition: 2, action: 1, negated: false },
    ),
    (
        r"^(.+?)\s+unless\s+(.+)$",
        ConditionShape { condition: 2, action: 1, negated: true },
    ),
    (
        r"\bwhen\s+(\S+)\s+(.+)$",
        ConditionShape { condition: 1, action: 2, negated: false },
    ),
];

const LOCATION: &str = r"\b(?:on|in|at|to|into|inside|from)\s+(?:the\s+|my\s+)?(desktop|documents|downloads|home|temp|current)\b";

// ---------------------------------------------------------------------------
// StepExtractor
// ---------------------------------------------------------------------------

/// Data-driven extractor.  Build once, reuse for every command.
#[derive(Debug, Clone)]
pub struct StepExtractor {
    naming: NamingParser,
    simple: PatternTable<Rule>,
    loop_ops: PatternTable<Rule>,
    container: PatternTable<()>,
    loop_entry: PatternTable<()>,
    conditional: PatternTable<ConditionShape>,
    templates: WorkflowTemplates,
    compound_split: Regex,
    workflow_split: Regex,
    operation_split: Regex,
    location: Regex,
    location_suffix: Regex,
}

impl StepExtractor {
    /// Compile every rule table.
    pub fn new() -> Result<Self> {
        let mut simple = PatternTable::new();
        for (pattern, rule) in simple_rules() {
            simple.push(pattern, rule)?;
        }

        let mut loop_ops = PatternTable::new();
        for (pattern, rule) in loop_rules() {
            loop_ops.push(pattern, rule)?;
        }

        let mut container = PatternTable::new();
        for pattern in CONTAINER_RULES {
            container.push(*pattern, ())?;
        }

        let mut loop_entry = PatternTable::new();
        for pattern in LOOP_ENTRY {
            loop_entry.push(*pattern, ())?;
        }

        let mut conditional = PatternTable::new();
        for (pattern, shape) in CONDITIONAL_RULES {
            conditional.push(*pattern, *shape)?;
        }

        Ok(Self {
            naming: NamingParser::new()?,
            simple,
            loop_ops,
            container,
            loop_entry,
            conditional,
            templates: WorkflowTemplates::new()?,
            compound_split: compile(&compound_splitter())?,
            workflow_split: compile(
                r"\s*,?\s+(?:(?:and\s+)?(?:then|after\s+that|after|next|also|plus|followed\s+by)|and)\s+",
            )?,
            operation_split: compile(r"(?:\s*,\s*|\s+)and\s+(?:then\s+)?")?,
            location: compile(LOCATION)?,
            location_suffix: compile(&format!(r"\s*{LOCATION}\s*$"))?,
        })
    }

    /// The naming-pattern parser used by the bulk and nested rules.
    pub fn naming(&self) -> &NamingParser {
        &self.naming
    }

    /// Extract steps for `text` at the given complexity level.  Never
    /// returns an empty sequence.
    pub fn extract(
        &self,
        text: &str,
        level: ComplexityLevel,
        ctx: &mut ExtractionContext,
    ) -> Vec<StepSpec> {
        let steps = match level {
            ComplexityLevel::Simple => self.extract_simple(text, ctx),
            ComplexityLevel::Compound => self.extract_compound(text, ctx),
            ComplexityLevel::Workflow => self.extract_workflow(text, ctx),
            ComplexityLevel::Conditional => self.extract_conditional(text, ctx),
        };
        if steps.is_empty() {
            return vec![StepSpec::unknown(text)];
        }
        debug!(level = %level, steps = steps.len(), "steps extracted");
        steps
    }

    /// Single-action extraction.  Falls back to an `unknown` step.
    pub fn extract_simple(&self, text: &str, ctx: &mut ExtractionContext) -> Vec<StepSpec> {
        let text = text.trim();
        if let Some((rule, caps)) = self.simple.first_match(text) {
            let steps = rule(self, &caps, text, ctx);
            if !steps.is_empty() {
                return steps;
            }
        }

        let ambiguous = IntentError::ExtractionAmbiguous {
            text: text.to_string(),
        };
        debug!(reason = %ambiguous, "falling back to unknown step");
        vec![StepSpec::unknown(text)]
    }

    /// Conjunction split, each segment extracted simple and chained to the
    /// previous segment.
    pub fn extract_compound(&self, text: &str, ctx: &mut ExtractionContext) -> Vec<StepSpec> {
        self.chain_segments(&self.compound_split, text, ctx)
    }

    /// Bulk/nested folder grammar when the command uses it, then the
    /// workflow templates, otherwise a generic multi-stage split.
    pub fn extract_workflow(&self, text: &str, ctx: &mut ExtractionContext) -> Vec<StepSpec> {
        if self.loop_entry.is_match(text) {
            return self.extract_loop(text, ctx);
        }
        if let Some(steps) = self.templates.expand(text) {
            return steps;
        }
        self.chain_segments(&self.workflow_split, text, ctx)
    }

    /// The container / bulk / nested folder grammar.
    ///
    /// The command is split on top-level `and` into operations.  Operation 0
    /// may name a container; later operations create bulk sets inside it and
    /// nested sets inside each member of the last bulk set.  Each emitted step
    /// depends on the one before it.
    pub fn extract_loop(&self, text: &str, ctx: &mut ExtractionContext) -> Vec<StepSpec> {
        if ctx.location.is_none() {
            ctx.location = self.find_location(text);
        }

        let mut steps: Vec<StepSpec> = Vec::new();
        let mut productive = false;

        for (i, operation) in self
            .operation_split
            .split(text)
            .map(str::trim)
            .filter(|op| !op.is_empty())
            .enumerate()
        {
            let emitted = if i == 0
                && let Some((_, caps)) = self.container.first_match(operation)
                && let Some(name) = folder_name(&caps)
            {
                productive = true;
                ctx.container = Some(name.clone());
                vec![
                    StepSpec::new("create_folder", "filesystem")
                        .with_param("name", name)
                        .with_param("location", ctx.location.clone()),
                ]
            } else if let Some((rule, caps)) = self.loop_ops.first_match(operation) {
                let emitted = rule(self, &caps, operation, ctx);
                productive |= !emitted.is_empty();
                emitted
            } else {
                self.extract_simple(operation, ctx)
            };

            for step in emitted {
                let step = step.with_priority(i as u32 + 1);
                let step = match steps.len() {
                    0 => step,
                    n => step.depends_on(n - 1),
                };
                steps.push(step);
            }
        }

        if !productive {
            debug!(text = %text, "loop grammar unproductive, using container fallback");
            return vec![self.fallback_container(text, ctx)];
        }
        steps
    }

    /// `if X then Y` and friends.  Falls back to compound extraction.
    pub fn extract_conditional(&self, text: &str, ctx: &mut ExtractionContext) -> Vec<StepSpec> {
        let Some((shape, caps)) = self.conditional.first_match(text) else {
            return self.extract_compound(text, ctx);
        };
        let (Some(condition), Some(action)) = (caps.get(shape.condition), caps.get(shape.action))
        else {
            return self.extract_compound(text, ctx);
        };

        let condition = if shape.negated {
            format!("not {}", condition.as_str().trim())
        } else {
            condition.as_str().trim().to_string()
        };

        self.extract_simple(action.as_str(), ctx)
            .into_iter()
            .map(|step| step.with_condition(condition.clone()))
            .collect()
    }

    // -- Private helpers ----------------------------------------------------

    fn chain_segments(
        &self,
        splitter: &Regex,
        text: &str,
        ctx: &mut ExtractionContext,
    ) -> Vec<StepSpec> {
        let mut steps: Vec<StepSpec> = Vec::new();
        let segments = splitter
            .split(text)
            .map(str::trim)
            .filter(|segment| !segment.is_empty());

        for (i, segment) in segments.enumerate() {
            let previous = steps.len().checked_sub(1);
            for step in self.extract_simple(segment, ctx) {
                let step = step.with_priority(i as u32 + 1);
                let step = match previous {
                    Some(prev) => step.depends_on(prev),
                    None => step,
                };
                steps.push(step);
            }
        }
        steps
    }

    fn fallback_container(&self, text: &str, ctx: &ExtractionContext) -> StepSpec {
        let name = ctx
            .container
            .clone()
            .or_else(|| {
                self.container
                    .first_match(text)
                    .and_then(|(_, caps)| folder_name(&caps))
            })
            .unwrap_or_else(|| "NewFolder".to_string());

        let mut step = StepSpec::new("create_folder", "filesystem")
            .with_param("name", name)
            .with_param("location", ctx.location.clone())
            .with_confidence(FALLBACK_CONFIDENCE);
        step.source = StepSource::Fallback;
        step
    }

    fn find_location(&self, text: &str) -> Option<String> {
        self.location
            .captures(text)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
    }

    fn strip_location<'a>(&self, text: &'a str) -> &'a str {
        match self.location_suffix.find(text) {
            Some(m) if m.start() > 0 => text[..m.start()].trim_end(),
            _ => text,
        }
    }

    fn bulk_step(&self, count: u64, operation: &str, ctx: &mut ExtractionContext) -> StepSpec {
        let pattern = self
            .naming
            .extract(operation)
            .unwrap_or_else(|| NamingPattern::alphanumeric("folder", 1, count));
        let location = self.find_location(operation).or_else(|| ctx.location.clone());

        let step = StepSpec::new("create_bulk_folders", "filesystem")
            .with_param("count", count)
            .with_param("naming_pattern", pattern.to_value())
            .with_param("parent_folder", ctx.container.clone())
            .with_param("location", location)
            .with_condition("parent_folder_exists");

        ctx.current_parent = Some(pattern.prefix.clone());
        ctx.last_count = Some(count);
        ctx.last_pattern = Some(pattern);
        step
    }
}

/// `\s+(?:(?:and\s+)?(?:then|after|...)|and)\s+` over the classifier's
/// conjunctions, longest first.
fn compound_splitter() -> String {
    let mut words: Vec<String> = CONJUNCTIONS
        .iter()
        .filter(|word| **word != "and")
        .map(|word| word.replace(' ', r"\s+"))
        .collect();
    words.sort_by_key(|word| std::cmp::Reverse(word.len()));
    format!(r"\s+(?:(?:and\s+)?(?:{})|and)\s+", words.join("|"))
}

pub(crate) fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| {
        IntentError::from(KernelError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })
    })
}

fn folder_name(caps: &Captures<'_>) -> Option<String> {
    let name = caps.get(1)?.as_str().trim_end_matches('.');
    if name.is_empty() || NOT_A_NAME.contains(&name) {
        return None;
    }
    Some(name.to_string())
}

fn parse_count(caps: &Captures<'_>) -> Option<u64> {
    caps.get(1)?.as_str().parse().ok()
}

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

fn rule_modify(
    _: &StepExtractor,
    caps: &Captures<'_>,
    _: &str,
    _: &mut ExtractionContext,
) -> Vec<StepSpec> {
    vec![
        StepSpec::new("modify_file", "code_modification")
            .with_param("file_path", &caps[1])
            .with_param("intent", format!("convert {} to {}", &caps[2], &caps[3])),
    ]
}

fn rule_bulk(
    ext: &StepExtractor,
    caps: &Captures<'_>,
    operation: &str,
    ctx: &mut ExtractionContext,
) -> Vec<StepSpec> {
    match parse_count(caps) {
        Some(count) => vec![ext.bulk_step(count, operation, ctx)],
        None => Vec::new(),
    }
}

fn rule_nested(
    ext: &StepExtractor,
    caps: &Captures<'_>,
    operation: &str,
    ctx: &mut ExtractionContext,
) -> Vec<StepSpec> {
    let Some(count) = parse_count(caps) else {
        return Vec::new();
    };
    // Without an earlier bulk set there is nothing to nest into; treat the
    // operation as a bulk set of its own.
    let Some(parents) = ctx.last_count else {
        return vec![ext.bulk_step(count, operation, ctx)];
    };

    let pattern = ext
        .naming
        .extract(operation)
        .unwrap_or_else(|| NamingPattern::alphanumeric("subfolder", 1, count));
    let parent_pattern = ctx
        .last_pattern
        .as_ref()
        .map(NamingPattern::to_value)
        .unwrap_or(Value::Null);

    vec![
        StepSpec::new("create_nested_folders", "filesystem")
            .with_param("count", count)
            .with_param("naming_pattern", pattern.to_value())
            .with_param("parent_folders_count", parents)
            .with_param("parent_prefix", ctx.current_parent.clone())
            .with_param("parent_pattern", parent_pattern)
            .with_param("container", ctx.container.clone())
            .with_param("location", ctx.location.clone())
            .with_condition("bulk_folders_created"),
    ]
}

fn rule_copy(
    ext: &StepExtractor,
    caps: &Captures<'_>,
    _: &str,
    _: &mut ExtractionContext,
) -> Vec<StepSpec> {
    vec![transfer("copy", ext, caps)]
}

fn rule_move(
    ext: &StepExtractor,
    caps: &Captures<'_>,
    _: &str,
    _: &mut ExtractionContext,
) -> Vec<StepSpec> {
    vec![transfer("move", ext, caps)]
}

fn transfer(action: &str, ext: &StepExtractor, caps: &Captures<'_>) -> StepSpec {
    StepSpec::new(action, "filesystem")
        .with_param("source", ext.strip_location(caps[1].trim()))
        .with_param("destination", caps[2].trim())
}

fn rule_rename(
    _: &StepExtractor,
    caps: &Captures<'_>,
    _: &str,
    _: &mut ExtractionContext,
) -> Vec<StepSpec> {
    vec![
        StepSpec::new("rename", "filesystem")
            .with_param("source", caps[1].trim())
            .with_param("new_name", caps[2].trim()),
    ]
}

fn rule_delete(
    ext: &StepExtractor,
    caps: &Captures<'_>,
    text: &str,
    _: &mut ExtractionContext,
) -> Vec<StepSpec> {
    vec![
        StepSpec::new("delete", "filesystem")
            .with_param("path", ext.strip_location(caps[1].trim()))
            .with_param("location", ext.find_location(text)),
    ]
}

fn rule_create_file(
    ext: &StepExtractor,
    caps: &Captures<'_>,
    text: &str,
    ctx: &mut ExtractionContext,
) -> Vec<StepSpec> {
    let Some(name) = folder_name(caps) else {
        return Vec::new();
    };
    let content = caps.get(2).map_or("", |m| m.as_str());
    vec![
        StepSpec::new("create_file", "filesystem")
            .with_param("name", name)
            .with_param("content", content)
            .with_param("location", ext.find_location(text).or_else(|| ctx.location.clone())),
    ]
}

fn rule_create_folder(
    ext: &StepExtractor,
    caps: &Captures<'_>,
    text: &str,
    ctx: &mut ExtractionContext,
) -> Vec<StepSpec> {
    let name = folder_name(caps).unwrap_or_else(|| "NewFolder".to_string());
    let location = ext.find_location(text).or_else(|| ctx.location.clone());
    ctx.container = Some(name.clone());
    vec![
        StepSpec::new("create_folder", "filesystem")
            .with_param("name", name)
            .with_param("location", location),
    ]
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
