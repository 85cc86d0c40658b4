//! PII scrubbing engine.
//!
//! Walks arbitrarily nested record values, scans every string leaf against
//! the active patterns and applies the configured action to each match.
//! Patterns run in registration order, with each pattern's matches replaced
//! before the next pattern sees the string, so ambiguous overlaps are
//! resolved by registration order rather than position.
//!
//! # Example
//!
//! ```rust
//! use modeltrace::scrub::Scrubber;
//! use modeltrace::patterns::PiiAction;
//! use serde_json::json;
//!
//! let scrubber = Scrubber::new(&["email".to_string()], PiiAction::Mask);
//! let out = scrubber.process(&json!("Contact us at test@example.com"));
//! assert_eq!(out, json!("Contact us at [email]"));
//! ```

use crate::patterns::{PatternRegistry, PiiAction};
use regex::Regex;
use serde_json::Value;

const REDACT_CHAR: char = '*';

/// One detected match, in traversal order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PiiMatch {
    /// Category name of the pattern that matched.
    pub category: String,
    /// The matched substring, unmodified.
    pub value: String,
    /// Dotted location of the containing string leaf; `""` for the root.
    pub path: String,
}

/// Applies the pattern registry to nested record values.
///
/// `process` and `detect` take `&self` and touch no shared state, so
/// concurrent calls from multiple tasks are safe; `add_pattern` requires
/// `&mut self`, which rules out mutation concurrent with reads.
pub struct Scrubber {
    registry: PatternRegistry,
    action: PiiAction,
}

impl Scrubber {
    /// Build a scrubber over the requested built-in categories.
    ///
    /// An empty category list activates every built-in. The action is fixed
    /// for the lifetime of the scrubber.
    pub fn new(categories: &[String], action: PiiAction) -> Self {
        Scrubber {
            registry: PatternRegistry::new(categories),
            action,
        }
    }

    /// Register or overwrite a named custom pattern.
    pub fn add_pattern(&mut self, name: impl Into<String>, pattern: &str) {
        self.registry.add_pattern(name, pattern);
    }

    pub fn action(&self) -> PiiAction {
        self.action
    }

    /// Return a structurally equivalent copy with every match transformed.
    ///
    /// With action [`PiiAction::None`] this is the identity and no
    /// traversal cost is paid. Mapping keys are never transformed; numbers,
    /// booleans and null pass through unchanged.
    pub fn process(&self, value: &Value) -> Value {
        if self.action == PiiAction::None {
            return value.clone();
        }
        self.process_value(value)
    }

    fn process_value(&self, value: &Value) -> Value {
        match value {
            Value::String(s) => Value::String(self.scrub_text(s)),
            Value::Array(items) => {
                Value::Array(items.iter().map(|v| self.process_value(v)).collect())
            }
            Value::Object(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), self.process_value(v)))
                    .collect(),
            ),
            other => other.clone(),
        }
    }

    /// Scan a single string with every active pattern in registration order.
    pub fn scrub_text(&self, text: &str) -> String {
        let mut result = text.to_string();
        for (name, regex) in self.registry.active_patterns() {
            result = apply_pattern(&result, name, regex, self.action);
        }
        result
    }

    /// Non-mutating scan reporting every match with its location.
    ///
    /// Ordering: depth-first structure traversal, then pattern registration
    /// order within one string, then left-to-right within one pattern.
    pub fn detect(&self, value: &Value) -> Vec<PiiMatch> {
        let mut matches = Vec::new();
        self.detect_value(value, "", &mut matches);
        matches
    }

    fn detect_value(&self, value: &Value, path: &str, out: &mut Vec<PiiMatch>) {
        match value {
            Value::String(s) => {
                for (name, regex) in self.registry.active_patterns() {
                    for m in regex.find_iter(s) {
                        out.push(PiiMatch {
                            category: name.to_string(),
                            value: m.as_str().to_string(),
                            path: path.to_string(),
                        });
                    }
                }
            }
            Value::Array(items) => {
                for (index, item) in items.iter().enumerate() {
                    self.detect_value(item, &join_path(path, &index.to_string()), out);
                }
            }
            Value::Object(map) => {
                for (key, item) in map {
                    self.detect_value(item, &join_path(path, key), out);
                }
            }
            _ => {}
        }
    }
}

fn join_path(parent: &str, segment: &str) -> String {
    if parent.is_empty() {
        segment.to_string()
    } else {
        format!("{}.{}", parent, segment)
    }
}

/// Replace every match of one pattern, processing matches back to front so
/// earlier ranges stay valid.
fn apply_pattern(text: &str, name: &str, regex: &Regex, action: PiiAction) -> String {
    let matches: Vec<(std::ops::Range<usize>, String)> = regex
        .find_iter(text)
        .map(|m| (m.range(), m.as_str().to_string()))
        .collect();
    if matches.is_empty() {
        return text.to_string();
    }

    let mut result = text.to_string();
    for (range, matched) in matches.into_iter().rev() {
        let replacement = match action {
            PiiAction::Mask => format!("[{}]", name),
            PiiAction::Redact => REDACT_CHAR.to_string().repeat(matched.chars().count()),
            PiiAction::Hash => hash_match(&matched),
            PiiAction::None => continue,
        };
        result.replace_range(range, &replacement);
    }
    result
}

/// 16-character deterministic short hash. Obfuscation only; collisions
/// across different inputs are acceptable at this length.
fn hash_match(value: &str) -> String {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}
