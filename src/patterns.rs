//! Named detection patterns for the PII scrubbing engine.
//!
//! Built-in categories cover the common cases (email addresses, phone
//! numbers, payment cards, national IDs, IPv4 addresses) as best-effort
//! heuristics: card numbers are matched by issuer prefix and length, not
//! Luhn-validated. Custom patterns can be registered at runtime and are
//! always active, regardless of the category set chosen at construction.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Transformation applied to every detected match.
///
/// The action is fixed per scrubber instance at construction; it is shared
/// by all patterns, built-in and custom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PiiAction {
    /// Replace the match with a `[category]` literal.
    Mask,
    /// Replace the match with an equal-length run of `*`.
    Redact,
    /// Replace the match with a 16-character deterministic short hash.
    Hash,
    /// Leave matches untouched (detection-only).
    None,
}

impl FromStr for PiiAction {
    type Err = crate::config::ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mask" => Ok(PiiAction::Mask),
            "redact" => Ok(PiiAction::Redact),
            "hash" => Ok(PiiAction::Hash),
            "none" => Ok(PiiAction::None),
            other => Err(crate::config::ConfigError::InvalidPiiAction(
                other.to_string(),
            )),
        }
    }
}

static EMAIL_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}").expect("builtin regex"));

// Generic Western formats: +1-555-123-4567, (555) 123-4567, 555.123.4567.
static PHONE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:\+?1[-.\s]?)?(?:\([0-9]{3}\)|[0-9]{3})[-.\s]?[0-9]{3}[-.\s]?[0-9]{4}")
        .expect("builtin regex")
});

// Hyphenated local mobile numbers, e.g. 010-1234-5678.
static KR_PHONE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b01[016789]-[0-9]{3,4}-[0-9]{4}\b").expect("builtin regex"));

// Major issuer prefixes with optional dash/space grouping. Not Luhn-checked.
static CREDIT_CARD_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\b(?:4[0-9]{3}|5[1-5][0-9]{2}|6(?:011|5[0-9]{2})|3[47][0-9]{2}|3(?:0[0-5]|[68][0-9])[0-9])[-\s]?[0-9]{4}[-\s]?[0-9]{4}[-\s]?[0-9]{4}\b",
    )
    .expect("builtin regex")
});

static SSN_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b[0-9]{3}-[0-9]{2}-[0-9]{4}\b").expect("builtin regex"));

// Resident registration number, YYMMDD-XXXXXXX.
static KR_RRN_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b[0-9]{6}-[1-4][0-9]{6}\b").expect("builtin regex"));

static IPV4_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:(?:25[0-5]|2[0-4][0-9]|[01]?[0-9][0-9]?)\.){3}(?:25[0-5]|2[0-4][0-9]|[01]?[0-9][0-9]?)\b")
        .expect("builtin regex")
});

/// Built-in categories in activation order.
///
/// More specific shapes run before the generic phone pattern so that card
/// numbers and national IDs are not partially consumed as phone numbers.
static BUILTIN_CATEGORIES: &[(&str, &Lazy<Regex>)] = &[
    ("email", &EMAIL_REGEX),
    ("credit_card", &CREDIT_CARD_REGEX),
    ("kr_rrn", &KR_RRN_REGEX),
    ("ssn", &SSN_REGEX),
    ("kr_phone", &KR_PHONE_REGEX),
    ("phone", &PHONE_REGEX),
    ("ipv4", &IPV4_REGEX),
];

struct PatternEntry {
    name: String,
    // None when a custom pattern failed to compile; the entry is kept so
    // the name stays reserved but it is skipped during scans.
    regex: Option<Regex>,
}

/// Ordered set of active detection patterns.
///
/// Scan order is registration order: built-ins in their fixed list order
/// (filtered by the requested categories), then custom patterns in
/// [`PatternRegistry::add_pattern`] order. Re-registering a name replaces
/// the pattern in place, keeping its position.
pub struct PatternRegistry {
    entries: Vec<PatternEntry>,
}

impl PatternRegistry {
    /// Activate built-in categories by name.
    ///
    /// An empty request activates every built-in category; unrecognized
    /// names are silently ignored.
    pub fn new(categories: &[String]) -> Self {
        let entries = BUILTIN_CATEGORIES
            .iter()
            .filter(|(name, _)| categories.is_empty() || categories.iter().any(|c| c == name))
            .map(|(name, regex)| PatternEntry {
                name: (*name).to_string(),
                regex: Some((**regex).clone()),
            })
            .collect();

        PatternRegistry { entries }
    }

    /// Register or overwrite a named custom pattern.
    ///
    /// A pattern that fails to compile is skipped during scans; the failure
    /// never aborts scanning with the remaining patterns.
    pub fn add_pattern(&mut self, name: impl Into<String>, pattern: &str) {
        let name = name.into();
        let regex = match Regex::new(pattern) {
            Ok(re) => Some(re),
            Err(err) => {
                tracing::warn!(pattern = %name, error = %err, "invalid custom pattern, skipping");
                None
            }
        };

        if let Some(entry) = self.entries.iter_mut().find(|e| e.name == name) {
            entry.regex = regex;
        } else {
            self.entries.push(PatternEntry { name, regex });
        }
    }

    /// Usable patterns in registration order.
    pub(crate) fn active_patterns(&self) -> impl Iterator<Item = (&str, &Regex)> {
        self.entries
            .iter()
            .filter_map(|e| e.regex.as_ref().map(|re| (e.name.as_str(), re)))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
