use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Outcome of a single model invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallStatus {
    Success,
    Error,
}

impl Default for CallStatus {
    fn default() -> Self {
        CallStatus::Success
    }
}

/// One structured description of a single LLM invocation.
///
/// Records are built by the caller (or a provider wrapper), finalized by the
/// client with generated defaults, optionally scrubbed, and then queued.
/// Once queued a record is never mutated again.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallRecord {
    pub span_id: String,
    pub parent_span_id: Option<String>,
    pub trace_id: Option<String>,
    pub session_id: Option<String>,
    pub user_id: Option<String>,
    pub model: String,
    pub provider: String,
    pub input: serde_json::Value,
    pub output: serde_json::Value,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub latency_ms: u64,
    pub status: CallStatus,
    pub error_message: Option<String>,
    pub metadata: BTreeMap<String, serde_json::Value>,
    pub tags: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

impl CallRecord {
    /// Create a record with generated identity and default content fields.
    pub fn new(model: impl Into<String>, provider: impl Into<String>) -> Self {
        CallRecord {
            span_id: uuid::Uuid::new_v4().to_string(),
            parent_span_id: None,
            trace_id: None,
            session_id: None,
            user_id: None,
            model: model.into(),
            provider: provider.into(),
            input: serde_json::Value::Null,
            output: serde_json::Value::Null,
            input_tokens: 0,
            output_tokens: 0,
            latency_ms: 0,
            status: CallStatus::Success,
            error_message: None,
            metadata: BTreeMap::new(),
            tags: Vec::new(),
            timestamp: Utc::now(),
        }
    }

    pub fn with_input(mut self, input: serde_json::Value) -> Self {
        self.input = input;
        self
    }

    pub fn with_output(mut self, output: serde_json::Value) -> Self {
        self.output = output;
        self
    }

    pub fn with_tokens(mut self, input_tokens: u64, output_tokens: u64) -> Self {
        self.input_tokens = input_tokens;
        self.output_tokens = output_tokens;
        self
    }

    pub fn with_latency_ms(mut self, latency_ms: u64) -> Self {
        self.latency_ms = latency_ms;
        self
    }

    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.status = CallStatus::Error;
        self.error_message = Some(message.into());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Fill in defaults the caller left out: span id and tag de-duplication.
    ///
    /// Tag order is preserved for display; the first occurrence wins.
    pub(crate) fn finalize(&mut self) {
        if self.span_id.trim().is_empty() {
            self.span_id = uuid::Uuid::new_v4().to_string();
        }
        let mut seen = std::collections::HashSet::new();
        self.tags.retain(|t| seen.insert(t.clone()));
    }
}
