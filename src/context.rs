//! Explicit trace and session context.
//!
//! There is no process-wide "current instance" here: callers hold a
//! [`TraceContext`] or [`Session`] and pass it to the client explicitly.
//! Records logged within a context inherit its identifiers and metadata
//! through an explicit merge at record-build time; record-level keys win
//! on collision.

use crate::record::CallRecord;
use parking_lot::Mutex;
use std::collections::BTreeMap;

/// Grouping context for related calls within one logical trace.
#[derive(Debug, Clone)]
pub struct TraceContext {
    pub trace_id: String,
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl TraceContext {
    pub fn new() -> Self {
        TraceContext {
            trace_id: uuid::Uuid::new_v4().to_string(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_id(trace_id: impl Into<String>) -> Self {
        TraceContext {
            trace_id: trace_id.into(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    pub(crate) fn apply_to(&self, record: &mut CallRecord) {
        if record.trace_id.is_none() {
            record.trace_id = Some(self.trace_id.clone());
        }
        for (key, value) in &self.metadata {
            record.metadata.entry(key.clone()).or_insert_with(|| value.clone());
        }
    }
}

impl Default for TraceContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Error type for direct session-feedback calls.
///
/// Unlike delivery failures, these are surfaced to the caller: an
/// out-of-range rating is a programmer error, not a runtime condition.
#[derive(thiserror::Error, Debug)]
pub enum FeedbackError {
    #[error("rating must be between 1 and 5, got {0}")]
    RatingOutOfRange(u8),

    #[error("no record has been emitted in this session yet")]
    NoPriorRecord,
}

/// User session context with out-of-band feedback support.
///
/// The session remembers the span id of the last record it emitted so that
/// feedback can be attached to it.
pub struct Session {
    pub session_id: String,
    pub user_id: Option<String>,
    pub metadata: BTreeMap<String, serde_json::Value>,
    last_span_id: Mutex<Option<String>>,
}

impl Session {
    pub fn new() -> Self {
        Session {
            session_id: uuid::Uuid::new_v4().to_string(),
            user_id: None,
            metadata: BTreeMap::new(),
            last_span_id: Mutex::new(None),
        }
    }

    pub fn with_id(session_id: impl Into<String>) -> Self {
        Session {
            session_id: session_id.into(),
            ..Self::new()
        }
    }

    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Span id of the last record emitted through this session, if any.
    pub fn last_span_id(&self) -> Option<String> {
        self.last_span_id.lock().clone()
    }

    pub(crate) fn apply_to(&self, record: &mut CallRecord) {
        if record.session_id.is_none() {
            record.session_id = Some(self.session_id.clone());
        }
        if record.user_id.is_none() {
            record.user_id = self.user_id.clone();
        }
        for (key, value) in &self.metadata {
            record.metadata.entry(key.clone()).or_insert_with(|| value.clone());
        }
    }

    pub(crate) fn remember_span(&self, span_id: &str) {
        *self.last_span_id.lock() = Some(span_id.to_string());
    }

    /// Build a feedback record keyed to the last emitted span.
    ///
    /// Validates the rating range before anything else; delivery of the
    /// resulting record follows the usual best-effort path.
    pub(crate) fn feedback_record(
        &self,
        rating: u8,
        comment: Option<&str>,
    ) -> Result<CallRecord, FeedbackError> {
        if !(1..=5).contains(&rating) {
            return Err(FeedbackError::RatingOutOfRange(rating));
        }
        let parent = self
            .last_span_id()
            .ok_or(FeedbackError::NoPriorRecord)?;

        let mut record = CallRecord::new("feedback", "modeltrace")
            .with_metadata("rating", serde_json::Value::from(rating));
        if let Some(comment) = comment {
            record = record.with_metadata("comment", serde_json::Value::from(comment));
        }
        record.parent_span_id = Some(parent);
        self.apply_to(&mut record);
        Ok(record)
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
