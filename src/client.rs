//! Record submission interface.
//!
//! The client validates its configuration once at construction, scrubs
//! records when PII scrubbing is enabled and hands them to the batching
//! queue. Submitting a record is best effort by contract: `log` never
//! surfaces queueing or transport failures to the caller.

use crate::config::{ClientConfig, ConfigError};
use crate::context::{FeedbackError, Session, TraceContext};
use crate::patterns::PiiAction;
use crate::queue::BatchQueue;
use crate::record::CallRecord;
use crate::scrub::Scrubber;
use crate::transport::Transport;
use std::sync::Arc;

/// Handle to the telemetry pipeline.
///
/// Thread explicitly through call sites instead of a process-wide
/// singleton; clones of the `Arc`-wrapped client share one queue.
pub struct Client {
    queue: Arc<BatchQueue>,
    scrubber: Option<Scrubber>,
}

impl Client {
    /// Validate the configuration and build a client over the given
    /// transport.
    pub fn new(config: ClientConfig, transport: Arc<dyn Transport>) -> Result<Self, ConfigError> {
        config.validate()?;

        let scrubber = if config.pii.enabled {
            Some(Scrubber::new(&config.pii.categories, config.pii.action))
        } else {
            None
        };

        let queue = Arc::new(BatchQueue::new(
            transport,
            config.batch_size,
            config.flush_interval,
            config.synchronous,
        ));

        Ok(Client { queue, scrubber })
    }

    /// Build a client wired to the hosted collector over HTTP.
    #[cfg(feature = "http")]
    pub fn from_config(config: ClientConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let transport = crate::transport::HttpTransport::new(crate::transport::HttpTransportConfig {
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
            request_timeout: config.request_timeout,
        })
        .map_err(|e| ConfigError::Transport(e.to_string()))?;
        Self::new(config, Arc::new(transport))
    }

    /// Register or overwrite a custom PII pattern.
    ///
    /// Takes `&mut self`, so patterns are registered before the client is
    /// shared between tasks. No-op when PII scrubbing is disabled.
    pub fn add_pii_pattern(&mut self, name: impl Into<String>, pattern: &str) {
        if let Some(scrubber) = &mut self.scrubber {
            scrubber.add_pattern(name, pattern);
        }
    }

    /// Submit a record: finalize defaults, scrub, enqueue.
    ///
    /// Never returns an error; delivery problems are handled inside the
    /// queue and reported through the diagnostic log.
    pub async fn log(&self, mut record: CallRecord) {
        record.finalize();
        self.scrub(&mut record);
        self.queue.push(record).await;
    }

    /// Submit a record within a trace context.
    pub async fn log_in(&self, ctx: &TraceContext, mut record: CallRecord) {
        ctx.apply_to(&mut record);
        self.log(record).await;
    }

    /// Submit a record within a session, remembering its span id for
    /// later feedback.
    pub async fn log_session(&self, session: &Session, mut record: CallRecord) {
        record.finalize();
        session.apply_to(&mut record);
        session.remember_span(&record.span_id);
        self.scrub(&mut record);
        self.queue.push(record).await;
    }

    /// Attach a 1-5 rating (and optional comment) to the last record the
    /// session emitted. Rating validation is the only error surfaced from
    /// the submission path.
    pub async fn log_feedback(
        &self,
        session: &Session,
        rating: u8,
        comment: Option<&str>,
    ) -> Result<(), FeedbackError> {
        let record = session.feedback_record(rating, comment)?;
        self.log(record).await;
        Ok(())
    }

    /// Force a delivery attempt for everything currently buffered.
    pub async fn flush(&self) {
        self.queue.flush().await;
    }

    /// One final flush, then the pipeline stops accepting records.
    pub async fn shutdown(&self) {
        self.queue.shutdown().await;
    }

    /// Number of records currently buffered.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    fn scrub(&self, record: &mut CallRecord) {
        let scrubber = match &self.scrubber {
            Some(s) if s.action() != PiiAction::None => s,
            _ => return,
        };
        record.input = scrubber.process(&record.input);
        record.output = scrubber.process(&record.output);
        if let Some(message) = &record.error_message {
            record.error_message = Some(scrubber.scrub_text(message));
        }
        for value in record.metadata.values_mut() {
            *value = scrubber.process(value);
        }
    }
}
