use crate::record::CallRecord;
use async_trait::async_trait;
use std::error::Error;

/// Error type shared across transport implementations.
pub type BoxError = Box<dyn Error + Send + Sync>;

/// Asynchronous destination for [`CallRecord`]s drained from the batching
/// queue.
///
/// Implementations are responsible for delivering records to a concrete
/// collector (the hosted HTTP endpoint, stdout, a test double, etc). The
/// queue calls these methods only from its flush path.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Deliver a single record.
    ///
    /// **Returns**
    /// - `Ok(())` if the collector accepted the record.
    /// - `Err(..)` on any non-success response or connectivity failure.
    ///   The queue treats this as a transient failure and re-queues the
    ///   batch.
    async fn send_one(&self, record: &CallRecord) -> Result<(), BoxError>;

    /// Deliver a batch of records in one call.
    ///
    /// Same failure contract as [`Transport::send_one`]; a failed batch is
    /// re-queued as a whole.
    async fn send_many(&self, records: &[CallRecord]) -> Result<(), BoxError>;
}

/// A transport that simply drops all records.
///
/// Useful for measuring the overhead of the pipeline itself without any
/// external I/O, and for unit tests that don't care about delivery.
#[derive(Clone, Default)]
pub struct NoopTransport;

#[async_trait]
impl Transport for NoopTransport {
    async fn send_one(&self, _record: &CallRecord) -> Result<(), BoxError> {
        Ok(())
    }

    async fn send_many(&self, _records: &[CallRecord]) -> Result<(), BoxError> {
        Ok(())
    }
}

#[cfg(feature = "http")]
pub use http::{HttpTransport, HttpTransportConfig};

#[cfg(feature = "http")]
mod http {
    use super::{BoxError, CallRecord, Transport};
    use async_trait::async_trait;
    use reqwest::Client;
    use serde::Serialize;
    use std::time::Duration;

    /// Configuration for [`HttpTransport`].
    #[derive(Clone, Debug)]
    pub struct HttpTransportConfig {
        /// Base URL without path, e.g. "https://api.modeltrace.dev".
        pub endpoint: String,
        /// API key sent as a bearer token.
        pub api_key: String,
        /// Per-request timeout; a timed-out delivery is reported as a
        /// plain transport failure.
        pub request_timeout: Duration,
    }

    /// Collector transport speaking JSON over HTTP.
    ///
    /// Single records go to `POST {endpoint}/v1/logs`, batches to
    /// `POST {endpoint}/v1/logs/batch`.
    #[derive(Clone)]
    pub struct HttpTransport {
        client: Client,
        config: HttpTransportConfig,
    }

    #[derive(Serialize)]
    struct BatchBody<'a> {
        records: &'a [CallRecord],
    }

    impl HttpTransport {
        pub fn new(config: HttpTransportConfig) -> Result<Self, BoxError> {
            let client = Client::builder()
                .timeout(config.request_timeout)
                .build()?;
            Ok(Self { client, config })
        }

        fn endpoint(&self, path: &str) -> String {
            format!("{}/{}", self.config.endpoint.trim_end_matches('/'), path)
        }

        async fn post<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> Result<(), BoxError> {
            let resp = self
                .client
                .post(self.endpoint(path))
                .bearer_auth(&self.config.api_key)
                .json(body)
                .send()
                .await?;

            if resp.status().is_success() {
                Ok(())
            } else {
                let status = resp.status();
                let text = resp.text().await.unwrap_or_else(|_| "<no body>".to_string());
                Err(format!("collector rejected delivery with status {}: {}", status, text).into())
            }
        }
    }

    #[async_trait]
    impl Transport for HttpTransport {
        async fn send_one(&self, record: &CallRecord) -> Result<(), BoxError> {
            self.post("v1/logs", record).await
        }

        async fn send_many(&self, records: &[CallRecord]) -> Result<(), BoxError> {
            self.post("v1/logs/batch", &BatchBody { records }).await
        }
    }
}
