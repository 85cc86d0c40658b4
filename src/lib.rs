//! Client-side telemetry SDK for LLM call monitoring.
//!
//! Records describing individual model invocations are optionally scrubbed
//! of sensitive content, batched with bounded memory, and shipped to a
//! remote collector with best-effort delivery.
//!
//! ```rust,no_run
//! use modeltrace::{CallRecord, Client, ClientConfig};
//! use serde_json::json;
//!
//! # async fn run() {
//! let client = Client::from_config(ClientConfig::new("mt-api-key")).unwrap();
//! client
//!     .log(
//!         CallRecord::new("gpt-4o", "openai")
//!             .with_input(json!({"prompt": "hello"}))
//!             .with_tokens(12, 48)
//!             .with_latency_ms(350),
//!     )
//!     .await;
//! client.shutdown().await;
//! # }
//! ```

pub mod client;
pub mod config;
pub mod context;
pub mod patterns;
pub mod queue;
pub mod record;
pub mod scrub;
pub mod transport;

pub use client::Client;
pub use config::{ClientConfig, ConfigError, PiiConfig};
pub use context::{FeedbackError, Session, TraceContext};
pub use patterns::{PatternRegistry, PiiAction};
pub use queue::{BatchQueue, MAX_QUEUE_SIZE};
pub use record::{CallRecord, CallStatus};
pub use scrub::{PiiMatch, Scrubber};
pub use transport::{NoopTransport, Transport};

#[cfg(feature = "http")]
pub use transport::{HttpTransport, HttpTransportConfig};
