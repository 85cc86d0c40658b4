//! Batching queue with bounded memory and best-effort delivery.
//!
//! Records accumulate in a FIFO buffer until a size or time threshold
//! triggers a flush, which detaches the whole buffer as a snapshot and
//! hands it to the transport. A failed delivery is re-queued at the front
//! of the buffer, ahead of anything pushed during the attempt, and the
//! buffer is then trimmed oldest-first back to capacity. Delivery failures
//! never reach the caller of `push`; they only show up in the diagnostic
//! log.

use crate::record::CallRecord;
use crate::transport::Transport;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Hard ceiling on buffered records. Kept well above the default batch
/// size so re-queue trimming does not thrash.
pub const MAX_QUEUE_SIZE: usize = 1000;

struct QueueInner {
    buf: VecDeque<CallRecord>,
    last_flush: Instant,
    shutting_down: bool,
}

/// Buffers [`CallRecord`]s and delivers them through a [`Transport`].
///
/// The buffer is guarded by a single lock that is never held across an
/// await point: a flush detaches its snapshot and resets the flush timer
/// under the lock, then delivers outside it, so a slow delivery never
/// blocks concurrent pushes.
pub struct BatchQueue {
    transport: Arc<dyn Transport>,
    batch_size: usize,
    flush_interval: Duration,
    synchronous: bool,
    inner: Mutex<QueueInner>,
}

impl BatchQueue {
    /// Create a queue over the given transport.
    ///
    /// Minimal thresholds are enforced for `batch_size` and
    /// `flush_interval` to avoid degenerate configurations.
    pub fn new(
        transport: Arc<dyn Transport>,
        batch_size: usize,
        flush_interval: Duration,
        synchronous: bool,
    ) -> Self {
        let batch_size = batch_size.max(1);
        let flush_interval = flush_interval.max(Duration::from_millis(10));

        BatchQueue {
            transport,
            batch_size,
            flush_interval,
            synchronous,
            inner: Mutex::new(QueueInner {
                buf: VecDeque::new(),
                last_flush: Instant::now(),
                shutting_down: false,
            }),
        }
    }

    /// Append a record and evaluate the flush triggers.
    ///
    /// No-op once the queue is shutting down. At capacity the single
    /// oldest buffered record is dropped before appending; availability
    /// and bounded memory win over completeness. In synchronous mode the
    /// call returns only after one flush attempt completes.
    pub async fn push(&self, record: CallRecord) {
        let should_flush = {
            let mut inner = self.inner.lock();
            if inner.shutting_down {
                debug!("queue is shutting down, record discarded");
                return;
            }
            if inner.buf.len() >= MAX_QUEUE_SIZE {
                inner.buf.pop_front();
                warn!(capacity = MAX_QUEUE_SIZE, "queue at capacity, dropped oldest record");
            }
            inner.buf.push_back(record);

            self.synchronous
                || inner.buf.len() >= self.batch_size
                || inner.last_flush.elapsed() >= self.flush_interval
        };

        if should_flush {
            self.flush().await;
        }
    }

    /// Detach the current buffer and attempt delivery.
    ///
    /// The snapshot is taken and the flush timer reset before the network
    /// is touched. A single-record snapshot uses the single-record
    /// transport path, larger snapshots use the batch path. On failure
    /// the snapshot goes back to the front of the live buffer (unless the
    /// queue is shutting down) and the buffer is trimmed oldest-first to
    /// capacity.
    pub async fn flush(&self) {
        let batch: Vec<CallRecord> = {
            let mut inner = self.inner.lock();
            if inner.buf.is_empty() {
                return;
            }
            inner.last_flush = Instant::now();
            inner.buf.drain(..).collect()
        };

        let result = if batch.len() == 1 {
            self.transport.send_one(&batch[0]).await
        } else {
            self.transport.send_many(&batch).await
        };

        if let Err(err) = result {
            warn!(count = batch.len(), error = %err, "delivery failed, re-queuing batch");
            let mut inner = self.inner.lock();
            if inner.shutting_down {
                return;
            }
            for record in batch.into_iter().rev() {
                inner.buf.push_front(record);
            }
            let mut evicted = 0usize;
            while inner.buf.len() > MAX_QUEUE_SIZE {
                inner.buf.pop_front();
                evicted += 1;
            }
            if evicted > 0 {
                warn!(evicted, "queue over capacity after re-queue, dropped oldest records");
            }
        }
    }

    /// Enter the terminal state and make one final flush attempt.
    ///
    /// Records still undelivered after that attempt are discarded.
    /// Repeat calls are no-ops.
    pub async fn shutdown(&self) {
        {
            let mut inner = self.inner.lock();
            if inner.shutting_down {
                return;
            }
            inner.shutting_down = true;
        }
        self.flush().await;
    }

    pub fn len(&self) -> usize {
        self.inner.lock().buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().buf.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::BoxError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Delivery {
        One(String),
        Many(Vec<String>),
    }

    /// Scripted transport: fails the next `fail_next` attempts, records
    /// every attempt's span ids.
    #[derive(Default)]
    struct MockTransport {
        deliveries: Mutex<Vec<Delivery>>,
        fail_next: AtomicUsize,
    }

    impl MockTransport {
        fn fail_times(&self, n: usize) {
            self.fail_next.store(n, Ordering::SeqCst);
        }

        fn take_failure(&self) -> bool {
            self.fail_next
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
        }

        fn deliveries(&self) -> Vec<Delivery> {
            self.deliveries.lock().clone()
        }

        fn delivered_ids(&self) -> Vec<String> {
            self.deliveries()
                .into_iter()
                .flat_map(|d| match d {
                    Delivery::One(id) => vec![id],
                    Delivery::Many(ids) => ids,
                })
                .collect()
        }
    }

    #[async_trait]
    impl Transport for MockTransport {
        async fn send_one(&self, record: &CallRecord) -> Result<(), BoxError> {
            if self.take_failure() {
                return Err("injected failure".into());
            }
            self.deliveries
                .lock()
                .push(Delivery::One(record.span_id.clone()));
            Ok(())
        }

        async fn send_many(&self, records: &[CallRecord]) -> Result<(), BoxError> {
            if self.take_failure() {
                return Err("injected failure".into());
            }
            self.deliveries.lock().push(Delivery::Many(
                records.iter().map(|r| r.span_id.clone()).collect(),
            ));
            Ok(())
        }
    }

    fn record(id: &str) -> CallRecord {
        let mut r = CallRecord::new("gpt-4o", "openai");
        r.span_id = id.to_string();
        r
    }

    fn queue(transport: &Arc<MockTransport>, batch_size: usize, synchronous: bool) -> BatchQueue {
        BatchQueue::new(
            transport.clone() as Arc<dyn Transport>,
            batch_size,
            Duration::from_secs(3600),
            synchronous,
        )
    }

    #[tokio::test]
    async fn below_batch_size_no_delivery() {
        let transport = Arc::new(MockTransport::default());
        let q = queue(&transport, 5, false);
        for i in 0..4 {
            q.push(record(&i.to_string())).await;
        }
        assert!(transport.deliveries().is_empty());
        assert_eq!(q.len(), 4);
    }

    #[tokio::test]
    async fn exactly_batch_size_triggers_one_batch_delivery() {
        let transport = Arc::new(MockTransport::default());
        let q = queue(&transport, 3, false);
        for i in 0..3 {
            q.push(record(&i.to_string())).await;
        }
        assert_eq!(
            transport.deliveries(),
            vec![Delivery::Many(vec!["0".into(), "1".into(), "2".into()])]
        );
        assert!(q.is_empty());
    }

    #[tokio::test]
    async fn single_record_flush_uses_single_record_path() {
        let transport = Arc::new(MockTransport::default());
        let q = queue(&transport, 10, false);
        q.push(record("a")).await;
        q.flush().await;
        assert_eq!(transport.deliveries(), vec![Delivery::One("a".into())]);
    }

    #[tokio::test]
    async fn synchronous_mode_flushes_every_push() {
        let transport = Arc::new(MockTransport::default());
        let q = queue(&transport, 100, true);
        q.push(record("a")).await;
        q.push(record("b")).await;
        assert_eq!(
            transport.deliveries(),
            vec![Delivery::One("a".into()), Delivery::One("b".into())]
        );
        assert!(q.is_empty());
    }

    #[tokio::test]
    async fn time_trigger_flushes_nonempty_buffer() {
        let transport = Arc::new(MockTransport::default());
        let q = BatchQueue::new(
            transport.clone() as Arc<dyn Transport>,
            100,
            Duration::from_millis(10),
            false,
        );
        q.push(record("a")).await;
        tokio::time::sleep(Duration::from_millis(30)).await;
        q.push(record("b")).await;
        assert_eq!(
            transport.deliveries(),
            vec![Delivery::Many(vec!["a".into(), "b".into()])]
        );
    }

    #[tokio::test]
    async fn empty_flush_is_a_noop() {
        let transport = Arc::new(MockTransport::default());
        let q = queue(&transport, 3, false);
        q.flush().await;
        assert!(transport.deliveries().is_empty());
    }

    #[tokio::test]
    async fn failed_batch_is_requeued_ahead_of_newer_records() {
        let transport = Arc::new(MockTransport::default());
        let q = queue(&transport, 3, false);

        transport.fail_times(1);
        for i in 0..3 {
            q.push(record(&format!("old-{}", i))).await;
        }
        // Failed attempt re-queued; nothing delivered yet.
        assert!(transport.deliveries().is_empty());
        assert_eq!(q.len(), 3);

        q.push(record("new-0")).await;
        q.flush().await;

        assert_eq!(
            transport.delivered_ids(),
            vec!["old-0", "old-1", "old-2", "new-0"]
        );
        // Exactly one downstream delivery of the retried set.
        assert_eq!(transport.deliveries().len(), 1);
        assert!(q.is_empty());
    }

    #[tokio::test]
    async fn overflow_keeps_most_recent_records() {
        let transport = Arc::new(MockTransport::default());
        let q = BatchQueue::new(
            transport.clone() as Arc<dyn Transport>,
            MAX_QUEUE_SIZE + 100,
            Duration::from_secs(3600),
            false,
        );
        let extra = 25;
        for i in 0..MAX_QUEUE_SIZE + extra {
            q.push(record(&i.to_string())).await;
        }
        assert_eq!(q.len(), MAX_QUEUE_SIZE);
        assert!(transport.deliveries().is_empty());

        q.flush().await;
        let ids = transport.delivered_ids();
        assert_eq!(ids.len(), MAX_QUEUE_SIZE);
        assert_eq!(ids[0], extra.to_string());
        assert_eq!(ids[MAX_QUEUE_SIZE - 1], (MAX_QUEUE_SIZE + extra - 1).to_string());
    }

    #[tokio::test]
    async fn requeue_trims_oldest_when_over_capacity() {
        let transport = Arc::new(MockTransport::default());
        let q = BatchQueue::new(
            transport.clone() as Arc<dyn Transport>,
            MAX_QUEUE_SIZE + 100,
            Duration::from_secs(3600),
            false,
        );
        for i in 0..MAX_QUEUE_SIZE {
            q.push(record(&i.to_string())).await;
        }
        transport.fail_times(1);
        q.flush().await;
        // The failed snapshot went back to the front in full.
        assert_eq!(q.len(), MAX_QUEUE_SIZE);

        // New arrivals push the buffer over capacity; oldest go first.
        q.push(record("fresh")).await;
        assert_eq!(q.len(), MAX_QUEUE_SIZE);

        q.flush().await;
        let ids = transport.delivered_ids();
        assert_eq!(ids[0], "1");
        assert_eq!(ids.last().unwrap(), "fresh");
    }

    #[tokio::test]
    async fn shutdown_makes_one_final_attempt_then_drops() {
        let transport = Arc::new(MockTransport::default());
        let q = queue(&transport, 100, false);
        q.push(record("a")).await;
        q.shutdown().await;
        assert_eq!(transport.deliveries(), vec![Delivery::One("a".into())]);

        // Terminal: later pushes and shutdowns are no-ops.
        q.push(record("b")).await;
        q.shutdown().await;
        assert!(q.is_empty());
        assert_eq!(transport.deliveries().len(), 1);
    }

    #[tokio::test]
    async fn failed_shutdown_flush_discards_without_requeue() {
        let transport = Arc::new(MockTransport::default());
        let q = queue(&transport, 100, false);
        q.push(record("a")).await;
        q.push(record("b")).await;
        transport.fail_times(1);
        q.shutdown().await;
        assert!(transport.deliveries().is_empty());
        assert!(q.is_empty());
    }

    #[tokio::test]
    async fn delivery_failure_never_propagates_to_push() {
        let transport = Arc::new(MockTransport::default());
        let q = queue(&transport, 1, true);
        transport.fail_times(10);
        // Synchronous pushes against a failing transport still return.
        for i in 0..3 {
            q.push(record(&i.to_string())).await;
        }
        assert!(transport.deliveries().is_empty());
    }
}
