//! Production loop behaviour against a scripted delivery channel.
//!
//! No broker is involved: `StubChannel` decides per send whether the
//! record is acknowledged, rejected, lost or fatal, and counts every
//! flush and close so lifecycle guarantees can be asserted.

use async_trait::async_trait;
use event_generator::{Event, EventType};
use event_producer::{
    ChannelError, DeliveryChannel, DeliveryError, DeliveryHandle, DeliveryReceipt, EventProducer,
    LoopState, ProducerError, ProductionConfig, Record, StopReason, DELIVERY_TARGET,
};
use futures::FutureExt;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;
use tokio_test::{assert_err, assert_ok};
use tokio_util::sync::CancellationToken;
use tracing::subscriber::DefaultGuard;
use tracing::{Level, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::Layer;

/// Upper bound for anything that should finish promptly.
const PROMPT: Duration = Duration::from_secs(5);

#[derive(Clone, Copy)]
enum SendBehavior {
    Succeed,
    /// Reject every n-th send (1-based).
    RejectEvery(u64),
    /// Never resolve.
    Hang,
    /// Fail fatally on the n-th send (1-based).
    FatalAt(u64),
}

#[derive(Default)]
struct Calls {
    sends: AtomicU64,
    flushes: AtomicU64,
    closes: AtomicU64,
    records: Mutex<Vec<Record>>,
    sent: Notify,
}

impl Calls {
    fn sends(&self) -> u64 {
        self.sends.load(Ordering::SeqCst)
    }

    fn flushes(&self) -> u64 {
        self.flushes.load(Ordering::SeqCst)
    }

    fn closes(&self) -> u64 {
        self.closes.load(Ordering::SeqCst)
    }
}

struct StubChannel {
    behavior: SendBehavior,
    fail_flush: bool,
    fail_close: bool,
    calls: Arc<Calls>,
}

impl StubChannel {
    fn new(behavior: SendBehavior) -> (Self, Arc<Calls>) {
        let calls = Arc::new(Calls::default());
        let channel = Self {
            behavior,
            fail_flush: false,
            fail_close: false,
            calls: Arc::clone(&calls),
        };
        (channel, calls)
    }

    fn failing_flush(mut self) -> Self {
        self.fail_flush = true;
        self
    }

    fn failing_close(mut self) -> Self {
        self.fail_close = true;
        self
    }
}

#[async_trait]
impl DeliveryChannel for StubChannel {
    fn send(&self, record: &Record) -> Result<DeliveryHandle, DeliveryError> {
        let n = self.calls.sends.fetch_add(1, Ordering::SeqCst) + 1;
        self.calls.records.lock().unwrap().push(record.clone());
        self.calls.sent.notify_one();

        let receipt = DeliveryReceipt {
            partition: (n % 3) as i32,
            offset: n as i64,
        };
        let handle: DeliveryHandle = match self.behavior {
            SendBehavior::Succeed => futures::future::ready(Ok(receipt)).boxed(),
            SendBehavior::RejectEvery(k) if n % k == 0 => futures::future::ready(Err(
                DeliveryError::Rejected("NotEnoughReplicas".to_string()),
            ))
            .boxed(),
            SendBehavior::RejectEvery(_) => futures::future::ready(Ok(receipt)).boxed(),
            SendBehavior::Hang => futures::future::pending().boxed(),
            SendBehavior::FatalAt(k) if n == k => futures::future::ready(Err(
                DeliveryError::Fatal("producer fenced".to_string()),
            ))
            .boxed(),
            SendBehavior::FatalAt(_) => futures::future::ready(Ok(receipt)).boxed(),
        };
        Ok(handle)
    }

    async fn flush(&self, _timeout: Duration) -> Result<(), ChannelError> {
        self.calls.flushes.fetch_add(1, Ordering::SeqCst);
        if self.fail_flush {
            return Err(ChannelError::Flush("broker unavailable".to_string()));
        }
        Ok(())
    }

    async fn close(self) -> Result<(), ChannelError> {
        self.calls.closes.fetch_add(1, Ordering::SeqCst);
        if self.fail_close {
            return Err(ChannelError::Close(
                "1 message(s) still in flight".to_string(),
            ));
        }
        Ok(())
    }
}

/// Counts the per-event delivery records the loop emits.
#[derive(Clone, Default)]
struct DeliveryLog {
    sent: Arc<AtomicUsize>,
    failed: Arc<AtomicUsize>,
}

impl DeliveryLog {
    fn install(&self) -> DefaultGuard {
        let subscriber = tracing_subscriber::registry().with(self.clone());
        tracing::subscriber::set_default(subscriber)
    }

    fn sent(&self) -> usize {
        self.sent.load(Ordering::SeqCst)
    }

    fn failed(&self) -> usize {
        self.failed.load(Ordering::SeqCst)
    }
}

impl<S: Subscriber> Layer<S> for DeliveryLog {
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        if metadata.target() != DELIVERY_TARGET {
            return;
        }
        match *metadata.level() {
            Level::INFO => {
                self.sent.fetch_add(1, Ordering::SeqCst);
            }
            Level::WARN => {
                self.failed.fetch_add(1, Ordering::SeqCst);
            }
            _ => {}
        }
    }
}

fn config(rate_min: f64, rate_max: f64, max_events: Option<u64>) -> ProductionConfig {
    ProductionConfig {
        rate_min,
        rate_max,
        max_events,
        seed: Some(42),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_max_events_with_zero_pacing() {
    let log = DeliveryLog::default();
    let _guard = log.install();

    let (channel, calls) = StubChannel::new(SendBehavior::Succeed);
    let producer = assert_ok!(EventProducer::new(
        channel,
        config(0.0, 0.0, Some(5)),
        CancellationToken::new()
    ));

    let report = assert_ok!(producer.run().await);

    assert_eq!(report.events_sent, 5);
    assert_eq!(report.events_failed, 0);
    assert_eq!(report.final_state, LoopState::Closed);
    assert_eq!(report.stop_reason, StopReason::MaxEventsReached);
    assert_eq!(calls.sends(), 5);
    assert_eq!(calls.flushes(), 1);
    assert_eq!(calls.closes(), 1);
    assert_eq!(log.sent(), 5);
    assert_eq!(log.failed(), 0);
}

#[tokio::test]
async fn test_records_carry_valid_events() {
    let (channel, calls) = StubChannel::new(SendBehavior::Succeed);
    let producer = assert_ok!(EventProducer::new(
        channel,
        config(0.0, 0.0, Some(20)),
        CancellationToken::new()
    ));
    assert_ok!(producer.run().await);

    let records = calls.records.lock().unwrap();
    assert_eq!(records.len(), 20);
    for record in records.iter() {
        let event: Event = serde_json::from_slice(&record.payload).unwrap();
        assert_eq!(record.key, event.user_id);
        assert!(EventType::ALL.contains(&event.event_type));
        let amount = event.amount.round_dp(2);
        assert!(amount >= rust_decimal::Decimal::new(1000, 2));
        assert!(amount <= rust_decimal::Decimal::new(10000, 2));
    }
}

#[tokio::test]
async fn test_rejected_sends_are_not_counted_or_retried() {
    let log = DeliveryLog::default();
    let _guard = log.install();

    let (channel, calls) = StubChannel::new(SendBehavior::RejectEvery(3));
    let producer = assert_ok!(EventProducer::new(
        channel,
        config(0.0, 0.0, Some(6)),
        CancellationToken::new()
    ));

    let report = assert_ok!(producer.run().await);

    // sends 3 and 6 are rejected, so two extra sends are needed
    assert_eq!(report.events_sent, 6);
    assert_eq!(report.events_failed, 2);
    assert_eq!(calls.sends(), 8);
    assert_eq!(calls.sends() / 3, report.events_failed);
    assert_eq!(report.events_generated, 8);
    assert_eq!(log.sent(), 6);
    assert_eq!(log.failed(), 2);
    assert_eq!(calls.flushes(), 1);
    assert_eq!(calls.closes(), 1);
}

#[tokio::test]
async fn test_cancellation_interrupts_pacing() {
    let (channel, calls) = StubChannel::new(SendBehavior::Succeed);
    let shutdown = CancellationToken::new();
    let producer = assert_ok!(EventProducer::new(
        channel,
        config(60.0, 60.0, None),
        shutdown.clone()
    ));

    let run = tokio::spawn(producer.run());

    // First send happens immediately, then the loop sleeps for a minute
    assert_ok!(tokio::time::timeout(PROMPT, calls.sent.notified()).await);
    shutdown.cancel();

    let report = assert_ok!(assert_ok!(assert_ok!(tokio::time::timeout(PROMPT, run).await)));

    assert_eq!(report.events_sent, 1);
    assert_eq!(report.stop_reason, StopReason::Cancelled);
    assert_eq!(report.final_state, LoopState::Closed);
    assert_eq!(calls.sends(), 1);
    assert_eq!(calls.flushes(), 1);
    assert_eq!(calls.closes(), 1);
}

#[tokio::test]
async fn test_cancellation_interrupts_send_wait() {
    let (channel, calls) = StubChannel::new(SendBehavior::Hang);
    let shutdown = CancellationToken::new();
    let config = ProductionConfig {
        send_timeout: Duration::from_secs(60),
        ..config(0.0, 0.0, None)
    };
    let producer = assert_ok!(EventProducer::new(channel, config, shutdown.clone()));

    let run = tokio::spawn(producer.run());

    assert_ok!(tokio::time::timeout(PROMPT, calls.sent.notified()).await);
    shutdown.cancel();

    let report = assert_ok!(assert_ok!(assert_ok!(tokio::time::timeout(PROMPT, run).await)));

    assert_eq!(report.events_sent, 0);
    assert_eq!(report.events_failed, 0);
    assert_eq!(report.stop_reason, StopReason::Cancelled);
    assert_eq!(calls.flushes(), 1);
    assert_eq!(calls.closes(), 1);
}

#[tokio::test]
async fn test_cancelled_before_start_sends_nothing() {
    let (channel, calls) = StubChannel::new(SendBehavior::Succeed);
    let shutdown = CancellationToken::new();
    shutdown.cancel();

    let producer = assert_ok!(EventProducer::new(
        channel,
        config(0.0, 0.0, Some(10)),
        shutdown
    ));
    let report = assert_ok!(producer.run().await);

    assert_eq!(report.events_sent, 0);
    assert_eq!(report.stop_reason, StopReason::Cancelled);
    assert_eq!(calls.sends(), 0);
    assert_eq!(calls.flushes(), 1);
    assert_eq!(calls.closes(), 1);
}

#[tokio::test]
async fn test_send_timeout_counts_as_miss() {
    let log = DeliveryLog::default();
    let _guard = log.install();

    let (channel, calls) = StubChannel::new(SendBehavior::Hang);
    let shutdown = CancellationToken::new();
    let config = ProductionConfig {
        send_timeout: Duration::from_millis(20),
        ..config(0.0, 0.0, None)
    };
    let producer = assert_ok!(EventProducer::new(channel, config, shutdown.clone()));

    let run = producer.run();
    let cancel_after_three = async {
        while calls.sends() < 3 {
            calls.sent.notified().await;
        }
        shutdown.cancel();
    };
    let (result, ()) = tokio::join!(run, cancel_after_three);

    let report = assert_ok!(result);
    assert_eq!(report.events_sent, 0);
    assert!(report.events_failed >= 2, "{report:?}");
    assert_eq!(log.failed() as u64, report.events_failed);
    assert_eq!(calls.flushes(), 1);
    assert_eq!(calls.closes(), 1);
}

#[tokio::test]
async fn test_fatal_delivery_error_stops_the_run() {
    let (channel, calls) = StubChannel::new(SendBehavior::FatalAt(3));
    let producer = assert_ok!(EventProducer::new(
        channel,
        config(0.0, 0.0, None),
        CancellationToken::new()
    ));

    let err = assert_err!(producer.run().await);

    match &err {
        ProducerError::Fatal {
            events_sent,
            source,
        } => {
            assert_eq!(*events_sent, 2);
            assert!(source.is_fatal());
        }
        other => panic!("Expected fatal error, got {other:?}"),
    }
    assert_eq!(err.events_sent(), Some(2));
    assert_eq!(calls.sends(), 3);
    assert_eq!(calls.flushes(), 1);
    assert_eq!(calls.closes(), 1);
}

#[tokio::test]
async fn test_flush_failure_is_a_drain_error() {
    let (channel, calls) = StubChannel::new(SendBehavior::Succeed);
    let producer = assert_ok!(EventProducer::new(
        channel.failing_flush(),
        config(0.0, 0.0, Some(3)),
        CancellationToken::new()
    ));

    let err = assert_err!(producer.run().await);

    assert!(
        matches!(err, ProducerError::Drain { events_sent: 3, .. }),
        "{err:?}"
    );
    assert_eq!(calls.flushes(), 1);
    // close still runs after a failed flush
    assert_eq!(calls.closes(), 1);
}

#[tokio::test]
async fn test_close_failure_is_a_drain_error() {
    let (channel, calls) = StubChannel::new(SendBehavior::Succeed);
    let producer = assert_ok!(EventProducer::new(
        channel.failing_close(),
        config(0.0, 0.0, Some(4)),
        CancellationToken::new()
    ));

    let err = assert_err!(producer.run().await);

    assert!(
        matches!(
            err,
            ProducerError::Drain {
                events_sent: 4,
                source: ChannelError::Close(_)
            }
        ),
        "{err:?}"
    );
    assert_eq!(err.events_sent(), Some(4));
    assert_eq!(calls.flushes(), 1);
    assert_eq!(calls.closes(), 1);
}

#[tokio::test]
async fn test_unusable_timing_never_starts_the_loop() {
    let huge_rate = config(1e300, 1e300, None);
    let zero_send_timeout = ProductionConfig {
        send_timeout: Duration::ZERO,
        ..config(0.0, 0.0, Some(3))
    };
    let zero_flush_timeout = ProductionConfig {
        flush_timeout: Duration::ZERO,
        ..config(0.0, 0.0, Some(3))
    };

    for config in [huge_rate, zero_send_timeout, zero_flush_timeout] {
        let (channel, calls) = StubChannel::new(SendBehavior::Succeed);
        let result = EventProducer::new(channel, config, CancellationToken::new());

        assert!(
            matches!(result, Err(ProducerError::Configuration(_))),
            "unexpected: {:?}",
            result.err()
        );
        assert_eq!(calls.sends(), 0);
    }
}

#[tokio::test]
async fn test_invalid_rates_never_start_the_loop() {
    for (rate_min, rate_max) in [(5.0, 1.0), (-1.0, 2.0), (0.0, -0.5)] {
        let (channel, calls) = StubChannel::new(SendBehavior::Succeed);
        let result = EventProducer::new(
            channel,
            config(rate_min, rate_max, Some(1)),
            CancellationToken::new(),
        );

        assert!(
            matches!(result, Err(ProducerError::Configuration(_))),
            "{rate_min}..{rate_max} was accepted"
        );
        assert_eq!(calls.sends(), 0);
        assert_eq!(calls.flushes(), 0);
        assert_eq!(calls.closes(), 0);
    }
}

#[tokio::test]
async fn test_seeded_runs_produce_identical_fields() {
    let mut payloads = Vec::new();
    for _ in 0..2 {
        let (channel, calls) = StubChannel::new(SendBehavior::Succeed);
        let producer = assert_ok!(EventProducer::new(
            channel,
            config(0.0, 0.0, Some(3)),
            CancellationToken::new()
        ));
        assert_ok!(producer.run().await);

        let fields: Vec<(String, String)> = calls
            .records
            .lock()
            .unwrap()
            .iter()
            .map(|record| {
                let event: Event = serde_json::from_slice(&record.payload).unwrap();
                (event.user_id, event.product)
            })
            .collect();
        payloads.push(fields);
    }
    assert_eq!(payloads[0], payloads[1]);
}
