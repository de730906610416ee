//! The paced production loop.
//!
//! One [`EventProducer`] drives one run. It moves through
//! `Init → Running → Draining → Closed`:
//!
//! ```text
//!            ┌───────────────────────────────┐
//!            ▼                               │
//! Init ─► Running ─ create ─► send ─► pace ──┘
//!            │  cap reached / cancelled / fatal delivery error
//!            ▼
//!        Draining ─ flush() once, close() once
//!            │
//!            ▼
//!         Closed ─► ProductionReport (or ProducerError)
//! ```
//!
//! Both suspension points, the send wait and the pacing sleep, race against
//! the run's [`CancellationToken`].

use crate::channel::{DeliveryChannel, DeliveryReceipt};
use crate::config::ProductionConfig;
use crate::encoder::encode_event;
use crate::error::{ChannelError, DeliveryError, ProducerError};
use event_generator::generators::numeric::generate_f64_range;
use event_generator::{Event, EventFactory, FakeFieldGenerator, FieldGenerator};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Tracing target of the per-event delivery records.
pub const DELIVERY_TARGET: &str = "event_producer::delivery";

/// Lifecycle of a production run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Init,
    Running,
    Draining,
    Closed,
}

/// Why a run stopped producing without a fatal error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    MaxEventsReached,
    Cancelled,
}

/// Counters and lifecycle state owned by the loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunState {
    pub events_sent: u64,
    pub events_failed: u64,
    state: LoopState,
}

impl RunState {
    fn new() -> Self {
        Self {
            events_sent: 0,
            events_failed: 0,
            state: LoopState::Init,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> LoopState {
        self.state
    }

    fn transition(&mut self, next: LoopState) {
        debug!("Production loop {:?} -> {:?}", self.state, next);
        self.state = next;
    }
}

/// Summary of a completed run.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductionReport {
    /// Events the factory created, delivered or not.
    pub events_generated: u64,
    /// Events the broker acknowledged.
    pub events_sent: u64,
    /// Events that were generated but not delivered.
    pub events_failed: u64,
    pub final_state: LoopState,
    pub stop_reason: StopReason,
    pub elapsed: Duration,
}

impl ProductionReport {
    /// Calculate delivered events per second.
    pub fn events_per_second(&self) -> f64 {
        if self.elapsed.as_secs_f64() > 0.0 {
            self.events_sent as f64 / self.elapsed.as_secs_f64()
        } else {
            0.0
        }
    }
}

enum DeliveryOutcome {
    Delivered(DeliveryReceipt),
    Failed(DeliveryError),
    Cancelled,
}

/// Generates events and publishes them through a [`DeliveryChannel`] at a
/// randomized pace.
pub struct EventProducer<C: DeliveryChannel, G: FieldGenerator = FakeFieldGenerator> {
    channel: C,
    factory: EventFactory<G>,
    config: ProductionConfig,
    pacing_rng: StdRng,
    shutdown: CancellationToken,
}

impl<C: DeliveryChannel> EventProducer<C> {
    /// Create a producer with the default fake-data factory.
    ///
    /// A configured seed makes both event fields and pacing reproducible.
    pub fn new(
        channel: C,
        config: ProductionConfig,
        shutdown: CancellationToken,
    ) -> Result<Self, ProducerError> {
        let factory = match config.seed {
            Some(seed) => EventFactory::seeded(seed),
            None => EventFactory::new(),
        };
        Self::with_factory(channel, factory, config, shutdown)
    }
}

impl<C: DeliveryChannel, G: FieldGenerator> EventProducer<C, G> {
    /// Create a producer around an existing factory.
    ///
    /// Fails with [`ProducerError::Configuration`] if `config` is invalid.
    pub fn with_factory(
        channel: C,
        factory: EventFactory<G>,
        config: ProductionConfig,
        shutdown: CancellationToken,
    ) -> Result<Self, ProducerError> {
        config.validate()?;

        let pacing_rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed.rotate_left(32)),
            None => StdRng::from_entropy(),
        };

        Ok(Self {
            channel,
            factory,
            config,
            pacing_rng,
            shutdown,
        })
    }

    /// Run until the cap is reached, the token is cancelled, or the channel
    /// fails, then drain and close the channel.
    pub async fn run(mut self) -> Result<ProductionReport, ProducerError> {
        let started = Instant::now();
        let mut run = RunState::new();

        self.log_start();
        run.transition(LoopState::Running);

        let outcome = self.produce(&mut run).await;

        run.transition(LoopState::Draining);
        let drained = drain(self.channel, self.config.flush_timeout).await;
        run.transition(LoopState::Closed);

        let events_sent = run.events_sent;
        match (outcome, drained) {
            (Ok(stop_reason), Ok(())) => {
                let report = ProductionReport {
                    events_generated: self.factory.created(),
                    events_sent,
                    events_failed: run.events_failed,
                    final_state: run.state(),
                    stop_reason,
                    elapsed: started.elapsed(),
                };
                info!(
                    "Production finished: {} generated, {} sent, {} failed in {:?} ({:.2} events/sec)",
                    report.events_generated,
                    report.events_sent,
                    report.events_failed,
                    report.elapsed,
                    report.events_per_second()
                );
                Ok(report)
            }
            (Err(source), drained) => {
                if let Err(e) = drained {
                    warn!("Draining after the channel failure also failed: {e}");
                }
                error!("Stopping after {events_sent} events: {source}");
                Err(ProducerError::Fatal {
                    events_sent,
                    source,
                })
            }
            (Ok(_), Err(source)) => Err(ProducerError::Drain {
                events_sent,
                source,
            }),
        }
    }

    fn log_start(&self) {
        info!(
            "Starting to produce events to topic '{}'",
            self.config.topic
        );
        info!(
            "Rate: {}-{} seconds between events",
            self.config.rate_min, self.config.rate_max
        );
        match self.config.max_events {
            Some(max) => info!("Max events: {max}"),
            None => info!("Running indefinitely (Ctrl+C to stop)"),
        }
    }

    /// The `Running` state. Returns once the loop must drain.
    async fn produce(&mut self, run: &mut RunState) -> Result<StopReason, DeliveryError> {
        loop {
            if self.cap_reached(run.events_sent) {
                info!("Produced {} events. Stopping.", run.events_sent);
                return Ok(StopReason::MaxEventsReached);
            }
            if self.shutdown.is_cancelled() {
                return Ok(self.interrupted(run));
            }

            let event = self.factory.create_event();

            match self.deliver(&event).await {
                DeliveryOutcome::Delivered(receipt) => {
                    run.events_sent += 1;
                    info!(
                        target: DELIVERY_TARGET,
                        "[{}] Event sent: {:15} | User: {}... | Product: {:15} | Amount: ${:.2} | Partition: {}, Offset: {}",
                        run.events_sent,
                        event.event_type,
                        event.short_user_id(),
                        event.product,
                        event.amount,
                        receipt.partition,
                        receipt.offset
                    );
                }
                DeliveryOutcome::Failed(err) if err.is_fatal() => {
                    run.events_failed += 1;
                    return Err(err);
                }
                DeliveryOutcome::Failed(err) => {
                    run.events_failed += 1;
                    warn!(target: DELIVERY_TARGET, "Failed to send event: {err}");
                }
                DeliveryOutcome::Cancelled => return Ok(self.interrupted(run)),
            }

            // No point waiting out a delay that nothing follows
            if self.cap_reached(run.events_sent) {
                continue;
            }

            let delay = self.next_delay();
            tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => return Ok(self.interrupted(run)),
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }

    /// Submit one event and wait, bounded by the send timeout, for its outcome.
    async fn deliver(&self, event: &Event) -> DeliveryOutcome {
        let record = match encode_event(event) {
            Ok(record) => record,
            Err(err) => return DeliveryOutcome::Failed(err),
        };
        let handle = match self.channel.send(&record) {
            Ok(handle) => handle,
            Err(err) => return DeliveryOutcome::Failed(err),
        };

        let send_timeout = self.config.send_timeout;
        tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => {
                debug!("Abandoning wait for in-flight delivery; flush will drain it");
                DeliveryOutcome::Cancelled
            }
            result = tokio::time::timeout(send_timeout, handle) => match result {
                Ok(Ok(receipt)) => DeliveryOutcome::Delivered(receipt),
                Ok(Err(err)) => DeliveryOutcome::Failed(err),
                Err(_elapsed) => DeliveryOutcome::Failed(DeliveryError::Timeout(send_timeout)),
            },
        }
    }

    fn cap_reached(&self, events_sent: u64) -> bool {
        self.config
            .max_events
            .is_some_and(|max| events_sent >= max)
    }

    fn next_delay(&mut self) -> Duration {
        let secs = generate_f64_range(
            &mut self.pacing_rng,
            self.config.rate_min,
            self.config.rate_max,
        );
        Duration::from_secs_f64(secs)
    }

    fn interrupted(&self, run: &RunState) -> StopReason {
        info!("Interrupted. Produced {} events total.", run.events_sent);
        StopReason::Cancelled
    }
}

/// The `Draining` state: flush, then close even if the flush failed.
async fn drain<C: DeliveryChannel>(channel: C, timeout: Duration) -> Result<(), ChannelError> {
    let flushed = channel.flush(timeout).await;
    if let Err(e) = &flushed {
        warn!("Flush failed, closing the producer anyway: {e}");
    }
    let closed = channel.close().await;
    flushed.and(closed)
}
