//! Synthetic ecommerce event producer.
//!
//! Wires the [`event_producer`] production loop to a Kafka delivery channel
//! for the `ecommerce-event-producer` binary: validates the command line,
//! optionally provisions the topic, connects, and runs until the event cap
//! is reached or Ctrl+C is pressed.

use clap::Parser;
use event_producer::{
    create_topic_if_not_exists, EventProducer, KafkaChannelConfig, KafkaDeliveryChannel,
    ProduceArgs, ProducerError, ProductionConfig, ProductionReport,
};
use std::future::Future;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

const EXAMPLES: &str = "\
Examples:
  # Produce events with default rate (1-5 seconds)
  ecommerce-event-producer

  # Produce events every 0.5-2 seconds (high load)
  ecommerce-event-producer --rate-min 0.5 --rate-max 2

  # Produce exactly 100 events
  ecommerce-event-producer --max-events 100

  # High load: 1000 events with 0.1-0.5 second intervals
  ecommerce-event-producer --rate-min 0.1 --rate-max 0.5 --max-events 1000";

#[derive(Parser, Debug)]
#[command(name = "ecommerce-event-producer")]
#[command(about = "Generate fake ecommerce events and send them to Kafka")]
#[command(after_help = EXAMPLES)]
pub struct Cli {
    #[command(flatten)]
    pub args: ProduceArgs,
}

/// Initialize tracing from `RUST_LOG`, defaulting to `info`.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();
}

/// Returns a token that is cancelled on the first Ctrl+C.
///
/// A second Ctrl+C exits the process with status 1 without waiting for the
/// drain to finish.
pub fn shutdown_on_ctrl_c() -> CancellationToken {
    let shutdown = CancellationToken::new();
    let trigger = shutdown.clone();

    tokio::spawn(async move {
        match handle_interrupts(trigger, tokio::signal::ctrl_c).await {
            Ok(()) => std::process::exit(1),
            Err(e) => warn!("Failed to listen for Ctrl+C: {e}"),
        }
    });

    shutdown
}

/// Cancel `shutdown` on the first interrupt, then return on the second.
pub async fn handle_interrupts<F, Fut>(
    shutdown: CancellationToken,
    mut interrupt: F,
) -> std::io::Result<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::io::Result<()>>,
{
    interrupt().await?;
    info!("Received interrupt signal (Ctrl+C), draining. Press Ctrl+C again to exit now");
    shutdown.cancel();

    interrupt().await?;
    warn!("Received second interrupt signal, exiting without draining");
    Ok(())
}

/// Validate the arguments, connect to Kafka and run the production loop.
///
/// Configuration errors are reported before any connection is attempted.
pub async fn produce(cli: &Cli, shutdown: CancellationToken) -> anyhow::Result<ProductionReport> {
    let config = ProductionConfig::try_from(&cli.args)?;
    let channel_config = KafkaChannelConfig::try_from(&cli.args)?;

    if cli.args.kafka.create_topic {
        create_topic_if_not_exists(
            &channel_config,
            cli.args.kafka.partitions,
            cli.args.kafka.replication_factor,
        )
        .await
        .map_err(ProducerError::ChannelConstruction)?;
    }

    let channel = KafkaDeliveryChannel::connect(&channel_config)
        .await
        .map_err(ProducerError::ChannelConstruction)?;

    let report = EventProducer::new(channel, config, shutdown)?.run().await?;
    Ok(report)
}
