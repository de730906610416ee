//! Command-line interface for ecommerce-event-producer
//!
//! # Usage Examples
//!
//! ```bash
//! # Defaults: 1-5 seconds between events, forever, to localhost:9092
//! ecommerce-event-producer
//!
//! # 1000 events, 0.1-0.5 seconds apart, into a freshly created topic
//! KAFKA_BOOTSTRAP_SERVERS=kafka:9092 ecommerce-event-producer \
//!   --rate-min 0.1 --rate-max 0.5 --max-events 1000 \
//!   --create-topic --partitions 6
//! ```
//!
//! Exit status is 0 when the run stops on its cap or on Ctrl+C, and 1 on
//! any error.

use clap::Parser;
use ecommerce_event_producer::{init_tracing, produce, shutdown_on_ctrl_c, Cli};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = run().await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}

async fn run() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let shutdown = shutdown_on_ctrl_c();

    let report = produce(&cli, shutdown).await?;
    println!(
        "Produced {} events ({} failed) in {:.1}s",
        report.events_sent,
        report.events_failed,
        report.elapsed.as_secs_f64()
    );

    Ok(())
}
