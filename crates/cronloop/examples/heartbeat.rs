//! Run a couple of schedules against the local clock and log each firing.
//!
//! ```sh
//! RUST_LOG=cronloop=debug cargo run --example heartbeat
//! ```

use cronloop::Cron;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,cronloop=debug")),
        )
        .init();

    let cron = Cron::new();
    cron.add_fn("*/5 * * * * *", || tracing::info!("five-second heartbeat"))
        .await?;
    cron.add_fn("0 * * * * *", || tracing::info!("top of the minute"))
        .await?;
    cron.start()?;
    tracing::info!("scheduler running, ctrl-c to exit");

    tokio::signal::ctrl_c().await?;
    cron.stop().await?;
    Ok(())
}
