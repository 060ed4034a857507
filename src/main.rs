use std::sync::Arc;

use anyhow::Context;

fn main() -> anyhow::Result<()> {
    simple_logger::SimpleLogger::new()
        .with_level(log::LevelFilter::Info)
        .with_colors(true)
        .with_threads(true)
        .with_local_timestamps()
        .env()
        .init()
        .context("failed to build logger instance")?;

    let channels = carecrew_bridge::BridgeChannels::default();
    let feed = Arc::new(carecrew_backend::LocalChangeFeed::default());

    carecrew_backend::run(channels.backend_rx, channels.backend_tx, feed.clone())
        .context("failed to start backend")?;
    carecrew_frontend::run(channels.frontend_rx, channels.frontend_tx, feed)
}
