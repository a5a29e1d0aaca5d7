use anyhow::{Context, Result};
use clap::Parser;
use drivesync::{config, logging, sync::SyncDriver};

/// Sync new PDFs from the configured Google Drive folder into the Pinecone index.
#[derive(Parser)]
#[command(version, about)]
struct Cli {}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    Cli::parse();
    logging::init_tracing();
    let config = config::load().context("failed to load configuration")?;

    let driver = SyncDriver::from_config(&config)
        .await
        .context("failed to initialize sync clients")?;

    let mut stdout = std::io::stdout().lock();
    let report = driver.run(&mut stdout).await.map_err(|err| {
        tracing::error!(kind = ?err.kind(), error = %err, "Sync aborted");
        err
    })?;

    tracing::info!(
        processed = report.processed.len(),
        skipped = report.skipped.len(),
        fragments = report.fragments_indexed,
        "Sync completed"
    );
    Ok(())
}
