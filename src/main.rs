mod config;
mod error;
mod model;
mod providers;
mod sync;

use anyhow::{Context, Result};
use tracing::{debug, info};
use tracing_subscriber::FmtSubscriber;

use providers::azure::AzureDevOpsProvider;
use providers::notion::NotionProvider;
use sync::{RecordOutcome, SystemClock, Syncer};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Nothing remote happens until the config is known to be complete.
    let config = config::load_config()?;

    let subscriber = FmtSubscriber::builder()
        .with_max_level(config.log_level())
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to install log subscriber")?;

    let tracker = AzureDevOpsProvider::new(&config)?;
    let workspace = NotionProvider::new(&config)?;
    let clock = SystemClock;

    info!(
        organization = %config.azure.organization,
        database = %config.notion.database_id,
        "starting sync pass"
    );

    let report = Syncer::new(&tracker, &workspace, &clock)
        .run()
        .await
        .context("Failed to query unsynced workspace records")?;

    for outcome in &report.outcomes {
        match outcome {
            RecordOutcome::Skipped { page_id, reason } => {
                debug!(page_id = %page_id, ?reason, "skipped record");
            }
            RecordOutcome::Synced {
                page_id,
                work_item,
                status,
            } => {
                debug!(page_id = %page_id, work_item, ?status, "synced record");
            }
            RecordOutcome::Failed {
                page_id,
                work_item,
                error,
            } => {
                println!("failed: page {page_id} (work item {work_item}): {error}");
            }
        }
    }

    info!(summary = %report.summary, "sync pass finished");
    println!("{}", report.summary);

    Ok(())
}
