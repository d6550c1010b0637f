pub mod azure;
pub mod notion;

use async_trait::async_trait;

use crate::error::{SyncError, SyncResult};
use crate::model::record::{PageUpdate, WorkspaceRecord};
use crate::model::work_item::WorkItem;

/// Read side: the upstream tracker.
#[async_trait]
pub trait WorkItemSource: Send + Sync {
    fn name(&self) -> &str;
    async fn fetch_work_item(&self, id: u64) -> SyncResult<WorkItem>;
}

/// Write side: the workspace database holding the synced records.
#[async_trait]
pub trait RecordStore: Send + Sync {
    fn name(&self) -> &str;
    /// Every record whose `Synced` checkbox is still off.
    async fn query_unsynced(&self) -> SyncResult<Vec<WorkspaceRecord>>;
    async fn update_page(&self, page_id: &str, update: &PageUpdate) -> SyncResult<()>;
}

/// Shared client builder so both services honour the configured timeout.
pub(crate) fn http_client(
    service: &'static str,
    timeout: std::time::Duration,
) -> SyncResult<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| SyncError::Config(format!("{service}: cannot build HTTP client: {e}")))
}

/// Turn a response into its body text, mapping non-success statuses.
pub(crate) async fn read_body(
    service: &'static str,
    resp: reqwest::Response,
) -> SyncResult<String> {
    let status = resp.status();
    let body = resp
        .text()
        .await
        .map_err(|e| SyncError::from_transport(service, e))?;
    if !status.is_success() {
        return Err(SyncError::from_status(service, status, &body));
    }
    Ok(body)
}
