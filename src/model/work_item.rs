use serde::{Deserialize, Serialize};

/// Snapshot of one tracker work item, reduced to the fields the workspace
/// displays.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkItem {
    pub id: u64,
    pub title: String,
    /// Raw tracker state, e.g. "Active" or "Closed".
    pub state: String,
    /// Assignee display name, empty when unassigned.
    #[serde(default)]
    pub assignee: String,
    pub url: String,
}
