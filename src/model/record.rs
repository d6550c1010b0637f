use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One row of the workspace database, as far as the sync cares about it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceRecord {
    pub page_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub linked_work_item_number: Option<u64>,
    #[serde(default)]
    pub synced: bool,
}

impl WorkspaceRecord {
    /// The linked work item, if any. Zero counts as unlinked.
    pub fn linked_item(&self) -> Option<u64> {
        self.linked_work_item_number.filter(|n| *n != 0)
    }
}

/// A single update call against one workspace page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageUpdate {
    /// The combined write that also flips `Synced` on.
    Fields {
        synced_at: DateTime<Utc>,
        name: String,
        assigned_to: String,
        url: String,
    },
    /// Written separately, only when the tracker state maps to a status.
    Status(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(number: Option<u64>) -> WorkspaceRecord {
        WorkspaceRecord {
            page_id: "p1".into(),
            linked_work_item_number: number,
            synced: false,
        }
    }

    #[test]
    fn zero_is_not_linked() {
        assert_eq!(record(Some(0)).linked_item(), None);
    }

    #[test]
    fn absent_is_not_linked() {
        assert_eq!(record(None).linked_item(), None);
    }

    #[test]
    fn positive_number_is_linked() {
        assert_eq!(record(Some(42)).linked_item(), Some(42));
    }
}
