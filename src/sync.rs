//! One pass of tracker → workspace propagation.

use chrono::{DateTime, Utc};
use std::fmt;
use tracing::{info, warn};

use crate::error::SyncResult;
use crate::model::record::{PageUpdate, WorkspaceRecord};
use crate::providers::{RecordStore, WorkItemSource};

/// Source of the `Synced Date` timestamp. Swapped for a fixed clock in tests.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Tracker state → workspace status. Exact, case-sensitive match; states not
/// listed here leave the workspace status untouched.
pub const STATUS_MAP: &[(&str, &str)] = &[
    ("Active", "In progress"),
    ("Closed", "Done"),
    ("Resolved", "Done"),
    ("Removed", "Removed"),
];

pub fn map_status(state: &str) -> Option<&'static str> {
    STATUS_MAP
        .iter()
        .find(|(from, _)| *from == state)
        .map(|(_, to)| *to)
}

pub fn compose_title(number: u64, title: &str) -> String {
    format!("{number} - {title}")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NotLinked,
    AlreadySynced,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordOutcome {
    Skipped {
        page_id: String,
        reason: SkipReason,
    },
    Synced {
        page_id: String,
        work_item: u64,
        status: Option<String>,
    },
    Failed {
        page_id: String,
        work_item: u64,
        error: String,
    },
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SyncSummary {
    pub processed: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl SyncSummary {
    fn record(&mut self, outcome: &RecordOutcome) {
        match outcome {
            RecordOutcome::Skipped { .. } => self.skipped += 1,
            RecordOutcome::Synced { .. } => self.processed += 1,
            RecordOutcome::Failed { .. } => self.failed += 1,
        }
    }
}

impl fmt::Display for SyncSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} synced, {} skipped, {} failed",
            self.processed, self.skipped, self.failed
        )
    }
}

#[derive(Debug, Default)]
pub struct SyncReport {
    pub summary: SyncSummary,
    pub outcomes: Vec<RecordOutcome>,
}

pub struct Syncer<'a> {
    source: &'a dyn WorkItemSource,
    store: &'a dyn RecordStore,
    clock: &'a dyn Clock,
}

impl<'a> Syncer<'a> {
    pub fn new(
        source: &'a dyn WorkItemSource,
        store: &'a dyn RecordStore,
        clock: &'a dyn Clock,
    ) -> Self {
        Self {
            source,
            store,
            clock,
        }
    }

    /// Query the workspace and sync everything it returns. Only the query
    /// itself can fail the pass; per-record errors end up in the report.
    pub async fn run(&self) -> SyncResult<SyncReport> {
        let records = self.store.query_unsynced().await?;
        info!(
            count = records.len(),
            store = self.store.name(),
            source = self.source.name(),
            "fetched unsynced records"
        );
        Ok(self.sync_records(&records).await)
    }

    /// Records are handled strictly one after another.
    pub async fn sync_records(&self, records: &[WorkspaceRecord]) -> SyncReport {
        let mut report = SyncReport::default();
        for record in records {
            let outcome = self.sync_record(record).await;
            report.summary.record(&outcome);
            report.outcomes.push(outcome);
        }
        report
    }

    pub async fn sync_record(&self, record: &WorkspaceRecord) -> RecordOutcome {
        let Some(number) = record.linked_item() else {
            return RecordOutcome::Skipped {
                page_id: record.page_id.clone(),
                reason: SkipReason::NotLinked,
            };
        };
        // The query already filters on this; a stale or hand-built list may not.
        if record.synced {
            return RecordOutcome::Skipped {
                page_id: record.page_id.clone(),
                reason: SkipReason::AlreadySynced,
            };
        }

        match self.push(&record.page_id, number).await {
            Ok(status) => RecordOutcome::Synced {
                page_id: record.page_id.clone(),
                work_item: number,
                status: status.map(String::from),
            },
            Err(e) => {
                warn!(
                    page_id = %record.page_id,
                    work_item = number,
                    error = %e,
                    "failed to sync record"
                );
                RecordOutcome::Failed {
                    page_id: record.page_id.clone(),
                    work_item: number,
                    error: e.to_string(),
                }
            }
        }
    }

    /// Fetch, write the combined fields, then the status if one maps. A
    /// failure on the second write leaves the page synced without a status.
    async fn push(&self, page_id: &str, number: u64) -> SyncResult<Option<&'static str>> {
        let item = self.source.fetch_work_item(number).await?;
        let new_title = compose_title(number, &item.title);
        info!(page_id, work_item = item.id, "Updating item: {new_title}");

        let status = map_status(&item.state);
        if status.is_none() {
            info!(work_item = number, state = %item.state, "state has no status mapping");
        }

        let fields = PageUpdate::Fields {
            synced_at: self.clock.now(),
            name: new_title,
            assigned_to: item.assignee,
            url: item.url,
        };
        self.store.update_page(page_id, &fields).await?;

        if let Some(status) = status {
            self.store
                .update_page(page_id, &PageUpdate::Status(status.to_string()))
                .await?;
        }

        Ok(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SyncError;
    use crate::model::work_item::WorkItem;
    use crate::providers::tests::{FakeStore, FakeTracker, FixedClock, StoreCall};

    fn record(page_id: &str, number: Option<u64>, synced: bool) -> WorkspaceRecord {
        WorkspaceRecord {
            page_id: page_id.into(),
            linked_work_item_number: number,
            synced,
        }
    }

    fn item(id: u64, title: &str, state: &str) -> WorkItem {
        WorkItem {
            id,
            title: title.into(),
            state: state.into(),
            assignee: String::new(),
            url: format!("https://org/_workitems/edit/{id}"),
        }
    }

    #[test]
    fn status_table_maps_known_states() {
        assert_eq!(map_status("Active"), Some("In progress"));
        assert_eq!(map_status("Closed"), Some("Done"));
        assert_eq!(map_status("Resolved"), Some("Done"));
        assert_eq!(map_status("Removed"), Some("Removed"));
    }

    #[test]
    fn unknown_or_differently_cased_states_do_not_map() {
        assert_eq!(map_status("New"), None);
        assert_eq!(map_status("active"), None);
        assert_eq!(map_status(""), None);
    }

    #[test]
    fn title_is_number_dash_title() {
        assert_eq!(compose_title(1234, "Fix bug"), "1234 - Fix bug");
    }

    #[test]
    fn summary_display() {
        let summary = SyncSummary {
            processed: 2,
            skipped: 1,
            failed: 0,
        };
        assert_eq!(summary.to_string(), "2 synced, 1 skipped, 0 failed");
    }

    #[tokio::test]
    async fn unlinked_records_make_no_remote_calls() {
        let tracker = FakeTracker::new();
        let store = FakeStore::new(vec![]);
        let clock = FixedClock::default();
        let syncer = Syncer::new(&tracker, &store, &clock);

        let report = syncer
            .sync_records(&[record("p1", None, false), record("p2", Some(0), false)])
            .await;

        assert_eq!(report.summary.skipped, 2);
        assert!(tracker.fetched().is_empty());
        assert!(store.calls().is_empty());
    }

    #[tokio::test]
    async fn already_synced_records_make_no_remote_calls() {
        let tracker = FakeTracker::new().with_item(item(5, "x", "Active"));
        let store = FakeStore::new(vec![]);
        let clock = FixedClock::default();
        let syncer = Syncer::new(&tracker, &store, &clock);

        let outcome = syncer.sync_record(&record("p1", Some(5), true)).await;

        assert_eq!(
            outcome,
            RecordOutcome::Skipped {
                page_id: "p1".into(),
                reason: SkipReason::AlreadySynced
            }
        );
        assert!(tracker.fetched().is_empty());
        assert!(store.calls().is_empty());
    }

    #[tokio::test]
    async fn end_to_end_writes_fields_then_status() {
        let tracker = FakeTracker::new().with_item(item(42, "Fix login", "Active"));
        let store = FakeStore::new(vec![record("p1", Some(42), false)]);
        let clock = FixedClock::default();
        let syncer = Syncer::new(&tracker, &store, &clock);

        let report = syncer.run().await.unwrap();

        assert_eq!(
            report.summary,
            SyncSummary {
                processed: 1,
                skipped: 0,
                failed: 0
            }
        );
        assert_eq!(tracker.fetched(), vec![42]);
        assert_eq!(
            store.calls(),
            vec![
                StoreCall::Query,
                StoreCall::Update(
                    "p1".into(),
                    PageUpdate::Fields {
                        synced_at: clock.0,
                        name: "42 - Fix login".into(),
                        assigned_to: "".into(),
                        url: "https://org/_workitems/edit/42".into(),
                    }
                ),
                StoreCall::Update("p1".into(), PageUpdate::Status("In progress".into())),
            ]
        );
    }

    #[tokio::test]
    async fn unmapped_state_skips_status_write() {
        let tracker = FakeTracker::new().with_item(item(9, "Design", "New"));
        let store = FakeStore::new(vec![]);
        let clock = FixedClock::default();
        let syncer = Syncer::new(&tracker, &store, &clock);

        let outcome = syncer.sync_record(&record("p9", Some(9), false)).await;

        assert_eq!(
            outcome,
            RecordOutcome::Synced {
                page_id: "p9".into(),
                work_item: 9,
                status: None
            }
        );
        let calls = store.calls();
        assert_eq!(calls.len(), 1);
        assert!(matches!(&calls[0], StoreCall::Update(_, PageUpdate::Fields { .. })));
    }

    #[tokio::test]
    async fn tracker_failure_does_not_stop_the_pass() {
        // 404 for the first record; only 2 is known upstream.
        let tracker = FakeTracker::new().with_item(item(2, "Second", "Closed"));
        let store = FakeStore::new(vec![
            record("p1", Some(1), false),
            record("p2", Some(2), false),
        ]);
        let clock = FixedClock::default();
        let syncer = Syncer::new(&tracker, &store, &clock);

        let report = syncer.run().await.unwrap();

        assert_eq!(report.summary.failed, 1);
        assert_eq!(report.summary.processed, 1);
        assert!(matches!(
            &report.outcomes[0],
            RecordOutcome::Failed { page_id, work_item: 1, .. } if page_id == "p1"
        ));
        assert!(store
            .calls()
            .contains(&StoreCall::Update("p2".into(), PageUpdate::Status("Done".into()))));
    }

    #[tokio::test]
    async fn status_write_failure_leaves_fields_written() {
        let tracker = FakeTracker::new().with_item(item(3, "Cleanup", "Removed"));
        let store = FakeStore::new(vec![]).failing_status_updates();
        let clock = FixedClock::default();
        let syncer = Syncer::new(&tracker, &store, &clock);

        let outcome = syncer.sync_record(&record("p3", Some(3), false)).await;

        assert!(matches!(outcome, RecordOutcome::Failed { work_item: 3, .. }));
        assert_eq!(store.calls().len(), 2);
    }

    #[tokio::test]
    async fn query_failure_fails_the_pass() {
        let tracker = FakeTracker::new();
        let store = FakeStore::new(vec![]).failing_query();
        let clock = FixedClock::default();
        let syncer = Syncer::new(&tracker, &store, &clock);

        let err = syncer.run().await.unwrap_err();
        assert!(matches!(err, SyncError::Authentication { .. }));
    }
}
