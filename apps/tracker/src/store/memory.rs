use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::errors::StoreError;
use crate::models::{DiffRow, Snapshot};
use crate::report::window::{ReportName, Window};
use crate::store::SnapshotStore;

/// In-memory store with the same insert-if-absent semantics as Postgres.
#[derive(Default)]
pub struct MemorySnapshotStore {
    snapshots: Mutex<BTreeMap<String, Snapshot>>,
    reports: Mutex<HashMap<String, Vec<DiffRow>>>,
    upsert_calls: Mutex<u32>,
    /// Fail every `upsert_many` from this call number on (1-based).
    fail_writes_from: Option<u32>,
    fail_reads_for: Option<String>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_snapshots(snapshots: impl IntoIterator<Item = Snapshot>) -> Self {
        let store = Self::new();
        {
            let mut stored = store.snapshots.lock().unwrap();
            for snapshot in snapshots {
                stored.entry(snapshot.key()).or_insert(snapshot);
            }
        }
        store
    }

    pub fn failing_writes_from(mut self, call: u32) -> Self {
        self.fail_writes_from = Some(call);
        self
    }

    pub fn failing_reads_for(mut self, label: &str) -> Self {
        self.fail_reads_for = Some(label.to_string());
        self
    }

    pub fn snapshots(&self) -> Vec<Snapshot> {
        self.snapshots.lock().unwrap().values().cloned().collect()
    }

    pub fn report(&self, name: &str) -> Option<Vec<DiffRow>> {
        self.reports.lock().unwrap().get(name).cloned()
    }

    pub fn upsert_calls(&self) -> u32 {
        *self.upsert_calls.lock().unwrap()
    }
}

fn simulated_failure() -> StoreError {
    StoreError::Database(sqlx::Error::PoolTimedOut)
}

#[async_trait]
impl SnapshotStore for MemorySnapshotStore {
    async fn upsert_many(&self, snapshots: &[Snapshot]) -> Result<u64, StoreError> {
        let call = {
            let mut calls = self.upsert_calls.lock().unwrap();
            *calls += 1;
            *calls
        };
        if self.fail_writes_from.is_some_and(|from| call >= from) {
            return Err(simulated_failure());
        }

        let mut stored = self.snapshots.lock().unwrap();
        let mut inserted = 0;
        for snapshot in snapshots {
            if !stored.contains_key(&snapshot.key()) {
                stored.insert(snapshot.key(), snapshot.clone());
                inserted += 1;
            }
        }
        Ok(inserted)
    }

    async fn scan_window(
        &self,
        window: &Window,
        visit: &mut (dyn FnMut(Snapshot) + Send),
    ) -> Result<u64, StoreError> {
        if self.fail_reads_for.as_deref() == Some(window.label.as_str()) {
            return Err(simulated_failure());
        }

        let in_window: Vec<Snapshot> = self
            .snapshots
            .lock()
            .unwrap()
            .values()
            .filter(|s| window.contains(s.date))
            .cloned()
            .collect();

        let visited = in_window.len() as u64;
        // Reverse key order so callers cannot lean on storage order.
        for snapshot in in_window.into_iter().rev() {
            visit(snapshot);
        }
        Ok(visited)
    }

    async fn replace_named_result(
        &self,
        name: &ReportName,
        rows: &[DiffRow],
    ) -> Result<(), StoreError> {
        self.reports
            .lock()
            .unwrap()
            .insert(name.to_string(), rows.to_vec());
        Ok(())
    }
}
