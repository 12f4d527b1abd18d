//! Snapshot persistence.
//!
//! `SnapshotStore` is the seam between the scraping/report logic and the
//! database. `PgSnapshotStore` is the production backend; tests run against
//! an in-memory implementation with the same write semantics.

use async_trait::async_trait;

use crate::errors::StoreError;
use crate::models::{DiffRow, Snapshot};
use crate::report::window::{ReportName, Window};

#[cfg(test)]
pub mod memory;
pub mod postgres;

pub use postgres::PgSnapshotStore;

#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Inserts every snapshot whose (person_id, date) is not stored yet, as a
    /// single atomic batch. Existing keys keep their original values.
    /// Returns how many rows were newly inserted.
    async fn upsert_many(&self, snapshots: &[Snapshot]) -> Result<u64, StoreError>;

    /// Feeds every snapshot dated inside `window` to `visit`, in no
    /// particular order. Returns how many were visited.
    async fn scan_window(
        &self,
        window: &Window,
        visit: &mut (dyn FnMut(Snapshot) + Send),
    ) -> Result<u64, StoreError>;

    /// Atomically drops and recreates the named result set with `rows`,
    /// ranked in the order given.
    async fn replace_named_result(
        &self,
        name: &ReportName,
        rows: &[DiffRow],
    ) -> Result<(), StoreError>;
}
