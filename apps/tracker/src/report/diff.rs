//! Window diff engine.
//!
//! For every person seen inside a window, pick the earliest snapshot ("old")
//! and the latest one ("new") from the same in-window set, and rank people
//! by how much their favorites grew in between.
//!
//! The fold keeps two snapshots per person, so memory tracks the number of
//! people rather than the number of days in the window.

use std::cmp::Ordering;
use std::collections::HashMap;

use crate::errors::StoreError;
use crate::models::{DiffRow, Snapshot};
use crate::report::window::Window;
use crate::store::SnapshotStore;

struct Endpoints {
    old: Snapshot,
    new: Snapshot,
}

/// Accumulates the earliest and latest in-window snapshot per person.
pub struct WindowDiff {
    window: Window,
    endpoints: HashMap<String, Endpoints>,
}

impl WindowDiff {
    pub fn new(window: Window) -> Self {
        Self {
            window,
            endpoints: HashMap::new(),
        }
    }

    /// Snapshots dated outside the window are ignored.
    pub fn observe(&mut self, snapshot: Snapshot) {
        if !self.window.contains(snapshot.date) {
            return;
        }

        match self.endpoints.get_mut(&snapshot.person_id) {
            Some(ends) => {
                if earlier(&snapshot, &ends.old) {
                    ends.old = snapshot.clone();
                }
                if later(&snapshot, &ends.new) {
                    ends.new = snapshot;
                }
            }
            None => {
                self.endpoints.insert(
                    snapshot.person_id.clone(),
                    Endpoints {
                        old: snapshot.clone(),
                        new: snapshot,
                    },
                );
            }
        }
    }

    /// Rows ordered by change descending, then current favorites ascending,
    /// then person id.
    pub fn finish(self) -> Vec<DiffRow> {
        let mut rows: Vec<DiffRow> = self
            .endpoints
            .into_values()
            .map(|Endpoints { old, new }| DiffRow {
                change: new.favorites - old.favorites,
                new_favorite_count: new.favorites,
                old_favorite_count: old.favorites,
                person_id: old.person_id,
                english_name: old.english_name,
                japanese_name: old.japanese_name,
                mal_link: old.mal_link,
                image_link: old.image_link,
            })
            .collect();

        rows.sort_by(|a, b| {
            b.change
                .cmp(&a.change)
                .then(a.new_favorite_count.cmp(&b.new_favorite_count))
                .then_with(|| a.person_id.cmp(&b.person_id))
        });
        rows
    }
}

/// Same-date duplicates should not exist given the (person_id, date) key.
/// If they do, the choice must not depend on scan order.
fn same_day_order(a: &Snapshot, b: &Snapshot) -> Ordering {
    a.favorites
        .cmp(&b.favorites)
        .then_with(|| a.english_name.cmp(&b.english_name))
        .then_with(|| a.japanese_name.cmp(&b.japanese_name))
        .then_with(|| a.mal_link.cmp(&b.mal_link))
        .then_with(|| a.image_link.cmp(&b.image_link))
}

fn earlier(candidate: &Snapshot, current: &Snapshot) -> bool {
    candidate
        .date
        .cmp(&current.date)
        .then_with(|| same_day_order(candidate, current))
        == Ordering::Less
}

fn later(candidate: &Snapshot, current: &Snapshot) -> bool {
    candidate
        .date
        .cmp(&current.date)
        .then_with(|| same_day_order(current, candidate))
        == Ordering::Greater
}

/// Reads the window from the store and computes its ranked diff.
/// Does not write anything.
pub async fn compute(store: &dyn SnapshotStore, window: &Window) -> Result<Vec<DiffRow>, StoreError> {
    let mut diff = WindowDiff::new(window.clone());
    store
        .scan_window(window, &mut |snapshot: Snapshot| diff.observe(snapshot))
        .await?;
    Ok(diff.finish())
}
