//! Pagination over the ranking listing.
//!
//! Offsets form a finite sequence bounded by `max_offset`. The driver walks
//! it one page at a time, flushing each page before fetching the next, and
//! stops at the first page with nothing parseable on it.

use std::time::Duration;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{info, warn};

use crate::errors::TrackerError;
use crate::scrape::collector::PageCollector;
use crate::store::SnapshotStore;

pub const DEFAULT_STRIDE: u32 = 50;
pub const DEFAULT_MAX_OFFSET: u32 = 100_000;

#[derive(Debug, Clone)]
pub struct PaginationSettings {
    /// Rows per listing page; offsets advance by this much.
    pub stride: u32,
    /// Last offset that may be fetched, listing end or not.
    pub max_offset: u32,
    /// Pause between consecutive page requests.
    pub pace: Duration,
}

impl Default for PaginationSettings {
    fn default() -> Self {
        Self {
            stride: DEFAULT_STRIDE,
            max_offset: DEFAULT_MAX_OFFSET,
            pace: Duration::ZERO,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum StopReason {
    /// A page yielded no parseable rows.
    EmptyPage { offset: u32 },
    /// The offset ceiling was reached first.
    Ceiling { offset: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub date: NaiveDate,
    pub pages_fetched: u32,
    pub rows_parsed: u64,
    pub rows_rejected: u64,
    /// Records handed to the store in committed batches.
    pub records_flushed: u64,
    /// Of those, how many were new (the rest already existed for today).
    pub records_inserted: u64,
    pub stop: StopReason,
}

/// Offsets `0, stride, 2*stride, ...` up to and including `max_offset`.
pub fn page_offsets(stride: u32, max_offset: u32) -> impl Iterator<Item = u32> {
    (0..=max_offset).step_by(stride.max(1) as usize)
}

pub struct PaginationDriver<'a> {
    collector: &'a PageCollector,
    store: &'a dyn SnapshotStore,
    settings: PaginationSettings,
}

impl<'a> PaginationDriver<'a> {
    pub fn new(
        collector: &'a PageCollector,
        store: &'a dyn SnapshotStore,
        settings: PaginationSettings,
    ) -> Self {
        Self {
            collector,
            store,
            settings,
        }
    }

    /// Walks the listing, storing every record as dated `today`.
    /// Fetch and store failures end the run; the error says how far it got.
    pub async fn run(&self, today: NaiveDate) -> Result<RunSummary, TrackerError> {
        let mut pages_fetched = 0;
        let mut rows_parsed = 0;
        let mut rows_rejected = 0;
        let mut records_flushed = 0;
        let mut records_inserted = 0;
        let mut last_offset = 0;

        for offset in page_offsets(self.settings.stride, self.settings.max_offset) {
            if pages_fetched > 0 && !self.settings.pace.is_zero() {
                tokio::time::sleep(self.settings.pace).await;
            }

            let page = self
                .collector
                .collect(offset, today)
                .await
                .map_err(|source| TrackerError::PageFetch {
                    offset,
                    pages_fetched,
                    records_written: records_flushed,
                    source,
                })?;
            pages_fetched += 1;
            rows_parsed += page.parsed_rows as u64;
            rows_rejected += page.rejected_rows as u64;

            let inserted = self
                .store
                .upsert_many(&page.records)
                .await
                .map_err(|source| TrackerError::StoreWrite {
                    offset,
                    pages_fetched,
                    records_written: records_flushed,
                    source,
                })?;
            records_flushed += page.records.len() as u64;
            records_inserted += inserted;

            info!(
                offset,
                parsed = page.parsed_rows,
                rejected = page.rejected_rows,
                stored = page.records.len(),
                inserted,
                least_favorites = ?page.least_favorites,
                "Page collected"
            );

            last_offset = offset;
            if page.is_empty() {
                info!(offset, "No parseable rows, listing exhausted");
                return Ok(RunSummary {
                    date: today,
                    pages_fetched,
                    rows_parsed,
                    rows_rejected,
                    records_flushed,
                    records_inserted,
                    stop: StopReason::EmptyPage { offset },
                });
            }
        }

        warn!(
            offset = last_offset,
            max_offset = self.settings.max_offset,
            "Stopped at the offset ceiling before the listing ran out"
        );
        Ok(RunSummary {
            date: today,
            pages_fetched,
            rows_parsed,
            rows_rejected,
            records_flushed,
            records_inserted,
            stop: StopReason::Ceiling {
                offset: last_offset,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;

    use super::*;
    use crate::errors::FetchError;
    use crate::scrape::fetch::PageFetcher;
    use crate::scrape::parser::fixtures::{broken_row, page, ranking_row};
    use crate::scrape::parser::MalPeopleParser;
    use crate::store::memory::MemorySnapshotStore;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 17).unwrap()
    }

    /// Serves canned pages by offset and records which offsets were asked for.
    /// Offsets without a canned page get `fallback`.
    struct ScriptedFetcher {
        pages: HashMap<u32, String>,
        fallback: Option<String>,
        failing_offset: Option<u32>,
        requested: Mutex<Vec<u32>>,
    }

    impl ScriptedFetcher {
        fn new(pages: Vec<(u32, String)>) -> Self {
            Self {
                pages: pages.into_iter().collect(),
                fallback: None,
                failing_offset: None,
                requested: Mutex::new(Vec::new()),
            }
        }

        fn requested(&self) -> Vec<u32> {
            self.requested.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PageFetcher for ScriptedFetcher {
        async fn fetch_page(&self, offset: u32) -> Result<String, FetchError> {
            self.requested.lock().unwrap().push(offset);
            if self.failing_offset == Some(offset) {
                return Err(FetchError::Status {
                    status: 403,
                    offset,
                });
            }
            Ok(self
                .pages
                .get(&offset)
                .cloned()
                .or_else(|| self.fallback.clone())
                .unwrap_or_else(|| page(&[])))
        }
    }

    fn full_page(first_id: u32, count: u32) -> String {
        let rows: Vec<String> = (first_id..first_id + count)
            .map(|id| ranking_row(&id.to_string(), &format!("Person {id}"), None, "1,000"))
            .collect();
        page(&rows)
    }

    fn collector(fetcher: Arc<ScriptedFetcher>) -> PageCollector {
        PageCollector::new(fetcher, Arc::new(MalPeopleParser::new()))
    }

    #[test]
    fn test_page_offsets_are_bounded() {
        let offsets: Vec<u32> = page_offsets(50, 200).collect();
        assert_eq!(offsets, [0, 50, 100, 150, 200]);

        let offsets: Vec<u32> = page_offsets(50, 120).collect();
        assert_eq!(offsets, [0, 50, 100]);
    }

    #[tokio::test]
    async fn test_stops_after_first_empty_page() {
        let fetcher = Arc::new(ScriptedFetcher::new(vec![(0, full_page(1, 50))]));
        let store = MemorySnapshotStore::new();
        let collector = collector(fetcher.clone());

        let summary = PaginationDriver::new(&collector, &store, PaginationSettings::default())
            .run(today())
            .await
            .unwrap();

        assert_eq!(fetcher.requested(), [0, 50]);
        assert_eq!(store.upsert_calls(), 2);
        assert_eq!(summary.pages_fetched, 2);
        assert_eq!(summary.records_inserted, 50);
        assert_eq!(summary.stop, StopReason::EmptyPage { offset: 50 });
        assert_eq!(store.snapshots().len(), 50);
    }

    #[tokio::test]
    async fn test_kth_empty_page_means_k_fetches() {
        let nameless = page(&[ranking_row("900", "", None, "4")]);
        let fetcher = Arc::new(ScriptedFetcher::new(vec![
            (0, full_page(1, 3)),
            (10, nameless),
            (20, full_page(100, 2)),
            (30, page(&[broken_row(), broken_row()])),
            (40, full_page(200, 5)),
        ]));
        let store = MemorySnapshotStore::new();
        let collector = collector(fetcher.clone());
        let settings = PaginationSettings {
            stride: 10,
            ..PaginationSettings::default()
        };

        let summary = PaginationDriver::new(&collector, &store, settings)
            .run(today())
            .await
            .unwrap();

        // The nameless page stores nothing but still counts as non-empty.
        assert_eq!(fetcher.requested(), [0, 10, 20, 30]);
        assert_eq!(summary.stop, StopReason::EmptyPage { offset: 30 });
        assert_eq!(summary.records_inserted, 5);
        assert_eq!(summary.rows_parsed, 6);
        assert_eq!(summary.rows_rejected, 2);
    }

    #[tokio::test]
    async fn test_never_empty_listing_stops_at_ceiling() {
        let mut fetcher = ScriptedFetcher::new(Vec::new());
        fetcher.fallback = Some(full_page(1, 2));
        let fetcher = Arc::new(fetcher);
        let store = MemorySnapshotStore::new();
        let collector = collector(fetcher.clone());
        let settings = PaginationSettings {
            stride: 50,
            max_offset: 500,
            pace: Duration::ZERO,
        };

        let summary = PaginationDriver::new(&collector, &store, settings)
            .run(today())
            .await
            .unwrap();

        assert_eq!(summary.pages_fetched, 11);
        assert_eq!(summary.stop, StopReason::Ceiling { offset: 500 });
        assert!(fetcher.requested().iter().all(|&o| o <= 500));
        // Same people on every page: only the first copy is stored.
        assert_eq!(summary.records_flushed, 22);
        assert_eq!(summary.records_inserted, 2);
        assert_eq!(store.snapshots().len(), 2);
    }

    #[tokio::test]
    async fn test_rerun_is_idempotent() {
        let fetcher = Arc::new(ScriptedFetcher::new(vec![(0, full_page(1, 4))]));
        let store = MemorySnapshotStore::new();
        let collector = collector(fetcher);
        let driver = PaginationDriver::new(&collector, &store, PaginationSettings::default());

        let first = driver.run(today()).await.unwrap();
        let second = driver.run(today()).await.unwrap();

        assert_eq!(first.records_inserted, 4);
        assert_eq!(second.records_inserted, 0);
        assert_eq!(store.snapshots().len(), 4);
    }

    #[tokio::test]
    async fn test_first_write_wins() {
        let store = MemorySnapshotStore::new();
        let before = Arc::new(ScriptedFetcher::new(vec![(
            0,
            page(&[ranking_row("1", "Original", None, "10")]),
        )]));
        let after = Arc::new(ScriptedFetcher::new(vec![(
            0,
            page(&[ranking_row("1", "Renamed", None, "99")]),
        )]));

        for fetcher in [before, after] {
            let collector = collector(fetcher);
            PaginationDriver::new(&collector, &store, PaginationSettings::default())
                .run(today())
                .await
                .unwrap();
        }

        let stored = store.snapshots();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].english_name, "Original");
        assert_eq!(stored[0].favorites, 10);
    }

    #[tokio::test]
    async fn test_store_failure_is_fatal_and_reports_progress() {
        let fetcher = Arc::new(ScriptedFetcher::new(vec![
            (0, full_page(1, 50)),
            (50, full_page(51, 50)),
            (100, full_page(101, 50)),
        ]));
        let store = MemorySnapshotStore::new().failing_writes_from(3);
        let collector = collector(fetcher.clone());

        let err = PaginationDriver::new(&collector, &store, PaginationSettings::default())
            .run(today())
            .await
            .unwrap_err();

        match err {
            TrackerError::StoreWrite {
                offset,
                pages_fetched,
                records_written,
                ..
            } => {
                assert_eq!(offset, 100);
                assert_eq!(pages_fetched, 3);
                assert_eq!(records_written, 100);
            }
            other => panic!("expected StoreWrite, got {other:?}"),
        }
        assert_eq!(fetcher.requested(), [0, 50, 100]);
        assert_eq!(store.snapshots().len(), 100);
    }

    #[tokio::test]
    async fn test_fetch_failure_is_not_an_empty_page() {
        let mut fetcher = ScriptedFetcher::new(vec![(0, full_page(1, 50))]);
        fetcher.fallback = Some(full_page(1, 50));
        fetcher.failing_offset = Some(50);
        let fetcher = Arc::new(fetcher);
        let store = MemorySnapshotStore::new();
        let collector = collector(fetcher);

        let err = PaginationDriver::new(&collector, &store, PaginationSettings::default())
            .run(today())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            TrackerError::PageFetch {
                offset: 50,
                pages_fetched: 1,
                records_written: 50,
                ..
            }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_pace_between_requests() {
        let fetcher = Arc::new(ScriptedFetcher::new(vec![
            (0, full_page(1, 1)),
            (50, full_page(2, 1)),
        ]));
        let store = MemorySnapshotStore::new();
        let collector = collector(fetcher.clone());
        let settings = PaginationSettings {
            pace: Duration::from_secs(2),
            ..PaginationSettings::default()
        };

        let started = tokio::time::Instant::now();
        PaginationDriver::new(&collector, &store, settings)
            .run(today())
            .await
            .unwrap();

        // Three pages, two pauses.
        assert_eq!(fetcher.requested(), [0, 50, 100]);
        assert_eq!(started.elapsed(), Duration::from_secs(4));
    }
}
