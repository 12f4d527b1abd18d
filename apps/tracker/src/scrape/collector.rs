use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, warn};

use crate::errors::{FetchError, RowParseError};
use crate::models::Snapshot;
use crate::scrape::fetch::PageFetcher;
use crate::scrape::parser::{PageParser, ParsedRow};

/// What one listing page produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageOutcome {
    /// Snapshots worth storing: parsed rows with a non-empty english name.
    pub records: Vec<Snapshot>,
    /// Rows whose fields were all extracted, stored or not.
    pub parsed_rows: usize,
    /// Rows that failed extraction.
    pub rejected_rows: usize,
    /// Lowest favorites count among parsed rows; `None` until a row parses.
    pub least_favorites: Option<i32>,
}

impl PageOutcome {
    /// True when not a single row on the page could be parsed.
    /// This is the end-of-listing signal; the record count plays no part.
    pub fn is_empty(&self) -> bool {
        self.least_favorites.is_none()
    }
}

/// Fetches one page and turns its rows into today's snapshots.
#[derive(Clone)]
pub struct PageCollector {
    fetcher: Arc<dyn PageFetcher>,
    parser: Arc<dyn PageParser>,
}

impl PageCollector {
    pub fn new(fetcher: Arc<dyn PageFetcher>, parser: Arc<dyn PageParser>) -> Self {
        Self { fetcher, parser }
    }

    pub async fn collect(&self, offset: u32, today: NaiveDate) -> Result<PageOutcome, FetchError> {
        let content = self.fetcher.fetch_page(offset).await?;
        let rows = self.parser.parse(&content);
        Ok(build_page(rows, offset, today))
    }
}

/// Folds parsed rows into a page outcome, dating every record `today`.
pub fn build_page(
    rows: Vec<Result<ParsedRow, RowParseError>>,
    offset: u32,
    today: NaiveDate,
) -> PageOutcome {
    let mut page = PageOutcome::default();

    for (index, row) in rows.into_iter().enumerate() {
        let row = match row {
            Ok(row) => row,
            Err(e) => {
                warn!(offset, row = index, "Skipping unparseable row: {e}");
                page.rejected_rows += 1;
                continue;
            }
        };

        page.parsed_rows += 1;
        page.least_favorites = Some(match page.least_favorites {
            Some(least) => least.min(row.favorites),
            None => row.favorites,
        });

        if row.english_name.is_empty() {
            debug!(offset, person_id = %row.person_id, "Dropping row without english name");
            continue;
        }

        page.records.push(Snapshot {
            person_id: row.person_id,
            date: today,
            english_name: row.english_name,
            japanese_name: row.japanese_name,
            mal_link: row.mal_link,
            image_link: row.image_link,
            favorites: row.favorites,
        });
    }

    page
}
