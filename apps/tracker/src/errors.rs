use thiserror::Error;

/// A single listing row whose fields could not be extracted.
/// Local to the row: the collector logs it and moves on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RowParseError {
    #[error("missing element: {0}")]
    MissingElement(&'static str),

    #[error("missing attribute '{attribute}' on {element}")]
    MissingAttribute {
        element: &'static str,
        attribute: &'static str,
    },

    #[error("detail link has no entity id: {0}")]
    BadLink(String),

    #[error("metric is not a non-negative integer: {0:?}")]
    BadMetric(String),
}

/// Failure to retrieve one listing page.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("listing returned status {status} for offset {offset}")]
    Status { status: u16, offset: u32 },

    #[error("gave up on offset {offset} after {retries} retries")]
    Exhausted { offset: u32, retries: u32 },
}

/// Snapshot store failure, on either the write or the read side.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("invalid report name: {0:?}")]
    InvalidReportName(String),
}

/// Run-level failure. Carries enough context to tell which stage broke
/// and how far the write path got before it did.
#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("fetching offset {offset} failed after {pages_fetched} pages ({records_written} records written): {source}")]
    PageFetch {
        offset: u32,
        pages_fetched: u32,
        records_written: u64,
        #[source]
        source: FetchError,
    },

    #[error("writing offset {offset} failed after {pages_fetched} pages ({records_written} records written): {source}")]
    StoreWrite {
        offset: u32,
        pages_fetched: u32,
        records_written: u64,
        #[source]
        source: StoreError,
    },

    #[error("report '{label}' failed: {source}")]
    Report {
        label: String,
        #[source]
        source: StoreError,
    },

    #[error("invalid window: {0}")]
    InvalidWindow(String),
}
