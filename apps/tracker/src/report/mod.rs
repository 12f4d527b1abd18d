pub mod diff;
pub mod window;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{error, info};

use crate::errors::{StoreError, TrackerError};
use crate::report::window::WindowSpec;
use crate::store::SnapshotStore;

#[derive(Debug, Clone, Serialize)]
pub struct ReportSummary {
    pub label: String,
    pub table: String,
    pub rows: usize,
}

/// Recomputes one window's report from full history and replaces its table.
pub async fn refresh_report(
    store: &dyn SnapshotStore,
    spec: &WindowSpec,
    today: NaiveDate,
) -> Result<ReportSummary, TrackerError> {
    let window = spec.ending_on(today)?;
    let as_report_error = |source: StoreError| TrackerError::Report {
        label: spec.label.clone(),
        source,
    };
    let name = spec.report_name().map_err(as_report_error)?;

    let rows = diff::compute(store, &window).await.map_err(as_report_error)?;
    store
        .replace_named_result(&name, &rows)
        .await
        .map_err(as_report_error)?;

    info!(
        window = %window.label,
        start = %window.start,
        end = %window.end,
        rows = rows.len(),
        "Report {name} refreshed"
    );
    Ok(ReportSummary {
        label: spec.label.clone(),
        table: name.to_string(),
        rows: rows.len(),
    })
}

/// Refreshes every window independently; one failing window does not stop
/// the others. Returns the summaries of those that succeeded and the number
/// that failed.
pub async fn refresh_reports(
    store: &dyn SnapshotStore,
    specs: &[WindowSpec],
    today: NaiveDate,
) -> (Vec<ReportSummary>, usize) {
    let mut done = Vec::with_capacity(specs.len());
    let mut failed = 0;

    for spec in specs {
        match refresh_report(store, spec, today).await {
            Ok(summary) => done.push(summary),
            Err(e) => {
                error!(window = %spec.label, "Report failed: {e}");
                failed += 1;
            }
        }
    }

    (done, failed)
}
