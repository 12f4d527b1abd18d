use std::collections::HashSet;

use clap::Parser;

use crate::report::window::WindowSpec;
use crate::scrape::driver::{DEFAULT_MAX_OFFSET, DEFAULT_STRIDE};

/// Snapshots the people favorites ranking and rebuilds the change reports.
/// Meant to run once a day with no arguments.
#[derive(Debug, Parser)]
#[command(name = "tracker", version)]
pub struct Cli {
    /// Listing rows per page; offsets advance by this much
    #[arg(long, default_value_t = DEFAULT_STRIDE, value_parser = clap::value_parser!(u32).range(1..))]
    pub stride: u32,

    /// Highest listing offset that will ever be requested
    #[arg(long, default_value_t = DEFAULT_MAX_OFFSET)]
    pub max_offset: u32,

    /// Report windows as label=days pairs, comma-separated
    #[arg(
        long,
        value_delimiter = ',',
        default_values = ["one_day=1", "seven_day=7", "thirty_day=30"]
    )]
    pub windows: Vec<WindowSpec>,

    /// Skip scraping and only rebuild the reports from stored history
    #[arg(long)]
    pub reports_only: bool,
}

impl Cli {
    pub fn validate(&self) -> Result<(), String> {
        let mut seen = HashSet::new();
        for spec in &self.windows {
            if !seen.insert(spec.label.as_str()) {
                return Err(format!("window label '{}' is used twice", spec.label));
            }
        }
        Ok(())
    }
}
