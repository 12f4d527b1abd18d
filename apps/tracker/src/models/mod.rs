pub mod diff;
pub mod snapshot;

pub use diff::DiffRow;
pub use snapshot::Snapshot;
