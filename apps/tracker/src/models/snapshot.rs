use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One immutable daily observation of a person on the ranking listing.
/// Keyed by (person_id, date); never updated once stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Snapshot {
    pub person_id: String,
    pub date: NaiveDate,
    pub english_name: String,
    /// Empty when the listing shows no native-script name.
    pub japanese_name: String,
    pub mal_link: String,
    pub image_link: String,
    pub favorites: i32,
}

impl Snapshot {
    /// Synthetic primary key, e.g. `1870_2026-10-17`.
    pub fn key(&self) -> String {
        format!("{}_{}", self.person_id, self.date)
    }
}
