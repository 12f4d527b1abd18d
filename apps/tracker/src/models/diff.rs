use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Favorites change of one person across a report window.
/// Descriptive fields come from the earliest snapshot in the window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct DiffRow {
    pub person_id: String,
    pub english_name: String,
    pub japanese_name: String,
    pub mal_link: String,
    pub image_link: String,
    pub old_favorite_count: i32,
    pub new_favorite_count: i32,
    pub change: i32,
}
