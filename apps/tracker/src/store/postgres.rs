use async_trait::async_trait;
use futures::TryStreamExt;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::{debug, info};

use crate::errors::StoreError;
use crate::models::{DiffRow, Snapshot};
use crate::report::window::{ReportName, Window};
use crate::store::SnapshotStore;

/// Rows per multi-row INSERT; keeps bind counts well under Postgres' limit.
const INSERT_CHUNK: usize = 1000;

#[derive(Debug, Clone)]
pub struct PgSnapshotStore {
    pool: PgPool,
}

impl PgSnapshotStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SnapshotStore for PgSnapshotStore {
    /// Append-only: conflicting keys are skipped, never updated.
    async fn upsert_many(&self, snapshots: &[Snapshot]) -> Result<u64, StoreError> {
        if snapshots.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await?;
        let mut inserted = 0;

        for chunk in snapshots.chunks(INSERT_CHUNK) {
            let mut builder = QueryBuilder::<Postgres>::new(
                "INSERT INTO people (person_id_date, person_id, date, english_name, \
                 japanese_name, mal_link, image_link, favorites) ",
            );
            builder.push_values(chunk, |mut row, snapshot| {
                row.push_bind(snapshot.key())
                    .push_bind(&snapshot.person_id)
                    .push_bind(snapshot.date)
                    .push_bind(&snapshot.english_name)
                    .push_bind(&snapshot.japanese_name)
                    .push_bind(&snapshot.mal_link)
                    .push_bind(&snapshot.image_link)
                    .push_bind(snapshot.favorites);
            });
            builder.push(" ON CONFLICT DO NOTHING");

            inserted += builder.build().execute(&mut *tx).await?.rows_affected();
        }

        tx.commit().await?;

        debug!(
            "Stored {inserted} of {} snapshots ({} already present)",
            snapshots.len(),
            snapshots.len() as u64 - inserted
        );
        Ok(inserted)
    }

    async fn scan_window(
        &self,
        window: &Window,
        visit: &mut (dyn FnMut(Snapshot) + Send),
    ) -> Result<u64, StoreError> {
        let mut rows = sqlx::query_as::<_, Snapshot>(
            r#"
            SELECT person_id,
                   date,
                   COALESCE(english_name, '')  AS english_name,
                   COALESCE(japanese_name, '') AS japanese_name,
                   COALESCE(mal_link, '')      AS mal_link,
                   COALESCE(image_link, '')    AS image_link,
                   favorites
            FROM people
            WHERE date BETWEEN $1 AND $2
            "#,
        )
        .bind(window.start)
        .bind(window.end)
        .fetch(&self.pool);

        let mut visited = 0;
        while let Some(snapshot) = rows.try_next().await? {
            visit(snapshot);
            visited += 1;
        }
        Ok(visited)
    }

    async fn replace_named_result(
        &self,
        name: &ReportName,
        rows: &[DiffRow],
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        let drop_sql = format!("DROP TABLE IF EXISTS {name}");
        sqlx::query(&drop_sql).execute(&mut *tx).await?;

        let create_sql = format!(
            r#"
            CREATE TABLE {name} (
                rank               INTEGER NOT NULL,
                person_id          TEXT NOT NULL,
                english_name       TEXT,
                japanese_name      TEXT,
                mal_link           TEXT,
                image_link         TEXT,
                old_favorite_count INTEGER NOT NULL,
                new_favorite_count INTEGER NOT NULL,
                change             INTEGER NOT NULL
            )
            "#
        );
        sqlx::query(&create_sql).execute(&mut *tx).await?;

        let ranked: Vec<(i32, &DiffRow)> = rows
            .iter()
            .enumerate()
            .map(|(i, row)| ((i + 1) as i32, row))
            .collect();

        for chunk in ranked.chunks(INSERT_CHUNK) {
            let mut builder = QueryBuilder::<Postgres>::new(format!(
                "INSERT INTO {name} (rank, person_id, english_name, japanese_name, mal_link, \
                 image_link, old_favorite_count, new_favorite_count, change) "
            ));
            builder.push_values(chunk, |mut b, &(rank, row)| {
                b.push_bind(rank)
                    .push_bind(&row.person_id)
                    .push_bind(&row.english_name)
                    .push_bind(&row.japanese_name)
                    .push_bind(&row.mal_link)
                    .push_bind(&row.image_link)
                    .push_bind(row.old_favorite_count)
                    .push_bind(row.new_favorite_count)
                    .push_bind(row.change);
            });
            builder.build().execute(&mut *tx).await?;
        }

        tx.commit().await?;

        info!("Replaced report table {name} with {} rows", rows.len());
        Ok(())
    }
}
