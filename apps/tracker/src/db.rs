use anyhow::Result;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::PgPool;
use tracing::info;

/// Creates and returns a PostgreSQL connection pool.
/// The run is sequential, so a couple of connections is plenty.
pub async fn create_pool(options: PgConnectOptions) -> Result<PgPool> {
    info!("Connecting to PostgreSQL...");

    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect_with(options)
        .await?;

    info!("PostgreSQL connection pool established");
    Ok(pool)
}

/// Creates the snapshot table if it does not exist yet.
pub async fn ensure_schema(pool: &PgPool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS people (
            person_id_date TEXT PRIMARY KEY,
            person_id      TEXT NOT NULL,
            date           DATE NOT NULL,
            english_name   TEXT,
            japanese_name  TEXT,
            mal_link       TEXT,
            image_link     TEXT,
            favorites      INTEGER NOT NULL,
            UNIQUE (person_id, date)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS people_date_idx ON people (date)")
        .execute(pool)
        .await?;

    Ok(())
}
