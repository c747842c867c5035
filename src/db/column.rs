//! Wide-column style table keyed by `(date, time, epicenter, magnitude, shindo)`.
//!
//! Rows are upserted one statement at a time with no surrounding transaction,
//! so a failure part way through a refresh leaves the rows written so far.
//! The table is never truncated and grows with every refresh.

use sqlx::{sqlite::SqliteRow, Connection, QueryBuilder, Row, Sqlite, SqliteConnection};

use crate::{
    error::StorageError,
    quake::{parse_magnitude, Intensity, JpQuake},
};

use super::{connect, push_filter, push_order_and_limit, FilterColumns, OrderBy, QueryFilter};

// Key columns cannot be NULL; missing values are stored as empty strings.
const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS earthquake_data (
    date TEXT NOT NULL,
    time TEXT NOT NULL,
    epicenter TEXT NOT NULL,
    magnitude TEXT NOT NULL,
    shindo TEXT NOT NULL,
    PRIMARY KEY (date, time, epicenter, magnitude, shindo))";

const COLUMNS: FilterColumns = FilterColumns {
    magnitude: "CAST(NULLIF(magnitude, '') AS REAL)",
    intensity: Some("shindo"),
    has_coordinates: false,
};

#[derive(Debug, Clone)]
pub struct ColumnStore {
    url: String,
}

impl ColumnStore {
    pub fn new(url: impl Into<String>) -> Self {
        ColumnStore { url: url.into() }
    }

    async fn open(&self) -> Result<SqliteConnection, StorageError> {
        let mut conn = connect(&self.url).await?;
        sqlx::query(CREATE_TABLE).execute(&mut conn).await?;

        Ok(conn)
    }

    /// Upserts a single row.
    pub async fn insert(&self, quake: &JpQuake) -> Result<(), StorageError> {
        let mut conn = self.open().await?;
        upsert(&mut conn, quake).await?;
        conn.close().await?;

        Ok(())
    }

    /// Upserts `quakes` in order on one connection. Stops at the first failure
    /// and reports how many rows were written before it.
    pub async fn insert_all(&self, quakes: &[JpQuake]) -> Result<usize, StorageError> {
        let mut conn = self.open().await?;

        for (written, quake) in quakes.iter().enumerate() {
            if let Err(source) = upsert(&mut conn, quake).await {
                tracing::warn!(written, error = %source, "column store refresh interrupted");
                return Err(StorageError::Partial { written, source });
            }
        }
        conn.close().await?;

        tracing::info!(rows = quakes.len(), "column store refreshed");
        Ok(quakes.len())
    }

    pub async fn query_all(&self, order: OrderBy, filter: &QueryFilter) -> Result<Vec<JpQuake>, StorageError> {
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT date, time, epicenter, magnitude, shindo FROM earthquake_data");
        push_filter(&mut qb, filter, &COLUMNS);
        push_order_and_limit(&mut qb, order, filter);

        let mut conn = self.open().await?;
        let rows = qb.build().fetch_all(&mut conn).await?;
        conn.close().await?;

        rows.iter().map(from_row).collect()
    }

    pub async fn count(&self, filter: &QueryFilter) -> Result<i64, StorageError> {
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM earthquake_data");
        push_filter(&mut qb, filter, &COLUMNS);

        let mut conn = self.open().await?;
        let count = qb.build_query_scalar::<i64>().fetch_one(&mut conn).await?;
        conn.close().await?;

        Ok(count)
    }
}

async fn upsert(conn: &mut SqliteConnection, quake: &JpQuake) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT OR REPLACE INTO earthquake_data (date, time, epicenter, magnitude, shindo)
         VALUES (?1, ?2, ?3, ?4, ?5)",
    )
    .bind(quake.date.as_deref().unwrap_or_default())
    .bind(quake.time.as_deref().unwrap_or_default())
    .bind(quake.epicenter.as_deref().unwrap_or_default())
    .bind(quake.magnitude.map(|m| m.to_string()).unwrap_or_default())
    .bind(quake.intensity.as_str())
    .execute(&mut *conn)
    .await?;

    Ok(())
}

fn from_row(row: &SqliteRow) -> Result<JpQuake, StorageError> {
    let text = |column: &str| -> Result<Option<String>, StorageError> {
        let value: String = row.try_get(column)?;
        Ok((!value.is_empty()).then_some(value))
    };
    let magnitude: String = row.try_get("magnitude")?;
    let shindo: String = row.try_get("shindo")?;

    Ok(JpQuake {
        date: text("date")?,
        time: text("time")?,
        epicenter: text("epicenter")?,
        magnitude: parse_magnitude(&magnitude),
        intensity: Intensity::from_cell(&shindo),
        lat: None,
        lon: None,
    })
}

// -- Tests -------------------------------------------------------------------
