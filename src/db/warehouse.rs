//! Relational warehouse. Each refresh drops and recreates the table and bulk
//! loads the new batch inside one transaction.

use sqlx::{sqlite::SqliteRow, Connection, QueryBuilder, Row, Sqlite, SqliteConnection};

use crate::{
    error::StorageError,
    quake::{GlobalQuake, Intensity, JpQuake},
};

use super::{connect, push_filter, push_order_and_limit, FilterColumns, OrderBy, QueryFilter};

const GLOBAL_TABLE: &str = "all_earthquakes_week";
const JP_TABLE: &str = "all_jp_earthquakes";

// Rows per INSERT statement.
const CHUNK_SIZE: usize = 100;

const CREATE_GLOBAL: &str = "CREATE TABLE IF NOT EXISTS all_earthquakes_week (
    date TEXT NOT NULL,
    time TEXT NOT NULL,
    magnitude REAL NOT NULL,
    location TEXT NOT NULL,
    title TEXT NOT NULL,
    tsunami BOOLEAN NOT NULL,
    lat REAL,
    lon REAL)";

const CREATE_JP: &str = "CREATE TABLE IF NOT EXISTS all_jp_earthquakes (
    date TEXT,
    time TEXT,
    epicenter TEXT,
    magnitude REAL,
    intensity TEXT NOT NULL,
    lat REAL,
    lon REAL)";

const GLOBAL_COLUMNS: FilterColumns = FilterColumns {
    magnitude: "magnitude",
    intensity: None,
    has_coordinates: true,
};

const JP_COLUMNS: FilterColumns = FilterColumns {
    magnitude: "magnitude",
    intensity: Some("intensity"),
    has_coordinates: true,
};

#[derive(Debug, Clone)]
pub struct Warehouse {
    url: String,
}

impl Warehouse {
    pub fn new(url: impl Into<String>) -> Self {
        Warehouse { url: url.into() }
    }

    async fn open(&self) -> Result<SqliteConnection, StorageError> {
        let mut conn = connect(&self.url).await?;
        sqlx::query(CREATE_GLOBAL).execute(&mut conn).await?;
        sqlx::query(CREATE_JP).execute(&mut conn).await?;

        Ok(conn)
    }

    /// Replaces the global table with `quakes`.
    pub async fn replace_global(&self, quakes: &[GlobalQuake]) -> Result<u64, StorageError> {
        let mut conn = self.open().await?;
        let inserted = replace(&mut conn, GLOBAL_TABLE, CREATE_GLOBAL, quakes, insert_global_chunk).await?;
        conn.close().await?;

        tracing::info!(rows = inserted, table = GLOBAL_TABLE, "warehouse refreshed");
        Ok(inserted)
    }

    /// Replaces the JP table with `quakes`.
    pub async fn replace_jp(&self, quakes: &[JpQuake]) -> Result<u64, StorageError> {
        let mut conn = self.open().await?;
        let inserted = replace(&mut conn, JP_TABLE, CREATE_JP, quakes, insert_jp_chunk).await?;
        conn.close().await?;

        tracing::info!(rows = inserted, table = JP_TABLE, "warehouse refreshed");
        Ok(inserted)
    }

    pub async fn query_global(&self, order: OrderBy, filter: &QueryFilter) -> Result<Vec<GlobalQuake>, StorageError> {
        let mut qb = QueryBuilder::<Sqlite>::new(
            "SELECT date, time, magnitude, location, title, tsunami, lat, lon FROM all_earthquakes_week",
        );
        push_filter(&mut qb, filter, &GLOBAL_COLUMNS);
        push_order_and_limit(&mut qb, order, filter);

        let mut conn = self.open().await?;
        let rows = qb.build().fetch_all(&mut conn).await?;
        conn.close().await?;

        rows.iter().map(global_from_row).collect()
    }

    pub async fn query_jp(&self, order: OrderBy, filter: &QueryFilter) -> Result<Vec<JpQuake>, StorageError> {
        let mut qb = QueryBuilder::<Sqlite>::new(
            "SELECT date, time, epicenter, magnitude, intensity, lat, lon FROM all_jp_earthquakes",
        );
        push_filter(&mut qb, filter, &JP_COLUMNS);
        push_order_and_limit(&mut qb, order, filter);

        let mut conn = self.open().await?;
        let rows = qb.build().fetch_all(&mut conn).await?;
        conn.close().await?;

        rows.iter().map(jp_from_row).collect()
    }

    pub async fn count_global(&self, filter: &QueryFilter) -> Result<i64, StorageError> {
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM all_earthquakes_week");
        push_filter(&mut qb, filter, &GLOBAL_COLUMNS);
        self.count(qb).await
    }

    pub async fn count_jp(&self, filter: &QueryFilter) -> Result<i64, StorageError> {
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM all_jp_earthquakes");
        push_filter(&mut qb, filter, &JP_COLUMNS);
        self.count(qb).await
    }

    async fn count(&self, mut qb: QueryBuilder<'_, Sqlite>) -> Result<i64, StorageError> {
        let mut conn = self.open().await?;
        let count = qb.build_query_scalar::<i64>().fetch_one(&mut conn).await?;
        conn.close().await?;

        Ok(count)
    }

    pub async fn most_recent_global(&self) -> Result<Option<GlobalQuake>, StorageError> {
        let filter = QueryFilter::default().limit(1);
        Ok(self.query_global(OrderBy::NewestFirst, &filter).await?.into_iter().next())
    }

    /// Most recent located JP event.
    pub async fn most_recent_jp(&self) -> Result<Option<JpQuake>, StorageError> {
        let filter = QueryFilter::located().limit(1);
        Ok(self.query_jp(OrderBy::NewestFirst, &filter).await?.into_iter().next())
    }
}

/// Drops, recreates and loads `table` in one transaction. Any failure rolls
/// the whole batch back and leaves the previous contents in place.
async fn replace<T, F>(
    conn: &mut SqliteConnection,
    table: &str,
    create: &str,
    rows: &[T],
    insert_chunk: F,
) -> Result<u64, StorageError>
where
    F: for<'a> Fn(&'a [T]) -> QueryBuilder<'a, Sqlite>,
{
    let mut tx = conn.begin().await?;

    let loaded = async {
        sqlx::query(&format!("DROP TABLE IF EXISTS {table}"))
            .execute(&mut *tx)
            .await?;
        sqlx::query(create).execute(&mut *tx).await?;

        let mut inserted = 0;
        for chunk in rows.chunks(CHUNK_SIZE) {
            let mut qb = insert_chunk(chunk);
            inserted += qb.build().execute(&mut *tx).await?.rows_affected();
        }

        Ok::<u64, sqlx::Error>(inserted)
    }
    .await;

    match loaded {
        Ok(inserted) => {
            tx.commit().await?;
            Ok(inserted)
        }
        Err(e) => {
            tracing::warn!(table, error = %e, "warehouse load failed, rolling back");
            if let Err(rollback) = tx.rollback().await {
                tracing::warn!(table, error = %rollback, "rollback failed");
            }
            Err(e.into())
        }
    }
}

fn insert_global_chunk(chunk: &[GlobalQuake]) -> QueryBuilder<'_, Sqlite> {
    let mut qb = QueryBuilder::<Sqlite>::new(
        "INSERT INTO all_earthquakes_week (date, time, magnitude, location, title, tsunami, lat, lon) ",
    );
    qb.push_values(chunk, |mut b, q| {
        b.push_bind(&q.date)
            .push_bind(&q.time)
            .push_bind(q.magnitude)
            .push_bind(&q.location)
            .push_bind(&q.title)
            .push_bind(q.tsunami)
            .push_bind(q.lat)
            .push_bind(q.lon);
    });
    qb
}

fn insert_jp_chunk(chunk: &[JpQuake]) -> QueryBuilder<'_, Sqlite> {
    let mut qb = QueryBuilder::<Sqlite>::new(
        "INSERT INTO all_jp_earthquakes (date, time, epicenter, magnitude, intensity, lat, lon) ",
    );
    qb.push_values(chunk, |mut b, q| {
        b.push_bind(&q.date)
            .push_bind(&q.time)
            .push_bind(&q.epicenter)
            .push_bind(q.magnitude)
            .push_bind(q.intensity.as_str())
            .push_bind(q.lat)
            .push_bind(q.lon);
    });
    qb
}

fn global_from_row(row: &SqliteRow) -> Result<GlobalQuake, StorageError> {
    Ok(GlobalQuake {
        date: row.try_get("date")?,
        time: row.try_get("time")?,
        magnitude: row.try_get("magnitude")?,
        location: row.try_get("location")?,
        title: row.try_get("title")?,
        tsunami: row.try_get("tsunami")?,
        lat: row.try_get("lat")?,
        lon: row.try_get("lon")?,
    })
}

fn jp_from_row(row: &SqliteRow) -> Result<JpQuake, StorageError> {
    let intensity: String = row.try_get("intensity")?;

    Ok(JpQuake {
        date: row.try_get("date")?,
        time: row.try_get("time")?,
        epicenter: row.try_get("epicenter")?,
        magnitude: row.try_get("magnitude")?,
        intensity: Intensity::from_cell(&intensity),
        lat: row.try_get("lat")?,
        lon: row.try_get("lon")?,
    })
}

// -- Tests -------------------------------------------------------------------
