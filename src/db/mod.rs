//! Storage backends.
//!
//! Both backends open a fresh connection for every call and close it before
//! returning. Nothing is pooled or shared between requests.

pub mod column;
pub mod warehouse;

use std::{fs, path::Path, str::FromStr};

use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteConnection},
    Connection, QueryBuilder, Sqlite,
};

use crate::error::StorageError;

pub use column::ColumnStore;
pub use warehouse::Warehouse;

/// Magnitude at or above which an event counts as significant.
pub const SIGNIFICANT_MAGNITUDE: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderBy {
    #[default]
    NewestFirst,
    OldestFirst,
}

impl OrderBy {
    fn sql(self) -> &'static str {
        match self {
            OrderBy::NewestFirst => " ORDER BY date DESC, time DESC",
            OrderBy::OldestFirst => " ORDER BY date ASC, time ASC",
        }
    }
}

/// Row filters shared by every query. Unset fields do not filter.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryFilter {
    /// Only rows with both latitude and longitude.
    pub located_only: bool,
    pub min_magnitude: Option<f64>,
    /// `YYYY-MM-DD`
    pub date: Option<String>,
    /// `HH:MM:SS`
    pub time: Option<String>,
    pub intensity: Option<String>,
    pub limit: Option<i64>,
}

impl QueryFilter {
    pub fn located() -> Self {
        QueryFilter {
            located_only: true,
            ..Default::default()
        }
    }

    pub fn significant(mut self) -> Self {
        self.min_magnitude = Some(SIGNIFICANT_MAGNITUDE);
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// How a table names the columns a filter can touch.
pub(crate) struct FilterColumns {
    pub magnitude: &'static str,
    pub intensity: Option<&'static str>,
    pub has_coordinates: bool,
}

pub(crate) fn push_filter(qb: &mut QueryBuilder<'_, Sqlite>, filter: &QueryFilter, columns: &FilterColumns) {
    qb.push(" WHERE 1 = 1");

    if filter.located_only && columns.has_coordinates {
        qb.push(" AND lat IS NOT NULL AND lon IS NOT NULL");
    }
    if let Some(min) = filter.min_magnitude {
        qb.push(format!(" AND {} >= ", columns.magnitude));
        qb.push_bind(min);
    }
    if let Some(date) = &filter.date {
        qb.push(" AND date = ");
        qb.push_bind(date.clone());
    }
    if let Some(time) = &filter.time {
        qb.push(" AND time = ");
        qb.push_bind(time.clone());
    }
    if let (Some(intensity), Some(column)) = (&filter.intensity, columns.intensity) {
        qb.push(format!(" AND {column} = "));
        qb.push_bind(intensity.clone());
    }
}

pub(crate) fn push_order_and_limit(qb: &mut QueryBuilder<'_, Sqlite>, order: OrderBy, filter: &QueryFilter) {
    qb.push(order.sql());
    if let Some(limit) = filter.limit {
        qb.push(" LIMIT ");
        qb.push_bind(limit);
    }
}

/// Opens a connection, creating the database file if needed.
pub(crate) async fn connect(url: &str) -> Result<SqliteConnection, StorageError> {
    if let Some(path) = url.strip_prefix("sqlite://").or_else(|| url.strip_prefix("sqlite:")) {
        let path = path.split('?').next().unwrap_or(path);
        if let Some(parent) = Path::new(path).parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
    }

    let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
    let conn = SqliteConnection::connect_with(&options).await?;

    Ok(conn)
}

/// Default SQLite URL for a named store under the platform data directory.
pub fn default_url(name: &str) -> String {
    let dir = dirs::data_local_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join("quakewatch");
    format!("sqlite://{}", dir.join(format!("{name}.sqlite")).to_string_lossy())
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
pub(crate) mod test {
    use super::*;
    use tempfile::TempDir;

    /// A throwaway database URL; keep the `TempDir` alive for the test.
    pub fn temp_url(name: &str) -> (TempDir, String) {
        let dir = TempDir::new().unwrap();
        let url = format!("sqlite://{}", dir.path().join(format!("{name}.sqlite")).to_string_lossy());
        (dir, url)
    }

    #[test]
    fn should_build_filter_sql() {
        let filter = QueryFilter {
            located_only: true,
            min_magnitude: Some(5.0),
            date: Some("2024-03-05".to_string()),
            intensity: Some("4".to_string()),
            limit: Some(1),
            ..Default::default()
        };
        let columns = FilterColumns {
            magnitude: "magnitude",
            intensity: Some("intensity"),
            has_coordinates: true,
        };

        let mut qb = QueryBuilder::<Sqlite>::new("SELECT * FROM t");
        push_filter(&mut qb, &filter, &columns);
        push_order_and_limit(&mut qb, OrderBy::NewestFirst, &filter);

        assert_eq!(
            qb.sql(),
            "SELECT * FROM t WHERE 1 = 1 AND lat IS NOT NULL AND lon IS NOT NULL \
             AND magnitude >= ? AND date = ? AND intensity = ? ORDER BY date DESC, time DESC LIMIT ?"
        );
    }

    #[test]
    fn should_skip_coordinates_for_tables_without_them() {
        let columns = FilterColumns {
            magnitude: "m",
            intensity: None,
            has_coordinates: false,
        };
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT 1");
        push_filter(&mut qb, &QueryFilter::located(), &columns);

        assert_eq!(qb.sql(), "SELECT 1 WHERE 1 = 1");
    }

    #[test]
    fn should_place_default_store_under_data_dir() {
        assert!(default_url("warehouse").ends_with("quakewatch/warehouse.sqlite"));
    }
}
