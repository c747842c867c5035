pub mod chat;
pub mod export;
pub mod query;
pub mod refresh;
pub mod serve;
pub mod snapshot;

use std::path::PathBuf;

use anyhow::{anyhow, Result};
use chrono::{Datelike, Local};
pub use chat::chat;
pub use export::export;
pub use query::query;
pub use refresh::refresh;
pub use serve::serve;
pub use snapshot::snapshot;

pub fn make_parquet_file_name(dataset: &str) -> Result<PathBuf> {
    let today = Local::now();
    let file_name = format!(
        "quakewatch-{}-{}-{:02}-{:02}.parquet",
        dataset,
        today.year(),
        today.month(),
        today.day()
    );

    let home = dirs::home_dir().ok_or_else(|| anyhow!("no home directory"))?;
    Ok(home.join(file_name))
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn should_date_stamp_parquet_file() {
        let name = make_parquet_file_name("global").unwrap();
        let name = name.file_name().unwrap().to_string_lossy().to_string();

        assert!(name.starts_with("quakewatch-global-"));
        assert!(name.ends_with(".parquet"));
        assert_eq!(name.len(), "quakewatch-global-2024-03-05.parquet".len());
    }
}
