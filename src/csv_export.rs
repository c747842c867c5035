//! Writes GeoJSON features to CSV.
//!
//! Columns are `id`, every property key seen in the batch (`time` first when
//! present, the rest alphabetical), then `time_iso`, `longitude`, `latitude`
//! and `depth`.

use std::{collections::BTreeSet, fs, io::Write, path::Path};

use anyhow::Result;
use serde_json::Value;

use crate::{quake::Feature, timestamp};

const TRAILING_COLUMNS: [&str; 4] = ["time_iso", "longitude", "latitude", "depth"];

/// Property keys of the batch in output order.
pub fn property_columns(features: &[Feature]) -> Vec<String> {
    let keys: BTreeSet<&str> = features
        .iter()
        .filter_map(|f| f.properties.as_ref())
        .flat_map(|p| p.keys().map(String::as_str))
        .collect();

    let mut columns: Vec<String> = Vec::with_capacity(keys.len());
    if keys.contains("time") {
        columns.push("time".to_string());
    }
    columns.extend(keys.into_iter().filter(|k| *k != "time").map(str::to_string));

    columns
}

/// Full header row.
pub fn header(features: &[Feature]) -> Vec<String> {
    let mut header = vec!["id".to_string()];
    header.extend(property_columns(features));
    header.extend(TRAILING_COLUMNS.iter().map(|c| c.to_string()));

    header
}

/// Writes `features` as CSV to any writer.
pub fn write_features<W: Write>(features: &[Feature], writer: W) -> Result<()> {
    let columns = property_columns(features);
    let mut csv = csv::Writer::from_writer(writer);

    csv.write_record(header(features))?;

    for feature in features {
        let mut record = Vec::with_capacity(columns.len() + 5);
        record.push(feature.id.clone().unwrap_or_default());

        for key in &columns {
            record.push(feature.property(key).map(cell).unwrap_or_default());
        }

        record.push(
            feature
                .time_ms()
                .and_then(timestamp::ms_to_iso)
                .unwrap_or_default(),
        );
        record.push(number(feature.longitude()));
        record.push(number(feature.latitude()));
        record.push(number(feature.depth()));

        csv.write_record(&record)?;
    }

    csv.flush()?;
    Ok(())
}

/// Writes `features` to `out_path`, creating parent directories.
pub fn save_features(features: &[Feature], out_path: &Path) -> Result<()> {
    if let Some(parent) = out_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let file = fs::File::create(out_path)?;
    write_features(features, file)
}

fn cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn number(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

// -- Tests -------------------------------------------------------------------
