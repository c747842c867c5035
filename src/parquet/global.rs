//! Save the global feed to a parquet file.

use std::{fs::File, path::Path, sync::Arc};

use anyhow::Result;
use arrow::{
    array::{ArrayRef, BooleanArray, Float64Array, StringArray},
    datatypes::{DataType, Field, Schema},
    record_batch::RecordBatch,
};
use parquet::{arrow::ArrowWriter, basic::Compression, file::properties::WriterProperties};

use crate::quake::GlobalQuake;

pub fn save_global(quakes: &[GlobalQuake], file_path: &Path) -> Result<()> {
    let file = File::create(file_path)?;

    let schema = Arc::new(Schema::new(vec![
        Field::new("date", DataType::Utf8, false),
        Field::new("time", DataType::Utf8, false),
        Field::new("magnitude", DataType::Float64, false),
        Field::new("location", DataType::Utf8, false),
        Field::new("title", DataType::Utf8, false),
        Field::new("tsunami", DataType::Boolean, false),
        Field::new("lat", DataType::Float64, true),
        Field::new("lon", DataType::Float64, true),
    ]));

    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();

    let mut writer = ArrowWriter::try_new(file, schema.clone(), Some(props))?;

    let num_rows = quakes.len();

    let mut dates = Vec::with_capacity(num_rows);
    let mut times = Vec::with_capacity(num_rows);
    let mut magnitudes = Vec::with_capacity(num_rows);
    let mut locations = Vec::with_capacity(num_rows);
    let mut titles = Vec::with_capacity(num_rows);
    let mut tsunamis = Vec::with_capacity(num_rows);
    let mut lats = Vec::with_capacity(num_rows);
    let mut lons = Vec::with_capacity(num_rows);

    for q in quakes {
        dates.push(q.date.as_str());
        times.push(q.time.as_str());
        magnitudes.push(q.magnitude);
        locations.push(q.location.as_str());
        titles.push(q.title.as_str());
        tsunamis.push(q.tsunami);
        lats.push(q.lat);
        lons.push(q.lon);
    }

    let columns: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from(dates)),
        Arc::new(StringArray::from(times)),
        Arc::new(Float64Array::from(magnitudes)),
        Arc::new(StringArray::from(locations)),
        Arc::new(StringArray::from(titles)),
        Arc::new(BooleanArray::from(tsunamis)),
        Arc::new(Float64Array::from(lats)),
        Arc::new(Float64Array::from(lons)),
    ];

    let batch = RecordBatch::try_new(schema, columns)?;

    writer.write(&batch)?;
    writer.close()?;

    Ok(())
}

// -- Tests -------------------------------------------------------------------
