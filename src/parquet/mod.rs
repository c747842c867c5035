//! Handles serialising and saving data to disk in the _parquet_ file format.

pub mod global;

pub use global::save_global;
