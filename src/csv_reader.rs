// Row file ingestion: CSV (header row first) and JSON arrays of objects

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

use log::{debug, info};

use crate::data::Dataset;
use crate::error::LoadError;

/// Read a CSV document with a header row into a dataset.
///
/// Cells are typed by [`crate::data::CellValue::infer`]. Rows may be ragged;
/// missing trailing cells become empty.
pub fn read_csv<R: Read>(reader: R) -> Result<Dataset, LoadError> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers: Vec<String> = rdr
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    if headers.is_empty() || headers.iter().all(String::is_empty) {
        return Err(LoadError::InvalidShape("CSV must have a header row".into()));
    }

    let mut rows = Vec::new();
    for record in rdr.records() {
        let record = record?;
        rows.push(record.iter().map(str::to_string).collect::<Vec<String>>());
    }

    debug!("parsed CSV with {} columns, {} rows", headers.len(), rows.len());
    Ok(Dataset::from_rows(headers, rows))
}

/// Read CSV from stdin.
pub fn read_csv_from_stdin() -> Result<Dataset, LoadError> {
    let stdin = io::stdin();
    let handle = stdin.lock();
    read_csv(handle)
}

/// Read a JSON array of flat objects.
pub fn read_json<R: Read>(reader: R) -> Result<Dataset, LoadError> {
    let value: serde_json::Value = serde_json::from_reader(reader)?;
    Dataset::from_json(&value)
}

/// Load a row file, choosing the format from the extension (`.json`, anything
/// else is treated as CSV).
pub fn load_path(path: &Path) -> Result<Dataset, LoadError> {
    let file = BufReader::new(File::open(path)?);
    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let dataset = if is_json { read_json(file)? } else { read_csv(file)? };
    info!("loaded {} rows from {}", dataset.len(), path.display());
    Ok(dataset)
}
