//! CSV table reading and writing.
//!
//! Every pipeline stage consumes and produces columnar CSV artifacts. Stage
//! outputs are written to a temporary sibling file and atomically renamed
//! into place, so an interrupted run never leaves a half-written table
//! behind; the previous table stays intact until the new one is complete.

use crate::Result;
use ohno::IntoAppError;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

const LOG_TARGET: &str = "    tables";

/// Read all rows of a CSV table.
pub fn read<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<Vec<T>> {
    let path = path.as_ref();
    let mut reader = csv::Reader::from_path(path).into_app_err_with(|| format!("unable to open table '{}'", path.display()))?;

    let mut rows = Vec::new();
    for record in reader.deserialize() {
        let row = record.into_app_err_with(|| format!("malformed row in table '{}'", path.display()))?;
        rows.push(row);
    }

    log::debug!(target: LOG_TARGET, "Read {} row(s) from '{}'", rows.len(), path.display());
    Ok(rows)
}

/// Read a table that may not exist yet. Returns `None` when the file is
/// missing, which callers treat as an empty prior state.
pub fn read_optional<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<Option<Vec<T>>> {
    if path.as_ref().exists() {
        read(path).map(Some)
    } else {
        Ok(None)
    }
}

/// Write all rows to a CSV table, replacing any existing file atomically.
pub fn write_atomic<T: Serialize>(path: impl AsRef<Path>, rows: &[T]) -> Result<()> {
    let path = path.as_ref();

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).into_app_err_with(|| format!("unable to create directory '{}'", parent.display()))?;
    }

    let tmp_path = path.with_extension("csv.tmp");
    {
        let file = File::create(&tmp_path).into_app_err_with(|| format!("unable to create '{}'", tmp_path.display()))?;
        let mut writer = csv::Writer::from_writer(BufWriter::new(file));

        for row in rows {
            writer
                .serialize(row)
                .into_app_err_with(|| format!("unable to write row to '{}'", tmp_path.display()))?;
        }

        let mut inner = writer
            .into_inner()
            .map_err(|e| ohno::app_err!("unable to finish table '{}': {e}", tmp_path.display()))?;
        inner
            .flush()
            .into_app_err_with(|| format!("unable to flush table '{}'", tmp_path.display()))?;
    }

    fs::rename(&tmp_path, path).into_app_err_with(|| format!("unable to move table into place at '{}'", path.display()))?;

    log::debug!(target: LOG_TARGET, "Wrote {} row(s) to '{}'", rows.len(), path.display());
    Ok(())
}
