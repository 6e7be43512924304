//! Serialization helpers for cached JSON documents.
//!
//! Fetched API records are cached on disk between refresh runs so that
//! unchanged tools are not re-queried. Each document carries its own
//! timestamp; staleness is decided by the caller-supplied TTL.

use crate::Result;
use chrono::{DateTime, Utc};
use core::time::Duration;
use ohno::IntoAppError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

const LOG_TARGET: &str = " cache_doc";

/// Load a document from a file, returning `None` when the file is missing,
/// unreadable, or older than `ttl`.
pub fn load_with_ttl<T, F>(path: impl AsRef<Path>, ttl: Duration, get_timestamp: F, context: impl AsRef<str>) -> Option<T>
where
    T: for<'de> Deserialize<'de>,
    F: FnOnce(&T) -> DateTime<Utc>,
{
    let path = path.as_ref();
    let ctx = context.as_ref();

    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) => {
            log::debug!(target: LOG_TARGET, "Cache miss for {ctx}: {e:#}");
            return None;
        }
    };

    let reader = BufReader::new(file);
    let data = match serde_json::from_reader(reader) {
        Ok(data) => data,
        Err(e) => {
            log::debug!(target: LOG_TARGET, "Cache miss for {ctx}: {e:#}");
            return None;
        }
    };

    let age = Utc::now().signed_duration_since(get_timestamp(&data));
    if age.num_seconds() < 0 {
        // Timestamp in the future means clock skew; treat as fresh.
        return Some(data);
    }

    let age = age.to_std().unwrap_or(Duration::MAX);
    if age < ttl {
        log::debug!(target: LOG_TARGET, "Cache hit for {ctx} (age: {:.1} days)", age.as_secs_f64() / 86400.0);
        Some(data)
    } else {
        log::debug!(target: LOG_TARGET,
            "Cache expired for {ctx} (age: {:.1} days, TTL: {:.1} days)",
            age.as_secs_f64() / 86400.0,
            ttl.as_secs_f64() / 86400.0
        );
        None
    }
}

/// Save a document to a file, creating parent directories as needed.
pub fn save<T>(data: &T, path: impl AsRef<Path>) -> Result<()>
where
    T: Serialize,
{
    let path = path.as_ref();

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).into_app_err_with(|| format!("unable to create directory '{}'", parent.display()))?;
    }

    let file = File::create(path).into_app_err_with(|| format!("unable to create cache file '{}'", path.display()))?;
    let mut writer = BufWriter::new(file);

    serde_json::to_writer(&mut writer, data).into_app_err_with(|| format!("unable to write cache file '{}'", path.display()))?;
    writer
        .flush()
        .into_app_err_with(|| format!("unable to flush cache file '{}'", path.display()))?;
    Ok(())
}
