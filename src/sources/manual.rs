//! Loader for the manually curated tool list shipped with this repository,
//! derived from literature review and subsequent searches.
//!
//! Entries already collected by the automatic adapters are taken as valid
//! without further checking; the rest are validated against the ecosyste.ms
//! repository lookup so dead links don't enter the inventory.

use crate::Result;
use crate::candidate::{SourceTag, ToolCandidate, url_key};
use crate::stats::ecosystems;
use crate::tables;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;

const LOG_TARGET: &str = "    manual";

#[derive(Debug, Deserialize)]
struct ManualRow {
    source_url: String,
}

/// Load and validate the manual list.
///
/// `known_urls` holds the normalized URLs already collected from the other
/// inventories; those skip the lookup round-trip.
pub async fn load(path: impl AsRef<Path>, known_urls: &HashSet<String>, ecosystems: &ecosystems::Client) -> Result<Vec<ToolCandidate>> {
    let path = path.as_ref();
    log::info!(target: LOG_TARGET, "Loading manual list from '{}'", path.display());

    let rows: Vec<ManualRow> = tables::read(path)?;

    let mut candidates = Vec::new();
    let mut dropped = 0usize;

    for row in rows {
        let url = url_key(&row.source_url);
        if url.is_empty() {
            dropped += 1;
            log::warn!(target: LOG_TARGET, "Skipping empty manual list entry");
            continue;
        }

        if !known_urls.contains(&url) && !ecosystems.repo_exists(&url).await? {
            dropped += 1;
            log::warn!(target: LOG_TARGET, "Manual list entry '{url}' has no ecosyste.ms record, skipping");
            continue;
        }

        let Some(name) = name_from_url(&url) else {
            dropped += 1;
            log::warn!(target: LOG_TARGET, "Manual list entry '{url}' has no usable name segment, skipping");
            continue;
        };

        candidates.push(ToolCandidate {
            name,
            url: Some(url),
            description: None,
            category: None,
            source: SourceTag::Manual,
        });
    }

    log::info!(target: LOG_TARGET, "Collected {} manual entries ({dropped} dropped)", candidates.len());
    Ok(candidates)
}

/// Derive a tool name from the last path segment of its URL.
fn name_from_url(url: &str) -> Option<String> {
    let segment = url.rsplit('/').next()?.trim().trim_end_matches(".git");
    if segment.is_empty() { None } else { Some(segment.to_string()) }
}
