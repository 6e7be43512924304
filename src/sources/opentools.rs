//! Adapter for the G-PST opentools inventory.
//!
//! Entries are contributed manually, one document per tool, listed through
//! the repository contents API. The manual curation makes key metadata here
//! the most reliable of the upstream inventories, but entries are not kept
//! up to date automatically and a source URL is not required.

use crate::Result;
use crate::candidate::{SourceTag, ToolCandidate};
use crate::net::resilient;
use crate::sources::{SourceAdapter, TOOL_TYPES};
use async_trait::async_trait;
use ohno::IntoAppError;
use serde::Deserialize;

const LISTING_URL: &str = "https://api.github.com/repos/G-PST/opentools/contents/data/software";

const LOG_TARGET: &str = " opentools";

#[derive(Debug, Deserialize)]
struct ListingEntry {
    name: String,
    download_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ToolDoc {
    name: Option<String>,
    description: Option<String>,
    url_sourcecode: Option<String>,
    #[serde(default)]
    categories: Vec<String>,
}

#[derive(Debug, Clone, Copy)]
pub struct OpenTools;

#[async_trait]
impl SourceAdapter for OpenTools {
    fn tag(&self) -> SourceTag {
        SourceTag::GPst
    }

    async fn fetch(&self, http: &reqwest::Client) -> Result<Vec<ToolCandidate>> {
        log::info!(target: LOG_TARGET, "Fetching G-PST opentools listing");

        let resp = resilient::get(http, LISTING_URL)
            .await?
            .error_for_status()
            .into_app_err("G-PST opentools listing is unreachable")?;
        let listing: Vec<ListingEntry> = resp.json().await.into_app_err("unable to parse G-PST opentools listing")?;

        let mut candidates = Vec::new();
        let mut skipped = 0usize;

        for entry in listing {
            let Some(download_url) = entry.download_url else {
                skipped += 1;
                log::warn!(target: LOG_TARGET, "Skipping G-PST listing entry '{}' without a download URL", entry.name);
                continue;
            };

            let doc = match fetch_tool_doc(http, &download_url).await {
                Ok(doc) => doc,
                Err(e) => {
                    skipped += 1;
                    log::warn!(target: LOG_TARGET, "Skipping unreadable G-PST entry '{}': {e:#}", entry.name);
                    continue;
                }
            };

            if let Some(candidate) = map_tool_doc(doc) {
                candidates.push(candidate);
            }
        }

        log::info!(target: LOG_TARGET, "Collected {} G-PST entries ({skipped} skipped)", candidates.len());
        Ok(candidates)
    }
}

async fn fetch_tool_doc(http: &reqwest::Client, url: &str) -> Result<ToolDoc> {
    let resp = resilient::get(http, url)
        .await?
        .error_for_status()
        .into_app_err_with(|| format!("unable to fetch G-PST tool document '{url}'"))?;
    let text = resp.text().await.into_app_err_with(|| format!("unable to read G-PST tool document '{url}'"))?;

    // Tool documents are JSON; YAML is a superset and tolerates stray
    // formatting in hand-edited files.
    serde_yaml::from_str(&text).into_app_err_with(|| format!("unable to parse G-PST tool document '{url}'"))
}

/// Map a tool document to a candidate, or `None` when it carries no name or
/// none of the recognized categories.
fn map_tool_doc(doc: ToolDoc) -> Option<ToolCandidate> {
    let name = doc.name.filter(|n| !n.trim().is_empty())?;

    let matching: Vec<&str> = doc
        .categories
        .iter()
        .map(String::as_str)
        .filter(|c| TOOL_TYPES.contains(c))
        .collect();
    if matching.is_empty() {
        return None;
    }

    Some(ToolCandidate {
        name,
        url: doc.url_sourcecode,
        description: doc.description,
        category: Some(matching.join(",")),
        source: SourceTag::GPst,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(name: Option<&str>, categories: &[&str]) -> ToolDoc {
        ToolDoc {
            name: name.map(String::from),
            description: Some("a tool".to_string()),
            url_sourcecode: Some("https://github.com/x/tool".to_string()),
            categories: categories.iter().map(|s| (*s).to_string()).collect(),
        }
    }

    #[test]
    fn keeps_recognized_categories_only() {
        let candidate = map_tool_doc(doc(Some("Tool"), &["capacity-expansion", "visualisation"])).unwrap();
        assert_eq!(candidate.category.as_deref(), Some("capacity-expansion"));
        assert_eq!(candidate.source, SourceTag::GPst);
    }

    #[test]
    fn joins_multiple_categories() {
        let candidate = map_tool_doc(doc(Some("Tool"), &["power-flow", "production-cost"])).unwrap();
        assert_eq!(candidate.category.as_deref(), Some("power-flow,production-cost"));
    }

    #[test]
    fn drops_unrecognized_category_entries() {
        assert!(map_tool_doc(doc(Some("Tool"), &["visualisation"])).is_none());
        assert!(map_tool_doc(doc(Some("Tool"), &[])).is_none());
    }

    #[test]
    fn drops_nameless_entries() {
        assert!(map_tool_doc(doc(None, &["other"])).is_none());
        assert!(map_tool_doc(doc(Some("  "), &["other"])).is_none());
    }

    #[test]
    fn tool_doc_parses_from_json() {
        let text = r#"{"name": "Switch", "url_sourcecode": "https://github.com/switch-model/switch", "categories": ["capacity-expansion"]}"#;
        let doc: ToolDoc = serde_yaml::from_str(text).unwrap();
        assert_eq!(doc.name.as_deref(), Some("Switch"));
        assert_eq!(doc.categories, vec!["capacity-expansion"]);
    }
}
