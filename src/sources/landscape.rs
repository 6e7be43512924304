//! Adapter for the LF Energy landscape file.
//!
//! The landscape is a parallel project to OpenSustain.tech that periodically
//! imports its data and adds further projects, including some hosted outside
//! the usual git forges. Only the "Energy Systems / Modeling and
//! Optimization" subcategory is relevant here.

use crate::Result;
use crate::candidate::{SourceTag, ToolCandidate};
use crate::net::resilient;
use crate::sources::SourceAdapter;
use async_trait::async_trait;
use ohno::{IntoAppError, app_err};
use serde::Deserialize;

const LANDSCAPE_URL: &str = "https://raw.githubusercontent.com/lf-energy/lfenergy-landscape/refs/heads/main/landscape.yml";
const CATEGORY: &str = "Energy Systems";
const SUBCATEGORY: &str = "Modeling and Optimization";

const LOG_TARGET: &str = " landscape";

#[derive(Debug, Deserialize)]
struct LandscapeFile {
    landscape: Vec<Category>,
}

#[derive(Debug, Deserialize)]
struct Category {
    name: String,
    #[serde(default)]
    subcategories: Vec<Subcategory>,
}

#[derive(Debug, Deserialize)]
struct Subcategory {
    name: String,
    #[serde(default)]
    items: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    name: Option<String>,
    description: Option<String>,
    repo_url: Option<String>,
    homepage_url: Option<String>,
}

#[derive(Debug, Clone, Copy)]
pub struct Landscape;

#[async_trait]
impl SourceAdapter for Landscape {
    fn tag(&self) -> SourceTag {
        SourceTag::LfEnergyLandscape
    }

    async fn fetch(&self, http: &reqwest::Client) -> Result<Vec<ToolCandidate>> {
        log::info!(target: LOG_TARGET, "Fetching LF Energy landscape");

        let resp = resilient::get(http, LANDSCAPE_URL)
            .await?
            .error_for_status()
            .into_app_err("LF Energy landscape is unreachable")?;
        let text = resp.text().await.into_app_err("unable to read LF Energy landscape body")?;

        parse(&text)
    }
}

/// Map the landscape document to candidate records.
fn parse(text: &str) -> Result<Vec<ToolCandidate>> {
    let file: LandscapeFile = serde_yaml::from_str(text).into_app_err("unable to parse LF Energy landscape YAML")?;

    let category = file
        .landscape
        .into_iter()
        .find(|c| c.name == CATEGORY)
        .ok_or_else(|| app_err!("LF Energy landscape has no '{CATEGORY}' category"))?;

    let subcategory = category
        .subcategories
        .into_iter()
        .find(|s| s.name == SUBCATEGORY)
        .ok_or_else(|| app_err!("LF Energy landscape has no '{SUBCATEGORY}' subcategory"))?;

    let mut candidates = Vec::with_capacity(subcategory.items.len());
    let mut skipped = 0usize;

    for item in subcategory.items {
        let Some(name) = item.name.filter(|n| !n.trim().is_empty()) else {
            skipped += 1;
            log::warn!(target: LOG_TARGET, "Skipping landscape entry without a name");
            continue;
        };

        candidates.push(ToolCandidate {
            name,
            url: item.repo_url.or(item.homepage_url),
            description: item.description,
            category: None,
            source: SourceTag::LfEnergyLandscape,
        });
    }

    log::info!(target: LOG_TARGET, "Collected {} landscape entries ({skipped} skipped)", candidates.len());
    Ok(candidates)
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = r"
landscape:
  - name: Power Systems
    subcategories: []
  - name: Energy Systems
    subcategories:
      - name: Something Else
        items:
          - name: Irrelevant
            repo_url: https://github.com/x/irrelevant
      - name: Modeling and Optimization
        items:
          - name: PyPSA
            description: Python for Power System Analysis
            repo_url: https://github.com/pypsa/pypsa
          - name: HomepageOnly
            homepage_url: https://example.org/tool
          - description: entry with no name
            repo_url: https://github.com/x/anonymous
";

    #[test]
    fn picks_the_modelling_subcategory() {
        let candidates = parse(FIXTURE).unwrap();
        assert_eq!(candidates.len(), 2);
        assert!(candidates.iter().all(|c| c.source == SourceTag::LfEnergyLandscape));
        assert!(!candidates.iter().any(|c| c.name == "Irrelevant"));
    }

    #[test]
    fn repo_url_preferred_over_homepage() {
        let candidates = parse(FIXTURE).unwrap();
        assert_eq!(candidates[0].name, "PyPSA");
        assert_eq!(candidates[0].url.as_deref(), Some("https://github.com/pypsa/pypsa"));
        assert_eq!(candidates[1].url.as_deref(), Some("https://example.org/tool"));
    }

    #[test]
    fn nameless_entries_are_skipped() {
        let candidates = parse(FIXTURE).unwrap();
        assert!(!candidates.iter().any(|c| c.url.as_deref() == Some("https://github.com/x/anonymous")));
    }

    #[test]
    fn missing_category_is_fatal() {
        assert!(parse("landscape: []").is_err());
    }

    #[test]
    fn malformed_yaml_is_fatal() {
        assert!(parse(": not yaml").is_err());
    }
}
