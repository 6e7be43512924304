//! Adapter for the OpenSustain.tech project table.
//!
//! OpenSustain.tech covers the whole open-sustainability space; energy
//! system models are two subcategories of it. Its public Grist table exposes
//! data column-wise, one array per column.

use crate::Result;
use crate::candidate::{SourceTag, ToolCandidate};
use crate::net::resilient;
use crate::sources::SourceAdapter;
use async_trait::async_trait;
use ohno::IntoAppError;
use serde::Deserialize;
use serde_json::Value;

const TABLE_URL: &str = "https://docs.getgrist.com/api/docs/gSscJkc5Rb1Rw45gh1o1Yc/tables/Projects/data";
const SUBCATEGORIES: [&str; 2] = ["Energy System Modeling Frameworks", "Grid Analysis and Planning"];

const LOG_TARGET: &str = "opensustain";

/// Column-oriented payload of the Grist data endpoint. Cell values are kept
/// loose since hand-entered rows mix types freely.
#[derive(Debug, Deserialize)]
struct ProjectsTable {
    #[serde(default)]
    project_names: Vec<Value>,
    #[serde(default)]
    git_url: Vec<Value>,
    #[serde(default)]
    description: Vec<Value>,
    #[serde(default)]
    sub_category: Vec<Value>,
}

#[derive(Debug, Clone, Copy)]
pub struct OpenSustain;

#[async_trait]
impl SourceAdapter for OpenSustain {
    fn tag(&self) -> SourceTag {
        SourceTag::OpenSustainTech
    }

    async fn fetch(&self, http: &reqwest::Client) -> Result<Vec<ToolCandidate>> {
        log::info!(target: LOG_TARGET, "Fetching OpenSustain.tech project table");

        let resp = resilient::get(http, TABLE_URL)
            .await?
            .error_for_status()
            .into_app_err("OpenSustain.tech project table is unreachable")?;
        let text = resp.text().await.into_app_err("unable to read OpenSustain.tech table body")?;

        parse(&text)
    }
}

fn parse(text: &str) -> Result<Vec<ToolCandidate>> {
    let table: ProjectsTable = serde_json::from_str(text).into_app_err("unable to parse OpenSustain.tech table")?;

    let rows = table.project_names.len();
    let mut candidates = Vec::new();
    let mut skipped = 0usize;

    for i in 0..rows {
        // Subcategory cells hold a tagged list of the form ["L", "<name>"];
        // only the second element carries the label.
        let subcategory = table
            .sub_category
            .get(i)
            .and_then(|v| v.as_array())
            .and_then(|items| items.get(1))
            .and_then(Value::as_str);

        if !subcategory.is_some_and(|s| SUBCATEGORIES.contains(&s)) {
            continue;
        }

        let Some(name) = table.project_names.get(i).and_then(Value::as_str).filter(|n| !n.trim().is_empty()) else {
            skipped += 1;
            log::warn!(target: LOG_TARGET, "Skipping OpenSustain.tech row {i} without a project name");
            continue;
        };

        candidates.push(ToolCandidate {
            name: name.to_string(),
            url: table.git_url.get(i).and_then(Value::as_str).map(String::from),
            description: table.description.get(i).and_then(Value::as_str).map(String::from),
            category: None,
            source: SourceTag::OpenSustainTech,
        });
    }

    log::info!(target: LOG_TARGET, "Collected {} OpenSustain.tech entries ({skipped} skipped)", candidates.len());
    Ok(candidates)
}
