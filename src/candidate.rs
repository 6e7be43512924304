//! Candidate tool records and the identity keys used to deduplicate them.

use serde::{Deserialize, Serialize};

/// Inventory a candidate record originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display, clap::ValueEnum)]
pub enum SourceTag {
    /// LF Energy landscape file.
    #[serde(rename = "lf-energy-landscape")]
    #[strum(serialize = "lf-energy-landscape")]
    #[value(name = "lf-energy-landscape")]
    LfEnergyLandscape,

    /// OpenSustain.tech project table.
    #[serde(rename = "opensustain-tech")]
    #[strum(serialize = "opensustain-tech")]
    #[value(name = "opensustain-tech")]
    OpenSustainTech,

    /// G-PST opentools listing.
    #[serde(rename = "g-pst")]
    #[strum(serialize = "g-pst")]
    #[value(name = "g-pst")]
    GPst,

    /// Manually curated list shipped with this repository.
    #[serde(rename = "manual")]
    #[strum(serialize = "manual")]
    #[value(name = "manual")]
    Manual,
}

impl SourceTag {
    /// All known inventories, in the order the upstream data is concatenated.
    #[must_use]
    pub const fn all() -> [Self; 4] {
        [Self::LfEnergyLandscape, Self::OpenSustainTech, Self::GPst, Self::Manual]
    }
}

/// A tool entry after adapter normalization, before deduplication.
///
/// Candidates from every inventory share this shape so the merge stage can
/// treat them uniformly. `url` may still be absent at this point; entries
/// without a usable git URL are removed during filtering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCandidate {
    pub name: String,
    pub url: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub source: SourceTag,
}

impl ToolCandidate {
    /// Normalized name identity key.
    #[must_use]
    pub fn name_key(&self) -> String {
        name_key(&self.name)
    }

    /// Normalized URL identity key, if the candidate carries a URL.
    #[must_use]
    pub fn url_key(&self) -> Option<String> {
        self.url.as_deref().map(url_key)
    }
}

/// Normalize a tool name into its identity key: lowercase with every
/// non-alphanumeric character mapped to an underscore.
#[must_use]
pub fn name_key(name: &str) -> String {
    name.trim()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect()
}

/// Normalize a source URL into its identity key: trimmed, trailing slashes
/// stripped, lowercased, and prefixed with `https://` when the scheme is
/// missing (manually curated entries often omit it).
#[must_use]
pub fn url_key(url: &str) -> String {
    let trimmed = url.trim().trim_end_matches('/').to_lowercase();
    if trimmed.is_empty() || trimmed.contains("://") {
        trimmed
    } else {
        format!("https://{trimmed}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(name: &str, url: Option<&str>) -> ToolCandidate {
        ToolCandidate {
            name: name.to_string(),
            url: url.map(String::from),
            description: None,
            category: None,
            source: SourceTag::Manual,
        }
    }

    #[test]
    fn name_key_lowercases() {
        assert_eq!(name_key("MyTool"), "mytool");
        assert_eq!(name_key("mytool"), "mytool");
    }

    #[test]
    fn name_key_maps_special_characters_to_underscore() {
        assert_eq!(name_key("PyPSA-Eur"), "pypsa_eur");
        assert_eq!(name_key("Switch 2.0"), "switch_2_0");
        assert_eq!(name_key("  padded  "), "padded");
    }

    #[test]
    fn url_key_strips_and_lowercases() {
        assert_eq!(url_key("https://GitHub.com/Foo/Bar/"), "https://github.com/foo/bar");
        assert_eq!(url_key("https://github.com/foo/bar"), "https://github.com/foo/bar");
    }

    #[test]
    fn url_key_prefixes_missing_scheme() {
        assert_eq!(url_key("github.com/foo/bar"), "https://github.com/foo/bar");
    }

    #[test]
    fn url_key_empty_stays_empty() {
        assert_eq!(url_key("  "), "");
    }

    #[test]
    fn candidate_keys() {
        let c = candidate("My-Tool", Some("https://Example.org/x/"));
        assert_eq!(c.name_key(), "my_tool");
        assert_eq!(c.url_key().unwrap(), "https://example.org/x");

        let no_url = candidate("My-Tool", None);
        assert_eq!(no_url.url_key(), None);
    }

    #[test]
    fn source_tag_serializes_kebab_case() {
        assert_eq!(
            serde_yaml::to_string(&SourceTag::OpenSustainTech).unwrap().trim(),
            "opensustain-tech"
        );
        assert_eq!(serde_yaml::to_string(&SourceTag::GPst).unwrap().trim(), "g-pst");
        assert_eq!(SourceTag::LfEnergyLandscape.to_string(), "lf-energy-landscape");
    }
}
