//! Deduplication and exclusion filtering of the collated tool list.
//!
//! Candidates are deduplicated independently on their normalized name key
//! and their normalized URL key. Within a duplicate group a single
//! deterministic representative survives: the candidate from the
//! highest-priority source, ties broken by input order. Entries without a
//! git-hosting URL and entries matching a manual exclusion are then removed.

use crate::Result;
use crate::candidate::{SourceTag, ToolCandidate};
use crate::repo_spec;
use ohno::bail;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

const LOG_TARGET: &str = "     merge";

/// A manually curated exclusion: the identifier matches a candidate's
/// normalized name or URL key; the reason is kept for the record only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExclusionRule {
    pub id: String,
    pub reason: String,
}

/// Counters describing what the merge removed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MergeSummary {
    pub duplicates: usize,
    pub no_git_url: usize,
    pub excluded: usize,
}

/// Deduplicate `candidates` and apply exclusions.
///
/// `priority` lists every source tag exactly once, highest priority first.
/// The output contains no two candidates sharing a name key or a URL key,
/// and is ordered by (priority, input order), which makes the merge
/// idempotent: merging its own output changes nothing.
pub fn merge(
    candidates: Vec<ToolCandidate>,
    priority: &[SourceTag],
    exclusions: &[ExclusionRule],
) -> Result<(Vec<ToolCandidate>, MergeSummary)> {
    validate_priority(priority)?;

    let rank = |source: SourceTag| priority.iter().position(|&p| p == source).unwrap_or(priority.len());

    let mut ordered: Vec<(usize, ToolCandidate)> = candidates.into_iter().enumerate().collect();
    ordered.sort_by_key(|(i, c)| (rank(c.source), *i));

    let mut summary = MergeSummary::default();
    let mut seen_names: HashSet<String> = HashSet::new();
    let mut seen_urls: HashSet<String> = HashSet::new();
    let excluded_ids: HashSet<&str> = exclusions.iter().map(|e| e.id.as_str()).collect();

    let mut kept = Vec::with_capacity(ordered.len());
    for (_, candidate) in ordered {
        let name_key = candidate.name_key();
        let url_key = candidate.url_key();

        if seen_names.contains(&name_key) || url_key.as_deref().is_some_and(|u| seen_urls.contains(u)) {
            summary.duplicates += 1;
            log::warn!(target: LOG_TARGET, "Dropping duplicate entry '{}' from {}", candidate.name, candidate.source);
            continue;
        }
        let _ = seen_names.insert(name_key.clone());
        if let Some(u) = url_key.clone() {
            let _ = seen_urls.insert(u);
        }

        if !candidate.url.as_deref().is_some_and(repo_spec::is_git_host) {
            summary.no_git_url += 1;
            log::warn!(target: LOG_TARGET, "Dropping entry '{}' without a valid git repo URL", candidate.name);
            continue;
        }

        if excluded_ids.contains(name_key.as_str()) || url_key.as_deref().is_some_and(|u| excluded_ids.contains(u)) {
            summary.excluded += 1;
            log::warn!(target: LOG_TARGET, "Excluding entry '{}' following manual assessment", candidate.name);
            continue;
        }

        kept.push(candidate);
    }

    log::info!(
        target: LOG_TARGET,
        "Merge kept {} entries ({} duplicates, {} without git URL, {} excluded)",
        kept.len(),
        summary.duplicates,
        summary.no_git_url,
        summary.excluded
    );

    Ok((kept, summary))
}

/// A manual category assignment: fills in the category of the tool whose
/// normalized name key equals `id`, when the inventories left it empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryMapping {
    pub id: String,
    pub category: String,
}

/// Apply manual category assignments to tools without a category.
pub fn apply_category_mappings(tools: &mut [ToolCandidate], mappings: &[CategoryMapping]) {
    let by_id: std::collections::HashMap<&str, &str> = mappings.iter().map(|m| (m.id.as_str(), m.category.as_str())).collect();

    let mut applied = 0usize;
    for tool in tools.iter_mut() {
        if tool.category.is_none()
            && let Some(category) = by_id.get(tool.name_key().as_str())
        {
            tool.category = Some((*category).to_string());
            applied += 1;
        }
    }

    log::info!(target: LOG_TARGET, "Applied {applied} manual category assignments");
}

/// A usable priority list names every source exactly once.
fn validate_priority(priority: &[SourceTag]) -> Result<()> {
    let unique: HashSet<_> = priority.iter().copied().collect();
    if unique.len() != priority.len() {
        bail!("source priority list contains duplicates");
    }
    for tag in SourceTag::all() {
        if !unique.contains(&tag) {
            bail!("source priority list is missing '{tag}'");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const PRIORITY: [SourceTag; 4] = [
        SourceTag::LfEnergyLandscape,
        SourceTag::OpenSustainTech,
        SourceTag::GPst,
        SourceTag::Manual,
    ];

    fn candidate(name: &str, url: &str, source: SourceTag) -> ToolCandidate {
        ToolCandidate {
            name: name.to_string(),
            url: (!url.is_empty()).then(|| url.to_string()),
            description: None,
            category: None,
            source,
        }
    }

    fn exclusion(id: &str) -> ExclusionRule {
        ExclusionRule {
            id: id.to_string(),
            reason: "manual assessment".to_string(),
        }
    }

    #[test]
    fn same_name_different_case_keeps_one() {
        let input = vec![
            candidate("MyTool", "https://github.com/a/mytool", SourceTag::GPst),
            candidate("mytool", "https://gitlab.com/b/mytool", SourceTag::Manual),
        ];

        let (kept, summary) = merge(input, &PRIORITY, &[]).unwrap();
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].name_key(), "mytool");
        assert_eq!(summary.duplicates, 1);
    }

    #[test]
    fn higher_priority_source_survives() {
        let input = vec![
            candidate("Tool", "https://github.com/low/tool", SourceTag::Manual),
            candidate("Tool", "https://github.com/high/tool", SourceTag::LfEnergyLandscape),
        ];

        let (kept, _) = merge(input, &PRIORITY, &[]).unwrap();
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].source, SourceTag::LfEnergyLandscape);
    }

    #[test]
    fn first_seen_wins_within_same_source() {
        let input = vec![
            candidate("Tool", "https://github.com/first/tool", SourceTag::GPst),
            candidate("Tool", "https://github.com/second/tool", SourceTag::GPst),
        ];

        let (kept, _) = merge(input, &PRIORITY, &[]).unwrap();
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].url.as_deref(), Some("https://github.com/first/tool"));
    }

    #[test]
    fn url_key_deduplicates_independently_of_name() {
        let input = vec![
            candidate("NameOne", "https://github.com/x/tool", SourceTag::GPst),
            candidate("NameTwo", "https://GitHub.com/X/Tool/", SourceTag::Manual),
        ];

        let (kept, summary) = merge(input, &PRIORITY, &[]).unwrap();
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].name, "NameOne");
        assert_eq!(summary.duplicates, 1);
    }

    #[test]
    fn merge_is_idempotent() {
        let input = vec![
            candidate("A", "https://github.com/a/a", SourceTag::LfEnergyLandscape),
            candidate("a", "https://github.com/other/a", SourceTag::GPst),
            candidate("B", "https://github.com/b/b", SourceTag::Manual),
            candidate("C", "", SourceTag::GPst),
        ];

        let (once, _) = merge(input, &PRIORITY, &[]).unwrap();
        let (twice, summary) = merge(once.clone(), &PRIORITY, &[]).unwrap();
        assert_eq!(once, twice);
        assert_eq!(summary, MergeSummary::default());
    }

    #[test]
    fn non_git_urls_are_dropped() {
        let input = vec![
            candidate("WebTool", "https://example.com/webtool", SourceTag::GPst),
            candidate("NoUrl", "", SourceTag::GPst),
            candidate("GitTool", "https://bitbucket.org/x/gittool", SourceTag::GPst),
        ];

        let (kept, summary) = merge(input, &PRIORITY, &[]).unwrap();
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].name, "GitTool");
        assert_eq!(summary.no_git_url, 2);
    }

    #[test]
    fn exclusion_by_name_key_always_wins() {
        let input = vec![
            candidate("Bad-Tool", "https://github.com/x/bad", SourceTag::LfEnergyLandscape),
            candidate("bad tool", "https://github.com/y/bad", SourceTag::Manual),
        ];

        let (kept, summary) = merge(input, &PRIORITY, &[exclusion("bad_tool")]).unwrap();
        assert!(kept.is_empty());
        assert_eq!(summary.excluded, 1);
        assert_eq!(summary.duplicates, 1);
    }

    #[test]
    fn exclusion_by_url_key() {
        let input = vec![candidate("Tool", "https://github.com/x/tool", SourceTag::GPst)];

        let (kept, summary) = merge(input, &PRIORITY, &[exclusion("https://github.com/x/tool")]).unwrap();
        assert!(kept.is_empty());
        assert_eq!(summary.excluded, 1);
    }

    #[test]
    fn category_mappings_fill_only_missing_categories() {
        let mut tools = vec![
            candidate("Uncategorized-Tool", "https://github.com/x/a", SourceTag::Manual),
            ToolCandidate {
                category: Some("power-flow".to_string()),
                ..candidate("Categorized", "https://github.com/x/b", SourceTag::GPst)
            },
        ];

        let mappings = vec![
            CategoryMapping {
                id: "uncategorized_tool".to_string(),
                category: "capacity-expansion".to_string(),
            },
            CategoryMapping {
                id: "categorized".to_string(),
                category: "other".to_string(),
            },
        ];

        apply_category_mappings(&mut tools, &mappings);
        assert_eq!(tools[0].category.as_deref(), Some("capacity-expansion"));
        assert_eq!(tools[1].category.as_deref(), Some("power-flow"));
    }

    #[test]
    fn incomplete_priority_list_is_rejected() {
        let input = vec![candidate("Tool", "https://github.com/x/tool", SourceTag::GPst)];
        assert!(merge(input.clone(), &[SourceTag::GPst], &[]).is_err());
        assert!(merge(input, &[SourceTag::GPst; 4], &[]).is_err());
    }
}
