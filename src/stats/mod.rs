//! Repository and package statistics enrichment.
//!
//! Known gaps in the upstream data, inherited from ecosyste.ms:
//! - some repository hostnames are not indexed at all;
//! - several package ecosystems report no download statistics (julia has a
//!   dedicated fallback API, the rest are logged and counted as zero);
//! - non-GitHub hosts carry no commit statistics, so no DDS;
//! - PyPI download counts cover the last month only, not all time.

pub mod docs_probe;
pub mod ecosystems;
pub mod provider;

pub use self::provider::{EnrichSummary, Provider};

use self::ecosystems::PackageRecord;
use crate::candidate::SourceTag;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const LOG_TARGET: &str = "     stats";

/// One row of the stats table: a filtered candidate plus repository and
/// package metrics. Only candidates with retrievable repository data are
/// emitted as rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolStats {
    pub url: String,
    pub name: String,
    pub category: Option<String>,
    pub source: SourceTag,
    pub owner: Option<String>,
    pub archived: Option<bool>,
    pub language: Option<String>,
    pub license: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub stars: Option<u64>,
    pub forks: Option<u64>,
    pub contributors: Option<u64>,
    pub dds: Option<f64>,
    pub dependent_repos_count: u64,
    pub last_month_downloads: u64,
    pub latest_release: Option<DateTime<Utc>>,
    pub docs_url: Option<String>,
}

impl ToolStats {
    /// Whether any repository-level metric was retrievable. Rows failing
    /// this are dropped rather than emitted with empty repository fields.
    #[must_use]
    pub const fn has_repo_data(&self) -> bool {
        self.created_at.is_some() || self.stars.is_some() || self.forks.is_some()
    }
}

/// Package metrics aggregated across all ecosystems a tool is published in.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PackageMetrics {
    pub last_month_downloads: u64,
    pub dependent_repos_count: u64,
    pub latest_release: Option<DateTime<Utc>>,
    /// Julia package names whose downloads must come from the dedicated
    /// stats API (ecosyste.ms reports null for them).
    pub julia_packages: Vec<String>,
}

/// Fold the package records of one tool into a single set of metrics.
///
/// Download counts are summed over ecosystems reporting a last-month figure;
/// the dependent-repository count and the latest release date take the
/// maximum across ecosystems.
#[must_use]
pub fn aggregate_packages(packages: &[PackageRecord]) -> PackageMetrics {
    let mut metrics = PackageMetrics::default();

    for package in packages {
        if package.ecosystem == "julia" {
            metrics.julia_packages.push(package.name.clone());
        } else if let Some(downloads) = package.downloads
            && package.downloads_period.as_deref() == Some("last-month")
        {
            metrics.last_month_downloads += downloads;
        } else {
            log::warn!(
                target: LOG_TARGET,
                "Found null package downloads for '{}' from {}",
                package.name,
                package.ecosystem
            );
        }

        if let Some(count) = package.dependent_repos_count
            && count > metrics.dependent_repos_count
        {
            metrics.dependent_repos_count = count;
        }

        if let Some(release) = package.latest_release_published_at
            && metrics.latest_release.is_none_or(|latest| release > latest)
        {
            metrics.latest_release = Some(release);
        }
    }

    metrics
}

#[cfg(test)]
mod tests {
    use super::*;

    fn package(ecosystem: &str, downloads: Option<u64>, period: Option<&str>, dependents: Option<u64>, release: Option<&str>) -> PackageRecord {
        PackageRecord {
            ecosystem: ecosystem.to_string(),
            name: format!("pkg-{ecosystem}"),
            downloads,
            downloads_period: period.map(String::from),
            latest_release_published_at: release.map(|r| r.parse().unwrap()),
            dependent_repos_count: dependents,
        }
    }

    #[test]
    fn sums_last_month_downloads() {
        let metrics = aggregate_packages(&[
            package("pypi", Some(1000), Some("last-month"), None, None),
            package("cargo", Some(250), Some("last-month"), None, None),
        ]);
        assert_eq!(metrics.last_month_downloads, 1250);
    }

    #[test]
    fn ignores_non_monthly_and_null_downloads() {
        let metrics = aggregate_packages(&[
            package("pypi", Some(1000), Some("total"), None, None),
            package("conda", None, None, None, None),
        ]);
        assert_eq!(metrics.last_month_downloads, 0);
    }

    #[test]
    fn julia_packages_are_deferred_to_fallback_api() {
        let metrics = aggregate_packages(&[package("julia", None, None, None, None)]);
        assert_eq!(metrics.julia_packages, vec!["pkg-julia"]);
        assert_eq!(metrics.last_month_downloads, 0);
    }

    #[test]
    fn dependents_take_the_maximum() {
        let metrics = aggregate_packages(&[
            package("pypi", None, None, Some(10), None),
            package("conda", None, None, Some(40), None),
            package("cargo", None, None, None, None),
        ]);
        assert_eq!(metrics.dependent_repos_count, 40);
    }

    #[test]
    fn latest_release_takes_the_newest() {
        let metrics = aggregate_packages(&[
            package("pypi", None, None, None, Some("2024-05-01T00:00:00Z")),
            package("conda", None, None, None, Some("2025-01-15T00:00:00Z")),
        ]);
        assert_eq!(metrics.latest_release.unwrap().to_rfc3339(), "2025-01-15T00:00:00+00:00");
    }

    #[test]
    fn empty_packages_give_default_metrics() {
        assert_eq!(aggregate_packages(&[]), PackageMetrics::default());
    }

    #[test]
    fn stats_rows_survive_the_table_format() {
        let path = std::env::temp_dir().join("esm_inventory_stats_table.csv");

        let rows = vec![ToolStats {
            url: "https://github.com/pypsa/pypsa".to_string(),
            name: "PyPSA".to_string(),
            category: Some("capacity-expansion".to_string()),
            source: SourceTag::GPst,
            owner: Some("PyPSA".to_string()),
            archived: Some(false),
            language: Some("Python".to_string()),
            license: Some("mit".to_string()),
            created_at: Some("2016-01-04T10:00:00Z".parse().unwrap()),
            updated_at: None,
            stars: Some(1200),
            forks: Some(400),
            contributors: Some(90),
            dds: Some(0.85),
            dependent_repos_count: 12,
            last_month_downloads: 54_321,
            latest_release: None,
            docs_url: Some("https://pypsa.readthedocs.io/en/latest/".to_string()),
        }];

        crate::tables::write_atomic(&path, &rows).unwrap();
        let loaded: Vec<ToolStats> = crate::tables::read(&path).unwrap();

        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].source, SourceTag::GPst);
        assert_eq!(loaded[0].stars, Some(1200));
        assert_eq!(loaded[0].created_at, rows[0].created_at);
        assert!(loaded[0].updated_at.is_none());

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn row_without_any_repo_metric_is_droppable() {
        let row = ToolStats {
            url: "https://github.com/x/y".to_string(),
            name: "y".to_string(),
            category: None,
            source: SourceTag::Manual,
            owner: None,
            archived: None,
            language: None,
            license: None,
            created_at: None,
            updated_at: None,
            stars: None,
            forks: None,
            contributors: None,
            dds: None,
            dependent_repos_count: 0,
            last_month_downloads: 0,
            latest_release: None,
            docs_url: None,
        };
        assert!(!row.has_repo_data());

        let with_stars = ToolStats {
            stars: Some(5),
            ..row
        };
        assert!(with_stars.has_repo_data());
    }
}
