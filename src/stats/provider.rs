use crate::candidate::ToolCandidate;
use crate::net::Throttler;
use crate::progress::ProgressReporter;
use crate::repo_spec::RepoSpec;
use crate::stats::{ToolStats, aggregate_packages, docs_probe, ecosystems};
use crate::{Result, net::resilient};
use core::time::Duration;
use futures_util::future::join_all;
use ohno::IntoAppError;
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;

const JULIA_STATS_API: &str = "https://juliapkgstats.com/api/v1/monthly_downloads/";

const MAX_CONCURRENT_REQUESTS: usize = 5;

const LOG_TARGET: &str = "     stats";

/// Per-batch counters reported when the enrichment stage completes.
#[derive(Debug, Default, Clone, Copy)]
pub struct EnrichSummary {
    pub enriched: usize,
    pub dropped_no_data: usize,
    pub failed: usize,
}

#[derive(Debug, Deserialize)]
struct JuliaDownloads {
    total_requests: u64,
}

/// Gathers repository and package statistics for filtered candidates.
#[derive(Debug)]
pub struct Provider {
    ecosystems: ecosystems::Client,
    http: reqwest::Client,
    throttler: Arc<Throttler>,
    progress: ProgressReporter,
}

enum Outcome {
    Enriched(Box<ToolStats>),
    NoData(String),
    Failed(String),
}

impl Provider {
    pub fn new(cache_dir: impl AsRef<Path>, record_ttl: Duration, progress: ProgressReporter) -> Result<Self> {
        let throttler = Throttler::new(MAX_CONCURRENT_REQUESTS);

        Ok(Self {
            ecosystems: ecosystems::Client::new(cache_dir, record_ttl, Arc::clone(&throttler))?,
            http: reqwest::Client::builder()
                .user_agent("esm-inventory")
                .build()
                .into_app_err("unable to create HTTP client")?,
            throttler,
            progress,
        })
    }

    /// The ecosyste.ms client, shared with the manual list loader.
    #[must_use]
    pub const fn ecosystems(&self) -> &ecosystems::Client {
        &self.ecosystems
    }

    /// Enrich every candidate, dropping those without retrievable repository
    /// data. One candidate exhausting its retries does not abort the batch.
    pub async fn enrich(&self, tools: Vec<ToolCandidate>) -> Result<(Vec<ToolStats>, EnrichSummary)> {
        self.progress.set_prefix("Enriching");
        self.progress.enable_determinate_mode(tools.len() as u64);

        let outcomes = join_all(tools.into_iter().map(|tool| self.enrich_one(tool))).await;

        let mut summary = EnrichSummary::default();
        let mut rows = Vec::with_capacity(outcomes.len());

        for outcome in outcomes {
            match outcome {
                Outcome::Enriched(row) => {
                    summary.enriched += 1;
                    rows.push(*row);
                }
                Outcome::NoData(url) => {
                    summary.dropped_no_data += 1;
                    log::warn!(target: LOG_TARGET, "Could not find ecosyste.ms entry for '{url}'");
                }
                Outcome::Failed(url) => {
                    summary.failed += 1;
                    log::warn!(target: LOG_TARGET, "Giving up on '{url}' after exhausting retries");
                }
            }
        }

        self.progress.finish_and_clear();
        Ok((rows, summary))
    }

    async fn enrich_one(&self, tool: ToolCandidate) -> Outcome {
        let _permit = self.throttler.acquire().await;
        let url = tool.url.clone().unwrap_or_default();

        let outcome = match self.fetch_stats(&tool, &url).await {
            Ok(Some(row)) => Outcome::Enriched(Box::new(row)),
            Ok(None) => Outcome::NoData(url),
            Err(e) => {
                log::warn!(target: LOG_TARGET, "Enrichment failed for '{url}': {e:#}");
                Outcome::Failed(url)
            }
        };

        self.progress.inc();
        outcome
    }

    async fn fetch_stats(&self, tool: &ToolCandidate, url: &str) -> Result<Option<ToolStats>> {
        let Some(record) = self.ecosystems.repo_data(url).await? else {
            return Ok(None);
        };

        let (contributors, dds) = record
            .commit_stats
            .as_ref()
            .map_or((None, None), |c| (c.total_committers, c.dds));

        let mut row = ToolStats {
            url: url.to_string(),
            name: tool.name.clone(),
            category: tool.category.clone(),
            source: tool.source,
            owner: record.owner,
            archived: record.archived,
            language: record.language,
            license: record.license,
            created_at: record.created_at,
            updated_at: record.updated_at,
            stars: record.stargazers_count,
            forks: record.forks_count,
            contributors,
            dds,
            dependent_repos_count: 0,
            last_month_downloads: 0,
            latest_release: None,
            docs_url: None,
        };

        if !row.has_repo_data() {
            return Ok(None);
        }

        // Package metrics are best-effort; their absence never drops a row.
        match self.ecosystems.package_data(url).await {
            Ok(Some(packages)) => {
                let metrics = aggregate_packages(&packages);
                row.dependent_repos_count = metrics.dependent_repos_count;
                row.latest_release = metrics.latest_release;
                row.last_month_downloads = metrics.last_month_downloads;

                for package in &metrics.julia_packages {
                    row.last_month_downloads += self.julia_downloads(package).await;
                }
            }
            Ok(None) => {
                log::warn!(target: LOG_TARGET, "Could not find ecosyste.ms package entry for '{url}'");
            }
            Err(e) => {
                log::warn!(target: LOG_TARGET, "Package query failed for '{url}': {e:#}");
            }
        }

        row.docs_url = match record.homepage.filter(|h| !h.trim().is_empty()) {
            Some(homepage) => Some(homepage),
            None => match RepoSpec::parse(url) {
                Ok(spec) => docs_probe::probe(&self.http, &spec).await,
                Err(_) => None,
            },
        };

        Ok(Some(row))
    }

    /// Monthly download count for a julia package from the dedicated stats
    /// API; zero when the package is unknown there.
    async fn julia_downloads(&self, package: &str) -> u64 {
        let url = format!("{JULIA_STATS_API}{package}");

        let downloads = match resilient::get(&self.http, &url).await {
            Ok(resp) if resp.status().is_success() => resp.json::<JuliaDownloads>().await.map(|d| d.total_requests).ok(),
            _ => None,
        };

        downloads.unwrap_or_else(|| {
            log::warn!(target: LOG_TARGET, "Could not fetch julia download stats for '{package}'");
            0
        })
    }
}
