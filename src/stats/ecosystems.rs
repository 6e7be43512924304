//! Typed client for the ecosyste.ms repository and package lookup APIs.
//!
//! Repository lookups go through a persistent URL-mapping cache (including
//! negative results) so that re-running the enrichment stage does not replay
//! lookups for tools whose hosting situation has not changed. Full
//! repository records are cached as TTL'd JSON documents.

use crate::candidate::name_key;
use crate::net::{Throttler, resilient};
use crate::{Result, cache_doc};
use chrono::{DateTime, Utc};
use core::time::Duration;
use ohno::IntoAppError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

const REPO_LOOKUP_API: &str = "https://repos.ecosyste.ms/api/v1/repositories/lookup?url=";
const PACKAGES_LOOKUP_API: &str = "https://packages.ecosyste.ms/api/v1/packages/lookup?repository_url=";

/// Sentinel stored in the lookup cache for URLs ecosyste.ms does not know.
const NOT_FOUND: &str = "not-found";

/// Upper bound on consecutive rate-limit pauses before giving up on a call.
const MAX_RATE_LIMIT_PAUSES: u32 = 10;

/// Fallback pause when a 429 response carries no `Retry-After` header.
const DEFAULT_PAUSE: Duration = Duration::from_secs(60);

const LOG_TARGET: &str = "ecosystems";

/// Repository record subset kept from the ecosyste.ms response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoRecord {
    pub full_name: Option<String>,
    pub owner: Option<String>,
    pub archived: Option<bool>,
    pub stargazers_count: Option<u64>,
    pub forks_count: Option<u64>,
    pub language: Option<String>,
    pub license: Option<String>,
    pub homepage: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub commit_stats: Option<CommitStats>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitStats {
    pub dds: Option<f64>,
    pub total_committers: Option<u64>,
}

/// Package record subset from the packages lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageRecord {
    pub ecosystem: String,
    pub name: String,
    pub downloads: Option<u64>,
    pub downloads_period: Option<String>,
    pub latest_release_published_at: Option<DateTime<Utc>>,
    pub dependent_repos_count: Option<u64>,
}

/// Cached repository record with its fetch timestamp; `record` is `None`
/// when ecosyste.ms had no data for the repository.
#[derive(Debug, Serialize, Deserialize)]
struct CachedRepo {
    fetched_at: DateTime<Utc>,
    record: Option<RepoRecord>,
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    repository_url: String,
}

#[derive(Debug)]
pub struct Client {
    http: reqwest::Client,
    throttler: Arc<Throttler>,
    cache_dir: PathBuf,
    record_ttl: Duration,
    lookup_cache_path: PathBuf,
    lookup_cache: Mutex<BTreeMap<String, String>>,
}

impl Client {
    pub fn new(cache_dir: impl AsRef<Path>, record_ttl: Duration, throttler: Arc<Throttler>) -> Result<Self> {
        let cache_dir = cache_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&cache_dir)
            .into_app_err_with(|| format!("unable to create cache directory '{}'", cache_dir.display()))?;

        let lookup_cache_path = cache_dir.join("lookup_cache.yaml");
        let lookup_cache = if lookup_cache_path.exists() {
            let text = std::fs::read_to_string(&lookup_cache_path)
                .into_app_err_with(|| format!("unable to read lookup cache '{}'", lookup_cache_path.display()))?;
            serde_yaml::from_str(&text)
                .into_app_err_with(|| format!("unable to parse lookup cache '{}'", lookup_cache_path.display()))?
        } else {
            BTreeMap::new()
        };

        let http = reqwest::Client::builder()
            .user_agent("esm-inventory")
            .build()
            .into_app_err("unable to create HTTP client")?;

        Ok(Self {
            http,
            throttler,
            cache_dir,
            record_ttl,
            lookup_cache_path,
            lookup_cache: Mutex::new(lookup_cache),
        })
    }

    /// Whether ecosyste.ms knows a repository at `url`.
    pub async fn repo_exists(&self, url: &str) -> Result<bool> {
        Ok(self.lookup_repo(url).await?.is_some())
    }

    /// Fetch the repository record for a source URL, going through the
    /// lookup mapping and the record cache. `None` means ecosyste.ms has no
    /// data for this URL.
    pub async fn repo_data(&self, url: &str) -> Result<Option<RepoRecord>> {
        let cache_path = self.record_cache_path(url);
        if let Some(cached) =
            cache_doc::load_with_ttl(&cache_path, self.record_ttl, |c: &CachedRepo| c.fetched_at, format!("repo record for {url}"))
        {
            let cached: CachedRepo = cached;
            return Ok(cached.record);
        }

        let record = match self.lookup_repo(url).await? {
            None => None,
            Some(api_url) => {
                log::info!(target: LOG_TARGET, "Querying ecosyste.ms repository record for '{url}'");
                let resp = self.limited_get(&api_url).await?;
                if resp.status() == reqwest::StatusCode::NOT_FOUND {
                    None
                } else {
                    let resp = resp
                        .error_for_status()
                        .into_app_err_with(|| format!("ecosyste.ms repository query failed for '{url}'"))?;
                    let record: RepoRecord = resp
                        .json()
                        .await
                        .into_app_err_with(|| format!("unable to parse ecosyste.ms repository record for '{url}'"))?;
                    Some(record)
                }
            }
        };

        let cached = CachedRepo {
            fetched_at: Utc::now(),
            record,
        };
        if let Err(e) = cache_doc::save(&cached, &cache_path) {
            log::warn!(target: LOG_TARGET, "Could not cache repository record for '{url}': {e:#}");
        }

        Ok(cached.record)
    }

    /// Fetch the package records linked to a source URL. `None` when the
    /// packages service has no entry.
    pub async fn package_data(&self, url: &str) -> Result<Option<Vec<PackageRecord>>> {
        let query_url = format!("{PACKAGES_LOOKUP_API}{}", encode(url));
        let resp = self.limited_get(&query_url).await?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let resp = resp
            .error_for_status()
            .into_app_err_with(|| format!("ecosyste.ms package query failed for '{url}'"))?;
        let packages: Vec<PackageRecord> = resp
            .json()
            .await
            .into_app_err_with(|| format!("unable to parse ecosyste.ms package records for '{url}'"))?;

        if packages.is_empty() { Ok(None) } else { Ok(Some(packages)) }
    }

    /// Resolve a source URL to its ecosyste.ms API URL, consulting and
    /// updating the persistent lookup cache. `None` means the repository is
    /// unknown to ecosyste.ms (also cached).
    async fn lookup_repo(&self, url: &str) -> Result<Option<String>> {
        if let Some(cached) = self.lookup_cache.lock().expect("lock not poisoned").get(url) {
            return Ok(if cached.as_str() == NOT_FOUND { None } else { Some(cached.clone()) });
        }

        log::info!(target: LOG_TARGET, "Looking up '{url}' on ecosyste.ms");
        let query_url = format!("{REPO_LOOKUP_API}{}", encode(url));
        let resp = self.limited_get(&query_url).await?;

        let entry = if resp.status() == reqwest::StatusCode::NOT_FOUND {
            NOT_FOUND.to_string()
        } else {
            let resp = resp
                .error_for_status()
                .into_app_err_with(|| format!("ecosyste.ms lookup failed for '{url}'"))?;
            let lookup: LookupResponse = resp
                .json()
                .await
                .into_app_err_with(|| format!("unable to parse ecosyste.ms lookup response for '{url}'"))?;
            lookup.repository_url
        };

        self.remember_lookup(url, &entry);
        Ok(if entry == NOT_FOUND { None } else { Some(entry) })
    }

    fn remember_lookup(&self, url: &str, entry: &str) {
        let serialized = {
            let mut cache = self.lookup_cache.lock().expect("lock not poisoned");
            let _ = cache.insert(url.to_string(), entry.to_string());
            serde_yaml::to_string(&*cache)
        };

        match serialized {
            Ok(text) => {
                if let Err(e) = std::fs::write(&self.lookup_cache_path, text) {
                    log::warn!(target: LOG_TARGET, "Could not persist lookup cache: {e}");
                }
            }
            Err(e) => log::warn!(target: LOG_TARGET, "Could not serialize lookup cache: {e}"),
        }
    }

    /// GET with rate-limit pausing: a 429 pauses the shared throttler until
    /// the reported reset so the whole batch backs off, then retries.
    async fn limited_get(&self, url: &str) -> Result<reqwest::Response> {
        let mut pauses = 0u32;
        loop {
            let resp = resilient::get(&self.http, url).await?;

            if resp.status() == reqwest::StatusCode::TOO_MANY_REQUESTS && pauses < MAX_RATE_LIMIT_PAUSES {
                let delay = resp
                    .headers()
                    .get(reqwest::header::RETRY_AFTER)
                    .and_then(|h| h.to_str().ok())
                    .and_then(|s| s.parse::<u64>().ok())
                    .map_or(DEFAULT_PAUSE, Duration::from_secs);

                pauses += 1;
                log::warn!(target: LOG_TARGET, "ecosyste.ms rate limit hit, pausing batch for {}s", delay.as_secs());
                let _ = self.throttler.pause_for(delay);
                tokio::time::sleep(delay).await;
                continue;
            }

            return Ok(resp);
        }
    }

    fn record_cache_path(&self, url: &str) -> PathBuf {
        self.cache_dir.join("repos").join(format!("{}.json", name_key(url)))
    }
}

/// Percent-encode a URL for use as a query parameter.
fn encode(url: &str) -> String {
    url::form_urlencoded::byte_serialize(url.as_bytes()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_url_query_characters() {
        assert_eq!(
            encode("https://github.com/a/b"),
            "https%3A%2F%2Fgithub.com%2Fa%2Fb"
        );
    }

    #[test]
    fn repo_record_parses_ecosystems_payload() {
        let json = r#"{
            "full_name": "PyPSA/pypsa",
            "owner": "PyPSA",
            "archived": false,
            "stargazers_count": 1200,
            "forks_count": 400,
            "language": "Python",
            "license": "mit",
            "homepage": "https://pypsa.org",
            "created_at": "2016-01-04T10:00:00.000Z",
            "updated_at": "2026-01-01T00:00:00.000Z",
            "commit_stats": {"dds": 0.85, "total_committers": 90},
            "an_ignored_field": 1
        }"#;

        let record: RepoRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.stargazers_count, Some(1200));
        assert_eq!(record.commit_stats.as_ref().unwrap().total_committers, Some(90));
        assert!((record.commit_stats.unwrap().dds.unwrap() - 0.85).abs() < f64::EPSILON);
    }

    #[test]
    fn repo_record_tolerates_missing_fields() {
        let record: RepoRecord = serde_json::from_str("{}").unwrap();
        assert!(record.created_at.is_none());
        assert!(record.commit_stats.is_none());
    }

    #[test]
    fn package_record_parses_null_downloads() {
        let json = r#"{
            "ecosystem": "conda",
            "name": "pypsa",
            "downloads": null,
            "downloads_period": null,
            "latest_release_published_at": "2025-11-02T12:00:00.000Z",
            "dependent_repos_count": 12
        }"#;

        let record: PackageRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.ecosystem, "conda");
        assert!(record.downloads.is_none());
        assert_eq!(record.dependent_repos_count, Some(12));
    }
}
