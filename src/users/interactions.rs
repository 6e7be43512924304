//! Fetches every user who interacted with a repository.
//!
//! The hosting API has no incremental query, so each repository's complete
//! interaction history is re-fetched every cycle and the output table fully
//! replaces the previous run's.

use crate::net::{Client, Throttler};
use crate::progress::ProgressReporter;
use crate::repo_spec::RepoSpec;
use crate::Result;
use crate::users::{GITHUB_API, InteractionKind, UserInteraction, paged_get};
use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use serde::Deserialize;
use std::sync::Arc;

const MAX_CONCURRENT_REPOS: usize = 4;

/// Media type that makes the stargazers endpoint include star timestamps.
const STAR_MEDIA_TYPE: &str = "application/vnd.github.star+json";

const LOG_TARGET: &str = "  interact";

#[derive(Debug, Deserialize)]
struct Account {
    login: String,
}

#[derive(Debug, Deserialize)]
struct Stargazer {
    starred_at: Option<DateTime<Utc>>,
    user: Option<Account>,
}

#[derive(Debug, Deserialize)]
struct ForkRepo {
    created_at: Option<DateTime<Utc>>,
    owner: Option<Account>,
}

/// The issues endpoint lists pull requests too; the marker field tells them
/// apart.
#[derive(Debug, Deserialize)]
struct IssueItem {
    created_at: DateTime<Utc>,
    user: Option<Account>,
    pull_request: Option<serde_json::Value>,
}

/// Fetches interaction events from the hosting API.
#[derive(Debug)]
pub struct Fetcher {
    client: Client,
    throttler: Arc<Throttler>,
    progress: ProgressReporter,
}

impl Fetcher {
    pub fn new(token: Option<&str>, progress: ProgressReporter) -> Result<Self> {
        Ok(Self {
            client: Client::new(token, GITHUB_API)?,
            throttler: Throttler::new(MAX_CONCURRENT_REPOS),
            progress,
        })
    }

    /// Fetch the complete interaction history for every repository.
    ///
    /// A repository that has disappeared upstream or keeps failing is
    /// skipped with a warning; it does not abort the batch.
    pub async fn fetch_all(&self, repos: &[RepoSpec]) -> Result<Vec<UserInteraction>> {
        self.progress.set_prefix("Users");
        self.progress.enable_determinate_mode(repos.len() as u64);

        let results = join_all(repos.iter().map(|spec| self.fetch_repo(spec))).await;

        self.progress.finish_and_clear();

        let mut interactions = Vec::new();
        let mut skipped = 0usize;
        for (spec, result) in repos.iter().zip(results) {
            match result {
                Ok(Some(mut batch)) => interactions.append(&mut batch),
                Ok(None) => skipped += 1,
                Err(e) => {
                    skipped += 1;
                    log::warn!(target: LOG_TARGET, "Giving up on '{spec}': {e:#}");
                }
            }
        }

        log::info!(
            target: LOG_TARGET,
            "Collected {} interactions across {} repositories ({skipped} skipped)",
            interactions.len(),
            repos.len()
        );
        Ok(interactions)
    }

    async fn fetch_repo(&self, spec: &RepoSpec) -> Result<Option<Vec<UserInteraction>>> {
        let _permit = self.throttler.acquire().await;
        let repo = spec.full_name();
        log::info!(target: LOG_TARGET, "Collecting users for '{repo}'");

        let stars_url = format!("/repos/{repo}/stargazers");
        let forks_url = format!("/repos/{repo}/forks");
        let issues_url = format!("/repos/{repo}/issues?state=all");
        let (stars, forks, issues) = tokio::join!(
            paged_get::<Stargazer>(&self.client, &self.throttler, &stars_url, Some(STAR_MEDIA_TYPE)),
            paged_get::<ForkRepo>(&self.client, &self.throttler, &forks_url, None),
            paged_get::<IssueItem>(&self.client, &self.throttler, &issues_url, None),
        );

        let (Some(stars), Some(forks), Some(issues)) = (stars?, forks?, issues?) else {
            log::warn!(target: LOG_TARGET, "Repository '{repo}' not found upstream, skipping");
            self.progress.inc();
            return Ok(None);
        };

        let mut interactions = Vec::with_capacity(stars.len() + forks.len() + issues.len());

        for star in stars {
            if let Some(user) = star.user {
                interactions.push(UserInteraction {
                    repo: repo.clone(),
                    username: user.login,
                    interaction: InteractionKind::Stargazer,
                    timestamp: star.starred_at,
                });
            }
        }

        for fork in forks {
            if let Some(owner) = fork.owner {
                interactions.push(UserInteraction {
                    repo: repo.clone(),
                    username: owner.login,
                    interaction: InteractionKind::Fork,
                    timestamp: fork.created_at,
                });
            }
        }

        for issue in issues {
            if let Some(user) = issue.user {
                interactions.push(UserInteraction {
                    repo: repo.clone(),
                    username: user.login,
                    interaction: if issue.pull_request.is_some() {
                        InteractionKind::Pull
                    } else {
                        InteractionKind::Issue
                    },
                    timestamp: Some(issue.created_at),
                });
            }
        }

        self.progress.inc();
        Ok(Some(interactions))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stargazer_parses_star_media_payload() {
        let json = r#"{"starred_at": "2024-06-01T12:00:00Z", "user": {"login": "alice"}}"#;
        let star: Stargazer = serde_json::from_str(json).unwrap();
        assert_eq!(star.user.unwrap().login, "alice");
        assert!(star.starred_at.is_some());
    }

    #[test]
    fn fork_parses_owner() {
        let json = r#"{"created_at": "2024-06-01T12:00:00Z", "owner": {"login": "bob"}}"#;
        let fork: ForkRepo = serde_json::from_str(json).unwrap();
        assert_eq!(fork.owner.unwrap().login, "bob");
    }

    #[test]
    fn issue_and_pull_are_distinguished_by_marker() {
        let issue: IssueItem =
            serde_json::from_str(r#"{"created_at": "2024-06-01T12:00:00Z", "user": {"login": "carol"}}"#).unwrap();
        assert!(issue.pull_request.is_none());

        let pull: IssueItem = serde_json::from_str(
            r#"{"created_at": "2024-06-01T12:00:00Z", "user": {"login": "dave"}, "pull_request": {"url": "https://api.github.com/repos/x/y/pulls/1"}}"#,
        )
        .unwrap();
        assert!(pull.pull_request.is_some());
    }

    #[test]
    fn deleted_account_rows_parse_with_null_user() {
        let issue: IssueItem = serde_json::from_str(r#"{"created_at": "2024-06-01T12:00:00Z", "user": null}"#).unwrap();
        assert!(issue.user.is_none());
    }
}
