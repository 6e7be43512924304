//! Resolves user identifiers to profile details.
//!
//! Only identifiers not yet present in the persisted details table are
//! fetched, which makes the stage idempotent: re-running it with no new
//! interactions appends nothing and touches no existing row.

use crate::Result;
use crate::net::{ApiResult, Client, Throttler};
use crate::progress::ProgressReporter;
use crate::users::{GITHUB_API, UserDetail, UserInteraction, paged_get, user_repo_map, wait_for_reset};
use ohno::EnrichableExt;
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

const MAX_CONCURRENT_USERS: usize = 4;

const LOG_TARGET: &str = "   details";

#[derive(Debug, Deserialize)]
struct UserRecord {
    login: String,
    name: Option<String>,
    company: Option<String>,
    blog: Option<String>,
    location: Option<String>,
    email: Option<String>,
    bio: Option<String>,
    twitter_username: Option<String>,
    followers: Option<u64>,
    following: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct OrgRecord {
    login: String,
    description: Option<String>,
}

/// New rows plus the organization descriptions seen while fetching them.
#[derive(Debug, Default)]
pub struct FetchedDetails {
    pub new_details: Vec<UserDetail>,
    pub org_descriptions: BTreeMap<String, Option<String>>,
    pub failed: usize,
}

/// Fetches profile details from the hosting API.
#[derive(Debug)]
pub struct Fetcher {
    client: Client,
    throttler: Arc<Throttler>,
    progress: ProgressReporter,
}

/// The set of usernames present in interactions but absent from the
/// existing details table, sorted for deterministic fetch order.
#[must_use]
pub fn missing_usernames(interactions: &[UserInteraction], existing: &[UserDetail]) -> Vec<String> {
    let known: BTreeSet<&str> = existing.iter().map(|d| d.username.as_str()).collect();

    interactions
        .iter()
        .map(|i| i.username.as_str())
        .filter(|u| !known.contains(u))
        .map(String::from)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

impl Fetcher {
    pub fn new(token: Option<&str>, progress: ProgressReporter) -> Result<Self> {
        Ok(Self {
            client: Client::new(token, GITHUB_API)?,
            throttler: Throttler::new(MAX_CONCURRENT_USERS),
            progress,
        })
    }

    /// Fetch details for every username in `interactions` that `existing`
    /// does not already cover. Vanished accounts are skipped with a warning.
    pub async fn fetch_missing(&self, interactions: &[UserInteraction], existing: &[UserDetail]) -> Result<FetchedDetails> {
        let missing = missing_usernames(interactions, existing);
        if missing.is_empty() {
            log::info!(target: LOG_TARGET, "All {} known users already have details, nothing to fetch", existing.len());
            return Ok(FetchedDetails::default());
        }

        log::info!(target: LOG_TARGET, "Collecting details for {} new users", missing.len());
        let repo_map = user_repo_map(interactions);

        self.progress.set_prefix("Details");
        self.progress.enable_determinate_mode(missing.len() as u64);

        let mut fetched = FetchedDetails::default();
        for username in missing {
            let repos = repo_map.get(&username).map(|repos| {
                repos.iter().map(String::as_str).collect::<Vec<_>>().join(",")
            });

            match self.fetch_user(&username, repos.unwrap_or_default()).await {
                Ok(Some((detail, orgs))) => {
                    fetched.new_details.push(detail);
                    for org in orgs {
                        let _ = fetched.org_descriptions.insert(org.login, org.description);
                    }
                }
                Ok(None) => {
                    log::warn!(target: LOG_TARGET, "User '{username}' no longer exists upstream, skipping");
                }
                Err(e) => {
                    fetched.failed += 1;
                    log::warn!(target: LOG_TARGET, "Could not fetch details for '{username}': {e:#}");
                }
            }

            self.progress.inc();
        }

        self.progress.finish_and_clear();
        Ok(fetched)
    }

    async fn fetch_user(&self, username: &str, repos: String) -> Result<Option<(UserDetail, Vec<OrgRecord>)>> {
        let _permit = self.throttler.acquire().await;

        let Some(record) = self.user_record(username).await? else {
            return Ok(None);
        };

        let orgs = paged_get::<OrgRecord>(&self.client, &self.throttler, &format!("/users/{username}/orgs"), None)
            .await?
            .unwrap_or_default();

        let detail = UserDetail {
            username: record.login,
            name: record.name,
            company: record.company,
            blog: record.blog.filter(|b| !b.is_empty()),
            location: record.location,
            email: record.email,
            bio: record.bio,
            twitter_username: record.twitter_username,
            followers: record.followers.unwrap_or(0),
            following: record.following.unwrap_or(0),
            repos,
            orgs: orgs.iter().map(|o| o.login.as_str()).collect::<Vec<_>>().join(","),
        };

        Ok(Some((detail, orgs)))
    }

    async fn user_record(&self, username: &str) -> Result<Option<UserRecord>> {
        let url = format!("{}/users/{username}", self.client.base_url());

        loop {
            match self.client.api_call(&url).await {
                ApiResult::Success(resp, _) => {
                    let record = resp
                        .json()
                        .await
                        .map_err(|e| ohno::AppError::from(e).enrich(format!("unable to parse user record for '{username}'")))?;
                    return Ok(Some(record));
                }
                ApiResult::RateLimited(info) => wait_for_reset(&self.throttler, info).await,
                ApiResult::NotFound(_) => return Ok(None),
                ApiResult::Failed(e, _) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::users::InteractionKind;

    fn interaction(username: &str) -> UserInteraction {
        UserInteraction {
            repo: "x/tool".to_string(),
            username: username.to_string(),
            interaction: InteractionKind::Stargazer,
            timestamp: None,
        }
    }

    fn known(username: &str) -> UserDetail {
        UserDetail {
            username: username.to_string(),
            name: None,
            company: None,
            blog: None,
            location: None,
            email: None,
            bio: None,
            twitter_username: None,
            followers: 0,
            following: 0,
            repos: String::new(),
            orgs: String::new(),
        }
    }

    #[test]
    fn only_unknown_users_are_fetched() {
        let interactions = vec![interaction("alice"), interaction("bob"), interaction("alice")];
        let existing = vec![known("alice")];

        assert_eq!(missing_usernames(&interactions, &existing), vec!["bob"]);
    }

    #[test]
    fn no_new_interactions_means_nothing_to_fetch() {
        let interactions = vec![interaction("alice")];
        let existing = vec![known("alice")];

        assert!(missing_usernames(&interactions, &existing).is_empty());
    }

    #[test]
    fn missing_usernames_are_sorted_and_unique() {
        let interactions = vec![interaction("zoe"), interaction("bob"), interaction("zoe"), interaction("amy")];

        assert_eq!(missing_usernames(&interactions, &[]), vec!["amy", "bob", "zoe"]);
    }

    #[test]
    fn user_record_parses_profile_payload() {
        let json = r#"{
            "login": "alice",
            "name": "Alice Doe",
            "company": "@open-energy-transition",
            "blog": "",
            "location": "Berlin",
            "email": null,
            "bio": "Energy modeller",
            "twitter_username": null,
            "followers": 10,
            "following": 3
        }"#;

        let record: UserRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.login, "alice");
        assert_eq!(record.company.as_deref(), Some("@open-energy-transition"));
        assert_eq!(record.followers, Some(10));
    }

    #[test]
    fn org_record_parses() {
        let json = r#"{"login": "openmod", "description": "Open energy modelling initiative"}"#;
        let org: OrgRecord = serde_json::from_str(json).unwrap();
        assert_eq!(org.login, "openmod");
    }
}
