//! GitHub users interacting with inventory repositories: interaction events,
//! profile details, organization aggregates, and affiliation classification.

pub mod classify;
pub mod details;
pub mod interactions;

use crate::Result;
use crate::net::{ApiResult, Client, RateLimitInfo, Throttler};
use chrono::{DateTime, Utc};
use core::time::Duration;
use ohno::EnrichableExt;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

pub const GITHUB_API: &str = "https://api.github.com";

const PAGE_SIZE: u8 = 100;

/// Never wait longer than this for a rate limit window, even if the reported
/// reset is further out.
const MAX_RATE_LIMIT_WAIT_SECS: i64 = 3600;

const LOG_TARGET: &str = "     users";

/// How a user interacted with a repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum InteractionKind {
    Stargazer,
    Fork,
    Issue,
    Pull,
}

/// One interaction event. The upstream API offers no "since last run"
/// cursor, so the interaction table is regenerated wholesale per repository
/// on every refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInteraction {
    pub repo: String,
    pub username: String,
    pub interaction: InteractionKind,
    pub timestamp: Option<DateTime<Utc>>,
}

/// Profile details for one user. Rows of this table are append-only:
/// existing entries are never rewritten on refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDetail {
    pub username: String,
    pub name: Option<String>,
    pub company: Option<String>,
    pub blog: Option<String>,
    pub location: Option<String>,
    pub email: Option<String>,
    pub bio: Option<String>,
    pub twitter_username: Option<String>,
    pub followers: u64,
    pub following: u64,
    /// Comma-joined sorted list of inventory repositories the user
    /// interacted with.
    pub repos: String,
    /// Comma-joined list of the user's public organization logins.
    pub orgs: String,
}

/// Organization-level aggregate derived from the user details table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    pub login: String,
    pub description: Option<String>,
    pub members: u64,
}

/// A user's affiliation label, recomputed in full each run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserClassification {
    pub username: String,
    pub label: String,
}

/// Map each username to the sorted set of repositories it interacted with.
#[must_use]
pub fn user_repo_map(interactions: &[UserInteraction]) -> BTreeMap<String, std::collections::BTreeSet<String>> {
    let mut map: BTreeMap<String, std::collections::BTreeSet<String>> = BTreeMap::new();
    for interaction in interactions {
        let _ = map
            .entry(interaction.username.clone())
            .or_default()
            .insert(interaction.repo.clone());
    }
    map
}

/// Rebuild the organizations table from the full details table.
///
/// Member counts come from the `orgs` column of every detail row;
/// descriptions come from this run's fetches, falling back to the previous
/// organizations table for users fetched in earlier runs.
#[must_use]
pub fn derive_organizations(
    details: &[UserDetail],
    fresh_descriptions: &BTreeMap<String, Option<String>>,
    previous: &[Organization],
) -> Vec<Organization> {
    let mut members: BTreeMap<&str, u64> = BTreeMap::new();
    for detail in details {
        for org in detail.orgs.split(',').map(str::trim).filter(|o| !o.is_empty()) {
            *members.entry(org).or_default() += 1;
        }
    }

    let previous_descriptions: BTreeMap<&str, &Option<String>> = previous.iter().map(|o| (o.login.as_str(), &o.description)).collect();

    members
        .into_iter()
        .map(|(login, members)| Organization {
            login: login.to_string(),
            description: fresh_descriptions
                .get(login)
                .cloned()
                .or_else(|| previous_descriptions.get(login).map(|d| (*d).clone()))
                .flatten(),
            members,
        })
        .collect()
}

/// Pause the shared throttler until a reported rate-limit reset, then wait
/// it out. Rate limits are a pause-and-resume condition, never an error.
pub(crate) async fn wait_for_reset(throttler: &Arc<Throttler>, info: RateLimitInfo) {
    let now = Utc::now();
    let wait_until = info.reset_at.min(now + chrono::Duration::seconds(MAX_RATE_LIMIT_WAIT_SECS));

    if wait_until > now {
        let wait = (wait_until - now).to_std().unwrap_or(Duration::ZERO);
        if throttler.pause_for(wait) {
            log::warn!(
                target: LOG_TARGET,
                "GitHub rate limit exceeded, waiting until {}",
                wait_until.with_timezone(&chrono::Local).format("%T")
            );
        }
        tokio::time::sleep(wait).await;
    }
}

/// Follow Link-header pagination exhaustively for a list endpoint.
///
/// Returns `Ok(None)` when the resource itself does not exist (404). Hitting
/// a rate limit pauses the whole batch and retries the same page.
pub(crate) async fn paged_get<T: DeserializeOwned>(
    client: &Client,
    throttler: &Arc<Throttler>,
    path: &str,
    accept: Option<&str>,
) -> Result<Option<Vec<T>>> {
    let mut items = Vec::new();
    let mut page = 1u32;

    loop {
        let sep = if path.contains('?') { '&' } else { '?' };
        let url = format!("{}{path}{sep}per_page={PAGE_SIZE}&page={page}", client.base_url());

        let result = match accept {
            Some(accept) => client.api_call_with_accept(&url, accept).await,
            None => client.api_call(&url).await,
        };

        match result {
            ApiResult::Success(resp, _) => {
                let has_next = resp
                    .headers()
                    .get(reqwest::header::LINK)
                    .and_then(|h| h.to_str().ok())
                    .is_some_and(|link| link.contains(r#"rel="next""#));

                let mut batch: Vec<T> = resp
                    .json()
                    .await
                    .map_err(|e| ohno::AppError::from(e).enrich_with(|| format!("unable to parse page {page} of '{path}'")))?;

                let empty = batch.is_empty();
                items.append(&mut batch);

                if !has_next || empty {
                    return Ok(Some(items));
                }
                page += 1;
            }
            ApiResult::RateLimited(info) => {
                wait_for_reset(throttler, info).await;
            }
            ApiResult::NotFound(_) => return Ok(None),
            ApiResult::Failed(e, _) => {
                return Err(e.enrich_with(|| format!("fetching page {page} of '{path}'")));
            }
        }
    }
}
