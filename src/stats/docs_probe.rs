//! Documentation site probing.
//!
//! When the statistics record carries no documentation link, a small fixed
//! set of well-known hosting patterns is probed and the first URL that
//! responds successfully is taken.

use crate::net::resilient;
use crate::repo_spec::RepoSpec;

const LOG_TARGET: &str = "docs_probe";

/// Well-known documentation URL patterns for a repository, in probe order.
#[must_use]
pub fn candidate_urls(spec: &RepoSpec) -> Vec<String> {
    let repo = spec.repo().to_lowercase();
    let mut urls = vec![format!("https://{repo}.readthedocs.io/en/latest/")];

    if spec.is_github() {
        urls.push(format!("https://{}.github.io/{}/", spec.owner().to_lowercase(), spec.repo()));
        urls.push(format!("https://github.com/{}/wiki", spec.full_name()));
    }

    urls
}

/// Probe the documentation patterns for `spec` and return the first URL that
/// answers with a success status. Probe failures are not errors; they just
/// mean no documentation site was found.
pub async fn probe(http: &reqwest::Client, spec: &RepoSpec) -> Option<String> {
    for url in candidate_urls(spec) {
        match resilient::head(http, &url).await {
            Ok(resp) if resp.status().is_success() => {
                log::debug!(target: LOG_TARGET, "Documentation found for '{spec}' at '{url}'");
                return Some(url);
            }
            Ok(resp) => {
                log::debug!(target: LOG_TARGET, "No documentation at '{url}' (HTTP {})", resp.status());
            }
            Err(e) => {
                log::debug!(target: LOG_TARGET, "Documentation probe failed for '{url}': {e:#}");
            }
        }
    }

    None
}
