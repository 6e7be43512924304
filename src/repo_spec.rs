use crate::Result;
use core::fmt::{Display, Formatter};
use ohno::bail;
use url::Url;

/// A source-code repository reference parsed from an inventory URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepoSpec {
    url: Url,
    host: Box<str>,
    owner: Box<str>,
    repo: Box<str>,
}

impl RepoSpec {
    pub fn parse(url: &str) -> Result<Self> {
        let url = Url::parse(url)?;

        let Some(host) = url.host_str() else {
            bail!("repository URL has no host: {url}");
        };

        let path_segments: Vec<_> = url.path_segments().map(Iterator::collect).unwrap_or_default();

        if path_segments.len() < 2 {
            bail!("invalid repository URL format: {url}");
        }

        if path_segments[0].is_empty() || path_segments[1].is_empty() {
            bail!("invalid repository URL: empty owner or repo name: {url}");
        }

        Ok(Self {
            host: Box::from(host.to_ascii_lowercase()),
            owner: Box::from(path_segments[0]),
            repo: Box::from(path_segments[1].trim_end_matches(".git")),
            url,
        })
    }

    #[must_use]
    pub const fn url(&self) -> &Url {
        &self.url
    }

    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    #[must_use]
    pub fn owner(&self) -> &str {
        &self.owner
    }

    #[must_use]
    pub fn repo(&self) -> &str {
        &self.repo
    }

    /// `owner/name`, the form used in interaction tables and API paths.
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }

    #[must_use]
    pub fn is_github(&self) -> bool {
        self.host.ends_with("github.com")
    }
}

impl Display for RepoSpec {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.url)
    }
}

/// Whether a URL points at a recognized git hosting service. Entries that
/// fail this check carry no fetchable source code and are filtered out.
#[must_use]
pub fn is_git_host(url: &str) -> bool {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_lowercase))
        .is_some_and(|host| host.contains("git") || host.contains("bitbucket"))
}
