//! `get-repo-users`: fetch every user interaction for the enriched tools.

use crate::commands::{Common, CommonArgs};
use camino::Utf8PathBuf;
use clap::Args;
use esm_inventory::repo_spec::RepoSpec;
use esm_inventory::stats::ToolStats;
use esm_inventory::users::interactions::Fetcher;
use esm_inventory::{Result, tables};

const LOG_TARGET: &str = "repo_users";

#[derive(Args, Debug)]
pub struct GetRepoUsersArgs {
    /// Input path of the stats table
    #[arg(value_name = "INFILE")]
    pub infile: Utf8PathBuf,

    /// Output path for the user interactions table
    #[arg(value_name = "OUTFILE")]
    pub outfile: Utf8PathBuf,

    /// GitHub personal access token
    #[arg(long, value_name = "TOKEN", env = "GITHUB_TOKEN")]
    pub github_token: Option<String>,

    #[command(flatten)]
    pub common: CommonArgs,
}

/// GitHub repositories listed in the stats table. Other hosts offer no
/// interaction API and are skipped with a diagnostic.
pub(crate) fn github_repos(stats: &[ToolStats]) -> Vec<RepoSpec> {
    let mut repos = Vec::with_capacity(stats.len());
    for row in stats {
        match RepoSpec::parse(&row.url) {
            Ok(spec) if spec.is_github() => repos.push(spec),
            Ok(_) => {
                log::warn!(target: LOG_TARGET, "Skipping user collection for '{}' as it is not a GitHub repo", row.url);
            }
            Err(e) => {
                log::warn!(target: LOG_TARGET, "Skipping unparseable repository URL '{}': {e:#}", row.url);
            }
        }
    }
    repos
}

pub async fn get_repo_users(args: &GetRepoUsersArgs) -> Result<()> {
    let common = Common::new(&args.common)?;

    let stats: Vec<ToolStats> = tables::read(args.infile.as_std_path())?;
    let repos = github_repos(&stats);

    let fetcher = Fetcher::new(args.github_token.as_deref(), common.progress.clone())?;
    let interactions = fetcher.fetch_all(&repos).await?;

    tables::write_atomic(args.outfile.as_std_path(), &interactions)?;
    println!(
        "Collected {} interactions across {} repositories into '{}'",
        interactions.len(),
        repos.len(),
        args.outfile
    );

    Ok(())
}
