//! `get-user-details`: resolve new user identifiers to profile details.
//!
//! The details table only ever grows: identifiers already present are never
//! re-queried or rewritten, so the stage can be re-run safely after partial
//! progress.

use crate::commands::get_repo_users::github_repos;
use crate::commands::{Common, CommonArgs};
use camino::Utf8PathBuf;
use clap::Args;
use esm_inventory::stats::ToolStats;
use esm_inventory::users::details::Fetcher;
use esm_inventory::users::{self, Organization, UserDetail, UserInteraction, interactions};
use esm_inventory::{Result, tables};
use ohno::bail;

const LOG_TARGET: &str = "user_dtls";

#[derive(Args, Debug)]
pub struct GetUserDetailsArgs {
    /// Input path of the user interactions table
    #[arg(value_name = "INFILE")]
    pub infile: Utf8PathBuf,

    /// Output path for the user details table (extended, never rewritten)
    #[arg(value_name = "OUTFILE")]
    pub outfile: Utf8PathBuf,

    /// Output path for the derived organizations table
    #[arg(long, value_name = "PATH", default_value = "organizations.csv")]
    pub orgs: Utf8PathBuf,

    /// Stats table used to build the interactions table first when INFILE
    /// does not exist yet
    #[arg(long, value_name = "PATH")]
    pub stats: Option<Utf8PathBuf>,

    /// GitHub personal access token
    #[arg(long, value_name = "TOKEN", env = "GITHUB_TOKEN")]
    pub github_token: Option<String>,

    #[command(flatten)]
    pub common: CommonArgs,
}

pub async fn get_user_details(args: &GetUserDetailsArgs) -> Result<()> {
    let common = Common::new(&args.common)?;

    let interactions = match tables::read_optional(args.infile.as_std_path())? {
        Some(rows) => rows,
        None => fetch_interactions_first(args, &common).await?,
    };

    let existing: Vec<UserDetail> = tables::read_optional(args.outfile.as_std_path())?.unwrap_or_default();

    let fetcher = Fetcher::new(args.github_token.as_deref(), common.progress.clone())?;
    let fetched = fetcher.fetch_missing(&interactions, &existing).await?;

    let appended = fetched.new_details.len();
    let mut all_details = existing;
    all_details.extend(fetched.new_details);

    if appended > 0 {
        tables::write_atomic(args.outfile.as_std_path(), &all_details)?;
    }

    let previous_orgs: Vec<Organization> = tables::read_optional(args.orgs.as_std_path())?.unwrap_or_default();
    let organizations = users::derive_organizations(&all_details, &fetched.org_descriptions, &previous_orgs);
    tables::write_atomic(args.orgs.as_std_path(), &organizations)?;

    println!(
        "Appended {appended} new users to '{}' ({} known, {} failed); {} organizations in '{}'",
        args.outfile,
        all_details.len(),
        fetched.failed,
        organizations.len(),
        args.orgs
    );

    Ok(())
}

/// The interactions table is a declared input of this stage; when it does
/// not exist yet, run the interaction fetch first.
async fn fetch_interactions_first(args: &GetUserDetailsArgs, common: &Common) -> Result<Vec<UserInteraction>> {
    let Some(stats_path) = &args.stats else {
        bail!(
            "interactions table '{}' does not exist; pass --stats <PATH> to build it from the stats table first",
            args.infile
        );
    };

    log::warn!(
        target: LOG_TARGET,
        "Interactions table '{}' missing, collecting it from '{stats_path}' first",
        args.infile
    );

    let stats: Vec<ToolStats> = tables::read(stats_path.as_std_path())?;
    let repos = github_repos(&stats);

    let fetcher = interactions::Fetcher::new(args.github_token.as_deref(), common.progress.clone())?;
    let interactions = fetcher.fetch_all(&repos).await?;

    tables::write_atomic(args.infile.as_std_path(), &interactions)?;
    Ok(interactions)
}
