//! Collates, deduplicates, and enriches an inventory of open-source energy
//! system modelling tools.
//!
//! # Overview
//!
//! `esm-inventory` merges several public tool inventories into one canonical
//! table, removes duplicates and manually excluded entries, attaches
//! repository and package statistics from ecosyste.ms, and classifies the
//! GitHub users who interact with each tool's repository. Each pipeline
//! stage is a subcommand reading and writing CSV tables:
//!
//! ```bash
//! esm-inventory get-tools tools.csv
//! esm-inventory filter-tools tools.csv filtered.csv
//! esm-inventory get-stats filtered.csv stats.csv
//! esm-inventory get-repo-users stats.csv user_interactions.csv
//! esm-inventory get-user-details user_interactions.csv user_details.csv
//! esm-inventory classify-users user_details.csv user_classifications.csv
//! ```
//!
//! Stages form a strict linear chain; each consumes the previous stage's
//! output table. Outputs are replaced wholesale per run, except the user
//! details table which only ever grows.
//!
//! # GitHub access
//!
//! The user stages talk to the GitHub REST API. Unauthenticated access is
//! rate limited to 60 requests/hour; export `GITHUB_TOKEN` (or pass
//! `--github-token`) to raise that to 5000. Hitting the limit pauses the
//! batch until the reported reset rather than failing it.
//!
//! # Configuration
//!
//! An optional `inventory.[toml|yml|yaml|json]` file controls source
//! priority, exclusion/manual list locations, cache TTL, and the user
//! classification rules; see `default_config.yml` for the defaults.

use clap::builder::Styles;
use clap::builder::styling::{AnsiColor, Effects};
use clap::{Parser, Subcommand};
use esm_inventory::Result;

mod commands;

use crate::commands::{
    ClassifyUsersArgs, FilterToolsArgs, GetRepoUsersArgs, GetStatsArgs, GetToolsArgs, GetUserDetailsArgs, classify_users,
    filter_tools, get_repo_users, get_stats, get_tools, get_user_details,
};

const CLAP_STYLES: Styles = Styles::styled()
    .header(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .usage(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .literal(AnsiColor::Cyan.on_default().effects(Effects::BOLD))
    .placeholder(AnsiColor::Cyan.on_default());

#[derive(Parser, Debug)]
#[command(name = "esm-inventory", version, about)]
#[command(styles = CLAP_STYLES)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Collate the latest tool list from every inventory
    GetTools(GetToolsArgs),
    /// Deduplicate the collated list and apply manual exclusions
    FilterTools(FilterToolsArgs),
    /// Enrich the filtered list with repository and package statistics
    GetStats(GetStatsArgs),
    /// Collect every user interaction for the enriched tools
    GetRepoUsers(GetRepoUsersArgs),
    /// Resolve newly seen users to profile details
    GetUserDetails(Box<GetUserDetailsArgs>),
    /// Assign affiliation labels to all known users
    ClassifyUsers(ClassifyUsersArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match &cli.command {
        Command::GetTools(args) => get_tools(args).await,
        Command::FilterTools(args) => filter_tools(args),
        Command::GetStats(args) => get_stats(args).await,
        Command::GetRepoUsers(args) => get_repo_users(args).await,
        Command::GetUserDetails(args) => get_user_details(args).await,
        Command::ClassifyUsers(args) => classify_users(args),
    }
}
