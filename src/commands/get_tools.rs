//! `get-tools`: collate the latest tool list from every inventory.

use crate::commands::{Common, CommonArgs};
use camino::Utf8PathBuf;
use clap::Args;
use esm_inventory::candidate::ToolCandidate;
use esm_inventory::net::Throttler;
use esm_inventory::stats::ecosystems;
use esm_inventory::{Result, sources, tables};
use ohno::IntoAppError;
use std::collections::HashSet;

const LOG_TARGET: &str = " get_tools";

/// Concurrent ecosyste.ms lookups while validating the manual list.
const MANUAL_LOOKUP_CONCURRENCY: usize = 5;

#[derive(Args, Debug)]
pub struct GetToolsArgs {
    /// Output path for the collated tools table
    #[arg(value_name = "OUTFILE")]
    pub outfile: Utf8PathBuf,

    #[command(flatten)]
    pub common: CommonArgs,
}

pub async fn get_tools(args: &GetToolsArgs) -> Result<()> {
    let common = Common::new(&args.common)?;

    let http = reqwest::Client::builder()
        .user_agent("esm-inventory")
        .build()
        .into_app_err("unable to create HTTP client")?;

    common.progress.set_prefix("Collating");
    common.progress.enable_indeterminate_mode();

    let mut candidates: Vec<ToolCandidate> = Vec::new();
    for adapter in sources::remote_adapters() {
        common.progress.set_message(adapter.tag().to_string());
        let mut batch = adapter.fetch(&http).await?;
        candidates.append(&mut batch);
    }

    let manual_path = &common.config.manual_list;
    if manual_path.exists() {
        common.progress.set_message("manual list");
        let known_urls: HashSet<String> = candidates.iter().filter_map(ToolCandidate::url_key).collect();

        let ecosystems = ecosystems::Client::new(
            common.cache_dir.join("stats"),
            common.stats_cache_ttl(),
            Throttler::new(MANUAL_LOOKUP_CONCURRENCY),
        )?;

        let mut manual = sources::manual::load(manual_path, &known_urls, &ecosystems).await?;
        candidates.append(&mut manual);
    } else {
        log::warn!(target: LOG_TARGET, "Manual list '{}' not found, skipping", manual_path.display());
    }

    common.progress.finish_and_clear();

    tables::write_atomic(args.outfile.as_std_path(), &candidates)?;
    println!("Collated {} candidate tools into '{}'", candidates.len(), args.outfile);

    Ok(())
}
