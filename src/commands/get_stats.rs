//! `get-stats`: enrich the filtered table with ecosyste.ms statistics.

use crate::commands::{Common, CommonArgs};
use camino::Utf8PathBuf;
use clap::Args;
use esm_inventory::candidate::ToolCandidate;
use esm_inventory::stats::Provider;
use esm_inventory::{Result, tables};

#[derive(Args, Debug)]
pub struct GetStatsArgs {
    /// Input path of the filtered tools table
    #[arg(value_name = "INFILE")]
    pub infile: Utf8PathBuf,

    /// Output path for the stats table
    #[arg(value_name = "OUTFILE")]
    pub outfile: Utf8PathBuf,

    #[command(flatten)]
    pub common: CommonArgs,
}

pub async fn get_stats(args: &GetStatsArgs) -> Result<()> {
    let common = Common::new(&args.common)?;

    let tools: Vec<ToolCandidate> = tables::read(args.infile.as_std_path())?;

    let provider = Provider::new(common.cache_dir.join("stats"), common.stats_cache_ttl(), common.progress.clone())?;

    let (rows, summary) = provider.enrich(tools).await?;

    tables::write_atomic(args.outfile.as_std_path(), &rows)?;
    println!(
        "Enriched {} tools into '{}' ({} dropped for lack of data, {} failed)",
        summary.enriched, args.outfile, summary.dropped_no_data, summary.failed
    );

    Ok(())
}
