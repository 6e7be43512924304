//! `filter-tools`: deduplicate the collated list and apply exclusions.

use crate::commands::{Common, CommonArgs};
use camino::Utf8PathBuf;
use clap::Args;
use esm_inventory::candidate::{SourceTag, ToolCandidate};
use esm_inventory::merge::{self, ExclusionRule};
use esm_inventory::{Result, tables};

const LOG_TARGET: &str = "    filter";

#[derive(Args, Debug)]
pub struct FilterToolsArgs {
    /// Input path of the collated tools table
    #[arg(value_name = "INFILE")]
    pub infile: Utf8PathBuf,

    /// Output path for the filtered table
    #[arg(value_name = "OUTFILE")]
    pub outfile: Utf8PathBuf,

    /// Drop all entries from an inventory before filtering (repeatable)
    #[arg(long = "ignore-source", value_name = "SOURCE")]
    pub ignore_source: Vec<SourceTag>,

    #[command(flatten)]
    pub common: CommonArgs,
}

pub fn filter_tools(args: &FilterToolsArgs) -> Result<()> {
    let common = Common::new(&args.common)?;

    let mut candidates: Vec<ToolCandidate> = tables::read(args.infile.as_std_path())?;

    if !args.ignore_source.is_empty() {
        let before = candidates.len();
        candidates.retain(|c| !args.ignore_source.contains(&c.source));
        log::info!(target: LOG_TARGET, "Ignored {} entries from excluded sources", before - candidates.len());
    }

    let exclusions: Vec<ExclusionRule> = match tables::read_optional(&common.config.exclusions)? {
        Some(rules) => rules,
        None => {
            log::info!(
                target: LOG_TARGET,
                "No exclusions file at '{}', keeping all entries",
                common.config.exclusions.display()
            );
            Vec::new()
        }
    };

    let (mut kept, summary) = merge::merge(candidates, &common.config.source_priority, &exclusions)?;

    if let Some(mappings_path) = &common.config.category_mappings {
        let mappings = tables::read(mappings_path)?;
        merge::apply_category_mappings(&mut kept, &mappings);
    }

    kept.sort_by_key(ToolCandidate::name_key);

    tables::write_atomic(args.outfile.as_std_path(), &kept)?;
    println!(
        "Filtered {} tools into '{}' ({} duplicates, {} without git URL, {} excluded)",
        kept.len(),
        args.outfile,
        summary.duplicates,
        summary.no_git_url,
        summary.excluded
    );

    Ok(())
}
