//! `classify-users`: assign affiliation labels to every known user.

use crate::commands::{Common, CommonArgs};
use camino::Utf8PathBuf;
use clap::Args;
use esm_inventory::users::UserDetail;
use esm_inventory::users::classify::Classifier;
use esm_inventory::{Result, tables};

#[derive(Args, Debug)]
pub struct ClassifyUsersArgs {
    /// Input path of the user details table
    #[arg(value_name = "INFILE")]
    pub infile: Utf8PathBuf,

    /// Output path for the classifications table
    #[arg(value_name = "OUTFILE")]
    pub outfile: Utf8PathBuf,

    #[command(flatten)]
    pub common: CommonArgs,
}

pub fn classify_users(args: &ClassifyUsersArgs) -> Result<()> {
    let common = Common::new(&args.common)?;

    let details: Vec<UserDetail> = tables::read(args.infile.as_std_path())?;

    let classifier = Classifier::new(&common.config.classifier_rules)?;
    let classifications = classifier.classify_all(&details);

    tables::write_atomic(args.outfile.as_std_path(), &classifications)?;
    println!("Classified {} users into '{}'", classifications.len(), args.outfile);

    Ok(())
}
