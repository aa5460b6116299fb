use clap::Args;
use std::path::PathBuf;

use astrobadge_core::{derive_badge, MessageStyle, SignedReport};

#[derive(Debug, Args)]
pub struct BadgeArgs {
    /// Path to the report JSON
    #[arg(long)]
    report: PathBuf,
    /// Message style: letterGrade or percentage
    #[arg(long, default_value = "letterGrade")]
    style: MessageStyle,
}

pub fn run(args: BadgeArgs) -> anyhow::Result<()> {
    let report = SignedReport::from_document(super::read_json(&args.report)?)?;
    let badge = derive_badge(Some(&report), args.style);
    println!("{}", serde_json::to_string_pretty(&badge)?);
    Ok(())
}
