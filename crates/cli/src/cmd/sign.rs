use clap::Args;
use std::path::PathBuf;

use astrobadge_core::SignedReport;
use astrobadge_verifier::sign_report;

#[derive(Debug, Args)]
pub struct SignArgs {
    /// Path to the unsigned report JSON
    #[arg(long)]
    report: PathBuf,
    /// Signing key seed (32-byte hex). Also supports env ASTROBADGE_SIGNER_KEY.
    #[arg(long)]
    key: Option<String>,
    /// Output file path (defaults to stdout)
    #[arg(long)]
    out: Option<PathBuf>,
}

pub fn run(args: SignArgs) -> anyhow::Result<()> {
    let document = super::read_json(&args.report)?;
    let signing_key = super::signing_key(args.key)?;
    let signed = sign_document(document, &signing_key)?;
    super::write_output(args.out.as_deref(), &serde_json::to_string_pretty(&signed)?)
}

/// Sign `document`, refusing documents the server could not decode.
pub fn sign_document(
    document: serde_json::Value,
    signing_key: &ed25519_dalek::SigningKey,
) -> anyhow::Result<serde_json::Value> {
    SignedReport::from_document(document.clone())?;
    sign_report(document, signing_key)
}
