use anyhow::Context;
use clap::Args;
use std::path::PathBuf;

use astrobadge_core::SignedReport;
use astrobadge_verifier::{
    factor_summary, signer_fingerprint, Ed25519ReportVerifier, ReportVerifier, TrustedKeys,
};

#[derive(Debug, Args)]
pub struct VerifyArgs {
    /// Path to the signed report JSON
    #[arg(long)]
    report: PathBuf,
    /// Trusted signer public key (base64 or 0x hex). Repeatable.
    #[arg(long = "trusted-key", required = true)]
    trusted_keys: Vec<String>,
}

pub fn run(args: VerifyArgs) -> anyhow::Result<()> {
    let report = SignedReport::from_document(super::read_json(&args.report)?)?;
    check(&report, &args.trusted_keys)?;

    println!("repository: {}", report.identity());
    println!(
        "signer: {}",
        signer_fingerprint(&report).unwrap_or_else(|| "-".to_string())
    );
    for (factor, value) in factor_summary(&report) {
        println!("{}: {}", factor, value);
    }
    println!("OK");
    Ok(())
}

fn check(report: &SignedReport, trusted_keys: &[String]) -> anyhow::Result<()> {
    let trusted = TrustedKeys::parse(trusted_keys).context("Invalid --trusted-key")?;
    Ed25519ReportVerifier::new(trusted).check(report)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use astrobadge_verifier::{encode_public_key, sign_report};
    use ed25519_dalek::SigningKey;
    use serde_json::json;

    fn signed(key: &SigningKey) -> SignedReport {
        let doc = sign_report(
            json!({
                "repositoryOwner": "o",
                "repositoryName": "n",
                "factors": { "overall": { "trustPercent": 0.3 } }
            }),
            key,
        )
        .unwrap();
        SignedReport::from_document(doc).unwrap()
    }

    #[test]
    fn test_check_accepts_trusted_signer() {
        let key = SigningKey::from_bytes(&[0x01; 32]);
        let trusted = vec![encode_public_key(&key.verifying_key())];
        check(&signed(&key), &trusted).unwrap();
    }

    #[test]
    fn test_check_rejects_other_signer() {
        let key = SigningKey::from_bytes(&[0x01; 32]);
        let other = SigningKey::from_bytes(&[0x02; 32]);
        let trusted = vec![encode_public_key(&other.verifying_key())];
        let err = check(&signed(&key), &trusted).unwrap_err();
        assert!(err.to_string().contains("not trusted"));
    }
}
