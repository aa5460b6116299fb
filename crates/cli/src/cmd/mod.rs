pub mod badge;
pub mod keys;
pub mod sign;
pub mod verify;

use anyhow::Context;
use ed25519_dalek::SigningKey;
use std::path::Path;

const SIGNER_KEY_ENV: &str = "ASTROBADGE_SIGNER_KEY";

fn read_json(path: &Path) -> anyhow::Result<serde_json::Value> {
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_slice(&bytes).with_context(|| format!("Invalid JSON in {}", path.display()))
}

fn signing_key(arg: Option<String>) -> anyhow::Result<SigningKey> {
    let key = arg
        .or_else(|| std::env::var(SIGNER_KEY_ENV).ok())
        .context("missing --key and env ASTROBADGE_SIGNER_KEY")?;
    astrobadge_verifier::parse_signing_key(&key)
}

fn write_output(out: Option<&Path>, text: &str) -> anyhow::Result<()> {
    match out {
        Some(path) => std::fs::write(path, text)
            .with_context(|| format!("Failed to write {}", path.display())),
        None => {
            println!("{}", text);
            Ok(())
        }
    }
}
