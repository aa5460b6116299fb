use clap::Args;

use astrobadge_verifier::{encode_public_key, key_fingerprint};

#[derive(Debug, Args)]
pub struct PubkeyArgs {
    /// Signing key seed (32-byte hex). Also supports env ASTROBADGE_SIGNER_KEY.
    #[arg(long)]
    key: Option<String>,
}

pub fn run(args: PubkeyArgs) -> anyhow::Result<()> {
    let key = super::signing_key(args.key)?.verifying_key();
    println!("publicKey: {}", encode_public_key(&key));
    println!("hex: 0x{}", hex::encode(key.as_bytes()));
    println!("fingerprint: {}", key_fingerprint(&key));
    Ok(())
}
