use anyhow::Result;
use clap::{Parser, Subcommand};

mod cmd;

#[derive(Debug, Parser)]
#[command(name = "astrobadge")]
#[command(about = "Astrobadge operator CLI")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the public key of a signing key, in trusted-key form.
    Pubkey(cmd::keys::PubkeyArgs),
    /// Sign an astrobadge.report.v1 document.
    Sign(cmd::sign::SignArgs),
    /// Verify a signed report against trusted keys.
    Verify(cmd::verify::VerifyArgs),
    /// Print the badge a report would produce.
    Badge(cmd::badge::BadgeArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Pubkey(args) => cmd::keys::run(args)?,
        Command::Sign(args) => cmd::sign::run(args)?,
        Command::Verify(args) => cmd::verify::run(args)?,
        Command::Badge(args) => cmd::badge::run(args)?,
    }

    Ok(())
}
