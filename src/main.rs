use anyhow::Result;
use clap::{Parser, Subcommand};

#[cfg(test)]
mod testutil;

mod filespec;
mod fingerprint;
mod matcher;
mod model;
mod normalize;
mod score;
mod similarity;
mod store;
mod sync;

#[derive(Debug, Parser)]
/// Utilities for reconciling transactions against receipt documents and
/// merging spreadsheet edits back into the transaction store.
struct Command {
    #[command(subcommand)]
    subcmd: SubCommand,
}

#[derive(Debug, Subcommand)]
enum SubCommand {
    #[command(name = "auto-match")]
    /// Pairs unreconciled transactions with documents where the match is
    /// confident enough to commit without review.
    AutoMatch(matcher::cmd::AutoMatchCmd),
    #[command(name = "candidates")]
    /// Lists potential document matches per transaction for manual review,
    /// without committing anything.
    Candidates(matcher::cmd::CandidatesCmd),
    #[command(name = "match")]
    /// Manually links one transaction to one document.
    Match(matcher::cmd::MatchCmd),
    #[command(name = "unmatch")]
    /// Clears a transaction's document pairing.
    Unmatch(matcher::cmd::UnmatchCmd),
    #[command(name = "pull-sync")]
    /// Merges edited spreadsheet rows into the transaction store and writes
    /// sync stamps back to the sheet.
    PullSync(sync::cmd::PullSyncCmd),
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cmd = Command::parse();
    use SubCommand::*;
    match cmd.subcmd {
        AutoMatch(cmd) => cmd.run(),
        Candidates(cmd) => cmd.run(),
        Match(cmd) => cmd.run(),
        Unmatch(cmd) => cmd.run(),
        PullSync(cmd) => cmd.run(),
    }
}
