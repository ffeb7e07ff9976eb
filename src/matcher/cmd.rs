use anyhow::Result;
use clap::Args;

use crate::filespec::FileSpec;
use crate::matcher;
use crate::store::MemoryStore;

#[derive(Debug, Args)]
pub struct AutoMatchCmd {
    /// The store file to read and update. "-" reads stdin and writes stdout.
    #[arg(short = 's', long = "store")]
    store: FileSpec,
    /// Owner whose records to match.
    #[arg(long = "owner")]
    owner: String,
}

impl AutoMatchCmd {
    pub fn run(&self) -> Result<()> {
        let mut store = MemoryStore::load(&self.store)?;
        let summary = matcher::auto_match(&mut store, &self.owner)?;
        store.save(&self.store)?;
        println!("{}", serde_json::to_string_pretty(&summary)?);
        Ok(())
    }
}

#[derive(Debug, Args)]
pub struct CandidatesCmd {
    /// The store file to read.
    #[arg(short = 's', long = "store")]
    store: FileSpec,
    /// Owner whose records to list candidates for.
    #[arg(long = "owner")]
    owner: String,
}

impl CandidatesCmd {
    pub fn run(&self) -> Result<()> {
        let store = MemoryStore::load(&self.store)?;
        let listed = matcher::candidates_for_owner(&store, &self.owner)?;
        println!("{}", serde_json::to_string_pretty(&listed)?);
        Ok(())
    }
}

#[derive(Debug, Args)]
pub struct MatchCmd {
    /// The store file to read and update.
    #[arg(short = 's', long = "store")]
    store: FileSpec,
    /// Owner of both records.
    #[arg(long = "owner")]
    owner: String,
    /// The transaction to link.
    #[arg(short = 't', long = "transaction")]
    transaction: String,
    /// The document to link it to.
    #[arg(short = 'd', long = "document")]
    document: String,
}

impl MatchCmd {
    pub fn run(&self) -> Result<()> {
        let mut store = MemoryStore::load(&self.store)?;
        matcher::match_pair(&mut store, &self.owner, &self.transaction, &self.document)?;
        store.save(&self.store)
    }
}

#[derive(Debug, Args)]
pub struct UnmatchCmd {
    /// The store file to read and update.
    #[arg(short = 's', long = "store")]
    store: FileSpec,
    /// Owner of the transaction.
    #[arg(long = "owner")]
    owner: String,
    /// The transaction whose pairing to clear.
    #[arg(short = 't', long = "transaction")]
    transaction: String,
}

impl UnmatchCmd {
    pub fn run(&self) -> Result<()> {
        let mut store = MemoryStore::load(&self.store)?;
        matcher::unmatch(&mut store, &self.owner, &self.transaction)?;
        store.save(&self.store)
    }
}
