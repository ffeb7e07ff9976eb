use std::path::PathBuf;

use anyhow::Result;
use chrono::Utc;
use clap::Args;

use crate::filespec::FileSpec;
use crate::store::MemoryStore;
use crate::sync::{self, sheet::CsvSheet};

#[derive(Debug, Args)]
pub struct PullSyncCmd {
    /// The store file to read and update. "-" reads stdin and writes stdout.
    #[arg(short = 's', long = "store")]
    store: FileSpec,
    /// Owner whose transactions the sheet belongs to.
    #[arg(long = "owner")]
    owner: String,
    /// CSV file holding the sheet tab, header row included.
    #[arg(long = "sheet")]
    sheet: PathBuf,
    /// Recorded as the source id on transactions inserted from the sheet.
    #[arg(long = "source-id")]
    source_id: String,
}

impl PullSyncCmd {
    pub fn run(&self) -> Result<()> {
        let mut store = MemoryStore::load(&self.store)?;
        let mut sheet = CsvSheet::new(&self.sheet);
        let summary = sync::pull_sync(
            &mut store,
            &mut sheet,
            &self.owner,
            &self.source_id,
            Utc::now(),
        )?;
        store.save(&self.store)?;
        println!("{}", serde_json::to_string_pretty(&summary)?);
        Ok(())
    }
}
