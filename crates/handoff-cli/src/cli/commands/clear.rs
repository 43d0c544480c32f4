//! `handoff clear` – delete the persisted request ledger.

use anyhow::Result;
use handoff_core::config::HandoffConfig;
use handoff_core::store::{ConfiguredStore, DurableStore, LEDGER_KEY};

pub async fn run_clear(cfg: &HandoffConfig) -> Result<()> {
    let store = ConfiguredStore::open(cfg).await?;
    store.remove(LEDGER_KEY).await?;
    println!("Ledger cleared.");
    Ok(())
}
