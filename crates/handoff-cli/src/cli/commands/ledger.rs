//! `handoff ledger` – show the persisted request ledger.

use anyhow::Result;
use handoff_core::config::HandoffConfig;
use handoff_core::store::{load_ledger, ConfiguredStore};

pub async fn run_ledger(cfg: &HandoffConfig, json: bool) -> Result<()> {
    let store = ConfiguredStore::open(cfg).await?;
    let records = load_ledger(&store).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }
    if records.is_empty() {
        println!("Ledger is empty.");
        return Ok(());
    }
    println!("{:<4} {:<6} {:<6} {:<8} {}", "#", "METHOD", "RANGES", "HEADERS", "URL");
    for (i, r) in records.iter().enumerate() {
        let headers = r
            .request_headers
            .as_ref()
            .map(|h| h.len().to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<4} {:<6} {:<6} {:<8} {}",
            i,
            r.method,
            if r.sequential { "no" } else { "yes" },
            headers,
            r.url
        );
    }
    println!("{} of {} slots used", records.len(), cfg.effective_ledger_capacity());
    Ok(())
}
