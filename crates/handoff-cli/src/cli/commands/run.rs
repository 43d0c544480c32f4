//! `handoff run` – host bridge: stdin events in, stdout cancellations out.

use anyhow::Result;
use handoff_core::config::HandoffConfig;
use handoff_core::engine::{Engine, EngineOptions};
use handoff_core::events::DownloadTrigger;
use handoff_core::handoff::{CurlTransport, HandoffClient};
use handoff_core::store::ConfiguredStore;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use crate::cli::bridge::{parse_event_line, StdoutSink};

/// Events buffered between stdin and the engine.
const EVENT_QUEUE: usize = 256;

pub async fn run_bridge(cfg: &HandoffConfig, supports_naming_event: bool) -> Result<()> {
    let store = ConfiguredStore::open(cfg).await?;
    let transport = CurlTransport::from_config(cfg);
    tracing::info!(endpoint = %transport.url(), "hand-off bridge starting");

    let trigger = DownloadTrigger::probe(supports_naming_event);
    let options = EngineOptions::from_config(cfg, trigger);
    let mut engine = Engine::new(store, HandoffClient::new(transport), Arc::new(StdoutSink), options);
    engine.restore().await;

    let (tx, rx) = mpsc::channel(EVENT_QUEUE);
    let worker = tokio::spawn(engine.run(rx));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match parse_event_line(&line) {
            Ok(Some(event)) => {
                if tx.send(event).await.is_err() {
                    tracing::error!("engine stopped, no longer reading events");
                    break;
                }
            }
            Ok(None) => {}
            Err(e) => tracing::warn!("skipping line: {:#}", e),
        }
    }
    drop(tx);

    let summary = worker.await?;
    tracing::info!(
        handed_off = summary.handed_off,
        left_to_browser = summary.left_to_browser,
        "hand-off bridge stopped"
    );
    Ok(())
}
