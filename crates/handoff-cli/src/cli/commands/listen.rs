//! `handoff listen` – reference agent endpoint for manual testing.

use anyhow::{Context, Result};
use handoff_core::descriptor::TransferDescriptor;
use tokio::net::TcpListener;

use crate::cli::receiver;

pub async fn run_listen(host: &str, port: u16, refuse: bool) -> Result<()> {
    let addr = format!("{}:{}", host, port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("bind {}", addr))?;
    println!("Listening for hand-offs on http://{}/", addr);
    receiver::serve(listener, refuse, receiver::READ_TIMEOUT, |d: TransferDescriptor| {
        match serde_json::to_string(&d) {
            Ok(json) => println!("{}", json),
            Err(e) => tracing::warn!("print descriptor: {}", e),
        }
    })
    .await
}
