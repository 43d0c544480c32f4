pub mod config;
pub mod logging;

pub mod correlate;
pub mod descriptor;
pub mod engine;
pub mod events;
pub mod handoff;
pub mod ledger;
pub mod store;
