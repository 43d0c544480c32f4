//! CLI command handlers, one per file.

mod clear;
mod ledger;
mod listen;
mod run;

pub use clear::run_clear;
pub use ledger::run_ledger;
pub use listen::run_listen;
pub use run::run_bridge;
