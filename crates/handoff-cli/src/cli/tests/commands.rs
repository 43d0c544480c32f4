use super::parse;
use crate::cli::{Cli, CliCommand};
use clap::Parser;

#[test]
fn cli_parse_run_defaults() {
    match parse(&["handoff", "run"]) {
        CliCommand::Run {
            no_naming_event,
            port,
        } => {
            assert!(!no_naming_event);
            assert!(port.is_none());
        }
        _ => panic!("expected Run"),
    }
}

#[test]
fn cli_parse_run_fallback_trigger_and_port() {
    match parse(&["handoff", "run", "--no-naming-event", "--port", "9000"]) {
        CliCommand::Run {
            no_naming_event,
            port,
        } => {
            assert!(no_naming_event);
            assert_eq!(port, Some(9000));
        }
        _ => panic!("expected Run"),
    }
}

#[test]
fn cli_parse_ledger() {
    match parse(&["handoff", "ledger"]) {
        CliCommand::Ledger { json } => assert!(!json),
        _ => panic!("expected Ledger"),
    }
    match parse(&["handoff", "ledger", "--json"]) {
        CliCommand::Ledger { json } => assert!(json),
        _ => panic!("expected Ledger --json"),
    }
}

#[test]
fn cli_parse_clear() {
    assert!(matches!(parse(&["handoff", "clear"]), CliCommand::Clear));
}

#[test]
fn cli_parse_listen() {
    match parse(&["handoff", "listen", "--port", "2866", "--refuse"]) {
        CliCommand::Listen { port, refuse } => {
            assert_eq!(port, Some(2866));
            assert!(refuse);
        }
        _ => panic!("expected Listen"),
    }
}

#[test]
fn cli_rejects_bad_port() {
    assert!(Cli::try_parse_from(["handoff", "run", "--port", "99999"]).is_err());
}
