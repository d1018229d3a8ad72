use super::parse;
use crate::cli::{apply_jobs, Cli, CliCommand};
use clap::Parser;
use relaydrop_core::config::RelayConfig;

#[test]
fn cli_parse_submit_many_with_notify() {
    match parse(&[
        "relaydrop",
        "submit",
        "https://example.com/a.iso",
        "https://example.com/b.iso",
        "--notify",
        "me@example.com",
    ]) {
        CliCommand::Submit { urls, notify } => {
            assert_eq!(urls.len(), 2);
            assert_eq!(urls[1], "https://example.com/b.iso");
            assert_eq!(notify.as_deref(), Some("me@example.com"));
        }
        _ => panic!("expected Submit"),
    }
}

#[test]
fn cli_parse_submit_requires_url() {
    assert!(Cli::try_parse_from(["relaydrop", "submit"]).is_err());
}

#[test]
fn cli_parse_status() {
    match parse(&["relaydrop", "status", "abc-123"]) {
        CliCommand::Status { id } => assert_eq!(id, "abc-123"),
        _ => panic!("expected Status"),
    }
}

#[test]
fn cli_parse_list() {
    assert!(matches!(parse(&["relaydrop", "list"]), CliCommand::List));
}

#[test]
fn cli_parse_reset() {
    assert!(matches!(
        parse(&["relaydrop", "reset"]),
        CliCommand::Reset { yes: false }
    ));
    assert!(matches!(
        parse(&["relaydrop", "reset", "--yes"]),
        CliCommand::Reset { yes: true }
    ));
}

#[test]
fn cli_parse_run_jobs() {
    match parse(&["relaydrop", "run"]) {
        CliCommand::Run { jobs } => assert!(jobs.is_none()),
        _ => panic!("expected Run"),
    }
    match parse(&["relaydrop", "run", "--jobs", "3"]) {
        CliCommand::Run { jobs } => assert_eq!(jobs, Some(3)),
        _ => panic!("expected Run"),
    }
}

#[test]
fn cli_parse_serve_defaults() {
    match parse(&["relaydrop", "serve"]) {
        CliCommand::Serve { bind, jobs } => {
            assert_eq!(bind, "0.0.0.0:10000");
            assert!(jobs.is_none());
        }
        _ => panic!("expected Serve"),
    }
    match parse(&["relaydrop", "serve", "--bind", "127.0.0.1:8080", "--jobs", "2"]) {
        CliCommand::Serve { bind, jobs } => {
            assert_eq!(bind, "127.0.0.1:8080");
            assert_eq!(jobs, Some(2));
        }
        _ => panic!("expected Serve"),
    }
}

#[test]
fn jobs_flag_overrides_config() {
    let mut cfg = RelayConfig::default();
    apply_jobs(&mut cfg, None);
    assert_eq!(cfg.max_concurrent_jobs, 4);
    apply_jobs(&mut cfg, Some(7));
    assert_eq!(cfg.max_concurrent_jobs, 7);
}
