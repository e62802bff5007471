use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;
use tempfile::NamedTempFile;

fn fetchbot() -> Command {
    let mut cmd = Command::cargo_bin("fetchbot").unwrap();
    // Point the session file somewhere that does not exist so the tests are
    // independent of the developer's real login state.
    cmd.env("FETCHBOT_SESSION_FILE", "/nonexistent/fetchbot-session.json");
    cmd
}

/// Running with no arguments should fail (clap requires a subcommand).
#[test]
fn test_no_args_shows_error() {
    fetchbot().assert().failure();
}

#[test]
fn test_help_lists_subcommands() {
    fetchbot()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("watch"))
        .stdout(predicate::str::contains("findings"))
        .stdout(predicate::str::contains("login"));
}

/// Authenticated commands must fail cleanly before any network I/O when no
/// session is stored.
#[test]
fn test_watch_requires_login() {
    fetchbot()
        .args(["watch", "abc123"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not logged in"));
}

#[test]
fn test_scan_requires_login() {
    fetchbot()
        .args(["scan", "https://example.com"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not logged in"));
}

/// An invalid severity filter is rejected by argument parsing, not sent to
/// the server.
#[test]
fn test_findings_rejects_bad_severity() {
    fetchbot()
        .args(["findings", "abc123", "--severity", "catastrophic"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("catastrophic"));
}

#[test]
fn test_resolve_rejects_bad_status() {
    fetchbot()
        .args(["resolve", "7", "--status", "done"])
        .assert()
        .failure();
}

#[test]
fn test_report_requires_login() {
    fetchbot()
        .args(["report", "abc123"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not logged in"));
}

#[test]
fn test_report_rejects_bad_format() {
    fetchbot()
        .args(["report", "abc123", "--format", "docx"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("docx"));
}

#[test]
fn test_scan_type_is_validated() {
    fetchbot()
        .args(["scan", "https://example.com", "--scan-type", "nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("nope"));
}

/// A stored session passes the login guard; the command then fails on the
/// unreachable API, not on authentication.
#[test]
fn test_stored_session_passes_login_guard() {
    let mut session = NamedTempFile::new().unwrap();
    write!(
        session,
        r#"{{"token":"tok-1","user":{{"id":1,"email":"a@b.c","organization_id":1}}}}"#
    )
    .unwrap();

    let mut cmd = Command::cargo_bin("fetchbot").unwrap();
    cmd.env("FETCHBOT_SESSION_FILE", session.path())
        .env("FETCHBOT_API_URL", "http://127.0.0.1:1")
        .args(["scans"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("request failed"));
}
