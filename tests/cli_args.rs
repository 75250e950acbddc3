//! Integration tests for the `remember` binary
//!
//! Runs the compiled binary against a temporary store and, for `fetch`, a
//! local mock upstream.

use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Helper to run the CLI with given args and capture output
fn run_cli(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_remember"))
        .args(args)
        .env_remove("REMEMBER_DB")
        .env_remove("REMEMBER_BUCKET")
        .output()
        .expect("Failed to execute remember")
}

/// Runs the CLI off the async runtime so the mock server keeps serving
async fn run_cli_blocking(args: Vec<String>) -> Output {
    tokio::task::spawn_blocking(move || {
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        run_cli(&args)
    })
    .await
    .expect("CLI task panicked")
}

fn db_arg(dir: &Path) -> String {
    dir.join("memory.db").to_string_lossy().into_owned()
}

#[test]
fn test_help_flag_exits_successfully() {
    let output = run_cli(&["--help"]);
    assert!(output.status.success(), "Expected --help to exit successfully");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("remember"), "Help should mention remember");
    assert!(stdout.contains("fetch"), "Help should mention the fetch command");
    assert!(stdout.contains("purge"), "Help should mention the purge command");
}

#[test]
fn test_invalid_url_prints_error_and_exits() {
    let output = run_cli(&["fetch", "not a url"]);
    assert!(!output.status.success(), "Expected invalid URL to fail");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("Invalid URL"),
        "Should print error message about invalid URL: {}",
        stderr
    );
}

#[test]
fn test_stats_on_fresh_store_reports_zero_entries() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let db = db_arg(temp_dir.path());

    let output = run_cli(&["--db", &db, "stats"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("entries: 0"), "Unexpected stats output: {}", stdout);
    assert!(temp_dir.path().join("memory.db").exists(), "Store file should be created");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_fetch_is_served_from_cache_the_second_time() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/a"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/plain")
                .set_body_string("hello"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let db = db_arg(temp_dir.path());
    let url = format!("{}/a", server.uri());

    let first = run_cli_blocking(vec!["--db".into(), db.clone(), "fetch".into(), url.clone()]).await;
    assert!(first.status.success(), "{}", String::from_utf8_lossy(&first.stderr));
    assert_eq!(String::from_utf8_lossy(&first.stdout), "hello");

    let second = run_cli_blocking(vec![
        "--db".into(),
        db.clone(),
        "fetch".into(),
        "--meta".into(),
        url,
    ])
    .await;
    assert!(second.status.success(), "{}", String::from_utf8_lossy(&second.stderr));
    let summary: serde_json::Value =
        serde_json::from_slice(&second.stdout).expect("--meta should print JSON");
    assert_eq!(summary["status"], 200);
    assert_eq!(summary["from_cache"], true);

    let purge = run_cli_blocking(vec!["--db".into(), db, "purge".into()]).await;
    assert!(purge.status.success());
    assert!(String::from_utf8_lossy(&purge.stdout).contains("removed 1"));
}
