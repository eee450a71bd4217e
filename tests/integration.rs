use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn regc_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("regc");
    path
}

/// Pre-seeds every cache artifact fresh, so the staleness cache keeps the
/// whole run offline. The base URL points at a closed port: any code path
/// that reaches for the network fails fast instead of hanging.
///
/// Title 1 carries the corpus content; title 9 appears in the metadata feed
/// but has no artifact; title 35 is reserved.
fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let data_dir = root.join("data");
    fs::create_dir_all(data_dir.join("titles")).unwrap();
    fs::create_dir_all(data_dir.join("agencies")).unwrap();

    fs::write(
        data_dir.join("titles_meta.json"),
        r#"{"titles": [
            {"number": 1, "name": "General Provisions", "latest_amended_on": "2024-01-17"},
            {"number": 9, "name": "Animals and Animal Products", "latest_amended_on": "2024-03-01"},
            {"number": 35, "name": "Reserved", "latest_amended_on": null, "reserved": true}
        ]}"#,
    )
    .unwrap();

    fs::write(
        data_dir.join("titles/title-1.xml"),
        "<ECFR><DIV1 N=\"1\"><DIV3 N=\"III\"><DIV5 N=\"425\">Lorem ipsum dolor\
         <DIV8 N=\"425.1\"/><DIV8 N=\"425.2\"/><P>sit amet</P></DIV5></DIV3></DIV1></ECFR>",
    )
    .unwrap();

    fs::write(
        data_dir.join("agencies/agencies.json"),
        r#"{"agencies": [
            {
                "name": "Example Administration",
                "cfr_references": [{"title": 1, "chapter": "III", "part": "425"}],
                "children": [
                    {
                        "name": "Example Sub-Office",
                        "cfr_references": [{"title": 1, "chapter": "III"}],
                        "children": []
                    }
                ]
            },
            {
                "name": "Ghost Commission",
                "cfr_references": [{"title": 9}],
                "children": []
            },
            {
                "name": "Reserved Bureau",
                "cfr_references": [{"title": 35}],
                "children": []
            },
            {
                "name": "Hollow Board",
                "cfr_references": [],
                "children": []
            }
        ]}"#,
    )
    .unwrap();

    let config_content = format!(
        r#"[db]
path = "{root}/data/census.sqlite"

[corpus]
data_dir = "{root}/data"
base_url = "http://127.0.0.1:1"
max_age_hours = 24

[fetch]
max_attempts = 1
base_delay_ms = 1
max_delay_ms = 1
timeout_secs = 2

[server]
bind = "127.0.0.1:7332"
"#,
        root = root.display()
    );

    let config_path = config_dir.join("regc.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_regc(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = regc_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run regc binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

#[test]
fn test_init_creates_database() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_regc(&config_path, &["init"]);
    assert!(success, "init failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("initialized"));
}

#[test]
fn test_init_idempotent() {
    let (_tmp, config_path) = setup_test_env();

    let (_, _, success1) = run_regc(&config_path, &["init"]);
    assert!(success1, "First init failed");

    let (_, _, success2) = run_regc(&config_path, &["init"]);
    assert!(success2, "Second init failed (not idempotent)");
}

#[test]
fn test_sync_serves_fresh_artifacts_offline() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_regc(&config_path, &["sync"]);
    assert!(success, "sync failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("fresh: 1"));
    assert!(stdout.contains("reserved: 1"));
    // Title 9 has no artifact and the feed is unreachable.
    assert!(stdout.contains("failed: 1"));
    assert!(stdout.contains("ok"));
}

#[test]
fn test_ingest_aggregates_per_agency() {
    let (_tmp, config_path) = setup_test_env();

    run_regc(&config_path, &["init"]);
    let (stdout, stderr, success) = run_regc(&config_path, &["ingest"]);
    assert!(success, "ingest failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("agencies upserted: 3"));
    assert!(stdout.contains("agencies failed: 0"));
    assert!(stdout.contains("references counted: 2"));
    // Ghost Commission's title 9 artifact is absent; Reserved Bureau's
    // title 35 is reserved. Both skip without failing the run.
    assert!(stdout.contains("references skipped (missing): 2"));
    assert!(stdout.contains("ok"));

    // Part 425 holds 2 sections / 5 words; chapter III holds the same
    // subtree, so the parent plus sub-office scope doubles both.
    let (stdout, _, success) = run_regc(&config_path, &["show", "Example Administration"]);
    assert!(success);
    assert!(stdout.contains("sections: 4"));
    assert!(stdout.contains("words: 10"));
}

#[test]
fn test_missing_title_contributes_zero_without_aborting() {
    let (_tmp, config_path) = setup_test_env();

    run_regc(&config_path, &["init"]);
    let (_, _, success) = run_regc(&config_path, &["ingest"]);
    assert!(success);

    let (stdout, _, success) = run_regc(&config_path, &["show", "Ghost Commission"]);
    assert!(success);
    assert!(stdout.contains("sections: 0"));
    assert!(stdout.contains("words: 0"));
}

#[test]
fn test_agency_with_empty_scope_is_omitted() {
    let (_tmp, config_path) = setup_test_env();

    run_regc(&config_path, &["init"]);
    run_regc(&config_path, &["ingest"]);

    let (stdout, _, success) = run_regc(&config_path, &["agencies"]);
    assert!(success);
    assert!(stdout.contains("3 agencies"));
    assert!(!stdout.contains("Hollow Board"));
}

#[test]
fn test_reingest_is_idempotent_and_hits_the_cache() {
    let (_tmp, config_path) = setup_test_env();

    run_regc(&config_path, &["init"]);
    let (_, _, success) = run_regc(&config_path, &["ingest"]);
    assert!(success, "first ingest failed");

    let (first, _, _) = run_regc(&config_path, &["agencies"]);

    let (stdout, stderr, success) = run_regc(&config_path, &["ingest"]);
    assert!(success, "second ingest failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("cache hits: 2"));
    assert!(stdout.contains("references counted: 0"));

    let (second, _, _) = run_regc(&config_path, &["agencies"]);
    assert_eq!(first, second, "re-ingest changed persisted rows");
}

#[test]
fn test_top_orders_by_word_count() {
    let (_tmp, config_path) = setup_test_env();

    run_regc(&config_path, &["init"]);
    run_regc(&config_path, &["ingest"]);

    let (stdout, _, success) = run_regc(&config_path, &["top", "--limit", "1"]);
    assert!(success);
    assert!(stdout.contains("Example Administration"));
    assert!(!stdout.contains("Ghost Commission"));
}

#[test]
fn test_show_unknown_agency_fails() {
    let (_tmp, config_path) = setup_test_env();

    run_regc(&config_path, &["init"]);
    let (_, stderr, success) = run_regc(&config_path, &["show", "No Such Agency"]);
    assert!(!success);
    assert!(stderr.contains("no agency named"));
}
