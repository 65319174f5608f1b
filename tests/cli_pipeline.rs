mod listing_stub;

use std::fs;

use listing_stub::{ListingStub, StubPage, listing_item, listing_page};
use novelscope::formats::RawRecord;
use predicates::prelude::*;

fn stub_pages() -> Vec<StubPage> {
    vec![
        StubPage::Html(listing_page(&[
            listing_item(
                "Dune",
                "by Frank Herbert",
                "First published in 1965",
                "4.34 out of 5",
                "12,345 want to read",
                Some("120 editions"),
            ),
            listing_item(
                "Foundation",
                "by Isaac Asimov",
                "First published in 1951",
                "4.2 out of 5",
                "9,001 want to read",
                Some("98 editions"),
            ),
            listing_item("Broken", "by Nobody", "no year here", "3.0", "1 want to read", None),
        ])),
        StubPage::Html(listing_page(&[
            listing_item(
                "Neuromancer",
                "by William Gibson",
                "First published in 1984",
                "3.9 out of 5",
                "0 want to read",
                None,
            ),
            listing_item(
                "Hyperion",
                "by Dan Simmons",
                "First published in 1989",
                "4.1 out of 5",
                "4,567 want to read",
                Some("45 editions"),
            ),
        ])),
    ]
}

fn read_raw(path: &std::path::Path) -> Vec<RawRecord> {
    fs::read_to_string(path)
        .expect("read raw snapshot")
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| serde_json::from_str(line).expect("parse raw record json"))
        .collect()
}

#[test]
fn rust_log_debug_emits_debug_line_to_stderr() -> anyhow::Result<()> {
    let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
    let addr = listener.local_addr()?;
    drop(listener);

    let temp = tempfile::TempDir::new()?;
    let raw_path = temp.path().join("raw.jsonl");

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("novelscope");
    cmd.env("RUST_LOG", "debug")
        .args([
            "scrape",
            "--url",
            &format!("http://{addr}/search?q=x"),
            "--out",
            raw_path.to_str().unwrap(),
            "--delay-ms",
            "0",
        ])
        .assert()
        .success()
        .stderr(predicate::str::contains("parsed cli"))
        .stderr(predicate::str::contains("page request failed"));

    assert!(read_raw(&raw_path).is_empty());
    Ok(())
}

#[test]
fn step_by_step_commands_scrape_clean_analyze_store() -> anyhow::Result<()> {
    let stub = ListingStub::spawn(stub_pages());
    let temp = tempfile::TempDir::new()?;
    let raw_path = temp.path().join("raw.jsonl");
    let clean_path = temp.path().join("clean.jsonl");
    let db_path = temp.path().join("novels.db");

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("novelscope");
    cmd.args([
        "scrape",
        "--url",
        &stub.search_url,
        "--out",
        raw_path.to_str().unwrap(),
        "--target-count",
        "10",
        "--delay-ms",
        "0",
    ])
    .assert()
    .success();

    let raw = read_raw(&raw_path);
    let titles: Vec<_> = raw.iter().map(|r| r.title.as_str()).collect();
    assert_eq!(titles, ["Dune", "Foundation", "Neuromancer", "Hyperion"]);
    assert_eq!(raw[2].want_to_read, Some(0));
    assert_eq!(raw[2].edition_count, None);
    assert_eq!(stub.requested_pages(), [1, 2, 3]);

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("novelscope");
    cmd.args([
        "clean",
        "--raw",
        raw_path.to_str().unwrap(),
        "--out",
        clean_path.to_str().unwrap(),
    ])
    .assert()
    .success();

    let clean: Vec<serde_json::Value> = fs::read_to_string(&clean_path)?
        .lines()
        .map(|line| serde_json::from_str(line).expect("parse clean row"))
        .collect();
    assert_eq!(clean.len(), 3);
    assert_eq!(clean[0]["# of Editions"], 120);
    assert!(clean.iter().all(|row| row["Title"] != "Neuromancer"));

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("novelscope");
    let output = cmd
        .args(["analyze", "--raw", raw_path.to_str().unwrap(), "--json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let analysis: serde_json::Value = serde_json::from_slice(&output)?;
    assert_eq!(analysis["rows"], 3);
    assert_eq!(analysis["publish_year"]["min"], 1951.0);
    assert_eq!(analysis["top_authors"][0]["author"], "Frank Herbert");

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("novelscope");
    cmd.args([
        "store",
        "--raw",
        raw_path.to_str().unwrap(),
        "--db",
        db_path.to_str().unwrap(),
        "--table",
        "novels",
    ])
    .assert()
    .success();

    let rows = tokio::runtime::Runtime::new()?
        .block_on(novelscope::store::count_rows(&db_path, "novels"))?;
    assert_eq!(rows, 3);
    Ok(())
}

#[test]
fn clean_refuses_to_overwrite_output() -> anyhow::Result<()> {
    let temp = tempfile::TempDir::new()?;
    let raw_path = temp.path().join("raw.jsonl");
    let clean_path = temp.path().join("clean.jsonl");
    fs::write(&raw_path, "")?;
    fs::write(&clean_path, "existing")?;

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("novelscope");
    cmd.args([
        "clean",
        "--raw",
        raw_path.to_str().unwrap(),
        "--out",
        clean_path.to_str().unwrap(),
    ])
    .assert()
    .failure()
    .stderr(predicate::str::contains("already exists"));

    assert_eq!(fs::read_to_string(&clean_path)?, "existing");
    Ok(())
}

#[test]
fn run_prints_report_and_replaces_table() -> anyhow::Result<()> {
    let stub = ListingStub::spawn(stub_pages());
    let temp = tempfile::TempDir::new()?;
    let db_path = temp.path().join("novels.db");

    for _ in 0..2 {
        let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("novelscope");
        cmd.args([
            "run",
            "--url",
            &stub.search_url,
            "--target-count",
            "3",
            "--delay-ms",
            "0",
            "--db",
            db_path.to_str().unwrap(),
            "--table",
            "novels",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Top novels data analysis report"))
        .stdout(predicate::str::contains("Correlation coefficient"))
        .stderr(predicate::str::contains("Stored 2 rows in table novels."));
    }

    let runtime = tokio::runtime::Runtime::new()?;
    assert_eq!(
        runtime.block_on(novelscope::store::count_rows(&db_path, "novels"))?,
        2
    );
    let columns = runtime.block_on(novelscope::store::column_names(&db_path, "novels"))?;
    assert_eq!(
        columns,
        [
            "Title",
            "Author",
            "Publish Year",
            "Rating",
            "want to read",
            "# of Editions",
            "Title_Length",
            "Primary Author"
        ]
    );
    Ok(())
}

#[test]
fn cached_scrape_is_reused_until_refreshed() -> anyhow::Result<()> {
    let stub = ListingStub::spawn(stub_pages());
    let temp = tempfile::TempDir::new()?;
    let cache_dir = temp.path().join("cache");

    let scrape = |out: &str, refresh: bool| {
        let out_path = temp.path().join(out);
        let mut args = vec![
            "scrape".to_owned(),
            "--url".to_owned(),
            stub.search_url.clone(),
            "--target-count".to_owned(),
            "2".to_owned(),
            "--delay-ms".to_owned(),
            "0".to_owned(),
            "--cache-dir".to_owned(),
            cache_dir.to_string_lossy().to_string(),
            "--out".to_owned(),
            out_path.to_string_lossy().to_string(),
        ];
        if refresh {
            args.push("--refresh".to_owned());
        }
        let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("novelscope");
        cmd.args(&args).assert().success();
        read_raw(&out_path)
    };

    let first = scrape("first.jsonl", false);
    assert_eq!(first.len(), 2);
    assert_eq!(stub.requested_pages(), [1]);

    let second = scrape("second.jsonl", false);
    assert_eq!(second, first);
    assert_eq!(stub.requested_pages(), [1]);

    let third = scrape("third.jsonl", true);
    assert_eq!(third, first);
    assert_eq!(stub.requested_pages(), [1, 1]);
    Ok(())
}
