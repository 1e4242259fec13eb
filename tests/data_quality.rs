use earningsedge_dashboard::aggregate::{DeltaSpec, DEFAULT_POLICY_ORDER};
use earningsedge_dashboard::data::summary::SUMMARY_COLUMNS;
use earningsedge_dashboard::data::{quality_report, sha256_hex, validate_summary_schema};
use earningsedge_dashboard::data::table::parse_table;
use earningsedge_dashboard::fetch::{ArtifactPresence, ArtifactSource, DirSource};
use earningsedge_dashboard::pipeline::{load_summary, probe_artifacts};
use earningsedge_dashboard::state::{RunContext, RunKey};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn write_csv(path: &Path, header: &[&str], rows: &[&str]) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    let mut out = String::new();
    out.push_str(&header.join(","));
    out.push('\n');
    for row in rows {
        out.push_str(row);
        out.push('\n');
    }
    fs::write(path, out).unwrap();
}

fn run_dir(root: &Path, run: RunKey) -> std::path::PathBuf {
    root.join("artifacts").join(run.as_str())
}

#[test]
fn schema_accepts_summary_header() {
    let headers: Vec<String> = SUMMARY_COLUMNS.iter().map(|s| s.to_string()).collect();
    let report = validate_summary_schema(&headers);
    assert!(report.ok);
    assert!(report.missing.is_empty());
}

#[test]
fn schema_names_missing_columns() {
    let ds = parse_table("policy,n_episodes\nppo,10\n");
    let report = quality_report(&ds);
    assert_eq!(report.rows, 1);
    assert!(!report.schema.ok);
    assert!(report.schema.missing.contains(&"mean_final_equity".to_string()));
}

#[tokio::test]
async fn dir_source_loads_exported_run() {
    let dir = TempDir::new().unwrap();
    let path = run_dir(dir.path(), RunKey::Sprint5).join("summary_table.csv");
    write_csv(
        &path,
        &SUMMARY_COLUMNS,
        &[
            "flat,20,1.0,1.0,0.0,0.0",
            "buy_hold,20,1.02,1.01,0.25,0.22",
            "ppo,20,1.05,1.04,0.18,0.17",
        ],
    );

    let src = DirSource::new(dir.path());
    let ctx = RunContext::new("/artifacts", RunKey::Sprint5);
    let loaded = load_summary(&src, &ctx, &DEFAULT_POLICY_ORDER, &DeltaSpec::ppo_vs_buy_hold())
        .await
        .unwrap();

    let order: Vec<&str> = loaded.view.rows.iter().map(|r| r.policy.as_str()).collect();
    assert_eq!(order, vec!["ppo", "buy_hold", "flat"]);
    assert_eq!(loaded.sha256, sha256_hex(fs::read(&path).unwrap().as_slice()));
    assert!(loaded.quality.schema_ok);
}

#[tokio::test]
async fn dir_source_missing_file_is_not_found() {
    let dir = TempDir::new().unwrap();
    let src = DirSource::new(dir.path());
    let err = src
        .fetch("/artifacts/sprint4/summary_table.csv")
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn dir_source_rejects_html_saved_under_csv_name() {
    let dir = TempDir::new().unwrap();
    let path = run_dir(dir.path(), RunKey::Sprint4).join("summary_table.csv");
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, "  <!DOCTYPE html>\n<html></html>\n").unwrap();

    let src = DirSource::new(dir.path());
    let err = src
        .fetch("/artifacts/sprint4/summary_table.csv")
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn dir_source_refuses_parent_components() {
    let dir = TempDir::new().unwrap();
    let src = DirSource::new(dir.path());
    assert!(src.fetch("/artifacts/../../etc/passwd").await.is_err());
}

#[tokio::test]
async fn probe_lists_present_and_missing_artifacts() {
    let dir = TempDir::new().unwrap();
    let run = run_dir(dir.path(), RunKey::Sprint4);
    write_csv(&run.join("summary_table.csv"), &SUMMARY_COLUMNS, &[]);
    fs::write(run.join("metrics.json"), "{}").unwrap();

    let src = DirSource::new(dir.path());
    let ctx = RunContext::new("/artifacts", RunKey::Sprint4);
    let statuses = probe_artifacts(&src, &ctx).await;
    let present: Vec<ArtifactPresence> = statuses.iter().map(|s| s.presence).collect();
    assert_eq!(
        present,
        vec![
            ArtifactPresence::Present,
            ArtifactPresence::Present,
            ArtifactPresence::Missing
        ]
    );
}

#[tokio::test]
async fn header_only_table_yields_empty_view() {
    let dir = TempDir::new().unwrap();
    let path = run_dir(dir.path(), RunKey::Sprint4).join("summary_table.csv");
    write_csv(&path, &SUMMARY_COLUMNS, &[]);

    let src = DirSource::new(dir.path());
    let ctx = RunContext::new("/artifacts", RunKey::Sprint4);
    let loaded = load_summary(&src, &ctx, &DEFAULT_POLICY_ORDER, &DeltaSpec::ppo_vs_buy_hold())
        .await
        .unwrap();
    assert!(loaded.view.is_empty());
    assert!(loaded.view.delta.is_none());
    assert!(loaded.view.kpis.iter().all(|k| k.winner.is_none()));
}

#[tokio::test]
async fn dir_source_decodes_invalid_utf8_lossily() {
    let dir = TempDir::new().unwrap();
    let path = run_dir(dir.path(), RunKey::Sprint4).join("summary_table.csv");
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    let mut bytes = SUMMARY_COLUMNS.join(",").into_bytes();
    bytes.extend_from_slice(b"\nppo\xff,10,1.1,1.1,0.1,0.1\n");
    fs::write(&path, bytes).unwrap();

    let src = DirSource::new(dir.path());
    let ctx = RunContext::new("/artifacts", RunKey::Sprint4);
    let loaded = load_summary(&src, &ctx, &DEFAULT_POLICY_ORDER, &DeltaSpec::ppo_vs_buy_hold())
        .await
        .unwrap();
    assert_eq!(loaded.view.rows.len(), 1);
    assert_eq!(loaded.view.rows[0].policy, "ppo\u{fffd}");
    assert_eq!(loaded.view.rows[0].mean_final_equity, 1.1);
}
