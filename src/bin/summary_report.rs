//! Print the aggregate view for one run.
//!
//! Usage:
//!   summary_report [run] [--json]
//!
//! Environment:
//!   ARTIFACTS_BASE      base URL or local directory (default http://localhost:5173)
//!   ARTIFACTS_ROOT      path prefix of run directories (default /artifacts)
//!   DEFAULT_RUN         run used when none is given (default sprint4)
//!   FETCH_TIMEOUT_SECS  HTTP timeout (default 10)

use anyhow::{Context, Result};
use earningsedge_dashboard::aggregate::{DeltaSpec, DEFAULT_POLICY_ORDER};
use earningsedge_dashboard::fetch::{ArtifactSource, DirSource, HttpSource};
use earningsedge_dashboard::logging::{log, obj, v_str, Domain, Level};
use earningsedge_dashboard::pipeline::{load_optional_metrics, load_summary, probe_artifacts};
use earningsedge_dashboard::report::{render_summary, render_table, status_json, view_json};
use earningsedge_dashboard::state::{Config, RunKey};
use std::env;

#[tokio::main]
async fn main() -> Result<()> {
    let cfg = Config::from_env();
    let args: Vec<String> = env::args().skip(1).collect();
    let as_json = args.iter().any(|a| a == "--json");

    let mut selector = cfg.selector();
    if let Some(name) = args.iter().find(|a| !a.starts_with("--")) {
        match name.parse::<RunKey>() {
            Ok(run) => {
                selector.select(run);
            }
            Err(err) => {
                eprintln!("{}", err);
                eprintln!(
                    "known runs: {}",
                    RunKey::ALL.map(|r| r.as_str()).join(", ")
                );
                std::process::exit(2);
            }
        }
    }

    let source: Box<dyn ArtifactSource> = if cfg.is_http() {
        Box::new(
            HttpSource::with_timeout(&cfg.artifacts_base, cfg.fetch_timeout_secs)
                .context("building http source")?,
        )
    } else {
        Box::new(DirSource::new(&cfg.artifacts_base))
    };
    log(
        Level::Info,
        Domain::System,
        "startup",
        obj(&[
            ("run", v_str(selector.run().as_str())),
            ("base", v_str(&cfg.artifacts_base)),
            ("root", v_str(&selector.content_root())),
        ]),
    );

    let ctx = selector.context();
    let statuses = probe_artifacts(source.as_ref(), &ctx).await;
    // Metrics are optional for this report.
    let metrics = load_optional_metrics(source.as_ref(), &ctx).await;

    let loaded = match load_summary(
        source.as_ref(),
        &ctx,
        &DEFAULT_POLICY_ORDER,
        &DeltaSpec::ppo_vs_buy_hold(),
    )
    .await
    {
        Ok(loaded) => loaded,
        Err(err) => {
            eprintln!("Could not load: {}", err);
            std::process::exit(3);
        }
    };

    if as_json {
        println!("{}", view_json(&loaded));
        println!("{}", status_json(metrics.as_ref(), &statuses));
        return Ok(());
    }

    println!("run {} ({})", ctx.run, loaded.url);
    for s in &statuses {
        println!("  {:<28} {:?}", s.location, s.presence);
    }
    if let Some(m) = &metrics {
        let steps = m
            .timesteps
            .map(|t| format!("{}", t))
            .unwrap_or_else(|| "—".to_string());
        println!(
            "timesteps {}  primary {}  constraint {}",
            steps, m.primary_metric, m.constraint
        );
    }
    println!();
    print!("{}", render_table(&loaded.view));
    println!();
    print!("{}", render_summary(&loaded.view));
    Ok(())
}
