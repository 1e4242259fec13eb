//! Text and JSON renderings of the view model.

use serde_json::{json, Value};

use crate::aggregate::{AggregateView, Kpi, MetricDelta, Selection};
use crate::data::metrics::RunMetrics;
use crate::pipeline::{ArtifactStatus, LoadedSummary};

/// Shown wherever a metric value is not available.
pub const UNAVAILABLE: &str = "—";
pub const NOT_APPLICABLE: &str = "N/A";

pub fn fmt_metric(value: f64, digits: usize) -> String {
    if value.is_finite() {
        format!("{:.*}", digits, value)
    } else {
        UNAVAILABLE.to_string()
    }
}

pub fn fmt_episodes(value: f64) -> String {
    if value.is_finite() {
        format!("{}", value)
    } else {
        UNAVAILABLE.to_string()
    }
}

/// Signed delta with four digits.
pub fn fmt_delta(value: f64) -> String {
    if !value.is_finite() {
        return NOT_APPLICABLE.to_string();
    }
    if value >= 0.0 {
        format!("+{:.4}", value)
    } else {
        format!("{:.4}", value)
    }
}

pub fn fmt_selection(sel: &Selection<'_>, digits: usize) -> String {
    match sel {
        Selection::Winner { row, value } => {
            format!("{} ({})", row.policy, fmt_metric(*value, digits))
        }
        Selection::Undefined => NOT_APPLICABLE.to_string(),
    }
}

fn fmt_kpi(kpi: &Kpi) -> String {
    match &kpi.winner {
        Some(w) => format!("{}: {} {}", kpi.title, fmt_metric(w.value, 4), w.policy),
        None => format!("{}: {}", kpi.title, NOT_APPLICABLE),
    }
}

fn fmt_metric_delta(d: &MetricDelta) -> String {
    let verdict = match d.is_favorable() {
        Some(true) => "favorable",
        Some(false) => "unfavorable",
        None => "",
    };
    format!("{} {} {}", d.metric.label(), fmt_delta(d.value), verdict)
        .trim_end()
        .to_string()
}

pub const TABLE_HEADER: [&str; 6] = [
    "policy",
    "n_episodes",
    "mean_final",
    "median_final",
    "mean_max_dd",
    "median_max_dd",
];

/// Fixed-width table of the canonically ordered rows.
pub fn render_table(view: &AggregateView) -> String {
    let mut lines: Vec<[String; 6]> = vec![TABLE_HEADER.map(str::to_string)];
    for r in &view.rows {
        lines.push([
            r.policy.clone(),
            fmt_episodes(r.n_episodes),
            fmt_metric(r.mean_final_equity, 4),
            fmt_metric(r.median_final_equity, 4),
            fmt_metric(r.mean_max_drawdown, 4),
            fmt_metric(r.median_max_drawdown, 4),
        ]);
    }
    let mut widths = [0usize; 6];
    for line in &lines {
        for (i, cell) in line.iter().enumerate() {
            widths[i] = widths[i].max(cell.chars().count());
        }
    }
    let mut out = String::new();
    for line in &lines {
        let mut row = String::new();
        for (i, cell) in line.iter().enumerate() {
            let pad = widths[i] - cell.chars().count();
            if i == 0 {
                row.push_str(cell);
                row.push_str(&" ".repeat(pad));
            } else {
                row.push_str("  ");
                row.push_str(&" ".repeat(pad));
                row.push_str(cell);
            }
        }
        out.push_str(row.trim_end());
        out.push('\n');
    }
    out
}

/// KPI lines followed by the delta block.
pub fn render_summary(view: &AggregateView) -> String {
    let mut out = String::new();
    for kpi in &view.kpis {
        out.push_str(&fmt_kpi(kpi));
        out.push('\n');
    }
    match &view.delta {
        Some(delta) => {
            out.push_str(&format!("{} vs {}\n", delta.subject, delta.baseline));
            for d in &delta.deltas {
                out.push_str("  ");
                out.push_str(&fmt_metric_delta(d));
                out.push('\n');
            }
        }
        None => out.push_str(&format!("delta: {}\n", NOT_APPLICABLE)),
    }
    out
}

pub fn view_json(loaded: &LoadedSummary) -> Value {
    json!({
        "run": loaded.context.run,
        "url": loaded.url,
        "sha256": loaded.sha256,
        "quality": loaded.quality,
        "warnings": loaded.warnings,
        "view": loaded.view,
    })
}

pub fn status_json(run_metrics: Option<&RunMetrics>, statuses: &[ArtifactStatus]) -> Value {
    json!({
        "metrics": run_metrics,
        "artifacts": statuses,
    })
}
