//! Load sequences: fetch → parse → normalize → aggregate.
//!
//! Each call works only on the [`RunContext`] it is handed and owns every
//! intermediate value; nothing is cached between calls.

use serde::Serialize;
use serde_json::json;

use crate::aggregate::{AggregateView, DeltaSpec};
use crate::data::metrics::{parse_run_metrics, RunMetrics};
use crate::data::summary::normalize;
use crate::data::table::{parse_table, ParseWarning};
use crate::data::{quality_report, DataQualityReport};
use crate::error::Result;
use crate::fetch::{ArtifactKind, ArtifactPresence, ArtifactSource};
use crate::logging::{log, log_coercion_gap, log_parse_warnings, obj, v_str, Domain, Level};
use crate::state::{RunContext, RunSelector, ViewSlot};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoadedSummary {
    pub context: RunContext,
    pub url: String,
    pub sha256: String,
    pub warnings: Vec<ParseWarning>,
    pub quality: QualitySummary,
    pub view: AggregateView,
}

/// Serializable subset of the quality report kept with a load.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QualitySummary {
    pub rows: usize,
    pub warnings: usize,
    pub schema_ok: bool,
    pub missing_columns: Vec<String>,
}

impl From<DataQualityReport> for QualitySummary {
    fn from(q: DataQualityReport) -> Self {
        Self {
            rows: q.rows,
            warnings: q.warnings,
            schema_ok: q.schema.ok,
            missing_columns: q.schema.missing,
        }
    }
}

pub async fn load_summary(
    source: &dyn ArtifactSource,
    ctx: &RunContext,
    priority: &[&str],
    spec: &DeltaSpec,
) -> Result<LoadedSummary> {
    let location = ctx.artifact_path(ArtifactKind::SummaryTable);
    let text = source.fetch(&location).await?;

    let parsed = parse_table(&text.body);
    log_parse_warnings(&text.url, &parsed.warnings);
    let quality = quality_report(&parsed);
    if !quality.schema.ok {
        log(
            Level::Warn,
            Domain::Parse,
            "schema_mismatch",
            obj(&[
                ("url", v_str(&text.url)),
                ("msg", v_str(&quality.schema.message)),
            ]),
        );
    }

    let rows = normalize(&parsed.records);
    for row in &rows {
        let gaps = row.coercion_gaps();
        if !gaps.is_empty() {
            log_coercion_gap(&row.policy, &gaps);
        }
    }

    let view = AggregateView::build(&rows, priority, spec);
    log(
        Level::Info,
        Domain::Aggregate,
        "summary_view",
        obj(&[
            ("run", v_str(ctx.run.as_str())),
            ("rows", json!(view.rows.len())),
            ("has_delta", json!(view.delta.is_some())),
        ]),
    );

    Ok(LoadedSummary {
        context: ctx.clone(),
        url: text.url,
        sha256: text.sha256,
        warnings: parsed.warnings,
        quality: quality.into(),
        view,
    })
}

pub async fn load_metrics(source: &dyn ArtifactSource, ctx: &RunContext) -> Result<RunMetrics> {
    let location = ctx.artifact_path(ArtifactKind::RunMetrics);
    let text = source.fetch(&location).await?;
    parse_run_metrics(&text.body)
}

/// Metrics for views that can do without them. Any failure, including an
/// unparsable document, is logged and yields `None`.
pub async fn load_optional_metrics(
    source: &dyn ArtifactSource,
    ctx: &RunContext,
) -> Option<RunMetrics> {
    match load_metrics(source, ctx).await {
        Ok(m) => Some(m),
        Err(err) => {
            log(
                Level::Warn,
                Domain::Parse,
                "metrics_unavailable",
                obj(&[
                    ("run", v_str(ctx.run.as_str())),
                    ("msg", v_str(&err.to_string())),
                ]),
            );
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArtifactStatus {
    pub kind: ArtifactKind,
    pub location: String,
    pub presence: ArtifactPresence,
}

/// Presence of every known artifact for the run. A probe that fails in
/// transport counts as missing.
pub async fn probe_artifacts(source: &dyn ArtifactSource, ctx: &RunContext) -> Vec<ArtifactStatus> {
    let mut out = Vec::with_capacity(ArtifactKind::ALL.len());
    for kind in ArtifactKind::ALL {
        let location = ctx.artifact_path(kind);
        let presence = match source.probe(&location).await {
            Ok(p) => p,
            Err(err) => {
                log(
                    Level::Warn,
                    Domain::Fetch,
                    "probe_failed",
                    obj(&[
                        ("url", v_str(&location)),
                        ("msg", v_str(&err.to_string())),
                    ]),
                );
                ArtifactPresence::Missing
            }
        };
        out.push(ArtifactStatus {
            kind,
            location,
            presence,
        });
    }
    out
}

/// Run one summary load for a view and commit it if still current.
/// Returns whether the result was committed.
pub async fn load_summary_into(
    slot: &mut ViewSlot<LoadedSummary>,
    selector: &RunSelector,
    source: &dyn ArtifactSource,
    priority: &[&str],
    spec: &DeltaSpec,
) -> bool {
    let token = slot.begin(selector);
    let result = load_summary(source, &token.context, priority, spec).await;
    slot.commit(&token, result)
}
