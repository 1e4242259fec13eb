//! Artifact pipeline for the EarningsEdge evaluation dashboard.
//!
//! Loads the CSV/JSON artifacts an offline evaluation job exports per run
//! and turns them into a validated, ordered view model with KPI picks and
//! policy-versus-baseline deltas.

pub mod aggregate;
pub mod data;
pub mod error;
pub mod fetch;
pub mod logging;
pub mod pipeline;
pub mod report;
pub mod state;

pub use aggregate::{
    best_by, canonical_order, pairwise_delta, AggregateView, DeltaSpec, Direction, Favorable,
    PolicyDelta, Selection, DEFAULT_POLICY_ORDER,
};
pub use data::metrics::{parse_run_metrics, RunMetrics};
pub use data::summary::{normalize, Metric, SummaryRow};
pub use data::table::{parse_table, Cell, ParseWarning, ParsedDataset, Record};
pub use error::{DashboardError, Result};
pub use fetch::{
    ArtifactKind, ArtifactPresence, ArtifactSource, DirSource, HttpSource, MemorySource,
};
pub use pipeline::{
    load_metrics, load_optional_metrics, load_summary, probe_artifacts, LoadedSummary,
};
pub use state::{Config, RunContext, RunKey, RunSelector, ViewSlot};
