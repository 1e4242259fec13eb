//! Projection of parsed records onto the summary-table schema.

use serde::{Deserialize, Serialize};

use super::table::{parse_decimal, Cell, Record};

pub const SUMMARY_COLUMNS: [&str; 6] = [
    "policy",
    "n_episodes",
    "mean_final_equity",
    "median_final_equity",
    "mean_max_drawdown",
    "median_max_drawdown",
];

/// One policy's aggregate performance. NaN marks a field as not available
/// and serializes as `null`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryRow {
    pub policy: String,
    pub n_episodes: f64,
    pub mean_final_equity: f64,
    pub median_final_equity: f64,
    pub mean_max_drawdown: f64,
    pub median_max_drawdown: f64,
}

impl SummaryRow {
    /// All numeric fields unavailable.
    pub fn unavailable(policy: &str) -> Self {
        Self {
            policy: policy.to_string(),
            n_episodes: f64::NAN,
            mean_final_equity: f64::NAN,
            median_final_equity: f64::NAN,
            mean_max_drawdown: f64::NAN,
            median_max_drawdown: f64::NAN,
        }
    }

    /// Integer episode count, when the field is a finite non-negative number.
    pub fn episodes(&self) -> Option<u64> {
        if self.n_episodes.is_finite() && self.n_episodes >= 0.0 {
            Some(self.n_episodes.round() as u64)
        } else {
            None
        }
    }

    pub fn get(&self, metric: Metric) -> f64 {
        metric.value(self)
    }

    pub fn is_available(&self, metric: Metric) -> bool {
        metric.value(self).is_finite()
    }

    /// Columns whose value failed coercion.
    pub fn coercion_gaps(&self) -> Vec<&'static str> {
        Metric::ALL
            .iter()
            .filter(|m| !self.is_available(**m))
            .map(|m| m.column())
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Episodes,
    MeanFinalEquity,
    MedianFinalEquity,
    MeanMaxDrawdown,
    MedianMaxDrawdown,
}

impl Metric {
    pub const ALL: [Metric; 5] = [
        Metric::Episodes,
        Metric::MeanFinalEquity,
        Metric::MedianFinalEquity,
        Metric::MeanMaxDrawdown,
        Metric::MedianMaxDrawdown,
    ];

    /// The real-valued performance fields, in table order.
    pub const PERFORMANCE: [Metric; 4] = [
        Metric::MeanFinalEquity,
        Metric::MedianFinalEquity,
        Metric::MeanMaxDrawdown,
        Metric::MedianMaxDrawdown,
    ];

    pub fn column(&self) -> &'static str {
        match self {
            Metric::Episodes => "n_episodes",
            Metric::MeanFinalEquity => "mean_final_equity",
            Metric::MedianFinalEquity => "median_final_equity",
            Metric::MeanMaxDrawdown => "mean_max_drawdown",
            Metric::MedianMaxDrawdown => "median_max_drawdown",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Metric::Episodes => "Episodes",
            Metric::MeanFinalEquity => "Mean Final Equity",
            Metric::MedianFinalEquity => "Median Final Equity",
            Metric::MeanMaxDrawdown => "Mean Max Drawdown",
            Metric::MedianMaxDrawdown => "Median Max Drawdown",
        }
    }

    pub fn value(&self, row: &SummaryRow) -> f64 {
        match self {
            Metric::Episodes => row.n_episodes,
            Metric::MeanFinalEquity => row.mean_final_equity,
            Metric::MedianFinalEquity => row.median_final_equity,
            Metric::MeanMaxDrawdown => row.mean_max_drawdown,
            Metric::MedianMaxDrawdown => row.median_max_drawdown,
        }
    }
}

/// Explicit numeric coercion, independent of what inference produced.
///
/// Missing and empty cells coerce to NaN rather than zero.
pub fn coerce_number(cell: Option<&Cell>) -> f64 {
    let n = match cell {
        Some(Cell::Number(n)) => *n,
        Some(Cell::Bool(true)) => 1.0,
        Some(Cell::Bool(false)) => 0.0,
        Some(Cell::Text(s)) => parse_decimal(s.trim()).unwrap_or(f64::NAN),
        Some(Cell::Empty) | None => f64::NAN,
    };
    if n.is_finite() {
        n
    } else {
        f64::NAN
    }
}

/// String identity of a cell. Numbers drop a trailing `.0`.
pub fn coerce_policy(cell: Option<&Cell>) -> String {
    match cell {
        Some(Cell::Text(s)) => s.clone(),
        Some(Cell::Number(n)) if n.fract() == 0.0 && n.abs() < 1e15 => format!("{}", *n as i64),
        Some(Cell::Number(n)) => n.to_string(),
        Some(Cell::Bool(b)) => b.to_string(),
        Some(Cell::Empty) | None => String::new(),
    }
}

pub fn normalize_record(record: &Record) -> SummaryRow {
    SummaryRow {
        policy: coerce_policy(record.get("policy")),
        n_episodes: coerce_number(record.get("n_episodes")),
        mean_final_equity: coerce_number(record.get("mean_final_equity")),
        median_final_equity: coerce_number(record.get("median_final_equity")),
        mean_max_drawdown: coerce_number(record.get("mean_max_drawdown")),
        median_max_drawdown: coerce_number(record.get("median_max_drawdown")),
    }
}

/// One output row per input record, in input order.
pub fn normalize(records: &[Record]) -> Vec<SummaryRow> {
    records.iter().map(normalize_record).collect()
}
