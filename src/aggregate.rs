//! Derived views over normalized summary rows.
//!
//! Everything here is a pure function of its inputs. An [`AggregateView`] is
//! rebuilt whenever the row set changes; nothing is patched in place.

use serde::Serialize;
use std::collections::HashSet;

use crate::data::summary::{Metric, SummaryRow};
use crate::logging::log_duplicate_policy;

pub const DEFAULT_POLICY_ORDER: [&str; 4] = ["ppo", "buy_hold", "avoid_earnings", "flat"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Max,
    Min,
}

impl Direction {
    fn improves(&self, candidate: f64, incumbent: f64) -> bool {
        match self {
            Direction::Max => candidate > incumbent,
            Direction::Min => candidate < incumbent,
        }
    }
}

/// Which sign of a delta reads as good. Supplied by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Favorable {
    Positive,
    Negative,
}

/// Result of a best-of selection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Selection<'a> {
    Winner { row: &'a SummaryRow, value: f64 },
    /// No candidate had a finite value.
    Undefined,
}

impl<'a> Selection<'a> {
    pub fn row(&self) -> Option<&'a SummaryRow> {
        match self {
            Selection::Winner { row, .. } => Some(row),
            Selection::Undefined => None,
        }
    }

    pub fn policy(&self) -> Option<&'a str> {
        self.row().map(|r| r.policy.as_str())
    }

    pub fn value(&self) -> Option<f64> {
        match self {
            Selection::Winner { value, .. } => Some(*value),
            Selection::Undefined => None,
        }
    }
}

/// Stable ordering: listed policies first in list order, the rest after in
/// input order.
pub fn canonical_order(rows: &[SummaryRow], priority: &[&str]) -> Vec<SummaryRow> {
    let mut out = rows.to_vec();
    out.sort_by_key(|r| {
        priority
            .iter()
            .position(|p| *p == r.policy)
            .unwrap_or(priority.len())
    });
    out
}

/// Most favorable finite value of `metric`. Non-finite values never win;
/// on ties the earliest row is kept.
pub fn best_by(rows: &[SummaryRow], metric: Metric, direction: Direction) -> Selection<'_> {
    let mut best: Option<(&SummaryRow, f64)> = None;
    for row in rows {
        let v = metric.value(row);
        if !v.is_finite() {
            continue;
        }
        match best {
            Some((_, incumbent)) if !direction.improves(v, incumbent) => {}
            _ => best = Some((row, v)),
        }
    }
    match best {
        Some((row, value)) => Selection::Winner { row, value },
        None => Selection::Undefined,
    }
}

/// First row carrying `policy`.
pub fn find_policy<'a>(rows: &'a [SummaryRow], policy: &str) -> Option<&'a SummaryRow> {
    rows.iter().find(|r| r.policy == policy)
}

/// Keep the first occurrence of each policy; returns the dropped identities.
pub fn dedupe_first(rows: &[SummaryRow]) -> (Vec<SummaryRow>, Vec<String>) {
    let mut seen = HashSet::new();
    let mut kept = Vec::with_capacity(rows.len());
    let mut dropped = Vec::new();
    for row in rows {
        if seen.insert(row.policy.as_str()) {
            kept.push(row.clone());
        } else {
            dropped.push(row.policy.clone());
        }
    }
    (kept, dropped)
}

// =============================================================================
// Pairwise deltas
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeltaSpec {
    pub subject: String,
    pub baseline: String,
    pub tags: Vec<(Metric, Favorable)>,
}

impl DeltaSpec {
    pub fn new(subject: &str, baseline: &str) -> Self {
        Self {
            subject: subject.to_string(),
            baseline: baseline.to_string(),
            tags: Vec::new(),
        }
    }

    pub fn favor(mut self, metric: Metric, favorable: Favorable) -> Self {
        self.tags.retain(|(m, _)| *m != metric);
        self.tags.push((metric, favorable));
        self
    }

    /// Learned policy against buy-and-hold: more equity is good, less
    /// drawdown is good.
    pub fn ppo_vs_buy_hold() -> Self {
        Self::new("ppo", "buy_hold")
            .favor(Metric::MeanFinalEquity, Favorable::Positive)
            .favor(Metric::MedianFinalEquity, Favorable::Positive)
            .favor(Metric::MeanMaxDrawdown, Favorable::Negative)
            .favor(Metric::MedianMaxDrawdown, Favorable::Negative)
    }

    fn tag(&self, metric: Metric) -> Option<Favorable> {
        self.tags.iter().find(|(m, _)| *m == metric).map(|(_, f)| *f)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricDelta {
    pub metric: Metric,
    /// subject minus baseline; NaN when either side is unavailable
    pub value: f64,
    pub favorable: Option<Favorable>,
}

impl MetricDelta {
    /// `None` when the value is unavailable or the caller gave no tag.
    pub fn is_favorable(&self) -> Option<bool> {
        if !self.value.is_finite() {
            return None;
        }
        self.favorable.map(|f| match f {
            Favorable::Positive => self.value >= 0.0,
            Favorable::Negative => self.value <= 0.0,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PolicyDelta {
    pub subject: String,
    pub baseline: String,
    pub deltas: Vec<MetricDelta>,
}

impl PolicyDelta {
    pub fn get(&self, metric: Metric) -> Option<&MetricDelta> {
        self.deltas.iter().find(|d| d.metric == metric)
    }
}

/// Subject-minus-baseline for the four performance fields. `None` if either
/// policy is absent.
pub fn pairwise_delta(rows: &[SummaryRow], spec: &DeltaSpec) -> Option<PolicyDelta> {
    let subject = find_policy(rows, &spec.subject)?;
    let baseline = find_policy(rows, &spec.baseline)?;
    let deltas = Metric::PERFORMANCE
        .iter()
        .map(|m| {
            let value = m.value(subject) - m.value(baseline);
            MetricDelta {
                metric: *m,
                value: if value.is_finite() { value } else { f64::NAN },
                favorable: spec.tag(*m),
            }
        })
        .collect();
    Some(PolicyDelta {
        subject: spec.subject.clone(),
        baseline: spec.baseline.clone(),
        deltas,
    })
}

// =============================================================================
// KPI cards
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct KpiSpec {
    pub title: &'static str,
    pub metric: Metric,
    pub direction: Direction,
}

pub const DEFAULT_KPIS: [KpiSpec; 4] = [
    KpiSpec {
        title: "Best Mean Final Equity",
        metric: Metric::MeanFinalEquity,
        direction: Direction::Max,
    },
    KpiSpec {
        title: "Best Median Final Equity",
        metric: Metric::MedianFinalEquity,
        direction: Direction::Max,
    },
    KpiSpec {
        title: "Lowest Mean Max Drawdown",
        metric: Metric::MeanMaxDrawdown,
        direction: Direction::Min,
    },
    KpiSpec {
        title: "Lowest Median Max Drawdown",
        metric: Metric::MedianMaxDrawdown,
        direction: Direction::Min,
    },
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KpiWinner {
    pub policy: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Kpi {
    pub title: &'static str,
    pub metric: Metric,
    pub direction: Direction,
    /// `None` renders as an explicit "N/A" card.
    pub winner: Option<KpiWinner>,
}

pub fn kpis(rows: &[SummaryRow], specs: &[KpiSpec]) -> Vec<Kpi> {
    specs
        .iter()
        .map(|s| Kpi {
            title: s.title,
            metric: s.metric,
            direction: s.direction,
            winner: match best_by(rows, s.metric, s.direction) {
                Selection::Winner { row, value } => Some(KpiWinner {
                    policy: row.policy.clone(),
                    value,
                }),
                Selection::Undefined => None,
            },
        })
        .collect()
}

// =============================================================================
// Aggregate view
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateView {
    /// Deduplicated rows in canonical display order.
    pub rows: Vec<SummaryRow>,
    pub kpis: Vec<Kpi>,
    pub delta: Option<PolicyDelta>,
    pub duplicates_dropped: Vec<String>,
}

impl AggregateView {
    pub fn build(rows: &[SummaryRow], priority: &[&str], spec: &DeltaSpec) -> Self {
        let (unique, dropped) = dedupe_first(rows);
        for policy in &dropped {
            log_duplicate_policy(policy);
        }
        Self {
            rows: canonical_order(&unique, priority),
            kpis: kpis(&unique, &DEFAULT_KPIS),
            delta: pairwise_delta(&unique, spec),
            duplicates_dropped: dropped,
        }
    }

    pub fn with_defaults(rows: &[SummaryRow]) -> Self {
        Self::build(rows, &DEFAULT_POLICY_ORDER, &DeltaSpec::ppo_vs_buy_hold())
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn kpi(&self, metric: Metric) -> Option<&Kpi> {
        self.kpis.iter().find(|k| k.metric == metric)
    }
}
