//! Reader for the run-level `metrics.json` document.
//!
//! Producers have used more than one key for the same quantity. Each logical
//! field is resolved through [`METRIC_ALIASES`]; the first alias holding a
//! usable value wins.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{DashboardError, Result};

pub const DEFAULT_PRIMARY_METRIC: &str = "final_equity";
pub const DEFAULT_CONSTRAINT: &str = "drawdown-aware";

/// Accepted keys for one logical field, highest priority first.
#[derive(Debug, Clone, Copy)]
pub struct FieldAliases {
    pub field: &'static str,
    pub aliases: &'static [&'static str],
}

pub const TIMESTEPS: FieldAliases = FieldAliases {
    field: "timesteps",
    aliases: &["timesteps", "total_timesteps"],
};
pub const EPISODES: FieldAliases = FieldAliases {
    field: "n_episodes",
    aliases: &["n_episodes", "episodes"],
};
pub const PRIMARY_METRIC: FieldAliases = FieldAliases {
    field: "primary_metric",
    aliases: &["primary_metric", "metric"],
};
pub const CONSTRAINT: FieldAliases = FieldAliases {
    field: "constraint",
    aliases: &["constraint"],
};

pub const METRIC_ALIASES: [FieldAliases; 4] = [TIMESTEPS, EPISODES, PRIMARY_METRIC, CONSTRAINT];

impl FieldAliases {
    fn is_alias(&self, key: &str) -> bool {
        self.aliases.contains(&key)
    }

    /// First non-null value across the aliases.
    pub fn lookup<'a>(&self, doc: &'a Map<String, Value>) -> Option<&'a Value> {
        self.aliases
            .iter()
            .filter_map(|k| doc.get(*k))
            .find(|v| !v.is_null())
    }

    pub fn number(&self, doc: &Map<String, Value>) -> Option<f64> {
        self.aliases
            .iter()
            .filter_map(|k| doc.get(*k))
            .find_map(value_as_number)
    }

    pub fn text(&self, doc: &Map<String, Value>) -> Option<String> {
        self.aliases
            .iter()
            .filter_map(|k| doc.get(*k))
            .find_map(|v| match v {
                Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
    }
}

fn value_as_number(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64().filter(|x| x.is_finite()),
        Value::String(s) => crate::data::table::parse_decimal(s.trim()),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunMetrics {
    pub timesteps: Option<f64>,
    pub n_episodes: Option<f64>,
    pub primary_metric: String,
    pub constraint: String,
    /// Keys that are not aliases of a known field.
    pub extra: Map<String, Value>,
}

pub fn parse_run_metrics(text: &str) -> Result<RunMetrics> {
    let value: Value = serde_json::from_str(text)
        .map_err(|e| DashboardError::InvalidMetrics(e.to_string()))?;
    let doc = match value {
        Value::Object(map) => map,
        other => {
            return Err(DashboardError::InvalidMetrics(format!(
                "expected a JSON object, got {}",
                json_kind(&other)
            )))
        }
    };
    Ok(run_metrics_from_map(&doc))
}

pub fn run_metrics_from_map(doc: &Map<String, Value>) -> RunMetrics {
    let extra = doc
        .iter()
        .filter(|(k, _)| !METRIC_ALIASES.iter().any(|a| a.is_alias(k)))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    RunMetrics {
        timesteps: TIMESTEPS.number(doc),
        n_episodes: EPISODES.number(doc),
        primary_metric: PRIMARY_METRIC
            .text(doc)
            .unwrap_or_else(|| DEFAULT_PRIMARY_METRIC.to_string()),
        constraint: CONSTRAINT
            .text(doc)
            .unwrap_or_else(|| DEFAULT_CONSTRAINT.to_string()),
        extra,
    }
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primary_keys_are_read() {
        let m = parse_run_metrics(
            r#"{"timesteps": 500000, "n_episodes": 200, "primary_metric": "sharpe", "constraint": "none"}"#,
        )
        .unwrap();
        assert_eq!(m.timesteps, Some(500000.0));
        assert_eq!(m.n_episodes, Some(200.0));
        assert_eq!(m.primary_metric, "sharpe");
        assert_eq!(m.constraint, "none");
        assert!(m.extra.is_empty());
    }

    #[test]
    fn fallback_aliases_are_used() {
        let m = parse_run_metrics(
            r#"{"total_timesteps": "1000000", "episodes": 64, "metric": "median_equity"}"#,
        )
        .unwrap();
        assert_eq!(m.timesteps, Some(1_000_000.0));
        assert_eq!(m.n_episodes, Some(64.0));
        assert_eq!(m.primary_metric, "median_equity");
    }

    #[test]
    fn null_falls_through_to_next_alias() {
        let raw = r#"{"timesteps": null, "total_timesteps": 42}"#;
        let m = parse_run_metrics(raw).unwrap();
        assert_eq!(m.timesteps, Some(42.0));
        let doc: Map<String, Value> = serde_json::from_str(raw).unwrap();
        assert_eq!(TIMESTEPS.lookup(&doc), Some(&Value::from(42)));
    }

    #[test]
    fn defaults_apply_when_labels_missing() {
        let m = parse_run_metrics(r#"{"seed": 7}"#).unwrap();
        assert_eq!(m.timesteps, None);
        assert_eq!(m.n_episodes, None);
        assert_eq!(m.primary_metric, DEFAULT_PRIMARY_METRIC);
        assert_eq!(m.constraint, DEFAULT_CONSTRAINT);
        assert_eq!(m.extra.get("seed"), Some(&Value::from(7)));
    }

    #[test]
    fn non_object_is_rejected() {
        let err = parse_run_metrics("[1, 2]").unwrap_err();
        assert!(err.to_string().contains("array"));
        assert!(parse_run_metrics("<!doctype html>").is_err());
    }
}
