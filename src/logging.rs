//! Structured logging for the artifact pipeline.
//!
//! Every record is one JSON object per line on stderr with a monotonic
//! `seq`, an RFC3339 timestamp, a level and a domain. Setting `LOG_DIR`
//! additionally appends the same lines to `{LOG_DIR}/events.jsonl`.
//!
//! Filtering:
//! - `LOG_LEVEL` (trace, debug, info, warn, error; default info)
//! - `LOG_DOMAINS` (comma-separated list or "all")

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fs::{create_dir_all, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, OnceLock};

use crate::data::table::ParseWarning;

// =============================================================================
// Log Levels
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Trace = 0,
    Debug = 1,
    Info = 2,
    Warn = 3,
    Error = 4,
}

impl Level {
    pub fn from_env() -> Self {
        match std::env::var("LOG_LEVEL").as_deref() {
            Ok("trace") => Level::Trace,
            Ok("debug") => Level::Debug,
            Ok("info") => Level::Info,
            Ok("warn") => Level::Warn,
            Ok("error") => Level::Error,
            _ => Level::Info,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Trace => "trace",
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warn => "warn",
            Level::Error => "error",
        }
    }
}

// =============================================================================
// Log Domains (categories for filtering)
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    Fetch,     // Artifact retrieval and existence probes
    Parse,     // Delimited text parsing
    Normalize, // Schema projection, coercion gaps
    Aggregate, // Ordering, best-of, deltas
    Run,       // Run selection, load tokens
    System,    // Startup, configuration
}

impl Domain {
    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Fetch => "fetch",
            Domain::Parse => "parse",
            Domain::Normalize => "normalize",
            Domain::Aggregate => "aggregate",
            Domain::Run => "run",
            Domain::System => "system",
        }
    }

    pub fn is_enabled(&self) -> bool {
        match std::env::var("LOG_DOMAINS").as_deref() {
            Ok("all") | Err(_) => true,
            Ok(domains) => domains.split(',').any(|d| d.trim() == self.as_str()),
        }
    }
}

// =============================================================================
// Sinks
// =============================================================================

static LOG_SEQ: AtomicU64 = AtomicU64::new(0);
static EVENTS_FILE: OnceLock<Option<Mutex<BufWriter<File>>>> = OnceLock::new();

fn next_seq() -> u64 {
    LOG_SEQ.fetch_add(1, Ordering::SeqCst)
}

fn events_file() -> Option<&'static Mutex<BufWriter<File>>> {
    EVENTS_FILE
        .get_or_init(|| {
            let dir = PathBuf::from(std::env::var("LOG_DIR").ok()?);
            if let Err(err) = create_dir_all(&dir) {
                eprintln!("[log] failed to create log dir: {}", err);
                return None;
            }
            match OpenOptions::new()
                .create(true)
                .append(true)
                .open(dir.join("events.jsonl"))
            {
                Ok(file) => Some(Mutex::new(BufWriter::new(file))),
                Err(err) => {
                    eprintln!("[log] failed to open events log: {}", err);
                    None
                }
            }
        })
        .as_ref()
}

fn sanitize_fields(mut fields: Map<String, Value>) -> Map<String, Value> {
    let redacted = Value::String("[REDACTED]".to_string());
    for key in ["authorization", "Authorization", "cookie", "token"] {
        if fields.contains_key(key) {
            fields.insert(key.to_string(), redacted.clone());
        }
    }
    fields
}

fn split_fields(mut fields: Map<String, Value>) -> (Map<String, Value>, Map<String, Value>) {
    let mut top = Map::new();
    for key in ["run", "url", "artifact", "policy", "msg"] {
        if let Some(value) = fields.remove(key) {
            top.insert(key.to_string(), value);
        }
    }
    (top, fields)
}

// =============================================================================
// Core logging functions
// =============================================================================

/// RFC3339 timestamp with milliseconds
pub fn ts_now() -> String {
    Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

/// Emit a structured log entry
pub fn log(level: Level, domain: Domain, event: &str, fields: Map<String, Value>) {
    if level < Level::from_env() || !domain.is_enabled() {
        return;
    }
    let line = format_record(level, domain, event, fields);
    if let Some(file) = events_file() {
        if let Ok(mut w) = file.lock() {
            let _ = writeln!(w, "{}", line);
            let _ = w.flush();
        }
    }
    eprintln!("{}", line);
}

fn format_record(level: Level, domain: Domain, event: &str, fields: Map<String, Value>) -> String {
    let fields = sanitize_fields(fields);
    let (mut top, data) = split_fields(fields);

    let msg = top.remove("msg").unwrap_or(Value::String(String::new()));
    let mut entry = Map::new();
    entry.insert("ts".to_string(), json!(ts_now()));
    entry.insert("seq".to_string(), json!(next_seq()));
    entry.insert("lvl".to_string(), json!(level.as_str().to_uppercase()));
    entry.insert("component".to_string(), json!(domain.as_str()));
    entry.insert("event".to_string(), json!(event));
    entry.insert("msg".to_string(), msg);
    for (k, v) in top {
        entry.insert(k, v);
    }
    entry.insert("data".to_string(), Value::Object(data));
    Value::Object(entry).to_string()
}

// =============================================================================
// Domain-Specific Logging Helpers
// =============================================================================

pub fn log_fetch(url: &str, bytes: usize, sha256: &str) {
    log(
        Level::Info,
        Domain::Fetch,
        "fetched",
        obj(&[
            ("url", v_str(url)),
            ("bytes", json!(bytes)),
            ("sha256", v_str(sha256)),
        ]),
    );
}

pub fn log_fetch_failed(url: &str, reason: &str) {
    log(
        Level::Warn,
        Domain::Fetch,
        "fetch_failed",
        obj(&[("url", v_str(url)), ("reason", v_str(reason))]),
    );
}

pub fn log_probe(url: &str, present: bool) {
    log(
        Level::Debug,
        Domain::Fetch,
        "probe",
        obj(&[("url", v_str(url)), ("present", json!(present))]),
    );
}

/// Parse warnings are advisory; one record per load carries all of them.
pub fn log_parse_warnings(url: &str, warnings: &[ParseWarning]) {
    if warnings.is_empty() {
        return;
    }
    let items: Vec<Value> = warnings
        .iter()
        .map(|w| json!({"line": w.line, "kind": w.kind.as_str(), "message": w.message}))
        .collect();
    log(
        Level::Warn,
        Domain::Parse,
        "parse_warnings",
        obj(&[
            ("url", v_str(url)),
            ("count", json!(warnings.len())),
            ("warnings", Value::Array(items)),
        ]),
    );
}

pub fn log_coercion_gap(policy: &str, fields: &[&str]) {
    log(
        Level::Debug,
        Domain::Normalize,
        "coercion_gap",
        obj(&[
            ("policy", v_str(policy)),
            ("fields", Value::Array(fields.iter().map(|f| v_str(f)).collect())),
        ]),
    );
}

pub fn log_duplicate_policy(policy: &str) {
    log(
        Level::Warn,
        Domain::Aggregate,
        "duplicate_policy",
        obj(&[
            ("policy", v_str(policy)),
            ("msg", v_str("later occurrence dropped, first wins")),
        ]),
    );
}

pub fn log_run_switch(from: &str, to: &str, generation: u64) {
    log(
        Level::Info,
        Domain::Run,
        "run_selected",
        obj(&[
            ("run", v_str(to)),
            ("previous", v_str(from)),
            ("generation", json!(generation)),
        ]),
    );
}

pub fn log_stale_result(reason: &str, run: &str) {
    log(
        Level::Debug,
        Domain::Run,
        "stale_result_discarded",
        obj(&[("run", v_str(run)), ("reason", v_str(reason))]),
    );
}

// =============================================================================
// Utility Functions
// =============================================================================

pub fn obj(pairs: &[(&str, Value)]) -> Map<String, Value> {
    let mut map = Map::new();
    for (k, v) in pairs {
        map.insert((*k).to_string(), v.clone());
    }
    map
}

pub fn v_str(s: &str) -> Value {
    Value::String(s.to_string())
}

/// Non-finite numbers have no JSON form; they are logged as null.
pub fn v_num(n: f64) -> Value {
    json!(n)
}

// =============================================================================
// Tests
// =============================================================================
