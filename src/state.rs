use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::error::{DashboardError, Result};
use crate::fetch::ArtifactKind;
use crate::logging::{log_run_switch, log_stale_result};

#[derive(Clone, Debug)]
pub struct Config {
    /// Base URL (`http://…`) or local directory the artifact root hangs off.
    pub artifacts_base: String,
    /// Path prefix under which each run's directory lives.
    pub artifacts_root: String,
    pub default_run: RunKey,
    pub fetch_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            artifacts_base: "http://localhost:5173".to_string(),
            artifacts_root: "/artifacts".to_string(),
            default_run: RunKey::default(),
            fetch_timeout_secs: 10,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            artifacts_base: std::env::var("ARTIFACTS_BASE").unwrap_or(d.artifacts_base),
            artifacts_root: std::env::var("ARTIFACTS_ROOT").unwrap_or(d.artifacts_root),
            default_run: std::env::var("DEFAULT_RUN")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(d.default_run),
            fetch_timeout_secs: std::env::var("FETCH_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(d.fetch_timeout_secs),
        }
    }

    pub fn is_http(&self) -> bool {
        self.artifacts_base.starts_with("http://") || self.artifacts_base.starts_with("https://")
    }

    pub fn selector(&self) -> RunSelector {
        RunSelector::new(&self.artifacts_root, self.default_run)
    }
}

// =============================================================================
// Runs
// =============================================================================

/// A named snapshot of evaluation artifacts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunKey {
    #[default]
    Sprint4,
    Sprint5,
}

impl RunKey {
    pub const ALL: [RunKey; 2] = [RunKey::Sprint4, RunKey::Sprint5];

    pub fn as_str(&self) -> &'static str {
        match self {
            RunKey::Sprint4 => "sprint4",
            RunKey::Sprint5 => "sprint5",
        }
    }
}

impl fmt::Display for RunKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RunKey {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self> {
        RunKey::ALL
            .into_iter()
            .find(|r| r.as_str() == s.trim())
            .ok_or_else(|| DashboardError::UnknownRun(s.to_string()))
    }
}

/// The run a load sequence works against, passed explicitly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunContext {
    pub run: RunKey,
    pub content_root: String,
}

impl RunContext {
    pub fn new(artifacts_root: &str, run: RunKey) -> Self {
        Self {
            run,
            content_root: format!("{}/{}", artifacts_root.trim_end_matches('/'), run),
        }
    }

    pub fn artifact_path(&self, kind: ArtifactKind) -> String {
        format!("{}/{}", self.content_root, kind.file_name())
    }
}

// =============================================================================
// Generations
// =============================================================================

/// Shared monotonic counter. Advancing it makes every earlier stamp stale.
#[derive(Debug, Clone, Default)]
pub struct Generation(Arc<AtomicU64>);

impl Generation {
    pub fn current(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }

    pub fn advance(&self) -> u64 {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn stamp(&self) -> Stamp {
        Stamp {
            counter: self.clone(),
            at: self.current(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Stamp {
    counter: Generation,
    at: u64,
}

impl Stamp {
    pub fn at(&self) -> u64 {
        self.at
    }

    pub fn is_current(&self) -> bool {
        self.counter.current() == self.at
    }
}

/// Issued when a load starts; a result is committed only while it is current.
#[derive(Debug, Clone)]
pub struct LoadToken {
    pub context: RunContext,
    run: Stamp,
    view: Stamp,
}

impl LoadToken {
    pub fn is_current(&self) -> bool {
        self.run.is_current() && self.view.is_current()
    }
}

// =============================================================================
// Run selector
// =============================================================================

/// Owns the active run. Switching runs advances the generation, which
/// invalidates every load started under the previous run and every result
/// committed under it. Not `Clone`: there is exactly one owner of the active
/// run, and views see its generation only through the stamps they hold.
#[derive(Debug)]
pub struct RunSelector {
    run: RunKey,
    artifacts_root: String,
    generation: Generation,
}

impl Default for RunSelector {
    fn default() -> Self {
        Self::new("/artifacts", RunKey::default())
    }
}

impl RunSelector {
    pub fn new(artifacts_root: &str, run: RunKey) -> Self {
        Self {
            run,
            artifacts_root: artifacts_root.to_string(),
            generation: Generation::default(),
        }
    }

    pub fn run(&self) -> RunKey {
        self.run
    }

    pub fn generation(&self) -> u64 {
        self.generation.current()
    }

    /// Returns `true` when the active run changed.
    pub fn select(&mut self, run: RunKey) -> bool {
        if run == self.run {
            return false;
        }
        let previous = self.run;
        self.run = run;
        let generation = self.generation.advance();
        log_run_switch(previous.as_str(), run.as_str(), generation);
        true
    }

    pub fn content_root(&self) -> String {
        self.context().content_root
    }

    pub fn context(&self) -> RunContext {
        RunContext::new(&self.artifacts_root, self.run)
    }
}

// =============================================================================
// Per-view load state
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum LoadState<T> {
    Idle,
    Loading,
    Ready(T),
    Failed(String),
}

/// One view's slot. Owns its loaded data; nothing is shared across views.
#[derive(Debug)]
pub struct ViewSlot<T> {
    state: LoadState<T>,
    /// Run generation the current state belongs to.
    run: Option<Stamp>,
    generation: Generation,
}

impl<T> Default for ViewSlot<T> {
    fn default() -> Self {
        Self {
            state: LoadState::Idle,
            run: None,
            generation: Generation::default(),
        }
    }
}

impl<T> ViewSlot<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads as `Idle` once the run this state was loaded for is no longer
    /// active.
    pub fn state(&self) -> &LoadState<T> {
        if self.is_stale() {
            return &LoadState::Idle;
        }
        &self.state
    }

    pub fn ready(&self) -> Option<&T> {
        match self.state() {
            LoadState::Ready(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_stale(&self) -> bool {
        self.run.as_ref().is_some_and(|stamp| !stamp.is_current())
    }

    /// Start a load. Any earlier in-flight load for this view becomes stale,
    /// and previously loaded data is discarded.
    pub fn begin(&mut self, selector: &RunSelector) -> LoadToken {
        self.generation.advance();
        self.state = LoadState::Loading;
        let run = selector.generation.stamp();
        self.run = Some(run.clone());
        LoadToken {
            context: selector.context(),
            run,
            view: self.generation.stamp(),
        }
    }

    /// Returns `false` (and leaves the slot untouched) for a stale token.
    pub fn commit(&mut self, token: &LoadToken, result: Result<T>) -> bool {
        if !token.is_current() {
            let reason = if token.run.is_current() {
                "view_superseded"
            } else {
                "run_changed"
            };
            log_stale_result(reason, token.context.run.as_str());
            return false;
        }
        self.state = match result {
            Ok(v) => LoadState::Ready(v),
            Err(e) => LoadState::Failed(e.to_string()),
        };
        true
    }

    /// The view went away; late results are ignored.
    pub fn unmount(&mut self) {
        self.generation.advance();
        self.state = LoadState::Idle;
        self.run = None;
    }
}
