//! Artifact retrieval.
//!
//! A missing file can show up either as a failing status or as a static
//! host answering `200` with its HTML fallback page. Every source reads the
//! whole body and runs it through [`classify_response`], which rejects both.

pub mod dir;
pub mod http;
pub mod memory;

use async_trait::async_trait;
use serde::Serialize;

use crate::data::sha256_hex;
use crate::error::{DashboardError, Result};
use crate::logging::{log_fetch, log_fetch_failed, log_probe};

pub use dir::DirSource;
pub use http::HttpSource;
pub use memory::MemorySource;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    SummaryTable,
    RunMetrics,
    FailureBreakdown,
}

impl ArtifactKind {
    pub const ALL: [ArtifactKind; 3] = [
        ArtifactKind::SummaryTable,
        ArtifactKind::RunMetrics,
        ArtifactKind::FailureBreakdown,
    ];

    pub fn file_name(&self) -> &'static str {
        match self {
            ArtifactKind::SummaryTable => "summary_table.csv",
            ArtifactKind::RunMetrics => "metrics.json",
            ArtifactKind::FailureBreakdown => "symbol_failure_summary.csv",
        }
    }
}

/// Full body of a fetch that passed classification.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArtifactText {
    pub url: String,
    pub content_type: Option<String>,
    #[serde(skip)]
    pub body: String,
    pub sha256: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactPresence {
    Present,
    Missing,
}

impl ArtifactPresence {
    pub fn is_present(&self) -> bool {
        matches!(self, ArtifactPresence::Present)
    }
}

/// Where artifacts come from. `location` is a root-relative path such as
/// `/artifacts/sprint4/summary_table.csv`.
#[async_trait]
pub trait ArtifactSource: Send + Sync {
    /// Single attempt; no retries.
    async fn fetch(&self, location: &str) -> Result<ArtifactText>;

    /// Presence check that does not download the body.
    async fn probe(&self, location: &str) -> Result<ArtifactPresence>;
}

/// Leading `<!doctype` or `<html`, ignoring case and leading whitespace.
pub fn looks_like_html(body: &str) -> bool {
    let body = body.strip_prefix('\u{feff}').unwrap_or(body);
    let head: String = body.trim_start().chars().take(9).collect::<String>().to_ascii_lowercase();
    head.starts_with("<!doctype") || head.starts_with("<html")
}

pub fn is_html_content_type(content_type: Option<&str>) -> bool {
    content_type
        .map(|ct| ct.to_ascii_lowercase().contains("text/html"))
        .unwrap_or(false)
}

/// Decide whether a fully read response is the requested artifact.
pub fn classify_response(
    url: &str,
    status: u16,
    content_type: Option<&str>,
    body: String,
) -> Result<ArtifactText> {
    if !(200..300).contains(&status) {
        return Err(DashboardError::not_found(url, format!("status {}", status)));
    }
    if looks_like_html(&body) || is_html_content_type(content_type) {
        return Err(DashboardError::not_found(
            url,
            "returned HTML (was the artifact exported?)",
        ));
    }
    Ok(ArtifactText {
        url: url.to_string(),
        content_type: content_type.map(str::to_string),
        sha256: sha256_hex(body.as_bytes()),
        body,
    })
}

/// Presence from response metadata alone.
pub fn classify_probe(status: u16, content_type: Option<&str>) -> ArtifactPresence {
    if (200..300).contains(&status) && !is_html_content_type(content_type) {
        ArtifactPresence::Present
    } else {
        ArtifactPresence::Missing
    }
}

/// Content type implied by a file extension.
pub fn content_type_for(location: &str) -> Option<&'static str> {
    let ext = location.rsplit_once('.').map(|(_, e)| e.to_ascii_lowercase())?;
    match ext.as_str() {
        "csv" => Some("text/csv"),
        "json" => Some("application/json"),
        "html" | "htm" => Some("text/html"),
        _ => None,
    }
}

/// Url and reason a failed fetch is logged under.
fn failure_fields<'a>(location: &'a str, err: &'a DashboardError) -> (&'a str, String) {
    match err {
        DashboardError::ArtifactNotFound { url, reason } => (url.as_str(), reason.clone()),
        DashboardError::Transport { url, source } => (url.as_str(), source.to_string()),
        other => (location, other.to_string()),
    }
}

fn record_fetch(location: &str, result: Result<ArtifactText>) -> Result<ArtifactText> {
    match &result {
        Ok(text) => log_fetch(&text.url, text.body.len(), &text.sha256),
        Err(err) => {
            let (url, reason) = failure_fields(location, err);
            log_fetch_failed(url, &reason);
        }
    }
    result
}

fn record_probe(url: &str, presence: ArtifactPresence) -> ArtifactPresence {
    log_probe(url, presence.is_present());
    presence
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn html_signatures_are_detected() {
        assert!(looks_like_html("<!doctype html><html></html>"));
        assert!(looks_like_html("  \n\t<!DOCTYPE html>"));
        assert!(looks_like_html("<HTML lang=\"en\">"));
        assert!(!looks_like_html("policy,n_episodes\n"));
        assert!(!looks_like_html("{\"timesteps\": 1}"));
        assert!(!looks_like_html(""));
    }

    #[test]
    fn html_body_with_success_status_is_not_found() {
        let err = classify_response(
            "/a/summary_table.csv",
            200,
            Some("text/csv"),
            "<!doctype html>".into(),
        )
        .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn byte_order_mark_does_not_hide_html() {
        assert!(looks_like_html("\u{feff}<!doctype html><html></html>"));
        assert!(looks_like_html("\u{feff}  <html>"));
        let err = classify_response(
            "/a/summary_table.csv",
            200,
            Some("text/csv"),
            "\u{feff}<!doctype html>\n<html></html>".into(),
        )
        .unwrap_err();
        assert!(err.is_not_found());
        assert!(!looks_like_html("\u{feff}policy,n_episodes\n"));
    }

    #[test]
    fn failures_are_logged_under_their_location() {
        let io = DashboardError::Io(std::io::Error::new(std::io::ErrorKind::Other, "disk"));
        let (url, reason) = failure_fields("/artifacts/sprint4/metrics.json", &io);
        assert_eq!(url, "/artifacts/sprint4/metrics.json");
        assert!(reason.contains("disk"));

        let missing = DashboardError::not_found("http://h/a.csv", "status 404");
        let (url, reason) = failure_fields("/a.csv", &missing);
        assert_eq!(url, "http://h/a.csv");
        assert_eq!(reason, "status 404");
    }

    #[test]
    fn html_content_type_is_not_found() {
        let err = classify_response(
            "/a/summary_table.csv",
            200,
            Some("text/html; charset=utf-8"),
            "policy\nppo\n".into(),
        )
        .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn failing_status_is_not_found() {
        let err = classify_response("/a/metrics.json", 404, None, "{}".into()).unwrap_err();
        assert!(err.to_string().contains("status 404"));
    }

    #[test]
    fn good_response_carries_digest() {
        let text =
            classify_response("/a/metrics.json", 200, Some("application/json"), "{}".into())
                .unwrap();
        assert_eq!(text.body, "{}");
        assert_eq!(text.sha256, sha256_hex(b"{}"));
        assert_eq!(text.content_type.as_deref(), Some("application/json"));
    }

    #[test]
    fn probe_classification() {
        assert_eq!(classify_probe(200, Some("text/csv")), ArtifactPresence::Present);
        assert_eq!(classify_probe(200, None), ArtifactPresence::Present);
        assert_eq!(classify_probe(200, Some("text/html")), ArtifactPresence::Missing);
        assert_eq!(classify_probe(404, Some("text/csv")), ArtifactPresence::Missing);
    }

    #[test]
    fn content_types_from_extension() {
        assert_eq!(content_type_for("/x/summary_table.csv"), Some("text/csv"));
        assert_eq!(content_type_for("/x/metrics.JSON"), Some("application/json"));
        assert_eq!(content_type_for("/x/index.html"), Some("text/html"));
        assert_eq!(content_type_for("/x/README"), None);
    }

    #[test]
    fn artifact_file_names() {
        assert_eq!(ArtifactKind::SummaryTable.file_name(), "summary_table.csv");
        assert_eq!(ArtifactKind::RunMetrics.file_name(), "metrics.json");
        assert_eq!(
            ArtifactKind::FailureBreakdown.file_name(),
            "symbol_failure_summary.csv"
        );
    }
}
