//! Error taxonomy for the artifact pipeline.
//!
//! Only the fetch boundary produces hard errors. Parse warnings, coercion
//! gaps and undefined selections are carried as data in the view model.

/// Errors that stop one view's load sequence.
#[derive(Debug, thiserror::Error)]
pub enum DashboardError {
    #[error("artifact not found or mis-routed: {url} ({reason})")]
    ArtifactNotFound { url: String, reason: String },

    #[error("transport error fetching {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("invalid metrics document: {0}")]
    InvalidMetrics(String),

    #[error("unknown run: {0}")]
    UnknownRun(String),

    #[error("invalid artifact location: {0}")]
    InvalidLocation(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl DashboardError {
    pub fn not_found(url: impl Into<String>, reason: impl Into<String>) -> Self {
        DashboardError::ArtifactNotFound {
            url: url.into(),
            reason: reason.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, DashboardError::ArtifactNotFound { .. })
    }
}

pub type Result<T> = std::result::Result<T, DashboardError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_display_names_url_and_reason() {
        let err = DashboardError::not_found("/artifacts/sprint4/summary_table.csv", "html body");
        let msg = err.to_string();
        assert!(msg.contains("summary_table.csv"));
        assert!(msg.contains("html body"));
        assert!(err.is_not_found());
    }

    #[test]
    fn unknown_run_is_not_a_missing_artifact() {
        let err = DashboardError::UnknownRun("sprint9".to_string());
        assert!(!err.is_not_found());
        assert!(err.to_string().contains("sprint9"));
    }
}
