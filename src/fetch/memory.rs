use async_trait::async_trait;
use std::collections::HashMap;

use super::{classify_probe, classify_response, content_type_for, record_fetch, record_probe};
use super::{ArtifactPresence, ArtifactSource, ArtifactText};
use crate::error::Result;

#[derive(Debug, Clone)]
pub struct MemoryResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: String,
}

/// In-memory artifact host. Unknown locations answer `404`, or the HTML
/// fallback page when [`MemorySource::with_spa_fallback`] is set.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    responses: HashMap<String, MemoryResponse>,
    fallback: Option<MemoryResponse>,
}

const FALLBACK_PAGE: &str =
    "<!doctype html>\n<html lang=\"en\"><head><title>dashboard</title></head><body><div id=\"root\"></div></body></html>\n";

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `body` with a 200 and the content type implied by the extension.
    pub fn with_file(self, location: &str, body: &str) -> Self {
        let ct = content_type_for(location).map(str::to_string);
        self.with_response(location, 200, ct.as_deref(), body)
    }

    pub fn with_response(
        mut self,
        location: &str,
        status: u16,
        content_type: Option<&str>,
        body: &str,
    ) -> Self {
        self.responses.insert(
            location.to_string(),
            MemoryResponse {
                status,
                content_type: content_type.map(str::to_string),
                body: body.to_string(),
            },
        );
        self
    }

    /// Answer unknown locations the way a single-page-app dev server does.
    pub fn with_spa_fallback(mut self) -> Self {
        self.fallback = Some(MemoryResponse {
            status: 200,
            content_type: Some("text/html".to_string()),
            body: FALLBACK_PAGE.to_string(),
        });
        self
    }

    fn respond(&self, location: &str) -> MemoryResponse {
        self.responses
            .get(location)
            .or(self.fallback.as_ref())
            .cloned()
            .unwrap_or(MemoryResponse {
                status: 404,
                content_type: Some("text/plain".to_string()),
                body: "Not Found".to_string(),
            })
    }
}

#[async_trait]
impl ArtifactSource for MemorySource {
    async fn fetch(&self, location: &str) -> Result<ArtifactText> {
        let resp = self.respond(location);
        record_fetch(
            location,
            classify_response(
                location,
                resp.status,
                resp.content_type.as_deref(),
                resp.body,
            ),
        )
    }

    async fn probe(&self, location: &str) -> Result<ArtifactPresence> {
        let resp = self.respond(location);
        Ok(record_probe(
            location,
            classify_probe(resp.status, resp.content_type.as_deref()),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn serves_registered_files() {
        let src = MemorySource::new().with_file("/a/metrics.json", "{}");
        let text = src.fetch("/a/metrics.json").await.unwrap();
        assert_eq!(text.body, "{}");
        assert!(src.probe("/a/metrics.json").await.unwrap().is_present());
    }

    #[tokio::test]
    async fn unknown_location_is_not_found() {
        let src = MemorySource::new();
        assert!(src.fetch("/a/summary_table.csv").await.unwrap_err().is_not_found());
        assert_eq!(
            src.probe("/a/summary_table.csv").await.unwrap(),
            ArtifactPresence::Missing
        );
    }

    #[tokio::test]
    async fn spa_fallback_is_detected() {
        let src = MemorySource::new().with_spa_fallback();
        let err = src.fetch("/a/summary_table.csv").await.unwrap_err();
        assert!(err.is_not_found());
        assert!(!src.probe("/a/summary_table.csv").await.unwrap().is_present());
    }
}
