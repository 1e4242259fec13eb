use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Response};
use std::time::Duration;
use url::Url;

use super::{classify_probe, classify_response, record_fetch, record_probe};
use super::{ArtifactPresence, ArtifactSource, ArtifactText};
use crate::error::{DashboardError, Result};

/// Artifacts served over HTTP from a static host.
pub struct HttpSource {
    client: Client,
    base: Url,
}

impl HttpSource {
    pub fn new(base: &str) -> Result<Self> {
        Self::with_timeout(base, 10)
    }

    pub fn with_timeout(base: &str, timeout_secs: u64) -> Result<Self> {
        let base = Url::parse(base)
            .map_err(|e| DashboardError::InvalidLocation(format!("{}: {}", base, e)))?;
        Ok(Self {
            client: Client::builder()
                .timeout(Duration::from_secs(timeout_secs))
                .build()
                .unwrap_or_else(|_| Client::new()),
            base,
        })
    }

    pub fn resolve(&self, location: &str) -> Result<Url> {
        self.base
            .join(location)
            .map_err(|e| DashboardError::InvalidLocation(format!("{}: {}", location, e)))
    }
}

fn content_type(resp: &Response) -> Option<String> {
    resp.headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

#[async_trait]
impl ArtifactSource for HttpSource {
    async fn fetch(&self, location: &str) -> Result<ArtifactText> {
        let url = self.resolve(location)?;
        let transport = |source| DashboardError::Transport {
            url: url.to_string(),
            source,
        };
        let resp = match self.client.get(url.clone()).send().await {
            Ok(resp) => resp,
            Err(e) => return record_fetch(location, Err(transport(e))),
        };
        let status = resp.status().as_u16();
        let ct = content_type(&resp);
        // Body is read even for failing statuses.
        let body = match resp.text().await {
            Ok(body) => body,
            Err(e) => return record_fetch(location, Err(transport(e))),
        };
        record_fetch(location, classify_response(url.as_str(), status, ct.as_deref(), body))
    }

    async fn probe(&self, location: &str) -> Result<ArtifactPresence> {
        let url = self.resolve(location)?;
        let resp = self
            .client
            .head(url.clone())
            .send()
            .await
            .map_err(|source| DashboardError::Transport {
                url: url.to_string(),
                source,
            })?;
        let presence = classify_probe(resp.status().as_u16(), content_type(&resp).as_deref());
        Ok(record_probe(url.as_str(), presence))
    }
}
