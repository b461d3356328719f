//! Out-of-band freshness probing.
//!
//! A probe is a plain HTTP GET against the stream URL. The only thing consumed
//! from the response is its `etag` header, which acts as an opaque version tag
//! of the live manifest.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::ETAG;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::config::ProbeConfig;
use crate::descriptor::StreamDescriptor;
use crate::error::{ProbeError, Result};

/// Opaque version tag of the live manifest.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FreshnessToken(Arc<str>);

impl FreshnessToken {
    pub fn new(value: impl Into<Arc<str>>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FreshnessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FreshnessToken {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for FreshnessToken {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Source of freshness tokens for a stream.
#[async_trait]
pub trait FreshnessProbe: Send + Sync + 'static {
    /// Fetch the current token of the stream's manifest.
    async fn probe(&self, descriptor: &StreamDescriptor) -> Result<FreshnessToken, ProbeError>;
}

/// [`FreshnessProbe`] backed by a `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpFreshnessProber {
    client: Client,
}

impl HttpFreshnessProber {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Build a prober with its own client configured from `config`.
    pub fn from_config(config: &ProbeConfig) -> Result<Self> {
        Ok(Self::new(config.build_client()?))
    }
}

#[async_trait]
impl FreshnessProbe for HttpFreshnessProber {
    async fn probe(&self, descriptor: &StreamDescriptor) -> Result<FreshnessToken, ProbeError> {
        let url = descriptor.url().clone();
        trace!(url = %url, "Probing stream freshness");

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ProbeError::http_status(status, descriptor.as_str()));
        }

        // HeaderMap lookups are case-insensitive.
        let value = response
            .headers()
            .get(ETAG)
            .ok_or_else(|| ProbeError::MissingTag {
                url: descriptor.to_string(),
            })?;
        let tag = value.to_str().map_err(|_| ProbeError::InvalidTag {
            url: descriptor.to_string(),
        })?;

        debug!(url = %descriptor, etag = tag, "Freshness probe completed");
        Ok(FreshnessToken::new(tag))
    }
}
