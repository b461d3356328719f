//! Immutable locator of the stream being played.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use url::Url;

use crate::error::{PlayerError, Result};

/// Network locator of a live HLS-style manifest.
///
/// Cheap to clone; the underlying URL is shared and never mutated after
/// construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StreamDescriptor {
    url: Arc<Url>,
}

impl StreamDescriptor {
    /// Parse and validate a stream URL. Only `http` and `https` are accepted,
    /// since the freshness probe is an HTTP request against the same URL.
    pub fn parse(input: &str) -> Result<Self> {
        let url = Url::parse(input.trim())
            .map_err(|e| PlayerError::invalid_url(input, e.to_string()))?;
        Self::from_url(url)
    }

    pub fn from_url(url: Url) -> Result<Self> {
        match url.scheme() {
            "http" | "https" => {}
            other => {
                return Err(PlayerError::UnsupportedScheme {
                    scheme: other.to_string(),
                });
            }
        }
        if url.host_str().is_none() {
            return Err(PlayerError::invalid_url(url.as_str(), "missing host"));
        }
        Ok(Self { url: Arc::new(url) })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn as_str(&self) -> &str {
        self.url.as_str()
    }
}

impl FromStr for StreamDescriptor {
    type Err = PlayerError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for StreamDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.url.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_http_urls() {
        let descriptor: StreamDescriptor = "https://cdn.example.com/hls/live_652.m3u8"
            .parse()
            .unwrap();
        assert_eq!(descriptor.url().host_str(), Some("cdn.example.com"));
        assert_eq!(
            descriptor.to_string(),
            "https://cdn.example.com/hls/live_652.m3u8"
        );

        assert!(StreamDescriptor::parse("  http://127.0.0.1:8080/live.m3u8 ").is_ok());
    }

    #[test]
    fn test_rejects_other_schemes() {
        let err = StreamDescriptor::parse("rtmp://example.com/live").unwrap_err();
        assert!(matches!(err, PlayerError::UnsupportedScheme { ref scheme } if scheme == "rtmp"));

        let err = StreamDescriptor::parse("file:///tmp/live.m3u8").unwrap_err();
        assert!(matches!(err, PlayerError::UnsupportedScheme { .. }));
    }

    #[test]
    fn test_rejects_garbage() {
        let err = StreamDescriptor::parse("not a url").unwrap_err();
        assert!(matches!(err, PlayerError::InvalidUrl { .. }));
    }

    #[test]
    fn test_clones_share_url() {
        let a = StreamDescriptor::parse("http://example.com/a.m3u8").unwrap();
        let b = a.clone();
        assert_eq!(a, b);
        assert!(Arc::ptr_eq(&a.url, &b.url));
    }
}
