use reqwest::StatusCode;

pub type Result<T, E = PlayerError> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum PlayerError {
    #[error("invalid stream URL `{input}`: {reason}")]
    InvalidUrl { input: String, reason: String },

    #[error("unsupported URL scheme `{scheme}`")]
    UnsupportedScheme { scheme: String },

    #[error("configuration error: {reason}")]
    Configuration { reason: String },

    #[error("failed to build HTTP client: {source}")]
    HttpClient {
        #[source]
        source: reqwest::Error,
    },

    #[error("playback session has been disposed")]
    Disposed,
}

impl PlayerError {
    pub fn invalid_url(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidUrl {
            input: input.into(),
            reason: reason.into(),
        }
    }

    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration {
            reason: reason.into(),
        }
    }
}

/// Failure of a single freshness probe.
///
/// Probe failures are recovered locally: the last observed token is kept and
/// no state transition happens.
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("probe request failed: {source}")]
    Network {
        #[from]
        source: reqwest::Error,
    },

    #[error("probe of {url} returned HTTP {status}")]
    HttpStatus { status: StatusCode, url: String },

    #[error("probe response from {url} carried no etag header")]
    MissingTag { url: String },

    #[error("probe response from {url} carried a non-text etag header")]
    InvalidTag { url: String },
}

impl ProbeError {
    pub fn http_status(status: StatusCode, url: impl Into<String>) -> Self {
        Self::HttpStatus {
            status,
            url: url.into(),
        }
    }

    /// Whether a later probe against the same URL may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network { .. } | Self::MissingTag { .. } | Self::InvalidTag { .. } => true,
            Self::HttpStatus { status, .. } => {
                status.is_server_error() || *status == StatusCode::TOO_MANY_REQUESTS
            }
        }
    }
}
