use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Proxy, redirect};

use crate::error::{PlayerError, Result};

pub const DEFAULT_USER_AGENT: &str = concat!("mixplayer/", env!("CARGO_PKG_VERSION"));

/// Default period between two health checks.
pub const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_secs(1);

pub const DEFAULT_MAILBOX_CAPACITY: usize = 64;

pub const DEFAULT_EVENT_CAPACITY: usize = 64;

/// Proxy flavours understood by the probe client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProxyType {
    Http,
    Https,
    Socks5,
}

/// Basic credentials sent to the proxy.
#[derive(Debug, Clone)]
pub struct ProxyAuth {
    pub username: String,
    pub password: String,
}

/// Explicit proxy for the probe client.
#[derive(Debug, Clone)]
pub struct ProxyConfig {
    /// Proxy server URL (e.g. "http://proxy.example.com:8080")
    pub url: String,
    pub proxy_type: ProxyType,
    /// Optional basic authentication
    pub auth: Option<ProxyAuth>,
}

impl ProxyConfig {
    fn build(&self) -> Result<Proxy> {
        let proxy = match self.proxy_type {
            ProxyType::Http => Proxy::http(&self.url),
            ProxyType::Https => Proxy::https(&self.url),
            ProxyType::Socks5 => {
                if self.url.starts_with("socks5://") || self.url.starts_with("socks5h://") {
                    Proxy::all(&self.url)
                } else {
                    Proxy::all(format!("socks5://{}", self.url))
                }
            }
        }
        .map_err(|e| PlayerError::configuration(format!("invalid proxy `{}`: {e}", self.url)))?;

        Ok(match &self.auth {
            Some(auth) => proxy.basic_auth(&auth.username, &auth.password),
            None => proxy,
        })
    }
}

/// HTTP settings for the freshness probe.
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    /// Overall timeout of one probe request. A probe that times out counts as
    /// a failed probe and leaves the last token in place. Zero disables the
    /// timeout, which [`PlayerConfig::validate`] rejects.
    pub timeout: Duration,

    /// Time allowed to establish the connection
    pub connect_timeout: Duration,

    pub user_agent: String,

    /// Extra headers sent with every probe
    pub headers: HeaderMap,

    pub follow_redirects: bool,

    /// Explicit proxy. Takes precedence over `use_system_proxy`.
    pub proxy: Option<ProxyConfig>,

    /// Whether to honour system/env proxy settings when no explicit proxy is set
    pub use_system_proxy: bool,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            connect_timeout: Duration::from_secs(5),
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            headers: ProbeConfig::default_headers(),
            follow_redirects: true,
            proxy: None,
            use_system_proxy: true,
        }
    }
}

impl ProbeConfig {
    /// Headers asking for an uncached HLS playlist.
    pub fn default_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            reqwest::header::ACCEPT,
            HeaderValue::from_static(
                "application/vnd.apple.mpegurl,application/x-mpegurl,*/*;q=0.8",
            ),
        );
        headers.insert(
            reqwest::header::CACHE_CONTROL,
            HeaderValue::from_static("no-cache"),
        );
        headers
    }

    /// Build the `reqwest::Client` used for probing.
    pub fn build_client(&self) -> Result<reqwest::Client> {
        install_rustls_provider();

        let mut builder = reqwest::Client::builder()
            .user_agent(self.user_agent.as_str())
            .default_headers(self.headers.clone())
            .connect_timeout(self.connect_timeout)
            .redirect(if self.follow_redirects {
                redirect::Policy::default()
            } else {
                redirect::Policy::none()
            });

        if self.timeout > Duration::ZERO {
            builder = builder.timeout(self.timeout);
        }

        builder = match &self.proxy {
            Some(proxy) => builder.proxy(proxy.build()?),
            None if self.use_system_proxy => builder,
            None => builder.no_proxy(),
        };

        builder
            .build()
            .map_err(|source| PlayerError::HttpClient { source })
    }
}

fn install_rustls_provider() {
    static PROVIDER_INSTALLED: std::sync::OnceLock<()> = std::sync::OnceLock::new();
    PROVIDER_INSTALLED.get_or_init(|| {
        if let Err(e) = rustls::crypto::aws_lc_rs::default_provider().install_default() {
            // Another crate got there first.
            tracing::debug!(existing_provider = ?e, "rustls CryptoProvider already installed");
        }
    });
}

/// Settings of one playback session.
#[derive(Debug, Clone)]
pub struct PlayerConfig {
    /// Period of the health check
    pub check_interval: Duration,

    /// When disabled, the session is never rebuilt automatically: neither by
    /// the `Loading` health check nor by end-of-stream notifications.
    pub auto_reload: bool,

    /// Capacity of the session worker's mailbox. Ticks and commands wait for
    /// room instead of being dropped.
    pub mailbox_capacity: usize,

    /// Capacity of the state-change broadcast channel
    pub event_capacity: usize,

    pub probe: ProbeConfig,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            check_interval: DEFAULT_CHECK_INTERVAL,
            auto_reload: true,
            mailbox_capacity: DEFAULT_MAILBOX_CAPACITY,
            event_capacity: DEFAULT_EVENT_CAPACITY,
            probe: ProbeConfig::default(),
        }
    }
}

impl PlayerConfig {
    /// Set the health-check period.
    pub fn with_check_interval(mut self, interval: Duration) -> Self {
        self.check_interval = interval;
        self
    }

    pub fn with_auto_reload(mut self, enabled: bool) -> Self {
        self.auto_reload = enabled;
        self
    }

    pub fn with_mailbox_capacity(mut self, capacity: usize) -> Self {
        self.mailbox_capacity = capacity;
        self
    }

    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }

    pub fn with_probe(mut self, probe: ProbeConfig) -> Self {
        self.probe = probe;
        self
    }

    /// Reject settings a session cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.check_interval.is_zero() {
            return Err(PlayerError::configuration(
                "check interval must be greater than zero",
            ));
        }
        if self.mailbox_capacity == 0 {
            return Err(PlayerError::configuration(
                "mailbox capacity must be greater than zero",
            ));
        }
        if self.event_capacity == 0 {
            return Err(PlayerError::configuration(
                "event capacity must be greater than zero",
            ));
        }
        // Every tick spawns a probe task that must end on its own.
        if self.probe.timeout.is_zero() {
            return Err(PlayerError::configuration(
                "probe timeout must be greater than zero",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = PlayerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.check_interval, Duration::from_secs(1));
        assert!(config.auto_reload);
    }

    #[test]
    fn test_validate_rejects_zero_values() {
        let config = PlayerConfig::default().with_check_interval(Duration::ZERO);
        assert!(matches!(
            config.validate(),
            Err(PlayerError::Configuration { .. })
        ));

        let config = PlayerConfig::default().with_mailbox_capacity(0);
        assert!(config.validate().is_err());

        let config = PlayerConfig::default().with_event_capacity(0);
        assert!(config.validate().is_err());

        let config = PlayerConfig::default().with_probe(ProbeConfig {
            timeout: Duration::ZERO,
            ..ProbeConfig::default()
        });
        assert!(matches!(
            config.validate(),
            Err(PlayerError::Configuration { .. })
        ));
    }

    #[test]
    fn test_build_client_with_proxy() {
        let probe = ProbeConfig {
            proxy: Some(ProxyConfig {
                url: "127.0.0.1:1080".to_string(),
                proxy_type: ProxyType::Socks5,
                auth: Some(ProxyAuth {
                    username: "user".to_string(),
                    password: "pass".to_string(),
                }),
            }),
            ..ProbeConfig::default()
        };
        assert!(probe.build_client().is_ok());
    }

    #[test]
    fn test_build_client_rejects_bad_proxy() {
        let probe = ProbeConfig {
            proxy: Some(ProxyConfig {
                url: "not a url".to_string(),
                proxy_type: ProxyType::Http,
                auth: None,
            }),
            ..ProbeConfig::default()
        };
        assert!(matches!(
            probe.build_client(),
            Err(PlayerError::Configuration { .. })
        ));
    }
}
