//! Server connection configuration.
//!
//! A [`ServerConfig`] is constructed once and handed to every client
//! that needs it. Keeping it an explicit value (instead of a global)
//! makes base-URL switching and testing deterministic.

use std::time::Duration;

use tracing::{debug, warn};

use crate::{ApiError, endpoints};

/// Probe timeout when checking whether the local URL answers.
const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// Connection settings for one file server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    base_url: String,
    token: Option<String>,
}

impl ServerConfig {
    /// Creates a config from a base URL and optional bearer token.
    ///
    /// The URL is normalized (trailing slashes stripped) and must be
    /// http(s); an empty URL is a [`ApiError::Configuration`] so callers
    /// fail fast before any transfer starts.
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Result<Self, ApiError> {
        let base_url = base_url.into();
        let base_url = base_url.trim().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(ApiError::Configuration("no base URL configured".into()));
        }
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(ApiError::Configuration(format!(
                "base URL must be http(s): {base_url}"
            )));
        }
        Ok(Self { base_url, token })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Joins a route onto the base URL.
    pub fn url(&self, route: &str) -> String {
        format!("{}{}", self.base_url, route)
    }

    /// `true` when the configured host is a private-range or loopback
    /// IPv4 address — no tunnel (and no tunnel request limits) in the
    /// path.
    pub fn is_local(&self) -> bool {
        skiff_transfer::is_local_base_url(&self.base_url)
    }

    /// Picks a reachable base URL: probes the local candidate first and
    /// falls back to the remote one if the probe times out or fails.
    ///
    /// Errors when neither candidate is configured.
    pub async fn resolve(
        local: Option<&str>,
        remote: Option<&str>,
        token: Option<String>,
    ) -> Result<Self, ApiError> {
        if let Some(local) = local.filter(|u| !u.trim().is_empty()) {
            let candidate = Self::new(local, token.clone())?;
            if candidate.probe().await {
                debug!(base_url = %candidate.base_url, "using local server URL");
                return Ok(candidate);
            }
            warn!(
                base_url = %candidate.base_url,
                "local server did not answer, falling back to remote"
            );
        }
        if let Some(remote) = remote.filter(|u| !u.trim().is_empty()) {
            return Self::new(remote, token);
        }
        Err(ApiError::Configuration(
            "no reachable base URL configured".into(),
        ))
    }

    /// One cheap authenticated GET against the root-path endpoint.
    async fn probe(&self) -> bool {
        let Ok(client) = reqwest::Client::builder().timeout(PROBE_TIMEOUT).build() else {
            return false;
        };
        let mut req = client.get(self.url(endpoints::ROOT_PATH));
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }
        matches!(req.send().await, Ok(resp) if resp.status().is_success())
    }
}
