use std::time::Duration;

use reqwest::Url;

use crate::error::ConfigError;

/// Settings for an [`ImageUploader`](crate::ImageUploader).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploaderConfig {
    endpoint: String,
    timeout: Option<Duration>,
}

impl UploaderConfig {
    /// Validates `endpoint` as an absolute http(s) URL without query or fragment.
    pub fn new(endpoint: &str) -> Result<Self, ConfigError> {
        let invalid = |reason: &str| ConfigError::InvalidEndpoint {
            endpoint: endpoint.to_string(),
            reason: reason.to_string(),
        };

        let url = Url::parse(endpoint.trim()).map_err(|e| invalid(&e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid("scheme must be http or https"));
        }
        if url.cannot_be_a_base() || url.host().is_none() {
            return Err(invalid("missing host"));
        }
        if url.query().is_some() || url.fragment().is_some() {
            return Err(invalid("query and fragment are not allowed"));
        }

        Ok(Self {
            endpoint: url.as_str().trim_end_matches('/').to_string(),
            timeout: None,
        })
    }

    /// Bounds the whole request, connection through response body.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Base URL without a trailing slash.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}
