//! Session context passed explicitly to every operation
//!
//! Holds the default region, the containers API endpoint and the bearer
//! token used by the HTTP client.

use std::time::Duration;

use thiserror::Error;

pub const DEFAULT_REGION: &str = "us-south";
pub const DEFAULT_ENDPOINT: &str = "https://containers.cloud.ibm.com/global";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Region must not be empty")]
    EmptyRegion,

    #[error("Invalid endpoint '{0}': must start with http:// or https://")]
    InvalidEndpoint(String),
}

/// User-facing session settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub region: String,
    pub endpoint: String,
    pub iam_token: Option<String>,
    pub request_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            region: DEFAULT_REGION.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            iam_token: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl SessionConfig {
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_iam_token(mut self, token: impl Into<String>) -> Self {
        self.iam_token = Some(token.into());
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.region.trim().is_empty() {
            return Err(ConfigError::EmptyRegion);
        }
        if !(self.endpoint.starts_with("http://") || self.endpoint.starts_with("https://")) {
            return Err(ConfigError::InvalidEndpoint(self.endpoint.clone()));
        }
        Ok(())
    }
}

/// Routing information sent with every containers API call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetHeader {
    pub region: String,
}

/// Validated session shared by all operations of one provider
#[derive(Debug, Clone)]
pub struct ClientSession {
    config: SessionConfig,
}

impl ClientSession {
    pub fn new(config: SessionConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn default_region(&self) -> &str {
        &self.config.region
    }

    /// Resource-level region wins; otherwise the session default
    pub fn target_header(&self, region: Option<&str>) -> TargetHeader {
        let region = region
            .filter(|r| !r.is_empty())
            .unwrap_or(&self.config.region);
        TargetHeader {
            region: region.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_header_prefers_resource_region() {
        let session = ClientSession::new(SessionConfig::default()).unwrap();
        assert_eq!(session.target_header(Some("eu-de")).region, "eu-de");
        assert_eq!(session.target_header(None).region, "us-south");
        assert_eq!(session.target_header(Some("")).region, "us-south");
        assert_eq!(session.default_region(), "us-south");
    }

    #[test]
    fn rejects_invalid_config() {
        let empty_region = SessionConfig::default().with_region("  ");
        assert_eq!(
            ClientSession::new(empty_region).unwrap_err(),
            ConfigError::EmptyRegion
        );

        let bad_endpoint = SessionConfig::default().with_endpoint("containers.cloud.ibm.com");
        assert!(matches!(
            ClientSession::new(bad_endpoint),
            Err(ConfigError::InvalidEndpoint(_))
        ));
    }
}
