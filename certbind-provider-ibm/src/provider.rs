//! IBM Cloud provider implementation
//!
//! Owns the API client and the session, and routes each lifecycle call to
//! the resource module that handles its type.

use std::time::Duration;

use certbind_core::provider::{ProviderError, ProviderResult};
use certbind_core::resource::{Resource, ResourceId, ResourceTimeouts, State};

use crate::alb_cert;
use crate::client::{AlbCertApi, ContainerClient};
use crate::session::{ClientSession, SessionConfig};

/// Default delay between two status polls
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// IBM Cloud containers provider
pub struct IbmProvider<C = ContainerClient> {
    pub(crate) client: C,
    pub(crate) session: ClientSession,
    pub(crate) timeouts: ResourceTimeouts,
    pub(crate) poll_interval: Duration,
}

impl IbmProvider<ContainerClient> {
    /// Create a provider talking HTTP to the configured endpoint
    pub fn from_config(config: SessionConfig) -> ProviderResult<Self> {
        let client = ContainerClient::new(&config)?;
        let session = ClientSession::new(config)
            .map_err(|e| ProviderError::configuration(e.to_string()).with_cause(e))?;
        Ok(Self::new(client, session))
    }
}

impl<C: AlbCertApi> IbmProvider<C> {
    pub fn new(client: C, session: ClientSession) -> Self {
        Self {
            client,
            session,
            timeouts: ResourceTimeouts::default(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_timeouts(mut self, timeouts: ResourceTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn session(&self) -> &ClientSession {
        &self.session
    }

    // =========================================================================
    // Resource Operations
    // =========================================================================

    pub async fn read_resource(
        &self,
        id: &ResourceId,
        identifier: &str,
        region: Option<&str>,
    ) -> ProviderResult<State> {
        match id.resource_type.as_str() {
            alb_cert::RESOURCE_TYPE => self.read_alb_cert(id, identifier, region).await,
            _ => Err(unknown_type(id)),
        }
    }

    pub async fn create_resource(&self, resource: &Resource) -> ProviderResult<State> {
        match resource.id.resource_type.as_str() {
            alb_cert::RESOURCE_TYPE => self.create_alb_cert(resource).await,
            _ => Err(unknown_type(&resource.id)),
        }
    }

    pub async fn update_resource(
        &self,
        id: &ResourceId,
        identifier: &str,
        from: &State,
        to: &Resource,
    ) -> ProviderResult<State> {
        match id.resource_type.as_str() {
            alb_cert::RESOURCE_TYPE => self.update_alb_cert(id, identifier, from, to).await,
            _ => Err(unknown_type(id)),
        }
    }

    pub async fn delete_resource(
        &self,
        id: &ResourceId,
        identifier: &str,
        region: Option<&str>,
    ) -> ProviderResult<()> {
        match id.resource_type.as_str() {
            alb_cert::RESOURCE_TYPE => self.delete_alb_cert(id, identifier, region).await,
            _ => Err(unknown_type(id)),
        }
    }

    pub async fn resource_exists(
        &self,
        id: &ResourceId,
        identifier: &str,
        region: Option<&str>,
    ) -> ProviderResult<bool> {
        match id.resource_type.as_str() {
            alb_cert::RESOURCE_TYPE => self.alb_cert_exists(id, identifier, region).await,
            _ => Err(unknown_type(id)),
        }
    }
}

fn unknown_type(id: &ResourceId) -> ProviderError {
    ProviderError::validation(format!("Unknown resource type: {}", id.resource_type))
        .for_resource(id.clone())
}
