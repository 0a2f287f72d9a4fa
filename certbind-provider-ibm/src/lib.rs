//! certbind IBM Cloud Provider
//!
//! Provider implementation for the IBM Cloud containers API.
//!
//! ## Module Structure
//!
//! - `alb_cert` - Lifecycle of certificates bound to ALB secrets
//! - `client` - Containers API capability trait and HTTP client
//! - `provider` - IbmProvider and per-type dispatch
//! - `resources` - Resource type definitions
//! - `session` - Explicit session context (region, endpoint, token)

pub mod alb_cert;
pub mod client;
pub mod provider;
pub mod resources;
pub mod session;

// Re-export main types
pub use client::{AlbCertApi, AlbSecretConfig, ContainerClient};
pub use provider::IbmProvider;
pub use session::{ClientSession, SessionConfig, TargetHeader};

use certbind_core::provider::{BoxFuture, Provider, ProviderResult, ResourceType};
use certbind_core::resource::{Resource, ResourceId, State};

// =============================================================================
// Provider Trait Implementation
// =============================================================================

impl<C: AlbCertApi> Provider for IbmProvider<C> {
    fn name(&self) -> &'static str {
        "ibm"
    }

    fn resource_types(&self) -> Vec<Box<dyn ResourceType>> {
        resources::resource_types()
    }

    fn read(
        &self,
        id: &ResourceId,
        identifier: &str,
        region: Option<&str>,
    ) -> BoxFuture<'_, ProviderResult<State>> {
        let id = id.clone();
        let identifier = identifier.to_string();
        let region = region.map(str::to_string);
        Box::pin(async move {
            self.read_resource(&id, &identifier, region.as_deref())
                .await
        })
    }

    fn create(&self, resource: &Resource) -> BoxFuture<'_, ProviderResult<State>> {
        let resource = resource.clone();
        Box::pin(async move { self.create_resource(&resource).await })
    }

    fn update(
        &self,
        id: &ResourceId,
        identifier: &str,
        from: &State,
        to: &Resource,
    ) -> BoxFuture<'_, ProviderResult<State>> {
        let id = id.clone();
        let identifier = identifier.to_string();
        let from = from.clone();
        let to = to.clone();
        Box::pin(async move { self.update_resource(&id, &identifier, &from, &to).await })
    }

    fn delete(
        &self,
        id: &ResourceId,
        identifier: &str,
        region: Option<&str>,
    ) -> BoxFuture<'_, ProviderResult<()>> {
        let id = id.clone();
        let identifier = identifier.to_string();
        let region = region.map(str::to_string);
        Box::pin(async move {
            self.delete_resource(&id, &identifier, region.as_deref())
                .await
        })
    }

    fn exists(
        &self,
        id: &ResourceId,
        identifier: &str,
        region: Option<&str>,
    ) -> BoxFuture<'_, ProviderResult<bool>> {
        let id = id.clone();
        let identifier = identifier.to_string();
        let region = region.map(str::to_string);
        Box::pin(async move {
            self.resource_exists(&id, &identifier, region.as_deref())
                .await
        })
    }
}
