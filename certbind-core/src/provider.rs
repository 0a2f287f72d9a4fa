//! Provider - Trait abstracting resource operations
//!
//! A Provider defines lifecycle operations for a specific cloud. It is
//! responsible for turning declared resources into control-plane API calls
//! and reconciling the remote record back into a `State`.

use std::future::Future;
use std::pin::Pin;

use crate::identity::IdentityError;
use crate::resource::{Resource, ResourceId, State};
use crate::schema::ResourceSchema;

/// Classification of a provider failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The API call failed for network or authorization reasons
    Transport,
    /// The remote resource does not exist (HTTP 404)
    NotFound,
    /// The API asked the caller to retry later (HTTP 429/503); pollers keep waiting
    NotReady,
    /// A composite identifier did not split into two parts
    MalformedIdentifier,
    /// Polling exceeded its deadline
    Timeout,
    /// The remote side reported that the operation itself failed
    RemoteFailure,
    /// The declared resource is invalid
    Validation,
    /// The provider or session is misconfigured
    Configuration,
}

/// Error type for Provider operations
#[derive(Debug)]
pub struct ProviderError {
    pub kind: ErrorKind,
    pub message: String,
    pub resource_id: Option<ResourceId>,
    pub cause: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl std::fmt::Display for ProviderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(ref id) = self.resource_id {
            write!(f, "[{}.{}] {}", id.resource_type, id.name, self.message)
        } else {
            write!(f, "{}", self.message)
        }
    }
}

impl std::error::Error for ProviderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause
            .as_ref()
            .map(|e| e.as_ref() as &dyn std::error::Error)
    }
}

impl ProviderError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            resource_id: None,
            cause: None,
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Transport, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, message)
    }

    pub fn for_resource(mut self, id: ResourceId) -> Self {
        self.resource_id = Some(id);
        self
    }

    pub fn with_cause(mut self, cause: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    pub fn is_not_found(&self) -> bool {
        self.kind == ErrorKind::NotFound
    }
}

impl From<IdentityError> for ProviderError {
    fn from(e: IdentityError) -> Self {
        Self::new(ErrorKind::MalformedIdentifier, e.to_string()).with_cause(e)
    }
}

pub type ProviderResult<T> = Result<T, ProviderError>;

/// Return type for async operations
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Definition of resource types that a Provider can handle
pub trait ResourceType: Send + Sync {
    /// Resource type name (e.g., "alb_cert")
    fn name(&self) -> &'static str;

    /// Attribute schema for this resource type
    fn schema(&self) -> ResourceSchema;
}

/// Main Provider trait
///
/// All operations are async and involve side effects. The framework invokes
/// at most one operation per resource instance at a time.
pub trait Provider: Send + Sync {
    /// Name of this Provider (e.g., "ibm")
    fn name(&self) -> &'static str;

    /// List of resource types this Provider can handle
    fn resource_types(&self) -> Vec<Box<dyn ResourceType>>;

    /// Get the current state of a resource
    ///
    /// `region` is the region recorded for the resource; `None` uses the
    /// provider's default. Returns `State::not_found()` if the resource does
    /// not exist.
    fn read(
        &self,
        id: &ResourceId,
        identifier: &str,
        region: Option<&str>,
    ) -> BoxFuture<'_, ProviderResult<State>>;

    /// Create a resource
    ///
    /// Returns State with identifier set to the remote composite ID
    fn create(&self, resource: &Resource) -> BoxFuture<'_, ProviderResult<State>>;

    /// Update a resource in place
    fn update(
        &self,
        id: &ResourceId,
        identifier: &str,
        from: &State,
        to: &Resource,
    ) -> BoxFuture<'_, ProviderResult<State>>;

    /// Delete a resource and wait until it is gone
    fn delete(
        &self,
        id: &ResourceId,
        identifier: &str,
        region: Option<&str>,
    ) -> BoxFuture<'_, ProviderResult<()>>;

    /// Check whether the remote resource still exists
    fn exists(
        &self,
        id: &ResourceId,
        identifier: &str,
        region: Option<&str>,
    ) -> BoxFuture<'_, ProviderResult<bool>>;
}

/// Provider implementation for Box<dyn Provider>
/// This enables dynamic dispatch for Providers
impl Provider for Box<dyn Provider> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn resource_types(&self) -> Vec<Box<dyn ResourceType>> {
        (**self).resource_types()
    }

    fn read(
        &self,
        id: &ResourceId,
        identifier: &str,
        region: Option<&str>,
    ) -> BoxFuture<'_, ProviderResult<State>> {
        (**self).read(id, identifier, region)
    }

    fn create(&self, resource: &Resource) -> BoxFuture<'_, ProviderResult<State>> {
        (**self).create(resource)
    }

    fn update(
        &self,
        id: &ResourceId,
        identifier: &str,
        from: &State,
        to: &Resource,
    ) -> BoxFuture<'_, ProviderResult<State>> {
        (**self).update(id, identifier, from, to)
    }

    fn delete(
        &self,
        id: &ResourceId,
        identifier: &str,
        region: Option<&str>,
    ) -> BoxFuture<'_, ProviderResult<()>> {
        (**self).delete(id, identifier, region)
    }

    fn exists(
        &self,
        id: &ResourceId,
        identifier: &str,
        region: Option<&str>,
    ) -> BoxFuture<'_, ProviderResult<bool>> {
        (**self).exists(id, identifier, region)
    }
}
