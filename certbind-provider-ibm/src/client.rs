//! Containers API client for ALB secrets
//!
//! [`AlbCertApi`] is the outbound capability set the lifecycle code calls
//! into; [`ContainerClient`] implements it over HTTP.

use async_trait::async_trait;
use certbind_core::provider::{ErrorKind, ProviderError, ProviderResult};
use log::debug;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::session::{SessionConfig, TargetHeader};

/// Remote record for a certificate bound to an ALB secret
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlbSecretConfig {
    #[serde(rename = "secretName")]
    pub secret_name: String,
    #[serde(rename = "clusterID")]
    pub cluster_id: String,
    #[serde(rename = "domainName")]
    pub domain_name: String,
    #[serde(rename = "cloudCertInstanceID")]
    pub cloud_cert_instance_id: String,
    #[serde(rename = "clusterCrn")]
    pub cluster_crn: String,
    #[serde(rename = "certCrn")]
    pub cert_crn: String,
    #[serde(rename = "issuerName")]
    pub issuer_name: String,
    #[serde(rename = "expiresOn")]
    pub expires_on: String,
    pub state: String,
}

impl AlbSecretConfig {
    /// Look up a field by its remote property name
    pub fn field(&self, remote_name: &str) -> Option<&str> {
        let value = match remote_name {
            "secretName" => &self.secret_name,
            "clusterID" => &self.cluster_id,
            "domainName" => &self.domain_name,
            "cloudCertInstanceID" => &self.cloud_cert_instance_id,
            "clusterCrn" => &self.cluster_crn,
            "certCrn" => &self.cert_crn,
            "issuerName" => &self.issuer_name,
            "expiresOn" => &self.expires_on,
            "state" => &self.state,
            _ => return None,
        };
        Some(value)
    }
}

/// Errors raised by the HTTP client before they are classified
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Request failed with status {status}: {body}")]
    Status { status: u16, body: String },
}

/// 404 is NotFound. 429 and 503 ask the caller to retry later and become
/// NotReady, so a status poll keeps waiting through throttling.
impl From<ApiError> for ProviderError {
    fn from(e: ApiError) -> Self {
        let message = e.to_string();
        let kind = match e {
            ApiError::Status { status: 404, .. } => ErrorKind::NotFound,
            ApiError::Status {
                status: 429 | 503, ..
            } => ErrorKind::NotReady,
            _ => ErrorKind::Transport,
        };
        ProviderError::new(kind, message).with_cause(e)
    }
}

/// Operations on ALB secrets in a cluster
#[async_trait]
pub trait AlbCertApi: Send + Sync {
    async fn deploy_secret(
        &self,
        params: &AlbSecretConfig,
        target: &TargetHeader,
    ) -> ProviderResult<()>;

    async fn update_secret(
        &self,
        params: &AlbSecretConfig,
        target: &TargetHeader,
    ) -> ProviderResult<()>;

    async fn remove_secret(
        &self,
        cluster_id: &str,
        secret_name: &str,
        target: &TargetHeader,
    ) -> ProviderResult<()>;

    async fn get_by_name(
        &self,
        cluster_id: &str,
        secret_name: &str,
        target: &TargetHeader,
    ) -> ProviderResult<AlbSecretConfig>;
}

/// HTTP client for the containers API
#[derive(Debug, Clone)]
pub struct ContainerClient {
    client: Client,
    base_url: String,
    iam_token: Option<String>,
}

impl ContainerClient {
    pub fn new(config: &SessionConfig) -> ProviderResult<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| {
                ProviderError::configuration(format!("Failed to build HTTP client: {}", e))
                    .with_cause(e)
            })?;

        Ok(Self {
            client,
            base_url: config.endpoint.trim_end_matches('/').to_owned(),
            iam_token: config.iam_token.clone(),
        })
    }

    fn secrets_url(&self) -> String {
        format!("{}/v1/alb/albsecrets", self.base_url)
    }

    fn cluster_secrets_url(&self, cluster_id: &str) -> String {
        format!("{}/v1/clusters/{}/albsecrets", self.base_url, cluster_id)
    }

    fn with_headers(&self, request: RequestBuilder, target: &TargetHeader) -> RequestBuilder {
        let request = request.header("X-Region", &target.region);
        match &self.iam_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<reqwest::Response, ApiError> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(ApiError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl AlbCertApi for ContainerClient {
    async fn deploy_secret(
        &self,
        params: &AlbSecretConfig,
        target: &TargetHeader,
    ) -> ProviderResult<()> {
        debug!(
            "POST albsecrets cluster={} secret={} region={}",
            params.cluster_id, params.secret_name, target.region
        );
        let request = self.with_headers(self.client.post(self.secrets_url()), target);
        self.send(request.json(params)).await?;
        Ok(())
    }

    async fn update_secret(
        &self,
        params: &AlbSecretConfig,
        target: &TargetHeader,
    ) -> ProviderResult<()> {
        debug!(
            "PUT albsecrets cluster={} secret={} region={}",
            params.cluster_id, params.secret_name, target.region
        );
        let request = self.with_headers(self.client.put(self.secrets_url()), target);
        self.send(request.json(params)).await?;
        Ok(())
    }

    async fn remove_secret(
        &self,
        cluster_id: &str,
        secret_name: &str,
        target: &TargetHeader,
    ) -> ProviderResult<()> {
        debug!(
            "DELETE albsecrets cluster={} secret={} region={}",
            cluster_id, secret_name, target.region
        );
        let request = self
            .client
            .delete(self.cluster_secrets_url(cluster_id))
            .query(&[("albSecretName", secret_name)]);
        self.send(self.with_headers(request, target)).await?;
        Ok(())
    }

    async fn get_by_name(
        &self,
        cluster_id: &str,
        secret_name: &str,
        target: &TargetHeader,
    ) -> ProviderResult<AlbSecretConfig> {
        let request = self
            .client
            .get(self.cluster_secrets_url(cluster_id))
            .query(&[("albSecretName", secret_name)]);
        let response = self.send(self.with_headers(request, target)).await?;

        if response.status() == StatusCode::NO_CONTENT {
            return Err(ProviderError::not_found(format!(
                "ALB secret {} not found in cluster {}",
                secret_name, cluster_id
            )));
        }

        response
            .json::<AlbSecretConfig>()
            .await
            .map_err(|e| ProviderError::from(ApiError::Http(e)))
    }
}
