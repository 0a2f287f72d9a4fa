//! `alb_cert` - a certificate-manager certificate bound to an ALB secret
//!
//! Deploying or updating the binding is asynchronous on the remote side, so
//! create and update block on [`wait_for_state`] until the secret settles,
//! and delete blocks on [`wait_for_absence`] until it is gone.

use std::collections::HashMap;
use std::time::Duration;

use certbind_core::differ::find_changed_attributes;
use certbind_core::identity::CompositeId;
use certbind_core::provider::{ProviderError, ProviderResult};
use certbind_core::resource::{Resource, ResourceId, State, Value};
use certbind_core::schema::{AttributeSchema, AttributeType, ResourceSchema, TypeError, types};
use certbind_core::waiter::{WaitSpec, wait_for_absence, wait_for_state};
use log::{debug, info, warn};

use crate::client::{AlbCertApi, AlbSecretConfig};
use crate::provider::IbmProvider;
use crate::session::TargetHeader;

pub const RESOURCE_TYPE: &str = "alb_cert";

/// Request state sent when deploying a new secret
const DEPLOY_STATE: &str = "update_false";
/// Request state sent when replacing the certificate of an existing secret
const UPDATE_STATE: &str = "update_true";

const PENDING_STATES: [&str; 5] = ["creating", "updating", "pending", DEPLOY_STATE, UPDATE_STATE];
const TARGET_STATES: [&str; 2] = ["created", "updated"];

const EXISTS_STATE: &str = "exists";
const DELETED_STATE: &str = "deleted";

pub fn schema() -> ResourceSchema {
    ResourceSchema::new(format!("ibm.{}", RESOURCE_TYPE))
        .with_description("Certificate bound to an Application Load Balancer secret")
        .attribute(
            AttributeSchema::new("cert_crn", types::crn())
                .required()
                .with_description("Certificate CRN id")
                .with_provider_name("certCrn"),
        )
        .attribute(
            AttributeSchema::new("cluster_id", AttributeType::String)
                .required()
                .force_new()
                .with_description("Cluster ID")
                .with_provider_name("clusterID"),
        )
        .attribute(
            AttributeSchema::new("secret_name", AttributeType::String)
                .required()
                .force_new()
                .with_description("Secret name")
                .with_provider_name("secretName"),
        )
        .attribute(
            AttributeSchema::new("domain_name", AttributeType::String)
                .computed()
                .with_description("Domain name")
                .with_provider_name("domainName"),
        )
        .attribute(
            AttributeSchema::new("expires_on", AttributeType::String)
                .computed()
                .with_description("Certificate expiration date")
                .with_provider_name("expiresOn"),
        )
        .attribute(
            AttributeSchema::new("issuer_name", AttributeType::String)
                .computed()
                .with_description("Certificate issuer name")
                .with_provider_name("issuerName"),
        )
        .attribute(
            AttributeSchema::new("cluster_crn", AttributeType::String)
                .computed()
                .with_description("Cluster CRN")
                .with_provider_name("clusterCrn"),
        )
        .attribute(
            AttributeSchema::new("cloud_cert_instance_id", AttributeType::String)
                .computed()
                .with_description("Certificate manager instance ID")
                .with_provider_name("cloudCertInstanceID"),
        )
        .attribute(
            AttributeSchema::new("region", AttributeType::String)
                .optional()
                .computed()
                .deprecated("This field is deprecated")
                .with_description("Region name"),
        )
}

impl<C: AlbCertApi> IbmProvider<C> {
    pub async fn create_alb_cert(&self, resource: &Resource) -> ProviderResult<State> {
        let id = &resource.id;
        validate(resource)?;

        let cert_crn = required_str(resource, "cert_crn")?;
        let cluster_id = required_str(resource, "cluster_id")?;
        let secret_name = required_str(resource, "secret_name")?;
        let target = self.session.target_header(resource.get_str("region"));

        let params = AlbSecretConfig {
            cert_crn: cert_crn.to_string(),
            cluster_id: cluster_id.to_string(),
            secret_name: secret_name.to_string(),
            state: DEPLOY_STATE.to_string(),
            ..Default::default()
        };

        info!(
            "Deploying certificate to ALB secret {}/{} in {}",
            cluster_id, secret_name, target.region
        );
        self.client
            .deploy_secret(&params, &target)
            .await
            .map_err(|e| e.for_resource(id.clone()))?;

        let cid = CompositeId::new(cluster_id, secret_name);
        self.wait_for_alb_cert(&cid, &target, self.timeouts.create)
            .await
            .map_err(|e| waiting_error("create", &cid, e).for_resource(id.clone()))?;

        self.read_alb_cert(id, &cid.to_string(), Some(&target.region))
            .await
    }

    /// Read the remote secret; a missing secret reads as `State::not_found`
    pub async fn read_alb_cert(
        &self,
        id: &ResourceId,
        identifier: &str,
        region: Option<&str>,
    ) -> ProviderResult<State> {
        let cid = parse_identifier(id, identifier)?;
        let target = self.session.target_header(region);

        match self
            .client
            .get_by_name(&cid.parent, &cid.child, &target)
            .await
        {
            Ok(cert) => Ok(State::existing(id.clone(), cert_attributes(&cert, &target))
                .with_identifier(cid.to_string())),
            Err(e) if e.is_not_found() => Ok(State::not_found(id.clone())),
            Err(e) => Err(e.for_resource(id.clone())),
        }
    }

    /// Only `cert_crn` can change in place; other changes need a replacement
    pub async fn update_alb_cert(
        &self,
        id: &ResourceId,
        identifier: &str,
        from: &State,
        to: &Resource,
    ) -> ProviderResult<State> {
        let cid = parse_identifier(id, identifier)?;
        validate(to)?;

        let changed = find_changed_attributes(&to.attributes, &from.attributes);
        let forced = schema().force_new_attributes(&changed);
        if !forced.is_empty() {
            return Err(ProviderError::validation(format!(
                "Changing {} requires replacing the resource",
                forced.join(", ")
            ))
            .for_resource(id.clone()));
        }

        let region = to.get_str("region").or_else(|| from.get_str("region"));
        let target = self.session.target_header(region);

        if changed.iter().any(|name| name == "cert_crn") {
            let params = AlbSecretConfig {
                cert_crn: required_str(to, "cert_crn")?.to_string(),
                cluster_id: cid.parent.clone(),
                secret_name: cid.child.clone(),
                state: UPDATE_STATE.to_string(),
                ..Default::default()
            };

            info!("Updating certificate of ALB secret {} in {}", cid, target.region);
            self.client
                .update_secret(&params, &target)
                .await
                .map_err(|e| e.for_resource(id.clone()))?;

            self.wait_for_alb_cert(&cid, &target, self.timeouts.update)
                .await
                .map_err(|e| waiting_error("update", &cid, e).for_resource(id.clone()))?;
        } else {
            debug!("No in-place changes for ALB secret {}", cid);
        }

        self.read_alb_cert(id, identifier, Some(&target.region))
            .await
    }

    pub async fn delete_alb_cert(
        &self,
        id: &ResourceId,
        identifier: &str,
        region: Option<&str>,
    ) -> ProviderResult<()> {
        let cid = parse_identifier(id, identifier)?;
        let target = self.session.target_header(region);

        info!("Removing ALB secret {} in {}", cid, target.region);
        self.client
            .remove_secret(&cid.parent, &cid.child, &target)
            .await
            .map_err(|e| e.for_resource(id.clone()))?;

        self.wait_for_alb_cert_delete(&cid, &target)
            .await
            .map_err(|e| waiting_error("delete", &cid, e).for_resource(id.clone()))
    }

    pub async fn alb_cert_exists(
        &self,
        id: &ResourceId,
        identifier: &str,
        region: Option<&str>,
    ) -> ProviderResult<bool> {
        let cid = parse_identifier(id, identifier)?;
        let target = self.session.target_header(region);

        match self
            .client
            .get_by_name(&cid.parent, &cid.child, &target)
            .await
        {
            Ok(cert) => Ok(matches_identity(&cert, &cid)),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(ProviderError::transport(format!(
                "Error communicating with the API: {}",
                e
            ))
            .with_cause(e)
            .for_resource(id.clone())),
        }
    }

    /// Wait until a deployed or updated secret reaches `created`/`updated`
    async fn wait_for_alb_cert(
        &self,
        cid: &CompositeId,
        target: &TargetHeader,
        timeout: Duration,
    ) -> ProviderResult<AlbSecretConfig> {
        let spec = WaitSpec::new(PENDING_STATES, TARGET_STATES)
            .with_timeout(timeout)
            .with_delay(self.poll_interval)
            .with_min_poll_interval(self.poll_interval);

        let cert = wait_for_state(&spec, || async move {
            let cert = self
                .client
                .get_by_name(&cid.parent, &cid.child, target)
                .await?;
            let state = cert.state.clone();
            Ok::<_, ProviderError>((cert, state))
        })
        .await?;

        Ok(cert)
    }

    async fn wait_for_alb_cert_delete(
        &self,
        cid: &CompositeId,
        target: &TargetHeader,
    ) -> ProviderResult<()> {
        let spec = WaitSpec::new([EXISTS_STATE], [DELETED_STATE])
            .with_timeout(self.timeouts.delete)
            .with_delay(self.poll_interval)
            .with_min_poll_interval(self.poll_interval);

        wait_for_absence(&spec, || async move {
            let cert = self
                .client
                .get_by_name(&cid.parent, &cid.child, target)
                .await?;
            let state = if matches_identity(&cert, cid) {
                EXISTS_STATE
            } else {
                DELETED_STATE
            };
            Ok::<_, ProviderError>((cert, state.to_string()))
        })
        .await?;

        Ok(())
    }
}

fn validate(resource: &Resource) -> ProviderResult<()> {
    let schema = schema();
    for (name, notice) in schema.deprecated_in(&resource.attributes) {
        warn!(
            "[{}.{}] attribute '{}': {}",
            resource.id.resource_type, resource.id.name, name, notice
        );
    }
    schema.validate(&resource.attributes).map_err(|errors| {
        let messages: Vec<String> = errors.iter().map(TypeError::to_string).collect();
        ProviderError::validation(messages.join("; ")).for_resource(resource.id.clone())
    })
}

fn required_str<'a>(resource: &'a Resource, name: &str) -> ProviderResult<&'a str> {
    resource.get_str(name).ok_or_else(|| {
        ProviderError::validation(format!("Required attribute '{}' is missing", name))
            .for_resource(resource.id.clone())
    })
}

fn parse_identifier(id: &ResourceId, identifier: &str) -> ProviderResult<CompositeId> {
    identifier
        .parse::<CompositeId>()
        .map_err(|e| ProviderError::from(e).for_resource(id.clone()))
}

fn matches_identity(cert: &AlbSecretConfig, cid: &CompositeId) -> bool {
    cert.cluster_id == cid.parent && cert.secret_name == cid.child
}

fn waiting_error(action: &str, cid: &CompositeId, e: ProviderError) -> ProviderError {
    let message = format!(
        "Error waiting for {} resource alb cert ({}): {}",
        action, cid, e.message
    );
    ProviderError::new(e.kind, message).with_cause(e)
}

/// Map the remote record to resource attributes via each attribute's provider name
fn cert_attributes(cert: &AlbSecretConfig, target: &TargetHeader) -> HashMap<String, Value> {
    let mut attributes = HashMap::new();

    for (name, attr) in &schema().attributes {
        if let Some(remote_name) = &attr.provider_name
            && let Some(value) = cert.field(remote_name)
        {
            attributes.insert(name.clone(), Value::String(value.to_string()));
        }
    }
    attributes.insert("region".to_string(), Value::String(target.region.clone()));

    attributes
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use certbind_core::provider::{ErrorKind, Provider};
    use certbind_core::resource::ResourceTimeouts;

    use crate::session::{ClientSession, SessionConfig};

    const CERT_CRN: &str =
        "crn:v1:bluemix:public:cloudcerts:us-south:a/4448261269a14562b839e0a3019ed980:0c2b1e3a-9f1d-4d8c-9a42-9d7e3ed7b6e1:certificate:b5cba8d2a7b8c3f1";
    const NEW_CERT_CRN: &str =
        "crn:v1:bluemix:public:cloudcerts:us-south:a/4448261269a14562b839e0a3019ed980:0c2b1e3a-9f1d-4d8c-9a42-9d7e3ed7b6e1:certificate:77aa01c4e5f6a7b8";

    /// Secrets are scoped per region: (region, cluster_id, secret_name)
    type Key = (String, String, String);

    /// In-memory containers API whose secrets settle after a number of reads
    struct FakeAlbApi {
        inner: Mutex<FakeState>,
    }

    struct FakeState {
        records: HashMap<Key, AlbSecretConfig>,
        settling: HashMap<Key, u32>,
        deleting: HashMap<Key, u32>,
        polls_to_settle: u32,
        settled_state: String,
        lose_records: bool,
        throttled_polls: u32,
        calls: Vec<String>,
    }

    impl FakeAlbApi {
        fn new(polls_to_settle: u32) -> Self {
            Self {
                inner: Mutex::new(FakeState {
                    records: HashMap::new(),
                    settling: HashMap::new(),
                    deleting: HashMap::new(),
                    polls_to_settle,
                    settled_state: "created".to_string(),
                    lose_records: false,
                    throttled_polls: 0,
                    calls: Vec::new(),
                }),
            }
        }

        fn settling_into(self, state: &str) -> Self {
            self.inner.lock().unwrap().settled_state = state.to_string();
            self
        }

        fn losing_records(self) -> Self {
            self.inner.lock().unwrap().lose_records = true;
            self
        }

        fn throttling(self, polls: u32) -> Self {
            self.inner.lock().unwrap().throttled_polls = polls;
            self
        }

        fn with_record(self, cluster_id: &str, secret_name: &str, cert_crn: &str) -> Self {
            let record = AlbSecretConfig {
                cluster_id: cluster_id.to_string(),
                secret_name: secret_name.to_string(),
                cert_crn: cert_crn.to_string(),
                domain_name: "example.com".to_string(),
                state: "created".to_string(),
                ..Default::default()
            };
            self.inner
                .lock()
                .unwrap()
                .records
                .insert(key("us-south", cluster_id, secret_name), record);
            self
        }

        fn calls(&self) -> Vec<String> {
            self.inner.lock().unwrap().calls.clone()
        }

        fn writes(&self) -> Vec<String> {
            self.calls()
                .into_iter()
                .filter(|c| !c.starts_with("get"))
                .collect()
        }
    }

    fn key(region: &str, cluster_id: &str, secret_name: &str) -> Key {
        (
            region.to_string(),
            cluster_id.to_string(),
            secret_name.to_string(),
        )
    }

    fn missing(cluster_id: &str, secret_name: &str) -> ProviderError {
        ProviderError::not_found(format!(
            "Request failed with status 404: secret {} not found in {}",
            secret_name, cluster_id
        ))
    }

    #[async_trait]
    impl AlbCertApi for FakeAlbApi {
        async fn deploy_secret(
            &self,
            params: &AlbSecretConfig,
            target: &TargetHeader,
        ) -> ProviderResult<()> {
            let mut inner = self.inner.lock().unwrap();
            inner
                .calls
                .push(format!("deploy {} {}", params.state, target.region));
            let k = key(&target.region, &params.cluster_id, &params.secret_name);
            let record = AlbSecretConfig {
                domain_name: "example.com".to_string(),
                issuer_name: "Let's Encrypt".to_string(),
                expires_on: "2027-01-01T00:00:00Z".to_string(),
                cloud_cert_instance_id: "inst-1".to_string(),
                state: "creating".to_string(),
                ..params.clone()
            };
            let polls = inner.polls_to_settle;
            inner.records.insert(k.clone(), record);
            inner.settling.insert(k, polls);
            Ok(())
        }

        async fn update_secret(
            &self,
            params: &AlbSecretConfig,
            target: &TargetHeader,
        ) -> ProviderResult<()> {
            let mut inner = self.inner.lock().unwrap();
            inner
                .calls
                .push(format!("update {} {}", params.state, target.region));
            let k = key(&target.region, &params.cluster_id, &params.secret_name);
            let polls = inner.polls_to_settle;
            let record = inner
                .records
                .get_mut(&k)
                .ok_or_else(|| missing(&params.cluster_id, &params.secret_name))?;
            record.cert_crn = params.cert_crn.clone();
            record.state = "updating".to_string();
            inner.settling.insert(k, polls);
            Ok(())
        }

        async fn remove_secret(
            &self,
            cluster_id: &str,
            secret_name: &str,
            target: &TargetHeader,
        ) -> ProviderResult<()> {
            let mut inner = self.inner.lock().unwrap();
            inner.calls.push(format!("remove {}", target.region));
            let k = key(&target.region, cluster_id, secret_name);
            if !inner.records.contains_key(&k) {
                return Err(missing(cluster_id, secret_name));
            }
            let polls = inner.polls_to_settle;
            inner.deleting.insert(k, polls);
            Ok(())
        }

        async fn get_by_name(
            &self,
            cluster_id: &str,
            secret_name: &str,
            target: &TargetHeader,
        ) -> ProviderResult<AlbSecretConfig> {
            let mut inner = self.inner.lock().unwrap();
            inner.calls.push(format!("get {}", target.region));
            let k = key(&target.region, cluster_id, secret_name);

            if inner.lose_records {
                return Err(missing(cluster_id, secret_name));
            }

            if inner.throttled_polls > 0 {
                inner.throttled_polls -= 1;
                return Err(ProviderError::new(
                    ErrorKind::NotReady,
                    "Request failed with status 429: rate limited",
                ));
            }

            if let Some(remaining) = inner.deleting.get(&k).copied() {
                if remaining == 0 {
                    inner.deleting.remove(&k);
                    inner.records.remove(&k);
                    return Err(missing(cluster_id, secret_name));
                }
                inner.deleting.insert(k.clone(), remaining - 1);
                let record = inner.records.get_mut(&k).unwrap();
                record.state = "deleting".to_string();
                return Ok(record.clone());
            }

            let settled_state = inner.settled_state.clone();
            let remaining = inner.settling.get(&k).copied();
            match remaining {
                Some(0) => {
                    inner.settling.remove(&k);
                    if let Some(record) = inner.records.get_mut(&k) {
                        record.state = settled_state;
                    }
                }
                Some(n) => {
                    inner.settling.insert(k.clone(), n - 1);
                }
                None => {}
            }

            inner
                .records
                .get(&k)
                .cloned()
                .ok_or_else(|| missing(cluster_id, secret_name))
        }
    }

    fn provider(api: FakeAlbApi) -> IbmProvider<FakeAlbApi> {
        let session = ClientSession::new(SessionConfig::default()).unwrap();
        IbmProvider::new(api, session).with_poll_interval(Duration::from_secs(10))
    }

    fn declared(cert_crn: &str) -> Resource {
        Resource::new(RESOURCE_TYPE, "web")
            .with_attribute("cert_crn", Value::String(cert_crn.to_string()))
            .with_attribute("cluster_id", Value::String("c1".to_string()))
            .with_attribute("secret_name", Value::String("s1".to_string()))
    }

    #[tokio::test(start_paused = true)]
    async fn create_deploys_waits_and_reads_back() {
        let provider = provider(FakeAlbApi::new(2));

        let state = provider.create_alb_cert(&declared(CERT_CRN)).await.unwrap();

        assert!(state.exists);
        assert_eq!(state.identifier.as_deref(), Some("c1/s1"));
        assert_eq!(state.get_str("cert_crn"), Some(CERT_CRN));
        assert_eq!(state.get_str("domain_name"), Some("example.com"));
        assert_eq!(state.get_str("issuer_name"), Some("Let's Encrypt"));
        assert_eq!(state.get_str("cloud_cert_instance_id"), Some("inst-1"));
        assert_eq!(state.get_str("region"), Some("us-south"));
        assert_eq!(provider.client.writes(), vec!["deploy update_false us-south"]);
        // three polls while waiting, one read afterwards
        assert_eq!(provider.client.calls().len(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn create_uses_resource_region_override() {
        let provider = provider(FakeAlbApi::new(0));
        let resource =
            declared(CERT_CRN).with_attribute("region", Value::String("eu-de".to_string()));

        let state = provider.create_alb_cert(&resource).await.unwrap();

        assert_eq!(state.get_str("region"), Some("eu-de"));
        assert!(provider.client.calls().iter().all(|c| c.ends_with("eu-de")));
    }

    #[tokio::test(start_paused = true)]
    async fn region_override_is_used_for_every_later_call() {
        let provider = provider(FakeAlbApi::new(0));
        let resource =
            declared(CERT_CRN).with_attribute("region", Value::String("eu-de".to_string()));
        let created = provider.create_alb_cert(&resource).await.unwrap();
        let region = created.get_str("region");
        let id = ResourceId::new(RESOURCE_TYPE, "web");
        let dynamic: &dyn Provider = &provider;

        let state = dynamic.read(&id, "c1/s1", region).await.unwrap();
        assert!(state.exists);
        assert_eq!(state.get_str("cert_crn"), Some(CERT_CRN));
        assert!(dynamic.exists(&id, "c1/s1", region).await.unwrap());
        dynamic.delete(&id, "c1/s1", region).await.unwrap();

        assert!(provider.client.calls().iter().all(|c| c.ends_with("eu-de")));
        assert!(!dynamic.exists(&id, "c1/s1", region).await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn session_region_does_not_see_overridden_binding() {
        let provider = provider(FakeAlbApi::new(0));
        let resource =
            declared(CERT_CRN).with_attribute("region", Value::String("eu-de".to_string()));
        provider.create_alb_cert(&resource).await.unwrap();
        let id = ResourceId::new(RESOURCE_TYPE, "web");

        let state = provider.read_resource(&id, "c1/s1", None).await.unwrap();

        assert!(!state.exists);
        assert_eq!(provider.client.calls().last().map(String::as_str), Some("get us-south"));
    }

    #[tokio::test(start_paused = true)]
    async fn create_keeps_polling_through_throttling() {
        let provider = provider(FakeAlbApi::new(0).throttling(2));

        let state = provider.create_alb_cert(&declared(CERT_CRN)).await.unwrap();

        assert!(state.exists);
        assert_eq!(state.get_str("cert_crn"), Some(CERT_CRN));
    }

    #[tokio::test(start_paused = true)]
    async fn create_reports_remote_failure() {
        let provider = provider(FakeAlbApi::new(1).settling_into("deploy_failed"));

        let err = provider
            .create_alb_cert(&declared(CERT_CRN))
            .await
            .unwrap_err();

        assert_eq!(err.kind, ErrorKind::RemoteFailure);
        assert!(
            err.message
                .contains("Error waiting for create resource alb cert (c1/s1)")
        );
        assert!(err.message.contains("deploy_failed"));
    }

    #[tokio::test(start_paused = true)]
    async fn create_fails_when_secret_disappears() {
        let provider = provider(FakeAlbApi::new(2).losing_records());

        let err = provider
            .create_alb_cert(&declared(CERT_CRN))
            .await
            .unwrap_err();

        assert_eq!(err.kind, ErrorKind::NotFound);
        assert!(err.message.contains("does not exist anymore"));
        // one poll, no retries
        assert_eq!(provider.client.calls().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn create_times_out_when_never_settling() {
        let provider = provider(FakeAlbApi::new(u32::MAX))
            .with_timeouts(ResourceTimeouts::uniform(Duration::from_secs(30)));

        let err = provider
            .create_alb_cert(&declared(CERT_CRN))
            .await
            .unwrap_err();

        assert_eq!(err.kind, ErrorKind::Timeout);
        assert!(err.message.contains("last state: 'creating'"));
    }

    #[tokio::test(start_paused = true)]
    async fn create_rejects_invalid_resource_without_calling_api() {
        let provider = provider(FakeAlbApi::new(0));
        let resource = Resource::new(RESOURCE_TYPE, "web")
            .with_attribute("cluster_id", Value::String("c1".to_string()))
            .with_attribute("secret_name", Value::String("s1".to_string()))
            .with_attribute("domain_name", Value::String("example.com".to_string()));

        let err = provider.create_alb_cert(&resource).await.unwrap_err();

        assert_eq!(err.kind, ErrorKind::Validation);
        assert!(err.message.contains("Required attribute 'cert_crn' is missing"));
        assert!(err.message.contains("'domain_name' is computed"));
        assert!(provider.client.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn read_missing_secret_is_not_found_state() {
        let provider = provider(FakeAlbApi::new(0));
        let id = ResourceId::new(RESOURCE_TYPE, "web");

        let state = provider.read_alb_cert(&id, "c1/s1", None).await.unwrap();

        assert!(!state.exists);
    }

    #[tokio::test(start_paused = true)]
    async fn malformed_identifier_is_rejected() {
        let provider = provider(FakeAlbApi::new(0));
        let id = ResourceId::new(RESOURCE_TYPE, "web");

        for identifier in ["c1", "c1/s1/extra"] {
            let err = provider
                .read_alb_cert(&id, identifier, None)
                .await
                .unwrap_err();
            assert_eq!(err.kind, ErrorKind::MalformedIdentifier);

            let err = provider
                .alb_cert_exists(&id, identifier, None)
                .await
                .unwrap_err();
            assert_eq!(err.kind, ErrorKind::MalformedIdentifier);
        }
        assert!(provider.client.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn update_replaces_certificate_and_waits() {
        let provider = provider(FakeAlbApi::new(1).with_record("c1", "s1", CERT_CRN));
        let id = ResourceId::new(RESOURCE_TYPE, "web");
        let from = provider.read_alb_cert(&id, "c1/s1", None).await.unwrap();

        let state = provider
            .update_alb_cert(&id, "c1/s1", &from, &declared(NEW_CERT_CRN))
            .await
            .unwrap();

        assert_eq!(state.get_str("cert_crn"), Some(NEW_CERT_CRN));
        assert_eq!(provider.client.writes(), vec!["update update_true us-south"]);
    }

    #[tokio::test(start_paused = true)]
    async fn update_without_certificate_change_skips_api_write() {
        let provider = provider(FakeAlbApi::new(0).with_record("c1", "s1", CERT_CRN));
        let id = ResourceId::new(RESOURCE_TYPE, "web");
        let from = provider.read_alb_cert(&id, "c1/s1", None).await.unwrap();

        let state = provider
            .update_alb_cert(&id, "c1/s1", &from, &declared(CERT_CRN))
            .await
            .unwrap();

        assert!(state.exists);
        assert!(provider.client.writes().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn update_rejects_force_new_change() {
        let provider = provider(FakeAlbApi::new(0).with_record("c1", "s1", CERT_CRN));
        let id = ResourceId::new(RESOURCE_TYPE, "web");
        let from = provider.read_alb_cert(&id, "c1/s1", None).await.unwrap();
        let to = declared(CERT_CRN).with_attribute("secret_name", Value::String("s2".to_string()));

        let err = provider
            .update_alb_cert(&id, "c1/s1", &from, &to)
            .await
            .unwrap_err();

        assert_eq!(err.kind, ErrorKind::Validation);
        assert!(err.message.contains("secret_name requires replacing"));
        assert!(provider.client.writes().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn delete_waits_until_secret_is_gone() {
        let provider = provider(FakeAlbApi::new(2).with_record("c1", "s1", CERT_CRN));
        let id = ResourceId::new(RESOURCE_TYPE, "web");

        assert!(provider.alb_cert_exists(&id, "c1/s1", None).await.unwrap());
        provider.delete_alb_cert(&id, "c1/s1", None).await.unwrap();

        assert!(!provider.alb_cert_exists(&id, "c1/s1", None).await.unwrap());
        assert_eq!(provider.client.writes(), vec!["remove us-south"]);
    }

    #[tokio::test(start_paused = true)]
    async fn delete_of_missing_secret_propagates_not_found() {
        let provider = provider(FakeAlbApi::new(0));
        let id = ResourceId::new(RESOURCE_TYPE, "web");

        let err = provider
            .delete_alb_cert(&id, "c1/s1", None)
            .await
            .unwrap_err();

        assert_eq!(err.kind, ErrorKind::NotFound);
    }

    #[test]
    fn cert_attributes_follow_provider_names() {
        let cert = AlbSecretConfig {
            cluster_id: "c1".to_string(),
            secret_name: "s1".to_string(),
            cluster_crn: "crn:cluster".to_string(),
            state: "created".to_string(),
            ..Default::default()
        };
        let target = TargetHeader {
            region: "jp-tok".to_string(),
        };

        let attrs = cert_attributes(&cert, &target);

        assert_eq!(attrs.get("cluster_id").map(Value::as_str), Some("c1"));
        assert_eq!(
            attrs.get("cluster_crn").map(Value::as_str),
            Some("crn:cluster")
        );
        assert_eq!(attrs.get("region").map(Value::as_str), Some("jp-tok"));
        assert!(!attrs.contains_key("state"));
        assert_eq!(attrs.get("domain_name").map(Value::as_str), Some(""));
        assert_eq!(cert.field("certCrn"), Some(""));
        assert_eq!(cert.field("notAField"), None);
    }
}
