//! Object store seam for NetworkPolicies
//!
//! The reconciler only talks to [`PolicyStore`], so tests substitute mocks or
//! in-memory fakes. [`KubePolicyStore`] is the production implementation.

use async_trait::async_trait;
use k8s_openapi::api::networking::v1::NetworkPolicy;
use kube::api::{Api, DeleteParams, PostParams};
use kube::{Client, ResourceExt};
use tracing::debug;

#[cfg(test)]
use mockall::automock;

use ocm_agent_common::{Error, FIELD_MANAGER};

/// Trait abstracting NetworkPolicy storage
///
/// "Not found" is reported as `Ok(None)` from [`get`](PolicyStore::get) and
/// never as an error; it drives the create branch of the reconciler.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait PolicyStore: Send + Sync {
    /// Fetch a NetworkPolicy by namespace and name
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<NetworkPolicy>, Error>;

    /// Create a NetworkPolicy in the namespace named by its metadata
    async fn create(&self, policy: &NetworkPolicy) -> Result<(), Error>;

    /// Overwrite the spec of an existing NetworkPolicy
    ///
    /// Implementations must keep the identity metadata the store assigned
    /// (uid, owner references) that `policy` does not carry. When `policy`
    /// carries a resource version, the write must fail if the stored object
    /// has moved past it.
    async fn update(&self, policy: &NetworkPolicy) -> Result<(), Error>;

    /// Delete a NetworkPolicy. Deleting an absent object succeeds.
    async fn delete(&self, namespace: &str, name: &str) -> Result<(), Error>;
}

/// [`PolicyStore`] backed by the Kubernetes API server
pub struct KubePolicyStore {
    client: Client,
    field_manager: String,
}

impl KubePolicyStore {
    /// Create a store writing with the operator's field manager
    pub fn new(client: Client) -> Self {
        Self {
            client,
            field_manager: FIELD_MANAGER.to_string(),
        }
    }

    fn api(&self, namespace: &str) -> Api<NetworkPolicy> {
        Api::namespaced(self.client.clone(), namespace)
    }

    fn post_params(&self) -> PostParams {
        PostParams {
            field_manager: Some(self.field_manager.clone()),
            ..Default::default()
        }
    }
}

/// Namespace and name of a policy about to be written
fn identity(policy: &NetworkPolicy) -> Result<(String, String), Error> {
    let name = policy.name_any();
    let namespace = policy
        .namespace()
        .ok_or_else(|| Error::validation(&name, "NetworkPolicy has no namespace"))?;
    Ok((namespace, name))
}

/// Lay the desired spec and labels over the live object.
///
/// Server-assigned metadata survives. A resource version on `desired` wins
/// over the live one, so the API server rejects the replace with a 409 when
/// the object changed after the caller read it.
fn overlay(mut live: NetworkPolicy, desired: &NetworkPolicy) -> NetworkPolicy {
    live.spec = desired.spec.clone();
    if let Some(labels) = &desired.metadata.labels {
        live.labels_mut()
            .extend(labels.iter().map(|(k, v)| (k.clone(), v.clone())));
    }
    if let Some(version) = &desired.metadata.resource_version {
        live.metadata.resource_version = Some(version.clone());
    }
    live
}

#[async_trait]
impl PolicyStore for KubePolicyStore {
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<NetworkPolicy>, Error> {
        match self.api(namespace).get(name).await {
            Ok(np) => Ok(Some(np)),
            Err(kube::Error::Api(ae)) if ae.code == 404 => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn create(&self, policy: &NetworkPolicy) -> Result<(), Error> {
        let (namespace, _) = identity(policy)?;
        self.api(&namespace)
            .create(&self.post_params(), policy)
            .await?;
        Ok(())
    }

    async fn update(&self, policy: &NetworkPolicy) -> Result<(), Error> {
        let (namespace, name) = identity(policy)?;
        let api = self.api(&namespace);

        let live = api.get(&name).await?;
        api.replace(&name, &self.post_params(), &overlay(live, policy))
            .await?;
        Ok(())
    }

    async fn delete(&self, namespace: &str, name: &str) -> Result<(), Error> {
        match self
            .api(namespace)
            .delete(name, &DeleteParams::default())
            .await
        {
            Ok(_) => Ok(()),
            Err(kube::Error::Api(ae)) if ae.code == 404 => {
                debug!(namespace = %namespace, policy = %name, "NetworkPolicy already gone");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}
