//! NetworkPolicy reconciliation
//!
//! Converges the policies of one OcmAgent toward their desired state:
//! build desired, fetch actual, compare specs, then create, update or leave
//! alone. Each pass starts from scratch; nothing is remembered between passes,
//! so the result is correct however often and in whatever order the control
//! loop calls in.
//!
//! Store errors are returned verbatim and never retried here. Conflicting
//! writes are serialized by the API server's resourceVersion check and come
//! back as errors for the control loop to requeue.

use std::future::Future;
use std::sync::Arc;

use k8s_openapi::api::networking::v1::NetworkPolicy;
use kube::ResourceExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use ocm_agent_common::Error;

use crate::builder::{build_companion_policy, build_isolation_policy};
use crate::descriptor::AgentDescriptor;
use crate::owner::{is_owned_by, stamp_owner};
use crate::store::PolicyStore;

/// The NetworkPolicies managed for every OcmAgent
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ManagedPolicy {
    /// Admits the managed-upgrade-operator
    Companion,
    /// Admits the agent's Alertmanager on the webhook port
    Isolation,
}

impl ManagedPolicy {
    /// Every managed policy, in the order a pass ensures them
    pub const ALL: [ManagedPolicy; 2] = [ManagedPolicy::Companion, ManagedPolicy::Isolation];

    /// Build the desired object for this policy
    pub fn build(self, agent: &AgentDescriptor) -> NetworkPolicy {
        match self {
            Self::Companion => build_companion_policy(agent),
            Self::Isolation => build_isolation_policy(agent),
        }
    }
}

/// What an [`ensure`](PolicyReconciler::ensure) call did
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EnsureOutcome {
    /// The policy was absent and has been created
    Created,
    /// The policy's spec had drifted and has been overwritten
    Updated,
    /// The policy already matched; nothing was written
    Unchanged,
}

/// Reconciles the NetworkPolicies of OcmAgents against a [`PolicyStore`]
#[derive(Clone)]
pub struct PolicyReconciler {
    store: Arc<dyn PolicyStore>,
}

impl PolicyReconciler {
    /// Create a reconciler over the given store
    pub fn new(store: Arc<dyn PolicyStore>) -> Self {
        Self { store }
    }

    /// Ensure the companion (managed-upgrade-operator) policy
    pub async fn ensure_companion_policy(
        &self,
        agent: &AgentDescriptor,
        cancel: &CancellationToken,
    ) -> Result<EnsureOutcome, Error> {
        self.ensure(agent, ManagedPolicy::Companion, cancel).await
    }

    /// Ensure the isolation (Alertmanager) policy
    pub async fn ensure_isolation_policy(
        &self,
        agent: &AgentDescriptor,
        cancel: &CancellationToken,
    ) -> Result<EnsureOutcome, Error> {
        self.ensure(agent, ManagedPolicy::Isolation, cancel).await
    }

    /// Converge one managed policy.
    ///
    /// - absent: stamp the owner reference and create
    /// - present with an identical spec: no write at all
    /// - present with a different spec: update with the freshly built object,
    ///   carrying the resource version that was read so an edit made since
    ///   then fails the write instead of being overwritten
    ///
    /// Spec comparison is full structural equality, rule order included.
    #[instrument(skip(self, agent, cancel), fields(agent = %agent.name))]
    pub async fn ensure(
        &self,
        agent: &AgentDescriptor,
        policy: ManagedPolicy,
        cancel: &CancellationToken,
    ) -> Result<EnsureOutcome, Error> {
        let mut desired = policy.build(agent);
        let name = desired.name_any();
        let namespace = desired.namespace().unwrap_or_default();
        let key = format!("{}/{}", namespace, name);

        let current = guarded(cancel, &key, self.store.get(&namespace, &name)).await?;

        let Some(current) = current else {
            stamp_owner(&mut desired, agent);
            guarded(cancel, &key, self.store.create(&desired)).await?;
            info!(policy = %key, "created NetworkPolicy");
            return Ok(EnsureOutcome::Created);
        };

        if current.spec == desired.spec {
            debug!(policy = %key, "NetworkPolicy up to date");
            return Ok(EnsureOutcome::Unchanged);
        }

        desired.metadata.resource_version = current.metadata.resource_version;
        guarded(cancel, &key, self.store.update(&desired)).await?;
        info!(policy = %key, "updated drifted NetworkPolicy");
        Ok(EnsureOutcome::Updated)
    }

    /// Ensure every managed policy of the agent.
    ///
    /// Stops at the first error; policies already converged stay converged.
    pub async fn ensure_all(
        &self,
        agent: &AgentDescriptor,
        cancel: &CancellationToken,
    ) -> Result<(), Error> {
        for policy in ManagedPolicy::ALL {
            self.ensure(agent, policy, cancel).await?;
        }
        Ok(())
    }

    /// Delete a managed policy of the agent if the agent owns it.
    ///
    /// Returns whether a delete was issued. Objects carrying no owner
    /// reference to this agent's uid are left alone.
    #[instrument(skip(self, agent, cancel), fields(agent = %agent.name))]
    pub async fn ensure_absent(
        &self,
        agent: &AgentDescriptor,
        policy: ManagedPolicy,
        cancel: &CancellationToken,
    ) -> Result<bool, Error> {
        let target = policy.build(agent);
        let name = target.name_any();
        let namespace = target.namespace().unwrap_or_default();
        let key = format!("{}/{}", namespace, name);

        let Some(current) = guarded(cancel, &key, self.store.get(&namespace, &name)).await? else {
            return Ok(false);
        };

        if !is_owned_by(&current, agent) {
            warn!(policy = %key, "NetworkPolicy not owned by this OcmAgent, leaving it in place");
            return Ok(false);
        }

        guarded(cancel, &key, self.store.delete(&namespace, &name)).await?;
        info!(policy = %key, "deleted NetworkPolicy");
        Ok(true)
    }

    /// Remove the isolation policy built for the agent's other variant.
    ///
    /// Switching an agent between standard and fleet mode renames its
    /// isolation policy; the old one would otherwise linger until the agent
    /// itself is deleted.
    pub async fn remove_stale_isolation_policy(
        &self,
        agent: &AgentDescriptor,
        cancel: &CancellationToken,
    ) -> Result<bool, Error> {
        let other = agent.with_variant(agent.variant.opposite());
        self.ensure_absent(&other, ManagedPolicy::Isolation, cancel)
            .await
    }
}

/// Run a store call unless the pass is cancelled before or during it
async fn guarded<T, F>(cancel: &CancellationToken, object: &str, call: F) -> Result<T, Error>
where
    F: Future<Output = Result<T, Error>>,
{
    if cancel.is_cancelled() {
        return Err(Error::cancelled(object));
    }
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(Error::cancelled(object)),
        result = call => result,
    }
}
