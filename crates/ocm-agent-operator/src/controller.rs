//! OcmAgent controller
//!
//! Watches OcmAgents (and the NetworkPolicies they own) and converges each
//! agent's policies on every event and on a periodic requeue. Deleted agents
//! need no work here: their policies carry owner references and are removed
//! by the garbage collector.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use k8s_openapi::api::networking::v1::NetworkPolicy;
use kube::runtime::controller::Action;
use kube::runtime::watcher::Config as WatcherConfig;
use kube::runtime::Controller;
use kube::{Api, Client, ResourceExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use ocm_agent_common::crd::OcmAgent;
use ocm_agent_common::{Error, OCM_AGENT_NAMESPACE};
use ocm_agent_netpol::{AgentDescriptor, KubePolicyStore, PolicyReconciler};

/// Watcher timeout (seconds); must stay below the client read timeout (30s)
/// so idle watches are closed by the API server first
const WATCH_TIMEOUT_SECS: u32 = 25;

/// Shared state of the controller
pub struct Context {
    /// Policy reconciler over the cluster's store
    pub reconciler: PolicyReconciler,
    /// Requeue interval after a successful pass
    pub requeue: Duration,
    /// Requeue interval after a failed pass
    pub error_requeue: Duration,
    /// Cancelled on shutdown; in-flight passes stop before their next write
    pub shutdown: CancellationToken,
}

impl Context {
    /// Create a context talking to the API server through `client`
    pub fn new(
        client: Client,
        requeue: Duration,
        error_requeue: Duration,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            reconciler: PolicyReconciler::new(Arc::new(KubePolicyStore::new(client))),
            requeue,
            error_requeue,
            shutdown,
        }
    }
}

/// Reconcile one OcmAgent
pub async fn reconcile(agent: Arc<OcmAgent>, ctx: Arc<Context>) -> Result<Action, Error> {
    let name = agent.name_any();

    if agent.metadata.deletion_timestamp.is_some() {
        debug!(agent = %name, "OcmAgent is being deleted, leaving policies to garbage collection");
        return Ok(Action::await_change());
    }

    let descriptor = AgentDescriptor::from_agent(&agent)?;
    info!(agent = %name, variant = ?descriptor.variant, "Reconciling OcmAgent NetworkPolicies");

    ctx.reconciler
        .ensure_all(&descriptor, &ctx.shutdown)
        .await?;
    ctx.reconciler
        .remove_stale_isolation_policy(&descriptor, &ctx.shutdown)
        .await?;

    Ok(Action::requeue(ctx.requeue))
}

/// Error policy for OcmAgent reconciliation
///
/// Retryable errors requeue after the error interval; validation errors wait
/// for the OcmAgent to change.
pub fn error_policy(agent: Arc<OcmAgent>, error: &Error, ctx: Arc<Context>) -> Action {
    let name = agent.name_any();
    if !error.is_retryable() {
        warn!(agent = %name, error = %error, "OcmAgent is invalid, waiting for a change");
        return Action::await_change();
    }
    warn!(agent = %name, error = %error, "OcmAgent reconcile failed, will retry");
    Action::requeue(ctx.error_requeue)
}

/// Run the controller until a shutdown signal arrives
pub async fn run(client: Client, ctx: Arc<Context>) {
    let agents: Api<OcmAgent> = Api::all(client.clone());
    let policies: Api<NetworkPolicy> = Api::namespaced(client, OCM_AGENT_NAMESPACE);

    info!("Starting OcmAgent controller");

    Controller::new(agents, WatcherConfig::default().timeout(WATCH_TIMEOUT_SECS))
        .owns(policies, WatcherConfig::default().timeout(WATCH_TIMEOUT_SECS))
        .shutdown_on_signal()
        .run(reconcile, error_policy, ctx)
        .for_each(|result| async move {
            match result {
                Ok((obj, _)) => debug!(agent = %obj.name, "reconciled"),
                Err(e) => warn!(error = %e, "reconcile error"),
            }
        })
        .await;

    info!("OcmAgent controller stopped");
}
