//! OcmAgent CRD
//!
//! An OcmAgent describes one OCM Agent deployment. The operator derives the
//! agent's NetworkPolicies from it and owns them through owner references.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// OcmAgent defines an OCM Agent workload.
///
/// Example:
/// ```yaml
/// apiVersion: ocmagent.managed.openshift.io/v1alpha1
/// kind: OcmAgent
/// metadata:
///   name: ocm-agent
///   namespace: openshift-ocm-agent-operator
/// spec:
///   ocmAgentImage: quay.io/app-sre/ocm-agent:latest
///   replicas: 1
///   fleetMode: false
/// ```
#[derive(CustomResource, Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "ocmagent.managed.openshift.io",
    version = "v1alpha1",
    kind = "OcmAgent",
    namespaced,
    printcolumn = r#"{"name":"Fleet","type":"boolean","jsonPath":".spec.fleetMode"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct OcmAgentSpec {
    /// Container image of the agent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ocm_agent_image: Option<String>,

    /// Desired replica count of the agent deployment
    #[serde(default = "default_replicas")]
    pub replicas: i32,

    /// Run the agent in fleet mode (receives alerts from RHOBS instead of the
    /// in-cluster Alertmanager)
    #[serde(default)]
    pub fleet_mode: bool,
}

fn default_replicas() -> i32 {
    1
}

impl Default for OcmAgentSpec {
    fn default() -> Self {
        Self {
            ocm_agent_image: None,
            replicas: default_replicas(),
            fleet_mode: false,
        }
    }
}
