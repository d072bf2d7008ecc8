//! Common types for the OCM Agent operator: CRD, errors, constants and logging

#![deny(missing_docs)]

pub mod crd;
pub mod error;
pub mod telemetry;

pub use error::Error;

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Namespace holding every NetworkPolicy managed for an OcmAgent.
///
/// Fixed for the whole process and independent of the OcmAgent's own namespace.
pub const OCM_AGENT_NAMESPACE: &str = "openshift-ocm-agent-operator";

/// Namespace of the managed-upgrade-operator, the companion service allowed to
/// call the agent
pub const MUO_NAMESPACE: &str = "openshift-managed-upgrade-operator";

/// Namespace of the in-cluster Alertmanager that feeds a standard agent
pub const MONITORING_NAMESPACE: &str = "openshift-monitoring";

/// Namespace of the RHOBS Alertmanager that feeds a fleet agent
pub const RHOBS_NAMESPACE: &str = "openshift-observability-operator";

/// Well-known label the API server sets on every namespace to its own name
pub const NAMESPACE_NAME_LABEL: &str = "kubernetes.io/metadata.name";

/// Port the OCM Agent serves its webhook on
pub const OCM_AGENT_PORT: i32 = 8081;

/// Label marking objects managed by this operator
pub const MANAGED_BY_LABEL: &str = "app.kubernetes.io/managed-by";

/// Field manager used for every write issued by the operator
pub const FIELD_MANAGER: &str = "ocm-agent-operator";
