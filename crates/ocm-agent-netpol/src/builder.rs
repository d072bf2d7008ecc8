//! Desired-state construction for the agent's NetworkPolicies
//!
//! Every OcmAgent gets two policies in [`OCM_AGENT_NAMESPACE`]:
//!
//! - **Companion policy**: lets the managed-upgrade-operator reach the agent.
//! - **Isolation policy**: lets the Alertmanager feeding the agent reach its
//!   webhook port. Which Alertmanager depends on the agent's variant.
//!
//! Builders are pure. Label maps are `BTreeMap` and rules are pushed in a
//! fixed order, so building twice from the same descriptor yields equal specs.
//! The reconciler relies on that to detect drift without churn.

use std::collections::BTreeMap;

use k8s_openapi::api::networking::v1::{
    NetworkPolicy, NetworkPolicyIngressRule, NetworkPolicyPeer, NetworkPolicyPort,
    NetworkPolicySpec,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;

use ocm_agent_common::{
    FIELD_MANAGER, MANAGED_BY_LABEL, MONITORING_NAMESPACE, MUO_NAMESPACE, NAMESPACE_NAME_LABEL,
    OCM_AGENT_NAMESPACE, OCM_AGENT_PORT, RHOBS_NAMESPACE,
};

use crate::descriptor::{AgentDescriptor, AgentVariant};

/// Name suffix of the companion (managed-upgrade-operator) policy
pub const COMPANION_POLICY_SUFFIX: &str = "-allow-muo-communication";

/// Name suffix of the isolation policy for a standard agent
pub const ISOLATION_POLICY_SUFFIX: &str = "-allow-only-alertmanager";

/// Name suffix of the isolation policy for a fleet agent
pub const FLEET_ISOLATION_POLICY_SUFFIX: &str = "-allow-only-rhobs-alertmanager";

/// Label key selecting the agent's pods
pub const APP_LABEL: &str = "app";

const POLICY_TYPE_INGRESS: &str = "Ingress";

/// Name of the companion policy. Identical for both variants.
pub fn companion_policy_name(agent: &AgentDescriptor) -> String {
    format!("{}{}", agent.name, COMPANION_POLICY_SUFFIX)
}

/// Name of the isolation policy for the agent's variant
pub fn isolation_policy_name(agent: &AgentDescriptor) -> String {
    let suffix = match agent.variant {
        AgentVariant::Standard => ISOLATION_POLICY_SUFFIX,
        AgentVariant::Fleet => FLEET_ISOLATION_POLICY_SUFFIX,
    };
    format!("{}{}", agent.name, suffix)
}

/// Namespace the isolation policy admits traffic from
fn alertmanager_namespace(variant: AgentVariant) -> &'static str {
    match variant {
        AgentVariant::Standard => MONITORING_NAMESPACE,
        AgentVariant::Fleet => RHOBS_NAMESPACE,
    }
}

/// Build the policy allowing the managed-upgrade-operator to call the agent.
///
/// One ingress rule with one peer, matching the MUO namespace by its
/// well-known name label. No port restriction.
pub fn build_companion_policy(agent: &AgentDescriptor) -> NetworkPolicy {
    let rule = NetworkPolicyIngressRule {
        from: Some(vec![namespace_peer(MUO_NAMESPACE)]),
        ports: None,
    };

    policy(companion_policy_name(agent), agent, vec![rule])
}

/// Build the policy restricting ingress to the agent's Alertmanager.
///
/// Standard agents accept traffic from the cluster monitoring namespace;
/// fleet agents from the RHOBS namespace. Only the webhook port is opened.
pub fn build_isolation_policy(agent: &AgentDescriptor) -> NetworkPolicy {
    let rule = NetworkPolicyIngressRule {
        from: Some(vec![namespace_peer(alertmanager_namespace(agent.variant))]),
        ports: Some(vec![NetworkPolicyPort {
            port: Some(IntOrString::Int(OCM_AGENT_PORT)),
            protocol: Some("TCP".to_string()),
            end_port: None,
        }]),
    };

    policy(isolation_policy_name(agent), agent, vec![rule])
}

fn policy(
    name: String,
    agent: &AgentDescriptor,
    ingress: Vec<NetworkPolicyIngressRule>,
) -> NetworkPolicy {
    NetworkPolicy {
        metadata: ObjectMeta {
            name: Some(name),
            namespace: Some(OCM_AGENT_NAMESPACE.to_string()),
            labels: Some(BTreeMap::from([(
                MANAGED_BY_LABEL.to_string(),
                FIELD_MANAGER.to_string(),
            )])),
            ..Default::default()
        },
        spec: Some(NetworkPolicySpec {
            pod_selector: LabelSelector {
                match_labels: Some(BTreeMap::from([(
                    APP_LABEL.to_string(),
                    agent.selector.clone(),
                )])),
                match_expressions: None,
            },
            ingress: Some(ingress),
            policy_types: Some(vec![POLICY_TYPE_INGRESS.to_string()]),
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn namespace_peer(namespace: &str) -> NetworkPolicyPeer {
    NetworkPolicyPeer {
        namespace_selector: Some(LabelSelector {
            match_labels: Some(BTreeMap::from([(
                NAMESPACE_NAME_LABEL.to_string(),
                namespace.to_string(),
            )])),
            match_expressions: None,
        }),
        pod_selector: None,
        ip_block: None,
    }
}
