//! Owner references linking managed policies to their OcmAgent
//!
//! The API server's garbage collector deletes a policy once its controlling
//! OcmAgent is gone. Links are only stamped on creation.

use k8s_openapi::api::networking::v1::NetworkPolicy;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::Resource;

use ocm_agent_common::crd::OcmAgent;

use crate::descriptor::AgentDescriptor;

/// Owner reference pointing at the agent, as controller with blocking deletion
pub fn owner_reference(agent: &AgentDescriptor) -> OwnerReference {
    OwnerReference {
        api_version: OcmAgent::api_version(&()).into_owned(),
        kind: OcmAgent::kind(&()).into_owned(),
        name: agent.name.clone(),
        uid: agent.uid.clone(),
        controller: Some(true),
        block_owner_deletion: Some(true),
    }
}

/// Append an owner reference for `agent` to the policy's metadata
pub fn stamp_owner(policy: &mut NetworkPolicy, agent: &AgentDescriptor) {
    policy
        .metadata
        .owner_references
        .get_or_insert_with(Vec::new)
        .push(owner_reference(agent));
}

/// Whether any owner reference on the policy carries the agent's uid
pub fn is_owned_by(policy: &NetworkPolicy, agent: &AgentDescriptor) -> bool {
    policy
        .metadata
        .owner_references
        .as_deref()
        .unwrap_or_default()
        .iter()
        .any(|r| r.uid == agent.uid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::build_companion_policy;
    use crate::descriptor::AgentVariant;

    fn agent() -> AgentDescriptor {
        AgentDescriptor::new(
            "ocm-agent",
            "openshift-ocm-agent-operator",
            "uid-1",
            AgentVariant::Standard,
        )
    }

    #[test]
    fn stamp_appends_single_controller_reference() {
        let mut np = build_companion_policy(&agent());
        stamp_owner(&mut np, &agent());

        let refs = np.metadata.owner_references.as_ref().unwrap();
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].kind, "OcmAgent");
        assert_eq!(refs[0].api_version, "ocmagent.managed.openshift.io/v1alpha1");
        assert_eq!(refs[0].name, "ocm-agent");
        assert_eq!(refs[0].uid, "uid-1");
        assert_eq!(refs[0].controller, Some(true));
        assert_eq!(refs[0].block_owner_deletion, Some(true));
    }

    #[test]
    fn stamp_keeps_existing_references() {
        let mut np = build_companion_policy(&agent());
        np.metadata.owner_references = Some(vec![OwnerReference {
            api_version: "v1".to_string(),
            kind: "ConfigMap".to_string(),
            name: "other".to_string(),
            uid: "uid-other".to_string(),
            ..Default::default()
        }]);
        stamp_owner(&mut np, &agent());
        assert_eq!(np.metadata.owner_references.unwrap().len(), 2);
    }

    #[test]
    fn ownership_matches_on_uid() {
        let mut np = build_companion_policy(&agent());
        assert!(!is_owned_by(&np, &agent()));

        stamp_owner(&mut np, &agent());
        assert!(is_owned_by(&np, &agent()));

        let impostor = AgentDescriptor::new(
            "ocm-agent",
            "openshift-ocm-agent-operator",
            "uid-recreated",
            AgentVariant::Standard,
        );
        assert!(!is_owned_by(&np, &impostor));
    }
}
