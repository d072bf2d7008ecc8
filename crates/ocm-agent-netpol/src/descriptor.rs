//! Reconcile input derived from an OcmAgent

use kube::ResourceExt;

use ocm_agent_common::crd::OcmAgent;
use ocm_agent_common::Error;

/// Deployment mode of an OCM Agent
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AgentVariant {
    /// Classic agent fed by the in-cluster Alertmanager
    Standard,
    /// Fleet agent fed by the RHOBS Alertmanager
    Fleet,
}

impl AgentVariant {
    /// The other variant; used to find policies left behind by a mode switch
    pub fn opposite(self) -> Self {
        match self {
            Self::Standard => Self::Fleet,
            Self::Fleet => Self::Standard,
        }
    }
}

/// Everything a reconcile pass needs to know about one OcmAgent.
///
/// Immutable for the duration of a pass.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AgentDescriptor {
    /// OcmAgent name; prefix of every managed policy name
    pub name: String,
    /// Namespace the OcmAgent lives in
    pub namespace: String,
    /// UID of the OcmAgent, recorded in owner references
    pub uid: String,
    /// Value of the `app` label on the agent's pods
    pub selector: String,
    /// Deployment mode
    pub variant: AgentVariant,
}

impl AgentDescriptor {
    /// Build a descriptor by hand. The pod selector defaults to the name.
    pub fn new(
        name: impl Into<String>,
        namespace: impl Into<String>,
        uid: impl Into<String>,
        variant: AgentVariant,
    ) -> Self {
        let name = name.into();
        Self {
            selector: name.clone(),
            name,
            namespace: namespace.into(),
            uid: uid.into(),
            variant,
        }
    }

    /// Derive the descriptor from a live OcmAgent.
    ///
    /// The API server always populates name and uid; a resource without them
    /// was not read from the cluster and is rejected.
    pub fn from_agent(agent: &OcmAgent) -> Result<Self, Error> {
        let name = agent.name_any();
        if name.is_empty() {
            return Err(Error::validation("<unnamed>", "OcmAgent has no name"));
        }
        let uid = agent
            .uid()
            .ok_or_else(|| Error::validation(&name, "OcmAgent has no uid"))?;
        let namespace = agent
            .namespace()
            .ok_or_else(|| Error::validation(&name, "OcmAgent has no namespace"))?;
        let variant = if agent.spec.fleet_mode {
            AgentVariant::Fleet
        } else {
            AgentVariant::Standard
        };

        Ok(Self::new(name, namespace, uid, variant))
    }

    /// Same agent, other deployment mode
    pub fn with_variant(&self, variant: AgentVariant) -> Self {
        Self {
            variant,
            ..self.clone()
        }
    }
}
