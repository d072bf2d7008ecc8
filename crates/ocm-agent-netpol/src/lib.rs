//! NetworkPolicy management for OcmAgent workloads
//!
//! Every OcmAgent is isolated by two NetworkPolicies in the operator's
//! namespace. This crate computes them and converges the cluster onto them:
//!
//! - [`builder`]: pure desired-state construction
//! - [`store`]: the [`PolicyStore`] seam over the API server
//! - [`owner`]: owner references for garbage collection
//! - [`reconciler`]: get, compare, then create / update / no-op

#![deny(missing_docs)]

pub mod builder;
pub mod descriptor;
pub mod owner;
pub mod reconciler;
pub mod store;

pub use descriptor::{AgentDescriptor, AgentVariant};
pub use reconciler::{EnsureOutcome, ManagedPolicy, PolicyReconciler};
pub use store::{KubePolicyStore, PolicyStore};
