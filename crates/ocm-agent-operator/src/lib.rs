//! OcmAgent operator
//!
//! Wires the NetworkPolicy reconciler into a kube-rs controller watching
//! OcmAgent resources.

#![deny(missing_docs)]

pub mod config;
pub mod controller;

pub use config::ControllerConfig;
pub use controller::{error_policy, reconcile, run, Context};
