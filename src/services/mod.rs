//! # Services
//!
//! Reconcilers for individual resource types, each built on the convergence
//! engine.

pub mod securitygroups;
