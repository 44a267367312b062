//! Core domain types and traits for the lakeform deployment orchestrator.
//!
//! This crate contains:
//! - Run identifiers and common types
//! - Resource node and deployment state types
//! - Post-deployment step types
//! - Client traits for the control plane and data plane
//! - The error taxonomy shared by all phases

pub mod client;
pub mod error;
pub mod id;
pub mod resource;
pub mod step;

pub use error::{ApplyFailure, Error, Result};
pub use id::RunId;
