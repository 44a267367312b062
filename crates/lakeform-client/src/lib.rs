//! Client backends for lakeform.
//!
//! Provides the REST implementation of the core client traits. The
//! orchestrator stays backend-agnostic; tests use in-memory mocks instead.

pub mod rest;

pub use lakeform_core::client::{ClientError, ControlPlaneClient, DataPlaneClient, StepError};
pub use rest::RestClient;
