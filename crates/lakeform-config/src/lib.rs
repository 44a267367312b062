//! KDL configuration parsing for lakeform.
//!
//! This crate handles parsing of:
//! - Deployment definitions (deploy.kdl): resource nodes and post-deployment
//!   steps
//! - Placeholder templating against accumulated resource outputs

pub mod deployment;
pub mod error;
pub mod template;

pub use deployment::{DeploymentConfig, parse_deployment};
pub use error::{ConfigError, ConfigResult};
pub use template::{TemplateContext, TemplateError};
