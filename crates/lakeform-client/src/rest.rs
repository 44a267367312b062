//! REST implementation of the control-plane and data-plane clients.
//!
//! Endpoint layout:
//! - `PUT  {base}/deployments/{name}`          create a resource deployment
//! - `GET  {base}/deployments/{name}`          query deployment status
//! - `HEAD {base}/dataplane/{kind}/{name}`     probe a data-plane artifact
//! - `PUT  {base}/dataplane/{kind}/{name}`     apply a rendered payload
//!
//! Errors come back classified, never as text to be scanned: transport
//! timeouts and connection failures map to the connectivity class, HTTP
//! rejections to the rejected/precondition class.

use async_trait::async_trait;
use lakeform_core::client::{ClientError, ControlPlaneClient, DataPlaneClient, StepError};
use lakeform_core::resource::{DeploymentState, Outputs, ResourceKind};
use lakeform_core::step::StepKind;
use reqwest::{RequestBuilder, StatusCode};
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Request body for `PUT /deployments/{name}`.
#[derive(Debug, Serialize)]
struct CreateRequest<'a> {
    kind: ResourceKind,
    params: &'a BTreeMap<String, String>,
}

/// REST client for both planes. Assumed already authenticated: the bearer
/// token comes from the session provider (here: the environment).
pub struct RestClient {
    http: reqwest::Client,
    base_url: Url,
    token: Option<String>,
}

impl RestClient {
    pub fn new(base_url: Url, token: Option<String>) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;
        Ok(Self {
            http,
            base_url,
            token,
        })
    }

    /// Build a client with the bearer token from `LAKEFORM_TOKEN`.
    pub fn from_env(base_url: Url) -> Result<Self, reqwest::Error> {
        let token = std::env::var("LAKEFORM_TOKEN").ok();
        Self::new(base_url, token)
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.as_str().trim_end_matches('/'), path)
    }

    /// Deployment names are caller-supplied; percent-encode them into a
    /// single path segment.
    fn deployment_url(&self, name: &str) -> String {
        self.url(&format!("deployments/{}", urlencoding::encode(name)))
    }

    /// Artifact names may contain reserved characters (a storage-copy
    /// destination like `data/samples`); percent-encode them into a single
    /// path segment.
    fn dataplane_url(&self, kind: StepKind, name: &str) -> String {
        self.url(&format!("dataplane/{kind}/{}", urlencoding::encode(name)))
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }
}

fn control_error(e: reqwest::Error) -> ClientError {
    if e.is_timeout() || e.is_connect() {
        ClientError::Connectivity {
            message: e.to_string(),
        }
    } else {
        ClientError::Rejected {
            message: e.to_string(),
        }
    }
}

fn step_error(e: reqwest::Error) -> StepError {
    if e.is_timeout() || e.is_connect() {
        StepError::Connectivity {
            message: e.to_string(),
        }
    } else {
        StepError::PreconditionNotMet {
            message: e.to_string(),
        }
    }
}

/// Classify an HTTP rejection from the data plane. Gateway timeouts are the
/// connectivity class; everything else needs external remediation.
fn step_status_error(status: StatusCode, body: String) -> StepError {
    if status == StatusCode::REQUEST_TIMEOUT || status == StatusCode::GATEWAY_TIMEOUT {
        StepError::Connectivity {
            message: format!("{status}: {body}"),
        }
    } else {
        StepError::PreconditionNotMet {
            message: format!("{status}: {body}"),
        }
    }
}

#[async_trait]
impl ControlPlaneClient for RestClient {
    fn name(&self) -> &'static str {
        "rest"
    }

    async fn create(
        &self,
        kind: ResourceKind,
        name: &str,
        params: &BTreeMap<String, String>,
    ) -> Result<Outputs, ClientError> {
        let url = self.deployment_url(name);
        debug!(%url, %kind, "creating resource deployment");

        let response = self
            .authorize(self.http.put(&url))
            .json(&CreateRequest { kind, params })
            .send()
            .await
            .map_err(control_error)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Rejected {
                message: format!("{status}: {body}"),
            });
        }

        response.json::<Outputs>().await.map_err(control_error)
    }

    async fn query_status(&self, name: &str) -> Result<DeploymentState, ClientError> {
        let url = self.deployment_url(name);
        debug!(%url, "querying deployment status");

        let response = self
            .authorize(self.http.get(&url))
            .send()
            .await
            .map_err(control_error)?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(DeploymentState::NotFound);
        }
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Rejected {
                message: format!("{status}: {body}"),
            });
        }

        response
            .json::<DeploymentState>()
            .await
            .map_err(control_error)
    }
}

#[async_trait]
impl DataPlaneClient for RestClient {
    fn name(&self) -> &'static str {
        "rest"
    }

    async fn artifact_exists(&self, kind: StepKind, name: &str) -> Result<bool, StepError> {
        let url = self.dataplane_url(kind, name);
        debug!(%url, "probing data-plane artifact");

        let response = self
            .authorize(self.http.head(&url))
            .send()
            .await
            .map_err(step_error)?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(false),
            status if status.is_success() => Ok(true),
            status => Err(step_status_error(status, String::new())),
        }
    }

    async fn apply(&self, kind: StepKind, name: &str, payload: &str) -> Result<(), StepError> {
        let url = self.dataplane_url(kind, name);
        debug!(%url, %kind, "applying data-plane payload");

        let response = self
            .authorize(self.http.put(&url))
            .body(payload.to_string())
            .send()
            .await
            .map_err(step_error)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(step_status_error(status, body));
        }

        Ok(())
    }
}
