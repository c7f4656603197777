use async_trait::async_trait;
use cactus_common::{CreationRequest, Instance, InstanceStatus, RepoValidation};

pub mod http;

pub use http::HttpInstanceApi;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("invalid API base url '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("request to {path} failed: {source}")]
    Transport {
        path: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{path} answered HTTP {status}")]
    UnexpectedStatus { path: String, status: u16 },

    #[error("could not decode response from {path}: {reason}")]
    Decode { path: String, reason: String },

    /// Failure injected by test doubles.
    #[error("{0}")]
    Unavailable(String),
}

/// The instance REST API consumed by the panel.
///
/// Every call is single-attempt; retry policy belongs to the caller.
#[async_trait]
pub trait InstanceApi: Send + Sync {
    /// `GET vms/`
    async fn list_instances(&self) -> Result<Vec<Instance>, ApiError>;

    /// `GET vms/{id}`
    async fn get_instance(&self, instance_id: &str) -> Result<Instance, ApiError>;

    /// `POST vms/`. Returns the HTTP status code; the body is not used.
    async fn create_instance(&self, request: &CreationRequest) -> Result<u16, ApiError>;

    /// `DELETE vms/{id}`. The response payload is ignored.
    async fn delete_instance(&self, instance_id: &str) -> Result<(), ApiError>;

    /// `GET vms/{id}/status`. Unrecognised `jhub` values come back as `Pending`.
    async fn instance_status(&self, instance_id: &str) -> Result<InstanceStatus, ApiError>;

    /// `GET repos/validate/{url}`. Never returns `RepoValidation::Unset`.
    async fn validate_repository(&self, repo_url: &str) -> Result<RepoValidation, ApiError>;
}

#[cfg(feature = "mock")]
pub mod mock;
