use serde::{Deserialize, Serialize};

pub mod paths;
pub mod size;

pub use size::InstanceSize;

/// Port the notebook hub listens on inside every instance.
pub const DEFAULT_HUB_PORT: u16 = 8080;

// --- Errors ---

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CommonError {
    #[error("unknown instance size '{0}' (expected micro, tiny, small, medium or large)")]
    UnknownSize(String),
}

// --- Enums ---

/// Readiness of the notebook hub on an instance, as reported by `vms/{id}/status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstanceStatus {
    Pending,
    Ready,
    Error,
}

impl InstanceStatus {
    /// Map the raw `jhub` field. Anything that is not a terminal value keeps the
    /// instance pending, so an unexpected body means "poll again".
    pub fn from_jhub(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.eq_ignore_ascii_case("ready") {
            InstanceStatus::Ready
        } else if raw.eq_ignore_ascii_case("error") {
            InstanceStatus::Error
        } else {
            InstanceStatus::Pending
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, InstanceStatus::Ready | InstanceStatus::Error)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            InstanceStatus::Pending => "pending",
            InstanceStatus::Ready => "ready",
            InstanceStatus::Error => "error",
        }
    }
}

/// Outcome of the last repository check, held by the panel controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RepoValidation {
    #[default]
    Unset,
    Valid,
    Invalid,
}

// --- Entities ---

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Instance {
    pub id: String,
    pub name: String,
    #[serde(alias = "public-ip")]
    pub public_ip: String,
}

impl Instance {
    pub fn hub_link(&self, port: u16) -> String {
        hub_link(&self.public_ip, port)
    }
}

pub fn hub_link(public_ip: &str, port: u16) -> String {
    format!("http://{}:{}", public_ip, port)
}

// --- DTOs ---

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct StatusResponse {
    #[serde(default)]
    pub jhub: String,
}

impl StatusResponse {
    pub fn status(&self) -> InstanceStatus {
        InstanceStatus::from_jhub(&self.jhub)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ValidationResponse {
    #[serde(default)]
    pub message: String,
}

impl ValidationResponse {
    pub const VALID: &'static str = "Valid";

    pub fn is_valid(&self) -> bool {
        self.message == Self::VALID
    }

    pub fn verdict(&self) -> RepoValidation {
        if self.is_valid() {
            RepoValidation::Valid
        } else {
            RepoValidation::Invalid
        }
    }
}

/// Body of `POST vms/`. Built fresh from the form on every submission.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct CreationRequest {
    pub python_envs: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo_urls: Option<Vec<String>>,
    pub size: String,
}

impl CreationRequest {
    pub fn new(python_envs: Vec<String>, size: InstanceSize) -> Self {
        Self {
            python_envs,
            repo_urls: None,
            size: size.as_str().to_string(),
        }
    }

    /// Attach repository urls, dropping blank entries. An all-blank list stays absent.
    pub fn with_repo_urls<I, S>(mut self, urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let urls: Vec<String> = urls
            .into_iter()
            .map(|u| u.as_ref().trim().to_string())
            .filter(|u| !u.is_empty())
            .collect();
        self.repo_urls = if urls.is_empty() { None } else { Some(urls) };
        self
    }
}
