use crate::{ApiError, InstanceApi};
use async_trait::async_trait;
use cactus_common::{
    paths, CreationRequest, Instance, InstanceStatus, RepoValidation, StatusResponse,
    ValidationResponse,
};
use reqwest::{Client, Response, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;

pub struct HttpInstanceApi {
    client: Client,
    base_url: Url,
}

impl HttpInstanceApi {
    /// `base_url` is the directory the REST paths hang off (e.g.
    /// `http://127.0.0.1:9991/path-hash/`). A missing trailing slash is added so
    /// relative joins keep the last segment.
    pub fn new(
        base_url: &str,
        connect_timeout: Duration,
        request_timeout: Duration,
    ) -> Result<Self, ApiError> {
        let trimmed = base_url.trim();
        let normalized = if trimmed.ends_with('/') {
            trimmed.to_string()
        } else {
            format!("{}/", trimmed)
        };
        let base_url = Url::parse(&normalized).map_err(|e| ApiError::InvalidBaseUrl {
            url: trimmed.to_string(),
            reason: e.to_string(),
        })?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::InvalidBaseUrl {
                url: trimmed.to_string(),
                reason: "url cannot be used as a base".to_string(),
            });
        }

        // Without an overall timeout a stalled API would leave a button busy forever.
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(request_timeout)
            .build()
            .map_err(ApiError::Client)?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url(&self, path: &str) -> Result<Url, ApiError> {
        self.base_url.join(path).map_err(|e| ApiError::InvalidBaseUrl {
            url: format!("{}{}", self.base_url, path),
            reason: e.to_string(),
        })
    }

    fn headers(&self) -> reqwest::header::HeaderMap {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::CONTENT_TYPE,
            reqwest::header::HeaderValue::from_static("application/json"),
        );
        headers
    }

    async fn send(
        &self,
        path: &str,
        request: reqwest::RequestBuilder,
    ) -> Result<Response, ApiError> {
        request
            .headers(self.headers())
            .send()
            .await
            .map_err(|source| ApiError::Transport {
                path: path.to_string(),
                source,
            })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let url = self.url(path)?;
        let resp = self.send(path, self.client.get(url)).await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(ApiError::UnexpectedStatus {
                path: path.to_string(),
                status: status.as_u16(),
            });
        }
        decode(path, resp).await
    }
}

async fn decode<T: DeserializeOwned>(path: &str, resp: Response) -> Result<T, ApiError> {
    let body = resp.bytes().await.map_err(|source| ApiError::Transport {
        path: path.to_string(),
        source,
    })?;
    serde_json::from_slice(&body).map_err(|e| ApiError::Decode {
        path: path.to_string(),
        reason: e.to_string(),
    })
}

#[async_trait]
impl InstanceApi for HttpInstanceApi {
    async fn list_instances(&self) -> Result<Vec<Instance>, ApiError> {
        let instances: Vec<Instance> = self.get_json(paths::PATH_VMS).await?;
        tracing::debug!(count = instances.len(), "listed instances");
        Ok(instances)
    }

    async fn get_instance(&self, instance_id: &str) -> Result<Instance, ApiError> {
        self.get_json(&paths::vm(instance_id)).await
    }

    async fn create_instance(&self, request: &CreationRequest) -> Result<u16, ApiError> {
        let path = paths::PATH_VMS;
        let url = self.url(path)?;
        let resp = self.send(path, self.client.post(url).json(request)).await?;
        let status = resp.status().as_u16();
        tracing::info!(
            status,
            size = %request.size,
            python_envs = request.python_envs.len(),
            repo_urls = request.repo_urls.as_ref().map(|u| u.len()).unwrap_or(0),
            "create instance answered"
        );
        Ok(status)
    }

    async fn delete_instance(&self, instance_id: &str) -> Result<(), ApiError> {
        let path = paths::vm(instance_id);
        let url = self.url(&path)?;
        let resp = self.send(&path, self.client.delete(url)).await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(ApiError::UnexpectedStatus {
                path,
                status: status.as_u16(),
            });
        }
        Ok(())
    }

    async fn instance_status(&self, instance_id: &str) -> Result<InstanceStatus, ApiError> {
        let resp: StatusResponse = self.get_json(&paths::vm_status(instance_id)).await?;
        Ok(resp.status())
    }

    async fn validate_repository(&self, repo_url: &str) -> Result<RepoValidation, ApiError> {
        let path = paths::repo_validate(repo_url);
        let url = self.url(&path)?;
        let resp = self.send(&path, self.client.get(url)).await?;
        let status = resp.status();

        // A rejected repository comes back as 400 with a message body, so the
        // body decides; the status only matters when there is no usable body.
        match decode::<ValidationResponse>(&path, resp).await {
            Ok(body) => Ok(body.verdict()),
            Err(_) if !status.is_success() => Err(ApiError::UnexpectedStatus {
                path,
                status: status.as_u16(),
            }),
            Err(e) => Err(e),
        }
    }
}
