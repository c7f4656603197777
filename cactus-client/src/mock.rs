//! In-memory `InstanceApi` for tests and offline runs of the panel.

use crate::{ApiError, InstanceApi};
use async_trait::async_trait;
use cactus_common::{CreationRequest, Instance, InstanceStatus, RepoValidation};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    List,
    Get,
    Create,
    Delete,
    Status,
    Validate,
}

#[derive(Default)]
struct MockState {
    instances: Vec<Instance>,
    // Front of the queue is served next; the last entry sticks once reached.
    statuses: HashMap<String, VecDeque<InstanceStatus>>,
    validations: HashMap<String, RepoValidation>,
    create_status: Option<u16>,
    failing: HashSet<Endpoint>,
    delays: HashMap<Endpoint, VecDeque<Duration>>,
    calls: HashMap<Endpoint, usize>,
    status_calls: HashMap<String, usize>,
    created: Vec<CreationRequest>,
    deleted: Vec<String>,
    validated: Vec<String>,
}

#[derive(Default)]
pub struct MockInstanceApi {
    state: Mutex<MockState>,
}

impl MockInstanceApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_instances(instances: Vec<Instance>) -> Self {
        let api = Self::new();
        api.set_instances(instances);
        api
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        // A panicking test thread must not hide the state from the others.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn set_instances(&self, instances: Vec<Instance>) {
        self.lock().instances = instances;
    }

    pub fn instances(&self) -> Vec<Instance> {
        self.lock().instances.clone()
    }

    /// Statuses served in order for `instance_id`; the last one repeats.
    /// Instances without a script stay `Pending`.
    pub fn script_status(&self, instance_id: &str, sequence: Vec<InstanceStatus>) {
        self.lock()
            .statuses
            .insert(instance_id.to_string(), sequence.into());
    }

    pub fn set_validation(&self, repo_url: &str, verdict: RepoValidation) {
        self.lock()
            .validations
            .insert(repo_url.to_string(), verdict);
    }

    pub fn set_create_status(&self, status: u16) {
        self.lock().create_status = Some(status);
    }

    pub fn fail(&self, endpoint: Endpoint) {
        self.lock().failing.insert(endpoint);
    }

    pub fn recover(&self, endpoint: Endpoint) {
        self.lock().failing.remove(&endpoint);
    }

    /// Hold the next call to `endpoint` for `delay` before answering.
    pub fn delay_next(&self, endpoint: Endpoint, delay: Duration) {
        self.lock()
            .delays
            .entry(endpoint)
            .or_default()
            .push_back(delay);
    }

    pub fn calls(&self, endpoint: Endpoint) -> usize {
        self.lock().calls.get(&endpoint).copied().unwrap_or(0)
    }

    pub fn status_calls_for(&self, instance_id: &str) -> usize {
        self.lock()
            .status_calls
            .get(instance_id)
            .copied()
            .unwrap_or(0)
    }

    pub fn created_requests(&self) -> Vec<CreationRequest> {
        self.lock().created.clone()
    }

    pub fn deleted_ids(&self) -> Vec<String> {
        self.lock().deleted.clone()
    }

    pub fn validated_urls(&self) -> Vec<String> {
        self.lock().validated.clone()
    }

    /// Count the call, then wait out any queued delay. The failure check runs
    /// after the delay so a test can flip it while a request is in flight.
    async fn enter(&self, endpoint: Endpoint) -> Result<(), ApiError> {
        let delay = {
            let mut state = self.lock();
            *state.calls.entry(endpoint).or_insert(0) += 1;
            state
                .delays
                .get_mut(&endpoint)
                .and_then(|queue| queue.pop_front())
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.lock().failing.contains(&endpoint) {
            return Err(ApiError::Unavailable(format!("mock {:?} unavailable", endpoint)));
        }
        Ok(())
    }
}

#[async_trait]
impl InstanceApi for MockInstanceApi {
    async fn list_instances(&self) -> Result<Vec<Instance>, ApiError> {
        // Snapshot before any delay so a slow response carries the old list.
        let snapshot = self.instances();
        self.enter(Endpoint::List).await?;
        Ok(snapshot)
    }

    async fn get_instance(&self, instance_id: &str) -> Result<Instance, ApiError> {
        self.enter(Endpoint::Get).await?;
        self.lock()
            .instances
            .iter()
            .find(|i| i.id == instance_id)
            .cloned()
            .ok_or_else(|| ApiError::UnexpectedStatus {
                path: cactus_common::paths::vm(instance_id),
                status: 404,
            })
    }

    async fn create_instance(&self, request: &CreationRequest) -> Result<u16, ApiError> {
        self.enter(Endpoint::Create).await?;
        let mut state = self.lock();
        state.created.push(request.clone());
        Ok(state.create_status.unwrap_or(200))
    }

    async fn delete_instance(&self, instance_id: &str) -> Result<(), ApiError> {
        self.enter(Endpoint::Delete).await?;
        let mut state = self.lock();
        state.deleted.push(instance_id.to_string());
        state.instances.retain(|i| i.id != instance_id);
        Ok(())
    }

    async fn instance_status(&self, instance_id: &str) -> Result<InstanceStatus, ApiError> {
        *self
            .lock()
            .status_calls
            .entry(instance_id.to_string())
            .or_insert(0) += 1;
        self.enter(Endpoint::Status).await?;
        let mut state = self.lock();
        let Some(queue) = state.statuses.get_mut(instance_id) else {
            return Ok(InstanceStatus::Pending);
        };
        let status = if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().copied()
        };
        Ok(status.unwrap_or(InstanceStatus::Pending))
    }

    async fn validate_repository(&self, repo_url: &str) -> Result<RepoValidation, ApiError> {
        self.lock().validated.push(repo_url.to_string());
        self.enter(Endpoint::Validate).await?;
        Ok(self
            .lock()
            .validations
            .get(repo_url)
            .copied()
            .unwrap_or(RepoValidation::Invalid))
    }
}
