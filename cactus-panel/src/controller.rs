use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use cactus_client::{ApiError, InstanceApi};
use cactus_common::{CreationRequest, Instance, InstanceSize, InstanceStatus, RepoValidation};
use tracing::{debug, info, warn};

use crate::poll::{PollRegistry, PollTicket};
use crate::settings::PanelSettings;
use crate::surfaces::{LaunchState, PanelKind, PanelSurfaces, StatusCell};

/// Number of repository inputs the creation form offers.
pub const MAX_REPO_FIELDS: usize = 16;

/// Result of a list refresh that reached the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Rows were replaced with this many instances.
    Rendered(usize),
    /// A newer refresh started while this one was in flight; nothing was drawn.
    Superseded,
}

/// Values read from the creation form.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CreationForm {
    pub python_envs: Vec<String>,
    pub repo_fields: Vec<String>,
    pub size: InstanceSize,
}

impl CreationForm {
    /// The field the repository check reads.
    pub fn primary_repo(&self) -> &str {
        self.repo_fields.first().map(String::as_str).unwrap_or("")
    }
}

#[derive(Default)]
struct PanelState {
    expanded: Option<PanelKind>,
    validation: RepoValidation,
    // Bumped on every repository edit; a check answered for an older revision is dropped.
    repo_revision: u64,
    launch: LaunchState,
    form: CreationForm,
}

struct Inner {
    api: Arc<dyn InstanceApi>,
    surfaces: PanelSurfaces,
    hub_port: u16,
    poll_interval: Duration,
    state: Mutex<PanelState>,
    // Generation of the latest list refresh; rendering happens under this lock.
    list_generation: Mutex<u64>,
    polls: PollRegistry,
}

enum PollStep {
    Again,
    Done,
}

/// Drives the instance list, the creation form and the repository check.
///
/// Cheap to clone; clones share state, surfaces and poll tasks.
#[derive(Clone)]
pub struct InstancePanelController {
    inner: Arc<Inner>,
}

impl InstancePanelController {
    pub fn new(
        api: Arc<dyn InstanceApi>,
        surfaces: PanelSurfaces,
        settings: &PanelSettings,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                api,
                surfaces,
                hub_port: settings.hub_port,
                poll_interval: settings.poll_interval,
                state: Mutex::default(),
                list_generation: Mutex::new(0),
                polls: PollRegistry::new(),
            }),
        }
    }

    // --- Instance list ---

    /// Fetch all instances, replace the table rows and make sure every listed
    /// instance has a readiness poll. Polls for instances that disappeared are
    /// cancelled. On failure the previous rows stay as they were.
    pub async fn refresh_instance_list(&self) -> Result<RefreshOutcome, ApiError> {
        let generation = {
            let mut current = self.inner.lock_list();
            *current += 1;
            *current
        };

        let instances = match self.inner.api.list_instances().await {
            Ok(instances) => instances,
            Err(e) => {
                warn!(error = %e, "instance list refresh failed, keeping previous rows");
                return Err(e);
            }
        };

        let current = self.inner.lock_list();
        if *current != generation {
            debug!(generation, latest = *current, "dropping superseded instance list");
            return Ok(RefreshOutcome::Superseded);
        }

        self.inner.surfaces.instance_table.replace_rows(&instances);
        let live: HashSet<&str> = instances.iter().map(|i| i.id.as_str()).collect();
        let cancelled = self.inner.polls.retain(&live);
        let started = instances
            .iter()
            .filter(|instance| self.poll_readiness(instance))
            .count();
        drop(current);

        info!(
            count = instances.len(),
            polls_started = started,
            polls_cancelled = cancelled,
            "instance list rendered"
        );
        Ok(RefreshOutcome::Rendered(instances.len()))
    }

    /// Start polling `instance` until its hub is ready or errored. Returns
    /// `false` when a poll for this instance is already running.
    pub fn poll_readiness(&self, instance: &Instance) -> bool {
        let Some(ticket) = self.inner.polls.ensure(instance) else {
            return false;
        };
        let inner = self.inner.clone();
        let instance = instance.clone();
        tokio::spawn(async move {
            inner.run_poll(instance, ticket).await;
        });
        true
    }

    /// Disable the row, delete the instance and refresh the list. The refresh
    /// runs whatever the delete call returned.
    pub async fn delete_instance(&self, instance_id: &str) -> Result<RefreshOutcome, ApiError> {
        self.inner.surfaces.instance_table.set_deleting(instance_id);
        match self.inner.api.delete_instance(instance_id).await {
            Ok(()) => info!(instance_id, "delete requested"),
            Err(e) => warn!(instance_id, error = %e, "delete request failed"),
        }
        self.refresh_instance_list().await
    }

    // --- Creation form ---

    /// Submit the creation form. Returns the state the launch button ends in.
    pub async fn create_instance(&self) -> LaunchState {
        let (form, validation) = {
            let mut state = self.inner.lock_state();
            if state.launch == LaunchState::Busy {
                debug!("creation already in flight, ignoring submit");
                return LaunchState::Busy;
            }
            self.inner.show_launch(&mut state, LaunchState::Busy);
            (state.form.clone(), state.validation)
        };

        let request = CreationRequest::new(form.python_envs, form.size);
        let request = match validation {
            RepoValidation::Invalid => {
                info!("repository check failed, not submitting creation request");
                return self.inner.finish_launch(LaunchState::Failed);
            }
            RepoValidation::Valid => request.with_repo_urls(&form.repo_fields),
            RepoValidation::Unset => request,
        };

        let outcome = match self.inner.api.create_instance(&request).await {
            Ok(status) if (200..300).contains(&status) => {
                info!(status, size = %request.size, "instance creation accepted");
                LaunchState::Succeeded
            }
            Ok(status) => {
                warn!(status, "instance creation rejected");
                LaunchState::Failed
            }
            Err(e) => {
                warn!(error = %e, "instance creation request failed");
                LaunchState::Failed
            }
        };
        self.inner.finish_launch(outcome)
    }

    pub fn set_python_envs(&self, envs: Vec<String>) {
        self.inner.lock_state().form.python_envs = envs;
    }

    /// Add `env` if missing, remove it otherwise. Returns whether it is now selected.
    pub fn toggle_python_env(&self, env: &str) -> bool {
        let mut state = self.inner.lock_state();
        let envs = &mut state.form.python_envs;
        if let Some(pos) = envs.iter().position(|e| e == env) {
            envs.remove(pos);
            false
        } else {
            envs.push(env.to_string());
            true
        }
    }

    pub fn set_size(&self, size: InstanceSize) {
        self.inner.lock_state().form.size = size;
    }

    pub fn form(&self) -> CreationForm {
        self.inner.lock_state().form.clone()
    }

    // --- Repository check ---

    /// A keystroke in repository field `index`. Any edit clears the last
    /// verdict and returns the launch button to idle, unless a creation
    /// request is still outstanding. Indices at or past [`MAX_REPO_FIELDS`]
    /// are ignored.
    pub fn edit_repo_field(&self, index: usize, value: &str) {
        if index >= MAX_REPO_FIELDS {
            warn!(index, max = MAX_REPO_FIELDS, "repository field out of range, ignoring edit");
            return;
        }
        let mut state = self.inner.lock_state();
        let fields = &mut state.form.repo_fields;
        if fields.len() <= index {
            fields.resize(index + 1, String::new());
        }
        fields[index] = value.to_string();
        state.repo_revision += 1;

        state.validation = RepoValidation::Unset;
        self.inner.surfaces.check_button.show(RepoValidation::Unset);
        if state.launch != LaunchState::Busy {
            self.inner.show_launch(&mut state, LaunchState::Idle);
        }
    }

    /// Check the primary repository field against the API. A verdict already
    /// shown is kept until the field is edited.
    pub async fn validate_repository(&self) -> RepoValidation {
        let (repo_url, revision) = {
            let state = self.inner.lock_state();
            if state.validation != RepoValidation::Unset {
                return state.validation;
            }
            (state.form.primary_repo().to_string(), state.repo_revision)
        };

        let verdict = match self.inner.api.validate_repository(&repo_url).await {
            Ok(verdict) => verdict,
            Err(e) => {
                warn!(repo_url = %repo_url, error = %e, "repository check failed");
                RepoValidation::Invalid
            }
        };

        let mut state = self.inner.lock_state();
        if state.repo_revision != revision {
            debug!(repo_url = %repo_url, "repository edited during check, dropping verdict");
            return state.validation;
        }
        info!(repo_url = %repo_url, ?verdict, "repository checked");
        state.validation = verdict;
        self.inner.surfaces.check_button.show(verdict);
        verdict
    }

    pub fn validation(&self) -> RepoValidation {
        self.inner.lock_state().validation
    }

    pub fn launch_state(&self) -> LaunchState {
        self.inner.lock_state().launch
    }

    // --- Panel visibility ---

    /// Expand the instance list (collapsing the form) and refresh it.
    pub async fn open_instance_list(&self) -> Result<RefreshOutcome, ApiError> {
        self.inner.expand(PanelKind::InstanceList);
        self.refresh_instance_list().await
    }

    /// Expand the creation form (collapsing the list) and clear any earlier
    /// launch outcome.
    pub fn open_creation_form(&self) {
        self.inner.expand(PanelKind::CreationForm);
        let mut state = self.inner.lock_state();
        if state.launch != LaunchState::Busy {
            self.inner.show_launch(&mut state, LaunchState::Idle);
        }
    }

    pub fn collapse_panels(&self) {
        let mut state = self.inner.lock_state();
        self.inner.surfaces.list_panel.set_expanded(false);
        self.inner.surfaces.form_panel.set_expanded(false);
        state.expanded = None;
    }

    pub fn expanded_panel(&self) -> Option<PanelKind> {
        self.inner.lock_state().expanded
    }

    // --- Lifecycle ---

    pub fn active_polls(&self) -> usize {
        self.inner.polls.active()
    }

    pub fn is_polling(&self, instance_id: &str) -> bool {
        self.inner.polls.is_polling(instance_id)
    }

    /// Cancel every readiness poll.
    pub fn shutdown(&self) {
        let cancelled = self.inner.polls.cancel_all();
        debug!(cancelled, "panel controller shut down");
    }
}

impl Inner {
    fn lock_state(&self) -> MutexGuard<'_, PanelState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock_list(&self) -> MutexGuard<'_, u64> {
        self.list_generation
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn show_launch(&self, state: &mut PanelState, launch: LaunchState) {
        state.launch = launch;
        self.surfaces.launch_button.show(launch);
    }

    fn finish_launch(&self, launch: LaunchState) -> LaunchState {
        let mut state = self.lock_state();
        self.show_launch(&mut state, launch);
        launch
    }

    fn expand(&self, kind: PanelKind) {
        let mut state = self.lock_state();
        // Collapse first so both panels are never expanded at once.
        self.surfaces.panel(kind.other()).set_expanded(false);
        self.surfaces.panel(kind).set_expanded(true);
        state.expanded = Some(kind);
    }

    async fn run_poll(&self, instance: Instance, ticket: PollTicket) {
        debug!(instance_id = %instance.id, generation = ticket.generation(), "readiness poll started");
        loop {
            let step = tokio::select! {
                _ = ticket.cancelled() => return,
                step = self.poll_once(&instance, &ticket) => step,
            };
            if let PollStep::Done = step {
                return;
            }
            tokio::select! {
                _ = ticket.cancelled() => return,
                _ = tokio::time::sleep(self.poll_interval) => {}
            }
        }
    }

    /// One status read. Errors and unknown values count as pending.
    async fn poll_once(&self, instance: &Instance, ticket: &PollTicket) -> PollStep {
        let status = match self.api.instance_status(&instance.id).await {
            Ok(status) => status,
            Err(e) => {
                warn!(instance_id = %instance.id, error = %e, "status read failed, will retry");
                InstanceStatus::Pending
            }
        };

        if status == InstanceStatus::Pending {
            return if self.polls.is_current(ticket) {
                PollStep::Again
            } else {
                PollStep::Done
            };
        }

        // The link uses the record from the latest list, which may carry an
        // address the instance did not have when this task started.
        let written = self.polls.write_if_current(ticket, |latest| {
            let cell = match status {
                InstanceStatus::Ready => StatusCell::Link(latest.hub_link(self.hub_port)),
                _ => StatusCell::Error,
            };
            self.surfaces.instance_table.set_status(&latest.id, cell);
        });
        if written {
            info!(instance_id = %instance.id, status = status.as_str(), "instance reached terminal state");
        } else {
            debug!(instance_id = %instance.id, "dropping status for replaced poll");
        }
        self.polls.finish(ticket);
        PollStep::Done
    }
}
