//! UI surfaces the controller writes to.
//!
//! Each surface is a handle created once by the front end and handed to the
//! controller in a [`PanelSurfaces`] bundle. Surfaces only render what they are
//! told; the controller owns every piece of state they display.

use cactus_common::{Instance, RepoValidation};
use std::sync::Arc;

pub const LABEL_PENDING: &str = "Starting…";
pub const LABEL_ERROR: &str = "Error ❌";
pub const LABEL_DELETING: &str = "Deleting…";
pub const LABEL_CHECK: &str = "Check Repository";
pub const LABEL_REPO_VALID: &str = "Valid Repository ✅";
pub const LABEL_REPO_INVALID: &str = "Invalid Repository ❌";
pub const LABEL_LAUNCH: &str = "Launch";
pub const LABEL_LAUNCHING: &str = "Launching…";
pub const LABEL_LAUNCHED: &str = "Launched ✅";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PanelKind {
    InstanceList,
    CreationForm,
}

impl PanelKind {
    pub fn other(&self) -> PanelKind {
        match self {
            PanelKind::InstanceList => PanelKind::CreationForm,
            PanelKind::CreationForm => PanelKind::InstanceList,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonStyle {
    Primary,
    OutlineSuccess,
    OutlineDanger,
}

/// Content of a row's status cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusCell {
    Pending,
    Link(String),
    Error,
}

impl StatusCell {
    pub fn label(&self) -> &str {
        match self {
            StatusCell::Pending => LABEL_PENDING,
            StatusCell::Link(url) => url,
            StatusCell::Error => LABEL_ERROR,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LaunchState {
    #[default]
    Idle,
    Busy,
    Succeeded,
    Failed,
}

impl LaunchState {
    pub fn label(&self) -> &'static str {
        match self {
            LaunchState::Idle => LABEL_LAUNCH,
            LaunchState::Busy => LABEL_LAUNCHING,
            LaunchState::Succeeded => LABEL_LAUNCHED,
            LaunchState::Failed => LABEL_ERROR,
        }
    }

    pub fn style(&self) -> ButtonStyle {
        match self {
            LaunchState::Idle | LaunchState::Busy => ButtonStyle::Primary,
            LaunchState::Succeeded => ButtonStyle::OutlineSuccess,
            LaunchState::Failed => ButtonStyle::OutlineDanger,
        }
    }

    /// Only an outstanding request disables the launch button.
    pub fn is_enabled(&self) -> bool {
        !matches!(self, LaunchState::Busy)
    }
}

/// Visual attributes of the repository check button, derived from the validation state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckButtonLook {
    pub label: &'static str,
    pub style: ButtonStyle,
    pub enabled: bool,
}

pub fn check_button_look(validation: RepoValidation) -> CheckButtonLook {
    match validation {
        RepoValidation::Unset => CheckButtonLook {
            label: LABEL_CHECK,
            style: ButtonStyle::Primary,
            enabled: true,
        },
        RepoValidation::Valid => CheckButtonLook {
            label: LABEL_REPO_VALID,
            style: ButtonStyle::OutlineSuccess,
            enabled: false,
        },
        RepoValidation::Invalid => CheckButtonLook {
            label: LABEL_REPO_INVALID,
            style: ButtonStyle::OutlineDanger,
            enabled: false,
        },
    }
}

pub trait InstanceTable: Send + Sync {
    /// Replace every row; each new row starts with a pending status cell.
    fn replace_rows(&self, instances: &[Instance]);
    /// Writing to a row that is no longer displayed is a no-op.
    fn set_status(&self, instance_id: &str, cell: StatusCell);
    fn set_deleting(&self, instance_id: &str);
}

pub trait LaunchButton: Send + Sync {
    fn show(&self, state: LaunchState);
}

pub trait CheckButton: Send + Sync {
    fn show(&self, validation: RepoValidation);
}

pub trait Collapsible: Send + Sync {
    fn set_expanded(&self, expanded: bool);
}

#[derive(Clone)]
pub struct PanelSurfaces {
    pub instance_table: Arc<dyn InstanceTable>,
    pub launch_button: Arc<dyn LaunchButton>,
    pub check_button: Arc<dyn CheckButton>,
    pub list_panel: Arc<dyn Collapsible>,
    pub form_panel: Arc<dyn Collapsible>,
}

impl PanelSurfaces {
    pub fn panel(&self, kind: PanelKind) -> &Arc<dyn Collapsible> {
        match kind {
            PanelKind::InstanceList => &self.list_panel,
            PanelKind::CreationForm => &self.form_panel,
        }
    }
}
