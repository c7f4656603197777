//! Headless rendering of the panel: every surface writes into one snapshot.

use crate::surfaces::{
    CheckButton, Collapsible, InstanceTable, LaunchButton, LaunchState, PanelKind, PanelSurfaces,
    StatusCell,
};
use cactus_common::{Instance, RepoValidation};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowView {
    pub id: String,
    pub name: String,
    pub public_ip: String,
    pub status: StatusCell,
    pub deleting: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PanelSnapshot {
    pub rows: Vec<RowView>,
    pub launch: LaunchState,
    pub check: RepoValidation,
    pub list_expanded: bool,
    pub form_expanded: bool,
    /// Every state the launch button has shown, oldest first.
    pub launch_history: Vec<LaunchState>,
}

impl PanelSnapshot {
    pub fn row(&self, instance_id: &str) -> Option<&RowView> {
        self.rows.iter().find(|r| r.id == instance_id)
    }
}

type ChangeHook = Box<dyn Fn(&PanelSnapshot) + Send + Sync>;

#[derive(Default)]
pub struct ViewModel {
    snapshot: Mutex<PanelSnapshot>,
    on_change: Option<ChangeHook>,
}

impl ViewModel {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// `hook` runs after every change, with the snapshot lock held.
    pub fn with_hook<F>(hook: F) -> Arc<Self>
    where
        F: Fn(&PanelSnapshot) + Send + Sync + 'static,
    {
        Arc::new(Self {
            snapshot: Mutex::default(),
            on_change: Some(Box::new(hook)),
        })
    }

    pub fn surfaces(self: &Arc<Self>) -> PanelSurfaces {
        PanelSurfaces {
            instance_table: self.clone(),
            launch_button: self.clone(),
            check_button: self.clone(),
            list_panel: Arc::new(PanelHandle {
                model: self.clone(),
                kind: PanelKind::InstanceList,
            }),
            form_panel: Arc::new(PanelHandle {
                model: self.clone(),
                kind: PanelKind::CreationForm,
            }),
        }
    }

    pub fn snapshot(&self) -> PanelSnapshot {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, PanelSnapshot> {
        self.snapshot
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn update<F>(&self, change: F)
    where
        F: FnOnce(&mut PanelSnapshot) -> bool,
    {
        let mut snapshot = self.lock();
        if change(&mut snapshot) {
            if let Some(hook) = &self.on_change {
                hook(&snapshot);
            }
        }
    }
}

impl InstanceTable for ViewModel {
    fn replace_rows(&self, instances: &[Instance]) {
        self.update(|s| {
            s.rows = instances
                .iter()
                .map(|i| RowView {
                    id: i.id.clone(),
                    name: i.name.clone(),
                    public_ip: i.public_ip.clone(),
                    status: StatusCell::Pending,
                    deleting: false,
                })
                .collect();
            true
        });
    }

    fn set_status(&self, instance_id: &str, cell: StatusCell) {
        self.update(|s| match s.rows.iter_mut().find(|r| r.id == instance_id) {
            Some(row) => {
                row.status = cell;
                true
            }
            None => false,
        });
    }

    fn set_deleting(&self, instance_id: &str) {
        self.update(|s| match s.rows.iter_mut().find(|r| r.id == instance_id) {
            Some(row) => {
                row.deleting = true;
                true
            }
            None => false,
        });
    }
}

impl LaunchButton for ViewModel {
    fn show(&self, state: LaunchState) {
        self.update(|s| {
            s.launch = state;
            s.launch_history.push(state);
            true
        });
    }
}

impl CheckButton for ViewModel {
    fn show(&self, validation: RepoValidation) {
        self.update(|s| {
            s.check = validation;
            true
        });
    }
}

struct PanelHandle {
    model: Arc<ViewModel>,
    kind: PanelKind,
}

impl Collapsible for PanelHandle {
    fn set_expanded(&self, expanded: bool) {
        let kind = self.kind;
        self.model.update(|s| {
            match kind {
                PanelKind::InstanceList => s.list_expanded = expanded,
                PanelKind::CreationForm => s.form_expanded = expanded,
            }
            true
        });
    }
}
