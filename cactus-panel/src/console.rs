//! Line-oriented front end: prints the panel on every change and maps
//! commands onto controller operations.

use std::fmt::Write as _;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::command::{PanelCommand, HELP};
use crate::controller::InstancePanelController;
use crate::surfaces::{check_button_look, PanelSurfaces};
use crate::view_model::{PanelSnapshot, ViewModel};

pub struct ConsoleView {
    model: Arc<ViewModel>,
}

impl ConsoleView {
    pub fn new() -> Self {
        Self {
            model: ViewModel::with_hook(|snapshot| println!("{}", render(snapshot))),
        }
    }

    pub fn surfaces(&self) -> PanelSurfaces {
        self.model.surfaces()
    }

    pub fn print(&self) {
        println!("{}", render(&self.model.snapshot()));
    }
}

impl Default for ConsoleView {
    fn default() -> Self {
        Self::new()
    }
}

pub fn render(snapshot: &PanelSnapshot) -> String {
    let mut out = String::new();
    let marker = |expanded: bool| if expanded { "▾" } else { "▸" };

    let _ = writeln!(out, "{} Instances", marker(snapshot.list_expanded));
    if snapshot.list_expanded {
        if snapshot.rows.is_empty() {
            let _ = writeln!(out, "    (no instances)");
        }
        for row in &snapshot.rows {
            let status = if row.deleting {
                crate::surfaces::LABEL_DELETING
            } else {
                row.status.label()
            };
            let _ = writeln!(out, "    {:<38} {:<20} {}", row.id, row.name, status);
        }
    }

    let _ = writeln!(out, "{} New instance", marker(snapshot.form_expanded));
    if snapshot.form_expanded {
        let check = check_button_look(snapshot.check);
        let check_state = if check.enabled { "" } else { " (disabled)" };
        let launch_state = if snapshot.launch.is_enabled() { "" } else { " (disabled)" };
        let _ = writeln!(out, "    [{}]{}", check.label, check_state);
        let _ = writeln!(out, "    [{}]{}", snapshot.launch.label(), launch_state);
    }
    out
}

/// What the input loop should do after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Run one command. Network-bound operations are spawned so the input loop
/// keeps accepting commands while they are in flight.
pub fn dispatch(controller: &InstancePanelController, view: &ConsoleView, command: PanelCommand) -> Flow {
    debug!(?command, "dispatching");
    match command {
        PanelCommand::OpenList => {
            let controller = controller.clone();
            tokio::spawn(async move {
                // Failures are logged by the controller.
                let _ = controller.open_instance_list().await;
            });
        }
        PanelCommand::Refresh => {
            let controller = controller.clone();
            tokio::spawn(async move {
                let _ = controller.refresh_instance_list().await;
            });
        }
        PanelCommand::OpenForm => controller.open_creation_form(),
        PanelCommand::Close => controller.collapse_panels(),
        PanelCommand::ToggleEnv(env) => {
            let selected = controller.toggle_python_env(&env);
            println!("{} {}", if selected { "+" } else { "-" }, env);
        }
        PanelCommand::Size(size) => controller.set_size(size),
        PanelCommand::EditRepo { index, value } => controller.edit_repo_field(index, &value),
        PanelCommand::Check => {
            let controller = controller.clone();
            tokio::spawn(async move {
                controller.validate_repository().await;
            });
        }
        PanelCommand::Launch => {
            let controller = controller.clone();
            tokio::spawn(async move {
                controller.create_instance().await;
            });
        }
        PanelCommand::Delete(id) => {
            let controller = controller.clone();
            tokio::spawn(async move {
                if let Err(e) = controller.delete_instance(&id).await {
                    warn!(instance_id = %id, error = %e, "list refresh after delete failed");
                }
            });
        }
        PanelCommand::Show => {
            let form = controller.form();
            println!(
                "size={} envs=[{}] repos=[{}]",
                form.size,
                form.python_envs.join(", "),
                form.repo_fields.join(", ")
            );
            view.print();
        }
        PanelCommand::Help => println!("{}", HELP),
        PanelCommand::Quit => return Flow::Quit,
    }
    Flow::Continue
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surfaces::{LaunchState, StatusCell};
    use crate::view_model::RowView;

    #[test]
    fn renders_expanded_list() {
        let snapshot = PanelSnapshot {
            rows: vec![
                RowView {
                    id: "a".into(),
                    name: "hub-a".into(),
                    public_ip: "10.0.0.1".into(),
                    status: StatusCell::Link("http://10.0.0.1:8080".into()),
                    deleting: false,
                },
                RowView {
                    id: "b".into(),
                    name: "hub-b".into(),
                    public_ip: "10.0.0.2".into(),
                    status: StatusCell::Error,
                    deleting: true,
                },
            ],
            list_expanded: true,
            ..Default::default()
        };
        let text = render(&snapshot);
        assert!(text.contains("http://10.0.0.1:8080"));
        assert!(text.contains("Deleting…"));
        assert!(!text.contains("Check Repository"));
    }

    #[test]
    fn renders_form_buttons() {
        let snapshot = PanelSnapshot {
            form_expanded: true,
            launch: LaunchState::Busy,
            ..Default::default()
        };
        let text = render(&snapshot);
        assert!(text.contains("[Check Repository]\n"));
        assert!(text.contains("[Launching…] (disabled)"));
    }
}
